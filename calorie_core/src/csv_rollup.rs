//! CSV rollup of the target log.
//!
//! Moves recorded target events into a flat CSV history and archives the
//! JSONL log, without ever dropping an event.

use crate::target_log::{read_events, TargetEvent};
use crate::Result;
use chrono::Utc;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id: String,
    user_id: String,
    recorded_at: String,
    trigger: &'static str,
    bmr: u32,
    activity_factor: f64,
    tdee_maintenance: u32,
    bmi: f64,
    final_target: u32,
    protein_g: u32,
    carbs_g: u32,
    fat_g: u32,
}

impl From<&TargetEvent> for CsvRow {
    fn from(event: &TargetEvent) -> Self {
        CsvRow {
            id: event.id.to_string(),
            user_id: event.user_id.to_string(),
            recorded_at: event.recorded_at.to_rfc3339(),
            trigger: event.trigger.as_str(),
            bmr: event.calorie_debug.bmr,
            activity_factor: event.calorie_debug.activity_factor,
            tdee_maintenance: event.calorie_debug.tdee_maintenance,
            bmi: event.calorie_debug.bmi,
            final_target: event.calorie_debug.final_target,
            protein_g: event.macro_targets.protein_g,
            carbs_g: event.macro_targets.carbs_g,
            fat_g: event.macro_targets.fat_g,
        }
    }
}

/// Archive name for a rolled-up log, unique per rollup
fn processed_path(log_path: &Path) -> PathBuf {
    let stem = log_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "targets".into());
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6f");
    log_path.with_file_name(format!("{}.{}.processed", stem, stamp))
}

/// Roll up logged target events into CSV and archive the log
///
/// This function:
/// 1. Reads all events from the log
/// 2. Appends them to the CSV file (writes headers if the file is new)
/// 3. Syncs the CSV to disk
/// 4. Renames the log to `<stem>.<timestamp>.processed`
/// 5. Returns the number of events processed
///
/// The CSV is fsynced before the log is renamed, and the log is renamed
/// rather than deleted so it can be recovered by hand.
pub fn log_to_csv_and_archive(log_path: &Path, csv_path: &Path) -> Result<usize> {
    let events = read_events(log_path)?;

    if events.is_empty() {
        tracing::info!("No target events in log to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    // Headers only for a brand-new file
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for event in &events {
        writer.serialize(CsvRow::from(event))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Wrote {} target events to CSV", events.len());

    let archived = processed_path(log_path);
    std::fs::rename(log_path, &archived)?;

    tracing::info!("Archived target log to {:?}", archived);

    Ok(events.len())
}

/// Remove archived logs (`*.processed`) from `dir`
pub fn cleanup_processed_logs(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().map_or(false, |ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed log: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed target logs", count);
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target_log::{JsonlTargetSink, TargetSink, TargetTrigger};
    use crate::{CalorieDebug, MacroTargets};
    use std::fs::File;
    use uuid::Uuid;

    fn create_test_event(final_target: u32) -> TargetEvent {
        TargetEvent {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            trigger: TargetTrigger::Update,
            calorie_debug: CalorieDebug {
                bmr: 1700,
                activity_factor: 1.375,
                tdee_maintenance: 2338,
                final_target,
                bmi: 27.4,
            },
            macro_targets: MacroTargets {
                protein_g: 150,
                carbs_g: 220,
                fat_g: 56,
            },
        }
    }

    fn processed_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |x| x == "processed"))
            .count()
    }

    #[test]
    fn test_log_to_csv_creates_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("targets.jsonl");
        let csv_path = temp_dir.path().join("target_history.csv");

        let mut sink = JsonlTargetSink::new(&log_path);
        for i in 0..3 {
            sink.append(&create_test_event(2000 + i)).unwrap();
        }

        let count = log_to_csv_and_archive(&log_path, &csv_path).unwrap();
        assert_eq!(count, 3);

        assert!(csv_path.exists());
        assert!(!log_path.exists());
        assert_eq!(processed_files(temp_dir.path()), 1);
    }

    #[test]
    fn test_log_to_csv_appends_with_single_header() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("targets.jsonl");
        let csv_path = temp_dir.path().join("target_history.csv");

        let mut sink = JsonlTargetSink::new(&log_path);
        sink.append(&create_test_event(2100)).unwrap();
        assert_eq!(log_to_csv_and_archive(&log_path, &csv_path).unwrap(), 1);

        let mut sink = JsonlTargetSink::new(&log_path);
        sink.append(&create_test_event(2050)).unwrap();
        assert_eq!(log_to_csv_and_archive(&log_path, &csv_path).unwrap(), 1);

        let mut reader = csv::Reader::from_path(&csv_path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.get(0), Some("id"));
        let finals: Vec<String> = reader
            .records()
            .map(|r| r.unwrap().get(8).unwrap().to_string())
            .collect();
        assert_eq!(finals, vec!["2100", "2050"]);

        // Each rollup archives under its own name
        assert_eq!(processed_files(temp_dir.path()), 2);
    }

    #[test]
    fn test_empty_log() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("empty.jsonl");
        let csv_path = temp_dir.path().join("target_history.csv");

        File::create(&log_path).unwrap();

        let count = log_to_csv_and_archive(&log_path, &csv_path).unwrap();
        assert_eq!(count, 0);
        assert!(!csv_path.exists());
    }

    #[test]
    fn test_cleanup_processed_logs() {
        let temp_dir = tempfile::tempdir().unwrap();

        File::create(temp_dir.path().join("targets.1.processed")).unwrap();
        File::create(temp_dir.path().join("targets.2.processed")).unwrap();
        File::create(temp_dir.path().join("targets.jsonl")).unwrap();

        let count = cleanup_processed_logs(temp_dir.path()).unwrap();
        assert_eq!(count, 2);
        assert!(temp_dir.path().join("targets.jsonl").exists());
    }
}
