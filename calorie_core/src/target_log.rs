//! Append-only log of computed calorie targets.
//!
//! The engine keeps no history; the handlers record every recomputation
//! here as one JSON line, with file locking for concurrent writers.

use crate::{CalorieDebug, MacroTargets, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// What caused a target to be computed
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetTrigger {
    Onboarding,
    Update,
}

impl TargetTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetTrigger::Onboarding => "onboarding",
            TargetTrigger::Update => "update",
        }
    }
}

/// One recorded target computation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TargetEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub trigger: TargetTrigger,
    pub calorie_debug: CalorieDebug,
    pub macro_targets: MacroTargets,
}

/// Sink for target events
pub trait TargetSink {
    fn append(&mut self, event: &TargetEvent) -> Result<()>;
}

/// JSONL-based target sink with file locking
#[derive(Clone, Debug)]
pub struct JsonlTargetSink {
    path: PathBuf,
}

impl JsonlTargetSink {
    /// Create a new JSONL sink for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl TargetSink for JsonlTargetSink {
    fn append(&mut self, event: &TargetEvent) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        // One write per line so concurrent appenders never interleave
        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        let mut writer = std::io::BufWriter::new(&file);
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Appended target event {} for user {}", event.id, event.user_id);
        Ok(())
    }
}

/// Read all events from a target log
///
/// Malformed lines are skipped with a warning.
pub fn read_events(path: &Path) -> Result<Vec<TargetEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut events = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<TargetEvent>(&line) {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::warn!("Failed to parse target event at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} target events from {:?}", events.len(), path);
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_event(user_id: Uuid) -> TargetEvent {
        TargetEvent {
            id: Uuid::new_v4(),
            user_id,
            recorded_at: Utc::now(),
            trigger: TargetTrigger::Onboarding,
            calorie_debug: CalorieDebug {
                bmr: 1500,
                activity_factor: 1.55,
                tdee_maintenance: 2325,
                final_target: 2093,
                bmi: 23.1,
            },
            macro_targets: MacroTargets {
                protein_g: 157,
                carbs_g: 234,
                fat_g: 57,
            },
        }
    }

    #[test]
    fn test_append_and_read_single_event() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("targets.jsonl");

        let event = create_test_event(Uuid::new_v4());

        let mut sink = JsonlTargetSink::new(&log_path);
        sink.append(&event).unwrap();

        let events = read_events(&log_path).unwrap();
        assert_eq!(events, vec![event]);
    }

    #[test]
    fn test_append_multiple_events() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("nested").join("targets.jsonl");
        let user = Uuid::new_v4();

        let mut sink = JsonlTargetSink::new(&log_path);
        for _ in 0..5 {
            sink.append(&create_test_event(user)).unwrap();
        }

        let events = read_events(&log_path).unwrap();
        assert_eq!(events.len(), 5);
        assert!(events.iter().all(|e| e.user_id == user));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("targets.jsonl");

        let mut sink = JsonlTargetSink::new(&log_path);
        sink.append(&create_test_event(Uuid::new_v4())).unwrap();

        let mut file = OpenOptions::new().append(true).open(&log_path).unwrap();
        writeln!(file, "{{ truncated").unwrap();
        drop(file);

        sink.append(&create_test_event(Uuid::new_v4())).unwrap();

        assert_eq!(read_events(&log_path).unwrap().len(), 2);
    }

    #[test]
    fn test_read_missing_log() {
        let temp_dir = tempfile::tempdir().unwrap();
        let events = read_events(&temp_dir.path().join("nonexistent.jsonl")).unwrap();
        assert!(events.is_empty());
    }
}
