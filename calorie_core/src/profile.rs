//! User profile persistence with file locking.
//!
//! Each profile is one JSON document under `<data_dir>/profiles/<id>.json`.
//! The stored calorie target is replaced wholesale on every recomputation;
//! the latest write wins.

use crate::{
    CalorieDebug, CalorieTarget, Error, MacroTargets, Result, UserBiometrics,
};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Persisted user profile record
///
/// The target is flattened the way the profile document expects it:
/// top-level `final_target` and `macro_targets`, plus a `calorie_debug`
/// sub-object.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    #[serde(default)]
    pub display_name: Option<String>,
    pub biometrics: UserBiometrics,
    pub final_target: u32,
    pub macro_targets: MacroTargets,
    pub calorie_debug: CalorieDebug,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Build a new profile around a freshly computed target
    pub fn new(
        display_name: Option<String>,
        biometrics: UserBiometrics,
        target: &CalorieTarget,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name,
            biometrics,
            final_target: target.final_target,
            macro_targets: target.macro_targets,
            calorie_debug: target.calorie_debug,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace biometrics and the whole stored target
    pub fn replace_target(
        &mut self,
        biometrics: UserBiometrics,
        target: &CalorieTarget,
        now: DateTime<Utc>,
    ) {
        self.biometrics = biometrics;
        self.final_target = target.final_target;
        self.macro_targets = target.macro_targets;
        self.calorie_debug = target.calorie_debug;
        self.updated_at = now;
    }
}

/// Directory of profile documents
#[derive(Clone, Debug)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    /// Create a store rooted at `<data_dir>/profiles`
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join("profiles"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Load a profile with shared locking
    ///
    /// Unlike a preference file, a profile cannot fall back to defaults:
    /// a missing file is `ProfileNotFound`, a corrupt one is `Profile`.
    pub fn load(&self, id: Uuid) -> Result<UserProfile> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(Error::ProfileNotFound(id));
        }

        let file = File::open(&path)?;

        // Acquire shared lock for reading
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        let profile = serde_json::from_str::<UserProfile>(&contents).map_err(|e| {
            tracing::warn!("Failed to parse profile {:?}: {}", path, e);
            Error::Profile(format!("corrupt profile {}: {}", id, e))
        })?;

        tracing::debug!("Loaded profile {} from {:?}", id, path);
        Ok(profile)
    }

    /// Save a profile
    ///
    /// Atomically writes the profile by:
    /// 1. Writing to a temp file in the same directory
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn save(&self, profile: &UserProfile) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(profile.id);

        // The temp file has a unique name, so concurrent saves never share
        // it. The rename makes each save all-or-nothing; it does not order
        // concurrent load/modify/save sequences, the last rename wins.
        let temp = NamedTempFile::new_in(&self.dir)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(profile)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;

        // Atomically replace old profile document
        temp.persist(&path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved profile {} to {:?}", profile.id, path);
        Ok(())
    }
}
