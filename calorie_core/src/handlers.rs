//! Onboarding and profile update handlers.
//!
//! The handlers sit between raw request data and the engine: they parse
//! string fields into the closed enums, call the engine, persist the
//! profile and record the computation in the target log. All context
//! (policy, store, sink) is handed over at construction.

use crate::config::TargetPolicy;
use crate::profile::{ProfileStore, UserProfile};
use crate::target_log::{JsonlTargetSink, TargetEvent, TargetSink, TargetTrigger};
use crate::{compute_calorie_target_with, CalorieTarget, Error, Goal, Result, UserBiometrics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Location of the target log under a data directory
pub fn target_log_path(data_dir: &Path) -> PathBuf {
    data_dir.join("log").join("targets.jsonl")
}

/// Location of the rolled-up CSV history under a data directory
pub fn history_csv_path(data_dir: &Path) -> PathBuf {
    data_dir.join("target_history.csv")
}

fn parse_age(age: i64) -> Result<u32> {
    u32::try_from(age)
        .map_err(|_| Error::InvalidBiometrics(format!("age_years must be positive, got {}", age)))
}

fn parse_conditions(raw: Vec<String>) -> BTreeSet<String> {
    raw.into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Non-empty trimmed value of an optional form string
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| Error::InvalidBiometrics(format!("{} is required", field)))
}

// ============================================================================
// Onboarding
// ============================================================================

/// Raw onboarding form as submitted by the client
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OnboardingForm {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub age_years: Option<i64>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub target_weight_kg: Option<f64>,
    /// Blank means "infer from target weight"
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub activity_level: Option<String>,
    #[serde(default)]
    pub health_conditions: Vec<String>,
}

impl OnboardingForm {
    /// Parse the form into typed biometrics
    pub fn to_biometrics(&self) -> Result<UserBiometrics> {
        let sex = required(present(&self.sex), "sex")?.parse()?;
        let age_years = parse_age(required(self.age_years, "age_years")?)?;
        let height_cm = required(self.height_cm, "height_cm")?;
        let weight_kg = required(self.weight_kg, "weight_kg")?;

        let goal = match present(&self.goal) {
            Some(goal) => goal.parse()?,
            None => {
                let inferred = Goal::infer(weight_kg, self.target_weight_kg);
                tracing::debug!("No goal on form, inferred {} from target weight", inferred);
                inferred
            }
        };

        let activity_level = present(&self.activity_level)
            .ok_or_else(|| Error::InvalidActivityLevel("activity_level is required".into()))?
            .parse()?;

        Ok(UserBiometrics {
            sex,
            age_years,
            height_cm,
            weight_kg,
            target_weight_kg: self.target_weight_kg,
            goal,
            activity_level,
            health_conditions: parse_conditions(self.health_conditions.clone()),
        })
    }
}

fn record<S: TargetSink>(
    sink: &mut S,
    user_id: Uuid,
    trigger: TargetTrigger,
    target: &CalorieTarget,
    now: DateTime<Utc>,
) -> Result<()> {
    sink.append(&TargetEvent {
        id: Uuid::new_v4(),
        user_id,
        recorded_at: now,
        trigger,
        calorie_debug: target.calorie_debug,
        macro_targets: target.macro_targets,
    })
}

/// Creates a profile from an onboarding submission
pub struct ProfileOnboardingHandler<S: TargetSink = JsonlTargetSink> {
    policy: TargetPolicy,
    store: ProfileStore,
    sink: S,
}

impl ProfileOnboardingHandler<JsonlTargetSink> {
    /// Handler persisting under `data_dir` with the default log location
    pub fn for_data_dir(data_dir: &Path, policy: TargetPolicy) -> Self {
        Self::new(
            policy,
            ProfileStore::new(data_dir),
            JsonlTargetSink::new(target_log_path(data_dir)),
        )
    }
}

impl<S: TargetSink> ProfileOnboardingHandler<S> {
    pub fn new(policy: TargetPolicy, store: ProfileStore, sink: S) -> Self {
        Self {
            policy,
            store,
            sink,
        }
    }

    /// Validate the form, compute the target and persist a new profile
    ///
    /// Nothing is written when validation or computation fails.
    pub fn submit(&mut self, form: &OnboardingForm) -> Result<UserProfile> {
        let biometrics = form.to_biometrics()?;
        let target = compute_calorie_target_with(&biometrics, &self.policy)?;

        let now = Utc::now();
        let display_name = present(&form.display_name).map(str::to_string);
        let profile = UserProfile::new(display_name, biometrics, &target, now);

        self.store.save(&profile)?;
        record(&mut self.sink, profile.id, TargetTrigger::Onboarding, &target, now)?;

        tracing::info!(
            "Onboarded profile {} with target {} kcal",
            profile.id,
            profile.final_target
        );
        Ok(profile)
    }
}

// ============================================================================
// Updates
// ============================================================================

/// Partial profile update; `None` leaves a field unchanged
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub age_years: Option<i64>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub target_weight_kg: Option<f64>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub activity_level: Option<String>,
    /// Replaces the whole set when present
    #[serde(default)]
    pub health_conditions: Option<Vec<String>>,
}

impl ProfileUpdate {
    /// Apply the patch on top of `current`
    ///
    /// A blank goal re-infers it from the merged weights, as onboarding
    /// does; an absent goal keeps the stored one even when the target
    /// weight moves. A blank activity level is ignored.
    pub fn merge_into(&self, current: &UserBiometrics) -> Result<UserBiometrics> {
        let mut next = current.clone();

        if let Some(sex) = present(&self.sex) {
            next.sex = sex.parse()?;
        }
        if let Some(age) = self.age_years {
            next.age_years = parse_age(age)?;
        }
        if let Some(height) = self.height_cm {
            next.height_cm = height;
        }
        if let Some(weight) = self.weight_kg {
            next.weight_kg = weight;
        }
        if let Some(target) = self.target_weight_kg {
            next.target_weight_kg = Some(target);
        }
        if self.goal.is_some() {
            next.goal = match present(&self.goal) {
                Some(goal) => goal.parse()?,
                None => Goal::infer(next.weight_kg, next.target_weight_kg),
            };
        }
        if let Some(level) = present(&self.activity_level) {
            next.activity_level = level.parse()?;
        }
        if let Some(conditions) = &self.health_conditions {
            next.health_conditions = parse_conditions(conditions.clone());
        }

        Ok(next)
    }
}

/// Applies profile edits and refreshes the target when biometrics change
pub struct ProfileUpdateHandler<S: TargetSink = JsonlTargetSink> {
    policy: TargetPolicy,
    store: ProfileStore,
    sink: S,
}

impl ProfileUpdateHandler<JsonlTargetSink> {
    /// Handler persisting under `data_dir` with the default log location
    pub fn for_data_dir(data_dir: &Path, policy: TargetPolicy) -> Self {
        Self::new(
            policy,
            ProfileStore::new(data_dir),
            JsonlTargetSink::new(target_log_path(data_dir)),
        )
    }
}

impl<S: TargetSink> ProfileUpdateHandler<S> {
    pub fn new(policy: TargetPolicy, store: ProfileStore, sink: S) -> Self {
        Self {
            policy,
            store,
            sink,
        }
    }

    /// Apply `update` to the stored profile `id`
    ///
    /// The target is recomputed and replaced only if a biometric field
    /// actually changed. On any error the stored profile is left as is.
    pub fn apply(&mut self, id: Uuid, update: &ProfileUpdate) -> Result<UserProfile> {
        let mut profile = self.store.load(id)?;
        let biometrics = update.merge_into(&profile.biometrics)?;
        let now = Utc::now();

        let new_name = present(&update.display_name).map(str::to_string);
        let name_changed = new_name.is_some() && new_name != profile.display_name;
        if name_changed {
            profile.display_name = new_name;
        }

        if biometrics == profile.biometrics {
            if name_changed {
                profile.updated_at = now;
                self.store.save(&profile)?;
            } else {
                tracing::debug!("Update for {} changed nothing", id);
            }
            return Ok(profile);
        }

        let target = compute_calorie_target_with(&biometrics, &self.policy)?;
        let previous = profile.final_target;
        profile.replace_target(biometrics, &target, now);

        self.store.save(&profile)?;
        record(&mut self.sink, id, TargetTrigger::Update, &target, now)?;

        tracing::info!(
            "Recomputed target for {}: {} -> {} kcal",
            id,
            previous,
            profile.final_target
        );
        Ok(profile)
    }
}
