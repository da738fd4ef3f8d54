//! Caloric target engine.
//!
//! A pure function of the user's biometrics and the target policy:
//!
//! 1. **BMR**: Mifflin-St Jeor, full precision
//! 2. **Maintenance**: BMR × activity factor
//! 3. **Goal adjustment**: BMI-tiered deficit, flat surplus, or none
//! 4. **Clamps**: calorie floor, then sensitive health conditions
//! 5. **Macros**: protein/fat/carb grams summing exactly to the target
//!
//! Nothing is cached and nothing is mutated; every call allocates a fresh
//! [`CalorieTarget`]. Either a fully populated target is returned or an
//! error, never a partial result.

use crate::config::{default_policy, TargetPolicy};
use crate::{adjustment, bmr, macros};
use crate::{CalorieDebug, CalorieTarget, Error, Result, UserBiometrics};

/// Compute the daily calorie target using the built-in policy
pub fn compute_calorie_target(bio: &UserBiometrics) -> Result<CalorieTarget> {
    compute_calorie_target_with(bio, default_policy())
}

/// Whole kcal, rejecting values that cannot be a daily target
fn whole_kcal(value: f64, what: &str) -> Result<u32> {
    let rounded = value.round();
    if !rounded.is_finite() || rounded < 1.0 || rounded > f64::from(u32::MAX) {
        return Err(Error::Config(format!("{} of {} kcal is out of range", what, value)));
    }
    Ok(rounded as u32)
}

/// Compute the daily calorie target under an explicit policy
///
/// The policy is validated on every call, so a hand-built policy gets the
/// same checks as one loaded from a config file.
pub fn compute_calorie_target_with(
    bio: &UserBiometrics,
    policy: &TargetPolicy,
) -> Result<CalorieTarget> {
    policy.validate()?;
    let bmr = bmr::mifflin_st_jeor(bio)?;
    let adj = adjustment::adjust(bmr, bio, policy);

    let final_target = whole_kcal(adj.final_kcal, "final target")?;
    let macro_targets = macros::derive_macros(final_target, &policy.macros)?;

    let calorie_debug = CalorieDebug {
        bmr: whole_kcal(bmr, "BMR")?,
        activity_factor: adj.activity_factor,
        tdee_maintenance: whole_kcal(adj.tdee_maintenance, "maintenance")?,
        final_target,
        bmi: (adj.bmi * 10.0).round() / 10.0,
    };

    tracing::info!(
        "Calorie target for {} {}y ({}, {}): {} kcal",
        bio.sex,
        bio.age_years,
        bio.goal,
        bio.activity_level,
        final_target
    );

    Ok(CalorieTarget {
        bmr,
        activity_factor: adj.activity_factor,
        tdee_maintenance: adj.tdee_maintenance,
        final_target,
        macro_targets,
        calorie_debug,
    })
}
