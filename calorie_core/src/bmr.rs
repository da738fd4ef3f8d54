//! Basal metabolic rate using the Mifflin-St Jeor equation.
//!
//! `bmr = 10·weight_kg + 6.25·height_cm − 5·age_years + s`, where `s` is
//! +5 for men and −161 for women.

use crate::{Error, Result, Sex, UserBiometrics};

/// Hard validity range for age in years
pub const AGE_RANGE: std::ops::RangeInclusive<u32> = 1..=120;

/// Age range the equation is calibrated for; values outside are accepted
/// but logged.
pub const EXPECTED_AGE_RANGE: std::ops::RangeInclusive<u32> = 13..=100;

/// Upper sanity bound on height in centimetres
pub const MAX_HEIGHT_CM: f64 = 300.0;

/// Upper sanity bound on body weight in kilograms
pub const MAX_WEIGHT_KG: f64 = 700.0;

fn sex_constant(sex: Sex) -> f64 {
    match sex {
        Sex::Male => 5.0,
        Sex::Female => -161.0,
    }
}

fn check_measure(name: &str, value: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::InvalidBiometrics(format!(
            "{} must be positive, got {}",
            name, value
        )));
    }
    if value > max {
        return Err(Error::InvalidBiometrics(format!(
            "{} {} exceeds the maximum of {}",
            name, value, max
        )));
    }
    Ok(())
}

/// Validate the numeric fields of `bio`
///
/// Rejects non-positive or non-finite measurements, ages outside
/// [`AGE_RANGE`], and a non-positive target weight.
pub fn validate(bio: &UserBiometrics) -> Result<()> {
    if !AGE_RANGE.contains(&bio.age_years) {
        return Err(Error::InvalidBiometrics(format!(
            "age_years must be in [{}, {}], got {}",
            AGE_RANGE.start(),
            AGE_RANGE.end(),
            bio.age_years
        )));
    }
    check_measure("height_cm", bio.height_cm, MAX_HEIGHT_CM)?;
    check_measure("weight_kg", bio.weight_kg, MAX_WEIGHT_KG)?;
    if let Some(target) = bio.target_weight_kg {
        check_measure("target_weight_kg", target, MAX_WEIGHT_KG)?;
    }

    if !EXPECTED_AGE_RANGE.contains(&bio.age_years) {
        tracing::warn!(
            "Age {} is outside the calibrated range {:?}; estimate may be less accurate",
            bio.age_years,
            EXPECTED_AGE_RANGE
        );
    }

    Ok(())
}

/// Compute BMR in kcal/day at full precision
pub fn mifflin_st_jeor(bio: &UserBiometrics) -> Result<f64> {
    validate(bio)?;

    let bmr = 10.0 * bio.weight_kg + 6.25 * bio.height_cm - 5.0 * f64::from(bio.age_years)
        + sex_constant(bio.sex);

    // Extreme but valid inputs (tiny, very old) can drive the linear model
    // to zero or below.
    if bmr <= 0.0 {
        return Err(Error::InvalidBiometrics(format!(
            "biometrics yield a non-positive BMR ({:.1} kcal)",
            bmr
        )));
    }

    tracing::debug!("Mifflin-St Jeor BMR: {:.2} kcal/day", bmr);
    Ok(bmr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActivityLevel, Goal};
    use std::collections::BTreeSet;

    fn bio(sex: Sex, age: u32, height: f64, weight: f64) -> UserBiometrics {
        UserBiometrics {
            sex,
            age_years: age,
            height_cm: height,
            weight_kg: weight,
            target_weight_kg: None,
            goal: Goal::Maintain,
            activity_level: ActivityLevel::Sedentary,
            health_conditions: BTreeSet::new(),
        }
    }

    #[test]
    fn test_female_reference() {
        // 1480 + 968.75 - 225 - 161
        let bmr = mifflin_st_jeor(&bio(Sex::Female, 45, 155.0, 148.0)).unwrap();
        assert!((bmr - 2062.75).abs() < 1e-9);
        assert_eq!(bmr.round() as u32, 2063);
    }

    #[test]
    fn test_male_constant() {
        // 800 + 1125 - 150 + 5
        let bmr = mifflin_st_jeor(&bio(Sex::Male, 30, 180.0, 80.0)).unwrap();
        assert!((bmr - 1780.0).abs() < 1e-9);
    }

    #[test]
    fn test_sexes_differ_by_166() {
        let male = mifflin_st_jeor(&bio(Sex::Male, 40, 170.0, 70.0)).unwrap();
        let female = mifflin_st_jeor(&bio(Sex::Female, 40, 170.0, 70.0)).unwrap();
        assert!((male - female - 166.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_zero_age() {
        let err = mifflin_st_jeor(&bio(Sex::Female, 0, 160.0, 60.0)).unwrap_err();
        assert!(matches!(err, Error::InvalidBiometrics(_)));
    }

    #[test]
    fn test_rejects_age_over_120() {
        assert!(matches!(
            mifflin_st_jeor(&bio(Sex::Male, 121, 170.0, 70.0)),
            Err(Error::InvalidBiometrics(_))
        ));
    }

    #[test]
    fn test_accepts_age_bounds() {
        assert!(mifflin_st_jeor(&bio(Sex::Male, 1, 75.0, 10.0)).is_ok());
        assert!(mifflin_st_jeor(&bio(Sex::Male, 120, 170.0, 70.0)).is_ok());
    }

    #[test]
    fn test_rejects_zero_height() {
        assert!(matches!(
            mifflin_st_jeor(&bio(Sex::Female, 30, 0.0, 60.0)),
            Err(Error::InvalidBiometrics(_))
        ));
    }

    #[test]
    fn test_rejects_negative_weight() {
        assert!(matches!(
            mifflin_st_jeor(&bio(Sex::Female, 30, 165.0, -5.0)),
            Err(Error::InvalidBiometrics(_))
        ));
    }

    #[test]
    fn test_rejects_nan_height() {
        assert!(matches!(
            mifflin_st_jeor(&bio(Sex::Male, 30, f64::NAN, 80.0)),
            Err(Error::InvalidBiometrics(_))
        ));
    }

    #[test]
    fn test_rejects_implausible_height() {
        assert!(matches!(
            mifflin_st_jeor(&bio(Sex::Male, 30, 420.0, 80.0)),
            Err(Error::InvalidBiometrics(_))
        ));
    }

    #[test]
    fn test_rejects_non_positive_target_weight() {
        let mut input = bio(Sex::Male, 30, 180.0, 80.0);
        input.target_weight_kg = Some(0.0);
        assert!(matches!(validate(&input), Err(Error::InvalidBiometrics(_))));
    }

    #[test]
    fn test_rejects_non_positive_bmr() {
        // 10 + 62.5 - 600 - 161 < 0
        assert!(matches!(
            mifflin_st_jeor(&bio(Sex::Female, 120, 10.0, 1.0)),
            Err(Error::InvalidBiometrics(_))
        ));
    }
}
