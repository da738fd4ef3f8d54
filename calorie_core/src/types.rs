//! Core domain types for the caloric target engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Closed enums for sex, goal and activity level
//! - Biometric input for a single calculation
//! - The computed target, its macro split and the debug payload

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Enumerations
// ============================================================================

/// Biological sex, selects the Mifflin-St Jeor constant and the calorie floor
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

impl FromStr for Sex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "male" | "m" => Ok(Sex::Male),
            "female" | "f" => Ok(Sex::Female),
            _ => Err(Error::InvalidBiometrics(format!("unrecognised sex '{}'", s))),
        }
    }
}

/// Weight goal selected during onboarding
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    LoseWeight,
    Maintain,
    GainMuscle,
}

impl Goal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Goal::LoseWeight => "lose_weight",
            Goal::Maintain => "maintain",
            Goal::GainMuscle => "gain_muscle",
        }
    }

    /// Infer the goal direction from current and target weight
    ///
    /// Used when the onboarding form leaves the goal blank.
    pub fn infer(weight_kg: f64, target_weight_kg: Option<f64>) -> Goal {
        match target_weight_kg {
            Some(target) if target < weight_kg => Goal::LoseWeight,
            Some(target) if target > weight_kg => Goal::GainMuscle,
            _ => Goal::Maintain,
        }
    }
}

impl FromStr for Goal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "lose_weight" | "lose" => Ok(Goal::LoseWeight),
            "maintain" => Ok(Goal::Maintain),
            "gain_muscle" | "gain" => Ok(Goal::GainMuscle),
            _ => Err(Error::InvalidGoal(s.to_string())),
        }
    }
}

/// Habitual activity level, ordered from least to most active
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    pub const ALL: [ActivityLevel; 5] = [
        ActivityLevel::Sedentary,
        ActivityLevel::Light,
        ActivityLevel::Moderate,
        ActivityLevel::Active,
        ActivityLevel::VeryActive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Active => "active",
            ActivityLevel::VeryActive => "very_active",
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "sedentary" => Ok(ActivityLevel::Sedentary),
            "light" => Ok(ActivityLevel::Light),
            "moderate" => Ok(ActivityLevel::Moderate),
            "active" => Ok(ActivityLevel::Active),
            "very_active" => Ok(ActivityLevel::VeryActive),
            _ => Err(Error::InvalidActivityLevel(s.to_string())),
        }
    }
}

macro_rules! display_as_str {
    ($($t:ty),*) => {
        $(impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(Sex, Goal, ActivityLevel);

/// Canonical form for free-form flags and enum strings:
/// trimmed, lower-cased, spaces and hyphens folded to underscores.
pub fn normalize(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

// ============================================================================
// Input
// ============================================================================

/// Anthropometric input for one target calculation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserBiometrics {
    pub sex: Sex,
    pub age_years: u32,
    pub height_cm: f64,
    pub weight_kg: f64,
    #[serde(default)]
    pub target_weight_kg: Option<f64>,
    pub goal: Goal,
    pub activity_level: ActivityLevel,
    #[serde(default)]
    pub health_conditions: BTreeSet<String>,
}

impl UserBiometrics {
    /// Body mass index, weight_kg / height_m²
    pub fn bmi(&self) -> f64 {
        let height_m = self.height_cm / 100.0;
        self.weight_kg / (height_m * height_m)
    }
}

// ============================================================================
// Output
// ============================================================================

/// Daily macronutrient targets in grams
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MacroTargets {
    pub protein_g: u32,
    pub carbs_g: u32,
    pub fat_g: u32,
}

impl MacroTargets {
    /// Calories implied by the gram figures (4/4/9 kcal per gram)
    pub fn total_kcal(&self) -> u32 {
        self.protein_g * 4 + self.carbs_g * 4 + self.fat_g * 9
    }
}

/// Intermediates of the computation chain, exposed verbatim to callers
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct CalorieDebug {
    /// BMR rounded to the nearest kcal
    pub bmr: u32,
    pub activity_factor: f64,
    /// Maintenance expenditure rounded to the nearest kcal
    pub tdee_maintenance: u32,
    pub final_target: u32,
    /// BMI used for deficit tier selection, one decimal
    pub bmi: f64,
}

/// A freshly computed daily calorie target
///
/// `bmr` and `tdee_maintenance` keep full precision; the debug payload
/// carries the rounded reporting values.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CalorieTarget {
    pub bmr: f64,
    pub activity_factor: f64,
    pub tdee_maintenance: f64,
    pub final_target: u32,
    pub macro_targets: MacroTargets,
    pub calorie_debug: CalorieDebug,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_enums_case_and_separator_insensitive() {
        assert_eq!("Very-Active".parse::<ActivityLevel>().unwrap(), ActivityLevel::VeryActive);
        assert_eq!(" lose weight ".parse::<Goal>().unwrap(), Goal::LoseWeight);
        assert_eq!("FEMALE".parse::<Sex>().unwrap(), Sex::Female);
    }

    #[test]
    fn test_unknown_goal_is_invalid_goal() {
        let err = "unknown".parse::<Goal>().unwrap_err();
        assert!(matches!(err, Error::InvalidGoal(ref v) if v == "unknown"));
    }

    #[test]
    fn test_unknown_activity_is_invalid_activity_level() {
        let err = "extreme".parse::<ActivityLevel>().unwrap_err();
        assert!(matches!(err, Error::InvalidActivityLevel(ref v) if v == "extreme"));
    }

    #[test]
    fn test_unknown_sex_is_invalid_biometrics() {
        assert!(matches!(
            "other".parse::<Sex>(),
            Err(Error::InvalidBiometrics(_))
        ));
    }

    #[test]
    fn test_display_roundtrips_through_from_str() {
        for level in ActivityLevel::ALL {
            assert_eq!(level.to_string().parse::<ActivityLevel>().unwrap(), level);
        }
        for goal in [Goal::LoseWeight, Goal::Maintain, Goal::GainMuscle] {
            assert_eq!(goal.to_string().parse::<Goal>().unwrap(), goal);
        }
    }

    #[test]
    fn test_goal_inference_from_target_weight() {
        assert_eq!(Goal::infer(80.0, Some(72.0)), Goal::LoseWeight);
        assert_eq!(Goal::infer(60.0, Some(65.0)), Goal::GainMuscle);
        assert_eq!(Goal::infer(70.0, Some(70.0)), Goal::Maintain);
        assert_eq!(Goal::infer(70.0, None), Goal::Maintain);
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&ActivityLevel::VeryActive).unwrap();
        assert_eq!(json, "\"very_active\"");
        let goal: Goal = serde_json::from_str("\"gain_muscle\"").unwrap();
        assert_eq!(goal, Goal::GainMuscle);
    }

    #[test]
    fn test_macro_total_kcal() {
        let macros = MacroTargets {
            protein_g: 100,
            carbs_g: 200,
            fat_g: 50,
        };
        assert_eq!(macros.total_kcal(), 400 + 800 + 450);
    }
}
