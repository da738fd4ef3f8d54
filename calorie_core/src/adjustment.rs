//! Activity scaling and goal adjustment.
//!
//! Converts BMR into maintenance expenditure, applies the goal-based
//! deficit or surplus, then the safety clamps in order:
//! 1. Sex-specific calorie floor
//! 2. Sensitive health condition: no deficit at all

use crate::config::TargetPolicy;
use crate::{Goal, UserBiometrics};

/// Which safety clamp, if any, decided the final value
#[derive(Clone, Debug, PartialEq)]
pub enum ClampApplied {
    Floor { floor_kcal: u32 },
    SensitiveCondition { condition: String },
}

/// Result of the activity and goal stage, before rounding
#[derive(Clone, Debug, PartialEq)]
pub struct Adjustment {
    pub activity_factor: f64,
    pub tdee_maintenance: f64,
    pub bmi: f64,
    /// Fraction removed from maintenance; zero unless losing weight
    pub deficit_pct: f64,
    pub final_kcal: f64,
    pub clamp: Option<ClampApplied>,
}

/// Apply activity factor, goal adjustment and clamps to `bmr`
pub fn adjust(bmr: f64, bio: &UserBiometrics, policy: &TargetPolicy) -> Adjustment {
    let activity_factor = policy.activity.factor(bio.activity_level);
    let tdee = bmr * activity_factor;
    let bmi = bio.bmi();

    let (deficit_pct, adjusted) = match bio.goal {
        Goal::Maintain => (0.0, tdee),
        Goal::LoseWeight => {
            let pct = policy.goal.deficit_for_bmi(bmi);
            (pct, tdee * (1.0 - pct))
        }
        Goal::GainMuscle => (0.0, tdee * (1.0 + policy.goal.surplus_pct)),
    };

    tracing::debug!(
        "TDEE {:.1} (factor {}), BMI {:.1}, goal {} -> {:.1} kcal",
        tdee,
        activity_factor,
        bmi,
        bio.goal,
        adjusted
    );

    let floor_kcal = policy.clamps.floor_for(bio.sex);
    let floor = f64::from(floor_kcal);

    let mut final_kcal = adjusted;
    let mut clamp = None;

    if final_kcal < floor {
        tracing::info!(
            "Target {:.0} kcal below {} floor, clamping to {}",
            final_kcal,
            bio.sex,
            floor_kcal
        );
        final_kcal = floor;
        clamp = Some(ClampApplied::Floor { floor_kcal });
    }

    if final_kcal < tdee {
        if let Some(condition) = policy.clamps.sensitive_match(&bio.health_conditions) {
            tracing::info!(
                "Health condition '{}' present, discarding deficit",
                condition
            );
            final_kcal = tdee.max(floor);
            clamp = Some(ClampApplied::SensitiveCondition {
                condition: condition.to_string(),
            });
        }
    }

    Adjustment {
        activity_factor,
        tdee_maintenance: tdee,
        bmi,
        deficit_pct,
        final_kcal,
        clamp,
    }
}
