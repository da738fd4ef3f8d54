#![forbid(unsafe_code)]

//! Core domain model and business logic for the caloric target engine.
//!
//! This crate provides:
//! - Domain types (biometrics, goals, activity levels, targets)
//! - The target engine (BMR, activity and goal adjustment, macro split)
//! - Target policy configuration
//! - Profile persistence and the onboarding/update handlers
//! - Recomputation log and CSV rollup

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod bmr;
pub mod adjustment;
pub mod macros;
pub mod engine;
pub mod profile;
pub mod handlers;
pub mod target_log;
pub mod csv_rollup;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::{Config, TargetPolicy};
pub use engine::{compute_calorie_target, compute_calorie_target_with};
pub use profile::{ProfileStore, UserProfile};
pub use handlers::{OnboardingForm, ProfileOnboardingHandler, ProfileUpdate, ProfileUpdateHandler};
pub use target_log::{JsonlTargetSink, TargetEvent, TargetSink, TargetTrigger};
