//! Configuration file support for the calorie target tools.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/caltarget/config.toml`.
//! Every numeric constant the engine applies lives in [`TargetPolicy`] so
//! that deployments can tune it without a rebuild.

use crate::types::{normalize, ActivityLevel, Sex};
use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Process-wide default policy, built once
static DEFAULT_POLICY: Lazy<TargetPolicy> = Lazy::new(TargetPolicy::default);

/// Get a reference to the built-in target policy
pub fn default_policy() -> &'static TargetPolicy {
    &DEFAULT_POLICY
}

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub policy: TargetPolicy,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

// ============================================================================
// Target policy
// ============================================================================

/// All tunable constants of the target engine
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct TargetPolicy {
    #[serde(default)]
    pub activity: ActivityFactors,

    #[serde(default)]
    pub goal: GoalPolicy,

    #[serde(default)]
    pub clamps: ClampPolicy,

    #[serde(default)]
    pub macros: MacroSplit,
}

/// Multipliers from BMR to maintenance expenditure
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActivityFactors {
    #[serde(default = "default_sedentary")]
    pub sedentary: f64,
    #[serde(default = "default_light")]
    pub light: f64,
    #[serde(default = "default_moderate")]
    pub moderate: f64,
    #[serde(default = "default_active")]
    pub active: f64,
    #[serde(default = "default_very_active")]
    pub very_active: f64,
}

impl Default for ActivityFactors {
    fn default() -> Self {
        Self {
            sedentary: default_sedentary(),
            light: default_light(),
            moderate: default_moderate(),
            active: default_active(),
            very_active: default_very_active(),
        }
    }
}

impl ActivityFactors {
    pub fn factor(&self, level: ActivityLevel) -> f64 {
        match level {
            ActivityLevel::Sedentary => self.sedentary,
            ActivityLevel::Light => self.light,
            ActivityLevel::Moderate => self.moderate,
            ActivityLevel::Active => self.active,
            ActivityLevel::VeryActive => self.very_active,
        }
    }
}

/// One BMI band of the weight-loss deficit table
///
/// Applies to BMI values below `bmi_below`; the last tier has no bound.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DeficitTier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmi_below: Option<f64>,
    pub deficit_pct: f64,
}

/// Goal-based adjustment parameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GoalPolicy {
    #[serde(default = "default_deficit_tiers")]
    pub deficit_tiers: Vec<DeficitTier>,

    #[serde(default = "default_surplus_pct")]
    pub surplus_pct: f64,
}

impl Default for GoalPolicy {
    fn default() -> Self {
        Self {
            deficit_tiers: default_deficit_tiers(),
            surplus_pct: default_surplus_pct(),
        }
    }
}

impl GoalPolicy {
    /// Deficit fraction for the tier containing `bmi`
    pub fn deficit_for_bmi(&self, bmi: f64) -> f64 {
        self.deficit_tiers
            .iter()
            .find(|tier| tier.bmi_below.map_or(true, |bound| bmi < bound))
            .or_else(|| self.deficit_tiers.last())
            .map_or(0.0, |tier| tier.deficit_pct)
    }
}

/// Safety clamps applied after goal adjustment
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClampPolicy {
    #[serde(default = "default_female_floor")]
    pub female_floor_kcal: u32,

    #[serde(default = "default_male_floor")]
    pub male_floor_kcal: u32,

    /// Health condition flags that forbid any calorie deficit
    #[serde(default = "default_sensitive_conditions")]
    pub sensitive_conditions: Vec<String>,
}

impl Default for ClampPolicy {
    fn default() -> Self {
        Self {
            female_floor_kcal: default_female_floor(),
            male_floor_kcal: default_male_floor(),
            sensitive_conditions: default_sensitive_conditions(),
        }
    }
}

impl ClampPolicy {
    pub fn floor_for(&self, sex: Sex) -> u32 {
        match sex {
            Sex::Female => self.female_floor_kcal,
            Sex::Male => self.male_floor_kcal,
        }
    }

    /// First recognised sensitive flag among `conditions`, if any
    pub fn sensitive_match<'a>(&self, conditions: &'a BTreeSet<String>) -> Option<&'a str> {
        conditions
            .iter()
            .find(|c| {
                let c = normalize(c);
                self.sensitive_conditions.iter().any(|s| normalize(s) == c)
            })
            .map(String::as_str)
    }
}

/// Share of the final target allotted to each macronutrient
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MacroSplit {
    #[serde(default = "default_protein_pct")]
    pub protein_pct: f64,
    #[serde(default = "default_fat_pct")]
    pub fat_pct: f64,
    #[serde(default = "default_carbs_pct")]
    pub carbs_pct: f64,
}

impl Default for MacroSplit {
    fn default() -> Self {
        Self {
            protein_pct: default_protein_pct(),
            fat_pct: default_fat_pct(),
            carbs_pct: default_carbs_pct(),
        }
    }
}

impl TargetPolicy {
    /// Check internal consistency of the policy
    pub fn validate(&self) -> Result<()> {
        let factors: Vec<f64> = ActivityLevel::ALL
            .iter()
            .map(|l| self.activity.factor(*l))
            .collect();
        if factors.iter().any(|f| !f.is_finite() || *f <= 0.0) {
            return Err(Error::Config("activity factors must be positive".into()));
        }
        if factors.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::Config(
                "activity factors must strictly increase from sedentary to very_active".into(),
            ));
        }

        let tiers = &self.goal.deficit_tiers;
        if tiers.is_empty() {
            return Err(Error::Config("at least one deficit tier is required".into()));
        }
        for (i, tier) in tiers.iter().enumerate() {
            if !(0.0..1.0).contains(&tier.deficit_pct) {
                return Err(Error::Config(format!(
                    "deficit_pct {} must be in [0, 1)",
                    tier.deficit_pct
                )));
            }
            let is_last = i + 1 == tiers.len();
            match (tier.bmi_below, is_last) {
                (None, false) => {
                    return Err(Error::Config(
                        "only the last deficit tier may omit bmi_below".into(),
                    ))
                }
                (Some(_), true) => {
                    return Err(Error::Config(
                        "the last deficit tier must omit bmi_below".into(),
                    ))
                }
                _ => {}
            }
        }
        let bounds: Vec<f64> = tiers.iter().filter_map(|t| t.bmi_below).collect();
        if bounds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::Config("deficit tier bounds must be ascending".into()));
        }

        if !self.goal.surplus_pct.is_finite() || self.goal.surplus_pct < 0.0 {
            return Err(Error::Config("surplus_pct must be non-negative".into()));
        }

        if self.clamps.female_floor_kcal == 0 || self.clamps.male_floor_kcal == 0 {
            return Err(Error::Config("calorie floors must be positive".into()));
        }

        let m = &self.macros;
        let shares = [m.protein_pct, m.fat_pct, m.carbs_pct];
        if shares.iter().any(|p| !(0.0..=1.0).contains(p)) {
            return Err(Error::Config("macro shares must be in [0, 1]".into()));
        }
        if (shares.iter().sum::<f64>() - 1.0).abs() > 1e-6 {
            return Err(Error::Config(format!(
                "macro shares must sum to 1.0 (protein {} + fat {} + carbs {})",
                m.protein_pct, m.fat_pct, m.carbs_pct
            )));
        }

        Ok(())
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(std::env::temp_dir)
    });
    base.join("caltarget")
}

fn default_sedentary() -> f64 {
    1.2
}

fn default_light() -> f64 {
    1.375
}

fn default_moderate() -> f64 {
    1.55
}

fn default_active() -> f64 {
    1.725
}

fn default_very_active() -> f64 {
    1.9
}

fn default_deficit_tiers() -> Vec<DeficitTier> {
    vec![
        DeficitTier {
            bmi_below: Some(25.0),
            deficit_pct: 0.10,
        },
        DeficitTier {
            bmi_below: Some(30.0),
            deficit_pct: 0.12,
        },
        DeficitTier {
            bmi_below: Some(35.0),
            deficit_pct: 0.15,
        },
        DeficitTier {
            bmi_below: None,
            deficit_pct: 0.20,
        },
    ]
}

fn default_surplus_pct() -> f64 {
    0.10
}

fn default_female_floor() -> u32 {
    1200
}

fn default_male_floor() -> u32 {
    1500
}

fn default_sensitive_conditions() -> Vec<String> {
    vec![
        "pregnancy".into(),
        "pregnant".into(),
        "breastfeeding".into(),
        "lactating".into(),
        "eating_disorder".into(),
    ]
}

fn default_protein_pct() -> f64 {
    0.30
}

fn default_fat_pct() -> f64 {
    0.25
}

fn default_carbs_pct() -> f64 {
    0.45
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    ///
    /// The target policy is validated before the config is returned.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.policy.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(std::env::temp_dir)
        });
        base.join("caltarget").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.policy.activity.factor(ActivityLevel::Moderate), 1.55);
        assert_eq!(config.policy.clamps.female_floor_kcal, 1200);
        assert_eq!(config.policy.clamps.male_floor_kcal, 1500);
        assert_eq!(config.policy.goal.deficit_tiers.len(), 4);
        config.policy.validate().unwrap();
    }

    #[test]
    fn test_default_policy_is_shared() {
        assert!(std::ptr::eq(default_policy(), default_policy()));
        assert_eq!(default_policy(), &TargetPolicy::default());
    }

    #[test]
    fn test_activity_factor_table() {
        let factors = ActivityFactors::default();
        assert_eq!(factors.factor(ActivityLevel::Sedentary), 1.2);
        assert_eq!(factors.factor(ActivityLevel::Light), 1.375);
        assert_eq!(factors.factor(ActivityLevel::Moderate), 1.55);
        assert_eq!(factors.factor(ActivityLevel::Active), 1.725);
        assert_eq!(factors.factor(ActivityLevel::VeryActive), 1.9);
    }

    #[test]
    fn test_deficit_tier_boundaries() {
        let goal = GoalPolicy::default();
        assert_eq!(goal.deficit_for_bmi(18.0), 0.10);
        assert_eq!(goal.deficit_for_bmi(24.99), 0.10);
        assert_eq!(goal.deficit_for_bmi(25.0), 0.12);
        assert_eq!(goal.deficit_for_bmi(29.99), 0.12);
        assert_eq!(goal.deficit_for_bmi(30.0), 0.15);
        assert_eq!(goal.deficit_for_bmi(34.99), 0.15);
        assert_eq!(goal.deficit_for_bmi(35.0), 0.20);
        assert_eq!(goal.deficit_for_bmi(61.6), 0.20);
    }

    #[test]
    fn test_sensitive_match_normalizes_flags() {
        let clamps = ClampPolicy::default();
        let conditions: BTreeSet<String> = ["Asthma".to_string(), " Pregnant ".to_string()]
            .into_iter()
            .collect();
        assert_eq!(clamps.sensitive_match(&conditions), Some(" Pregnant "));

        let eating: BTreeSet<String> = ["Eating Disorder".to_string()].into_iter().collect();
        assert!(clamps.sensitive_match(&eating).is_some());

        let none: BTreeSet<String> = ["asthma".to_string()].into_iter().collect();
        assert!(clamps.sensitive_match(&none).is_none());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.policy, parsed.policy);
        assert_eq!(config.data.data_dir, parsed.data.data_dir);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[policy.macros]
protein_pct = 0.35
fat_pct = 0.25
carbs_pct = 0.40
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.policy.macros.protein_pct, 0.35);
        assert_eq!(config.policy.activity.sedentary, 1.2); // default
        config.policy.validate().unwrap();
    }

    #[test]
    fn test_rejects_macro_shares_not_summing_to_one() {
        let mut policy = TargetPolicy::default();
        policy.macros.carbs_pct = 0.50;
        assert!(matches!(policy.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_unordered_tiers() {
        let mut policy = TargetPolicy::default();
        policy.goal.deficit_tiers.swap(0, 1);
        assert!(matches!(policy.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_non_increasing_activity_factors() {
        let mut policy = TargetPolicy::default();
        policy.activity.active = 1.5;
        assert!(matches!(policy.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_rejects_invalid_policy() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[policy.clamps]\nfemale_floor_kcal = 0\n",
        )
        .unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_save_and_load_from() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.policy.goal.surplus_pct = 0.15;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.policy.goal.surplus_pct, 0.15);
    }
}
