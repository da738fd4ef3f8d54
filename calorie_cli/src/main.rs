use calorie_core::handlers::{history_csv_path, target_log_path};
use calorie_core::*;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "caltarget")]
#[command(about = "Personalised daily calorie and macro targets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Load configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct BiometricArgs {
    /// male or female
    #[arg(long)]
    sex: Option<String>,

    /// Age in years
    #[arg(long, allow_negative_numbers = true)]
    age: Option<i64>,

    /// Height in centimetres
    #[arg(long, allow_negative_numbers = true)]
    height: Option<f64>,

    /// Weight in kilograms
    #[arg(long, allow_negative_numbers = true)]
    weight: Option<f64>,

    /// Target weight in kilograms
    #[arg(long, allow_negative_numbers = true)]
    target_weight: Option<f64>,

    /// lose_weight, maintain or gain_muscle
    #[arg(long)]
    goal: Option<String>,

    /// sedentary, light, moderate, active or very_active
    #[arg(long)]
    activity: Option<String>,

    /// Health condition flag (repeatable)
    #[arg(long = "condition")]
    conditions: Vec<String>,
}

impl BiometricArgs {
    fn to_form(&self, display_name: Option<String>) -> OnboardingForm {
        OnboardingForm {
            display_name,
            sex: self.sex.clone(),
            age_years: self.age,
            height_cm: self.height,
            weight_kg: self.weight,
            target_weight_kg: self.target_weight,
            goal: self.goal.clone(),
            activity_level: self.activity.clone(),
            health_conditions: self.conditions.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a target without storing anything
    Compute {
        #[command(flatten)]
        bio: BiometricArgs,

        /// Print the full target as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a profile and store its target
    Onboard {
        #[command(flatten)]
        bio: BiometricArgs,

        /// Display name for the profile
        #[arg(long)]
        name: Option<String>,
    },

    /// Change profile fields; the target is recomputed if biometrics change
    Update {
        /// Profile id
        id: Uuid,

        #[command(flatten)]
        bio: BiometricArgs,

        /// New display name
        #[arg(long)]
        name: Option<String>,

        /// Remove all health condition flags
        #[arg(long, conflicts_with = "conditions")]
        clear_conditions: bool,
    },

    /// Show a stored profile
    Show {
        /// Profile id
        id: Uuid,

        /// Print the stored profile as JSON
        #[arg(long)]
        json: bool,
    },

    /// Roll the target log up into the CSV history
    Rollup {
        /// Delete archived logs after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        calorie_core::logging::init_with_level("debug");
    } else {
        calorie_core::logging::init();
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            if e.is_validation() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);

    match cli.command {
        Commands::Compute { bio, json } => cmd_compute(&bio, json, &config),
        Commands::Onboard { bio, name } => cmd_onboard(data_dir, &bio, name, config),
        Commands::Update {
            id,
            bio,
            name,
            clear_conditions,
        } => cmd_update(data_dir, id, &bio, name, clear_conditions, config),
        Commands::Show { id, json } => cmd_show(data_dir, id, json),
        Commands::Rollup { cleanup } => cmd_rollup(data_dir, cleanup),
    }
}

fn cmd_compute(bio: &BiometricArgs, json: bool, config: &Config) -> Result<()> {
    let biometrics = bio.to_form(None).to_biometrics()?;
    let target = compute_calorie_target_with(&biometrics, &config.policy)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&target)?);
    } else {
        display_target(&biometrics, &target.calorie_debug, &target.macro_targets);
    }
    Ok(())
}

fn cmd_onboard(
    data_dir: PathBuf,
    bio: &BiometricArgs,
    name: Option<String>,
    config: Config,
) -> Result<()> {
    let mut handler = ProfileOnboardingHandler::for_data_dir(&data_dir, config.policy);
    let profile = handler.submit(&bio.to_form(name))?;

    display_profile(&profile);
    println!("✓ Profile created: {}", profile.id);
    Ok(())
}

fn cmd_update(
    data_dir: PathBuf,
    id: Uuid,
    bio: &BiometricArgs,
    name: Option<String>,
    clear_conditions: bool,
    config: Config,
) -> Result<()> {
    let health_conditions = if clear_conditions {
        Some(Vec::new())
    } else if bio.conditions.is_empty() {
        None
    } else {
        Some(bio.conditions.clone())
    };

    let update = ProfileUpdate {
        display_name: name,
        sex: bio.sex.clone(),
        age_years: bio.age,
        height_cm: bio.height,
        weight_kg: bio.weight,
        target_weight_kg: bio.target_weight,
        goal: bio.goal.clone(),
        activity_level: bio.activity.clone(),
        health_conditions,
    };

    let before = ProfileStore::new(&data_dir).load(id)?;
    let mut handler = ProfileUpdateHandler::for_data_dir(&data_dir, config.policy);
    let profile = handler.apply(id, &update)?;

    display_profile(&profile);
    if profile.calorie_debug != before.calorie_debug {
        println!(
            "✓ Target updated: {} → {} kcal",
            before.final_target, profile.final_target
        );
    } else {
        println!("✓ Profile saved, target unchanged");
    }
    Ok(())
}

fn cmd_show(data_dir: PathBuf, id: Uuid, json: bool) -> Result<()> {
    let profile = ProfileStore::new(&data_dir).load(id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        display_profile(&profile);
    }
    Ok(())
}

fn cmd_rollup(data_dir: PathBuf, cleanup: bool) -> Result<()> {
    let log_path = target_log_path(&data_dir);
    let csv_path = history_csv_path(&data_dir);

    if !log_path.exists() {
        println!("No target log found - nothing to roll up.");
        return Ok(());
    }

    let count = calorie_core::csv_rollup::log_to_csv_and_archive(&log_path, &csv_path)?;

    println!("✓ Rolled up {} targets to CSV", count);
    println!("  CSV: {}", csv_path.display());

    if cleanup {
        if let Some(log_dir) = log_path.parent() {
            let cleaned = calorie_core::csv_rollup::cleanup_processed_logs(log_dir)?;
            if cleaned > 0 {
                println!("✓ Cleaned up {} processed logs", cleaned);
            }
        }
    }

    Ok(())
}

fn display_target(bio: &UserBiometrics, debug: &CalorieDebug, macros: &MacroTargets) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  DAILY TARGET: {} kcal", debug.final_target);
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!(
        "  {} · {} y · {} cm · {} kg · BMI {:.1}",
        bio.sex, bio.age_years, bio.height_cm, bio.weight_kg, debug.bmi
    );
    println!("  Goal: {} · Activity: {}", bio.goal, bio.activity_level);
    println!();
    println!("  BMR:         {} kcal", debug.bmr);
    println!(
        "  Maintenance: {} kcal (× {})",
        debug.tdee_maintenance, debug.activity_factor
    );
    println!("  Target:      {} kcal", debug.final_target);
    println!();
    println!("  → Protein {} g", macros.protein_g);
    println!("  → Carbs   {} g", macros.carbs_g);
    println!("  → Fat     {} g", macros.fat_g);
    println!();
}

fn display_profile(profile: &UserProfile) {
    if let Some(ref name) = profile.display_name {
        println!("\n  {}", name);
    }
    display_target(
        &profile.biometrics,
        &profile.calorie_debug,
        &profile.macro_targets,
    );
    println!(
        "  Last updated {}",
        profile.updated_at.format("%Y-%m-%d %H:%M UTC")
    );
    println!();
}
