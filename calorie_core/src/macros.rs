//! Macro split derivation.
//!
//! Protein and carbohydrate carry 4 kcal/g, fat 9 kcal/g. Protein is
//! rounded to the nearest gram. Fat is rounded to the nearest gram count
//! that leaves a whole number of carbohydrate grams (at most 2 g from the
//! exact share), and carbohydrates absorb the remainder so that the
//! grams always add back up to the target exactly.

use crate::config::MacroSplit;
use crate::{Error, MacroTargets, Result};

pub const KCAL_PER_G_PROTEIN: u32 = 4;
pub const KCAL_PER_G_CARBS: u32 = 4;
pub const KCAL_PER_G_FAT: u32 = 9;

/// Fat grams closest to `ideal` whose calories leave a remainder divisible
/// by 4 once subtracted from `target_kcal`.
fn fat_grams(target_kcal: i64, ideal: f64) -> i64 {
    let nearest = ideal.round() as i64;
    let residue = target_kcal.rem_euclid(4);

    (nearest - 2..=nearest + 2)
        .filter(|g| *g >= 0 && g.rem_euclid(4) == residue)
        .min_by(|a, b| {
            let da = (*a as f64 - ideal).abs();
            let db = (*b as f64 - ideal).abs();
            da.total_cmp(&db)
        })
        .unwrap_or(residue)
}

/// Split `target_kcal` into protein, carbohydrate and fat grams
///
/// # Errors
///
/// Returns `Error::Config` if the target is too small to be expressed in
/// whole grams under the split (only possible with a degenerate floor).
pub fn derive_macros(target_kcal: u32, split: &MacroSplit) -> Result<MacroTargets> {
    let total = i64::from(target_kcal);
    let kcal = f64::from(target_kcal);

    let mut protein = (kcal * split.protein_pct / f64::from(KCAL_PER_G_PROTEIN)).round() as i64;
    let mut fat = fat_grams(total, kcal * split.fat_pct / f64::from(KCAL_PER_G_FAT));

    let mut remainder = total - protein * 4 - fat * 9;
    while remainder < 0 && fat >= 4 {
        fat -= 4;
        remainder += 36;
    }
    while remainder < 0 && protein > 0 {
        protein -= 1;
        remainder += 4;
    }
    if remainder < 0 {
        return Err(Error::Config(format!(
            "{} kcal cannot be split into whole macro grams",
            target_kcal
        )));
    }

    debug_assert_eq!(remainder % 4, 0);
    let carbs = remainder / i64::from(KCAL_PER_G_CARBS);

    let to_u32 = |v: i64| {
        u32::try_from(v).map_err(|_| Error::Config(format!("macro grams out of range: {}", v)))
    };

    let macros = MacroTargets {
        protein_g: to_u32(protein)?,
        carbs_g: to_u32(carbs)?,
        fat_g: to_u32(fat)?,
    };

    tracing::debug!(
        "Macros for {} kcal: {}g protein, {}g carbs, {}g fat",
        target_kcal,
        macros.protein_g,
        macros.carbs_g,
        macros.fat_g
    );

    Ok(macros)
}
