//! Appointment metrics: body-mass index (BMI) and basal metabolic rate (BMR).
//!
//! Everything here is pure. The stored `bmi`/`bmr` columns of an appointment
//! are a cache of these functions and are recomputed on every save.

use chrono::NaiveDate;

use crate::models::Sex;

/// Days per year used by the BMR age rule.
const DAYS_PER_YEAR: i64 = 365;

/// Round to 2 decimal places, ties to even on the exact binary value.
///
/// Goes through the exact decimal formatter rather than `(x * 100).round()`,
/// which would both scale with error and round ties away from zero.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{:.2}", value).parse().unwrap_or(value)
}

/// A reading of zero counts as "not recorded".
fn recorded(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

/// Compute BMI as `weight / height²`, rounded to 2 decimal places.
///
/// Returns `None` when either measurement is missing or zero.
pub fn compute_bmi(weight_kg: Option<f64>, height_m: Option<f64>) -> Option<f64> {
    let weight = recorded(weight_kg)?;
    let height = recorded(height_m)?;
    Some(round2(weight / (height * height)))
}

/// Age in whole years for the BMR formula: `floor(days_since_birth / 365)`.
///
/// This ignores leap days and differs from [`crate::models::Patient::age_on`],
/// the calendar age shown to users. Both are kept so stored BMR values do
/// not shift.
pub fn bmr_age_years(birth_date: NaiveDate, as_of: NaiveDate) -> i64 {
    (as_of - birth_date).num_days().div_euclid(DAYS_PER_YEAR)
}

/// Compute BMR (Mifflin-St Jeor variant), rounded to 2 decimal places.
///
/// Returns `None` when weight or height is missing or zero.
pub fn compute_bmr(
    weight_kg: Option<f64>,
    height_m: Option<f64>,
    sex: Sex,
    birth_date: NaiveDate,
    as_of: NaiveDate,
) -> Option<f64> {
    let weight = recorded(weight_kg)?;
    let height_cm = recorded(height_m)? * 100.0;
    let age = bmr_age_years(birth_date, as_of) as f64;

    let bmr = match sex {
        Sex::Male => 88.36 + (13.4 * weight) + (4.8 * height_cm) - (5.7 * age),
        Sex::Female => 447.6 + (9.2 * weight) + (3.1 * height_cm) - (4.3 * age),
    };
    Some(round2(bmr))
}

/// Both derived values for one appointment save.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedMetrics {
    pub bmi: Option<f64>,
    pub bmr: Option<f64>,
}

impl DerivedMetrics {
    pub fn compute(
        weight_kg: Option<f64>,
        height_m: Option<f64>,
        sex: Sex,
        birth_date: NaiveDate,
        as_of: NaiveDate,
    ) -> Self {
        Self {
            bmi: compute_bmi(weight_kg, height_m),
            bmr: compute_bmr(weight_kg, height_m, sex, birth_date, as_of),
        }
    }
}
