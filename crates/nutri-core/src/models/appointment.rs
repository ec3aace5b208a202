//! Appointment models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::patient::Patient;
use crate::metrics::DerivedMetrics;

/// A scheduled appointment.
///
/// `bmi` and `bmr` are derived from the weight, height and the owning
/// patient. They are only written by [`Appointment::recompute_metrics`],
/// which every save runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    /// Unique appointment ID
    pub appointment_id: String,
    /// Owning patient
    pub patient_id: String,
    /// Scheduled instant, unique per patient
    pub scheduled_at: DateTime<Utc>,
    /// Weight in kg
    pub weight_kg: Option<f64>,
    /// Height in metres
    pub height_m: Option<f64>,
    #[serde(skip_deserializing)]
    pub(crate) bmi: Option<f64>,
    #[serde(skip_deserializing)]
    pub(crate) bmr: Option<f64>,
    pub notes: Option<String>,
    /// Fee charged, never negative
    pub fee: f64,
    /// One-way flag, see [`Appointment::mark_completed`]
    pub completed: bool,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Appointment {
    /// Create an appointment from raw input. Derived fields start empty.
    pub fn new(input: AppointmentInput) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            appointment_id: uuid::Uuid::new_v4().to_string(),
            patient_id: input.patient_id,
            scheduled_at: input.scheduled_at,
            weight_kg: input.weight_kg,
            height_m: input.height_m,
            bmi: None,
            bmr: None,
            notes: input.notes,
            fee: input.fee,
            completed: false,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Stored BMI, `None` until weight and height are recorded.
    pub fn bmi(&self) -> Option<f64> {
        self.bmi
    }

    /// Stored BMR, `None` until weight and height are recorded.
    pub fn bmr(&self) -> Option<f64> {
        self.bmr
    }

    /// Overwrite the raw, editable fields. Completion is left alone.
    pub fn apply(&mut self, input: AppointmentInput) {
        self.patient_id = input.patient_id;
        self.scheduled_at = input.scheduled_at;
        self.weight_kg = input.weight_kg;
        self.height_m = input.height_m;
        self.notes = input.notes;
        self.fee = input.fee;
    }

    /// Recompute BMI and BMR for `patient` as of `as_of`.
    pub fn recompute_metrics(&mut self, patient: &Patient, as_of: NaiveDate) {
        let metrics = DerivedMetrics::compute(
            self.weight_kg,
            self.height_m,
            patient.sex,
            patient.birth_date,
            as_of,
        );
        self.bmi = metrics.bmi;
        self.bmr = metrics.bmr;
    }

    /// Set the completed flag. Returns `false` if it was already set.
    pub fn mark_completed(&mut self) -> bool {
        if self.completed {
            return false;
        }
        self.completed = true;
        true
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().to_rfc3339();
    }
}

/// Raw appointment fields accepted from staff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentInput {
    pub patient_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub weight_kg: Option<f64>,
    pub height_m: Option<f64>,
    pub notes: Option<String>,
    #[serde(default)]
    pub fee: f64,
}

impl AppointmentInput {
    /// Input with only the required fields set.
    pub fn new(patient_id: String, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            patient_id,
            scheduled_at,
            weight_kg: None,
            height_m: None,
            notes: None,
            fee: 0.0,
        }
    }
}
