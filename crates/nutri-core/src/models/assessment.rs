//! Physical assessment models.

use serde::{Deserialize, Serialize};

/// Skinfold thicknesses in millimetres.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Skinfolds {
    pub chest: Option<f64>,
    pub abdomen: Option<f64>,
    pub suprailiac: Option<f64>,
    pub midaxillary: Option<f64>,
    pub thigh: Option<f64>,
    pub triceps: Option<f64>,
    pub subscapular: Option<f64>,
}

impl Skinfolds {
    /// Labelled readings in report order.
    pub fn entries(&self) -> [(&'static str, Option<f64>); 7] {
        [
            ("Chest", self.chest),
            ("Abdomen", self.abdomen),
            ("Suprailiac", self.suprailiac),
            ("Midaxillary", self.midaxillary),
            ("Thigh", self.thigh),
            ("Triceps", self.triceps),
            ("Subscapular", self.subscapular),
        ]
    }
}

/// Body circumferences in centimetres.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Circumferences {
    pub chest: Option<f64>,
    pub waist: Option<f64>,
    pub abdomen: Option<f64>,
    pub biceps_right: Option<f64>,
    pub biceps_left: Option<f64>,
    pub forearm_right: Option<f64>,
    pub forearm_left: Option<f64>,
    pub hip: Option<f64>,
    pub thigh_right: Option<f64>,
    pub thigh_left: Option<f64>,
    pub calf_right: Option<f64>,
    pub calf_left: Option<f64>,
}

impl Circumferences {
    /// Labelled readings in report order.
    pub fn entries(&self) -> [(&'static str, Option<f64>); 12] {
        [
            ("Chest", self.chest),
            ("Waist", self.waist),
            ("Abdomen", self.abdomen),
            ("Biceps (right)", self.biceps_right),
            ("Biceps (left)", self.biceps_left),
            ("Forearm (right)", self.forearm_right),
            ("Forearm (left)", self.forearm_left),
            ("Hip", self.hip),
            ("Thigh (right)", self.thigh_right),
            ("Thigh (left)", self.thigh_left),
            ("Calf (right)", self.calf_right),
            ("Calf (left)", self.calf_left),
        ]
    }
}

/// The physical assessment taken during one appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assessment {
    /// Unique assessment ID
    pub assessment_id: String,
    /// Appointment this assessment belongs to (at most one per appointment)
    pub appointment_id: String,
    pub skinfolds: Skinfolds,
    pub circumferences: Circumferences,
    pub notes: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Assessment {
    /// Create a new assessment for an appointment.
    pub fn new(appointment_id: String, input: AssessmentInput) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            assessment_id: uuid::Uuid::new_v4().to_string(),
            appointment_id,
            skinfolds: input.skinfolds,
            circumferences: input.circumferences,
            notes: input.notes,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Overwrite the measurements and notes.
    pub fn apply(&mut self, input: AssessmentInput) {
        self.skinfolds = input.skinfolds;
        self.circumferences = input.circumferences;
        self.notes = input.notes;
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Editable assessment fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssessmentInput {
    pub skinfolds: Skinfolds,
    pub circumferences: Circumferences,
    pub notes: Option<String>,
}

impl AssessmentInput {
    /// Every measurement with its label, skinfolds first.
    pub fn measurements(&self) -> impl Iterator<Item = (&'static str, Option<f64>)> {
        self.skinfolds
            .entries()
            .into_iter()
            .chain(self.circumferences.entries())
    }
}
