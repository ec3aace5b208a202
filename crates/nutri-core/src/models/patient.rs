//! Patient models.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Biological sex as recorded on intake. Drives the BMR formula.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Sex {
    /// Single-letter storage code.
    pub fn code(&self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
        }
    }

    /// Parse a storage code (`"M"` / `"F"`, case-insensitive).
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "M" | "m" => Some(Sex::Male),
            "F" | "f" => Some(Sex::Female),
            _ => None,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
        }
    }
}

/// A patient record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Local UUID
    pub patient_id: String,
    /// Full name
    pub name: String,
    /// National ID (CPF), unique when present
    pub national_id: Option<String>,
    /// Date of birth
    pub birth_date: NaiveDate,
    pub sex: Sex,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    /// Additional information
    pub notes: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Patient {
    /// Create a new patient with required fields.
    pub fn new(name: String, birth_date: NaiveDate, sex: Sex) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            patient_id: uuid::Uuid::new_v4().to_string(),
            name,
            national_id: None,
            birth_date,
            sex,
            phone: None,
            email: None,
            address: None,
            notes: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Calendar age on `today`: year difference, minus one before the birthday.
    ///
    /// Not the age used by the BMR formula, see [`crate::metrics::bmr_age_years`].
    pub fn age_on(&self, today: NaiveDate) -> i32 {
        let mut age = today.year() - self.birth_date.year();
        if (today.month(), today.day()) < (self.birth_date.month(), self.birth_date.day()) {
            age -= 1;
        }
        age
    }

    /// Calendar age as of the local current date.
    pub fn age(&self) -> i32 {
        self.age_on(chrono::Local::now().date_naive())
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Editable patient fields, as submitted by the intake form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientInput {
    pub name: String,
    pub national_id: Option<String>,
    pub birth_date: NaiveDate,
    pub sex: Sex,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl PatientInput {
    /// Build a new patient record from the input.
    pub fn into_patient(self) -> Patient {
        let mut patient = Patient::new(self.name.clone(), self.birth_date, self.sex);
        self.apply_to(&mut patient);
        patient
    }

    /// Overwrite the editable fields of an existing patient.
    pub fn apply_to(self, patient: &mut Patient) {
        patient.name = self.name;
        patient.national_id = self.national_id;
        patient.birth_date = self.birth_date;
        patient.sex = self.sex;
        patient.phone = self.phone;
        patient.email = self.email;
        patient.address = self.address;
        patient.notes = self.notes;
    }
}
