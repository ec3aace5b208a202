//! Nutri Core Library
//!
//! Local-first clinical records for a nutrition practice: patients, their
//! appointments and one physical assessment per appointment.
//!
//! # Architecture
//!
//! ```text
//!   AppointmentInput ──► validation ──► ┌──────────── transaction ────────────┐
//!                                       │ ConflictChecker (same patient,      │
//!                                       │   same instant?)                    │
//!                                       │ metrics: BMI / BMR recomputed       │
//!                                       │ write + commit                      │
//!                                       └─────────────────────────────────────┘
//!                                                         │
//!                                   Assessment ──► AssessmentReport (JSON / text)
//! ```
//!
//! # Core Principle
//!
//! **BMI and BMR are never written by callers.** Every appointment save
//! recomputes them from the raw weight, height and the patient's data.
//!
//! # Modules
//!
//! - [`metrics`]: BMI/BMR formulas and rounding
//! - [`scheduling`]: appointment slot conflict checker
//! - [`models`]: Domain types (Patient, Appointment, Assessment, etc.)
//! - [`db`]: SQLite storage
//! - [`clinic`]: Record operations used by the presentation layer
//! - [`report`]: Assessment report data
//! - [`config`]: Database and logging configuration

pub mod clinic;
pub mod config;
pub mod db;
pub mod metrics;
pub mod models;
pub mod report;
pub mod scheduling;

// Re-export commonly used types
pub use clinic::{ClinicError, ClinicRecords, ClinicResult};
pub use config::CoreConfig;
pub use db::Database;
pub use metrics::DerivedMetrics;
pub use models::{
    Appointment, AppointmentInput, Assessment, AssessmentInput, Circumferences, Patient,
    PatientInput, Sex, Skinfolds,
};
pub use report::AssessmentReport;
pub use scheduling::{AppointmentLookup, ConflictChecker};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use tracing_subscriber::EnvFilter;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum NutriError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<db::DbError> for NutriError {
    fn from(e: db::DbError) -> Self {
        NutriError::DatabaseError(e.to_string())
    }
}

impl From<ClinicError> for NutriError {
    fn from(e: ClinicError) -> Self {
        match e {
            ClinicError::Validation(msg) => NutriError::ValidationError(msg),
            ClinicError::NotFound(what) => NutriError::NotFound(what),
            ClinicError::Database(e) => e.into(),
        }
    }
}

impl From<::config::ConfigError> for NutriError {
    fn from(e: ::config::ConfigError) -> Self {
        NutriError::InvalidInput(format!("Invalid configuration: {}", e))
    }
}

impl From<serde_json::Error> for NutriError {
    fn from(e: serde_json::Error) -> Self {
        NutriError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for NutriError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        NutriError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, NutriError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| NutriError::InvalidInput(format!("Invalid date '{}': {}", value, e)))
}

fn parse_instant(value: &str) -> Result<DateTime<Utc>, NutriError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| NutriError::InvalidInput(format!("Invalid timestamp '{}': {}", value, e)))
}

fn parse_sex(value: &str) -> Result<Sex, NutriError> {
    Sex::from_code(value)
        .ok_or_else(|| NutriError::InvalidInput(format!("Invalid sex '{}', expected M or F", value)))
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

fn wrap(db: Database) -> Arc<NutriCore> {
    Arc::new(NutriCore {
        db: Arc::new(Mutex::new(db)),
    })
}

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<NutriCore>, NutriError> {
    Ok(wrap(Database::open(&path)?))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<NutriCore>, NutriError> {
    Ok(wrap(Database::open_in_memory()?))
}

/// Open the database described by a JSON [`CoreConfig`], with `NUTRI_*`
/// environment variables applied on top.
#[uniffi::export]
pub fn open_database_with_config(config_json: String) -> Result<Arc<NutriCore>, NutriError> {
    let config = CoreConfig::load(&config_json)?;
    Ok(wrap(config.open_database()?))
}

/// Install the global `tracing` subscriber.
///
/// `filter` falls back to `NUTRI_LOG_FILTER`, then to the default filter.
/// Returns `false` when a subscriber was already installed; that one stays
/// and the call is a no-op.
#[uniffi::export]
pub fn init_logging(filter: Option<String>) -> Result<bool, NutriError> {
    let directive = match filter {
        Some(filter) => filter,
        None => CoreConfig::from_env()?.log_filter,
    };
    let env_filter = EnvFilter::try_new(&directive)
        .map_err(|e| NutriError::InvalidInput(format!("Invalid log filter '{}': {}", directive, e)))?;

    Ok(tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .is_ok())
}

/// BMI for the given weight (kg) and height (m).
#[uniffi::export]
pub fn compute_bmi(weight_kg: Option<f64>, height_m: Option<f64>) -> Option<f64> {
    metrics::compute_bmi(weight_kg, height_m)
}

/// BMR for the given readings. `as_of` defaults to today's UTC date.
#[uniffi::export]
pub fn compute_bmr(
    weight_kg: Option<f64>,
    height_m: Option<f64>,
    sex: String,
    birth_date: String,
    as_of: Option<String>,
) -> Result<Option<f64>, NutriError> {
    let sex = parse_sex(&sex)?;
    let birth_date = parse_date(&birth_date)?;
    let as_of = match as_of {
        Some(date) => parse_date(&date)?,
        None => Utc::now().date_naive(),
    };
    Ok(metrics::compute_bmr(weight_kg, height_m, sex, birth_date, as_of))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct NutriCore {
    db: Arc<Mutex<Database>>,
}

#[uniffi::export]
impl NutriCore {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Register a new patient.
    pub fn register_patient(&self, input: FfiPatientInput) -> Result<FfiPatient, NutriError> {
        let db = self.db.lock()?;
        let patient = ClinicRecords::new(&db).register_patient(input.try_into()?)?;
        Ok(patient.into())
    }

    /// Edit a patient's details.
    pub fn update_patient(
        &self,
        patient_id: String,
        input: FfiPatientInput,
    ) -> Result<FfiPatient, NutriError> {
        let db = self.db.lock()?;
        let patient = ClinicRecords::new(&db).update_patient(&patient_id, input.try_into()?)?;
        Ok(patient.into())
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, patient_id: String) -> Result<Option<FfiPatient>, NutriError> {
        let db = self.db.lock()?;
        let patient = db.get_patient(&patient_id)?;
        Ok(patient.map(|p| p.into()))
    }

    /// All patients ordered by name.
    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, NutriError> {
        let db = self.db.lock()?;
        let patients = ClinicRecords::new(&db).list_patients()?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    /// Search patients by name, national ID or phone.
    pub fn search_patients(&self, query: String, limit: u32) -> Result<Vec<FfiPatient>, NutriError> {
        let db = self.db.lock()?;
        let patients = ClinicRecords::new(&db).search_patients(&query, limit as usize)?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    /// Delete a patient with all appointments and assessments.
    pub fn delete_patient(&self, patient_id: String) -> Result<(), NutriError> {
        let db = self.db.lock()?;
        ClinicRecords::new(&db).delete_patient(&patient_id)?;
        Ok(())
    }

    // =========================================================================
    // Appointment Operations
    // =========================================================================

    /// Schedule an appointment. Rejected if the patient is already booked
    /// at that instant.
    pub fn schedule_appointment(
        &self,
        input: FfiAppointmentInput,
    ) -> Result<FfiAppointment, NutriError> {
        let db = self.db.lock()?;
        let appointment = ClinicRecords::new(&db).schedule_appointment(input.try_into()?)?;
        Ok(appointment.into())
    }

    /// Edit an appointment. BMI and BMR are recomputed.
    pub fn update_appointment(
        &self,
        appointment_id: String,
        input: FfiAppointmentInput,
    ) -> Result<FfiAppointment, NutriError> {
        let db = self.db.lock()?;
        let appointment =
            ClinicRecords::new(&db).update_appointment(&appointment_id, input.try_into()?)?;
        Ok(appointment.into())
    }

    /// Get an appointment by ID.
    pub fn get_appointment(
        &self,
        appointment_id: String,
    ) -> Result<Option<FfiAppointment>, NutriError> {
        let db = self.db.lock()?;
        let appointment = db.get_appointment(&appointment_id)?;
        Ok(appointment.map(|a| a.into()))
    }

    /// All appointments, open ones first, most recent first.
    pub fn list_appointments(&self) -> Result<Vec<FfiAppointment>, NutriError> {
        let db = self.db.lock()?;
        let appointments = ClinicRecords::new(&db).list_appointments()?;
        Ok(appointments.into_iter().map(|a| a.into()).collect())
    }

    /// Search appointments by patient name or date.
    pub fn search_appointments(
        &self,
        query: String,
        limit: u32,
    ) -> Result<Vec<FfiAppointment>, NutriError> {
        let db = self.db.lock()?;
        let appointments = ClinicRecords::new(&db).search_appointments(&query, limit as usize)?;
        Ok(appointments.into_iter().map(|a| a.into()).collect())
    }

    /// A patient's appointments, oldest first.
    pub fn patient_history(&self, patient_id: String) -> Result<Vec<FfiAppointment>, NutriError> {
        let db = self.db.lock()?;
        let appointments = ClinicRecords::new(&db).patient_history(&patient_id)?;
        Ok(appointments.into_iter().map(|a| a.into()).collect())
    }

    /// Mark an appointment completed. Idempotent.
    pub fn mark_completed(&self, appointment_id: String) -> Result<FfiAppointment, NutriError> {
        let db = self.db.lock()?;
        let appointment = ClinicRecords::new(&db).mark_completed(&appointment_id)?;
        Ok(appointment.into())
    }

    /// Delete an appointment and its assessment.
    pub fn delete_appointment(&self, appointment_id: String) -> Result<(), NutriError> {
        let db = self.db.lock()?;
        ClinicRecords::new(&db).delete_appointment(&appointment_id)?;
        Ok(())
    }

    // =========================================================================
    // Assessment Operations
    // =========================================================================

    /// Record the assessment of an appointment.
    pub fn record_assessment(
        &self,
        appointment_id: String,
        input: FfiAssessmentInput,
    ) -> Result<FfiAssessment, NutriError> {
        let db = self.db.lock()?;
        let assessment = ClinicRecords::new(&db).record_assessment(&appointment_id, input.into())?;
        Ok(assessment.into())
    }

    /// Get an assessment by ID.
    pub fn get_assessment(&self, assessment_id: String) -> Result<Option<FfiAssessment>, NutriError> {
        let db = self.db.lock()?;
        let assessment = db.get_assessment(&assessment_id)?;
        Ok(assessment.map(|a| a.into()))
    }

    /// The assessment of an appointment, if recorded.
    pub fn assessment_for_appointment(
        &self,
        appointment_id: String,
    ) -> Result<Option<FfiAssessment>, NutriError> {
        let db = self.db.lock()?;
        let assessment = db.get_assessment_for_appointment(&appointment_id)?;
        Ok(assessment.map(|a| a.into()))
    }

    /// Replace an assessment's measurements and notes.
    pub fn update_assessment(
        &self,
        assessment_id: String,
        input: FfiAssessmentInput,
    ) -> Result<FfiAssessment, NutriError> {
        let db = self.db.lock()?;
        let assessment = ClinicRecords::new(&db).update_assessment(&assessment_id, input.into())?;
        Ok(assessment.into())
    }

    /// Delete an assessment. Its appointment stays.
    pub fn delete_assessment(&self, assessment_id: String) -> Result<(), NutriError> {
        let db = self.db.lock()?;
        ClinicRecords::new(&db).delete_assessment(&assessment_id)?;
        Ok(())
    }

    // =========================================================================
    // Report
    // =========================================================================

    /// Build the printable report of an assessment.
    pub fn assessment_report(
        &self,
        assessment_id: String,
    ) -> Result<FfiAssessmentReport, NutriError> {
        let db = self.db.lock()?;
        let report = ClinicRecords::new(&db).assessment_report(&assessment_id)?;
        Ok(FfiAssessmentReport {
            file_name: report.file_name().to_string(),
            lines: report.to_text(),
            json: report.to_json()?,
        })
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub patient_id: String,
    pub name: String,
    pub national_id: Option<String>,
    /// `YYYY-MM-DD`
    pub birth_date: String,
    /// `"M"` or `"F"`
    pub sex: String,
    /// Calendar age today
    pub age: i32,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            age: patient.age(),
            birth_date: patient.birth_date.format("%Y-%m-%d").to_string(),
            sex: patient.sex.code().to_string(),
            patient_id: patient.patient_id,
            name: patient.name,
            national_id: patient.national_id,
            phone: patient.phone,
            email: patient.email,
            address: patient.address,
            notes: patient.notes,
            created_at: patient.created_at,
            updated_at: patient.updated_at,
        }
    }
}

/// FFI-safe patient form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientInput {
    pub name: String,
    pub national_id: Option<String>,
    pub birth_date: String,
    pub sex: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl TryFrom<FfiPatientInput> for PatientInput {
    type Error = NutriError;

    fn try_from(input: FfiPatientInput) -> Result<Self, Self::Error> {
        Ok(PatientInput {
            birth_date: parse_date(&input.birth_date)?,
            sex: parse_sex(&input.sex)?,
            name: input.name,
            national_id: input.national_id,
            phone: input.phone,
            email: input.email,
            address: input.address,
            notes: input.notes,
        })
    }
}

/// FFI-safe appointment.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointment {
    pub appointment_id: String,
    pub patient_id: String,
    /// RFC 3339, UTC
    pub scheduled_at: String,
    pub weight_kg: Option<f64>,
    pub height_m: Option<f64>,
    pub bmi: Option<f64>,
    pub bmr: Option<f64>,
    pub notes: Option<String>,
    pub fee: f64,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Appointment> for FfiAppointment {
    fn from(appointment: Appointment) -> Self {
        Self {
            scheduled_at: appointment.scheduled_at.to_rfc3339(),
            bmi: appointment.bmi(),
            bmr: appointment.bmr(),
            appointment_id: appointment.appointment_id,
            patient_id: appointment.patient_id,
            weight_kg: appointment.weight_kg,
            height_m: appointment.height_m,
            notes: appointment.notes,
            fee: appointment.fee,
            completed: appointment.completed,
            created_at: appointment.created_at,
            updated_at: appointment.updated_at,
        }
    }
}

/// FFI-safe appointment form. BMI and BMR are not accepted.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointmentInput {
    pub patient_id: String,
    /// RFC 3339, any offset
    pub scheduled_at: String,
    pub weight_kg: Option<f64>,
    pub height_m: Option<f64>,
    pub notes: Option<String>,
    pub fee: f64,
}

impl TryFrom<FfiAppointmentInput> for AppointmentInput {
    type Error = NutriError;

    fn try_from(input: FfiAppointmentInput) -> Result<Self, Self::Error> {
        let mut converted = AppointmentInput::new(input.patient_id, parse_instant(&input.scheduled_at)?);
        converted.weight_kg = input.weight_kg;
        converted.height_m = input.height_m;
        converted.notes = input.notes;
        converted.fee = input.fee;
        Ok(converted)
    }
}

/// FFI-safe skinfolds (mm).
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiSkinfolds {
    pub chest: Option<f64>,
    pub abdomen: Option<f64>,
    pub suprailiac: Option<f64>,
    pub midaxillary: Option<f64>,
    pub thigh: Option<f64>,
    pub triceps: Option<f64>,
    pub subscapular: Option<f64>,
}

impl From<Skinfolds> for FfiSkinfolds {
    fn from(s: Skinfolds) -> Self {
        Self {
            chest: s.chest,
            abdomen: s.abdomen,
            suprailiac: s.suprailiac,
            midaxillary: s.midaxillary,
            thigh: s.thigh,
            triceps: s.triceps,
            subscapular: s.subscapular,
        }
    }
}

impl From<FfiSkinfolds> for Skinfolds {
    fn from(s: FfiSkinfolds) -> Self {
        Self {
            chest: s.chest,
            abdomen: s.abdomen,
            suprailiac: s.suprailiac,
            midaxillary: s.midaxillary,
            thigh: s.thigh,
            triceps: s.triceps,
            subscapular: s.subscapular,
        }
    }
}

/// FFI-safe circumferences (cm).
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiCircumferences {
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

impl From<Circumferences> for FfiCircumferences {
    fn from(c: Circumferences) -> Self {
        Self {
            chest: c.chest,
            waist: c.waist,
            abdomen: c.abdomen,
            biceps_right: c.biceps_right,
            biceps_left: c.biceps_left,
            forearm_right: c.forearm_right,
            forearm_left: c.forearm_left,
            hip: c.hip,
            thigh_right: c.thigh_right,
            thigh_left: c.thigh_left,
            calf_right: c.calf_right,
            calf_left: c.calf_left,
        }
    }
}

impl From<FfiCircumferences> for Circumferences {
    fn from(c: FfiCircumferences) -> Self {
        Self {
            chest: c.chest,
            waist: c.waist,
            abdomen: c.abdomen,
            biceps_right: c.biceps_right,
            biceps_left: c.biceps_left,
            forearm_right: c.forearm_right,
            forearm_left: c.forearm_left,
            hip: c.hip,
            thigh_right: c.thigh_right,
            thigh_left: c.thigh_left,
            calf_right: c.calf_right,
            calf_left: c.calf_left,
        }
    }
}

/// FFI-safe assessment.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAssessment {
    pub assessment_id: String,
    pub appointment_id: String,
    pub skinfolds: FfiSkinfolds,
    pub circumferences: FfiCircumferences,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Assessment> for FfiAssessment {
    fn from(assessment: Assessment) -> Self {
        Self {
            assessment_id: assessment.assessment_id,
            appointment_id: assessment.appointment_id,
            skinfolds: assessment.skinfolds.into(),
            circumferences: assessment.circumferences.into(),
            notes: assessment.notes,
            created_at: assessment.created_at,
            updated_at: assessment.updated_at,
        }
    }
}

/// FFI-safe assessment form.
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiAssessmentInput {
    pub skinfolds: FfiSkinfolds,
    pub circumferences: FfiCircumferences,
    pub notes: Option<String>,
}

impl From<FfiAssessmentInput> for AssessmentInput {
    fn from(input: FfiAssessmentInput) -> Self {
        AssessmentInput {
            skinfolds: input.skinfolds.into(),
            circumferences: input.circumferences.into(),
            notes: input.notes,
        }
    }
}

/// FFI-safe report: print lines plus the full JSON document.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAssessmentReport {
    pub file_name: String,
    pub lines: Vec<String>,
    pub json: String,
}
