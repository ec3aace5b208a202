//! Record operations for patients, appointments and assessments.
//!
//! This is the layer a presentation shell calls. Every appointment write
//! runs validation, the slot conflict check and the metric recomputation
//! inside one transaction, so a rejected request leaves nothing behind.

mod validation;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::{Database, DbError};
use crate::models::{
    Appointment, AppointmentInput, Assessment, AssessmentInput, Patient, PatientInput,
};
use crate::report::AssessmentReport;
use crate::scheduling::ConflictChecker;

use validation::{normalize_optional, normalize_patient, validate_appointment, validate_assessment, validate_patient};

const DUPLICATE_SLOT: &str = "An appointment for this patient is already scheduled at this time.";

/// Record operation errors.
#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

pub type ClinicResult<T> = Result<T, ClinicError>;

/// Turn a storage constraint hit into a user-facing validation failure.
fn constraint_as_validation(err: DbError, message: &str) -> ClinicError {
    if err.is_constraint_violation() {
        ClinicError::Validation(message.to_string())
    } else {
        ClinicError::Database(err)
    }
}

/// Patient, appointment and assessment operations over a database.
pub struct ClinicRecords<'a> {
    db: &'a Database,
    reference_date: Option<NaiveDate>,
}

impl<'a> ClinicRecords<'a> {
    /// Create record operations that use the current date.
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            reference_date: None,
        }
    }

    /// Pin "today" for age and BMR calculations.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    /// Date the BMR age is measured against (UTC calendar date).
    fn metrics_date(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| chrono::Utc::now().date_naive())
    }

    /// Date the displayed calendar age is measured against (local calendar date).
    fn display_date(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    // =========================================================================
    // Patients
    // =========================================================================

    /// Register a new patient.
    pub fn register_patient(&self, input: PatientInput) -> ClinicResult<Patient> {
        let input = normalize_patient(input);
        validate_patient(&input)?;
        self.ensure_national_id_free(input.national_id.as_deref(), None)?;

        let patient = input.into_patient();
        self.db
            .insert_patient(&patient)
            .map_err(|e| constraint_as_validation(e, "A patient with this national ID already exists."))?;

        info!(patient_id = %patient.patient_id, "registered patient");
        Ok(patient)
    }

    /// Edit a patient's details.
    ///
    /// Stored appointment metrics are not touched; they refresh on the
    /// appointment's next save.
    pub fn update_patient(&self, patient_id: &str, input: PatientInput) -> ClinicResult<Patient> {
        let mut patient = self.get_patient(patient_id)?;
        let input = normalize_patient(input);
        validate_patient(&input)?;
        self.ensure_national_id_free(input.national_id.as_deref(), Some(patient_id))?;

        input.apply_to(&mut patient);
        patient.touch();
        self.db
            .update_patient(&patient)
            .map_err(|e| constraint_as_validation(e, "A patient with this national ID already exists."))?;

        info!(patient_id, "updated patient");
        Ok(patient)
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, patient_id: &str) -> ClinicResult<Patient> {
        self.db
            .get_patient(patient_id)?
            .ok_or_else(|| ClinicError::NotFound(format!("patient {}", patient_id)))
    }

    /// All patients ordered by name.
    pub fn list_patients(&self) -> ClinicResult<Vec<Patient>> {
        Ok(self.db.list_patients()?)
    }

    /// Patients whose name, national ID or phone contains `query`.
    pub fn search_patients(&self, query: &str, limit: usize) -> ClinicResult<Vec<Patient>> {
        if query.trim().is_empty() {
            return Ok(self.db.list_patients()?.into_iter().take(limit).collect());
        }
        Ok(self.db.search_patients(query, limit)?)
    }

    /// Delete a patient together with all appointments and assessments.
    pub fn delete_patient(&self, patient_id: &str) -> ClinicResult<()> {
        if !self.db.delete_patient(patient_id)? {
            return Err(ClinicError::NotFound(format!("patient {}", patient_id)));
        }
        info!(patient_id, "deleted patient and dependent records");
        Ok(())
    }

    fn ensure_national_id_free(
        &self,
        national_id: Option<&str>,
        exclude_patient_id: Option<&str>,
    ) -> ClinicResult<()> {
        if let Some(national_id) = national_id {
            if self.db.national_id_taken(national_id, exclude_patient_id)? {
                return Err(ClinicError::Validation(
                    "A patient with this national ID already exists.".into(),
                ));
            }
        }
        Ok(())
    }

    // =========================================================================
    // Appointments
    // =========================================================================

    /// Schedule a new appointment.
    pub fn schedule_appointment(&self, mut input: AppointmentInput) -> ClinicResult<Appointment> {
        input.notes = normalize_optional(input.notes);
        validate_appointment(&input)?;
        let patient = self.get_patient(&input.patient_id)?;

        let tx = self.db.transaction()?;
        self.ensure_slot_free(&patient.patient_id, &input, None)?;

        let mut appointment = Appointment::new(input);
        appointment.recompute_metrics(&patient, self.metrics_date());
        self.db
            .insert_appointment(&appointment)
            .map_err(|e| constraint_as_validation(e, DUPLICATE_SLOT))?;
        tx.commit().map_err(DbError::from)?;

        info!(
            appointment_id = %appointment.appointment_id,
            patient_id = %appointment.patient_id,
            scheduled_at = %appointment.scheduled_at,
            bmi = ?appointment.bmi(),
            bmr = ?appointment.bmr(),
            "scheduled appointment"
        );
        Ok(appointment)
    }

    /// Edit an appointment's raw fields; BMI and BMR are recomputed.
    pub fn update_appointment(
        &self,
        appointment_id: &str,
        mut input: AppointmentInput,
    ) -> ClinicResult<Appointment> {
        let mut appointment = self.get_appointment(appointment_id)?;
        input.notes = normalize_optional(input.notes);
        validate_appointment(&input)?;
        let patient = self.get_patient(&input.patient_id)?;

        let tx = self.db.transaction()?;
        self.ensure_slot_free(&patient.patient_id, &input, Some(appointment_id))?;

        appointment.apply(input);
        appointment.recompute_metrics(&patient, self.metrics_date());
        appointment.touch();
        self.db
            .update_appointment(&appointment)
            .map_err(|e| constraint_as_validation(e, DUPLICATE_SLOT))?;
        tx.commit().map_err(DbError::from)?;

        info!(appointment_id, bmi = ?appointment.bmi(), bmr = ?appointment.bmr(), "updated appointment");
        Ok(appointment)
    }

    /// Mark an appointment as completed. Calling it again is a no-op.
    pub fn mark_completed(&self, appointment_id: &str) -> ClinicResult<Appointment> {
        let mut appointment = self.get_appointment(appointment_id)?;
        if !appointment.mark_completed() {
            debug!(appointment_id, "appointment already completed");
            return Ok(appointment);
        }

        let patient = self.get_patient(&appointment.patient_id)?;
        appointment.recompute_metrics(&patient, self.metrics_date());
        appointment.touch();
        self.db.update_appointment(&appointment)?;

        info!(appointment_id, "marked appointment completed");
        Ok(appointment)
    }

    /// Get an appointment by ID.
    pub fn get_appointment(&self, appointment_id: &str) -> ClinicResult<Appointment> {
        self.db
            .get_appointment(appointment_id)?
            .ok_or_else(|| ClinicError::NotFound(format!("appointment {}", appointment_id)))
    }

    /// All appointments, open ones first, then most recent first.
    pub fn list_appointments(&self) -> ClinicResult<Vec<Appointment>> {
        Ok(self.db.list_appointments()?)
    }

    /// Appointments whose patient name or scheduled date contains `query`.
    pub fn search_appointments(&self, query: &str, limit: usize) -> ClinicResult<Vec<Appointment>> {
        if query.trim().is_empty() {
            return Ok(self.db.list_appointments()?.into_iter().take(limit).collect());
        }
        Ok(self.db.search_appointments(query, limit)?)
    }

    /// A patient's appointments in chronological order.
    pub fn patient_history(&self, patient_id: &str) -> ClinicResult<Vec<Appointment>> {
        self.get_patient(patient_id)?;
        Ok(self.db.list_appointments_for_patient(patient_id)?)
    }

    /// Delete an appointment and its assessment.
    pub fn delete_appointment(&self, appointment_id: &str) -> ClinicResult<()> {
        if !self.db.delete_appointment(appointment_id)? {
            return Err(ClinicError::NotFound(format!("appointment {}", appointment_id)));
        }
        info!(appointment_id, "deleted appointment");
        Ok(())
    }

    fn ensure_slot_free(
        &self,
        patient_id: &str,
        input: &AppointmentInput,
        exclude_appointment_id: Option<&str>,
    ) -> ClinicResult<()> {
        let checker = ConflictChecker::new(self.db);
        if checker.check(patient_id, &input.scheduled_at, exclude_appointment_id)? {
            warn!(patient_id, scheduled_at = %input.scheduled_at, "rejected duplicate appointment slot");
            return Err(ClinicError::Validation(DUPLICATE_SLOT.into()));
        }
        Ok(())
    }

    // =========================================================================
    // Assessments
    // =========================================================================

    /// Record the assessment of an appointment. Only one is allowed.
    pub fn record_assessment(
        &self,
        appointment_id: &str,
        mut input: AssessmentInput,
    ) -> ClinicResult<Assessment> {
        input.notes = normalize_optional(input.notes);
        validate_assessment(&input)?;
        self.get_appointment(appointment_id)?;

        let already_recorded = format!("Appointment {} already has an assessment.", appointment_id);
        if self.db.get_assessment_for_appointment(appointment_id)?.is_some() {
            return Err(ClinicError::Validation(already_recorded));
        }

        let assessment = Assessment::new(appointment_id.to_string(), input);
        self.db
            .insert_assessment(&assessment)
            .map_err(|e| constraint_as_validation(e, &already_recorded))?;

        info!(assessment_id = %assessment.assessment_id, appointment_id, "recorded assessment");
        Ok(assessment)
    }

    /// Get an assessment by ID.
    pub fn get_assessment(&self, assessment_id: &str) -> ClinicResult<Assessment> {
        self.db
            .get_assessment(assessment_id)?
            .ok_or_else(|| ClinicError::NotFound(format!("assessment {}", assessment_id)))
    }

    /// The assessment recorded for an appointment.
    pub fn assessment_for_appointment(&self, appointment_id: &str) -> ClinicResult<Assessment> {
        self.db
            .get_assessment_for_appointment(appointment_id)?
            .ok_or_else(|| {
                ClinicError::NotFound(format!("assessment for appointment {}", appointment_id))
            })
    }

    /// Replace an assessment's measurements and notes.
    pub fn update_assessment(
        &self,
        assessment_id: &str,
        mut input: AssessmentInput,
    ) -> ClinicResult<Assessment> {
        let mut assessment = self.get_assessment(assessment_id)?;
        input.notes = normalize_optional(input.notes);
        validate_assessment(&input)?;

        assessment.apply(input);
        assessment.touch();
        self.db.update_assessment(&assessment)?;

        info!(assessment_id, "updated assessment");
        Ok(assessment)
    }

    /// Delete an assessment. Its appointment stays.
    pub fn delete_assessment(&self, assessment_id: &str) -> ClinicResult<()> {
        if !self.db.delete_assessment(assessment_id)? {
            return Err(ClinicError::NotFound(format!("assessment {}", assessment_id)));
        }
        info!(assessment_id, "deleted assessment");
        Ok(())
    }

    /// Build the printable report of an assessment.
    pub fn assessment_report(&self, assessment_id: &str) -> ClinicResult<AssessmentReport> {
        let assessment = self.get_assessment(assessment_id)?;
        let appointment = self.get_appointment(&assessment.appointment_id)?;
        let patient = self.get_patient(&appointment.patient_id)?;

        debug!(assessment_id, "building assessment report");
        Ok(AssessmentReport::build(
            &patient,
            &appointment,
            &assessment,
            self.display_date(),
        ))
    }
}
