//! Appointment slot conflicts.
//!
//! Two appointments of the same patient conflict when they are scheduled for
//! exactly the same instant. There is no duration or overlap window.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::db::{Database, DbResult};

/// Read access to a patient's booked slots.
pub trait AppointmentLookup {
    /// Scheduled instants of `patient_id`'s appointments, skipping
    /// `exclude_appointment_id` when given (the record being edited).
    fn appointment_times(
        &self,
        patient_id: &str,
        exclude_appointment_id: Option<&str>,
    ) -> DbResult<Vec<DateTime<Utc>>>;
}

impl AppointmentLookup for Database {
    fn appointment_times(
        &self,
        patient_id: &str,
        exclude_appointment_id: Option<&str>,
    ) -> DbResult<Vec<DateTime<Utc>>> {
        Database::appointment_times(self, patient_id, exclude_appointment_id)
    }
}

/// True if `proposed` equals one of `existing` to the instant.
pub fn has_conflict(proposed: &DateTime<Utc>, existing: &[DateTime<Utc>]) -> bool {
    existing.iter().any(|slot| slot == proposed)
}

/// Checks a proposed slot against what the lookup already holds.
pub struct ConflictChecker<'a, L: AppointmentLookup + ?Sized> {
    lookup: &'a L,
}

impl<'a, L: AppointmentLookup + ?Sized> ConflictChecker<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    /// Whether `patient_id` already has an appointment at `proposed`.
    pub fn check(
        &self,
        patient_id: &str,
        proposed: &DateTime<Utc>,
        exclude_appointment_id: Option<&str>,
    ) -> DbResult<bool> {
        let existing = self
            .lookup
            .appointment_times(patient_id, exclude_appointment_id)?;
        let conflict = has_conflict(proposed, &existing);
        debug!(
            patient_id,
            proposed = %proposed,
            booked = existing.len(),
            conflict,
            "checked appointment slot"
        );
        Ok(conflict)
    }
}
