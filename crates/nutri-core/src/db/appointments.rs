//! Appointment database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::patients::like_pattern;
use super::{format_instant, parse_instant, Database, DbError, DbResult};
use crate::models::Appointment;

const APPOINTMENT_COLUMNS: &str = "a.appointment_id, a.patient_id, a.scheduled_at, a.weight_kg, \
                                   a.height_m, a.bmi, a.bmr, a.notes, a.fee, a.completed, \
                                   a.created_at, a.updated_at";

impl Database {
    /// Insert a new appointment, derived fields included.
    ///
    /// Crate-private: derived fields only reach storage through
    /// [`crate::clinic::ClinicRecords`], which recomputes them first.
    pub(crate) fn insert_appointment(&self, appointment: &Appointment) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO appointments (
                appointment_id, patient_id, scheduled_at, weight_kg, height_m,
                bmi, bmr, notes, fee, completed, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                appointment.appointment_id,
                appointment.patient_id,
                format_instant(&appointment.scheduled_at),
                appointment.weight_kg,
                appointment.height_m,
                appointment.bmi,
                appointment.bmr,
                appointment.notes,
                appointment.fee,
                appointment.completed,
                appointment.created_at,
                appointment.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing appointment, derived fields included.
    pub(crate) fn update_appointment(&self, appointment: &Appointment) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE appointments SET
                patient_id = ?2,
                scheduled_at = ?3,
                weight_kg = ?4,
                height_m = ?5,
                bmi = ?6,
                bmr = ?7,
                notes = ?8,
                fee = ?9,
                completed = ?10,
                updated_at = ?11
            WHERE appointment_id = ?1
            "#,
            params![
                appointment.appointment_id,
                appointment.patient_id,
                format_instant(&appointment.scheduled_at),
                appointment.weight_kg,
                appointment.height_m,
                appointment.bmi,
                appointment.bmr,
                appointment.notes,
                appointment.fee,
                appointment.completed,
                appointment.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get an appointment by ID.
    pub fn get_appointment(&self, appointment_id: &str) -> DbResult<Option<Appointment>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM appointments a WHERE a.appointment_id = ?",
                    APPOINTMENT_COLUMNS
                ),
                [appointment_id],
                AppointmentRow::from_row,
            )
            .optional()?
            .map(Appointment::try_from)
            .transpose()
    }

    /// List all appointments: open ones first, then most recent first.
    pub fn list_appointments(&self) -> DbResult<Vec<Appointment>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM appointments a
            ORDER BY a.completed ASC, a.scheduled_at DESC
            "#,
            APPOINTMENT_COLUMNS
        ))?;

        let rows = stmt.query_map([], AppointmentRow::from_row)?;
        collect_appointments(rows)
    }

    /// Search appointments by patient name or scheduled date (`YYYY-MM-DD` substring).
    pub fn search_appointments(&self, query: &str, limit: usize) -> DbResult<Vec<Appointment>> {
        let pattern = like_pattern(query);
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM appointments a
            JOIN patients p ON p.patient_id = a.patient_id
            WHERE p.name LIKE ?1 ESCAPE '\'
               OR substr(a.scheduled_at, 1, 10) LIKE ?1 ESCAPE '\'
            ORDER BY a.completed ASC, a.scheduled_at DESC
            LIMIT ?2
            "#,
            APPOINTMENT_COLUMNS
        ))?;

        let rows = stmt.query_map(params![pattern, limit as i64], AppointmentRow::from_row)?;
        collect_appointments(rows)
    }

    /// All appointments of one patient, oldest first.
    pub fn list_appointments_for_patient(&self, patient_id: &str) -> DbResult<Vec<Appointment>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM appointments a
            WHERE a.patient_id = ?
            ORDER BY a.scheduled_at ASC
            "#,
            APPOINTMENT_COLUMNS
        ))?;

        let rows = stmt.query_map([patient_id], AppointmentRow::from_row)?;
        collect_appointments(rows)
    }

    /// Scheduled instants of a patient's appointments, optionally skipping one record.
    pub fn appointment_times(
        &self,
        patient_id: &str,
        exclude_appointment_id: Option<&str>,
    ) -> DbResult<Vec<DateTime<Utc>>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT scheduled_at FROM appointments
            WHERE patient_id = ?1 AND (?2 IS NULL OR appointment_id != ?2)
            "#,
        )?;

        let rows = stmt.query_map(params![patient_id, exclude_appointment_id], |row| {
            row.get::<_, String>(0)
        })?;

        let mut times = Vec::new();
        for row in rows {
            times.push(parse_instant(&row?)?);
        }
        Ok(times)
    }

    /// Delete an appointment. Its assessment goes with it.
    pub fn delete_appointment(&self, appointment_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "DELETE FROM appointments WHERE appointment_id = ?",
            [appointment_id],
        )?;
        Ok(rows_affected > 0)
    }
}

fn collect_appointments(
    rows: impl Iterator<Item = rusqlite::Result<AppointmentRow>>,
) -> DbResult<Vec<Appointment>> {
    let mut appointments = Vec::new();
    for row in rows {
        appointments.push(row?.try_into()?);
    }
    Ok(appointments)
}

/// Intermediate row struct for database mapping.
struct AppointmentRow {
    appointment_id: String,
    patient_id: String,
    scheduled_at: String,
    weight_kg: Option<f64>,
    height_m: Option<f64>,
    bmi: Option<f64>,
    bmr: Option<f64>,
    notes: Option<String>,
    fee: f64,
    completed: bool,
    created_at: String,
    updated_at: String,
}

impl AppointmentRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(AppointmentRow {
            appointment_id: row.get(0)?,
            patient_id: row.get(1)?,
            scheduled_at: row.get(2)?,
            weight_kg: row.get(3)?,
            height_m: row.get(4)?,
            bmi: row.get(5)?,
            bmr: row.get(6)?,
            notes: row.get(7)?,
            fee: row.get(8)?,
            completed: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = DbError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        Ok(Appointment {
            appointment_id: row.appointment_id,
            patient_id: row.patient_id,
            scheduled_at: parse_instant(&row.scheduled_at)?,
            weight_kg: row.weight_kg,
            height_m: row.height_m,
            bmi: row.bmi,
            bmr: row.bmr,
            notes: row.notes,
            fee: row.fee,
            completed: row.completed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
