//! Patient database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{Patient, Sex};

const PATIENT_COLUMNS: &str = "patient_id, name, national_id, birth_date, sex, phone, \
                               email, address, notes, created_at, updated_at";

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO patients (
                patient_id, name, national_id, birth_date, sex, phone,
                email, address, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                patient.patient_id,
                patient.name,
                patient.national_id,
                patient.birth_date.to_string(),
                patient.sex.code(),
                patient.phone,
                patient.email,
                patient.address,
                patient.notes,
                patient.created_at,
                patient.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing patient.
    pub fn update_patient(&self, patient: &Patient) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE patients SET
                name = ?2,
                national_id = ?3,
                birth_date = ?4,
                sex = ?5,
                phone = ?6,
                email = ?7,
                address = ?8,
                notes = ?9,
                updated_at = ?10
            WHERE patient_id = ?1
            "#,
            params![
                patient.patient_id,
                patient.name,
                patient.national_id,
                patient.birth_date.to_string(),
                patient.sex.code(),
                patient.phone,
                patient.email,
                patient.address,
                patient.notes,
                patient.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, patient_id: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE patient_id = ?", PATIENT_COLUMNS),
                [patient_id],
                PatientRow::from_row,
            )
            .optional()?
            .map(Patient::try_from)
            .transpose()
    }

    /// Check whether another patient already holds a national ID.
    pub fn national_id_taken(&self, national_id: &str, exclude_patient_id: Option<&str>) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*) FROM patients
            WHERE national_id = ?1 AND (?2 IS NULL OR patient_id != ?2)
            "#,
            params![national_id, exclude_patient_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Search patients by name, national ID or phone (case-insensitive substring).
    pub fn search_patients(&self, query: &str, limit: usize) -> DbResult<Vec<Patient>> {
        let pattern = like_pattern(query);
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM patients
            WHERE name LIKE ?1 ESCAPE '\'
               OR national_id LIKE ?1 ESCAPE '\'
               OR phone LIKE ?1 ESCAPE '\'
            ORDER BY name
            LIMIT ?2
            "#,
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map(params![pattern, limit as i64], PatientRow::from_row)?;
        collect_patients(rows)
    }

    /// List all patients ordered by name.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM patients ORDER BY name",
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map([], PatientRow::from_row)?;
        collect_patients(rows)
    }

    /// Delete a patient. Appointments and assessments go with it.
    pub fn delete_patient(&self, patient_id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM patients WHERE patient_id = ?", [patient_id])?;
        Ok(rows_affected > 0)
    }
}

/// Build a `LIKE` pattern matching `query` anywhere, with wildcards escaped.
pub(crate) fn like_pattern(query: &str) -> String {
    let escaped = query
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn collect_patients(
    rows: impl Iterator<Item = rusqlite::Result<PatientRow>>,
) -> DbResult<Vec<Patient>> {
    let mut patients = Vec::new();
    for row in rows {
        patients.push(row?.try_into()?);
    }
    Ok(patients)
}

/// Intermediate row struct for database mapping.
struct PatientRow {
    patient_id: String,
    name: String,
    national_id: Option<String>,
    birth_date: String,
    sex: String,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl PatientRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(PatientRow {
            patient_id: row.get(0)?,
            name: row.get(1)?,
            national_id: row.get(2)?,
            birth_date: row.get(3)?,
            sex: row.get(4)?,
            phone: row.get(5)?,
            email: row.get(6)?,
            address: row.get(7)?,
            notes: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let birth_date = row
            .birth_date
            .parse::<NaiveDate>()
            .map_err(|e| DbError::Constraint(format!("Invalid birth date '{}': {}", row.birth_date, e)))?;
        let sex = Sex::from_code(&row.sex)
            .ok_or_else(|| DbError::Constraint(format!("Unknown sex code: {}", row.sex)))?;

        Ok(Patient {
            patient_id: row.patient_id,
            name: row.name,
            national_id: row.national_id,
            birth_date,
            sex,
            phone: row.phone,
            email: row.email,
            address: row.address,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
