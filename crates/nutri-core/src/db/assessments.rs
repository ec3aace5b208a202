//! Assessment database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{Assessment, Circumferences, Skinfolds};

const ASSESSMENT_COLUMNS: &str =
    "assessment_id, appointment_id, skinfolds, circumferences, notes, created_at, updated_at";

impl Database {
    /// Insert a new assessment.
    pub fn insert_assessment(&self, assessment: &Assessment) -> DbResult<()> {
        let skinfolds_json = serde_json::to_string(&assessment.skinfolds)?;
        let circumferences_json = serde_json::to_string(&assessment.circumferences)?;

        self.conn.execute(
            r#"
            INSERT INTO assessments (
                assessment_id, appointment_id, skinfolds, circumferences,
                notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                assessment.assessment_id,
                assessment.appointment_id,
                skinfolds_json,
                circumferences_json,
                assessment.notes,
                assessment.created_at,
                assessment.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update measurements and notes of an existing assessment.
    pub fn update_assessment(&self, assessment: &Assessment) -> DbResult<bool> {
        let skinfolds_json = serde_json::to_string(&assessment.skinfolds)?;
        let circumferences_json = serde_json::to_string(&assessment.circumferences)?;

        let rows_affected = self.conn.execute(
            r#"
            UPDATE assessments SET
                skinfolds = ?2,
                circumferences = ?3,
                notes = ?4,
                updated_at = ?5
            WHERE assessment_id = ?1
            "#,
            params![
                assessment.assessment_id,
                skinfolds_json,
                circumferences_json,
                assessment.notes,
                assessment.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get an assessment by ID.
    pub fn get_assessment(&self, assessment_id: &str) -> DbResult<Option<Assessment>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM assessments WHERE assessment_id = ?",
                    ASSESSMENT_COLUMNS
                ),
                [assessment_id],
                AssessmentRow::from_row,
            )
            .optional()?
            .map(Assessment::try_from)
            .transpose()
    }

    /// Get the assessment taken during an appointment, if any.
    pub fn get_assessment_for_appointment(
        &self,
        appointment_id: &str,
    ) -> DbResult<Option<Assessment>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM assessments WHERE appointment_id = ?",
                    ASSESSMENT_COLUMNS
                ),
                [appointment_id],
                AssessmentRow::from_row,
            )
            .optional()?
            .map(Assessment::try_from)
            .transpose()
    }

    /// Delete an assessment. The appointment is left in place.
    pub fn delete_assessment(&self, assessment_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "DELETE FROM assessments WHERE assessment_id = ?",
            [assessment_id],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct AssessmentRow {
    assessment_id: String,
    appointment_id: String,
    skinfolds: String,
    circumferences: String,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl AssessmentRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(AssessmentRow {
            assessment_id: row.get(0)?,
            appointment_id: row.get(1)?,
            skinfolds: row.get(2)?,
            circumferences: row.get(3)?,
            notes: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

impl TryFrom<AssessmentRow> for Assessment {
    type Error = DbError;

    fn try_from(row: AssessmentRow) -> Result<Self, Self::Error> {
        let skinfolds: Skinfolds = serde_json::from_str(&row.skinfolds)?;
        let circumferences: Circumferences = serde_json::from_str(&row.circumferences)?;

        Ok(Assessment {
            assessment_id: row.assessment_id,
            appointment_id: row.appointment_id,
            skinfolds,
            circumferences,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
