//! Assessment report data.
//!
//! The report is plain data: a presentation layer lays it out as a PDF (or
//! anything else). [`AssessmentReport::to_text`] gives the line-by-line
//! rendering, [`AssessmentReport::file_name`] the download name.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Appointment, Assessment, Patient};

/// Placeholder for missing contact details.
pub const NOT_PROVIDED: &str = "Not provided";

/// Placeholder for missing measurements and notes.
pub const EMPTY: &str = "-";

/// Patient block of the report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientSection {
    pub name: String,
    /// Calendar age on the report date
    pub age: i32,
    pub sex: String,
    pub national_id: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub notes: String,
}

/// Appointment block of the report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentSection {
    /// `dd/mm/YYYY HH:MM`
    pub date: String,
    pub weight_kg: String,
    pub height_m: String,
    /// Stored BMI, never recomputed for the report
    pub bmi: String,
    /// Stored BMR, never recomputed for the report
    pub bmr: String,
    pub fee: String,
    pub completed: String,
    pub notes: String,
}

/// One labelled measurement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeasurementRow {
    pub label: String,
    pub value: String,
}

/// Everything printed on an assessment report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssessmentReport {
    pub assessment_id: String,
    pub patient: PatientSection,
    pub appointment: AppointmentSection,
    /// Skinfolds in mm
    pub skinfolds: Vec<MeasurementRow>,
    /// Circumferences in cm
    pub circumferences: Vec<MeasurementRow>,
    pub notes: String,
    file_name: String,
}

fn or_placeholder(value: &Option<String>, placeholder: &str) -> String {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => placeholder.to_string(),
    }
}

fn number(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| EMPTY.to_string())
}

fn rows<const N: usize>(entries: [(&'static str, Option<f64>); N]) -> Vec<MeasurementRow> {
    entries
        .into_iter()
        .map(|(label, value)| MeasurementRow {
            label: label.to_string(),
            value: number(value),
        })
        .collect()
}

impl AssessmentReport {
    /// Assemble the report. `today` is the date the patient's age is taken on.
    pub fn build(
        patient: &Patient,
        appointment: &Appointment,
        assessment: &Assessment,
        today: NaiveDate,
    ) -> Self {
        let file_name = format!(
            "assessment-{}-{}.pdf",
            patient.name.replace(' ', "_"),
            appointment.scheduled_at.format("%d-%m-%Y_%H-%M")
        );

        Self {
            assessment_id: assessment.assessment_id.clone(),
            patient: PatientSection {
                name: patient.name.clone(),
                age: patient.age_on(today),
                sex: patient.sex.label().to_string(),
                national_id: or_placeholder(&patient.national_id, NOT_PROVIDED),
                phone: or_placeholder(&patient.phone, NOT_PROVIDED),
                email: or_placeholder(&patient.email, NOT_PROVIDED),
                address: or_placeholder(&patient.address, NOT_PROVIDED),
                notes: or_placeholder(&patient.notes, EMPTY),
            },
            appointment: AppointmentSection {
                date: appointment.scheduled_at.format("%d/%m/%Y %H:%M").to_string(),
                weight_kg: number(appointment.weight_kg),
                height_m: number(appointment.height_m),
                bmi: number(appointment.bmi()),
                bmr: number(appointment.bmr()),
                fee: format!("{:.2}", appointment.fee),
                completed: if appointment.completed { "Yes" } else { "No" }.to_string(),
                notes: or_placeholder(&appointment.notes, EMPTY),
            },
            skinfolds: rows(assessment.skinfolds.entries()),
            circumferences: rows(assessment.circumferences.entries()),
            notes: or_placeholder(&assessment.notes, EMPTY),
            file_name,
        }
    }

    /// Download name: `assessment-{name}-{dd-mm-YYYY_HH-MM}.pdf`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Report lines in print order. Blank lines separate sections.
    pub fn to_text(&self) -> Vec<String> {
        let p = &self.patient;
        let a = &self.appointment;
        let mut lines = vec![
            "Physical Assessment Report".to_string(),
            String::new(),
            "Patient".to_string(),
            format!("Name: {}", p.name),
            format!("Age: {} years", p.age),
            format!("Sex: {}", p.sex),
            format!("National ID: {}", p.national_id),
            format!("Phone: {}", p.phone),
            format!("E-mail: {}", p.email),
            format!("Address: {}", p.address),
            format!("Additional information: {}", p.notes),
            String::new(),
            "Appointment".to_string(),
            format!("Date: {}", a.date),
            format!("Weight: {} kg", a.weight_kg),
            format!("Height: {} m", a.height_m),
            format!("BMI: {}", a.bmi),
            format!("BMR: {}", a.bmr),
            format!("Fee: {}", a.fee),
            format!("Completed: {}", a.completed),
            format!("Notes: {}", a.notes),
            String::new(),
            "Skinfolds (mm)".to_string(),
        ];

        lines.extend(self.skinfolds.iter().map(|r| format!("{}: {}", r.label, r.value)));
        lines.push(String::new());
        lines.push("Circumferences (cm)".to_string());
        lines.extend(self.circumferences.iter().map(|r| format!("{}: {}", r.label, r.value)));
        lines.push(String::new());
        lines.push("Assessment notes".to_string());
        lines.push(self.notes.clone());
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentInput, AssessmentInput, Sex};
    use chrono::{TimeZone, Utc};

    fn fixture() -> (Patient, Appointment, Assessment) {
        let patient = Patient::new(
            "Maria da Silva".into(),
            NaiveDate::from_ymd_opt(1990, 6, 15).unwrap(),
            Sex::Female,
        );

        let mut input = AppointmentInput::new(
            patient.patient_id.clone(),
            Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap(),
        );
        input.weight_kg = Some(60.0);
        input.height_m = Some(1.65);
        input.fee = 150.0;
        let mut appointment = Appointment::new(input);
        appointment.recompute_metrics(&patient, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());

        let mut assessment_input = AssessmentInput::default();
        assessment_input.skinfolds.triceps = Some(12.5);
        let assessment = Assessment::new(appointment.appointment_id.clone(), assessment_input);

        (patient, appointment, assessment)
    }

    #[test]
    fn test_file_name() {
        let (patient, appointment, assessment) = fixture();
        let report = AssessmentReport::build(
            &patient,
            &appointment,
            &assessment,
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        );
        assert_eq!(report.file_name(), "assessment-Maria_da_Silva-05-03-2024_14-30.pdf");
    }

    #[test]
    fn test_placeholders_and_stored_metrics() {
        let (patient, appointment, assessment) = fixture();
        let report = AssessmentReport::build(
            &patient,
            &appointment,
            &assessment,
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        );

        assert_eq!(report.patient.age, 33);
        assert_eq!(report.patient.sex, "Female");
        assert_eq!(report.patient.national_id, NOT_PROVIDED);
        assert_eq!(report.patient.notes, EMPTY);
        assert_eq!(report.appointment.date, "05/03/2024 14:30");
        assert_eq!(report.appointment.bmi, number(appointment.bmi()));
        assert_eq!(report.appointment.completed, "No");
        assert_eq!(report.skinfolds.len(), 7);
        assert_eq!(report.circumferences.len(), 12);
        assert_eq!(report.notes, EMPTY);

        let triceps = report.skinfolds.iter().find(|r| r.label == "Triceps").unwrap();
        assert_eq!(triceps.value, "12.50");
        assert!(report.skinfolds.iter().filter(|r| r.value == EMPTY).count() == 6);
    }

    #[test]
    fn test_text_order() {
        let (patient, appointment, assessment) = fixture();
        let report = AssessmentReport::build(
            &patient,
            &appointment,
            &assessment,
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        );
        let text = report.to_text();

        assert_eq!(text[0], "Physical Assessment Report");
        assert!(text.contains(&"Name: Maria da Silva".to_string()));
        assert!(text.contains(&"Age: 33 years".to_string()));
        assert!(text.contains(&"Weight: 60.00 kg".to_string()));
        assert!(text.contains(&"Triceps: 12.50".to_string()));
        assert_eq!(text.last().map(String::as_str), Some(EMPTY));

        let skin = text.iter().position(|l| l == "Skinfolds (mm)").unwrap();
        let circ = text.iter().position(|l| l == "Circumferences (cm)").unwrap();
        assert!(skin < circ);
    }

    #[test]
    fn test_json_has_sections() {
        let (patient, appointment, assessment) = fixture();
        let report = AssessmentReport::build(
            &patient,
            &appointment,
            &assessment,
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        );
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["patient"]["name"], "Maria da Silva");
        assert_eq!(json["appointment"]["fee"], "150.00");
        assert_eq!(json["file_name"], report.file_name());
    }
}
