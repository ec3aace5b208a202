//! Field-level validation for record input.

use super::{ClinicError, ClinicResult};
use crate::models::{AppointmentInput, AssessmentInput, PatientInput};

const MAX_NAME_LEN: usize = 150;
const MAX_NATIONAL_ID_LEN: usize = 14;
const MAX_PHONE_LEN: usize = 20;
const MAX_ADDRESS_LEN: usize = 255;
const MAX_EMAIL_LEN: usize = 254;

/// Upper bound for 5-digit, 2-decimal quantities (weight, fee, measurements).
const MAX_QUANTITY: f64 = 999.99;
/// Upper bound for 4-digit, 2-decimal quantities (height in metres).
const MAX_HEIGHT_M: f64 = 99.99;

/// Trim a free-text field; blank becomes `None`.
pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim every text field of a patient input.
pub(crate) fn normalize_patient(mut input: PatientInput) -> PatientInput {
    input.name = input.name.trim().to_string();
    input.national_id = normalize_optional(input.national_id);
    input.phone = normalize_optional(input.phone);
    input.email = normalize_optional(input.email);
    input.address = normalize_optional(input.address);
    input.notes = normalize_optional(input.notes);
    input
}

pub(crate) fn validate_patient(input: &PatientInput) -> ClinicResult<()> {
    if input.name.is_empty() {
        return Err(invalid("Patient name is required."));
    }
    check_len("Name", &input.name, MAX_NAME_LEN)?;
    if let Some(national_id) = &input.national_id {
        check_len("National ID", national_id, MAX_NATIONAL_ID_LEN)?;
    }
    if let Some(phone) = &input.phone {
        check_len("Phone", phone, MAX_PHONE_LEN)?;
    }
    if let Some(address) = &input.address {
        check_len("Address", address, MAX_ADDRESS_LEN)?;
    }
    if let Some(email) = &input.email {
        check_len("E-mail", email, MAX_EMAIL_LEN)?;
        if !looks_like_email(email) {
            return Err(invalid(format!("Enter a valid e-mail address: {}", email)));
        }
    }
    Ok(())
}

pub(crate) fn validate_appointment(input: &AppointmentInput) -> ClinicResult<()> {
    if input.patient_id.trim().is_empty() {
        return Err(invalid("Appointment patient is required."));
    }
    if !input.fee.is_finite() || input.fee < 0.0 {
        return Err(invalid(
            "The appointment fee must be greater than or equal to 0.",
        ));
    }
    check_quantity("Fee", input.fee, MAX_QUANTITY)?;
    if let Some(weight) = input.weight_kg {
        check_quantity("Weight", weight, MAX_QUANTITY)?;
    }
    if let Some(height) = input.height_m {
        check_quantity("Height", height, MAX_HEIGHT_M)?;
    }
    Ok(())
}

pub(crate) fn validate_assessment(input: &AssessmentInput) -> ClinicResult<()> {
    for (label, value) in input.measurements() {
        if let Some(value) = value {
            check_quantity(label, value, MAX_QUANTITY)?;
        }
    }
    Ok(())
}

fn invalid(message: impl Into<String>) -> ClinicError {
    ClinicError::Validation(message.into())
}

fn check_len(field: &str, value: &str, max: usize) -> ClinicResult<()> {
    if value.chars().count() > max {
        return Err(invalid(format!(
            "{} must have at most {} characters.",
            field, max
        )));
    }
    Ok(())
}

/// Non-negative, at most `max`, at most 2 decimal places.
fn check_quantity(field: &str, value: f64, max: f64) -> ClinicResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(format!("{} must be a non-negative number.", field)));
    }
    if value > max {
        return Err(invalid(format!("{} must be at most {:.2}.", field, max)));
    }
    let cents = value * 100.0;
    if (cents - cents.round()).abs() > 1e-6 {
        return Err(invalid(format!(
            "{} must have at most 2 decimal places.",
            field
        )));
    }
    Ok(())
}

/// Structural check: one `@`, non-empty local part, dotted domain, no spaces.
fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sex;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn patient_input() -> PatientInput {
        PatientInput {
            name: "  Maria Silva ".into(),
            national_id: Some("   ".into()),
            birth_date: NaiveDate::from_ymd_opt(1990, 5, 20).unwrap(),
            sex: Sex::Female,
            phone: Some("(11) 98888-7777".into()),
            email: Some("maria@example.com".into()),
            address: None,
            notes: Some("".into()),
        }
    }

    fn appointment_input() -> AppointmentInput {
        let mut input = AppointmentInput::new(
            "p1".into(),
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        );
        input.weight_kg = Some(70.5);
        input.height_m = Some(1.75);
        input.fee = 150.0;
        input
    }

    #[test]
    fn test_normalize_patient() {
        let input = normalize_patient(patient_input());
        assert_eq!(input.name, "Maria Silva");
        assert_eq!(input.national_id, None);
        assert_eq!(input.notes, None);
        assert!(validate_patient(&input).is_ok());
    }

    #[test]
    fn test_patient_name_required() {
        let mut input = patient_input();
        input.name = "   ".into();
        let input = normalize_patient(input);
        assert!(matches!(validate_patient(&input), Err(ClinicError::Validation(_))));
    }

    #[test]
    fn test_national_id_length() {
        let mut input = patient_input();
        input.national_id = Some("123.456.789-091".into());
        assert!(validate_patient(&input).is_err());
        input.national_id = Some("123.456.789-09".into());
        assert!(validate_patient(&input).is_ok());
    }

    #[test]
    fn test_email_shape() {
        assert!(looks_like_email("ana@clinic.com.br"));
        assert!(!looks_like_email("ana"));
        assert!(!looks_like_email("ana@clinic"));
        assert!(!looks_like_email("@clinic.com"));
        assert!(!looks_like_email("ana@@clinic.com"));
        assert!(!looks_like_email("ana maria@clinic.com"));
    }

    #[test]
    fn test_negative_fee_rejected() {
        let mut input = appointment_input();
        input.fee = -0.01;
        match validate_appointment(&input) {
            Err(ClinicError::Validation(msg)) => assert!(msg.contains("fee")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_fee_allowed() {
        let mut input = appointment_input();
        input.fee = 0.0;
        assert!(validate_appointment(&input).is_ok());
    }

    #[test]
    fn test_quantity_bounds_and_precision() {
        let mut input = appointment_input();
        input.height_m = Some(100.0);
        assert!(validate_appointment(&input).is_err());

        let mut input = appointment_input();
        input.weight_kg = Some(70.123);
        assert!(validate_appointment(&input).is_err());

        let mut input = appointment_input();
        input.weight_kg = Some(-70.0);
        assert!(validate_appointment(&input).is_err());

        let mut input = appointment_input();
        input.weight_kg = Some(0.1 + 0.2); // 0.30000000000000004
        assert!(validate_appointment(&input).is_ok());
    }

    #[test]
    fn test_assessment_measurements() {
        let mut input = AssessmentInput::default();
        assert!(validate_assessment(&input).is_ok());

        input.skinfolds.triceps = Some(12.25);
        input.circumferences.hip = Some(101.4);
        assert!(validate_assessment(&input).is_ok());

        input.circumferences.calf_right = Some(-3.0);
        match validate_assessment(&input) {
            Err(ClinicError::Validation(msg)) => assert!(msg.starts_with("Calf (right)")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
