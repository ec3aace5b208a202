//! Record operation integration tests.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use nutri_core::clinic::{ClinicError, ClinicRecords};
use nutri_core::db::Database;
use nutri_core::models::{Appointment, AppointmentInput, AssessmentInput, Patient, PatientInput, Sex};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, month, day, hour, 0, 0).unwrap()
}

fn intake(name: &str, sex: Sex) -> PatientInput {
    PatientInput {
        name: name.to_string(),
        national_id: None,
        birth_date: date(1990, 1, 1),
        sex,
        phone: None,
        email: None,
        address: None,
        notes: None,
    }
}

fn visit(patient: &Patient, scheduled_at: DateTime<Utc>) -> AppointmentInput {
    let mut input = AppointmentInput::new(patient.patient_id.clone(), scheduled_at);
    input.weight_kg = Some(70.0);
    input.height_m = Some(1.75);
    input.fee = 180.0;
    input
}

#[test]
fn test_full_visit_workflow() -> Result<()> {
    let db = Database::open_in_memory()?;
    let records = ClinicRecords::new(&db).with_reference_date(date(2020, 1, 8));

    let patient = records.register_patient(intake("João Souza", Sex::Male))?;
    let appointment = records.schedule_appointment(visit(&patient, at(3, 1, 10)))?;
    assert_eq!(appointment.bmi(), Some(22.86));
    assert_eq!(appointment.bmr(), Some(1695.36));
    assert!(!appointment.completed);

    let mut input = AssessmentInput::default();
    input.skinfolds.triceps = Some(14.0);
    input.circumferences.waist = Some(82.5);
    let assessment = records.record_assessment(&appointment.appointment_id, input)?;

    let completed = records.mark_completed(&appointment.appointment_id)?;
    assert!(completed.completed);

    let report = records.assessment_report(&assessment.assessment_id)?;
    assert_eq!(report.appointment.bmi, "22.86");
    assert_eq!(report.appointment.completed, "Yes");
    Ok(())
}

#[test]
fn test_weight_change_refreshes_metrics() -> Result<()> {
    let db = Database::open_in_memory()?;
    let records = ClinicRecords::new(&db).with_reference_date(date(2020, 1, 8));
    let patient = records.register_patient(intake("Ana", Sex::Female))?;
    let appointment = records.schedule_appointment(visit(&patient, at(3, 1, 10)))?;

    let mut input = visit(&patient, at(3, 1, 10));
    input.weight_kg = Some(60.0);
    input.height_m = Some(1.65);
    let updated = records.update_appointment(&appointment.appointment_id, input)?;
    assert_eq!(updated.bmr(), Some(1382.1));

    // Clearing the height clears both metrics
    let mut input = visit(&patient, at(3, 1, 10));
    input.height_m = None;
    let cleared = records.update_appointment(&appointment.appointment_id, input)?;
    assert_eq!(cleared.bmi(), None);
    assert_eq!(cleared.bmr(), None);

    let stored = records.get_appointment(&appointment.appointment_id)?;
    assert_eq!(stored.bmi(), None);
    Ok(())
}

#[test]
fn test_patient_edit_leaves_stored_metrics() -> Result<()> {
    let db = Database::open_in_memory()?;
    let records = ClinicRecords::new(&db).with_reference_date(date(2020, 1, 8));
    let patient = records.register_patient(intake("Ana", Sex::Male))?;
    let appointment = records.schedule_appointment(visit(&patient, at(3, 1, 10)))?;
    let before = appointment.bmr();

    records.update_patient(&patient.patient_id, intake("Ana", Sex::Female))?;
    let stored = records.get_appointment(&appointment.appointment_id)?;
    assert_eq!(stored.bmr(), before);

    // The next save picks the new sex up
    let resaved = records.update_appointment(&appointment.appointment_id, visit(&patient, at(3, 1, 10)))?;
    assert_ne!(resaved.bmr(), before);
    Ok(())
}

#[test]
fn test_forged_metrics_never_reach_storage() -> Result<()> {
    let db = Database::open_in_memory()?;
    let records = ClinicRecords::new(&db).with_reference_date(date(2020, 1, 8));
    let patient = records.register_patient(intake("João", Sex::Male))?;
    let appointment = records.schedule_appointment(visit(&patient, at(3, 1, 10)))?;

    let mut value = serde_json::to_value(&appointment)?;
    value["bmi"] = serde_json::json!(99.0);
    let forged: Appointment = serde_json::from_value(value)?;
    assert_eq!(forged.bmi(), None);

    // The only write path recomputes from the raw fields
    let mut input = AppointmentInput::new(forged.patient_id.clone(), forged.scheduled_at);
    input.weight_kg = forged.weight_kg;
    input.height_m = forged.height_m;
    input.fee = forged.fee;
    records.update_appointment(&forged.appointment_id, input)?;

    let stored = records.get_appointment(&appointment.appointment_id)?;
    assert_eq!(stored.bmi(), Some(22.86));
    Ok(())
}

#[test]
fn test_conflicts_are_per_patient_and_exact() -> Result<()> {
    let db = Database::open_in_memory()?;
    let records = ClinicRecords::new(&db);
    let joao = records.register_patient(intake("João", Sex::Male))?;
    let ana = records.register_patient(intake("Ana", Sex::Female))?;

    records.schedule_appointment(visit(&joao, at(3, 1, 10)))?;

    let err = records
        .schedule_appointment(visit(&joao, at(3, 1, 10)))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Validation failed: An appointment for this patient is already scheduled at this time."
    );

    records.schedule_appointment(visit(&joao, at(3, 1, 11)))?;
    records.schedule_appointment(visit(&ana, at(3, 1, 10)))?;

    assert_eq!(records.patient_history(&joao.patient_id)?.len(), 2);
    assert_eq!(records.patient_history(&ana.patient_id)?.len(), 1);
    Ok(())
}

#[test]
fn test_list_and_history_ordering() -> Result<()> {
    let db = Database::open_in_memory()?;
    let records = ClinicRecords::new(&db);
    let patient = records.register_patient(intake("Ana", Sex::Female))?;

    let early = records.schedule_appointment(visit(&patient, at(1, 10, 9)))?;
    let middle = records.schedule_appointment(visit(&patient, at(2, 10, 9)))?;
    let late = records.schedule_appointment(visit(&patient, at(3, 10, 9)))?;
    records.mark_completed(&late.appointment_id)?;

    let listed: Vec<String> = records
        .list_appointments()?
        .into_iter()
        .map(|a| a.appointment_id)
        .collect();
    assert_eq!(
        listed,
        vec![
            middle.appointment_id.clone(),
            early.appointment_id.clone(),
            late.appointment_id.clone()
        ]
    );

    let history: Vec<String> = records
        .patient_history(&patient.patient_id)?
        .into_iter()
        .map(|a| a.appointment_id)
        .collect();
    assert_eq!(history, vec![early.appointment_id, middle.appointment_id, late.appointment_id]);
    Ok(())
}

#[test]
fn test_delete_patient_cascades() -> Result<()> {
    let db = Database::open_in_memory()?;
    let records = ClinicRecords::new(&db);
    let patient = records.register_patient(intake("Ana", Sex::Female))?;
    let appointment = records.schedule_appointment(visit(&patient, at(3, 1, 10)))?;
    let assessment =
        records.record_assessment(&appointment.appointment_id, AssessmentInput::default())?;

    records.delete_patient(&patient.patient_id)?;

    assert!(matches!(
        records.get_appointment(&appointment.appointment_id),
        Err(ClinicError::NotFound(_))
    ));
    assert!(matches!(
        records.get_assessment(&assessment.assessment_id),
        Err(ClinicError::NotFound(_))
    ));
    assert!(matches!(
        records.delete_patient(&patient.patient_id),
        Err(ClinicError::NotFound(_))
    ));
    Ok(())
}

#[test]
fn test_delete_appointment_cascades_to_assessment() -> Result<()> {
    let db = Database::open_in_memory()?;
    let records = ClinicRecords::new(&db);
    let patient = records.register_patient(intake("Ana", Sex::Female))?;
    let appointment = records.schedule_appointment(visit(&patient, at(3, 1, 10)))?;
    let assessment =
        records.record_assessment(&appointment.appointment_id, AssessmentInput::default())?;

    records.delete_appointment(&appointment.appointment_id)?;
    assert!(records.get_assessment(&assessment.assessment_id).is_err());
    assert!(records.get_patient(&patient.patient_id).is_ok());
    Ok(())
}

#[test]
fn test_invalid_input_writes_nothing() -> Result<()> {
    let db = Database::open_in_memory()?;
    let records = ClinicRecords::new(&db);
    let patient = records.register_patient(intake("Ana", Sex::Female))?;

    let mut input = visit(&patient, at(3, 1, 10));
    input.fee = -1.0;
    assert!(matches!(
        records.schedule_appointment(input),
        Err(ClinicError::Validation(_))
    ));

    let mut input = visit(&patient, at(3, 1, 10));
    input.weight_kg = Some(70.123);
    assert!(matches!(
        records.schedule_appointment(input),
        Err(ClinicError::Validation(_))
    ));

    assert!(records.list_appointments()?.is_empty());

    let mut bad_email = intake("Bia", Sex::Female);
    bad_email.email = Some("bia-at-example".into());
    assert!(matches!(
        records.register_patient(bad_email),
        Err(ClinicError::Validation(_))
    ));

    let blank = intake("   ", Sex::Female);
    assert!(matches!(
        records.register_patient(blank),
        Err(ClinicError::Validation(_))
    ));
    assert_eq!(records.list_patients()?.len(), 1);
    Ok(())
}

#[test]
fn test_assessment_update_and_lookup() -> Result<()> {
    let db = Database::open_in_memory()?;
    let records = ClinicRecords::new(&db);
    let patient = records.register_patient(intake("Ana", Sex::Female))?;
    let appointment = records.schedule_appointment(visit(&patient, at(3, 1, 10)))?;
    let assessment =
        records.record_assessment(&appointment.appointment_id, AssessmentInput::default())?;

    let mut input = AssessmentInput::default();
    input.circumferences.hip = Some(98.0);
    input.notes = Some("  Follow up in 30 days  ".into());
    let updated = records.update_assessment(&assessment.assessment_id, input)?;
    assert_eq!(updated.circumferences.hip, Some(98.0));
    assert_eq!(updated.notes.as_deref(), Some("Follow up in 30 days"));

    let found = records.assessment_for_appointment(&appointment.appointment_id)?;
    assert_eq!(found.assessment_id, assessment.assessment_id);
    assert_eq!(found.circumferences.hip, Some(98.0));

    let mut negative = AssessmentInput::default();
    negative.skinfolds.thigh = Some(-2.0);
    assert!(matches!(
        records.update_assessment(&assessment.assessment_id, negative),
        Err(ClinicError::Validation(_))
    ));
    Ok(())
}

#[test]
fn test_search() -> Result<()> {
    let db = Database::open_in_memory()?;
    let records = ClinicRecords::new(&db);

    let mut maria = intake("Maria Clara", Sex::Female);
    maria.phone = Some("(11) 98888-1234".into());
    let maria = records.register_patient(maria)?;
    let pedro = records.register_patient(intake("Pedro", Sex::Male))?;

    assert_eq!(records.search_patients("clara", 10)?.len(), 1);
    assert_eq!(records.search_patients("98888", 10)?.len(), 1);
    assert!(records.search_patients("100%", 10)?.is_empty());

    records.schedule_appointment(visit(&maria, at(3, 1, 10)))?;
    records.schedule_appointment(visit(&pedro, at(4, 2, 10)))?;

    let by_name = records.search_appointments("maria", 10)?;
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].patient_id, maria.patient_id);

    let by_date = records.search_appointments("2024-04", 10)?;
    assert_eq!(by_date.len(), 1);
    assert_eq!(by_date[0].patient_id, pedro.patient_id);
    Ok(())
}

#[test]
fn test_file_database_persists() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("clinic.db");

    let appointment_id = {
        let db = Database::open(&path)?;
        let records = ClinicRecords::new(&db);
        let patient = records.register_patient(intake("Ana", Sex::Female))?;
        records.schedule_appointment(visit(&patient, at(3, 1, 10)))?.appointment_id
    };

    let db = Database::open(&path)?;
    let records = ClinicRecords::new(&db);
    let stored = records.get_appointment(&appointment_id)?;
    assert_eq!(stored.scheduled_at, at(3, 1, 10));
    assert_eq!(stored.bmi(), Some(22.86));
    Ok(())
}
