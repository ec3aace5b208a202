//! SQLite schema definition.

/// Complete database schema for nutri-core.
pub const SCHEMA: &str = r#"
-- Enable foreign keys (cascading deletes depend on it)
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    patient_id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(name) BETWEEN 1 AND 150),
    national_id TEXT UNIQUE CHECK (national_id IS NULL OR length(national_id) <= 14),
    birth_date TEXT NOT NULL,                    -- YYYY-MM-DD
    sex TEXT NOT NULL CHECK (sex IN ('M', 'F')),
    phone TEXT,
    email TEXT,
    address TEXT,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(name);

-- ============================================================================
-- Appointments
-- ============================================================================

CREATE TABLE IF NOT EXISTS appointments (
    appointment_id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(patient_id) ON DELETE CASCADE,
    scheduled_at TEXT NOT NULL,                  -- RFC 3339, UTC
    weight_kg REAL,
    height_m REAL,
    bmi REAL,                                    -- derived, rewritten on every save
    bmr REAL,                                    -- derived, rewritten on every save
    notes TEXT,
    fee REAL NOT NULL DEFAULT 0 CHECK (fee >= 0),
    completed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (patient_id, scheduled_at)
);

CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(patient_id);
CREATE INDEX IF NOT EXISTS idx_appointments_listing ON appointments(completed, scheduled_at);

-- ============================================================================
-- Assessments (one per appointment)
-- ============================================================================

CREATE TABLE IF NOT EXISTS assessments (
    assessment_id TEXT PRIMARY KEY,
    appointment_id TEXT NOT NULL UNIQUE REFERENCES appointments(appointment_id) ON DELETE CASCADE,
    skinfolds TEXT NOT NULL DEFAULT '{}',        -- JSON object, mm
    circumferences TEXT NOT NULL DEFAULT '{}',   -- JSON object, cm
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
