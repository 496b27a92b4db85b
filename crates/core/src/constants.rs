//! Constants used throughout the triage core crate.
//!
//! Path and filename constants live here so the on-disk layout is defined in one place.

/// Directory name (under the patient data dir) holding sharded patient records.
pub const PATIENTS_DIR_NAME: &str = "patients";

/// Default directory for patient data storage when no explicit directory is configured.
pub const DEFAULT_PATIENT_DATA_DIR: &str = "patient_data";

/// Filename for a patient's record within its sharded directory.
pub const RECORD_JSON_FILENAME: &str = "record.json";

/// Filename of the per-patient advisory lock file.
pub const LOCK_FILENAME: &str = ".lock";

/// Default number of attempts for a contended read-modify-write before giving up.
pub const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 5;

/// Default backoff between write attempts, in milliseconds (multiplied by attempt number).
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 25;

/// Default number of visits (including the current one) examined for recurring symptoms.
pub const DEFAULT_RECURRENCE_WINDOW: usize = 5;

/// Oldest age accepted at onboarding.
pub const MAX_PATIENT_AGE: u32 = 130;
