//! File-backed patient store.
//!
//! ```text
//! <patient_data_dir>/patients/<s1>/<s2>/<id>/record.json
//!                                          /.lock
//! ```
//! where `s1`/`s2` are the first four hex characters of the SHA-256 of the identifier.

use super::helpers::{
    next_enrolment_timestamp, sharded_files, try_lock_dir, write_json_atomic, RecordLock,
};
use super::{validate_visit, PatientRecordStore};
use crate::config::CoreConfig;
use crate::constants::{LOCK_FILENAME, RECORD_JSON_FILENAME};
use crate::record::{
    LifestyleUpdate, Onboarding, PatientDirectoryEntry, PatientRecord, ProfileAmendment,
    VisitSummary,
};
use crate::{TriageError, TriageResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use triage_uuid::PatientId;

/// Attempts at allocating an unused identifier before giving up.
const MAX_ALLOCATION_ATTEMPTS: usize = 5;

/// Persistent store keeping one JSON document per patient.
#[derive(Clone, Debug)]
pub struct FilePatientStore {
    cfg: Arc<CoreConfig>,
}

/// Outcome of a snapshot import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: Vec<PatientId>,
    pub skipped: Vec<SkippedEntry>,
}

/// A snapshot entry that was not imported, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub key: String,
    pub reason: String,
}

#[derive(Serialize)]
struct SnapshotOut<'a> {
    patients: BTreeMap<&'a str, &'a PatientRecord>,
}

impl FilePatientStore {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    fn patient_dir(&self, id: &PatientId) -> PathBuf {
        id.sharded_dir(&self.cfg.patients_dir())
    }

    fn read_record(&self, id: &PatientId) -> TriageResult<PatientRecord> {
        let path = self.patient_dir(id).join(RECORD_JSON_FILENAME);
        let record = read_record_file(&path).map_err(|e| match e {
            TriageError::FileRead(ref io_err) if io_err.kind() == io::ErrorKind::NotFound => {
                TriageError::PatientNotFound(id.to_string())
            }
            other => other,
        })?;
        if &record.id != id {
            return Err(TriageError::MalformedRecord {
                path,
                reason: format!("record id {} does not match its location", record.id),
            });
        }
        Ok(record)
    }

    /// Takes the patient lock, retrying on contention with linear backoff.
    fn acquire_lock(&self, id: &PatientId, dir: &Path) -> TriageResult<RecordLock> {
        let attempts = self.cfg.max_write_attempts();
        for attempt in 1..=attempts {
            if let Some(lock) = try_lock_dir(dir, LOCK_FILENAME)? {
                return Ok(lock);
            }
            tracing::debug!(patient_id = %id, attempt, "patient lock contended");
            if attempt < attempts {
                thread::sleep(self.cfg.retry_backoff() * attempt);
            }
        }
        tracing::warn!(patient_id = %id, attempts, "gave up waiting for patient lock");
        Err(TriageError::ConcurrentWriteConflict {
            id: id.to_string(),
            attempts,
        })
    }

    /// Optimistic read-modify-write.
    ///
    /// The record is read and changed without holding the lock; the result is only committed if
    /// the on-disk revision is still the one that was read. A lost race is retried from a fresh
    /// read until `max_write_attempts` is exhausted.
    fn modify<F>(&self, id: &PatientId, change: F) -> TriageResult<PatientRecord>
    where
        F: Fn(&mut PatientRecord),
    {
        let attempts = self.cfg.max_write_attempts();
        let dir = self.patient_dir(id);

        for attempt in 1..=attempts {
            let current = self.read_record(id)?;
            let mut next = current.clone();
            change(&mut next);
            next.revision = current.revision + 1;

            if let Some(_lock) = try_lock_dir(&dir, LOCK_FILENAME)? {
                let on_disk = self.read_record(id)?;
                if on_disk.revision == current.revision {
                    write_json_atomic(&dir, RECORD_JSON_FILENAME, &next)?;
                    return Ok(next);
                }
                tracing::debug!(
                    patient_id = %id,
                    attempt,
                    expected = current.revision,
                    found = on_disk.revision,
                    "revision moved underneath write, retrying"
                );
            } else {
                tracing::debug!(patient_id = %id, attempt, "patient lock contended, retrying");
            }

            if attempt < attempts {
                thread::sleep(self.cfg.retry_backoff() * attempt);
            }
        }

        tracing::warn!(patient_id = %id, attempts, "write abandoned after repeated conflicts");
        Err(TriageError::ConcurrentWriteConflict {
            id: id.to_string(),
            attempts,
        })
    }

    /// Loads every readable record, skipping corrupt ones with a warning.
    fn load_all(&self) -> Vec<PatientRecord> {
        let mut records = Vec::new();
        for path in sharded_files(&self.cfg.patients_dir(), RECORD_JSON_FILENAME) {
            match read_record_file(&path) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("skipping unreadable patient record: {}", e);
                }
            }
        }
        records.sort_by(|a, b| {
            a.enrolled_at
                .cmp(&b.enrolled_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        records
    }

    fn claim_new_id(&self, requested: Option<PatientId>) -> TriageResult<PatientId> {
        if let Some(id) = requested {
            return Ok(id);
        }
        for _ in 0..MAX_ALLOCATION_ATTEMPTS {
            let id = PatientId::allocate();
            if !self.patient_dir(&id).join(RECORD_JSON_FILENAME).exists() {
                return Ok(id);
            }
        }
        Err(TriageError::PatientDirCreation(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "failed to allocate an unused patient identifier",
        )))
    }

    /// Writes a complete record for a patient that does not exist yet.
    fn create(&self, record: &PatientRecord) -> TriageResult<()> {
        let dir = self.patient_dir(&record.id);
        fs::create_dir_all(&dir).map_err(TriageError::PatientDirCreation)?;
        let _lock = self.acquire_lock(&record.id, &dir)?;
        if dir.join(RECORD_JSON_FILENAME).exists() {
            return Err(TriageError::DuplicatePatient(record.id.to_string()));
        }
        write_json_atomic(&dir, RECORD_JSON_FILENAME, record)
    }

    /// Writes every readable record to `path` as `{"patients": {<id>: record}}`.
    ///
    /// Returns the number of records exported.
    ///
    /// # Errors
    ///
    /// Returns `TriageError::InvalidInput` if `path` has no parent directory, or a storage
    /// error if the snapshot cannot be written.
    pub fn export_snapshot(&self, path: &Path) -> TriageResult<usize> {
        let (dir, name) = split_target(path)?;
        let records = self.load_all();
        let snapshot = SnapshotOut {
            patients: records.iter().map(|r| (r.id.as_str(), r)).collect(),
        };
        fs::create_dir_all(&dir).map_err(TriageError::FileWrite)?;
        write_json_atomic(&dir, &name, &snapshot)?;
        tracing::info!(count = records.len(), path = %path.display(), "exported snapshot");
        Ok(records.len())
    }

    /// Imports patients from a snapshot in the export layout.
    ///
    /// Each entry is validated on its own: entries that are malformed, whose key does not match
    /// the record id, or whose patient already exists are skipped and listed in the report.
    ///
    /// # Errors
    ///
    /// `MalformedRecord` if the file is not JSON or lacks a `patients` object; storage errors
    /// from individual writes are propagated.
    pub fn import_snapshot(&self, path: &Path) -> TriageResult<ImportReport> {
        let contents = fs::read_to_string(path).map_err(TriageError::FileRead)?;
        let malformed = |reason: String| TriageError::MalformedRecord {
            path: path.to_path_buf(),
            reason,
        };
        let root: serde_json::Value =
            serde_json::from_str(&contents).map_err(|e| malformed(e.to_string()))?;
        let patients = root
            .get("patients")
            .and_then(|p| p.as_object())
            .ok_or_else(|| malformed("missing top-level \"patients\" object".into()))?;

        let mut report = ImportReport::default();
        for (key, value) in patients {
            let skip = |reason: String| SkippedEntry {
                key: key.clone(),
                reason,
            };
            let record = match serde_json::from_value::<PatientRecord>(value.clone()) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(key = %key, "skipping malformed snapshot entry: {}", e);
                    report.skipped.push(skip(e.to_string()));
                    continue;
                }
            };
            if record.id.as_str() != key {
                report
                    .skipped
                    .push(skip(format!("key does not match record id {}", record.id)));
                continue;
            }
            if let Err(e) = record.validate() {
                report.skipped.push(skip(e.to_string()));
                continue;
            }
            match self.create(&record) {
                Ok(()) => report.imported.push(record.id),
                Err(e @ TriageError::DuplicatePatient(_)) => {
                    report.skipped.push(skip(e.to_string()))
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            imported = report.imported.len(),
            skipped = report.skipped.len(),
            "imported snapshot"
        );
        Ok(report)
    }
}

fn split_target(path: &Path) -> TriageResult<(PathBuf, String)> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| TriageError::InvalidInput("snapshot path needs a file name".into()))?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, name.to_string()))
}

/// Parses and validates one `record.json`.
fn read_record_file(path: &Path) -> TriageResult<PatientRecord> {
    let contents = fs::read_to_string(path).map_err(TriageError::FileRead)?;
    let record: PatientRecord =
        serde_json::from_str(&contents).map_err(|e| TriageError::MalformedRecord {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    record
        .validate()
        .map_err(|e| TriageError::MalformedRecord {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(record)
}

impl PatientRecordStore for FilePatientStore {
    fn lookup(&self, id: &PatientId) -> TriageResult<PatientRecord> {
        self.read_record(id)
    }

    fn list_available(&self) -> TriageResult<Vec<PatientDirectoryEntry>> {
        Ok(self
            .load_all()
            .iter()
            .map(PatientRecord::directory_entry)
            .collect())
    }

    fn onboard(&self, onboarding: Onboarding) -> TriageResult<PatientRecord> {
        onboarding.validate()?;
        let id = self.claim_new_id(onboarding.identifier.clone())?;
        let record = onboarding.into_record(id, next_enrolment_timestamp());
        self.create(&record)?;
        tracing::info!(patient_id = %record.id, "onboarded patient");
        Ok(record)
    }

    fn update_lifestyle(
        &self,
        id: &PatientId,
        update: &LifestyleUpdate,
    ) -> TriageResult<PatientRecord> {
        update.validate()?;
        self.modify(id, |record| record.lifestyle.merge(update))
    }

    fn amend_profile(
        &self,
        id: &PatientId,
        amendment: &ProfileAmendment,
    ) -> TriageResult<PatientRecord> {
        amendment.validate()?;
        self.modify(id, |record| amendment.apply(record))
    }

    fn append_visit(&self, id: &PatientId, visit: VisitSummary) -> TriageResult<PatientRecord> {
        validate_visit(&visit)?;
        let record = self.modify(id, |record| record.visits.push(visit.clone()))?;
        tracing::info!(
            patient_id = %id,
            tier = %visit.tier,
            visits = record.visits.len(),
            "recorded visit"
        );
        Ok(record)
    }
}
