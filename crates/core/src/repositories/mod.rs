//! Patient record storage.
//!
//! [`PatientRecordStore`] is the only way the rest of the crate touches persisted patients.
//! Two implementations are provided:
//!
//! - [`FilePatientStore`]: sharded JSON files with staged atomic writes, a cross-process lock
//!   and optimistic revision checks.
//! - [`InMemoryPatientStore`]: a lock-guarded map, used by tests and anonymous sessions.

mod file;
pub(crate) mod helpers;
mod memory;

pub use file::{FilePatientStore, ImportReport, SkippedEntry};
pub use memory::InMemoryPatientStore;

use crate::record::{
    LifestyleUpdate, Onboarding, PatientDirectoryEntry, PatientRecord, ProfileAmendment,
    VisitSummary,
};
use crate::risk_factors::{derive_risk_factors, RiskFactor, RiskProfile};
use crate::{TriageError, TriageResult};
use std::collections::BTreeSet;
use triage_uuid::PatientId;

/// Durable keyed storage for patient records and their visit history.
///
/// Every mutating call is an atomic read-modify-write: callers never observe a half-applied
/// change, and two writers to the same patient never lose each other's updates.
pub trait PatientRecordStore: Send + Sync {
    /// Exact-key retrieval.
    ///
    /// # Errors
    ///
    /// `PatientNotFound` if no record exists, `MalformedRecord` if the stored data is corrupt.
    fn lookup(&self, id: &PatientId) -> TriageResult<PatientRecord>;

    /// All known patients in enrolment order. Corrupt entries are skipped.
    fn list_available(&self) -> TriageResult<Vec<PatientDirectoryEntry>>;

    /// Creates a record with empty visits.
    ///
    /// # Errors
    ///
    /// `DuplicatePatient` if the caller-supplied identifier is taken, `InvalidInput` if the
    /// onboarding data fails validation.
    fn onboard(&self, onboarding: Onboarding) -> TriageResult<PatientRecord>;

    /// Merges the supplied lifestyle fields; unspecified fields are untouched.
    fn update_lifestyle(
        &self,
        id: &PatientId,
        update: &LifestyleUpdate,
    ) -> TriageResult<PatientRecord>;

    /// Applies demographic changes and appends history and risk-factor entries.
    fn amend_profile(
        &self,
        id: &PatientId,
        amendment: &ProfileAmendment,
    ) -> TriageResult<PatientRecord>;

    /// Appends a visit to the end of the patient's history.
    fn append_visit(&self, id: &PatientId, visit: VisitSummary) -> TriageResult<PatientRecord>;

    /// Case-insensitive name search: exact matches on name or id win; otherwise partial matches.
    fn search_by_name(&self, query: &str) -> TriageResult<Vec<PatientDirectoryEntry>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(TriageError::InvalidInput(
                "search query cannot be empty".into(),
            ));
        }

        let directory = self.list_available()?;
        let exact: Vec<_> = directory
            .iter()
            .filter(|e| e.name.to_lowercase() == needle || e.id.as_str() == needle)
            .cloned()
            .collect();
        if !exact.is_empty() {
            return Ok(exact);
        }

        Ok(directory
            .into_iter()
            .filter(|e| e.name.to_lowercase().contains(&needle) || e.id.as_str().contains(&needle))
            .collect())
    }

    /// Derived risk factors for the risk engine.
    fn risk_factors(&self, id: &PatientId) -> TriageResult<BTreeSet<RiskFactor>> {
        Ok(derive_risk_factors(&self.lookup(id)?))
    }

    /// Risk factors split into priority bands with management advice.
    fn risk_profile(&self, id: &PatientId) -> TriageResult<RiskProfile> {
        Ok(RiskProfile::from_record(&self.lookup(id)?))
    }
}

/// Shared pre-write validation so both stores reject the same inputs.
pub(crate) fn validate_visit(visit: &VisitSummary) -> TriageResult<()> {
    if visit.symptoms.is_empty() {
        return Err(TriageError::InvalidInput(
            "a visit must record at least one symptom".into(),
        ));
    }
    Ok(())
}
