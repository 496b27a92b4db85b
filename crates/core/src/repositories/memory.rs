//! In-process patient store.

use super::helpers::next_enrolment_timestamp;
use super::{validate_visit, PatientRecordStore};
use crate::record::{
    LifestyleUpdate, Onboarding, PatientDirectoryEntry, PatientRecord, ProfileAmendment,
    VisitSummary,
};
use crate::{TriageError, TriageResult};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use triage_uuid::PatientId;

#[derive(Debug, Default)]
struct State {
    records: HashMap<PatientId, PatientRecord>,
    order: Vec<PatientId>,
}

/// Volatile store guarded by a single `RwLock`; writes are serialised by the lock.
#[derive(Debug, Default)]
pub struct InMemoryPatientStore {
    state: RwLock<State>,
}

impl InMemoryPatientStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn modify<F>(&self, id: &PatientId, change: F) -> TriageResult<PatientRecord>
    where
        F: FnOnce(&mut PatientRecord),
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let record = state
            .records
            .get_mut(id)
            .ok_or_else(|| TriageError::PatientNotFound(id.to_string()))?;
        change(record);
        record.revision += 1;
        Ok(record.clone())
    }
}

impl PatientRecordStore for InMemoryPatientStore {
    fn lookup(&self, id: &PatientId) -> TriageResult<PatientRecord> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| TriageError::PatientNotFound(id.to_string()))
    }

    fn list_available(&self) -> TriageResult<Vec<PatientDirectoryEntry>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.records.get(id))
            .map(PatientRecord::directory_entry)
            .collect())
    }

    fn onboard(&self, onboarding: Onboarding) -> TriageResult<PatientRecord> {
        onboarding.validate()?;
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let id = match onboarding.identifier.clone() {
            Some(id) => id,
            None => loop {
                let candidate = PatientId::allocate();
                if !state.records.contains_key(&candidate) {
                    break candidate;
                }
            },
        };
        if state.records.contains_key(&id) {
            return Err(TriageError::DuplicatePatient(id.to_string()));
        }

        let record = onboarding.into_record(id.clone(), next_enrolment_timestamp());
        state.records.insert(id.clone(), record.clone());
        state.order.push(id);
        tracing::info!(patient_id = %record.id, "onboarded patient (in memory)");
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
        self.modify(id, |record| record.visits.push(visit))
    }
}
