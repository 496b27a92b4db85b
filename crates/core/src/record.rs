//! Patient record data model.
//!
//! A [`PatientRecord`] is owned exclusively by a [`PatientRecordStore`](crate::PatientRecordStore);
//! everything else receives clones. Records are persisted as JSON; only optional sections carry
//! serde defaults.

use crate::constants::MAX_PATIENT_AGE;
use crate::symptom::{Symptom, TriageTier};
use crate::{TriageError, TriageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use triage_types::NonEmptyText;
use triage_uuid::PatientId;

/// Who the patient is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub name: NonEmptyText,
    pub age: u32,
    pub occupation: NonEmptyText,
}

impl Demographics {
    /// # Errors
    ///
    /// Returns `TriageError::InvalidInput` for blank name/occupation or an implausible age.
    pub fn new(name: &str, age: u32, occupation: &str) -> TriageResult<Self> {
        let demographics = Self {
            name: NonEmptyText::new(name)?,
            age,
            occupation: NonEmptyText::new(occupation)?,
        };
        demographics.validate()?;
        Ok(demographics)
    }

    pub fn validate(&self) -> TriageResult<()> {
        if self.age > MAX_PATIENT_AGE {
            return Err(TriageError::InvalidInput(format!(
                "age must be between 0 and {}",
                MAX_PATIENT_AGE
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkEnvironment {
    Desk,
    Manual,
    Outdoor,
    Clinical,
    Mixed,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseFrequency {
    None,
    Occasional,
    Weekly,
    Daily,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeLevel {
    None,
    Low,
    Moderate,
    High,
}

/// Lifestyle attributes. Every field is optional because patients often only share some.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lifestyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_environment: Option<WorkEnvironment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_frequency: Option<ExerciseFrequency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_hours: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stress_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caffeine_intake: Option<IntakeLevel>,
}

impl Lifestyle {
    pub fn validate(&self) -> TriageResult<()> {
        validate_sleep_hours(self.sleep_hours)?;
        validate_stress_level(self.stress_level)
    }

    /// Merges every field present in `update`, leaving the rest untouched.
    pub fn merge(&mut self, update: &LifestyleUpdate) {
        if let Some(v) = update.work_environment {
            self.work_environment = Some(v);
        }
        if let Some(v) = update.exercise_frequency {
            self.exercise_frequency = Some(v);
        }
        if let Some(v) = update.sleep_hours {
            self.sleep_hours = Some(v);
        }
        if let Some(v) = update.stress_level {
            self.stress_level = Some(v);
        }
        if let Some(v) = update.caffeine_intake {
            self.caffeine_intake = Some(v);
        }
    }
}

/// Partial lifestyle change; `None` means "not supplied", never "clear".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifestyleUpdate {
    #[serde(default)]
    pub work_environment: Option<WorkEnvironment>,
    #[serde(default)]
    pub exercise_frequency: Option<ExerciseFrequency>,
    #[serde(default)]
    pub sleep_hours: Option<f32>,
    #[serde(default)]
    pub stress_level: Option<u8>,
    #[serde(default)]
    pub caffeine_intake: Option<IntakeLevel>,
}

impl LifestyleUpdate {
    pub fn validate(&self) -> TriageResult<()> {
        if self.is_empty() {
            return Err(TriageError::InvalidInput(
                "lifestyle update must change at least one field".into(),
            ));
        }
        validate_sleep_hours(self.sleep_hours)?;
        validate_stress_level(self.stress_level)
    }

    pub fn is_empty(&self) -> bool {
        self.work_environment.is_none()
            && self.exercise_frequency.is_none()
            && self.sleep_hours.is_none()
            && self.stress_level.is_none()
            && self.caffeine_intake.is_none()
    }
}

fn validate_sleep_hours(value: Option<f32>) -> TriageResult<()> {
    match value {
        Some(h) if !h.is_finite() || !(0.0..=24.0).contains(&h) => Err(
            TriageError::InvalidInput("sleep_hours must be between 0 and 24".into()),
        ),
        _ => Ok(()),
    }
}

fn validate_stress_level(value: Option<u8>) -> TriageResult<()> {
    match value {
        Some(s) if s > 10 => Err(TriageError::InvalidInput(
            "stress_level must be between 0 and 10".into(),
        )),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryCategory {
    ChronicCondition,
    PastProcedure,
    PastIllness,
}

/// One line of medical history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub description: NonEmptyText,
    pub category: HistoryCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
}

impl HistoryEntry {
    pub fn chronic(description: &str) -> TriageResult<Self> {
        Ok(Self {
            description: NonEmptyText::new(description)?,
            category: HistoryCategory::ChronicCondition,
            since: None,
        })
    }
}

/// Recorded risk factor, as captured from the patient.
///
/// Derived, scoring-oriented factors are computed from these by
/// [`derive_risk_factors`](crate::risk_factors::derive_risk_factors).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RiskFactorEntry {
    Smoking {
        years: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        packs_per_day: Option<f32>,
        /// Months since quitting; `None` for a current smoker.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quit_months_ago: Option<u32>,
    },
    FamilyHistory {
        condition: NonEmptyText,
    },
    OccupationalExposure {
        exposure: NonEmptyText,
    },
    Other {
        description: NonEmptyText,
    },
}

impl RiskFactorEntry {
    pub fn validate(&self) -> TriageResult<()> {
        if let RiskFactorEntry::Smoking {
            packs_per_day: Some(p),
            ..
        } = self
        {
            if !p.is_finite() || *p < 0.0 {
                return Err(TriageError::InvalidInput(
                    "packs_per_day must be a non-negative number".into(),
                ));
            }
        }
        Ok(())
    }

    /// Pack-years for a smoking entry; one pack a day is assumed when unknown.
    pub fn pack_years(&self) -> Option<f32> {
        match self {
            RiskFactorEntry::Smoking {
                years,
                packs_per_day,
                ..
            } => Some(*years as f32 * packs_per_day.unwrap_or(1.0)),
            _ => None,
        }
    }
}

/// An immutable summary of one completed assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitSummary {
    pub recorded_at: DateTime<Utc>,
    pub symptoms: Vec<Symptom>,
    pub tier: TriageTier,
    pub recommendation: String,
    #[serde(default)]
    pub note: String,
    /// Set when the clinician closed the episode; resolved visits never count as recurring.
    #[serde(default)]
    pub resolved: bool,
}

impl VisitSummary {
    /// Builds a visit stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns `TriageError::InvalidInput` when no symptoms are given.
    pub fn new(
        symptoms: Vec<Symptom>,
        tier: TriageTier,
        recommendation: impl Into<String>,
        note: impl Into<String>,
    ) -> TriageResult<Self> {
        if symptoms.is_empty() {
            return Err(TriageError::InvalidInput(
                "a visit must record at least one symptom".into(),
            ));
        }
        Ok(Self {
            recorded_at: Utc::now(),
            symptoms,
            tier,
            recommendation: recommendation.into(),
            note: note.into(),
            resolved: false,
        })
    }

    pub fn resolved(mut self) -> Self {
        self.resolved = true;
        self
    }

    pub fn has_symptom(&self, name: &str) -> bool {
        self.symptoms.iter().any(|s| s.name == name)
    }
}

/// Everything supplied when a new patient is onboarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Onboarding {
    /// Preferred key (e.g. a first name); a UUID is allocated when absent.
    pub identifier: Option<PatientId>,
    pub demographics: Demographics,
    pub lifestyle: Lifestyle,
    pub medical_history: Vec<HistoryEntry>,
    pub risk_factors: Vec<RiskFactorEntry>,
    pub notes: Option<String>,
}

impl Onboarding {
    pub fn new(demographics: Demographics, lifestyle: Lifestyle) -> Self {
        Self {
            identifier: None,
            demographics,
            lifestyle,
            medical_history: Vec::new(),
            risk_factors: Vec::new(),
            notes: None,
        }
    }

    pub fn with_identifier(mut self, id: PatientId) -> Self {
        self.identifier = Some(id);
        self
    }

    pub fn with_risk_factor(mut self, entry: RiskFactorEntry) -> Self {
        self.risk_factors.push(entry);
        self
    }

    pub fn with_history(mut self, entry: HistoryEntry) -> Self {
        self.medical_history.push(entry);
        self
    }

    pub fn validate(&self) -> TriageResult<()> {
        self.demographics.validate()?;
        self.lifestyle.validate()?;
        for entry in &self.risk_factors {
            entry.validate()?;
        }
        Ok(())
    }

    /// Turns the onboarding request into a first-revision record.
    pub(crate) fn into_record(self, id: PatientId, enrolled_at: DateTime<Utc>) -> PatientRecord {
        let notes = self.notes.unwrap_or_else(|| {
            format!(
                "New patient - {}, {}, {}",
                self.demographics.name, self.demographics.age, self.demographics.occupation
            )
        });
        PatientRecord {
            id,
            demographics: self.demographics,
            lifestyle: self.lifestyle,
            medical_history: self.medical_history,
            risk_factors: self.risk_factors,
            notes,
            visits: Vec::new(),
            enrolled_at,
            revision: 1,
        }
    }
}

/// Additive changes to the clinical profile. History and risk factors are only ever appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileAmendment {
    pub age: Option<u32>,
    pub occupation: Option<NonEmptyText>,
    pub notes: Option<String>,
    pub add_history: Vec<HistoryEntry>,
    pub add_risk_factors: Vec<RiskFactorEntry>,
}

impl ProfileAmendment {
    pub fn validate(&self) -> TriageResult<()> {
        if self.age.is_none()
            && self.occupation.is_none()
            && self.notes.is_none()
            && self.add_history.is_empty()
            && self.add_risk_factors.is_empty()
        {
            return Err(TriageError::InvalidInput(
                "profile amendment must change at least one field".into(),
            ));
        }
        if let Some(age) = self.age {
            if age > MAX_PATIENT_AGE {
                return Err(TriageError::InvalidInput(format!(
                    "age must be between 0 and {}",
                    MAX_PATIENT_AGE
                )));
            }
        }
        for entry in &self.add_risk_factors {
            entry.validate()?;
        }
        Ok(())
    }

    pub(crate) fn apply(&self, record: &mut PatientRecord) {
        if let Some(age) = self.age {
            record.demographics.age = age;
        }
        if let Some(occupation) = &self.occupation {
            record.demographics.occupation = occupation.clone();
        }
        if let Some(notes) = &self.notes {
            record.notes = notes.clone();
        }
        record.medical_history.extend(self.add_history.iter().cloned());
        record
            .risk_factors
            .extend(self.add_risk_factors.iter().cloned());
    }
}

/// The durable patient record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: PatientId,
    pub demographics: Demographics,
    #[serde(default)]
    pub lifestyle: Lifestyle,
    #[serde(default)]
    pub medical_history: Vec<HistoryEntry>,
    #[serde(default)]
    pub risk_factors: Vec<RiskFactorEntry>,
    #[serde(default)]
    pub notes: String,
    /// Insertion-ordered and append-only.
    #[serde(default)]
    pub visits: Vec<VisitSummary>,
    pub enrolled_at: DateTime<Utc>,
    /// Bumped on every successful write; used for optimistic concurrency.
    pub revision: u64,
}

impl PatientRecord {
    pub fn directory_entry(&self) -> PatientDirectoryEntry {
        PatientDirectoryEntry {
            id: self.id.clone(),
            name: self.demographics.name.to_string(),
        }
    }

    pub fn last_visit(&self) -> Option<&VisitSummary> {
        self.visits.last()
    }

    /// Structural checks that serde cannot express.
    pub fn validate(&self) -> TriageResult<()> {
        self.demographics.validate()?;
        self.lifestyle.validate()?;
        if self.revision == 0 {
            return Err(TriageError::InvalidInput("revision must start at 1".into()));
        }
        Ok(())
    }
}

/// One row of the patient directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientDirectoryEntry {
    pub id: PatientId,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sarah() -> Onboarding {
        Onboarding::new(
            Demographics::new("Sarah", 28, "software engineer").unwrap(),
            Lifestyle {
                work_environment: Some(WorkEnvironment::Desk),
                caffeine_intake: Some(IntakeLevel::High),
                sleep_hours: Some(6.5),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_demographics_rejects_implausible_age() {
        assert!(Demographics::new("Old", 131, "retired").is_err());
        assert!(Demographics::new("Newborn", 0, "none").is_ok());
    }

    #[test]
    fn test_lifestyle_merge_keeps_unsupplied_fields() {
        let mut lifestyle = sarah().lifestyle;
        lifestyle.merge(&LifestyleUpdate {
            stress_level: Some(8),
            ..Default::default()
        });
        assert_eq!(lifestyle.stress_level, Some(8));
        assert_eq!(lifestyle.work_environment, Some(WorkEnvironment::Desk));
        assert_eq!(lifestyle.caffeine_intake, Some(IntakeLevel::High));
    }

    #[test]
    fn test_lifestyle_update_validation() {
        assert!(LifestyleUpdate::default().validate().is_err());
        let bad_sleep = LifestyleUpdate {
            sleep_hours: Some(-1.0),
            ..Default::default()
        };
        assert!(bad_sleep.validate().is_err());
        let bad_stress = LifestyleUpdate {
            stress_level: Some(11),
            ..Default::default()
        };
        assert!(bad_stress.validate().is_err());
    }

    #[test]
    fn test_into_record_starts_empty() {
        let id = PatientId::parse("sarah").unwrap();
        let record = sarah().into_record(id.clone(), Utc::now());
        assert_eq!(record.id, id);
        assert!(record.visits.is_empty());
        assert_eq!(record.revision, 1);
        assert_eq!(record.notes, "New patient - Sarah, 28, software engineer");
    }

    #[test]
    fn test_pack_years() {
        let entry = RiskFactorEntry::Smoking {
            years: 20,
            packs_per_day: None,
            quit_months_ago: Some(6),
        };
        assert_eq!(entry.pack_years(), Some(20.0));

        let half = RiskFactorEntry::Smoking {
            years: 10,
            packs_per_day: Some(0.5),
            quit_months_ago: None,
        };
        assert_eq!(half.pack_years(), Some(5.0));
    }

    #[test]
    fn test_record_json_round_trip() {
        let record = sarah()
            .with_risk_factor(RiskFactorEntry::Smoking {
                years: 3,
                packs_per_day: Some(0.5),
                quit_months_ago: Some(40),
            })
            .with_history(HistoryEntry::chronic("asthma").unwrap())
            .into_record(PatientId::parse("sarah").unwrap(), Utc::now());

        let json = serde_json::to_string_pretty(&record).unwrap();
        let back: PatientRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_record_missing_required_field_fails_to_parse() {
        let json = r#"{"id": "sarah", "revision": 1}"#;
        assert!(serde_json::from_str::<PatientRecord>(json).is_err());
    }

    #[test]
    fn test_visit_requires_symptoms() {
        assert!(VisitSummary::new(vec![], TriageTier::Routine, "rest", "").is_err());
    }

    #[test]
    fn test_amendment_must_change_something() {
        assert!(ProfileAmendment::default().validate().is_err());
        let amendment = ProfileAmendment {
            add_history: vec![HistoryEntry::chronic("hypertension").unwrap()],
            ..Default::default()
        };
        assert!(amendment.validate().is_ok());
    }
}
