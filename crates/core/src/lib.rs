//! # Triage Core
//!
//! Deterministic clinical triage logic, called as tools by an external conversational
//! coordinator:
//! - Patient records with sharded JSON storage and safe concurrent mutation
//! - A symptom/condition knowledge base with red-flag detection
//! - Risk stratification into triage tiers, with an explanation
//! - Care recommendations and recurring/escalating symptom patterns
//!
//! **No transport concerns**: the tool envelope, CLI and stdin host live in `triage-tools`,
//! `triage-cli` and the `triage-run` binary.

pub mod config;
pub mod constants;
pub mod consultation;
pub mod error;
pub mod knowledge;
pub mod pattern;
pub mod recommendation;
pub mod record;
pub mod repositories;
pub mod risk;
pub mod risk_factors;
pub mod symptom;

pub use config::{ConfigValues, CoreConfig};
pub use consultation::{Consultation, ConsultationRequest, ConsultationService, PatientContext};
pub use error::{ErrorKind, TriageError, TriageResult};
pub use knowledge::{
    Catalogue, Classification, Condition, ConditionCandidate, ConditionMatches,
    SymptomKnowledgeBase,
};
pub use pattern::{PatternReport, PatternSignal, SymptomPatternAnalyzer};
pub use recommendation::{CareRecommendation, CareRecommendationGenerator, CareSetting, Timeline};
pub use record::{
    Demographics, ExerciseFrequency, HistoryCategory, HistoryEntry, IntakeLevel, Lifestyle,
    LifestyleUpdate, Onboarding, PatientDirectoryEntry, PatientRecord, ProfileAmendment,
    RiskFactorEntry, VisitSummary, WorkEnvironment,
};
pub use repositories::{
    FilePatientStore, ImportReport, InMemoryPatientStore, PatientRecordStore, SkippedEntry,
};
pub use risk::{
    Contribution, ContributionKind, RiskAssessment, RiskAssessmentEngine, RiskInput,
    ScoringPolicy,
};
pub use risk_factors::{derive_risk_factors, RiskFactor, RiskProfile};
pub use symptom::{Symptom, TriageTier};

pub use triage_types::{NonEmptyText, Severity, TextError};
pub use triage_uuid::PatientId;
