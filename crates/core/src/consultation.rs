//! One full triage turn.
//!
//! Chains the components in the order a coordinator would call them: patient lookup, condition
//! matching, red flags, pattern analysis, risk assessment, recommendation, clarifying
//! questions, and finally the visit write-back.

use crate::config::CoreConfig;
use crate::knowledge::SymptomKnowledgeBase;
use crate::pattern::{PatternReport, SymptomPatternAnalyzer};
use crate::record::{PatientDirectoryEntry, PatientRecord, VisitSummary};
use crate::recommendation::{CareRecommendation, CareRecommendationGenerator};
use crate::repositories::PatientRecordStore;
use crate::risk::{RiskAssessment, RiskAssessmentEngine, RiskInput};
use crate::risk_factors::{derive_risk_factors, RiskFactor};
use crate::symptom::Symptom;
use crate::{TriageError, TriageResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use triage_uuid::PatientId;

#[derive(Debug, Clone, PartialEq)]
pub struct ConsultationRequest {
    /// Known patient; `None` runs an anonymous consultation that is never stored.
    pub patient: Option<PatientId>,
    pub symptoms: Vec<Symptom>,
    /// Used only for anonymous consultations; a stored record's age takes precedence.
    pub age: Option<u32>,
    pub record_visit: bool,
    pub note: Option<String>,
}

impl ConsultationRequest {
    pub fn for_patient(id: PatientId, symptoms: Vec<Symptom>) -> Self {
        Self {
            patient: Some(id),
            symptoms,
            age: None,
            record_visit: true,
            note: None,
        }
    }

    pub fn anonymous(symptoms: Vec<Symptom>, age: Option<u32>) -> Self {
        Self {
            patient: None,
            symptoms,
            age,
            record_visit: false,
            note: None,
        }
    }
}

/// Everything produced by a consultation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consultation {
    pub patient: Option<PatientDirectoryEntry>,
    pub risk_factors: Vec<RiskFactor>,
    pub pattern: PatternReport,
    pub assessment: RiskAssessment,
    pub recommendation: CareRecommendation,
    pub clarifying_questions: Vec<String>,
    pub visit_recorded: bool,
}

/// Patient context gathered before scoring.
#[derive(Debug, Clone, Default)]
pub struct PatientContext {
    pub record: Option<PatientRecord>,
    pub age: Option<u32>,
    pub risk_factors: BTreeSet<RiskFactor>,
}

#[derive(Clone)]
pub struct ConsultationService {
    store: Arc<dyn PatientRecordStore>,
    kb: Arc<SymptomKnowledgeBase>,
    engine: RiskAssessmentEngine,
    analyzer: SymptomPatternAnalyzer,
    generator: CareRecommendationGenerator,
}

impl ConsultationService {
    pub fn new(
        cfg: Arc<CoreConfig>,
        store: Arc<dyn PatientRecordStore>,
        kb: Arc<SymptomKnowledgeBase>,
    ) -> Self {
        Self {
            engine: RiskAssessmentEngine::new(Arc::clone(&kb)),
            analyzer: SymptomPatternAnalyzer::new(Arc::clone(&kb), cfg.recurrence_window()),
            generator: CareRecommendationGenerator::new(),
            store,
            kb,
        }
    }

    pub fn store(&self) -> &Arc<dyn PatientRecordStore> {
        &self.store
    }

    pub fn knowledge_base(&self) -> &SymptomKnowledgeBase {
        &self.kb
    }

    pub fn engine(&self) -> &RiskAssessmentEngine {
        &self.engine
    }

    pub fn analyzer(&self) -> &SymptomPatternAnalyzer {
        &self.analyzer
    }

    pub fn generator(&self) -> &CareRecommendationGenerator {
        &self.generator
    }

    /// Loads the record (if any) and derives the inputs the risk engine needs from it.
    pub fn context(
        &self,
        patient: Option<&PatientId>,
        fallback_age: Option<u32>,
    ) -> TriageResult<PatientContext> {
        match patient {
            Some(id) => {
                let record = self.store.lookup(id)?;
                Ok(PatientContext {
                    age: Some(record.demographics.age),
                    risk_factors: derive_risk_factors(&record),
                    record: Some(record),
                })
            }
            None => Ok(PatientContext {
                record: None,
                age: fallback_age,
                risk_factors: BTreeSet::new(),
            }),
        }
    }

    /// Pattern analysis against the patient's stored visits; empty history when anonymous.
    pub fn pattern(&self, context: &PatientContext, symptoms: &[Symptom]) -> PatternReport {
        let history = context
            .record
            .as_ref()
            .map(|r| r.visits.as_slice())
            .unwrap_or_default();
        self.analyzer.analyze(symptoms, history)
    }

    /// Red flags, pattern and scoring for one symptom set.
    pub fn assess(
        &self,
        context: &PatientContext,
        symptoms: &[Symptom],
    ) -> TriageResult<(RiskAssessment, PatternReport)> {
        if symptoms.is_empty() {
            return Err(TriageError::InvalidInput(
                "at least one symptom is required".into(),
            ));
        }
        let red_flags = self.kb.detect_red_flags(symptoms);
        let pattern = self.pattern(context, symptoms);
        let assessment = self.engine.assess(&RiskInput {
            symptoms,
            age: context.age,
            risk_factors: &context.risk_factors,
            red_flags: &red_flags,
            pattern: pattern.signal,
        })?;
        Ok((assessment, pattern))
    }

    /// Runs a full consultation, appending the visit when requested for a known patient.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an empty symptom list; store errors (`PatientNotFound`,
    /// `ConcurrentWriteConflict`, ...) are passed through unchanged.
    pub fn consult(&self, request: ConsultationRequest) -> TriageResult<Consultation> {
        if request.symptoms.is_empty() {
            return Err(TriageError::InvalidInput(
                "at least one symptom is required".into(),
            ));
        }

        let context = self.context(request.patient.as_ref(), request.age)?;
        let (assessment, pattern) = self.assess(&context, &request.symptoms)?;
        let recommendation = self.generator.recommend(
            assessment.tier,
            &assessment.candidates,
            &context.risk_factors,
        );
        let clarifying_questions = self.kb.clarifying_questions(&request.symptoms);

        let mut visit_recorded = false;
        if let (true, Some(record)) = (request.record_visit, context.record.as_ref()) {
            let visit = VisitSummary::new(
                request.symptoms.clone(),
                assessment.tier,
                recommendation.summary(),
                request.note.clone().unwrap_or_default(),
            )?;
            self.store.append_visit(&record.id, visit)?;
            visit_recorded = true;
        }

        tracing::info!(
            patient_id = context.record.as_ref().map(|r| r.id.as_str()).unwrap_or("anonymous"),
            tier = %assessment.tier,
            visit_recorded,
            "consultation complete"
        );

        Ok(Consultation {
            patient: context.record.as_ref().map(PatientRecord::directory_entry),
            risk_factors: context.risk_factors.into_iter().collect(),
            pattern,
            assessment,
            recommendation,
            clarifying_questions,
            visit_recorded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{
        Demographics, IntakeLevel, Lifestyle, Onboarding, RiskFactorEntry, WorkEnvironment,
    };
    use crate::repositories::{FilePatientStore, InMemoryPatientStore};
    use crate::symptom::TriageTier;
    use crate::ErrorKind;
    use tempfile::TempDir;

    fn service_with(store: Arc<dyn PatientRecordStore>) -> ConsultationService {
        ConsultationService::new(
            Arc::new(CoreConfig::default()),
            store,
            Arc::new(SymptomKnowledgeBase::builtin()),
        )
    }

    fn symptoms(names: &[&str]) -> Vec<Symptom> {
        names.iter().map(|n| Symptom::new(n).unwrap()).collect()
    }

    fn robert(smoker: bool) -> Onboarding {
        let onboarding = Onboarding::new(
            Demographics::new("Robert", 52, "accountant").unwrap(),
            Lifestyle::default(),
        );
        if smoker {
            onboarding.with_risk_factor(RiskFactorEntry::Smoking {
                years: 20,
                packs_per_day: None,
                quit_months_ago: Some(6),
            })
        } else {
            onboarding
        }
    }

    #[test]
    fn test_sarah_scenario() {
        let store: Arc<dyn PatientRecordStore> = Arc::new(InMemoryPatientStore::new());
        let service = service_with(Arc::clone(&store));
        let sarah = store
            .onboard(
                Onboarding::new(
                    Demographics::new("Sarah", 28, "software engineer").unwrap(),
                    Lifestyle {
                        work_environment: Some(WorkEnvironment::Desk),
                        caffeine_intake: Some(IntakeLevel::High),
                        ..Default::default()
                    },
                )
                .with_identifier(PatientId::parse("sarah").unwrap()),
            )
            .unwrap();

        let result = service
            .consult(ConsultationRequest::for_patient(
                sarah.id.clone(),
                symptoms(&["headache"]),
            ))
            .unwrap();

        assert!(result
            .assessment
            .candidates
            .iter()
            .any(|c| c.id == "computer_vision_strain"));
        assert!(result.assessment.red_flags.is_empty());
        assert!(matches!(
            result.assessment.tier,
            TriageTier::Routine | TriageTier::SelfCare
        ));
        let actions = result.recommendation.actions.join(" ").to_lowercase();
        assert!(actions.contains("ergonomic"));
        assert!(actions.contains("caffeine"));
        assert!(!result.clarifying_questions.is_empty());
        assert!(result.visit_recorded);
        assert_eq!(store.lookup(&sarah.id).unwrap().visits.len(), 1);
    }

    #[test]
    fn test_robert_scenario() {
        let store: Arc<dyn PatientRecordStore> = Arc::new(InMemoryPatientStore::new());
        let service = service_with(Arc::clone(&store));
        let smoker = store
            .onboard(robert(true).with_identifier(PatientId::parse("robert").unwrap()))
            .unwrap();
        let never = store
            .onboard(robert(false).with_identifier(PatientId::parse("robert2").unwrap()))
            .unwrap();

        let cough = symptoms(&["cough"]);
        let with = service
            .consult(ConsultationRequest::for_patient(smoker.id, cough.clone()))
            .unwrap();
        let without = service
            .consult(ConsultationRequest::for_patient(never.id, cough))
            .unwrap();

        assert!(with.assessment.tier > without.assessment.tier);
        assert!(with
            .recommendation
            .actions
            .iter()
            .any(|a| a.contains("imaging")));
    }

    #[test]
    fn test_alex_unknown_then_onboarded() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = Arc::new(CoreConfig::new(temp_dir.path().to_path_buf()));
        let store: Arc<dyn PatientRecordStore> = Arc::new(FilePatientStore::new(cfg.clone()));
        let service = ConsultationService::new(
            cfg,
            Arc::clone(&store),
            Arc::new(SymptomKnowledgeBase::builtin()),
        );

        let alex = PatientId::parse("Alex").unwrap();
        let err = service
            .consult(ConsultationRequest::for_patient(alex, symptoms(&["fever"])))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PatientNotFound);

        let created = store
            .onboard(Onboarding::new(
                Demographics::new("Alex", 35, "librarian").unwrap(),
                Lifestyle::default(),
            ))
            .unwrap();
        assert!(store.lookup(&created.id).is_ok());

        let first = service
            .consult(ConsultationRequest::for_patient(created.id.clone(), symptoms(&["fever"])))
            .unwrap();
        let second = service
            .consult(ConsultationRequest::for_patient(created.id.clone(), symptoms(&["fever"])))
            .unwrap();
        assert_eq!(first.pattern.signal, crate::PatternSignal::None);
        assert_eq!(second.pattern.signal, crate::PatternSignal::Recurring);
        assert_eq!(store.lookup(&created.id).unwrap().visits.len(), 2);
    }

    #[test]
    fn test_anonymous_consultation_never_writes() {
        let store = Arc::new(InMemoryPatientStore::new());
        let service = service_with(store.clone());
        let mut request = ConsultationRequest::anonymous(symptoms(&["severe_chest_pain"]), None);
        request.record_visit = true;

        let result = service.consult(request).unwrap();
        assert_eq!(result.assessment.tier, TriageTier::Emergency);
        assert!(!result.visit_recorded);
        assert!(result.patient.is_none());
        assert!(store.list_available().unwrap().is_empty());
    }

    #[test]
    fn test_empty_symptoms_rejected() {
        let service = service_with(Arc::new(InMemoryPatientStore::new()));
        let err = service
            .consult(ConsultationRequest::anonymous(vec![], Some(30)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
