//! Name-based dispatch over the fixed tool set.

use crate::handlers;
use crate::requests::{
    AmendProfileRequest, AnalyzePatternRequest, AssessRiskRequest, DetailedSymptom,
    ListPatientsRequest, OnboardPatientRequest, PatientRequest, RecommendCareRequest,
    RecordVisitRequest, RunConsultationRequest, SearchPatientsRequest, SymptomsRequest,
    UpdateLifestyleRequest,
};
use crate::response::{ToolResponse, ToolStatus};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use triage_core::{
    ConsultationService, CoreConfig, FilePatientStore, SymptomKnowledgeBase, TriageError,
    TriageResult,
};
use utoipa::OpenApi;

/// Name and one-line purpose of a tool, as advertised to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
}

pub const TOOLS: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "lookup_patient",
        description: "Retrieve a patient record and visit history by identifier",
    },
    ToolDescriptor {
        name: "list_patients",
        description: "List identifiers and names of all known patients",
    },
    ToolDescriptor {
        name: "search_patients",
        description: "Find patients by name, case-insensitively",
    },
    ToolDescriptor {
        name: "onboard_patient",
        description: "Create a new patient record",
    },
    ToolDescriptor {
        name: "update_lifestyle",
        description: "Merge lifestyle changes into a patient record",
    },
    ToolDescriptor {
        name: "amend_profile",
        description: "Change age, occupation or notes and append history or risk factors",
    },
    ToolDescriptor {
        name: "record_visit",
        description: "Assess symptoms and append the resulting visit to a patient's history",
    },
    ToolDescriptor {
        name: "patient_risk_factors",
        description: "Derived risk factors and a prioritised risk profile for a patient",
    },
    ToolDescriptor {
        name: "match_conditions",
        description: "Rank candidate conditions for a set of symptoms",
    },
    ToolDescriptor {
        name: "detect_red_flags",
        description: "Report symptoms or combinations that require emergency care",
    },
    ToolDescriptor {
        name: "clarifying_questions",
        description: "Follow-up questions to ask about the reported symptoms",
    },
    ToolDescriptor {
        name: "analyze_pattern",
        description: "Check current symptoms against the patient's recent visits",
    },
    ToolDescriptor {
        name: "assess_risk",
        description: "Assign a triage tier with score and explanation",
    },
    ToolDescriptor {
        name: "recommend_care",
        description: "Timeline, care setting and actions for a triage tier",
    },
    ToolDescriptor {
        name: "run_consultation",
        description: "Run a full triage turn and store the visit for known patients",
    },
];

/// One line of input for a tool host: `{"tool": "...", "arguments": {...}}`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Triage tools",
        description = "Deterministic triage operations invoked by a conversational coordinator"
    ),
    paths(
        handlers::lookup_patient,
        handlers::list_patients,
        handlers::search_patients,
        handlers::onboard_patient,
        handlers::update_lifestyle,
        handlers::amend_profile,
        handlers::record_visit,
        handlers::patient_risk_factors,
        handlers::match_conditions,
        handlers::detect_red_flags,
        handlers::clarifying_questions,
        handlers::analyze_pattern,
        handlers::assess_risk,
        handlers::recommend_care,
        handlers::run_consultation,
    ),
    components(schemas(
        ToolResponse,
        ToolStatus,
        DetailedSymptom,
        PatientRequest,
        ListPatientsRequest,
        SearchPatientsRequest,
        OnboardPatientRequest,
        UpdateLifestyleRequest,
        AmendProfileRequest,
        RecordVisitRequest,
        SymptomsRequest,
        AnalyzePatternRequest,
        AssessRiskRequest,
        RecommendCareRequest,
        RunConsultationRequest,
    )),
    tags(
        (name = "patients", description = "Patient record store"),
        (name = "knowledge", description = "Symptom knowledge base"),
        (name = "assessment", description = "Risk, patterns and care recommendations")
    )
)]
struct ApiDoc;

/// Routes tool calls to handlers and wraps every outcome in a [`ToolResponse`].
#[derive(Clone)]
pub struct ToolRegistry {
    service: ConsultationService,
}

impl ToolRegistry {
    pub fn new(service: ConsultationService) -> Self {
        Self { service }
    }

    /// Registry backed by the file store and the configured knowledge base.
    ///
    /// # Errors
    ///
    /// Returns an error if an external knowledge base is configured but cannot be loaded.
    pub fn from_config(cfg: Arc<CoreConfig>) -> TriageResult<Self> {
        let kb = Arc::new(SymptomKnowledgeBase::from_config(&cfg)?);
        let store = Arc::new(FilePatientStore::new(Arc::clone(&cfg)));
        Ok(Self::new(ConsultationService::new(cfg, store, kb)))
    }

    pub fn service(&self) -> &ConsultationService {
        &self.service
    }

    pub fn descriptors() -> &'static [ToolDescriptor] {
        TOOLS
    }

    pub fn openapi() -> utoipa::openapi::OpenApi {
        ApiDoc::openapi()
    }

    /// Invokes `name` with JSON `arguments`. Never panics on bad input: unknown tools and
    /// malformed arguments come back as `invalid_input`.
    pub fn dispatch(&self, name: &str, arguments: Value) -> ToolResponse {
        tracing::debug!(tool = name, "dispatching tool call");
        let s = &self.service;
        let result = match name {
            "lookup_patient" => invoke(arguments, |r| handlers::lookup_patient(s, r)),
            "list_patients" => invoke(arguments, |r| handlers::list_patients(s, r)),
            "search_patients" => invoke(arguments, |r| handlers::search_patients(s, r)),
            "onboard_patient" => invoke(arguments, |r| handlers::onboard_patient(s, r)),
            "update_lifestyle" => invoke(arguments, |r| handlers::update_lifestyle(s, r)),
            "amend_profile" => invoke(arguments, |r| handlers::amend_profile(s, r)),
            "record_visit" => invoke(arguments, |r| handlers::record_visit(s, r)),
            "patient_risk_factors" => invoke(arguments, |r| handlers::patient_risk_factors(s, r)),
            "match_conditions" => invoke(arguments, |r| handlers::match_conditions(s, r)),
            "detect_red_flags" => invoke(arguments, |r| handlers::detect_red_flags(s, r)),
            "clarifying_questions" => invoke(arguments, |r| handlers::clarifying_questions(s, r)),
            "analyze_pattern" => invoke(arguments, |r| handlers::analyze_pattern(s, r)),
            "assess_risk" => invoke(arguments, |r| handlers::assess_risk(s, r)),
            "recommend_care" => invoke(arguments, |r| handlers::recommend_care(s, r)),
            "run_consultation" => invoke(arguments, |r| handlers::run_consultation(s, r)),
            other => Err(TriageError::InvalidInput(format!("unknown tool: {other}"))),
        };

        if let Err(e) = &result {
            tracing::warn!(tool = name, error_kind = %e.kind(), "tool call failed: {e}");
        }
        ToolResponse::from(result)
    }

    /// Parses one JSON-lines request and dispatches it.
    pub fn handle_line(&self, line: &str) -> ToolResponse {
        match serde_json::from_str::<ToolCall>(line) {
            Ok(call) => self.dispatch(&call.tool, call.arguments),
            Err(e) => ToolResponse::error(&TriageError::InvalidInput(format!(
                "malformed tool call: {e}"
            ))),
        }
    }
}

fn invoke<Req, F>(arguments: Value, handler: F) -> TriageResult<Value>
where
    Req: DeserializeOwned,
    F: FnOnce(Req) -> TriageResult<Value>,
{
    let arguments = if arguments.is_null() {
        Value::Object(Map::new())
    } else {
        arguments
    };
    let request = serde_json::from_value(arguments)
        .map_err(|e| TriageError::InvalidInput(format!("invalid arguments: {e}")))?;
    handler(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use triage_core::ErrorKind;

    fn registry(temp_dir: &TempDir) -> ToolRegistry {
        let cfg = Arc::new(CoreConfig::new(temp_dir.path().to_path_buf()));
        ToolRegistry::from_config(cfg).expect("registry should build")
    }

    fn ok_data(response: ToolResponse) -> Value {
        assert!(response.is_ok(), "expected ok, got {response:?}");
        response.data.expect("ok responses carry data")
    }

    fn onboard_sarah(reg: &ToolRegistry) {
        ok_data(reg.dispatch(
            "onboard_patient",
            json!({
                "patient_id": "sarah",
                "name": "Sarah",
                "age": 28,
                "occupation": "Software Developer",
                "lifestyle": {
                    "work_environment": "desk",
                    "sleep_hours": 5.5,
                    "stress_level": 8,
                    "caffeine_intake": "high"
                }
            }),
        ));
    }

    #[test]
    fn test_every_descriptor_dispatches() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let reg = registry(&temp_dir);
        for tool in ToolRegistry::descriptors() {
            let response = reg.dispatch(tool.name, json!({"definitely_not_a_field": true}));
            assert_eq!(
                response.error_kind,
                Some(ErrorKind::InvalidInput),
                "{} should reject unknown fields",
                tool.name
            );
            assert!(!response.message.unwrap().contains("unknown tool"));
        }
    }

    #[test]
    fn test_unknown_tool_is_invalid_input() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let response = registry(&temp_dir).dispatch("prescribe", json!({}));
        assert_eq!(response.status, ToolStatus::Error);
        assert_eq!(response.error_kind, Some(ErrorKind::InvalidInput));
    }

    #[test]
    fn test_lookup_missing_patient() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let response =
            registry(&temp_dir).dispatch("lookup_patient", json!({"patient_id": "alex"}));
        assert_eq!(response.error_kind, Some(ErrorKind::PatientNotFound));
    }

    #[test]
    fn test_list_patients_accepts_null_arguments() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let reg = registry(&temp_dir);
        onboard_sarah(&reg);
        let data = ok_data(reg.dispatch("list_patients", Value::Null));
        assert_eq!(data["count"], 1);
        assert_eq!(data["patients"][0]["id"], "sarah");
    }

    #[test]
    fn test_duplicate_onboarding_reported() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let reg = registry(&temp_dir);
        onboard_sarah(&reg);
        let response = reg.dispatch(
            "onboard_patient",
            json!({"patient_id": "Sarah", "name": "Sarah", "age": 29, "occupation": "Designer"}),
        );
        assert_eq!(response.error_kind, Some(ErrorKind::DuplicatePatient));
    }

    #[test]
    fn test_sarah_consultation_is_low_acuity_and_recorded() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let reg = registry(&temp_dir);
        onboard_sarah(&reg);

        let data = ok_data(reg.dispatch(
            "run_consultation",
            json!({"patient_id": "sarah", "symptoms": ["headache"]}),
        ));
        let tier = data["assessment"]["tier"].as_str().unwrap();
        assert!(tier == "SELF_CARE" || tier == "ROUTINE", "unexpected tier {tier}");
        assert_eq!(data["visit_recorded"], true);

        let record = ok_data(reg.dispatch("lookup_patient", json!({"patient_id": "sarah"})));
        assert_eq!(record["visits"].as_array().unwrap().len(), 1);
        assert_eq!(record["visits"][0]["tier"], tier);
    }

    #[test]
    fn test_assess_risk_does_not_write() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let reg = registry(&temp_dir);
        onboard_sarah(&reg);

        ok_data(reg.dispatch(
            "assess_risk",
            json!({"patient_id": "sarah", "symptoms": ["headache"]}),
        ));
        let record = ok_data(reg.dispatch("lookup_patient", json!({"patient_id": "sarah"})));
        assert!(record["visits"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_anonymous_red_flag_is_emergency() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let reg = registry(&temp_dir);
        let data = ok_data(reg.dispatch(
            "run_consultation",
            json!({"patient_id": "unknown", "symptoms": ["severe_bleeding"], "record_visit": true}),
        ));
        assert_eq!(data["assessment"]["tier"], "EMERGENCY");
        assert_eq!(data["visit_recorded"], false);
        assert_eq!(data["recommendation"]["timeline"], "now");
    }

    #[test]
    fn test_record_visit_stores_assessed_tier() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let reg = registry(&temp_dir);
        onboard_sarah(&reg);

        let rejected = reg.dispatch(
            "record_visit",
            json!({
                "patient_id": "sarah",
                "symptoms": ["chest_pain", "shortness_of_breath"],
                "tier": "SELF_CARE",
                "recommendation": "rest at home"
            }),
        );
        assert_eq!(rejected.error_kind, Some(ErrorKind::InvalidInput));

        let record = ok_data(reg.dispatch(
            "record_visit",
            json!({
                "patient_id": "sarah",
                "symptoms": ["chest_pain", "shortness_of_breath"],
                "note": "walk-in"
            }),
        ));
        let visits = record["visits"].as_array().unwrap();
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0]["tier"], "EMERGENCY");
        assert!(visits[0]["recommendation"].as_str().unwrap().starts_with("EMERGENCY"));
        assert_eq!(visits[0]["note"], "walk-in");
    }

    #[test]
    fn test_record_visit_requires_known_patient() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let response = registry(&temp_dir).dispatch(
            "record_visit",
            json!({"patient_id": "alex", "symptoms": ["cough"]}),
        );
        assert_eq!(response.error_kind, Some(ErrorKind::PatientNotFound));
    }

    #[test]
    fn test_onboard_rejects_unknown_marker() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let reg = registry(&temp_dir);
        for id in ["unknown", "UNKNOWN"] {
            let response = reg.dispatch(
                "onboard_patient",
                json!({"patient_id": id, "name": "Nobody", "age": 40, "occupation": "Baker"}),
            );
            assert_eq!(response.error_kind, Some(ErrorKind::InvalidInput), "{id}");
        }
        let listed = ok_data(reg.dispatch("list_patients", json!({})));
        assert_eq!(listed["count"], 0);
    }

    #[test]
    fn test_detect_red_flags_and_questions() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let reg = registry(&temp_dir);

        let flags = ok_data(reg.dispatch(
            "detect_red_flags",
            json!({"symptoms": ["chest pain", "shortness of breath"]}),
        ));
        assert_eq!(flags["emergency"], true);

        let questions = ok_data(reg.dispatch(
            "clarifying_questions",
            json!({"symptoms": [{"name": "headache", "severity": 4}]}),
        ));
        assert!(!questions["questions"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_empty_symptoms_rejected() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let response = registry(&temp_dir).dispatch("assess_risk", json!({"symptoms": []}));
        assert_eq!(response.error_kind, Some(ErrorKind::InvalidInput));
    }

    #[test]
    fn test_handle_line_round_trip() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let reg = registry(&temp_dir);
        let line = r#"{"tool":"match_conditions","arguments":{"symptoms":["cough","fever"]}}"#;
        let response = reg.handle_line(line);
        let data = ok_data(response);
        assert!(!data["candidates"].as_array().unwrap().is_empty());

        let bad = reg.handle_line("not json");
        assert_eq!(bad.error_kind, Some(ErrorKind::InvalidInput));
    }

    #[test]
    fn test_openapi_lists_every_tool() {
        let doc = ToolRegistry::openapi();
        for tool in TOOLS {
            let path = format!("/tools/{}", tool.name);
            assert!(doc.paths.paths.contains_key(&path), "missing {path}");
        }
        assert_eq!(doc.paths.paths.len(), TOOLS.len());
    }
}
