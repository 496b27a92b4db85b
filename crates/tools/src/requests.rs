//! Typed tool arguments.
//!
//! Every request rejects unknown fields so a coordinator typo surfaces as `invalid_input`
//! instead of being silently ignored. Domain types from `triage-core` appear in the schema as
//! plain strings or objects.

use serde::Deserialize;
use triage_core::{
    ExerciseFrequency, HistoryEntry, IntakeLevel, Lifestyle, LifestyleUpdate, PatientId,
    RiskFactorEntry, Severity, Symptom, TriageError, TriageResult, TriageTier, WorkEnvironment,
};
use utoipa::ToSchema;

/// Marker a coordinator may send when it has not identified the patient yet.
pub const UNKNOWN_PATIENT: &str = "unknown";

/// A symptom as reported: either a bare name or a name with qualifiers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SymptomInput {
    Name(String),
    Detailed(DetailedSymptom),
}

#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct DetailedSymptom {
    pub name: String,
    /// 0 to 10.
    #[serde(default)]
    pub severity: Option<i64>,
    #[serde(default)]
    pub duration: Option<String>,
}

impl TryFrom<SymptomInput> for Symptom {
    type Error = TriageError;

    fn try_from(input: SymptomInput) -> TriageResult<Self> {
        match input {
            SymptomInput::Name(name) => Symptom::new(&name),
            SymptomInput::Detailed(d) => {
                let mut symptom = Symptom::new(&d.name)?;
                if let Some(raw) = d.severity {
                    symptom = symptom.with_severity(Severity::new(raw)?);
                }
                if let Some(duration) = d.duration {
                    symptom = symptom.with_duration(duration);
                }
                Ok(symptom)
            }
        }
    }
}

/// Converts raw inputs, failing on the first bad entry.
pub fn parse_symptoms(inputs: Vec<SymptomInput>) -> TriageResult<Vec<Symptom>> {
    inputs.into_iter().map(Symptom::try_from).collect()
}

pub fn parse_patient_id(raw: &str) -> TriageResult<PatientId> {
    Ok(PatientId::parse(raw)?)
}

/// Like [`parse_patient_id`], but the `unknown` marker is reserved for anonymous callers.
pub fn parse_new_patient_id(raw: &str) -> TriageResult<PatientId> {
    if raw.trim().eq_ignore_ascii_case(UNKNOWN_PATIENT) {
        return Err(TriageError::InvalidInput(format!(
            "'{UNKNOWN_PATIENT}' is reserved for anonymous consultations"
        )));
    }
    parse_patient_id(raw)
}

/// `None`, blank, or the `unknown` marker all mean an anonymous patient.
pub fn parse_optional_patient(raw: Option<&str>) -> TriageResult<Option<PatientId>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case(UNKNOWN_PATIENT) => Ok(None),
        Some(s) => parse_patient_id(s).map(Some),
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PatientRequest {
    #[schema(example = "sarah")]
    pub patient_id: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ListPatientsRequest {}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchPatientsRequest {
    #[schema(example = "rob")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct OnboardPatientRequest {
    /// Preferred key such as a first name; a UUID is allocated when omitted.
    #[serde(default)]
    pub patient_id: Option<String>,
    pub name: String,
    pub age: u32,
    pub occupation: String,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub lifestyle: Option<Lifestyle>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub medical_history: Vec<HistoryEntry>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub risk_factors: Vec<RiskFactorEntry>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateLifestyleRequest {
    pub patient_id: String,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "desk")]
    pub work_environment: Option<WorkEnvironment>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "weekly")]
    pub exercise_frequency: Option<ExerciseFrequency>,
    #[serde(default)]
    pub sleep_hours: Option<f32>,
    #[serde(default)]
    pub stress_level: Option<u8>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "high")]
    pub caffeine_intake: Option<IntakeLevel>,
}

impl UpdateLifestyleRequest {
    pub fn to_update(&self) -> LifestyleUpdate {
        LifestyleUpdate {
            work_environment: self.work_environment,
            exercise_frequency: self.exercise_frequency,
            sleep_hours: self.sleep_hours,
            stress_level: self.stress_level,
            caffeine_intake: self.caffeine_intake,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AmendProfileRequest {
    pub patient_id: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub add_history: Vec<HistoryEntry>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub add_risk_factors: Vec<RiskFactorEntry>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RecordVisitRequest {
    pub patient_id: String,
    #[schema(value_type = Vec<Object>)]
    pub symptoms: Vec<SymptomInput>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub resolved: bool,
}

/// Arguments shared by the knowledge-base tools.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SymptomsRequest {
    #[schema(value_type = Vec<Object>)]
    pub symptoms: Vec<SymptomInput>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AnalyzePatternRequest {
    pub patient_id: String,
    #[schema(value_type = Vec<Object>)]
    pub symptoms: Vec<SymptomInput>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AssessRiskRequest {
    /// Omit or send `"unknown"` for an anonymous assessment.
    #[serde(default)]
    pub patient_id: Option<String>,
    #[schema(value_type = Vec<Object>)]
    pub symptoms: Vec<SymptomInput>,
    /// Only used when the patient is anonymous.
    #[serde(default)]
    pub age: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RecommendCareRequest {
    #[schema(value_type = String, example = "URGENT")]
    pub tier: TriageTier,
    /// Used to pick condition-specific actions.
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub symptoms: Vec<SymptomInput>,
    /// When given, the patient's risk factors add management advice.
    #[serde(default)]
    pub patient_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RunConsultationRequest {
    #[serde(default)]
    pub patient_id: Option<String>,
    #[schema(value_type = Vec<Object>)]
    pub symptoms: Vec<SymptomInput>,
    #[serde(default)]
    pub age: Option<u32>,
    /// Defaults to true for a known patient; ignored for anonymous consultations.
    #[serde(default)]
    pub record_visit: Option<bool>,
    #[serde(default)]
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_symptom_input_accepts_both_shapes() {
        let inputs: Vec<SymptomInput> = serde_json::from_value(json!([
            "Sore Throat",
            {"name": "headache", "severity": 7, "duration": "3 days"}
        ]))
        .unwrap();
        let symptoms = parse_symptoms(inputs).unwrap();
        assert_eq!(symptoms[0].name, "sore_throat");
        assert_eq!(symptoms[1].severity.map(Severity::value), Some(7));
        assert_eq!(symptoms[1].duration.as_deref(), Some("3 days"));
    }

    #[test]
    fn test_out_of_range_severity_rejected() {
        let inputs: Vec<SymptomInput> =
            serde_json::from_value(json!([{"name": "headache", "severity": 11}])).unwrap();
        let err = parse_symptoms(inputs).unwrap_err();
        assert_eq!(err.kind(), triage_core::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_unknown_marker_is_anonymous() {
        assert_eq!(parse_optional_patient(Some("unknown")).unwrap(), None);
        assert_eq!(parse_optional_patient(Some("  ")).unwrap(), None);
        assert_eq!(parse_optional_patient(None).unwrap(), None);
        assert_eq!(
            parse_optional_patient(Some("Sarah")).unwrap().unwrap().as_str(),
            "sarah"
        );
    }

    #[test]
    fn test_unknown_marker_is_not_a_new_identifier() {
        for raw in ["unknown", "UNKNOWN", " Unknown "] {
            let err = parse_new_patient_id(raw).unwrap_err();
            assert_eq!(err.kind(), triage_core::ErrorKind::InvalidInput);
        }
        assert_eq!(parse_new_patient_id("unknown_1").unwrap().as_str(), "unknown_1");
    }

    #[test]
    fn test_record_visit_has_no_caller_tier() {
        let result: Result<RecordVisitRequest, _> = serde_json::from_value(json!({
            "patient_id": "sarah",
            "symptoms": ["headache"],
            "tier": "SELF_CARE",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<PatientRequest, _> =
            serde_json::from_value(json!({"patient_id": "sarah", "patiant": "x"}));
        assert!(result.is_err());
    }
}
