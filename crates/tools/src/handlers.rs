//! One function per tool.
//!
//! Each handler takes already-deserialised arguments and returns the `data` payload of a
//! successful [`crate::ToolResponse`]. The `#[utoipa::path]` annotations describe the tools as
//! `POST /tools/<name>` operations so coordinators can discover their argument schemas.

use crate::requests::{
    parse_new_patient_id, parse_optional_patient, parse_patient_id, parse_symptoms,
    AmendProfileRequest,
    AnalyzePatternRequest, AssessRiskRequest, ListPatientsRequest, OnboardPatientRequest,
    PatientRequest, RecommendCareRequest, RecordVisitRequest, RunConsultationRequest,
    SearchPatientsRequest, SymptomInput, SymptomsRequest, UpdateLifestyleRequest,
};
use crate::response::ToolResponse;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use triage_core::{
    ConsultationRequest, ConsultationService, Demographics, NonEmptyText, Onboarding,
    ProfileAmendment, RiskProfile, Symptom, TriageError, TriageResult, VisitSummary,
};

fn to_data<T: Serialize>(value: &T) -> TriageResult<Value> {
    serde_json::to_value(value).map_err(TriageError::Serialization)
}

fn required_symptoms(inputs: Vec<SymptomInput>) -> TriageResult<Vec<Symptom>> {
    let symptoms = parse_symptoms(inputs)?;
    if symptoms.is_empty() {
        return Err(TriageError::InvalidInput(
            "at least one symptom is required".into(),
        ));
    }
    Ok(symptoms)
}

#[utoipa::path(
    post,
    path = "/tools/lookup_patient",
    tag = "patients",
    request_body = PatientRequest,
    responses(
        (status = 200, description = "Full patient record, or patient_not_found", body = ToolResponse)
    )
)]
/// Exact-key retrieval of a patient record, including visit history.
pub fn lookup_patient(service: &ConsultationService, req: PatientRequest) -> TriageResult<Value> {
    let id = parse_patient_id(&req.patient_id)?;
    to_data(&service.store().lookup(&id)?)
}

#[utoipa::path(
    post,
    path = "/tools/list_patients",
    tag = "patients",
    request_body = ListPatientsRequest,
    responses(
        (status = 200, description = "Identifier and name of every patient", body = ToolResponse)
    )
)]
pub fn list_patients(
    service: &ConsultationService,
    _req: ListPatientsRequest,
) -> TriageResult<Value> {
    let patients = service.store().list_available()?;
    Ok(json!({ "count": patients.len(), "patients": to_data(&patients)? }))
}

#[utoipa::path(
    post,
    path = "/tools/search_patients",
    tag = "patients",
    request_body = SearchPatientsRequest,
    responses(
        (status = 200, description = "Matching patients; exact matches take precedence", body = ToolResponse)
    )
)]
/// Case-insensitive lookup by name when the coordinator only has what the patient said.
pub fn search_patients(
    service: &ConsultationService,
    req: SearchPatientsRequest,
) -> TriageResult<Value> {
    let matches = service.store().search_by_name(&req.name)?;
    Ok(json!({ "matches": to_data(&matches)? }))
}

#[utoipa::path(
    post,
    path = "/tools/onboard_patient",
    tag = "patients",
    request_body = OnboardPatientRequest,
    responses(
        (status = 200, description = "The created record, or duplicate_patient", body = ToolResponse)
    )
)]
/// Creates a new patient record with an empty visit history.
pub fn onboard_patient(
    service: &ConsultationService,
    req: OnboardPatientRequest,
) -> TriageResult<Value> {
    let demographics = Demographics::new(&req.name, req.age, &req.occupation)?;
    let mut onboarding = Onboarding::new(demographics, req.lifestyle.unwrap_or_default());
    if let Some(raw) = req.patient_id.as_deref() {
        onboarding = onboarding.with_identifier(parse_new_patient_id(raw)?);
    }
    onboarding.medical_history = req.medical_history;
    onboarding.risk_factors = req.risk_factors;
    onboarding.notes = req.notes;

    to_data(&service.store().onboard(onboarding)?)
}

#[utoipa::path(
    post,
    path = "/tools/update_lifestyle",
    tag = "patients",
    request_body = UpdateLifestyleRequest,
    responses(
        (status = 200, description = "The updated record", body = ToolResponse)
    )
)]
/// Merges supplied lifestyle fields; omitted fields keep their stored values.
pub fn update_lifestyle(
    service: &ConsultationService,
    req: UpdateLifestyleRequest,
) -> TriageResult<Value> {
    let id = parse_patient_id(&req.patient_id)?;
    to_data(&service.store().update_lifestyle(&id, &req.to_update())?)
}

#[utoipa::path(
    post,
    path = "/tools/amend_profile",
    tag = "patients",
    request_body = AmendProfileRequest,
    responses(
        (status = 200, description = "The updated record", body = ToolResponse)
    )
)]
pub fn amend_profile(
    service: &ConsultationService,
    req: AmendProfileRequest,
) -> TriageResult<Value> {
    let id = parse_patient_id(&req.patient_id)?;
    let amendment = ProfileAmendment {
        age: req.age,
        occupation: req.occupation.as_deref().map(NonEmptyText::new).transpose()?,
        notes: req.notes,
        add_history: req.add_history,
        add_risk_factors: req.add_risk_factors,
    };
    to_data(&service.store().amend_profile(&id, &amendment)?)
}

#[utoipa::path(
    post,
    path = "/tools/record_visit",
    tag = "patients",
    request_body = RecordVisitRequest,
    responses(
        (status = 200, description = "The record with the assessed visit appended", body = ToolResponse)
    )
)]
/// Assesses the symptoms against the stored record and appends the resulting visit.
///
/// The stored tier and recommendation always come from the assessment, never from the caller.
pub fn record_visit(
    service: &ConsultationService,
    req: RecordVisitRequest,
) -> TriageResult<Value> {
    let id = parse_patient_id(&req.patient_id)?;
    let symptoms = required_symptoms(req.symptoms)?;
    let context = service.context(Some(&id), None)?;
    let (assessment, _) = service.assess(&context, &symptoms)?;
    let recommendation = service.generator().recommend(
        assessment.tier,
        &assessment.candidates,
        &context.risk_factors,
    );
    let mut visit = VisitSummary::new(
        symptoms,
        assessment.tier,
        recommendation.summary(),
        req.note.unwrap_or_default(),
    )?;
    if req.resolved {
        visit = visit.resolved();
    }
    to_data(&service.store().append_visit(&id, visit)?)
}

#[utoipa::path(
    post,
    path = "/tools/patient_risk_factors",
    tag = "patients",
    request_body = PatientRequest,
    responses(
        (status = 200, description = "Derived risk factors and a prioritised profile", body = ToolResponse)
    )
)]
pub fn patient_risk_factors(
    service: &ConsultationService,
    req: PatientRequest,
) -> TriageResult<Value> {
    let id = parse_patient_id(&req.patient_id)?;
    let record = service.store().lookup(&id)?;
    let profile = RiskProfile::from_record(&record);
    let factors: BTreeSet<_> = profile
        .high_priority
        .iter()
        .chain(profile.moderate.iter())
        .copied()
        .collect();
    Ok(json!({
        "patient_id": record.id.as_str(),
        "risk_factors": to_data(&factors)?,
        "profile": to_data(&profile)?,
    }))
}

#[utoipa::path(
    post,
    path = "/tools/match_conditions",
    tag = "knowledge",
    request_body = SymptomsRequest,
    responses(
        (status = 200, description = "Ranked candidate conditions and unclassified symptoms", body = ToolResponse)
    )
)]
pub fn match_conditions(
    service: &ConsultationService,
    req: SymptomsRequest,
) -> TriageResult<Value> {
    let symptoms = required_symptoms(req.symptoms)?;
    to_data(&service.knowledge_base().match_conditions(&symptoms))
}

#[utoipa::path(
    post,
    path = "/tools/detect_red_flags",
    tag = "knowledge",
    request_body = SymptomsRequest,
    responses(
        (status = 200, description = "Symptoms that mandate emergency escalation", body = ToolResponse)
    )
)]
pub fn detect_red_flags(
    service: &ConsultationService,
    req: SymptomsRequest,
) -> TriageResult<Value> {
    let symptoms = required_symptoms(req.symptoms)?;
    let red_flags = service.knowledge_base().detect_red_flags(&symptoms);
    Ok(json!({
        "emergency": !red_flags.is_empty(),
        "red_flags": to_data(&red_flags)?,
    }))
}

#[utoipa::path(
    post,
    path = "/tools/clarifying_questions",
    tag = "knowledge",
    request_body = SymptomsRequest,
    responses(
        (status = 200, description = "Follow-up questions for the reported symptoms", body = ToolResponse)
    )
)]
pub fn clarifying_questions(
    service: &ConsultationService,
    req: SymptomsRequest,
) -> TriageResult<Value> {
    let symptoms = required_symptoms(req.symptoms)?;
    Ok(json!({ "questions": service.knowledge_base().clarifying_questions(&symptoms) }))
}

#[utoipa::path(
    post,
    path = "/tools/analyze_pattern",
    tag = "assessment",
    request_body = AnalyzePatternRequest,
    responses(
        (status = 200, description = "NONE, RECURRING or ESCALATING against stored visits", body = ToolResponse)
    )
)]
pub fn analyze_pattern(
    service: &ConsultationService,
    req: AnalyzePatternRequest,
) -> TriageResult<Value> {
    let id = parse_patient_id(&req.patient_id)?;
    let symptoms = required_symptoms(req.symptoms)?;
    let context = service.context(Some(&id), None)?;
    to_data(&service.pattern(&context, &symptoms))
}

#[utoipa::path(
    post,
    path = "/tools/assess_risk",
    tag = "assessment",
    request_body = AssessRiskRequest,
    responses(
        (status = 200, description = "Triage tier, score and explanation", body = ToolResponse)
    )
)]
/// Scores a symptom set without writing anything.
pub fn assess_risk(service: &ConsultationService, req: AssessRiskRequest) -> TriageResult<Value> {
    let patient = parse_optional_patient(req.patient_id.as_deref())?;
    let symptoms = required_symptoms(req.symptoms)?;
    let context = service.context(patient.as_ref(), req.age)?;
    let (assessment, pattern) = service.assess(&context, &symptoms)?;
    Ok(json!({
        "assessment": to_data(&assessment)?,
        "pattern": to_data(&pattern)?,
        "risk_factors": to_data(&context.risk_factors)?,
    }))
}

#[utoipa::path(
    post,
    path = "/tools/recommend_care",
    tag = "assessment",
    request_body = RecommendCareRequest,
    responses(
        (status = 200, description = "Timeline, care setting and ordered actions", body = ToolResponse)
    )
)]
pub fn recommend_care(
    service: &ConsultationService,
    req: RecommendCareRequest,
) -> TriageResult<Value> {
    let symptoms = parse_symptoms(req.symptoms)?;
    let candidates = if symptoms.is_empty() {
        Vec::new()
    } else {
        service.knowledge_base().match_conditions(&symptoms).candidates
    };
    let risk_factors = match parse_optional_patient(req.patient_id.as_deref())? {
        Some(id) => service.store().risk_factors(&id)?,
        None => BTreeSet::new(),
    };
    to_data(&service.generator().recommend(req.tier, &candidates, &risk_factors))
}

#[utoipa::path(
    post,
    path = "/tools/run_consultation",
    tag = "assessment",
    request_body = RunConsultationRequest,
    responses(
        (status = 200, description = "Assessment, recommendation and questions; the visit is stored for known patients", body = ToolResponse)
    )
)]
/// Full triage turn in one call.
pub fn run_consultation(
    service: &ConsultationService,
    req: RunConsultationRequest,
) -> TriageResult<Value> {
    let patient = parse_optional_patient(req.patient_id.as_deref())?;
    let request = ConsultationRequest {
        record_visit: req.record_visit.unwrap_or(true) && patient.is_some(),
        patient,
        symptoms: required_symptoms(req.symptoms)?,
        age: req.age,
        note: req.note,
    };
    to_data(&service.consult(request)?)
}
