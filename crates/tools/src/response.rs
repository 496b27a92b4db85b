//! Result envelope returned by every tool.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use triage_core::{ErrorKind, TriageError};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Ok,
    Error,
}

/// `status` is always present; `data` on success, `error_kind` and `message` on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ToolResponse {
    pub status: ToolStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "patient_not_found")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ToolResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            status: ToolStatus::Ok,
            data: Some(data),
            error_kind: None,
            message: None,
        }
    }

    pub fn error(err: &TriageError) -> Self {
        Self {
            status: ToolStatus::Error,
            data: None,
            error_kind: Some(err.kind()),
            message: Some(err.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ToolStatus::Ok
    }
}

impl From<Result<Value, TriageError>> for ToolResponse {
    fn from(result: Result<Value, TriageError>) -> Self {
        match result {
            Ok(data) => ToolResponse::ok(data),
            Err(e) => ToolResponse::error(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_shape() {
        let response = ToolResponse::error(&TriageError::PatientNotFound("alex".into()));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error_kind"], "patient_not_found");
        assert!(json["message"].as_str().unwrap().contains("alex"));
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_ok_envelope_shape() {
        let json = serde_json::to_value(ToolResponse::ok(serde_json::json!({"n": 1}))).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["data"]["n"], 1);
        assert!(json.get("error_kind").is_none());
    }
}
