//! # Triage Tools
//!
//! The tool-call boundary used by an external conversational coordinator. Each tool takes a
//! JSON object of named arguments and returns a [`ToolResponse`]:
//!
//! ```json
//! {"status": "ok", "data": {...}}
//! {"status": "error", "error_kind": "patient_not_found", "message": "..."}
//! ```
//!
//! Argument schemas are published as an OpenAPI document via [`ToolRegistry::openapi`].

mod handlers;
pub mod registry;
pub mod requests;
pub mod response;

pub use registry::{ToolCall, ToolDescriptor, ToolRegistry, TOOLS};
pub use requests::SymptomInput;
pub use response::{ToolResponse, ToolStatus};
