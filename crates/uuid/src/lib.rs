//! Patient identifiers and sharded-path utilities.
//!
//! Patient records are stored under sharded directories derived from the identifier. Two kinds
//! of identifier are accepted:
//!
//! - **Caller-supplied keys**, such as a first name (`"sarah"`), which is how existing patients
//!   are addressed by the conversational coordinator.
//! - **Allocated keys**, a fresh canonical UUID (32 lowercase hex characters, no hyphens) handed
//!   out when a new patient is onboarded without a preferred key.
//!
//! Both share one canonical form: trimmed, lower-cased, 1 to 64 characters drawn from
//! `a-z`, `0-9`, `.`, `-` and `_`, never starting with `.`. The canonical form is safe to use
//! as a directory name on every supported filesystem.
//!
//! ## Sharded directory layout
//! For an identifier `id` with SHA-256 hex digest `h`, records live under:
//! `parent_dir/<h[0..2]>/<h[2..4]>/<id>/`
//!
//! Hashing (rather than slicing the identifier itself) keeps fan-out even when many
//! caller-supplied keys share a prefix.

mod service;

pub use service::PatientId;

/// Error type for identifier operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// Invalid input provided
    #[error("Invalid patient identifier: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type IdResult<T> = Result<T, IdError>;
