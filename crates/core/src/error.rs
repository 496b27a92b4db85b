use std::path::PathBuf;

/// Error taxonomy surfaced to callers of the triage core.
///
/// Every variant maps onto an [`ErrorKind`] via [`TriageError::kind`], which is what the tool
/// boundary reports as `error_kind`.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("patient not found: {0}")]
    PatientNotFound(String),
    #[error("patient already exists: {0}")]
    DuplicatePatient(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("malformed record at {path}: {reason}", path = path.display())]
    MalformedRecord { path: PathBuf, reason: String },
    #[error("concurrent write conflict on patient {id} after {attempts} attempts")]
    ConcurrentWriteConflict { id: String, attempts: u32 },

    #[error("failed to create patient directory: {0}")]
    PatientDirCreation(std::io::Error),
    #[error("failed to write patient file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read patient file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to lock patient record: {0}")]
    Lock(std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),

    #[error("{0}")]
    Id(#[from] triage_uuid::IdError),
    #[error("{0}")]
    Text(#[from] triage_types::TextError),
}

/// Wire-level classification of a [`TriageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PatientNotFound,
    DuplicatePatient,
    InvalidInput,
    MalformedRecord,
    ConcurrentWriteConflict,
    StorageFailure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::PatientNotFound => "patient_not_found",
            ErrorKind::DuplicatePatient => "duplicate_patient",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::MalformedRecord => "malformed_record",
            ErrorKind::ConcurrentWriteConflict => "concurrent_write_conflict",
            ErrorKind::StorageFailure => "storage_failure",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TriageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TriageError::PatientNotFound(_) => ErrorKind::PatientNotFound,
            TriageError::DuplicatePatient(_) => ErrorKind::DuplicatePatient,
            TriageError::InvalidInput(_) | TriageError::Id(_) | TriageError::Text(_) => {
                ErrorKind::InvalidInput
            }
            TriageError::MalformedRecord { .. } | TriageError::YamlDeserialization(_) => {
                ErrorKind::MalformedRecord
            }
            TriageError::ConcurrentWriteConflict { .. } => ErrorKind::ConcurrentWriteConflict,
            TriageError::PatientDirCreation(_)
            | TriageError::FileWrite(_)
            | TriageError::FileRead(_)
            | TriageError::Lock(_)
            | TriageError::Serialization(_) => ErrorKind::StorageFailure,
        }
    }

    /// Only write conflicts are worth retrying; everything else is deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TriageError::ConcurrentWriteConflict { .. })
    }
}

pub type TriageResult<T> = std::result::Result<T, TriageError>;
