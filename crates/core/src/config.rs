//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services. Core
//! code never reads process-wide environment variables during request handling; binaries do
//! that and hand over a finished [`CoreConfig`].

use crate::constants::{
    DEFAULT_MAX_WRITE_ATTEMPTS, DEFAULT_PATIENT_DATA_DIR, DEFAULT_RECURRENCE_WINDOW,
    DEFAULT_RETRY_BACKOFF_MS, PATIENTS_DIR_NAME,
};
use crate::{TriageError, TriageResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    patient_data_dir: PathBuf,
    max_write_attempts: u32,
    retry_backoff: Duration,
    recurrence_window: usize,
    knowledge_base_path: Option<PathBuf>,
}

impl CoreConfig {
    /// Create a new `CoreConfig` with default tuning for everything but the data directory.
    pub fn new(patient_data_dir: PathBuf) -> Self {
        Self {
            patient_data_dir,
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            recurrence_window: DEFAULT_RECURRENCE_WINDOW,
            knowledge_base_path: None,
        }
    }

    /// Sets how many times a contended write is attempted before surfacing a conflict.
    ///
    /// # Errors
    ///
    /// Returns `TriageError::InvalidInput` for zero attempts.
    pub fn with_max_write_attempts(mut self, attempts: u32) -> TriageResult<Self> {
        if attempts == 0 {
            return Err(TriageError::InvalidInput(
                "max_write_attempts must be at least 1".into(),
            ));
        }
        self.max_write_attempts = attempts;
        Ok(self)
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Sets the visit window used for recurring-symptom detection.
    ///
    /// # Errors
    ///
    /// Returns `TriageError::InvalidInput` when the window cannot hold two visits.
    pub fn with_recurrence_window(mut self, window: usize) -> TriageResult<Self> {
        if window < 2 {
            return Err(TriageError::InvalidInput(
                "recurrence_window must be at least 2".into(),
            ));
        }
        self.recurrence_window = window;
        Ok(self)
    }

    pub fn with_knowledge_base_path(mut self, path: Option<PathBuf>) -> Self {
        self.knowledge_base_path = path;
        self
    }

    pub fn patient_data_dir(&self) -> &Path {
        &self.patient_data_dir
    }

    pub fn patients_dir(&self) -> PathBuf {
        self.patient_data_dir.join(PATIENTS_DIR_NAME)
    }

    pub fn max_write_attempts(&self) -> u32 {
        self.max_write_attempts
    }

    pub fn retry_backoff(&self) -> Duration {
        self.retry_backoff
    }

    pub fn recurrence_window(&self) -> usize {
        self.recurrence_window
    }

    pub fn knowledge_base_path(&self) -> Option<&Path> {
        self.knowledge_base_path.as_deref()
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new(PathBuf::from(DEFAULT_PATIENT_DATA_DIR))
    }
}

/// Raw, unparsed settings as read from the environment by a binary.
///
/// Keeping the parsing here (rather than in each binary) means the CLI and the tool host agree
/// on names and validation.
#[derive(Clone, Debug, Default)]
pub struct ConfigValues {
    pub patient_data_dir: Option<String>,
    pub max_write_attempts: Option<String>,
    pub retry_backoff_ms: Option<String>,
    pub recurrence_window: Option<String>,
    pub knowledge_base: Option<String>,
}

impl ConfigValues {
    /// Build a `CoreConfig`, treating empty or whitespace-only values as unset.
    ///
    /// # Errors
    ///
    /// Returns `TriageError::InvalidInput` if a numeric setting does not parse or is out of
    /// range.
    pub fn resolve(self) -> TriageResult<CoreConfig> {
        fn present(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> TriageResult<T> {
            raw.parse::<T>().map_err(|_| {
                TriageError::InvalidInput(format!("{} must be a non-negative integer", name))
            })
        }

        let data_dir = present(self.patient_data_dir)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PATIENT_DATA_DIR));
        let mut cfg = CoreConfig::new(data_dir);

        if let Some(raw) = present(self.max_write_attempts) {
            cfg = cfg.with_max_write_attempts(parse_number("max_write_attempts", &raw)?)?;
        }
        if let Some(raw) = present(self.retry_backoff_ms) {
            let ms: u64 = parse_number("retry_backoff_ms", &raw)?;
            cfg = cfg.with_retry_backoff(Duration::from_millis(ms));
        }
        if let Some(raw) = present(self.recurrence_window) {
            cfg = cfg.with_recurrence_window(parse_number("recurrence_window", &raw)?)?;
        }
        cfg = cfg.with_knowledge_base_path(present(self.knowledge_base).map(PathBuf::from));

        Ok(cfg)
    }
}
