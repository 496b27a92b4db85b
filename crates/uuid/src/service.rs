//! Internal implementation of patient identifiers.

use crate::{IdError, IdResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

const MAX_ID_LEN: usize = 64;

/// A validated, canonical patient identifier.
///
/// Once constructed the identifier is guaranteed to be in canonical form, so it can be used
/// directly as a map key or a directory name.
///
/// # Construction
/// - [`PatientId::allocate`] generates a fresh UUID-backed identifier.
/// - [`PatientId::parse`] validates and canonicalises an externally supplied key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatientId(String);

impl PatientId {
    /// Generates a new identifier from a random v4 UUID in simple (unhyphenated) form.
    pub fn allocate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Validates and canonicalises an externally supplied identifier.
    ///
    /// Surrounding whitespace is trimmed and ASCII letters are lower-cased, so `"Sarah"` and
    /// `" sarah "` name the same patient.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidInput`] if the input is empty, longer than 64 characters,
    /// starts with `.`, or contains characters outside `[a-z0-9._-]`.
    pub fn parse(input: &str) -> IdResult<Self> {
        let candidate = input.trim().to_ascii_lowercase();

        if candidate.is_empty() {
            return Err(IdError::InvalidInput("identifier cannot be empty".into()));
        }
        if candidate.len() > MAX_ID_LEN {
            return Err(IdError::InvalidInput(format!(
                "identifier exceeds {} characters",
                MAX_ID_LEN
            )));
        }
        if candidate.starts_with('.') {
            return Err(IdError::InvalidInput(format!(
                "identifier cannot start with '.', got: '{}'",
                input
            )));
        }
        if !Self::is_canonical(&candidate) {
            return Err(IdError::InvalidInput(format!(
                "identifier may only contain letters, digits, '.', '-' and '_', got: '{}'",
                input
            )));
        }

        Ok(Self(candidate))
    }

    /// Returns true if `input` is already in canonical form.
    pub fn is_canonical(input: &str) -> bool {
        !input.is_empty()
            && input.len() <= MAX_ID_LEN
            && !input.starts_with('.')
            && input
                .bytes()
                .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' | b'_'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `parent_dir/<s1>/<s2>/<id>/` where `s1`/`s2` come from the SHA-256 of the id.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let digest = hex::encode(Sha256::digest(self.0.as_bytes()));
        parent_dir.join(&digest[0..2]).join(&digest[2..4]).join(&self.0)
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PatientId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatientId::parse(s)
    }
}

impl AsRef<str> for PatientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for PatientId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for PatientId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PatientId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_generates_canonical_uuid() {
        let id = PatientId::allocate();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().bytes().all(|b| b.is_ascii_hexdigit()));
        assert!(PatientId::is_canonical(id.as_str()));
    }

    #[test]
    fn test_allocate_is_unique() {
        assert_ne!(PatientId::allocate(), PatientId::allocate());
    }

    #[test]
    fn test_parse_canonicalises_case_and_whitespace() {
        let id = PatientId::parse("  Sarah ").unwrap();
        assert_eq!(id.as_str(), "sarah");
        assert_eq!(id, PatientId::parse("sarah").unwrap());
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(PatientId::parse("   ").is_err());
    }

    #[test]
    fn test_parse_rejects_path_traversal() {
        assert!(PatientId::parse("../etc").is_err());
        assert!(PatientId::parse("a/b").is_err());
        assert!(PatientId::parse(".hidden").is_err());
    }

    #[test]
    fn test_parse_rejects_too_long() {
        let long = "a".repeat(65);
        match PatientId::parse(&long) {
            Err(IdError::InvalidInput(msg)) => assert!(msg.contains("64")),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_sharded_dir_structure() {
        let id = PatientId::parse("sarah").unwrap();
        let sharded = id.sharded_dir(Path::new("/patient_data/patients"));

        let digest = hex::encode(Sha256::digest(b"sarah"));
        let expected = PathBuf::from("/patient_data/patients")
            .join(&digest[0..2])
            .join(&digest[2..4])
            .join("sarah");
        assert_eq!(sharded, expected);
    }

    #[test]
    fn test_sharded_dir_is_deterministic() {
        let a = PatientId::parse("robert").unwrap();
        let b = PatientId::parse("ROBERT").unwrap();
        let parent = Path::new("/data");
        assert_eq!(a.sharded_dir(parent), b.sharded_dir(parent));
    }

    #[test]
    fn test_serde_round_trip_validates() {
        let id = PatientId::parse("alex").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"alex\"");
        let back: PatientId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        let bad: Result<PatientId, _> = serde_json::from_str("\"a b\"");
        assert!(bad.is_err());
    }
}
