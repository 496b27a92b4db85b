//! Symptom knowledge base.
//!
//! Maps reported symptoms onto catalogued conditions, picks out red flags and produces
//! follow-up questions. The knowledge base is immutable after load; every lookup is a pure
//! function of its input.

mod catalogue;

use crate::config::CoreConfig;
use crate::risk_factors::RiskFactor;
use crate::symptom::Symptom;
use crate::{TriageError, TriageResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;
use triage_types::Severity;

pub use catalogue::builtin as builtin_catalogue;

/// A catalogued condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Condition {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub red_flag: bool,
    /// Symptoms that, all present together, make this condition an emergency.
    #[serde(default)]
    pub red_flag_core: Vec<String>,
    pub severity_weight: u8,
    #[serde(default)]
    pub risk_profile: Vec<RiskFactor>,
    #[serde(default)]
    pub actions: Vec<String>,
}

/// Loadable form of the knowledge base. Condition order is ranking priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalogue {
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub red_flag_symptoms: Vec<String>,
    #[serde(default)]
    pub severity_sensitive: Vec<String>,
    #[serde(default)]
    pub questions: BTreeMap<String, Vec<String>>,
}

impl Catalogue {
    /// Checks the structural rules every catalogue must satisfy.
    ///
    /// # Errors
    ///
    /// Returns `TriageError::InvalidInput` naming the first offending entry.
    pub fn validate(&self) -> TriageResult<()> {
        let invalid = |msg: String| -> TriageResult<()> {
            Err(TriageError::InvalidInput(format!("knowledge base: {msg}")))
        };

        if self.conditions.is_empty() {
            return invalid("catalogue has no conditions".into());
        }

        let mut ids = HashSet::new();
        let mut vocabulary = HashSet::new();
        for condition in &self.conditions {
            if condition.id.trim().is_empty() || !ids.insert(condition.id.as_str()) {
                return invalid(format!("duplicate or empty condition id '{}'", condition.id));
            }
            if condition.symptoms.is_empty() {
                return invalid(format!("condition '{}' lists no symptoms", condition.id));
            }
            if !(1..=10).contains(&condition.severity_weight) {
                return invalid(format!(
                    "condition '{}' severity_weight must be between 1 and 10",
                    condition.id
                ));
            }
            for symptom in &condition.symptoms {
                if !is_token(symptom) {
                    return invalid(format!("symptom '{symptom}' is not a normalised token"));
                }
                vocabulary.insert(symptom.as_str());
            }
            if condition.red_flag == condition.red_flag_core.is_empty() {
                return invalid(format!(
                    "condition '{}' must declare a red_flag_core exactly when it is a red flag",
                    condition.id
                ));
            }
            if let Some(stray) = condition
                .red_flag_core
                .iter()
                .find(|s| !condition.symptoms.contains(s))
            {
                return invalid(format!(
                    "red_flag_core symptom '{stray}' is not a symptom of '{}'",
                    condition.id
                ));
            }
        }

        for token in &self.red_flag_symptoms {
            if !is_token(token) {
                return invalid(format!("red flag '{token}' is not a normalised token"));
            }
            vocabulary.insert(token.as_str());
        }

        if let Some(stray) = self
            .severity_sensitive
            .iter()
            .chain(self.questions.keys())
            .find(|s| !vocabulary.contains(s.as_str()))
        {
            return invalid(format!("symptom '{stray}' is not in the vocabulary"));
        }

        Ok(())
    }
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && Symptom::normalise(s) == s
}

/// A condition that shares at least one symptom with the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionCandidate {
    pub id: String,
    pub label: String,
    pub description: String,
    pub red_flag: bool,
    pub severity_weight: u8,
    /// Input symptoms supporting this condition, in catalogue order.
    pub matched_symptoms: Vec<String>,
    pub risk_profile: Vec<RiskFactor>,
    pub actions: Vec<String>,
}

impl ConditionCandidate {
    pub fn overlap(&self) -> usize {
        self.matched_symptoms.len()
    }
}

/// Result of [`SymptomKnowledgeBase::match_conditions`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionMatches {
    pub candidates: Vec<ConditionCandidate>,
    /// Input tokens outside the vocabulary; kept so they can bias risk upward.
    pub unclassified: Vec<String>,
}

impl ConditionMatches {
    /// Highest overlap reached by any candidate (0 when nothing matched).
    pub fn best_overlap(&self) -> usize {
        self.candidates.first().map_or(0, ConditionCandidate::overlap)
    }

    /// Highest severity weight among the best-supported candidates.
    pub fn top_weight(&self) -> u8 {
        let best = self.best_overlap();
        self.candidates
            .iter()
            .filter(|c| c.overlap() == best)
            .map(|c| c.severity_weight)
            .max()
            .unwrap_or(0)
    }
}

/// Recognised versus unclassified symptoms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub recognised: Vec<Symptom>,
    pub unclassified: Vec<Symptom>,
}

/// Read-only symptom and condition catalogue with lookup indexes.
#[derive(Debug, Clone)]
pub struct SymptomKnowledgeBase {
    conditions: Vec<Condition>,
    vocabulary: BTreeSet<String>,
    red_flag_symptoms: HashSet<String>,
    severity_sensitive: HashSet<String>,
    questions: HashMap<String, Vec<String>>,
}

impl Default for SymptomKnowledgeBase {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SymptomKnowledgeBase {
    /// The catalogue compiled into the crate.
    pub fn builtin() -> Self {
        Self::index(catalogue::builtin())
    }

    /// Validates and indexes a catalogue.
    ///
    /// # Errors
    ///
    /// Returns `TriageError::InvalidInput` if the catalogue breaks a structural rule.
    pub fn from_catalogue(catalogue: Catalogue) -> TriageResult<Self> {
        catalogue.validate()?;
        Ok(Self::index(catalogue))
    }

    /// Parses a YAML catalogue.
    ///
    /// # Errors
    ///
    /// Returns `TriageError::YamlDeserialization` for unparsable YAML, or
    /// `TriageError::InvalidInput` if validation fails.
    pub fn from_yaml_str(yaml: &str) -> TriageResult<Self> {
        let catalogue: Catalogue =
            serde_yaml::from_str(yaml).map_err(TriageError::YamlDeserialization)?;
        Self::from_catalogue(catalogue)
    }

    /// Loads a YAML catalogue from disk.
    pub fn load(path: &Path) -> TriageResult<Self> {
        let contents = fs::read_to_string(path).map_err(TriageError::FileRead)?;
        let kb = Self::from_yaml_str(&contents)?;
        tracing::info!(
            path = %path.display(),
            conditions = kb.conditions.len(),
            "loaded knowledge base"
        );
        Ok(kb)
    }

    /// The configured catalogue, or the built-in one when none is configured.
    pub fn from_config(cfg: &CoreConfig) -> TriageResult<Self> {
        match cfg.knowledge_base_path() {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()),
        }
    }

    fn index(catalogue: Catalogue) -> Self {
        let mut vocabulary: BTreeSet<String> = catalogue
            .conditions
            .iter()
            .flat_map(|c| c.symptoms.iter().cloned())
            .collect();
        vocabulary.extend(catalogue.red_flag_symptoms.iter().cloned());

        Self {
            vocabulary,
            red_flag_symptoms: catalogue.red_flag_symptoms.into_iter().collect(),
            severity_sensitive: catalogue.severity_sensitive.into_iter().collect(),
            questions: catalogue.questions.into_iter().collect(),
            conditions: catalogue.conditions,
        }
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn condition(&self, id: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.id == id)
    }

    pub fn vocabulary(&self) -> impl Iterator<Item = &str> {
        self.vocabulary.iter().map(String::as_str)
    }

    pub fn is_known(&self, symptom: &str) -> bool {
        self.vocabulary.contains(symptom)
    }

    /// Splits input into recognised and unclassified symptoms, preserving order.
    pub fn classify(&self, symptoms: &[Symptom]) -> Classification {
        let (recognised, unclassified): (Vec<Symptom>, Vec<Symptom>) = symptoms
            .iter()
            .cloned()
            .partition(|s| self.is_known(&s.name));
        Classification {
            recognised,
            unclassified,
        }
    }

    /// Every condition sharing at least one symptom with the input.
    ///
    /// Ordered by overlap (descending), then red-flag conditions first, then catalogue order.
    pub fn match_conditions(&self, symptoms: &[Symptom]) -> ConditionMatches {
        let names: HashSet<&str> = symptoms.iter().map(|s| s.name.as_str()).collect();

        let mut ranked: Vec<(usize, ConditionCandidate)> = self
            .conditions
            .iter()
            .enumerate()
            .filter_map(|(index, condition)| {
                let matched: Vec<String> = condition
                    .symptoms
                    .iter()
                    .filter(|s| names.contains(s.as_str()))
                    .cloned()
                    .collect();
                (!matched.is_empty()).then(|| {
                    (
                        index,
                        ConditionCandidate {
                            id: condition.id.clone(),
                            label: condition.label.clone(),
                            description: condition.description.clone(),
                            red_flag: condition.red_flag,
                            severity_weight: condition.severity_weight,
                            matched_symptoms: matched,
                            risk_profile: condition.risk_profile.clone(),
                            actions: condition.actions.clone(),
                        },
                    )
                })
            })
            .collect();

        ranked.sort_by(|(ia, a), (ib, b)| {
            b.overlap()
                .cmp(&a.overlap())
                .then_with(|| b.red_flag.cmp(&a.red_flag))
                .then_with(|| ia.cmp(ib))
        });

        let mut unclassified: Vec<String> = Vec::new();
        for symptom in symptoms {
            if !self.is_known(&symptom.name) && !unclassified.contains(&symptom.name) {
                unclassified.push(symptom.name.clone());
            }
        }

        ConditionMatches {
            candidates: ranked.into_iter().map(|(_, c)| c).collect(),
            unclassified,
        }
    }

    /// Input symptoms that on their own demand emergency care.
    ///
    /// A symptom is flagged if it is a red-flag token, completes the core of a red-flag
    /// condition together with the rest of the input, or is a severity-sensitive symptom rated
    /// at the maximum severity. Returned in input order without duplicates.
    pub fn detect_red_flags(&self, symptoms: &[Symptom]) -> Vec<Symptom> {
        let names: HashSet<&str> = symptoms.iter().map(|s| s.name.as_str()).collect();

        let completed_cores: HashSet<&str> = self
            .conditions
            .iter()
            .filter(|c| c.red_flag && !c.red_flag_core.is_empty())
            .filter(|c| c.red_flag_core.iter().all(|s| names.contains(s.as_str())))
            .flat_map(|c| c.red_flag_core.iter().map(String::as_str))
            .collect();

        let mut flagged: Vec<Symptom> = Vec::new();
        for symptom in symptoms {
            let is_flag = self.red_flag_symptoms.contains(&symptom.name)
                || completed_cores.contains(symptom.name.as_str())
                || (symptom.severity == Some(Severity::MAX)
                    && self.severity_sensitive.contains(&symptom.name));
            if is_flag && !flagged.iter().any(|f| f.name == symptom.name) {
                flagged.push(symptom.clone());
            }
        }
        flagged
    }

    /// Follow-up questions for symptoms missing a severity or duration qualifier.
    pub fn clarifying_questions(&self, symptoms: &[Symptom]) -> Vec<String> {
        let mut questions: Vec<String> = Vec::new();
        for symptom in symptoms.iter().filter(|s| !s.is_qualified()) {
            let templated: Vec<&str> = match self.questions.get(&symptom.name) {
                Some(qs) => qs.iter().map(String::as_str).collect(),
                None => catalogue::FALLBACK_QUESTIONS.to_vec(),
            };
            for question in templated {
                if !questions.iter().any(|q| q == question) {
                    questions.push(question.to_string());
                }
            }
        }
        questions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn symptoms(names: &[&str]) -> Vec<Symptom> {
        names.iter().map(|n| Symptom::new(n).unwrap()).collect()
    }

    #[test]
    fn test_builtin_catalogue_is_valid() {
        builtin_catalogue()
            .validate()
            .expect("built-in catalogue should validate");
    }

    #[test]
    fn test_headache_includes_computer_strain() {
        let kb = SymptomKnowledgeBase::builtin();
        let matches = kb.match_conditions(&symptoms(&["headache"]));
        assert!(matches.unclassified.is_empty());
        assert!(matches
            .candidates
            .iter()
            .any(|c| c.id == "computer_vision_strain"));
        assert!(matches.candidates.iter().all(|c| !c.red_flag));
    }

    #[test]
    fn test_candidates_ranked_by_overlap_then_red_flag() {
        let kb = SymptomKnowledgeBase::builtin();
        let matches = kb.match_conditions(&symptoms(&["chest_pain", "shortness_of_breath"]));
        let top: Vec<_> = matches.candidates.iter().take(2).map(|c| c.id.as_str()).collect();
        assert_eq!(top, vec!["acute_coronary_syndrome", "pneumonia"]);
        assert!(matches
            .candidates
            .windows(2)
            .all(|w| w[0].overlap() >= w[1].overlap()));
    }

    #[test]
    fn test_unknown_symptoms_are_reported_not_dropped() {
        let kb = SymptomKnowledgeBase::builtin();
        let input = symptoms(&["cough", "glowing_skin", "glowing skin"]);
        let matches = kb.match_conditions(&input);
        assert_eq!(matches.unclassified, vec!["glowing_skin"]);
        assert!(!matches.candidates.is_empty());

        let classified = kb.classify(&input);
        assert_eq!(classified.recognised.len(), 1);
        assert_eq!(classified.unclassified.len(), 2);
    }

    #[test]
    fn test_red_flag_tokens_and_combinations() {
        let kb = SymptomKnowledgeBase::builtin();

        let flags = kb.detect_red_flags(&symptoms(&["fever", "Severe Headache"]));
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].name, "severe_headache");

        let combo = kb.detect_red_flags(&symptoms(&["shortness_of_breath", "chest_pain", "cough"]));
        let names: Vec<_> = combo.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["shortness_of_breath", "chest_pain"]);

        assert!(kb.detect_red_flags(&symptoms(&["chest_pain"])).is_empty());
    }

    #[test]
    fn test_maximum_severity_makes_sensitive_symptom_a_red_flag() {
        let kb = SymptomKnowledgeBase::builtin();
        let worst = Symptom::new("headache").unwrap().with_severity(Severity::MAX);
        assert_eq!(kb.detect_red_flags(&[worst]).len(), 1);

        let bad = Symptom::new("headache")
            .unwrap()
            .with_severity(Severity::new(9).unwrap());
        assert!(kb.detect_red_flags(&[bad]).is_empty());

        let cough = Symptom::new("cough").unwrap().with_severity(Severity::MAX);
        assert!(kb.detect_red_flags(&[cough]).is_empty());
    }

    #[test]
    fn test_lookups_are_idempotent() {
        let kb = SymptomKnowledgeBase::builtin();
        let input = symptoms(&["fever", "cough", "chest_pain", "mystery"]);
        assert_eq!(kb.match_conditions(&input), kb.match_conditions(&input));
        assert_eq!(kb.detect_red_flags(&input), kb.detect_red_flags(&input));
    }

    #[test]
    fn test_clarifying_questions_skip_qualified_symptoms() {
        let kb = SymptomKnowledgeBase::builtin();
        let qualified = Symptom::new("cough")
            .unwrap()
            .with_severity(Severity::new(4).unwrap())
            .with_duration("3 days");
        let questions = kb.clarifying_questions(&[
            Symptom::new("headache").unwrap(),
            qualified,
            Symptom::new("itchy_elbow").unwrap(),
            Symptom::new("tingling").unwrap(),
        ]);

        assert_eq!(questions[0], "On a scale of 1-10, how severe is the headache?");
        assert!(!questions.iter().any(|q| q.contains("cough")));
        assert_eq!(
            questions
                .iter()
                .filter(|q| q.as_str() == "When did this symptom start?")
                .count(),
            1
        );
        assert_eq!(questions.len(), 4 + 3);
    }

    #[test]
    fn test_yaml_catalogue_loads_and_validates() {
        let yaml = r#"
conditions:
  - id: hay_fever
    label: Hay fever
    symptoms: [sneezing, itchy_eyes]
    severity_weight: 1
    risk_profile: [family_history]
    actions: ["Take an antihistamine"]
  - id: heat_stroke
    label: Heat stroke
    symptoms: [confusion, hot_skin]
    red_flag: true
    red_flag_core: [confusion, hot_skin]
    severity_weight: 9
red_flag_symptoms: [collapse]
questions:
  sneezing: ["Is it worse outdoors?"]
"#;
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(yaml.as_bytes()).unwrap();

        let kb = SymptomKnowledgeBase::load(file.path()).expect("catalogue should load");
        assert_eq!(kb.conditions().len(), 2);
        assert!(kb.is_known("collapse"));
        assert_eq!(
            kb.detect_red_flags(&symptoms(&["hot_skin", "confusion"])).len(),
            2
        );
        assert_eq!(
            kb.clarifying_questions(&symptoms(&["sneezing"])),
            vec!["Is it worse outdoors?"]
        );
    }

    #[test]
    fn test_invalid_catalogues_are_rejected() {
        let missing_core = r#"
conditions:
  - id: bad
    label: Bad
    symptoms: [a]
    red_flag: true
    severity_weight: 5
"#;
        assert!(SymptomKnowledgeBase::from_yaml_str(missing_core).is_err());

        let stray_question = r#"
conditions:
  - id: ok
    label: Ok
    symptoms: [a]
    severity_weight: 1
questions:
  b: ["?"]
"#;
        assert!(SymptomKnowledgeBase::from_yaml_str(stray_question).is_err());

        let mut duplicate = builtin_catalogue();
        let first = duplicate.conditions[0].clone();
        duplicate.conditions.push(first);
        assert!(SymptomKnowledgeBase::from_catalogue(duplicate).is_err());

        assert!(matches!(
            SymptomKnowledgeBase::from_yaml_str("conditions: [[["),
            Err(TriageError::YamlDeserialization(_))
        ));
    }
}
