//! Care recommendations.
//!
//! A deterministic mapping from tier and ranked candidates to a plan: when to be seen, where,
//! and what to do meanwhile.

use crate::knowledge::ConditionCandidate;
use crate::risk_factors::RiskFactor;
use crate::symptom::TriageTier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Number of top-ranked candidates whose actions are always included.
pub const TOP_CANDIDATE_ACTIONS: usize = 3;

/// Severity weight at or above which a routine case should be seen in person.
pub const IN_PERSON_WEIGHT: u8 = 3;

const EMERGENCY_ACTIONS: &[&str] = &[
    "Seek immediate emergency medical attention",
    "Call emergency services or go to the nearest emergency department",
    "Do not delay seeking care",
];

const URGENT_ACTIONS: &[&str] = &[
    "Seek medical attention within 24 hours",
    "Contact your primary care doctor or an urgent care centre",
    "Monitor symptoms closely",
];

const ROUTINE_ACTIONS: &[&str] = &[
    "Book an appointment within the next week",
    "Monitor symptoms and seek care sooner if they worsen",
];

const SELF_CARE_ACTIONS: &[&str] = &["Try conservative home treatments"];

const SAFETY_NETTING: &[&str] = &[
    "Stay hydrated",
    "Get adequate rest",
    "Monitor symptoms for changes",
    "Keep a symptom diary",
    "Follow up if symptoms worsen or new symptoms develop",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeline {
    #[serde(rename = "now")]
    Now,
    #[serde(rename = "within 24h")]
    Within24Hours,
    #[serde(rename = "within 1 week")]
    WithinOneWeek,
    #[serde(rename = "self-manage")]
    SelfManage,
}

impl Timeline {
    pub fn as_str(self) -> &'static str {
        match self {
            Timeline::Now => "now",
            Timeline::Within24Hours => "within 24h",
            Timeline::WithinOneWeek => "within 1 week",
            Timeline::SelfManage => "self-manage",
        }
    }
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CareSetting {
    #[serde(rename = "emergency department")]
    EmergencyDepartment,
    #[serde(rename = "primary care")]
    PrimaryCare,
    #[serde(rename = "telehealth")]
    Telehealth,
    #[serde(rename = "self-care")]
    SelfCare,
}

impl CareSetting {
    pub fn as_str(self) -> &'static str {
        match self {
            CareSetting::EmergencyDepartment => "emergency department",
            CareSetting::PrimaryCare => "primary care",
            CareSetting::Telehealth => "telehealth",
            CareSetting::SelfCare => "self-care",
        }
    }
}

impl fmt::Display for CareSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareRecommendation {
    pub tier: TriageTier,
    pub timeline: Timeline,
    pub setting: CareSetting,
    pub actions: Vec<String>,
}

impl CareRecommendation {
    /// One-line form stored on the visit record.
    pub fn summary(&self) -> String {
        match self.timeline {
            Timeline::SelfManage => format!("{}: self-manage at home", self.tier),
            timeline => format!("{}: {} {}", self.tier, self.setting, timeline),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CareRecommendationGenerator {
    allow_telehealth: bool,
}

impl Default for CareRecommendationGenerator {
    fn default() -> Self {
        Self {
            allow_telehealth: true,
        }
    }
}

impl CareRecommendationGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never route routine cases to telehealth.
    pub fn in_person_only(mut self) -> Self {
        self.allow_telehealth = false;
        self
    }

    /// Builds the plan for `tier`.
    ///
    /// Actions are, in order: the tier's base actions, actions of the top-ranked candidates
    /// and of any candidate whose risk profile matches the patient, advice for the patient's
    /// risk factors, then general safety-netting. Duplicates keep their first position.
    pub fn recommend(
        &self,
        tier: TriageTier,
        candidates: &[ConditionCandidate],
        risk_factors: &BTreeSet<RiskFactor>,
    ) -> CareRecommendation {
        let (timeline, setting, base): (Timeline, CareSetting, &[&str]) = match tier {
            TriageTier::Emergency => (
                Timeline::Now,
                CareSetting::EmergencyDepartment,
                EMERGENCY_ACTIONS,
            ),
            TriageTier::Urgent => (
                Timeline::Within24Hours,
                CareSetting::PrimaryCare,
                URGENT_ACTIONS,
            ),
            TriageTier::Routine => {
                let needs_exam = candidates
                    .iter()
                    .any(|c| c.severity_weight >= IN_PERSON_WEIGHT);
                let setting = if self.allow_telehealth && !needs_exam {
                    CareSetting::Telehealth
                } else {
                    CareSetting::PrimaryCare
                };
                (
                    Timeline::WithinOneWeek,
                    setting,
                    ROUTINE_ACTIONS,
                )
            }
            TriageTier::SelfCare => (
                Timeline::SelfManage,
                CareSetting::SelfCare,
                SELF_CARE_ACTIONS,
            ),
        };

        let mut actions = ActionList::default();
        actions.extend(base.iter().copied());

        for (rank, candidate) in candidates.iter().enumerate() {
            let profile_match = candidate
                .risk_profile
                .iter()
                .any(|f| risk_factors.contains(f));
            if rank < TOP_CANDIDATE_ACTIONS || profile_match {
                actions.extend(candidate.actions.iter().map(String::as_str));
            }
        }

        actions.extend(risk_factors.iter().filter_map(|f| f.management_advice()));
        actions.extend(SAFETY_NETTING.iter().copied());

        CareRecommendation {
            tier,
            timeline,
            setting,
            actions: actions.0,
        }
    }
}

/// Insertion-ordered, de-duplicated list of actions.
#[derive(Default)]
struct ActionList(Vec<String>);

impl<'a> Extend<&'a str> for ActionList {
    fn extend<I: IntoIterator<Item = &'a str>>(&mut self, iter: I) {
        for action in iter {
            if !self.0.iter().any(|a| a == action) {
                self.0.push(action.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::SymptomKnowledgeBase;
    use crate::symptom::Symptom;

    fn candidates(names: &[&str]) -> Vec<ConditionCandidate> {
        let symptoms: Vec<_> = names.iter().map(|n| Symptom::new(n).unwrap()).collect();
        SymptomKnowledgeBase::builtin()
            .match_conditions(&symptoms)
            .candidates
    }

    #[test]
    fn test_tier_table() {
        let generator = CareRecommendationGenerator::new();
        let none = BTreeSet::new();

        let emergency = generator.recommend(TriageTier::Emergency, &[], &none);
        assert_eq!(emergency.timeline, Timeline::Now);
        assert_eq!(emergency.setting, CareSetting::EmergencyDepartment);

        let urgent = generator.recommend(TriageTier::Urgent, &[], &none);
        assert_eq!(urgent.timeline, Timeline::Within24Hours);
        assert_eq!(urgent.setting, CareSetting::PrimaryCare);

        let self_care = generator.recommend(TriageTier::SelfCare, &[], &none);
        assert_eq!(self_care.timeline, Timeline::SelfManage);
        assert_eq!(self_care.setting, CareSetting::SelfCare);
        assert!(self_care
            .actions
            .ends_with(&SAFETY_NETTING.iter().map(|s| s.to_string()).collect::<Vec<_>>()));
    }

    #[test]
    fn test_routine_setting_depends_on_candidate_weight() {
        let generator = CareRecommendationGenerator::new();
        let none = BTreeSet::new();

        let mild = generator.recommend(TriageTier::Routine, &candidates(&["sneezing"]), &none);
        assert_eq!(mild.setting, CareSetting::Telehealth);

        let chesty = generator.recommend(TriageTier::Routine, &candidates(&["cough"]), &none);
        assert_eq!(chesty.setting, CareSetting::PrimaryCare);

        let in_person = CareRecommendationGenerator::new().in_person_only().recommend(
            TriageTier::Routine,
            &candidates(&["sneezing"]),
            &none,
        );
        assert_eq!(in_person.setting, CareSetting::PrimaryCare);
    }

    #[test]
    fn test_sarah_gets_ergonomic_and_caffeine_advice() {
        let factors: BTreeSet<_> = [RiskFactor::SedentaryWork, RiskFactor::HighCaffeineIntake]
            .into_iter()
            .collect();
        let plan = CareRecommendationGenerator::new().recommend(
            TriageTier::SelfCare,
            &candidates(&["headache"]),
            &factors,
        );
        assert!(plan.actions.iter().any(|a| a.to_lowercase().contains("ergonomic")));
        assert!(plan.actions.iter().any(|a| a.to_lowercase().contains("caffeine")));
    }

    #[test]
    fn test_former_smoker_cough_mentions_imaging() {
        let factors: BTreeSet<_> = [RiskFactor::SmokingHistory, RiskFactor::RecentSmokingCessation]
            .into_iter()
            .collect();
        let plan = CareRecommendationGenerator::new().recommend(
            TriageTier::Urgent,
            &candidates(&["cough"]),
            &factors,
        );
        assert!(plan.actions.iter().any(|a| a.contains("chest imaging")));
        assert!(plan.actions.iter().any(|a| a.contains("smoking cessation")));
    }

    #[test]
    fn test_actions_are_unique_and_deterministic() {
        let factors = BTreeSet::new();
        let input = candidates(&[
            "chest_pain",
            "shortness_of_breath",
            "facial_droop",
            "slurred_speech",
        ]);
        let generator = CareRecommendationGenerator::new();
        let first = generator.recommend(TriageTier::Emergency, &input, &factors);
        let second = generator.recommend(TriageTier::Emergency, &input, &factors);
        assert_eq!(first, second);

        let mut deduped = first.actions.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), first.actions.len());
    }

    #[test]
    fn test_summary_line() {
        let plan = CareRecommendationGenerator::new().recommend(
            TriageTier::Urgent,
            &[],
            &BTreeSet::new(),
        );
        assert_eq!(plan.summary(), "URGENT: primary care within 24h");
    }
}
