//! Risk stratification.
//!
//! Fuses symptoms, demographics, derived risk factors, red flags and the pattern signal into a
//! [`TriageTier`]. Scoring is additive over a fixed [`ScoringPolicy`]; red flags short-circuit to
//! `EMERGENCY` before any weighing happens.

use crate::knowledge::{ConditionCandidate, SymptomKnowledgeBase};
use crate::pattern::PatternSignal;
use crate::risk_factors::{RiskFactor, ADVANCED_AGE_YEARS, EARLY_CHILDHOOD_YEARS};
use crate::symptom::{Symptom, TriageTier};
use crate::{TriageError, TriageResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Weights and thresholds used by [`RiskAssessmentEngine`].
///
/// Thresholds are inclusive: a score equal to a threshold takes the more urgent tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub corroboration_cap: u32,
    pub age_extreme_points: u32,
    pub age_unknown_points: u32,
    pub chronic_match_points: u32,
    pub chronic_match_cap: u32,
    pub unclassified_points: u32,
    pub severe_qualifier: u8,
    pub severe_qualifier_points: u32,
    pub moderate_qualifier: u8,
    pub moderate_qualifier_points: u32,
    pub escalating_points: u32,
    pub recurring_points: u32,
    pub emergency_threshold: u32,
    pub urgent_threshold: u32,
    pub routine_threshold: u32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            corroboration_cap: 2,
            age_extreme_points: 2,
            age_unknown_points: 1,
            chronic_match_points: 2,
            chronic_match_cap: 4,
            unclassified_points: 1,
            severe_qualifier: 8,
            severe_qualifier_points: 2,
            moderate_qualifier: 6,
            moderate_qualifier_points: 1,
            escalating_points: 2,
            recurring_points: 1,
            emergency_threshold: 10,
            urgent_threshold: 6,
            routine_threshold: 3,
        }
    }
}

impl ScoringPolicy {
    pub fn tier_for(&self, score: u32) -> TriageTier {
        if score >= self.emergency_threshold {
            TriageTier::Emergency
        } else if score >= self.urgent_threshold {
            TriageTier::Urgent
        } else if score >= self.routine_threshold {
            TriageTier::Routine
        } else {
            TriageTier::SelfCare
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionKind {
    RedFlag,
    Condition,
    Corroboration,
    Age,
    RiskFactor,
    Unclassified,
    Severity,
    Pattern,
    MissingInformation,
}

/// One line of the explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub kind: ContributionKind,
    pub detail: String,
    pub points: u32,
}

impl Contribution {
    fn new(kind: ContributionKind, detail: impl Into<String>, points: u32) -> Self {
        Self {
            kind,
            detail: detail.into(),
            points,
        }
    }
}

/// Everything the engine weighs for one assessment.
#[derive(Debug, Clone, Copy)]
pub struct RiskInput<'a> {
    pub symptoms: &'a [Symptom],
    /// `None` when the patient's age is not known.
    pub age: Option<u32>,
    pub risk_factors: &'a BTreeSet<RiskFactor>,
    pub red_flags: &'a [Symptom],
    pub pattern: PatternSignal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub tier: TriageTier,
    /// `None` when red flags decided the tier without scoring.
    pub score: Option<u32>,
    pub explanation: Vec<Contribution>,
    pub candidates: Vec<ConditionCandidate>,
    pub unclassified: Vec<String>,
    pub red_flags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RiskAssessmentEngine {
    kb: Arc<SymptomKnowledgeBase>,
    policy: ScoringPolicy,
}

impl RiskAssessmentEngine {
    pub fn new(kb: Arc<SymptomKnowledgeBase>) -> Self {
        Self::with_policy(kb, ScoringPolicy::default())
    }

    pub fn with_policy(kb: Arc<SymptomKnowledgeBase>, policy: ScoringPolicy) -> Self {
        Self { kb, policy }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Computes the triage tier and its explanation.
    ///
    /// The result does not depend on the order of `symptoms` or `red_flags`.
    ///
    /// # Errors
    ///
    /// Returns `TriageError::InvalidInput` if `symptoms` is empty.
    pub fn assess(&self, input: &RiskInput<'_>) -> TriageResult<RiskAssessment> {
        if input.symptoms.is_empty() {
            return Err(TriageError::InvalidInput(
                "cannot assess risk without at least one symptom".into(),
            ));
        }

        let matches = self.kb.match_conditions(input.symptoms);
        let mut unclassified = matches.unclassified.clone();
        unclassified.sort();

        let mut red_flags: Vec<String> = input
            .red_flags
            .iter()
            .chain(self.kb.detect_red_flags(input.symptoms).iter())
            .map(|s| s.name.clone())
            .collect();
        red_flags.sort();
        red_flags.dedup();

        if !red_flags.is_empty() {
            let explanation = red_flags
                .iter()
                .map(|name| Contribution::new(ContributionKind::RedFlag, name.clone(), 0))
                .collect();
            tracing::debug!(red_flags = red_flags.len(), "red flags force emergency tier");
            return Ok(RiskAssessment {
                tier: TriageTier::Emergency,
                score: None,
                explanation,
                candidates: matches.candidates,
                unclassified,
                red_flags,
            });
        }

        let policy = &self.policy;
        let mut explanation = Vec::new();

        let top_weight = u32::from(matches.top_weight());
        if top_weight > 0 {
            let best = matches.best_overlap();
            let mut leaders: Vec<&str> = matches
                .candidates
                .iter()
                .filter(|c| c.overlap() == best && u32::from(c.severity_weight) == top_weight)
                .map(|c| c.label.as_str())
                .collect();
            leaders.sort_unstable();
            explanation.push(Contribution::new(
                ContributionKind::Condition,
                format!("best-supported candidate: {}", leaders.join(", ")),
                top_weight,
            ));
        }

        let corroborated = matches
            .candidates
            .iter()
            .filter(|c| c.overlap() >= 2)
            .count() as u32;
        if corroborated > 0 {
            explanation.push(Contribution::new(
                ContributionKind::Corroboration,
                format!("{corroborated} condition(s) supported by several symptoms"),
                corroborated.min(policy.corroboration_cap),
            ));
        }

        match input.age {
            Some(age) if age >= ADVANCED_AGE_YEARS || age <= EARLY_CHILDHOOD_YEARS => {
                explanation.push(Contribution::new(
                    ContributionKind::Age,
                    format!("age {age}"),
                    policy.age_extreme_points,
                ));
            }
            Some(_) => {}
            None => explanation.push(Contribution::new(
                ContributionKind::MissingInformation,
                "age unknown",
                policy.age_unknown_points,
            )),
        }

        let mut chronic_budget = policy.chronic_match_cap;
        for factor in input.risk_factors.iter().filter(|f| f.is_chronic()) {
            if chronic_budget == 0 {
                break;
            }
            let relevant = matches
                .candidates
                .iter()
                .any(|c| c.risk_profile.contains(factor));
            if relevant {
                let points = policy.chronic_match_points.min(chronic_budget);
                chronic_budget -= points;
                explanation.push(Contribution::new(
                    ContributionKind::RiskFactor,
                    factor.as_str(),
                    points,
                ));
            }
        }

        if !unclassified.is_empty() {
            explanation.push(Contribution::new(
                ContributionKind::Unclassified,
                format!("unrecognised symptom(s): {}", unclassified.join(", ")),
                policy.unclassified_points,
            ));
        }

        if let Some(worst) = input.symptoms.iter().filter_map(|s| s.severity).max() {
            let points = if worst.value() >= policy.severe_qualifier {
                policy.severe_qualifier_points
            } else if worst.value() >= policy.moderate_qualifier {
                policy.moderate_qualifier_points
            } else {
                0
            };
            if points > 0 {
                explanation.push(Contribution::new(
                    ContributionKind::Severity,
                    format!("reported severity {worst}"),
                    points,
                ));
            }
        }

        let pattern_points = match input.pattern {
            PatternSignal::Escalating => policy.escalating_points,
            PatternSignal::Recurring => policy.recurring_points,
            PatternSignal::None => 0,
        };
        if pattern_points > 0 {
            explanation.push(Contribution::new(
                ContributionKind::Pattern,
                input.pattern.as_str().to_lowercase(),
                pattern_points,
            ));
        }

        let mut score: u32 = explanation.iter().map(|c| c.points).sum();

        if matches.candidates.is_empty() && score < policy.routine_threshold {
            let lift = policy.routine_threshold - score;
            explanation.push(Contribution::new(
                ContributionKind::MissingInformation,
                "no recognised symptoms",
                lift,
            ));
            score += lift;
        }

        let tier = policy.tier_for(score);
        tracing::debug!(score, %tier, "computed triage tier");

        Ok(RiskAssessment {
            tier,
            score: Some(score),
            explanation,
            candidates: matches.candidates,
            unclassified,
            red_flags,
        })
    }
}
