//! Recurring and escalating symptom patterns across visits.

use crate::knowledge::SymptomKnowledgeBase;
use crate::record::VisitSummary;
use crate::symptom::Symptom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Advisory signal fed into risk scoring; never sets a tier on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternSignal {
    #[default]
    None,
    Recurring,
    Escalating,
}

impl PatternSignal {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternSignal::None => "NONE",
            PatternSignal::Recurring => "RECURRING",
            PatternSignal::Escalating => "ESCALATING",
        }
    }
}

impl fmt::Display for PatternSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pattern signal plus the evidence behind it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternReport {
    pub signal: PatternSignal,
    /// Current symptoms also present in a recent unresolved visit.
    pub recurring_symptoms: Vec<String>,
    pub escalating: bool,
}

#[derive(Debug, Clone)]
pub struct SymptomPatternAnalyzer {
    kb: Arc<SymptomKnowledgeBase>,
    window: usize,
}

impl SymptomPatternAnalyzer {
    /// `window` counts the current visit, so `window - 1` stored visits are examined.
    pub fn new(kb: Arc<SymptomKnowledgeBase>, window: usize) -> Self {
        Self {
            kb,
            window: window.max(2),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Compares the current symptoms with the stored visit history (oldest first).
    pub fn analyze(&self, current: &[Symptom], history: &[VisitSummary]) -> PatternReport {
        let lookback = self.window - 1;
        let recent = &history[history.len().saturating_sub(lookback)..];

        let mut recurring_symptoms: Vec<String> = Vec::new();
        for symptom in current {
            let seen = recent
                .iter()
                .filter(|v| !v.resolved)
                .any(|v| v.has_symptom(&symptom.name));
            if seen && !recurring_symptoms.contains(&symptom.name) {
                recurring_symptoms.push(symptom.name.clone());
            }
        }

        let escalating = history
            .last()
            .is_some_and(|previous| self.exceeds(current, &previous.symptoms));

        let signal = if escalating {
            PatternSignal::Escalating
        } else if !recurring_symptoms.is_empty() {
            PatternSignal::Recurring
        } else {
            PatternSignal::None
        };

        tracing::debug!(%signal, recurring = recurring_symptoms.len(), "analysed symptom pattern");
        PatternReport {
            signal,
            recurring_symptoms,
            escalating,
        }
    }

    fn exceeds(&self, current: &[Symptom], previous: &[Symptom]) -> bool {
        let recognised = |symptoms: &[Symptom]| {
            symptoms
                .iter()
                .filter(|s| self.kb.is_known(&s.name))
                .map(|s| s.name.as_str())
                .collect::<HashSet<_>>()
                .len()
        };
        let current_weight = self.kb.match_conditions(current).top_weight();
        let previous_weight = self.kb.match_conditions(previous).top_weight();

        recognised(current) > recognised(previous) || current_weight > previous_weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symptom::TriageTier;

    fn analyzer(window: usize) -> SymptomPatternAnalyzer {
        SymptomPatternAnalyzer::new(Arc::new(SymptomKnowledgeBase::builtin()), window)
    }

    fn symptoms(names: &[&str]) -> Vec<Symptom> {
        names.iter().map(|n| Symptom::new(n).unwrap()).collect()
    }

    fn visit(names: &[&str]) -> VisitSummary {
        VisitSummary::new(symptoms(names), TriageTier::SelfCare, "rest", "").unwrap()
    }

    #[test]
    fn test_no_history_means_no_pattern() {
        let report = analyzer(5).analyze(&symptoms(&["headache"]), &[]);
        assert_eq!(report.signal, PatternSignal::None);
    }

    #[test]
    fn test_repeat_headache_is_recurring() {
        let history = vec![visit(&["headache"]), visit(&["cough"])];
        let report = analyzer(5).analyze(&symptoms(&["headache"]), &history);
        assert_eq!(report.signal, PatternSignal::Recurring);
        assert_eq!(report.recurring_symptoms, vec!["headache"]);
    }

    #[test]
    fn test_resolved_and_out_of_window_visits_do_not_recur() {
        let resolved = vec![visit(&["headache"]).resolved()];
        assert_eq!(
            analyzer(5)
                .analyze(&symptoms(&["headache"]), &resolved)
                .signal,
            PatternSignal::None
        );

        let old = vec![
            visit(&["headache"]),
            visit(&["fatigue"]),
            visit(&["fatigue"]),
        ];
        assert_eq!(
            analyzer(3).analyze(&symptoms(&["headache"]), &old).signal,
            PatternSignal::None
        );
        assert_eq!(
            analyzer(4).analyze(&symptoms(&["headache"]), &old).signal,
            PatternSignal::Recurring
        );
    }

    #[test]
    fn test_more_symptoms_than_last_visit_is_escalating() {
        let history = vec![visit(&["headache"])];
        let report = analyzer(5).analyze(&symptoms(&["headache", "nausea"]), &history);
        assert_eq!(report.signal, PatternSignal::Escalating);
        assert!(report.escalating);
        assert_eq!(report.recurring_symptoms, vec!["headache"]);
    }

    #[test]
    fn test_heavier_condition_is_escalating() {
        let history = vec![visit(&["runny_nose"])];
        let report = analyzer(5).analyze(&symptoms(&["cough"]), &history);
        assert_eq!(report.signal, PatternSignal::Escalating);
    }

    #[test]
    fn test_unknown_symptoms_do_not_count_toward_escalation() {
        let history = vec![visit(&["headache"])];
        let report = analyzer(5).analyze(&symptoms(&["headache", "wobbly_aura"]), &history);
        assert_eq!(report.signal, PatternSignal::Recurring);
    }
}
