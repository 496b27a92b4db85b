//! Derived risk factors.
//!
//! The record holds what the patient told us (`RiskFactorEntry`, history, lifestyle). The risk
//! engine wants a closed vocabulary instead, so this module folds the record into a set of
//! [`RiskFactor`]s.

use crate::record::{
    ExerciseFrequency, HistoryCategory, IntakeLevel, PatientRecord, RiskFactorEntry,
    WorkEnvironment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Age at or above which `AdvancedAge` applies.
pub const ADVANCED_AGE_YEARS: u32 = 65;
/// Age at or below which `EarlyChildhood` applies.
pub const EARLY_CHILDHOOD_YEARS: u32 = 2;
/// Pack-years above which smoking counts as heavy.
pub const HEAVY_SMOKING_PACK_YEARS: f32 = 10.0;
/// Months since quitting during which cessation counts as recent.
pub const RECENT_CESSATION_MONTHS: u32 = 12;
/// Nightly sleep below this is chronic deprivation.
pub const MIN_HEALTHY_SLEEP_HOURS: f32 = 6.0;
/// Self-reported stress at or above this is high.
pub const HIGH_STRESS_LEVEL: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    AdvancedAge,
    EarlyChildhood,
    SmokingHistory,
    HeavySmokingHistory,
    RecentSmokingCessation,
    CardiovascularDisease,
    Hypertension,
    Diabetes,
    ChronicLungDisease,
    Immunocompromised,
    CancerHistory,
    OtherChronicCondition,
    SedentaryWork,
    HighCaffeineIntake,
    ChronicSleepDeprivation,
    HighStress,
    PhysicalInactivity,
    FamilyHistory,
    OccupationalExposure,
}

impl RiskFactor {
    pub const ALL: [RiskFactor; 19] = [
        RiskFactor::AdvancedAge,
        RiskFactor::EarlyChildhood,
        RiskFactor::SmokingHistory,
        RiskFactor::HeavySmokingHistory,
        RiskFactor::RecentSmokingCessation,
        RiskFactor::CardiovascularDisease,
        RiskFactor::Hypertension,
        RiskFactor::Diabetes,
        RiskFactor::ChronicLungDisease,
        RiskFactor::Immunocompromised,
        RiskFactor::CancerHistory,
        RiskFactor::OtherChronicCondition,
        RiskFactor::SedentaryWork,
        RiskFactor::HighCaffeineIntake,
        RiskFactor::ChronicSleepDeprivation,
        RiskFactor::HighStress,
        RiskFactor::PhysicalInactivity,
        RiskFactor::FamilyHistory,
        RiskFactor::OccupationalExposure,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskFactor::AdvancedAge => "advanced_age",
            RiskFactor::EarlyChildhood => "early_childhood",
            RiskFactor::SmokingHistory => "smoking_history",
            RiskFactor::HeavySmokingHistory => "heavy_smoking_history",
            RiskFactor::RecentSmokingCessation => "recent_smoking_cessation",
            RiskFactor::CardiovascularDisease => "cardiovascular_disease",
            RiskFactor::Hypertension => "hypertension",
            RiskFactor::Diabetes => "diabetes",
            RiskFactor::ChronicLungDisease => "chronic_lung_disease",
            RiskFactor::Immunocompromised => "immunocompromised",
            RiskFactor::CancerHistory => "cancer_history",
            RiskFactor::OtherChronicCondition => "other_chronic_condition",
            RiskFactor::SedentaryWork => "sedentary_work",
            RiskFactor::HighCaffeineIntake => "high_caffeine_intake",
            RiskFactor::ChronicSleepDeprivation => "chronic_sleep_deprivation",
            RiskFactor::HighStress => "high_stress",
            RiskFactor::PhysicalInactivity => "physical_inactivity",
            RiskFactor::FamilyHistory => "family_history",
            RiskFactor::OccupationalExposure => "occupational_exposure",
        }
    }

    /// Long-standing conditions that weigh on risk scoring when they match a candidate.
    pub fn is_chronic(self) -> bool {
        matches!(
            self,
            RiskFactor::SmokingHistory
                | RiskFactor::HeavySmokingHistory
                | RiskFactor::RecentSmokingCessation
                | RiskFactor::CardiovascularDisease
                | RiskFactor::Hypertension
                | RiskFactor::Diabetes
                | RiskFactor::ChronicLungDisease
                | RiskFactor::Immunocompromised
                | RiskFactor::CancerHistory
                | RiskFactor::OtherChronicCondition
        )
    }

    /// High-priority factors in the risk-profile view.
    pub fn is_high_priority(self) -> bool {
        self.is_chronic()
            || matches!(
                self,
                RiskFactor::AdvancedAge
                    | RiskFactor::EarlyChildhood
                    | RiskFactor::ChronicSleepDeprivation
            )
    }

    /// Targeted management advice for this factor, if any.
    pub fn management_advice(self) -> Option<&'static str> {
        match self {
            RiskFactor::SmokingHistory
            | RiskFactor::HeavySmokingHistory
            | RiskFactor::RecentSmokingCessation => {
                Some("Continue smoking cessation support and monitoring")
            }
            RiskFactor::AdvancedAge => {
                Some("Regular health screenings and fall prevention measures")
            }
            RiskFactor::ChronicSleepDeprivation => {
                Some("Sleep hygiene counseling and stress management")
            }
            RiskFactor::HighStress => Some("Stress management and relaxation techniques"),
            RiskFactor::SedentaryWork => Some("Ergonomic assessment and regular movement breaks"),
            RiskFactor::HighCaffeineIntake => {
                Some("Gradual caffeine reduction and hydration counseling")
            }
            RiskFactor::PhysicalInactivity => {
                Some("Build up to regular moderate physical activity")
            }
            RiskFactor::CardiovascularDisease
            | RiskFactor::Hypertension
            | RiskFactor::Diabetes
            | RiskFactor::ChronicLungDisease => {
                Some("Keep chronic condition reviews and medication up to date")
            }
            _ => None,
        }
    }
}

impl fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RiskFactor {
    type Err = crate::TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = crate::symptom::Symptom::normalise(s);
        RiskFactor::ALL
            .into_iter()
            .find(|f| f.as_str() == token)
            .ok_or_else(|| crate::TriageError::InvalidInput(format!("unknown risk factor: {s}")))
    }
}

/// Keyword families used to classify free-text history and risk descriptions.
const CONDITION_KEYWORDS: &[(RiskFactor, &[&str])] = &[
    (
        RiskFactor::CardiovascularDisease,
        &["heart", "cardiac", "coronary", "angina", "arrhythmia", "myocardial"],
    ),
    (
        RiskFactor::Hypertension,
        &["hypertension", "high blood pressure"],
    ),
    (RiskFactor::Diabetes, &["diabetes", "diabetic"]),
    (
        RiskFactor::ChronicLungDisease,
        &["copd", "asthma", "emphysema", "chronic bronchitis", "pulmonary"],
    ),
    (
        RiskFactor::Immunocompromised,
        &["immunocompromised", "immunodeficiency", "hiv", "transplant", "chemotherapy"],
    ),
    (
        RiskFactor::CancerHistory,
        &["cancer", "tumour", "tumor", "lymphoma", "leukaemia", "leukemia", "carcinoma"],
    ),
];

fn classify_description(text: &str) -> Vec<RiskFactor> {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    CONDITION_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| contains_phrase(&words, k)))
        .map(|(factor, _)| *factor)
        .collect()
}

/// Whole-word match; multi-word keywords must appear as consecutive words.
fn contains_phrase(words: &[&str], keyword: &str) -> bool {
    let phrase: Vec<&str> = keyword.split(' ').collect();
    words.windows(phrase.len()).any(|window| window == phrase.as_slice())
}

/// Folds a record's demographics, lifestyle, history and recorded risk entries into the
/// derived factor set.
pub fn derive_risk_factors(record: &PatientRecord) -> BTreeSet<RiskFactor> {
    let mut factors = BTreeSet::new();

    let age = record.demographics.age;
    if age >= ADVANCED_AGE_YEARS {
        factors.insert(RiskFactor::AdvancedAge);
    } else if age <= EARLY_CHILDHOOD_YEARS {
        factors.insert(RiskFactor::EarlyChildhood);
    }

    for entry in &record.medical_history {
        let matched = classify_description(entry.description.as_str());
        if matched.is_empty() {
            if entry.category == HistoryCategory::ChronicCondition {
                factors.insert(RiskFactor::OtherChronicCondition);
            }
        } else if entry.category != HistoryCategory::PastProcedure
            || matched.contains(&RiskFactor::CancerHistory)
        {
            factors.extend(matched);
        }
    }

    for entry in &record.risk_factors {
        match entry {
            RiskFactorEntry::Smoking {
                quit_months_ago, ..
            } => {
                factors.insert(RiskFactor::SmokingHistory);
                if entry
                    .pack_years()
                    .is_some_and(|py| py > HEAVY_SMOKING_PACK_YEARS)
                {
                    factors.insert(RiskFactor::HeavySmokingHistory);
                }
                if quit_months_ago.is_some_and(|m| m < RECENT_CESSATION_MONTHS) {
                    factors.insert(RiskFactor::RecentSmokingCessation);
                }
            }
            RiskFactorEntry::FamilyHistory { .. } => {
                factors.insert(RiskFactor::FamilyHistory);
            }
            RiskFactorEntry::OccupationalExposure { .. } => {
                factors.insert(RiskFactor::OccupationalExposure);
            }
            RiskFactorEntry::Other { description } => {
                factors.extend(classify_description(description.as_str()));
            }
        }
    }

    let lifestyle = &record.lifestyle;
    if lifestyle.work_environment == Some(WorkEnvironment::Desk) {
        factors.insert(RiskFactor::SedentaryWork);
    }
    if lifestyle.caffeine_intake == Some(IntakeLevel::High) {
        factors.insert(RiskFactor::HighCaffeineIntake);
    }
    if lifestyle
        .sleep_hours
        .is_some_and(|h| h < MIN_HEALTHY_SLEEP_HOURS)
    {
        factors.insert(RiskFactor::ChronicSleepDeprivation);
    }
    if lifestyle.stress_level.is_some_and(|s| s >= HIGH_STRESS_LEVEL) {
        factors.insert(RiskFactor::HighStress);
    }
    if lifestyle.exercise_frequency == Some(ExerciseFrequency::None) {
        factors.insert(RiskFactor::PhysicalInactivity);
    }

    factors
}

/// Risk factors split by priority, with targeted management advice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub patient_name: String,
    pub age: u32,
    pub high_priority: Vec<RiskFactor>,
    pub moderate: Vec<RiskFactor>,
    pub recommendations: Vec<String>,
}

impl RiskProfile {
    pub fn from_record(record: &PatientRecord) -> Self {
        let factors = derive_risk_factors(record);
        let (high_priority, moderate): (Vec<_>, Vec<_>) =
            factors.iter().copied().partition(|f| f.is_high_priority());

        let mut recommendations: Vec<String> = Vec::new();
        for advice in high_priority
            .iter()
            .chain(moderate.iter())
            .filter_map(|f| f.management_advice())
        {
            if !recommendations.iter().any(|r| r == advice) {
                recommendations.push(advice.to_string());
            }
        }

        Self {
            patient_name: record.demographics.name.to_string(),
            age: record.demographics.age,
            high_priority,
            moderate,
            recommendations,
        }
    }

    pub fn total(&self) -> usize {
        self.high_priority.len() + self.moderate.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Demographics, HistoryEntry, Lifestyle, Onboarding};
    use chrono::Utc;
    use triage_types::NonEmptyText;
    use triage_uuid::PatientId;

    fn record(age: u32, lifestyle: Lifestyle) -> Onboarding {
        Onboarding::new(Demographics::new("Test", age, "tester").unwrap(), lifestyle)
    }

    fn build(onboarding: Onboarding) -> PatientRecord {
        onboarding.into_record(PatientId::parse("test").unwrap(), Utc::now())
    }

    #[test]
    fn test_desk_worker_with_high_caffeine() {
        let rec = build(record(
            28,
            Lifestyle {
                work_environment: Some(WorkEnvironment::Desk),
                caffeine_intake: Some(IntakeLevel::High),
                ..Default::default()
            },
        ));
        let factors = derive_risk_factors(&rec);
        assert_eq!(
            factors.into_iter().collect::<Vec<_>>(),
            vec![RiskFactor::SedentaryWork, RiskFactor::HighCaffeineIntake]
        );
    }

    #[test]
    fn test_recent_heavy_smoker() {
        let rec = build(record(45, Lifestyle::default()).with_risk_factor(
            RiskFactorEntry::Smoking {
                years: 20,
                packs_per_day: None,
                quit_months_ago: Some(6),
            },
        ));
        let factors = derive_risk_factors(&rec);
        assert!(factors.contains(&RiskFactor::SmokingHistory));
        assert!(factors.contains(&RiskFactor::HeavySmokingHistory));
        assert!(factors.contains(&RiskFactor::RecentSmokingCessation));
        assert!(factors.iter().all(|f| f.is_chronic()));
    }

    #[test]
    fn test_light_smoker_long_quit() {
        let rec = build(record(45, Lifestyle::default()).with_risk_factor(
            RiskFactorEntry::Smoking {
                years: 4,
                packs_per_day: Some(0.5),
                quit_months_ago: Some(60),
            },
        ));
        let factors = derive_risk_factors(&rec);
        assert_eq!(factors.len(), 1);
        assert!(factors.contains(&RiskFactor::SmokingHistory));
    }

    #[test]
    fn test_age_boundaries() {
        assert!(derive_risk_factors(&build(record(65, Lifestyle::default())))
            .contains(&RiskFactor::AdvancedAge));
        assert!(derive_risk_factors(&build(record(64, Lifestyle::default()))).is_empty());
        assert!(derive_risk_factors(&build(record(2, Lifestyle::default())))
            .contains(&RiskFactor::EarlyChildhood));
        assert!(derive_risk_factors(&build(record(3, Lifestyle::default()))).is_empty());
    }

    #[test]
    fn test_history_keywords() {
        let rec = build(
            record(50, Lifestyle::default())
                .with_history(HistoryEntry::chronic("Type 2 Diabetes").unwrap())
                .with_history(HistoryEntry::chronic("COPD").unwrap())
                .with_history(HistoryEntry::chronic("gout").unwrap())
                .with_history(HistoryEntry {
                    description: NonEmptyText::new("knee arthroscopy").unwrap(),
                    category: HistoryCategory::PastProcedure,
                    since: None,
                }),
        );
        let factors = derive_risk_factors(&rec);
        assert!(factors.contains(&RiskFactor::Diabetes));
        assert!(factors.contains(&RiskFactor::ChronicLungDisease));
        assert!(factors.contains(&RiskFactor::OtherChronicCondition));
        assert_eq!(factors.len(), 3);
    }

    #[test]
    fn test_lifestyle_thresholds() {
        let rec = build(record(
            30,
            Lifestyle {
                sleep_hours: Some(5.5),
                stress_level: Some(7),
                exercise_frequency: Some(ExerciseFrequency::None),
                ..Default::default()
            },
        ));
        let factors = derive_risk_factors(&rec);
        assert!(factors.contains(&RiskFactor::ChronicSleepDeprivation));
        assert!(factors.contains(&RiskFactor::HighStress));
        assert!(factors.contains(&RiskFactor::PhysicalInactivity));

        let rested = build(record(
            30,
            Lifestyle {
                sleep_hours: Some(6.0),
                stress_level: Some(6),
                ..Default::default()
            },
        ));
        assert!(derive_risk_factors(&rested).is_empty());
    }

    #[test]
    fn test_risk_profile_split_and_advice() {
        let rec = build(
            record(
                70,
                Lifestyle {
                    work_environment: Some(WorkEnvironment::Desk),
                    ..Default::default()
                },
            )
            .with_risk_factor(RiskFactorEntry::Smoking {
                years: 30,
                packs_per_day: Some(1.0),
                quit_months_ago: None,
            }),
        );
        let profile = RiskProfile::from_record(&rec);
        assert!(profile.high_priority.contains(&RiskFactor::AdvancedAge));
        assert!(profile.high_priority.contains(&RiskFactor::SmokingHistory));
        assert_eq!(profile.moderate, vec![RiskFactor::SedentaryWork]);
        assert_eq!(
            profile
                .recommendations
                .iter()
                .filter(|r| r.contains("smoking cessation"))
                .count(),
            1
        );
        assert!(profile
            .recommendations
            .iter()
            .any(|r| r.contains("Ergonomic")));
        assert_eq!(profile.total(), 4);
    }

    #[test]
    fn test_risk_factor_from_str() {
        assert_eq!(
            "Heavy Smoking History".parse::<RiskFactor>().unwrap(),
            RiskFactor::HeavySmokingHistory
        );
        assert!("unicorn".parse::<RiskFactor>().is_err());
    }

    #[test]
    fn test_keywords_match_whole_words_only() {
        assert!(classify_description("heartburn").is_empty());
        assert!(classify_description("archive work").is_empty());
        assert_eq!(classify_description("heart failure"), vec![RiskFactor::CardiovascularDisease]);
        assert_eq!(classify_description("High Blood Pressure"), vec![RiskFactor::Hypertension]);
        assert_eq!(
            classify_description("chronic_bronchitis"),
            vec![RiskFactor::ChronicLungDisease]
        );
        assert!(classify_description("blood pressure, high").is_empty());

        let rec = build(
            record(40, Lifestyle::default())
                .with_history(HistoryEntry::chronic("Heartburn").unwrap()),
        );
        let factors = derive_risk_factors(&rec);
        assert_eq!(
            factors.into_iter().collect::<Vec<_>>(),
            vec![RiskFactor::OtherChronicCondition]
        );
    }
}
