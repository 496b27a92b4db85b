//! Built-in condition catalogue.
//!
//! Declarative content only. Order matters: earlier conditions win ties in candidate ranking.

use super::{Catalogue, Condition};
use crate::risk_factors::RiskFactor;
use std::collections::BTreeMap;

struct ConditionRow {
    id: &'static str,
    label: &'static str,
    description: &'static str,
    symptoms: &'static [&'static str],
    red_flag: bool,
    red_flag_core: &'static [&'static str],
    severity_weight: u8,
    risk_profile: &'static [RiskFactor],
    actions: &'static [&'static str],
}

use RiskFactor::*;

const SMOKING: &[RiskFactor] = &[SmokingHistory, HeavySmokingHistory, RecentSmokingCessation];

const CONDITIONS: &[ConditionRow] = &[
    ConditionRow {
        id: "acute_coronary_syndrome",
        label: "Acute coronary syndrome",
        description: "Reduced blood flow to the heart, including heart attack",
        symptoms: &[
            "chest_pain",
            "shortness_of_breath",
            "severe_chest_pain",
            "arm_pain",
            "jaw_pain",
            "sweating",
        ],
        red_flag: true,
        red_flag_core: &["chest_pain", "shortness_of_breath"],
        severity_weight: 6,
        risk_profile: &[
            AdvancedAge,
            CardiovascularDisease,
            Hypertension,
            Diabetes,
            SmokingHistory,
            HeavySmokingHistory,
            FamilyHistory,
        ],
        actions: &[
            "Call emergency services immediately",
            "Chew aspirin if not allergic",
            "Do not drive yourself to hospital",
        ],
    },
    ConditionRow {
        id: "stroke",
        label: "Stroke",
        description: "Interrupted blood supply to part of the brain",
        symptoms: &[
            "signs_of_stroke",
            "facial_droop",
            "slurred_speech",
            "arm_weakness",
            "sudden_confusion",
        ],
        red_flag: true,
        red_flag_core: &["facial_droop", "slurred_speech"],
        severity_weight: 8,
        risk_profile: &[AdvancedAge, Hypertension, CardiovascularDisease, Diabetes, SmokingHistory],
        actions: &[
            "Call emergency services immediately",
            "Note the time symptoms started",
        ],
    },
    ConditionRow {
        id: "anaphylaxis",
        label: "Anaphylaxis",
        description: "Severe, potentially life-threatening allergic reaction",
        symptoms: &["severe_allergic_reaction", "throat_swelling", "hives", "difficulty_breathing"],
        red_flag: true,
        red_flag_core: &["throat_swelling", "hives"],
        severity_weight: 8,
        risk_profile: &[],
        actions: &[
            "Use an adrenaline auto-injector if one is prescribed",
            "Call emergency services immediately",
        ],
    },
    ConditionRow {
        id: "computer_vision_strain",
        label: "Computer vision strain",
        description: "Eye strain and headache from prolonged screen use",
        symptoms: &["headache", "eye_strain", "blurred_vision", "neck_pain"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 1,
        risk_profile: &[SedentaryWork],
        actions: &[
            "Review workstation ergonomics (screen at eye level, arm's length away)",
            "Follow the 20-20-20 rule: every 20 minutes look 20 feet away for 20 seconds",
            "Take regular screen breaks",
        ],
    },
    ConditionRow {
        id: "tension_headache",
        label: "Tension headache",
        description: "Band-like headache often linked to stress and posture",
        symptoms: &["headache", "neck_pain", "fatigue"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 1,
        risk_profile: &[HighStress, SedentaryWork],
        actions: &[
            "Over-the-counter pain relief as directed",
            "Practice relaxation techniques",
        ],
    },
    ConditionRow {
        id: "caffeine_related_headache",
        label: "Caffeine-related headache",
        description: "Headache from high caffeine intake or withdrawal",
        symptoms: &["headache", "fatigue", "irritability", "insomnia"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 1,
        risk_profile: &[HighCaffeineIntake],
        actions: &[
            "Reduce caffeine gradually rather than stopping abruptly",
            "Replace some caffeinated drinks with water",
        ],
    },
    ConditionRow {
        id: "migraine",
        label: "Migraine",
        description: "Recurrent moderate to severe headache with sensory symptoms",
        symptoms: &["headache", "nausea", "vomiting", "sensitivity_to_light", "visual_disturbance"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 2,
        risk_profile: &[FamilyHistory, ChronicSleepDeprivation],
        actions: &[
            "Rest in a dark, quiet room",
            "Keep a headache diary to identify triggers",
        ],
    },
    ConditionRow {
        id: "dehydration",
        label: "Dehydration",
        description: "Insufficient body fluids",
        symptoms: &["headache", "dizziness", "fatigue", "dry_mouth"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 1,
        risk_profile: &[AdvancedAge, EarlyChildhood],
        actions: &["Increase fluid intake steadily"],
    },
    ConditionRow {
        id: "sleep_deprivation",
        label: "Sleep deprivation",
        description: "Symptoms from insufficient or poor-quality sleep",
        symptoms: &["fatigue", "headache", "poor_concentration", "irritability"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 1,
        risk_profile: &[ChronicSleepDeprivation, HighStress],
        actions: &["Keep a regular sleep schedule and limit screens before bed"],
    },
    ConditionRow {
        id: "common_cold",
        label: "Common cold",
        description: "Viral upper respiratory infection",
        symptoms: &["runny_nose", "sore_throat", "cough", "sneezing", "fever"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 1,
        risk_profile: &[],
        actions: &[
            "Rest and hydration",
            "Over-the-counter medications for symptom relief",
            "See a doctor if symptoms worsen or last more than 10 days",
        ],
    },
    ConditionRow {
        id: "influenza",
        label: "Influenza",
        description: "Influenza viral infection",
        symptoms: &[
            "fever",
            "cough",
            "sore_throat",
            "runny_nose",
            "headache",
            "fatigue",
            "body_aches",
            "nausea",
            "vomiting",
        ],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 2,
        risk_profile: &[
            AdvancedAge,
            EarlyChildhood,
            ChronicLungDisease,
            Immunocompromised,
            Diabetes,
        ],
        actions: &[
            "Rest and hydration",
            "Antiviral medications if caught early",
            "Monitor for complications",
        ],
    },
    ConditionRow {
        id: "covid_19",
        label: "COVID-19",
        description: "SARS-CoV-2 respiratory infection",
        symptoms: &[
            "fever",
            "cough",
            "fatigue",
            "loss_of_taste",
            "shortness_of_breath",
            "sore_throat",
        ],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 3,
        risk_profile: &[
            AdvancedAge,
            Immunocompromised,
            Diabetes,
            ChronicLungDisease,
            CardiovascularDisease,
        ],
        actions: &[
            "Take a COVID-19 test",
            "Isolate until fever-free",
        ],
    },
    ConditionRow {
        id: "bronchitis",
        label: "Bronchitis",
        description: "Inflammation of the airways, often after a cold",
        symptoms: &["cough", "chest_tightness", "fatigue", "wheezing"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 2,
        risk_profile: &[
            SmokingHistory,
            HeavySmokingHistory,
            ChronicLungDisease,
            OccupationalExposure,
        ],
        actions: &["Use steam inhalation and stay hydrated"],
    },
    ConditionRow {
        id: "pneumonia",
        label: "Pneumonia",
        description: "Lung infection causing inflammation",
        symptoms: &["cough", "fever", "shortness_of_breath", "chest_pain", "chills"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 4,
        risk_profile: &[
            AdvancedAge,
            EarlyChildhood,
            ChronicLungDisease,
            Immunocompromised,
            SmokingHistory,
        ],
        actions: &[
            "See a doctor promptly",
            "May require antibiotics",
            "Monitor breathing and fever",
        ],
    },
    ConditionRow {
        id: "smoking_related_lung_disease",
        label: "Smoking-related lung disease",
        description: "Airway or lung changes associated with tobacco exposure",
        symptoms: &["cough", "shortness_of_breath", "wheezing", "coughing_blood", "weight_loss"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 3,
        risk_profile: SMOKING,
        actions: &[
            "Consider chest imaging to rule out structural lung disease",
            "Schedule smoking cessation follow-up",
        ],
    },
    ConditionRow {
        id: "asthma",
        label: "Asthma",
        description: "Reversible narrowing of the airways",
        symptoms: &["wheezing", "shortness_of_breath", "cough", "chest_tightness"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 2,
        risk_profile: &[ChronicLungDisease, FamilyHistory],
        actions: &["Use a reliever inhaler if prescribed"],
    },
    ConditionRow {
        id: "strep_throat",
        label: "Strep throat",
        description: "Bacterial throat infection",
        symptoms: &["sore_throat", "fever", "swollen_glands"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 2,
        risk_profile: &[],
        actions: &["A throat swab may be needed to decide on antibiotics"],
    },
    ConditionRow {
        id: "allergies",
        label: "Seasonal allergies",
        description: "Allergic rhinitis",
        symptoms: &["runny_nose", "sneezing", "itchy_eyes"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 1,
        risk_profile: &[],
        actions: &["Try an over-the-counter antihistamine"],
    },
    ConditionRow {
        id: "angina",
        label: "Angina",
        description: "Chest pain from reduced blood flow to the heart",
        symptoms: &["chest_pain", "shortness_of_breath", "arm_pain"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 4,
        risk_profile: &[AdvancedAge, CardiovascularDisease, Hypertension, Diabetes, SmokingHistory],
        actions: &["Stop activity and rest if pain starts"],
    },
    ConditionRow {
        id: "muscle_strain",
        label: "Muscle strain",
        description: "Chest wall or back muscle strain",
        symptoms: &["chest_pain", "back_pain", "neck_pain"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 1,
        risk_profile: &[SedentaryWork],
        actions: &["Apply heat and avoid heavy lifting"],
    },
    ConditionRow {
        id: "anxiety",
        label: "Anxiety",
        description: "Anxiety disorder with physical symptoms",
        symptoms: &["chest_pain", "shortness_of_breath", "palpitations", "dizziness", "insomnia"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 1,
        risk_profile: &[HighStress],
        actions: &[
            "Practice relaxation techniques",
            "Consider counseling",
            "See primary care doctor for evaluation",
        ],
    },
    ConditionRow {
        id: "food_poisoning",
        label: "Food poisoning",
        description: "Illness from contaminated food",
        symptoms: &["nausea", "vomiting", "diarrhea", "abdominal_pain", "fever"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 2,
        risk_profile: &[AdvancedAge, EarlyChildhood, Immunocompromised],
        actions: &["Sip oral rehydration fluids"],
    },
    ConditionRow {
        id: "gastroenteritis",
        label: "Gastroenteritis",
        description: "Infection or inflammation of the gut",
        symptoms: &["vomiting", "diarrhea", "nausea", "abdominal_pain"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 2,
        risk_profile: &[AdvancedAge, EarlyChildhood],
        actions: &[
            "Sip oral rehydration fluids",
            "Wash hands frequently to avoid spreading infection",
        ],
    },
    ConditionRow {
        id: "irritable_bowel_syndrome",
        label: "Irritable bowel syndrome",
        description: "Functional bowel disorder",
        symptoms: &["diarrhea", "abdominal_pain", "bloating"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 1,
        risk_profile: &[HighStress],
        actions: &["Keep a food and symptom diary"],
    },
    ConditionRow {
        id: "appendicitis",
        label: "Appendicitis",
        description: "Inflamed appendix",
        symptoms: &["abdominal_pain", "fever", "nausea", "loss_of_appetite"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 5,
        risk_profile: &[],
        actions: &["Do not eat or drink until assessed"],
    },
    ConditionRow {
        id: "anemia",
        label: "Anemia",
        description: "Low red blood cell count",
        symptoms: &["fatigue", "dizziness", "pale_skin", "shortness_of_breath"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 2,
        risk_profile: &[],
        actions: &["A blood test may be needed"],
    },
    ConditionRow {
        id: "depression",
        label: "Depression",
        description: "Persistent low mood",
        symptoms: &["fatigue", "low_mood", "insomnia", "poor_concentration"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 2,
        risk_profile: &[HighStress, ChronicSleepDeprivation],
        actions: &["Talk to a primary care doctor about mood support"],
    },
    ConditionRow {
        id: "low_blood_pressure",
        label: "Low blood pressure",
        description: "Hypotension causing light-headedness",
        symptoms: &["dizziness", "fatigue", "fainting"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 2,
        risk_profile: &[AdvancedAge],
        actions: &["Stand up slowly and stay hydrated"],
    },
    ConditionRow {
        id: "inner_ear_problem",
        label: "Inner ear problem",
        description: "Vestibular disturbance",
        symptoms: &["dizziness", "ear_pain", "nausea"],
        red_flag: false,
        red_flag_core: &[],
        severity_weight: 1,
        risk_profile: &[],
        actions: &["Avoid sudden head movements"],
    },
];

const RED_FLAG_SYMPTOMS: &[&str] = &[
    "severe_chest_pain",
    "difficulty_breathing",
    "severe_abdominal_pain",
    "severe_headache",
    "loss_of_consciousness",
    "severe_bleeding",
    "signs_of_stroke",
    "severe_allergic_reaction",
];

/// Symptoms that become red flags when rated at the top of the severity scale.
const SEVERITY_SENSITIVE: &[&str] = &["headache", "abdominal_pain", "chest_pain"];

const QUESTIONS: &[(&str, &[&str])] = &[
    (
        "chest_pain",
        &[
            "On a scale of 1-10, how severe is the pain?",
            "Does the pain radiate to your arm, jaw, or back?",
            "Is the pain crushing, sharp, or burning?",
            "Does physical activity make it worse?",
        ],
    ),
    (
        "headache",
        &[
            "On a scale of 1-10, how severe is the headache?",
            "Is this the worst headache you've ever had?",
            "Does light or sound make it worse?",
            "Do you have any visual changes?",
        ],
    ),
    (
        "cough",
        &[
            "Are you coughing up anything?",
            "Is the cough dry or productive?",
            "How long have you had the cough?",
            "Does it keep you awake at night?",
        ],
    ),
    (
        "fever",
        &[
            "What is your temperature?",
            "How long have you had the fever?",
            "Are you taking any fever-reducing medications?",
            "Do you have chills or sweats?",
        ],
    ),
    (
        "shortness_of_breath",
        &[
            "Did the breathlessness come on suddenly or gradually?",
            "Are you breathless at rest or only on exertion?",
            "Do you have any chest pain with it?",
        ],
    ),
    (
        "abdominal_pain",
        &[
            "Where exactly is the pain?",
            "On a scale of 1-10, how severe is the pain?",
            "Have you had vomiting, diarrhea or fever?",
        ],
    ),
];

/// Questions asked for symptoms with no specific template.
pub(crate) const FALLBACK_QUESTIONS: &[&str] = &[
    "When did this symptom start?",
    "How severe is it on a scale of 1-10?",
    "What makes it better or worse?",
];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// The catalogue shipped with the crate.
pub fn builtin() -> Catalogue {
    Catalogue {
        conditions: CONDITIONS
            .iter()
            .map(|row| Condition {
                id: row.id.to_string(),
                label: row.label.to_string(),
                description: row.description.to_string(),
                symptoms: owned(row.symptoms),
                red_flag: row.red_flag,
                red_flag_core: owned(row.red_flag_core),
                severity_weight: row.severity_weight,
                risk_profile: row.risk_profile.to_vec(),
                actions: owned(row.actions),
            })
            .collect(),
        red_flag_symptoms: owned(RED_FLAG_SYMPTOMS),
        severity_sensitive: owned(SEVERITY_SENSITIVE),
        questions: QUESTIONS
            .iter()
            .map(|(symptom, qs)| (symptom.to_string(), owned(qs)))
            .collect::<BTreeMap<_, _>>(),
    }
}
