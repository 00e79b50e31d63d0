//! Shared fixtures for integration tests.

#![allow(dead_code)]

use heart_risk_core::forest::ForestConfig;
use heart_risk_core::models::{
    AttributeRecord, ChestPainType, ExerciseAngina, Gender, RestingEcg, StSlope,
};
use heart_risk_core::training::{fit_artifacts, LabeledRecord, TrainingConfig};
use heart_risk_core::ModelArtifacts;
use proptest::prelude::*;

/// Deterministic cohort covering every category label.
///
/// Positives carry exercise angina, a flat slope and a low peak heart rate.
pub fn cohort(n: usize) -> Vec<LabeledRecord> {
    let pains = [
        ChestPainType::TypicalAngina,
        ChestPainType::AtypicalAngina,
        ChestPainType::NonAnginalPain,
        ChestPainType::Asymptomatic,
    ];
    let ecgs = [RestingEcg::Normal, RestingEcg::StAbnormality, RestingEcg::Lvh];
    let slopes = [StSlope::Up, StSlope::Down];

    (0..n)
        .map(|i| {
            let sick = i % 2 == 1;
            LabeledRecord {
                attributes: AttributeRecord {
                    age: 30 + (i * 11 % 45) as i32,
                    gender: if i % 4 < 2 { Gender::Male } else { Gender::Female },
                    chest_pain_type: pains[i % 4],
                    resting_bp: 100 + (i * 7 % 70) as i32,
                    cholesterol: if i % 13 == 0 { 0 } else { 160 + (i * 23 % 160) as i32 },
                    fasting_bs: (i % 6 == 0) as u8,
                    resting_ecg: ecgs[i % 3],
                    max_hr: if sick { 95 + (i % 35) as i32 } else { 150 + (i % 40) as i32 },
                    exercise_angina: if sick { ExerciseAngina::Yes } else { ExerciseAngina::No },
                    oldpeak: if sick { 1.0 + (i % 5) as f64 * 0.4 } else { (i % 4) as f64 * 0.1 },
                    st_slope: if sick { StSlope::Flat } else { slopes[(i / 2) % 2] },
                },
                has_disease: sick,
            }
        })
        .collect()
}

pub fn quick_config() -> TrainingConfig {
    TrainingConfig {
        forest: ForestConfig {
            n_trees: 15,
            max_depth: 8,
            ..ForestConfig::default()
        },
        ..TrainingConfig::default()
    }
}

pub fn fitted_artifacts() -> ModelArtifacts {
    fit_artifacts(&cohort(120), &quick_config())
        .expect("fixture cohort fits")
        .0
}

/// The record used in the end-to-end scenario.
pub fn scenario_record() -> AttributeRecord {
    AttributeRecord {
        age: 55,
        gender: Gender::Male,
        chest_pain_type: ChestPainType::Asymptomatic,
        resting_bp: 140,
        cholesterol: 250,
        fasting_bs: 1,
        resting_ecg: RestingEcg::StAbnormality,
        max_hr: 120,
        exercise_angina: ExerciseAngina::Yes,
        oldpeak: 2.0,
        st_slope: StSlope::Flat,
    }
}

/// Any in-domain attribute record.
pub fn any_attributes() -> impl Strategy<Value = AttributeRecord> {
    (
        (0i32..120, any::<bool>(), 0usize..4, 0i32..250, 0i32..600, 0u8..2),
        (0usize..3, 0i32..220, any::<bool>(), -3.0f64..7.0, 0usize..3),
    )
        .prop_map(|((age, male, cp, bp, chol, fbs), (ecg, hr, angina, oldpeak, slope))| {
            AttributeRecord {
                age,
                gender: if male { Gender::Male } else { Gender::Female },
                chest_pain_type: [
                    ChestPainType::TypicalAngina,
                    ChestPainType::AtypicalAngina,
                    ChestPainType::NonAnginalPain,
                    ChestPainType::Asymptomatic,
                ][cp],
                resting_bp: bp,
                cholesterol: chol,
                fasting_bs: fbs,
                resting_ecg: [RestingEcg::Normal, RestingEcg::StAbnormality, RestingEcg::Lvh][ecg],
                max_hr: hr,
                exercise_angina: if angina { ExerciseAngina::Yes } else { ExerciseAngina::No },
                oldpeak,
                st_slope: [StSlope::Up, StSlope::Flat, StSlope::Down][slope],
            }
        })
}
