//! ML domain: labelled feature rows stored as a JSON array

use rand::Rng;
use serde::{Deserialize, Serialize};

use tributary_warehouse::{Column, SqlType, TableRow, Value};

use crate::aggregate::{Groups, Mean, fail_closed, finite_mean};
use crate::error::TransformError;
use crate::synth::{CHOLESTEROL_LEVELS, MEDICATIONS, blood_pressure, pick, round_to};

/// One ML training sample. Unknown JSON fields are rejected on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MlSample {
    pub patient_id: i64,
    pub age: i64,
    pub blood_sugar: f64,
    pub bmi: f64,
    pub heart_rate: i64,
    pub cholesterol_level: String,
    pub blood_pressure: String,
    pub medication: String,
    /// 0 healthy, 1 ill.
    pub class_label: i64,
}

impl MlSample {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            patient_id: rng.random_range(1..=1000),
            age: rng.random_range(18..=80),
            blood_sugar: round_to(rng.random_range(70.0..180.0), 2),
            bmi: round_to(rng.random_range(18.5..40.0), 2),
            heart_rate: rng.random_range(60..=100),
            cholesterol_level: pick(rng, &CHOLESTEROL_LEVELS).to_string(),
            blood_pressure: blood_pressure(rng),
            medication: pick(rng, &MEDICATIONS).to_string(),
            class_label: rng.random_range(0..=1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MlSummary {
    pub cholesterol_level: String,
    pub avg_blood_sugar: f64,
    pub count_patients: i64,
}

impl TableRow for MlSummary {
    const TABLE: &'static str = "ml_data";
    const CONFLICT_KEY: &'static str = "cholesterol_level";

    fn columns() -> Vec<Column> {
        vec![
            Column::new("cholesterol_level", SqlType::Text),
            Column::new("avg_blood_sugar", SqlType::Double),
            Column::new("count_patients", SqlType::BigInt),
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.cholesterol_level.as_str().into(),
            self.avg_blood_sugar.into(),
            self.count_patients.into(),
        ]
    }
}

pub fn transform(samples: &[MlSample]) -> Vec<MlSummary> {
    fail_closed("ml", try_transform(samples))
}

pub fn try_transform(samples: &[MlSample]) -> Result<Vec<MlSummary>, TransformError> {
    // (blood sugar, patients); a non-finite reading still counts as a patient
    let mut groups: Groups<(Mean, i64)> = Groups::new();
    for s in samples {
        let (sugar, patients) = groups.entry(&s.cholesterol_level);
        sugar.add_finite(s.blood_sugar);
        *patients += 1;
    }

    let mut out = Vec::new();
    for (level, (sugar, patients)) in groups.into_entries() {
        let Some(avg_blood_sugar) = finite_mean(&level, "avg_blood_sugar", &sugar)? else {
            log::warn!("ml: no usable blood_sugar for level {level}, skipping");
            continue;
        };
        out.push(MlSummary {
            cholesterol_level: level,
            avg_blood_sugar,
            count_patients: patients,
        });
    }
    Ok(out)
}
