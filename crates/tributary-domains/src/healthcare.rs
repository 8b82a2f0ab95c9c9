//! Healthcare domain: patient readings stored as Parquet

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema, SchemaRef};
use arrow::error::ArrowError;
use rand::Rng;

use tributary_core::codec::{primitive_column, required, required_str, string_column};
use tributary_core::{CodecError, Columnar};
use tributary_warehouse::{Column, SqlType, TableRow, Value};

use crate::aggregate::{Groups, Mean, fail_closed, finite_mean};
use crate::error::TransformError;
use crate::synth::{CHOLESTEROL_LEVELS, MEDICATIONS, blood_pressure, pick, round_to};

#[derive(Debug, Clone, PartialEq)]
pub struct HealthcareReading {
    pub timestamp: f64,
    pub patient_id: i64,
    pub age: i64,
    pub heart_rate: i64,
    pub blood_pressure: String,
    pub weight: f64,
    pub cholesterol_level: String,
    pub medication: String,
    pub bmi: f64,
    pub glucose_level: i64,
}

impl HealthcareReading {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, timestamp: f64) -> Self {
        let weight = round_to(rng.random_range(50.0..100.0), 2);
        let height: f64 = rng.random_range(1.5..2.0);
        Self {
            timestamp,
            patient_id: rng.random_range(1..=1000),
            age: rng.random_range(18..=80),
            heart_rate: rng.random_range(60..=100),
            blood_pressure: blood_pressure(rng),
            weight,
            cholesterol_level: pick(rng, &CHOLESTEROL_LEVELS).to_string(),
            medication: pick(rng, &MEDICATIONS).to_string(),
            bmi: round_to(weight / height.powi(2), 2),
            glucose_level: rng.random_range(70..=180),
        }
    }
}

impl Columnar for HealthcareReading {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("timestamp", DataType::Float64, false),
            Field::new("patient_id", DataType::Int64, false),
            Field::new("age", DataType::Int64, false),
            Field::new("heart_rate", DataType::Int64, false),
            Field::new("blood_pressure", DataType::Utf8, false),
            Field::new("weight", DataType::Float64, false),
            Field::new("cholesterol_level", DataType::Utf8, false),
            Field::new("medication", DataType::Utf8, false),
            Field::new("bmi", DataType::Float64, false),
            Field::new("glucose_level", DataType::Int64, false),
        ]))
    }

    fn to_batch(records: &[Self]) -> Result<RecordBatch, ArrowError> {
        let ints = |f: fn(&Self) -> i64| -> ArrayRef {
            Arc::new(Int64Array::from_iter_values(records.iter().map(f)))
        };
        let floats = |f: fn(&Self) -> f64| -> ArrayRef {
            Arc::new(Float64Array::from_iter_values(records.iter().map(f)))
        };
        let strings = |f: fn(&Self) -> &str| -> ArrayRef {
            Arc::new(StringArray::from_iter_values(records.iter().map(f)))
        };
        let columns = vec![
            floats(|r| r.timestamp),
            ints(|r| r.patient_id),
            ints(|r| r.age),
            ints(|r| r.heart_rate),
            strings(|r| r.blood_pressure.as_str()),
            floats(|r| r.weight),
            strings(|r| r.cholesterol_level.as_str()),
            strings(|r| r.medication.as_str()),
            floats(|r| r.bmi),
            ints(|r| r.glucose_level),
        ];
        RecordBatch::try_new(Self::schema(), columns)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>, CodecError> {
        let timestamp = primitive_column::<Float64Type>(batch, "timestamp")?;
        let patient_id = primitive_column::<Int64Type>(batch, "patient_id")?;
        let age = primitive_column::<Int64Type>(batch, "age")?;
        let heart_rate = primitive_column::<Int64Type>(batch, "heart_rate")?;
        let blood_pressure = string_column(batch, "blood_pressure")?;
        let weight = primitive_column::<Float64Type>(batch, "weight")?;
        let cholesterol = string_column(batch, "cholesterol_level")?;
        let medication = string_column(batch, "medication")?;
        let bmi = primitive_column::<Float64Type>(batch, "bmi")?;
        let glucose = primitive_column::<Int64Type>(batch, "glucose_level")?;

        (0..batch.num_rows())
            .map(|i| {
                Ok(Self {
                    timestamp: required(timestamp, i, "timestamp")?,
                    patient_id: required(patient_id, i, "patient_id")?,
                    age: required(age, i, "age")?,
                    heart_rate: required(heart_rate, i, "heart_rate")?,
                    blood_pressure: required_str(blood_pressure, i, "blood_pressure")?,
                    weight: required(weight, i, "weight")?,
                    cholesterol_level: required_str(cholesterol, i, "cholesterol_level")?,
                    medication: required_str(medication, i, "medication")?,
                    bmi: required(bmi, i, "bmi")?,
                    glucose_level: required(glucose, i, "glucose_level")?,
                })
            })
            .collect()
    }
}

/// Per-cholesterol-level healthcare aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthcareSummary {
    pub cholesterol_level: String,
    pub avg_age: f64,
    pub avg_bmi: f64,
    pub count_patients: i64,
}

impl TableRow for HealthcareSummary {
    const TABLE: &'static str = "healthcare_data";
    const CONFLICT_KEY: &'static str = "cholesterol_level";

    fn columns() -> Vec<Column> {
        vec![
            Column::new("cholesterol_level", SqlType::Text),
            Column::new("avg_age", SqlType::Double),
            Column::new("avg_bmi", SqlType::Double),
            Column::new("count_patients", SqlType::BigInt),
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.cholesterol_level.as_str().into(),
            self.avg_age.into(),
            self.avg_bmi.into(),
            self.count_patients.into(),
        ]
    }
}

#[derive(Default)]
struct LevelAcc {
    age: Mean,
    bmi: Mean,
    patients: i64,
}

/// Aggregate readings per cholesterol level.
///
/// A NaN or infinite `bmi` is left out of that level's mean, while the
/// reading still counts as a patient. A level with no usable `bmi` at all
/// is dropped.
pub fn transform(readings: &[HealthcareReading]) -> Vec<HealthcareSummary> {
    fail_closed("healthcare", try_transform(readings))
}

pub fn try_transform(
    readings: &[HealthcareReading],
) -> Result<Vec<HealthcareSummary>, TransformError> {
    let mut groups: Groups<LevelAcc> = Groups::new();
    let mut skipped = 0usize;
    for r in readings {
        let acc = groups.entry(&r.cholesterol_level);
        acc.patients += 1;
        acc.age.add(r.age as f64);
        if !acc.bmi.add_finite(r.bmi) {
            skipped += 1;
        }
    }
    if skipped > 0 {
        log::debug!("healthcare: skipped {skipped} non-finite bmi values");
    }

    let mut out = Vec::new();
    for (level, acc) in groups.into_entries() {
        let avg_age = finite_mean(&level, "avg_age", &acc.age)?;
        let avg_bmi = finite_mean(&level, "avg_bmi", &acc.bmi)?;
        let (Some(avg_age), Some(avg_bmi)) = (avg_age, avg_bmi) else {
            log::warn!("healthcare: no usable values for level {level}, skipping");
            continue;
        };
        out.push(HealthcareSummary {
            cholesterol_level: level,
            avg_age,
            avg_bmi,
            count_patients: acc.patients,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn reading(level: &str, age: i64, bmi: f64) -> HealthcareReading {
        HealthcareReading {
            timestamp: 0.0,
            patient_id: 1,
            age,
            heart_rate: 70,
            blood_pressure: "120/80".into(),
            weight: 70.0,
            cholesterol_level: level.into(),
            medication: "None".into(),
            bmi,
            glucose_level: 100,
        }
    }

    #[test]
    fn aggregates_per_level() {
        let out = transform(&[
            reading("High", 40, 30.0),
            reading("Normal", 20, 22.0),
            reading("High", 60, 20.0),
        ]);
        assert_eq!(
            out,
            vec![
                HealthcareSummary {
                    cholesterol_level: "High".into(),
                    avg_age: 50.0,
                    avg_bmi: 25.0,
                    count_patients: 2,
                },
                HealthcareSummary {
                    cholesterol_level: "Normal".into(),
                    avg_age: 20.0,
                    avg_bmi: 22.0,
                    count_patients: 1,
                },
            ]
        );
    }

    #[test]
    fn nan_bmi_skipped_within_its_level() {
        let out = transform(&[
            reading("Normal", 20, 22.0),
            reading("High", 40, f64::NAN),
            reading("High", 60, 30.0),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].cholesterol_level, "Normal");
        assert_eq!(out[0].avg_bmi, 22.0);
        assert_eq!(out[1].avg_age, 50.0);
        assert_eq!(out[1].avg_bmi, 30.0);
        assert_eq!(out[1].count_patients, 2);
    }

    #[test]
    fn level_without_usable_bmi_is_dropped() {
        let out = transform(&[
            reading("Normal", 20, 22.0),
            reading("High", 40, f64::NAN),
            reading("Very High", 50, f64::INFINITY),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].cholesterol_level, "Normal");
    }

    #[test]
    fn empty_input_empty_output() {
        assert!(transform(&[]).is_empty());
    }

    #[test]
    fn generated_readings_in_range() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..500 {
            let r = HealthcareReading::generate(&mut rng, 0.0);
            assert!((1..=1000).contains(&r.patient_id));
            assert!((18..=80).contains(&r.age));
            assert!((60..=100).contains(&r.heart_rate));
            assert!((70..=180).contains(&r.glucose_level));
            assert!((50.0..=100.0).contains(&r.weight));
            assert!(CHOLESTEROL_LEVELS.contains(&r.cholesterol_level.as_str()));
            assert!(MEDICATIONS.contains(&r.medication.as_str()));
            // weight / height^2 with height in [1.5, 2.0)
            assert!(r.bmi >= 12.0 && r.bmi <= 44.5, "{}", r.bmi);
        }
    }

    #[test]
    fn columnar_roundtrip() {
        let mut rng = StdRng::seed_from_u64(5);
        let readings: Vec<_> = (0..4)
            .map(|i| HealthcareReading::generate(&mut rng, i as f64))
            .collect();
        let batch = HealthcareReading::to_batch(&readings).unwrap();
        assert_eq!(HealthcareReading::from_batch(&batch).unwrap(), readings);
    }
}
