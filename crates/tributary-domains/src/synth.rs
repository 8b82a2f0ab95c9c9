//! Random value helpers for the record generators

use rand::Rng;

pub const CHOLESTEROL_LEVELS: [&str; 3] = ["Normal", "High", "Very High"];
pub const MEDICATIONS: [&str; 3] = ["Aspirin", "Ibuprofen", "None"];

pub fn pick<'a, R: Rng + ?Sized>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items[rng.random_range(0..items.len())]
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// "systolic/diastolic", e.g. "120/80".
pub fn blood_pressure<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "{}/{}",
        rng.random_range(110..=130),
        rng.random_range(70..=85)
    )
}

/// Current wall-clock time as fractional epoch seconds.
pub fn now_epoch_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn round_to_places() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(0.012345, 4), 0.0123);
        assert_eq!(round_to(2.5, 0), 3.0);
    }

    #[test]
    fn blood_pressure_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let bp = blood_pressure(&mut rng);
            let (sys, dia) = bp.split_once('/').unwrap();
            let sys: u32 = sys.parse().unwrap();
            let dia: u32 = dia.parse().unwrap();
            assert!((110..=130).contains(&sys));
            assert!((70..=85).contains(&dia));
        }
    }

    #[test]
    fn pick_covers_all_items() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(pick(&mut rng, &CHOLESTEROL_LEVELS));
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn now_is_after_2020() {
        assert!(now_epoch_seconds() > 1_577_836_800.0);
    }
}
