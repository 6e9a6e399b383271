//! Drift classification.

use crate::config::SyncSettings;

/// Correction for one track on one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correction {
    /// Jump the track to the master position and restore nominal rate.
    HardResync,
    /// Play at this biased rate until drift is back in the dead band.
    Soft(f32),
    /// Play at nominal rate.
    Nominal,
}

/// Classify `drift = track_time - master_time` (seconds).
///
/// The soft bias is a fixed fraction of `nominal`, opposite in sign to the
/// drift, independent of drift magnitude.
pub fn drift_correction(drift: f64, nominal: f32, settings: &SyncSettings) -> Correction {
    let magnitude = drift.abs();

    if !magnitude.is_finite() || magnitude > settings.hard_threshold_secs {
        Correction::HardResync
    } else if magnitude > settings.soft_threshold_secs {
        let bias = settings.soft_rate_bias as f32;
        if drift > 0.0 {
            // Track ahead: slow down
            Correction::Soft(nominal * (1.0 - bias))
        } else {
            Correction::Soft(nominal * (1.0 + bias))
        }
    } else {
        Correction::Nominal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SyncSettings {
        SyncSettings::default()
    }

    #[test]
    fn large_drift_hard_resyncs() {
        assert_eq!(
            drift_correction(-0.30, 1.0, &settings()),
            Correction::HardResync
        );
        assert_eq!(
            drift_correction(0.26, 1.0, &settings()),
            Correction::HardResync
        );
        assert_eq!(
            drift_correction(f64::NAN, 1.0, &settings()),
            Correction::HardResync
        );
    }

    #[test]
    fn boundaries_are_inclusive_of_lower_band() {
        assert!(matches!(
            drift_correction(0.25, 1.0, &settings()),
            Correction::Soft(rate) if (rate - 0.97).abs() < 1e-5
        ));
        assert_eq!(drift_correction(0.08, 1.0, &settings()), Correction::Nominal);
        assert_eq!(drift_correction(-0.08, 1.0, &settings()), Correction::Nominal);
    }

    #[test]
    fn soft_bias_opposes_drift_and_scales_with_nominal() {
        match drift_correction(-0.1, 2.0, &settings()) {
            Correction::Soft(rate) => assert!((rate - 2.06).abs() < 1e-5),
            other => panic!("unexpected correction: {other:?}"),
        }
        match drift_correction(0.1, 2.0, &settings()) {
            Correction::Soft(rate) => assert!((rate - 1.94).abs() < 1e-5),
            other => panic!("unexpected correction: {other:?}"),
        }
    }

    #[test]
    fn soft_bias_is_independent_of_magnitude() {
        assert_eq!(
            drift_correction(0.09, 1.0, &settings()),
            drift_correction(0.24, 1.0, &settings())
        );
    }

    #[test]
    fn small_drift_is_nominal() {
        assert_eq!(drift_correction(0.0, 1.5, &settings()), Correction::Nominal);
        assert_eq!(drift_correction(0.05, 1.0, &settings()), Correction::Nominal);
    }
}
