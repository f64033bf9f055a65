use super::stationary::check_intervals;
use crate::error::FusionResult;
use crate::types::{mean, SensorSeries, StationaryInterval, Vec3};

/// Remove the angular-rate offset measured while the vehicle is at rest.
///
/// The first interval's mean is subtracted from the whole series. Every later
/// interval re-measures the residual bias and subtracts it from its own start
/// onward, so drift is tracked going forward without touching earlier samples.
pub fn remove_gyro_bias(
    gyro: &SensorSeries,
    intervals: &[StationaryInterval],
) -> FusionResult<SensorSeries> {
    check_intervals("gyro bias removal", intervals, gyro.len())?;

    let mut corrected = gyro.clone().into_inner();
    for (idx, interval) in intervals.iter().enumerate() {
        let bias = mean(&corrected[interval.range()]).unwrap_or_else(Vec3::zeros);
        let from = if idx == 0 { 0 } else { interval.start };
        log::debug!(
            "Gyro bias [{:.5}, {:.5}, {:.5}] rad/s removed from sample {}",
            bias.x,
            bias.y,
            bias.z,
            from
        );
        for sample in &mut corrected[from..] {
            *sample -= bias;
        }
    }

    Ok(SensorSeries::new(corrected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FusionError;

    const DRIFT_TOLERANCE: f64 = 0.01;

    /// Bias ramps with time; the car rests in three windows.
    fn drifting_gyro() -> (SensorSeries, Vec<StationaryInterval>) {
        let n = 3000;
        let samples = (0..n)
            .map(|i| {
                let bias = Vec3::new(0.05, -0.03, 0.02) + Vec3::new(1e-5, 0.0, -1e-5) * i as f64;
                let motion = if (500..1200).contains(&i) || (1500..2400).contains(&i) {
                    Vec3::new(0.0, 0.0, 0.2 * ((i as f64) * 0.01).sin())
                } else {
                    Vec3::zeros()
                };
                bias + motion
            })
            .collect();
        let intervals = vec![
            StationaryInterval::new(0, 400),
            StationaryInterval::new(1250, 1450),
            StationaryInterval::new(2500, 2900),
        ];
        (samples, intervals)
    }

    #[test]
    fn test_mean_within_each_interval_is_zeroed() {
        let (gyro, intervals) = drifting_gyro();
        let before = mean(&gyro[intervals[0].range()]).unwrap();
        assert!(before.x.abs() > DRIFT_TOLERANCE);

        let corrected = remove_gyro_bias(&gyro, &intervals).unwrap();
        for interval in &intervals {
            let m = mean(&corrected[interval.range()]).unwrap();
            assert!(m.norm() < DRIFT_TOLERANCE, "interval {:?} mean {m}", interval);
        }
    }

    #[test]
    fn test_later_interval_does_not_touch_earlier_samples() {
        let (gyro, intervals) = drifting_gyro();
        let first_only = remove_gyro_bias(&gyro, &intervals[..1]).unwrap();
        let all = remove_gyro_bias(&gyro, &intervals).unwrap();
        assert_eq!(first_only[..1250], all[..1250]);
        assert_ne!(first_only[1300], all[1300]);
    }

    #[test]
    fn test_input_left_unchanged() {
        let (gyro, intervals) = drifting_gyro();
        let snapshot = gyro.clone();
        let _ = remove_gyro_bias(&gyro, &intervals).unwrap();
        assert_eq!(gyro, snapshot);
    }

    #[test]
    fn test_missing_interval_is_an_error() {
        let (gyro, _) = drifting_gyro();
        assert!(matches!(
            remove_gyro_bias(&gyro, &[]),
            Err(FusionError::MissingStationaryInterval { .. })
        ));
        assert!(matches!(
            remove_gyro_bias(&gyro, &[StationaryInterval::new(2990, 3100)]),
            Err(FusionError::IntervalOutOfBounds { .. })
        ));
    }
}
