use crate::config::StationaryConfig;
use crate::error::{FusionError, FusionResult};
use crate::types::StationaryInterval;

/// Intervals a calibration stage can rely on: at least one, none empty or
/// reaching past `len`.
pub(crate) fn check_intervals(
    stage: &'static str,
    intervals: &[StationaryInterval],
    len: usize,
) -> FusionResult<()> {
    if intervals.is_empty() {
        return Err(FusionError::MissingStationaryInterval { stage });
    }
    for interval in intervals {
        if interval.is_empty() || interval.end > len {
            return Err(FusionError::IntervalOutOfBounds {
                start: interval.start,
                end: interval.end,
                len,
            });
        }
    }
    Ok(())
}

/// Maximal runs where |speed| < `threshold` lasting more than `min_samples`.
///
/// A run still open at the end of the series is recorded.
pub fn detect_stationary(speeds: &[f64], threshold: f64, min_samples: usize) -> Vec<StationaryInterval> {
    let mut intervals = Vec::new();
    let mut run_start: Option<usize> = None;

    for (i, speed) in speeds.iter().enumerate() {
        let at_rest = speed.abs() < threshold;
        match (at_rest, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                if i - start > min_samples {
                    intervals.push(StationaryInterval::new(start, i));
                }
                run_start = None;
            }
            _ => {}
        }
    }

    if let Some(start) = run_start {
        if speeds.len() - start > min_samples {
            intervals.push(StationaryInterval::new(start, speeds.len()));
        }
    }

    intervals
}

/// Result of a detection that may have widened the speed threshold
#[derive(Clone, Debug, PartialEq)]
pub struct StationaryDetection {
    pub intervals: Vec<StationaryInterval>,
    /// Threshold that produced `intervals` [m/s]
    pub threshold: f64,
    pub relax_steps: usize,
}

/// Detect stationary intervals, widening the threshold by
/// `config.relax_step` up to `config.max_relax_steps` times.
pub fn detect_with_relaxation(
    speeds: &[f64],
    config: &StationaryConfig,
) -> FusionResult<StationaryDetection> {
    let mut threshold = config.speed_threshold;
    for step in 0..=config.max_relax_steps {
        let intervals = detect_stationary(speeds, threshold, config.min_samples);
        if !intervals.is_empty() {
            if step > 0 {
                log::warn!(
                    "Stationary detection relaxed to {:.3} m/s after {} step(s)",
                    threshold,
                    step
                );
            }
            log::debug!("Found {} stationary interval(s)", intervals.len());
            return Ok(StationaryDetection {
                intervals,
                threshold,
                relax_steps: step,
            });
        }
        threshold += config.relax_step;
    }

    Err(FusionError::NoStationaryReference {
        max_threshold: threshold - config.relax_step,
    })
}
