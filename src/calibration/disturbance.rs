use std::collections::VecDeque;

use crate::error::{ensure_len, FusionError, FusionResult};
use crate::types::{Frame, FrameSeries, Vec3};

/// Fixed-window moving average over vector samples
pub struct MovingAverage {
    window: VecDeque<Vec3>,
    window_size: usize,
    sum: Vec3,
}

impl MovingAverage {
    pub fn new(window_size: usize) -> Self {
        MovingAverage {
            window: VecDeque::with_capacity(window_size),
            window_size,
            sum: Vec3::zeros(),
        }
    }

    /// Push a sample; returns the window mean once the window is full.
    pub fn apply(&mut self, sample: Vec3) -> Option<Vec3> {
        self.window.push_back(sample);
        self.sum += sample;

        while self.window.len() > self.window_size {
            if let Some(oldest) = self.window.pop_front() {
                self.sum -= oldest;
            }
        }

        if self.window.len() == self.window_size {
            Some(self.sum / self.window_size as f64)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

/// Number of samples dropped from each end for a centred window.
pub fn edge_trim(window: usize) -> usize {
    window / 2
}

/// Drop `window / 2` samples from both ends so a companion series stays
/// aligned with the output of [`reduce_disturbance`].
pub fn trim_edges<T: Clone>(series: &[T], window: usize) -> Vec<T> {
    let trim = edge_trim(window);
    if series.len() <= 2 * trim {
        return Vec::new();
    }
    series[trim..series.len() - trim].to_vec()
}

/// Centred moving average of `samples`.
///
/// Output sample `k` is the mean of `window` input samples centred on input
/// index `k + window / 2`, whose timestamp it takes. Both returned series have
/// length `n - 2 * (window / 2)`.
pub fn reduce_disturbance<F: Frame>(
    times: &[f64],
    samples: &FrameSeries<F>,
    window: usize,
) -> FusionResult<(Vec<f64>, FrameSeries<F>)> {
    if window == 0 {
        return Err(FusionError::InvalidConfig(
            "disturbance window must be at least 1".to_string(),
        ));
    }
    ensure_len("disturbance samples", times.len(), samples.len())?;
    if samples.len() < window {
        return Err(FusionError::InsufficientSamples {
            what: "disturbance filter",
            needed: window,
            found: samples.len(),
        });
    }

    let trim = edge_trim(window);
    let out_len = samples.len() - 2 * trim;

    let mut average = MovingAverage::new(window);
    let filtered: FrameSeries<F> = samples
        .iter()
        .filter_map(|sample| average.apply(*sample))
        .take(out_len)
        .collect();
    let filtered_times = times[trim..trim + out_len].to_vec();

    Ok((filtered_times, filtered))
}
