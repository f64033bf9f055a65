//! Cumulative integration on irregular time grids
//!
//! Every three consecutive samples are interpolated by a parabola that is
//! integrated analytically over its first segment (irregular-grid Simpson).
//! The per-segment deltas are then summed explicitly, optionally blending the
//! running sum against a reference series every `period` samples.

use nalgebra::SVector;

use crate::config::DeltaScheme;
use crate::error::{ensure_len, FusionError, FusionResult};
use crate::types::{Frame, FrameSeries, Vec3};
use crate::units::validate_timestamps;

/// Parabola `a s² + b s + c` per component, with `s = x - origin`.
///
/// Fitting in the shifted variable keeps the cubic terms of the integral well
/// conditioned when timestamps are large.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParabolaFit<const D: usize> {
    origin: f64,
    a: SVector<f64, D>,
    b: SVector<f64, D>,
    c: SVector<f64, D>,
}

impl<const D: usize> ParabolaFit<D> {
    /// Interpolate three knots. `None` unless `x` is strictly increasing.
    pub fn fit(x: [f64; 3], y: [&SVector<f64, D>; 3]) -> Option<Self> {
        let h1 = x[1] - x[0];
        let s2 = x[2] - x[0];
        if !(h1 > 0.0 && s2 > h1) {
            return None;
        }
        // closed-form inverse of the shifted 2x2 Vandermonde block (c = y0)
        let det = h1 * h1 * s2 - h1 * s2 * s2;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let r1 = y[1] - y[0];
        let r2 = y[2] - y[0];
        let a = (r1 * s2 - r2 * h1) / det;
        let b = (r2 * (h1 * h1) - r1 * (s2 * s2)) / det;

        Some(Self {
            origin: x[0],
            a,
            b,
            c: *y[0],
        })
    }

    pub fn evaluate(&self, x: f64) -> SVector<f64, D> {
        let s = x - self.origin;
        self.a * (s * s) + self.b * s + self.c
    }

    fn antiderivative(&self, s: f64) -> SVector<f64, D> {
        self.a * (s * s * s / 3.0) + self.b * (s * s / 2.0) + self.c * s
    }

    /// Definite integral from `x1` to `x2`.
    pub fn integral(&self, x1: f64, x2: f64) -> SVector<f64, D> {
        self.antiderivative(x2 - self.origin) - self.antiderivative(x1 - self.origin)
    }
}

fn trapezoid<const D: usize>(
    t0: f64,
    t1: f64,
    y0: &SVector<f64, D>,
    y1: &SVector<f64, D>,
) -> SVector<f64, D> {
    (y0 + y1) * ((t1 - t0) * 0.5)
}

/// Per-sample integral increments; `deltas[i]` covers `[t[i-1], t[i]]` and
/// `deltas[0]` is zero.
pub fn parabolic_deltas<const D: usize>(
    times: &[f64],
    samples: &[SVector<f64, D>],
) -> FusionResult<Vec<SVector<f64, D>>> {
    ensure_len("integrand", times.len(), samples.len())?;
    let n = samples.len();
    let mut deltas = vec![SVector::<f64, D>::zeros(); n];

    match n {
        0 | 1 => return Ok(deltas),
        2 => {
            // a single segment cannot carry a parabola
            deltas[1] = trapezoid(times[0], times[1], &samples[0], &samples[1]);
            return Ok(deltas);
        }
        _ => {}
    }

    let fit_at = |i: usize| {
        ParabolaFit::fit(
            [times[i], times[i + 1], times[i + 2]],
            [&samples[i], &samples[i + 1], &samples[i + 2]],
        )
        .ok_or(FusionError::SingularFit { index: i })
    };

    // odd-length prefix; an even series leaves one trailing segment
    let main = if n % 2 == 0 { n - 1 } else { n };

    let mut fit = fit_at(0)?;
    deltas[1] = fit.integral(times[0], times[1]);
    for i in 1..main - 2 {
        fit = fit_at(i)?;
        deltas[i + 1] = fit.integral(times[i], times[i + 1]);
    }
    deltas[main - 1] = fit.integral(times[main - 2], times[main - 1]);

    if main < n {
        let tail = fit_at(n - 3)?;
        deltas[n - 1] = tail.integral(times[n - 2], times[n - 1]);
    }

    Ok(deltas)
}

pub fn trapezoidal_deltas<const D: usize>(
    times: &[f64],
    samples: &[SVector<f64, D>],
) -> FusionResult<Vec<SVector<f64, D>>> {
    ensure_len("integrand", times.len(), samples.len())?;
    let mut deltas = vec![SVector::<f64, D>::zeros(); samples.len()];
    for i in 1..samples.len() {
        deltas[i] = trapezoid(times[i - 1], times[i], &samples[i - 1], &samples[i]);
    }
    Ok(deltas)
}

pub fn integrate_deltas<const D: usize>(
    times: &[f64],
    samples: &[SVector<f64, D>],
    scheme: DeltaScheme,
) -> FusionResult<Vec<SVector<f64, D>>> {
    validate_timestamps(times)?;
    match scheme {
        DeltaScheme::Parabolic => parabolic_deltas(times, samples),
        DeltaScheme::Trapezoidal => trapezoidal_deltas(times, samples),
    }
}

/// Reference series the running integral is periodically pulled towards
#[derive(Clone, Copy, Debug)]
pub struct Adjustment<'a, const D: usize> {
    pub reference: &'a [SVector<f64, D>],
    /// Blend at every sample index divisible by `period`
    pub period: usize,
    /// Reference weight; the integral keeps `1 - weight`
    pub weight: f64,
}

/// Components corrected by an adjustment. For 3-vectors the last component
/// is altitude, which GNSS does not measure reliably.
fn blended_components(dim: usize) -> usize {
    if dim == 3 {
        dim - 1
    } else {
        dim
    }
}

/// Cumulative integral of `samples` over `times`, starting at `initial`.
pub fn cumulative_integrate<const D: usize>(
    times: &[f64],
    samples: &[SVector<f64, D>],
    initial: Option<SVector<f64, D>>,
    scheme: DeltaScheme,
    adjustment: Option<&Adjustment<'_, D>>,
) -> FusionResult<Vec<SVector<f64, D>>> {
    if let Some(adjust) = adjustment {
        ensure_len("adjustment reference", samples.len(), adjust.reference.len())?;
        if adjust.period == 0 {
            return Err(FusionError::InvalidConfig(
                "adjustment period must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&adjust.weight) {
            return Err(FusionError::InvalidConfig(format!(
                "adjustment weight {} outside [0, 1]",
                adjust.weight
            )));
        }
    }

    let deltas = integrate_deltas(times, samples, scheme)?;
    let mut result = Vec::with_capacity(samples.len());
    if samples.is_empty() {
        return Ok(result);
    }
    result.push(initial.unwrap_or_else(SVector::zeros));

    let blended = blended_components(D);
    for i in 1..samples.len() {
        let mut current = result[i - 1] + deltas[i];
        if let Some(adjust) = adjustment {
            if i % adjust.period == 0 {
                let reference = &adjust.reference[i];
                for k in 0..blended {
                    current[k] = reference[k] * adjust.weight + current[k] * (1.0 - adjust.weight);
                }
            }
        }
        result.push(current);
    }

    Ok(result)
}

/// [`cumulative_integrate`] for frame-tagged 3-vector series.
pub fn integrate_series<F: Frame>(
    times: &[f64],
    samples: &FrameSeries<F>,
    initial: Option<Vec3>,
    scheme: DeltaScheme,
    adjustment: Option<&Adjustment<'_, 3>>,
) -> FusionResult<FrameSeries<F>> {
    cumulative_integrate(times, samples.as_slice(), initial, scheme, adjustment).map(FrameSeries::new)
}
