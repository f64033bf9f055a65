//! Frame-tagged vector series
//!
//! A `FrameSeries<Sensor>` holds samples expressed in the (possibly re-oriented)
//! sensor frame, a `FrameSeries<World>` samples expressed in the laboratory
//! frame (x east, y north, z up once heading is anchored). Only the attitude
//! integrator moves a series from one frame to the other.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::ops::Deref;

use super::Vec3;

pub trait Frame: Copy + Clone + Debug + Default + PartialEq + Send + Sync + 'static {
    const NAME: &'static str;
}

/// Vehicle-mounted sensor frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sensor;

/// Laboratory / world frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct World;

impl Frame for Sensor {
    const NAME: &'static str = "sensor";
}

impl Frame for World {
    const NAME: &'static str = "world";
}

#[derive(Clone, Debug, PartialEq)]
pub struct FrameSeries<F: Frame> {
    samples: Vec<Vec3>,
    frame: PhantomData<F>,
}

pub type SensorSeries = FrameSeries<Sensor>;
pub type WorldSeries = FrameSeries<World>;

impl<F: Frame> FrameSeries<F> {
    pub fn new(samples: Vec<Vec3>) -> Self {
        Self {
            samples,
            frame: PhantomData,
        }
    }

    pub fn as_slice(&self) -> &[Vec3] {
        &self.samples
    }

    pub fn into_inner(self) -> Vec<Vec3> {
        self.samples
    }

    /// Apply `f` to every sample, staying in the same frame.
    pub fn map<M>(&self, f: M) -> Self
    where
        M: FnMut(&Vec3) -> Vec3,
    {
        Self::new(self.samples.iter().map(f).collect())
    }

    pub fn frame_name(&self) -> &'static str {
        F::NAME
    }

    /// Re-tag samples as another frame. Reserved for the stage that actually
    /// performs the rotation.
    pub(crate) fn retag<G: Frame>(self) -> FrameSeries<G> {
        FrameSeries::new(self.samples)
    }
}

impl<F: Frame> Deref for FrameSeries<F> {
    type Target = [Vec3];

    fn deref(&self) -> &[Vec3] {
        &self.samples
    }
}

impl<F: Frame> FromIterator<Vec3> for FrameSeries<F> {
    fn from_iter<I: IntoIterator<Item = Vec3>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<F: Frame> From<Vec<Vec3>> for FrameSeries<F> {
    fn from(samples: Vec<Vec3>) -> Self {
        Self::new(samples)
    }
}
