use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// An implementation of a time-decaying value
pub trait Decay {
    /// Calculate value at time `t`
    fn evaluate(&self, t: u32) -> f64;
}

fn validate(rate: f64, vi: f64, vf: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&rate) {
        return Err(Error::InvalidDecay(format!(
            "`rate` must be in the interval [0, 1], got {rate}"
        )));
    }
    if vi < vf {
        return Err(Error::InvalidDecay(format!(
            "`vi` ({vi}) must not be less than `vf` ({vf})"
        )));
    }
    Ok(())
}

/// A constant value
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    value: f64,
}

impl Constant {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Decay for Constant {
    fn evaluate(&self, _t: u32) -> f64 {
        self.value
    }
}

/// v(t) = max(v<sub>i</sub> * r<sup>t</sup>, v<sub>f</sub>)
///
/// Equivalent to applying `v ← max(v_f, v * r)` once per time step, starting from `v_i`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometric {
    rate: f64,
    vi: f64,
    vf: f64,
}

impl Geometric {
    pub fn new(rate: f64, vi: f64, vf: f64) -> Result<Self> {
        validate(rate, vi, vf)?;
        Ok(Self { rate, vi, vf })
    }
}

impl Decay for Geometric {
    fn evaluate(&self, t: u32) -> f64 {
        let &Self { rate, vi, vf } = self;
        (vi * rate.powi(t.min(i32::MAX as u32) as i32)).max(vf)
    }
}
