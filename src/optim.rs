//! Momentum SGD.
//!
//! Every weight carries its own previous update. One step computes
//!
//! ```text
//! delta = momentum * previous_delta + learning_rate * grad * input
//! weight += delta
//! previous_delta = delta
//! ```
//!
//! where `grad` is the error with respect to the pre-activation of the output
//! unit and `input` is the value feeding this weight (1 for the bias row).
//! The sign convention follows the seed error `target - output`, so the update
//! is added rather than subtracted.

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MomentumSgd {
    learning_rate: f64,
    momentum: f64,
}

impl Default for MomentumSgd {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            momentum: 0.6,
        }
    }
}

impl MomentumSgd {
    /// Returns an error unless `learning_rate` is finite and > 0 and `momentum`
    /// is finite and in `[0, 1)`.
    pub fn new(learning_rate: f64, momentum: f64) -> Result<Self> {
        let sgd = Self {
            learning_rate,
            momentum,
        };
        sgd.validate()?;
        Ok(sgd)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be finite and > 0, got {}",
                self.learning_rate
            )));
        }
        if !(self.momentum.is_finite() && (0.0..1.0).contains(&self.momentum)) {
            return Err(Error::InvalidConfig(format!(
                "momentum must be finite and in [0,1), got {}",
                self.momentum
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    #[inline]
    pub fn momentum(&self) -> f64 {
        self.momentum
    }

    /// Update one weight in place.
    #[inline]
    pub(crate) fn step(&self, weight: &mut f64, previous_delta: &mut f64, grad: f64, input: f64) {
        let delta = self.momentum * *previous_delta + self.learning_rate * grad * input;
        *weight += delta;
        *previous_delta = delta;
    }
}
