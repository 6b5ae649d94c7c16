//! Run configuration.
//!
//! Plain structs with `Default` values and `validate()` checks. With the
//! `serde` feature they (de)serialize from JSON; missing fields take their
//! defaults.

#[cfg(feature = "serde")]
use std::path::Path;

use crate::{Activation, Error, MomentumSgd, Network, NetworkBuilder, PeakPolicy, Result};

/// Topology and optimizer of a multi-label network.
///
/// The input width and label count come from the dataset at build time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NetworkConfig {
    /// Widths of the shared fully-connected layers.
    pub hidden: Vec<usize>,
    /// Per-label widths of the parallel layers. The last one must be 2.
    pub part_widths: Vec<usize>,
    /// One activation code per layer, fully-connected layers first.
    pub activations: String,
    /// Coefficient for `e` (ELU) and `l` (leaky ReLU).
    pub alpha: f64,
    pub learning_rate: f64,
    pub momentum: f64,
    /// Weight initialization seed.
    pub seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            hidden: vec![12],
            part_widths: vec![3, 2],
            activations: "sss".to_owned(),
            alpha: 0.01,
            learning_rate: 0.01,
            momentum: 0.6,
            seed: 0,
        }
    }
}

impl NetworkConfig {
    pub fn activation_kinds(&self) -> Result<Vec<Activation>> {
        Activation::parse_kinds(&self.activations, self.alpha)
    }

    pub fn sgd(&self) -> Result<MomentumSgd> {
        MomentumSgd::new(self.learning_rate, self.momentum)
    }

    /// Build a network for `input_dim` features and `num_labels` labels.
    pub fn build(&self, input_dim: usize, num_labels: usize) -> Result<Network> {
        let activations = self.activation_kinds()?;
        NetworkBuilder::multi_label(
            input_dim,
            num_labels,
            &self.hidden,
            &self.part_widths,
            &activations,
            self.sgd()?,
        )?
        .build_with_seed(self.seed)
    }
}

/// Limits for a bounded training burst.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrainingBounds {
    pub min_rounds: usize,
    pub max_rounds: usize,
    /// Stop once training accuracy reaches this value.
    pub accuracy_threshold: f64,
    /// Passes between two accuracy checks, once `min_rounds` are done.
    pub check_interval: usize,
}

impl Default for TrainingBounds {
    fn default() -> Self {
        Self {
            min_rounds: 20,
            max_rounds: 200,
            accuracy_threshold: 0.95,
            check_interval: 10,
        }
    }
}

impl TrainingBounds {
    pub fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(Error::InvalidConfig("max_rounds must be > 0".to_owned()));
        }
        if self.min_rounds > self.max_rounds {
            return Err(Error::InvalidConfig(format!(
                "min_rounds {} exceeds max_rounds {}",
                self.min_rounds, self.max_rounds
            )));
        }
        if self.check_interval == 0 {
            return Err(Error::InvalidConfig(
                "check_interval must be > 0".to_owned(),
            ));
        }
        if !(0.0..=1.0).contains(&self.accuracy_threshold) {
            return Err(Error::InvalidConfig(format!(
                "accuracy_threshold must be in [0, 1], got {}",
                self.accuracy_threshold
            )));
        }
        Ok(())
    }
}

/// Schedule of an active-learning session.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ActiveLearningConfig {
    /// Density-peak bandwidth.
    pub dc: f64,
    pub peak_policy: PeakPolicy,
    /// Most representative instances queried during cold start.
    pub cold_start_instances: usize,
    /// Labels queried per cold-start instance, scarcest first.
    pub cold_start_label_batch: usize,
    /// Training after cold start.
    pub pretrain: TrainingBounds,
    /// Budget of regular query rounds.
    pub query_rounds: usize,
    pub instance_batch: usize,
    pub label_batch: usize,
    /// Emphasized instances are retrained after every this many instances.
    pub emphasis_interval: usize,
    /// Training after each regular query.
    pub burst: TrainingBounds,
}

impl Default for ActiveLearningConfig {
    fn default() -> Self {
        Self {
            dc: 0.5,
            peak_policy: PeakPolicy::Zero,
            cold_start_instances: 10,
            cold_start_label_batch: 2,
            pretrain: TrainingBounds {
                min_rounds: 50,
                max_rounds: 500,
                accuracy_threshold: 0.95,
                check_interval: 10,
            },
            query_rounds: 20,
            instance_batch: 1,
            label_batch: 1,
            emphasis_interval: 5,
            burst: TrainingBounds::default(),
        }
    }
}

impl ActiveLearningConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.dc.is_finite() && self.dc > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "dc must be finite and > 0, got {}",
                self.dc
            )));
        }
        if self.cold_start_label_batch == 0 {
            return Err(Error::InvalidConfig(
                "cold_start_label_batch must be > 0".to_owned(),
            ));
        }
        if self.instance_batch == 0 || self.label_batch == 0 {
            return Err(Error::InvalidConfig(
                "instance_batch and label_batch must be > 0".to_owned(),
            ));
        }
        if self.emphasis_interval == 0 {
            return Err(Error::InvalidConfig(
                "emphasis_interval must be > 0".to_owned(),
            ));
        }
        self.pretrain.validate()?;
        self.burst.validate()
    }

    /// Checks that depend on the dataset's label count.
    pub fn validate_for(&self, num_labels: usize) -> Result<()> {
        self.validate()?;
        if self.cold_start_label_batch > num_labels || self.label_batch > num_labels {
            return Err(Error::InvalidConfig(format!(
                "label batches ({}, {}) exceed num_labels {num_labels}",
                self.cold_start_label_batch, self.label_batch
            )));
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
impl ActiveLearningConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| Error::InvalidConfig(format!("failed to parse config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p)
            .map_err(|e| Error::InvalidConfig(format!("failed to read {}: {e}", p.display())))?;
        Self::from_json_str(&s)
    }
}
