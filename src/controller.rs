//! Active-learning session.
//!
//! A session moves through three phases:
//!
//! 1. `ColdStart`: the most representative instances are queried on their
//!    scarcest labels, then the network is pretrained.
//! 2. `Regular`: each round queries the most uncertain instance/label batch
//!    and runs a short emphasized training burst on it, until the round budget
//!    is spent or nothing is left to ask.
//! 3. `Terminated`: final predictions, accuracy and cost are reported.
//!
//! The phases can be driven one step at a time or all at once with
//! [`ActiveLearner::run`].

use tracing::{debug, info};

use crate::train::{Emphasis, check_compatible};
use crate::{
    ActiveLearningConfig, CostReport, Error, Network, NetworkConfig, PartialLabelDataset,
    Representativeness, Result, UncertaintyMatrix,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ColdStart,
    Regular,
    Terminated,
}

/// Outcome of a finished session.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LearningReport {
    pub accuracy: f64,
    pub training_accuracy: f64,
    pub cost: CostReport,
    pub num_queried_labels: usize,
    pub num_queried_instances: usize,
    pub query_rounds: usize,
}

impl std::fmt::Display for LearningReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "accuracy = {:.4}, training accuracy = {:.4}, queried {} labels on {} instances in {} rounds, {}",
            self.accuracy,
            self.training_accuracy,
            self.num_queried_labels,
            self.num_queried_instances,
            self.query_rounds,
            self.cost
        )
    }
}

#[derive(Debug, Clone)]
pub struct ActiveLearner {
    network: Network,
    data: PartialLabelDataset,
    config: ActiveLearningConfig,
    phase: Phase,
    query_rounds: usize,
}

impl ActiveLearner {
    /// Start a session in the cold-start phase.
    ///
    /// The dataset is used as is; labels it already has queried stay queried.
    pub fn new(
        network: Network,
        data: PartialLabelDataset,
        config: ActiveLearningConfig,
    ) -> Result<Self> {
        config.validate_for(data.num_labels())?;
        check_compatible(&network, &data)?;
        Ok(Self {
            network,
            data,
            config,
            phase: Phase::ColdStart,
            query_rounds: 0,
        })
    }

    /// Build the network from `network` for this dataset, then start a session.
    pub fn from_config(
        data: PartialLabelDataset,
        network: &NetworkConfig,
        config: ActiveLearningConfig,
    ) -> Result<Self> {
        let net = network.build(data.num_conditions(), data.num_labels())?;
        Self::new(net, data, config)
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn network(&self) -> &Network {
        &self.network
    }

    #[inline]
    pub fn data(&self) -> &PartialLabelDataset {
        &self.data
    }

    #[inline]
    pub fn config(&self) -> &ActiveLearningConfig {
        &self.config
    }

    /// Regular rounds completed so far.
    #[inline]
    pub fn query_rounds(&self) -> usize {
        self.query_rounds
    }

    /// Uncertainty of every pair under the current weights.
    pub fn uncertainty(&self) -> Result<UncertaintyMatrix> {
        UncertaintyMatrix::compute(&self.network, &self.data)
    }

    pub fn into_parts(self) -> (Network, PartialLabelDataset) {
        (self.network, self.data)
    }

    fn expect_phase(&self, expected: Phase, step: &str) -> Result<()> {
        if self.phase != expected {
            return Err(Error::InvalidConfig(format!(
                "{step} requires phase {expected:?}, session is in {:?}",
                self.phase
            )));
        }
        Ok(())
    }

    /// Query the most representative instances on their scarcest open labels,
    /// then pretrain. Moves the session to `Regular`.
    ///
    /// An instance with fewer than `cold_start_label_batch` unqueried labels is
    /// passed over for the next one in rank order.
    pub fn cold_start(&mut self) -> Result<()> {
        self.expect_phase(Phase::ColdStart, "cold_start")?;

        let rep = Representativeness::compute(&self.data, self.config.dc, self.config.peak_policy)?;
        let batch = self.config.cold_start_label_batch;
        let target = self.config.cold_start_instances.min(self.data.num_instances());
        let mut count = 0;
        for &instance in rep.ranking() {
            if count == target {
                break;
            }
            let labels = self.data.scarce_unqueried_labels(instance, batch)?;
            if labels.len() < batch {
                debug!(instance, open = labels.len(), "cold start skips instance");
                continue;
            }
            self.data.query(instance, &labels)?;
            count += 1;
            debug!(instance, ?labels, "cold-start query");
        }

        let passes = self
            .network
            .bounded_train(&mut self.data, &self.config.pretrain, None)?;

        self.phase = Phase::Regular;
        info!(
            instances = count,
            queried_labels = self.data.num_queried_labels(),
            pretrain_passes = passes,
            "cold start complete"
        );
        Ok(())
    }

    /// One regular query round.
    ///
    /// Returns `false`, without querying, when the round budget is spent or
    /// no instance has enough unqueried labels left.
    pub fn regular_round(&mut self) -> Result<bool> {
        self.expect_phase(Phase::Regular, "regular_round")?;
        if self.query_rounds >= self.config.query_rounds {
            return Ok(false);
        }

        let batch = UncertaintyMatrix::compute(&self.network, &self.data)?.select_batch(
            &self.data,
            self.config.instance_batch,
            self.config.label_batch,
        )?;
        if batch.is_empty() {
            debug!("no instance left to query");
            return Ok(false);
        }

        let mut emphasized = Vec::with_capacity(batch.len());
        for candidate in &batch {
            self.data.query(candidate.instance, &candidate.labels)?;
            emphasized.push(candidate.instance);
            debug!(
                instance = candidate.instance,
                labels = ?candidate.labels,
                uncertainty = candidate.score,
                "query"
            );
        }
        self.query_rounds += 1;

        let emphasis = Emphasis {
            interval: self.config.emphasis_interval,
            instances: &emphasized,
        };
        let passes = self
            .network
            .bounded_train(&mut self.data, &self.config.burst, Some(emphasis))?;
        debug!(round = self.query_rounds, passes, "training burst");
        Ok(true)
    }

    /// Predict every pair and report accuracy and cost. Moves the session to
    /// `Terminated`.
    pub fn finish(&mut self) -> Result<LearningReport> {
        self.expect_phase(Phase::Regular, "finish")?;

        let accuracy = self.network.test(&mut self.data)?;
        let report = LearningReport {
            accuracy,
            training_accuracy: self.data.training_accuracy(),
            cost: self.data.cost_report()?,
            num_queried_labels: self.data.num_queried_labels(),
            num_queried_instances: self.data.num_queried_instances(),
            query_rounds: self.query_rounds,
        };

        self.phase = Phase::Terminated;
        info!(%report, "session finished");
        Ok(report)
    }

    /// Drive the remaining phases to completion.
    pub fn run(&mut self) -> Result<LearningReport> {
        if self.phase == Phase::ColdStart {
            self.cold_start()?;
        }
        while self.regular_round()? {}
        self.finish()
    }

    /// Forget every query and run a fresh session on the current network.
    pub fn learn(&mut self) -> Result<LearningReport> {
        self.data.reset();
        self.phase = Phase::ColdStart;
        self.query_rounds = 0;
        self.run()
    }
}
