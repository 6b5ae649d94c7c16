//! Dataset-driven training and evaluation.
//!
//! Training is online: one forward/backward step per queried instance, in the
//! order instances were first queried. Every label is a `(negative, positive)`
//! pair of output units with target `(1, 0)` or `(0, 1)`. Labels not yet
//! queried for an instance contribute no gradient.

use tracing::{debug, trace};

use crate::{Error, Network, PartialLabelDataset, Result, TrainingBounds};

/// Instances to retrain repeatedly during a pass.
#[derive(Debug, Clone, Copy)]
pub struct Emphasis<'a> {
    /// Retrain `instances` after every `interval` trained instances.
    pub interval: usize,
    pub instances: &'a [usize],
}

/// Check that `network` maps the dataset's features onto two units per label.
pub(crate) fn check_compatible(network: &Network, data: &PartialLabelDataset) -> Result<()> {
    if network.input_dim() != data.num_conditions() {
        return Err(Error::InvalidConfig(format!(
            "network input_dim {} does not match dataset num_conditions {}",
            network.input_dim(),
            data.num_conditions()
        )));
    }
    if network.output_dim() != 2 * data.num_labels() {
        return Err(Error::InvalidConfig(format!(
            "network output_dim {} does not match 2 * num_labels ({})",
            network.output_dim(),
            2 * data.num_labels()
        )));
    }
    Ok(())
}

impl Network {
    /// One pass over every queried instance.
    pub fn train(&mut self, data: &PartialLabelDataset) -> Result<()> {
        check_compatible(self, data)?;
        let mut buf = TargetBuf::new(data.num_labels());
        for &instance in data.queried_instances() {
            self.train_instance(data, instance, &mut buf);
        }
        Ok(())
    }

    /// One pass over every queried instance, retraining `emphasized` once
    /// after every `times`-th instance.
    pub fn emphasized_train(
        &mut self,
        data: &PartialLabelDataset,
        times: usize,
        emphasized: &[usize],
    ) -> Result<()> {
        check_compatible(self, data)?;
        if times == 0 {
            return Err(Error::InvalidConfig(
                "emphasis interval must be > 0".to_owned(),
            ));
        }
        if let Some(&bad) = emphasized.iter().find(|&&i| i >= data.num_instances()) {
            return Err(Error::InvalidData(format!(
                "emphasized instance {bad} is out of bounds for {} instances",
                data.num_instances()
            )));
        }

        let mut buf = TargetBuf::new(data.num_labels());
        for (k, &instance) in data.queried_instances().iter().enumerate() {
            self.train_instance(data, instance, &mut buf);
            if (k + 1) % times == 0 {
                for &e in emphasized {
                    self.train_instance(data, e, &mut buf);
                }
            }
        }
        Ok(())
    }

    /// Repeat training passes within `bounds`, returning the number of passes.
    ///
    /// Once `min_rounds` passes are done, every `check_interval` passes the
    /// network is tested and training stops as soon as the training accuracy
    /// reaches `accuracy_threshold`. Predictions in `data` reflect the last
    /// check.
    pub fn bounded_train(
        &mut self,
        data: &mut PartialLabelDataset,
        bounds: &TrainingBounds,
        emphasis: Option<Emphasis<'_>>,
    ) -> Result<usize> {
        bounds.validate()?;

        for pass in 1..=bounds.max_rounds {
            match emphasis {
                Some(e) if !e.instances.is_empty() => {
                    self.emphasized_train(data, e.interval, e.instances)?
                }
                _ => self.train(data)?,
            }
            trace!(pass, "training pass");

            if pass >= bounds.min_rounds && (pass - bounds.min_rounds) % bounds.check_interval == 0 {
                self.test(data)?;
                let accuracy = data.training_accuracy();
                if accuracy >= bounds.accuracy_threshold {
                    debug!(passes = pass, accuracy, "training reached threshold");
                    return Ok(pass);
                }
            }
        }

        debug!(passes = bounds.max_rounds, "training hit max_rounds");
        Ok(bounds.max_rounds)
    }

    /// Predict every label of every instance, store the predictions in `data`
    /// and return the overall accuracy.
    ///
    /// A label is predicted positive when its positive unit is strictly larger.
    pub fn test(&self, data: &mut PartialLabelDataset) -> Result<f64> {
        check_compatible(self, data)?;

        let l = data.num_labels();
        let mut predictions = Vec::with_capacity(data.num_instances() * l);
        for i in 0..data.num_instances() {
            let out = self.predict(data.features(i))?;
            predictions.extend(out.chunks_exact(2).map(|pair| pair[1] > pair[0]));
        }
        data.set_predictions(predictions)?;
        Ok(data.accuracy())
    }

    fn train_instance(&mut self, data: &PartialLabelDataset, instance: usize, buf: &mut TargetBuf) {
        if !buf.fill(data, instance) {
            return;
        }
        self.forward(data.features(instance));
        self.backward_masked(&buf.target, &buf.known);
    }
}

/// Reused per-instance target and known-label mask.
struct TargetBuf {
    target: Vec<f64>,
    known: Vec<bool>,
}

impl TargetBuf {
    fn new(num_labels: usize) -> Self {
        Self {
            target: vec![0.0; 2 * num_labels],
            known: vec![false; num_labels],
        }
    }

    /// Returns false when no label of `instance` is queried.
    fn fill(&mut self, data: &PartialLabelDataset, instance: usize) -> bool {
        let mut any = false;
        for (j, (pair, known)) in self
            .target
            .chunks_exact_mut(2)
            .zip(self.known.iter_mut())
            .enumerate()
        {
            match data.queried_label(instance, j).ok().flatten() {
                Some(positive) => {
                    pair[0] = if positive { 0.0 } else { 1.0 };
                    pair[1] = if positive { 1.0 } else { 0.0 };
                    *known = true;
                    any = true;
                }
                None => {
                    pair.fill(0.0);
                    *known = false;
                }
            }
        }
        any
    }
}
