//! Label uncertainty and batch selection.
//!
//! For an unqueried pair the uncertainty is `1 - |positive - negative|` over the
//! two competing output units of that label, clamped to `[0, 1]`: 1 when the
//! units tie, 0 when one dominates completely. Queried pairs score 0, since
//! asking again is both useless and forbidden.
//!
//! The matrix is always computed from the network's current weights and is
//! never cached across training rounds.

use crate::rank::descending_rank;
use crate::train::check_compatible;
use crate::{Error, Network, PartialLabelDataset, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct UncertaintyMatrix {
    num_instances: usize,
    num_labels: usize,
    /// Row-major `(num_instances, num_labels)`.
    values: Vec<f64>,
}

/// One instance and the labels to ask the oracle about.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCandidate {
    pub instance: usize,
    /// Most uncertain first.
    pub labels: Vec<usize>,
    /// Sum of the selected labels' uncertainties.
    pub score: f64,
}

impl UncertaintyMatrix {
    pub fn compute(network: &Network, data: &PartialLabelDataset) -> Result<Self> {
        check_compatible(network, data)?;

        let (n, l) = (data.num_instances(), data.num_labels());
        let mut values = vec![0.0; n * l];
        for i in 0..n {
            let out = network.predict(data.features(i))?;
            for j in 0..l {
                if data.is_queried(i, j) {
                    continue;
                }
                let (neg, pos) = (out[2 * j], out[2 * j + 1]);
                values[i * l + j] = (1.0 - (pos - neg).abs()).clamp(0.0, 1.0);
            }
        }

        Ok(Self {
            num_instances: n,
            num_labels: l,
            values,
        })
    }

    #[inline]
    pub fn num_instances(&self) -> usize {
        self.num_instances
    }

    #[inline]
    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    pub fn get(&self, instance: usize, label: usize) -> Option<f64> {
        if instance >= self.num_instances || label >= self.num_labels {
            return None;
        }
        Some(self.values[instance * self.num_labels + label])
    }

    /// Uncertainties of every label of `instance`.
    ///
    /// Panics if `instance >= num_instances`.
    pub fn row(&self, instance: usize) -> &[f64] {
        let start = instance * self.num_labels;
        &self.values[start..start + self.num_labels]
    }

    /// Pick up to `instance_batch` instances, each with its `label_batch` most
    /// uncertain unqueried labels.
    ///
    /// Instances are ranked by the summed uncertainty of their selected labels
    /// (stable, earlier index wins ties). Instances with fewer than
    /// `label_batch` unqueried labels are never selected, so the result may be
    /// shorter than `instance_batch`, or empty.
    pub fn select_batch(
        &self,
        data: &PartialLabelDataset,
        instance_batch: usize,
        label_batch: usize,
    ) -> Result<Vec<QueryCandidate>> {
        if instance_batch == 0 || label_batch == 0 {
            return Err(Error::InvalidConfig(format!(
                "batch sizes must be > 0, got instance_batch={instance_batch} label_batch={label_batch}"
            )));
        }
        if label_batch > self.num_labels {
            return Err(Error::InvalidConfig(format!(
                "label_batch {label_batch} exceeds num_labels {}",
                self.num_labels
            )));
        }
        if data.num_instances() != self.num_instances || data.num_labels() != self.num_labels {
            return Err(Error::InvalidShape(format!(
                "uncertainty matrix is {} x {}, dataset is {} x {}",
                self.num_instances,
                self.num_labels,
                data.num_instances(),
                data.num_labels()
            )));
        }

        let mut per_instance: Vec<Option<Vec<usize>>> = Vec::with_capacity(self.num_instances);
        let mut sums = vec![0.0; self.num_instances];
        for (i, sum) in sums.iter_mut().enumerate() {
            let open: Vec<usize> = (0..self.num_labels)
                .filter(|&j| !data.is_queried(i, j))
                .collect();
            if open.len() < label_batch {
                per_instance.push(None);
                continue;
            }
            let row = self.row(i);
            let open_values: Vec<f64> = open.iter().map(|&j| row[j]).collect();
            let chosen: Vec<usize> = descending_rank(&open_values)
                .into_iter()
                .take(label_batch)
                .map(|k| open[k])
                .collect();
            *sum = chosen.iter().map(|&j| row[j]).sum();
            per_instance.push(Some(chosen));
        }

        let batch = descending_rank(&sums)
            .into_iter()
            .filter_map(|i| {
                per_instance[i].take().map(|labels| QueryCandidate {
                    instance: i,
                    labels,
                    score: sums[i],
                })
            })
            .take(instance_batch)
            .collect();
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{Activation, MomentumSgd, NetworkBuilder};

    fn matrix(values: Vec<f64>, n: usize, l: usize) -> UncertaintyMatrix {
        UncertaintyMatrix {
            num_instances: n,
            num_labels: l,
            values,
        }
    }

    fn dataset(n: usize, l: usize) -> PartialLabelDataset {
        let features = (0..n).map(|i| i as f64).collect();
        PartialLabelDataset::from_flat(features, vec![0; n * l], 1, l).unwrap()
    }

    #[test]
    fn computed_values_are_bounded_and_zero_when_queried() {
        let mut data = dataset(5, 3);
        data.query(1, &[0, 2]).unwrap();
        let acts = Activation::parse_kinds("ss", 0.0).unwrap();
        let net = NetworkBuilder::multi_label(1, 3, &[6], &[2], &acts, MomentumSgd::default())
            .unwrap()
            .build_with_seed(3)
            .unwrap();

        let m = UncertaintyMatrix::compute(&net, &data).unwrap();
        for i in 0..5 {
            for &u in m.row(i) {
                assert!((0.0..=1.0).contains(&u));
            }
        }
        assert_eq!(m.get(1, 0), Some(0.0));
        assert_eq!(m.get(1, 2), Some(0.0));
        assert_eq!(m.get(5, 0), None);
    }

    #[test]
    fn compute_rejects_mismatched_network() {
        let data = dataset(3, 2);
        let net = NetworkBuilder::new(1)
            .unwrap()
            .fully_connected(3, Activation::Sigmoid)
            .unwrap()
            .build_with_seed(0)
            .unwrap();
        assert!(matches!(
            UncertaintyMatrix::compute(&net, &data),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn selects_most_uncertain_labels_and_instances() {
        let data = dataset(3, 3);
        let m = matrix(
            vec![
                0.1, 0.9, 0.2, //
                0.8, 0.7, 0.6, //
                0.5, 0.5, 0.9, //
            ],
            3,
            3,
        );
        let batch = m.select_batch(&data, 2, 2).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].instance, 1);
        assert_eq!(batch[0].labels, vec![0, 1]);
        assert_eq!(batch[1].instance, 2);
        // Tie between labels 0 and 1: the earlier index wins.
        assert_eq!(batch[1].labels, vec![2, 0]);
    }

    #[test]
    fn instances_without_enough_open_labels_are_skipped() {
        let mut data = dataset(2, 2);
        data.query(0, &[1]).unwrap();
        let m = matrix(vec![1.0, 0.0, 0.1, 0.1], 2, 2);

        let batch = m.select_batch(&data, 2, 2).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].instance, 1);

        // With one label per instance, only label 0 of instance 0 is open.
        let batch = m.select_batch(&data, 1, 1).unwrap();
        assert_eq!(batch[0].instance, 0);
        assert_eq!(batch[0].labels, vec![0]);
    }

    #[test]
    fn invalid_batch_sizes_are_config_errors() {
        let data = dataset(2, 2);
        let m = matrix(vec![0.0; 4], 2, 2);
        assert!(m.select_batch(&data, 0, 1).is_err());
        assert!(m.select_batch(&data, 1, 0).is_err());
        assert!(m.select_batch(&data, 1, 3).is_err());
    }
}
