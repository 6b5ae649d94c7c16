//! Partially labeled multi-label dataset.
//!
//! Features are stored row-major and min-max normalized per column at
//! construction. Ground-truth labels are immutable; what changes during a
//! learning session is which `(instance, label)` pairs have been queried and
//! what the network currently predicts.
//!
//! Query state is append-only: a pair goes from unknown to known exactly once.
//! Asking for it again is a caller bug and is reported as
//! [`Error::AlreadyQueried`] without touching any state.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::metrics::CostModel;
use crate::rank::descending_rank;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DistanceMetric {
    /// Sum of squared per-feature differences.
    #[default]
    Euclidean,
    /// Sum of absolute per-feature differences.
    Manhattan,
}

#[derive(Debug, Clone)]
pub struct PartialLabelDataset {
    num_instances: usize,
    num_conditions: usize,
    num_labels: usize,
    /// Row-major `(num_instances, num_conditions)`, each column in `[0, 1]`.
    features: Vec<f64>,
    /// Row-major `(num_instances, num_labels)`.
    labels: Vec<bool>,
    queried: Vec<bool>,
    predicted: Vec<Option<bool>>,
    has_query: Vec<bool>,
    /// Instances in the order of their first query.
    queried_instances: Vec<usize>,
    label_query_counts: Vec<usize>,
    num_queried_labels: usize,
    metric: DistanceMetric,
    costs: CostModel,
}

impl PartialLabelDataset {
    /// Build a dataset from flat buffers.
    ///
    /// `features` is `(len, num_conditions)` and `labels` is `(len, num_labels)`
    /// with every label 0 or 1.
    pub fn from_flat(
        mut features: Vec<f64>,
        labels: Vec<u8>,
        num_conditions: usize,
        num_labels: usize,
    ) -> Result<Self> {
        if num_conditions == 0 {
            return Err(Error::InvalidData("num_conditions must be > 0".to_owned()));
        }
        if num_labels == 0 {
            return Err(Error::InvalidData("num_labels must be > 0".to_owned()));
        }
        if features.is_empty() {
            return Err(Error::InvalidData("features must not be empty".to_owned()));
        }
        if features.len() % num_conditions != 0 {
            return Err(Error::InvalidData(format!(
                "features length {} is not divisible by num_conditions {num_conditions}",
                features.len()
            )));
        }
        let num_instances = features.len() / num_conditions;
        if labels.len() != num_instances * num_labels {
            return Err(Error::InvalidData(format!(
                "labels length {} does not match len * num_labels ({num_instances} * {num_labels})",
                labels.len()
            )));
        }
        if features.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(
                "features must contain only finite values".to_owned(),
            ));
        }
        let labels = labels
            .into_iter()
            .enumerate()
            .map(|(idx, v)| match v {
                0 => Ok(false),
                1 => Ok(true),
                other => Err(Error::InvalidData(format!(
                    "label at instance {} label {} must be 0 or 1, got {other}",
                    idx / num_labels,
                    idx % num_labels
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        normalize_columns(&mut features, num_conditions);

        Ok(Self {
            num_instances,
            num_conditions,
            num_labels,
            features,
            queried: vec![false; labels.len()],
            predicted: vec![None; labels.len()],
            labels,
            has_query: vec![false; num_instances],
            queried_instances: Vec::with_capacity(num_instances),
            label_query_counts: vec![0; num_labels],
            num_queried_labels: 0,
            metric: DistanceMetric::default(),
            costs: CostModel::default(),
        })
    }

    /// Build a dataset from per-instance rows.
    ///
    /// This is a convenience constructor (it copies into contiguous storage).
    pub fn from_rows(features: &[Vec<f64>], labels: &[Vec<u8>]) -> Result<Self> {
        if features.len() != labels.len() {
            return Err(Error::InvalidData(format!(
                "features/labels length mismatch: {} vs {}",
                features.len(),
                labels.len()
            )));
        }
        let num_conditions = features.first().map(|r| r.len()).unwrap_or(0);
        let num_labels = labels.first().map(|r| r.len()).unwrap_or(0);
        for (i, (f, l)) in features.iter().zip(labels).enumerate() {
            if f.len() != num_conditions {
                return Err(Error::InvalidData(format!(
                    "feature row {i} has len {}, expected {num_conditions}",
                    f.len()
                )));
            }
            if l.len() != num_labels {
                return Err(Error::InvalidData(format!(
                    "label row {i} has len {}, expected {num_labels}",
                    l.len()
                )));
            }
        }

        Self::from_flat(
            features.concat(),
            labels.concat(),
            num_conditions,
            num_labels,
        )
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_costs(mut self, costs: CostModel) -> Result<Self> {
        costs.validate()?;
        self.costs = costs;
        Ok(self)
    }

    #[inline]
    pub fn num_instances(&self) -> usize {
        self.num_instances
    }

    #[inline]
    pub fn num_conditions(&self) -> usize {
        self.num_conditions
    }

    #[inline]
    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    #[inline]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    #[inline]
    pub fn costs(&self) -> &CostModel {
        &self.costs
    }

    #[inline]
    /// Returns the normalized feature row of instance `idx`.
    ///
    /// Panics if `idx >= num_instances`.
    pub fn features(&self, idx: usize) -> &[f64] {
        let start = idx * self.num_conditions;
        &self.features[start..start + self.num_conditions]
    }

    #[inline]
    fn cell(&self, instance: usize, label: usize) -> usize {
        debug_assert!(instance < self.num_instances && label < self.num_labels);
        instance * self.num_labels + label
    }

    fn check_cell(&self, instance: usize, label: usize) -> Result<usize> {
        if instance >= self.num_instances || label >= self.num_labels {
            return Err(Error::IndexOutOfBounds {
                instance,
                label,
                num_instances: self.num_instances,
                num_labels: self.num_labels,
            });
        }
        Ok(self.cell(instance, label))
    }

    /// Ground truth, whether queried or not.
    pub fn label(&self, instance: usize, label: usize) -> Result<bool> {
        let c = self.check_cell(instance, label)?;
        Ok(self.labels[c])
    }

    /// Ground truth if the pair has been queried, `None` otherwise.
    pub fn queried_label(&self, instance: usize, label: usize) -> Result<Option<bool>> {
        let c = self.check_cell(instance, label)?;
        Ok(self.queried[c].then_some(self.labels[c]))
    }

    /// `false` for out-of-range pairs.
    #[inline]
    pub fn is_queried(&self, instance: usize, label: usize) -> bool {
        self.check_cell(instance, label)
            .is_ok_and(|c| self.queried[c])
    }

    /// Current prediction, `None` until the first evaluation pass.
    pub fn predicted(&self, instance: usize, label: usize) -> Result<Option<bool>> {
        let c = self.check_cell(instance, label)?;
        Ok(self.predicted[c])
    }

    #[inline]
    pub(crate) fn truth_at(&self, cell: usize) -> bool {
        self.labels[cell]
    }

    #[inline]
    pub(crate) fn queried_at(&self, cell: usize) -> bool {
        self.queried[cell]
    }

    #[inline]
    pub(crate) fn predicted_at(&self, cell: usize) -> Option<bool> {
        self.predicted[cell]
    }

    /// Replace the whole prediction matrix (row-major `(num_instances, num_labels)`).
    pub fn set_predictions(&mut self, predictions: Vec<bool>) -> Result<()> {
        if predictions.len() != self.predicted.len() {
            return Err(Error::InvalidShape(format!(
                "predictions length {} does not match num_instances * num_labels ({})",
                predictions.len(),
                self.predicted.len()
            )));
        }
        for (slot, p) in self.predicted.iter_mut().zip(predictions) {
            *slot = Some(p);
        }
        Ok(())
    }

    /// Reveal the ground truth of `labels` for `instance`.
    ///
    /// Fails without changing anything if the list is empty, out of range, or
    /// names a label that is already queried (including twice in the same list).
    pub fn query(&mut self, instance: usize, labels: &[usize]) -> Result<()> {
        if labels.is_empty() {
            return Err(Error::EmptyQuery { instance });
        }
        for (k, &label) in labels.iter().enumerate() {
            let c = self.check_cell(instance, label)?;
            if self.queried[c] || labels[..k].contains(&label) {
                return Err(Error::AlreadyQueried { instance, label });
            }
        }

        for &label in labels {
            let c = self.cell(instance, label);
            self.queried[c] = true;
            self.label_query_counts[label] += 1;
        }
        if !self.has_query[instance] {
            self.has_query[instance] = true;
            self.queried_instances.push(instance);
        }
        self.num_queried_labels += labels.len();
        Ok(())
    }

    /// Query `n` distinct, not yet queried pairs chosen uniformly at random.
    pub fn random_query<R: Rng + ?Sized>(&mut self, n: usize, rng: &mut R) -> Result<()> {
        let mut open: Vec<usize> = (0..self.queried.len())
            .filter(|&c| !self.queried[c])
            .collect();
        if n > open.len() {
            return Err(Error::InvalidConfig(format!(
                "cannot randomly query {n} labels, only {} remain unqueried",
                open.len()
            )));
        }
        open.shuffle(rng);
        for &c in &open[..n] {
            self.query(c / self.num_labels, &[c % self.num_labels])?;
        }
        Ok(())
    }

    /// Instances with at least one queried label, in order of first query.
    #[inline]
    pub fn queried_instances(&self) -> &[usize] {
        &self.queried_instances
    }

    #[inline]
    pub fn num_queried_instances(&self) -> usize {
        self.queried_instances.len()
    }

    #[inline]
    pub fn num_queried_labels(&self) -> usize {
        self.num_queried_labels
    }

    #[inline]
    pub fn label_query_counts(&self) -> &[usize] {
        &self.label_query_counts
    }

    /// Per-label fraction of instances whose label has been queried.
    pub fn label_scarcity(&self) -> Vec<f64> {
        self.label_query_counts
            .iter()
            .map(|&c| c as f64 / self.num_instances as f64)
            .collect()
    }

    /// The `n` least-queried labels, scarcest first.
    ///
    /// Counts are ranked descending with the stable rank and read from the tail,
    /// so among equally scarce labels the later index comes first.
    pub fn scarce_labels(&self, n: usize) -> Result<Vec<usize>> {
        if n == 0 || n > self.num_labels {
            return Err(Error::InvalidConfig(format!(
                "scarce label count must be in 1..={}, got {n}",
                self.num_labels
            )));
        }
        let rank = descending_rank(&self.label_scarcity());
        Ok(rank.iter().rev().take(n).copied().collect())
    }

    /// Up to `n` of `instance`'s unqueried labels, scarcest first.
    ///
    /// Same order as [`scarce_labels`](Self::scarce_labels) with the labels
    /// already queried for `instance` left out, so the result is shorter than
    /// `n` when fewer labels are open.
    pub fn scarce_unqueried_labels(&self, instance: usize, n: usize) -> Result<Vec<usize>> {
        self.check_cell(instance, 0)?;
        let rank = descending_rank(&self.label_scarcity());
        Ok(rank
            .iter()
            .rev()
            .copied()
            .filter(|&label| !self.is_queried(instance, label))
            .take(n)
            .collect())
    }

    /// Pairwise distance between two instances over normalized features.
    ///
    /// Panics if either index is out of range.
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        let (a, b) = (self.features(i), self.features(j));
        match self.metric {
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum(),
            DistanceMetric::Manhattan => a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum(),
        }
    }

    /// Forget all queries and predictions. Features, ground truth and costs stay.
    pub fn reset(&mut self) {
        self.queried.fill(false);
        self.predicted.fill(None);
        self.has_query.fill(false);
        self.queried_instances.clear();
        self.label_query_counts.fill(0);
        self.num_queried_labels = 0;
    }
}

/// Min-max normalize each column of a row-major matrix into `[0, 1]`.
///
/// Constant columns become all zeros.
pub fn normalize_columns(values: &mut [f64], num_columns: usize) {
    if num_columns == 0 || values.is_empty() {
        return;
    }
    for col in 0..num_columns {
        let (min, max) = values
            .iter()
            .skip(col)
            .step_by(num_columns)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let span = max - min;
        let column = values.iter_mut().skip(col).step_by(num_columns);
        if span.is_finite() {
            for v in column {
                *v = if span > 0.0 { (*v - min) / span } else { 0.0 };
            }
        } else {
            // `max - min` overflowed; halve both ends first.
            let half_span = max / 2.0 - min / 2.0;
            for v in column {
                *v = ((*v / 2.0 - min / 2.0) / half_span).clamp(0.0, 1.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn toy() -> PartialLabelDataset {
        PartialLabelDataset::from_rows(
            &[
                vec![1.0, 5.0, 2.0],
                vec![3.0, 5.0, 4.0],
                vec![5.0, 5.0, 0.0],
            ],
            &[vec![1, 0], vec![0, 1], vec![1, 1]],
        )
        .unwrap()
    }

    #[test]
    fn from_flat_validates_shapes_and_labels() {
        assert!(PartialLabelDataset::from_flat(vec![0.0, 1.0], vec![0, 1], 1, 1).is_ok());
        assert!(PartialLabelDataset::from_flat(vec![0.0, 1.0, 2.0], vec![0], 2, 1).is_err());
        assert!(PartialLabelDataset::from_flat(vec![0.0, 1.0], vec![0, 2], 1, 1).is_err());
        assert!(PartialLabelDataset::from_flat(vec![f64::NAN], vec![0], 1, 1).is_err());
    }

    #[test]
    fn columns_are_normalized_and_constant_columns_zeroed() {
        let d = toy();
        assert_eq!(d.features(0), &[0.0, 0.0, 0.5]);
        assert_eq!(d.features(1), &[0.5, 0.0, 1.0]);
        assert_eq!(d.features(2), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn columns_spanning_most_of_the_f64_range_stay_in_unit_interval() {
        let d = PartialLabelDataset::from_flat(
            vec![-1e308, f64::MAX, 0.0, 1.0, 1e308, 2.0],
            vec![0; 3],
            2,
            1,
        )
        .unwrap();
        assert_eq!(d.features(0), &[0.0, 1.0]);
        assert_abs_diff_eq!(d.features(1)[0], 0.5, epsilon = 1e-12);
        assert_eq!(d.features(2)[0], 1.0);
        for i in 0..3 {
            assert!(d.features(i).iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn distance_metrics() {
        let d = toy();
        assert_abs_diff_eq!(d.distance(0, 1), 0.25 + 0.25, epsilon = 1e-12);
        assert_eq!(d.distance(1, 1), 0.0);

        let d = d.with_metric(DistanceMetric::Manhattan);
        assert_abs_diff_eq!(d.distance(0, 2), 1.0 + 0.5, epsilon = 1e-12);
        assert_eq!(d.distance(2, 0), d.distance(0, 2));
    }

    #[test]
    fn query_tracks_instances_in_first_query_order() {
        let mut d = toy();
        d.query(2, &[1]).unwrap();
        d.query(0, &[0, 1]).unwrap();
        d.query(2, &[0]).unwrap();

        assert_eq!(d.queried_instances(), &[2, 0]);
        assert_eq!(d.num_queried_instances(), 2);
        assert_eq!(d.num_queried_labels(), 4);
        assert_eq!(d.label_query_counts(), &[2, 2]);
        assert_eq!(d.queried_label(0, 1).unwrap(), Some(false));
        assert_eq!(d.queried_label(1, 1).unwrap(), None);
    }

    #[test]
    fn double_query_is_rejected_atomically() {
        let mut d = toy();
        d.query(1, &[0]).unwrap();

        assert_eq!(
            d.query(1, &[1, 0]),
            Err(Error::AlreadyQueried {
                instance: 1,
                label: 0
            })
        );
        // Label 1 was not applied by the failed call.
        assert!(!d.is_queried(1, 1));

        assert_eq!(
            d.query(0, &[1, 1]),
            Err(Error::AlreadyQueried {
                instance: 0,
                label: 1
            })
        );
        assert_eq!(d.num_queried_labels(), 1);
    }

    #[test]
    fn empty_and_out_of_range_queries_fail() {
        let mut d = toy();
        assert_eq!(d.query(0, &[]), Err(Error::EmptyQuery { instance: 0 }));
        assert!(matches!(
            d.query(5, &[0]),
            Err(Error::IndexOutOfBounds { .. })
        ));
        assert!(matches!(
            d.query(0, &[2]),
            Err(Error::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn scarcity_prefers_least_queried_labels() {
        let mut d = PartialLabelDataset::from_flat(
            vec![0.0, 1.0, 2.0, 3.0],
            vec![0; 4 * 3],
            1,
            3,
        )
        .unwrap();
        d.query(0, &[0, 2]).unwrap();
        d.query(1, &[0]).unwrap();

        assert_eq!(d.label_scarcity(), vec![0.5, 0.0, 0.25]);
        assert_eq!(d.scarce_labels(1).unwrap(), vec![1]);
        assert_eq!(d.scarce_labels(2).unwrap(), vec![1, 2]);
        assert!(d.scarce_labels(4).is_err());
    }

    #[test]
    fn scarce_unqueried_labels_skip_the_instance_own_queries() {
        let mut d = PartialLabelDataset::from_flat(
            vec![0.0, 1.0, 2.0, 3.0],
            vec![0; 4 * 3],
            1,
            3,
        )
        .unwrap();
        d.query(0, &[1]).unwrap();
        d.query(1, &[0, 1]).unwrap();

        // Global order, scarcest first: 2, 0, 1.
        assert_eq!(d.scarce_labels(3).unwrap(), vec![2, 0, 1]);
        assert_eq!(d.scarce_unqueried_labels(0, 2).unwrap(), vec![2, 0]);
        assert_eq!(d.scarce_unqueried_labels(1, 2).unwrap(), vec![2]);
        assert_eq!(d.scarce_unqueried_labels(2, 1).unwrap(), vec![2]);
        assert!(d.scarce_unqueried_labels(4, 1).is_err());
    }

    #[test]
    fn scarce_labels_break_ties_toward_later_indices() {
        let d = PartialLabelDataset::from_flat(vec![0.0, 1.0], vec![0; 2 * 3], 1, 3).unwrap();
        assert_eq!(d.scarce_labels(3).unwrap(), vec![2, 1, 0]);
    }

    #[test]
    fn random_query_picks_distinct_unqueried_pairs() {
        let mut d = toy();
        d.query(0, &[0]).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        d.random_query(5, &mut rng).unwrap();
        assert_eq!(d.num_queried_labels(), 6);
        assert!(d.random_query(1, &mut rng).is_err());
    }

    #[test]
    fn reset_clears_learning_state_only() {
        let mut d = toy();
        d.query(1, &[0, 1]).unwrap();
        d.set_predictions(vec![true; 6]).unwrap();
        d.reset();

        assert_eq!(d.num_queried_labels(), 0);
        assert_eq!(d.num_queried_instances(), 0);
        assert!(d.queried_instances().is_empty());
        assert_eq!(d.predicted(0, 0).unwrap(), None);
        assert!(d.label(2, 1).unwrap());
        assert_eq!(d.features(1), &[0.5, 0.0, 1.0]);
        // Queries are allowed again after a reset.
        d.query(1, &[0]).unwrap();
    }
}
