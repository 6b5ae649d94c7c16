//! Accuracy and cost accounting.
//!
//! Metrics read the dataset's prediction matrix (written by `Network::test`);
//! they do not participate in training.
//!
//! Total cost is the teacher cost of every queried pair plus an asymmetric
//! misclassification cost for every wrong prediction:
//!
//! - predicted 0, truly 1: false negative
//! - predicted 1, truly 0: false positive
//!
//! Every pair must carry a prediction; an unset cell means no evaluation pass
//! ran and is reported as [`Error::Unpredicted`].

use crate::{Error, PartialLabelDataset, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CostModel {
    /// Charged once per queried `(instance, label)` pair.
    pub teacher_cost: f64,
    pub false_positive_cost: f64,
    pub false_negative_cost: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            teacher_cost: 1.0,
            false_positive_cost: 1.0,
            false_negative_cost: 2.0,
        }
    }
}

impl CostModel {
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("teacher_cost", self.teacher_cost),
            ("false_positive_cost", self.false_positive_cost),
            ("false_negative_cost", self.false_negative_cost),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be finite and >= 0, got {v}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CostReport {
    pub num_false_positives: usize,
    pub num_false_negatives: usize,
    /// `num_queried_labels * teacher_cost`.
    pub teacher_cost: f64,
    pub misclassification_cost: f64,
    pub total: f64,
}

impl std::fmt::Display for CostReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FP = {}, FN = {}, teacher cost = {}, misclassification cost = {}, total = {}",
            self.num_false_positives,
            self.num_false_negatives,
            self.teacher_cost,
            self.misclassification_cost,
            self.total
        )
    }
}

impl PartialLabelDataset {
    /// Fraction of all `(instance, label)` pairs predicted correctly.
    ///
    /// Unset predictions count as wrong.
    pub fn accuracy(&self) -> f64 {
        let cells = self.num_instances() * self.num_labels();
        let correct = (0..cells)
            .filter(|&c| self.predicted_at(c) == Some(self.truth_at(c)))
            .count();
        correct as f64 / cells as f64
    }

    /// Accuracy restricted to queried pairs. Zero when nothing is queried.
    pub fn training_accuracy(&self) -> f64 {
        let cells = self.num_instances() * self.num_labels();
        let (mut queried, mut correct) = (0usize, 0usize);
        for c in (0..cells).filter(|&c| self.queried_at(c)) {
            queried += 1;
            if self.predicted_at(c) == Some(self.truth_at(c)) {
                correct += 1;
            }
        }
        if queried == 0 {
            return 0.0;
        }
        correct as f64 / queried as f64
    }

    /// Teacher plus misclassification cost, with its breakdown.
    pub fn cost_report(&self) -> Result<CostReport> {
        let costs = self.costs();
        let teacher_cost = self.num_queried_labels() as f64 * costs.teacher_cost;
        let (mut fp, mut fn_) = (0usize, 0usize);

        for instance in 0..self.num_instances() {
            for label in 0..self.num_labels() {
                let c = instance * self.num_labels() + label;
                match self.predicted_at(c) {
                    None => return Err(Error::Unpredicted { instance, label }),
                    Some(p) if p == self.truth_at(c) => {}
                    Some(true) => fp += 1,
                    Some(false) => fn_ += 1,
                }
            }
        }

        let misclassification_cost =
            fp as f64 * costs.false_positive_cost + fn_ as f64 * costs.false_negative_cost;
        Ok(CostReport {
            num_false_positives: fp,
            num_false_negatives: fn_,
            teacher_cost,
            misclassification_cost,
            total: teacher_cost + misclassification_cost,
        })
    }

    /// `cost_report()?.total`.
    pub fn total_cost(&self) -> Result<f64> {
        Ok(self.cost_report()?.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    fn dataset() -> PartialLabelDataset {
        PartialLabelDataset::from_flat(
            vec![0.0, 1.0, 2.0],
            vec![1, 0, 0, 1, 1, 1],
            1,
            2,
        )
        .unwrap()
        .with_costs(CostModel {
            teacher_cost: 0.5,
            false_positive_cost: 1.0,
            false_negative_cost: 3.0,
        })
        .unwrap()
    }

    fn truth() -> Vec<bool> {
        vec![true, false, false, true, true, true]
    }

    #[test]
    fn all_correct_and_no_queries_costs_nothing() {
        let mut d = dataset();
        d.set_predictions(truth()).unwrap();
        assert_eq!(d.total_cost().unwrap(), 0.0);
        assert_eq!(d.accuracy(), 1.0);
    }

    #[test]
    fn one_false_negative_adds_exactly_its_cost() {
        let mut d = dataset();
        let mut p = truth();
        p[0] = false;
        d.set_predictions(p).unwrap();

        let r = d.cost_report().unwrap();
        assert_eq!(r.num_false_negatives, 1);
        assert_eq!(r.num_false_positives, 0);
        assert_abs_diff_eq!(r.total, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn teacher_cost_counts_queried_labels() {
        let mut d = dataset();
        d.query(0, &[0, 1]).unwrap();
        d.query(2, &[1]).unwrap();
        let mut p = truth();
        p[1] = true; // false positive
        d.set_predictions(p).unwrap();

        let r = d.cost_report().unwrap();
        assert_abs_diff_eq!(r.teacher_cost, 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(r.misclassification_cost, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r.total, 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(d.training_accuracy(), 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d.accuracy(), 5.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn unpredicted_cell_is_an_error() {
        let d = dataset();
        assert_eq!(
            d.cost_report(),
            Err(Error::Unpredicted {
                instance: 0,
                label: 0
            })
        );
    }

    #[test]
    fn training_accuracy_without_queries_is_zero() {
        let mut d = dataset();
        d.set_predictions(truth()).unwrap();
        assert_eq!(d.training_accuracy(), 0.0);
    }

    #[test]
    fn negative_costs_are_rejected() {
        let bad = CostModel {
            false_negative_cost: -1.0,
            ..CostModel::default()
        };
        assert!(bad.validate().is_err());
    }
}
