//! Cost-sensitive multi-label active learning.
//!
//! `cmale` learns a multi-label classifier while asking an oracle for as few
//! labels as possible. Every queried `(instance, label)` pair has a teacher
//! cost, every wrong final prediction a misclassification cost, and the goal is
//! a low total.
//!
//! The crate has two halves:
//!
//! - A from-scratch feed-forward [`Network`] whose fully-connected layers learn
//!   shared features and whose [`Layer::Parallel`] layers split into one
//!   independent block per label. Each label ends in a `(negative, positive)`
//!   pair of output units. Training is online momentum SGD.
//! - An [`ActiveLearner`] that cold-starts on density-peak
//!   [`Representativeness`], then repeatedly queries the pairs with the highest
//!   [`UncertaintyMatrix`] values and retrains with emphasis on them.
//!
//! # Panics vs `Result`
//!
//! - Low-level hot path (panics on misuse): [`Network::forward`],
//!   [`Network::backward`], [`Network::backward_masked`]. Shape mismatches are
//!   programmer error and panic via `assert!`.
//! - Everything dataset-facing ([`Network::train`], [`Network::test`],
//!   [`Network::predict`], queries, cost accounting, the controller) validates
//!   its inputs and returns [`Result`].
//!
//! # Data layout
//!
//! - Scalars are `f64`.
//! - Features and label matrices are row-major, one row per instance.
//! - Fully-connected weights are row-major `(in_dim + 1, out_dim)` with the
//!   bias row last; parallel weights are block-major
//!   `(parts, part_in + 1, part_out)`.
//!
//! # Logging
//!
//! Progress is reported through [`tracing`] events. The library never installs
//! a subscriber.
//!
//! # Quick start
//!
//! ```rust
//! use cmale::{ActiveLearner, ActiveLearningConfig, NetworkConfig, PartialLabelDataset};
//!
//! # fn main() -> cmale::Result<()> {
//! let features: Vec<Vec<f64>> = (0..12)
//!     .map(|i| vec![i as f64, (i % 4) as f64, (12 - i) as f64])
//!     .collect();
//! let labels: Vec<Vec<u8>> = (0..12)
//!     .map(|i| vec![u8::from(i < 6), u8::from(i % 2 == 0), u8::from(i % 4 == 0)])
//!     .collect();
//! let data = PartialLabelDataset::from_rows(&features, &labels)?;
//!
//! let config = ActiveLearningConfig {
//!     cold_start_instances: 4,
//!     query_rounds: 3,
//!     ..ActiveLearningConfig::default()
//! };
//! let mut learner = ActiveLearner::from_config(data, &NetworkConfig::default(), config)?;
//! let report = learner.run()?;
//! assert_eq!(report.num_queried_labels, 4 * 2 + 3);
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod builder;
pub mod config;
pub mod controller;
pub mod data;
pub mod error;
pub mod layer;
pub mod metrics;
pub mod network;
pub mod optim;
pub mod rank;
pub mod representativeness;
pub mod train;
pub mod uncertainty;

#[cfg(feature = "serde")]
pub mod serde_model;

pub use activation::Activation;
pub use builder::NetworkBuilder;
pub use config::{ActiveLearningConfig, NetworkConfig, TrainingBounds};
pub use controller::{ActiveLearner, LearningReport, Phase};
pub use data::{DistanceMetric, PartialLabelDataset};
pub use error::{Error, Result};
pub use layer::Layer;
pub use metrics::{CostModel, CostReport};
pub use network::Network;
pub use optim::MomentumSgd;
pub use representativeness::{PeakPolicy, Representativeness};
pub use train::Emphasis;
pub use uncertainty::{QueryCandidate, UncertaintyMatrix};
