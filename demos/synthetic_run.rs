//! Active learning on a synthetic three-cluster dataset.
//!
//! `RUST_LOG=cmale=debug cargo run --example synthetic_run` shows every query.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cmale::{ActiveLearner, ActiveLearningConfig, CostModel, NetworkConfig, PartialLabelDataset};

const NUM_CONDITIONS: usize = 4;
const NUM_LABELS: usize = 3;

/// Three noisy clusters. Label `k` marks cluster `k`; points of a cluster with a
/// large last feature also carry the next cluster's label.
fn synthetic(n: usize, rng: &mut StdRng) -> cmale::Result<PartialLabelDataset> {
    let centers: [[f64; NUM_CONDITIONS]; NUM_LABELS] = [
        [0.0, 0.0, 1.0, 2.0],
        [4.0, 1.0, 0.0, 2.0],
        [2.0, 4.0, 3.0, 0.0],
    ];
    let mut features = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        let k = i % centers.len();
        let row: Vec<f64> = centers[k]
            .iter()
            .map(|c| c + rng.gen_range(-0.8..0.8))
            .collect();
        let mut y = vec![0u8; NUM_LABELS];
        y[k] = 1;
        if row[3] > 1.8 {
            y[(k + 1) % NUM_LABELS] = 1;
        }
        features.push(row);
        labels.push(y);
    }
    PartialLabelDataset::from_rows(&features, &labels)
}

fn main() -> cmale::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let mut rng = StdRng::seed_from_u64(7);
    let data = synthetic(60, &mut rng)?.with_costs(CostModel {
        teacher_cost: 1.0,
        false_positive_cost: 2.0,
        false_negative_cost: 4.0,
    })?;

    let network = NetworkConfig {
        hidden: vec![12],
        part_widths: vec![3, 2],
        activations: "sss".to_owned(),
        learning_rate: 0.05,
        seed: 1,
        ..NetworkConfig::default()
    };
    let config = ActiveLearningConfig {
        dc: 0.3,
        cold_start_instances: 6,
        query_rounds: 30,
        label_batch: 1,
        ..ActiveLearningConfig::default()
    };

    let mut learner = ActiveLearner::from_config(data, &network, config)?;
    let report = learner.run()?;

    println!("{report}");
    println!("label scarcity: {:?}", learner.data().label_scarcity());
    Ok(())
}
