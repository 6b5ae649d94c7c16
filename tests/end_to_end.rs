use cmale::{
    ActiveLearner, ActiveLearningConfig, Activation, Error, MomentumSgd, NetworkBuilder,
    NetworkConfig, PartialLabelDataset, PeakPolicy, Phase, Representativeness, TrainingBounds,
    UncertaintyMatrix,
};

/// 10 instances, 4 features, 3 labels.
fn synthetic() -> PartialLabelDataset {
    let features = vec![
        vec![0.10, 2.0, 5.0, 1.0],
        vec![0.20, 2.1, 4.8, 1.0],
        vec![0.15, 1.9, 5.2, 0.0],
        vec![0.90, 7.5, 0.5, 1.0],
        vec![0.85, 7.8, 0.7, 0.0],
        vec![0.95, 7.1, 0.2, 1.0],
        vec![0.50, 4.0, 2.5, 0.0],
        vec![0.55, 4.4, 2.9, 1.0],
        vec![0.05, 8.0, 4.9, 0.0],
        vec![0.92, 1.8, 0.4, 1.0],
    ];
    let labels = vec![
        vec![1, 0, 1],
        vec![1, 0, 1],
        vec![1, 0, 0],
        vec![0, 1, 1],
        vec![0, 1, 0],
        vec![0, 1, 1],
        vec![1, 1, 0],
        vec![1, 1, 1],
        vec![1, 1, 0],
        vec![0, 0, 1],
    ];
    PartialLabelDataset::from_rows(&features, &labels).unwrap()
}

fn network(seed: u64) -> cmale::Network {
    let acts = Activation::parse_kinds("sss", 0.0).unwrap();
    NetworkBuilder::multi_label(4, 3, &[9], &[3, 2], &acts, MomentumSgd::new(0.1, 0.6).unwrap())
        .unwrap()
        .build_with_seed(seed)
        .unwrap()
}

fn cold_start_top_three(data: &mut PartialLabelDataset) {
    let rep = Representativeness::compute(data, 0.5, PeakPolicy::Zero).unwrap();
    for &instance in &rep.ranking()[..3] {
        let labels = data.scarce_labels(2).unwrap();
        data.query(instance, &labels).unwrap();
    }
}

#[test]
fn cold_start_then_one_pass_is_deterministic() {
    let run = |seed| {
        let mut data = synthetic();
        cold_start_top_three(&mut data);
        assert_eq!(data.num_queried_instances(), 3);
        assert_eq!(data.num_queried_labels(), 6);

        let mut net = network(seed);
        net.train(&data).unwrap();
        let accuracy = net.test(&mut data).unwrap();
        assert!((0.0..=1.0).contains(&accuracy));
        (accuracy, data.total_cost().unwrap())
    };

    assert_eq!(run(42), run(42));
}

#[test]
fn uncertainty_respects_queries_after_cold_start() {
    let mut data = synthetic();
    cold_start_top_three(&mut data);
    let net = network(1);

    let m = UncertaintyMatrix::compute(&net, &data).unwrap();
    for i in 0..data.num_instances() {
        for j in 0..data.num_labels() {
            let u = m.get(i, j).unwrap();
            assert!((0.0..=1.0).contains(&u));
            if data.is_queried(i, j) {
                assert_eq!(u, 0.0);
            }
        }
    }

    // Every selected label is still open, so the batch can be queried as is.
    let batch = m.select_batch(&data, 4, 2).unwrap();
    assert!(!batch.is_empty());
    for c in &batch {
        data.query(c.instance, &c.labels).unwrap();
    }
}

#[test]
fn full_session_accounts_for_every_query() {
    let config = ActiveLearningConfig {
        cold_start_instances: 3,
        cold_start_label_batch: 2,
        pretrain: TrainingBounds {
            min_rounds: 10,
            max_rounds: 40,
            accuracy_threshold: 0.9,
            check_interval: 5,
        },
        query_rounds: 6,
        instance_batch: 1,
        label_batch: 1,
        burst: TrainingBounds {
            min_rounds: 2,
            max_rounds: 10,
            accuracy_threshold: 0.9,
            check_interval: 2,
        },
        ..ActiveLearningConfig::default()
    };
    let net_cfg = NetworkConfig {
        hidden: vec![9],
        ..NetworkConfig::default()
    };
    let mut learner = ActiveLearner::from_config(synthetic(), &net_cfg, config).unwrap();

    learner.cold_start().unwrap();
    assert_eq!(learner.phase(), Phase::Regular);
    assert_eq!(learner.data().num_queried_labels(), 6);

    let mut rounds = 0;
    while learner.regular_round().unwrap() {
        rounds += 1;
    }
    assert_eq!(rounds, 6);

    let report = learner.finish().unwrap();
    assert_eq!(learner.phase(), Phase::Terminated);
    assert_eq!(report.num_queried_labels, 12);
    assert_eq!(report.cost.teacher_cost, 12.0);
    assert_eq!(
        report.cost.total,
        report.cost.teacher_cost + report.cost.misclassification_cost
    );
    let (net, data) = learner.into_parts();
    assert_eq!(net.output_dim(), 6);
    assert_eq!(data.num_queried_instances(), report.num_queried_instances);
}

#[test]
fn double_query_through_the_session_data_is_detected() {
    let mut data = synthetic();
    cold_start_top_three(&mut data);
    let (instance, label) = {
        let i = data.queried_instances()[0];
        let j = (0..3).find(|&j| data.is_queried(i, j)).unwrap();
        (i, j)
    };
    assert_eq!(
        data.query(instance, &[label]),
        Err(Error::AlreadyQueried { instance, label })
    );
}
