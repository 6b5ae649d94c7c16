use criterion::{Criterion, black_box, criterion_group, criterion_main};

use cmale::{Activation, MomentumSgd, Network, NetworkBuilder, PartialLabelDataset, UncertaintyMatrix};

const NUM_LABELS: usize = 6;

fn network() -> Network {
    let acts = Activation::parse_kinds("ssss", 0.0).unwrap();
    NetworkBuilder::multi_label(
        32,
        NUM_LABELS,
        &[64, 48],
        &[4, 2],
        &acts,
        MomentumSgd::default(),
    )
    .unwrap()
    .build_with_seed(0)
    .unwrap()
}

fn dataset(rows: usize) -> PartialLabelDataset {
    let features = (0..rows * 32).map(|v| ((v as f64) * 0.37).sin()).collect();
    let labels = (0..rows * NUM_LABELS).map(|c| (c % 3 == 0) as u8).collect();
    PartialLabelDataset::from_flat(features, labels, 32, NUM_LABELS).unwrap()
}

fn network_forward_backward_bench(c: &mut Criterion) {
    let mut net = network();
    let input = vec![0.1; net.input_dim()];
    let target = vec![0.0; net.output_dim()];

    c.bench_function("network_forward_32_64_48_par6", |b| {
        b.iter(|| {
            let out = net.forward(black_box(&input));
            black_box(out);
        })
    });

    c.bench_function("network_step_32_64_48_par6", |b| {
        b.iter(|| {
            net.forward(black_box(&input));
            net.backward(black_box(&target));
        })
    });
}

fn uncertainty_bench(c: &mut Criterion) {
    let net = network();
    let mut data = dataset(200);
    for i in (0..200).step_by(3) {
        data.query(i, &[0, 2]).unwrap();
    }

    c.bench_function("uncertainty_select_200x6", |b| {
        b.iter(|| {
            let m = UncertaintyMatrix::compute(black_box(&net), &data).unwrap();
            black_box(m.select_batch(&data, 5, 2).unwrap());
        })
    });
}

criterion_group!(benches, network_forward_backward_bench, uncertainty_bench);
criterion_main!(benches);
