// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for flattening and stats distribution.

use converter::{Distributor, FlatteningWalker, GraphBuilder, MirrorGraphBuilder};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use model_ir::{LeafSpec, ManifestTree};
use tensor_core::{InMemorySource, Matrix, TensorLayout};

/// A VGG-like stack of `blocks` × (Conv2d, BatchNorm2d, ReLU) with
/// `channels` output channels and 3×3 kernels.
fn synthetic_model(blocks: usize, channels: usize) -> (ManifestTree, InMemorySource) {
    let mut source = InMemorySource::new();
    let kernel = channels * 9;
    let mut total = 0;

    let mut b = ManifestTree::builder("VGG", 0);
    let mut features = Vec::new();
    for i in 0..blocks {
        let p = |t: &str| format!("features/{i}/{t}.csv");
        source.insert(p("cw"), Matrix::from_elem((channels, kernel), 0.01));
        source.insert(p("cb"), Matrix::zeros((channels, 1)));
        source.insert(p("nw"), Matrix::ones((channels, 1)));
        source.insert(p("nb"), Matrix::zeros((channels, 1)));
        source.insert(p("nm"), Matrix::zeros((channels, 1)));
        source.insert(p("nv"), Matrix::ones((channels, 1)));
        total += channels * kernel + 3 * channels;

        features.push(b.leaf("Conv2d", LeafSpec::weight_and_bias(p("cw"), p("cb"))));
        features.push(b.leaf(
            "BatchNorm2d",
            LeafSpec::weight_and_bias(p("nw"), p("nb")).with_running_stats(p("nm"), p("nv")),
        ));
        features.push(b.leaf("ReLU", LeafSpec::default()));
    }
    let seq = b.container("Sequential", features).unwrap();
    let mut tree = b.finish(vec![seq]).unwrap();
    tree.trainable_param_count = total;
    (tree, source)
}

fn bench_flatten(c: &mut Criterion) {
    let mut group = c.benchmark_group("flatten");
    for channels in [16, 64, 256] {
        let (tree, source) = synthetic_model(8, channels);
        group.bench_with_input(BenchmarkId::from_parameter(channels), &tree, |bench, tree| {
            let walker = FlatteningWalker::new(&source, TensorLayout::Transposed);
            bench.iter(|| walker.flatten(black_box(tree)).unwrap());
        });
    }
    group.finish();
}

fn bench_distribute(c: &mut Criterion) {
    let (tree, source) = synthetic_model(32, 64);
    let out = FlatteningWalker::new(&source, TensorLayout::Transposed)
        .flatten(&tree)
        .unwrap();
    let graph = MirrorGraphBuilder::default()
        .build("vgg", &tree, &out.layout, out.buffer.clone().into_vec())
        .unwrap();
    let distributor = Distributor::new(TensorLayout::Transposed);

    c.bench_function("distribute_32_norm_layers", |bench| {
        bench.iter(|| {
            let mut g = graph.clone();
            distributor.distribute(&mut g, out.stats.clone()).unwrap()
        });
    });
}

criterion_group!(benches, bench_flatten, bench_distribute);
criterion_main!(benches);
