// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: end-to-end conversion pipeline.
//!
//! These tests write a manifest and its tensor files to a temporary
//! directory and run the complete flow from XML parsing → flattening →
//! graph construction → stats distribution → persistence, proving that
//! the four crates compose correctly.

use approx::assert_abs_diff_eq;
use converter::{
    convert_all, convert_variant, Conversion, ConversionConfig, ConvertError, GraphBuilder,
    JsonSink, LiveGraph, LiveLayer, MirrorGraphBuilder, NormalizationLayer, ParameterLayout,
    PlainLayer, VariantConfig,
};
use model_ir::{ManifestTree, NodeKind, TensorRole};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tensor_core::{TensorError, TensorLayout};

// ── Helpers ────────────────────────────────────────────────────

/// Writes a row-major matrix as comma-separated rows.
fn write_matrix(dir: &Path, name: &str, rows: usize, cols: usize, start: f64) -> String {
    let mut text = String::new();
    for r in 0..rows {
        let row: Vec<String> = (0..cols)
            .map(|c| format!("{}", start + (r * cols + c) as f64))
            .collect();
        text.push_str(&row.join(","));
        text.push('\n');
    }
    fs::write(dir.join(name), text).unwrap();
    name.to_string()
}

/// Writes a vector one value per line, as the exporter does.
fn write_column(dir: &Path, name: &str, values: &[f64]) -> String {
    let text: String = values.iter().map(|v| format!("{v:e}\n")).collect();
    fs::write(dir.join(name), text).unwrap();
    name.to_string()
}

fn leaf_xml(name: &str, var: &str, weight: Option<&str>, bias: Option<&str>) -> String {
    format!(
        "<layer name=\"{name}\"><is_leaf>1</is_leaf><var_name>{var}</var_name>\
         <has_weight>{}</has_weight><weight_csv>{}</weight_csv>\
         <has_bias>{}</has_bias><bias_csv>{}</bias_csv></layer>",
        u8::from(weight.is_some()),
        weight.unwrap_or("None"),
        u8::from(bias.is_some()),
        bias.unwrap_or("None"),
    )
}

fn norm_xml(var: &str, weight: &str, bias: &str, mean: &str, var_csv: &str) -> String {
    format!(
        "<layer name=\"BatchNorm2d\"><is_leaf>1</is_leaf><var_name>{var}</var_name>\
         <has_weight>1</has_weight><weight_csv>{weight}</weight_csv>\
         <has_bias>1</has_bias><bias_csv>{bias}</bias_csv>\
         <has_running_mean>1</has_running_mean><running_mean_csv>{mean}</running_mean_csv>\
         <has_running_var>1</has_running_var><running_var_csv>{var_csv}</running_var_csv></layer>"
    )
}

fn container_xml(var: &str, children: &[String]) -> String {
    format!(
        "<layer name=\"Sequential\"><var_name>{var}</var_name><is_leaf>0</is_leaf>{}</layer>",
        children.concat()
    )
}

fn write_manifest(dir: &Path, file: &str, count: usize, layers: &[String]) -> PathBuf {
    let xml = format!(
        "<?xml version=\"1.0\"?>\n<Net>\n<trainable_param>{count}</trainable_param>\n{}\n</Net>\n",
        layers.join("\n")
    );
    let path = dir.join(file);
    fs::write(&path, xml).unwrap();
    path
}

/// Two linear leaves, each with a 2×5 weight and a 2-element bias.
fn two_linear_model(dir: &Path) -> PathBuf {
    let w1 = write_matrix(dir, "fc1_w.csv", 2, 5, 0.0);
    let b1 = write_column(dir, "fc1_b.csv", &[100.0, 101.0]);
    let w2 = write_matrix(dir, "fc2_w.csv", 2, 5, 10.0);
    let b2 = write_column(dir, "fc2_b.csv", &[200.0, 201.0]);
    write_manifest(
        dir,
        "linear.xml",
        24,
        &[
            leaf_xml("Linear", "fc1", Some(&w1), Some(&b1)),
            leaf_xml("Linear", "fc2", Some(&w2), Some(&b2)),
        ],
    )
}

/// Conv2d → BatchNorm2d → ReLU inside a Sequential, then a Linear head.
fn conv_bn_model(dir: &Path) -> PathBuf {
    let cw = write_matrix(dir, "conv_w.csv", 4, 3, 1.0);
    let cb = write_column(dir, "conv_b.csv", &[0.1, 0.2, 0.3, 0.4]);
    let nw = write_column(dir, "bn_w.csv", &[1.0, 1.0, 1.0, 1.0]);
    let nb = write_column(dir, "bn_b.csv", &[0.0, 0.0, 0.0, 0.0]);
    let nm = write_column(dir, "bn_m.csv", &[0.5, 0.25, 0.125, 0.0625]);
    let nv = write_column(dir, "bn_v.csv", &[2.0, 4.0, 8.0, 16.0]);
    let fw = write_matrix(dir, "fc_w.csv", 2, 4, -4.0);
    let fb = write_column(dir, "fc_b.csv", &[7.0, 8.0]);
    let features = container_xml(
        "features",
        &[
            leaf_xml("Conv2d", "0", Some(&cw), Some(&cb)),
            norm_xml("1", &nw, &nb, &nm, &nv),
            leaf_xml("ReLU", "2", None, None),
        ],
    );
    write_manifest(
        dir,
        "conv_bn.xml",
        34,
        &[features, leaf_xml("Linear", "classifier", Some(&fw), Some(&fb))],
    )
}

fn conversion(manifest: &Path, output: &Path) -> Conversion {
    Conversion::new(
        ConversionConfig::default(),
        VariantConfig::new("net", manifest, output),
    )
}

// ── Flattening ─────────────────────────────────────────────────

#[test]
fn test_two_leaves_fill_buffer_in_order() {
    let dir = TempDir::new().unwrap();
    let manifest = two_linear_model(dir.path());

    let flat = conversion(&manifest, &dir.path().join("out.json"))
        .parse()
        .unwrap()
        .flatten()
        .unwrap();

    let mut expected: Vec<f64> = (0..10).map(f64::from).collect();
    expected.extend([100.0, 101.0]);
    expected.extend((10..20).map(f64::from));
    expected.extend([200.0, 201.0]);
    assert_eq!(flat.buffer().as_slice(), expected.as_slice());
    assert!(flat.stats().is_empty());
    assert!(flat.output().layout.is_contiguous(24));
}

#[test]
fn test_normalization_stats_bypass_buffer() {
    let dir = TempDir::new().unwrap();
    let d = dir.path();
    let w = write_column(d, "w.csv", &[1.0, 2.0, 3.0, 4.0]);
    let b = write_column(d, "b.csv", &[5.0, 6.0, 7.0, 8.0]);
    let m = write_column(d, "m.csv", &[0.0, 0.1, 0.2, 0.3]);
    let v = write_column(d, "v.csv", &[1.0, 1.1, 1.2, 1.3]);
    let manifest = write_manifest(d, "bn.xml", 8, &[norm_xml("bn", &w, &b, &m, &v)]);

    let flat = conversion(&manifest, &d.join("bn.json"))
        .parse()
        .unwrap()
        .flatten()
        .unwrap();

    assert_eq!(flat.buffer().len(), 8);
    assert_eq!(flat.buffer().as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    assert_eq!(flat.stats().len(), 1);
    let pair = flat.stats().peek().unwrap();
    assert_abs_diff_eq!(pair.mean[[3, 0]], 0.3, epsilon = 1e-12);
    assert_abs_diff_eq!(pair.var[[1, 0]], 1.1, epsilon = 1e-12);
}

#[test]
fn test_nested_empty_containers() {
    let dir = TempDir::new().unwrap();
    let d = dir.path();
    let inner = container_xml("inner", &[]);
    let manifest = write_manifest(d, "empty.xml", 0, &[container_xml("outer", &[inner])]);

    let report = convert_variant(
        &ConversionConfig::default(),
        &VariantConfig::new("empty", &manifest, d.join("empty.json")),
        &MirrorGraphBuilder::default(),
        &JsonSink::new(),
    )
    .unwrap();
    assert_eq!(report.trainable_params, 0);
    assert_eq!(report.normalization_layers, 0);

    let graph = JsonSink::load(&d.join("empty.json")).unwrap();
    assert_eq!(graph.num_parameters(), 0);
    assert_eq!(graph.walk().len(), 2);
}

#[test]
fn test_flatten_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let manifest = conv_bn_model(dir.path());
    let out = dir.path().join("out.json");

    let first = conversion(&manifest, &out).parse().unwrap().flatten().unwrap();
    let second = conversion(&manifest, &out).parse().unwrap().flatten().unwrap();

    let bits = |s: &[f64]| s.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(first.buffer().as_slice()), bits(second.buffer().as_slice()));
    assert_eq!(first.stats(), second.stats());
}

#[test]
fn test_buffer_round_trip() {
    let dir = TempDir::new().unwrap();
    let manifest = conv_bn_model(dir.path());

    for layout in [TensorLayout::Transposed, TensorLayout::AsStored] {
        let config = ConversionConfig {
            layout,
            ..Default::default()
        };
        let source = config.tensor_loader_for(&manifest);
        let parsed = Conversion::new(config, VariantConfig::new("net", &manifest, "unused.json"))
            .parse()
            .unwrap();
        let tree = parsed.tree().clone();
        let flat = parsed.flatten().unwrap();
        let buffer = flat.buffer().as_slice();

        for (id, _, spec) in tree.leaves() {
            for (role, path) in spec.trainable_tensors() {
                let original = tensor_core::TensorSource::load(&source, path).unwrap();
                let restored = flat
                    .output()
                    .layout
                    .extract(buffer, id, role, layout)
                    .unwrap();
                assert_eq!(restored, original, "{role} of {id} under {layout}");
            }
        }
    }
}

#[test]
fn test_layout_changes_weight_order() {
    let dir = TempDir::new().unwrap();
    let manifest = conv_bn_model(dir.path());
    let config = ConversionConfig {
        layout: TensorLayout::AsStored,
        ..Default::default()
    };
    let flat = Conversion::new(config, VariantConfig::new("net", &manifest, "unused.json"))
        .parse()
        .unwrap()
        .flatten()
        .unwrap();
    // Conv weight is 4×3 holding 1..=12; column-major storage reads it down
    // the columns.
    assert_eq!(&flat.buffer().as_slice()[..4], &[1.0, 4.0, 7.0, 10.0]);
}

// ── Failure modes ──────────────────────────────────────────────

#[test]
fn test_declared_count_mismatch() {
    let dir = TempDir::new().unwrap();
    let d = dir.path();
    let w = write_matrix(d, "w.csv", 2, 2, 0.0);
    let manifest = write_manifest(d, "bad.xml", 5, &[leaf_xml("Linear", "fc", Some(&w), None)]);

    let err = conversion(&manifest, &d.join("bad.json"))
        .parse()
        .unwrap()
        .flatten()
        .unwrap_err();
    assert!(matches!(
        err,
        ConvertError::TrainableParamCountMismatch {
            declared: 5,
            consumed: 4
        }
    ));
}

#[test]
fn test_missing_tensor_file() {
    let dir = TempDir::new().unwrap();
    let d = dir.path();
    let manifest = write_manifest(
        d,
        "missing.xml",
        4,
        &[leaf_xml("Linear", "fc", Some("nowhere.csv"), None)],
    );

    let err = conversion(&manifest, &d.join("missing.json"))
        .parse()
        .unwrap()
        .flatten()
        .unwrap_err();
    match err {
        ConvertError::TensorLoadError {
            layer,
            role,
            source: TensorError::MissingTensorFile { path },
            ..
        } => {
            assert_eq!(layer, "Linear (fc)");
            assert_eq!(role, "weight");
            assert_eq!(path, d.join("nowhere.csv"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_malformed_manifest() {
    let dir = TempDir::new().unwrap();
    let manifest = dir.path().join("broken.xml");
    fs::write(&manifest, "<Net><trainable_param>3</trainable_param><layer>").unwrap();
    let err = conversion(&manifest, &dir.path().join("x.json"))
        .parse()
        .unwrap_err();
    assert!(matches!(err, ConvertError::ModelError(_)));
}

/// Treats every leaf as plain, so no layer takes the queued stats.
struct PlainOnlyBuilder;

impl GraphBuilder for PlainOnlyBuilder {
    fn name(&self) -> &str {
        "plain-only"
    }

    fn build(
        &self,
        architecture: &str,
        tree: &ManifestTree,
        layout: &ParameterLayout,
        parameters: Vec<f64>,
    ) -> Result<LiveGraph, ConvertError> {
        let layers = tree
            .leaves()
            .map(|(id, node, _)| {
                LiveLayer::PlainLeaf(PlainLayer {
                    name: node.label(),
                    params: layout.get(id).map(|l| l.spans.clone()).unwrap_or_default(),
                })
            })
            .collect();
        Ok(LiveGraph::new(architecture, parameters, layers))
    }
}

/// Mirrors the manifest and appends one extra normalization layer.
struct ExtraNormBuilder;

impl GraphBuilder for ExtraNormBuilder {
    fn name(&self) -> &str {
        "extra-norm"
    }

    fn expected_parameters(&self, _architecture: &str) -> Option<usize> {
        Some(34)
    }

    fn build(
        &self,
        architecture: &str,
        tree: &ManifestTree,
        layout: &ParameterLayout,
        parameters: Vec<f64>,
    ) -> Result<LiveGraph, ConvertError> {
        let mut graph =
            MirrorGraphBuilder::default().build(architecture, tree, layout, parameters)?;
        let extra = NormalizationLayer::new("BatchNorm2d (extra)", vec![]);
        graph.layers.push(LiveLayer::NormalizationLeaf(extra));
        Ok(graph)
    }
}

#[test]
fn test_stats_left_over() {
    let dir = TempDir::new().unwrap();
    let manifest = conv_bn_model(dir.path());
    let err = conversion(&manifest, &dir.path().join("out.json"))
        .parse()
        .unwrap()
        .flatten()
        .unwrap()
        .build(&PlainOnlyBuilder)
        .unwrap()
        .distribute()
        .unwrap_err();
    match err {
        ConvertError::StatsQueueOverflow { remaining, next } => {
            assert_eq!(remaining, 1);
            assert_eq!(next, "BatchNorm2d (1)");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_stats_run_out() {
    let dir = TempDir::new().unwrap();
    let manifest = conv_bn_model(dir.path());
    let err = conversion(&manifest, &dir.path().join("out.json"))
        .parse()
        .unwrap()
        .flatten()
        .unwrap()
        .build(&ExtraNormBuilder)
        .unwrap()
        .distribute()
        .unwrap_err();
    assert!(matches!(
        err,
        ConvertError::StatsQueueUnderflow { layer } if layer == "BatchNorm2d (extra)"
    ));
}

#[test]
fn test_builder_parameter_expectation() {
    let dir = TempDir::new().unwrap();
    let manifest = two_linear_model(dir.path());
    let err = conversion(&manifest, &dir.path().join("out.json"))
        .parse()
        .unwrap()
        .flatten()
        .unwrap()
        .build(&ExtraNormBuilder)
        .unwrap_err();
    assert!(matches!(err, ConvertError::GraphConstruction(_)));
}

// ── End to end ─────────────────────────────────────────────────

#[test]
fn test_full_pipeline_persists_graph() {
    let dir = TempDir::new().unwrap();
    let manifest = conv_bn_model(dir.path());
    let output = dir.path().join("models/conv_bn.json");

    let report = convert_variant(
        &ConversionConfig::default(),
        &VariantConfig::new("conv_bn", &manifest, &output),
        &MirrorGraphBuilder::default(),
        &JsonSink::pretty(),
    )
    .unwrap();
    assert_eq!(report.trainable_params, 34);
    assert_eq!(report.buffer_bytes, 34 * std::mem::size_of::<f64>());
    assert_eq!(report.leaves, 4);
    assert_eq!(report.normalization_layers, 1);
    assert_eq!(report.tensors_loaded, 8);
    assert!(report.output_bytes > 0);

    let graph = JsonSink::load(&output).unwrap();
    graph.validate().unwrap();
    assert_eq!(graph.architecture, "conv_bn");
    assert_eq!(graph.num_parameters(), 34);

    let norms = graph.normalization_layers();
    assert_eq!(norms.len(), 1);
    let mean = norms[0].running_mean.as_ref().unwrap();
    // Stats are exported as columns and held transposed.
    assert_eq!(mean.dim(), (1, 4));
    assert_abs_diff_eq!(mean[[0, 2]], 0.125, epsilon = 1e-12);

    let LiveLayer::Container(features) = &graph.layers[0] else {
        panic!("expected features container");
    };
    assert_eq!(features.layers.len(), 3);
    let bias = features.layers[1]
        .params()
        .iter()
        .find(|s| s.role == TensorRole::Bias)
        .unwrap();
    assert_eq!((bias.offset, bias.len), (20, 4));
}

#[test]
fn test_convert_all_from_config_file() {
    let dir = TempDir::new().unwrap();
    let d = dir.path();
    let linear = two_linear_model(d);
    let conv_bn = conv_bn_model(d);
    let config_path = d.join("convert.toml");
    fs::write(
        &config_path,
        format!(
            "layout = \"transposed\"\n\n\
             [[variants]]\narchitecture = \"linear\"\nmanifest = {:?}\noutput = {:?}\n\n\
             [[variants]]\narchitecture = \"conv_bn\"\nmanifest = {:?}\noutput = {:?}\n",
            linear.display().to_string(),
            d.join("out/linear.json").display().to_string(),
            conv_bn.display().to_string(),
            d.join("out/conv_bn.json").display().to_string(),
        ),
    )
    .unwrap();

    let config = ConversionConfig::from_file(&config_path).unwrap();
    let builder = MirrorGraphBuilder::new(config.normalization_types.clone());
    let reports = convert_all(&config, &builder, &JsonSink::new()).unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].trainable_params, 24);
    assert_eq!(reports[1].normalization_layers, 1);
    assert!(d.join("out/linear.json").exists());
    assert!(d.join("out/conv_bn.json").exists());
}

#[test]
fn test_convert_all_stops_at_first_failure() {
    let dir = TempDir::new().unwrap();
    let d = dir.path();
    let good = two_linear_model(d);
    let config = ConversionConfig {
        variants: vec![
            VariantConfig::new("missing", d.join("absent.xml"), d.join("a.json")),
            VariantConfig::new("linear", &good, d.join("b.json")),
        ],
        ..Default::default()
    };

    let err = convert_all(&config, &MirrorGraphBuilder::default(), &JsonSink::new()).unwrap_err();
    assert!(matches!(err, ConvertError::ModelError(_)));
    assert!(!d.join("b.json").exists());
}

#[test]
fn test_unknown_layer_kind_is_plain() {
    let dir = TempDir::new().unwrap();
    let manifest = conv_bn_model(dir.path());
    let tree = model_ir::ManifestParser::parse(&manifest).unwrap();
    let containers = tree
        .depth_first()
        .filter(|(_, id)| matches!(tree.node(*id).kind, NodeKind::Container { .. }))
        .count();
    assert_eq!(containers, 2);

    let (graph, _) = Conversion::new(
        ConversionConfig::default(),
        VariantConfig::new("net", &manifest, "unused.json"),
    )
    .from_tree(tree)
    .flatten_with(&ConversionConfig::default().tensor_loader_for(&manifest))
    .unwrap()
    .build(&MirrorGraphBuilder::default())
    .unwrap()
    .distribute()
    .unwrap()
    .check()
    .unwrap()
    .finish();
    let relu = graph.walk().into_iter().find(|l| l.name() == "ReLU (2)").unwrap();
    assert!(matches!(relu, LiveLayer::PlainLeaf(_)));
}
