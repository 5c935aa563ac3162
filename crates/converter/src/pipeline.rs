// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The conversion pipeline with type-state enforced stage ordering.
//!
//! ```text
//! Conversion<Idle>
//!     │  .parse()
//!     ▼
//! Conversion<Parsed>        manifest tree
//!     │  .flatten()
//!     ▼
//! Conversion<Flattened>     parameter buffer + stats queue
//!     │  .build(&dyn GraphBuilder)
//!     ▼
//! Conversion<Built>         live graph, stats pending
//!     │  .distribute()
//!     ▼
//! Conversion<Distributed>
//!     │  .check()?  .persist(&dyn ModelSink)
//!     ▼
//!   ConversionReport
//! ```
//!
//! Each transition consumes the previous value, so stats cannot be
//! distributed before the graph exists and nothing can be persisted before
//! the stats are assigned.

use crate::builder::GraphBuilder;
use crate::distributor::Distributor;
use crate::graph::LiveGraph;
use crate::sink::ModelSink;
use crate::walker::{FlattenOutput, FlatteningWalker};
use crate::{ConversionConfig, ConversionReport, ConvertError, VariantConfig};
use model_ir::{ManifestParser, ManifestTree};
use param_buffer::{ParameterBuffer, RunningStatsQueue};
use std::time::Instant;
use tensor_core::TensorSource;

// ── Type-state markers ─────────────────────────────────────────

/// Nothing has been read yet.
#[derive(Debug)]
pub struct Idle;

/// The manifest has been parsed.
#[derive(Debug)]
pub struct Parsed {
    tree: ManifestTree,
}

/// Every tensor has been loaded into the buffer.
#[derive(Debug)]
pub struct Flattened {
    tree: ManifestTree,
    output: FlattenOutput,
}

/// The graph owns the parameters; running stats are still queued.
#[derive(Debug)]
pub struct Built {
    graph: LiveGraph,
    stats: RunningStatsQueue,
}

/// The graph is complete.
#[derive(Debug)]
pub struct Distributed {
    graph: LiveGraph,
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Idle {}
    impl Sealed for super::Parsed {}
    impl Sealed for super::Flattened {}
    impl Sealed for super::Built {}
    impl Sealed for super::Distributed {}
}

/// Sealed trait for pipeline states.
pub trait ConversionState: sealed::Sealed + std::fmt::Debug {}
impl ConversionState for Idle {}
impl ConversionState for Parsed {}
impl ConversionState for Flattened {}
impl ConversionState for Built {}
impl ConversionState for Distributed {}

// ── Pipeline ───────────────────────────────────────────────────

/// Conversion of one model variant.
///
/// # Example
/// ```no_run
/// use converter::{Conversion, ConversionConfig, JsonSink, MirrorGraphBuilder, VariantConfig};
///
/// # fn example() -> Result<(), converter::ConvertError> {
/// let config = ConversionConfig::default();
/// let variant = VariantConfig::new("vgg11_bn", "vgg11_bn.xml", "vgg11_bn.json");
/// let builder = MirrorGraphBuilder::new(config.normalization_types.clone());
///
/// let report = Conversion::new(config, variant)
///     .parse()?
///     .flatten()?
///     .build(&builder)?
///     .distribute()?
///     .check()?
///     .persist(&JsonSink::new())?;
/// println!("{}", report.summary());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Conversion<S: ConversionState = Idle> {
    config: ConversionConfig,
    variant: VariantConfig,
    report: ConversionReport,
    state: S,
}

impl<S: ConversionState> Conversion<S> {
    fn map_state<T: ConversionState>(self, f: impl FnOnce(S) -> T) -> Conversion<T> {
        Conversion {
            config: self.config,
            variant: self.variant,
            report: self.report,
            state: f(self.state),
        }
    }

    fn try_map_state<T: ConversionState>(
        self,
        f: impl FnOnce(S) -> Result<T, ConvertError>,
    ) -> Result<Conversion<T>, ConvertError> {
        Ok(Conversion {
            config: self.config,
            variant: self.variant,
            report: self.report,
            state: f(self.state)?,
        })
    }

    pub fn variant(&self) -> &VariantConfig {
        &self.variant
    }

    /// The report as filled in so far.
    pub fn report(&self) -> &ConversionReport {
        &self.report
    }
}

// ── Idle → Parsed ──────────────────────────────────────────────

impl Conversion<Idle> {
    pub fn new(config: ConversionConfig, variant: VariantConfig) -> Self {
        let report = ConversionReport::new(
            variant.architecture.clone(),
            variant.manifest.clone(),
            variant.output.clone(),
        );
        Self {
            config,
            variant,
            report,
            state: Idle,
        }
    }

    /// Reads and parses the variant's manifest.
    pub fn parse(self) -> Result<Conversion<Parsed>, ConvertError> {
        let start = Instant::now();
        let tree = ManifestParser::parse(&self.variant.manifest)?;
        tracing::info!("{}", tree.summary());
        Ok(self.with_tree(tree, start))
    }

    /// Starts from an already parsed tree.
    pub fn from_tree(self, tree: ManifestTree) -> Conversion<Parsed> {
        let start = Instant::now();
        self.with_tree(tree, start)
    }

    fn with_tree(mut self, tree: ManifestTree, start: Instant) -> Conversion<Parsed> {
        self.report.stages.parse = start.elapsed();
        self.report.leaves = tree.leaf_count();
        self.map_state(|Idle| Parsed { tree })
    }
}

// ── Parsed → Flattened ─────────────────────────────────────────

impl Conversion<Parsed> {
    pub fn tree(&self) -> &ManifestTree {
        &self.state.tree
    }

    /// Loads every tensor from CSV files next to the manifest (or under the
    /// configured tensor root).
    pub fn flatten(self) -> Result<Conversion<Flattened>, ConvertError> {
        let loader = self.config.tensor_loader_for(&self.variant.manifest);
        self.flatten_with(&loader)
    }

    /// Loads every tensor from `source`.
    pub fn flatten_with(
        mut self,
        source: &dyn TensorSource,
    ) -> Result<Conversion<Flattened>, ConvertError> {
        let start = Instant::now();
        let walker = FlatteningWalker::new(source, self.config.layout)
            .with_normalization_types(self.config.normalization_types.clone());
        let output = walker.flatten(&self.state.tree)?;

        self.report.stages.flatten = start.elapsed();
        self.report.trainable_params = output.buffer.len();
        self.report.buffer_bytes = output.buffer.size_bytes();
        self.report.tensors_loaded = output.tensors_loaded();
        Ok(self.map_state(|Parsed { tree }| Flattened { tree, output }))
    }
}

// ── Flattened → Built ──────────────────────────────────────────

impl Conversion<Flattened> {
    pub fn buffer(&self) -> &ParameterBuffer {
        &self.state.output.buffer
    }

    pub fn stats(&self) -> &RunningStatsQueue {
        &self.state.output.stats
    }

    pub fn output(&self) -> &FlattenOutput {
        &self.state.output
    }

    /// Constructs the graph and hands it the parameter buffer.
    pub fn build(
        self,
        builder: &dyn GraphBuilder,
    ) -> Result<Conversion<Built>, ConvertError> {
        let start = Instant::now();
        let Conversion {
            config,
            variant,
            mut report,
            state: Flattened { tree, output },
        } = self;
        let architecture = variant.architecture.as_str();

        if let Some(expected) = builder.expected_parameters(architecture) {
            if expected != output.buffer.len() {
                return Err(ConvertError::GraphConstruction(format!(
                    "'{architecture}' expects {expected} parameters, the manifest provides {}",
                    output.buffer.len()
                )));
            }
        }

        tracing::debug!("building '{architecture}' with the {} builder", builder.name());
        let graph = builder.build(architecture, &tree, &output.layout, output.buffer.into_vec())?;
        if graph.num_parameters() != report.trainable_params {
            return Err(ConvertError::GraphConstruction(format!(
                "builder '{}' produced {} parameters, expected {}",
                builder.name(),
                graph.num_parameters(),
                report.trainable_params
            )));
        }
        tracing::info!("{}", graph.summary());

        report.stages.build = start.elapsed();
        Ok(Conversion {
            config,
            variant,
            report,
            state: Built {
                graph,
                stats: output.stats,
            },
        })
    }
}

// ── Built → Distributed ────────────────────────────────────────

impl Conversion<Built> {
    pub fn graph(&self) -> &LiveGraph {
        &self.state.graph
    }

    /// Assigns the queued running statistics to the graph's normalization
    /// layers.
    pub fn distribute(self) -> Result<Conversion<Distributed>, ConvertError> {
        let start = Instant::now();
        let layout = self.config.layout;
        let mut assigned = 0;
        let mut next = self.try_map_state(|Built { mut graph, stats }| {
            assigned = Distributor::new(layout).distribute(&mut graph, stats)?;
            Ok(Distributed { graph })
        })?;
        next.report.normalization_layers = assigned;
        next.report.stages.distribute = start.elapsed();
        Ok(next)
    }
}

// ── Distributed: check and persist ─────────────────────────────

impl Conversion<Distributed> {
    pub fn graph(&self) -> &LiveGraph {
        &self.state.graph
    }

    /// Runs the graph's shape check unless disabled in the configuration.
    pub fn check(self) -> Result<Self, ConvertError> {
        if self.config.check_shapes {
            self.state.graph.validate()?;
            tracing::debug!("shape check passed for '{}'", self.variant.architecture);
        }
        Ok(self)
    }

    /// Writes the graph to the variant's output path.
    pub fn persist(mut self, sink: &dyn ModelSink) -> Result<ConversionReport, ConvertError> {
        let start = Instant::now();
        tracing::debug!("persisting with the {} sink", sink.name());
        self.report.output_bytes = sink.persist(&self.state.graph, &self.variant.output)?;
        self.report.stages.persist = start.elapsed();
        tracing::info!("{}", self.report.summary());
        Ok(self.report)
    }

    /// Returns the graph and report without persisting.
    pub fn finish(self) -> (LiveGraph, ConversionReport) {
        (self.state.graph, self.report)
    }
}

// ── Batch entry points ─────────────────────────────────────────

/// Runs the full pipeline for one variant.
pub fn convert_variant(
    config: &ConversionConfig,
    variant: &VariantConfig,
    builder: &dyn GraphBuilder,
    sink: &dyn ModelSink,
) -> Result<ConversionReport, ConvertError> {
    tracing::info!(
        "converting '{}' from '{}'",
        variant.architecture,
        variant.manifest.display()
    );
    Conversion::new(config.clone(), variant.clone())
        .parse()?
        .flatten()?
        .build(builder)?
        .distribute()?
        .check()?
        .persist(sink)
}

/// Converts every configured variant in order, stopping at the first
/// failure.
pub fn convert_all(
    config: &ConversionConfig,
    builder: &dyn GraphBuilder,
    sink: &dyn ModelSink,
) -> Result<Vec<ConversionReport>, ConvertError> {
    config.validate()?;
    let mut reports = Vec::with_capacity(config.variants.len());
    for variant in &config.variants {
        let report = convert_variant(config, variant, builder, sink).map_err(|e| {
            tracing::error!("'{}' failed: {e}", variant.architecture);
            e
        })?;
        reports.push(report);
    }
    Ok(reports)
}
