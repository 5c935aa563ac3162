// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # converter
//!
//! Converts an exported layer tree into a runtime model.
//!
//! The converter takes:
//! - A [`model_ir::ManifestTree`] parsed from the exporter's XML manifest.
//! - Tensor files, read through a [`tensor_core::TensorSource`].
//! - A [`GraphBuilder`] that constructs the target layer graph.
//!
//! It walks the tree depth-first, writes every trainable tensor into one
//! contiguous parameter vector, queues the running statistics of
//! normalization layers, and assigns that queue to the constructed graph in
//! the same order before a [`ModelSink`] persists the result.
//!
//! # Type-State Pipeline
//! ```text
//! Conversion<Idle> → <Parsed> → <Flattened> → <Built> → <Distributed>
//! ```
//! Transitions are compile-time checked.

mod builder;
mod config;
mod distributor;
mod error;
mod graph;
mod pipeline;
mod report;
mod sink;
mod spans;
mod walker;

pub use builder::{GraphBuilder, MirrorGraphBuilder};
pub use config::{ConversionConfig, VariantConfig};
pub use distributor::Distributor;
pub use error::ConvertError;
pub use graph::{ContainerLayer, LiveGraph, LiveLayer, NormalizationLayer, PlainLayer};
pub use pipeline::{
    convert_all, convert_variant, Built, Conversion, ConversionState, Distributed, Flattened,
    Idle, Parsed,
};
pub use report::{ConversionReport, StageDurations};
pub use sink::{JsonSink, ModelSink};
pub use spans::{LeafSpans, ParameterLayout, TensorSpan};
pub use walker::{FlattenOutput, FlatteningWalker};
