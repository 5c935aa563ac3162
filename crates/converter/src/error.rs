// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for model conversion.

use std::path::PathBuf;

/// Errors that abort the conversion of a model variant.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// A tensor referenced by a layer could not be loaded.
    #[error("failed to load {role} of layer '{layer}' (buffer offset {offset}): {source}")]
    TensorLoadError {
        layer: String,
        role: &'static str,
        offset: usize,
        #[source]
        source: tensor_core::TensorError,
    },

    /// The manifest could not be read or parsed.
    #[error("manifest error: {0}")]
    ModelError(#[from] model_ir::ModelError),

    /// A write or read fell outside the parameter buffer.
    #[error("parameter buffer error: {0}")]
    BufferError(#[from] param_buffer::BufferError),

    /// A normalization leaf does not name one of its running-stats files.
    #[error("normalization layer '{layer}' (manifest line {line}) has no <{field}>")]
    MissingStatsReference {
        layer: String,
        line: u32,
        field: &'static str,
    },

    /// The leaves hold a different number of trainable elements than the
    /// manifest root declares.
    #[error("manifest declares {declared} trainable parameters, but its layers hold {consumed}")]
    TrainableParamCountMismatch { declared: usize, consumed: usize },

    /// A normalization layer was reached after the stats queue ran dry.
    #[error("no running statistics left for normalization layer '{layer}'")]
    StatsQueueUnderflow { layer: String },

    /// Running statistics were left over after every layer was visited.
    #[error("{remaining} running-statistics pair(s) left unassigned, starting with '{next}'")]
    StatsQueueOverflow { remaining: usize, next: String },

    /// The layer graph could not be constructed around the buffer.
    #[error("graph construction failed: {0}")]
    GraphConstruction(String),

    /// The constructed graph failed its shape check.
    #[error("shape check failed for layer '{layer}': {detail}")]
    ShapeCheck { layer: String, detail: String },

    /// Writing the finished model failed.
    #[error("failed to write '{}': {detail}", path.display())]
    PersistError { path: PathBuf, detail: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
