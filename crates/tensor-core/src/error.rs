// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor loading and layout conversion.

use std::path::PathBuf;

/// Errors that can occur while reading or reshaping a tensor.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// The tensor file referenced by the manifest does not exist.
    #[error("tensor file not found: {}", path.display())]
    MissingTensorFile { path: PathBuf },

    /// The file exists but is not a rectangular numeric matrix.
    #[error("malformed tensor data in '{}' (line {line}): {detail}", path.display())]
    MalformedTensorData {
        path: PathBuf,
        line: usize,
        detail: String,
    },

    /// Reading the file failed for a reason other than absence.
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A flat slice could not be reshaped into the requested matrix.
    #[error("cannot reshape {actual} elements into {expected}")]
    ShapeMismatch {
        expected: crate::Shape,
        actual: usize,
    },
}
