// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the parameter buffer.

/// Errors that can occur while writing into or reading from a
/// [`ParameterBuffer`](crate::ParameterBuffer).
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// A tensor does not fit in the space left in the buffer.
    #[error(
        "tensor of layer '{layer}' needs {requested} elements at offset {offset}, \
         but only {remaining} remain"
    )]
    TensorShapeMismatch {
        layer: String,
        offset: usize,
        requested: usize,
        remaining: usize,
    },

    /// A read range lies outside the buffer.
    #[error("{count} elements at offset {offset} lie outside a buffer of {len} elements")]
    OutOfRange {
        offset: usize,
        count: usize,
        len: usize,
    },
}
