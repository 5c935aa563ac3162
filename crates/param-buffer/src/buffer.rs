// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The flat parameter buffer.

use crate::{BufferError, WriteCursor};

/// A contiguous `f64` parameter vector of fixed, declared length.
///
/// The buffer is allocated once from the manifest's declared trainable
/// parameter count and never grows. All writes go through a
/// [`WriteCursor`], which hands out each element range exactly once.
///
/// # Example
/// ```
/// use param_buffer::ParameterBuffer;
///
/// let mut buf = ParameterBuffer::zeroed(4);
/// {
///     let mut cursor = buf.cursor();
///     cursor.reserve("fc", 3).unwrap().copy_from_slice(&[1.0, 2.0, 3.0]);
///     assert_eq!(cursor.remaining(), 1);
/// }
/// assert_eq!(buf.as_slice(), &[1.0, 2.0, 3.0, 0.0]);
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ParameterBuffer {
    data: Vec<f64>,
}

impl ParameterBuffer {
    /// Allocates a zero-filled buffer of `len` elements.
    pub fn zeroed(len: usize) -> Self {
        Self {
            data: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Returns a cursor positioned at offset 0.
    pub fn cursor(&mut self) -> WriteCursor<'_> {
        WriteCursor::new(&mut self.data)
    }

    /// Bounds-checked read of `count` elements starting at `offset`.
    pub fn range(&self, offset: usize, count: usize) -> Result<&[f64], BufferError> {
        offset
            .checked_add(count)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(BufferError::OutOfRange {
                offset,
                count,
                len: self.data.len(),
            })
    }

    /// Consumes the buffer, handing its contents to the caller.
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Memory footprint of the elements in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f64>()
    }
}

impl From<Vec<f64>> for ParameterBuffer {
    fn from(data: Vec<f64>) -> Self {
        Self { data }
    }
}
