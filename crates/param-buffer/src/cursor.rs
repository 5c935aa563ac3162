// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Sequential, bounds-checked writes into a parameter buffer.
//!
//! A [`WriteCursor`] borrows the buffer mutably and walks it front to back.
//! Every [`reserve`](WriteCursor::reserve) hands out the next unwritten
//! range as a `&mut [f64]` view and advances the offset, so:
//!
//! - no range is handed out twice (the offset only moves forward),
//! - ranges are contiguous (no gaps between reservations),
//! - a reservation that would run past the end is rejected before anything
//!   is written.
//!
//! ```text
//!  offset ─────────────┐
//!  ┌───────┬──────┬────▼──────────────────┐
//!  │ w₁    │ b₁   │ (remaining)           │
//!  └───────┴──────┴───────────────────────┘
//! ```

use crate::BufferError;

/// A forward-only write cursor over a parameter buffer.
#[derive(Debug)]
pub struct WriteCursor<'a> {
    data: &'a mut [f64],
    offset: usize,
}

impl<'a> WriteCursor<'a> {
    pub(crate) fn new(data: &'a mut [f64]) -> Self {
        Self { data, offset: 0 }
    }

    /// Index of the next element to be written.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Total length of the underlying buffer.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Elements not yet handed out.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Returns `true` once every element has been handed out.
    pub fn is_complete(&self) -> bool {
        self.offset == self.data.len()
    }

    /// Reserves the next `count` elements for `layer` and returns them as a
    /// mutable view into the buffer.
    ///
    /// Fails with [`BufferError::TensorShapeMismatch`] if fewer than `count`
    /// elements remain; the cursor does not move in that case.
    pub fn reserve(&mut self, layer: &str, count: usize) -> Result<&mut [f64], BufferError> {
        let remaining = self.remaining();
        if count > remaining {
            return Err(BufferError::TensorShapeMismatch {
                layer: layer.to_string(),
                offset: self.offset,
                requested: count,
                remaining,
            });
        }
        let start = self.offset;
        self.offset += count;
        tracing::trace!("{layer}: reserved [{start}, {})", self.offset);
        Ok(&mut self.data[start..start + count])
    }
}

#[cfg(test)]
mod tests {
    use crate::ParameterBuffer;

    #[test]
    fn test_sequential_reservations() {
        let mut buf = ParameterBuffer::zeroed(6);
        {
            let mut cursor = buf.cursor();
            cursor.reserve("a", 4).unwrap().fill(1.0);
            assert_eq!(cursor.offset(), 4);
            cursor.reserve("a", 2).unwrap().fill(2.0);
            assert!(cursor.is_complete());
            assert_eq!(cursor.remaining(), 0);
        }
        assert_eq!(buf.as_slice(), &[1.0, 1.0, 1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_overrun_rejected_without_advancing() {
        let mut buf = ParameterBuffer::zeroed(3);
        let mut cursor = buf.cursor();
        cursor.reserve("conv", 2).unwrap();
        let err = cursor.reserve("fc", 5).unwrap_err();
        match err {
            crate::BufferError::TensorShapeMismatch {
                layer,
                offset,
                requested,
                remaining,
            } => {
                assert_eq!(layer, "fc");
                assert_eq!(offset, 2);
                assert_eq!(requested, 5);
                assert_eq!(remaining, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(cursor.offset(), 2);
    }

    #[test]
    fn test_zero_length_reservation() {
        let mut buf = ParameterBuffer::zeroed(0);
        let mut cursor = buf.cursor();
        assert!(cursor.reserve("relu", 0).unwrap().is_empty());
        assert!(cursor.is_complete());
    }
}
