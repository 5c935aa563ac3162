// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Matrix shape descriptors.

use crate::Matrix;
use std::fmt;

/// Rows × columns of a loaded tensor.
///
/// Every tensor in an export is a 2-D matrix: vectors are stored as a single
/// column (`n × 1`), which is what the exporter's one-value-per-line files
/// produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    rows: usize,
    cols: usize,
}

impl Shape {
    /// Creates a 2-D shape.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::matrix(2, 3);
    /// assert_eq!(s.num_elements(), 6);
    /// assert_eq!(s.transposed(), Shape::matrix(3, 2));
    /// ```
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Creates a column-vector shape (`len × 1`).
    pub fn column(len: usize) -> Self {
        Self { rows: len, cols: 1 }
    }

    /// Returns the shape of an existing matrix.
    pub fn of(matrix: &Matrix) -> Self {
        let (rows, cols) = matrix.dim();
        Self { rows, cols }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns the total number of elements.
    pub fn num_elements(&self) -> usize {
        self.rows * self.cols
    }

    /// Returns the shape with rows and columns swapped.
    pub fn transposed(&self) -> Self {
        Self {
            rows: self.cols,
            cols: self.rows,
        }
    }

    /// Returns `true` if either dimension is 1.
    pub fn is_vector(&self) -> bool {
        self.rows == 1 || self.cols == 1
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.rows, self.cols)
    }
}

/// Convenience: `Shape::from((2, 3))`.
impl From<(usize, usize)> for Shape {
    fn from((rows, cols): (usize, usize)) -> Self {
        Self::matrix(rows, cols)
    }
}
