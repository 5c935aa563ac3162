// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Storage-order conversion between the export and the target runtime.
//!
//! The exporter writes matrices row-major. The target runtime keeps every
//! matrix column-major and, for its parameter vector, stores the *transpose*
//! of each exported tensor. Storing `Mᵀ` column-major lays the elements out
//! exactly as `M` reads row-major:
//!
//! ```text
//! M (export, 2 × 3)        Mᵀ (target, 3 × 2), column-major memory
//! ┌ a b c ┐                a b c d e f
//! └ d e f ┘
//! ```
//!
//! One [`TensorLayout`] is chosen per conversion and applied to weights,
//! biases and running statistics alike.
//!
//! A loader that transposes each file when reading it and again when
//! assigning it keeps the file's own orientation. That net effect is
//! [`TensorLayout::AsStored`]: weights land column-major of the exported
//! matrix and one-value-per-line statistics stay `n × 1` columns. The
//! default [`TensorLayout::Transposed`] turns those statistics into `1 × n`
//! rows.

use crate::{Matrix, Shape, TensorError};
use ndarray::ShapeBuilder;

/// How an exported matrix is placed into target (column-major) storage.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum TensorLayout {
    /// The target stores the transpose of the exported matrix.
    #[default]
    Transposed,
    /// The target stores the exported matrix unchanged.
    AsStored,
}

impl TensorLayout {
    /// Parses a layout name (`"transposed"`, `"as-stored"`).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "transposed" | "transpose" | "t" => Some(Self::Transposed),
            "as-stored" | "asstored" | "identity" | "none" => Some(Self::AsStored),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transposed => "transposed",
            Self::AsStored => "as-stored",
        }
    }

    /// Shape the target sees for an exported matrix of shape `export`.
    pub fn target_shape(self, export: Shape) -> Shape {
        match self {
            Self::Transposed => export.transposed(),
            Self::AsStored => export,
        }
    }

    /// Writes `matrix` into `dst` in target storage order.
    ///
    /// `dst` is a view into the destination buffer and must hold exactly
    /// `matrix.len()` elements.
    pub fn write_into(self, matrix: &Matrix, dst: &mut [f64]) -> Result<(), TensorError> {
        if dst.len() != matrix.len() {
            return Err(TensorError::ShapeMismatch {
                expected: Shape::of(matrix),
                actual: dst.len(),
            });
        }
        match self {
            // Column-major of Mᵀ is row-major of M.
            Self::Transposed => {
                for (d, v) in dst.iter_mut().zip(matrix.iter()) {
                    *d = *v;
                }
            }
            Self::AsStored => {
                for (d, v) in dst.iter_mut().zip(matrix.t().iter()) {
                    *d = *v;
                }
            }
        }
        Ok(())
    }

    /// Returns the matrix as the target holds it.
    pub fn orient(self, matrix: Matrix) -> Matrix {
        match self {
            Self::Transposed => matrix.reversed_axes(),
            Self::AsStored => matrix,
        }
    }

    /// Inverse of [`write_into`](Self::write_into): rebuilds the exported
    /// matrix of shape `export` from a run of target-ordered elements.
    pub fn restore(self, src: &[f64], export: Shape) -> Result<Matrix, TensorError> {
        let dims = (export.rows(), export.cols());
        let result = match self {
            Self::Transposed => Matrix::from_shape_vec(dims, src.to_vec()),
            Self::AsStored => Matrix::from_shape_vec(dims.f(), src.to_vec()),
        };
        result.map_err(|_| TensorError::ShapeMismatch {
            expected: export,
            actual: src.len(),
        })
    }
}

impl std::fmt::Display for TensorLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
