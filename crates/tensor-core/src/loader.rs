// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor loading from delimited text files.
//!
//! The exporter writes one tensor per file as plain numeric text: one matrix
//! row per line, cells separated by commas or whitespace. There is no header
//! and no embedded shape metadata; the shape is inferred from the number of
//! non-blank lines and the number of cells on each line.
//!
//! Two [`TensorSource`] implementations are provided:
//!
//! 1. [`CsvTensorLoader`]: reads files from disk. This is the production
//!    path.
//! 2. [`InMemorySource`]: serves pre-built matrices keyed by path, for tests
//!    and benchmarks that should not touch the filesystem.

use crate::{Matrix, Shape, TensorError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Anything that can produce a numeric matrix for a manifest path.
pub trait TensorSource {
    /// Loads the tensor referenced by `path`.
    fn load(&self, path: &Path) -> Result<Matrix, TensorError>;
}

/// Loads tensors from delimited text files on disk.
///
/// Relative paths are resolved against an optional root directory (usually
/// the directory the manifest lives in). The file is opened, read and closed
/// within a single [`load`](TensorSource::load) call.
#[derive(Debug, Clone, Default)]
pub struct CsvTensorLoader {
    root: Option<PathBuf>,
}

impl CsvTensorLoader {
    /// Creates a loader that uses paths exactly as given.
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Creates a loader that resolves relative paths against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Returns the root directory, if any.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Resolves a manifest path to the file that will be read.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl TensorSource for CsvTensorLoader {
    fn load(&self, path: &Path) -> Result<Matrix, TensorError> {
        let resolved = self.resolve(path);
        let content = std::fs::read_to_string(&resolved).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TensorError::MissingTensorFile {
                    path: resolved.clone(),
                }
            } else {
                TensorError::Io {
                    path: resolved.clone(),
                    source: e,
                }
            }
        })?;

        let matrix = parse_matrix(&content, &resolved)?;
        tracing::trace!("loaded {} from '{}'", Shape::of(&matrix), resolved.display());
        Ok(matrix)
    }
}

/// Parses delimited numeric text into a matrix.
///
/// `origin` is only used for error messages.
///
/// # Examples
/// ```
/// use tensor_core::parse_matrix;
/// use std::path::Path;
///
/// let m = parse_matrix("1, 2, 3\n4, 5, 6\n", Path::new("inline")).unwrap();
/// assert_eq!(m.dim(), (2, 3));
/// assert_eq!(m[[1, 0]], 4.0);
/// ```
pub fn parse_matrix(content: &str, origin: &Path) -> Result<Matrix, TensorError> {
    let mut values = Vec::new();
    let mut rows = 0usize;
    let mut cols: Option<usize> = None;

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let before = values.len();
        for cell in trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|c| !c.is_empty())
        {
            let value: f64 = cell.parse().map_err(|_| TensorError::MalformedTensorData {
                path: origin.to_path_buf(),
                line: line_no,
                detail: format!("'{cell}' is not a number"),
            })?;
            values.push(value);
        }

        let width = values.len() - before;
        match cols {
            None => cols = Some(width),
            Some(expected) if expected != width => {
                return Err(TensorError::MalformedTensorData {
                    path: origin.to_path_buf(),
                    line: line_no,
                    detail: format!("expected {expected} columns, found {width}"),
                });
            }
            Some(_) => {}
        }
        rows += 1;
    }

    let cols = match cols {
        Some(c) if c > 0 => c,
        _ => {
            return Err(TensorError::MalformedTensorData {
                path: origin.to_path_buf(),
                line: 0,
                detail: "file contains no numeric values".into(),
            })
        }
    };

    Matrix::from_shape_vec((rows, cols), values).map_err(|_| TensorError::ShapeMismatch {
        expected: Shape::matrix(rows, cols),
        actual: rows * cols,
    })
}

/// Serves matrices from memory, keyed by the path the manifest names.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    tensors: HashMap<PathBuf, Matrix>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a matrix under `path`, replacing any previous entry.
    pub fn insert(&mut self, path: impl Into<PathBuf>, matrix: Matrix) {
        self.tensors.insert(path.into(), matrix);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, path: impl Into<PathBuf>, matrix: Matrix) -> Self {
        self.insert(path, matrix);
        self
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

impl TensorSource for InMemorySource {
    fn load(&self, path: &Path) -> Result<Matrix, TensorError> {
        self.tensors
            .get(path)
            .cloned()
            .ok_or_else(|| TensorError::MissingTensorFile {
                path: path.to_path_buf(),
            })
    }
}
