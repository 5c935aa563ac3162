// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Dense numeric tensors as they arrive from a model export.
//!
//! This crate provides:
//! - [`Matrix`]: a 2-D `f64` matrix backed by `ndarray`.
//! - [`Shape`]: rows × columns descriptor.
//! - [`TensorSource`]: the load-tensor interface, with a delimited-text
//!   implementation ([`CsvTensorLoader`]) and an in-memory one
//!   ([`InMemorySource`]).
//! - [`TensorLayout`]: the export → target storage-order convention.
//!
//! # Design Goals
//! - Tensors are written straight into a caller-provided slice; no
//!   intermediate flattened copy.
//! - Clean error types via `thiserror`.

mod error;
mod layout;
mod loader;
mod shape;

pub use error::TensorError;
pub use layout::TensorLayout;
pub use loader::{parse_matrix, CsvTensorLoader, InMemorySource, TensorSource};
pub use shape::Shape;

/// A dense, owned 2-D matrix of `f64` values.
pub type Matrix = ndarray::Array2<f64>;
