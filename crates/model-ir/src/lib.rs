// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-ir
//!
//! An in-memory representation of an exported model manifest.
//!
//! The exporter describes a model as a tree of layers: containers (e.g.
//! `Sequential`) whose state is delegated to ordered children, and leaves
//! (e.g. `Conv2d`, `BatchNorm2d`) that reference tensor files. This crate
//! captures exactly that:
//!
//! - [`LayerNode`]: one layer element: identifier, source line, and a
//!   [`NodeKind`] that is either a [`LeafSpec`] or a list of children.
//! - [`ManifestTree`]: an arena of nodes addressed by [`NodeId`], plus the
//!   declared trainable parameter count.
//! - [`ManifestParser`]: reads the XML manifest.
//!
//! # Example
//! ```no_run
//! use model_ir::ManifestParser;
//! use std::path::Path;
//!
//! let tree = ManifestParser::parse(Path::new("./vgg11.xml")).unwrap();
//! println!("{}", tree.summary());
//! for (_, node, _) in tree.leaves() {
//!     println!("  {}", node.label());
//! }
//! ```

mod error;
mod layer;
mod manifest;
mod tree;

pub use error::{Location, ModelError};
pub use layer::{LayerNode, LeafSpec, NodeId, NodeKind, TensorRole};
pub use manifest::ManifestParser;
pub use tree::{DepthFirst, ManifestTree, TreeBuilder};
