// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! XML model manifest parsing.
//!
//! The manifest is written by the exporter alongside one delimited-text file
//! per tensor. It describes the layer tree of the model and the total number
//! of trainable parameters.
//!
//! # Format
//! ```xml
//! <VGG>
//!   <trainable_param>132863336</trainable_param>
//!   <layer name="Sequential">
//!     <var_name>features</var_name>
//!     <is_leaf>0</is_leaf>
//!     <layer name="Conv2d">
//!       <is_leaf>1</is_leaf>
//!       <var_name>0</var_name>
//!       <trainable_param>1792</trainable_param>
//!       <has_weight>1</has_weight>
//!       <weight_csv>VGG_0/features/0/weight_2.csv</weight_csv>
//!       <has_bias>1</has_bias>
//!       <bias_csv>VGG_0/features/0/bias_2.csv</bias_csv>
//!     </layer>
//!     ...
//!   </layer>
//! </VGG>
//! ```
//!
//! Normalization leaves additionally carry `running_mean_csv` and
//! `running_var_csv`. Elements the converter does not need (`depth`,
//! `has_running_mean`, `num_batches_tracked_csv`, ...) are ignored.

use crate::{
    LayerNode, LeafSpec, Location, ManifestTree, ModelError, NodeId, NodeKind, TreeBuilder,
};
use roxmltree::{Document, Node};
use std::path::{Path, PathBuf};

const LAYER_TAG: &str = "layer";
const NAME_ATTR: &str = "name";
const TRAINABLE_PARAM: &str = "trainable_param";

/// Parses manifests into [`ManifestTree`]s.
///
/// # Example
/// ```
/// use model_ir::ManifestParser;
///
/// let xml = r#"
/// <Net>
///   <trainable_param>0</trainable_param>
///   <layer name="ReLU">
///     <is_leaf>1</is_leaf>
///     <has_weight>0</has_weight>
///     <has_bias>0</has_bias>
///   </layer>
/// </Net>"#;
/// let tree = ManifestParser::parse_str(xml).unwrap();
/// assert_eq!(tree.leaf_count(), 1);
/// ```
pub struct ManifestParser;

impl ManifestParser {
    /// Reads and parses a manifest file.
    pub fn parse(path: &Path) -> Result<ManifestTree, ModelError> {
        let content = std::fs::read_to_string(path).map_err(|e| ModelError::ManifestRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let tree = Self::parse_str(&content)?;
        tracing::debug!("parsed '{}': {}", path.display(), tree.summary());
        Ok(tree)
    }

    /// Parses a manifest from an XML string.
    pub fn parse_str(xml: &str) -> Result<ManifestTree, ModelError> {
        let doc = Document::parse(xml).map_err(|e| ModelError::ManifestParse {
            location: e.pos().into(),
            detail: e.to_string(),
        })?;
        let root = doc.root_element();

        let count_node = child_element(root, TRAINABLE_PARAM).ok_or_else(|| {
            parse_error(root, format!("root element lacks <{TRAINABLE_PARAM}>"))
        })?;
        let count = parse_count(count_node)?;

        let mut builder = ManifestTree::builder(root.tag_name().name(), count);
        let children = parse_children(root, &mut builder)?;
        builder.finish(children)
    }
}

/// Parses every `<layer>` child of `parent`, in document order.
fn parse_children(
    parent: Node<'_, '_>,
    builder: &mut TreeBuilder,
) -> Result<Vec<NodeId>, ModelError> {
    parent
        .children()
        .filter(|n| n.is_element() && n.has_tag_name(LAYER_TAG))
        .map(|n| parse_layer(n, builder))
        .collect()
}

fn parse_layer(node: Node<'_, '_>, builder: &mut TreeBuilder) -> Result<NodeId, ModelError> {
    let name = node.attribute(NAME_ATTR);
    let var_name = child_text(node, "var_name").map(str::to_string);
    let line = location(node).line;
    let is_leaf = required_flag(node, "is_leaf")?;

    if !is_leaf {
        // A container's state lives entirely in its children.
        for tag in ["has_weight", "has_bias"] {
            if optional_flag(node, tag)? {
                return Err(parse_error(
                    node,
                    format!("container layer sets <{tag}>; only leaves carry tensors"),
                ));
            }
        }
        let children = parse_children(node, builder)?;
        return builder.push(LayerNode {
            name: name.unwrap_or_default().to_string(),
            var_name,
            line,
            kind: NodeKind::Container { children },
        });
    }

    if let Some(nested) = child_element(node, LAYER_TAG) {
        return Err(parse_error(
            nested,
            "leaf layer contains a nested <layer>; set <is_leaf>0</is_leaf> on the parent"
                .to_string(),
        ));
    }

    let name = name.filter(|n| !n.trim().is_empty()).ok_or_else(|| {
        parse_error(node, format!("leaf layer lacks a '{NAME_ATTR}' attribute"))
    })?;

    let weight = if required_flag(node, "has_weight")? {
        Some(required_path(node, "weight_csv")?)
    } else {
        None
    };
    let bias = if required_flag(node, "has_bias")? {
        Some(required_path(node, "bias_csv")?)
    } else {
        None
    };

    let declared_params = match child_element(node, TRAINABLE_PARAM) {
        Some(n) => Some(parse_count(n)?),
        None => None,
    };

    let spec = LeafSpec {
        weight,
        bias,
        running_mean: optional_path(node, "running_mean_csv"),
        running_var: optional_path(node, "running_var_csv"),
        declared_params,
    };

    builder.push(LayerNode {
        name: name.to_string(),
        var_name,
        line,
        kind: NodeKind::Leaf(spec),
    })
}

fn location(node: Node<'_, '_>) -> Location {
    node.document().text_pos_at(node.range().start).into()
}

fn parse_error(node: Node<'_, '_>, detail: String) -> ModelError {
    ModelError::ManifestParse {
        location: location(node),
        detail,
    }
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.is_element() && n.has_tag_name(tag))
}

/// Trimmed text of a direct child element; `None` if absent or blank.
fn child_text<'a>(node: Node<'a, '_>, tag: &str) -> Option<&'a str> {
    child_element(node, tag)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Reads a boolean-as-text field (`0`/`1`, `true`/`false`).
fn required_flag(node: Node<'_, '_>, tag: &str) -> Result<bool, ModelError> {
    let field = child_element(node, tag)
        .ok_or_else(|| parse_error(node, format!("missing required field <{tag}>")))?;
    flag_value(field, tag)
}

/// Like [`required_flag`], but an absent field reads as `false`.
fn optional_flag(node: Node<'_, '_>, tag: &str) -> Result<bool, ModelError> {
    match child_element(node, tag) {
        Some(field) => flag_value(field, tag),
        None => Ok(false),
    }
}

fn flag_value(field: Node<'_, '_>, tag: &str) -> Result<bool, ModelError> {
    let text = field.text().map(str::trim).unwrap_or_default();
    match text.to_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(parse_error(field, format!("<{tag}> must be 0 or 1, found '{text}'"))),
    }
}

fn required_path(node: Node<'_, '_>, tag: &str) -> Result<PathBuf, ModelError> {
    optional_path(node, tag)
        .ok_or_else(|| parse_error(node, format!("missing tensor path <{tag}>")))
}

/// The exporter writes the literal `None` when a tensor is absent.
fn optional_path(node: Node<'_, '_>, tag: &str) -> Option<PathBuf> {
    child_text(node, tag)
        .filter(|t| *t != "None")
        .map(PathBuf::from)
}

fn parse_count(node: Node<'_, '_>) -> Result<usize, ModelError> {
    let text = node.text().map(str::trim).unwrap_or_default();
    text.parse::<usize>().map_err(|_| {
        let tag = node.tag_name().name();
        parse_error(node, format!("<{tag}> must be a non-negative integer, found '{text}'"))
    })
}
