// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The live layer graph: the target framework's view of a converted model.
//!
//! A [`LiveGraph`] owns the flat parameter vector and a tree of
//! [`LiveLayer`]s. Plain leaves and normalization leaves reference their
//! trainable tensors by span; normalization leaves additionally hold the
//! running statistics assigned after construction. The layer set is closed,
//! so every traversal is an exhaustive `match`.

use crate::spans::TensorSpan;
use crate::ConvertError;
use model_ir::TensorRole;
use tensor_core::{Matrix, Shape};

/// A leaf without running statistics.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlainLayer {
    pub name: String,
    pub params: Vec<TensorSpan>,
}

/// A leaf that carries running mean and variance.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NormalizationLayer {
    pub name: String,
    pub params: Vec<TensorSpan>,
    pub running_mean: Option<Matrix>,
    pub running_var: Option<Matrix>,
}

impl NormalizationLayer {
    pub fn new(name: impl Into<String>, params: Vec<TensorSpan>) -> Self {
        Self {
            name: name.into(),
            params,
            running_mean: None,
            running_var: None,
        }
    }

    pub fn has_stats(&self) -> bool {
        self.running_mean.is_some() && self.running_var.is_some()
    }
}

/// A layer whose state lives entirely in its children.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ContainerLayer {
    pub name: String,
    pub layers: Vec<LiveLayer>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LiveLayer {
    PlainLeaf(PlainLayer),
    NormalizationLeaf(NormalizationLayer),
    Container(ContainerLayer),
}

impl LiveLayer {
    pub fn name(&self) -> &str {
        match self {
            Self::PlainLeaf(l) => &l.name,
            Self::NormalizationLeaf(l) => &l.name,
            Self::Container(c) => &c.name,
        }
    }

    /// Trainable spans of this layer (empty for containers).
    pub fn params(&self) -> &[TensorSpan] {
        match self {
            Self::PlainLeaf(l) => &l.params,
            Self::NormalizationLeaf(l) => &l.params,
            Self::Container(_) => &[],
        }
    }
}

/// A constructed model bound to its parameter vector.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LiveGraph {
    /// Architecture identifier the graph was built for.
    pub architecture: String,
    parameters: Vec<f64>,
    /// Top-level layers in order.
    pub layers: Vec<LiveLayer>,
}

impl LiveGraph {
    pub fn new(
        architecture: impl Into<String>,
        parameters: Vec<f64>,
        layers: Vec<LiveLayer>,
    ) -> Self {
        Self {
            architecture: architecture.into(),
            parameters,
            layers,
        }
    }

    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    pub fn num_parameters(&self) -> usize {
        self.parameters.len()
    }

    /// Every layer in pre-order, containers included.
    pub fn walk(&self) -> Vec<&LiveLayer> {
        fn visit<'a>(layers: &'a [LiveLayer], out: &mut Vec<&'a LiveLayer>) {
            for layer in layers {
                out.push(layer);
                if let LiveLayer::Container(c) = layer {
                    visit(&c.layers, out);
                }
            }
        }
        let mut out = Vec::new();
        visit(&self.layers, &mut out);
        out
    }

    /// Normalization layers in pre-order.
    pub fn normalization_layers(&self) -> Vec<&NormalizationLayer> {
        self.walk()
            .into_iter()
            .filter_map(|l| match l {
                LiveLayer::NormalizationLeaf(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    /// Checks that every span lies in the parameter vector and that every
    /// normalization layer holds statistics consistent with its parameters.
    pub fn validate(&self) -> Result<(), ConvertError> {
        let len = self.parameters.len();
        for layer in self.walk() {
            for span in layer.params() {
                if span.end() > len {
                    return Err(ConvertError::ShapeCheck {
                        layer: layer.name().to_string(),
                        detail: format!(
                            "{} span [{}, {}) exceeds {len} parameters",
                            span.role,
                            span.offset,
                            span.end()
                        ),
                    });
                }
            }
            if let LiveLayer::NormalizationLeaf(n) = layer {
                check_normalization(n)?;
            }
        }
        Ok(())
    }

    /// Returns a one-line summary.
    pub fn summary(&self) -> String {
        let all = self.walk();
        let containers = all
            .iter()
            .filter(|l| matches!(l, LiveLayer::Container(_)))
            .count();
        format!(
            "Graph '{}': {} layers ({} containers, {} normalization), {} parameters",
            self.architecture,
            all.len(),
            containers,
            self.normalization_layers().len(),
            self.parameters.len(),
        )
    }
}

fn check_normalization(layer: &NormalizationLayer) -> Result<(), ConvertError> {
    let fail = |detail: String| ConvertError::ShapeCheck {
        layer: layer.name.clone(),
        detail,
    };
    let (mean, var) = match (&layer.running_mean, &layer.running_var) {
        (Some(m), Some(v)) => (m, v),
        _ => return Err(fail("running statistics were never assigned".into())),
    };
    for (what, stat) in [("mean", mean), ("var", var)] {
        let shape = Shape::of(stat);
        if !shape.is_vector() {
            return Err(fail(format!("running {what} must be a vector, found {shape}")));
        }
    }
    if mean.len() != var.len() {
        return Err(fail(format!(
            "running mean has {} elements but running var has {}",
            mean.len(),
            var.len()
        )));
    }
    if let Some(weight) = layer.params.iter().find(|s| s.role == TensorRole::Weight) {
        if weight.len != mean.len() {
            return Err(fail(format!(
                "{} running-stat elements for {} channels",
                mean.len(),
                weight.len
            )));
        }
    }
    Ok(())
}
