// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Conversion configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! normalization_types = ["BatchNorm2d"]
//! layout = "transposed"
//! check_shapes = true
//!
//! [[variants]]
//! architecture = "vgg11"
//! manifest = "./vgg11.xml"
//! output = "./vgg11.json"
//!
//! [[variants]]
//! architecture = "vgg11_bn"
//! manifest = "./vgg11_bn.xml"
//! output = "./vgg11_bn.json"
//! ```

use crate::ConvertError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tensor_core::{CsvTensorLoader, TensorLayout};

/// One model variant to convert.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VariantConfig {
    /// Architecture identifier (e.g., `"squeezenet1_0"`).
    pub architecture: String,
    /// Path to the exported XML manifest.
    pub manifest: PathBuf,
    /// Where the finished model is written.
    pub output: PathBuf,
}

impl VariantConfig {
    pub fn new(
        architecture: impl Into<String>,
        manifest: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            architecture: architecture.into(),
            manifest: manifest.into(),
            output: output.into(),
        }
    }
}

/// Configuration shared by every variant of a conversion run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ConversionConfig {
    /// Layer identifiers treated as normalization layers (running stats).
    #[serde(default = "default_normalization_types")]
    pub normalization_types: Vec<String>,
    /// Export → target storage-order convention.
    #[serde(default)]
    pub layout: TensorLayout,
    /// Base directory for relative tensor paths. Defaults to the directory
    /// of each manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tensor_root: Option<PathBuf>,
    /// Whether to run the shape check on the constructed graph.
    #[serde(default = "default_true")]
    pub check_shapes: bool,
    /// Variants to convert, in order.
    #[serde(default)]
    pub variants: Vec<VariantConfig>,
}

fn default_normalization_types() -> Vec<String> {
    vec!["BatchNorm2d".to_string()]
}

fn default_true() -> bool {
    true
}

impl ConversionConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConvertError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConvertError::ConfigError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConvertError> {
        toml::from_str(toml_str)
            .map_err(|e| ConvertError::ConfigError(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, ConvertError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConvertError::ConfigError(format!("TOML serialise error: {e}")))
    }

    /// Checks the configuration for values that would make every run fail.
    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.normalization_types.iter().any(|t| t.trim().is_empty()) {
            return Err(ConvertError::ConfigError(
                "normalization_types contains an empty name".into(),
            ));
        }

        let mut outputs = HashSet::new();
        for variant in &self.variants {
            if variant.architecture.trim().is_empty() {
                return Err(ConvertError::ConfigError(format!(
                    "variant for '{}' has an empty architecture",
                    variant.manifest.display()
                )));
            }
            if !outputs.insert(&variant.output) {
                return Err(ConvertError::ConfigError(format!(
                    "output '{}' is used by more than one variant",
                    variant.output.display()
                )));
            }
        }
        Ok(())
    }

    /// Returns `true` if `name` identifies a normalization layer.
    pub fn is_normalization(&self, name: &str) -> bool {
        self.normalization_types.iter().any(|t| t == name)
    }

    /// Creates the tensor loader for a manifest.
    pub fn tensor_loader_for(&self, manifest: &Path) -> CsvTensorLoader {
        match (&self.tensor_root, manifest.parent()) {
            (Some(root), _) => CsvTensorLoader::with_root(root.clone()),
            (None, Some(dir)) if !dir.as_os_str().is_empty() => CsvTensorLoader::with_root(dir),
            _ => CsvTensorLoader::new(),
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            normalization_types: default_normalization_types(),
            layout: TensorLayout::default(),
            tensor_root: None,
            check_shapes: true,
            variants: Vec::new(),
        }
    }
}
