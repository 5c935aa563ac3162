// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-variant conversion report.
//!
//! [`ConversionReport`] collects counts and per-stage timings so batch runs
//! over many variants can be compared at a glance.

use std::path::PathBuf;
use std::time::Duration;

/// Wall-clock time spent in each pipeline stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct StageDurations {
    pub parse: Duration,
    pub flatten: Duration,
    pub build: Duration,
    pub distribute: Duration,
    pub persist: Duration,
}

impl StageDurations {
    pub fn total(&self) -> Duration {
        self.parse + self.flatten + self.build + self.distribute + self.persist
    }
}

/// Outcome of converting one model variant.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConversionReport {
    pub architecture: String,
    pub manifest: PathBuf,
    pub output: PathBuf,
    /// Length of the flat parameter vector.
    pub trainable_params: usize,
    /// In-memory size of the flat parameter vector.
    pub buffer_bytes: usize,
    /// Leaves in the manifest.
    pub leaves: usize,
    /// Running-statistics pairs assigned.
    pub normalization_layers: usize,
    /// Tensor files read.
    pub tensors_loaded: usize,
    /// Bytes written by the sink.
    pub output_bytes: u64,
    pub stages: StageDurations,
}

impl ConversionReport {
    /// Creates an empty report for a variant.
    pub fn new(architecture: impl Into<String>, manifest: PathBuf, output: PathBuf) -> Self {
        Self {
            architecture: architecture.into(),
            manifest,
            output,
            trainable_params: 0,
            buffer_bytes: 0,
            leaves: 0,
            normalization_layers: 0,
            tensors_loaded: 0,
            output_bytes: 0,
            stages: StageDurations::default(),
        }
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.total()
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        let total = self.total_duration();
        let load_pct = if total.as_secs_f64() > 0.0 {
            self.stages.flatten.as_secs_f64() / total.as_secs_f64() * 100.0
        } else {
            0.0
        };
        format!(
            "Converted '{}': {} parameters ({:.1} KB) from {} leaves ({} tensors, \
             {} normalization), {:.2}ms total, {:.2}ms flatten ({:.0}%), {:.2}ms persist, \
             {:.1} KB written",
            self.architecture,
            self.trainable_params,
            self.buffer_bytes as f64 / 1024.0,
            self.leaves,
            self.tensors_loaded,
            self.normalization_layers,
            ms(total),
            ms(self.stages.flatten),
            load_pct,
            ms(self.stages.persist),
            self.output_bytes as f64 / 1024.0,
        )
    }
}
