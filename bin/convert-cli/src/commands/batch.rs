// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `param-convert batch` command: convert every configured variant in order.

use super::truncate;
use converter::{ConversionConfig, JsonSink, MirrorGraphBuilder};
use std::path::PathBuf;

pub fn execute(
    config: ConversionConfig,
    config_path: Option<PathBuf>,
    pretty: bool,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            param-convert · Batch Converter          ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let config_path =
        config_path.ok_or_else(|| anyhow::anyhow!("batch needs a configuration file (--config)"))?;
    if config.variants.is_empty() {
        anyhow::bail!("'{}' lists no [[variants]]", config_path.display());
    }

    println!("  Config: {}", config_path.display());
    println!("  Variants: {}", config.variants.len());
    println!("  Layout: {}", config.layout);
    println!();

    let builder = MirrorGraphBuilder::new(config.normalization_types.clone());
    let sink = if pretty { JsonSink::pretty() } else { JsonSink::new() };
    let reports = converter::convert_all(&config, &builder, &sink)?;

    // ── Results Table ──────────────────────────────────────────
    println!(
        "  {:<24} {:>12} {:>8} {:>6} {:>10} {:>10}",
        "Architecture", "Params", "Leaves", "Norm", "Time", "Output",
    );
    println!("  {}", "-".repeat(76));
    for r in &reports {
        println!(
            "  {:<24} {:>12} {:>8} {:>6} {:>8.1}ms {:>7.1} KB",
            truncate(&r.architecture, 24),
            r.trainable_params,
            r.leaves,
            r.normalization_layers,
            r.total_duration().as_secs_f64() * 1000.0,
            r.output_bytes as f64 / 1024.0,
        );
    }
    println!();

    let total: usize = reports.iter().map(|r| r.trainable_params).sum();
    println!("  {} variants converted, {total} parameters in total", reports.len());
    println!();
    Ok(())
}
