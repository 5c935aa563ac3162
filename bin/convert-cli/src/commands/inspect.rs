// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `param-convert inspect` command: display a manifest's layer tree.
//!
//! Parses the manifest without loading any tensor and prints the tree, the
//! leaves with their tensor references, and the counts the converter will
//! check.

use super::truncate;
use converter::ConversionConfig;
use std::path::PathBuf;

pub fn execute(config: &ConversionConfig, manifest: PathBuf) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            param-convert · Manifest Inspector       ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let tree = model_ir::ManifestParser::parse(&manifest).map_err(|e| {
        anyhow::anyhow!("failed to parse manifest '{}': {e}", manifest.display())
    })?;

    // ── Summary ────────────────────────────────────────────────
    println!("  Model: {}", tree.model);
    println!("  Declared parameters: {}", tree.trainable_param_count);
    println!("  Leaves: {}", tree.leaf_count());
    println!("  Containers: {}", tree.container_count());
    println!("  Depth: {}", tree.max_depth());
    println!(
        "  Normalization layers: {}",
        tree.count_leaves_named(&config.normalization_types),
    );
    println!();

    // ── Tree ───────────────────────────────────────────────────
    for line in tree.to_string().lines() {
        println!("  {line}");
    }
    println!();

    // ── Per-Leaf Detail ────────────────────────────────────────
    println!(
        "  {:<5} {:<30} {:<36} {:>8}",
        "Line", "Layer", "Weight", "Declared",
    );
    println!("  {}", "-".repeat(82));
    let mut declared_sum = 0;
    for (_, node, spec) in tree.leaves().filter(|(_, _, s)| s.has_trainable()) {
        let weight = spec
            .weight
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".into());
        let declared = spec
            .declared_params
            .map(|n| n.to_string())
            .unwrap_or_else(|| "?".into());
        declared_sum += spec.declared_params.unwrap_or(0);
        println!(
            "  {:<5} {:<30} {:<36} {:>8}",
            node.line,
            truncate(&node.label(), 30),
            truncate(&weight, 36),
            declared,
        );
    }
    println!();

    if declared_sum > 0 && declared_sum != tree.trainable_param_count {
        println!(
            "  Warning: per-leaf counts sum to {declared_sum}, root declares {}",
            tree.trainable_param_count,
        );
        println!();
    }
    Ok(())
}
