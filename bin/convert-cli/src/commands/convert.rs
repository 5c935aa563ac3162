// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `param-convert convert` command: convert a single model variant.
//!
//! Walks the full type-state pipeline:
//! ```text
//! Conversion<Idle> → parse → flatten → build → distribute → check → persist
//! ```

use converter::{Conversion, ConversionConfig, JsonSink, MirrorGraphBuilder, VariantConfig};
use std::path::PathBuf;
use tensor_core::TensorLayout;

pub fn execute(
    mut config: ConversionConfig,
    arch: String,
    manifest: PathBuf,
    output: PathBuf,
    layout: Option<String>,
    pretty: bool,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            param-convert · Converter                ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // ── Configuration ──────────────────────────────────────────
    if let Some(name) = layout {
        config.layout = TensorLayout::from_str_loose(&name)
            .ok_or_else(|| anyhow::anyhow!("unknown layout '{name}' (transposed, as-stored)"))?;
    }

    println!("  Config:");
    println!("   Architecture: {arch}");
    println!("   Manifest:     {}", manifest.display());
    println!("   Output:       {}", output.display());
    println!("   Layout:       {}", config.layout);
    println!("   Norm types:   {}", config.normalization_types.join(", "));
    println!();

    let builder = MirrorGraphBuilder::new(config.normalization_types.clone());
    let sink = if pretty { JsonSink::pretty() } else { JsonSink::new() };
    let variant = VariantConfig::new(arch, manifest, output);

    // ── Type-State Pipeline ────────────────────────────────────
    println!("  [1/5] Parsing manifest...");
    let parsed = Conversion::new(config, variant).parse()?;
    println!("        {}", parsed.tree().summary());

    println!("  [2/5] Flattening parameters...");
    let flattened = parsed.flatten()?;
    println!(
        "        {} parameters, {} running-stats pairs",
        flattened.buffer().len(),
        flattened.stats().len(),
    );

    println!("  [3/5] Building graph...");
    let built = flattened.build(&builder)?;
    println!("        {}", built.graph().summary());

    println!("  [4/5] Distributing running statistics...");
    let distributed = built.distribute()?.check()?;

    println!("  [5/5] Writing model...");
    let report = distributed.persist(&sink)?;
    println!();

    // ── Report ─────────────────────────────────────────────────
    println!("  {}", report.summary());
    println!();
    Ok(())
}
