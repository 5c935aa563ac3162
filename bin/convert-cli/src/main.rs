// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # param-convert
//!
//! Command-line interface for converting exported layer trees into runtime
//! models.
//!
//! ## Usage
//! ```bash
//! # Convert one variant
//! param-convert convert --arch vgg11_bn --manifest ./vgg11_bn.xml --output ./vgg11_bn.json
//!
//! # Convert every variant listed in a config file
//! param-convert --config ./convert.toml batch
//!
//! # Inspect a manifest
//! param-convert inspect --manifest ./vgg11_bn.xml
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "param-convert",
    about = "Flattens exported model parameters into runtime models",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a single model variant.
    Convert {
        /// Architecture identifier (e.g., "vgg11_bn").
        #[arg(short, long)]
        arch: String,

        /// Path to the exported XML manifest.
        #[arg(short, long)]
        manifest: std::path::PathBuf,

        /// Where to write the converted model.
        #[arg(short, long)]
        output: std::path::PathBuf,

        /// Storage-order convention: transposed, as-stored.
        #[arg(short, long)]
        layout: Option<String>,

        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
    },

    /// Convert every variant listed in the configuration file.
    Batch {
        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
    },

    /// Inspect a manifest: print the layer tree and parameter counts.
    Inspect {
        /// Path to the exported XML manifest.
        #[arg(short, long)]
        manifest: std::path::PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Convert {
            arch,
            manifest,
            output,
            layout,
            pretty,
        } => commands::convert::execute(config, arch, manifest, output, layout, pretty),
        Commands::Batch { pretty } => commands::batch::execute(config, cli.config, pretty),
        Commands::Inspect { manifest } => commands::inspect::execute(&config, manifest),
    }
}
