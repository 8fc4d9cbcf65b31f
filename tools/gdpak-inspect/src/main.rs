// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! gdpak-inspect - Dump the tables of a package file
//!
//! Prints the header, the dependency list and the internal and external
//! object tables without instantiating any object.

use anyhow::Context;
use clap::Parser;
use colored::*;
use gdpak::package::{inspect, PackageStore, PackageSummary};
use gdpak::FileStore;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Dump the tables of a package file
#[derive(Parser, Debug)]
#[command(name = "gdpak-inspect")]
#[command(version)]
#[command(about = "Dump the header, dependencies and object tables of a package file")]
struct Args {
    /// Package file to read
    file: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Check that every dependency has a file next to this one
    #[arg(long)]
    check_deps: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", value_parser = clap::value_parser!(tracing::Level))]
    log_level: tracing::Level,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_target(false)
        .init();

    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("cannot read {}", args.file.display()))?;
    debug!("read {} bytes from {}", bytes.len(), args.file.display());

    let summary =
        inspect(&bytes).with_context(|| format!("{} is not a valid package", args.file.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_pretty(&summary);
    }

    if args.check_deps {
        let missing = missing_dependencies(&args.file, &summary);
        if !missing.is_empty() {
            anyhow::bail!("missing dependencies: {}", missing.join(", "));
        }
    }
    Ok(())
}

/// Dependencies with no package file in the same directory.
fn missing_dependencies(file: &Path, summary: &PackageSummary) -> Vec<String> {
    let root = file.parent().unwrap_or_else(|| Path::new("."));
    let extension = file
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    let config = gdpak::Config::builder()
        .root_dir(root)
        .extension(extension)
        .build();
    let store = FileStore::from_config(&config);

    summary
        .dependencies
        .iter()
        .filter(|name| {
            let found = store.exists(name);
            debug!("dependency {} -> {} ({})", name, store.locate(name), found);
            !found
        })
        .cloned()
        .collect()
}

fn print_pretty(summary: &PackageSummary) {
    let header = &summary.header;
    println!(
        "{} {} (format v{}, tag {:#010x})",
        "Package".green().bold(),
        header.name.bold(),
        header.version,
        header.tag
    );
    println!(
        "    payload: {} bytes at offset {}",
        summary.payload_size, summary.payload_offset
    );

    println!();
    println!("{} ({})", "Dependencies".cyan().bold(), summary.dependencies.len());
    for dependency in &summary.dependencies {
        println!("    {}", dependency);
    }

    println!();
    println!("{} ({})", "Internal objects".cyan().bold(), summary.internal.len());
    for (row, entry) in summary.internal.iter().enumerate() {
        println!(
            "  {:>4}  {:<24} {:<16} parent={} {}",
            row + 1,
            entry.object_name,
            entry.class_name.yellow(),
            entry.parent_name,
            format!("[{} bytes]", entry.byte_size).dimmed()
        );
    }

    println!();
    println!("{} ({})", "External objects".cyan().bold(), summary.external.len());
    for (row, entry) in summary.external.iter().enumerate() {
        println!(
            "  {:>4}  {:<24} from {}",
            -(row as i64 + 1),
            entry.object_name,
            entry.package_name.yellow()
        );
    }
}
