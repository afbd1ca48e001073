pub mod init;
pub mod render;
pub mod runs;

pub use init::{init, InitArgs};
pub use render::{render, RenderArgs};
pub use runs::{runs, RunsArgs};

use anyhow::{Context, Result};
use colored::Colorize;
use scribe_dom::MutationStats;
use scribe_reconciler::{RenderReport, Severity};
use scribe_vdom::VNode;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Read one frame. `null` clears the container.
pub fn read_frame(path: &Path) -> Result<Option<VNode>> {
    let source =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    serde_json::from_str(&source).with_context(|| format!("Parsing {}", path.display()))
}

/// Expand directories into their `*.json` files, sorted by name
pub fn collect_frames(cwd: &Path, inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut frames = Vec::new();

    for input in inputs {
        let path = cwd.join(input);
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(&path)
                .max_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("json"))
                .map(|e| e.path().to_path_buf())
                .collect();
            if found.is_empty() {
                anyhow::bail!("No .json frames in {}", path.display());
            }
            frames.append(&mut found);
        } else if path.is_file() {
            frames.push(path);
        } else {
            anyhow::bail!("Frame not found: {}", input.display());
        }
    }

    Ok(frames)
}

pub fn format_stats(stats: &MutationStats) -> String {
    if stats.is_empty() {
        return "no mutations".dimmed().to_string();
    }
    format!(
        "+{} ~{} -{}  text {}  attrs {}  style {}  listeners {}",
        stats.inserted,
        stats.moved,
        stats.removed,
        stats.text_writes,
        stats.attribute_writes,
        stats.style_writes,
        stats.listener_writes
    )
}

/// Print the diagnostics of a pass and its followups
pub fn print_diagnostics(report: &RenderReport) {
    for error in &report.errors {
        match error.severity() {
            Severity::Error => println!("    {} {}: {} ({})", "✗".red(), error.kind, error, error.context),
            Severity::Warning => println!("    {} {}: {} ({})", "⚠".yellow(), error.kind, error, error.context),
        }
    }
    for followup in &report.followups {
        println!(
            "    {} followup pass {}: {}",
            "↻".cyan(),
            followup.pass,
            format_stats(&followup.stats)
        );
        print_diagnostics(followup);
    }
}
