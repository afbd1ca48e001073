use super::read_frame;
use crate::config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use scribe_dom::{query_selector, LiveDom};
use scribe_reconciler::{binary_search_run, Renderer};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct RunsArgs {
    /// Frame to render
    pub frame: PathBuf,

    /// Container to index (defaults to the first rendered element)
    #[arg(short, long)]
    pub selector: Option<String>,

    /// Resolve a logical offset to a text node position
    #[arg(short, long)]
    pub offset: Option<usize>,

    /// Config file (defaults to scribe.config.json in the working directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn runs(args: RunsArgs, cwd: &Path) -> Result<()> {
    let config = config::load(cwd, args.config.as_deref())?;
    let frame = read_frame(&cwd.join(&args.frame))?;

    let mut dom = LiveDom::new();
    let mut renderer = Renderer::new(config);
    renderer.update(&mut dom, frame.as_ref());

    let body = dom.body();
    let container = match &args.selector {
        Some(selector) => query_selector(&dom, body, selector)?
            .with_context(|| format!("Nothing matches {selector}"))?,
        None => dom
            .children(body)
            .first()
            .copied()
            .context("Frame rendered nothing")?,
    };

    let index = renderer.text_runs(&dom, container);

    println!(
        "{} {} run(s), {} character(s)",
        "📏".bright_blue(),
        index.runs.len(),
        index.total
    );
    for (i, run) in index.runs.iter().enumerate() {
        let text = dom.text(run.node).unwrap_or_default();
        println!(
            "  {:>3}  {:>5}..{:<5} {:?}",
            i,
            run.start,
            run.end,
            text
        );
    }

    if let Some(offset) = args.offset {
        match (binary_search_run(&index.runs, offset), index.locate(offset)) {
            (Some(run), Some((node, local))) => {
                let text = dom.text(node).unwrap_or_default();
                println!();
                println!(
                    "  {} offset {} hits run {} at {} in {:?}",
                    "→".cyan(),
                    offset,
                    run,
                    local,
                    text
                );
            }
            (None, Some((node, local))) => {
                // One past the last character
                let text = dom.text(node).unwrap_or_default();
                println!();
                println!("  {} offset {} is the end, {} in {:?}", "→".cyan(), offset, local, text);
            }
            (_, None) => anyhow::bail!("Offset {} is past the end ({})", offset, index.total),
        }
    }

    Ok(())
}
