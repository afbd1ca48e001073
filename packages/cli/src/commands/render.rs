use super::{collect_frames, format_stats, print_diagnostics, read_frame};
use crate::config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use scribe_dom::{inner_html, HtmlOptions, LiveDom, MutationStats};
use scribe_reconciler::{RenderOptions, Renderer};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Frame files, or directories of `*.json` frames
    #[arg(required = true)]
    pub frames: Vec<PathBuf>,

    /// Indent the final HTML
    #[arg(long)]
    pub pretty: bool,

    /// Print the pass reports as JSON instead of a summary
    #[arg(long)]
    pub json: bool,

    /// Leave unmatched live nodes in place
    #[arg(long)]
    pub suppress_detach: bool,

    /// Config file (defaults to scribe.config.json in the working directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn render(args: RenderArgs, cwd: &Path) -> Result<()> {
    let config = config::load(cwd, args.config.as_deref())?;
    let frames = collect_frames(cwd, &args.frames)?;
    let options = RenderOptions {
        suppress_detach: args.suppress_detach,
        ..Default::default()
    };

    let mut dom = LiveDom::new();
    let mut renderer = Renderer::new(config);
    let mut reports = Vec::with_capacity(frames.len());

    if !args.json {
        println!("{}", "🖋  Rendering frames...".bright_blue().bold());
        println!();
    }

    for path in &frames {
        let frame = read_frame(path)?;
        debug!(frame = %path.display(), clear = frame.is_none(), "Applying frame");
        let report = renderer.update_with(&mut dom, frame.as_ref(), &options);

        if !args.json {
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            let mark = if report.has_errors() { "✗".red() } else { "✓".green() };
            println!(
                "  {} {} {}",
                mark,
                name.bright_white(),
                format_stats(&report.stats)
            );
            print_diagnostics(&report);
        }
        reports.push(report);
    }

    let failed = reports.iter().filter(|r| r.has_errors()).count();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        let html_options = if args.pretty {
            HtmlOptions::pretty()
        } else {
            HtmlOptions::default()
        };
        let mut total = MutationStats::default();
        for report in &reports {
            total.merge(&report.total_stats());
        }

        println!();
        println!("{}", inner_html(&dom, dom.body(), &html_options));
        println!();
        println!(
            "{} {} pass(es), {}",
            "✅".green(),
            renderer.passes(),
            format_stats(&total)
        );
    }

    if failed > 0 {
        anyhow::bail!("{} frame(s) hit live-tree errors", failed);
    }

    Ok(())
}
