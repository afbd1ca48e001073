use anyhow::Result;
use clap::Args;
use colored::Colorize;
use scribe_reconciler::{RendererConfig, CONFIG_FILE_NAME};
use std::fs;
use std::path::Path;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Enable development-mode tree validation
    #[arg(long)]
    pub dev: bool,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = cwd.join(CONFIG_FILE_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            CONFIG_FILE_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let config = RendererConfig {
        dev_mode: args.dev,
        ..Default::default()
    };
    fs::write(&config_path, config.to_json()?)?;

    println!("  {} Created {}", "✓".green(), CONFIG_FILE_NAME);
    println!();
    println!("Next steps:");
    println!("  1. Write a frame, e.g. {}", r#"{ "tag": "p", "text": "Hello" }"#.bright_white());
    println!("  2. Run: scribe render frame.json --pretty");

    Ok(())
}
