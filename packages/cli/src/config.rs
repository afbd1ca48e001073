use anyhow::{Context, Result};
use scribe_reconciler::RendererConfig;
use std::path::Path;

/// Config from `--config`, else `scribe.config.json` in `cwd`, else defaults
pub fn load(cwd: &Path, explicit: Option<&Path>) -> Result<RendererConfig> {
    match explicit {
        Some(path) => RendererConfig::load(cwd.join(path))
            .with_context(|| format!("Loading {}", path.display())),
        None => RendererConfig::load_or_default(cwd).context("Loading scribe.config.json"),
    }
}
