//! Development server command.

use std::path::PathBuf;

use anyhow::Result;
use lectern_tasks::ProjectConfig;

/// Command-line overrides for the `[server]` section.
pub struct ServeOptions {
    pub port: Option<u16>,
    pub roots: Vec<PathBuf>,
    pub open: bool,
    pub livereload: bool,
}

/// Run the dev server.
pub async fn run(mut config: ProjectConfig, options: ServeOptions) -> Result<()> {
    if let Some(port) = options.port {
        config.server.port = port;
    }
    if !options.roots.is_empty() {
        config.server.roots = options.roots;
    }
    config.server.open &= options.open;
    config.server.livereload &= options.livereload;

    let page = config.root.join(&config.document.output);
    if !page.exists() {
        tracing::warn!(
            "{} not found. Run 'lectern build' first.",
            page.display()
        );
    }

    super::run::run(config, "serve").await
}
