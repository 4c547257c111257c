//! Lectern CLI - build, serve and package reveal.js slide decks.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "lectern")]
#[command(about = "Build, serve and package reveal.js slide decks")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to lectern.toml config file
    #[arg(short, long, default_value = "lectern.toml", global = true)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Compile stylesheets and scripts
    Default,

    /// Script bundling placeholder (does nothing)
    Js,

    /// Compile theme stylesheets
    CssThemes,

    /// Compile, prefix and minify the core stylesheet
    CssCore,

    /// Compile all stylesheets
    Css,

    /// Convert the source document to HTML
    Prebuild,

    /// Convert the document, then compile assets
    Build,

    /// Compile assets and zip the bundle
    Package,

    /// Check bundled scripts and dependencies against known advisories
    Audit {
        /// Fail when anything vulnerable is found
        #[arg(long)]
        strict: bool,
    },

    /// Serve the deck with live reload, rebuilding on change
    Serve {
        /// Port to listen on (falls back to the next free port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory to serve; repeat for several, first match wins
        #[arg(short = 'r', long = "root")]
        roots: Vec<PathBuf>,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,

        /// Do not inject the live reload client
        #[arg(long)]
        no_livereload: bool,
    },

    /// Run any task by name
    Run {
        /// Task name, see `lectern tasks`
        task: String,
    },

    /// List available tasks
    Tasks,

    /// Scaffold a new deck in the config file's directory
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },
}

impl Commands {
    /// Task run by the commands that map directly onto one.
    fn task_name(&self) -> Option<&str> {
        match self {
            Self::Default => Some("default"),
            Self::Js => Some("js"),
            Self::CssThemes => Some("css-themes"),
            Self::CssCore => Some("css-core"),
            Self::Css => Some("css"),
            Self::Prebuild => Some("prebuild"),
            Self::Build => Some("build"),
            Self::Package => Some("package"),
            Self::Run { task } => Some(task),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(&cli.config, yes)?;
        }
        Commands::Tasks => {
            commands::tasks::run();
        }
        Commands::Audit { strict } => {
            let mut config = commands::run::load_config(&cli.config)?;
            config.audit.strict |= strict;
            commands::run::run(config, "audit").await?;
        }
        Commands::Serve {
            port,
            roots,
            no_open,
            no_livereload,
        } => {
            let config = commands::run::load_config(&cli.config)?;
            let options = commands::serve::ServeOptions {
                port,
                roots,
                open: !no_open,
                livereload: !no_livereload,
            };
            commands::serve::run(config, options).await?;
        }
        command => {
            if let Some(task) = command.task_name() {
                let config = commands::run::load_config(&cli.config)?;
                commands::run::run(config, task).await?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("lectern").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn task_commands_map_to_tasks() {
        assert_eq!(parse(&["css-themes"]).command.task_name(), Some("css-themes"));
        assert_eq!(parse(&["default"]).command.task_name(), Some("default"));
        assert_eq!(parse(&["run", "package"]).command.task_name(), Some("package"));
        assert_eq!(parse(&["tasks"]).command.task_name(), None);
    }

    #[test]
    fn parses_serve_options() {
        let cli = parse(&[
            "-c",
            "talk/lectern.toml",
            "serve",
            "-p",
            "9000",
            "-r",
            ".",
            "-r",
            "assets",
            "--no-open",
        ]);

        assert_eq!(cli.config, PathBuf::from("talk/lectern.toml"));
        assert_eq!(
            cli.command,
            Commands::Serve {
                port: Some(9000),
                roots: vec![PathBuf::from("."), PathBuf::from("assets")],
                no_open: true,
                no_livereload: false,
            }
        );
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = parse(&["audit", "--strict", "-v"]);

        assert!(cli.verbose);
        assert_eq!(cli.command, Commands::Audit { strict: true });
    }
}
