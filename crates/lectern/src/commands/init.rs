//! Scaffold a new deck project.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Files written by `init`, relative to the project directory.
const SCAFFOLD: &[(&str, &str)] = &[
    ("slides.md", DEFAULT_SLIDES),
    ("css/reveal.scss", DEFAULT_CORE),
    ("css/theme/template/_settings.scss", DEFAULT_SETTINGS),
    ("css/theme/source/black.scss", DEFAULT_THEME),
];

/// Run the init command.
pub fn run(config_path: &Path, yes: bool) -> Result<()> {
    let root = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    tracing::info!("Initializing lectern deck in {}...", root.display());

    if config_path.exists() && !yes {
        tracing::warn!(
            "{} already exists. Use --yes to overwrite.",
            config_path.display()
        );
        return Ok(());
    }

    fs::create_dir_all(root)
        .with_context(|| format!("Failed to create {}", root.display()))?;
    fs::write(config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    tracing::info!("Created {}", config_path.display());

    for (relative, content) in SCAFFOLD {
        let path = root.join(relative);
        if path.exists() && !yes {
            tracing::info!("Keeping existing {}", relative);
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", relative))?;
        tracing::info!("Created {}", relative);
    }

    fs::create_dir_all(root.join("images")).context("Failed to create images directory")?;

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'lectern build' and then 'lectern serve' to present.");

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Lectern configuration. Every key is optional.

[document]
source = "slides.md"
output = "index.html"
# backend = "revealjs"
# safe_mode = "safe"

[document.attributes]
revealjs_theme = "black"
revealjs_slidenumber = true

[styles]
core = "css/reveal.scss"
themes = ["css/theme/source/*.scss"]
load_paths = ["css/theme/template"]
prefix_targets = ["defaults"]
compatibility = "ie 9"

[server]
port = 8000
roots = ["."]

[package]
output = "presentation.zip"

[audit]
strict = false
"#;

const DEFAULT_SLIDES: &str = r#"---
title: My Talk
subtitle: Built with lectern
author: Your Name
---

## Hello

Welcome to {doctitle}, presented by {author}.

Write slides in Markdown. Each `##` heading starts a new slide.

### Going deeper

`###` headings stack vertically under the slide before them.

::: notes
Speaker notes stay out of the slide and show up in the speaker view.
:::

## Code {.center}

```rust
fn main() {
    println!("Hello, world!");
}
```

## Thanks

Questions?
"#;

const DEFAULT_CORE: &str = r#"// Core presentation layout.

$slide-padding: 0.5em;

.reveal {
  position: relative;
  width: 100%;
  height: 100%;
  overflow: hidden;
  touch-action: pinch-zoom;

  .slides {
    position: absolute;
    inset: 0;
    margin: auto;
    pointer-events: none;
    user-select: none;

    section {
      padding: $slide-padding;
      box-sizing: border-box;
      pointer-events: auto;
    }
  }

  .controls {
    display: none;
    position: absolute;
    bottom: 12px;
    right: 12px;
  }
}
"#;

const DEFAULT_SETTINGS: &str = r#"// Theme settings shared by every theme.

$background-color: #191919 !default;
$main-color: #fff !default;
$heading-color: #fff !default;
$link-color: #42affa !default;
$main-font: "Source Sans Pro", Helvetica, sans-serif !default;
$main-font-size: 42px !default;
"#;

const DEFAULT_THEME: &str = r#"// Black theme.

@import "settings";

.reveal-viewport {
  background: $background-color;
}

.reveal {
  font-family: $main-font;
  font-size: $main-font-size;
  color: $main-color;

  h1, h2, h3 {
    color: $heading-color;
  }

  a {
    color: $link-color;
  }
}
"#;
