use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use manos_html_core::{Editor, EditorConfig, EditorEvent};
use tracing_subscriber::EnvFilter;

mod demo;

fn load_config(path: &Path) -> Result<EditorConfig> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    EditorConfig::from_json_str(&source)
        .with_context(|| format!("invalid config in {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => load_config(&path)?,
        None => demo::config(),
    };

    let mut editor = Editor::new(config);
    editor.subscribe(|event| match event {
        EditorEvent::Changed { words, chars, .. } => {
            tracing::debug!(words, chars, "content changed");
        }
        EditorEvent::ModeChanged(mode) => tracing::info!(?mode, "mode changed"),
        EditorEvent::UploadStateChanged(state) => tracing::info!(?state, "upload state"),
        EditorEvent::FocusChanged(_) | EditorEvent::ToolbarChanged(_) => {}
    });

    demo::run(&mut editor)?;

    editor.toggle_html_mode()?;
    if let Some(source) = editor.source_text() {
        println!("{source}");
    }
    if let Some(report) = editor.toggle_html_mode()? {
        tracing::info!(changed = report.changed, "source round trip");
    }

    println!("{}", serde_json::to_string_pretty(editor.toolbar_state())?);
    println!("{}", editor.plain_text());
    Ok(())
}
