use std::collections::BTreeMap;

use anyhow::{Context as _, Result};
use manos_html_core::{
    Editor, EditorConfig, ImageFile, ImageSettings, ImageAlign, NodeId, PermissionLevel, Point,
    Selection,
};

const DEMO_HTML: &str = "<h1>Release notes</h1>\
    <p>This build brings a faster parser and a new toolbar.</p>\
    <p>Images, tables and embedded videos are supported.</p>\
    <p>Send feedback to the team.</p>";

pub fn config() -> EditorConfig {
    let mut templates = BTreeMap::new();
    templates.insert(
        "signature".to_string(),
        "<p>Thanks,</p><p>The release team</p>".to_string(),
    );
    EditorConfig {
        initial_html: DEMO_HTML.to_string(),
        placeholder: "Write something…".to_string(),
        permission: PermissionLevel::Elevated,
        templates,
        ..EditorConfig::default()
    }
}

fn find_text(editor: &Editor, needle: &str) -> Result<(NodeId, usize)> {
    let dom = editor.dom();
    dom.descendants(dom.root())
        .into_iter()
        .find_map(|node| dom.text(node)?.find(needle).map(|offset| (node, offset)))
        .with_context(|| format!("no text containing {needle:?}"))
}

/// Selects the first occurrence of `needle`.
fn select_text(editor: &mut Editor, needle: &str) -> Result<()> {
    let (node, offset) = find_text(editor, needle)?;
    editor.select(Selection::new(
        Point::new(node, offset),
        Point::new(node, offset + needle.len()),
    ));
    Ok(())
}

/// Walks through a typical editing session against the loaded document.
pub fn run(editor: &mut Editor) -> Result<()> {
    editor.focus();

    if select_text(editor, "faster parser").is_ok() {
        editor.exec_command("bold", None)?;
    }
    if select_text(editor, "new toolbar").is_ok() {
        editor.exec_command("italic", None)?;
        editor.exec_command("foreColor", Some("#2563eb"))?;
    }
    if select_text(editor, "Images").is_ok() {
        editor.exec_command("insertUnorderedList", None)?;
        editor.exec_command("justifyCenter", None)?;
    }
    if select_text(editor, "feedback").is_ok() {
        editor.insert_link("https://example.com/feedback", "feedback", true)?;
    }

    editor.clear_selection();
    editor.insert_table(2, 3)?;
    editor.insert_video("https://www.youtube.com/watch?v=dQw4w9WgXcQ")?;
    if !editor.config().templates.is_empty() {
        editor.insert_named_template("signature")?;
    }

    let chart = ImageFile::new("chart.png", "image/png", [137, 80, 78, 71]);
    let ticket = editor.begin_image_upload(&chart)?;
    editor.complete_image_upload(ticket, Ok("https://cdn.example.com/chart.png".to_string()))?;
    if let Some(&image) = editor.images().widgets().last() {
        let settings = ImageSettings {
            width: Some(320),
            alt: "Build time chart".to_string(),
            align: ImageAlign::Center,
            ..ImageSettings::default()
        };
        editor.apply_image_settings(image, &settings)?;
    }

    tracing::info!(
        words = editor.word_count(),
        chars = editor.char_count(),
        undo = editor.can_undo(),
        "session finished"
    );
    Ok(())
}
