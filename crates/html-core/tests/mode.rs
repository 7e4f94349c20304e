use std::cell::RefCell;
use std::rc::Rc;

use manos_html_core::{Editor, EditorConfig, EditorError, EditorEvent, Mode};

fn editor(html: &str) -> Editor {
    let mut editor = Editor::new(EditorConfig {
        initial_html: html.to_string(),
        ..EditorConfig::default()
    });
    editor.focus();
    editor
}

#[test]
fn untouched_round_trip_keeps_document_and_history() {
    let source = "<h1>T</h1><p>a <b>b</b></p><ul><li>x</li></ul>";
    let mut editor = editor(source);
    let text = editor.plain_text();

    assert_eq!(editor.toggle_html_mode().unwrap(), None);
    assert_eq!(editor.mode(), Mode::Source);
    let buffer = editor.source_text().unwrap();
    assert!(buffer.contains("<h1>T</h1>"));
    assert!(buffer.contains("\n  <li>x</li>"));

    let report = editor.toggle_html_mode().unwrap().unwrap();
    assert!(!report.changed);
    assert_eq!(editor.mode(), Mode::Visual);
    assert_eq!(editor.html(), source);
    assert_eq!(editor.plain_text(), text);
    assert!(!editor.can_undo());
    assert_eq!(editor.source_text(), None);
}

#[test]
fn edited_source_is_normalized_and_undoable() {
    let mut editor = editor("<p>old</p>");
    editor.toggle_html_mode().unwrap();
    assert!(editor.set_source_text("<p>new<p>second"));

    let report = editor.toggle_html_mode().unwrap().unwrap();
    assert!(report.changed);
    assert!(report.similarity < 1.0);
    assert_eq!(editor.html(), "<p>new</p><p>second</p>");
    assert!(editor.can_undo());

    editor.undo().unwrap();
    assert_eq!(editor.html(), "<p>old</p>");
}

#[test]
fn source_mode_blocks_visual_operations() {
    let mut editor = editor("<p>abc</p>");
    editor.toggle_html_mode().unwrap();
    assert_eq!(
        editor.exec_command("insertText", Some("x")),
        Err(EditorError::SourceMode("insertText".into()))
    );
    assert_eq!(
        editor.insert_link("https://example.com", "", false),
        Err(EditorError::SourceMode("insertHTML".into()))
    );
    assert!(!editor.show_placeholder());

    editor.toggle_html_mode().unwrap();
    assert!(!editor.set_source_text("ignored"));
    editor.exec_command("insertText", Some("x")).unwrap();
    assert_eq!(editor.html(), "<p>abcx</p>");
}

#[test]
fn replacing_content_in_source_mode_refreshes_the_buffer() {
    let mut editor = editor("<p>a</p>");
    editor.toggle_html_mode().unwrap();
    editor.set_html("<p>b</p>");
    assert_eq!(editor.source_text(), Some("<p>b</p>"));
    editor.toggle_html_mode().unwrap();
    assert_eq!(editor.html(), "<p>b</p>");
}

#[test]
fn mode_changes_are_announced() {
    let mut editor = editor("<p>a</p>");
    let modes = Rc::new(RefCell::new(Vec::new()));
    let sink = modes.clone();
    editor.subscribe(move |event| {
        if let EditorEvent::ModeChanged(mode) = event {
            sink.borrow_mut().push(*mode);
        }
    });
    editor.toggle_html_mode().unwrap();
    editor.toggle_html_mode().unwrap();
    assert_eq!(*modes.borrow(), vec![Mode::Source, Mode::Visual]);
}
