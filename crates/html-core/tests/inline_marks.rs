use manos_html_core::{Editor, EditorConfig, NodeId, Point, Selection};

fn editor(html: &str) -> Editor {
    let mut editor = Editor::new(EditorConfig {
        initial_html: html.to_string(),
        ..EditorConfig::default()
    });
    editor.focus();
    editor
}

fn text(editor: &Editor, needle: &str) -> NodeId {
    let dom = editor.dom();
    dom.descendants(dom.root())
        .into_iter()
        .find(|&node| dom.text(node) == Some(needle))
        .expect("text node")
}

#[test]
fn toggle_bold_only_affects_selection_range() {
    let mut editor = editor("<p>abcde</p>");
    let t = text(&editor, "abcde");
    editor.select(Selection::new(Point::new(t, 1), Point::new(t, 3)));

    assert!(!editor.query_command_state("bold"));
    editor.exec_command("bold", None).unwrap();
    assert_eq!(editor.html(), "<p>a<b>bc</b>de</p>");
    assert!(editor.query_command_state("bold"));

    editor.exec_command("bold", None).unwrap();
    assert_eq!(editor.html(), "<p>abcde</p>");
    assert!(!editor.query_command_state("bold"));
}

#[test]
fn every_inline_toggle_round_trips_its_state() {
    for command in ["bold", "italic", "underline", "strikeThrough", "code"] {
        let mut editor = editor("<p>one two three</p>");
        let t = text(&editor, "one two three");
        editor.select(Selection::new(Point::new(t, 4), Point::new(t, 7)));
        let before = editor.query_command_state(command);
        editor.exec_command(command, None).unwrap();
        assert_ne!(editor.query_command_state(command), before, "{command}");
        editor.exec_command(command, None).unwrap();
        assert_eq!(editor.query_command_state(command), before, "{command}");
        assert_eq!(editor.plain_text(), "one two three");
    }
}

#[test]
fn mixed_range_turns_formatting_on_first() {
    let mut editor = editor("<p><b>ab</b>cd</p>");
    let ab = text(&editor, "ab");
    let cd = text(&editor, "cd");
    editor.select(Selection::new(Point::new(ab, 0), Point::new(cd, 2)));

    assert!(!editor.query_command_state("bold"));
    editor.exec_command("bold", None).unwrap();
    assert_eq!(editor.html(), "<p><b>abcd</b></p>");
    assert!(editor.query_command_state("bold"));
}

#[test]
fn collapsed_toggle_arms_format_for_typed_text() {
    let mut editor = editor("<p>ab</p>");
    let t = text(&editor, "ab");
    editor.select(Selection::collapsed(Point::new(t, 2)));

    editor.exec_command("bold", None).unwrap();
    assert_eq!(editor.html(), "<p>ab</p>");
    assert!(editor.query_command_state("bold"));

    editor.exec_command("insertText", Some("cd")).unwrap();
    assert_eq!(editor.html(), "<p>ab<b>cd</b></p>");
}

#[test]
fn selection_change_clears_armed_format() {
    let mut editor = editor("<p>ab</p>");
    let t = text(&editor, "ab");
    editor.select(Selection::collapsed(Point::new(t, 2)));
    editor.exec_command("italic", None).unwrap();
    assert!(editor.query_command_state("italic"));

    editor.select(Selection::collapsed(Point::new(t, 1)));
    assert!(!editor.query_command_state("italic"));
}

#[test]
fn remove_format_keeps_structure() {
    let mut editor = editor("<h2><b>big</b> <a href=\"/x\"><i>link</i></a></h2>");
    editor.exec_command("selectAll", None).unwrap();
    editor.exec_command("removeFormat", None).unwrap();
    assert_eq!(editor.html(), "<h2>big <a href=\"/x\">link</a></h2>");
}

#[test]
fn fore_color_wraps_range_in_styled_span() {
    let mut editor = editor("<p>abc</p>");
    let t = text(&editor, "abc");
    editor.select(Selection::new(Point::new(t, 0), Point::new(t, 3)));
    editor.exec_command("foreColor", Some("#FF0000")).unwrap();
    assert_eq!(editor.html(), "<p><span style=\"color: #ff0000;\">abc</span></p>");
    assert_eq!(
        editor.run_query::<Option<String>>("foreColor", None).unwrap(),
        Some("#ff0000".to_string())
    );

    assert!(editor.exec_command("foreColor", Some("url(x)")).is_err());
    assert_eq!(editor.html(), "<p><span style=\"color: #ff0000;\">abc</span></p>");
}

#[test]
fn command_names_match_case_insensitively() {
    let mut editor = editor("<p>abc</p>");
    let t = text(&editor, "abc");
    editor.select(Selection::new(Point::new(t, 0), Point::new(t, 1)));
    editor.exec_command("BOLD", None).unwrap();
    assert_eq!(editor.html(), "<p><b>a</b>bc</p>");
}
