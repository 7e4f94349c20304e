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
fn paragraphs_toggle_into_a_list_and_back() {
    let mut editor = editor("<p>a</p><p>b</p><p>c</p>");
    let a = text(&editor, "a");
    let b = text(&editor, "b");
    editor.select(Selection::new(Point::new(a, 0), Point::new(b, 1)));

    editor.exec_command("insertUnorderedList", None).unwrap();
    assert_eq!(editor.html(), "<ul><li>a</li><li>b</li></ul><p>c</p>");
    assert!(editor.query_command_state("insertUnorderedList"));
    assert!(!editor.query_command_state("insertOrderedList"));

    editor.exec_command("insertUnorderedList", None).unwrap();
    assert_eq!(editor.html(), "<p>a</p><p>b</p><p>c</p>");
}

#[test]
fn other_list_command_switches_kind() {
    let mut editor = editor("<ul><li>one</li><li>two</li></ul>");
    let one = text(&editor, "one");
    editor.select(Selection::collapsed(Point::new(one, 1)));

    editor.exec_command("insertOrderedList", None).unwrap();
    assert_eq!(editor.html(), "<ol><li>one</li><li>two</li></ol>");
    assert!(editor.query_command_state("insertOrderedList"));
}

#[test]
fn unlisting_a_middle_item_splits_the_list() {
    let mut editor = editor("<ol><li>a</li><li>b</li><li>c</li></ol>");
    let b = text(&editor, "b");
    editor.select(Selection::collapsed(Point::new(b, 0)));

    editor.exec_command("insertOrderedList", None).unwrap();
    assert_eq!(editor.html(), "<ol><li>a</li></ol><p>b</p><ol><li>c</li></ol>");
}

#[test]
fn headings_are_wrapped_as_items() {
    let mut editor = editor("<h3>title</h3>");
    let title = text(&editor, "title");
    editor.select(Selection::collapsed(Point::new(title, 0)));

    editor.exec_command("insertUnorderedList", None).unwrap();
    assert_eq!(editor.html(), "<ul><li><h3>title</h3></li></ul>");
}

#[test]
fn new_item_joins_previous_list() {
    let mut editor = editor("<ul><li>a</li></ul><p>b</p>");
    let b = text(&editor, "b");
    editor.select(Selection::collapsed(Point::new(b, 1)));

    editor.exec_command("insertUnorderedList", None).unwrap();
    assert_eq!(editor.html(), "<ul><li>a</li><li>b</li></ul>");
}
