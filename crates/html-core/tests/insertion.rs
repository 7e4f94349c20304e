use std::collections::BTreeMap;

use manos_html_core::{
    Editor, EditorConfig, EditorError, ImageSource, NodeId, Point, Selection, VideoEmbed,
    VideoEmbedResolver, VideoProvider,
};

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
fn table_has_the_requested_grid() {
    let mut editor = editor("<p>before</p>");
    editor.insert_table(3, 3).unwrap();

    let dom = editor.dom();
    let rows = dom.elements_by_tag("tr");
    assert_eq!(dom.elements_by_tag("table").len(), 1);
    assert_eq!(rows.len(), 3);
    for row in rows {
        assert_eq!(dom.children(row).len(), 3);
        assert!(dom.children(row).iter().all(|&cell| dom.element(cell).unwrap().tag == "td"));
    }
    assert!(editor.html().starts_with("<p>before</p><table"));
    assert!(editor.can_undo());
}

#[test]
fn table_size_is_bounded() {
    let mut editor = editor("<p>x</p>");
    assert!(matches!(editor.insert_table(0, 3), Err(EditorError::InvalidInput(_))));
    assert!(matches!(editor.insert_table(3, 21), Err(EditorError::InvalidInput(_))));
    assert_eq!(editor.html(), "<p>x</p>");
}

#[test]
fn link_text_defaults_to_the_url() {
    let mut editor = editor("<p>see </p>");
    editor.insert_link("https://example.com", "", false).unwrap();
    assert_eq!(
        editor.html(),
        "<p>see <a href=\"https://example.com\">https://example.com</a></p>"
    );
    let anchor = editor.dom().elements_by_tag("a")[0];
    assert_eq!(editor.dom().element(anchor).unwrap().attr("target"), None);
}

#[test]
fn new_tab_links_open_safely() {
    let mut editor = editor("<p></p>");
    editor.insert_link("https://example.com", "Docs", true).unwrap();
    let anchor = editor.dom().elements_by_tag("a")[0];
    let el = editor.dom().element(anchor).unwrap();
    assert_eq!(el.attr("target"), Some("_blank"));
    assert_eq!(el.attr("rel"), Some("noopener noreferrer"));
    assert_eq!(editor.plain_text(), "Docs");
}

#[test]
fn link_replaces_the_selected_text() {
    let mut editor = editor("<p>click here now</p>");
    let node = text(&editor, "click here now");
    editor.select(Selection::new(Point::new(node, 6), Point::new(node, 10)));
    editor.insert_link("/help", "here", false).unwrap();
    assert_eq!(editor.html(), "<p>click <a href=\"/help\">here</a> now</p>");
}

#[test]
fn button_requires_text_and_url() {
    let mut editor = editor("<p>x</p>");
    assert!(matches!(
        editor.insert_button("https://example.com", "  ", false),
        Err(EditorError::InvalidInput(_))
    ));
    assert!(matches!(editor.insert_button("", "Go", false), Err(EditorError::InvalidInput(_))));
    assert!(!editor.can_undo());

    editor.insert_button("https://example.com", "Go", false).unwrap();
    let anchor = editor.dom().elements_by_tag("a")[0];
    assert_eq!(
        editor.dom().element(anchor).unwrap().attr("class"),
        Some("editor-button")
    );
}

#[test]
fn known_video_hosts_embed_a_player() {
    let mut editor = editor("<p>x</p>");
    editor.insert_video("https://youtu.be/dQw4w9WgXcQ").unwrap();
    let frames = editor.dom().elements_by_tag("iframe");
    assert_eq!(frames.len(), 1);
    assert_eq!(
        editor.dom().element(frames[0]).unwrap().attr("src"),
        Some("https://www.youtube.com/embed/dQw4w9WgXcQ")
    );
}

#[test]
fn unknown_video_hosts_become_links() {
    let mut editor = editor("<p>x</p>");
    editor.insert_video("https://videos.example.org/v/42").unwrap();
    assert!(editor.dom().elements_by_tag("iframe").is_empty());
    assert!(editor.html().contains("<a href=\"https://videos.example.org/v/42\">"));
}

struct InHouse;

impl VideoEmbedResolver for InHouse {
    fn resolve(&self, url: &str) -> Option<VideoEmbed> {
        let id = url.strip_prefix("media:")?;
        Some(VideoEmbed {
            provider: VideoProvider::Vimeo,
            embed_url: format!("https://media.example.com/embed/{id}"),
        })
    }
}

#[test]
fn video_resolver_is_pluggable() {
    let mut editor = Editor::new(EditorConfig {
        initial_html: "<p>x</p>".into(),
        ..EditorConfig::default()
    })
    .with_video_resolver(InHouse);
    editor.focus();
    editor.insert_video("media:7").unwrap();
    assert!(editor.html().contains("src=\"https://media.example.com/embed/7\""));
}

#[test]
fn templates_insert_by_name() {
    let mut templates = BTreeMap::new();
    templates.insert("signoff".to_string(), "<p>Regards,</p><p>Team</p>".to_string());
    let mut editor = Editor::new(EditorConfig {
        initial_html: "<p>Hi</p>".into(),
        templates,
        ..EditorConfig::default()
    });
    editor.focus();

    editor.insert_named_template("signoff").unwrap();
    assert!(editor.html().starts_with("<p>Hi</p><p>Regards,</p><p>Team</p>"));
    assert!(matches!(
        editor.insert_named_template("missing"),
        Err(EditorError::InvalidInput(_))
    ));
    assert!(matches!(editor.insert_template("  "), Err(EditorError::InvalidInput(_))));
}

#[test]
fn url_images_insert_directly() {
    let mut editor = editor("<p>x</p>");
    let ticket = editor
        .insert_image(ImageSource::Url("https://example.com/cat.png".into()))
        .unwrap();
    assert_eq!(ticket, None);
    assert_eq!(
        editor.html(),
        "<p>x<img src=\"https://example.com/cat.png\" alt=\"\"></p>"
    );
    assert_eq!(editor.images().widgets().len(), 1);
}
