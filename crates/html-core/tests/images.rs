use manos_html_core::{
    Editor, EditorConfig, EditorError, ImageAlign, NodeId, Point, ResizeHandle, Selection,
};

fn editor(html: &str) -> Editor {
    let mut editor = Editor::new(EditorConfig {
        initial_html: html.to_string(),
        ..EditorConfig::default()
    });
    editor.focus();
    editor
}

fn image(editor: &Editor, index: usize) -> NodeId {
    editor.dom().elements_by_tag("img")[index]
}

fn attr(editor: &Editor, image: NodeId, name: &str) -> Option<String> {
    editor
        .dom()
        .element(image)
        .and_then(|el| el.attr(name))
        .map(str::to_string)
}

#[test]
fn deleting_the_selected_image_removes_only_that_image() {
    let mut editor = editor("<p>a<img src=\"1.png\">b<img src=\"2.png\"></p>");
    assert_eq!(editor.images().widgets().len(), 2);
    let first = image(&editor, 0);
    assert!(editor.click_image(first));
    assert_eq!(editor.images().selected(), Some(first));

    assert!(editor.delete_selected_image().unwrap());
    assert_eq!(editor.html(), "<p>ab<img src=\"2.png\"></p>");
    assert_eq!(editor.images().selected(), None);
    assert_eq!(editor.images().widgets().len(), 1);
    assert!(!editor.delete_selected_image().unwrap());

    editor.undo().unwrap();
    assert_eq!(editor.dom().elements_by_tag("img").len(), 2);
    assert_eq!(editor.images().widgets().len(), 2);
}

#[test]
fn text_selection_clears_the_image_selection() {
    let mut editor = editor("<p>a<img src=\"1.png\"></p>");
    let img = image(&editor, 0);
    editor.click_image(img);
    let text = editor.dom().first_text(editor.dom().root()).unwrap();
    editor.select(Selection::collapsed(Point::new(text, 1)));
    assert_eq!(editor.images().selected(), None);
}

#[test]
fn edit_form_applies_settings_in_one_step() {
    let mut editor = editor("<p><img src=\"1.png\" alt=\"old\" style=\"width: 40px;\"></p>");
    let img = image(&editor, 0);
    let form = editor.double_click_image(img).unwrap();
    assert_eq!(form.settings.alt, "old");
    assert_eq!(form.settings.width, Some(40));

    let form = editor.image_form_mut().unwrap();
    form.settings.width = Some(100);
    form.settings.alt = "chart".into();
    form.settings.align = ImageAlign::Right;
    form.settings.border = 1;
    editor.submit_image_form().unwrap();

    assert_eq!(attr(&editor, img, "width").as_deref(), Some("100"));
    assert_eq!(attr(&editor, img, "alt").as_deref(), Some("chart"));
    assert_eq!(
        attr(&editor, img, "style").as_deref(),
        Some("float: right; border: 1px solid #000000;")
    );
    assert!(editor.images().form().is_none());

    editor.undo().unwrap();
    assert_eq!(attr(&editor, img, "alt").as_deref(), Some("old"));
    assert!(matches!(editor.submit_image_form(), Err(EditorError::InvalidInput(_))));
}

#[test]
fn submitting_an_untouched_form_keeps_relative_sizes() {
    let mut editor = editor("<p><img src=\"1.png\" width=\"50%\" style=\"height: auto;\"></p>");
    let img = image(&editor, 0);
    editor.double_click_image(img).unwrap();
    editor.submit_image_form().unwrap();

    assert_eq!(attr(&editor, img, "width").as_deref(), Some("50%"));
    assert_eq!(attr(&editor, img, "style").as_deref(), Some("height: auto;"));
}

#[test]
fn switching_to_source_ends_a_resize() {
    let mut editor = editor("<p><img src=\"1.png\" width=\"100\" height=\"100\"></p>");
    let img = image(&editor, 0);
    assert!(editor
        .begin_image_resize(img, ResizeHandle::SouthEast, (0.0, 0.0), (100.0, 100.0))
        .unwrap());
    editor.toggle_html_mode().unwrap();

    assert_eq!(editor.drag_image_resize((50.0, 50.0), false), None);
    assert!(!editor.end_image_resize());
    editor.toggle_html_mode().unwrap();
    let img = image(&editor, 0);
    assert_eq!(attr(&editor, img, "width").as_deref(), Some("100"));
    assert_eq!(editor.drag_image_resize((50.0, 50.0), false), None);
    assert!(!editor.can_undo());
}

#[test]
fn a_drag_cut_short_by_source_mode_is_still_undoable() {
    let mut editor = editor("<p><img src=\"1.png\" width=\"100\" height=\"100\"></p>");
    let img = image(&editor, 0);
    editor
        .begin_image_resize(img, ResizeHandle::SouthEast, (0.0, 0.0), (100.0, 100.0))
        .unwrap();
    assert_eq!(editor.drag_image_resize((20.0, 0.0), false), Some((120, 100)));
    editor.toggle_html_mode().unwrap();
    editor.toggle_html_mode().unwrap();

    assert_eq!(attr(&editor, image(&editor, 0), "width").as_deref(), Some("120"));
    editor.undo().unwrap();
    assert_eq!(attr(&editor, image(&editor, 0), "width").as_deref(), Some("100"));
}

#[test]
fn resize_drag_is_one_undo_step() {
    let mut editor = editor("<p><img src=\"1.png\"></p>");
    let img = image(&editor, 0);
    assert!(editor
        .begin_image_resize(img, ResizeHandle::SouthEast, (0.0, 0.0), (200.0, 100.0))
        .unwrap());
    assert_eq!(editor.drag_image_resize((20.0, 0.0), false), Some((220, 100)));
    assert_eq!(editor.drag_image_resize((50.0, 0.0), false), Some((250, 100)));
    assert!(editor.end_image_resize());

    assert_eq!(attr(&editor, img, "width").as_deref(), Some("250"));
    assert_eq!(attr(&editor, img, "height").as_deref(), Some("100"));
    editor.undo().unwrap();
    assert_eq!(editor.html(), "<p><img src=\"1.png\"></p>");
    assert!(!editor.can_undo());
}

#[test]
fn resize_without_movement_records_nothing() {
    let mut editor = editor("<p><img src=\"1.png\" width=\"10\" height=\"10\"></p>");
    let img = image(&editor, 0);
    editor
        .begin_image_resize(img, ResizeHandle::NorthEast, (5.0, 5.0), (10.0, 10.0))
        .unwrap();
    assert!(editor.end_image_resize());
    assert!(!editor.can_undo());
    assert!(!editor.end_image_resize());
}

#[test]
fn resize_needs_an_active_editor() {
    let mut editor = editor("<p><img src=\"1.png\"></p>");
    let img = image(&editor, 0);
    editor.blur();
    assert_eq!(
        editor.begin_image_resize(img, ResizeHandle::SouthEast, (0.0, 0.0), (10.0, 10.0)),
        Err(EditorError::Inactive)
    );
}

#[test]
fn hover_shows_size_and_alt() {
    let mut editor = editor("<p><img src=\"1.png\" alt=\"cat\" width=\"64\"></p>");
    let img = image(&editor, 0);
    editor.hover_image(img, (12.0, 30.0), (64.0, 48.0));
    let tooltip = editor.image_tooltip().unwrap();
    assert_eq!(tooltip.text, "64 × 48 · cat");
    assert_eq!((tooltip.x, tooltip.y), (12.0, 30.0));

    editor.hover_image_end();
    assert!(editor.image_tooltip().is_none());
}

#[test]
fn widget_state_never_reaches_serialized_html() {
    let mut editor = editor("<p><img src=\"1.png\"></p>");
    let img = image(&editor, 0);
    editor.click_image(img);
    editor.hover_image(img, (0.0, 0.0), (10.0, 10.0));
    editor.double_click_image(img);
    assert_eq!(editor.html(), "<p><img src=\"1.png\"></p>");
}

#[test]
fn removing_images_by_other_means_drops_their_widgets() {
    let mut editor = editor("<p><img src=\"1.png\"></p>");
    let img = image(&editor, 0);
    editor.click_image(img);
    editor.set_html("<p>text</p>");
    assert!(editor.images().widgets().is_empty());
    assert_eq!(editor.images().selected(), None);
    assert!(!editor.click_image(img));
}
