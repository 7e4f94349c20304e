use std::collections::HashMap;

use manos_html_core::{
    Editor, EditorConfig, GlobalListener, LayoutProbe, MenuKind, MenuOffset, MenuPosition,
    PermissionLevel, Rect, UiElementId, Viewport,
};

#[derive(Default)]
struct Page {
    rects: HashMap<UiElementId, Rect>,
    viewport: Viewport,
}

impl LayoutProbe for Page {
    fn rect_of(&self, element: &UiElementId) -> Option<Rect> {
        self.rects.get(element).copied()
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }
}

fn page() -> Page {
    let mut page = Page::default();
    page.rects.insert("btn-color".into(), Rect::new(100.0, 10.0, 24.0, 24.0));
    page.rects.insert("btn-table".into(), Rect::new(140.0, 10.0, 24.0, 24.0));
    page.rects.insert("btn-template".into(), Rect::new(180.0, 10.0, 24.0, 24.0));
    page
}

fn editor() -> Editor {
    let mut editor = Editor::new(EditorConfig {
        initial_html: "<p>text</p>".into(),
        permission: PermissionLevel::Elevated,
        menu_offset: MenuOffset { x: 2.0, y: 6.0 },
        ..EditorConfig::default()
    });
    editor.focus();
    editor
}

#[test]
fn menu_opens_under_its_anchor_and_follows_scroll() {
    let mut page = page();
    let mut editor = editor();
    assert!(editor.open_menu(MenuKind::ColorPicker, "btn-color".into(), &page));
    let state = editor.menu_state().unwrap();
    assert_eq!(state.kind, MenuKind::ColorPicker);
    assert_eq!(state.position, MenuPosition { top: 40.0, left: 102.0 });

    page.viewport.scroll_y = 50.0;
    page.viewport.scroll_x = 5.0;
    editor.on_scroll(&page);
    assert_eq!(
        editor.menu_state().unwrap().position,
        MenuPosition { top: 90.0, left: 107.0 }
    );
}

#[test]
fn only_one_menu_is_open_at_a_time() {
    let page = page();
    let mut editor = editor();
    editor.open_menu(MenuKind::ColorPicker, "btn-color".into(), &page);
    editor.open_menu(MenuKind::Table, "btn-table".into(), &page);
    assert_eq!(editor.menu_state().unwrap().kind, MenuKind::Table);

    assert!(!editor.toggle_menu(MenuKind::Table, "btn-table".into(), &page));
    assert!(editor.menu_state().is_none());
    assert!(editor.toggle_menu(MenuKind::Template, "btn-template".into(), &page));
}

#[test]
fn subscriptions_exist_only_while_open() {
    let page = page();
    let mut editor = editor();
    assert!(editor.subscriptions().is_empty());

    editor.open_menu(MenuKind::Table, "btn-table".into(), &page);
    let listeners: Vec<GlobalListener> = editor
        .subscriptions()
        .into_iter()
        .map(|sub| sub.listener)
        .collect();
    assert_eq!(
        listeners,
        vec![
            GlobalListener::Scroll,
            GlobalListener::Resize,
            GlobalListener::PointerDown,
            GlobalListener::KeyDown
        ]
    );

    assert!(editor.on_key_down("Escape"));
    assert!(editor.subscriptions().is_empty());
}

#[test]
fn outside_press_dismisses_but_menu_body_does_not() {
    let page = page();
    let mut editor = editor();
    editor.open_menu(MenuKind::Table, "btn-table".into(), &page);
    editor.register_menu_element("table-picker".into());

    assert!(!editor.on_pointer_down(Some(&"table-picker".into()), false));
    assert!(!editor.on_pointer_down(Some(&"btn-table".into()), false));
    assert!(!editor.on_pointer_down(Some(&"swatch-3".into()), true));
    assert!(editor.menu_state().is_some());

    assert!(editor.on_pointer_down(Some(&"editor-body".into()), false));
    assert!(editor.menu_state().is_none());
}

#[test]
fn anchor_that_vanishes_closes_the_menu() {
    let mut page = page();
    let mut editor = editor();
    editor.open_menu(MenuKind::Template, "btn-template".into(), &page);
    page.rects.remove(&UiElementId::new("btn-template"));
    editor.on_resize(&page);
    assert!(editor.menu_state().is_none());

    assert!(!editor.open_menu(MenuKind::Template, "btn-template".into(), &page));
}

#[test]
fn inserting_a_table_closes_the_picker() {
    let page = page();
    let mut editor = editor();
    editor.open_menu(MenuKind::Table, "btn-table".into(), &page);
    editor.insert_table(2, 2).unwrap();
    assert!(editor.menu_state().is_none());
}

#[test]
fn source_mode_and_unmount_close_menus() {
    let page = page();
    let mut editor = editor();
    editor.open_menu(MenuKind::ColorPicker, "btn-color".into(), &page);
    editor.toggle_html_mode().unwrap();
    assert!(editor.menu_state().is_none());
    assert!(!editor.open_menu(MenuKind::ColorPicker, "btn-color".into(), &page));

    editor.toggle_html_mode().unwrap();
    editor.open_menu(MenuKind::ColorPicker, "btn-color".into(), &page);
    editor.unmount();
    assert!(editor.subscriptions().is_empty());
    assert!(editor.menu_state().is_none());
}
