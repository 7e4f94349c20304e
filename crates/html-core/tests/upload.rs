use std::cell::RefCell;
use std::rc::Rc;

use manos_html_core::{
    Editor, EditorConfig, EditorError, EditorEvent, ImageFile, ImageSource, ToolbarButton,
    UPLOAD_ID_ATTR, UPLOAD_STATE_ATTR, UploadError, UploadState, UploadTicket,
};

fn editor() -> Editor {
    let mut editor = Editor::new(EditorConfig {
        initial_html: "<p>x</p>".into(),
        ..EditorConfig::default()
    });
    editor.focus();
    editor
}

fn photo() -> ImageFile {
    ImageFile::new("photo.png", "image/png", vec![1, 2, 3])
}

fn placeholder_attr(editor: &Editor, name: &str) -> Option<String> {
    let img = editor.dom().elements_by_tag("img")[0];
    editor.dom().element(img)?.attr(name).map(str::to_string)
}

#[test]
fn file_insert_shows_a_local_preview() {
    let mut editor = editor();
    let ticket = editor.insert_image(ImageSource::File(photo())).unwrap().unwrap();

    assert_eq!(editor.upload_state(), &UploadState::Pending { ticket: ticket.0 });
    assert_eq!(placeholder_attr(&editor, "src").as_deref(), Some("data:image/png;base64,AQID"));
    assert_eq!(placeholder_attr(&editor, "alt").as_deref(), Some("photo.png"));
    assert_eq!(placeholder_attr(&editor, UPLOAD_STATE_ATTR).as_deref(), Some("pending"));
    assert!(editor.toolbar_state().uploading);
    assert!(!editor.toolbar_state().is_enabled(ToolbarButton::Image));
}

#[test]
fn second_upload_is_rejected_while_one_is_pending() {
    let mut editor = editor();
    editor.begin_image_upload(&photo()).unwrap();
    let html = editor.html();

    assert_eq!(
        editor.insert_image(ImageSource::File(photo())),
        Err(EditorError::UploadInFlight)
    );
    assert_eq!(editor.html(), html);
    assert_eq!(editor.dom().elements_by_tag("img").len(), 1);
}

#[test]
fn success_swaps_in_the_final_url() {
    let mut editor = editor();
    let ticket = editor.begin_image_upload(&photo()).unwrap();
    editor
        .complete_image_upload(ticket, Ok("https://cdn.example.com/photo.png".into()))
        .unwrap();

    assert_eq!(
        editor.html(),
        "<p>x<img src=\"https://cdn.example.com/photo.png\" alt=\"photo.png\"></p>"
    );
    assert_eq!(
        editor.upload_state(),
        &UploadState::Succeeded {
            url: "https://cdn.example.com/photo.png".into()
        }
    );
    assert!(editor.toolbar_state().is_enabled(ToolbarButton::Image));
    assert!(editor.begin_image_upload(&photo()).is_ok());
}

#[test]
fn failure_keeps_the_preview_and_frees_the_slot() {
    let mut editor = editor();
    let ticket = editor.begin_image_upload(&photo()).unwrap();
    editor
        .complete_image_upload(ticket, Err(UploadError::Rejected("too large".into())))
        .unwrap();

    assert_eq!(placeholder_attr(&editor, UPLOAD_STATE_ATTR).as_deref(), Some("error"));
    assert!(placeholder_attr(&editor, "src").unwrap().starts_with("data:image/png"));
    assert!(matches!(
        editor.upload_state(),
        UploadState::Failed { message } if message.contains("too large")
    ));
    assert!(!editor.upload_state().is_pending());
}

#[test]
fn blank_url_counts_as_failure() {
    let mut editor = editor();
    let ticket = editor.begin_image_upload(&photo()).unwrap();
    editor.complete_image_upload(ticket, Ok("  ".into())).unwrap();
    assert!(matches!(editor.upload_state(), UploadState::Failed { .. }));
}

#[test]
fn stale_tickets_are_rejected() {
    let mut editor = editor();
    let ticket = editor.begin_image_upload(&photo()).unwrap();
    let stale = UploadTicket(ticket.0 + 7);
    assert_eq!(
        editor.complete_image_upload(stale, Ok("https://x/y.png".into())),
        Err(EditorError::UnknownUpload(stale.0))
    );
    assert!(editor.upload_state().is_pending());
}

#[test]
fn completion_during_source_mode_waits_for_visual_mode() {
    let mut editor = editor();
    let ticket = editor.begin_image_upload(&photo()).unwrap();
    editor.toggle_html_mode().unwrap();
    assert!(editor.source_text().unwrap().contains(UPLOAD_ID_ATTR));

    editor
        .complete_image_upload(ticket, Ok("https://cdn.example.com/p.png".into()))
        .unwrap();
    assert!(editor.upload_state().is_pending());
    assert!(editor.source_text().unwrap().contains("data:image/png"));

    editor.toggle_html_mode().unwrap();
    assert_eq!(placeholder_attr(&editor, "src").as_deref(), Some("https://cdn.example.com/p.png"));
    assert_eq!(placeholder_attr(&editor, UPLOAD_ID_ATTR), None);
    assert!(matches!(editor.upload_state(), UploadState::Succeeded { .. }));
}

#[test]
fn undo_after_completion_never_restores_the_preview() {
    let mut editor = editor();
    let ticket = editor.begin_image_upload(&photo()).unwrap();
    editor.exec_command("selectAll", None).unwrap();
    editor.exec_command("bold", None).unwrap();
    editor
        .complete_image_upload(ticket, Ok("https://cdn.example.com/x.png".into()))
        .unwrap();

    editor.undo().unwrap();
    assert_eq!(placeholder_attr(&editor, "src").as_deref(), Some("https://cdn.example.com/x.png"));
    assert_eq!(placeholder_attr(&editor, UPLOAD_ID_ATTR), None);
    assert_eq!(placeholder_attr(&editor, UPLOAD_STATE_ATTR), None);
    assert!(!editor.html().contains("data:"));

    editor.redo().unwrap();
    assert!(editor.html().contains("<b>"));
    assert_eq!(placeholder_attr(&editor, "src").as_deref(), Some("https://cdn.example.com/x.png"));
}

#[test]
fn undo_after_a_failed_upload_keeps_the_error_marker() {
    let mut editor = editor();
    let ticket = editor.begin_image_upload(&photo()).unwrap();
    editor.exec_command("selectAll", None).unwrap();
    editor.exec_command("italic", None).unwrap();
    editor
        .complete_image_upload(ticket, Err(UploadError::Rejected("offline".into())))
        .unwrap();

    editor.undo().unwrap();
    assert_eq!(placeholder_attr(&editor, UPLOAD_STATE_ATTR).as_deref(), Some("error"));
}

#[test]
fn upload_progress_is_announced() {
    let mut editor = editor();
    let states = Rc::new(RefCell::new(Vec::new()));
    let sink = states.clone();
    editor.subscribe(move |event| {
        if let EditorEvent::UploadStateChanged(state) = event {
            sink.borrow_mut().push(state.clone());
        }
    });
    let ticket = editor.begin_image_upload(&photo()).unwrap();
    editor.complete_image_upload(ticket, Ok("https://x/p.png".into())).unwrap();
    assert_eq!(
        *states.borrow(),
        vec![
            UploadState::Pending { ticket: ticket.0 },
            UploadState::Succeeded {
                url: "https://x/p.png".into()
            }
        ]
    );
}

#[test]
fn results_after_unmount_are_ignored() {
    let mut editor = editor();
    let ticket = editor.begin_image_upload(&photo()).unwrap();
    let html = editor.html();
    editor.unmount();
    assert_eq!(
        editor.complete_image_upload(ticket, Ok("https://x/p.png".into())),
        Err(EditorError::Unmounted)
    );
    assert_eq!(editor.html(), html);
}
