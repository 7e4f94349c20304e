use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures_util::future::LocalBoxFuture;
use serde::Serialize;
use thiserror::Error;

use crate::dom::Dom;
use crate::error::EditorError;
use crate::html;

pub const UPLOAD_ID_ATTR: &str = "data-upload-id";
pub const UPLOAD_STATE_ATTR: &str = "data-upload-state";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(
        name: impl Into<String>,
        mime: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Inline preview shown until the upload resolves.
    pub fn data_url(&self) -> String {
        let mime = if self.mime.is_empty() {
            "application/octet-stream"
        } else {
            self.mime.as_str()
        };
        format!("data:{mime};base64,{}", STANDARD.encode(&self.bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Url(String),
    File(ImageFile),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct UploadTicket(pub u64);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("upload rejected: {0}")]
    Rejected(String),
    #[error("upload returned an empty url")]
    EmptyUrl,
}

/// Injected upload backend. The returned future is driven by the host's
/// event loop; nothing here blocks.
pub trait ImageUploader {
    fn upload(&self, file: ImageFile) -> LocalBoxFuture<'static, Result<String, UploadError>>;
}

impl<F> ImageUploader for F
where
    F: Fn(ImageFile) -> LocalBoxFuture<'static, Result<String, UploadError>>,
{
    fn upload(&self, file: ImageFile) -> LocalBoxFuture<'static, Result<String, UploadError>> {
        self(file)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UploadState {
    #[default]
    Idle,
    Pending { ticket: u64 },
    Succeeded { url: String },
    Failed { message: String },
}

impl UploadState {
    pub fn is_pending(&self) -> bool {
        matches!(self, UploadState::Pending { .. })
    }
}

/// Single-slot tracker for the one image upload an editor may have in
/// flight. The placeholder is found by its ticket attribute, so it survives
/// undo and content reloads as long as the markup does.
#[derive(Debug, Clone, Default)]
pub struct UploadSlot {
    next_ticket: u64,
    state: UploadState,
}

impl UploadSlot {
    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state.is_pending()
    }

    /// Claims the slot. A second claim while pending is rejected outright.
    pub fn begin(&mut self) -> Result<UploadTicket, EditorError> {
        if self.state.is_pending() {
            return Err(EditorError::UploadInFlight);
        }
        self.next_ticket += 1;
        let ticket = UploadTicket(self.next_ticket);
        self.state = UploadState::Pending { ticket: ticket.0 };
        tracing::debug!(ticket = ticket.0, "image upload started");
        Ok(ticket)
    }

    /// Releases a claim whose placeholder never made it into the document.
    pub fn abandon(&mut self, ticket: UploadTicket) {
        if self.state == (UploadState::Pending { ticket: ticket.0 }) {
            self.state = UploadState::Idle;
        }
    }

    pub fn placeholder_html(ticket: UploadTicket, file: &ImageFile) -> String {
        format!(
            "<img src=\"{}\" alt=\"{}\" {UPLOAD_ID_ATTR}=\"{}\" {UPLOAD_STATE_ATTR}=\"pending\">",
            html::escape_attr(&file.data_url()),
            html::escape_attr(&file.name),
            ticket.0,
        )
    }

    /// Settles the slot with the upload result and patches the placeholder.
    /// Success swaps in the final url; failure keeps the preview and marks
    /// it as errored.
    pub fn complete(
        &mut self,
        dom: &mut Dom,
        ticket: UploadTicket,
        result: Result<String, UploadError>,
    ) -> Result<&UploadState, EditorError> {
        if self.state != (UploadState::Pending { ticket: ticket.0 }) {
            return Err(EditorError::UnknownUpload(ticket.0));
        }
        let result = result.and_then(|url| {
            let url = url.trim().to_string();
            if url.is_empty() {
                Err(UploadError::EmptyUrl)
            } else {
                Ok(url)
            }
        });
        self.state = match result {
            Ok(url) => {
                tracing::debug!(ticket = ticket.0, "image upload succeeded");
                UploadState::Succeeded { url }
            }
            Err(err) => {
                tracing::warn!(
                    ticket = ticket.0,
                    error = %err,
                    "image upload failed; preview kept"
                );
                UploadState::Failed {
                    message: err.to_string(),
                }
            }
        };
        if !patch_placeholder(dom, ticket, &self.state) {
            tracing::debug!(ticket = ticket.0, "upload finished after its placeholder was removed");
        }
        Ok(&self.state)
    }

    pub fn reset(&mut self) {
        self.state = UploadState::Idle;
    }
}

/// Rewrites the placeholder for `ticket` to reflect a settled upload.
/// Returns whether a placeholder was found. Pending and idle states leave
/// the tree alone.
pub fn patch_placeholder(dom: &mut Dom, ticket: UploadTicket, state: &UploadState) -> bool {
    let Some(el) = dom
        .find_by_attr(UPLOAD_ID_ATTR, &ticket.0.to_string())
        .and_then(|id| dom.element_mut(id))
    else {
        return false;
    };
    match state {
        UploadState::Succeeded { url } => {
            el.set_attr("src", url.clone());
            el.remove_attr(UPLOAD_ID_ATTR);
            el.remove_attr(UPLOAD_STATE_ATTR);
        }
        UploadState::Failed { .. } => el.set_attr(UPLOAD_STATE_ATTR, "error"),
        UploadState::Idle | UploadState::Pending { .. } => {}
    }
    true
}
