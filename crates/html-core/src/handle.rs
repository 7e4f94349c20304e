use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use futures_util::FutureExt as _;
use futures_util::future::LocalBoxFuture;

use crate::editor::Editor;
use crate::error::EditorError;
use crate::upload::{ImageFile, ImageUploader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Applied,
    /// The editor was mid-mutation; the command runs once it finishes.
    Deferred,
}

#[derive(Debug, Clone)]
struct DeferredCommand {
    name: String,
    value: Option<String>,
}

type DeferredQueue = RefCell<VecDeque<DeferredCommand>>;

/// Shared single-threaded entry point to an [`Editor`]. Clones are cheap
/// and may be captured by event listeners; a command issued from inside
/// another command's mutation is queued rather than interleaved.
#[derive(Clone)]
pub struct EditorHandle {
    editor: Rc<RefCell<Editor>>,
    deferred: Rc<DeferredQueue>,
}

#[derive(Clone)]
pub struct WeakEditorHandle {
    editor: Weak<RefCell<Editor>>,
    deferred: Weak<DeferredQueue>,
}

impl WeakEditorHandle {
    pub fn upgrade(&self) -> Option<EditorHandle> {
        Some(EditorHandle {
            editor: self.editor.upgrade()?,
            deferred: self.deferred.upgrade()?,
        })
    }
}

impl EditorHandle {
    pub fn new(editor: Editor) -> Self {
        Self {
            editor: Rc::new(RefCell::new(editor)),
            deferred: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    pub fn downgrade(&self) -> WeakEditorHandle {
        WeakEditorHandle {
            editor: Rc::downgrade(&self.editor),
            deferred: Rc::downgrade(&self.deferred),
        }
    }

    pub fn exec_command(&self, name: &str, value: Option<&str>) -> Result<Dispatch, EditorError> {
        let Ok(mut editor) = self.editor.try_borrow_mut() else {
            tracing::debug!(command = name, "editor busy; command deferred");
            self.deferred.borrow_mut().push_back(DeferredCommand {
                name: name.to_string(),
                value: value.map(str::to_string),
            });
            return Ok(Dispatch::Deferred);
        };
        let result = editor.exec_command(name, value);
        drop(editor);
        self.drain();
        result.map(|()| Dispatch::Applied)
    }

    /// Commands still waiting for the editor to become free.
    pub fn deferred_len(&self) -> usize {
        self.deferred.borrow().len()
    }

    fn drain(&self) {
        loop {
            let next = self.deferred.borrow_mut().pop_front();
            let Some(command) = next else {
                break;
            };
            let Ok(mut editor) = self.editor.try_borrow_mut() else {
                self.deferred.borrow_mut().push_front(command);
                break;
            };
            tracing::trace!(command = %command.name, "running deferred command");
            if let Err(err) = editor.exec_command(&command.name, command.value.as_deref()) {
                tracing::warn!(command = %command.name, error = %err, "deferred command failed");
            }
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&Editor) -> R) -> Result<R, EditorError> {
        let editor = self.editor.try_borrow().map_err(|_| EditorError::Busy)?;
        Ok(f(&editor))
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Editor) -> R) -> Result<R, EditorError> {
        let mut editor = self.editor.try_borrow_mut().map_err(|_| EditorError::Busy)?;
        let out = f(&mut editor);
        drop(editor);
        self.drain();
        Ok(out)
    }

    /// Inserts the local preview now and returns a future that finishes the
    /// upload. The future holds only a weak reference, so a dropped or
    /// unmounted editor is never touched once the upload resolves.
    pub fn insert_image(
        &self,
        file: ImageFile,
        uploader: &dyn ImageUploader,
    ) -> Result<LocalBoxFuture<'static, Result<(), EditorError>>, EditorError> {
        let ticket = self.with_mut(|editor| editor.begin_image_upload(&file))??;
        let upload = uploader.upload(file);
        let weak = self.downgrade();
        Ok(async move {
            let result = upload.await;
            let Some(handle) = weak.upgrade() else {
                tracing::debug!(ticket = ticket.0, "editor dropped before upload finished");
                return Err(EditorError::Unmounted);
            };
            handle.with_mut(|editor| editor.complete_image_upload(ticket, result))?
        }
        .boxed_local())
    }

    pub fn unmount(&self) -> Result<(), EditorError> {
        self.deferred.borrow_mut().clear();
        self.with_mut(Editor::unmount)
    }
}
