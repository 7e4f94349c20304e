use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::command::{CommandExecutor, CommandInfo, PendingFormats, QueryError};
use crate::config::EditorConfig;
use crate::dom::{Dom, NodeId};
use crate::error::EditorError;
use crate::history::{History, Snapshot};
use crate::image::{
    self, HoverTooltip, ImageEditForm, ImageSettings, ImageWidgetController, ResizeHandle,
};
use crate::menu::{
    FloatingMenuPositioner, FloatingMenuState, LayoutProbe, MenuKind, Subscription, UiElementId,
};
use crate::mode::{Mode, ModeSynchronizer, NormalizationReport};
use crate::pipeline;
use crate::selection::{Selection, SelectionTracker};
use crate::surface::DocumentSurface;
use crate::toolbar::{self, SelectionContext, ToolbarButton, ToolbarState};
use crate::upload::{
    self, ImageFile, ImageSource, UploadError, UploadSlot, UploadState, UploadTicket,
};
use crate::video::{KnownHostsResolver, VideoEmbedResolver};

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    Changed { html: String, words: usize, chars: usize },
    ModeChanged(Mode),
    FocusChanged(bool),
    UploadStateChanged(UploadState),
    ToolbarChanged(ToolbarState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&EditorEvent)>;

/// The editing engine: one document, its selection, and every piece of UI
/// state derived from them. All mutation goes through here so history,
/// image widgets and the toolbar stay in step with the tree.
pub struct Editor {
    config: EditorConfig,
    surface: DocumentSurface,
    tracker: SelectionTracker,
    executor: CommandExecutor,
    pending: PendingFormats,
    mode: ModeSynchronizer,
    images: ImageWidgetController,
    resize_before: Option<Snapshot>,
    menus: FloatingMenuPositioner,
    upload: UploadSlot,
    deferred_upload: Option<(UploadTicket, Result<String, UploadError>)>,
    history: History,
    toolbar: ToolbarState,
    video: Box<dyn VideoEmbedResolver>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
    active: bool,
    mounted: bool,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        let config = config.with_defaults();
        let surface = DocumentSurface::from_html(&config.initial_html);
        let mut editor = Self {
            surface,
            tracker: SelectionTracker::default(),
            executor: CommandExecutor::default(),
            pending: PendingFormats::default(),
            mode: ModeSynchronizer::default(),
            images: ImageWidgetController::new(config.image_min_size),
            resize_before: None,
            menus: FloatingMenuPositioner::new(config.menu_offset),
            upload: UploadSlot::default(),
            deferred_upload: None,
            history: History::new(config.max_undo),
            toolbar: ToolbarState::default(),
            video: Box::new(KnownHostsResolver),
            listeners: Vec::new(),
            next_listener: 0,
            active: false,
            mounted: true,
            config,
        };
        editor.images.rescan(editor.surface.dom());
        editor.toolbar = editor.compute_toolbar();
        editor
    }

    pub fn with_video_resolver(mut self, resolver: impl VideoEmbedResolver + 'static) -> Self {
        self.video = Box::new(resolver);
        self
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn dom(&self) -> &Dom {
        self.surface.dom()
    }

    pub fn html(&self) -> String {
        self.surface.html()
    }

    /// Replaces the whole document. History is cleared since old snapshots
    /// describe content the host has discarded.
    pub fn set_html(&mut self, html: &str) {
        self.surface.set_html(html);
        if self.mode.mode() == Mode::Source {
            self.mode.set_source_text(self.surface.pretty_html());
        }
        self.tracker.clear();
        self.pending.clear();
        self.history.clear();
        self.after_change();
    }

    pub fn plain_text(&self) -> String {
        self.surface.plain_text()
    }

    pub fn word_count(&self) -> usize {
        self.surface.word_count()
    }

    pub fn char_count(&self) -> usize {
        self.surface.char_count()
    }

    pub fn is_empty(&self) -> bool {
        self.surface.is_empty()
    }

    /// Whether the host should render the placeholder over the surface.
    pub fn show_placeholder(&self) -> bool {
        self.mode.mode() == Mode::Visual
            && !self.config.placeholder.is_empty()
            && self.surface.is_empty()
    }

    pub fn placeholder(&self) -> &str {
        &self.config.placeholder
    }

    pub fn focus(&mut self) {
        if !self.mounted || self.active {
            return;
        }
        self.active = true;
        self.emit(EditorEvent::FocusChanged(true));
        self.refresh_toolbar();
    }

    pub fn blur(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.pending.clear();
        self.emit(EditorEvent::FocusChanged(false));
        self.refresh_toolbar();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn selection(&self) -> Option<Selection> {
        self.tracker.selection()
    }

    /// Moves the selection. Points are clamped to the tree; armed caret
    /// formats and the selected image are dropped.
    pub fn select(&mut self, selection: Selection) {
        if self.tracker.selection() != Some(selection) {
            self.pending.clear();
        }
        self.tracker.set(Some(selection));
        self.tracker.revalidate(self.surface.dom());
        self.images.clear_selection();
        self.refresh_toolbar();
    }

    pub fn clear_selection(&mut self) {
        self.tracker.clear();
        self.pending.clear();
        self.refresh_toolbar();
    }

    fn ensure_editable(&self, action: &str) -> Result<(), EditorError> {
        if !self.mounted {
            return Err(EditorError::Unmounted);
        }
        if self.mode.mode() == Mode::Source {
            return Err(EditorError::SourceMode(action.to_string()));
        }
        if !self.active {
            return Err(EditorError::Inactive);
        }
        Ok(())
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            dom: self.surface.dom().clone(),
            selection: self.tracker.selection(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.surface.dom_mut().restore_from(snapshot.dom);
        self.tracker.set(snapshot.selection);
        if snapshot.selection.is_some() {
            self.tracker.revalidate(self.surface.dom());
        }
        self.pending.clear();
    }

    /// Runs a registered command at the current selection.
    pub fn exec_command(&mut self, name: &str, value: Option<&str>) -> Result<(), EditorError> {
        if let Err(err) = self.ensure_editable(name) {
            tracing::debug!(command = name, error = %err, "command not dispatched");
            return Err(err);
        }
        if name.eq_ignore_ascii_case("undo") {
            return self.undo().map(|_| ());
        }
        if name.eq_ignore_ascii_case("redo") {
            return self.redo().map(|_| ());
        }
        if !self.executor.registry().has_command(name) {
            return Err(EditorError::UnknownCommand(name.to_string()));
        }

        let before = self.snapshot();
        tracing::debug!(command = name, value, "dispatching command");
        let outcome = self.executor.execute(
            self.surface.dom_mut(),
            &mut self.tracker,
            &mut self.pending,
            name,
            value,
        )?;
        if outcome.mutated {
            self.history.record(before);
            self.after_change();
        } else {
            self.refresh_toolbar();
        }
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> Result<bool, EditorError> {
        self.ensure_editable("undo")?;
        let current = self.snapshot();
        let Some(previous) = self.history.undo(current) else {
            return Ok(false);
        };
        self.restore(previous);
        self.after_change();
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, EditorError> {
        self.ensure_editable("redo")?;
        let current = self.snapshot();
        let Some(next) = self.history.redo(current) else {
            return Ok(false);
        };
        self.restore(next);
        self.after_change();
        Ok(true)
    }

    pub fn query_command_state(&self, name: &str) -> bool {
        self.executor
            .query_state(self.surface.dom(), self.tracker.selection(), &self.pending, name)
    }

    pub fn query_command_value(
        &self,
        name: &str,
        value: Option<&str>,
    ) -> Result<Value, EditorError> {
        Ok(self
            .executor
            .query(self.surface.dom(), self.tracker.selection(), &self.pending, name, value)?)
    }

    pub fn run_query<T>(&self, name: &str, value: Option<&str>) -> Result<T, EditorError>
    where
        T: DeserializeOwned,
    {
        let value = self.query_command_value(name, value)?;
        serde_json::from_value(value)
            .map_err(|err| QueryError::new(format!("Failed to decode query result: {err}")).into())
    }

    /// Visible commands for a command palette.
    pub fn commands(&self) -> Vec<CommandInfo> {
        self.executor.registry().command_infos()
    }

    fn insert_fragment(&mut self, fragment: &str) -> Result<(), EditorError> {
        self.exec_command("insertHTML", Some(fragment))
    }

    pub fn insert_link(&mut self, url: &str, text: &str, new_tab: bool) -> Result<(), EditorError> {
        let fragment = pipeline::link_fragment(url, text, new_tab)?;
        self.insert_fragment(&fragment)
    }

    pub fn insert_button(
        &mut self,
        url: &str,
        text: &str,
        new_tab: bool,
    ) -> Result<(), EditorError> {
        let fragment = pipeline::button_fragment(url, text, new_tab)?;
        self.insert_fragment(&fragment)
    }

    pub fn insert_table(&mut self, rows: usize, cols: usize) -> Result<(), EditorError> {
        let fragment = pipeline::table_fragment(rows, cols, self.config.max_table_size)?;
        self.insert_fragment(&fragment)?;
        self.menus.close();
        Ok(())
    }

    pub fn insert_template(&mut self, fragment: &str) -> Result<(), EditorError> {
        if fragment.trim().is_empty() {
            return Err(EditorError::InvalidInput("template is empty".into()));
        }
        self.insert_fragment(fragment)?;
        self.menus.close();
        Ok(())
    }

    /// Inserts one of the configured templates by name.
    pub fn insert_named_template(&mut self, name: &str) -> Result<(), EditorError> {
        let Some(fragment) = self.config.templates.get(name).cloned() else {
            return Err(EditorError::InvalidInput(format!("unknown template: {name}")));
        };
        self.insert_template(&fragment)
    }

    /// Embeds a player for known hosts; anything else becomes a plain link.
    pub fn insert_video(&mut self, url: &str) -> Result<(), EditorError> {
        let fragment = match self.video.resolve(url) {
            Some(embed) => {
                tracing::debug!(provider = ?embed.provider, "embedding video");
                pipeline::video_fragment(&embed)
            }
            None => {
                tracing::debug!(url, "unrecognized video host; inserting link");
                pipeline::link_fragment(url, "", false)?
            }
        };
        self.insert_fragment(&fragment)?;
        self.menus.close();
        Ok(())
    }

    /// Inserts an image. Files go through the upload slot and return the
    /// ticket to complete later.
    pub fn insert_image(
        &mut self,
        source: ImageSource,
    ) -> Result<Option<UploadTicket>, EditorError> {
        match source {
            ImageSource::Url(url) => {
                let fragment = pipeline::image_fragment(&url, "")?;
                self.insert_fragment(&fragment)?;
                Ok(None)
            }
            ImageSource::File(file) => self.begin_image_upload(&file).map(Some),
        }
    }

    /// Inserts a local preview placeholder and claims the upload slot.
    pub fn begin_image_upload(&mut self, file: &ImageFile) -> Result<UploadTicket, EditorError> {
        self.ensure_editable("insertImage")?;
        let ticket = self.upload.begin()?;
        let fragment = UploadSlot::placeholder_html(ticket, file);
        if let Err(err) = self.insert_fragment(&fragment) {
            self.upload.abandon(ticket);
            return Err(err);
        }
        self.emit(EditorEvent::UploadStateChanged(self.upload.state().clone()));
        self.refresh_toolbar();
        Ok(ticket)
    }

    /// Applies an upload result. While source mode is open the result is
    /// held and applied on the way back to visual mode.
    pub fn complete_image_upload(
        &mut self,
        ticket: UploadTicket,
        result: Result<String, UploadError>,
    ) -> Result<(), EditorError> {
        if !self.mounted {
            tracing::debug!(ticket = ticket.0, "upload finished after unmount; ignored");
            return Err(EditorError::Unmounted);
        }
        if self.upload.state() != &(UploadState::Pending { ticket: ticket.0 }) {
            return Err(EditorError::UnknownUpload(ticket.0));
        }
        if self.mode.mode() == Mode::Source {
            self.deferred_upload = Some((ticket, result));
            return Ok(());
        }
        let state = self.settle_upload(ticket, result)?;
        self.emit(EditorEvent::UploadStateChanged(state));
        self.after_change();
        Ok(())
    }

    /// Completes the slot against the live tree, then brings every history
    /// snapshot that still holds the placeholder to the same state.
    fn settle_upload(
        &mut self,
        ticket: UploadTicket,
        result: Result<String, UploadError>,
    ) -> Result<UploadState, EditorError> {
        let state = self
            .upload
            .complete(self.surface.dom_mut(), ticket, result)?
            .clone();
        self.history.for_each_snapshot_mut(|snapshot| {
            upload::patch_placeholder(&mut snapshot.dom, ticket, &state);
        });
        Ok(state)
    }

    pub fn upload_state(&self) -> &UploadState {
        self.upload.state()
    }

    pub fn mode(&self) -> Mode {
        self.mode.mode()
    }

    /// Switches between visual and source mode. Returning to visual yields
    /// the normalization report for the submitted source.
    pub fn toggle_html_mode(&mut self) -> Result<Option<NormalizationReport>, EditorError> {
        if !self.mounted {
            return Err(EditorError::Unmounted);
        }
        self.menus.close();
        let report = match self.mode.mode() {
            Mode::Visual => {
                self.images.clear_selection();
                self.images.hover_end();
                self.images.take_form();
                let before = self.resize_before.take();
                if self.images.end_resize().is_some() {
                    if let Some(before) = before {
                        if html_of(&before.dom) != self.surface.html() {
                            self.history.record(before);
                        }
                    }
                }
                self.pending.clear();
                self.mode.enter_source(&self.surface);
                None
            }
            Mode::Source => {
                let before = self.snapshot();
                let report = self.mode.enter_visual(&mut self.surface);
                if self.surface.html() != html_of(&before.dom) {
                    self.history.record(before);
                }
                self.tracker.clear();
                if let Some((ticket, result)) = self.deferred_upload.take() {
                    let state = self.settle_upload(ticket, result)?;
                    self.emit(EditorEvent::UploadStateChanged(state));
                }
                Some(report)
            }
        };
        let mode = self.mode.mode();
        tracing::debug!(?mode, "mode toggled");
        self.emit(EditorEvent::ModeChanged(mode));
        if mode == Mode::Visual {
            self.after_change();
        } else {
            self.refresh_toolbar();
        }
        Ok(report)
    }

    pub fn source_text(&self) -> Option<&str> {
        self.mode.source_text()
    }

    /// Edits the source buffer; only meaningful in source mode.
    pub fn set_source_text(&mut self, text: impl Into<String>) -> bool {
        self.mounted && self.mode.set_source_text(text)
    }

    pub fn toolbar_state(&self) -> &ToolbarState {
        &self.toolbar
    }

    fn selection_context(&self) -> SelectionContext {
        let visual = self.mode.mode() == Mode::Visual;
        let active_commands: BTreeSet<String> = if visual {
            ToolbarButton::ALL
                .into_iter()
                .filter_map(ToolbarButton::state_command)
                .filter(|command| self.query_command_state(command))
                .map(str::to_string)
                .collect()
        } else {
            BTreeSet::new()
        };
        SelectionContext {
            editor_active: self.active && self.mounted,
            in_link: visual && self.query_command_state("createLink"),
            active_commands,
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
            upload_pending: self.upload.is_pending(),
        }
    }

    fn compute_toolbar(&self) -> ToolbarState {
        toolbar::compute_state(&self.selection_context(), self.mode.mode(), self.config.permission)
    }

    /// Recomputes toolbar state wholesale; emits when it changed.
    pub fn refresh_toolbar(&mut self) {
        let state = self.compute_toolbar();
        if state != self.toolbar {
            self.toolbar = state.clone();
            self.emit(EditorEvent::ToolbarChanged(state));
        }
    }

    fn after_change(&mut self) {
        self.images.rescan(self.surface.dom());
        self.refresh_toolbar();
        let event = EditorEvent::Changed {
            html: self.surface.html(),
            words: self.surface.word_count(),
            chars: self.surface.char_count(),
        };
        self.emit(event);
    }

    pub fn images(&self) -> &ImageWidgetController {
        &self.images
    }

    pub fn click_image(&mut self, image: NodeId) -> bool {
        self.mounted && self.mode.mode() == Mode::Visual && self.images.select(image)
    }

    pub fn clear_image_selection(&mut self) {
        self.images.clear_selection();
    }

    /// Opens the edit form for an image and returns its current settings.
    pub fn double_click_image(&mut self, image: NodeId) -> Option<ImageEditForm> {
        if !self.mounted || self.mode.mode() != Mode::Visual {
            return None;
        }
        self.images.open_form(self.surface.dom(), image).cloned()
    }

    pub fn image_form_mut(&mut self) -> Option<&mut ImageEditForm> {
        self.images.form_mut()
    }

    pub fn submit_image_form(&mut self) -> Result<(), EditorError> {
        let Some(form) = self.images.take_form() else {
            return Err(EditorError::InvalidInput("no image is being edited".into()));
        };
        self.apply_image_settings(form.image, &form.settings)
    }

    pub fn apply_image_settings(
        &mut self,
        image: NodeId,
        settings: &ImageSettings,
    ) -> Result<(), EditorError> {
        self.ensure_editable("imageSettings")?;
        if !self.images.is_widget(image) {
            return Err(EditorError::InvalidInput("not an image in this document".into()));
        }
        let before = self.snapshot();
        let anchor = self.tracker.capture(self.surface.dom());
        if !image::apply_image_settings(self.surface.dom_mut(), image, settings) {
            return Err(EditorError::InvalidInput("not an image in this document".into()));
        }
        if self.tracker.selection().is_some() {
            self.tracker.restore(self.surface.dom(), anchor.as_ref());
        }
        self.history.record(before);
        self.after_change();
        Ok(())
    }

    /// Removes an image node and any widget state attached to it.
    pub fn delete_image(&mut self, image: NodeId) -> Result<(), EditorError> {
        self.ensure_editable("deleteImage")?;
        if !self.images.is_widget(image) {
            return Err(EditorError::InvalidInput("not an image in this document".into()));
        }
        let before = self.snapshot();
        let anchor = self.tracker.capture(self.surface.dom());
        self.surface.dom_mut().remove(image);
        if self.images.selected() == Some(image) {
            self.images.clear_selection();
        }
        if self.tracker.selection().is_some() {
            self.tracker.restore(self.surface.dom(), anchor.as_ref());
        }
        self.history.record(before);
        self.after_change();
        Ok(())
    }

    pub fn delete_selected_image(&mut self) -> Result<bool, EditorError> {
        match self.images.selected() {
            Some(image) => self.delete_image(image).map(|()| true),
            None => Ok(false),
        }
    }

    pub fn begin_image_resize(
        &mut self,
        image: NodeId,
        handle: ResizeHandle,
        pointer: (f32, f32),
        rendered: (f32, f32),
    ) -> Result<bool, EditorError> {
        self.ensure_editable("resizeImage")?;
        let started = self
            .images
            .begin_resize(self.surface.dom(), image, handle, pointer, rendered);
        if started {
            self.resize_before = Some(self.snapshot());
        }
        Ok(started)
    }

    pub fn drag_image_resize(
        &mut self,
        pointer: (f32, f32),
        lock_aspect: bool,
    ) -> Option<(u32, u32)> {
        if !self.mounted || self.mode.mode() != Mode::Visual {
            return None;
        }
        self.images.drag_resize(self.surface.dom_mut(), pointer, lock_aspect)
    }

    /// Finishes a drag; a size change becomes one undo step.
    pub fn end_image_resize(&mut self) -> bool {
        if self.images.end_resize().is_none() {
            return false;
        }
        if let Some(before) = self.resize_before.take() {
            if html_of(&before.dom) != self.surface.html() {
                self.history.record(before);
                self.after_change();
            }
        }
        true
    }

    pub fn hover_image(&mut self, image: NodeId, pointer: (f32, f32), rendered: (f32, f32)) {
        self.images.hover(self.surface.dom(), image, pointer, rendered);
    }

    pub fn hover_image_end(&mut self) {
        self.images.hover_end();
    }

    pub fn image_tooltip(&self) -> Option<&HoverTooltip> {
        self.images.tooltip()
    }

    pub fn open_menu(
        &mut self,
        kind: MenuKind,
        anchor: UiElementId,
        probe: &dyn LayoutProbe,
    ) -> bool {
        if !self.mounted || self.mode.mode() != Mode::Visual {
            return false;
        }
        self.menus.open(kind, anchor, probe).is_some()
    }

    pub fn toggle_menu(
        &mut self,
        kind: MenuKind,
        anchor: UiElementId,
        probe: &dyn LayoutProbe,
    ) -> bool {
        if !self.mounted || self.mode.mode() != Mode::Visual {
            return false;
        }
        self.menus.toggle(kind, anchor, probe)
    }

    pub fn close_menu(&mut self) -> bool {
        self.menus.close()
    }

    pub fn menu_state(&self) -> Option<&FloatingMenuState> {
        self.menus.state()
    }

    pub fn register_menu_element(&mut self, element: UiElementId) {
        self.menus.register_menu_element(element);
    }

    pub fn on_scroll(&mut self, probe: &dyn LayoutProbe) {
        self.menus.on_scroll(probe);
    }

    pub fn on_resize(&mut self, probe: &dyn LayoutProbe) {
        self.menus.on_resize(probe);
    }

    pub fn on_pointer_down(&mut self, target: Option<&UiElementId>, flagged: bool) -> bool {
        self.menus.on_pointer_down(target, flagged)
    }

    pub fn on_key_down(&mut self, key: &str) -> bool {
        self.menus.on_key_down(key)
    }

    /// Global listeners the host must keep installed right now.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        if !self.mounted {
            return Vec::new();
        }
        self.menus.subscriptions()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&EditorEvent) + 'static) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    fn emit(&mut self, event: EditorEvent) {
        if !self.mounted {
            return;
        }
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
    }

    /// Tears down every global subscription and suppresses late upload
    /// results. The editor rejects further edits.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        tracing::debug!("editor unmounted");
        self.menus.unmount();
        self.images.clear();
        self.resize_before = None;
        self.upload.reset();
        self.deferred_upload = None;
        self.listeners.clear();
        self.active = false;
        self.mounted = false;
    }
}

fn html_of(dom: &Dom) -> String {
    crate::html::serialize_children(dom, dom.root())
}
