use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::MenuOffset;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Scroll offset and size of the visible page.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub scroll_x: f32,
    pub scroll_y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MenuPosition {
    pub top: f32,
    pub left: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuKind {
    ColorPicker,
    Table,
    Template,
    Video,
}

/// Host-side identifier of a UI element (toolbar button, menu body).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UiElementId(pub String);

impl UiElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl From<&str> for UiElementId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Layout information the host answers on demand.
pub trait LayoutProbe {
    /// Viewport-relative box of an element, or `None` when it is not laid out.
    fn rect_of(&self, element: &UiElementId) -> Option<Rect>;
    fn viewport(&self) -> Viewport;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalListener {
    Scroll,
    Resize,
    PointerDown,
    KeyDown,
}

/// A global listener the host must keep installed while a menu is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Subscription {
    pub listener: GlobalListener,
    /// Scroll listens in the capture phase so nested scrollers are seen.
    pub capture: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloatingMenuState {
    pub kind: MenuKind,
    pub anchor: UiElementId,
    pub open: bool,
    pub position: MenuPosition,
}

/// Keeps at most one anchored popover open and its position in sync with
/// the anchor. Rendering is the host's job; this owns the state and the
/// listener set the host must mirror.
#[derive(Debug, Clone, Default)]
pub struct FloatingMenuPositioner {
    offset: MenuOffset,
    current: Option<FloatingMenuState>,
    menu_elements: BTreeSet<UiElementId>,
}

impl FloatingMenuPositioner {
    pub fn new(offset: MenuOffset) -> Self {
        Self {
            offset,
            current: None,
            menu_elements: BTreeSet::new(),
        }
    }

    fn position_for(&self, probe: &dyn LayoutProbe, anchor: &UiElementId) -> Option<MenuPosition> {
        let rect = probe.rect_of(anchor)?;
        let viewport = probe.viewport();
        Some(MenuPosition {
            top: rect.bottom() + viewport.scroll_y + self.offset.y,
            left: rect.x + viewport.scroll_x + self.offset.x,
        })
    }

    /// Opens `kind` below `anchor`, closing whatever menu was open.
    pub fn open(
        &mut self,
        kind: MenuKind,
        anchor: UiElementId,
        probe: &dyn LayoutProbe,
    ) -> Option<&FloatingMenuState> {
        if self.current.is_some() {
            self.close();
        }
        let Some(position) = self.position_for(probe, &anchor) else {
            tracing::debug!(?kind, anchor = %anchor.0, "menu anchor not laid out; not opening");
            return None;
        };
        tracing::debug!(
            ?kind,
            anchor = %anchor.0,
            top = position.top,
            left = position.left,
            "menu opened; listeners subscribed"
        );
        self.current = Some(FloatingMenuState {
            kind,
            anchor,
            open: true,
            position,
        });
        self.current.as_ref()
    }

    pub fn close(&mut self) -> bool {
        match self.current.take() {
            Some(state) => {
                tracing::debug!(kind = ?state.kind, "menu closed; listeners released");
                self.menu_elements.clear();
                true
            }
            None => false,
        }
    }

    pub fn toggle(&mut self, kind: MenuKind, anchor: UiElementId, probe: &dyn LayoutProbe) -> bool {
        if self.current.as_ref().is_some_and(|state| state.kind == kind) {
            self.close();
            false
        } else {
            self.open(kind, anchor, probe).is_some()
        }
    }

    /// Marks a host element as part of the open menu so pointer presses on
    /// it do not dismiss.
    pub fn register_menu_element(&mut self, element: UiElementId) {
        if self.current.is_some() {
            self.menu_elements.insert(element);
        }
    }

    fn reposition(&mut self, probe: &dyn LayoutProbe) {
        let Some(anchor) = self.current.as_ref().map(|state| state.anchor.clone()) else {
            return;
        };
        match self.position_for(probe, &anchor) {
            Some(position) => {
                if let Some(state) = self.current.as_mut() {
                    state.position = position;
                }
            }
            None => {
                tracing::debug!(anchor = %anchor.0, "menu anchor disappeared");
                self.close();
            }
        }
    }

    pub fn on_scroll(&mut self, probe: &dyn LayoutProbe) {
        self.reposition(probe);
    }

    pub fn on_resize(&mut self, probe: &dyn LayoutProbe) {
        self.reposition(probe);
    }

    /// Outside presses dismiss. `flagged` is set by the host for nodes that
    /// carry the menu-ownership marker. Returns whether the menu closed.
    pub fn on_pointer_down(&mut self, target: Option<&UiElementId>, flagged: bool) -> bool {
        let Some(state) = self.current.as_ref() else {
            return false;
        };
        let inside = flagged
            || target.is_some_and(|target| {
                *target == state.anchor || self.menu_elements.contains(target)
            });
        if inside {
            return false;
        }
        self.close()
    }

    pub fn on_key_down(&mut self, key: &str) -> bool {
        key == "Escape" && self.close()
    }

    pub fn state(&self) -> Option<&FloatingMenuState> {
        self.current.as_ref()
    }

    pub fn is_open(&self, kind: MenuKind) -> bool {
        self.current.as_ref().is_some_and(|state| state.kind == kind)
    }

    /// Listeners the host must have installed right now; empty when closed.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        if self.current.is_none() {
            return Vec::new();
        }
        vec![
            Subscription {
                listener: GlobalListener::Scroll,
                capture: true,
            },
            Subscription {
                listener: GlobalListener::Resize,
                capture: false,
            },
            Subscription {
                listener: GlobalListener::PointerDown,
                capture: false,
            },
            Subscription {
                listener: GlobalListener::KeyDown,
                capture: false,
            },
        ]
    }

    pub fn unmount(&mut self) {
        self.close();
        self.menu_elements.clear();
    }
}
