use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::mode::Mode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    #[default]
    Standard,
    Elevated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolbarButton {
    Bold,
    Italic,
    Underline,
    StrikeThrough,
    Code,
    JustifyLeft,
    JustifyCenter,
    JustifyRight,
    JustifyFull,
    UnorderedList,
    OrderedList,
    Indent,
    Outdent,
    Blockquote,
    CodeBlock,
    HorizontalRule,
    ForeColor,
    RemoveFormat,
    Link,
    Unlink,
    Button,
    Image,
    Video,
    Table,
    Template,
    Undo,
    Redo,
    HtmlMode,
}

impl ToolbarButton {
    pub const ALL: [ToolbarButton; 28] = [
        ToolbarButton::Bold,
        ToolbarButton::Italic,
        ToolbarButton::Underline,
        ToolbarButton::StrikeThrough,
        ToolbarButton::Code,
        ToolbarButton::JustifyLeft,
        ToolbarButton::JustifyCenter,
        ToolbarButton::JustifyRight,
        ToolbarButton::JustifyFull,
        ToolbarButton::UnorderedList,
        ToolbarButton::OrderedList,
        ToolbarButton::Indent,
        ToolbarButton::Outdent,
        ToolbarButton::Blockquote,
        ToolbarButton::CodeBlock,
        ToolbarButton::HorizontalRule,
        ToolbarButton::ForeColor,
        ToolbarButton::RemoveFormat,
        ToolbarButton::Link,
        ToolbarButton::Unlink,
        ToolbarButton::Button,
        ToolbarButton::Image,
        ToolbarButton::Video,
        ToolbarButton::Table,
        ToolbarButton::Template,
        ToolbarButton::Undo,
        ToolbarButton::Redo,
        ToolbarButton::HtmlMode,
    ];

    /// Command whose state query drives the active flag.
    pub fn state_command(self) -> Option<&'static str> {
        Some(match self {
            ToolbarButton::Bold => "bold",
            ToolbarButton::Italic => "italic",
            ToolbarButton::Underline => "underline",
            ToolbarButton::StrikeThrough => "strikeThrough",
            ToolbarButton::Code => "code",
            ToolbarButton::JustifyLeft => "justifyLeft",
            ToolbarButton::JustifyCenter => "justifyCenter",
            ToolbarButton::JustifyRight => "justifyRight",
            ToolbarButton::JustifyFull => "justifyFull",
            ToolbarButton::UnorderedList => "insertUnorderedList",
            ToolbarButton::OrderedList => "insertOrderedList",
            ToolbarButton::Blockquote => "blockquote",
            ToolbarButton::CodeBlock => "codeBlock",
            ToolbarButton::Link => "createLink",
            _ => return None,
        })
    }

    pub fn requires_elevated(self) -> bool {
        matches!(
            self,
            ToolbarButton::StrikeThrough
                | ToolbarButton::Code
                | ToolbarButton::JustifyFull
                | ToolbarButton::Indent
                | ToolbarButton::Outdent
                | ToolbarButton::Blockquote
                | ToolbarButton::CodeBlock
                | ToolbarButton::HorizontalRule
                | ToolbarButton::ForeColor
                | ToolbarButton::Table
                | ToolbarButton::Template
        )
    }

    pub fn available_to(self, permission: PermissionLevel) -> bool {
        permission == PermissionLevel::Elevated || !self.requires_elevated()
    }
}

/// Facts about the editor the reducer needs; gathered by the editor from
/// command state queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionContext {
    pub editor_active: bool,
    /// Commands whose state query reports `true` at the selection.
    pub active_commands: BTreeSet<String>,
    pub in_link: bool,
    pub can_undo: bool,
    pub can_redo: bool,
    pub upload_pending: bool,
}

impl SelectionContext {
    fn is_active(&self, command: &str) -> bool {
        self.active_commands.contains(command)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ButtonState {
    pub enabled: bool,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolbarState {
    pub buttons: BTreeMap<ToolbarButton, ButtonState>,
    pub uploading: bool,
}

impl ToolbarState {
    pub fn button(&self, button: ToolbarButton) -> Option<ButtonState> {
        self.buttons.get(&button).copied()
    }

    pub fn is_active(&self, button: ToolbarButton) -> bool {
        self.button(button).is_some_and(|state| state.active)
    }

    pub fn is_enabled(&self, button: ToolbarButton) -> bool {
        self.button(button).is_some_and(|state| state.enabled)
    }
}

/// Pure reduction of editor facts into per-button state. Buttons outside the
/// permission level are absent; in source mode only the mode toggle is live.
pub fn compute_state(
    context: &SelectionContext,
    mode: Mode,
    permission: PermissionLevel,
) -> ToolbarState {
    let buttons = ToolbarButton::ALL
        .into_iter()
        .filter(|button| button.available_to(permission))
        .map(|button| (button, button_state(button, context, mode)))
        .collect();
    ToolbarState {
        buttons,
        uploading: context.upload_pending,
    }
}

fn button_state(button: ToolbarButton, context: &SelectionContext, mode: Mode) -> ButtonState {
    if button == ToolbarButton::HtmlMode {
        return ButtonState {
            enabled: true,
            active: mode == Mode::Source,
        };
    }
    if mode == Mode::Source {
        return ButtonState::default();
    }
    let enabled = context.editor_active
        && match button {
            ToolbarButton::Unlink => context.in_link,
            ToolbarButton::Undo => context.can_undo,
            ToolbarButton::Redo => context.can_redo,
            ToolbarButton::Image => !context.upload_pending,
            _ => true,
        };
    let active = match button {
        ToolbarButton::Link => context.in_link,
        other => other
            .state_command()
            .is_some_and(|command| context.is_active(command)),
    };
    ButtonState { enabled, active }
}
