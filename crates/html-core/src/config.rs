use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::toolbar::PermissionLevel;

/// Offset of a floating menu from the bottom-left corner of its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuOffset {
    pub x: f32,
    pub y: f32,
}

impl Default for MenuOffset {
    fn default() -> Self {
        Self { x: 0.0, y: 4.0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub initial_html: String,
    pub placeholder: String,
    /// Minimum editing area height in CSS pixels; zero leaves it to the host.
    pub min_height: u32,
    pub permission: PermissionLevel,
    pub max_undo: usize,
    pub menu_offset: MenuOffset,
    pub max_table_size: usize,
    pub image_min_size: u32,
    /// Named snippets offered by the template menu.
    pub templates: BTreeMap<String, String>,
}

impl EditorConfig {
    pub fn from_json_str(source: &str) -> Result<Self, serde_json::Error> {
        let config: Self = serde_json::from_str(source)?;
        Ok(config.with_defaults())
    }

    pub fn with_defaults(mut self) -> Self {
        if self.max_undo == 0 {
            self.max_undo = 200;
        }
        if self.max_table_size == 0 {
            self.max_table_size = 20;
        }
        if self.image_min_size == 0 {
            self.image_min_size = 16;
        }
        self
    }
}
