//! Builders turning dialog input into the HTML fragments that get inserted
//! through `insertHTML`, plus the dialog forms that gate submission.

use serde::{Deserialize, Serialize};

use crate::error::EditorError;
use crate::html::{escape_attr, escape_text};
use crate::video::VideoEmbed;

pub const BUTTON_CLASS: &str = "editor-button";
const BUTTON_STYLE: &str = "display: inline-block; padding: 8px 16px; background-color: #2563eb; \
     color: #ffffff; border-radius: 4px; text-decoration: none;";
const TABLE_STYLE: &str = "border-collapse: collapse; width: 100%;";
const CELL_STYLE: &str = "border: 1px solid #cccccc; padding: 4px;";

fn required_url(url: &str) -> Result<&str, EditorError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(EditorError::InvalidInput("url is required".into()));
    }
    Ok(url)
}

fn new_tab_attrs(new_tab: bool) -> &'static str {
    if new_tab {
        " target=\"_blank\" rel=\"noopener noreferrer\""
    } else {
        ""
    }
}

/// `<a>` with the url as text when `text` is blank.
pub fn link_fragment(url: &str, text: &str, new_tab: bool) -> Result<String, EditorError> {
    let url = required_url(url)?;
    let text = match text.trim() {
        "" => url,
        _ => text,
    };
    Ok(format!(
        "<a href=\"{}\"{}>{}</a>",
        escape_attr(url),
        new_tab_attrs(new_tab),
        escape_text(text)
    ))
}

pub fn button_fragment(url: &str, text: &str, new_tab: bool) -> Result<String, EditorError> {
    let url = required_url(url)?;
    if text.trim().is_empty() {
        return Err(EditorError::InvalidInput("button text is required".into()));
    }
    Ok(format!(
        "<a href=\"{}\" class=\"{BUTTON_CLASS}\" style=\"{BUTTON_STYLE}\"{}>{}</a>",
        escape_attr(url),
        new_tab_attrs(new_tab),
        escape_text(text)
    ))
}

pub fn table_fragment(rows: usize, cols: usize, max: usize) -> Result<String, EditorError> {
    let max = max.max(1);
    if !(1..=max).contains(&rows) || !(1..=max).contains(&cols) {
        return Err(EditorError::InvalidInput(format!(
            "table size {rows}x{cols} is outside 1..={max}"
        )));
    }
    let cell = format!("<td style=\"{CELL_STYLE}\"></td>");
    let row = format!("<tr>{}</tr>", cell.repeat(cols));
    Ok(format!(
        "<table style=\"{TABLE_STYLE}\"><tbody>{}</tbody></table>",
        row.repeat(rows)
    ))
}

pub fn video_fragment(embed: &VideoEmbed) -> String {
    format!(
        "<iframe src=\"{}\" width=\"560\" height=\"315\" \
         frameborder=\"0\" allowfullscreen></iframe>",
        escape_attr(&embed.embed_url)
    )
}

pub fn image_fragment(url: &str, alt: &str) -> Result<String, EditorError> {
    let url = required_url(url)?;
    Ok(format!(
        "<img src=\"{}\" alt=\"{}\">",
        escape_attr(url),
        escape_attr(alt)
    ))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkForm {
    pub url: String,
    pub text: String,
    pub new_tab: bool,
}

impl LinkForm {
    pub fn can_submit(&self) -> bool {
        !self.url.trim().is_empty()
    }

    pub fn fragment(&self) -> Result<String, EditorError> {
        link_fragment(&self.url, &self.text, self.new_tab)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonForm {
    pub url: String,
    pub text: String,
    pub new_tab: bool,
}

impl ButtonForm {
    pub fn can_submit(&self) -> bool {
        !self.url.trim().is_empty() && !self.text.trim().is_empty()
    }

    pub fn fragment(&self) -> Result<String, EditorError> {
        button_fragment(&self.url, &self.text, self.new_tab)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoForm {
    pub url: String,
}

impl VideoForm {
    pub fn can_submit(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableForm {
    pub rows: usize,
    pub cols: usize,
}

impl Default for TableForm {
    fn default() -> Self {
        Self { rows: 3, cols: 3 }
    }
}

impl TableForm {
    pub fn can_submit(&self, max: usize) -> bool {
        (1..=max).contains(&self.rows) && (1..=max).contains(&self.cols)
    }
}
