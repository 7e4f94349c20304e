use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};

use crate::surface::DocumentSurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Visual,
    Source,
}

/// How far the parser had to rewrite submitted source, measured as a line
/// diff between the submitted text and the re-serialized document.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NormalizationReport {
    pub changed: bool,
    pub inserted_lines: usize,
    pub deleted_lines: usize,
    pub similarity: f32,
}

impl NormalizationReport {
    fn between(submitted: &str, normalized: &str) -> Self {
        let diff = TextDiff::from_lines(submitted, normalized);
        let mut report = Self {
            changed: false,
            inserted_lines: 0,
            deleted_lines: 0,
            similarity: diff.ratio(),
        };
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => report.inserted_lines += 1,
                ChangeTag::Delete => report.deleted_lines += 1,
                ChangeTag::Equal => {}
            }
        }
        report.changed = report.inserted_lines > 0 || report.deleted_lines > 0;
        report
    }
}

/// Owns the source text buffer while source mode is active. The document
/// tree stays the single source of truth: entering source mode serializes
/// it, leaving parses the edited text back into it.
#[derive(Debug, Clone, Default)]
pub struct ModeSynchronizer {
    mode: Mode,
    source: String,
}

impl ModeSynchronizer {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn source_text(&self) -> Option<&str> {
        (self.mode == Mode::Source).then_some(self.source.as_str())
    }

    /// Replaces the source buffer; ignored outside source mode.
    pub fn set_source_text(&mut self, text: impl Into<String>) -> bool {
        if self.mode != Mode::Source {
            return false;
        }
        self.source = text.into();
        true
    }

    pub fn enter_source(&mut self, surface: &DocumentSurface) -> &str {
        if self.mode != Mode::Source {
            self.source = surface.pretty_html();
            self.mode = Mode::Source;
            tracing::debug!(bytes = self.source.len(), "entered source mode");
        }
        &self.source
    }

    pub fn enter_visual(&mut self, surface: &mut DocumentSurface) -> NormalizationReport {
        if self.mode != Mode::Source {
            return NormalizationReport {
                similarity: 1.0,
                ..NormalizationReport::default()
            };
        }
        let submitted = std::mem::take(&mut self.source);
        surface.set_html(&submitted);
        let report = NormalizationReport::between(&submitted, &surface.pretty_html());
        self.mode = Mode::Visual;
        tracing::debug!(
            changed = report.changed,
            inserted = report.inserted_lines,
            deleted = report.deleted_lines,
            similarity = report.similarity,
            "entered visual mode"
        );
        report
    }

    /// Flips the mode. Returns the report when switching back to visual.
    pub fn toggle(&mut self, surface: &mut DocumentSurface) -> Option<NormalizationReport> {
        match self.mode {
            Mode::Visual => {
                self.enter_source(surface);
                None
            }
            Mode::Source => Some(self.enter_visual(surface)),
        }
    }
}
