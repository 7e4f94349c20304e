use crate::dom::{Dom, NodeData};
use crate::html;
use crate::tags;

/// The editable document and its derived text metrics.
#[derive(Debug, Clone, Default)]
pub struct DocumentSurface {
    dom: Dom,
}

impl DocumentSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_html(source: &str) -> Self {
        let mut surface = Self::new();
        surface.set_html(source);
        surface
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }

    pub fn html(&self) -> String {
        html::serialize_children(&self.dom, self.dom.root())
    }

    pub fn pretty_html(&self) -> String {
        html::serialize_pretty(&self.dom, self.dom.root())
    }

    /// Replaces the content. Node ids from the old content never resolve again.
    pub fn set_html(&mut self, source: &str) {
        let root = self.dom.root();
        self.dom.clear_children(root);
        html::parse_into(&mut self.dom, root, source);
    }

    pub fn plain_text(&self) -> String {
        html::plain_text(&self.dom, self.dom.root())
    }

    /// Whitespace, bare line breaks and empty blocks count as empty.
    pub fn is_empty(&self) -> bool {
        let has_media = self.dom.descendants(self.dom.root()).into_iter().any(|node| {
            matches!(self.dom.data(node), Some(NodeData::Element(el)) if tags::is_media(&el.tag))
        });
        !has_media && self.plain_text().trim().is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.plain_text().split_whitespace().count()
    }

    /// Unicode scalar values of the plain text, line breaks included.
    pub fn char_count(&self) -> usize {
        self.plain_text().chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_follow_plain_text() {
        let surface = DocumentSurface::from_html("<p>Hello world</p>");
        assert_eq!(surface.word_count(), 2);
        assert_eq!(surface.char_count(), 11);
    }

    #[test]
    fn line_breaks_alone_are_empty() {
        assert!(DocumentSurface::from_html("<p><br></p>").is_empty());
        assert!(DocumentSurface::from_html("  \n ").is_empty());
        assert!(!DocumentSurface::from_html("<p><img src=\"a.png\"></p>").is_empty());
    }

    #[test]
    fn set_html_replaces_content() {
        let mut surface = DocumentSurface::from_html("<p>one</p>");
        let old = surface.dom().first_text(surface.dom().root()).unwrap();
        surface.set_html("<p>two</p>");
        assert!(!surface.dom().contains(old));
        assert_eq!(surface.html(), "<p>two</p>");
    }
}
