use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::dom::{Dom, NodeData, NodeId, clamp_to_char_boundary};
use crate::tags;

/// A position in the document. For text nodes `offset` is a byte offset into
/// the text; for elements it is a child index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub node: NodeId,
    pub offset: usize,
}

impl Point {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point,
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// `(start, end)` in document order.
    pub fn ordered(&self, dom: &Dom) -> (Point, Point) {
        if compare_points(dom, self.anchor, self.focus) == Ordering::Greater {
            (self.focus, self.anchor)
        } else {
            (self.anchor, self.focus)
        }
    }
}

pub fn compare_points(dom: &Dom, a: Point, b: Point) -> Ordering {
    if a.node == b.node {
        return a.offset.cmp(&b.offset);
    }
    dom.compare(a.node, b.node)
}

/// A selection endpoint plus its ancestor chain at capture time. When the
/// node itself does not survive a mutation, the nearest surviving ancestor
/// stands in for it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AnchoredPoint {
    point: Point,
    lineage: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionAnchor {
    anchor: AnchoredPoint,
    focus: AnchoredPoint,
}

impl SelectionAnchor {
    pub fn selection(&self) -> Selection {
        Selection::new(self.anchor.point, self.focus.point)
    }
}

/// How a restore landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Exact,
    Ancestor,
    DocumentEnd,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    current: Option<Selection>,
}

impl SelectionTracker {
    pub fn selection(&self) -> Option<Selection> {
        self.current
    }

    pub fn set(&mut self, selection: Option<Selection>) {
        self.current = selection;
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Snapshot of the current selection that survives node removal.
    pub fn capture(&self, dom: &Dom) -> Option<SelectionAnchor> {
        let selection = self.current?;
        Some(SelectionAnchor {
            anchor: AnchoredPoint {
                point: selection.anchor,
                lineage: dom.ancestors(selection.anchor.node),
            },
            focus: AnchoredPoint {
                point: selection.focus,
                lineage: dom.ancestors(selection.focus.node),
            },
        })
    }

    /// Re-establishes a captured selection. A missing anchor, or one whose
    /// nodes and ancestors are all gone, collapses to the document end.
    pub fn restore(&mut self, dom: &Dom, anchor: Option<&SelectionAnchor>) -> Resolution {
        let Some(anchor) = anchor else {
            self.current = Some(Selection::collapsed(document_end(dom)));
            return Resolution::DocumentEnd;
        };
        let (anchor_point, anchor_res) = resolve(dom, &anchor.anchor);
        let (focus_point, focus_res) = resolve(dom, &anchor.focus);
        self.current = Some(Selection::new(anchor_point, focus_point));
        let resolution = worst(anchor_res, focus_res);
        if resolution != Resolution::Exact {
            tracing::debug!(?resolution, "selection restored with fallback");
        }
        resolution
    }

    /// Clamps the live selection against the current tree.
    pub fn revalidate(&mut self, dom: &Dom) -> Resolution {
        let anchor = self.capture(dom);
        self.restore(dom, anchor.as_ref())
    }
}

fn worst(a: Resolution, b: Resolution) -> Resolution {
    match (a, b) {
        (Resolution::DocumentEnd, _) | (_, Resolution::DocumentEnd) => Resolution::DocumentEnd,
        (Resolution::Ancestor, _) | (_, Resolution::Ancestor) => Resolution::Ancestor,
        _ => Resolution::Exact,
    }
}

fn resolve(dom: &Dom, anchored: &AnchoredPoint) -> (Point, Resolution) {
    let point = anchored.point;
    if dom.is_attached(point.node) {
        return (clamp_point(dom, point), Resolution::Exact);
    }
    for &ancestor in &anchored.lineage {
        if ancestor != dom.root() && dom.is_attached(ancestor) {
            return (end_of(dom, ancestor), Resolution::Ancestor);
        }
    }
    (document_end(dom), Resolution::DocumentEnd)
}

pub fn clamp_point(dom: &Dom, point: Point) -> Point {
    match dom.data(point.node) {
        Some(NodeData::Text(text)) => {
            Point::new(point.node, clamp_to_char_boundary(text, point.offset))
        }
        _ => Point::new(point.node, point.offset.min(dom.children(point.node).len())),
    }
}

fn end_of(dom: &Dom, node: NodeId) -> Point {
    match dom.last_text(node) {
        Some(text) => Point::new(text, dom.text(text).map(str::len).unwrap_or_default()),
        None => Point::new(node, dom.children(node).len()),
    }
}

/// Caret position after the last piece of text in the document.
pub fn document_end(dom: &Dom) -> Point {
    end_of(dom, dom.root())
}

pub fn document_start(dom: &Dom) -> Point {
    match dom.first_text(dom.root()) {
        Some(text) => Point::new(text, 0),
        None => Point::new(dom.root(), 0),
    }
}

/// Node whose formatting describes the position, for state queries.
pub fn context_node(dom: &Dom, point: Point) -> NodeId {
    if dom.is_text(point.node) {
        return point.node;
    }
    let children = dom.children(point.node);
    if let Some(&child) = children.get(point.offset) {
        return dom.first_text(child).unwrap_or(child);
    }
    if let Some(&last) = children.last() {
        return dom.last_text(last).unwrap_or(last);
    }
    point.node
}

/// Moves a point into a text node, inserting an empty text node when the
/// position has none. Mutations need a text point to split at.
pub fn ensure_text_point(dom: &mut Dom, point: Point) -> Point {
    if !dom.is_attached(point.node) {
        let end = document_end(dom);
        return if dom.is_text(end.node) {
            end
        } else {
            ensure_text_point(dom, end)
        };
    }
    if dom.is_text(point.node) {
        return clamp_point(dom, point);
    }
    let children = dom.children(point.node).to_vec();
    if let Some(&child) = children.get(point.offset) {
        if let Some(text) = dom.first_text(child) {
            return Point::new(text, 0);
        }
        let text = dom.create_text("");
        let holds_inline = dom
            .tag(child)
            .is_some_and(|tag| !tags::is_void(tag) && !tags::is_container(tag));
        if !holds_inline {
            dom.insert_before(child, text);
        } else {
            dom.append_child(child, text);
        }
        return Point::new(text, 0);
    }
    if let Some(&last) = children.last() {
        if let Some(text) = dom.last_text(last) {
            return Point::new(text, dom.text(text).map(str::len).unwrap_or_default());
        }
        let holds_inline = dom
            .tag(last)
            .is_some_and(|tag| {
                !tags::is_void(tag) && !tags::is_container(tag) && !tags::is_media(tag)
            });
        if holds_inline {
            let len = dom.children(last).len();
            return ensure_text_point(dom, Point::new(last, len));
        }
    }
    let text = dom.create_text("");
    dom.append_child(point.node, text);
    Point::new(text, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html;

    fn parse(source: &str) -> Dom {
        let mut dom = Dom::new();
        let root = dom.root();
        html::parse_into(&mut dom, root, source);
        dom
    }

    #[test]
    fn restore_is_exact_when_nodes_survive() {
        let dom = parse("<p>hello</p>");
        let text = dom.first_text(dom.root()).unwrap();
        let mut tracker = SelectionTracker::default();
        tracker.set(Some(Selection::new(Point::new(text, 1), Point::new(text, 3))));
        let anchor = tracker.capture(&dom);
        assert_eq!(tracker.restore(&dom, anchor.as_ref()), Resolution::Exact);
        assert_eq!(tracker.selection().unwrap().focus.offset, 3);
    }

    #[test]
    fn restore_falls_back_to_surviving_ancestor() {
        let mut dom = parse("<p>one <b>two</b></p><p>three</p>");
        let b = dom.elements_by_tag("b")[0];
        let text = dom.first_text(b).unwrap();
        let mut tracker = SelectionTracker::default();
        tracker.set(Some(Selection::collapsed(Point::new(text, 1))));
        let anchor = tracker.capture(&dom);
        dom.remove(b);
        assert_eq!(tracker.restore(&dom, anchor.as_ref()), Resolution::Ancestor);
        let caret = tracker.selection().unwrap().focus;
        assert_eq!(dom.text(caret.node), Some("one "));
        assert_eq!(caret.offset, 4);
    }

    #[test]
    fn restore_without_anchor_lands_at_document_end() {
        let dom = parse("<p>a</p><p>bc</p>");
        let mut tracker = SelectionTracker::default();
        assert_eq!(tracker.restore(&dom, None), Resolution::DocumentEnd);
        let caret = tracker.selection().unwrap().anchor;
        assert_eq!(dom.text(caret.node), Some("bc"));
        assert_eq!(caret.offset, 2);
    }

    #[test]
    fn ensure_text_point_pads_empty_documents() {
        let mut dom = Dom::new();
        let root = dom.root();
        let point = ensure_text_point(&mut dom, Point::new(root, 0));
        assert_eq!(dom.text(point.node), Some(""));
        assert_eq!(dom.parent(point.node), Some(dom.root()));
    }

    #[test]
    fn ensure_text_point_pads_before_void_elements() {
        let mut dom = parse("<p><img src=\"a.png\"></p>");
        let p = dom.elements_by_tag("p")[0];
        let point = ensure_text_point(&mut dom, Point::new(p, 0));
        assert_eq!(dom.children(p)[0], point.node);
    }
}
