use crate::command::inline::{apply_format, remove_format};
use crate::command::{
    CommandContext, CommandError, CommandOutcome, CommandPlugin, PendingFormats,
};
use crate::dom::{Dom, ElementData, NodeId};
use crate::html;
use crate::selection::{Point, Selection, document_end, document_start};
use crate::tags;

/// Nearest ancestor-or-self block that holds inline content. Stops at the
/// first block of any kind, so text sitting directly in a list or table
/// container has no text block.
pub fn closest_text_block(dom: &Dom, node: NodeId) -> Option<NodeId> {
    let mut current = Some(node);
    while let Some(id) = current {
        if id == dom.root() {
            return None;
        }
        if let Some(tag) = dom.tag(id) {
            if tags::is_block(tag) {
                return tags::is_text_block(tag).then_some(id);
            }
        }
        current = dom.parent(id);
    }
    None
}

/// Block that owns `leaf`, wrapping a loose inline run into a new `<p>` (or
/// `<li>` inside a list) when there is none.
pub fn ensure_block(dom: &mut Dom, leaf: NodeId) -> Option<NodeId> {
    if let Some(block) = closest_text_block(dom, leaf) {
        return Some(block);
    }
    if dom.is_block(leaf) {
        return None;
    }
    let mut top = leaf;
    loop {
        let parent = dom.parent(top)?;
        if parent == dom.root() || dom.tag(parent).is_some_and(tags::is_container) {
            break;
        }
        top = parent;
    }
    let parent = dom.parent(top)?;
    let siblings = dom.children(parent).to_vec();
    let index = siblings.iter().position(|&id| id == top)?;
    let mut lo = index;
    while lo > 0 && !dom.is_block(siblings[lo - 1]) {
        lo -= 1;
    }
    let mut hi = index;
    while hi + 1 < siblings.len() && !dom.is_block(siblings[hi + 1]) {
        hi += 1;
    }
    let tag = if dom.tag(parent).is_some_and(tags::is_list) {
        "li"
    } else {
        "p"
    };
    let block = dom.create_element(ElementData::new(tag));
    dom.insert_before(siblings[lo], block);
    for &node in &siblings[lo..=hi] {
        dom.append_child(block, node);
    }
    Some(block)
}

/// Text blocks touched by the range, in document order.
pub fn blocks_in_range(dom: &mut Dom, start: Point, end: Point) -> Vec<NodeId> {
    let leaves = if start.node == end.node {
        vec![start.node]
    } else {
        dom.leaves_between(start.node, end.node)
    };
    let mut blocks = Vec::new();
    for leaf in leaves {
        if !dom.contains(leaf) {
            continue;
        }
        if let Some(block) = ensure_block(dom, leaf) {
            if !blocks.contains(&block) {
                blocks.push(block);
            }
        }
    }
    blocks
}

/// Splits the range boundaries and returns the non-empty text nodes lying
/// fully inside it.
pub fn isolate_text_segments(dom: &mut Dom, start: Point, end: Point) -> Vec<NodeId> {
    let len = |dom: &Dom, node: NodeId| dom.text(node).map(str::len).unwrap_or_default();
    if start.node == end.node {
        let total = len(dom, start.node);
        let (from, to) = (start.offset.min(total), end.offset.min(total));
        if from >= to {
            return Vec::new();
        }
        if to < total {
            dom.split_text(start.node, to);
        }
        let segment = if from > 0 {
            match dom.split_text(start.node, from) {
                Some(right) => right,
                None => return Vec::new(),
            }
        } else {
            start.node
        };
        return vec![segment];
    }

    let end_len = len(dom, end.node);
    if end.offset > 0 && end.offset < end_len {
        dom.split_text(end.node, end.offset);
    }
    let start_len = len(dom, start.node);
    if start.offset > 0 && start.offset < start_len {
        dom.split_text(start.node, start.offset);
    }
    let include_start = start.offset == 0;
    let include_end = end.offset > 0;

    let leaves = dom.leaves_between(start.node, end.node);
    let last = leaves.len().saturating_sub(1);
    leaves
        .into_iter()
        .enumerate()
        .filter(|&(index, _)| (index != 0 || include_start) && (index != last || include_end))
        .map(|(_, node)| node)
        .filter(|&node| len(dom, node) > 0)
        .collect()
}

/// Selection spanning the given text segments.
pub fn segments_selection(dom: &Dom, segments: &[NodeId]) -> Option<Selection> {
    let first = *segments.first()?;
    let last = *segments.last()?;
    let end = dom.text(last).map(str::len).unwrap_or_default();
    Some(Selection::new(Point::new(first, 0), Point::new(last, end)))
}

fn prune_empty(dom: &mut Dom, mut node: NodeId) {
    while node != dom.root()
        && dom.contains(node)
        && dom.children(node).is_empty()
        && dom.element(node).is_some()
        && !dom.is_void(node)
        && !dom.tag(node).is_some_and(|tag| matches!(tag, "td" | "th"))
    {
        let Some(parent) = dom.parent(node) else {
            return;
        };
        dom.remove(node);
        node = parent;
    }
}

fn joinable(dom: &Dom, block: NodeId) -> bool {
    dom.tag(block)
        .is_some_and(|tag| tags::is_renamable_block(tag) || tag == "li")
}

/// Removes the content between two text points and joins the blocks they sat
/// in. Returns the collapsed caret.
pub fn delete_range(dom: &mut Dom, start: Point, end: Point) -> Point {
    if start == end {
        return start;
    }
    if start.node == end.node {
        dom.split_text(start.node, end.offset);
        if let Some(middle) = dom.split_text(start.node, start.offset) {
            dom.remove(middle);
        }
        return Point::new(start.node, dom.text(start.node).map(str::len).unwrap_or_default());
    }

    dom.split_text(end.node, end.offset);
    let Some(middle) = dom.split_text(start.node, start.offset) else {
        return start;
    };
    let caret = Point::new(start.node, dom.text(start.node).map(str::len).unwrap_or_default());
    let start_block = closest_text_block(dom, start.node);
    let end_block = closest_text_block(dom, end.node);

    for leaf in dom.leaves_between(middle, end.node) {
        let parent = dom.parent(leaf);
        dom.remove(leaf);
        if let Some(parent) = parent {
            prune_empty(dom, parent);
        }
    }

    if let (Some(start_block), Some(end_block)) = (start_block, end_block) {
        if start_block != end_block
            && dom.is_attached(start_block)
            && dom.is_attached(end_block)
            && !dom.is_ancestor(start_block, end_block)
            && !dom.is_ancestor(end_block, start_block)
            && joinable(dom, start_block)
            && joinable(dom, end_block)
        {
            for child in dom.children(end_block).to_vec() {
                dom.append_child(start_block, child);
            }
            let parent = dom.parent(end_block);
            dom.remove(end_block);
            if let Some(parent) = parent {
                prune_empty(dom, parent);
            }
        }
    }
    caret
}

fn splittable(dom: &Dom, block: NodeId) -> bool {
    dom.tag(block)
        .is_some_and(|tag| tags::is_renamable_block(tag) || tag == "li" || tag == "blockquote")
}

/// Inserts detached `nodes` at a text caret and returns the caret after
/// them. Block-level content splits the enclosing block; the caret lands in
/// the trailing half.
pub fn insert_nodes(dom: &mut Dom, caret: Point, nodes: Vec<NodeId>) -> Point {
    if nodes.is_empty() {
        return caret;
    }
    let Some(right) = dom.split_text(caret.node, caret.offset) else {
        return caret;
    };
    let left = caret.node;
    let block_level = nodes.iter().any(|&node| dom.is_block(node));

    if !block_level {
        let mut after = left;
        for node in nodes {
            dom.insert_after(after, node);
            after = node;
        }
        return match dom.text(after) {
            Some(text) => Point::new(after, text.len()),
            None => Point::new(right, 0),
        };
    }

    match closest_text_block(dom, left) {
        Some(block) if splittable(dom, block) => {
            if dom.split_after(block, left).is_none() {
                let tail = dom.shallow_clone(block);
                if let Some(tail) = tail {
                    dom.insert_after(block, tail);
                    dom.append_child(tail, right);
                }
            }
            let mut after = block;
            for node in nodes {
                dom.insert_after(after, node);
                after = node;
            }
            if dom.is_blank(block) {
                dom.remove(block);
            }
        }
        _ => {
            let mut top = left;
            while let Some(parent) = dom.parent(top) {
                if parent == dom.root() || dom.is_block(parent) {
                    break;
                }
                top = parent;
            }
            if top != left {
                dom.split_after(top, left);
            }
            let mut after = top;
            for node in nodes {
                dom.insert_after(after, node);
                after = node;
            }
        }
    }
    Point::new(right, 0)
}

/// Parses and inserts an HTML fragment at the caret.
pub fn insert_html(dom: &mut Dom, caret: Point, fragment: &str) -> Point {
    let nodes = html::parse_fragment(dom, fragment);
    insert_nodes(dom, caret, nodes)
}

/// Inserts typed text, applying formats armed at the caret.
pub fn insert_text(dom: &mut Dom, caret: Point, text: &str, pending: &mut PendingFormats) -> Point {
    let overrides = pending.take(caret);
    if overrides.is_empty() {
        if let Some(existing) = dom.text_mut(caret.node) {
            existing.insert_str(caret.offset, text);
            return Point::new(caret.node, caret.offset + text.len());
        }
        return caret;
    }
    dom.split_text(caret.node, caret.offset);
    let node = dom.create_text(text);
    dom.insert_after(caret.node, node);
    for (format, on) in overrides {
        if on {
            apply_format(dom, node, format);
        } else {
            remove_format(dom, node, format);
        }
    }
    Point::new(node, text.len())
}

fn required<'v>(value: Option<&'v str>, what: &str) -> Result<&'v str, CommandError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CommandError::new(format!("Missing {what}")))
}

fn collapse(ctx: &mut CommandContext<'_>) -> Point {
    if ctx.is_collapsed() {
        ctx.start
    } else {
        delete_range(ctx.dom, ctx.start, ctx.end)
    }
}

pub(crate) struct EditingPlugin;

impl CommandPlugin for EditingPlugin {
    fn id(&self) -> &'static str {
        "editing"
    }

    fn commands(&self) -> Vec<crate::command::CommandSpec> {
        use crate::command::CommandSpec;
        vec![
            CommandSpec::new("insertHTML", "Insert HTML", |ctx, value| {
                let fragment = required(value, "HTML fragment")?;
                let caret = collapse(ctx);
                let caret = insert_html(ctx.dom, caret, fragment);
                Ok(CommandOutcome::mutated().caret(caret))
            })
            .description("Replace the selection with an HTML fragment.")
            .keywords(["insert", "html", "paste"])
            .value_example("<b>hello</b>"),
            CommandSpec::new("insertText", "Insert text", |ctx, value| {
                let text = required(value, "text")?;
                let caret = collapse(ctx);
                let caret = insert_text(ctx.dom, caret, text, ctx.pending);
                Ok(CommandOutcome::mutated().caret(caret))
            })
            .description("Replace the selection with plain text.")
            .keywords(["insert", "type", "text"])
            .value_example("hello"),
            CommandSpec::new("delete", "Delete", |ctx, _value| {
                if ctx.is_collapsed() {
                    let node = ctx.start.node;
                    let Some(text) = ctx.dom.text(node) else {
                        return Ok(CommandOutcome::unchanged());
                    };
                    let Some((index, _)) = text[..ctx.start.offset].char_indices().next_back()
                    else {
                        return Ok(CommandOutcome::unchanged());
                    };
                    let caret = delete_range(ctx.dom, Point::new(node, index), ctx.start);
                    return Ok(CommandOutcome::mutated().caret(caret));
                }
                let caret = delete_range(ctx.dom, ctx.start, ctx.end);
                Ok(CommandOutcome::mutated().caret(caret))
            })
            .description("Delete the selection, or the character before the caret.")
            .keywords(["delete", "backspace", "remove"]),
            CommandSpec::new("selectAll", "Select all", |ctx, _value| {
                let start = document_start(ctx.dom);
                let end = document_end(ctx.dom);
                Ok(CommandOutcome::unchanged().select(Selection::new(start, end)))
            })
            .description("Select the whole document.")
            .keywords(["select", "all"]),
        ]
    }
}
