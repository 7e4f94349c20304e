use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tags;

/// Stable identity of a node in a [`Dom`]. Ids are handed out monotonically
/// and never reused, so a stale id simply fails to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Root,
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementData {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attrs.iter().position(|(key, _)| key == name)?;
        Some(self.attrs.remove(index).1)
    }

    /// Parsed `style` declarations in source order.
    pub fn style_entries(&self) -> Vec<(String, String)> {
        let Some(style) = self.attr("style") else {
            return Vec::new();
        };
        style
            .split(';')
            .filter_map(|decl| {
                let (property, value) = decl.split_once(':')?;
                let property = property.trim().to_ascii_lowercase();
                let value = value.trim();
                if property.is_empty() || value.is_empty() {
                    return None;
                }
                Some((property, value.to_string()))
            })
            .collect()
    }

    pub fn style(&self, property: &str) -> Option<String> {
        self.style_entries()
            .into_iter()
            .rev()
            .find(|(key, _)| key == property)
            .map(|(_, value)| value)
    }

    /// Sets or clears one style property. An emptied `style` attribute is dropped.
    pub fn set_style(&mut self, property: &str, value: Option<&str>) {
        let property = property.to_ascii_lowercase();
        let mut entries = self.style_entries();
        let existing = entries.iter().position(|(key, _)| *key == property);
        entries.retain(|(key, _)| *key != property);
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            let at = existing.unwrap_or(entries.len()).min(entries.len());
            entries.insert(at, (property, value.to_string()));
        }
        if entries.is_empty() {
            self.remove_attr("style");
        } else {
            let style = entries
                .iter()
                .map(|(key, value)| format!("{key}: {value}"))
                .collect::<Vec<_>>()
                .join("; ");
            self.set_attr("style", format!("{style};"));
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// Arena-backed document tree. The root node is not serialized; its children
/// are the document content.
#[derive(Debug, Clone)]
pub struct Dom {
    slots: HashMap<NodeId, Slot>,
    root: NodeId,
    next_id: u64,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    pub fn new() -> Self {
        let mut dom = Self {
            slots: HashMap::new(),
            root: NodeId(0),
            next_id: 0,
        };
        dom.root = dom.alloc(NodeData::Root);
        dom
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.slots.insert(
            id,
            Slot {
                parent: None,
                children: Vec::new(),
                data,
            },
        );
        id
    }

    /// Replaces this tree with `snapshot` while keeping ids monotonic.
    pub fn restore_from(&mut self, snapshot: Dom) {
        let next_id = self.next_id.max(snapshot.next_id);
        *self = snapshot;
        self.next_id = next_id;
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slots.contains_key(&id)
    }

    /// True when `id` exists and hangs off the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.slots.get(&current).and_then(|slot| slot.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.slots.get(&id).map(|slot| &slot.data)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.data(id)? {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.slots.get_mut(&id)?.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id)? {
            NodeData::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn text_mut(&mut self, id: NodeId) -> Option<&mut String> {
        match &mut self.slots.get_mut(&id)?.data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.text(id).is_some()
    }

    /// Block-level element per the tag tables.
    pub fn is_block(&self, id: NodeId) -> bool {
        self.tag(id).is_some_and(tags::is_block)
    }

    pub fn is_void(&self, id: NodeId) -> bool {
        self.tag(id).is_some_and(tags::is_void)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots.get(&id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.slots
            .get(&id)
            .map(|slot| slot.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&child| child == id)
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn following_siblings(&self, id: NodeId) -> Vec<NodeId> {
        match (self.parent(id), self.index_in_parent(id)) {
            (Some(parent), Some(index)) => self.children(parent)[index + 1..].to_vec(),
            _ => Vec::new(),
        }
    }

    pub fn preceding_siblings(&self, id: NodeId) -> Vec<NodeId> {
        match (self.parent(id), self.index_in_parent(id)) {
            (Some(parent), Some(index)) => self.children(parent)[..index].to_vec(),
            _ => Vec::new(),
        }
    }

    pub fn create_element(&mut self, element: ElementData) -> NodeId {
        self.alloc(NodeData::Element(element))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Comment(text.into()))
    }

    /// Detaches `id` from its parent, leaving the subtree alive.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(slot) = self.slots.get_mut(&parent) {
            slot.children.retain(|&child| child != id);
        }
        if let Some(slot) = self.slots.get_mut(&id) {
            slot.parent = None;
        }
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if parent == child || !self.contains(parent) || !self.contains(child) {
            return;
        }
        if self.is_ancestor(child, parent) {
            return;
        }
        self.detach(child);
        if let Some(slot) = self.slots.get_mut(&parent) {
            let index = index.min(slot.children.len());
            slot.children.insert(index, child);
        }
        if let Some(slot) = self.slots.get_mut(&child) {
            slot.parent = Some(parent);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_child(parent, usize::MAX, child);
    }

    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) {
        if reference == child {
            return;
        }
        self.detach(child);
        if let (Some(parent), Some(index)) =
            (self.parent(reference), self.index_in_parent(reference))
        {
            self.insert_child(parent, index, child);
        }
    }

    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) {
        if reference == child {
            return;
        }
        self.detach(child);
        if let (Some(parent), Some(index)) =
            (self.parent(reference), self.index_in_parent(reference))
        {
            self.insert_child(parent, index + 1, child);
        }
    }

    /// Detaches and frees the whole subtree under `id`.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(slot) = self.slots.remove(&next) {
                stack.extend(slot.children);
            }
        }
    }

    pub fn clear_children(&mut self, id: NodeId) {
        for child in self.children(id).to_vec() {
            self.remove(child);
        }
    }

    /// Changes an element's tag, keeping its id, attributes and children.
    pub fn rename(&mut self, id: NodeId, tag: &str) -> bool {
        match self.element_mut(id) {
            Some(el) => {
                el.tag = tag.to_ascii_lowercase();
                true
            }
            None => false,
        }
    }

    /// Wraps `id` in a freshly created element placed where `id` was.
    pub fn wrap(&mut self, id: NodeId, element: ElementData) -> Option<NodeId> {
        self.parent(id)?;
        let wrapper = self.create_element(element);
        self.insert_before(id, wrapper);
        self.append_child(wrapper, id);
        Some(wrapper)
    }

    /// Replaces element `id` with its children.
    pub fn unwrap(&mut self, id: NodeId) -> Vec<NodeId> {
        if self.parent(id).is_none() || id == self.root {
            return Vec::new();
        }
        let children = self.children(id).to_vec();
        for &child in &children {
            self.insert_before(id, child);
        }
        self.remove(id);
        children
    }

    /// Copy of a node without its children, under a new id.
    pub fn shallow_clone(&mut self, id: NodeId) -> Option<NodeId> {
        let data = match self.data(id)? {
            NodeData::Root => return None,
            other => other.clone(),
        };
        Some(self.alloc(data))
    }

    /// Splits a text node at a byte offset (clamped to a char boundary). The
    /// original keeps the left part; the returned node holds the right part
    /// and is inserted right after it, even when that part is empty.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Option<NodeId> {
        self.parent(id)?;
        let text = self.text_mut(id)?;
        let at = clamp_to_char_boundary(text, offset);
        let right = text.split_off(at);
        let right = self.create_text(right);
        self.insert_after(id, right);
        Some(right)
    }

    /// Moves everything after `node` within `top` into a shallow clone chain
    /// inserted after `top`. Returns the clone of `top`, or `None` when
    /// nothing followed `node`.
    pub fn split_after(&mut self, top: NodeId, node: NodeId) -> Option<NodeId> {
        if top == self.root || !self.is_ancestor(top, node) {
            return None;
        }
        let mut current = node;
        let mut carry: Option<NodeId> = None;
        loop {
            let parent = self.parent(current)?;
            let following = self.following_siblings(current);
            let clone = if carry.is_some() || !following.is_empty() {
                let clone = self.shallow_clone(parent)?;
                if let Some(carried) = carry {
                    self.append_child(clone, carried);
                }
                for sibling in following {
                    self.append_child(clone, sibling);
                }
                Some(clone)
            } else {
                None
            };
            if parent == top {
                if let Some(clone) = clone {
                    self.insert_after(top, clone);
                }
                return clone;
            }
            carry = clone;
            current = parent;
        }
    }

    /// Mirror of [`Dom::split_after`]: content before `node` moves into a
    /// clone chain inserted before `top`.
    pub fn split_before(&mut self, top: NodeId, node: NodeId) -> Option<NodeId> {
        if top == self.root || !self.is_ancestor(top, node) {
            return None;
        }
        let mut current = node;
        let mut carry: Option<NodeId> = None;
        loop {
            let parent = self.parent(current)?;
            let preceding = self.preceding_siblings(current);
            let clone = if carry.is_some() || !preceding.is_empty() {
                let clone = self.shallow_clone(parent)?;
                for sibling in preceding {
                    self.append_child(clone, sibling);
                }
                if let Some(carried) = carry {
                    self.append_child(clone, carried);
                }
                Some(clone)
            } else {
                None
            };
            if parent == top {
                if let Some(clone) = clone {
                    self.insert_before(top, clone);
                }
                return clone;
            }
            carry = clone;
            current = parent;
        }
    }

    /// Leaves `top` holding only the ancestor chain of `node`.
    pub fn split_around(&mut self, top: NodeId, node: NodeId) -> (Option<NodeId>, Option<NodeId>) {
        let before = self.split_before(top, node);
        let after = self.split_after(top, node);
        (before, after)
    }

    /// Strict ancestry check.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Ancestors from the parent upwards, root included when attached.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            out.push(parent);
            current = self.parent(parent);
        }
        out
    }

    /// Nearest ancestor-or-self satisfying `predicate`.
    pub fn closest(&self, id: NodeId, predicate: impl Fn(&Dom, NodeId) -> bool) -> Option<NodeId> {
        if predicate(self, id) {
            return Some(id);
        }
        self.ancestors(id)
            .into_iter()
            .find(|&ancestor| predicate(self, ancestor))
    }

    pub fn closest_tag(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.closest(id, |dom, node| dom.is_tag(node, tag))
    }

    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let mut chain_a = self.ancestors(a);
        chain_a.insert(0, a);
        if b == a || chain_a.contains(&b) {
            return Some(b);
        }
        self.ancestors(b)
            .into_iter()
            .find(|ancestor| chain_a.contains(ancestor))
    }

    /// Pre-order walk of the subtree under `id`, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Childless descendants of `id` in document order.
    pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&node| self.children(node).is_empty())
            .collect()
    }

    /// Leaves of the document from `from` to `to`, both inclusive.
    pub fn leaves_between(&self, from: NodeId, to: NodeId) -> Vec<NodeId> {
        let leaves = self.leaves(self.root);
        let start = leaves.iter().position(|&leaf| leaf == from);
        let end = leaves.iter().position(|&leaf| leaf == to);
        match (start, end) {
            (Some(start), Some(end)) if start <= end => leaves[start..=end].to_vec(),
            (Some(start), Some(end)) => leaves[end..=start].to_vec(),
            _ => Vec::new(),
        }
    }

    pub fn first_text(&self, id: NodeId) -> Option<NodeId> {
        if self.is_text(id) {
            return Some(id);
        }
        self.descendants(id)
            .into_iter()
            .find(|&node| self.is_text(node))
    }

    pub fn last_text(&self, id: NodeId) -> Option<NodeId> {
        if self.is_text(id) {
            return Some(id);
        }
        self.descendants(id)
            .into_iter()
            .rev()
            .find(|&node| self.is_text(node))
    }

    /// Child indices from the root down to `id`.
    pub fn path(&self, id: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(index) = self.index_in_parent(current) {
            path.push(index);
            match self.parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        path.reverse();
        path
    }

    /// Document order; an ancestor sorts before its descendants.
    pub fn compare(&self, a: NodeId, b: NodeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        self.path(a).cmp(&self.path(b))
    }

    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|node| self.text(node))
            .collect()
    }

    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&node| self.is_tag(node, tag))
            .collect()
    }

    pub fn find_by_attr(&self, name: &str, value: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&node| self.element(node).and_then(|el| el.attr(name)) == Some(value))
    }

    /// No visible text and no media anywhere underneath.
    pub fn is_blank(&self, id: NodeId) -> bool {
        self.descendants(id).into_iter().all(|node| match self.data(node) {
            Some(NodeData::Text(text)) => text.is_empty(),
            Some(NodeData::Element(el)) => !(tags::is_media(&el.tag) || el.tag == "br"),
            _ => true,
        })
    }
}

pub fn clamp_to_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}
