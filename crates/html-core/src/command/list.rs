use crate::command::edit::blocks_in_range;
use crate::command::{CommandContext, CommandOutcome, CommandPlugin, CommandSpec, QuerySpec};
use crate::dom::{Dom, ElementData, NodeId};
use crate::tags;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    pub fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }

    fn command(self) -> &'static str {
        match self {
            ListKind::Unordered => "insertUnorderedList",
            ListKind::Ordered => "insertOrderedList",
        }
    }
}

fn list_of(dom: &Dom, item: NodeId) -> Option<NodeId> {
    if !dom.is_tag(item, "li") {
        return None;
    }
    dom.parent(item)
        .filter(|&parent| dom.tag(parent).is_some_and(tags::is_list))
}

/// Kind of list the node sits in, judged by its nearest list item.
pub fn active_list(dom: &Dom, node: NodeId) -> Option<ListKind> {
    let item = dom.closest_tag(node, "li")?;
    let list = list_of(dom, item)?;
    match dom.tag(list)? {
        "ol" => Some(ListKind::Ordered),
        _ => Some(ListKind::Unordered),
    }
}

fn unwrap_items(dom: &mut Dom, items: &[NodeId]) {
    for &item in items {
        let Some(list) = list_of(dom, item) else {
            continue;
        };
        dom.split_around(list, item);
        dom.rename(item, "p");
        dom.unwrap(list);
    }
}

fn convert_to_items(dom: &mut Dom, blocks: &[NodeId], kind: ListKind) {
    let mut items = Vec::new();
    for &block in blocks {
        if let Some(list) = list_of(dom, block) {
            if !dom.is_tag(list, kind.tag()) {
                dom.rename(list, kind.tag());
            }
            continue;
        }
        let item = match dom.tag(block) {
            Some("p" | "div") => {
                dom.rename(block, "li");
                Some(block)
            }
            Some(tag) if tags::is_renamable_block(tag) => dom.wrap(block, ElementData::new("li")),
            _ => {
                let item = dom.create_element(ElementData::new("li"));
                for child in dom.children(block).to_vec() {
                    dom.append_child(item, child);
                }
                dom.append_child(block, item);
                Some(item)
            }
        };
        items.extend(item);
    }

    for item in items {
        if list_of(dom, item).is_some() {
            continue;
        }
        let previous = dom.prev_sibling(item).filter(|&prev| dom.is_tag(prev, kind.tag()));
        match previous {
            Some(list) => dom.append_child(list, item),
            None => {
                let list = dom.create_element(ElementData::new(kind.tag()));
                dom.insert_before(item, list);
                dom.append_child(list, item);
            }
        }
    }
}

/// Converts the touched blocks into list items, or back into paragraphs when
/// they already all sit in a list of this kind.
fn toggle_list(ctx: &mut CommandContext<'_>, kind: ListKind) -> CommandOutcome {
    let blocks = blocks_in_range(ctx.dom, ctx.start, ctx.end);
    if blocks.is_empty() {
        return CommandOutcome::unchanged();
    }
    let all_listed = blocks.iter().all(|&block| {
        list_of(ctx.dom, block).is_some_and(|list| ctx.dom.is_tag(list, kind.tag()))
    });
    if all_listed {
        unwrap_items(ctx.dom, &blocks);
    } else {
        convert_to_items(ctx.dom, &blocks, kind);
    }
    CommandOutcome::mutated()
}

pub(crate) struct ListPlugin;

impl CommandPlugin for ListPlugin {
    fn id(&self) -> &'static str {
        "list"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        [
            (ListKind::Unordered, "Bulleted list"),
            (ListKind::Ordered, "Numbered list"),
        ]
        .into_iter()
        .map(|(kind, label)| {
            CommandSpec::new(kind.command(), label, move |ctx, _value| Ok(toggle_list(ctx, kind)))
                .description(format!(
                    "Toggle a {} for the active block(s).",
                    label.to_ascii_lowercase()
                ))
                .keywords(["list", kind.tag(), "bullet", "number"])
        })
        .collect()
    }

    fn queries(&self) -> Vec<QuerySpec> {
        [ListKind::Unordered, ListKind::Ordered]
            .into_iter()
            .map(|kind| {
                QuerySpec::state(kind.command(), move |ctx| {
                    active_list(ctx.dom, ctx.node) == Some(kind)
                })
            })
            .collect()
    }
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

    fn markup(dom: &Dom) -> String {
        html::serialize_children(dom, dom.root())
    }

    #[test]
    fn paragraphs_become_one_list() {
        let mut dom = parse("<p>a</p><p>b</p><p>c</p>");
        let paragraphs = dom.elements_by_tag("p");
        convert_to_items(&mut dom, &paragraphs[..2], ListKind::Unordered);
        assert_eq!(markup(&dom), "<ul><li>a</li><li>b</li></ul><p>c</p>");
    }

    #[test]
    fn unwrapping_a_middle_item_splits_the_list() {
        let mut dom = parse("<ol><li>a</li><li>b</li><li>c</li></ol>");
        let middle = dom.elements_by_tag("li")[1];
        unwrap_items(&mut dom, &[middle]);
        assert_eq!(markup(&dom), "<ol><li>a</li></ol><p>b</p><ol><li>c</li></ol>");
    }

    #[test]
    fn other_list_kind_is_switched_in_place() {
        let mut dom = parse("<ol><li>a</li></ol>");
        let items = dom.elements_by_tag("li");
        convert_to_items(&mut dom, &items, ListKind::Unordered);
        assert_eq!(markup(&dom), "<ul><li>a</li></ul>");
        let text = dom.first_text(dom.root()).unwrap();
        assert_eq!(active_list(&dom, text), Some(ListKind::Unordered));
    }
}
