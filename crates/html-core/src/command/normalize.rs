use crate::command::CommandPlugin;
use crate::dom::{Dom, NodeId};
use crate::tags;

/// A cleanup run after every successful command. Passes must leave the
/// nodes in `keep` attached.
pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, dom: &mut Dom, keep: &[NodeId]);
}

pub(crate) struct NormalizePlugin;

impl CommandPlugin for NormalizePlugin {
    fn id(&self) -> &'static str {
        "normalize"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(RemoveEmptyInline), Box::new(MergeAdjacentWrappers)]
    }
}

/// Drops inline formatting elements left without content by splits.
struct RemoveEmptyInline;

impl NormalizePass for RemoveEmptyInline {
    fn id(&self) -> &'static str {
        "normalize.remove_empty_inline"
    }

    fn run(&self, dom: &mut Dom, keep: &[NodeId]) {
        let candidates: Vec<NodeId> = dom
            .descendants(dom.root())
            .into_iter()
            .rev()
            .filter(|&node| {
                dom.element(node).is_some_and(|el| {
                    (tags::is_inline_format(&el.tag) || el.tag == "a")
                        && !el.has_attr("class")
                        && !el.has_attr("id")
                })
            })
            .collect();
        for node in candidates {
            if !dom.contains(node) || !dom.is_blank(node) {
                continue;
            }
            if keep.iter().any(|&k| k == node || dom.is_ancestor(node, k)) {
                continue;
            }
            dom.remove(node);
        }
    }
}

fn mergeable(tag: &str) -> bool {
    tags::is_inline_format(tag) || tags::is_list(tag) || matches!(tag, "a" | "blockquote")
}

/// Joins adjacent siblings with the same tag and attributes, so toggling a
/// format across neighbours leaves a single wrapper.
struct MergeAdjacentWrappers;

impl NormalizePass for MergeAdjacentWrappers {
    fn id(&self) -> &'static str {
        "normalize.merge_adjacent_wrappers"
    }

    fn run(&self, dom: &mut Dom, _keep: &[NodeId]) {
        let parents: Vec<NodeId> = std::iter::once(dom.root())
            .chain(dom.descendants(dom.root()))
            .filter(|&node| !dom.children(node).is_empty())
            .collect();
        for parent in parents {
            if !dom.contains(parent) {
                continue;
            }
            let mut index = 0;
            loop {
                let children = dom.children(parent);
                if index + 1 >= children.len() {
                    break;
                }
                let (left, right) = (children[index], children[index + 1]);
                let same = match (dom.element(left), dom.element(right)) {
                    (Some(a), Some(b)) => a == b && mergeable(&a.tag),
                    _ => false,
                };
                if same {
                    for child in dom.children(right).to_vec() {
                        dom.append_child(left, child);
                    }
                    dom.remove(right);
                } else {
                    index += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html;

    fn normalized(source: &str) -> String {
        let mut dom = Dom::new();
        let root = dom.root();
        html::parse_into(&mut dom, root, source);
        RemoveEmptyInline.run(&mut dom, &[]);
        MergeAdjacentWrappers.run(&mut dom, &[]);
        html::serialize_children(&dom, root)
    }

    #[test]
    fn merges_identical_neighbours() {
        assert_eq!(normalized("<p><b>a</b><b>b</b></p>"), "<p><b>ab</b></p>");
        assert_eq!(
            normalized("<ul><li>a</li></ul><ul><li>b</li></ul>"),
            "<ul><li>a</li><li>b</li></ul>"
        );
    }

    #[test]
    fn keeps_differently_attributed_neighbours() {
        assert_eq!(
            normalized("<p><a href=\"x\">a</a><a href=\"y\">b</a></p>"),
            "<p><a href=\"x\">a</a><a href=\"y\">b</a></p>"
        );
    }

    #[test]
    fn drops_empty_formatting() {
        assert_eq!(normalized("<p>a<b></b><i><u></u></i></p>"), "<p>a</p>");
        assert_eq!(normalized("<p><b><img src=\"x\"></b></p>"), "<p><b><img src=\"x\"></b></p>");
    }
}
