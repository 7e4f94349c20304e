use serde_json::Value;

use crate::command::edit::{blocks_in_range, closest_text_block, insert_nodes};
use crate::command::{
    CommandContext, CommandError, CommandOutcome, CommandPlugin, CommandSpec, QueryContext,
    QuerySpec,
};
use crate::dom::{Dom, ElementData, NodeId};
use crate::tags;

pub const INDENT_STEP_PX: u32 = 40;
pub const MAX_INDENT_LEVEL: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
    Justify,
}

impl Align {
    fn command(self) -> &'static str {
        match self {
            Align::Left => "justifyLeft",
            Align::Center => "justifyCenter",
            Align::Right => "justifyRight",
            Align::Justify => "justifyFull",
        }
    }

    /// Left is the default and is stored as no alignment at all.
    fn style_value(self) -> Option<&'static str> {
        match self {
            Align::Left => None,
            Align::Center => Some("center"),
            Align::Right => Some("right"),
            Align::Justify => Some("justify"),
        }
    }

    fn from_style(value: Option<&str>) -> Self {
        match value {
            Some("center") => Align::Center,
            Some("right" | "end") => Align::Right,
            Some("justify") => Align::Justify,
            _ => Align::Left,
        }
    }
}

fn block_align(dom: &Dom, block: NodeId) -> Align {
    let el = dom.element(block);
    let style = el.and_then(|el| el.style("text-align"));
    let legacy = el.and_then(|el| el.attr("align")).map(str::to_ascii_lowercase);
    Align::from_style(style.or(legacy).as_deref())
}

fn query_block(ctx: &QueryContext<'_>) -> Option<NodeId> {
    closest_text_block(ctx.dom, ctx.node)
}

fn set_align(ctx: &mut CommandContext<'_>, align: Align) -> CommandOutcome {
    let blocks = blocks_in_range(ctx.dom, ctx.start, ctx.end);
    for &block in &blocks {
        if let Some(el) = ctx.dom.element_mut(block) {
            el.remove_attr("align");
            el.set_style("text-align", align.style_value());
        }
    }
    if blocks.is_empty() {
        CommandOutcome::unchanged()
    } else {
        CommandOutcome::mutated()
    }
}

pub(crate) struct AlignPlugin;

impl CommandPlugin for AlignPlugin {
    fn id(&self) -> &'static str {
        "block.align"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        [
            (Align::Left, "Align left"),
            (Align::Center, "Align center"),
            (Align::Right, "Align right"),
            (Align::Justify, "Justify"),
        ]
        .into_iter()
        .map(|(align, label)| {
            CommandSpec::new(align.command(), label, move |ctx, _value| Ok(set_align(ctx, align)))
                .description("Set text alignment for the active block(s).")
                .keywords(["align", "alignment", "justify"])
        })
        .collect()
    }

    fn queries(&self) -> Vec<QuerySpec> {
        let mut queries: Vec<QuerySpec> = [Align::Left, Align::Center, Align::Right, Align::Justify]
            .into_iter()
            .map(|align| {
                QuerySpec::state(align.command(), move |ctx| {
                    let current =
                        query_block(ctx).map_or(Align::Left, |block| block_align(ctx.dom, block));
                    current == align
                })
            })
            .collect();
        queries.push(QuerySpec::new("block.align", |ctx, _value| {
            let align = query_block(ctx).map_or(Align::Left, |block| block_align(ctx.dom, block));
            let name = match align {
                Align::Left => "left",
                Align::Center => "center",
                Align::Right => "right",
                Align::Justify => "justify",
            };
            Ok(Value::String(name.to_string()))
        }));
        queries
    }
}

fn indent_level(dom: &Dom, block: NodeId) -> u32 {
    dom.element(block)
        .and_then(|el| el.style("margin-left"))
        .and_then(|margin| margin.trim_end_matches("px").trim().parse::<f32>().ok())
        .map(|px| (px.max(0.0) / INDENT_STEP_PX as f32).round() as u32)
        .unwrap_or(0)
        .min(MAX_INDENT_LEVEL)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndentDirection {
    Increase,
    Decrease,
}

fn adjust_indent(ctx: &mut CommandContext<'_>, direction: IndentDirection) -> CommandOutcome {
    let blocks = blocks_in_range(ctx.dom, ctx.start, ctx.end);
    let mut changed = false;
    for block in blocks {
        let current = indent_level(ctx.dom, block);
        let next = match direction {
            IndentDirection::Increase => (current + 1).min(MAX_INDENT_LEVEL),
            IndentDirection::Decrease => current.saturating_sub(1),
        };
        if next == current {
            continue;
        }
        let value = (next > 0).then(|| format!("{}px", next * INDENT_STEP_PX));
        if let Some(el) = ctx.dom.element_mut(block) {
            el.set_style("margin-left", value.as_deref());
            changed = true;
        }
    }
    if changed {
        CommandOutcome::mutated()
    } else {
        CommandOutcome::unchanged()
    }
}

pub(crate) struct IndentPlugin;

impl CommandPlugin for IndentPlugin {
    fn id(&self) -> &'static str {
        "block.indent"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("indent", "Increase indent", |ctx, _value| {
                Ok(adjust_indent(ctx, IndentDirection::Increase))
            })
            .description("Increase indent level for the active block(s).")
            .keywords(["indent", "tab", "increase"]),
            CommandSpec::new("outdent", "Decrease indent", |ctx, _value| {
                Ok(adjust_indent(ctx, IndentDirection::Decrease))
            })
            .description("Decrease indent level for the active block(s).")
            .keywords(["indent", "outdent", "decrease"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("block.indent_level", |ctx, _value| {
            let level = query_block(ctx).map_or(0, |block| indent_level(ctx.dom, block));
            Ok(Value::from(level))
        })]
    }
}

const FORMAT_BLOCK_TAGS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "pre", "address", "blockquote",
];

fn parse_block_tag(value: Option<&str>) -> Result<String, CommandError> {
    let tag = value
        .map(|v| v.trim().trim_start_matches('<').trim_end_matches('>').to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CommandError::new("Missing block tag"))?;
    if FORMAT_BLOCK_TAGS.contains(&tag.as_str()) {
        Ok(tag)
    } else {
        Err(CommandError::new(format!("Unsupported block tag: {tag}")))
    }
}

/// Moves the children of `block` into a new `tag` element inside it.
fn wrap_contents(dom: &mut Dom, block: NodeId, tag: &str) {
    let inner = dom.create_element(ElementData::new(tag));
    for child in dom.children(block).to_vec() {
        dom.append_child(inner, child);
    }
    dom.append_child(block, inner);
}

fn set_block_type(dom: &mut Dom, blocks: &[NodeId], tag: &str) {
    for &block in blocks {
        match dom.tag(block) {
            Some(current) if current == tag => {}
            Some(current) if tags::is_renamable_block(current) => {
                dom.rename(block, tag);
            }
            _ => wrap_contents(dom, block, tag),
        }
    }
}

/// Wraps the smallest run of siblings covering `blocks` in a new element.
/// Lists and tables are wrapped whole.
fn wrap_blocks(dom: &mut Dom, blocks: &[NodeId], tag: &str) -> Option<NodeId> {
    let first = *blocks.first()?;
    let last = *blocks.last()?;
    let mut container = if first == last {
        dom.parent(first)?
    } else {
        dom.common_ancestor(first, last)?
    };
    if container == first || container == last {
        container = dom.parent(container)?;
    }
    while container != dom.root()
        && dom
            .tag(container)
            .is_some_and(|t| tags::is_container(t) || t == "li")
    {
        container = dom.parent(container)?;
    }
    let unit = |dom: &Dom, node: NodeId| {
        if dom.parent(node) == Some(container) {
            return Some(node);
        }
        dom.ancestors(node)
            .into_iter()
            .find(|&a| dom.parent(a) == Some(container))
    };
    let from = unit(dom, first)?;
    let to = unit(dom, last)?;
    let siblings = dom.children(container).to_vec();
    let lo = siblings.iter().position(|&id| id == from)?;
    let hi = siblings.iter().position(|&id| id == to)?;
    let wrapper = dom.create_element(ElementData::new(tag));
    dom.insert_before(from, wrapper);
    for &node in &siblings[lo..=hi] {
        dom.append_child(wrapper, node);
    }
    Some(wrapper)
}

fn toggle_blockquote(ctx: &mut CommandContext<'_>) -> CommandOutcome {
    let blocks = blocks_in_range(ctx.dom, ctx.start, ctx.end);
    let Some(&first) = blocks.first() else {
        return CommandOutcome::unchanged();
    };
    if let Some(quote) = ctx.dom.closest_tag(first, "blockquote") {
        ctx.dom.unwrap(quote);
        return CommandOutcome::mutated();
    }
    match wrap_blocks(ctx.dom, &blocks, "blockquote") {
        Some(_) => CommandOutcome::mutated(),
        None => CommandOutcome::unchanged(),
    }
}

fn toggle_code_block(ctx: &mut CommandContext<'_>) -> CommandOutcome {
    let blocks = blocks_in_range(ctx.dom, ctx.start, ctx.end);
    if blocks.is_empty() {
        return CommandOutcome::unchanged();
    }
    let all_code = blocks.iter().all(|&block| {
        ctx.dom.is_tag(block, "pre") || ctx.dom.closest_tag(block, "pre").is_some()
    });
    if all_code {
        for &block in &blocks {
            if let Some(pre) = ctx.dom.closest_tag(block, "pre") {
                ctx.dom.rename(pre, "p");
            }
        }
    } else {
        set_block_type(ctx.dom, &blocks, "pre");
    }
    CommandOutcome::mutated()
}

pub(crate) struct BlockFormatPlugin;

impl CommandPlugin for BlockFormatPlugin {
    fn id(&self) -> &'static str {
        "block.format"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("formatBlock", "Block type", |ctx, value| {
                let tag = parse_block_tag(value)?;
                if tag == "blockquote" {
                    return Ok(toggle_blockquote(ctx));
                }
                let blocks = blocks_in_range(ctx.dom, ctx.start, ctx.end);
                set_block_type(ctx.dom, &blocks, &tag);
                Ok(CommandOutcome::mutated())
            })
            .description(
                "Change the active block(s) to a paragraph, heading or preformatted block.",
            )
            .keywords(["heading", "paragraph", "block", "h1", "h2", "h3"])
            .value_example("h2"),
            CommandSpec::new("blockquote", "Quote", |ctx, _value| Ok(toggle_blockquote(ctx)))
                .description("Wrap the active block(s) in a quote, or unwrap the enclosing quote.")
                .keywords(["quote", "blockquote", "citation"]),
            CommandSpec::new("codeBlock", "Code block", |ctx, _value| Ok(toggle_code_block(ctx)))
                .description("Toggle a preformatted code block.")
                .keywords(["code", "pre", "monospace"]),
            CommandSpec::new("insertHorizontalRule", "Horizontal rule", |ctx, _value| {
                let rule = ctx.dom.create_element(ElementData::new("hr"));
                let caret = if ctx.is_collapsed() {
                    ctx.start
                } else {
                    crate::command::edit::delete_range(ctx.dom, ctx.start, ctx.end)
                };
                let caret = insert_nodes(ctx.dom, caret, vec![rule]);
                Ok(CommandOutcome::mutated().caret(caret))
            })
            .description("Insert a divider and continue in a new paragraph.")
            .keywords(["hr", "divider", "rule", "separator"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("formatBlock", |ctx, _value| {
                Ok(query_block(ctx)
                    .and_then(|block| ctx.dom.tag(block))
                    .map_or(Value::Null, |tag| Value::String(tag.to_string())))
            }),
            QuerySpec::state("blockquote", |ctx| {
                ctx.dom.closest_tag(ctx.node, "blockquote").is_some()
            }),
            QuerySpec::state("codeBlock", |ctx| ctx.dom.closest_tag(ctx.node, "pre").is_some()),
        ]
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

    #[test]
    fn indent_level_reads_margin_steps() {
        let dom = parse(
            "<p style=\"margin-left: 80px;\">x</p><p style=\"margin-left: 9999px\">y</p>",
        );
        let paragraphs = dom.elements_by_tag("p");
        assert_eq!(indent_level(&dom, paragraphs[0]), 2);
        assert_eq!(indent_level(&dom, paragraphs[1]), MAX_INDENT_LEVEL);
    }

    #[test]
    fn legacy_align_attribute_is_read() {
        let dom = parse("<p align=\"CENTER\">x</p>");
        let p = dom.elements_by_tag("p")[0];
        assert_eq!(block_align(&dom, p), Align::Center);
    }

    #[test]
    fn wrap_blocks_wraps_whole_lists() {
        let mut dom = parse("<ul><li>a</li><li>b</li></ul>");
        let items = dom.elements_by_tag("li");
        wrap_blocks(&mut dom, &items, "blockquote");
        assert_eq!(
            html::serialize_children(&dom, dom.root()),
            "<blockquote><ul><li>a</li><li>b</li></ul></blockquote>"
        );
    }

    #[test]
    fn block_tag_values_accept_angle_brackets() {
        assert_eq!(parse_block_tag(Some("<H2>")).unwrap(), "h2");
        assert!(parse_block_tag(Some("script")).is_err());
    }
}
