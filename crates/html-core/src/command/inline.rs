use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::edit::{isolate_text_segments, segments_selection};
use crate::command::{
    CommandContext, CommandError, CommandOutcome, CommandPlugin, CommandSpec, QueryContext,
    QuerySpec,
};
use crate::dom::{Dom, ElementData, NodeId};
use crate::selection::Point;
use crate::tags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    Bold,
    Italic,
    Underline,
    StrikeThrough,
    Code,
}

impl Format {
    pub const ALL: [Format; 5] = [
        Format::Bold,
        Format::Italic,
        Format::Underline,
        Format::StrikeThrough,
        Format::Code,
    ];

    pub fn command(self) -> &'static str {
        match self {
            Format::Bold => "bold",
            Format::Italic => "italic",
            Format::Underline => "underline",
            Format::StrikeThrough => "strikeThrough",
            Format::Code => "code",
        }
    }

    /// Tag used when applying the format.
    pub fn tag(self) -> &'static str {
        match self {
            Format::Bold => "b",
            Format::Italic => "i",
            Format::Underline => "u",
            Format::StrikeThrough => "s",
            Format::Code => "code",
        }
    }

    fn matches_tag(self, tag: &str) -> bool {
        match self {
            Format::Bold => matches!(tag, "b" | "strong"),
            Format::Italic => matches!(tag, "i" | "em"),
            Format::Underline => matches!(tag, "u" | "ins"),
            Format::StrikeThrough => matches!(tag, "s" | "strike" | "del"),
            Format::Code => matches!(tag, "code" | "tt"),
        }
    }

    fn matches_style(self, el: &ElementData) -> bool {
        match self {
            Format::Bold => el.style("font-weight").is_some_and(|weight| {
                matches!(weight.as_str(), "bold" | "bolder")
                    || weight.parse::<u32>().is_ok_and(|w| w >= 600)
            }),
            Format::Italic => el
                .style("font-style")
                .is_some_and(|style| matches!(style.as_str(), "italic" | "oblique")),
            Format::Underline => decoration(el).contains("underline"),
            Format::StrikeThrough => decoration(el).contains("line-through"),
            Format::Code => false,
        }
    }

    fn strip_style(self, el: &mut ElementData) {
        match self {
            Format::Bold => el.set_style("font-weight", None),
            Format::Italic => el.set_style("font-style", None),
            Format::Underline => strip_decoration(el, "underline"),
            Format::StrikeThrough => strip_decoration(el, "line-through"),
            Format::Code => {}
        }
    }
}

fn decoration(el: &ElementData) -> String {
    let mut value = el.style("text-decoration").unwrap_or_default();
    if let Some(line) = el.style("text-decoration-line") {
        value.push(' ');
        value.push_str(&line);
    }
    value
}

fn strip_decoration(el: &mut ElementData, token: &str) {
    for property in ["text-decoration", "text-decoration-line"] {
        let Some(value) = el.style(property) else {
            continue;
        };
        let rest: Vec<&str> = value.split_whitespace().filter(|t| *t != token).collect();
        let remaining = (!rest.is_empty() && rest != ["none"]).then(|| rest.join(" "));
        el.set_style(property, remaining.as_deref());
    }
}

fn element_has_format(el: &ElementData, format: Format) -> bool {
    format.matches_tag(&el.tag) || format.matches_style(el)
}

/// Inline elements from `node` (inclusive) up to the nearest block.
pub fn inline_ancestors(dom: &Dom, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut current = if dom.element(node).is_some() {
        Some(node)
    } else {
        dom.parent(node)
    };
    while let Some(id) = current {
        match dom.tag(id) {
            Some(tag) if !tags::is_block(tag) => out.push(id),
            _ => break,
        }
        current = dom.parent(id);
    }
    out
}

pub fn format_active(dom: &Dom, node: NodeId, format: Format) -> bool {
    inline_ancestors(dom, node)
        .into_iter()
        .filter_map(|id| dom.element(id))
        .any(|el| element_has_format(el, format))
}

/// Non-empty text nodes overlapping a range, without splitting anything.
/// Falls back to the start node when an endpoint is not a text position.
fn text_nodes_in_range(dom: &Dom, start: Point, end: Point) -> Vec<NodeId> {
    let len = |node: NodeId| dom.text(node).map(str::len).unwrap_or_default();
    if !dom.is_text(start.node) || !dom.is_text(end.node) {
        return Vec::new();
    }
    if start.node == end.node {
        return if start.offset < end.offset { vec![start.node] } else { Vec::new() };
    }
    let leaves = dom.leaves_between(start.node, end.node);
    let last = leaves.len().saturating_sub(1);
    leaves
        .into_iter()
        .enumerate()
        .filter(|&(index, node)| {
            (index != 0 || start.offset < len(node)) && (index != last || end.offset > 0)
        })
        .map(|(_, node)| node)
        .filter(|&node| len(node) > 0)
        .collect()
}

/// State of a format at the query position. A caret honours armed
/// overrides; a range is active only when all of its text is formatted.
pub fn format_state(ctx: &QueryContext<'_>, format: Format) -> bool {
    if let Some(caret) = ctx.caret {
        if let Some(on) = ctx.pending.get(caret, format) {
            return on;
        }
    }
    if let Some((start, end)) = ctx.range {
        let nodes = text_nodes_in_range(ctx.dom, start, end);
        if !nodes.is_empty() {
            return nodes.iter().all(|&node| format_active(ctx.dom, node, format));
        }
    }
    format_active(ctx.dom, ctx.node, format)
}

pub fn apply_format(dom: &mut Dom, text: NodeId, format: Format) {
    if format_active(dom, text, format) {
        return;
    }
    dom.wrap(text, ElementData::new(format.tag()));
}

/// Removes every source of `format` above `text`, splitting shared wrappers
/// so neighbouring text keeps its formatting.
pub fn remove_format(dom: &mut Dom, text: NodeId, format: Format) {
    for _ in 0..32 {
        let source = inline_ancestors(dom, text).into_iter().find(|&id| {
            dom.element(id)
                .is_some_and(|el| element_has_format(el, format))
        });
        let Some(source) = source else {
            return;
        };
        dom.split_around(source, text);
        let Some(el) = dom.element_mut(source) else {
            return;
        };
        if format.matches_tag(&el.tag) {
            if el.attrs.is_empty() {
                dom.unwrap(source);
            } else {
                el.tag = "span".to_string();
            }
        } else {
            format.strip_style(el);
            if el.tag == "span" && el.attrs.is_empty() {
                dom.unwrap(source);
            }
        }
    }
}

/// Toggles a format. A range is switched on unless all of it already has
/// the format; a collapsed caret only arms the format for the next typed text.
pub fn toggle_format(ctx: &mut CommandContext<'_>, format: Format) -> CommandOutcome {
    if ctx.is_collapsed() {
        let active = ctx
            .pending
            .get(ctx.start, format)
            .unwrap_or_else(|| format_active(ctx.dom, ctx.start.node, format));
        ctx.pending.set(ctx.start, format, !active);
        return CommandOutcome::unchanged().caret(ctx.start);
    }
    let segments = isolate_text_segments(ctx.dom, ctx.start, ctx.end);
    if segments.is_empty() {
        return CommandOutcome::unchanged();
    }
    let enable = !segments
        .iter()
        .all(|&segment| format_active(ctx.dom, segment, format));
    for &segment in &segments {
        if enable {
            apply_format(ctx.dom, segment, format);
        } else {
            remove_format(ctx.dom, segment, format);
        }
    }
    match segments_selection(ctx.dom, &segments) {
        Some(selection) => CommandOutcome::mutated().select(selection),
        None => CommandOutcome::mutated(),
    }
}

fn is_removable_formatting(dom: &Dom, id: NodeId) -> bool {
    dom.tag(id).is_some_and(tags::is_inline_format)
}

fn remove_all_formatting(dom: &mut Dom, text: NodeId) {
    for _ in 0..32 {
        let Some(wrapper) = inline_ancestors(dom, text)
            .into_iter()
            .find(|&id| is_removable_formatting(dom, id))
        else {
            return;
        };
        dom.split_around(wrapper, text);
        dom.unwrap(wrapper);
    }
}

/// Sets one style property on each segment through a `<span>`, reusing a
/// span that already owns the property.
fn apply_inline_style(dom: &mut Dom, segments: &[NodeId], property: &str, value: &str) {
    for &segment in segments {
        let owner = inline_ancestors(dom, segment).into_iter().find(|&id| {
            dom.element(id)
                .is_some_and(|el| el.tag == "span" && el.style(property).is_some())
        });
        let target = match owner {
            Some(span) => {
                dom.split_around(span, segment);
                Some(span)
            }
            None => dom.wrap(segment, ElementData::new("span")),
        };
        if let Some(el) = target.and_then(|id| dom.element_mut(id)) {
            el.set_style(property, Some(value));
        }
    }
}

fn style_at(dom: &Dom, node: NodeId, property: &str) -> Option<String> {
    inline_ancestors(dom, node)
        .into_iter()
        .filter_map(|id| dom.element(id))
        .find_map(|el| {
            el.style(property).or_else(|| {
                (property == "color" && el.tag == "font")
                    .then(|| el.attr("color").map(str::to_string))
                    .flatten()
            })
        })
}

/// Accepts `#rgb`/`#rrggbb` hex, `rgb()`/`rgba()` and plain color keywords.
fn validate_color(value: Option<&str>) -> Result<String, CommandError> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CommandError::new("Missing color"))?;
    let hex_ok = value
        .strip_prefix('#')
        .is_some_and(|hex| {
            matches!(hex.len(), 3 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit())
        });
    let func_ok = (value.starts_with("rgb(") || value.starts_with("rgba(")) && value.ends_with(')');
    let keyword_ok = value.chars().all(|c| c.is_ascii_alphabetic());
    if hex_ok || func_ok || keyword_ok {
        Ok(value.to_ascii_lowercase())
    } else {
        Err(CommandError::new(format!("Invalid color: {value}")))
    }
}

fn set_color(
    ctx: &mut CommandContext<'_>,
    property: &str,
    value: Option<&str>,
) -> Result<CommandOutcome, CommandError> {
    let color = validate_color(value)?;
    if ctx.is_collapsed() {
        return Ok(CommandOutcome::unchanged());
    }
    let segments = isolate_text_segments(ctx.dom, ctx.start, ctx.end);
    apply_inline_style(ctx.dom, &segments, property, &color);
    Ok(match segments_selection(ctx.dom, &segments) {
        Some(selection) => CommandOutcome::mutated().select(selection),
        None => CommandOutcome::unchanged(),
    })
}

pub(crate) struct InlineFormatPlugin;

impl CommandPlugin for InlineFormatPlugin {
    fn id(&self) -> &'static str {
        "inline.format"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        let mut commands: Vec<CommandSpec> = Format::ALL
            .into_iter()
            .map(|format| {
                let label = match format {
                    Format::Bold => "Bold",
                    Format::Italic => "Italic",
                    Format::Underline => "Underline",
                    Format::StrikeThrough => "Strikethrough",
                    Format::Code => "Inline code",
                };
                CommandSpec::new(format.command(), label, move |ctx, _value| {
                    Ok(toggle_format(ctx, format))
                })
                .description(format!(
                    "Toggle {} on the selection or caret.",
                    label.to_ascii_lowercase()
                ))
                .keywords([format.command(), format.tag(), "format"])
            })
            .collect();
        commands.push(
            CommandSpec::new("removeFormat", "Clear formatting", |ctx, _value| {
                ctx.pending.clear();
                if ctx.is_collapsed() {
                    return Ok(CommandOutcome::unchanged().caret(ctx.start));
                }
                let segments = isolate_text_segments(ctx.dom, ctx.start, ctx.end);
                for &segment in &segments {
                    remove_all_formatting(ctx.dom, segment);
                }
                Ok(match segments_selection(ctx.dom, &segments) {
                    Some(selection) => CommandOutcome::mutated().select(selection),
                    None => CommandOutcome::unchanged(),
                })
            })
            .description("Strip inline formatting from the selection.")
            .keywords(["clear", "remove", "format", "plain"]),
        );
        commands
    }

    fn queries(&self) -> Vec<QuerySpec> {
        Format::ALL
            .into_iter()
            .map(|format| QuerySpec::state(format.command(), move |ctx| format_state(ctx, format)))
            .collect()
    }
}

pub(crate) struct ColorPlugin;

impl CommandPlugin for ColorPlugin {
    fn id(&self) -> &'static str {
        "inline.color"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("foreColor", "Text color", |ctx, value| {
                set_color(ctx, "color", value)
            })
            .description("Set the text color of the selection.")
            .keywords(["color", "text", "foreground"])
            .value_example("#ff0000"),
            CommandSpec::new("hiliteColor", "Highlight color", |ctx, value| {
                set_color(ctx, "background-color", value)
            })
            .description("Set the background color of the selection.")
            .keywords(["highlight", "background", "color"])
            .value_example("#ffff00"),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("foreColor", |ctx, _value| {
                Ok(style_at(ctx.dom, ctx.node, "color").map_or(Value::Null, Value::String))
            }),
            QuerySpec::new("hiliteColor", |ctx, _value| {
                let color = style_at(ctx.dom, ctx.node, "background-color");
                Ok(color.map_or(Value::Null, Value::String))
            }),
        ]
    }
}

pub fn link_at(dom: &Dom, node: NodeId) -> Option<NodeId> {
    inline_ancestors(dom, node)
        .into_iter()
        .find(|&id| dom.is_tag(id, "a") && dom.element(id).is_some_and(|el| el.has_attr("href")))
}

pub(crate) struct LinkPlugin;

impl CommandPlugin for LinkPlugin {
    fn id(&self) -> &'static str {
        "inline.link"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("createLink", "Create link", |ctx, value| {
                let url = value
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| CommandError::new("Missing url"))?;
                if ctx.is_collapsed() {
                    let link = ctx.dom.create_element(ElementData::new("a").with_attr("href", url));
                    let label = ctx.dom.create_text(url);
                    ctx.dom.append_child(link, label);
                    let caret = crate::command::edit::insert_nodes(ctx.dom, ctx.start, vec![link]);
                    return Ok(CommandOutcome::mutated().caret(caret));
                }
                let segments = isolate_text_segments(ctx.dom, ctx.start, ctx.end);
                for &segment in &segments {
                    match link_at(ctx.dom, segment) {
                        Some(existing) => {
                            ctx.dom.split_around(existing, segment);
                            if let Some(el) = ctx.dom.element_mut(existing) {
                                el.set_attr("href", url);
                            }
                        }
                        None => {
                            ctx.dom.wrap(segment, ElementData::new("a").with_attr("href", url));
                        }
                    }
                }
                Ok(match segments_selection(ctx.dom, &segments) {
                    Some(selection) => CommandOutcome::mutated().select(selection),
                    None => CommandOutcome::unchanged(),
                })
            })
            .description("Turn the selection into a link.")
            .keywords(["link", "url", "anchor"])
            .value_example("https://example.com"),
            CommandSpec::new("unlink", "Remove link", |ctx, _value| {
                if ctx.is_collapsed() {
                    return Ok(match link_at(ctx.dom, ctx.start.node) {
                        Some(link) => {
                            ctx.dom.unwrap(link);
                            CommandOutcome::mutated()
                        }
                        None => CommandOutcome::unchanged(),
                    });
                }
                let segments = isolate_text_segments(ctx.dom, ctx.start, ctx.end);
                let mut mutated = false;
                for &segment in &segments {
                    if let Some(link) = link_at(ctx.dom, segment) {
                        ctx.dom.split_around(link, segment);
                        ctx.dom.unwrap(link);
                        mutated = true;
                    }
                }
                Ok(match (mutated, segments_selection(ctx.dom, &segments)) {
                    (true, Some(selection)) => CommandOutcome::mutated().select(selection),
                    (true, None) => CommandOutcome::mutated(),
                    _ => CommandOutcome::unchanged(),
                })
            })
            .description("Remove links touching the selection.")
            .keywords(["unlink", "link", "remove"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::state("createLink", |ctx| link_at(ctx.dom, ctx.node).is_some()),
            QuerySpec::new("link.href", |ctx, _value| {
                Ok(link_at(ctx.dom, ctx.node)
                    .and_then(|link| ctx.dom.element(link))
                    .and_then(|el| el.attr("href"))
                    .map_or(Value::Null, |href| Value::String(href.to_string())))
            }),
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
    fn styled_spans_count_as_formatting() {
        let dom = parse("<p><span style=\"font-weight: 700\">x</span></p>");
        let text = dom.first_text(dom.root()).unwrap();
        assert!(format_active(&dom, text, Format::Bold));
        assert!(!format_active(&dom, text, Format::Italic));
    }

    #[test]
    fn activity_stops_at_the_enclosing_block() {
        let dom = parse("<b><p>x</p></b>");
        let text = dom.first_text(dom.root()).unwrap();
        assert!(!format_active(&dom, text, Format::Bold));
    }

    #[test]
    fn remove_splits_the_shared_wrapper() {
        let mut dom = parse("<p><b>abc</b></p>");
        let text = dom.first_text(dom.root()).unwrap();
        let right = dom.split_text(text, 2).unwrap();
        let middle = dom.split_text(text, 1).unwrap();
        remove_format(&mut dom, middle, Format::Bold);
        assert_eq!(
            html::serialize_children(&dom, dom.root()),
            "<p><b>a</b>b<b>c</b></p>"
        );
        assert!(format_active(&dom, right, Format::Bold));
    }

    #[test]
    fn remove_strips_only_the_matching_decoration() {
        let mut dom =
            parse("<p><span style=\"text-decoration: underline line-through\">x</span></p>");
        let text = dom.first_text(dom.root()).unwrap();
        remove_format(&mut dom, text, Format::StrikeThrough);
        assert!(format_active(&dom, text, Format::Underline));
        assert!(!format_active(&dom, text, Format::StrikeThrough));
    }

    #[test]
    fn colors_are_validated() {
        assert!(validate_color(Some("#ff0000")).is_ok());
        assert!(validate_color(Some("Red")).is_ok());
        assert!(validate_color(Some("url(javascript:x)")).is_err());
        assert!(validate_color(None).is_err());
    }
}
