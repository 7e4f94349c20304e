//! Lenient HTML fragment parsing and serialization.
//!
//! Parsing never fails: malformed markup is repaired the way browsers do it
//! for the cases an editor meets (implicit closes, stray end tags, unclosed
//! elements). Whitespace-only text between blocks is dropped on parse and
//! reintroduced only by the pretty printer, so pretty output re-parses to
//! the same tree.

use crate::dom::{Dom, ElementData, NodeData, NodeId};
use crate::tags;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(String),
    StartTag {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    EndTag(String),
    Comment(String),
}

struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
    raw_until: Option<String>,
}

impl<'a> Tokenizer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            raw_until: None,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn raw_text(&mut self, tag: String) -> Option<Token> {
        let rest = self.rest();
        let needle = format!("</{tag}");
        let end = rest.to_ascii_lowercase().find(&needle).unwrap_or(rest.len());
        self.pos += end;
        if end == 0 {
            return self.next();
        }
        let raw = &rest[..end];
        let text = if tags::is_escapable_raw_text(&tag) {
            decode_entities(raw)
        } else {
            raw.to_string()
        };
        Some(Token::Text(text))
    }

    fn text(&mut self) -> Token {
        let rest = self.rest();
        // The first byte is either plain text or a '<' that does not open markup.
        let skip = if rest.starts_with('<') { 1 } else { 0 };
        let end = rest[skip..].find('<').map(|i| i + skip).unwrap_or(rest.len());
        self.pos += end;
        Token::Text(decode_entities(&rest[..end]))
    }

    fn comment(&mut self) -> Token {
        let body = &self.rest()[4..];
        match body.find("-->") {
            Some(end) => {
                self.pos += 4 + end + 3;
                Token::Comment(body[..end].to_string())
            }
            None => {
                self.pos = self.src.len();
                Token::Comment(body.to_string())
            }
        }
    }

    fn end_tag(&mut self) -> Option<Token> {
        let rest = self.rest();
        let close = rest.find('>')?;
        let name: String = rest[2..close]
            .split(|c: char| c.is_ascii_whitespace() || c == '/')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        self.pos += close + 1;
        Some(Token::EndTag(name))
    }

    fn start_tag(&mut self) -> Option<Token> {
        let bytes = self.src.as_bytes();
        let mut pos = self.pos + 1;
        let name_start = pos;
        while pos < bytes.len() && !is_tag_delimiter(bytes[pos]) {
            pos += 1;
        }
        let name = self.src[name_start..pos].to_ascii_lowercase();
        let mut attrs: Vec<(String, String)> = Vec::new();
        let mut self_closing = false;
        loop {
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if pos >= bytes.len() {
                return None;
            }
            match bytes[pos] {
                b'>' => {
                    pos += 1;
                    break;
                }
                b'/' if bytes.get(pos + 1) == Some(&b'>') => {
                    self_closing = true;
                    pos += 2;
                    break;
                }
                b'/' => {
                    pos += 1;
                    continue;
                }
                _ => {}
            }
            let attr_start = pos;
            while pos < bytes.len() && !is_tag_delimiter(bytes[pos]) && bytes[pos] != b'=' {
                pos += 1;
            }
            if pos == attr_start {
                // A lone '=' with no name.
                pos += 1;
                continue;
            }
            let attr_name = self.src[attr_start..pos].to_ascii_lowercase();
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            let mut value = String::new();
            if bytes.get(pos) == Some(&b'=') {
                pos += 1;
                while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                    pos += 1;
                }
                match bytes.get(pos) {
                    Some(&quote @ (b'"' | b'\'')) => {
                        let value_start = pos + 1;
                        let len = self.src[value_start..].find(quote as char)?;
                        value = decode_entities(&self.src[value_start..value_start + len]);
                        pos = value_start + len + 1;
                    }
                    Some(_) => {
                        let value_start = pos;
                        while pos < bytes.len()
                            && !bytes[pos].is_ascii_whitespace()
                            && bytes[pos] != b'>'
                        {
                            pos += 1;
                        }
                        value = decode_entities(&self.src[value_start..pos]);
                    }
                    None => return None,
                }
            }
            if !attrs.iter().any(|(existing, _)| *existing == attr_name) {
                attrs.push((attr_name, value));
            }
        }
        self.pos = pos;
        if !self_closing && (tags::is_raw_text(&name) || tags::is_escapable_raw_text(&name)) {
            self.raw_until = Some(name.clone());
        }
        Some(Token::StartTag {
            name,
            attrs,
            self_closing,
        })
    }
}

fn is_tag_delimiter(byte: u8) -> bool {
    byte.is_ascii_whitespace() || byte == b'/' || byte == b'>'
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if let Some(tag) = self.raw_until.take() {
            return self.raw_text(tag);
        }
        let rest = self.rest();
        if rest.is_empty() {
            return None;
        }
        if !rest.starts_with('<') {
            return Some(self.text());
        }
        if rest.starts_with("<!--") {
            return Some(self.comment());
        }
        let second = rest.as_bytes().get(1).copied().unwrap_or_default();
        match second {
            b'!' | b'?' => {
                // Doctype and processing instructions carry no content.
                match rest.find('>') {
                    Some(end) => self.pos += end + 1,
                    None => self.pos = self.src.len(),
                }
                self.next()
            }
            b'/' if rest.as_bytes().get(2).is_some_and(u8::is_ascii_alphabetic) => {
                match self.end_tag() {
                    Some(token) => Some(token),
                    None => Some(self.text()),
                }
            }
            c if c.is_ascii_alphabetic() => {
                let start = self.pos;
                match self.start_tag() {
                    Some(token) => Some(token),
                    None => {
                        self.pos = start;
                        Some(self.text())
                    }
                }
            }
            _ => Some(self.text()),
        }
    }
}

const SCOPE_BOUNDARY: &[&str] = &["table", "td", "th", "caption", "template"];

/// Closes the nearest open element named in `targets` unless a boundary
/// element is reached first. `stack[0]` is the insertion parent and never closes.
fn close_open(dom: &Dom, stack: &mut Vec<NodeId>, targets: &[&str], boundaries: &[&str]) {
    for index in (1..stack.len()).rev() {
        let tag = dom.tag(stack[index]).unwrap_or_default();
        if targets.contains(&tag) {
            stack.truncate(index);
            return;
        }
        if boundaries.contains(&tag) || SCOPE_BOUNDARY.contains(&tag) {
            return;
        }
    }
}

fn close_implied(dom: &Dom, stack: &mut Vec<NodeId>, name: &str) {
    match name {
        "li" => close_open(dom, stack, &["li"], &["ul", "ol"]),
        "dt" | "dd" => close_open(dom, stack, &["dt", "dd"], &["dl"]),
        "tr" => close_open(dom, stack, &["tr"], &[]),
        "td" | "th" => close_open(dom, stack, &["td", "th"], &["tr"]),
        "thead" | "tbody" | "tfoot" => close_open(dom, stack, &["thead", "tbody", "tfoot"], &[]),
        _ => {}
    }
    if tags::is_block(name) {
        close_open(dom, stack, &["p"], &[]);
    }
}

fn append_text(dom: &mut Dom, parent: NodeId, text: String) {
    if text.is_empty() {
        return;
    }
    if let Some(last) = dom.last_child(parent) {
        if let Some(existing) = dom.text_mut(last) {
            existing.push_str(&text);
            return;
        }
    }
    let node = dom.create_text(text);
    dom.append_child(parent, node);
}

/// Parses `html` and appends the resulting nodes to `parent`.
pub fn parse_into(dom: &mut Dom, parent: NodeId, html: &str) {
    let mut stack: Vec<NodeId> = vec![parent];
    for token in Tokenizer::new(html) {
        let top = stack.last().copied().unwrap_or(parent);
        match token {
            Token::Text(text) => append_text(dom, top, text),
            Token::Comment(text) => {
                let node = dom.create_comment(text);
                dom.append_child(top, node);
            }
            Token::StartTag {
                name,
                attrs,
                self_closing,
            } => {
                close_implied(dom, &mut stack, &name);
                let top = stack.last().copied().unwrap_or(parent);
                let void = tags::is_void(&name);
                let node = dom.create_element(ElementData { tag: name, attrs });
                dom.append_child(top, node);
                if !void && !self_closing {
                    stack.push(node);
                }
            }
            Token::EndTag(name) => {
                let open = stack
                    .iter()
                    .skip(1)
                    .rposition(|&id| dom.is_tag(id, &name))
                    .map(|index| index + 1);
                if let Some(index) = open {
                    stack.truncate(index);
                } else if name == "br" {
                    // `</br>` is treated as a line break by browsers.
                    let node = dom.create_element(ElementData::new("br"));
                    dom.append_child(top, node);
                }
            }
        }
    }
    strip_insignificant_whitespace(dom, parent);
}

/// Parses `html` into detached top-level nodes.
pub fn parse_fragment(dom: &mut Dom, html: &str) -> Vec<NodeId> {
    let holder = dom.create_element(ElementData::new("template"));
    parse_into(dom, holder, html);
    let nodes = dom.children(holder).to_vec();
    for &node in &nodes {
        dom.detach(node);
    }
    dom.remove(holder);
    nodes
}

fn strip_insignificant_whitespace(dom: &mut Dom, parent: NodeId) {
    let mut scan = dom.descendants(parent);
    scan.retain(|&node| dom.is_text(node));
    let doomed: Vec<NodeId> = scan
        .into_iter()
        .filter(|&node| is_insignificant_whitespace(dom, node))
        .collect();
    for node in doomed {
        dom.remove(node);
    }
}

fn is_whitespace_text(dom: &Dom, node: NodeId) -> bool {
    dom.text(node)
        .is_some_and(|text| text.chars().all(|c| matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c')))
}

fn holds_flow(dom: &Dom, node: NodeId) -> bool {
    node == dom.root() || dom.tag(node).is_some_and(tags::is_flow_container)
}

/// Whitespace-only text inside a flow container whose nearest non-whitespace
/// neighbours on both sides are blocks or container edges.
pub fn is_insignificant_whitespace(dom: &Dom, node: NodeId) -> bool {
    if !is_whitespace_text(dom, node) {
        return false;
    }
    let Some(parent) = dom.parent(node) else {
        return false;
    };
    if !holds_flow(dom, parent) {
        return false;
    }
    let siblings = dom.children(parent);
    let Some(index) = siblings.iter().position(|&id| id == node) else {
        return false;
    };
    let edge_ok = |neighbour: Option<&NodeId>| match neighbour {
        None => true,
        Some(&id) => dom.is_block(id),
    };
    let before = siblings[..index]
        .iter()
        .rev()
        .find(|&&id| !is_whitespace_text(dom, id));
    let after = siblings[index + 1..]
        .iter()
        .find(|&&id| !is_whitespace_text(dom, id));
    edge_ok(before) && edge_ok(after)
}

const NAMED_ENTITIES: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
    ("copy", '©'),
    ("reg", '®'),
    ("trade", '™'),
    ("hellip", '…'),
    ("mdash", '—'),
    ("ndash", '–'),
    ("lsquo", '‘'),
    ("rsquo", '’'),
    ("ldquo", '“'),
    ("rdquo", '”'),
    ("laquo", '«'),
    ("raquo", '»'),
    ("bull", '•'),
    ("middot", '·'),
    ("times", '×'),
    ("divide", '÷'),
    ("euro", '€'),
    ("pound", '£'),
    ("yen", '¥'),
    ("cent", '¢'),
    ("deg", '°'),
    ("para", '¶'),
    ("sect", '§'),
];

fn decode_entity(name: &str) -> Option<char> {
    if let Some(number) = name.strip_prefix('#') {
        let (digits, radix) = match number.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16),
            None => (number, 10),
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        // NUL, surrogates and anything past U+10FFFF become U+FFFD.
        let c = u32::from_str_radix(digits, radix)
            .ok()
            .and_then(char::from_u32)
            .filter(|&c| c != '\0')
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        return Some(c);
    }
    NAMED_ENTITIES
        .iter()
        .find(|(entity, _)| *entity == name)
        .map(|&(_, c)| c)
}

/// Decodes character references; unknown names are kept verbatim.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .char_indices()
            .take(33)
            .find(|&(_, c)| c == ';')
            .and_then(|(semi, _)| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            other => out.push(other),
        }
    }
    out
}

pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            other => out.push(other),
        }
    }
    out
}

fn write_open_tag(el: &ElementData, out: &mut String) {
    out.push('<');
    out.push_str(&el.tag);
    for (name, value) in &el.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
    out.push('>');
}

fn write_node(dom: &Dom, id: NodeId, out: &mut String) {
    match dom.data(id) {
        Some(NodeData::Text(text)) => {
            let raw = dom
                .parent(id)
                .and_then(|parent| dom.tag(parent))
                .is_some_and(tags::is_raw_text);
            if raw {
                out.push_str(text);
            } else {
                out.push_str(&escape_text(text));
            }
        }
        Some(NodeData::Comment(text)) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        Some(NodeData::Element(el)) => {
            write_open_tag(el, out);
            if tags::is_void(&el.tag) {
                return;
            }
            for &child in dom.children(id) {
                write_node(dom, child, out);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
        Some(NodeData::Root) => {
            for &child in dom.children(id) {
                write_node(dom, child, out);
            }
        }
        None => {}
    }
}

/// Compact serialization of the children of `id`.
pub fn serialize_children(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    for &child in dom.children(id) {
        write_node(dom, child, &mut out);
    }
    out
}

pub fn serialize_node(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    write_node(dom, id, &mut out);
    out
}

fn significant_children(dom: &Dom, id: NodeId) -> Vec<NodeId> {
    dom.children(id)
        .iter()
        .copied()
        .filter(|&child| {
            !is_insignificant_whitespace(dom, child) && dom.text(child) != Some("")
        })
        .collect()
}

fn write_pretty_children(dom: &Dom, id: NodeId, depth: usize, out: &mut String) {
    let children = significant_children(dom, id);
    let block_layout = holds_flow(dom, id)
        && !children.is_empty()
        && children.iter().all(|&child| dom.is_block(child));
    if !block_layout {
        for &child in dom.children(id) {
            write_node(dom, child, out);
        }
        return;
    }
    for (index, &child) in children.iter().enumerate() {
        if index > 0 || depth > 0 {
            out.push('\n');
            out.push_str(&"  ".repeat(depth));
        }
        match dom.element(child) {
            Some(el) if !tags::is_void(&el.tag) => {
                write_open_tag(el, out);
                write_pretty_children(dom, child, depth + 1, out);
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
            _ => write_node(dom, child, out),
        }
    }
    if depth > 0 {
        out.push('\n');
        out.push_str(&"  ".repeat(depth - 1));
    }
}

/// Indented serialization used for source editing. Only insignificant
/// whitespace is added, so the output re-parses to an equivalent tree.
pub fn serialize_pretty(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    write_pretty_children(dom, id, 0, &mut out);
    out
}

/// Text projection: blocks and `<br>` become line breaks.
pub fn plain_text(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    collect_plain_text(dom, id, &mut out);
    out.trim_end_matches('\n').to_string()
}

fn collect_plain_text(dom: &Dom, id: NodeId, out: &mut String) {
    for &child in dom.children(id) {
        match dom.data(child) {
            Some(NodeData::Text(text)) => {
                if !is_insignificant_whitespace(dom, child) {
                    out.push_str(text);
                }
            }
            Some(NodeData::Element(el)) => {
                if tags::is_raw_text(&el.tag) {
                    continue;
                }
                if el.tag == "br" {
                    out.push('\n');
                    continue;
                }
                let block = tags::is_block(&el.tag);
                if block && !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                collect_plain_text(dom, child, out);
                if block && !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(html: &str) -> String {
        let mut dom = Dom::new();
        let root = dom.root();
        parse_into(&mut dom, root, html);
        serialize_children(&dom, root)
    }

    #[test]
    fn simple_paragraph_round_trips() {
        assert_eq!(round_trip("<p>hello</p>"), "<p>hello</p>");
    }

    #[test]
    fn implied_end_tags_are_closed() {
        assert_eq!(
            round_trip("<ul><li>one<li>two</ul><p>a<p>b"),
            "<ul><li>one</li><li>two</li></ul><p>a</p><p>b</p>"
        );
    }

    #[test]
    fn stray_end_tags_are_ignored() {
        assert_eq!(round_trip("<p>a</b>b</p></div>"), "<p>ab</p>");
    }

    #[test]
    fn entities_are_decoded_and_re_escaped() {
        assert_eq!(
            round_trip("<p>a &amp; b &lt; c&nbsp;&#169;</p>"),
            "<p>a &amp; b &lt; c&nbsp;©</p>"
        );
        assert_eq!(decode_entities("&unknown; &#x41;"), "&unknown; A");
    }

    #[test]
    fn invalid_numeric_references_become_replacement_chars() {
        assert_eq!(
            round_trip("<p>&#0;&#xFFFFFFFF;&#xD800;&#99999999999;</p>"),
            "<p>\u{FFFD}\u{FFFD}\u{FFFD}\u{FFFD}</p>"
        );
        assert_eq!(decode_entities("&#; &#xZZ;"), "&#; &#xZZ;");
    }

    #[test]
    fn unterminated_tag_becomes_text() {
        assert_eq!(round_trip("<p>a <b"), "<p>a &lt;b</p>");
    }

    #[test]
    fn script_content_is_raw() {
        assert_eq!(
            round_trip("<script>if (a < b) {}</script>"),
            "<script>if (a < b) {}</script>"
        );
    }

    #[test]
    fn whitespace_between_blocks_is_dropped() {
        assert_eq!(
            round_trip("<div>\n  <p>a</p>\n  <p>b <i>c</i></p>\n</div>"),
            "<div><p>a</p><p>b <i>c</i></p></div>"
        );
    }

    #[test]
    fn pretty_output_reparses_to_the_same_markup() {
        let html = "<ul><li>a</li><li>b</li></ul><p>x <b>y</b></p>\
            <table><tbody><tr><td>1</td></tr></tbody></table>";
        let mut dom = Dom::new();
        let root = dom.root();
        parse_into(&mut dom, root, html);
        let pretty = serialize_pretty(&dom, root);
        assert!(pretty.contains("\n  <li>a</li>"));
        assert_eq!(round_trip(&pretty), html);
    }

    #[test]
    fn plain_text_separates_blocks() {
        let mut dom = Dom::new();
        let root = dom.root();
        parse_into(&mut dom, root, "<p>Hello <b>world</b></p><p>second<br>line</p>");
        assert_eq!(plain_text(&dom, root), "Hello world\nsecond\nline");
    }

    #[test]
    fn fragment_nodes_are_detached() {
        let mut dom = Dom::new();
        let nodes = parse_fragment(&mut dom, "<b>a</b>tail");
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|&node| dom.parent(node).is_none()));
    }
}
