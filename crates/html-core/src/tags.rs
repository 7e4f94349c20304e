//! Tag classification tables shared by the parser, the serializer and the
//! command implementations.

const VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const BLOCK: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "dd",
    "details",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "summary",
    "table",
    "tbody",
    "td",
    "tfoot",
    "th",
    "thead",
    "tr",
    "ul",
];

/// Blocks that hold other blocks rather than inline content.
const CONTAINER: &[&str] = &["dl", "ol", "table", "tbody", "tfoot", "thead", "tr", "ul"];

/// Elements whose inter-block whitespace carries no meaning.
const FLOW_CONTAINER: &[&str] = &[
    "article",
    "aside",
    "blockquote",
    "details",
    "div",
    "dl",
    "fieldset",
    "figure",
    "footer",
    "form",
    "header",
    "main",
    "nav",
    "ol",
    "section",
    "table",
    "tbody",
    "tfoot",
    "thead",
    "tr",
    "ul",
];

/// Blocks that may be renamed in place by `formatBlock` and list toggles.
const RENAMABLE: &[&str] = &[
    "address", "div", "h1", "h2", "h3", "h4", "h5", "h6", "p", "pre",
];

const INLINE_FORMAT: &[&str] = &[
    "b", "big", "code", "del", "em", "font", "i", "ins", "mark", "s", "small", "span", "strike",
    "strong", "sub", "sup", "tt", "u",
];

/// Elements that count as content even without text.
const MEDIA: &[&str] = &["embed", "hr", "iframe", "img", "object", "table", "video", "audio"];

pub fn is_void(tag: &str) -> bool {
    VOID.contains(&tag)
}

pub fn is_block(tag: &str) -> bool {
    BLOCK.contains(&tag)
}

pub fn is_container(tag: &str) -> bool {
    CONTAINER.contains(&tag)
}

pub fn is_flow_container(tag: &str) -> bool {
    FLOW_CONTAINER.contains(&tag)
}

/// A block that directly holds inline content (and can carry alignment).
pub fn is_text_block(tag: &str) -> bool {
    is_block(tag) && !is_container(tag) && tag != "hr"
}

pub fn is_renamable_block(tag: &str) -> bool {
    RENAMABLE.contains(&tag)
}

pub fn is_inline_format(tag: &str) -> bool {
    INLINE_FORMAT.contains(&tag)
}

pub fn is_media(tag: &str) -> bool {
    MEDIA.contains(&tag)
}

pub fn is_raw_text(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

pub fn is_escapable_raw_text(tag: &str) -> bool {
    matches!(tag, "textarea" | "title")
}

pub fn is_list(tag: &str) -> bool {
    matches!(tag, "ul" | "ol")
}

pub fn is_heading(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}
