//! Whitelist HTML sanitizer for user-supplied article text.
//!
//! Input is parsed as an HTML fragment and re-serialized keeping only
//! formatting tags and their harmless attributes. Executable elements are
//! dropped along with their content, unknown elements are unwrapped so their
//! text survives. The output parses back to the same tree, which makes
//! [`sanitize`] idempotent.

use scraper::{node::Node, ElementRef, Html};

const ALLOWED_TAGS: &[&str] = &[
    "a", "b", "blockquote", "br", "code", "div", "em", "h1", "h2", "h3", "h4", "h5", "h6", "hr",
    "i", "img", "li", "ol", "p", "pre", "span", "strong", "u", "ul",
];

const VOID_TAGS: &[&str] = &["br", "hr", "img"];

const DROPPED_TAGS: &[&str] = &[
    "embed", "iframe", "noscript", "object", "script", "style", "template",
];

const URL_ATTRS: &[&str] = &["href", "src"];

const BLOCKED_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

fn allowed_attrs(tag: &str) -> &'static [&'static str] {
    match tag {
        "a" => &["href", "title", "target"],
        "img" => &["src", "alt", "title", "width", "height"],
        _ => &[],
    }
}

pub fn sanitize(text: &str) -> String {
    let fragment = Html::parse_fragment(text);
    let mut out = String::with_capacity(text.len());
    write_children(fragment.root_element(), &mut out);
    out
}

fn write_children(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => escape_text(text, out),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    write_element(child, out);
                }
            }
            _ => {}
        }
    }
}

fn write_element(element: ElementRef<'_>, out: &mut String) {
    let tag = element.value().name();

    if DROPPED_TAGS.contains(&tag) {
        return;
    }
    if !ALLOWED_TAGS.contains(&tag) {
        write_children(element, out);
        return;
    }

    out.push('<');
    out.push_str(tag);
    let allowed = allowed_attrs(tag);
    for (name, value) in element.value().attrs() {
        if !allowed.contains(&name) {
            continue;
        }
        if URL_ATTRS.contains(&name) && has_blocked_scheme(value) {
            continue;
        }
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attr(value, out);
        out.push('"');
    }
    out.push('>');

    if VOID_TAGS.contains(&tag) {
        return;
    }

    let body_start = out.len();
    write_children(element, out);
    // The parser swallows one newline right after `<pre>`.
    if tag == "pre" && out[body_start..].starts_with('\n') {
        out.insert(body_start, '\n');
    }
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn has_blocked_scheme(url: &str) -> bool {
    // Browsers ignore whitespace and control characters inside the scheme.
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();

    BLOCKED_SCHEMES
        .iter()
        .any(|scheme| normalized.starts_with(scheme))
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}
