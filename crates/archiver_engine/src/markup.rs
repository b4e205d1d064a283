use std::borrow::Cow;

use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta", "param",
    "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "noscript", "plaintext",
];

/// What the serializer does with an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ElementAction {
    Keep,
    Remove,
    /// Keep the element and its attributes but emit this markup instead of
    /// its children.
    ReplaceContent(Cow<'static, str>),
}

/// Rules applied while serializing a parsed tree back to markup.
pub(crate) trait NodeFilter {
    fn element(&self, _element: ElementRef<'_>) -> ElementAction {
        ElementAction::Keep
    }

    /// Returns the value to emit for an attribute, or `None` to drop it.
    fn attribute<'a>(
        &self,
        _element: ElementRef<'_>,
        _name: &str,
        value: &'a str,
    ) -> Option<Cow<'a, str>> {
        Some(Cow::Borrowed(value))
    }
}

/// Serializes nodes exactly as parsed.
pub(crate) struct Verbatim;

impl NodeFilter for Verbatim {}

pub(crate) fn parse_fragment(markup: &str) -> Html {
    Html::parse_fragment(markup)
}

/// Serializes the fragment's content through `filter`.
pub(crate) fn render_fragment(doc: &Html, filter: &dyn NodeFilter) -> String {
    let mut out = String::new();
    for child in doc.root_element().children() {
        serialize_node(child, filter, &mut out);
    }
    out
}

/// Serializes one element including its own tags.
pub(crate) fn outer_html(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    serialize_node(*element, &Verbatim, &mut out);
    out
}

fn serialize_node(node: NodeRef<'_, Node>, filter: &dyn NodeFilter, out: &mut String) {
    match node.value() {
        Node::Text(text) => {
            let raw_parent = node
                .parent()
                .and_then(ElementRef::wrap)
                .map(|parent| RAW_TEXT_ELEMENTS.contains(&parent.value().name()))
                .unwrap_or(false);
            if raw_parent {
                out.push_str(text);
            } else {
                escape_text(text, out);
            }
        }
        Node::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
        Node::Element(_) => {
            if let Some(element) = ElementRef::wrap(node) {
                serialize_element(element, filter, out);
            }
        }
        _ => {
            for child in node.children() {
                serialize_node(child, filter, out);
            }
        }
    }
}

fn serialize_element(element: ElementRef<'_>, filter: &dyn NodeFilter, out: &mut String) {
    let action = filter.element(element);
    if action == ElementAction::Remove {
        return;
    }

    let name = element.value().name();
    out.push('<');
    out.push_str(name);
    // Attribute storage order is not guaranteed; sort for byte-stable output.
    let mut attrs: Vec<(&str, &str)> = element.value().attrs().collect();
    attrs.sort_by(|a, b| a.0.cmp(b.0));
    for (attr_name, value) in attrs {
        if let Some(value) = filter.attribute(element, attr_name, value) {
            out.push(' ');
            out.push_str(attr_name);
            out.push_str("=\"");
            escape_attribute(&value, out);
            out.push('"');
        }
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }

    match action {
        ElementAction::ReplaceContent(content) => out.push_str(&content),
        _ => {
            for child in element.children() {
                serialize_node(child, filter, out);
            }
        }
    }

    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

/// Plain text of a markup fragment with entities decoded and tags removed.
pub fn plain_text(markup: &str) -> String {
    let doc = parse_fragment(markup);
    let text: String = doc.root_element().text().collect();
    text.trim().to_string()
}
