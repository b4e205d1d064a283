use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::ElementRef;

use crate::markup::{outer_html, parse_fragment};

/// Elements copied into the document as raw markup by default.
pub const KEPT_ELEMENTS: &[&str] = &["figure", "figcaption"];

pub trait Converter: Send + Sync {
    fn to_markdown(&self, html: &str) -> String;
}

/// Converts sanitized markup into Markdown.
///
/// Lists use `-`, code blocks are fenced, emphasis uses `*`. Elements listed
/// in `kept` are emitted verbatim as embedded HTML blocks.
#[derive(Debug, Clone)]
pub struct MarkdownTranscoder {
    kept: Vec<String>,
}

impl Default for MarkdownTranscoder {
    fn default() -> Self {
        Self::with_kept_elements(KEPT_ELEMENTS.iter().copied())
    }
}

impl MarkdownTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kept_elements<'a>(kept: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            kept: kept.into_iter().map(|k| k.to_ascii_lowercase()).collect(),
        }
    }

    pub fn transcode(&self, html: &str) -> String {
        let document = parse_fragment(html);
        let mut writer = MarkdownWriter::new();
        for child in document.root_element().children() {
            self.visit_node(child, &mut writer);
        }
        writer.finish()
    }

    fn visit_node(&self, node: NodeRef<'_, Node>, w: &mut MarkdownWriter) {
        match node.value() {
            Node::Text(text) => w.text(text),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(node) {
                    self.visit_element(element, w);
                }
            }
            Node::Comment(_) => {}
            _ => {
                for child in node.children() {
                    self.visit_node(child, w);
                }
            }
        }
    }

    fn visit_children(&self, element: ElementRef<'_>, w: &mut MarkdownWriter) {
        for child in element.children() {
            self.visit_node(child, w);
        }
    }

    fn visit_element(&self, element: ElementRef<'_>, w: &mut MarkdownWriter) {
        let tag = element.value().name().to_ascii_lowercase();
        if self.kept.iter().any(|k| *k == tag) {
            w.block();
            w.raw_lines(&outer_html(element));
            w.block();
            return;
        }

        match tag.as_str() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = usize::from(tag.as_bytes()[1] - b'0');
                w.block();
                w.raw(&format!("{} ", "#".repeat(level)));
                self.visit_children(element, w);
                w.block();
            }
            "p" | "div" | "section" | "article" | "header" | "footer" | "main" | "aside"
            | "nav" | "address" | "table" | "dl" | "details" | "summary" => {
                w.block();
                self.visit_children(element, w);
                w.block();
            }
            "tr" | "dt" | "dd" | "caption" => {
                w.line();
                self.visit_children(element, w);
                w.line();
            }
            "blockquote" => {
                w.block();
                w.push_indent("> ");
                self.visit_children(element, w);
                w.block();
                w.pop_indent();
            }
            "ul" | "ol" => self.visit_list(element, tag == "ol", w),
            "li" => {
                // Stray item outside of a list.
                self.visit_item(element, "- ".to_string(), w);
            }
            "pre" => self.visit_pre(element, w),
            "hr" => {
                w.block();
                w.raw("---");
                w.block();
            }
            "br" => w.hard_break(),
            "em" | "i" | "cite" => self.visit_wrapped(element, "*", w),
            "strong" | "b" => self.visit_wrapped(element, "**", w),
            "code" | "kbd" | "samp" | "tt" => self.visit_inline_code(element, w),
            "a" => self.visit_anchor(element, w),
            "img" => self.visit_image(element, w),
            "script" | "style" | "noscript" | "template" | "iframe" | "head" | "title" => {}
            _ => self.visit_children(element, w),
        }
    }

    fn visit_list(&self, element: ElementRef<'_>, ordered: bool, w: &mut MarkdownWriter) {
        let nested = w.list_depth > 0;
        if nested {
            w.line();
        } else {
            w.block();
        }
        w.list_depth += 1;

        let mut number: usize = element
            .value()
            .attr("start")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1);
        for child in element.children() {
            match ElementRef::wrap(child) {
                Some(item) if item.value().name().eq_ignore_ascii_case("li") => {
                    let marker = if ordered {
                        format!("{number}. ")
                    } else {
                        "- ".to_string()
                    };
                    number += 1;
                    self.visit_item(item, marker, w);
                }
                _ => self.visit_node(child, w),
            }
        }

        w.list_depth -= 1;
        if nested {
            w.line();
        } else {
            w.block();
        }
    }

    fn visit_item(&self, item: ElementRef<'_>, marker: String, w: &mut MarkdownWriter) {
        w.line();
        w.start_item(marker);
        self.visit_children(item, w);
        w.end_item();
    }

    fn visit_pre(&self, element: ElementRef<'_>, w: &mut MarkdownWriter) {
        let code = element
            .children()
            .filter_map(ElementRef::wrap)
            .find(|child| child.value().name().eq_ignore_ascii_case("code"));
        let language = code
            .and_then(|c| {
                c.value().classes().find_map(|class| {
                    class
                        .strip_prefix("language-")
                        .or_else(|| class.strip_prefix("lang-"))
                        .map(str::to_string)
                })
            })
            .unwrap_or_default();
        let text: String = match code {
            Some(c) => c.text().collect(),
            None => element.text().collect(),
        };
        let text = text.strip_suffix('\n').unwrap_or(&text);
        let fence = if text.contains("```") { "~~~" } else { "```" };

        w.block();
        w.raw_lines(&format!("{fence}{language}\n{text}\n{fence}"));
        w.block();
    }

    /// Renders the children in isolation so surrounding whitespace can be
    /// moved outside the delimiters.
    fn render_inline(&self, element: ElementRef<'_>) -> String {
        let mut inner = MarkdownWriter::new();
        self.visit_children(element, &mut inner);
        inner.finish()
    }

    fn visit_wrapped(&self, element: ElementRef<'_>, delimiter: &str, w: &mut MarkdownWriter) {
        let content = self.render_inline(element);
        let (leading, trailing) = surrounding_whitespace(element);
        if leading {
            w.space();
        }
        if !content.is_empty() {
            w.raw_inline(&format!("{delimiter}{content}{delimiter}"));
        }
        if trailing {
            w.space();
        }
    }

    fn visit_inline_code(&self, element: ElementRef<'_>, w: &mut MarkdownWriter) {
        let text: String = element.text().collect();
        let text = text.replace(['\n', '\r'], " ");
        if text.trim().is_empty() {
            return;
        }
        let delimiter = if text.contains('`') { "``" } else { "`" };
        let padded = if text.starts_with('`') || text.ends_with('`') {
            format!(" {text} ")
        } else {
            text
        };
        w.raw(&format!("{delimiter}{padded}{delimiter}"));
    }

    fn visit_anchor(&self, element: ElementRef<'_>, w: &mut MarkdownWriter) {
        let href = element.value().attr("href").map(str::trim).unwrap_or("");
        let content = self.render_inline(element);
        let (leading, trailing) = surrounding_whitespace(element);
        if leading {
            w.space();
        }
        if href.is_empty() {
            w.raw_inline(&content);
        } else if !content.is_empty() {
            let title = element
                .value()
                .attr("title")
                .map(|t| format!(" \"{}\"", t.replace('"', "\\\"")))
                .unwrap_or_default();
            w.raw_inline(&format!("[{content}]({href}{title})"));
        }
        if trailing {
            w.space();
        }
    }

    fn visit_image(&self, element: ElementRef<'_>, w: &mut MarkdownWriter) {
        let Some(src) = element.value().attr("src").map(str::trim) else {
            return;
        };
        if src.is_empty() {
            return;
        }
        let alt = escape_markdown(element.value().attr("alt").unwrap_or("").trim());
        let title = element
            .value()
            .attr("title")
            .map(|t| format!(" \"{}\"", t.replace('"', "\\\"")))
            .unwrap_or_default();
        w.raw(&format!("![{alt}]({src}{title})"));
    }
}

impl Converter for MarkdownTranscoder {
    fn to_markdown(&self, html: &str) -> String {
        self.transcode(html)
    }
}

/// Transcodes with the default set of kept elements.
pub fn transcode(html: &str) -> String {
    MarkdownTranscoder::default().transcode(html)
}

fn surrounding_whitespace(element: ElementRef<'_>) -> (bool, bool) {
    let text: String = element.text().collect();
    let leading = text.starts_with(|c: char| c.is_whitespace());
    let trailing = !text.trim().is_empty() && text.ends_with(|c: char| c.is_whitespace());
    (leading, trailing)
}

fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '*' | '_' | '`' | '[' | ']') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Line-oriented Markdown builder.
///
/// Blocks request blank lines lazily so that adjacent blocks collapse to a
/// single separator. `indents` hold the continuation prefix of every open
/// blockquote or list item; `marker` replaces the innermost indent on the
/// first line of a list item.
struct MarkdownWriter {
    out: String,
    indents: Vec<String>,
    marker: Option<String>,
    list_depth: usize,
    pending_newlines: usize,
    /// Newlines written since the last line prefix or content.
    trailing_newlines: usize,
    /// Digits written so far on a line that holds nothing else.
    leading_digits: Option<usize>,
    pending_space: bool,
    keep_trailing: bool,
    line_started: bool,
    line_has_content: bool,
}

impl MarkdownWriter {
    fn new() -> Self {
        Self {
            out: String::new(),
            indents: Vec::new(),
            marker: None,
            list_depth: 0,
            pending_newlines: 0,
            trailing_newlines: 0,
            leading_digits: None,
            pending_space: false,
            keep_trailing: false,
            line_started: false,
            line_has_content: false,
        }
    }

    fn finish(self) -> String {
        self.out.trim().to_string()
    }

    fn block(&mut self) {
        self.request_newlines(2);
    }

    fn line(&mut self) {
        self.request_newlines(1);
    }

    fn request_newlines(&mut self, count: usize) {
        self.pending_space = false;
        // Nothing written yet, or only a list marker on this line.
        if self.out.is_empty() || (self.line_started && !self.line_has_content) {
            return;
        }
        let needed = count.saturating_sub(self.trailing_newlines);
        if needed == 0 {
            return;
        }
        if count > 1 {
            self.keep_trailing = false;
        }
        self.pending_newlines = self.pending_newlines.max(needed);
    }

    fn push_indent(&mut self, indent: &str) {
        self.flush_newlines();
        self.indents.push(indent.to_string());
    }

    /// Ends the current line under the closing prefix; further requested
    /// newlines are written under the outer one.
    fn pop_indent(&mut self) {
        let rest = self.pending_newlines.saturating_sub(1);
        self.pending_newlines = self.pending_newlines.min(1);
        self.flush_newlines();
        self.indents.pop();
        self.pending_newlines = rest;
    }

    fn start_item(&mut self, marker: String) {
        self.flush_newlines();
        self.indents.push(" ".repeat(marker.len()));
        self.marker = Some(marker);
        self.start_line();
    }

    fn end_item(&mut self) {
        // An empty item still occupies its line.
        if self.line_started {
            self.line_has_content = true;
        }
        self.line();
        self.pop_indent();
        self.marker = None;
    }

    fn flush_newlines(&mut self) {
        if self.pending_newlines == 0 {
            return;
        }
        if !self.keep_trailing {
            while self.out.ends_with(' ') {
                self.out.pop();
            }
        }
        let blank_prefix = self.indents.concat().trim_end().to_string();
        for _ in 0..self.pending_newlines {
            if self.trailing_newlines > 0 {
                self.out.push_str(&blank_prefix);
            }
            self.out.push('\n');
            self.trailing_newlines += 1;
        }
        self.pending_newlines = 0;
        self.pending_space = false;
        self.keep_trailing = false;
        self.line_started = false;
        self.line_has_content = false;
    }

    fn start_line(&mut self) {
        if self.line_started {
            return;
        }
        let prefix = match self.marker.take() {
            Some(marker) => {
                let outer = self.indents.len().saturating_sub(1);
                format!("{}{}", self.indents[..outer].concat(), marker)
            }
            None => self.indents.concat(),
        };
        self.out.push_str(&prefix);
        self.line_started = true;
        self.trailing_newlines = 0;
    }

    fn begin_content(&mut self) {
        self.flush_newlines();
        self.start_line();
        if self.pending_space && self.line_has_content {
            self.out.push(' ');
        }
        self.pending_space = false;
        self.line_has_content = true;
    }

    fn space(&mut self) {
        if self.line_has_content && self.pending_newlines == 0 {
            self.pending_space = true;
        }
    }

    fn text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() && ch != '\u{a0}' {
                if self.line_has_content {
                    self.leading_digits = None;
                }
                self.space();
                continue;
            }
            let line_start = !self.line_has_content || self.pending_newlines > 0;
            if line_start {
                self.leading_digits = Some(0);
            }
            self.begin_content();
            // `1984.` or `3)` opening a line would start an ordered list.
            let list_delimiter =
                matches!(ch, '.' | ')') && matches!(self.leading_digits, Some(n) if n > 0);
            let escape = matches!(ch, '\\' | '*' | '_' | '`' | '[' | ']')
                || (line_start && matches!(ch, '#' | '>' | '-' | '+'))
                || list_delimiter;
            if escape {
                self.out.push('\\');
            }
            self.out.push(ch);
            self.leading_digits = match self.leading_digits {
                Some(n) if ch.is_ascii_digit() => Some(n + 1),
                _ => None,
            };
        }
    }

    /// Markup already in Markdown syntax, on the current line.
    fn raw(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.begin_content();
        self.out.push_str(text);
        self.leading_digits = None;
    }

    /// Output of a nested writer; its line breaks become hard breaks.
    fn raw_inline(&mut self, text: &str) {
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.pending_newlines = self.pending_newlines.max(1);
                self.keep_trailing = true;
            }
            self.raw(line);
        }
    }

    /// Verbatim lines (code blocks, embedded markup), each carrying the
    /// current prefix.
    fn raw_lines(&mut self, text: &str) {
        self.flush_newlines();
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.pending_newlines = 1;
                self.keep_trailing = true;
                self.flush_newlines();
            }
            self.start_line();
            self.out.push_str(line);
            self.line_has_content = true;
        }
    }

    fn hard_break(&mut self) {
        if !self.line_has_content {
            return;
        }
        self.out.push_str("  ");
        self.pending_newlines = self.pending_newlines.max(1);
        self.pending_space = false;
        self.keep_trailing = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_and_headings() {
        assert_eq!(
            transcode("<h2>Title</h2><p>One   two\nthree</p><p>Four</p>"),
            "## Title\n\nOne two three\n\nFour"
        );
    }

    #[test]
    fn emphasis_uses_single_asterisk() {
        assert_eq!(
            transcode("<p>a <em>b</em> <strong>c</strong> <i> d </i>e</p>"),
            "a *b* **c** *d* e"
        );
    }

    #[test]
    fn lists_use_dash_markers_and_nest() {
        assert_eq!(
            transcode("<ul><li>one</li><li>two<ul><li>inner</li></ul></li></ul><ol><li>x</li><li>y</li></ol>"),
            "- one\n- two\n  - inner\n\n1. x\n2. y"
        );
    }

    #[test]
    fn code_blocks_are_fenced() {
        assert_eq!(
            transcode("<p>Run:</p><pre><code class=\"language-sh\">cargo run\necho *done*\n</code></pre>"),
            "Run:\n\n```sh\ncargo run\necho *done*\n```"
        );
    }

    #[test]
    fn inline_code_and_links() {
        assert_eq!(
            transcode(r#"<p>Use <code>a_b</code> from <a href="https://x.example/">the docs</a>.</p>"#),
            "Use `a_b` from [the docs](https://x.example/)."
        );
    }

    #[test]
    fn blockquote_lines_are_prefixed() {
        assert_eq!(
            transcode("<blockquote><p>first</p><p>second</p></blockquote><p>after</p>"),
            "> first\n>\n> second\n\nafter"
        );
    }

    #[test]
    fn markdown_characters_in_text_are_escaped() {
        assert_eq!(transcode("<p>2 * 3 = snake_case [x]</p>"), "2 \\* 3 = snake\\_case \\[x\\]");
        assert_eq!(transcode("<p># not a heading</p>"), "\\# not a heading");
    }

    #[test]
    fn numbers_opening_a_paragraph_do_not_become_lists() {
        assert_eq!(transcode("<p>1984. A great year</p>"), "1984\\. A great year");
        assert_eq!(transcode("<p>3) three</p>"), "3\\) three");
        assert_eq!(transcode("<p>In 1984. A year</p>"), "In 1984. A year");
        assert_eq!(transcode("<p>1984 . spaced</p>"), "1984 . spaced");
    }

    #[test]
    fn line_breaks_are_hard_breaks() {
        assert_eq!(transcode("<p>a<br>b</p>"), "a  \nb");
    }

    #[test]
    fn figure_is_kept_verbatim() {
        let html = r#"<p>Intro</p><figure><img alt="Cat" src="cat.jpg"><figcaption>A <em>cat</em></figcaption></figure><p>Outro</p>"#;
        assert_eq!(
            transcode(html),
            "Intro\n\n<figure><img alt=\"Cat\" src=\"cat.jpg\"><figcaption>A <em>cat</em></figcaption></figure>\n\nOutro"
        );
    }

    #[test]
    fn images_without_source_are_dropped() {
        assert_eq!(transcode(r#"<p>x<img alt="gone">y</p>"#), "xy");
        assert_eq!(transcode(r#"<p><img src="a.png" alt="A"></p>"#), "![A](a.png)");
    }

    #[test]
    fn scripts_are_dropped() {
        assert_eq!(transcode("<p>a</p><script>alert(1)</script><p>b</p>"), "a\n\nb");
    }
}
