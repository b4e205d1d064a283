use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

use archiver_core::asset_filename;
use engine_logging::{engine_debug, engine_warn};
use scraper::{ElementRef, Selector};

use crate::fetch::AssetFetcher;
use crate::markup::{parse_fragment, render_fragment, ElementAction, NodeFilter};

/// Static notice shown where an interactive poll used to be.
pub const POLL_PLACEHOLDER: &str =
    "<em>Polls have been temporarily removed while we migrate to a new platform.</em>";

const POLL_CLASS: &str = "wp-polls";
const POLL_LOADING_CLASS: &str = "wp-polls-loading";
const IMAGE_PRESENTATION_ATTRS: &[&str] = &[
    "class",
    "width",
    "height",
    "data-recalc-dims",
    "sizes",
    "srcset",
];

/// Markup with embedded images pointed at local copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenMarkup {
    pub markup: String,
    /// Source URLs that could not be downloaded, in document order.
    pub unresolved: Vec<String>,
}

/// Strips presentation-only attributes and neutralizes poll widgets.
///
/// Pure: the input is parsed and re-serialized through a filter, and applying
/// it to its own output changes nothing.
pub fn sanitize(raw_markup: &str) -> String {
    let doc = parse_fragment(raw_markup);
    render_fragment(&doc, &Sanitizer)
}

struct Sanitizer;

impl NodeFilter for Sanitizer {
    fn element(&self, element: ElementRef<'_>) -> ElementAction {
        if has_class(element, POLL_LOADING_CLASS) {
            ElementAction::Remove
        } else if has_class(element, POLL_CLASS) {
            ElementAction::ReplaceContent(Cow::Borrowed(POLL_PLACEHOLDER))
        } else {
            ElementAction::Keep
        }
    }

    fn attribute<'a>(
        &self,
        element: ElementRef<'_>,
        name: &str,
        value: &'a str,
    ) -> Option<Cow<'a, str>> {
        let strip = match element.value().name() {
            "img" => IMAGE_PRESENTATION_ATTRS.contains(&name),
            "figure" | "figcaption" => name == "class",
            _ => false,
        };
        if strip {
            None
        } else {
            Some(Cow::Borrowed(value))
        }
    }
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// `src` of every `img` in document order, blanks skipped.
pub fn image_sources(markup: &str) -> Vec<String> {
    let doc = parse_fragment(markup);
    let Ok(selector) = Selector::parse("img") else {
        return Vec::new();
    };
    doc.select(&selector)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .map(str::to_string)
        .collect()
}

/// Downloads every embedded image into `target_dir` and points its `src` at
/// the local filename. Images that cannot be fetched lose their `src` and are
/// reported in [`RewrittenMarkup::unresolved`].
pub async fn rewrite_asset_references(
    markup: &str,
    target_dir: &Path,
    fetcher: &dyn AssetFetcher,
) -> RewrittenMarkup {
    let mut resolved: HashMap<String, Option<String>> = HashMap::new();
    let mut unresolved = Vec::new();

    for src in image_sources(markup) {
        if resolved.contains_key(&src) {
            continue;
        }
        let local = match asset_filename(&src) {
            Some(filename) => {
                if fetcher.fetch(&src, &target_dir.join(&filename)).await {
                    engine_debug!("Image {} stored as {}", src, filename);
                    Some(filename)
                } else {
                    None
                }
            }
            None => {
                engine_warn!("No local filename can be derived from image source {}", src);
                None
            }
        };
        if local.is_none() {
            unresolved.push(src.clone());
        }
        resolved.insert(src, local);
    }

    let doc = parse_fragment(markup);
    let markup = render_fragment(&doc, &SourceRewriter { resolved: &resolved });
    RewrittenMarkup { markup, unresolved }
}

struct SourceRewriter<'r> {
    resolved: &'r HashMap<String, Option<String>>,
}

impl NodeFilter for SourceRewriter<'_> {
    fn attribute<'a>(
        &self,
        element: ElementRef<'_>,
        name: &str,
        value: &'a str,
    ) -> Option<Cow<'a, str>> {
        if element.value().name() != "img" || name != "src" {
            return Some(Cow::Borrowed(value));
        }
        match self.resolved.get(value.trim()) {
            Some(Some(filename)) => Some(Cow::Owned(filename.clone())),
            Some(None) => None,
            None => Some(Cow::Borrowed(value)),
        }
    }
}
