//! Microformat parser boundary.
//!
//! The core hands the parser the raw body and the effective URL and
//! forwards whatever it produces. [`ContextParser`] is the seam;
//! [`Mf2Parser`] interprets the first `h-entry`/`h-cite` root of the
//! document into an [`Entry`], the way an mf2 "interpret" pass flattens a
//! parse tree for a reply-context consumer.
//!
//! Absence of an entry is not an error: plenty of pages simply carry no
//! microformats.

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use url::Url;

/// An interpreted author card (p-author h-card).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl Card {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.url.is_none() && self.photo.is_none()
    }
}

/// An interpreted entry, serialized with absent fields skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Always `"entry"` on the wire.
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "content-plain", skip_serializing_if = "Option::is_none")]
    pub content_plain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Card>,
}

/// Parser seam between the fetch path and microformat interpretation.
pub trait ContextParser: Send + Sync {
    /// Interpret `body` (fetched from `url`) into a structured entry, or
    /// nothing if the document carries no recognizable entry.
    fn parse(&self, body: &[u8], url: &Url) -> Option<Entry>;
}

/// scraper-based h-entry/h-cite interpreter.
pub struct Mf2Parser;

impl ContextParser for Mf2Parser {
    fn parse(&self, body: &[u8], url: &Url) -> Option<Entry> {
        let html = String::from_utf8_lossy(body);
        let document = Html::parse_document(&html);

        let root_selector = Selector::parse(".h-entry, .h-cite").expect("invalid selector");
        let root = document.select(&root_selector).next()?;

        Some(interpret_entry(root, url))
    }
}

/// Microformat root classes: properties inside a nested root belong to
/// that root, not the enclosing one.
const ROOT_CLASSES: [&str; 3] = ["h-entry", "h-cite", "h-card"];

fn is_mf_root(el: &ElementRef<'_>) -> bool {
    el.value().classes().any(|c| ROOT_CLASSES.contains(&c))
}

/// First descendant matching `selector` that is not claimed by a nested
/// microformat root between it and `root`.
fn first_scoped<'a>(root: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    root.select(selector).find(|el| {
        !el.ancestors()
            .take_while(|node| node.id() != root.id())
            .filter_map(ElementRef::wrap)
            .any(|ancestor| is_mf_root(&ancestor))
    })
}

fn interpret_entry(root: ElementRef<'_>, base: &Url) -> Entry {
    let name_selector = Selector::parse(".p-name").expect("invalid selector");
    let content_selector = Selector::parse(".e-content").expect("invalid selector");
    let published_selector = Selector::parse(".dt-published").expect("invalid selector");
    let url_selector = Selector::parse(".u-url").expect("invalid selector");
    let author_selector = Selector::parse(".p-author").expect("invalid selector");

    let content_el = first_scoped(root, &content_selector);

    let name = first_scoped(root, &name_selector)
        .map(text_of)
        .filter(|s| !s.is_empty());

    let content = content_el
        .map(|el| el.inner_html().trim().to_string())
        .filter(|s| !s.is_empty());
    let content_plain = content_el.map(text_of).filter(|s| !s.is_empty());

    let published = first_scoped(root, &published_selector)
        .map(|el| match el.value().attr("datetime") {
            Some(dt) => dt.to_string(),
            None => text_of(el),
        })
        .filter(|s| !s.is_empty());

    let url = first_scoped(root, &url_selector)
        .and_then(|el| el.value().attr("href"))
        .map(|href| resolve(base, href));

    let author = root
        .select(&author_selector)
        .next()
        .and_then(|el| interpret_author(el, base));

    Entry { kind: "entry", name, content, content_plain, published, url, author }
}

fn interpret_author(el: ElementRef<'_>, base: &Url) -> Option<Card> {
    let card = if is_mf_root(&el) {
        let name_selector = Selector::parse(".p-name").expect("invalid selector");
        let url_selector = Selector::parse(".u-url").expect("invalid selector");
        let photo_selector = Selector::parse(".u-photo").expect("invalid selector");

        let name = first_scoped(el, &name_selector)
            .map(text_of)
            .or_else(|| Some(text_of(el)))
            .filter(|s| !s.is_empty());

        let url = first_scoped(el, &url_selector)
            .and_then(|a| a.value().attr("href"))
            .or_else(|| (el.value().name() == "a").then(|| el.value().attr("href")).flatten())
            .map(|href| resolve(base, href));

        let photo = first_scoped(el, &photo_selector)
            .and_then(|img| img.value().attr("src").or_else(|| img.value().attr("href")))
            .map(|src| resolve(base, src));

        Card { name, url, photo }
    } else if el.value().name() == "a" {
        // Bare <a class="p-author"> shorthand: text is the name, href the url.
        Card {
            name: Some(text_of(el)).filter(|s| !s.is_empty()),
            url: el.value().attr("href").map(|href| resolve(base, href)),
            photo: None,
        }
    } else {
        Card { name: Some(text_of(el)).filter(|s| !s.is_empty()), url: None, photo: None }
    };

    if card.is_empty() { None } else { Some(card) }
}

/// Element text with whitespace collapsed.
fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve a possibly-relative reference against the effective URL.
fn resolve(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}
