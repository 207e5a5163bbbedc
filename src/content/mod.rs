//! Content extraction from raw HTML
//!
//! Turns an arbitrary, possibly hostile HTML document into three plain-text
//! fields: title, meta description and main content. Extraction never fails;
//! anything missing comes back as an empty string.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

/// Hard cap on extracted content, in characters
pub const MAX_CONTENT_CHARS: usize = 10_000;

/// Appended when content was cut at `MAX_CONTENT_CHARS`
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Length of the content sample kept on page records, in characters
pub const SAMPLE_CHARS: usize = 500;

/// Regions considered as the page's main content, largest wins
const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role='main']",
    "#content",
    ".content",
    "#main",
    ".main",
];

static MAIN_CONTENT: Lazy<Vec<Selector>> = Lazy::new(|| {
    MAIN_CONTENT_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
});

const IGNORED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Text extracted from one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    pub title: String,
    pub description: String,
    pub content: String,
}

impl ExtractedContent {
    /// Title, description and content joined for classification
    pub fn analysis_text(&self) -> String {
        [
            self.title.as_str(),
            self.description.as_str(),
            self.content.as_str(),
        ]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// First `SAMPLE_CHARS` characters of the content
    pub fn sample(&self) -> String {
        self.content.chars().take(SAMPLE_CHARS).collect()
    }
}

/// Extracts title, description and main content from an HTML document
///
/// `url` is only used for log context.
///
/// # Example
///
/// ```
/// use darkline::content::extract;
///
/// let html = r#"<html><head><title> Shop </title></head>
///     <body><nav>menu</nav><article>Fresh   listings today</article></body></html>"#;
/// let extracted = extract(html, "http://shop.onion/");
/// assert_eq!(extracted.title, "Shop");
/// assert_eq!(extracted.content, "Fresh listings today");
/// ```
pub fn extract(html: &str, url: &str) -> ExtractedContent {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let description = extract_description(&document);
    let content = truncate(&extract_main_content(&document));

    tracing::trace!(
        "Extracted {} chars of content from {} (title: {:?})",
        content.chars().count(),
        url,
        title
    );

    ExtractedContent {
        title,
        description,
        content,
    }
}

fn extract_title(document: &Html) -> String {
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };

    document
        .select(&selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .unwrap_or_default()
}

fn extract_description(document: &Html) -> String {
    let Ok(selector) = Selector::parse("meta[name][content]") else {
        return String::new();
    };

    document
        .select(&selector)
        .find(|element| {
            element
                .value()
                .attr("name")
                .is_some_and(|name| name.eq_ignore_ascii_case("description"))
        })
        .and_then(|element| element.value().attr("content"))
        .map(collapse_whitespace)
        .unwrap_or_default()
}

/// Text size of a subtree as it would read after whitespace collapsing
#[derive(Debug, Clone, Copy, Default)]
struct TextSize {
    words: usize,
    chars: usize,
}

impl TextSize {
    fn of(text: &str) -> Self {
        text.split_whitespace().fold(Self::default(), |size, word| Self {
            words: size.words + 1,
            chars: size.chars + word.chars().count(),
        })
    }

    fn add(&mut self, other: TextSize) {
        self.words += other.words;
        self.chars += other.chars;
    }

    /// Length of the collapsed text, separators included
    fn len(&self) -> usize {
        self.chars + self.words.saturating_sub(1)
    }
}

fn is_ignored(element: &scraper::node::Element) -> bool {
    IGNORED_ELEMENTS.contains(&element.name())
}

fn extract_main_content(document: &Html) -> String {
    if let Some(region) = largest_main_region(document) {
        return visible_text(region);
    }

    Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .map(visible_text)
        .unwrap_or_else(|| visible_text(document.root_element()))
}

/// Finds the main-content candidate with the most visible text
///
/// Sizes are summed bottom-up in a single iterative pass, so nested
/// candidates are measured once each and deep nesting cannot overflow
/// the stack. Ties go to the candidate closed first in document order.
fn largest_main_region(document: &Html) -> Option<ElementRef<'_>> {
    let mut best: Option<(ElementRef<'_>, usize)> = None;
    let mut open: Vec<TextSize> = Vec::new();
    let mut stack = vec![(*document.root_element(), false)];

    while let Some((node, closing)) = stack.pop() {
        if closing {
            let size = open.pop().unwrap_or_default();
            if let Some(parent) = open.last_mut() {
                parent.add(size);
            }

            let Some(element) = ElementRef::wrap(node) else {
                continue;
            };
            let len = size.len();
            if len > 0
                && best.map_or(true, |(_, best_len)| len > best_len)
                && MAIN_CONTENT.iter().any(|selector| selector.matches(&element))
            {
                best = Some((element, len));
            }
            continue;
        }

        if let Some(text) = node.value().as_text() {
            if let Some(parent) = open.last_mut() {
                parent.add(TextSize::of(text));
            }
            continue;
        }

        match node.value().as_element() {
            Some(element) if !is_ignored(element) => {
                open.push(TextSize::default());
                stack.push((node, true));
                stack.extend(node.children().rev().map(|child| (child, false)));
            }
            _ => {}
        }
    }

    best.map(|(element, _)| element)
}

/// Collects text under `element`, skipping script-like subtrees
fn visible_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    let mut stack = vec![*element];

    while let Some(node) = stack.pop() {
        if let Some(text) = node.value().as_text() {
            raw.push_str(text);
            raw.push(' ');
            continue;
        }

        if node.value().as_element().is_some_and(is_ignored) {
            continue;
        }

        stack.extend(node.children().rev());
    }

    collapse_whitespace(&raw)
}

/// Collapses runs of whitespace into single spaces and trims
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(content: &str) -> String {
    if content.chars().count() <= MAX_CONTENT_CHARS {
        return content.to_string();
    }

    let mut truncated: String = content.chars().take(MAX_CONTENT_CHARS).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
