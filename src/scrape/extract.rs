//! Main-content text extraction from HTML

use scraper::ElementRef;
use scraper::Html;
use scraper::Node;
use scraper::Selector;

/// Candidate main-content containers, most specific first
const MAIN_SELECTORS: [&str; 9] = [
    "article",
    "main",
    "[role='main']",
    "#content",
    "#main",
    ".post-content",
    ".entry-content",
    ".content",
    ".main",
];

const SKIPPED_TAGS: [&str; 14] = [
    "script", "style", "noscript", "iframe", "nav", "header", "footer", "aside", "form", "svg",
    "button", "template", "select", "head",
];

const BOILERPLATE_MARKERS: [&str; 9] = [
    "nav",
    "navbar",
    "menu",
    "sidebar",
    "footer",
    "header",
    "advertisement",
    "ads",
    "cookie",
];

const BLOCK_TAGS: [&str; 22] = [
    "p", "div", "section", "article", "main", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5",
    "h6", "tr", "table", "blockquote", "pre", "figcaption", "dd", "dt",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    pub title: Option<String>,
    pub text: String,
}

pub fn extract(html: &str) -> ExtractedPage {
    let document = Html::parse_document(html);

    ExtractedPage {
        title: extract_title(&document),
        text: extract_main_text(&document),
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

fn extract_main_text(document: &Html) -> String {
    for selector_str in MAIN_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(main) = document.select(&selector).next() {
            let text = element_text(main);
            if !text.is_empty() {
                return text;
            }
        }
    }

    // Fallback: the whole body, minus boilerplate
    Selector::parse("body")
        .ok()
        .and_then(|s| document.select(&s).next())
        .map(element_text)
        .unwrap_or_default()
}

fn element_text(root: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(root, &mut raw);

    raw.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                if is_boilerplate(child_el) {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&child_el.value().name());
                if block {
                    out.push('\n');
                }
                collect_text(child_el, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn is_boilerplate(element: ElementRef<'_>) -> bool {
    let value = element.value();
    if SKIPPED_TAGS.contains(&value.name()) {
        return true;
    }

    let marked = |token: &str| {
        let token = token.to_ascii_lowercase();
        BOILERPLATE_MARKERS.contains(&token.as_str())
    };
    value.classes().any(marked) || value.id().is_some_and(marked)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_article_content() {
        let html = r#"
            <html><head><title> Ferris  News </title><style>p { color: red }</style></head>
            <body>
              <nav><a href="/">Home</a></nav>
              <article>
                <h1>Rust 2.0 announced</h1>
                <p>The Rust team   announced a new edition.</p>
                <script>trackPageView()</script>
                <div class="ads">Buy now</div>
              </article>
              <footer>Copyright</footer>
            </body></html>
        "#;

        let page = extract(html);
        assert_eq!(page.title.as_deref(), Some("Ferris News"));
        assert_eq!(
            page.text,
            "Rust 2.0 announced\nThe Rust team announced a new edition."
        );
    }

    #[test]
    fn test_body_fallback_strips_boilerplate() {
        let html = r#"
            <html><body>
              <header>Site header</header>
              <div id="sidebar">Links</div>
              <div><p>First paragraph.</p><p>Second paragraph.</p></div>
              <footer>Footer text</footer>
            </body></html>
        "#;

        let page = extract(html);
        assert_eq!(page.title, None);
        assert_eq!(page.text, "First paragraph.\nSecond paragraph.");
    }

    #[test]
    fn test_empty_document() {
        let page = extract("<html><body><script>x()</script></body></html>");
        assert!(page.text.is_empty());
    }
}
