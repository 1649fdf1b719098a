//! Page loading for composed documents
//!
//! A composed document is split into the pieces the sandbox needs: the
//! script blocks to evaluate (in document order) and the static parts that
//! make up the rendered view.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Comments, style elements and script elements, matched left to right
///
/// A comment or style element that starts first swallows anything that looks
/// like a script inside it, and a script swallows comment-like text.
static BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)<!--.*?(?:-->|\z)|<style\b[^>]*>(?P<style>.*?)</style\s*>|<script\b[^>]*>(?P<script>.*?)</script\s*>",
    )
    .expect("valid block regex")
});

static BODY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<body\b[^>]*>(.*)</body\s*>").expect("valid body regex")
});

static TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").expect("valid title regex")
});

/// A parsed document, ready to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Script block sources in document order
    pub scripts: Vec<String>,
    rendered: RenderedPage,
}

/// The static view of a loaded page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPage {
    pub title: String,
    /// All style blocks, concatenated
    pub style: String,
    /// Body markup without script elements, style elements or comments
    pub body: String,
}

impl Page {
    pub fn parse(document: &str) -> Self {
        let mut scripts = Vec::new();
        let mut styles = Vec::new();
        for caps in BLOCK_RE.captures_iter(document) {
            if let Some(script) = caps.name("script") {
                scripts.push(script.as_str().to_string());
            } else if let Some(style) = caps.name("style") {
                styles.push(style.as_str());
            }
        }

        let title = TITLE_RE
            .captures(document)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        let style = styles.join("\n");

        let body_source = BODY_RE
            .captures(document)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .unwrap_or(document);
        let body = BLOCK_RE.replace_all(body_source, "").trim().to_string();

        Self {
            scripts,
            rendered: RenderedPage { title, style, body },
        }
    }

    pub fn rendered(&self) -> &RenderedPage {
        &self.rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections() {
        let page = Page::parse(
            "<html><head><title> Doc </title><style>p{}</style></head>\
             <body><p>hi</p><script>a()</script><SCRIPT type=\"module\">b()</SCRIPT></body></html>",
        );

        assert_eq!(page.scripts, vec!["a()".to_string(), "b()".to_string()]);
        assert_eq!(page.rendered().title, "Doc");
        assert_eq!(page.rendered().style, "p{}");
        assert_eq!(page.rendered().body, "<p>hi</p>");
    }

    #[test]
    fn test_empty_script_blocks_are_kept() {
        let page = Page::parse("<body><script></script></body>");
        assert_eq!(page.scripts, vec![String::new()]);
        assert!(page.rendered().body.is_empty());
    }

    #[test]
    fn test_script_text_in_style_is_inert() {
        let page = Page::parse(
            "<head><style>/* <script>leak()</script> */ p{}</style></head><body><script>ok()</script></body>",
        );

        assert_eq!(page.scripts, vec!["ok()".to_string()]);
        assert_eq!(page.rendered().style, "/* <script>leak()</script> */ p{}");
    }

    #[test]
    fn test_script_in_comment_is_inert() {
        let page = Page::parse(
            "<body><!-- <script>leak()</script> --><p>kept</p><!-- unterminated <script>x()</script></body>",
        );

        assert!(page.scripts.is_empty());
        assert_eq!(page.rendered().body, "<p>kept</p>");
    }

    #[test]
    fn test_comment_text_in_script_is_kept() {
        let page = Page::parse("<body><script>var s = '<!--';</script><script>next()</script></body>");
        assert_eq!(
            page.scripts,
            vec!["var s = '<!--';".to_string(), "next()".to_string()]
        );
    }

    #[test]
    fn test_fragment_without_body() {
        let page = Page::parse("<b>bare</b>");
        assert!(page.scripts.is_empty());
        assert_eq!(page.rendered().body, "<b>bare</b>");
    }
}
