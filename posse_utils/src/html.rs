//! Read-only HTML extraction helpers: images with alt text, and anchor
//! hrefs. Built on `scraper` (html5ever under the hood), the same parser
//! family used elsewhere in the ecosystem for sanitizing/serializing HTML —
//! here used purely for extraction, never for re-rendering untrusted markup.

use scraper::{Html, Selector};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    pub url: String,
    pub alt: String,
}

/// Every `<img src alt?>` in `html`, in document order. Missing `alt`
/// becomes an empty string, matching Ghost's own rendering of images
/// without alt text.
pub fn extract_images(html: &str) -> Vec<ExtractedImage> {
    let document = Html::parse_fragment(html);
    let selector = match Selector::parse("img") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    document
        .select(&selector)
        .filter_map(|el| {
            let src = el.value().attr("src")?.to_owned();
            let alt = el.value().attr("alt").unwrap_or("").to_owned();
            Some(ExtractedImage { url: src, alt })
        })
        .collect()
}

/// Every `<a href>` in `html`, in document order. Caps parsing at
/// `max_bytes`; content beyond that is ignored (spec §4.K: cap HTML parsing
/// at 5 MiB, truncate and warn over that).
pub fn extract_links(html: &str, max_bytes: usize) -> Vec<String> {
    let truncated = if html.len() > max_bytes {
        log::warn!(
            "HTML content exceeds {max_bytes} bytes, truncating before link extraction"
        );
        // Truncate on a char boundary so we don't split multi-byte UTF-8.
        let mut end = max_bytes;
        while end > 0 && !html.is_char_boundary(end) {
            end -= 1;
        }
        &html[..end]
    } else {
        html
    };
    let document = Html::parse_fragment(truncated);
    let selector = match Selector::parse("a") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href").map(|s| s.to_owned()))
        .collect()
}

/// Strips all HTML tags, returning plain text. Used for Mastodon status
/// content and reply previews, which arrive as HTML from the platform API.
pub fn strip_html(html: &str) -> String {
    let document = Html::parse_fragment(html);
    document.root_element().text().collect::<Vec<_>>().join("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_images_order_and_alt() {
        let html = r#"<p><img src="https://a/1.jpg"><img src="https://a/2.jpg" alt="two"></p>"#;
        let images = extract_images(html);
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].url, "https://a/1.jpg");
        assert_eq!(images[0].alt, "");
        assert_eq!(images[1].alt, "two");
    }

    #[test]
    fn test_extract_links() {
        let html = r#"<p><a href="https://a/x">x</a> <a href="https://a/y">y</a></p>"#;
        let links = extract_links(html, 5 * 1024 * 1024);
        assert_eq!(links, vec!["https://a/x", "https://a/y"]);
    }

    #[test]
    fn test_extract_links_truncates_over_cap() {
        let filler = "a".repeat(100);
        let html = format!(r#"<p>{filler}<a href="https://a/x">x</a></p>"#);
        let links = extract_links(&html, 10);
        assert!(links.is_empty());
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>hello <b>world</b></p>"), "hello world");
    }
}
