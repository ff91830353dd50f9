use std::collections::HashSet;
use std::time::Duration;

use scraper::{Html, Selector};
use url::Url;

use crate::errors::ServiceError;

const MAX_HTML_BYTES: usize = 5 * 1024 * 1024;
const SEND_TIMEOUT: Duration = Duration::from_secs(15);

/// Outbound webmention sender (spec §4.K). Sends `source=...&target=...`
/// form posts to each configured target endpoint whose tag matches the
/// syndicated post.
pub struct WebmentionSender {
    http: reqwest::Client,
}

impl Default for WebmentionSender {
    fn default() -> Self {
        Self::new()
    }
}

impl WebmentionSender {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(SEND_TIMEOUT)
                .build()
                .expect("reqwest client builds with static config"),
        }
    }

    /// POSTs a single webmention notification, expecting 2xx as success.
    pub async fn send(&self, endpoint: &str, source: &str, target: &str) -> Result<(), ServiceError> {
        let response = self
            .http
            .post(endpoint)
            .form(&[("source", source), ("target", target)])
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let reason = parse_error_body(&body).unwrap_or(body);
        Err(ServiceError::UnexpectedStatus { status, body: reason })
    }
}

fn parse_error_body(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error_description")
        .or_else(|| value.get("error"))
        .and_then(|v| v.as_str())
        .map(str::to_owned)
}

/// Extracts outbound `<a href>` links from post HTML, per spec §4.K: drop
/// non-http(s), fragment-only, and same-origin links; normalize to
/// scheme+host+path+query (no fragment). Caps parsing at 5 MiB.
pub fn extract_outbound_links(html: &str, post_url: &str) -> Vec<String> {
    let capped = if html.len() > MAX_HTML_BYTES {
        log::warn!("webmention link extraction truncated input at {MAX_HTML_BYTES} bytes");
        &html[..MAX_HTML_BYTES]
    } else {
        html
    };

    let post_origin = Url::parse(post_url).ok().map(|u| normalized_origin(&u));

    let document = Html::parse_fragment(capped);
    let selector = Selector::parse("a[href]").expect("static selector is valid");

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(parsed) = Url::parse(href) else {
            continue;
        };
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            continue;
        }
        if href.starts_with('#') {
            continue;
        }
        if let Some(ref origin) = post_origin {
            if &normalized_origin(&parsed) == origin {
                continue;
            }
        }
        let normalized = normalize(&parsed);
        if seen.insert(normalized.clone()) {
            links.push(normalized);
        }
    }
    links
}

fn normalized_origin(url: &Url) -> String {
    format!(
        "{}://{}",
        url.scheme().to_lowercase(),
        url.host_str().unwrap_or_default().to_lowercase()
    )
}

fn normalize(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized.as_str().trim_end_matches('/').to_owned()
}

/// Computes the set of targets to (re-)notify on a post update: every
/// currently-linked URL plus every previously-notified URL that is no
/// longer linked (spec §4.K, §8 testable property #8).
pub fn diff_targets_on_update(current: &[String], previous: &[String]) -> Vec<String> {
    let current_set: HashSet<&String> = current.iter().collect();
    let mut targets: Vec<String> = current.to_vec();
    for url in previous {
        if !current_set.contains(url) && !targets.contains(url) {
            targets.push(url.clone());
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_outbound_links_drops_same_origin_and_fragments() {
        let html = r#"
            <a href="https://external.example/a">ext</a>
            <a href="https://blog.example.com/other-post">same origin</a>
            <a href="#section">fragment only</a>
            <a href="ftp://files.example/x">non-http</a>
        "#;
        let links = extract_outbound_links(html, "https://blog.example.com/my-post/");
        assert_eq!(links, vec!["https://external.example/a"]);
    }

    #[test]
    fn test_extract_outbound_links_dedupes_and_normalizes_fragment() {
        let html = r#"
            <a href="https://external.example/a#frag">one</a>
            <a href="https://external.example/a">two</a>
        "#;
        let links = extract_outbound_links(html, "https://blog.example.com/my-post/");
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn test_diff_targets_on_update_unions_current_and_removed() {
        let current = vec!["https://a.example".to_owned(), "https://b.example".to_owned()];
        let previous = vec!["https://b.example".to_owned(), "https://c.example".to_owned()];
        let mut targets = diff_targets_on_update(&current, &previous);
        targets.sort();
        assert_eq!(
            targets,
            vec!["https://a.example", "https://b.example", "https://c.example"]
        );
    }
}
