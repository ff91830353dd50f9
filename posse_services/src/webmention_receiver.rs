use std::net::IpAddr;
use std::time::Duration;

use regex::RegexBuilder;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::errors::ServiceError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

const AUTHOR_NAME_MAX: usize = 200;
const URL_MAX: usize = 2048;
const HTML_MAX: usize = 10_000;
const TEXT_MAX: usize = 10_000;

/// The outcome of asynchronously verifying a received webmention's source
/// against its target, per spec §4.L.
pub enum SourceVerification {
    /// The source links to the target and its h-entry was parsed.
    Verified(ExtractedMention),
    /// The source no longer exists (404/410): the pending record should be deleted.
    Gone,
    /// The source doesn't verify, for the given reason.
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MentionKind {
    Mention,
    Reply,
    Like,
    Repost,
    Bookmark,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractedMention {
    pub mention_type: Option<MentionKind>,
    pub author_name: Option<String>,
    pub author_url: Option<String>,
    pub author_photo: Option<String>,
    pub content_html: Option<String>,
    pub content_text: Option<String>,
}

/// `true` iff `host` is safe to fetch from: not a loopback, private,
/// link-local, or unspecified address. SSRF guard for spec §4.L.
pub async fn is_safe_source_host(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else { return false };
    let Some(host) = parsed.host_str() else { return false };

    if let Ok(ip) = host.parse::<IpAddr>() {
        return is_safe_ip(&ip);
    }
    if host.eq_ignore_ascii_case("localhost") {
        return false;
    }

    match tokio::net::lookup_host((host, parsed.port_or_known_default().unwrap_or(80))).await {
        Ok(addrs) => {
            let addrs: Vec<_> = addrs.collect();
            !addrs.is_empty() && addrs.iter().all(|addr| is_safe_ip(&addr.ip()))
        }
        Err(_) => false,
    }
}

fn is_safe_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !v4.is_loopback() && !v4.is_private() && !v4.is_link_local() && !v4.is_unspecified()
        }
        IpAddr::V6(v6) => !v6.is_loopback() && !v6.is_unspecified(),
    }
}

/// Fetches `source`, confirms it links to `target`, and extracts its h-entry.
pub async fn verify_source(
    http: &reqwest::Client,
    source: &str,
    target: &str,
) -> Result<SourceVerification, ServiceError> {
    if !is_safe_source_host(source).await {
        return Ok(SourceVerification::Rejected(
            "source host is private or loopback".to_owned(),
        ));
    }

    let response = match http
        .get(source)
        .timeout(FETCH_TIMEOUT)
        .header("Accept", "text/html, application/xhtml+xml, */*")
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => return Ok(SourceVerification::Rejected(format!("fetch failed: {err}"))),
    };

    let status = response.status();
    if status.as_u16() == 404 || status.as_u16() == 410 {
        return Ok(SourceVerification::Gone);
    }
    if !status.is_success() {
        return Ok(SourceVerification::Rejected(format!("source returned HTTP {status}")));
    }

    let body = match read_capped_body(response).await {
        Ok(body) => body,
        Err(err) => return Ok(SourceVerification::Rejected(format!("error reading source: {err}"))),
    };

    if !links_to_target(&body, target) {
        return Ok(SourceVerification::Rejected(
            "source does not contain a link to the target URL".to_owned(),
        ));
    }

    Ok(SourceVerification::Verified(extract_mention(&body, target)))
}

async fn read_capped_body(mut response: reqwest::Response) -> Result<String, ServiceError> {
    let mut buf = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        buf.extend_from_slice(&chunk);
        if buf.len() >= MAX_BODY_BYTES {
            buf.truncate(MAX_BODY_BYTES);
            break;
        }
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// `true` iff `body` contains `href="{target}"` or `href="{target}/"`,
/// quote-agnostic and case-insensitive.
fn links_to_target(body: &str, target: &str) -> bool {
    let target_no_slash = target.trim_end_matches('/');
    let pattern = format!(
        r#"href\s*=\s*['"]{}/?['"]"#,
        regex::escape(target_no_slash)
    );
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map(|re| re.is_match(body))
        .unwrap_or(false)
}

/// Parses microformats2, locates the first h-entry (document order, which
/// includes nested elements), and extracts its author/content/mention type.
fn extract_mention(body: &str, target: &str) -> ExtractedMention {
    let document = Html::parse_document(body);
    let entry_selector = Selector::parse(".h-entry").expect("static selector is valid");
    let Some(entry) = document.select(&entry_selector).next() else {
        return ExtractedMention::default();
    };

    ExtractedMention {
        mention_type: Some(mention_type_of(&entry, target)),
        author_name: extract_author_name(&entry).map(|s| truncate(&s, AUTHOR_NAME_MAX)),
        author_url: extract_author_url(&entry).map(|s| truncate(&s, URL_MAX)),
        author_photo: extract_author_photo(&entry).map(|s| truncate(&s, URL_MAX)),
        content_html: extract_content_html(&entry).map(|s| truncate(&s, HTML_MAX)),
        content_text: extract_content_text(&entry).map(|s| truncate(&s, TEXT_MAX)),
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn mention_type_of(entry: &ElementRef, target: &str) -> MentionKind {
    let target_norm = target.trim_end_matches('/');
    const PROPERTIES: &[(&str, MentionKind)] = &[
        ("u-in-reply-to", MentionKind::Reply),
        ("u-like-of", MentionKind::Like),
        ("u-repost-of", MentionKind::Repost),
        ("u-bookmark-of", MentionKind::Bookmark),
    ];
    for (class, kind) in PROPERTIES {
        let selector = Selector::parse(&format!(".{class}")).expect("static selector is valid");
        for element in entry.select(&selector) {
            let value = element
                .value()
                .attr("href")
                .map(str::to_owned)
                .unwrap_or_else(|| element.text().collect::<String>());
            if value.trim().trim_end_matches('/') == target_norm {
                return kind.clone();
            }
        }
    }
    MentionKind::Mention
}

fn extract_author_name(entry: &ElementRef) -> Option<String> {
    let author = find_first(entry, ".p-author")?;
    if let Some(name_el) = find_first(&author, ".p-name") {
        return Some(collect_text(&name_el));
    }
    let text = collect_text(&author);
    (!text.is_empty()).then_some(text)
}

fn extract_author_url(entry: &ElementRef) -> Option<String> {
    let author = find_first(entry, ".p-author")?;
    if let Some(href) = author.value().attr("href") {
        return Some(href.to_owned());
    }
    let selector = Selector::parse(".u-url").expect("static selector is valid");
    author
        .select(&selector)
        .find_map(|el| el.value().attr("href").map(str::to_owned))
}

fn extract_author_photo(entry: &ElementRef) -> Option<String> {
    let author = find_first(entry, ".p-author")?;
    let selector = Selector::parse(".u-photo").expect("static selector is valid");
    author
        .select(&selector)
        .find_map(|el| el.value().attr("src").map(str::to_owned))
}

fn extract_content_html(entry: &ElementRef) -> Option<String> {
    let content = find_first(entry, ".e-content")?;
    Some(content.inner_html())
}

fn extract_content_text(entry: &ElementRef) -> Option<String> {
    let content = find_first(entry, ".e-content")?;
    Some(collect_text(&content))
}

fn find_first<'a>(root: &ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).expect("static selector is valid");
    root.select(&selector).next()
}

fn collect_text(element: &ElementRef) -> String {
    element.text().collect::<Vec<_>>().join("").trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_to_target_quote_and_case_agnostic() {
        assert!(links_to_target(r#"<a HREF='https://blog.example.com/p'>x</a>"#, "https://blog.example.com/p"));
        assert!(links_to_target(r#"<a href="https://blog.example.com/p/">x</a>"#, "https://blog.example.com/p"));
        assert!(!links_to_target("<a href=\"https://other.example/p\">x</a>", "https://blog.example.com/p"));
    }

    #[test]
    fn test_extract_mention_reply() {
        let html = r#"
            <div class="h-entry">
              <div class="p-author h-card"><a class="u-url" href="https://alice.example">Alice</a></div>
              <div class="e-content">Nice post!</div>
              <a class="u-in-reply-to" href="https://blog.example.com/p/"></a>
            </div>
        "#;
        let mention = extract_mention(html, "https://blog.example.com/p");
        assert_eq!(mention.mention_type, Some(MentionKind::Reply));
        assert_eq!(mention.author_url.as_deref(), Some("https://alice.example"));
        assert_eq!(mention.content_text.as_deref(), Some("Nice post!"));
    }

    #[test]
    fn test_extract_mention_defaults_to_mention_kind() {
        let html = r#"<div class="h-entry"><div class="p-author h-card">Bob</div></div>"#;
        let mention = extract_mention(html, "https://blog.example.com/p");
        assert_eq!(mention.mention_type, Some(MentionKind::Mention));
        assert_eq!(mention.author_name.as_deref(), Some("Bob"));
    }

    #[test]
    fn test_is_safe_ip_rejects_private_and_loopback() {
        assert!(!is_safe_ip(&"127.0.0.1".parse().unwrap()));
        assert!(!is_safe_ip(&"10.0.0.5".parse().unwrap()));
        assert!(!is_safe_ip(&"192.168.1.1".parse().unwrap()));
        assert!(is_safe_ip(&"93.184.216.34".parse().unwrap()));
    }
}
