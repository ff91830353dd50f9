use std::collections::HashSet;

use serde_json::Value;
use url::Url;

use posse_utils::html::extract_images;

const NOSPLIT_TAG: &str = "#nosplit";

/// A tag attached to a Ghost post: `{name, slug}` (spec §3 "Extracted post").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub slug: String,
}

/// The fields the dispatcher needs, derived from `post.current` (spec §3
/// "Extracted post", §4.E).
#[derive(Debug, Clone)]
pub struct ExtractedPost {
    pub post_id: String,
    pub post_url: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub status: String,
    pub image_urls: Vec<String>,
    pub alt_texts: Vec<String>,
    pub tags: Vec<Tag>,
    pub suppress_split: bool,
}

impl ExtractedPost {
    pub fn tag_slugs(&self) -> HashSet<String> {
        self.tags.iter().map(|t| t.slug.to_lowercase()).collect()
    }
}

/// Extracts dispatch-relevant fields from `post.current`, per spec §4.E.
pub fn extract_post(current: &Value) -> ExtractedPost {
    let post_id = current["id"].as_str().unwrap_or_default().to_owned();
    let post_url = current["url"].as_str().unwrap_or_default().to_owned();
    let title = current["title"].as_str().unwrap_or_default().to_owned();
    let excerpt = current["custom_excerpt"].as_str().map(str::to_owned);
    let status = current["status"].as_str().unwrap_or_default().to_owned();

    let (tags, suppress_split) = extract_tags(current);
    let (image_urls, alt_texts) = extract_ordered_images(current, &post_url);

    ExtractedPost {
        post_id,
        post_url,
        title,
        excerpt,
        status,
        image_urls,
        alt_texts,
        tags,
        suppress_split,
    }
}

/// Reads `tags: [{name, slug}]`, stripping a `#nosplit` tag (case-
/// insensitive) and reporting whether one was present (spec §4.E "Tag
/// handling").
fn extract_tags(current: &Value) -> (Vec<Tag>, bool) {
    let mut suppress_split = false;
    let tags = current["tags"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|t| {
                    let name = t["name"].as_str()?.to_owned();
                    let slug = t["slug"].as_str().unwrap_or_default().to_owned();
                    if name.eq_ignore_ascii_case(NOSPLIT_TAG) {
                        suppress_split = true;
                        return None;
                    }
                    Some(Tag { name, slug })
                })
                .collect()
        })
        .unwrap_or_default();
    (tags, suppress_split)
}

/// Gathers every candidate image (in-body `<img>` plus the feature image),
/// dedupes by URL, drops external hosts when the post URL's host is known,
/// and orders feature-image-first (else URL-sorted), per spec §4.E steps
/// 1-6.
fn extract_ordered_images(current: &Value, post_url: &str) -> (Vec<String>, Vec<String>) {
    let html = current["html"].as_str().unwrap_or_default();
    let feature_image = current["feature_image"].as_str().map(str::to_owned);
    let feature_image_alt = current["feature_image_alt"].as_str().unwrap_or_default().to_owned();

    let mut seen = HashSet::new();
    let mut candidates: Vec<(String, String)> = Vec::new();

    if let Some(ref feature_url) = feature_image {
        if seen.insert(feature_url.clone()) {
            candidates.push((feature_url.clone(), feature_image_alt));
        }
    }
    for image in extract_images(html) {
        if seen.insert(image.url.clone()) {
            candidates.push((image.url, image.alt));
        }
    }

    let post_host = Url::parse(post_url).ok().and_then(|u| {
        u.host_str().map(|h| match u.port() {
            Some(port) => format!("{h}:{port}"),
            None => h.to_owned(),
        })
    });

    let mut kept: Vec<(String, String)> = match post_host {
        Some(host) => candidates
            .into_iter()
            .filter(|(url, _)| image_host(url).as_deref() == Some(host.as_str()))
            .collect(),
        // No determinable post host: keep everything (backward-compat).
        None => candidates,
    };

    match feature_image.filter(|f| kept.iter().any(|(url, _)| url == f)) {
        Some(feature_url) => {
            let pos = kept.iter().position(|(url, _)| *url == feature_url).expect("just checked present");
            let feature_entry = kept.remove(pos);
            kept.insert(0, feature_entry);
        }
        None => kept.sort_by(|a, b| a.0.cmp(&b.0)),
    }

    kept.into_iter().unzip()
}

fn image_host(url: &str) -> Option<String> {
    Url::parse(url).ok().and_then(|u| {
        u.host_str().map(|h| match u.port() {
            Some(port) => format!("{h}:{port}"),
            None => h.to_owned(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(html: &str, feature_image: Option<&str>, tags: Value) -> Value {
        json!({
            "id": "abc123",
            "url": "https://blog.example.com/my-post/",
            "title": "Hello",
            "status": "published",
            "html": html,
            "feature_image": feature_image,
            "tags": tags,
        })
    }

    #[test]
    fn test_feature_image_first_when_kept() {
        let current = post(
            r#"<img src="https://blog.example.com/b.jpg" alt="b">"#,
            Some("https://blog.example.com/a.jpg"),
            json!([]),
        );
        let extracted = extract_post(&current);
        assert_eq!(extracted.image_urls, vec!["https://blog.example.com/a.jpg", "https://blog.example.com/b.jpg"]);
    }

    #[test]
    fn test_external_images_are_filtered() {
        let current = post(
            r#"<img src="https://cdn.other.com/x.jpg"><img src="https://blog.example.com/y.jpg">"#,
            None,
            json!([]),
        );
        let extracted = extract_post(&current);
        assert_eq!(extracted.image_urls, vec!["https://blog.example.com/y.jpg"]);
    }

    #[test]
    fn test_dedupe_by_url() {
        let current = post(
            r#"<img src="https://blog.example.com/a.jpg">"#,
            Some("https://blog.example.com/a.jpg"),
            json!([]),
        );
        let extracted = extract_post(&current);
        assert_eq!(extracted.image_urls.len(), 1);
    }

    #[test]
    fn test_url_sorted_when_no_feature_image() {
        let current = post(
            r#"<img src="https://blog.example.com/z.jpg"><img src="https://blog.example.com/a.jpg">"#,
            None,
            json!([]),
        );
        let extracted = extract_post(&current);
        assert_eq!(extracted.image_urls, vec!["https://blog.example.com/a.jpg", "https://blog.example.com/z.jpg"]);
    }

    #[test]
    fn test_nosplit_tag_suppresses_split_and_is_stripped() {
        let current = post(
            "",
            None,
            json!([{"name": "Tech", "slug": "tech"}, {"name": "#NoSplit", "slug": "nosplit"}]),
        );
        let extracted = extract_post(&current);
        assert!(extracted.suppress_split);
        assert_eq!(extracted.tags.len(), 1);
        assert_eq!(extracted.tags[0].slug, "tech");
    }

    #[test]
    fn test_no_post_host_keeps_everything() {
        let current = post(
            r#"<img src="https://cdn.other.com/x.jpg">"#,
            None,
            json!([]),
        );
        let mut current = current;
        current["url"] = json!("not a url");
        let extracted = extract_post(&current);
        assert_eq!(extracted.image_urls, vec!["https://cdn.other.com/x.jpg"]);
    }
}
