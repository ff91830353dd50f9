use std::sync::Arc;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::json;
use url::Url;

use posse_models::mappings::MappingStore;
use posse_services::social::SocialClient;

/// Cap on posts pulled per account while searching for a prior mention of
/// the Ghost post (spec §4.J).
const DEFAULT_MAX_POSTS_PER_ACCOUNT: usize = 50;

/// Finds and records `(platform, account)` entries for a Ghost post that
/// was cross-posted before this service tracked the mapping, per spec
/// §4.J. Returns `true` if any new entry was added.
pub async fn discover_mapping(
    clients: &[Arc<dyn SocialClient>],
    mappings: &MappingStore,
    ghost_post_id: &str,
    ghost_post_url: &str,
) -> bool {
    let normalized_target = normalize_url(ghost_post_url);
    let mut found_any = false;

    for client in clients {
        if !client.is_enabled() {
            continue;
        }

        let existing = mappings.get_mapping(ghost_post_id).ok().flatten();
        let already_mapped = existing
            .as_ref()
            .and_then(|m| m.platforms.get(client.platform()))
            .is_some_and(|accounts| accounts.contains_key(client.account_name()));
        if already_mapped {
            continue;
        }

        let posts = match client.fetch_recent_posts(DEFAULT_MAX_POSTS_PER_ACCOUNT).await {
            Ok(posts) => posts,
            Err(err) => {
                log::warn!(
                    "discovery: fetch_recent_posts failed for {}/{}: {err}",
                    client.platform(),
                    client.account_name()
                );
                continue;
            }
        };

        let Some(matched) = posts
            .into_iter()
            .find(|post| candidate_urls(client.platform(), &post.text).any(|url| normalize_url(&url) == normalized_target))
        else {
            continue;
        };

        let post_data = json!({
            "status_id": matched.id,
            "post_uri": matched.id,
            "post_url": matched.url,
            "discovered": true,
        });
        match mappings.put_mapping_entry(ghost_post_id, ghost_post_url, client.platform(), client.account_name(), post_data, false) {
            Ok(_) => found_any = true,
            Err(err) => log::warn!("discovery: failed to record mapping entry: {err}"),
        }
    }

    found_any
}

/// Extracts candidate URLs from a platform post's text: Mastodon posts are
/// HTML so both `href` attributes and bare URLs in the stripped text are
/// considered; Bluesky posts are plain text.
fn candidate_urls(platform: &str, text: &str) -> Box<dyn Iterator<Item = String> + '_> {
    if platform == "mastodon" {
        Box::new(mastodon_candidate_urls(text).into_iter())
    } else {
        Box::new(bare_urls(text).into_iter())
    }
}

fn mastodon_candidate_urls(html: &str) -> Vec<String> {
    let document = Html::parse_fragment(html);
    let selector = Selector::parse("a[href]").expect("static selector is valid");
    let mut urls: Vec<String> = document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .map(str::to_owned)
        .collect();

    let plaintext = strip_tags(html);
    urls.extend(bare_urls(&plaintext));
    urls
}

fn strip_tags(html: &str) -> String {
    let document = Html::parse_fragment(html);
    document.root_element().text().collect::<Vec<_>>().join(" ")
}

fn bare_urls(text: &str) -> Vec<String> {
    let pattern = Regex::new(r"https?://[^\s<>\x22]+").expect("static regex is valid");
    pattern.find_iter(text).map(|m| m.as_str().to_owned()).collect()
}

/// Strips trailing slash, query, and fragment for comparison purposes
/// (spec §4.J step 1 / §4.K link extraction normalization).
fn normalize_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            let s = parsed.as_str().trim_end_matches('/').to_owned();
            s
        }
        Err(_) => url.trim_end_matches('/').to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_trailing_slash_query_fragment() {
        assert_eq!(
            normalize_url("https://blog.example.com/p/?utm=1#frag"),
            "https://blog.example.com/p"
        );
    }

    #[test]
    fn test_bare_urls_finds_plain_links() {
        let text = "check this out https://blog.example.com/p/ thanks";
        let urls = bare_urls(text);
        assert_eq!(urls, vec!["https://blog.example.com/p/"]);
    }

    #[test]
    fn test_mastodon_candidate_urls_includes_href_and_plaintext() {
        let html = r#"<p>New post <a href="https://blog.example.com/p/">here</a></p>"#;
        let urls = mastodon_candidate_urls(html);
        assert!(urls.contains(&"https://blog.example.com/p/".to_owned()));
    }
}
