use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use posse_models::mappings::{MappingEntry, MappingStore};
use posse_models::interactions::InteractionStore;
use posse_models::DatabaseError;
use posse_services::notifications::PushoverNotifier;
use posse_services::social::{InteractionCounts, ReplyPreview, SocialClient};

const MAX_REPLY_PREVIEWS: usize = 20;

/// Refreshes the interaction record for `ghost_post_id`, per spec §4.H.
/// Failures calling an individual platform leave that platform/account's
/// previously-stored value untouched.
pub async fn sync_post_interactions(
    clients: &[Arc<dyn SocialClient>],
    mappings: &MappingStore,
    interactions: &InteractionStore,
    notifier: Option<&PushoverNotifier>,
    ghost_post_id: &str,
    post_title: &str,
) -> Result<Value, DatabaseError> {
    let Some(mapping) = mappings.get_mapping(ghost_post_id)? else {
        return Ok(json!({}));
    };

    let existing = interactions
        .get_interactions(ghost_post_id)?
        .filter(Value::is_object)
        .unwrap_or_else(|| json!({}));
    let previous_reply_urls: HashSet<String> = existing["reply_previews"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|r| r["url"].as_str().map(str::to_owned))
        .collect();

    let mut syndication_links = Map::new();
    let mut platform_counts = Map::new();
    let mut all_replies: Vec<Value> = Vec::new();

    for (platform, accounts) in &mapping.platforms {
        let mut links_for_platform = Map::new();
        let mut counts_for_platform = Map::new();

        for (account, entry) in accounts {
            let preserved_link = existing["syndication_links"][platform][account].clone();
            let preserved_counts = existing["platforms"][platform][account].clone();

            let client = clients
                .iter()
                .find(|c| c.platform() == platform.as_str() && c.account_name() == account.as_str());
            let Some(client) = client else {
                if !preserved_link.is_null() {
                    links_for_platform.insert(account.clone(), preserved_link);
                }
                if !preserved_counts.is_null() {
                    counts_for_platform.insert(account.clone(), preserved_counts);
                }
                continue;
            };

            match entry {
                MappingEntry::Single(value) => {
                    let identifier = identifier_of(value);
                    let post_url = value["post_url"].as_str().unwrap_or_default().to_owned();
                    match client.fetch_status_interactions(identifier).await {
                        Ok(interactions) => {
                            links_for_platform.insert(account.clone(), Value::String(post_url.clone()));
                            counts_for_platform.insert(account.clone(), counts_to_json(&interactions.counts));
                            all_replies.extend(interactions.reply_previews.into_iter().map(|r| reply_to_json(&r, None, None)));
                        }
                        Err(err) => {
                            log::warn!("interaction sync failed for {platform}/{account}: {err}");
                            if !preserved_link.is_null() {
                                links_for_platform.insert(account.clone(), preserved_link);
                            }
                            if !preserved_counts.is_null() {
                                counts_for_platform.insert(account.clone(), preserved_counts);
                            }
                        }
                    }
                }
                MappingEntry::Split(entries) => {
                    let mut total = InteractionCounts::default();
                    let mut replies = Vec::new();
                    let mut any_ok = false;
                    for (split_index, value) in entries.iter().enumerate() {
                        let identifier = identifier_of(value);
                        let split_post_url = value["post_url"].as_str().unwrap_or_default().to_owned();
                        match client.fetch_status_interactions(identifier).await {
                            Ok(interactions) => {
                                any_ok = true;
                                total.favorites += interactions.counts.favorites;
                                total.reblogs += interactions.counts.reblogs;
                                total.replies += interactions.counts.replies;
                                replies.extend(
                                    interactions
                                        .reply_previews
                                        .into_iter()
                                        .map(|r| reply_to_json(&r, Some(split_index), Some(&split_post_url))),
                                );
                            }
                            Err(err) => {
                                log::warn!("interaction sync failed for {platform}/{account} split {split_index}: {err}");
                            }
                        }
                    }
                    if any_ok {
                        let first_url = entries
                            .first()
                            .and_then(|v| v["post_url"].as_str())
                            .unwrap_or_default()
                            .to_owned();
                        links_for_platform.insert(account.clone(), Value::String(first_url));
                        counts_for_platform.insert(account.clone(), counts_to_json(&total));
                        all_replies.extend(replies);
                    } else {
                        if !preserved_link.is_null() {
                            links_for_platform.insert(account.clone(), preserved_link);
                        }
                        if !preserved_counts.is_null() {
                            counts_for_platform.insert(account.clone(), preserved_counts);
                        }
                    }
                }
            }
        }

        syndication_links.insert(platform.clone(), Value::Object(links_for_platform));
        platform_counts.insert(platform.clone(), Value::Object(counts_for_platform));
    }

    all_replies.sort_by(|a, b| a["created_at"].as_str().cmp(&b["created_at"].as_str()));
    all_replies.truncate(MAX_REPLY_PREVIEWS);

    let result = json!({
        "syndication_links": syndication_links,
        "platforms": platform_counts,
        "reply_previews": all_replies,
    });

    interactions.put_interactions(ghost_post_id, result.clone())?;

    if let Some(notifier) = notifier {
        for reply in &all_replies {
            let Some(url) = reply["url"].as_str() else { continue };
            if previous_reply_urls.contains(url) {
                continue;
            }
            let author = reply["author_handle"].as_str().unwrap_or("someone");
            if let Err(err) = notifier.notify_new_reply(post_title, author, url).await {
                log::warn!("failed to send new-reply notification for {url}: {err}");
            }
        }
    }

    Ok(result)
}

fn identifier_of(value: &Value) -> &str {
    value["post_uri"]
        .as_str()
        .or_else(|| value["status_id"].as_str())
        .unwrap_or_default()
}

fn counts_to_json(counts: &InteractionCounts) -> Value {
    json!({
        "favorites": counts.favorites,
        "reblogs": counts.reblogs,
        "replies": counts.replies,
    })
}

fn reply_to_json(reply: &ReplyPreview, split_index: Option<usize>, split_post_url: Option<&str>) -> Value {
    let mut value = json!({
        "author_handle": reply.author_handle,
        "author_url": reply.author_url,
        "author_avatar": reply.author_avatar,
        "content": reply.content,
        "created_at": reply.created_at.to_rfc3339(),
        "url": reply.url,
    });
    if let (Some(index), Some(map)) = (split_index, value.as_object_mut()) {
        map.insert("split_index".to_owned(), json!(index));
        map.insert("split_post_url".to_owned(), json!(split_post_url.unwrap_or_default()));
    }
    value
}
