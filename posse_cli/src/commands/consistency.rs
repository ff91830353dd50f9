use std::collections::HashSet;

use anyhow::Error;
use clap::Parser;

use posse_config::Config;
use posse_models::init_pool;
use posse_models::mappings::{identity_key, MappingEntry, MappingStore};
use posse_validators::post_id::validate_post_id;

/// Validates every stored syndication mapping: the `ghost_post_id` is a
/// well-formed 24-hex id, and no `(platform, account)` split list contains
/// two entries with the same identity key (`status_id`/`post_uri`).
#[derive(Parser)]
pub struct CheckConsistency;

impl CheckConsistency {
    pub async fn execute(&self, config: &Config) -> Result<(), Error> {
        let pool = init_pool(&config.interactions_db_path())?;
        let mappings = MappingStore::new(pool, config.storage_dir.clone());

        let mut problems = 0;
        for id in mappings.list_ids()? {
            if let Err(error) = validate_post_id(&id) {
                println!("{id}: invalid ghost_post_id ({error})");
                problems += 1;
                continue;
            }

            let Some(mapping) = mappings.get_mapping(&id)? else {
                continue;
            };
            for (platform, accounts) in &mapping.platforms {
                for (account, entry) in accounts {
                    let MappingEntry::Split(entries) = entry else {
                        continue;
                    };
                    let mut seen = HashSet::new();
                    for value in entries {
                        let Some(key) = identity_key(value) else {
                            continue;
                        };
                        if !seen.insert(key.to_string()) {
                            println!("{id}: duplicate identity key in {platform}/{account}: {key}");
                            problems += 1;
                        }
                    }
                }
            }
        }

        if problems == 0 {
            println!("no inconsistencies found");
        } else {
            println!("{problems} inconsistency/inconsistencies found");
        }
        Ok(())
    }
}
