use std::fs;
use std::path::Path;

use anyhow::Error;
use clap::Parser;

use posse_config::Config;
use posse_models::{init_pool, interactions::InteractionStore, mappings::MappingStore};

/// One-shot backfill of legacy per-post JSON files into SQLite, performing
/// the same operation the stores already do transparently on read (spec §6
/// "Persisted state").
#[derive(Parser)]
pub struct MigrateLegacy {
    /// List the files that would be migrated without writing anything
    #[arg(long)]
    dry_run: bool,
}

impl MigrateLegacy {
    pub async fn execute(&self, config: &Config) -> Result<(), Error> {
        let pool = init_pool(&config.interactions_db_path())?;
        let mappings = MappingStore::new(pool.clone(), config.storage_dir.clone());
        let interactions = InteractionStore::new(pool, config.storage_dir.clone());

        let mapping_ids = legacy_ids(&config.storage_dir.join("syndication_mappings"))?;
        let interaction_ids = legacy_ids(&config.storage_dir)?;

        println!(
            "found {} legacy mapping file(s), {} legacy interaction file(s)",
            mapping_ids.len(),
            interaction_ids.len(),
        );
        if self.dry_run {
            for id in &mapping_ids {
                println!("mapping: {id}");
            }
            for id in &interaction_ids {
                println!("interactions: {id}");
            }
            return Ok(());
        }

        let mut migrated_mappings = 0;
        for id in &mapping_ids {
            match mappings.get_mapping(id) {
                Ok(Some(_)) => migrated_mappings += 1,
                Ok(None) => {}
                Err(error) => log::warn!("failed to migrate mapping {id}: {error}"),
            }
        }

        let mut migrated_interactions = 0;
        for id in &interaction_ids {
            match interactions.get_interactions(id) {
                Ok(Some(_)) => migrated_interactions += 1,
                Ok(None) => {}
                Err(error) => log::warn!("failed to migrate interactions {id}: {error}"),
            }
        }

        println!("backfilled {migrated_mappings} mapping(s), {migrated_interactions} interaction record(s)");
        Ok(())
    }
}

/// Lists the `.json` file stems directly inside `dir`, non-recursive.
fn legacy_ids(dir: &Path) -> Result<Vec<String>, Error> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut ids = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            ids.push(stem.to_owned());
        }
    }
    Ok(ids)
}
