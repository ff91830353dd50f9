use std::path::Path;

use serde_yaml::Value;

/// Walks a parsed YAML document and, for every mapping key ending in
/// `_file`, reads the referenced file (trimming trailing whitespace) and
/// inserts its content under the sibling key with the `_file` suffix
/// stripped — e.g. `access_token_file: /run/secrets/token` yields an
/// `access_token` key holding the file's content. Recurses into nested
/// mappings and sequences, since account lists nest several levels deep.
///
/// Missing files are logged and skipped rather than treated as fatal: a
/// config referencing a not-yet-provisioned secret file shouldn't prevent
/// the rest of the service (and unrelated accounts) from starting.
pub fn resolve_file_secrets(value: &mut Value) {
    match value {
        Value::Mapping(map) => {
            let file_keys: Vec<Value> = map
                .keys()
                .filter(|k| {
                    k.as_str()
                        .map(|s| s.ends_with("_file"))
                        .unwrap_or(false)
                })
                .cloned()
                .collect();
            for key in file_keys {
                let key_str = key.as_str().expect("filtered to string keys above").to_owned();
                let Some(Value::String(path)) = map.get(&key) else {
                    continue;
                };
                match read_secret_file(path) {
                    Ok(content) => {
                        let target_key = key_str.trim_end_matches("_file").to_owned();
                        map.insert(Value::String(target_key), Value::String(content));
                    }
                    Err(error) => {
                        log::warn!("failed to read secret file {path}: {error}");
                    }
                }
            }
            for (_, nested) in map.iter_mut() {
                resolve_file_secrets(nested);
            }
        }
        Value::Sequence(seq) => {
            for item in seq.iter_mut() {
                resolve_file_secrets(item);
            }
        }
        _ => {}
    }
}

fn read_secret_file(path: &str) -> std::io::Result<String> {
    let content = std::fs::read_to_string(Path::new(path))?;
    Ok(content.trim_end().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_file_secrets_reads_and_strips() {
        let dir = std::env::temp_dir().join(format!("posse-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let secret_path = dir.join("token");
        std::fs::write(&secret_path, "s3cr3t\n").unwrap();

        let yaml = format!(
            "mastodon:\n  accounts:\n    - name: personal\n      access_token_file: {}\n",
            secret_path.display(),
        );
        let mut value: Value = serde_yaml::from_str(&yaml).unwrap();
        resolve_file_secrets(&mut value);

        let token = value["mastodon"]["accounts"][0]["access_token"]
            .as_str()
            .unwrap();
        assert_eq!(token, "s3cr3t");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_resolve_file_secrets_missing_file_is_skipped_not_fatal() {
        let yaml = "pushover:\n  app_token_file: /does/not/exist\n";
        let mut value: Value = serde_yaml::from_str(yaml).unwrap();
        resolve_file_secrets(&mut value);
        assert!(value["pushover"].get("app_token").is_none());
    }
}
