use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use posse_utils::files::extension_for_url;
use posse_utils::hashing::cache_key;
use tokio::io::AsyncWriteExt;

use crate::errors::ServiceError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Content-addressed on-disk image cache (spec §4.C). Shared read/write by
/// every platform client; files are written exactly once via an
/// exclusive-create guard, so concurrent fetches of the same URL race
/// harmlessly onto the same path.
pub struct ImageCache {
    cache_root: PathBuf,
    client: reqwest::Client,
}

impl ImageCache {
    pub fn new(cache_root: PathBuf) -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("reqwest client builds with static config");
        Self { cache_root, client }
    }

    fn path_for(&self, url: &str) -> PathBuf {
        let ext = extension_for_url(url);
        self.cache_root.join(format!("{}.{ext}", cache_key(url)))
    }

    /// Returns the local path for `url`, downloading it first if absent.
    /// Tolerates a concurrent peer winning the exclusive-create race.
    pub async fn fetch(&self, url: &str) -> Result<PathBuf, ServiceError> {
        ensure_cache_root(&self.cache_root).await?;
        let path = self.path_for(url);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(path);
        }

        let file = open_exclusive(&path).await?;
        let Some(mut file) = file else {
            // A peer won the create race; its write is in flight or done.
            return Ok(path);
        };

        match self.download_into(url, &mut file).await {
            Ok(()) => Ok(path),
            Err(err) => {
                let _ = tokio::fs::remove_file(&path).await;
                Err(err)
            }
        }
    }

    async fn download_into(&self, url: &str, file: &mut tokio::fs::File) -> Result<(), ServiceError> {
        let response = self.client.get(url).send().await?;
        let response = response.error_for_status().map_err(|err| {
            ServiceError::UnexpectedStatus {
                status: err.status().map(|s| s.as_u16()).unwrap_or(0),
                body: url.to_owned(),
            }
        })?;
        let bytes = response.bytes().await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        Ok(())
    }

    /// Unlinks each cached file, ignoring ones that no longer exist.
    pub async fn release(&self, urls: &[String]) {
        for url in urls {
            let path = self.path_for(url);
            if let Err(err) = tokio::fs::remove_file(&path).await {
                if err.kind() != io::ErrorKind::NotFound {
                    log::warn!("failed to release cached image {path:?}: {err}");
                }
            }
        }
    }
}

async fn ensure_cache_root(root: &Path) -> Result<(), ServiceError> {
    tokio::fs::create_dir_all(root).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        tokio::fs::set_permissions(root, perms).await?;
    }
    Ok(())
}

/// Opens `path` for exclusive writing, returning `None` if another writer
/// already holds it (the tolerated race from spec §4.C).
async fn open_exclusive(path: &Path) -> Result<Option<tokio::fs::File>, ServiceError> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    match options.open(path).await {
        Ok(file) => Ok(Some(file)),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(None),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_for_is_deterministic_and_extension_aware() {
        let cache = ImageCache::new(PathBuf::from("/tmp/posse_image_cache_test"));
        let a = cache.path_for("https://example.com/a.png");
        let b = cache.path_for("https://example.com/a.png");
        assert_eq!(a, b);
        assert_eq!(a.extension().unwrap(), "png");
    }

    #[test]
    fn test_path_for_differs_by_url() {
        let cache = ImageCache::new(PathBuf::from("/tmp/posse_image_cache_test"));
        let a = cache.path_for("https://example.com/a.png");
        let b = cache.path_for("https://example.com/b.png");
        assert_ne!(a, b);
    }
}
