use std::path::Path;

/// Best-effort extension for a URL's path component, with a `jpg` fallback.
///
/// Mirrors the reference media-type-extension lookup's precedence: a known
/// suffix on the path wins, otherwise callers get a safe default rather than
/// an error, since image cache keys must always resolve to *some* file name.
pub fn extension_for_url(url: &str) -> &'static str {
    let path = url::Url::parse(url)
        .ok()
        .map(|u| u.path().to_owned())
        .unwrap_or_default();
    match Path::new(&path).extension().and_then(|e| e.to_str()) {
        Some("jpg") | Some("jpeg") => "jpg",
        Some("png") => "png",
        Some("gif") => "gif",
        Some("webp") => "webp",
        _ => "jpg",
    }
}

#[derive(Debug)]
pub struct FileSize(pub u64);

impl std::fmt::Display for FileSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (value, unit) = match self.0 {
            n if n > 10_000_000_000 => (n / 1_000_000_000, "GB"),
            n if n > 10_000_000 => (n / 1_000_000, "MB"),
            n if n > 10_000 => (n / 1_000, "kB"),
            n => (n, "B"),
        };
        write!(f, "{value}{unit}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for_url() {
        assert_eq!(extension_for_url("https://example.com/a/b.png"), "png");
        assert_eq!(extension_for_url("https://example.com/a/b.PNG"), "jpg");
        assert_eq!(extension_for_url("https://example.com/no-extension"), "jpg");
        assert_eq!(extension_for_url("not a url"), "jpg");
    }
}
