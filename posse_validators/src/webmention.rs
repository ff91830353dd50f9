use url::Url;

use crate::errors::ValidationError;

const MAX_URL_LENGTH: usize = 2048;

fn is_well_formed_http_url(url: &str) -> bool {
    if url.is_empty() || url.len() > MAX_URL_LENGTH {
        return false;
    }
    match Url::parse(url) {
        Ok(parsed) => {
            (parsed.scheme() == "http" || parsed.scheme() == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}

fn strip_trailing_slash(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Validates an incoming `(source, target)` webmention pair against spec
/// §4.L: both must be well-formed http(s) URLs within the length cap,
/// distinct after trailing-slash normalization, and `target` must fall
/// under the configured blog URL with at least one path segment beyond
/// the root.
pub fn validate_webmention(
    source: &str,
    target: &str,
    blog_url: &str,
) -> Result<(), ValidationError> {
    if !is_well_formed_http_url(source) {
        return Err(ValidationError::new("source", "not a well-formed http(s) URL"));
    }
    if !is_well_formed_http_url(target) {
        return Err(ValidationError::new("target", "not a well-formed http(s) URL"));
    }
    if strip_trailing_slash(source) == strip_trailing_slash(target) {
        return Err(ValidationError::new("source", "must differ from target"));
    }
    if !is_blog_post_url(target, blog_url) {
        return Err(ValidationError::new(
            "target",
            "must be a post on the configured blog",
        ));
    }
    Ok(())
}

fn is_blog_post_url(url: &str, blog_url: &str) -> bool {
    let blog_base = strip_trailing_slash(blog_url).to_lowercase();
    let url_clean = strip_trailing_slash(url);
    let url_lower = url_clean.to_lowercase();
    if !url_lower.starts_with(&blog_base) {
        return false;
    }
    let path_after_base = &url_clean[blog_base.len()..];
    !path_after_base.is_empty() && path_after_base != "/"
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOG: &str = "https://blog.example.com";

    #[test]
    fn test_valid_webmention() {
        assert!(validate_webmention(
            "https://x.com/p",
            "https://blog.example.com/ok/",
            BLOG,
        )
        .is_ok());
    }

    #[test]
    fn test_rejects_foreign_target() {
        let err = validate_webmention("https://x.com/p", "https://other.com/ok", BLOG)
            .unwrap_err();
        assert_eq!(err.path, "target");
    }

    #[test]
    fn test_rejects_root_only_target() {
        assert!(validate_webmention("https://x.com/p", BLOG, BLOG).is_err());
        assert!(validate_webmention("https://x.com/p", "https://blog.example.com/", BLOG).is_err());
    }

    #[test]
    fn test_rejects_source_equal_target_after_normalization() {
        let err = validate_webmention(
            "https://blog.example.com/ok",
            "https://blog.example.com/ok/",
            BLOG,
        )
        .unwrap_err();
        assert_eq!(err.path, "source");
    }

    #[test]
    fn test_rejects_overlong_url() {
        let long = format!("https://x.com/{}", "a".repeat(3000));
        assert!(validate_webmention(&long, "https://blog.example.com/ok", BLOG).is_err());
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        assert!(validate_webmention(
            "ftp://x.com/p",
            "https://blog.example.com/ok",
            BLOG,
        )
        .is_err());
    }
}
