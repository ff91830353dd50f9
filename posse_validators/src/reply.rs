use url::Url;

use crate::errors::ValidationError;

const AUTHOR_NAME_MAX: usize = 100;
const CONTENT_MIN: usize = 2;
const CONTENT_MAX: usize = 2000;
const AUTHOR_URL_MAX: usize = 500;

pub struct ReplySubmission<'a> {
    pub author_name: &'a str,
    pub author_url: Option<&'a str>,
    pub content: &'a str,
    pub target: &'a str,
}

/// Validates a reply-form submission against spec §4.M / §3 Reply, and
/// checks `target`'s origin against the configured allow-list. Returns the
/// specific field path on the first violation, matching the conventions
/// used elsewhere in this crate.
pub fn validate_reply(
    submission: &ReplySubmission,
    allowed_target_origins: &[String],
) -> Result<(), ValidationError> {
    if submission.author_name.is_empty() {
        return Err(ValidationError::new("author_name", "is required"));
    }
    if submission.author_name.chars().count() > AUTHOR_NAME_MAX {
        return Err(ValidationError::new("author_name", "must be 100 characters or fewer"));
    }

    let content_len = submission.content.chars().count();
    if content_len < CONTENT_MIN || content_len > CONTENT_MAX {
        return Err(ValidationError::new(
            "content",
            "must be between 2 and 2000 characters",
        ));
    }

    if submission.target.is_empty() {
        return Err(ValidationError::new("target", "is required"));
    }
    let target_origin = origin_of(submission.target)
        .ok_or_else(|| ValidationError::new("target", "not a well-formed URL"))?;
    if !allowed_target_origins
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&target_origin))
    {
        return Err(ValidationError::new("target", "origin is not allowed"));
    }

    if let Some(author_url) = submission.author_url {
        if !author_url.is_empty() {
            if author_url.len() > AUTHOR_URL_MAX {
                return Err(ValidationError::new("author_url", "must be 500 characters or fewer"));
            }
            match Url::parse(author_url) {
                Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
                _ => return Err(ValidationError::new("author_url", "not a well-formed http(s) URL")),
            }
        }
    }

    Ok(())
}

fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    match parsed.port() {
        Some(port) => Some(format!("{}://{}:{}", parsed.scheme(), host, port)),
        None => Some(format!("{}://{}", parsed.scheme(), host)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> (String, String, String, String) {
        (
            "Carol".to_owned(),
            "Nice post!".to_owned(),
            "https://blog.example.com/my-post/".to_owned(),
            "https://carol.example".to_owned(),
        )
    }

    #[test]
    fn test_valid_reply() {
        let (name, content, target, author_url) = base();
        let submission = ReplySubmission {
            author_name: &name,
            author_url: Some(&author_url),
            content: &content,
            target: &target,
        };
        let allowed = vec!["https://blog.example.com".to_owned()];
        assert!(validate_reply(&submission, &allowed).is_ok());
    }

    #[test]
    fn test_content_length_boundaries() {
        let allowed = vec!["https://blog.example.com".to_owned()];
        let mk = |content: &str| ReplySubmission {
            author_name: "Carol",
            author_url: None,
            content,
            target: "https://blog.example.com/p/",
        };
        assert!(validate_reply(&mk("a"), &allowed).is_err());
        assert!(validate_reply(&mk("ab"), &allowed).is_ok());
        assert!(validate_reply(&mk(&"a".repeat(2000)), &allowed).is_ok());
        assert!(validate_reply(&mk(&"a".repeat(2001)), &allowed).is_err());
    }

    #[test]
    fn test_disallowed_target_origin() {
        let submission = ReplySubmission {
            author_name: "Carol",
            author_url: None,
            content: "Nice",
            target: "https://evil.example/p/",
        };
        let allowed = vec!["https://blog.example.com".to_owned()];
        assert!(validate_reply(&submission, &allowed).is_err());
    }
}
