use serde_json::Value;

use crate::errors::ValidationError;

const REQUIRED_CURRENT_FIELDS: &[&str] =
    &["id", "uuid", "title", "slug", "status", "url", "created_at", "updated_at"];

/// Validates the inbound Ghost webhook payload's structure: `post.current`
/// must be an object carrying the required fields with string types. Extra
/// fields are ignored. Equivalent in intent to a fixed JSON Schema Draft 7
/// document, implemented as direct field checks (spec §4.B).
pub fn validate_ghost_webhook(payload: &Value) -> Result<(), ValidationError> {
    let post = payload.get("post").ok_or_else(|| {
        ValidationError::new("post", "missing required field")
    })?;
    let current = post.get("current").ok_or_else(|| {
        ValidationError::new("post.current", "missing required field")
    })?;
    let current_obj = current.as_object().ok_or_else(|| {
        ValidationError::new("post.current", "must be an object")
    })?;

    for field in REQUIRED_CURRENT_FIELDS {
        match current_obj.get(*field) {
            None => {
                return Err(ValidationError::new(
                    format!("post.current.{field}"),
                    "missing required field",
                ));
            }
            Some(Value::Null) => {
                return Err(ValidationError::new(
                    format!("post.current.{field}"),
                    "must not be null",
                ));
            }
            Some(_) => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_payload() -> Value {
        json!({
            "post": {
                "current": {
                    "id": "5f".repeat(12),
                    "uuid": "abc",
                    "title": "Hello",
                    "slug": "hello",
                    "status": "published",
                    "url": "https://blog.example.com/hello/",
                    "created_at": "2024-01-01T00:00:00.000Z",
                    "updated_at": "2024-01-01T00:00:00.000Z",
                }
            }
        })
    }

    #[test]
    fn test_valid_payload_passes() {
        assert!(validate_ghost_webhook(&valid_payload()).is_ok());
    }

    #[test]
    fn test_missing_post_fails() {
        let err = validate_ghost_webhook(&json!({})).unwrap_err();
        assert_eq!(err.path, "post");
    }

    #[test]
    fn test_missing_required_field_fails() {
        let mut payload = valid_payload();
        payload["post"]["current"]
            .as_object_mut()
            .unwrap()
            .remove("slug");
        let err = validate_ghost_webhook(&payload).unwrap_err();
        assert_eq!(err.path, "post.current.slug");
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let mut payload = valid_payload();
        payload["post"]["current"]["custom_excerpt"] = json!("an excerpt");
        payload["unexpected_top_level"] = json!(true);
        assert!(validate_ghost_webhook(&payload).is_ok());
    }
}
