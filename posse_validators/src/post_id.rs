use posse_utils::ids::is_valid_ghost_post_id;

use crate::errors::ValidationError;

/// Validates a path-supplied Ghost post id: exactly 24 lowercase hex
/// characters (spec §8 Boundary behaviors).
pub fn validate_post_id(id: &str) -> Result<(), ValidationError> {
    if is_valid_ghost_post_id(id) {
        Ok(())
    } else {
        Err(ValidationError::new("post_id", "must be 24 lowercase hex characters"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_post_id() {
        assert!(validate_post_id(&"a".repeat(24)).is_ok());
        assert!(validate_post_id(&"A".repeat(24)).is_err());
        assert!(validate_post_id("../../etc/passwd").is_err());
    }
}
