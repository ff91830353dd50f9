use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of `data`.
pub fn sha256_hex(data: &str) -> String {
    let digest = Sha256::digest(data.as_bytes());
    hex::encode(digest)
}

/// First 16 hex characters of `SHA256(ip + ":" + salt)`, used to pseudonymize
/// reply submitter IPs (spec §3 Reply.ip_hash).
pub fn hash_ip(ip: &str, salt: &str) -> String {
    let full = sha256_hex(&format!("{ip}:{salt}"));
    full[..16].to_owned()
}

/// Content-addressed cache key for an image URL: `sha256(url)`, hex-encoded.
pub fn cache_key(url: &str) -> String {
    sha256_hex(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_ip_is_stable_and_truncated() {
        let a = hash_ip("1.2.3.4", "pepper");
        let b = hash_ip("1.2.3.4", "pepper");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_hash_ip_differs_by_salt() {
        let a = hash_ip("1.2.3.4", "pepper");
        let b = hash_ip("1.2.3.4", "other");
        assert_ne!(a, b);
    }

    #[test]
    fn test_cache_key_is_deterministic() {
        assert_eq!(
            cache_key("https://example.com/a.jpg"),
            cache_key("https://example.com/a.jpg"),
        );
        assert_ne!(
            cache_key("https://example.com/a.jpg"),
            cache_key("https://example.com/b.jpg"),
        );
    }
}
