use rand::Rng;

const URL_SAFE_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// A 16-character URL-safe identifier (spec §3 Reply.id).
pub fn generate_reply_id() -> String {
    generate_url_safe_id(16)
}

fn generate_url_safe_id(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..URL_SAFE_ALPHABET.len());
            URL_SAFE_ALPHABET[idx] as char
        })
        .collect()
}

/// `true` iff `id` is exactly 24 lowercase hex characters (Ghost post id
/// format, spec §8 Boundary behaviors).
pub fn is_valid_ghost_post_id(id: &str) -> bool {
    id.len() == 24 && id.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_reply_id_length_and_alphabet() {
        let id = generate_reply_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_is_valid_ghost_post_id() {
        assert!(is_valid_ghost_post_id("a".repeat(24).as_str()));
        assert!(!is_valid_ghost_post_id(&"A".repeat(24)));
        assert!(!is_valid_ghost_post_id(&"a".repeat(23)));
        assert!(!is_valid_ghost_post_id(&"a".repeat(25)));
        assert!(!is_valid_ghost_post_id("../../etc/passwd"));
    }
}
