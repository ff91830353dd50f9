/// Trims `text` to at most `budget` characters, cutting at the last space
/// within `budget - 3` characters and appending an ellipsis, per spec §4.F
/// step 6 / §8 "Content trimming". Text already within budget is returned
/// verbatim.
pub fn trim_to_word_boundary(text: &str, budget: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= budget {
        return text.to_owned();
    }
    let limit = budget.saturating_sub(3).min(chars.len());
    let slice = &chars[..limit];
    let cut_at = slice.iter().rposition(|&c| c == ' ').unwrap_or(limit);
    let trimmed: String = slice[..cut_at].iter().collect();
    format!("{trimmed}...")
}

/// Builds the hashtag line: configured tags plus the fixed `#posse` tag,
/// space-separated.
fn hashtag_line(tags: &[String]) -> String {
    let mut parts: Vec<String> = tags.iter().map(|t| format!("#{t}")).collect();
    parts.push("#posse".to_owned());
    parts.join(" ")
}

/// Formats the syndicated post body: `trim_to_word_boundary(body, budget) +
/// "\n" + hashtags + "\n\n🔗 " + post_url`, where `budget` is
/// `max_post_length` minus the fixed suffix's length (spec §4.F step 6).
pub fn format_content(body: &str, tags: &[String], post_url: &str, max_post_length: usize) -> String {
    let suffix = format!("\n{}\n\n🔗 {post_url}", hashtag_line(tags));
    let budget = max_post_length.saturating_sub(suffix.chars().count());
    let trimmed = trim_to_word_boundary(body, budget);
    format!("{trimmed}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_within_budget_is_verbatim() {
        assert_eq!(trim_to_word_boundary("short text", 50), "short text");
    }

    #[test]
    fn test_trim_exact_boundary() {
        assert_eq!(trim_to_word_boundary("ab", 2), "ab");
    }

    #[test]
    fn test_trim_cuts_at_last_space_and_adds_ellipsis() {
        let text = "the quick brown fox jumps over the lazy dog";
        let trimmed = trim_to_word_boundary(text, 20);
        assert!(trimmed.ends_with("..."));
        assert!(!trimmed[..trimmed.len() - 3].ends_with(' '));
        assert!(text.starts_with(&trimmed[..trimmed.len() - 3]));
    }

    #[test]
    fn test_format_content_includes_fixed_suffix() {
        let content = format_content("Hello world", &["tech".to_owned()], "https://blog.example.com/p/", 500);
        assert!(content.starts_with("Hello world"));
        assert!(content.contains("#tech #posse"));
        assert!(content.ends_with("https://blog.example.com/p/"));
    }

    #[test]
    fn test_format_content_trims_body_when_over_budget() {
        let long_body = "word ".repeat(50);
        let content = format_content(&long_body, &[], "https://blog.example.com/p/", 60);
        assert!(content.chars().count() <= 60 + 10); // suffix + small slack for emoji width
        assert!(content.contains("..."));
    }
}
