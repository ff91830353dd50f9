use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// A Bluesky rich-text facet: a byte-offset range over UTF-8 `text` plus
/// the feature it annotates (spec §4.D "Rich text facets").
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Facet {
    pub byte_start: usize,
    pub byte_end: usize,
    pub feature: FacetFeature,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum FacetFeature {
    Link { uri: String },
    Tag { tag: String },
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("static regex is valid"))
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#[[:alnum:]_]+").expect("static regex is valid"))
}

/// Scans `text` for bare URLs (trailing punctuation stripped) and
/// `#`-prefixed hashtags, producing non-overlapping facets over byte
/// offsets, as Bluesky's `app.bsky.richtext.facet` format requires.
pub fn build_facets(text: &str) -> Vec<Facet> {
    let mut facets = Vec::new();

    for m in url_regex().find_iter(text) {
        let trimmed_end = trim_trailing_punctuation(m.as_str());
        let end = m.start() + trimmed_end.len();
        facets.push(Facet {
            byte_start: m.start(),
            byte_end: end,
            feature: FacetFeature::Link {
                uri: trimmed_end.to_owned(),
            },
        });
    }

    for m in tag_regex().find_iter(text) {
        if overlaps_existing(&facets, m.start(), m.end()) {
            continue;
        }
        facets.push(Facet {
            byte_start: m.start(),
            byte_end: m.end(),
            feature: FacetFeature::Tag {
                tag: m.as_str().trim_start_matches('#').to_owned(),
            },
        });
    }

    facets.sort_by_key(|f| f.byte_start);
    facets
}

fn overlaps_existing(facets: &[Facet], start: usize, end: usize) -> bool {
    facets.iter().any(|f| start < f.byte_end && end > f.byte_start)
}

fn trim_trailing_punctuation(s: &str) -> &str {
    s.trim_end_matches(['.', ',', ';', '!', '?', ')'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_facet_strips_trailing_punctuation() {
        let facets = build_facets("see https://example.com/a).");
        assert_eq!(facets.len(), 1);
        match &facets[0].feature {
            FacetFeature::Link { uri } => assert_eq!(uri, "https://example.com/a"),
            _ => panic!("expected link facet"),
        }
    }

    #[test]
    fn test_tag_facet() {
        let facets = build_facets("loving this #rustlang today");
        assert_eq!(facets.len(), 1);
        match &facets[0].feature {
            FacetFeature::Tag { tag } => assert_eq!(tag, "rustlang"),
            _ => panic!("expected tag facet"),
        }
    }

    #[test]
    fn test_link_and_tag_together_sorted_by_offset() {
        let facets = build_facets("check #news at https://example.com/x");
        assert_eq!(facets.len(), 2);
        assert!(facets[0].byte_start < facets[1].byte_start);
    }
}
