//! The keyword admission predicate shared verbatim between the message
//! processor (C4) and the history extractor (C5) — spec §4.4 requires C5 to
//! "apply the same keyword predicate as C4", so this lives once, here.

/// Parse a comma-separated keyword list: whitespace preserved within a
/// keyword, stripped at the ends; empty items ignored.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Admission predicate:
/// - `keywords` empty/absent: admit any non-empty text.
/// - otherwise: admit iff at least one parsed keyword occurs as a
///   case-insensitive substring of `text`.
pub fn admits(text: &str, keywords: Option<&str>) -> bool {
    match keywords.map(parse_keywords) {
        None => !text.is_empty(),
        Some(parsed) if parsed.is_empty() => !text.is_empty(),
        Some(parsed) => {
            let lower_text = text.to_lowercase();
            parsed.iter().any(|k| lower_text.contains(&k.to_lowercase()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keywords_trims_and_drops_empty() {
        assert_eq!(parse_keywords(" buy , sell ,, "), vec!["buy", "sell"]);
    }

    #[test]
    fn admits_empty_keywords_requires_nonempty_text() {
        assert!(admits("hello", None));
        assert!(!admits("", None));
    }

    #[test]
    fn admits_is_case_insensitive_substring() {
        assert!(admits("We need to Buy paint", Some("buy, sell")));
        assert!(!admits("We need to rent paint", Some("buy, sell")));
    }
}
