use lw_core::config::SNIPPET_WINDOW_CHARS;

pub use lw_core::keywords::{admits, parse_keywords};

/// The first configured keyword that occurs in `text` as a case-insensitive
/// substring, together with the byte offset (into `text`) of that
/// occurrence and the matched slice in its original casing.
///
/// Keywords are tried in the order given, but for a fixed pair `(text,
/// keywords)` this always returns the same result — ties are broken by
/// earliest occurrence in `text`, then by position in `keywords`.
pub fn find_first_match(text: &str, keywords: &[String]) -> Option<(usize, String)> {
    let lower_text = text.to_lowercase();
    let mut best: Option<(usize, String)> = None;

    for keyword in keywords {
        let lower_keyword = keyword.to_lowercase();
        if lower_keyword.is_empty() {
            continue;
        }
        if let Some(byte_pos) = lower_text.find(&lower_keyword) {
            let char_pos = lower_text[..byte_pos].chars().count();
            let matched = char_window(text, char_pos, lower_keyword.chars().count());
            match &best {
                Some((pos, _)) if *pos <= char_pos => {}
                _ => best = Some((char_pos, matched)),
            }
        }
    }
    best
}

fn char_window(text: &str, start_char: usize, char_len: usize) -> String {
    text.chars().skip(start_char).take(char_len).collect()
}

/// Build the rendered snippet.
///
/// With keywords configured: the window starts at the first match's
/// character position and extends up to `SNIPPET_WINDOW_CHARS` (184)
/// characters, prefixed with `...` if the match isn't at position 0 and
/// suffixed with `...` if the window was truncated before the text ended.
///
/// With no keywords configured: the first 184 characters of `text`,
/// suffixed with `...` iff the text was truncated.
pub fn build_snippet(text: &str, keywords: Option<&str>) -> String {
    let parsed = keywords.map(parse_keywords).unwrap_or_default();
    if parsed.is_empty() {
        return truncate_from(text, 0, false);
    }

    match find_first_match(text, &parsed) {
        Some((char_pos, _)) => truncate_from(text, char_pos, char_pos > 0),
        None => truncate_from(text, 0, false),
    }
}

fn truncate_from(text: &str, start_char: usize, prefix_ellipsis: bool) -> String {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let end = (start_char + SNIPPET_WINDOW_CHARS).min(total);
    let window: String = chars[start_char..end].iter().collect();
    let truncated = end < total;

    let mut out = String::new();
    if prefix_ellipsis {
        out.push_str("...");
    }
    out.push_str(&window);
    if truncated {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keywords_trims_and_drops_empty() {
        assert_eq!(
            parse_keywords(" buy , sell ,, need  help "),
            vec!["buy", "sell", "need  help"]
        );
    }

    #[test]
    fn admits_empty_keywords_requires_nonempty_text() {
        assert!(admits("hello", None));
        assert!(!admits("", None));
        assert!(admits("hello", Some("")));
        assert!(!admits("", Some("  ,  ")));
    }

    #[test]
    fn admits_is_case_insensitive_substring() {
        assert!(admits("We need to Buy paint", Some("buy, sell")));
        assert!(!admits("We need to rent paint", Some("buy, sell")));
    }

    #[test]
    fn find_first_match_returns_original_casing() {
        let (pos, matched) = find_first_match("We need to Buy paint", &["buy".to_string()]).unwrap();
        assert_eq!(matched, "Buy");
        assert_eq!(pos, 11);
    }

    #[test]
    fn snippet_with_no_keywords_is_first_184_chars() {
        let text = "a".repeat(200);
        let snippet = build_snippet(&text, None);
        assert_eq!(snippet.len(), 184 + 3);
        assert!(snippet.ends_with("..."));

        let short = "short text";
        assert_eq!(build_snippet(short, None), short);
    }

    #[test]
    fn snippet_starts_at_match_with_prefix_when_not_at_zero() {
        let text = "We need to Buy paint right now please consider it urgently";
        let snippet = build_snippet(text, Some("buy"));
        assert!(snippet.starts_with("...Buy paint"));
    }

    #[test]
    fn snippet_has_no_prefix_when_match_at_position_zero() {
        let text = "Buy paint today";
        let snippet = build_snippet(text, Some("buy"));
        assert!(!snippet.starts_with("..."));
        assert!(snippet.starts_with("Buy paint"));
    }

    #[test]
    fn snippet_suffix_ellipsis_when_truncated() {
        let text = format!("Buy {}", "x".repeat(300));
        let snippet = build_snippet(&text, Some("buy"));
        assert!(snippet.ends_with("..."));
        assert!(snippet.len() <= "buy".len() + 184 + 3);
    }
}
