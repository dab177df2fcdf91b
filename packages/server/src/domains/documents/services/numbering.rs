//! Leading section-numbering stripper for headings.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NUMBERING: Regex = Regex::new(
        r"(?i)^\s*(?:Section\s+\d+(?:\.\d+)*|Article\s+[IVXLCDM\d]+|[IVXLCDM]+\.|[A-Z]\.|[a-z]\)|\d+(?:\.\d+)*|\(\d+\)|\([a-z]\))[\s.:\u{2013}-]*"
    )
    .expect("numbering pattern");
}

/// Strip a leading numbering token from a heading, returning the remainder
/// and the token that was removed (if any).
pub fn strip_leading_numbering(text: &str) -> (String, Option<String>) {
    match NUMBERING.find(text) {
        Some(m) if m.start() == 0 && m.end() > 0 => {
            let stripped = text[m.end()..].trim_start().to_string();
            // A match that consumed the whole heading was not numbering.
            if stripped.is_empty() {
                (text.to_string(), None)
            } else {
                (stripped, Some(m.as_str().trim().to_string()))
            }
        }
        _ => (text.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_decimal_numbering() {
        let (rest, token) = strip_leading_numbering("2.3 Liquidation Preference");
        assert_eq!(rest, "Liquidation Preference");
        assert_eq!(token.as_deref(), Some("2.3"));
    }

    #[test]
    fn strips_section_prefix() {
        let (rest, token) = strip_leading_numbering("Section 4.1: Board of Directors");
        assert_eq!(rest, "Board of Directors");
        assert!(token.is_some());
    }

    #[test]
    fn strips_parenthesized_letter() {
        let (rest, _) = strip_leading_numbering("(a) Tag-Along Rights");
        assert_eq!(rest, "Tag-Along Rights");
    }

    #[test]
    fn leaves_unnumbered_headings_alone() {
        let (rest, token) = strip_leading_numbering("Board of Directors");
        assert_eq!(rest, "Board of Directors");
        assert!(token.is_none());
    }

    #[test]
    fn does_not_consume_a_heading_that_is_all_numbering() {
        let (rest, token) = strip_leading_numbering("1.");
        assert_eq!(rest, "1.");
        assert!(token.is_none());
    }
}
