//! Rules-based clause extraction.
//!
//! Two extractors share one keyword table: the structured extractor walks
//! heading-delimited sections of the parsed blocks, the plain-text extractor
//! scans the document text directly. Both emit [`Snippet`]s for the
//! normalizer.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;

use crate::common::{PagesJson, Snippet};

use super::sectionizer::{sectionize, Section};

pub struct ClauseRule {
    pub key: &'static str,
    pub title: &'static str,
    pub pattern: Regex,
}

fn rule(key: &'static str, title: &'static str, pattern: &str) -> ClauseRule {
    ClauseRule {
        key,
        title,
        pattern: Regex::new(pattern).expect("clause pattern"),
    }
}

lazy_static! {
    /// Clause-key keyword table. Patterns match both section headings and
    /// running text.
    pub static ref CLAUSE_RULES: Vec<ClauseRule> = vec![
        rule("drag_along", "Drag-Along Rights", r"(?i)drag[\s-]?along"),
        rule(
            "right_of_first_refusal",
            "Right of First Refusal",
            r"(?i)right\s+of\s+first\s+refusal|\brofr\b",
        ),
        rule(
            "anti_dilution",
            "Anti-Dilution Protection",
            r"(?i)anti[\s-]?dilution|full[\s-]?ratchet|weighted\s+average\s+adjustment",
        ),
        rule(
            "board_composition",
            "Board Composition",
            r"(?i)board\s+(?:of\s+directors|composition|seats?)",
        ),
        rule(
            "liquidation_preference",
            "Liquidation Preference",
            r"(?i)liquidation\s+(?:preference|event)",
        ),
        rule("tag_along", "Tag-Along Rights", r"(?i)tag[\s-]?along|co[\s-]?sale"),
        rule(
            "option_pool",
            "Option Pool",
            r"(?i)option\s+pool|\besop\b|employee\s+stock",
        ),
        rule(
            "information_rights",
            "Information Rights",
            r"(?i)information\s+rights|inspection\s+rights",
        ),
        rule(
            "preemptive_rights",
            "Pre-emptive Rights",
            r"(?i)pre[\s-]?emptive|pro[\s-]?rata\s+right",
        ),
        rule(
            "reserved_matters",
            "Reserved Matters",
            r"(?i)reserved\s+matters|protective\s+provisions|investor\s+consent",
        ),
        rule("exclusivity", "Exclusivity", r"(?i)exclusivity|no[\s-]?shop"),
        rule("vesting", "Founder Vesting", r"(?i)\bvesting\b|reverse\s+vest"),
    ];
}

/// Clause key for the synthesized overview fallback.
pub const DOCUMENT_OVERVIEW_KEY: &str = "document_overview";

/// Extract candidate snippets from the parsed block structure.
///
/// Sections whose heading names a clause type score higher than sections that
/// only mention it in the body; both forms are emitted and the normalizer
/// keeps the strongest per clause key.
pub fn extract_from_structured(pages: &PagesJson) -> Vec<Snippet> {
    let mut snippets = Vec::new();

    for section in sectionize(&pages.blocks) {
        for rule in CLAUSE_RULES.iter() {
            let title_hit = !section.title.is_empty() && rule.pattern.is_match(&section.title);
            let body_hit = rule.pattern.is_match(&section.text);
            if !title_hit && !body_hit {
                continue;
            }
            snippets.push(section_snippet(&section, rule, title_hit));
        }
    }
    snippets
}

fn section_snippet(section: &Section, rule: &ClauseRule, title_hit: bool) -> Snippet {
    let title = if section.title.is_empty() {
        rule.title.to_string()
    } else {
        section.title.clone()
    };
    Snippet {
        clause_key: rule.key.to_string(),
        title,
        text: section.text.clone(),
        start_idx: 0,
        end_idx: section.text.len() as i32,
        page_hint: section.page_start,
        block_ids: section.block_ids.clone(),
        source: "structured".to_string(),
        confidence: if title_hit { 0.9 } else { 0.75 },
        json_meta: json!({"heading": section.title}),
    }
}

/// Extract candidate snippets by scanning plain text for clause keywords.
/// Each rule contributes at most one snippet, windowed around its first hit.
pub fn extract_from_text(text: &str) -> Vec<Snippet> {
    let mut snippets = Vec::new();
    for rule in CLAUSE_RULES.iter() {
        let Some(found) = rule.pattern.find(text) else {
            continue;
        };
        let (start, end) = context_window(text, found.start(), found.end());
        snippets.push(Snippet {
            clause_key: rule.key.to_string(),
            title: rule.title.to_string(),
            text: text[start..end].trim().to_string(),
            start_idx: start as i32,
            end_idx: end as i32,
            page_hint: None,
            block_ids: Vec::new(),
            source: "regex".to_string(),
            confidence: 0.8,
            json_meta: json!({"matched": found.as_str()}),
        });
    }
    snippets
}

/// Synthesized overview snippet used when both extractors come up empty but
/// the document has text.
pub fn overview_snippet(text_plain: &str) -> Snippet {
    let truncated: String = text_plain.chars().take(500).collect();
    let text = if text_plain.chars().count() > 500 {
        format!("{truncated}...")
    } else {
        truncated
    };
    Snippet {
        clause_key: DOCUMENT_OVERVIEW_KEY.to_string(),
        title: "Document Overview".to_string(),
        text,
        start_idx: 0,
        end_idx: text_plain.len() as i32,
        page_hint: None,
        block_ids: Vec::new(),
        source: "fallback".to_string(),
        confidence: 0.5,
        json_meta: json!({}),
    }
}

/// Window around a keyword hit: back to the start of the surrounding context,
/// forward far enough to capture the operative sentence(s).
fn context_window(text: &str, start: usize, end: usize) -> (usize, usize) {
    let from = snap_to_boundary(text, start.saturating_sub(120));
    let to = snap_to_boundary(text, (end + 400).min(text.len()));
    (from, to)
}

fn snap_to_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Block, ParserInfo};

    fn pages_with(blocks: Vec<Block>) -> PagesJson {
        PagesJson {
            html_pages: vec![],
            blocks,
            tables: vec![],
            parser: ParserInfo::default(),
        }
    }

    fn block(id: &str, kind: &str, text: &str) -> Block {
        Block {
            id: id.into(),
            page: 0,
            kind: kind.into(),
            text: Some(text.into()),
            bbox: None,
        }
    }

    #[test]
    fn plaintext_extractor_finds_keyword_clauses() {
        let text = "The shares are subject to a drag along clause binding all holders. \
                    Investors hold a right of first refusal on transfers. \
                    Standard anti-dilution protection applies.";
        let snippets = extract_from_text(text);
        let keys: Vec<&str> = snippets.iter().map(|s| s.clause_key.as_str()).collect();
        assert!(keys.contains(&"drag_along"));
        assert!(keys.contains(&"right_of_first_refusal"));
        assert!(keys.contains(&"anti_dilution"));
        for s in &snippets {
            assert!(s.start_idx <= s.end_idx);
            assert_eq!(s.source, "regex");
        }
    }

    #[test]
    fn heading_match_wins_even_when_body_lacks_keywords() {
        let pages = pages_with(vec![
            block("b-0", "heading", "Board of Directors"),
            block("b-1", "para", "Five members, two designated by the investors."),
        ]);
        let snippets = extract_from_structured(&pages);
        let board = snippets
            .iter()
            .find(|s| s.clause_key == "board_composition")
            .expect("heading-derived clause");
        assert_eq!(board.confidence, 0.9);
        assert_eq!(board.block_ids, vec!["b-0", "b-1"]);
        assert_eq!(board.page_hint, Some(0));
    }

    #[test]
    fn body_only_match_has_lower_confidence() {
        let pages = pages_with(vec![
            block("b-0", "heading", "Transfer Restrictions"),
            block("b-1", "para", "Shareholders may exercise tag-along rights on any sale."),
        ]);
        let snippets = extract_from_structured(&pages);
        let tag = snippets.iter().find(|s| s.clause_key == "tag_along").unwrap();
        assert_eq!(tag.confidence, 0.75);
        assert_eq!(tag.title, "Transfer Restrictions");
    }

    #[test]
    fn no_keywords_yields_nothing() {
        assert!(extract_from_text("An entirely unrelated shopping list.").is_empty());
    }

    #[test]
    fn overview_fallback_truncates_long_text() {
        let long = "x".repeat(800);
        let snippet = overview_snippet(&long);
        assert_eq!(snippet.clause_key, DOCUMENT_OVERVIEW_KEY);
        assert!(snippet.text.ends_with("..."));
        assert_eq!(snippet.text.chars().count(), 503);
        assert_eq!(snippet.confidence, 0.5);

        let short = overview_snippet("brief");
        assert_eq!(short.text, "brief");
    }

    #[test]
    fn context_window_respects_char_boundaries() {
        let text = "é".repeat(300);
        let hit = text.find('é').unwrap();
        let (from, to) = context_window(&text, hit + 200, hit + 202);
        assert!(text.is_char_boundary(from));
        assert!(text.is_char_boundary(to));
    }
}
