//! Snippet normalization: deduplicate and order before insertion.

use std::collections::HashMap;

use crate::common::Snippet;

/// Deterministic normalization pass, stable across invocations:
/// one snippet per clause key (highest confidence wins, earliest on ties),
/// output ordered by `(start_idx, clause_key)`, empty titles filled from the
/// clause key.
pub fn normalize(snippets: Vec<Snippet>) -> Vec<Snippet> {
    let mut best: HashMap<String, Snippet> = HashMap::new();

    for snippet in snippets {
        match best.get(&snippet.clause_key) {
            Some(existing)
                if existing.confidence > snippet.confidence
                    || (existing.confidence == snippet.confidence
                        && existing.start_idx <= snippet.start_idx) => {}
            _ => {
                best.insert(snippet.clause_key.clone(), snippet);
            }
        }
    }

    let mut normalized: Vec<Snippet> = best
        .into_values()
        .map(|mut s| {
            if s.title.trim().is_empty() {
                s.title = title_from_key(&s.clause_key);
            }
            s
        })
        .collect();
    normalized.sort_by(|a, b| {
        (a.start_idx, a.clause_key.as_str()).cmp(&(b.start_idx, b.clause_key.as_str()))
    });
    normalized
}

fn title_from_key(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(key: &str, start: i32, confidence: f64) -> Snippet {
        Snippet {
            clause_key: key.into(),
            title: format!("{key} title"),
            text: "text".into(),
            start_idx: start,
            end_idx: start + 4,
            page_hint: None,
            block_ids: vec![],
            source: "regex".into(),
            confidence,
            json_meta: serde_json::json!({}),
        }
    }

    #[test]
    fn duplicate_keys_collapse_to_highest_confidence() {
        let result = normalize(vec![
            snippet("drag_along", 10, 0.75),
            snippet("drag_along", 50, 0.9),
            snippet("tag_along", 5, 0.8),
        ]);
        assert_eq!(result.len(), 2);
        let drag = result.iter().find(|s| s.clause_key == "drag_along").unwrap();
        assert_eq!(drag.confidence, 0.9);
    }

    #[test]
    fn ties_keep_the_earliest_snippet() {
        let result = normalize(vec![
            snippet("vesting", 100, 0.8),
            snippet("vesting", 20, 0.8),
        ]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].start_idx, 20);
    }

    #[test]
    fn output_is_ordered_by_offset_then_key() {
        let result = normalize(vec![
            snippet("tag_along", 40, 0.8),
            snippet("drag_along", 40, 0.8),
            snippet("vesting", 5, 0.8),
        ]);
        let keys: Vec<&str> = result.iter().map(|s| s.clause_key.as_str()).collect();
        assert_eq!(keys, vec!["vesting", "drag_along", "tag_along"]);
    }

    #[test]
    fn empty_titles_are_filled_from_the_key() {
        let mut s = snippet("board_composition", 0, 0.9);
        s.title = "  ".into();
        let result = normalize(vec![s]);
        assert_eq!(result[0].title, "Board Composition");
    }

    #[test]
    fn normalize_is_idempotent() {
        let input = vec![
            snippet("drag_along", 10, 0.75),
            snippet("tag_along", 5, 0.8),
        ];
        let once = normalize(input.clone());
        let twice = normalize(once.clone());
        assert_eq!(
            once.iter().map(|s| &s.clause_key).collect::<Vec<_>>(),
            twice.iter().map(|s| &s.clause_key).collect::<Vec<_>>()
        );
    }
}
