//! Shared types crossing the parser / extractor / pipeline seams.

use serde::{Deserialize, Serialize};

/// Identifies which parser engine produced a page structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ParserInfo {
    #[serde(default)]
    pub engine: String,
    #[serde(default)]
    pub version: String,
}

/// One structural unit of a parsed page (paragraph, heading, table cell...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(default)]
    pub page: i32,
    /// `para`, `heading`, ...
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<serde_json::Value>,
}

/// Normalized parse output stored in `documents.pages_json`.
///
/// Opaque at the queue boundary; handlers validate only what their
/// idempotency predicates need.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PagesJson {
    #[serde(default)]
    pub html_pages: Vec<String>,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub tables: Vec<serde_json::Value>,
    #[serde(default)]
    pub parser: ParserInfo,
}

impl PagesJson {
    pub fn is_empty(&self) -> bool {
        self.html_pages.is_empty() && self.blocks.is_empty()
    }
}

/// Full result of parsing a document's raw bytes.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub pages: PagesJson,
    pub text_plain: String,
}

/// A candidate clause passage produced by the extractors, before it becomes
/// a `clauses` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    pub clause_key: String,
    pub title: String,
    pub text: String,
    pub start_idx: i32,
    pub end_idx: i32,
    #[serde(default)]
    pub page_hint: Option<i32>,
    #[serde(default)]
    pub block_ids: Vec<String>,
    /// Origin tag: `structured`, `regex`, or `fallback`.
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub json_meta: serde_json::Value,
}

impl Snippet {
    /// Metadata persisted with the clause row: source block ids, confidence
    /// and origin tag, merged over any extractor-supplied object.
    pub fn meta_for_storage(&self) -> serde_json::Value {
        let mut meta = match &self.json_meta {
            serde_json::Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        meta.insert("block_ids".into(), serde_json::json!(self.block_ids));
        meta.insert("confidence".into(), serde_json::json!(self.confidence));
        meta.insert("source".into(), serde_json::json!(self.source));
        serde_json::Value::Object(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_json_tolerates_missing_fields() {
        let parsed: PagesJson = serde_json::from_value(serde_json::json!({
            "html_pages": ["<p>x</p>"]
        }))
        .unwrap();
        assert_eq!(parsed.html_pages.len(), 1);
        assert!(parsed.blocks.is_empty());
        assert!(!parsed.is_empty());
    }

    #[test]
    fn block_kind_uses_wire_name_type() {
        let block: Block = serde_json::from_value(serde_json::json!({
            "id": "b-1", "page": 2, "type": "heading", "text": "Board of Directors"
        }))
        .unwrap();
        assert_eq!(block.kind, "heading");
        assert_eq!(block.page, 2);
    }

    #[test]
    fn snippet_meta_carries_provenance() {
        let snippet = Snippet {
            clause_key: "drag_along".into(),
            title: "Drag Along".into(),
            text: "...".into(),
            start_idx: 0,
            end_idx: 3,
            page_hint: Some(1),
            block_ids: vec!["b-1".into()],
            source: "structured".into(),
            confidence: 0.9,
            json_meta: serde_json::json!({"heading": "Drag Along"}),
        };
        let meta = snippet.meta_for_storage();
        assert_eq!(meta["source"], "structured");
        assert_eq!(meta["block_ids"][0], "b-1");
        assert_eq!(meta["heading"], "Drag Along");
    }
}
