//! The enrichment pipeline: five stages forming a strictly linear chain.
//!
//! ```text
//! PARSE_DOC → CHUNK_EMBED → EXTRACT_NORMALIZE → BAND_MAP_GRAPH → ANALYZE
//! ```
//!
//! Every handler is idempotent and re-entrant: it first checks whether its
//! output already exists (skipping straight to the next-stage enqueue when it
//! does), performs its writes and the next-stage enqueue in one transaction,
//! and never touches its own job row. Per-document ordering comes from the
//! chain itself: a stage's job is only enqueued once the previous stage has
//! committed, under that stage's idempotency key.

pub mod analyze;
pub mod chunk_embed;
pub mod extract;
pub mod graph;
pub mod parse;

use uuid::Uuid;

use crate::kernel::jobs::JobRegistry;

pub const PARSE_DOC: &str = "PARSE_DOC";
pub const CHUNK_EMBED: &str = "CHUNK_EMBED";
pub const EXTRACT_NORMALIZE: &str = "EXTRACT_NORMALIZE";
pub const BAND_MAP_GRAPH: &str = "BAND_MAP_GRAPH";
pub const ANALYZE: &str = "ANALYZE";

/// Canonical PARSE_DOC key: checksum-scoped, used at ingest and for
/// auto-heal requeues.
pub fn parse_key(document_id: Uuid, checksum: &str) -> String {
    format!("parse::{document_id}::{checksum}")
}

pub fn chunks_key(document_id: Uuid) -> String {
    format!("chunks::{document_id}::v1")
}

pub fn extract_key(document_id: Uuid) -> String {
    format!("extract::{document_id}::v1")
}

pub fn band_key(document_id: Uuid) -> String {
    format!("band::{document_id}::v1")
}

pub fn analyze_key(document_id: Uuid) -> String {
    format!("analyze::{document_id}::v1")
}

/// Wire every stage handler into the worker registry.
pub fn register_stage_handlers(registry: &mut JobRegistry) {
    registry.register(PARSE_DOC, parse::handle_parse_doc);
    registry.register(CHUNK_EMBED, chunk_embed::handle_chunk_embed);
    registry.register(EXTRACT_NORMALIZE, extract::handle_extract_normalize);
    registry.register(BAND_MAP_GRAPH, graph::handle_band_map_graph);
    registry.register(ANALYZE, analyze::handle_analyze);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotency_keys_are_scoped_per_document() {
        let doc = Uuid::nil();
        assert_eq!(
            parse_key(doc, "abc123"),
            format!("parse::{doc}::abc123")
        );
        assert_eq!(chunks_key(doc), format!("chunks::{doc}::v1"));
        assert_eq!(extract_key(doc), format!("extract::{doc}::v1"));
        assert_eq!(band_key(doc), format!("band::{doc}::v1"));
        assert_eq!(analyze_key(doc), format!("analyze::{doc}::v1"));
    }

    #[test]
    fn all_stages_register() {
        let mut registry = JobRegistry::new();
        register_stage_handlers(&mut registry);
        for stage in [PARSE_DOC, CHUNK_EMBED, EXTRACT_NORMALIZE, BAND_MAP_GRAPH, ANALYZE] {
            assert!(registry.is_registered(stage), "missing handler for {stage}");
        }
    }
}
