//! Trait abstractions for external collaborators, injected via [`ServerDeps`]
//! so tests can swap in fakes.
//!
//! [`ServerDeps`]: crate::kernel::ServerDeps

use anyhow::Result;
use async_trait::async_trait;

use crate::common::ParsedDocument;

/// Structure-aware document parser.
///
/// Returns page HTML plus typed blocks. An empty or unusable result must be
/// reported as an error so the parse stage can fall back to the naive
/// MIME-specific parsers.
#[async_trait]
pub trait StructuredParser: Send + Sync {
    async fn parse(&self, bytes: &[u8]) -> Result<ParsedDocument>;
}

/// Batch text embedder for chunk vectors.
///
/// Implementations must be deterministic. A stub implementation may return
/// zero vectors; callers skip persistence for those.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
