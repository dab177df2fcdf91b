pub mod analysis;
pub mod chunk;
pub mod clause;
pub mod document;

pub use analysis::Analysis;
pub use chunk::{Chunk, ChunkDraft, ChunkRef};
pub use clause::Clause;
pub use document::{Document, DocumentStatus, Leverage};
