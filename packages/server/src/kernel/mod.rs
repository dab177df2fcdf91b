// Kernel - core infrastructure with dependency injection
//
// Holds the job queue, storage, parsing and embedding seams behind traits.
// Business logic belongs in the domain layer, not here.

pub mod deps;
pub mod embedding;
pub mod jobs;
pub mod parsing;
pub mod storage;
pub mod traits;

pub use deps::ServerDeps;
pub use embedding::{all_zero_stubs, ZeroVectorEmbedder};
pub use parsing::{parse_docx_naive, parse_pdf_naive, BuiltinStructuredParser};
pub use storage::{blob_path, BlobStore, HttpBlobStore, MemoryBlobStore, DOCUMENTS_BUCKET};
pub use traits::{Embedder, StructuredParser};
