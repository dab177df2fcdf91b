pub mod clauses;
pub mod documents;
pub mod health;
pub mod upload;

pub use clauses::{analyze, get_clause, redraft};
pub use documents::{get_document, get_document_status, list_clauses};
pub use health::health_handler;
pub use upload::upload_document;
