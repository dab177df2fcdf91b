pub mod checksum;
pub mod sql;
pub mod types;

pub use checksum::content_checksum;
pub use sql::Db;
pub use types::{Block, PagesJson, ParsedDocument, ParserInfo, Snippet};
