//! Document store implementations

mod document;
mod memory;
mod postgres;

pub use document::{Document, DocumentStore};
pub use memory::MemoryDocumentStore;
pub use postgres::{setup_database, PgDocumentStore};
