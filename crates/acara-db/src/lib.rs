//! Acara document store
//!
//! Records are stored as whole JSON documents keyed by collection and id.
//! A write is a single statement, so a record is either fully visible or
//! absent.

pub mod db;

pub use db::{setup_database, Document, DocumentStore, MemoryDocumentStore, PgDocumentStore};
