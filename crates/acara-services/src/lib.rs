//! Acara Services Layer
//!
//! Orchestration for berita acara records: the signed upload broker, the
//! image normalizer and its rollback ledger, the record assembler and the
//! document generator. Components receive their storage and document store
//! clients at construction; keep thin HTTP handling in acara-api.

pub mod assembler;
pub mod document;
pub mod normalizer;
pub mod rollback;
pub mod upload_broker;

#[cfg(test)]
mod test_support;

pub use assembler::RecordAssembler;
pub use document::{render_record, DocumentRenderer, DocxTemplateRenderer, RenderedDocument};
pub use normalizer::ImageNormalizer;
pub use rollback::RollbackLedger;
pub use upload_broker::UploadBroker;
