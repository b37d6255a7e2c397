//! Acara API Library
//!
//! HTTP boundary of the berita acara record service: handlers, application
//! state and setup. Business rules live in acara-services.

mod api_doc;
pub mod constants;
mod handlers;
pub mod setup;
mod telemetry;

pub mod error;
pub mod state;

pub use api_doc::{openapi_spec, ApiDoc};
pub use error::ErrorResponse;
