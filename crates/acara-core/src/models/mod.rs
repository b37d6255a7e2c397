//! Data models for the record service

pub mod image;
pub mod record;
pub mod upload;
pub mod view;

pub use image::{
    ImageExtension, ImageValue, InlineImage, PendingImage, PendingSource, PrintImage,
};
pub use record::{
    AffectedParcel, Attendee, BeritaAcara, BoundaryMarker, ImageSlot, LandUse, Officer,
    RecordDates, RecordDetails, StoredRecord,
};
pub use upload::{UploadAuthorization, UploadAuthorizationRequest};
pub use view::{numbered, LineItem, Numbered, PrintData, RecordCreated, RecordDetail, RecordSummary};
