//! Read-side shapes: print data for the document generator, the detail view
//! and list summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::image::PrintImage;
use super::record::{AffectedParcel, Attendee, BoundaryMarker, LandUse, Officer, RecordDetails};
use crate::dates::CalendarFields;

/// Line items that may carry a submitted item number.
pub trait LineItem {
    fn take_no(&mut self) -> String;
}

macro_rules! impl_line_item {
    ($($ty:ident $(<$g:ident>)?),* $(,)?) => {
        $(impl$(<$g>)? LineItem for $ty$(<$g>)? {
            fn take_no(&mut self) -> String {
                std::mem::take(&mut self.no)
            }
        })*
    };
}

impl_line_item!(Attendee<I>, BoundaryMarker<I>, Officer<I>, LandUse, AffectedParcel);

/// Line item with its printed number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Numbered<T> {
    pub no: String,
    #[serde(flatten)]
    pub item: T,
}

/// Number items by their submitted `no`, or by 1-based position when none
/// was given.
pub fn numbered<T: LineItem>(items: Vec<T>) -> Vec<Numbered<T>> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, mut item)| {
            let submitted = item.take_no();
            let no = match submitted.trim() {
                "" => (i + 1).to_string(),
                no => no.to_string(),
            };
            Numbered { no, item }
        })
        .collect()
}

/// Flat object handed to the document generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrintData {
    #[serde(flatten)]
    pub calendar: CalendarFields,
    pub ba_date: String,
    pub dasar_tanggal: String,
    pub tanggal_dibuat: String,
    #[serde(flatten)]
    pub details: RecordDetails,
    pub gambar_denah_area: PrintImage,
    pub pengukuran_dihadiri: Vec<Numbered<Attendee<PrintImage>>>,
    pub batas_bidang_tanah: Vec<Numbered<BoundaryMarker<PrintImage>>>,
    pub penggunaan_tanah: Vec<Numbered<LandUse>>,
    pub tanah_terdampak: Vec<Numbered<AffectedParcel>>,
    pub daftar_petugas: Vec<Numbered<Officer<PrintImage>>>,
}

/// Record as shown on the detail page; images are signed read URLs or "".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordDetail {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub ba_date: String,
    pub dasar_tanggal: String,
    pub tanggal_dibuat: String,
    #[serde(flatten)]
    pub details: RecordDetails,
    pub gambar_denah_area: String,
    pub pengukuran_dihadiri: Vec<Attendee<String>>,
    pub batas_bidang_tanah: Vec<BoundaryMarker<String>>,
    pub penggunaan_tanah: Vec<LandUse>,
    pub tanah_terdampak: Vec<AffectedParcel>,
    pub daftar_petugas: Vec<Officer<String>>,
}

/// Row of the record listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecordSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub ba_date: Option<DateTime<Utc>>,
    pub full_name: String,
    pub no_license: String,
    pub desa: String,
    pub no_berkas: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordCreated {
    pub id: Uuid,
}
