//! Berita acara record model.
//!
//! [`BeritaAcara`] is generic over how image slots are represented so the
//! same shape serves raw submissions (`serde_json::Value`), client form state
//! ([`ImageValue`](super::image::ImageValue)) and persisted records (storage
//! path strings).

use std::convert::Infallible;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::{PrintSize, PHOTO_PRINT_SIZE, SIGNATURE_PRINT_SIZE};
use crate::error::AppError;

/// Position of one image slot within a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSlot {
    SiteDiagram,
    AttendeePhoto(usize),
    BoundaryPhoto(usize),
    OfficerSignature(usize),
}

impl ImageSlot {
    pub fn print_size(&self) -> PrintSize {
        match self {
            ImageSlot::OfficerSignature(_) => SIGNATURE_PRINT_SIZE,
            ImageSlot::SiteDiagram | ImageSlot::AttendeePhoto(_) | ImageSlot::BoundaryPhoto(_) => {
                PHOTO_PRINT_SIZE
            }
        }
    }
}

/// Field locator, e.g. `daftar_petugas[1].ttd`.
impl fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSlot::SiteDiagram => write!(f, "gambar_denah_area"),
            ImageSlot::AttendeePhoto(i) => write!(f, "pengukuran_dihadiri[{}].foto", i),
            ImageSlot::BoundaryPhoto(i) => write!(f, "batas_bidang_tanah[{}].foto", i),
            ImageSlot::OfficerSignature(i) => write!(f, "daftar_petugas[{}].ttd", i),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordDates {
    #[serde(default, deserialize_with = "lenient_date")]
    pub ba_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub dasar_tanggal: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub tanggal_dibuat: Option<DateTime<Utc>>,
}

/// Plain text fields of a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordDetails {
    #[serde(default, deserialize_with = "lenient_string")]
    pub full_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub no_license: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub position: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub full_name2: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub nip: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub position2: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub desa: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub kecamatan: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub kabupaten: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub provinsi: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub no_berkas: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dasar_no_pengukuran: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dasar_full_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dasar_peta_pendaftaran: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dasar_gambar_ukur: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dasar_surat_ukur: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tempat_dibuat: String,
}

/// Attendee of the measurement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "I: Deserialize<'de> + Default"))]
pub struct Attendee<I> {
    /// Item number as submitted; print numbering falls back to the position.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub no: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub nama: String,
    #[serde(default)]
    pub foto: I,
}

/// Boundary marker of the parcel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "I: Deserialize<'de> + Default"))]
pub struct BoundaryMarker<I> {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub no: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub jenis: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub keterangan: String,
    #[serde(default)]
    pub foto: I,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandUse {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub no: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub no_hak: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub penggunaan: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AffectedParcel {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub no: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub nib: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub luas_sebelum: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub luas_sesudah: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub keterangan: String,
}

/// Officer signing the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "I: Deserialize<'de> + Default"))]
pub struct Officer<I> {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub no: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub nama: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tipe_posisi: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub posisi: String,
    #[serde(default)]
    pub ttd: I,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "I: Deserialize<'de> + Default"))]
pub struct BeritaAcara<I> {
    #[serde(flatten)]
    pub dates: RecordDates,
    #[serde(flatten)]
    pub details: RecordDetails,
    #[serde(default)]
    pub gambar_denah_area: I,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub pengukuran_dihadiri: Vec<Attendee<I>>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub batas_bidang_tanah: Vec<BoundaryMarker<I>>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub penggunaan_tanah: Vec<LandUse>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub tanah_terdampak: Vec<AffectedParcel>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub daftar_petugas: Vec<Officer<I>>,
}

impl<I> BeritaAcara<I> {
    /// Image slots in traversal order: site diagram, attendees, boundary
    /// markers, officers.
    pub fn images(&self) -> Vec<(ImageSlot, &I)> {
        let mut slots = Vec::with_capacity(self.image_count());
        slots.push((ImageSlot::SiteDiagram, &self.gambar_denah_area));
        for (i, item) in self.pengukuran_dihadiri.iter().enumerate() {
            slots.push((ImageSlot::AttendeePhoto(i), &item.foto));
        }
        for (i, item) in self.batas_bidang_tanah.iter().enumerate() {
            slots.push((ImageSlot::BoundaryPhoto(i), &item.foto));
        }
        for (i, item) in self.daftar_petugas.iter().enumerate() {
            slots.push((ImageSlot::OfficerSignature(i), &item.ttd));
        }
        slots
    }

    /// Mutable image slots, same order as [`images`](Self::images).
    pub fn images_mut(&mut self) -> Vec<(ImageSlot, &mut I)> {
        let mut slots = Vec::with_capacity(self.image_count());
        slots.push((ImageSlot::SiteDiagram, &mut self.gambar_denah_area));
        for (i, item) in self.pengukuran_dihadiri.iter_mut().enumerate() {
            slots.push((ImageSlot::AttendeePhoto(i), &mut item.foto));
        }
        for (i, item) in self.batas_bidang_tanah.iter_mut().enumerate() {
            slots.push((ImageSlot::BoundaryPhoto(i), &mut item.foto));
        }
        for (i, item) in self.daftar_petugas.iter_mut().enumerate() {
            slots.push((ImageSlot::OfficerSignature(i), &mut item.ttd));
        }
        slots
    }

    pub fn image_count(&self) -> usize {
        1 + self.pengukuran_dihadiri.len()
            + self.batas_bidang_tanah.len()
            + self.daftar_petugas.len()
    }

    /// Rebuild the record with every image slot converted by `f`, visiting
    /// slots in traversal order. Stops at the first error.
    pub fn try_map_images<J, E, F>(self, mut f: F) -> Result<BeritaAcara<J>, E>
    where
        F: FnMut(ImageSlot, I) -> Result<J, E>,
    {
        let gambar_denah_area = f(ImageSlot::SiteDiagram, self.gambar_denah_area)?;
        let pengukuran_dihadiri = self
            .pengukuran_dihadiri
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                Ok(Attendee {
                    no: item.no,
                    nama: item.nama,
                    foto: f(ImageSlot::AttendeePhoto(i), item.foto)?,
                })
            })
            .collect::<Result<Vec<_>, E>>()?;
        let batas_bidang_tanah = self
            .batas_bidang_tanah
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                Ok(BoundaryMarker {
                    no: item.no,
                    jenis: item.jenis,
                    keterangan: item.keterangan,
                    foto: f(ImageSlot::BoundaryPhoto(i), item.foto)?,
                })
            })
            .collect::<Result<Vec<_>, E>>()?;
        let daftar_petugas = self
            .daftar_petugas
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                Ok(Officer {
                    no: item.no,
                    nama: item.nama,
                    tipe_posisi: item.tipe_posisi,
                    posisi: item.posisi,
                    ttd: f(ImageSlot::OfficerSignature(i), item.ttd)?,
                })
            })
            .collect::<Result<Vec<_>, E>>()?;

        Ok(BeritaAcara {
            dates: self.dates,
            details: self.details,
            gambar_denah_area,
            pengukuran_dihadiri,
            batas_bidang_tanah,
            penggunaan_tanah: self.penggunaan_tanah,
            tanah_terdampak: self.tanah_terdampak,
            daftar_petugas,
        })
    }

    pub fn map_images<J, F>(self, mut f: F) -> BeritaAcara<J>
    where
        F: FnMut(ImageSlot, I) -> J,
    {
        match self.try_map_images(|slot, value| Ok::<J, Infallible>(f(slot, value))) {
            Ok(record) => record,
            Err(never) => match never {},
        }
    }

    /// Replace image slots positionally with `values`, which must be in
    /// traversal order and match [`image_count`](Self::image_count).
    pub fn with_images<J>(self, values: Vec<J>) -> Result<BeritaAcara<J>, AppError> {
        if values.len() != self.image_count() {
            return Err(AppError::Internal(format!(
                "expected {} image values, got {}",
                self.image_count(),
                values.len()
            )));
        }
        let mut values = values.into_iter();
        self.try_map_images(|slot, _| {
            values
                .next()
                .ok_or_else(|| AppError::Internal(format!("no image value for {}", slot)))
        })
    }

    /// Fields a submission cannot do without.
    pub fn check_required(&self) -> Result<(), AppError> {
        if self.details.full_name.trim().is_empty() {
            return Err(AppError::InvalidInput("full_name is required".to_string()));
        }
        if self.details.tempat_dibuat.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "tempat_dibuat is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Persisted document shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    #[serde(flatten)]
    pub record: BeritaAcara<String>,
    #[serde(default)]
    pub image_storage_version: u32,
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => parse_date(&s),
        _ => None,
    })
}

/// RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
