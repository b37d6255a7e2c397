//! Record assembly: submissions into persisted records, persisted records
//! into print data and detail views.

use std::sync::Arc;

use acara_core::constants::{IMAGE_STORAGE_VERSION, RECORD_COLLECTION};
use acara_core::dates::{long_date, CalendarFields};
use acara_core::models::{
    numbered, BeritaAcara, ImageValue, PrintData, RecordDetail, RecordSummary, StoredRecord,
};
use acara_core::AppError;
use acara_db::{Document, DocumentStore};
use chrono::Utc;
use chrono_tz::Tz;
use futures::future::join_all;
use serde_json::Value;
use uuid::Uuid;

use crate::normalizer::{ImageNormalizer, PreparedImage};
use crate::rollback::RollbackLedger;

#[derive(Clone)]
pub struct RecordAssembler {
    store: Arc<dyn DocumentStore>,
    normalizer: ImageNormalizer,
    timezone: Tz,
}

impl RecordAssembler {
    pub fn new(store: Arc<dyn DocumentStore>, normalizer: ImageNormalizer, timezone: Tz) -> Self {
        Self {
            store,
            normalizer,
            timezone,
        }
    }

    /// Persist a raw submission and return its id.
    ///
    /// Every image slot is classified and checked before anything is
    /// written, so writes can only fail in transfer or in the store. Objects
    /// written for this attempt are deleted again if any later step fails.
    #[tracing::instrument(skip(self, submission))]
    pub async fn persist_record(&self, submission: Value) -> Result<Uuid, AppError> {
        let raw: BeritaAcara<Value> = serde_json::from_value(submission)?;
        raw.check_required()?;

        let record = raw.try_map_images(|slot, value| {
            let field = slot.to_string();
            match ImageValue::classify(&value, &field)? {
                ImageValue::PendingLocal(_) => Err(AppError::UnresolvedImageState { field }),
                classified => self.normalizer.prepare_for_storage(classified, &field),
            }
        })?;

        let record_id = Uuid::new_v4();
        let ledger = RollbackLedger::new();

        match self.store_record(record, record_id, &ledger).await {
            Ok(()) => {
                tracing::info!(record_id = %record_id, "Record persisted");
                Ok(record_id)
            }
            Err(e) => {
                if !ledger.is_empty() {
                    tracing::warn!(
                        error = %e,
                        record_id = %record_id,
                        objects = ledger.paths().len(),
                        "Rolling back images written for failed submission"
                    );
                    ledger.compensate(self.normalizer.storage().as_ref()).await;
                }
                Err(e)
            }
        }
    }

    async fn store_record(
        &self,
        mut record: BeritaAcara<PreparedImage>,
        record_id: Uuid,
        ledger: &RollbackLedger,
    ) -> Result<(), AppError> {
        let prepared: Vec<_> = record
            .images_mut()
            .into_iter()
            .map(|(slot, value)| (slot, std::mem::take(value)))
            .collect();

        // Wait for every write so the ledger is complete before deciding.
        let results = join_all(prepared.into_iter().map(|(slot, value)| {
            let field = slot.to_string();
            async move {
                self.normalizer
                    .store_prepared(value, &field, record_id, ledger)
                    .await
            }
        }))
        .await;
        let paths = results.into_iter().collect::<Result<Vec<String>, AppError>>()?;

        let stored = StoredRecord {
            record: record.with_images(paths)?,
            image_storage_version: IMAGE_STORAGE_VERSION,
        };
        let data = serde_json::to_value(&stored)?;

        self.store
            .create_document_with_id(RECORD_COLLECTION, record_id, data)
            .await
            .map_err(|e| AppError::RecordPersistFailed(e.to_string()))?;
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<(Document, BeritaAcara<ImageValue>), AppError> {
        let document = self
            .store
            .get_document(RECORD_COLLECTION, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Record not found".to_string()))?;

        let raw: BeritaAcara<Value> = serde_json::from_value(document.data.clone())
            .map_err(|e| AppError::Internal(format!("stored record {} is malformed: {}", id, e)))?;
        let record = raw.map_images(|slot, value| {
            ImageValue::classify(&value, &slot.to_string()).unwrap_or_else(|e| {
                tracing::warn!(error = %e, record_id = %id, field = %slot, "Unreadable stored image");
                ImageValue::Empty
            })
        });

        Ok((document, record))
    }

    /// Flat data for the document generator. Image failures degrade to the
    /// fallback image; a missing `ba_date` prints as today.
    #[tracing::instrument(skip(self))]
    pub async fn build_print_data(&self, id: Uuid) -> Result<PrintData, AppError> {
        let (_, record) = self.load(id).await?;

        let images = join_all(record.images().into_iter().map(|(slot, value)| {
            let field = slot.to_string();
            async move {
                self.normalizer
                    .normalize_for_print(value, &field, slot.print_size())
                    .await
            }
        }))
        .await;
        let record = record.with_images(images)?;

        let ba_date = record.dates.ba_date.unwrap_or_else(Utc::now);
        Ok(PrintData {
            calendar: CalendarFields::from_datetime(ba_date, self.timezone),
            ba_date: long_date(Some(ba_date), self.timezone),
            dasar_tanggal: long_date(record.dates.dasar_tanggal, self.timezone),
            tanggal_dibuat: long_date(record.dates.tanggal_dibuat, self.timezone),
            details: record.details,
            gambar_denah_area: record.gambar_denah_area,
            pengukuran_dihadiri: numbered(record.pengukuran_dihadiri),
            batas_bidang_tanah: numbered(record.batas_bidang_tanah),
            penggunaan_tanah: numbered(record.penggunaan_tanah),
            tanah_terdampak: numbered(record.tanah_terdampak),
            daftar_petugas: numbered(record.daftar_petugas),
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn build_detail_view(&self, id: Uuid) -> Result<RecordDetail, AppError> {
        let (document, record) = self.load(id).await?;

        let urls = join_all(record.images().into_iter().map(|(slot, value)| {
            let field = slot.to_string();
            async move { self.normalizer.normalize_for_display(value, &field).await }
        }))
        .await;
        let record = record.with_images(urls)?;

        Ok(RecordDetail {
            id: document.id,
            created_at: document.created_at,
            ba_date: long_date(record.dates.ba_date, self.timezone),
            dasar_tanggal: long_date(record.dates.dasar_tanggal, self.timezone),
            tanggal_dibuat: long_date(record.dates.tanggal_dibuat, self.timezone),
            details: record.details,
            gambar_denah_area: record.gambar_denah_area,
            pengukuran_dihadiri: record.pengukuran_dihadiri,
            batas_bidang_tanah: record.batas_bidang_tanah,
            penggunaan_tanah: record.penggunaan_tanah,
            tanah_terdampak: record.tanah_terdampak,
            daftar_petugas: record.daftar_petugas,
        })
    }

    /// Newest first.
    pub async fn list_records(&self, limit: i64, offset: i64) -> Result<Vec<RecordSummary>, AppError> {
        let documents = self
            .store
            .list_documents(RECORD_COLLECTION, limit, offset)
            .await?;

        Ok(documents
            .into_iter()
            .filter_map(|document| {
                let record: BeritaAcara<Value> = match serde_json::from_value(document.data) {
                    Ok(record) => record,
                    Err(e) => {
                        tracing::warn!(error = %e, record_id = %document.id, "Skipping malformed record");
                        return None;
                    }
                };
                Some(RecordSummary {
                    id: document.id,
                    created_at: document.created_at,
                    ba_date: record.dates.ba_date,
                    full_name: record.details.full_name,
                    no_license: record.details.no_license,
                    desa: record.details.desa,
                    no_berkas: record.details.no_berkas,
                })
            })
            .collect())
    }
}
