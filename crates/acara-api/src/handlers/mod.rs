pub mod documents;
pub mod health;
pub mod records;
#[cfg(feature = "storage-local")]
pub mod storage_objects;
pub mod uploads;
