//! Test helpers: build the application state and router for integration tests.
//!
//! Everything runs in-process: local storage in a temp dir, the in-memory
//! document store and a one-part DOCX template.

#![allow(dead_code)]

use acara_api::setup::{routes, services, storage::StorageHandles};
use acara_api::state::AppState;
use acara_core::config::RecordServiceConfig;
use acara_core::constants::FALLBACK_IMAGE_BASE64;
use acara_core::{Config, DocumentStoreBackend, StorageBackend};
use acara_db::{DocumentStore, MemoryDocumentStore};
use acara_storage::{LocalStorage, UrlSigner};
use axum_test::TestServer;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::ZipWriter;

pub const SIGNING_SECRET: &str = "0123456789abcdef0123456789abcdef";
pub const STORAGE_BASE_URL: &str = "http://localhost:4000/api/v0/storage";

pub fn api_path(path: &str) -> String {
    format!("{}{}", acara_api::constants::API_PREFIX, path)
}

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub storage_dir: TempDir,
    pub templates_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

fn test_config(storage_dir: &Path, templates_dir: &Path) -> Config {
    Config(Box::new(RecordServiceConfig {
        server_port: 4000,
        cors_origins: vec!["*".to_string()],
        environment: "test".to_string(),
        document_store: DocumentStoreBackend::Memory,
        database_url: None,
        db_max_connections: 5,
        db_timeout_seconds: 5,
        storage_backend: StorageBackend::Local,
        storage_bucket: "acara-test".to_string(),
        images_prefix: "images".to_string(),
        s3_region: None,
        s3_endpoint: None,
        aws_region: None,
        local_storage_path: Some(storage_dir.display().to_string()),
        local_storage_base_url: Some(STORAGE_BASE_URL.to_string()),
        storage_signing_secret: Some(SIGNING_SECRET.to_string()),
        templates_dir: templates_dir.to_path_buf(),
        default_template: "berita-acara.docx".to_string(),
        display_timezone: chrono_tz::Asia::Jakarta,
        display_url_ttl_secs: 3600,
    }))
}

fn write_template(dir: &Path) {
    let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = FileOptions::default();
    writer.start_file("word/document.xml", options).unwrap();
    writer
        .write_all(
            b"<w:t>+++full_name+++ +++day+++ +++ba_date+++ \
              [+++FOR p IN pengukuran_dihadiri++++++INS $p.no+++:+++INS $p.nama+++;+++END-FOR p+++]\
              +++IMAGE gambar_denah_area+++</w:t>",
        )
        .unwrap();
    let bytes = writer.finish().unwrap().into_inner();
    std::fs::write(dir.join("berita-acara.docx"), bytes).unwrap();
}

pub async fn setup_test_app() -> TestApp {
    let storage_dir = tempfile::tempdir().expect("Failed to create storage dir");
    let templates_dir = tempfile::tempdir().expect("Failed to create templates dir");
    write_template(templates_dir.path());

    let config = test_config(storage_dir.path(), templates_dir.path());

    let local = LocalStorage::new(
        storage_dir.path(),
        STORAGE_BASE_URL.to_string(),
        UrlSigner::new(SIGNING_SECRET),
    )
    .await
    .expect("Failed to create local storage");
    let handles = StorageHandles {
        storage: Arc::new(local.clone()),
        local: Some(local),
    };
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());

    let state = services::initialize_services(&config, store, handles)
        .expect("Failed to initialize services");
    let app = routes::setup_routes(&config, state.clone()).expect("Failed to setup routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        storage_dir,
        templates_dir,
    }
}

/// Smallest valid PNG, optionally padded with trailing zero bytes.
pub fn png_bytes(padding: usize) -> Vec<u8> {
    let mut bytes = STANDARD.decode(FALLBACK_IMAGE_BASE64).unwrap();
    bytes.resize(bytes.len() + padding, 0);
    bytes
}

pub fn png_data_url(padding: usize) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png_bytes(padding)))
}

/// Split a signed upload target into its path and `(expires, signature)`.
pub fn split_signed_url(url: &str) -> (String, String, String) {
    let path_and_query = url
        .strip_prefix("http://localhost:4000")
        .expect("signed URL points at the test server");
    let (path, query) = path_and_query.split_once('?').expect("query string");
    let mut expires = String::new();
    let mut signature = String::new();
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some(("expires", v)) => expires = v.to_string(),
            Some(("signature", v)) => signature = v.to_string(),
            _ => {}
        }
    }
    (path.to_string(), expires, signature)
}

/// Every object file under the storage directory.
pub fn stored_files(app: &TestApp) -> Vec<PathBuf> {
    fn walk(dir: &Path, out: &mut Vec<PathBuf>) {
        for entry in std::fs::read_dir(dir).unwrap().flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(&path, out);
            } else {
                out.push(path);
            }
        }
    }
    let mut files = Vec::new();
    walk(app.storage_dir.path(), &mut files);
    files
}
