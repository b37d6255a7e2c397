//! Record persistence, read views and document rendering over HTTP.
//!
//! Run with: `cargo test -p acara-api --test records_test`

mod helpers;

use acara_core::constants::{DOCX_CONTENT_TYPE, FALLBACK_IMAGE_BASE64, RECORD_COLLECTION};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use helpers::{api_path, png_bytes, png_data_url, setup_test_app, split_signed_url, STORAGE_BASE_URL};
use serde_json::{json, Value};
use std::io::{Cursor, Read};
use uuid::Uuid;

fn submission(attendee_photo: &str) -> Value {
    json!({
        "ba_date": "2025-03-05",
        "full_name": "Budi Santoso",
        "no_license": "L-01",
        "desa": "Sukamaju",
        "no_berkas": "B-7",
        "tempat_dibuat": "Bandung",
        "gambar_denah_area": png_data_url(64),
        "pengukuran_dihadiri": [{"nama": "Ani", "foto": attendee_photo}],
        "batas_bidang_tanah": [{"jenis": "Patok", "keterangan": "beton", "foto": ""}],
        "penggunaan_tanah": [{"no_hak": "12", "penggunaan": "Sawah"}],
        "daftar_petugas": [{"nama": "Sari", "tipe_posisi": "ketua", "posisi": "Ketua", "ttd": png_data_url(0)}]
    })
}

async fn create(app: &helpers::TestApp, body: &Value) -> Uuid {
    let response = app.client().post(&api_path("/records")).json(body).await;
    assert_eq!(response.status_code(), 201);
    let created: Value = response.json();
    created["id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_create_record_stores_paths_and_serves_views() {
    let app = setup_test_app().await;
    let client = app.client();

    // Pre-upload one photo the way a client would.
    let photo = png_bytes(8);
    app.state
        .storage
        .upload_with_key("images/temp/u1/ani.png", photo.clone(), "image/png")
        .await
        .unwrap();

    let id = create(&app, &submission("images/temp/u1/ani.png")).await;

    let stored = app
        .state
        .store
        .get_document(RECORD_COLLECTION, id)
        .await
        .unwrap()
        .unwrap();
    let denah = stored.data["gambar_denah_area"].as_str().unwrap();
    assert!(denah.starts_with(&format!("images/{}/gambar_denah_area-", id)));
    assert_eq!(
        stored.data["pengukuran_dihadiri"][0]["foto"],
        "images/temp/u1/ani.png"
    );
    assert_eq!(stored.data["image_storage_version"], 2);
    assert!(!stored.data.to_string().contains("base64"));

    // Detail view: signed read URLs, "" for empty slots.
    let detail: Value = client.get(&api_path(&format!("/records/{}", id))).await.json();
    assert_eq!(detail["full_name"], "Budi Santoso");
    assert_eq!(detail["batas_bidang_tanah"][0]["foto"], "");
    let photo_url = detail["pengukuran_dihadiri"][0]["foto"].as_str().unwrap();
    assert!(photo_url.starts_with(STORAGE_BASE_URL));

    let (path, expires, signature) = split_signed_url(photo_url);
    let read = client
        .get(&path)
        .add_query_param("expires", &expires)
        .add_query_param("signature", &signature)
        .await;
    assert_eq!(read.status_code(), 200);
    assert_eq!(read.header("content-type"), "image/png");
    assert_eq!(read.as_bytes().to_vec(), photo);

    // Print data: embedded base64 at print sizes.
    let print: Value = client
        .get(&api_path(&format!("/records/{}/print-data", id)))
        .await
        .json();
    assert_eq!(print["day"], "Rabu");
    assert_eq!(
        print["pengukuran_dihadiri"][0]["foto"]["data"],
        STANDARD.encode(&photo)
    );
    assert_eq!(print["pengukuran_dihadiri"][0]["no"], "1");
    assert_eq!(print["gambar_denah_area"]["width"], 7.0);
    assert_eq!(print["daftar_petugas"][0]["ttd"]["width"], 2.0);
    assert_eq!(
        print["batas_bidang_tanah"][0]["foto"]["data"],
        FALLBACK_IMAGE_BASE64
    );
}

#[tokio::test]
async fn test_missing_remote_image_prints_placeholder() {
    let app = setup_test_app().await;
    let id = create(&app, &submission("images/temp/u1/gone.jpg")).await;

    let print = app
        .client()
        .get(&api_path(&format!("/records/{}/print-data", id)))
        .await;
    assert_eq!(print.status_code(), 200);
    let print: Value = print.json();
    assert_eq!(
        print["pengukuran_dihadiri"][0]["foto"]["data"],
        FALLBACK_IMAGE_BASE64
    );
    assert_eq!(print["pengukuran_dihadiri"][0]["foto"]["width"], 7.0);
}

#[tokio::test]
async fn test_rejected_submissions_leave_no_trace() {
    let app = setup_test_app().await;
    let client = app.client();

    let mut pending = submission("");
    pending["daftar_petugas"][0]["ttd"] = json!({"kind": "pending", "fileName": "ttd.png"});
    let response = client.post(&api_path("/records")).json(&pending).await;
    assert_eq!(response.status_code(), 422);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNRESOLVED_IMAGE_STATE");
    assert!(body["error"].as_str().unwrap().contains("daftar_petugas[0].ttd"));

    let mut traversal = submission("");
    traversal["pengukuran_dihadiri"][0]["foto"] = json!("images/../secrets/a.png");
    let response = client.post(&api_path("/records")).json(&traversal).await;
    assert_eq!(response.status_code(), 400);

    let mut oversized = submission("");
    oversized["gambar_denah_area"] = json!(png_data_url(10 * 1024 * 1024));
    let response = client.post(&api_path("/records")).json(&oversized).await;
    assert_eq!(response.status_code(), 413);

    let listing: Value = client.get(&api_path("/records")).await.json();
    assert_eq!(listing, json!([]));
    assert!(helpers::stored_files(&app).is_empty());
}

#[tokio::test]
async fn test_listing_is_newest_first_and_paged() {
    let app = setup_test_app().await;
    let first = create(&app, &submission("")).await;
    let mut other = submission("");
    other["full_name"] = json!("Citra");
    let second = create(&app, &other).await;

    let listing: Value = app.client().get(&api_path("/records")).await.json();
    assert_eq!(listing[0]["id"], second.to_string());
    assert_eq!(listing[0]["full_name"], "Citra");
    assert_eq!(listing[1]["id"], first.to_string());

    let page: Value = app
        .client()
        .get(&api_path("/records"))
        .add_query_param("limit", 1)
        .add_query_param("offset", 1)
        .await
        .json();
    assert_eq!(page.as_array().unwrap().len(), 1);
    assert_eq!(page[0]["id"], first.to_string());
}

#[tokio::test]
async fn test_unknown_record_is_not_found() {
    let app = setup_test_app().await;
    let id = Uuid::new_v4();

    let response = app
        .client()
        .get(&api_path(&format!("/records/{}", id)))
        .await;
    assert_eq!(response.status_code(), 404);

    let response = app
        .client()
        .post(&api_path("/documents/render"))
        .json(&json!({"recordId": id}))
        .await;
    assert_eq!(response.status_code(), 404);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_render_document_returns_docx_attachment() {
    let app = setup_test_app().await;
    let id = create(&app, &submission("")).await;

    let response = app
        .client()
        .post(&api_path("/render-document"))
        .json(&json!({"recordId": id, "templateName": null}))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.header("content-type"), DOCX_CONTENT_TYPE);
    assert_eq!(
        response.header("content-disposition"),
        "attachment; filename=\"berita-acara.docx\""
    );

    let bytes = response.as_bytes().to_vec();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut body = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut body)
        .unwrap();
    assert!(body.starts_with("<w:t>Budi Santoso Rabu "));
    assert!(body.contains("[1:Ani;]"));
    assert_eq!(body.matches("<w:drawing>").count(), 1);
    assert!(!body.contains("+++"));

    let mut media = Vec::new();
    archive
        .by_name("word/media/acara_image1.png")
        .unwrap()
        .read_to_end(&mut media)
        .unwrap();
    assert!(media.starts_with(&png_bytes(0)[..8]));
    assert!(archive.by_name("word/_rels/document.xml.rels").is_ok());
    assert!(archive.by_name("[Content_Types].xml").is_ok());
}

#[tokio::test]
async fn test_render_document_template_lookup_is_confined() {
    let app = setup_test_app().await;
    let id = create(&app, &submission("")).await;

    let response = app
        .client()
        .post(&api_path("/documents/render"))
        .json(&json!({"recordId": id, "templateName": "../../etc/passwd"}))
        .await;
    assert_eq!(response.status_code(), 404);
    let body: Value = response.json();
    assert_eq!(body["code"], "TEMPLATE_NOT_FOUND");
}

#[tokio::test]
async fn test_health_and_openapi() {
    let app = setup_test_app().await;

    let health = app.client().get("/health").await;
    assert_eq!(health.status_code(), 200);
    let body: Value = health.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage_backend"], "local");

    let spec: Value = app.client().get("/api/openapi.json").await.json();
    assert!(spec["paths"]["/api/v0/records"].is_object());
    assert!(spec["paths"]["/api/v0/uploads/authorize"].is_object());
}
