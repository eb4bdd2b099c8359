//! Upload API integration tests.
//!
//! Run with: `cargo test -p intake-api --test upload_test`

mod helpers;

use axum_test::multipart::MultipartForm;
use helpers::fixtures::{scan_png, tar_bytes, text_pdf, zip_bytes};
use helpers::mocks::{FixedClassifier, FixedOcr, MemoryDocuments, MemoryStorage, RecordingExporter};
use helpers::{file_part, form, setup_test_app, TestAppBuilder};
use intake_core::DocumentType;
use intake_db::FileStatus;
use intake_processing::ArchiveLimits;
use serde_json::Value;
use std::collections::HashSet;
use uuid::Uuid;

const PDF: &str = "application/pdf";

fn files(body: &Value) -> &Vec<Value> {
    body["files"].as_array().expect("files array")
}

#[tokio::test]
async fn single_pdf_is_stored_classified_and_chunked() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/upload")
        .add_header("x-session-id", "session-1")
        .add_header("x-user-id", "alice")
        .multipart(form(vec![file_part(
            "invoice.pdf",
            PDF,
            text_pdf("Invoice 1042 Northwind Trading"),
        )]))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    let entries = files(&body);
    assert_eq!(entries.len(), 1);

    let entry = &entries[0];
    assert!(entry.get("error").is_none(), "unexpected error: {}", entry);
    assert_eq!(entry["name"], "invoice.pdf");
    assert_eq!(entry["content_type"], PDF);
    assert_eq!(entry["metadata1"]["document_type"], "Invoice");
    assert_eq!(entry["metadata2"]["document_type"], "Invoice");
    assert_eq!(entry["metadata2"]["number"], 1042);
    assert_eq!(entry["metadata2"]["organization"], "Northwind Trading");
    assert!(entry.get("package_id").is_none());
    assert!(entry["url"]
        .as_str()
        .unwrap()
        .starts_with("https://files.test/sessions/session-1/"));
    assert!(entry["chunks"].as_u64().unwrap() >= 1);

    let puts = app.storage.puts();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].scope, "session-1");

    let id: Uuid = entry["id"].as_str().unwrap().parse().unwrap();
    let stored = app.documents.file(id).expect("file row");
    assert_eq!(stored.status, FileStatus::Ready);
    assert_eq!(stored.record.created_by, "alice");
    assert_eq!(stored.record.file_name, "invoice.pdf");
    assert_eq!(stored.record.metadata["metadata1"]["document_type"], "Invoice");
    assert!(stored.chunks >= 1);
}

#[tokio::test]
async fn anonymous_upload_gets_generated_session() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/upload")
        .multipart(form(vec![file_part("a.pdf", PDF, text_pdf("hello"))]))
        .await;

    assert_eq!(response.status_code(), 201);
    let puts = app.storage.puts();
    assert_eq!(puts.len(), 1);
    assert!(!puts[0].scope.is_empty());

    let files = app.documents.files();
    assert_eq!(files[0].record.created_by, "anonymous");
}

#[tokio::test]
async fn zip_members_share_one_package() {
    let app = setup_test_app();
    let first = text_pdf("first document");
    let second = text_pdf("second document");
    let archive = zip_bytes(&[
        ("a.pdf", &first),
        ("docs/", b""),
        ("docs/b.pdf", &second),
        ("__MACOSX/", b""),
        ("__MACOSX/._a.pdf", b"resource fork"),
    ]);

    let response = app
        .client()
        .post("/upload")
        .multipart(form(vec![file_part("bundle.zip", "application/zip", archive)]))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    let entries = files(&body);
    assert_eq!(entries.len(), 2);

    let names: Vec<&str> = entries.iter().map(|e| e["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["a.pdf", "docs/b.pdf"]);

    let packages: HashSet<&str> = entries
        .iter()
        .map(|e| e["package_id"].as_str().expect("package_id"))
        .collect();
    assert_eq!(packages.len(), 1);
    assert!(entries.iter().all(|e| e["package_name"] == "bundle.zip"));

    // Only members are stored, never the container.
    assert_eq!(app.storage.puts().len(), 2);
    let rows = app.documents.files();
    assert!(rows.iter().all(|f| f.record.package_name.as_deref() == Some("bundle.zip")));
}

#[tokio::test]
async fn archive_over_entry_ceiling_yields_single_error() {
    let app = setup_test_app();
    let members: Vec<(String, Vec<u8>)> = (0..501)
        .map(|i| (format!("doc{}.pdf", i), b"%PDF".to_vec()))
        .collect();
    let entries: Vec<(&str, &[u8])> = members
        .iter()
        .map(|(n, d)| (n.as_str(), d.as_slice()))
        .collect();

    let response = app
        .client()
        .post("/upload")
        .multipart(form(vec![file_part(
            "many.zip",
            "application/zip",
            zip_bytes(&entries),
        )]))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    let entries = files(&body);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["name"], "many.zip");
    assert!(entries[0]["error"].as_str().unwrap().contains("500"));
    assert!(entries[0].get("package_id").is_none());
    assert!(app.storage.puts().is_empty());
}

#[tokio::test]
async fn corrupt_archive_is_reported_not_rejected() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/upload")
        .multipart(form(vec![
            file_part("broken.zip", "application/zip", b"PK\x03\x04 not really".to_vec()),
            file_part("ok.pdf", PDF, text_pdf("still processed")),
        ]))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    let entries = files(&body);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["name"], "broken.zip");
    assert!(entries[0].get("error").is_some());
    assert!(entries[1].get("error").is_none());
}

#[tokio::test]
async fn disallowed_top_level_file_rejects_request() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/upload")
        .multipart(form(vec![
            file_part("ok.pdf", PDF, text_pdf("fine")),
            file_part("setup.exe", "application/octet-stream", b"MZ\x90\x00".to_vec()),
        ]))
        .await;

    assert_eq!(response.status_code(), 415);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNSUPPORTED_MEDIA_TYPE");
    assert!(app.storage.puts().is_empty());
    assert!(app.documents.files().is_empty());
}

#[tokio::test]
async fn extension_decides_even_with_allowed_content_type() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/upload")
        .multipart(form(vec![file_part("notes.txt", PDF, b"plain".to_vec())]))
        .await;

    assert_eq!(response.status_code(), 415);
}

#[tokio::test]
async fn extensionless_file_uses_declared_content_type() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/upload")
        .multipart(form(vec![file_part("scan", "image/png", scan_png())]))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert_eq!(files(&body)[0]["content_type"], "image/png");
}

#[tokio::test]
async fn scanned_image_goes_through_ocr() {
    let app = TestAppBuilder::default()
        .ocr(FixedOcr("Goods shipment note 77 from Contoso"))
        .classifier(FixedClassifier::new(DocumentType::GoodsShipmentNote))
        .build();

    let response = app
        .client()
        .post("/upload")
        .multipart(form(vec![file_part("page.png", "image/png", scan_png())]))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    let entry = &files(&body)[0];
    assert!(entry.get("error").is_none(), "unexpected error: {}", entry);
    assert_eq!(entry["metadata1"]["document_type"], "Goods Shipment Note");
    assert_eq!(entry["chunks"], 1);
}

#[tokio::test]
async fn document_without_text_still_succeeds() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/upload")
        .multipart(form(vec![file_part("blank.png", "image/png", scan_png())]))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    let entry = &files(&body)[0];
    assert!(entry.get("error").is_none());
    assert_eq!(entry["chunks"], 0);

    let rows = app.documents.files();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, FileStatus::Ready);
}

#[tokio::test]
async fn garbage_has_no_fields() {
    let app = TestAppBuilder::default()
        .classifier(FixedClassifier::new(DocumentType::Garbage))
        .build();

    let response = app
        .client()
        .post("/upload")
        .multipart(form(vec![file_part("flyer.pdf", PDF, text_pdf("buy now"))]))
        .await;

    let body: Value = response.json();
    let entry = &files(&body)[0];
    assert_eq!(entry["metadata1"]["document_type"], "Garbage");
    assert_eq!(entry["metadata2"], serde_json::json!({ "document_type": "Garbage" }));
}

#[tokio::test]
async fn traversal_member_never_surfaces() {
    let app = setup_test_app();
    let pdf = text_pdf("legit");
    let archive = zip_bytes(&[("../../evil.pdf", &pdf), ("ok.pdf", &pdf)]);

    let response = app
        .client()
        .post("/upload")
        .multipart(form(vec![file_part("evil.zip", "application/zip", archive)]))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    let names: Vec<&str> = files(&body)
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["ok.pdf"]);
    assert!(app.storage.puts().iter().all(|p| !p.name.contains("evil")));
}

#[tokio::test]
async fn oversized_member_is_skipped_unread() {
    let app = TestAppBuilder::default()
        .archive_limits(ArchiveLimits {
            max_entries: 500,
            max_member_size: 4096,
        })
        .build();
    let small = text_pdf("small");
    let big = vec![b'x'; 16 * 1024];
    let archive = zip_bytes(&[("big.pdf", &big), ("small.pdf", &small)]);

    let response = app
        .client()
        .post("/upload")
        .multipart(form(vec![file_part("mixed.zip", "application/zip", archive)]))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    let entries = files(&body);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["name"], "small.pdf");
    assert!(app.storage.puts().iter().all(|p| p.name != "big.pdf"));
}

#[tokio::test]
async fn archive_members_filtered_by_extension() {
    let app = setup_test_app();
    let pdf = text_pdf("report");
    let archive = tar_bytes(&[
        ("readme.txt", b"not a document"),
        ("report.pdf", &pdf),
        ("tool.exe", b"MZ"),
    ]);

    let response = app
        .client()
        .post("/upload")
        .multipart(form(vec![file_part("batch.tar", "application/x-tar", archive)]))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    let entries = files(&body);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["name"], "report.pdf");
}

#[tokio::test]
async fn archive_detected_from_content_type_alone() {
    let app = setup_test_app();
    let pdf = text_pdf("inside");
    let archive = zip_bytes(&[("inside.pdf", &pdf)]);

    let response = app
        .client()
        .post("/upload")
        .multipart(form(vec![file_part("upload", "application/zip", archive)]))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    let entries = files(&body);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["name"], "inside.pdf");
    assert_eq!(entries[0]["package_name"], "upload");
}

#[tokio::test]
async fn one_failing_item_does_not_affect_others() {
    let app = TestAppBuilder::default()
        .storage(MemoryStorage::failing_on(&["broken.pdf"]))
        .build();

    let response = app
        .client()
        .post("/upload")
        .multipart(form(vec![
            file_part("broken.pdf", PDF, text_pdf("one")),
            file_part("good.pdf", PDF, text_pdf("two")),
        ]))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    let entries = files(&body);
    assert_eq!(entries.len(), 2);

    assert_eq!(entries[0]["name"], "broken.pdf");
    assert_eq!(entries[0]["code"], "STORAGE_UPLOAD_FAILED");
    assert!(entries[0].get("url").is_none());
    // Backend detail stays in the logs.
    assert!(!entries[0]["error"].as_str().unwrap().contains("bucket refused"));

    assert_eq!(entries[1]["name"], "good.pdf");
    assert!(entries[1].get("error").is_none());
    assert_eq!(app.documents.files().len(), 1);
}

#[tokio::test]
async fn unknown_classification_fails_only_that_item() {
    let app = TestAppBuilder::default()
        .classifier(FixedClassifier {
            document_type: DocumentType::Invoice,
            reject_images: true,
        })
        .build();

    let response = app
        .client()
        .post("/upload")
        .multipart(form(vec![
            file_part("receipt.png", "image/png", scan_png()),
            file_part("invoice.pdf", PDF, text_pdf("invoice")),
        ]))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    let entries = files(&body);
    assert_eq!(entries[0]["code"], "UNKNOWN_DOCUMENT_TYPE");
    assert!(entries[1].get("error").is_none());
    // Stored before classification; no record written.
    assert_eq!(app.storage.puts().len(), 2);
    assert_eq!(app.documents.files().len(), 1);
}

#[tokio::test]
async fn chunk_failure_marks_record_failed() {
    let app = TestAppBuilder::default()
        .documents(MemoryDocuments::failing_chunks_for(&["a.pdf"]))
        .build();

    let response = app
        .client()
        .post("/upload")
        .multipart(form(vec![file_part("a.pdf", PDF, text_pdf("text to chunk"))]))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert!(files(&body)[0].get("error").is_some());

    let rows = app.documents.files();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, FileStatus::Failed);
}

#[tokio::test]
async fn structured_records_are_exported() {
    let app = TestAppBuilder::default()
        .exporter(RecordingExporter::default())
        .build();

    let response = app
        .client()
        .post("/upload")
        .multipart(form(vec![file_part("a.pdf", PDF, text_pdf("invoice"))]))
        .await;

    assert_eq!(response.status_code(), 201);
    let records = app.exporter.as_ref().unwrap().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].document_type(), DocumentType::Invoice);
}

#[tokio::test]
async fn export_failure_does_not_fail_item() {
    let app = TestAppBuilder::default()
        .exporter(RecordingExporter::failing())
        .build();

    let response = app
        .client()
        .post("/upload")
        .multipart(form(vec![file_part("a.pdf", PDF, text_pdf("invoice"))]))
        .await;

    let body: Value = response.json();
    assert!(files(&body)[0].get("error").is_none());
}

#[tokio::test]
async fn no_files_is_bad_request() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/upload")
        .multipart(MultipartForm::new().add_text("note", "nothing attached"))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn oversized_file_is_payload_too_large() {
    let app = TestAppBuilder::default().max_file_size(1024).build();

    let response = app
        .client()
        .post("/upload")
        .multipart(form(vec![file_part("big.pdf", PDF, vec![b'x'; 4096])]))
        .await;

    assert_eq!(response.status_code(), 413);
    assert!(app.storage.puts().is_empty());
}

#[tokio::test]
async fn malformed_session_header_is_rejected() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/upload")
        .add_header("x-session-id", "../other-session")
        .multipart(form(vec![file_part("a.pdf", PDF, text_pdf("x"))]))
        .await;

    assert_eq!(response.status_code(), 400);
    assert!(app.storage.puts().is_empty());
}

#[tokio::test]
async fn liveness_and_openapi_are_served() {
    let app = setup_test_app();

    let live = app.client().get("/health/live").await;
    assert_eq!(live.status_code(), 200);

    let openapi = app.client().get("/api/openapi.json").await;
    assert_eq!(openapi.status_code(), 200);
    let body: Value = openapi.json();
    assert!(body["paths"]["/upload"]["post"].is_object());
}
