//! API integration tests
//!
//! Exercised against a live server and database. Run with:
//! `cargo test -- --ignored`

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

async fn create_provider(client: &Client, name: &str) -> Value {
    let response = client
        .post(format!("{}/providers", BASE_URL))
        .json(&json!({
            "name": name,
            "file_name_pattern": "*.csv",
            "csv_delimiter": ";",
        }))
        .send()
        .await
        .expect("Failed to create provider");
    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse provider")
}

async fn create_template(client: &Client, provider_id: i64) -> Value {
    let response = client
        .post(format!("{}/templates", BASE_URL))
        .json(&json!({
            "name": format!("template-{}", provider_id),
            "provider_id": provider_id,
            "lines": [
                {"source_column": "EAN", "target_field": "barcode", "required_field": true},
                {"source_column": "Libelle", "target_field": "name"},
                {"source_column": "Marque", "target_field": "brand"},
                {"source_column": "Prix", "target_field": "cost_price"},
            ],
        }))
        .send()
        .await
        .expect("Failed to create template");
    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse template")
}

/// Attach a mapping template to a provider
async fn attach_template(client: &Client, provider_id: i64, template_id: i64) {
    let response = client
        .put(format!("{}/providers/{}", BASE_URL, provider_id))
        .json(&json!({ "mapping_template_id": template_id }))
        .send()
        .await
        .expect("Failed to update provider");
    assert!(response.status().is_success());
}

async fn upload_csv(client: &Client, provider_id: i64, content: &str) -> reqwest::Response {
    let part = reqwest::multipart::Part::text(content.to_string())
        .file_name("feed.csv")
        .mime_str("text/csv")
        .expect("mime");
    let form = reqwest::multipart::Form::new().part("file", part);
    client
        .post(format!("{}/providers/{}/import", BASE_URL, provider_id))
        .multipart(form)
        .send()
        .await
        .expect("Failed to upload")
}

fn unique(name: &str) -> String {
    format!("{}-{}", name, std::process::id())
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_import_without_template_is_rejected() {
    let client = Client::new();
    let provider = create_provider(&client, &unique("no-template")).await;
    let provider_id = provider["id"].as_i64().unwrap();

    let response = upload_csv(&client, provider_id, "EAN;Libelle\n123;Widget\n").await;
    assert_eq!(response.status(), 422);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "NoMappingTemplate");
}

#[tokio::test]
#[ignore]
async fn test_import_creates_and_dedupes() {
    let client = Client::new();
    let provider = create_provider(&client, &unique("dedup")).await;
    let provider_id = provider["id"].as_i64().unwrap();
    let template = create_template(&client, provider_id).await;
    attach_template(&client, provider_id, template["id"].as_i64().unwrap()).await;

    let csv = "EAN;Libelle;Marque;Prix\n\
               4002888000011;Cable HDMI;LINDY;12,50\n\
               4002888000011;Cable HDMI;LINDY;12,50\n";
    let response = upload_csv(&client, provider_id, csv).await;
    assert!(response.status().is_success());

    let summary: Value = response.json().await.expect("Failed to parse summary");
    assert_eq!(summary["total_rows"], 2);
    // Two byte-identical rows: one catalog write, one deduped classification
    assert_eq!(summary["created"].as_i64().unwrap() + summary["updated"].as_i64().unwrap(), 1);
    assert_eq!(summary["deduped"], 1);
}

#[tokio::test]
#[ignore]
async fn test_run_lifecycle_is_monotonic() {
    let client = Client::new();
    let provider = create_provider(&client, &unique("lifecycle")).await;
    let provider_id = provider["id"].as_i64().unwrap();
    let template = create_template(&client, provider_id).await;
    attach_template(&client, provider_id, template["id"].as_i64().unwrap()).await;

    // Queue then execute: status must end in ok or failed, never pending
    let response = client
        .post(format!("{}/providers/{}/run-now", BASE_URL, provider_id))
        .send()
        .await
        .expect("Failed to run");
    assert!(response.status().is_success());
    let run: Value = response.json().await.expect("Failed to parse run");
    let status = run["status"].as_str().unwrap();
    assert!(status == "ok" || status == "failed", "unexpected status {}", status);

    // A finished run cannot be stopped, only reset
    let run_id = run["id"].as_i64().unwrap();
    let stop = client
        .post(format!("{}/runs/{}/stop", BASE_URL, run_id))
        .send()
        .await
        .expect("Failed to send stop");
    assert_eq!(stop.status(), 422);

    let reset = client
        .post(format!("{}/runs/{}/reset", BASE_URL, run_id))
        .send()
        .await
        .expect("Failed to send reset");
    assert!(reset.status().is_success());
    let reset_run: Value = reset.json().await.expect("Failed to parse run");
    assert_eq!(reset_run["status"], "pending");
}

#[tokio::test]
#[ignore]
async fn test_cross_provider_brand_propagation() {
    let client = Client::new();
    let provider_x = create_provider(&client, &unique("brand-x")).await;
    let provider_y = create_provider(&client, &unique("brand-y")).await;
    let x_id = provider_x["id"].as_i64().unwrap();
    let y_id = provider_y["id"].as_i64().unwrap();
    for pid in [x_id, y_id] {
        let template = create_template(&client, pid).await;
        attach_template(&client, pid, template["id"].as_i64().unwrap()).await;
    }

    // Both providers ship the same unknown label
    let label = unique("LINDY");
    let csv = |ean: &str| format!("EAN;Libelle;Marque;Prix\n{};Cable;{};10,00\n", ean, label);
    assert!(upload_csv(&client, x_id, &csv("4002888000101")).await.status().is_success());
    assert!(upload_csv(&client, y_id, &csv("4002888000102")).await.status().is_success());

    // Create the canonical brand, then resolve provider X's pending entry
    let brand: Value = client
        .post(format!("{}/brands", BASE_URL))
        .json(&json!({ "name": unique("Lindy") }))
        .send()
        .await
        .expect("Failed to create brand")
        .json()
        .await
        .expect("Failed to parse brand");

    let pending: Vec<Value> = client
        .get(format!("{}/pending-brands?state=pending", BASE_URL))
        .send()
        .await
        .expect("Failed to list pending")
        .json()
        .await
        .expect("Failed to parse pending");
    let mine: Vec<&Value> = pending
        .iter()
        .filter(|p| p["raw_label"] == label.as_str())
        .collect();
    assert_eq!(mine.len(), 2, "expected one pending entry per provider");

    let first_id = mine[0]["id"].as_i64().unwrap();
    let report: Value = client
        .post(format!("{}/pending-brands/{}/resolve", BASE_URL, first_id))
        .json(&json!({ "brand_id": brand["id"] }))
        .send()
        .await
        .expect("Failed to resolve")
        .json()
        .await
        .expect("Failed to parse report");

    // The second provider's entry must transition without a second action
    assert_eq!(report["cross_provider_resolved"], 1);

    let remaining: Vec<Value> = client
        .get(format!("{}/pending-brands?state=pending", BASE_URL))
        .send()
        .await
        .expect("Failed to list pending")
        .json()
        .await
        .expect("Failed to parse pending");
    assert!(remaining.iter().all(|p| p["raw_label"] != label.as_str()));

    // Re-verify twice: the second pass must resolve nothing (idempotence)
    for expected_second in [false, true] {
        let report: Value = client
            .post(format!("{}/pending-brands/reverify", BASE_URL))
            .send()
            .await
            .expect("Failed to reverify")
            .json()
            .await
            .expect("Failed to parse report");
        if expected_second {
            assert_eq!(report["resolved"], 0);
        }
    }
}

#[tokio::test]
#[ignore]
async fn test_quarantine_purge_returns_count() {
    let client = Client::new();
    let response = client
        .post(format!("{}/staging/purge", BASE_URL))
        .json(&json!({ "confirm": true }))
        .send()
        .await
        .expect("Failed to purge");
    assert!(response.status().is_success());

    let result: Value = response.json().await.expect("Failed to parse purge result");
    assert!(result["deleted"].as_u64().is_some());
    assert!(result["batches"].as_u64().unwrap() >= 1);

    // Purging an already-empty quarantine deletes nothing
    let again: Value = client
        .post(format!("{}/staging/purge", BASE_URL))
        .json(&json!({ "confirm": true }))
        .send()
        .await
        .expect("Failed to purge")
        .json()
        .await
        .expect("Failed to parse purge result");
    assert_eq!(again["deleted"], 0);
}

#[tokio::test]
#[ignore]
async fn test_template_export_import_roundtrip() {
    let client = Client::new();
    let provider = create_provider(&client, &unique("tmpl")).await;
    let provider_id = provider["id"].as_i64().unwrap();
    let template = create_template(&client, provider_id).await;
    let template_id = template["id"].as_i64().unwrap();

    let exports: Vec<Value> = client
        .get(format!("{}/templates/export?ids={}", BASE_URL, template_id))
        .send()
        .await
        .expect("Failed to export")
        .json()
        .await
        .expect("Failed to parse export");
    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0]["lines"].as_array().unwrap().len(), 4);

    let response = client
        .post(format!("{}/templates/import", BASE_URL))
        .json(&exports)
        .send()
        .await
        .expect("Failed to import");
    assert_eq!(response.status(), 201);
    let created: Vec<i64> = response.json().await.expect("Failed to parse ids");
    assert_eq!(created.len(), 1);
}
