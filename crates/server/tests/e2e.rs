use std::net::SocketAddr;
use std::sync::Arc;

use configs::{AppConfig, StorageKind};
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::StatusCode as HttpStatusCode;
use serde_json::{json, Value};
use service::taxonomy::repo::MemoryTaxonomyStore;
use tokio::net::TcpListener;

use server::routes::auth::Claims;
use server::startup::build_app;

struct TestApp {
    base_url: String,
    token: String,
}

impl TestApp {
    fn url(&self, path: &str) -> String { format!("{}{}", self.base_url, path) }
}

async fn start_server() -> anyhow::Result<TestApp> {
    let mut cfg = AppConfig::default();
    cfg.auth.jwt_secret = "e2e-secret".into();
    cfg.taxonomy.storage = StorageKind::Memory;
    cfg.server.request_timeout_secs = 10;

    let app = build_app(Arc::new(MemoryTaxonomyStore::new()), &cfg);
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await { eprintln!("server error: {}", e); }
    });

    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims { sub: "e2e".into(), exp: now + 600, iat: Some(now) };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"e2e-secret"))?;
    Ok(TestApp { base_url, token })
}

fn en(name: &str) -> Value { json!([{ "languageCode": "en", "name": name }]) }

fn ids(list: &Value, key: &str) -> Vec<String> {
    list[key]
        .as_array()
        .map(|a| a.iter().filter_map(|v| v["id"].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn e2e_public_health() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = reqwest::get(app.url("/health")).await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["status"], "ok");

    let docs = reqwest::get(app.url("/api-docs/openapi.json")).await?;
    assert_eq!(docs.status(), HttpStatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn e2e_cluster_bulk_sync_flow() -> anyhow::Result<()> {
    let app = start_server().await?;
    let client = reqwest::Client::new();

    let tech: Value = client
        .post(app.url("/clusters"))
        .bearer_auth(&app.token)
        .json(&json!({ "icon": "cpu", "translations": en("Tech") }))
        .send()
        .await?
        .json()
        .await?;
    let tech_id = tech["id"].as_str().unwrap_or_default().to_string();

    // create two categories and let the server place them
    let res = client
        .put(app.url(&format!("/clusters/{tech_id}/categories/bulk")))
        .bearer_auth(&app.token)
        .json(&json!({ "categories": [
            { "translations": en("Frontend") },
            { "translations": en("Backend") }
        ]}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let synced: Value = res.json().await?;
    let frontend = synced[0]["id"].as_str().unwrap_or_default().to_string();
    let backend = synced[1]["id"].as_str().unwrap_or_default().to_string();

    // the tree carries the stamp to send back
    let tree: Value = client.get(app.url("/clusters")).send().await?.json().await?;
    let version = tree["clusters"][0]["categoriesVersion"].as_u64().unwrap_or_default();
    assert_eq!(ids(&tree["clusters"][0], "categories"), vec![frontend.clone(), backend.clone()]);

    // reorder and soft-delete Frontend in one call
    let res = client
        .put(app.url(&format!("/clusters/{tech_id}/categories/bulk")))
        .bearer_auth(&app.token)
        .json(&json!({
            "categories": [{ "id": backend, "orderInCluster": 0, "translations": en("Backend") }],
            "removeCategoryIds": [frontend],
            "expectedVersion": version
        }))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);

    // replaying the same stamp is stale now
    let res = client
        .put(app.url(&format!("/clusters/{tech_id}/categories/bulk")))
        .bearer_auth(&app.token)
        .json(&json!({ "categories": [], "expectedVersion": version }))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CONFLICT);

    let deleted: Value = client
        .get(app.url("/categories/deleted"))
        .bearer_auth(&app.token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(deleted[0]["id"].as_str(), Some(frontend.as_str()));

    let res = client.delete(app.url(&format!("/clusters/{tech_id}"))).bearer_auth(&app.token).send().await?;
    assert_eq!(res.status(), HttpStatusCode::NO_CONTENT);
    let res = client.get(app.url(&format!("/categories/{backend}"))).send().await?;
    let orphan: Value = res.json().await?;
    assert_eq!(orphan["clusterId"], Value::Null);
    Ok(())
}
