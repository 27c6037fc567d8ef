use catalog_api::{
    build_app,
    services::{
        catalog_service::CatalogService, image_urls::PublicBucketResolver,
        sqlite_store::SqliteProductStore,
    },
};
use chrono::{Duration, Utc};
use reqwest::StatusCode;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;

struct TestServer {
    base_url: String,
    store: SqliteProductStore,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("failed to open in-memory sqlite");
        let store = SqliteProductStore::new(Arc::new(pool));
        store.migrate().await.expect("migration failed");

        let service = CatalogService::new(
            Arc::new(store.clone()),
            Arc::new(
                PublicBucketResolver::new("https://proj.example.co", "product-images")
                    .expect("valid storage base URL"),
            ),
        );

        // Same router as prod, bound to an ephemeral port.
        let app = build_app(service);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            handle,
        }
    }

    async fn seed(&self, id: &str, name: &str, images: &[&str], age_hours: i64) {
        sqlx::query(
            "INSERT INTO products (id, name, description, price, images, user_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(name)
        .bind("seeded")
        .bind(12.5_f64)
        .bind(serde_json::to_string(images).unwrap())
        .bind("owner-1")
        .bind(Utc::now() - Duration::hours(age_hours))
        .execute(&*self.store.db)
        .await
        .unwrap();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn empty_store_lists_empty_array() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(format!("{}/products", srv.base_url))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "application/json");
    assert_eq!(res.text().await.unwrap(), "[]");
}

#[tokio::test]
async fn list_is_newest_first_with_resolved_urls() {
    let srv = TestServer::spawn().await;
    srv.seed("old", "Old", &["owner-1/1.png"], 48).await;
    srv.seed("new", "New", &["owner-1/2.png", "owner-1/3.png"], 1).await;

    let body: Value = reqwest::get(format!("{}/products", srv.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], "new");
    assert_eq!(
        items[0]["images"],
        serde_json::json!([
            "https://proj.example.co/storage/v1/object/public/product-images/owner-1/2.png",
            "https://proj.example.co/storage/v1/object/public/product-images/owner-1/3.png"
        ])
    );
    assert_eq!(items[1]["user_id"], "owner-1");
}

#[tokio::test]
async fn single_product_and_not_found() {
    let srv = TestServer::spawn().await;
    srv.seed("p1", "Lamp", &[], 0).await;

    let client = reqwest::Client::new();
    let found = client
        .get(format!("{}/products?id=p1", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(found.status(), StatusCode::OK);
    let product: Value = found.json().await.unwrap();
    assert_eq!(product["name"], "Lamp");
    assert_eq!(product["price"], 12.5);

    let missing = client
        .get(format!("{}/products?id=X", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(missing.text().await.unwrap(), r#"{"error":"Product not found"}"#);
}

#[tokio::test]
async fn repeated_single_reads_are_byte_identical() {
    let srv = TestServer::spawn().await;
    srv.seed("p1", "Lamp", &["a/b.png"], 0).await;

    let url = format!("{}/products?id=p1", srv.base_url);
    let first = reqwest::get(&url).await.unwrap().bytes().await.unwrap();
    let second = reqwest::get(&url).await.unwrap().bytes().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn conventional_adapter_rejects_non_get_without_cors() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for method in [reqwest::Method::POST, reqwest::Method::OPTIONS] {
        let res = client
            .request(method, format!("{}/products", srv.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(res.headers().get("access-control-allow-origin").is_none());
        assert_eq!(res.text().await.unwrap(), r#"{"error":"Method not allowed"}"#);
    }
}

#[tokio::test]
async fn function_endpoint_answers_preflight_with_cors() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .request(
            reqwest::Method::OPTIONS,
            format!("{}/.netlify/functions/products", srv.base_url),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert_eq!(res.headers()["access-control-allow-headers"], "Content-Type");
    assert_eq!(res.headers()["access-control-allow-methods"], "GET, OPTIONS");
    assert!(res.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn function_endpoint_serves_products_with_cors() {
    let srv = TestServer::spawn().await;
    srv.seed("p1", "Lamp", &[], 0).await;

    let res = reqwest::get(format!("{}/.netlify/functions/products?id=p1", srv.base_url))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    let product: Value = res.json().await.unwrap();
    assert_eq!(product["id"], "p1");

    let post = reqwest::Client::new()
        .post(format!("{}/.netlify/functions/products", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(post.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(post.headers()["access-control-allow-methods"], "GET, OPTIONS");
}

#[tokio::test]
async fn search_returns_page_and_total() {
    let srv = TestServer::spawn().await;
    srv.seed("1", "Oak chair", &[], 3).await;
    srv.seed("2", "Pine chair", &[], 2).await;
    srv.seed("3", "Oak table", &[], 1).await;

    let body: Value = reqwest::get(format!(
        "{}/products/search?q=chair&page_size=1&sort=created_at&order=asc",
        srv.base_url
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(body["total"], 2);
    assert_eq!(body["data"][0]["id"], "1");

    let bad = reqwest::get(format!("{}/products/search?order=sideways", srv.base_url))
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

    let function: Value = reqwest::get(format!(
        "{}/.netlify/functions/products/search?q=table",
        srv.base_url
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(function["total"], 1);
}

#[tokio::test]
async fn list_route_keeps_array_shape_with_extra_parameters() {
    let srv = TestServer::spawn().await;
    srv.seed("1", "Oak chair", &[], 2).await;
    srv.seed("2", "Oak table", &[], 1).await;

    for query in ["page=0&sort=foo", "q=chair", "order=sideways&page_size=1"] {
        let res = reqwest::get(format!("{}/products?{}", srv.base_url, query))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "query {query}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body.as_array().map(Vec::len), Some(2), "query {query}");
    }
}

#[tokio::test]
async fn image_paths_with_reserved_characters_are_encoded() {
    let srv = TestServer::spawn().await;
    srv.seed("p1", "Lamp", &["owner 1/front#1.png"], 0).await;

    let product: Value = reqwest::get(format!("{}/products?id=p1", srv.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        product["images"][0],
        "https://proj.example.co/storage/v1/object/public/product-images/owner%201/front%231.png"
    );
}

#[tokio::test]
async fn health_and_readiness_report_ok() {
    let srv = TestServer::spawn().await;

    let health = reqwest::get(format!("{}/healthz", srv.base_url)).await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let ready = reqwest::get(format!("{}/readyz", srv.base_url)).await.unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
    let body: Value = ready.json().await.unwrap();
    assert_eq!(body["checks"]["store"]["ok"], true);
}
