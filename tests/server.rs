use std::io::Cursor;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use image::{ImageFormat, Rgb, RgbImage};
use rstest::*;
use serde_json::{Value, json};
use tower::ServiceExt;

use imcatalog::config::QueryOptions;
use imcatalog::query::{MAX_UPLOAD_SIZE, Searcher};
use imcatalog::server::{AppState, create_app};
use imcatalog::store::{IMAGE_CLASS, MemoryStore};

const BOUNDARY: &str = "imcatalog-test-boundary";

fn catalog_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    for (title, image) in [
        ("Slim Fit Blue Jeans", "AAEC"),
        ("Skinny Black Jeans", "AwQF"),
        ("Relaxed Jeans", "BgcI"),
        ("Ripped Jeans", "CQoL"),
        ("Cotton Shirt", "DA0O"),
    ] {
        store.insert(title, image);
    }
    Arc::new(store)
}

fn app(store: Arc<MemoryStore>) -> Router {
    let searcher = Searcher::new(store, IMAGE_CLASS, &QueryOptions::default());
    create_app(AppState::new(searcher))
}

fn jpeg_bytes() -> Vec<u8> {
    let img = RgbImage::from_fn(64, 48, |x, y| Rgb([(x * 4) as u8, (y * 5) as u8, 128]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
    buf.into_inner()
}

/// 构造 multipart 表单，`file` 为 (文件名, MIME 类型, 内容)
fn multipart(file: Option<(&str, &str, &[u8])>, limit: Option<&str>) -> Request<Body> {
    let mut body = Vec::new();
    if let Some((name, mime, data)) = file {
        let head = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"image\"; filename=\"{name}\"\r\n\
             Content-Type: {mime}\r\n\r\n"
        );
        body.extend_from_slice(head.as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(limit) = limit {
        let field = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"limit\"\r\n\r\n\
             {limit}\r\n"
        );
        body.extend_from_slice(field.as_bytes());
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/search/image")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap()
}

fn json_request(body: impl Into<String>) -> Request<Body> {
    Request::post("/search/text")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.into()))
        .unwrap()
}

async fn send(app: Router, req: Request<Body>) -> Result<(StatusCode, Value)> {
    let resp = app.oneshot(req).await?;
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&body)?))
}

#[tokio::test]
async fn text_search_returns_limited_results() -> Result<()> {
    let req = json_request(json!({"query": "jeans", "limit": 3}).to_string());
    let (status, body) = send(app(catalog_store()), req).await?;

    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    for r in results {
        assert!(!r["title"].as_str().unwrap().is_empty());
        assert!(!r["image"].as_str().unwrap().is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn text_search_with_no_match_is_empty() -> Result<()> {
    let req = json_request(r#"{"query": "sandals"}"#);
    let (status, body) = send(app(catalog_store()), req).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"results": []}));
    Ok(())
}

#[rstest]
#[case::missing_query(r#"{"limit": 3}"#)]
#[case::empty_query(r#"{"query": ""}"#)]
#[case::zero_limit(r#"{"query": "jeans", "limit": 0}"#)]
#[case::negative_limit(r#"{"query": "jeans", "limit": -1}"#)]
#[case::string_limit(r#"{"query": "jeans", "limit": "3"}"#)]
#[case::malformed(r#"{"query": "jeans""#)]
#[tokio::test]
async fn text_search_rejects_invalid_body(#[case] body: &str) -> Result<()> {
    let store = catalog_store();
    let (status, body) = send(app(store.clone()), json_request(body)).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid data"}));
    assert_eq!(store.query_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn image_search_reports_total() -> Result<()> {
    let jpeg = jpeg_bytes();
    let req = multipart(Some(("query.jpg", "image/jpeg", &jpeg)), Some("2"));
    let (status, body) = send(app(catalog_store()), req).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 2);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    Ok(())
}

#[tokio::test]
async fn image_search_defaults_to_ten() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    for i in 0..15 {
        store.insert(format!("Product {i}"), "AA==");
    }
    let jpeg = jpeg_bytes();
    let req = multipart(Some(("query.jpg", "image/jpeg", &jpeg)), None);
    let (status, body) = send(app(store), req).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 10);
    Ok(())
}

#[tokio::test]
async fn non_image_upload_is_rejected() -> Result<()> {
    let store = catalog_store();
    let req = multipart(Some(("notes.txt", "text/plain", b"hello")), None);
    let (status, body) = send(app(store.clone()), req).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Only image files are allowed"}));
    assert_eq!(store.query_calls(), 0);
    Ok(())
}

#[rstest]
#[case::over_field_limit(MAX_UPLOAD_SIZE + MAX_UPLOAD_SIZE / 20, true)]
#[case::over_body_limit(12 * 1024 * 1024, true)]
#[case::over_body_limit_chunked(12 * 1024 * 1024, false)]
#[tokio::test]
async fn oversized_upload_is_rejected(
    #[case] size: usize,
    #[case] with_length: bool,
) -> Result<()> {
    let store = catalog_store();
    let data = vec![0xffu8; size];
    let mut req = multipart(Some(("huge.jpg", "image/jpeg", &data)), None);
    if !with_length {
        req.headers_mut().remove(header::CONTENT_LENGTH);
    }
    let (status, body) = send(app(store.clone()), req).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Image file too large"}));
    assert_eq!(store.query_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn upload_under_size_limit_reaches_decoder() -> Result<()> {
    let store = catalog_store();
    let data = vec![0xffu8; MAX_UPLOAD_SIZE - 1024];
    let req = multipart(Some(("edge.jpg", "image/jpeg", &data)), None);
    let (status, body) = send(app(store.clone()), req).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid image"}));
    assert_eq!(store.query_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn missing_image_is_rejected() -> Result<()> {
    let store = catalog_store();
    let (status, body) = send(app(store.clone()), multipart(None, Some("3"))).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Image file is required"}));
    assert_eq!(store.query_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn corrupt_image_is_rejected() -> Result<()> {
    let store = catalog_store();
    let req = multipart(Some(("query.jpg", "image/jpeg", b"\xff\xd8garbage")), None);
    let (status, body) = send(app(store.clone()), req).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid image"}));
    assert_eq!(store.query_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn store_failure_is_opaque() -> Result<()> {
    let store = Arc::new(MemoryStore::new().fail_queries());
    let (status, body) = send(app(store), json_request(r#"{"query": "jeans"}"#)).await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal server error"}));
    Ok(())
}

#[tokio::test]
async fn unknown_route_is_not_found() -> Result<()> {
    let req = Request::get("/search/video").body(Body::empty())?;
    let (status, body) = send(app(catalog_store()), req).await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Endpoint not found"}));
    Ok(())
}

#[tokio::test]
async fn openapi_document_lists_routes() -> Result<()> {
    let req = Request::get("/api-docs/openapi.json").body(Body::empty())?;
    let (status, body) = send(app(catalog_store()), req).await?;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/search/text"].is_object());
    assert!(body["paths"]["/search/image"].is_object());
    Ok(())
}
