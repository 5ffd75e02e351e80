use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::routing::{get, post};
use axum::Router;
use folio_axum::middlewares::{collect_files, MultipartLimits};
use folio_axum::{axum, FolioAxumError};
use folio_core::{FolioConfig, FolioError};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn unprocessable() -> Result<&'static str, FolioAxumError> {
    Err(FolioError::unprocessable("Invalid")
        .with_errors(json!([{"file": "a.md", "message": "a.md: Missing top-level H1 title"}]))
        .into())
}

async fn boom() -> Result<&'static str, FolioAxumError> {
    Err(anyhow::anyhow!("connection refused to 10.0.0.5:9000 (secret=abc)").into())
}

async fn wrapped_not_found() -> Result<&'static str, FolioAxumError> {
    let err = FolioError::not_found("No record for 'x'").into_anyhow();
    Err(err.context("looking up photo").into())
}

async fn upload(headers: HeaderMap, body: Body) -> Result<axum::Json<Value>, FolioAxumError> {
    let limits = MultipartLimits::new().max_file_size(8).max_total_size(1024).max_files(2);
    let files = collect_files(&headers, body, &limits).await?;
    let names: Vec<_> = files.iter().map(|f| f.file_name.clone()).collect();
    let sizes: Vec<_> = files.iter().map(|f| f.data.len()).collect();
    Ok(axum::Json(json!({"names": names, "sizes": sizes})))
}

fn router() -> Router {
    let routes = Router::new()
        .route("/unprocessable", get(unprocessable))
        .route("/boom", get(boom))
        .route("/missing", get(wrapped_not_found))
        .route("/upload", post(upload));
    axum(FolioConfig::new().snapshot())
        .use_router("/", routes)
        .into_router()
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
    let boundary = "XBOUNDARYX";
    let mut body = Vec::new();
    for (name, file_name, data) in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        match file_name {
            Some(f) => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\nContent-Type: application/octet-stream\r\n\r\n").as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn unprocessable_preserves_422_and_shape() {
    let res = router()
        .oneshot(Request::builder().uri("/unprocessable").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 422);
    assert!(res.headers().get("x-request-id").is_some());
    let body = json_body(res).await;
    assert_eq!(body["name"], "Unprocessable");
    assert_eq!(body["code"], 422);
    assert_eq!(body["className"], "unprocessable");
    assert_eq!(body["errors"][0]["file"], "a.md");
}

#[tokio::test]
async fn unknown_errors_become_generic_500() {
    let res = router()
        .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 500);
    let body = json_body(res).await;
    assert_eq!(body["name"], "GeneralError");
    assert_eq!(body["message"], "Internal server error");
    let raw = body.to_string();
    assert!(!raw.contains("10.0.0.5"));
    assert!(!raw.contains("secret"));
}

#[tokio::test]
async fn folio_error_found_under_context() {
    let res = router()
        .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 404);
    let body = json_body(res).await;
    assert_eq!(body["className"], "not-found");
    assert_eq!(body["message"], "No record for 'x'");
}

#[tokio::test]
async fn request_id_is_preserved_when_provided() {
    let provided = HeaderValue::from_static("req-test-123");
    let res = router()
        .oneshot(
            Request::builder()
                .uri("/missing")
                .header("x-request-id", provided.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.headers().get("x-request-id").unwrap(), &provided);
}

#[tokio::test]
async fn multipart_collects_only_file_parts() {
    let req = multipart(&[
        ("caption", None, b"hello"),
        ("file", Some("a.png"), b"1234"),
        ("file", Some("b.png"), b"12345678"),
    ]);
    let res = router().oneshot(req).await.unwrap();

    assert_eq!(res.status().as_u16(), 200);
    let body = json_body(res).await;
    assert_eq!(body["names"], json!(["a.png", "b.png"]));
    assert_eq!(body["sizes"], json!([4, 8]));
}

#[tokio::test]
async fn multipart_oversized_file_is_413() {
    let req = multipart(&[("file", Some("big.png"), b"0123456789")]);
    let res = router().oneshot(req).await.unwrap();

    assert_eq!(res.status().as_u16(), 413);
    let body = json_body(res).await;
    assert_eq!(body["name"], "PayloadTooLarge");
}

#[tokio::test]
async fn multipart_too_many_files_is_400() {
    let req = multipart(&[
        ("file", Some("a.png"), b"1"),
        ("file", Some("b.png"), b"2"),
        ("file", Some("c.png"), b"3"),
    ]);
    let res = router().oneshot(req).await.unwrap();
    assert_eq!(res.status().as_u16(), 400);
}

#[tokio::test]
async fn non_multipart_request_is_400() {
    let res = router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 400);
    let body = json_body(res).await;
    assert_eq!(body["className"], "bad-request");
}

fn pinged(allow_any: bool) -> Router {
    let mut config = FolioConfig::new();
    config.set("cors.allow_any", allow_any.to_string());
    axum(config.snapshot())
        .service("/ping", || async { "pong" })
        .into_router()
}

#[tokio::test]
async fn cors_headers_follow_allow_any() {
    for allow_any in [false, true] {
        let res = pinged(allow_any)
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .header("origin", "https://portfolio.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), 200);

        let allow_origin = res.headers().get("access-control-allow-origin");
        if allow_any {
            assert_eq!(allow_origin.unwrap(), "*");
        } else {
            assert!(allow_origin.is_none());
        }
    }
}
