mod categories;
mod config;
mod error;
mod index;
mod links;
mod paths;
mod upload;

use axum::{
    body::Body,
    extract::{multipart::Field, DefaultBodyLimit, Multipart, Path as UrlPath, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use categories::Category;
use config::Settings;
use error::{CatalogError, CatalogResult};
use index::MediaRecord;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
struct AppState {
    settings: Arc<Settings>,
    pool: SqlitePool,
}

#[derive(Debug, Deserialize)]
struct MediaQuery {
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadQuery {
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeleteQuery {
    path: String,
}

#[derive(Debug, Deserialize)]
struct CreateCategoryRequest {
    name: String,
}

#[derive(Debug, Deserialize)]
struct UpdateCategoryRequest {
    name: Option<String>,
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddLinkRequest {
    url: String,
    name: Option<String>,
    category: Option<String>,
}

#[derive(Debug, Serialize)]
struct UploadOutcome {
    name: String,
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<Category>,
    results: Vec<UploadOutcome>,
}

#[derive(Debug, Serialize)]
struct DeletionOutcome {
    path: String,
    status: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct BatchDeleteResponse {
    results: Vec<DeletionOutcome>,
}

#[derive(Debug, Serialize)]
struct DeleteResponse {
    message: &'static str,
    path: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "media_gallery=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;

    let options = SqliteConnectOptions::new()
        .filename(settings.db_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;
    links::init_db(&pool).await?;

    if settings.upload_token.is_none() {
        warn!("UPLOAD_TOKEN is not set; uploads and deletions are disabled");
    }

    let addr = settings.addr.clone();
    let state = AppState {
        settings: Arc::new(settings),
        pool,
    };
    let app = app(state);

    info!("Media gallery listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn app(state: AppState) -> Router {
    // Multipart bodies carry framing overhead on top of the file payload.
    let body_limit = state.settings.max_upload_bytes as usize + 1024 * 1024;

    let api = Router::new()
        .route(
            "/media",
            get(list_media).post(upload_media).delete(delete_media),
        )
        .route("/media/batch", delete(delete_media_batch))
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/*name",
            patch(update_category).delete(delete_category),
        )
        .route("/links", post(add_link))
        .route("/health", get(health));

    Router::new()
        .nest("/api", api)
        .route("/media/*path", get(serve_media))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

fn require_token(settings: &Settings, headers: &HeaderMap) -> CatalogResult<()> {
    let expected = settings
        .upload_token
        .as_deref()
        .ok_or(CatalogError::TokenNotConfigured)?;
    let supplied = headers
        .get("x-upload-token")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if supplied != expected {
        return Err(CatalogError::Unauthorized);
    }
    Ok(())
}

async fn list_media(
    State(state): State<AppState>,
    Query(query): Query<MediaQuery>,
) -> CatalogResult<Json<Vec<MediaRecord>>> {
    let mut records =
        index::list(&state.settings, &state.pool, query.category.as_deref()).await?;
    records.sort_by(|a, b| b.modified.cmp(&a.modified).then(a.path.cmp(&b.path)));
    Ok(Json(records))
}

async fn serve_media(
    State(state): State<AppState>,
    UrlPath(path): UrlPath<String>,
) -> CatalogResult<Response> {
    let full = paths::resolve_existing_file(&state.settings, &path).await?;
    let file = tokio::fs::File::open(&full)
        .await
        .map_err(|_| CatalogError::NotFound(path.clone()))?;
    let stream = ReaderStream::new(file);

    let mut response = Response::new(Body::from_stream(stream));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_str(
            mime_guess::from_path(&full).first_or_octet_stream().as_ref(),
        )
        .unwrap_or_else(|_| header::HeaderValue::from_static("application/octet-stream")),
    );
    Ok(response)
}

async fn upload_media(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> CatalogResult<Response> {
    require_token(&state.settings, &headers)?;

    let mut category_rel = match query.category.as_deref() {
        Some(raw) => Some(paths::sanitize_relative(raw)?),
        None => None,
    };
    let mut target_dir = None;
    let mut results = Vec::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| CatalogError::BadRequest(err.to_string()))?
    {
        if field.file_name().is_none() {
            // A `category` form field is honored only ahead of the files
            // it applies to.
            if field.name() == Some("category") && results.is_empty() && target_dir.is_none() {
                let raw = field
                    .text()
                    .await
                    .map_err(|err| CatalogError::BadRequest(err.to_string()))?;
                category_rel = Some(paths::sanitize_relative(&raw)?);
            }
            continue;
        }

        let raw_name = field.file_name().unwrap_or_default().to_string();

        // The category directory appears with the first file, creating the
        // category implicitly if it did not exist yet.
        if target_dir.is_none() {
            let rel = category_rel.clone().unwrap_or_default();
            let dir = paths::resolve_target(&state.settings, &rel);
            tokio::fs::create_dir_all(&dir).await?;
            target_dir = Some((dir, rel));
        }
        let Some((dir, rel)) = target_dir.as_ref() else {
            continue;
        };

        match store_field(&state.settings, dir, rel, &raw_name, &mut field).await {
            Ok(stored_path) => results.push(UploadOutcome {
                name: raw_name,
                status: "success",
                message: "Uploaded".to_string(),
                path: Some(stored_path),
            }),
            Err(err) => results.push(UploadOutcome {
                name: raw_name,
                status: "error",
                message: err.to_string(),
                path: None,
            }),
        }
    }

    if results.is_empty() {
        return Err(CatalogError::BadRequest("No files provided".to_string()));
    }

    let has_success = results.iter().any(|outcome| outcome.status == "success");
    let status = if has_success && results.iter().all(|outcome| outcome.status == "success") {
        StatusCode::CREATED
    } else {
        StatusCode::MULTI_STATUS
    };

    let category = category_rel
        .filter(|rel| !rel.as_os_str().is_empty())
        .map(|rel| Category {
            name: rel
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default(),
            path: paths::rel_to_string(&rel),
        });

    let body = UploadResponse {
        message: if has_success { "Uploaded" } else { "Upload failed" },
        category,
        results,
    };
    Ok((status, Json(body)).into_response())
}

async fn store_field(
    settings: &Settings,
    dir: &Path,
    rel_dir: &Path,
    raw_name: &str,
    field: &mut Field<'_>,
) -> CatalogResult<String> {
    let safe_name = upload::sanitize_file_name(raw_name)?;
    if !settings.is_allowed_file(&safe_name) {
        return Err(CatalogError::DisallowedExtension(safe_name));
    }

    let mut scratch = upload::open_scratch(dir, &safe_name).await?;
    let mut total = 0u64;
    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(err) => {
                upload::discard_scratch(&mut scratch).await;
                return Err(CatalogError::BadRequest(err.to_string()));
            }
        };
        total += chunk.len() as u64;
        if total > settings.max_upload_bytes {
            upload::discard_scratch(&mut scratch).await;
            return Err(CatalogError::TooLarge(settings.max_upload_bytes));
        }
        if let Err(err) = scratch.file.write_all(&chunk).await {
            upload::discard_scratch(&mut scratch).await;
            return Err(err.into());
        }
    }
    if let Err(err) = scratch.file.flush().await {
        upload::discard_scratch(&mut scratch).await;
        return Err(err.into());
    }

    let stored = upload::commit_scratch(dir, &scratch.path, &safe_name).await?;
    info!("stored {stored} ({total} bytes) in {:?}", rel_dir);
    Ok(paths::rel_to_string(&rel_dir.join(stored)))
}

async fn delete_media(
    State(state): State<AppState>,
    Query(query): Query<DeleteQuery>,
    headers: HeaderMap,
) -> CatalogResult<Json<DeleteResponse>> {
    require_token(&state.settings, &headers)?;

    let removed = delete_one(&state, &query.path).await?;
    Ok(Json(DeleteResponse {
        message: "Deleted",
        path: removed,
    }))
}

async fn delete_media_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(paths): Json<Vec<String>>,
) -> CatalogResult<Response> {
    require_token(&state.settings, &headers)?;
    if paths.is_empty() {
        return Err(CatalogError::BadRequest(
            "Provide at least one path to delete".to_string(),
        ));
    }

    let mut results = Vec::new();
    let mut error_statuses = Vec::new();
    for raw in paths {
        match delete_one(&state, &raw).await {
            Ok(removed) => results.push(DeletionOutcome {
                path: removed,
                status: "success",
                message: "Deleted".to_string(),
            }),
            Err(err) => {
                error_statuses.push(err.status());
                results.push(DeletionOutcome {
                    path: raw,
                    status: "error",
                    message: err.to_string(),
                });
            }
        }
    }

    let has_success = results.iter().any(|outcome| outcome.status == "success");
    let status = if error_statuses.is_empty() {
        StatusCode::OK
    } else if has_success {
        StatusCode::MULTI_STATUS
    } else if error_statuses
        .iter()
        .all(|status| *status == StatusCode::NOT_FOUND)
    {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::BAD_REQUEST
    };

    Ok((status, Json(BatchDeleteResponse { results })).into_response())
}

/// Removes one media entry: link-backed entries leave the registry,
/// file-backed entries leave the disk. Shared by the single and batch
/// deletion routes.
async fn delete_one(state: &AppState, raw: &str) -> CatalogResult<String> {
    if let Some(id) = links::parse_link_path(raw) {
        if links::remove_link(&state.pool, id).await? {
            return Ok(raw.to_string());
        }
        return Err(CatalogError::NotFound(raw.to_string()));
    }

    let full = paths::resolve_existing_file(&state.settings, raw).await?;
    tokio::fs::remove_file(&full).await?;
    let rel = full
        .strip_prefix(&state.settings.media_root_canon)
        .unwrap_or(&full);
    Ok(paths::rel_to_string(rel))
}

async fn list_categories(State(state): State<AppState>) -> CatalogResult<Json<Vec<Category>>> {
    let categories = categories::list(&state.settings).await?;
    Ok(Json(categories))
}

async fn create_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateCategoryRequest>,
) -> CatalogResult<Response> {
    require_token(&state.settings, &headers)?;
    let category = categories::create(&state.settings, &payload.name).await?;
    info!("created category {}", category.path);
    Ok((StatusCode::CREATED, Json(category)).into_response())
}

async fn update_category(
    State(state): State<AppState>,
    UrlPath(name): UrlPath<String>,
    headers: HeaderMap,
    Json(payload): Json<UpdateCategoryRequest>,
) -> CatalogResult<Json<Category>> {
    require_token(&state.settings, &headers)?;
    let category = categories::rename(
        &state.settings,
        &name,
        payload.name.as_deref(),
        payload.path.as_deref(),
    )
    .await?;
    info!("renamed category {name} -> {}", category.path);
    Ok(Json(category))
}

/// Destructive: removes the category directory and every media item
/// inside it.
async fn delete_category(
    State(state): State<AppState>,
    UrlPath(name): UrlPath<String>,
    headers: HeaderMap,
) -> CatalogResult<Json<Category>> {
    require_token(&state.settings, &headers)?;
    let category = categories::delete(&state.settings, &name).await?;
    info!("deleted category {} and its contents", category.path);
    Ok(Json(category))
}

async fn add_link(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AddLinkRequest>,
) -> CatalogResult<Response> {
    require_token(&state.settings, &headers)?;
    let link = links::add_link(
        &state.pool,
        &payload.url,
        payload.name.as_deref(),
        payload.category.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(MediaRecord::from_link(&link))).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    const TOKEN: &str = "secret";

    async fn test_state() -> (TempDir, AppState) {
        let dir = tempdir().unwrap();
        let settings = config::test_settings(dir.path());
        let pool = links::test_pool().await;
        (
            dir,
            AppState {
                settings: Arc::new(settings),
                pool,
            },
        )
    }

    fn multipart_body(parts: &[(&str, &str, &str)]) -> (String, Vec<u8>) {
        let boundary = "catalog-test-boundary";
        let mut body = Vec::new();
        for (name, filename, data) in parts {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            if filename.is_empty() {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            } else {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
            }
            body.extend_from_slice(data.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={boundary}"), body)
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn request(method: &str, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
        let mut builder = axum::http::Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("x-upload-token", token);
        }
        builder
    }

    #[tokio::test]
    async fn upload_without_token_changes_nothing() {
        let (dir, state) = test_state().await;
        let (content_type, body) = multipart_body(&[("files", "a.jpg", "bytes")]);

        let response = app(state)
            .oneshot(
                request("POST", "/api/media", None)
                    .header("content-type", content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn mixed_upload_batch_reports_per_file_outcomes() {
        let (dir, state) = test_state().await;
        let (content_type, body) =
            multipart_body(&[("files", "a.jpg", "hello"), ("files", "b.exe", "nope")]);

        let response = app(state.clone())
            .oneshot(
                request("POST", "/api/media", Some(TOKEN))
                    .header("content-type", content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::MULTI_STATUS);
        let body = json_body(response).await;
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["name"], "a.jpg");
        assert_eq!(results[0]["status"], "success");
        assert_eq!(results[1]["name"], "b.exe");
        assert_eq!(results[1]["status"], "error");
        assert_eq!(std::fs::read(dir.path().join("a.jpg")).unwrap(), b"hello");
        assert!(!dir.path().join("b.exe").exists());

        let response = app(state)
            .oneshot(
                request("GET", "/api/media", None)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let listing = json_body(response).await;
        let paths: Vec<_> = listing
            .as_array()
            .unwrap()
            .iter()
            .map(|record| record["path"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(paths, ["a.jpg"]);
    }

    #[tokio::test]
    async fn upload_into_a_new_category_creates_it() {
        let (dir, state) = test_state().await;
        let (content_type, body) = multipart_body(&[
            ("category", "", "trips"),
            ("files", "beach.jpg", "sand"),
        ]);

        let response = app(state.clone())
            .oneshot(
                request("POST", "/api/media", Some(TOKEN))
                    .header("content-type", content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["results"][0]["path"], "trips/beach.jpg");
        assert!(dir.path().join("trips/beach.jpg").is_file());

        let response = app(state)
            .oneshot(
                request("GET", "/api/categories", None)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let listing = json_body(response).await;
        let paths: Vec<_> = listing
            .as_array()
            .unwrap()
            .iter()
            .map(|category| category["path"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(paths, ["", "trips"]);
    }

    #[tokio::test]
    async fn colliding_upload_names_get_distinct_files() {
        let (dir, state) = test_state().await;
        std::fs::write(dir.path().join("a.jpg"), b"first").unwrap();

        let (content_type, body) = multipart_body(&[("files", "a.jpg", "second")]);
        let response = app(state)
            .oneshot(
                request("POST", "/api/media", Some(TOKEN))
                    .header("content-type", content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["results"][0]["path"], "a_1.jpg");
        assert_eq!(std::fs::read(dir.path().join("a.jpg")).unwrap(), b"first");
        assert_eq!(std::fs::read(dir.path().join("a_1.jpg")).unwrap(), b"second");
    }

    #[tokio::test]
    async fn batch_delete_distinguishes_partial_success() {
        let (dir, state) = test_state().await;
        std::fs::write(dir.path().join("a.jpg"), b"x").unwrap();

        let response = app(state.clone())
            .oneshot(
                request("DELETE", "/api/media/batch", Some(TOKEN))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"["a.jpg", "missing.jpg"]"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::MULTI_STATUS);
        let body = json_body(response).await;
        let results = body["results"].as_array().unwrap();
        assert_eq!(results[0]["status"], "success");
        assert_eq!(results[1]["status"], "error");
        assert!(!dir.path().join("a.jpg").exists());

        let response = app(state)
            .oneshot(
                request("DELETE", "/api/media/batch", Some(TOKEN))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"["gone.jpg", "also-gone.jpg"]"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn single_delete_handles_missing_and_traversal_paths() {
        let (_dir, state) = test_state().await;

        let response = app(state.clone())
            .oneshot(
                request("DELETE", "/api/media?path=gone.jpg", Some(TOKEN))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app(state)
            .oneshot(
                request("DELETE", "/api/media?path=../escape.jpg", Some(TOKEN))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn category_rename_re_categorizes_media() {
        let (dir, state) = test_state().await;
        std::fs::create_dir(dir.path().join("trips")).unwrap();
        std::fs::write(dir.path().join("trips/beach.jpg"), b"x").unwrap();

        let response = app(state.clone())
            .oneshot(
                request("PATCH", "/api/categories/trips", Some(TOKEN))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"path": "travel"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(state)
            .oneshot(
                request("GET", "/api/media", None)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let listing = json_body(response).await;
        let records = listing.as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["path"], "travel/beach.jpg");
        assert_eq!(records[0]["category_path"], "travel");
    }

    #[tokio::test]
    async fn category_delete_removes_contained_media_from_listings() {
        let (dir, state) = test_state().await;
        std::fs::create_dir(dir.path().join("trips")).unwrap();
        std::fs::write(dir.path().join("trips/beach.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("keep.jpg"), b"x").unwrap();

        let response = app(state.clone())
            .oneshot(
                request("DELETE", "/api/categories/trips", Some(TOKEN))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(state)
            .oneshot(
                request("GET", "/api/media", None)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let listing = json_body(response).await;
        let paths: Vec<_> = listing
            .as_array()
            .unwrap()
            .iter()
            .map(|record| record["path"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(paths, ["keep.jpg"]);
    }

    #[tokio::test]
    async fn category_mutations_require_the_token() {
        let (_dir, state) = test_state().await;

        let response = app(state)
            .oneshot(
                request("POST", "/api/categories", None)
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name": "trips"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_category_conflicts_on_existing_directory() {
        let (dir, state) = test_state().await;
        std::fs::create_dir(dir.path().join("trips")).unwrap();

        let response = app(state)
            .oneshot(
                request("POST", "/api/categories", Some(TOKEN))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name": "trips"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn insecure_links_are_rejected() {
        let (_dir, state) = test_state().await;

        let response = app(state.clone())
            .oneshot(
                request("POST", "/api/links", Some(TOKEN))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"url": "http://example.com"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app(state)
            .oneshot(
                request("GET", "/api/media", None)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(json_body(response).await.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn links_list_and_delete_as_media() {
        let (_dir, state) = test_state().await;

        let response = app(state.clone())
            .oneshot(
                request("POST", "/api/links", Some(TOKEN))
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"url": "https://example.com/v", "name": "Video", "category": "trips"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = json_body(response).await;
        assert_eq!(created["source"], "link");
        let link_path = created["path"].as_str().unwrap().to_string();

        let response = app(state.clone())
            .oneshot(
                request("DELETE", &format!("/api/media?path={link_path}"), Some(TOKEN))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(state)
            .oneshot(
                request("GET", "/api/media", None)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(json_body(response).await.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn serve_media_streams_bytes_with_content_type() {
        let (dir, state) = test_state().await;
        std::fs::write(dir.path().join("a.jpg"), b"jpeg-bytes").unwrap();

        let response = app(state.clone())
            .oneshot(
                request("GET", "/media/a.jpg", None)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/jpeg"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"jpeg-bytes");

        let response = app(state)
            .oneshot(
                request("GET", "/media/%2E%2E/secret.jpg", None)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_ne!(response.status(), StatusCode::OK);
    }
}
