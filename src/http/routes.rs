// HTTP adapters for the bridge. Handlers stay thin: acquire a session, call
// a core service, translate the outcome onto the wire. The error taxonomy
// maps as: Unauthorized -> 401 (with an auth_url hint), UnsupportedType ->
// 415, everything else -> 500. Fetch and corrupt-document failures are not
// further distinguished at this layer.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::timeout::TimeoutLayer;

use crate::core::directory::{DirectoryError, DirectoryService, DriveDirectory};
use crate::core::extraction::{
    ContentFetcher, ExtractionError, ExtractionService, GoogleDocMode,
};
use crate::core::session::{Session, SessionProvider};

/// Hard ceiling on a whole request, over and above the per-fetch client
/// timeout. Keeps a wedged upstream from pinning connections open.
const REQUEST_DEADLINE: Duration = Duration::from_secs(60);

/// Shared state for all routes. One Drive client serves both services; the
/// session provider hands out a fresh capability per request.
pub struct AppState<D> {
    pub extraction: ExtractionService<D>,
    pub directory: DirectoryService<D>,
    pub sessions: Arc<dyn SessionProvider>,
    pub auth_url: String,
}

impl<D> AppState<D>
where
    D: ContentFetcher + DriveDirectory + Clone,
{
    pub fn new(
        drive: D,
        doc_mode: GoogleDocMode,
        sessions: Arc<dyn SessionProvider>,
        auth_url: String,
    ) -> Self {
        Self {
            extraction: ExtractionService::new(drive.clone(), doc_mode),
            directory: DirectoryService::new(drive),
            sessions,
            auth_url,
        }
    }
}

pub fn router<D>(state: Arc<AppState<D>>) -> Router
where
    D: ContentFetcher + DriveDirectory + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/folders", get(folders::<D>))
        .route("/folder/{folder_id}/files", get(folder_files::<D>))
        .route("/search", get(search_files::<D>))
        .route("/search-folders", get(search_folders::<D>))
        .route("/file/{file_id}/text", get(file_text::<D>))
        .route("/file/{file_id}/content", get(file_content::<D>))
        .layer(TimeoutLayer::new(REQUEST_DEADLINE))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
    limit: Option<usize>,
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "alive",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn file_text<D>(
    State(state): State<Arc<AppState<D>>>,
    Path(file_id): Path<String>,
) -> Response
where
    D: ContentFetcher + DriveDirectory + Send + Sync + 'static,
{
    let session = match acquire_session(&state).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    match state.extraction.extract_text(&session, &file_id).await {
        Ok(result) => Json(json!({
            "file": { "name": result.file.name, "id": result.file.id },
            "type": result.kind.tag(),
            "text": result.text,
        }))
        .into_response(),
        Err(err) => extraction_error_response(&state.auth_url, err),
    }
}

async fn file_content<D>(
    State(state): State<Arc<AppState<D>>>,
    Path(file_id): Path<String>,
) -> Response
where
    D: ContentFetcher + DriveDirectory + Send + Sync + 'static,
{
    let session = match acquire_session(&state).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    match state.extraction.download(&session, &file_id).await {
        Ok((file, bytes)) => {
            let content_type = HeaderValue::from_str(&file.mime_type)
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
            // Quotes and control characters would corrupt the header.
            let safe_name: String = file
                .name
                .chars()
                .filter(|c| *c != '"' && !c.is_control())
                .collect();
            let disposition =
                HeaderValue::from_str(&format!("attachment; filename=\"{safe_name}\""))
                    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

            (
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                Body::from(bytes),
            )
                .into_response()
        }
        Err(err) => extraction_error_response(&state.auth_url, err),
    }
}

async fn folders<D>(State(state): State<Arc<AppState<D>>>) -> Response
where
    D: ContentFetcher + DriveDirectory + Send + Sync + 'static,
{
    let session = match acquire_session(&state).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    match state.directory.folders(&session).await {
        Ok(folders) => Json(json!({
            "total": folders.len(),
            "folders": folders,
        }))
        .into_response(),
        Err(err) => directory_error_response(&state.auth_url, err),
    }
}

async fn folder_files<D>(
    State(state): State<Arc<AppState<D>>>,
    Path(folder_id): Path<String>,
    Query(params): Query<ListParams>,
) -> Response
where
    D: ContentFetcher + DriveDirectory + Send + Sync + 'static,
{
    let session = match acquire_session(&state).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    match state
        .directory
        .folder_files(&session, &folder_id, params.limit)
        .await
    {
        Ok(files) => Json(json!({
            "folder": { "id": folder_id },
            "total": files.len(),
            "files": files,
        }))
        .into_response(),
        Err(err) => directory_error_response(&state.auth_url, err),
    }
}

async fn search_files<D>(
    State(state): State<Arc<AppState<D>>>,
    Query(params): Query<SearchParams>,
) -> Response
where
    D: ContentFetcher + DriveDirectory + Send + Sync + 'static,
{
    let Some(query) = params.q else {
        return missing_query_response();
    };
    let session = match acquire_session(&state).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    match state
        .directory
        .search_files(&session, &query, params.limit)
        .await
    {
        Ok(files) => Json(json!({
            "query": query,
            "total": files.len(),
            "files": files,
        }))
        .into_response(),
        Err(err) => directory_error_response(&state.auth_url, err),
    }
}

async fn search_folders<D>(
    State(state): State<Arc<AppState<D>>>,
    Query(params): Query<SearchParams>,
) -> Response
where
    D: ContentFetcher + DriveDirectory + Send + Sync + 'static,
{
    let Some(query) = params.q else {
        return missing_query_response();
    };
    let session = match acquire_session(&state).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    match state.directory.search_folders(&session, &query).await {
        Ok(folders) => Json(json!({
            "query": query,
            "total": folders.len(),
            "folders": folders,
        }))
        .into_response(),
        Err(err) => directory_error_response(&state.auth_url, err),
    }
}

async fn acquire_session<D>(state: &AppState<D>) -> Result<Session, Response> {
    state.sessions.session().await.map_err(|err| {
        tracing::warn!("session acquisition failed: {err}");
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": err.to_string(), "auth_url": state.auth_url })),
        )
            .into_response()
    })
}

fn extraction_error_response(auth_url: &str, err: ExtractionError) -> Response {
    let status = match &err {
        ExtractionError::Unauthorized => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": err.to_string(), "auth_url": auth_url })),
            )
                .into_response();
        }
        ExtractionError::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    tracing::warn!(%status, "extraction request failed: {err}");
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn directory_error_response(auth_url: &str, err: DirectoryError) -> Response {
    match err {
        DirectoryError::Unauthorized => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": err.to_string(), "auth_url": auth_url })),
        )
            .into_response(),
        DirectoryError::Api(_) => {
            tracing::warn!("listing request failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

fn missing_query_response() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "missing query parameter: q" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::core::directory::{FileEntry, FolderEntry};
    use crate::core::extraction::strategies::fixtures;
    use crate::core::extraction::{RemoteFile, StructuredDocument};
    use crate::core::session::SessionError;

    /// One-file Drive with a fixed folder listing.
    #[derive(Clone, Default)]
    struct FakeDrive {
        file: Option<(RemoteFile, Vec<u8>)>,
    }

    impl FakeDrive {
        fn with_file(id: &str, name: &str, mime: &str, bytes: Vec<u8>) -> Self {
            Self {
                file: Some((
                    RemoteFile {
                        id: id.to_string(),
                        name: name.to_string(),
                        mime_type: mime.to_string(),
                        size: Some(bytes.len() as u64),
                        modified_time: None,
                    },
                    bytes,
                )),
            }
        }

        fn lookup(&self, file_id: &str) -> Result<&(RemoteFile, Vec<u8>), ExtractionError> {
            match &self.file {
                Some(entry) if entry.0.id == file_id => Ok(entry),
                _ => Err(ExtractionError::NotFound(file_id.to_string())),
            }
        }
    }

    #[async_trait]
    impl ContentFetcher for FakeDrive {
        async fn metadata(
            &self,
            _session: &Session,
            file_id: &str,
        ) -> Result<RemoteFile, ExtractionError> {
            Ok(self.lookup(file_id)?.0.clone())
        }

        async fn raw_content(
            &self,
            _session: &Session,
            file_id: &str,
        ) -> Result<Vec<u8>, ExtractionError> {
            Ok(self.lookup(file_id)?.1.clone())
        }

        async fn exported_content(
            &self,
            _session: &Session,
            file_id: &str,
            _target_mime: &str,
        ) -> Result<Vec<u8>, ExtractionError> {
            Ok(self.lookup(file_id)?.1.clone())
        }

        async fn structured_document(
            &self,
            _session: &Session,
            _file_id: &str,
        ) -> Result<StructuredDocument, ExtractionError> {
            Ok(StructuredDocument::default())
        }
    }

    #[async_trait]
    impl DriveDirectory for FakeDrive {
        async fn list_folders(&self, _: &Session) -> Result<Vec<FolderEntry>, DirectoryError> {
            Ok(vec![FolderEntry {
                id: "folder-1".to_string(),
                name: "Reports".to_string(),
                modified_time: None,
            }])
        }

        async fn list_folder_files(
            &self,
            _: &Session,
            _: &str,
            _: usize,
        ) -> Result<Vec<FileEntry>, DirectoryError> {
            Ok(Vec::new())
        }

        async fn search_files(
            &self,
            _: &Session,
            _: &str,
            _: usize,
        ) -> Result<Vec<FileEntry>, DirectoryError> {
            Ok(Vec::new())
        }

        async fn search_folders(
            &self,
            _: &Session,
            _: &str,
        ) -> Result<Vec<FolderEntry>, DirectoryError> {
            Ok(Vec::new())
        }
    }

    struct FakeSessions {
        fail: bool,
    }

    #[async_trait]
    impl SessionProvider for FakeSessions {
        async fn session(&self) -> Result<Session, SessionError> {
            if self.fail {
                Err(SessionError::Unavailable("token exchange failed".to_string()))
            } else {
                Ok(Session::new("test-token".to_string()))
            }
        }
    }

    fn test_router(drive: FakeDrive, fail_auth: bool) -> Router {
        let state = Arc::new(AppState::new(
            drive,
            GoogleDocMode::Export,
            Arc::new(FakeSessions { fail: fail_auth }),
            "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
        ));
        router(state)
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn health_reports_alive() {
        let (status, body) = get_json(test_router(FakeDrive::default(), false), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "alive");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn pdf_extraction_end_to_end() {
        let drive = FakeDrive::with_file(
            "abc123",
            "doc.pdf",
            "application/pdf",
            fixtures::minimal_pdf("Bridge test payload"),
        );

        let (status, body) = get_json(test_router(drive, false), "/file/abc123/text").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["file"]["name"], "doc.pdf");
        assert_eq!(body["file"]["id"], "abc123");
        assert_eq!(body["type"], "pdf");
        assert!(
            body["text"].as_str().unwrap().contains("Bridge test payload"),
            "got: {}",
            body["text"]
        );
    }

    #[tokio::test]
    async fn unsupported_type_answers_415() {
        let drive = FakeDrive::with_file("abc123", "photo.png", "image/png", vec![1, 2, 3]);

        let (status, body) = get_json(test_router(drive, false), "/file/abc123/text").await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(body["error"].as_str().unwrap().contains("image/png"));
    }

    #[tokio::test]
    async fn missing_session_answers_401_with_auth_url() {
        let drive = FakeDrive::with_file("abc123", "doc.pdf", "application/pdf", Vec::new());

        let (status, body) = get_json(test_router(drive, true), "/file/abc123/text").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].as_str().unwrap().contains("token exchange failed"));
        assert_eq!(
            body["auth_url"],
            "https://accounts.google.com/o/oauth2/v2/auth"
        );
    }

    #[tokio::test]
    async fn unknown_file_answers_500() {
        let (status, body) =
            get_json(test_router(FakeDrive::default(), false), "/file/nope/text").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("nope"));
    }

    #[tokio::test]
    async fn raw_content_sets_download_headers() {
        let drive = FakeDrive::with_file(
            "abc123",
            "photo.png",
            "image/png",
            vec![0x89, 0x50, 0x4e, 0x47],
        );

        let response = test_router(drive, false)
            .oneshot(
                Request::builder()
                    .uri("/file/abc123/content")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"photo.png\""
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes.as_ref(), &[0x89, 0x50, 0x4e, 0x47]);
    }

    #[tokio::test]
    async fn folders_listing_includes_total() {
        let (status, body) = get_json(test_router(FakeDrive::default(), false), "/folders").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["folders"][0]["name"], "Reports");
    }

    #[tokio::test]
    async fn search_without_query_answers_400() {
        let (status, body) = get_json(test_router(FakeDrive::default(), false), "/search").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("q"));
    }

    #[tokio::test]
    async fn search_echoes_the_query() {
        let (status, body) = get_json(
            test_router(FakeDrive::default(), false),
            "/search?q=report&limit=5",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query"], "report");
        assert_eq!(body["total"], 0);
    }
}
