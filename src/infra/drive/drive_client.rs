use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::core::directory::{DirectoryError, DriveDirectory, FileEntry, FolderEntry};
use crate::core::extraction::{
    ContentFetcher, DocParagraph, ExtractionError, RemoteFile, StructuredDocument,
};
use crate::core::session::Session;

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const FILE_FIELDS: &str = "id, name, mimeType, modifiedTime, size";
const FOLDER_FIELDS: &str = "files(id, name, modifiedTime)";
const LISTING_FIELDS: &str = "files(id, name, mimeType, modifiedTime, size)";

/// Every fetch step is bounded; a timeout surfaces as a fetch error before
/// any extraction strategy runs.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Minimal Google Drive v3 (plus Docs v1) client. It deliberately exposes
/// only the calls the core layer needs, always on behalf of a caller-supplied
/// `Session`.
#[derive(Clone)]
pub struct DriveApiClient {
    client: Client,
    base_url: String,
    docs_base_url: String,
}

impl DriveApiClient {
    pub fn new() -> Result<Self, ExtractionError> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        headers.insert(
            "User-Agent",
            HeaderValue::from_static("DriveTextBridge/0.2"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ExtractionError::Fetch(e.to_string()))?;

        Ok(Self {
            client,
            base_url: "https://www.googleapis.com/drive/v3".to_string(),
            docs_base_url: "https://docs.googleapis.com/v1".to_string(),
        })
    }

    /// Accumulate the response body chunk-by-chunk in arrival order and only
    /// resolve at end-of-stream. A mid-stream transport error aborts the
    /// whole fetch; truncated content never leaves this function.
    async fn drain_stream(response: Response) -> Result<Vec<u8>, ExtractionError> {
        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ExtractionError::Fetch(e.to_string()))?;
            buffer.extend_from_slice(&chunk);
        }
        Ok(buffer)
    }

    fn content_status_error(status: StatusCode, file_id: &str) -> ExtractionError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ExtractionError::Unauthorized,
            StatusCode::NOT_FOUND => ExtractionError::NotFound(file_id.to_string()),
            other => ExtractionError::Fetch(format!("Drive returned {other}")),
        }
    }

    fn listing_status_error(status: StatusCode) -> DirectoryError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DirectoryError::Unauthorized,
            other => DirectoryError::Api(format!("Drive returned {other}")),
        }
    }

    fn parse_datetime(value: Option<String>) -> Option<DateTime<Utc>> {
        value
            .as_deref()
            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    // Drive reports sizes as decimal strings.
    fn parse_size(value: Option<String>) -> Option<u64> {
        value.as_deref().and_then(|v| v.parse().ok())
    }

    async fn list_files(
        &self,
        session: &Session,
        query: &str,
        fields: &str,
        page_size: Option<usize>,
    ) -> Result<Vec<ApiFile>, DirectoryError> {
        let url = format!("{}/files", self.base_url);
        let mut request = self
            .client
            .get(&url)
            .bearer_auth(session.token())
            .query(&[("q", query), ("fields", fields)]);
        if let Some(size) = page_size {
            request = request.query(&[("pageSize", size.to_string())]);
        }

        tracing::debug!(query, "listing Drive files");

        let response = request
            .send()
            .await
            .map_err(|e| DirectoryError::Api(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::listing_status_error(response.status()));
        }

        let listing: ApiFileList = response
            .json()
            .await
            .map_err(|e| DirectoryError::Api(e.to_string()))?;
        Ok(listing.files)
    }

    fn to_folder_entry(api: ApiFile) -> FolderEntry {
        FolderEntry {
            id: api.id.unwrap_or_default(),
            name: api.name.unwrap_or_default(),
            modified_time: Self::parse_datetime(api.modified_time),
        }
    }

    fn to_file_entry(api: ApiFile) -> FileEntry {
        FileEntry {
            id: api.id.unwrap_or_default(),
            name: api.name.unwrap_or_default(),
            mime_type: api.mime_type.unwrap_or_default(),
            modified_time: Self::parse_datetime(api.modified_time),
            size: Self::parse_size(api.size),
        }
    }
}

/// Escape a user-supplied substring for interpolation into a Drive query.
/// Backslashes first, then single quotes; the provider's query language
/// treats both as metacharacters inside quoted terms.
fn escape_query_term(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('\'', "\\'")
}

#[async_trait]
impl ContentFetcher for DriveApiClient {
    async fn metadata(
        &self,
        session: &Session,
        file_id: &str,
    ) -> Result<RemoteFile, ExtractionError> {
        let url = format!("{}/files/{}", self.base_url, file_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(session.token())
            .query(&[("fields", FILE_FIELDS)])
            .send()
            .await
            .map_err(|e| ExtractionError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::content_status_error(response.status(), file_id));
        }

        let api: ApiFile = response
            .json()
            .await
            .map_err(|e| ExtractionError::Fetch(e.to_string()))?;

        Ok(RemoteFile {
            id: api.id.unwrap_or_else(|| file_id.to_string()),
            name: api.name.unwrap_or_else(|| "untitled".to_string()),
            mime_type: api.mime_type.unwrap_or_default(),
            size: Self::parse_size(api.size),
            modified_time: Self::parse_datetime(api.modified_time),
        })
    }

    async fn raw_content(
        &self,
        session: &Session,
        file_id: &str,
    ) -> Result<Vec<u8>, ExtractionError> {
        let url = format!("{}/files/{}", self.base_url, file_id);
        tracing::debug!(file_id, "downloading raw content");

        let response = self
            .client
            .get(&url)
            .bearer_auth(session.token())
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(|e| ExtractionError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::content_status_error(response.status(), file_id));
        }

        Self::drain_stream(response).await
    }

    async fn exported_content(
        &self,
        session: &Session,
        file_id: &str,
        target_mime: &str,
    ) -> Result<Vec<u8>, ExtractionError> {
        let url = format!("{}/files/{}/export", self.base_url, file_id);
        tracing::debug!(file_id, target_mime, "requesting server-side export");

        let response = self
            .client
            .get(&url)
            .bearer_auth(session.token())
            .query(&[("mimeType", target_mime)])
            .send()
            .await
            .map_err(|e| ExtractionError::Fetch(e.to_string()))?;

        // Drive answers 400 when it cannot export this subtype to the
        // requested format.
        if response.status() == StatusCode::BAD_REQUEST {
            return Err(ExtractionError::ExportUnsupported(target_mime.to_string()));
        }
        if !response.status().is_success() {
            return Err(Self::content_status_error(response.status(), file_id));
        }

        Self::drain_stream(response).await
    }

    async fn structured_document(
        &self,
        session: &Session,
        file_id: &str,
    ) -> Result<StructuredDocument, ExtractionError> {
        let url = format!("{}/documents/{}", self.docs_base_url, file_id);
        tracing::debug!(file_id, "fetching structured document");

        let response = self
            .client
            .get(&url)
            .bearer_auth(session.token())
            .send()
            .await
            .map_err(|e| ExtractionError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::content_status_error(response.status(), file_id));
        }

        let document: ApiDocument = response
            .json()
            .await
            .map_err(|e| ExtractionError::Fetch(e.to_string()))?;

        Ok(document.into_structured())
    }
}

#[async_trait]
impl DriveDirectory for DriveApiClient {
    async fn list_folders(&self, session: &Session) -> Result<Vec<FolderEntry>, DirectoryError> {
        let query = format!("mimeType='{FOLDER_MIME}' and trashed=false");
        let files = self.list_files(session, &query, FOLDER_FIELDS, None).await?;
        Ok(files.into_iter().map(Self::to_folder_entry).collect())
    }

    async fn list_folder_files(
        &self,
        session: &Session,
        folder_id: &str,
        limit: usize,
    ) -> Result<Vec<FileEntry>, DirectoryError> {
        let query = format!(
            "'{}' in parents and trashed=false",
            escape_query_term(folder_id)
        );
        let files = self
            .list_files(session, &query, LISTING_FIELDS, Some(limit))
            .await?;
        Ok(files.into_iter().map(Self::to_file_entry).collect())
    }

    async fn search_files(
        &self,
        session: &Session,
        name_contains: &str,
        limit: usize,
    ) -> Result<Vec<FileEntry>, DirectoryError> {
        let query = format!(
            "name contains '{}' and trashed=false",
            escape_query_term(name_contains)
        );
        let files = self
            .list_files(session, &query, LISTING_FIELDS, Some(limit))
            .await?;
        Ok(files.into_iter().map(Self::to_file_entry).collect())
    }

    async fn search_folders(
        &self,
        session: &Session,
        name_contains: &str,
    ) -> Result<Vec<FolderEntry>, DirectoryError> {
        let query = format!(
            "mimeType='{FOLDER_MIME}' and name contains '{}' and trashed=false",
            escape_query_term(name_contains)
        );
        let files = self.list_files(session, &query, FOLDER_FIELDS, None).await?;
        Ok(files.into_iter().map(Self::to_folder_entry).collect())
    }
}

// =============================================================================
// DRIVE API RESPONSE STRUCTURES
// =============================================================================

#[derive(Debug, Deserialize)]
struct ApiFileList {
    #[serde(default)]
    files: Vec<ApiFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiFile {
    id: Option<String>,
    name: Option<String>,
    mime_type: Option<String>,
    modified_time: Option<String>,
    size: Option<String>,
}

// =============================================================================
// DOCS API RESPONSE STRUCTURES
// =============================================================================
// Only the paragraph/run subset of the Docs document tree; tables, tabs and
// styling are not part of the structured extraction path.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiDocument {
    body: Option<ApiBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiBody {
    #[serde(default)]
    content: Vec<ApiStructuralElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiStructuralElement {
    paragraph: Option<ApiParagraph>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiParagraph {
    #[serde(default)]
    elements: Vec<ApiParagraphElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiParagraphElement {
    text_run: Option<ApiTextRun>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTextRun {
    content: Option<String>,
}

impl ApiDocument {
    fn into_structured(self) -> StructuredDocument {
        let mut paragraphs = Vec::new();
        let content = self.body.map(|b| b.content).unwrap_or_default();
        for element in content {
            if let Some(paragraph) = element.paragraph {
                let runs: Vec<String> = paragraph
                    .elements
                    .into_iter()
                    .filter_map(|e| e.text_run.and_then(|r| r.content))
                    .collect();
                paragraphs.push(DocParagraph { runs });
            }
        }
        StructuredDocument { paragraphs }
    }
}
