// Folder and file listing against the storage provider. Listing is a thin
// collaborator around the provider API; the interesting part the core owns
// is the contract that user-supplied search substrings reach the provider's
// query language escaped, never raw.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::core::session::Session;

/// A folder as reported by the provider.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderEntry {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
}

/// A file listing entry. Richer than `FolderEntry` because callers use the
/// declared MIME type to decide whether extraction will succeed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("storage provider rejected the credentials")]
    Unauthorized,
    #[error("provider listing failed: {0}")]
    Api(String),
}

/// Listing operations the directory service needs from the provider.
/// Implementations own the provider query syntax, including escaping.
#[async_trait]
pub trait DriveDirectory: Send + Sync {
    async fn list_folders(&self, session: &Session) -> Result<Vec<FolderEntry>, DirectoryError>;

    async fn list_folder_files(
        &self,
        session: &Session,
        folder_id: &str,
        limit: usize,
    ) -> Result<Vec<FileEntry>, DirectoryError>;

    async fn search_files(
        &self,
        session: &Session,
        name_contains: &str,
        limit: usize,
    ) -> Result<Vec<FileEntry>, DirectoryError>;

    async fn search_folders(
        &self,
        session: &Session,
        name_contains: &str,
    ) -> Result<Vec<FolderEntry>, DirectoryError>;
}

/// Single page of listing results, like the original service. Callers that
/// need more narrow their search instead of paginating.
pub struct DirectoryService<D: DriveDirectory> {
    drive: D,
}

impl<D: DriveDirectory> DirectoryService<D> {
    pub const DEFAULT_PAGE_SIZE: usize = 20;
    pub const MAX_PAGE_SIZE: usize = 1000;

    pub fn new(drive: D) -> Self {
        Self { drive }
    }

    pub async fn folders(&self, session: &Session) -> Result<Vec<FolderEntry>, DirectoryError> {
        self.drive.list_folders(session).await
    }

    pub async fn folder_files(
        &self,
        session: &Session,
        folder_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<FileEntry>, DirectoryError> {
        let limit = Self::page_size(limit);
        self.drive.list_folder_files(session, folder_id, limit).await
    }

    pub async fn search_files(
        &self,
        session: &Session,
        name_contains: &str,
        limit: Option<usize>,
    ) -> Result<Vec<FileEntry>, DirectoryError> {
        let limit = Self::page_size(limit);
        self.drive.search_files(session, name_contains, limit).await
    }

    pub async fn search_folders(
        &self,
        session: &Session,
        name_contains: &str,
    ) -> Result<Vec<FolderEntry>, DirectoryError> {
        self.drive.search_folders(session, name_contains).await
    }

    fn page_size(limit: Option<usize>) -> usize {
        limit
            .unwrap_or(Self::DEFAULT_PAGE_SIZE)
            .clamp(1, Self::MAX_PAGE_SIZE)
    }
}
