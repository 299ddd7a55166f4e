//! Google Drive API connector implementation
//!
//! Implements the `RemoteStore` trait for Google Drive API v3.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::remote::{ListQuery, RemoteFileSnapshot, RemoteStore};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{GoogleDriveError, Result};
use crate::types::{DriveFile, FilesListResponse, UploadMetadata, UploadedFile};

/// Google Drive API base URL
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Google Drive upload API base URL
const UPLOAD_API_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Maximum results per page (Google Drive API limit)
const MAX_PAGE_SIZE: u32 = 1000;

/// Boundary for multipart upload bodies
const MULTIPART_BOUNDARY: &str = "text_drive_sync_upload";

/// Retries per API call before giving up
const MAX_RETRIES: u32 = 3;

/// Google Drive API connector
///
/// Implements `RemoteStore` for Google Drive API v3:
///
/// - Paginated `files.list` driven by the caller's [`ListQuery`]
/// - Multipart create and update uploads
/// - `alt=media` downloads
/// - Exponential backoff on 429 and 5xx responses
pub struct GoogleDriveConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// OAuth 2.0 access token with `drive.file` scope
    access_token: String,
}

impl GoogleDriveConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, access_token: String) -> Self {
        Self {
            http_client,
            access_token,
        }
    }

    /// Parse RFC 3339 timestamp to Unix seconds.
    fn parse_timestamp(rfc3339: &str) -> Result<i64> {
        DateTime::parse_from_rfc3339(rfc3339)
            .map(|dt| dt.with_timezone(&Utc).timestamp())
            .map_err(|e| {
                GoogleDriveError::ParseError(format!("bad timestamp '{}': {}", rfc3339, e))
            })
    }

    fn convert_file(drive_file: &DriveFile) -> Result<RemoteFileSnapshot> {
        Ok(RemoteFileSnapshot {
            remote_id: drive_file.id.clone(),
            display_name: drive_file.name.clone(),
            modified_at: Self::parse_timestamp(&drive_file.modified_time)?,
            parent_ids: drive_file.parents.clone(),
        })
    }

    /// Multipart/related body carrying JSON metadata plus raw content.
    fn multipart_body(metadata: &UploadMetadata, content: &[u8]) -> Result<Bytes> {
        let meta_json = serde_json::to_vec(metadata)
            .map_err(|e| GoogleDriveError::ParseError(format!("metadata encoding: {}", e)))?;

        let mut body = Vec::with_capacity(meta_json.len() + content.len() + 256);
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n",
                MULTIPART_BOUNDARY
            )
            .as_bytes(),
        );
        body.extend_from_slice(&meta_json);
        body.extend_from_slice(
            format!(
                "\r\n--{}\r\nContent-Type: text/plain\r\n\r\n",
                MULTIPART_BOUNDARY
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--", MULTIPART_BOUNDARY).as_bytes());

        Ok(Bytes::from(body))
    }

    fn multipart_content_type() -> String {
        format!("multipart/related; boundary={}", MULTIPART_BOUNDARY)
    }

    /// Execute an API request, retrying on rate limiting and server errors
    /// with exponential backoff.
    #[instrument(skip_all, fields(url = %request.url))]
    async fn execute_with_retry(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut attempt = 0;

        loop {
            match self.http_client.execute(request.clone()).await {
                Ok(response) if response.is_success() => {
                    debug!(status = response.status, "API request succeeded");
                    return Ok(response);
                }
                Ok(response) if response.status == 429 || response.status >= 500 => {
                    attempt += 1;
                    if attempt >= MAX_RETRIES {
                        warn!(
                            status = response.status,
                            attempts = MAX_RETRIES,
                            "API request failed after all retries"
                        );
                        return Err(GoogleDriveError::ApiError {
                            status_code: response.status,
                            message: format!("Request failed after {} retries", MAX_RETRIES),
                        });
                    }

                    let backoff_ms = 100u64 * 2u64.pow(attempt);
                    warn!(
                        status = response.status,
                        attempt = attempt,
                        backoff_ms = backoff_ms,
                        "Retryable API failure"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Ok(response) => {
                    warn!(status = response.status, "API request failed");
                    return Err(GoogleDriveError::ApiError {
                        status_code: response.status,
                        message: String::from_utf8_lossy(&response.body).to_string(),
                    });
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= MAX_RETRIES {
                        warn!(error = %e, attempts = MAX_RETRIES, "Transport failed after all retries");
                        return Err(e.into());
                    }

                    let backoff_ms = 100u64 * 2u64.pow(attempt);
                    warn!(error = %e, attempt = attempt, backoff_ms = backoff_ms, "Transport failure, retrying");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }

    fn list_url(query: &ListQuery, page_token: Option<&str>) -> String {
        let mut url = format!(
            "{}/files?q={}&spaces={}&pageSize={}&fields={}",
            DRIVE_API_BASE,
            urlencoding::encode(&query.query),
            urlencoding::encode(&query.spaces),
            MAX_PAGE_SIZE,
            urlencoding::encode(&query.fields),
        );
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }
        url
    }
}

#[async_trait]
impl RemoteStore for GoogleDriveConnector {
    #[instrument(skip_all)]
    async fn list_files(&self, query: &ListQuery) -> bridge_traits::Result<Vec<RemoteFileSnapshot>> {
        let mut snapshots = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let request = HttpRequest::new(
                HttpMethod::Get,
                Self::list_url(query, page_token.as_deref()),
            )
            .bearer_token(&self.access_token)
            .header("Accept", "application/json")
            .timeout(Duration::from_secs(30));

            let response = self.execute_with_retry(request).await?;
            let page: FilesListResponse = serde_json::from_slice(&response.body)
                .map_err(|e| GoogleDriveError::ParseError(format!("files list: {}", e)))
                .map_err(bridge_traits::BridgeError::from)?;

            for file in &page.files {
                if file.trashed {
                    continue;
                }
                snapshots.push(Self::convert_file(file).map_err(bridge_traits::BridgeError::from)?);
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(count = snapshots.len(), "Listed files from Google Drive");
        Ok(snapshots)
    }

    #[instrument(skip_all, fields(name = %name))]
    async fn create_file(
        &self,
        local_path: &Path,
        name: &str,
        parent_folder_id: Option<&str>,
    ) -> bridge_traits::Result<String> {
        let content = tokio::fs::read(local_path)
            .await
            .map_err(bridge_traits::BridgeError::Io)?;

        let metadata = UploadMetadata {
            name: name.to_string(),
            mime_type: Some("text/plain".to_string()),
            parents: parent_folder_id.map(|id| vec![id.to_string()]),
        };
        let body = Self::multipart_body(&metadata, &content)
            .map_err(bridge_traits::BridgeError::from)?;

        let url = format!("{}/files?uploadType=multipart&fields=id", UPLOAD_API_BASE);
        let request = HttpRequest::new(HttpMethod::Post, url)
            .bearer_token(&self.access_token)
            .header("Content-Type", Self::multipart_content_type())
            .body(body)
            .timeout(Duration::from_secs(60));

        let response = self.execute_with_retry(request).await?;
        let uploaded: UploadedFile = serde_json::from_slice(&response.body)
            .map_err(|e| GoogleDriveError::ParseError(format!("upload response: {}", e)))
            .map_err(bridge_traits::BridgeError::from)?;

        info!(remote_id = %uploaded.id, "Created remote file");
        Ok(uploaded.id)
    }

    #[instrument(skip_all, fields(remote_id = %remote_id))]
    async fn update_file(
        &self,
        remote_id: &str,
        local_path: &Path,
        name: &str,
    ) -> bridge_traits::Result<()> {
        let content = tokio::fs::read(local_path)
            .await
            .map_err(bridge_traits::BridgeError::Io)?;

        let metadata = UploadMetadata {
            name: name.to_string(),
            mime_type: None,
            parents: None,
        };
        let body = Self::multipart_body(&metadata, &content)
            .map_err(bridge_traits::BridgeError::from)?;

        let url = format!(
            "{}/files/{}?uploadType=multipart&fields=id",
            UPLOAD_API_BASE, remote_id
        );
        let request = HttpRequest::new(HttpMethod::Patch, url)
            .bearer_token(&self.access_token)
            .header("Content-Type", Self::multipart_content_type())
            .body(body)
            .timeout(Duration::from_secs(60));

        self.execute_with_retry(request).await?;
        info!("Updated remote file");
        Ok(())
    }

    #[instrument(skip_all, fields(remote_id = %remote_id))]
    async fn download_file(&self, remote_id: &str) -> bridge_traits::Result<Bytes> {
        let url = format!("{}/files/{}?alt=media", DRIVE_API_BASE, remote_id);
        let request = HttpRequest::new(HttpMethod::Get, url)
            .bearer_token(&self.access_token)
            .timeout(Duration::from_secs(60));

        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            return Err(GoogleDriveError::ApiError {
                status_code: response.status,
                message: String::from_utf8_lossy(&response.body).to_string(),
            }
            .into());
        }

        info!(size = response.body.len(), "Downloaded file content");
        Ok(response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use mockall::Sequence;
    use std::collections::HashMap;

    mock! {
        Http {}

        #[async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> bridge_traits::error::Result<HttpResponse>;
        }
    }

    fn json_response(status: u16, body: &str) -> bridge_traits::error::Result<HttpResponse> {
        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::copy_from_slice(body.as_bytes()),
        })
    }

    fn connector(mock: MockHttp) -> GoogleDriveConnector {
        GoogleDriveConnector::new(Arc::new(mock), "test_token".to_string())
    }

    #[test]
    fn parse_timestamp_to_unix_seconds() {
        let ts = GoogleDriveConnector::parse_timestamp("1970-01-01T00:01:40.000Z").unwrap();
        assert_eq!(ts, 100);

        assert!(GoogleDriveConnector::parse_timestamp("not a date").is_err());
    }

    #[tokio::test]
    async fn list_follows_pagination() {
        let mut mock = MockHttp::new();
        let mut seq = Sequence::new();

        mock.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|req| !req.url.contains("pageToken"))
            .returning(|_| {
                json_response(
                    200,
                    r#"{
                        "files": [{
                            "id": "file1",
                            "name": "a.txt",
                            "modifiedTime": "2024-01-01T00:00:00.000Z",
                            "parents": []
                        }],
                        "nextPageToken": "page2"
                    }"#,
                )
            });
        mock.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|req| req.url.contains("pageToken=page2"))
            .returning(|_| {
                json_response(
                    200,
                    r#"{
                        "files": [{
                            "id": "file2",
                            "name": "b.txt",
                            "modifiedTime": "2024-01-02T00:00:00.000Z",
                            "parents": []
                        }]
                    }"#,
                )
            });

        let files = connector(mock)
            .list_files(&ListQuery::default())
            .await
            .unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].remote_id, "file1");
        assert_eq!(files[1].remote_id, "file2");
    }

    #[tokio::test]
    async fn list_skips_trashed_files() {
        let mut mock = MockHttp::new();
        mock.expect_execute().times(1).returning(|_| {
            json_response(
                200,
                r#"{
                    "files": [
                        {
                            "id": "live",
                            "name": "a.txt",
                            "modifiedTime": "2024-01-01T00:00:00.000Z"
                        },
                        {
                            "id": "gone",
                            "name": "b.txt",
                            "modifiedTime": "2024-01-01T00:00:00.000Z",
                            "trashed": true
                        }
                    ]
                }"#,
            )
        });

        let files = connector(mock)
            .list_files(&ListQuery::default())
            .await
            .unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].remote_id, "live");
    }

    #[tokio::test]
    async fn server_error_is_retried_then_succeeds() {
        let mut mock = MockHttp::new();
        let mut seq = Sequence::new();

        mock.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| json_response(503, "unavailable"));
        mock.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| json_response(200, r#"{"files": []}"#));

        let files = connector(mock)
            .list_files(&ListQuery::default())
            .await
            .unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let mut mock = MockHttp::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| json_response(404, "File not found"));

        let result = connector(mock).download_file("missing").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn create_uploads_multipart_with_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_notes.txt");
        std::fs::write(&path, b"hello world").unwrap();

        let mut mock = MockHttp::new();
        mock.expect_execute()
            .times(1)
            .withf(|req| {
                let body = req.body.as_ref().unwrap();
                let body = std::str::from_utf8(body).unwrap();
                req.method == HttpMethod::Post
                    && req.url.contains("/upload/drive/v3/files?uploadType=multipart")
                    && req.headers["Content-Type"].contains("multipart/related")
                    && body.contains(r#""name":"notes.txt""#)
                    && body.contains(r#""parents":["folder-1"]"#)
                    && body.contains("hello world")
            })
            .returning(|_| json_response(200, r#"{"id": "created-1"}"#));

        let id = connector(mock)
            .create_file(&path, "notes.txt", Some("folder-1"))
            .await
            .unwrap();
        assert_eq!(id, "created-1");
    }

    #[tokio::test]
    async fn update_patches_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("R1_notes.txt");
        std::fs::write(&path, b"new content").unwrap();

        let mut mock = MockHttp::new();
        mock.expect_execute()
            .times(1)
            .withf(|req| {
                req.method == HttpMethod::Patch
                    && req.url.contains("/upload/drive/v3/files/R1?uploadType=multipart")
            })
            .returning(|_| json_response(200, r#"{"id": "R1"}"#));

        connector(mock)
            .update_file("R1", &path, "notes.txt")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn download_returns_raw_bytes() {
        let mut mock = MockHttp::new();
        mock.expect_execute()
            .times(1)
            .withf(|req| req.url.contains("alt=media"))
            .returning(|_| {
                Ok(HttpResponse {
                    status: 200,
                    headers: HashMap::new(),
                    body: Bytes::from_static(b"file body"),
                })
            });

        let data = connector(mock).download_file("R1").await.unwrap();
        assert_eq!(&data[..], b"file body");
    }
}
