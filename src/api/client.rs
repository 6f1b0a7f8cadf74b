//! HTTP implementation of [`SearchApi`] over reqwest.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use super::SearchApi;
use super::types::{
    ClipParams, ClipRecord, LocalImageRef, SearchId, SearchList, SearchParams, SearchResponse,
    UploadRecord,
};
use crate::config::ApiSettings;
use crate::error::{Result, SnapError};

/// Longest server error body echoed back in an error message.
const MAX_ERROR_BODY: usize = 300;

/// Stateless client for the image-search API.
///
/// Holds only a connection pool; no session state survives between calls.
#[derive(Debug, Clone)]
pub struct HttpSearchClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSearchClient {
    /// Build a client from API settings.
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.timeout())
            .build()
            .map_err(|e| SnapError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl SearchApi for HttpSearchClient {
    #[instrument(skip(self), fields(image = %image))]
    async fn upload(&self, image: &LocalImageRef) -> Result<UploadRecord> {
        let path = image.to_path();
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SnapError::ImageNotFound {
                    path: path.display().to_string(),
                }
            } else {
                SnapError::Io(e)
            }
        })?;
        debug!(size_bytes = bytes.len(), "Uploading image");

        let part = Part::bytes(bytes)
            .file_name(image.file_name())
            .mime_str("image/jpeg")
            .map_err(|e| SnapError::Other(format!("invalid multipart part: {e}")))?;
        let form = Form::new().part("file", part).text("optimize", "false");

        let resp = self
            .http
            .post(self.url("/images/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        let record: UploadRecord = decode(resp).await?;
        info!(image_path = %record.image_path, "Image uploaded");
        Ok(record)
    }

    #[instrument(skip(self, params), fields(image_path = %params.image_path))]
    async fn clip(&self, params: &ClipParams) -> Result<ClipRecord> {
        let resp = self
            .http
            .post(self.url("/images/clip"))
            .form(params)
            .send()
            .await
            .map_err(transport_error)?;

        let record: ClipRecord = decode(resp).await?;
        info!(image_path = %record.image_path, "Image clipped");
        Ok(record)
    }

    #[instrument(skip(self, params), fields(image_path = %params.image_path, clipped = params.is_clipped))]
    async fn search(&self, params: &SearchParams) -> Result<SearchResponse> {
        let resp = self
            .http
            .post(self.url("/images/search"))
            .form(params)
            .send()
            .await
            .map_err(transport_error)?;

        let response: SearchResponse = decode(resp).await?;
        info!(
            search_id = response.search_id,
            total_results = response.total_results,
            "Search completed"
        );
        Ok(response)
    }

    #[instrument(skip(self))]
    async fn fetch_search(&self, search_id: SearchId) -> Result<SearchResponse> {
        let resp = self
            .http
            .get(self.url(&format!("/images/searches/{search_id}")))
            .send()
            .await
            .map_err(transport_error)?;

        if resp.status() == StatusCode::NOT_FOUND {
            debug!("Search not found");
            return Err(SnapError::NotFound { search_id });
        }
        decode(resp).await
    }

    #[instrument(skip(self))]
    async fn list_searches(&self, limit: u32) -> Result<SearchList> {
        let resp = self
            .http
            .get(self.url("/images/searches"))
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(transport_error)?;

        decode(resp).await
    }
}

/// Decode a JSON body, turning non-2xx statuses into `Server` errors.
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let error = server_error(status, &body);
        warn!(status = status.as_u16(), error = %error, "Request rejected");
        return Err(error);
    }

    resp.json::<T>().await.map_err(|e| {
        if e.is_decode() {
            SnapError::Server {
                status: status.as_u16(),
                message: format!("invalid response body: {e}"),
            }
        } else {
            transport_error(e)
        }
    })
}

fn transport_error(e: reqwest::Error) -> SnapError {
    let mut message = e.to_string();
    let mut source = std::error::Error::source(&e);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    SnapError::Network(message)
}

/// Build a `Server` error, preferring the API's `detail` field.
pub(crate) fn server_error(status: StatusCode, body: &str) -> SnapError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| match v.get("detail") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        });

    let message = detail.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            trimmed.chars().take(MAX_ERROR_BODY).collect()
        }
    });

    SnapError::Server {
        status: status.as_u16(),
        message,
    }
}
