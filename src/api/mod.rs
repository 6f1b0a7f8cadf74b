//! Remote search client.
//!
//! [`SearchApi`] abstracts the image-search server so the pipeline can run
//! against the real HTTP service ([`HttpSearchClient`]) or an in-memory
//! recorder ([`mock::MockSearchApi`]).
//!
//! Every call is an independent request/response: no retry, no caching, no
//! deduplication. Failures surface immediately as
//! [`SnapError::Network`](crate::error::SnapError::Network),
//! [`SnapError::Server`](crate::error::SnapError::Server), or
//! [`SnapError::NotFound`](crate::error::SnapError::NotFound).

mod client;
pub mod mock;
mod types;

pub use client::HttpSearchClient;
pub use types::{
    ClipParams, ClipRecord, LocalImageRef, SearchHandle, SearchId, SearchList, SearchParams,
    SearchResponse, SearchResultItem, SearchSummary, UploadRecord,
};

use async_trait::async_trait;

use crate::error::Result;

/// Operations offered by the image-search server.
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Upload a local image as multipart form content.
    async fn upload(&self, image: &LocalImageRef) -> Result<UploadRecord>;

    /// Crop an already-uploaded image on the server.
    async fn clip(&self, params: &ClipParams) -> Result<ClipRecord>;

    /// Run a similarity search; the server persists a search record.
    async fn search(&self, params: &SearchParams) -> Result<SearchResponse>;

    /// Fetch a stored result set.
    ///
    /// # Errors
    ///
    /// `NotFound` if the server does not know `search_id`.
    async fn fetch_search(&self, search_id: SearchId) -> Result<SearchResponse>;

    /// List recent searches, newest first.
    async fn list_searches(&self, limit: u32) -> Result<SearchList>;
}
