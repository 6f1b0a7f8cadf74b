//! In-memory search API for tests.
//!
//! Records every call, hands out increasing search ids, and keeps issued
//! result sets so `fetch_search` behaves like the real server.
//!
//! ```rust,ignore
//! let api = MockSearchApi::new().with_next_search_id(42);
//! api.fail_next(MockCall::Upload, SnapError::Network("refused".into()));
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::trace;

use super::SearchApi;
use super::types::{
    ClipParams, ClipRecord, LocalImageRef, SearchId, SearchList, SearchParams, SearchResponse,
    SearchResultItem, SearchSummary, UploadRecord,
};
use crate::error::{Result, SnapError};

/// Which operation a recorded call or injected failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockCall {
    Upload,
    Clip,
    Search,
    FetchSearch,
    ListSearches,
}

/// Recorded call with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Upload { image: LocalImageRef },
    Clip { params: ClipParams },
    Search { params: SearchParams },
    FetchSearch { search_id: SearchId },
    ListSearches { limit: u32 },
}

impl Operation {
    pub const fn call(&self) -> MockCall {
        match self {
            Self::Upload { .. } => MockCall::Upload,
            Self::Clip { .. } => MockCall::Clip,
            Self::Search { .. } => MockCall::Search,
            Self::FetchSearch { .. } => MockCall::FetchSearch,
            Self::ListSearches { .. } => MockCall::ListSearches,
        }
    }
}

#[derive(Debug)]
struct MockState {
    next_search_id: SearchId,
    results_per_search: usize,
    server_path: Option<String>,
    cloudinary_url: Option<String>,
    searches: HashMap<SearchId, SearchResponse>,
    order: Vec<SearchId>,
    failures: HashMap<MockCall, VecDeque<SnapError>>,
    log: Vec<Operation>,
}

/// Mock image-search server.
#[derive(Debug)]
pub struct MockSearchApi {
    state: Mutex<MockState>,
}

impl Default for MockSearchApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSearchApi {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_search_id: 1,
                results_per_search: 3,
                server_path: None,
                cloudinary_url: None,
                searches: HashMap::new(),
                order: Vec::new(),
                failures: HashMap::new(),
                log: Vec::new(),
            }),
        }
    }

    // === Configuration ===

    /// Id assigned to the next search.
    #[must_use]
    pub fn with_next_search_id(self, id: SearchId) -> Self {
        self.lock().next_search_id = id;
        self
    }

    /// Number of result items each search returns.
    #[must_use]
    pub fn with_results_per_search(self, count: usize) -> Self {
        self.lock().results_per_search = count;
        self
    }

    /// Fixed server path returned by uploads instead of one derived from
    /// the file name.
    #[must_use]
    pub fn with_server_path(self, path: impl Into<String>) -> Self {
        self.lock().server_path = Some(path.into());
        self
    }

    /// Pretend the server stores images on a cloud backend.
    #[must_use]
    pub fn with_cloudinary_url(self, url: impl Into<String>) -> Self {
        self.lock().cloudinary_url = Some(url.into());
        self
    }

    /// Make the next call of `call` fail with `error`. Failures queue up.
    pub fn fail_next(&self, call: MockCall, error: SnapError) {
        self.lock().failures.entry(call).or_default().push_back(error);
    }

    // === Assertions ===

    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().log.clone()
    }

    /// Calls in order, without arguments.
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().log.iter().map(Operation::call).collect()
    }

    #[must_use]
    pub fn call_count(&self, call: MockCall) -> usize {
        self.lock().log.iter().filter(|op| op.call() == call).count()
    }

    // === Internal Helpers ===

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn begin(&self, op: Operation) -> Result<std::sync::MutexGuard<'_, MockState>> {
        trace!(?op, "Mock call");
        let mut state = self.lock();
        let call = op.call();
        state.log.push(op);
        if let Some(error) = state.failures.get_mut(&call).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        Ok(state)
    }
}

fn make_results(search_id: SearchId, count: usize) -> Vec<SearchResultItem> {
    (0..count)
        .map(|i| {
            let n = i64::try_from(i).unwrap_or(i64::MAX);
            SearchResultItem {
                id: search_id * 1000 + n,
                search_id,
                title: Some(format!("Product {}", i + 1)),
                link: Some(format!("https://shop.example.com/p/{search_id}-{i}")),
                image_url: Some(format!("https://img.example.com/{search_id}-{i}.jpg")),
                price: Some(format!("${}.99", 10 + i)),
                brand: Some("Acme".to_string()),
                source: Some("example".to_string()),
                description: None,
                rating: None,
                reviews_count: None,
            }
        })
        .collect()
}

#[async_trait]
impl SearchApi for MockSearchApi {
    async fn upload(&self, image: &LocalImageRef) -> Result<UploadRecord> {
        let state = self.begin(Operation::Upload {
            image: image.clone(),
        })?;
        let image_path = state
            .server_path
            .clone()
            .unwrap_or_else(|| format!("app/static/uploads/{}", image.file_name()));
        Ok(UploadRecord {
            image_path,
            cloudinary_public_id: state.cloudinary_url.as_ref().map(|_| image.file_name()),
            cloudinary_url: state.cloudinary_url.clone(),
            message: "Image uploaded successfully".to_string(),
        })
    }

    async fn clip(&self, params: &ClipParams) -> Result<ClipRecord> {
        let _state = self.begin(Operation::Clip {
            params: params.clone(),
        })?;
        let clipped = match params.image_path.rsplit_once('.') {
            Some((stem, ext)) => format!("{stem}_clip.{ext}"),
            None => format!("{}_clip", params.image_path),
        };
        Ok(ClipRecord {
            image_path: clipped,
            original_image_path: params.image_path.clone(),
            cloudinary_public_id: None,
            cloudinary_url: None,
            original_cloudinary_public_id: params.cloudinary_public_id.clone(),
            original_cloudinary_url: None,
            message: "Image clipped successfully".to_string(),
        })
    }

    async fn search(&self, params: &SearchParams) -> Result<SearchResponse> {
        let mut state = self.begin(Operation::Search {
            params: params.clone(),
        })?;
        let search_id = state.next_search_id;
        state.next_search_id += 1;

        let results = make_results(search_id, state.results_per_search);
        let response = SearchResponse {
            search_id,
            search_time: chrono::Utc::now().to_rfc3339(),
            image_path: params.image_path.clone(),
            original_image_path: params.original_image_path.clone(),
            is_clipped: params.is_clipped,
            cloudinary_public_id: params.cloudinary_public_id.clone(),
            cloudinary_url: params.cloudinary_url.clone(),
            original_cloudinary_public_id: params.original_cloudinary_public_id.clone(),
            original_cloudinary_url: params.original_cloudinary_url.clone(),
            total_results: results.len(),
            results,
        };
        state.searches.insert(search_id, response.clone());
        state.order.push(search_id);
        Ok(response)
    }

    async fn fetch_search(&self, search_id: SearchId) -> Result<SearchResponse> {
        let state = self.begin(Operation::FetchSearch { search_id })?;
        state
            .searches
            .get(&search_id)
            .cloned()
            .ok_or(SnapError::NotFound { search_id })
    }

    async fn list_searches(&self, limit: u32) -> Result<SearchList> {
        let state = self.begin(Operation::ListSearches { limit })?;
        let searches: Vec<SearchSummary> = state
            .order
            .iter()
            .rev()
            .take(limit as usize)
            .filter_map(|id| state.searches.get(id))
            .map(|s| SearchSummary {
                id: s.search_id,
                image_path: s.image_path.clone(),
                original_image_path: s.original_image_path.clone(),
                is_clipped: s.is_clipped,
                search_time: s.search_time.clone(),
                cloudinary_public_id: s.cloudinary_public_id.clone(),
                cloudinary_url: s.cloudinary_url.clone(),
                original_cloudinary_public_id: s.original_cloudinary_public_id.clone(),
                original_cloudinary_url: s.original_cloudinary_url.clone(),
            })
            .collect();
        Ok(SearchList {
            total: state.order.len() as u64,
            page: 1,
            page_size: limit,
            searches,
        })
    }
}
