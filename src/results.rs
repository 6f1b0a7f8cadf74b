//! Read-side views: one search's results and the local upload history.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::api::{LocalImageRef, SearchApi, SearchId, SearchResponse, SearchResultItem};
use crate::error::{Result, SnapError};
use crate::ledger::{Ledger, LedgerEntry};

/// Title shown for items the server returned without one.
pub const FALLBACK_TITLE: &str = "Item";

/// Image shown above the results: the cloud copy, else the server path when
/// it is already a web URL.
pub fn header_image(response: &SearchResponse) -> Option<String> {
    response.cloudinary_url.clone().or_else(|| {
        let path = &response.image_path;
        (path.starts_with("http://") || path.starts_with("https://")).then(|| path.clone())
    })
}

/// "1 Result", "3 Results".
pub fn count_label(count: usize) -> String {
    if count == 1 {
        "1 Result".to_string()
    } else {
        format!("{count} Results")
    }
}

/// One rendered product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultCard {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

impl From<&SearchResultItem> for ResultCard {
    fn from(item: &SearchResultItem) -> Self {
        Self {
            title: item
                .title
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(FALLBACK_TITLE)
                .to_string(),
            price: item.price.clone(),
            brand: item.brand.clone(),
            link: item.link.clone(),
            image_url: item.image_url.clone(),
            rating: item.rating,
        }
    }
}

/// Everything the results screen shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsView {
    pub search_id: SearchId,
    pub search_time: String,
    pub is_clipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_image: Option<String>,
    pub count: usize,
    pub count_label: String,
    pub items: Vec<ResultCard>,
}

impl ResultsView {
    pub fn from_response(response: &SearchResponse) -> Self {
        let items: Vec<ResultCard> = response.results.iter().map(ResultCard::from).collect();
        Self {
            search_id: response.search_id,
            search_time: response.search_time.clone(),
            is_clipped: response.is_clipped,
            header_image: header_image(response),
            count: items.len(),
            count_label: count_label(items.len()),
            items,
        }
    }
}

/// Fetch a stored search and build its view.
#[instrument(skip(api))]
pub async fn load_results(api: &dyn SearchApi, search_id: SearchId) -> Result<ResultsView> {
    let response = api.fetch_search(search_id).await?;
    debug!(
        returned = response.results.len(),
        total = response.total_results,
        "Fetched search"
    );
    Ok(ResultsView::from_response(&response))
}

/// One row of the upload history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadRow {
    /// Calendar date, e.g. `Sat Mar 01 2025`.
    pub date: String,
    pub uri: LocalImageRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_id: Option<SearchId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_path: Option<String>,
}

impl From<&LedgerEntry> for UploadRow {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            date: entry.date.format("%a %b %d %Y").to_string(),
            uri: entry.uri.clone(),
            search_id: entry.search_id,
            server_path: entry.server_path.clone(),
        }
    }
}

/// The "My Uploads" screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadsView {
    pub total: usize,
    pub rows: Vec<UploadRow>,
    /// Search opened by "View Results".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_search_id: Option<SearchId>,
}

impl UploadsView {
    /// Build from newest-first entries, showing at most `limit` rows.
    pub fn from_entries(entries: &[LedgerEntry], limit: usize) -> Self {
        Self {
            total: entries.len(),
            rows: entries.iter().take(limit).map(UploadRow::from).collect(),
            latest_search_id: entries.first().and_then(|e| e.search_id),
        }
    }
}

/// Search id of the newest ledger entry.
///
/// # Errors
///
/// `Other` when the ledger is empty or its newest entry has no search id.
pub async fn latest_search_id(ledger: &Ledger) -> Result<SearchId> {
    let latest = ledger
        .latest()
        .await?
        .ok_or_else(|| SnapError::Other("No uploads recorded yet".to_string()))?;
    latest.search_id.ok_or_else(|| {
        SnapError::Other(format!("Latest upload {} has no search id", latest.uri))
    })
}
