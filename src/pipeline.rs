//! Upload → search → record pipeline.
//!
//! Given a local image, the pipeline uploads it, runs a similarity search on
//! the uploaded copy, and records the attempt in the ledger. Steps run
//! strictly in order with no retry; the first failure ends the run. The
//! ledger is written only after both remote calls succeed.

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::api::{ClipParams, LocalImageRef, SearchApi, SearchHandle, SearchId, SearchParams};
use crate::error::{ErrorKind, Result, SnapError};
use crate::image_ops::CropRegion;
use crate::ledger::{Ledger, LedgerEntry};
use crate::state::{FlowState, FlowTracker};

/// Terminal result of one pipeline run.
#[derive(Debug)]
pub enum PipelineOutcome {
    Succeeded(SearchHandle),
    Failed(SnapError),
}

impl PipelineOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    pub const fn search_id(&self) -> Option<SearchId> {
        match self {
            Self::Succeeded(handle) => Some(handle.search_id),
            Self::Failed(_) => None,
        }
    }

    /// Failure class, if the run failed.
    pub const fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Succeeded(_) => None,
            Self::Failed(e) => Some(e.kind()),
        }
    }

    pub fn into_result(self) -> Result<SearchHandle> {
        match self {
            Self::Succeeded(handle) => Ok(handle),
            Self::Failed(e) => Err(e),
        }
    }
}

/// Serializable summary for robot output.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_id: Option<SearchId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&PipelineOutcome> for PipelineReport {
    fn from(outcome: &PipelineOutcome) -> Self {
        match outcome {
            PipelineOutcome::Succeeded(h) => Self {
                ok: true,
                search_id: Some(h.search_id),
                error_kind: None,
                message: None,
            },
            PipelineOutcome::Failed(e) => Self {
                ok: false,
                search_id: None,
                error_kind: Some(e.kind()),
                message: Some(e.to_string()),
            },
        }
    }
}

/// Drives one image through the remote API and into the ledger.
pub struct Pipeline<'a> {
    api: &'a dyn SearchApi,
    ledger: &'a Ledger,
}

impl<'a> Pipeline<'a> {
    pub fn new(api: &'a dyn SearchApi, ledger: &'a Ledger) -> Self {
        Self { api, ledger }
    }

    /// Upload `image`, search on it, and record the result.
    #[instrument(skip(self, tracker), fields(image = %image))]
    pub async fn run(&self, image: &LocalImageRef, tracker: &mut FlowTracker) -> PipelineOutcome {
        self.finish(self.execute(image, None, tracker).await, tracker)
    }

    /// Like [`run`](Self::run), but clips the uploaded image to `region` on
    /// the server and searches the clip.
    #[instrument(skip(self, tracker), fields(image = %image, %region))]
    pub async fn run_clipped(
        &self,
        image: &LocalImageRef,
        region: CropRegion,
        tracker: &mut FlowTracker,
    ) -> PipelineOutcome {
        self.finish(self.execute(image, Some(region), tracker).await, tracker)
    }

    fn finish(&self, result: Result<SearchHandle>, tracker: &mut FlowTracker) -> PipelineOutcome {
        match result {
            Ok(handle) => {
                info!(search_id = handle.search_id, "Pipeline succeeded");
                PipelineOutcome::Succeeded(handle)
            }
            Err(e) => {
                warn!(error = %e, kind = ?e.kind(), "Pipeline failed");
                tracker.fail(&e);
                PipelineOutcome::Failed(e)
            }
        }
    }

    async fn execute(
        &self,
        image: &LocalImageRef,
        clip: Option<CropRegion>,
        tracker: &mut FlowTracker,
    ) -> Result<SearchHandle> {
        tracker.begin()?;
        tracker.advance(FlowState::Uploading {
            image: image.clone(),
        })?;
        let upload = self.api.upload(image).await?;

        let params = match clip {
            None => SearchParams::from_upload(&upload),
            Some(region) => {
                tracker.advance(FlowState::Clipping {
                    image_path: upload.image_path.clone(),
                })?;
                let clipped = self
                    .api
                    .clip(&ClipParams {
                        image_path: upload.image_path.clone(),
                        x: region.x,
                        y: region.y,
                        width: region.width,
                        height: region.height,
                        cloudinary_public_id: upload.cloudinary_public_id.clone(),
                    })
                    .await?;
                SearchParams::from_clip(&clipped)
            }
        };

        tracker.advance(FlowState::Searching {
            image_path: params.image_path.clone(),
        })?;
        let search = self.api.search(&params).await?;
        let handle = search.handle();

        tracker.advance(FlowState::Recording {
            search_id: handle.search_id,
        })?;
        let entry = LedgerEntry::new(image.clone())
            .with_server_path(upload.image_path)
            .with_search_id(handle.search_id);
        self.ledger.append(entry).await?;

        tracker.advance(FlowState::Succeeded {
            search_id: handle.search_id,
        })?;
        Ok(handle)
    }
}
