//! Capture → save → re-render chain for user photos.
//!
//! A [`CaptureSaveChain`] runs three stages in order and reports once:
//!
//! 1. acquire a bitmap from a [`PhotoSource`] (the user may cancel),
//! 2. save it to the [`ImageStore`] under the request's identity,
//! 3. resubmit the request pinned to the saved file, with cache
//!    invalidation so the target reloads.
//!
//! A failing stage ends the chain; later stages do not run. Cancellation is
//! not an error and ends the chain with [`CaptureOutcome::Cancelled`].
//! Requests that cannot show a user photo (stock-only categories, or user
//! photos suppressed) are rejected before the source is asked.
//!
//! The storage identity comes from the request's hint:
//!
//! | Hint | Saved as |
//! |---|---|
//! | `Device` with a place | `{category}-{place}-{device}.png` |
//! | `Pair(person, place)` | `person-{place}-{person}.png` (also for person backgrounds) |
//! | `Place(place)` | `place-{place}.png` |
//! | `SmartKey(key)` | `{category}-{key}.png` |

use crate::pipeline::{PipelineEvent, RenderPipeline};
use crate::request::RequestDescriptor;
use crate::store::{ImageStore, StoreError};
use crate::types::{Hint, ImageCategory, LocationSpec, Locator, RequestId, TargetId};
use image::DynamicImage;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("photo acquisition failed: {0}")]
    Acquire(String),
    #[error("{category} requests with a {hint} hint cannot hold a user photo")]
    Unsupported {
        category: ImageCategory,
        hint: &'static str,
    },
    #[error("request for {0} suppresses user photos")]
    UserPhotosSuppressed(TargetId),
    #[error("saving photo failed: {0}")]
    Store(#[from] StoreError),
}

/// What a photo source produced.
pub enum Capture {
    Photo(DynamicImage),
    Cancelled,
}

/// Camera, gallery picker, or anything else that yields one bitmap.
pub trait PhotoSource: Send {
    fn acquire(&mut self) -> Result<Capture, CaptureError>;
}

impl<F> PhotoSource for F
where
    F: FnMut() -> Result<Capture, CaptureError> + Send,
{
    fn acquire(&mut self) -> Result<Capture, CaptureError> {
        self()
    }
}

/// Terminal result of a chain.
#[derive(Debug)]
pub enum CaptureOutcome {
    /// Photo saved to `path`; `request` is the pinned re-render.
    Saved { path: PathBuf, request: RequestId },
    Cancelled,
    Failed(CaptureError),
}

impl fmt::Display for CaptureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureOutcome::Saved { path, request } => {
                write!(f, "saved {} ({request})", path.display())
            }
            CaptureOutcome::Cancelled => f.write_str("cancelled"),
            CaptureOutcome::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

pub struct CaptureSaveChain {
    store: Arc<dyn ImageStore>,
    request: RequestDescriptor,
}

impl CaptureSaveChain {
    /// A chain that stores its photo for `request` and then re-renders it.
    pub fn new(store: Arc<dyn ImageStore>, request: RequestDescriptor) -> Self {
        Self { store, request }
    }

    pub fn target(&self) -> &TargetId {
        self.request.target()
    }

    /// Run the chain on the pipeline's worker pool and hand the outcome to
    /// `on_done` from there.
    pub fn run<P, F>(self, pipeline: Arc<RenderPipeline>, mut source: P, on_done: F)
    where
        P: PhotoSource + 'static,
        F: FnOnce(CaptureOutcome) + Send + 'static,
    {
        let worker_pipeline = Arc::clone(&pipeline);
        pipeline.spawn(move || {
            let outcome = self.execute(&worker_pipeline, &mut source);
            on_done(outcome);
        });
    }

    /// Run the chain on the calling thread.
    pub fn execute(&self, pipeline: &RenderPipeline, source: &mut dyn PhotoSource) -> CaptureOutcome {
        let outcome = match self.save_and_submit(pipeline, source) {
            Ok(Some((path, request))) => CaptureOutcome::Saved { path, request },
            Ok(None) => CaptureOutcome::Cancelled,
            Err(e) => CaptureOutcome::Failed(e),
        };
        pipeline.emit(PipelineEvent::CaptureFinished {
            target: self.request.target().clone(),
            outcome: outcome.to_string(),
        });
        outcome
    }

    fn save_and_submit(
        &self,
        pipeline: &RenderPipeline,
        source: &mut dyn PhotoSource,
    ) -> Result<Option<(PathBuf, RequestId)>, CaptureError> {
        if self.request.suppress_user_generated() {
            return Err(CaptureError::UserPhotosSuppressed(self.request.target().clone()));
        }
        let (category, place_id, image_id) = storage_identity(self.request.category(), self.request.hint())?;

        let bitmap = match source.acquire()? {
            Capture::Photo(bitmap) => bitmap,
            Capture::Cancelled => return Ok(None),
        };

        let path = self
            .store
            .save(&bitmap, category, place_id, image_id)?;

        let pinned = self
            .request
            .with_pinned(LocationSpec::user_generated(Locator::LocalFile(path.clone())));
        let request = pipeline.submit(pinned);
        Ok(Some((path, request)))
    }
}

/// `(category, place id, image id)` a captured photo is stored under, matching
/// the names the resolver looks up.
pub fn storage_identity(
    category: ImageCategory,
    hint: &Hint,
) -> Result<(ImageCategory, Option<&str>, Option<&str>), CaptureError> {
    let unsupported = || CaptureError::Unsupported {
        category,
        hint: hint.shape(),
    };
    if !category.supports_user_imagery() {
        return Err(unsupported());
    }

    match (category, hint) {
        (
            ImageCategory::DeviceLarge | ImageCategory::DeviceSmall | ImageCategory::DeviceBackground,
            Hint::Device(device),
        ) => match device.place_id.as_deref() {
            Some(place_id) => Ok((category, Some(place_id), Some(device.device_id.as_str()))),
            None => Err(unsupported()),
        },
        (ImageCategory::Person | ImageCategory::PersonLarge, Hint::Pair(person_id, place_id)) => {
            Ok((category, Some(place_id.as_str()), Some(person_id.as_str())))
        }
        (ImageCategory::PersonBackground, Hint::Pair(person_id, place_id)) => Ok((
            ImageCategory::Person,
            Some(place_id.as_str()),
            Some(person_id.as_str()),
        )),
        (ImageCategory::Place, Hint::Place(place_id)) => Ok((category, Some(place_id.as_str()), None)),
        (ImageCategory::PetSmall | ImageCategory::PetLarge, Hint::SmartKey(key)) => {
            Ok((category, None, Some(key.as_str())))
        }
        _ => Err(unsupported()),
    }
}
