//! In-memory bitmap render sink.
//!
//! [`BitmapSink`] plays the part of a view hierarchy: each target holds the
//! last frame rendered into it and, for local files, the decoded bitmap with
//! the frame's transforms applied. Remote, resource and content locations are
//! kept as frames only; fetching and decoding those is the embedder's job.
//!
//! Decoded files are cached by path, untransformed, and shared by every
//! target that shows them. A frame with `invalidate_cache` set decodes its
//! file again, which is how a photo rewritten in place becomes visible.

use crate::pipeline::{RenderError, RenderFrame, RenderSink};
use crate::transform::{self, TransformError};
use crate::types::{Locator, RequestId, TargetId};
use image::DynamicImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to load image: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// A render failure as seen by the sink.
#[derive(Debug)]
pub struct SinkFailure {
    pub request: RequestId,
    pub target: TargetId,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct BitmapSink {
    frames: HashMap<TargetId, RenderFrame>,
    bitmaps: HashMap<TargetId, DynamicImage>,
    decoded: HashMap<PathBuf, DynamicImage>,
    failures: Vec<SinkFailure>,
}

impl BitmapSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last frame rendered into `target`.
    pub fn frame(&self, target: &TargetId) -> Option<&RenderFrame> {
        self.frames.get(target)
    }

    /// The bitmap held by `target`, if its last location was a local file.
    pub fn bitmap(&self, target: &TargetId) -> Option<&DynamicImage> {
        self.bitmaps.get(target)
    }

    pub fn failures(&self) -> &[SinkFailure] {
        &self.failures
    }

    pub fn targets(&self) -> impl Iterator<Item = &TargetId> {
        self.frames.keys()
    }

    /// Number of decoded files held in the cache.
    pub fn cached_files(&self) -> usize {
        self.decoded.len()
    }

    fn load_cached(
        &mut self,
        path: &Path,
        transforms: &[transform::Transform],
        invalidate: bool,
    ) -> Result<DynamicImage, SinkError> {
        if invalidate {
            self.decoded.remove(path);
        }
        let image = match self.decoded.get(path) {
            Some(image) => image.clone(),
            None => {
                let image = image::open(path)?;
                self.decoded.insert(path.to_path_buf(), image.clone());
                image
            }
        };
        Ok(transform::apply(image, transforms)?)
    }

    fn record_failure(&mut self, request: RequestId, target: &TargetId, message: String) {
        self.failures.push(SinkFailure {
            request,
            target: target.clone(),
            message,
        });
    }
}

impl RenderSink for BitmapSink {
    fn render(&mut self, frame: RenderFrame) {
        match &frame.location.locator {
            Locator::LocalFile(path) => match self.load_cached(path, &frame.transforms, frame.invalidate_cache) {
                Ok(bitmap) => {
                    self.bitmaps.insert(frame.target.clone(), bitmap);
                }
                Err(e) => {
                    self.bitmaps.remove(&frame.target);
                    self.record_failure(frame.request, &frame.target, e.to_string());
                }
            },
            Locator::Resource(_) | Locator::Remote(_) | Locator::Content(_) => {
                self.bitmaps.remove(&frame.target);
            }
        }

        self.frames.insert(frame.target.clone(), frame);
    }

    fn fail(&mut self, request: RequestId, target: &TargetId, error: RenderError) {
        self.record_failure(request, target, error.to_string());
    }
}
