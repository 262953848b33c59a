//! Shared test utilities for the illustra test suite.
//!
//! Scripted probers, a recording render sink, and a resolver wired to a temp
//! directory store.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let (resolver, prober) = fixture_resolver(tmp.path());
//! prober.set_result(&format!("{BASE}/o/products/hue/product_large-and-xxhdpi.png"), Ok(true));
//! touch_photo(tmp.path(), "place-home.png");
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use image::{DynamicImage, Rgba, RgbaImage};

use crate::existence::{ExistenceCache, ProbeError, Prober};
use crate::pipeline::{RenderError, RenderFrame, RenderSink};
use crate::resolve::{CategoryResolver, StaticBaseUrl};
use crate::store::DiskStore;
use crate::types::{RequestId, TargetId};
use crate::wallpaper::WallpaperAssignments;

/// Asset server base URL used by [`fixture_resolver`].
pub const BASE: &str = "https://assets.test";

// =========================================================================
// Probers
// =========================================================================

/// Prober answering from a script. Unknown URLs do not exist.
#[derive(Default)]
pub struct MockProber {
    results: Mutex<HashMap<String, Result<bool, String>>>,
    calls: Mutex<Vec<String>>,
}

impl MockProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(self, url: &str, result: Result<bool, ProbeError>) -> Self {
        self.set_result(url, result);
        self
    }

    pub fn set_result(&self, url: &str, result: Result<bool, ProbeError>) {
        self.results
            .lock()
            .unwrap()
            .insert(url.to_string(), result.map_err(|e| e.to_string()));
    }

    /// Number of probes issued for `url`.
    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Prober for MockProber {
    fn probe(&self, url: &str) -> Result<bool, ProbeError> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.results.lock().unwrap().get(url) {
            Some(Ok(exists)) => Ok(*exists),
            Some(Err(message)) => Err(ProbeError::Request(message.clone())),
            None => Ok(false),
        }
    }
}

/// Prober whose every probe blocks until the test releases it.
#[derive(Default)]
pub struct GatedProber {
    state: Mutex<GateState>,
    changed: Condvar,
}

#[derive(Default)]
struct GateState {
    answer: Option<bool>,
    started: usize,
}

impl GatedProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until at least one probe is in flight. Panics after `timeout`.
    pub fn wait_for_probe(&self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap();
        while state.started == 0 {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .unwrap_or_else(|| panic!("no probe started within {timeout:?}"));
            state = self.changed.wait_timeout(state, remaining).unwrap().0;
        }
    }

    /// Let every pending and future probe answer `exists`.
    pub fn release_all(&self, exists: bool) {
        self.state.lock().unwrap().answer = Some(exists);
        self.changed.notify_all();
    }
}

impl Prober for GatedProber {
    fn probe(&self, _url: &str) -> Result<bool, ProbeError> {
        let mut state = self.state.lock().unwrap();
        state.started += 1;
        self.changed.notify_all();
        loop {
            if let Some(exists) = state.answer {
                return Ok(exists);
            }
            state = self.changed.wait(state).unwrap();
        }
    }
}

// =========================================================================
// Resolver fixtures
// =========================================================================

/// Resolver over a [`DiskStore`] at `dir`, base URL [`BASE`], density
/// `xxhdpi`, a fresh [`MockProber`] and in-memory wallpapers.
pub fn fixture_resolver(dir: &Path) -> (CategoryResolver, Arc<MockProber>) {
    let prober = Arc::new(MockProber::new());
    let resolver = resolver_with(dir, Some(BASE), prober.clone(), WallpaperAssignments::in_memory());
    (resolver, prober)
}

pub fn resolver_with(
    dir: &Path,
    base_url: Option<&str>,
    prober: Arc<dyn Prober>,
    wallpapers: WallpaperAssignments,
) -> CategoryResolver {
    CategoryResolver::new(
        Arc::new(DiskStore::new(dir)),
        Arc::new(ExistenceCache::new(prober)),
        Arc::new(StaticBaseUrl(base_url.map(String::from))),
        Arc::new(wallpapers),
        "xxhdpi",
    )
}

/// Create an empty file named `name` in `dir`, standing in for a saved photo.
pub fn touch_photo(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"").unwrap();
    path
}

/// A `width`×`height` image filled with one color.
pub fn solid_image(width: u32, height: u32, rgba: [u8; 4]) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(rgba)))
}

// =========================================================================
// Sinks
// =========================================================================

/// Render sink that keeps everything it is given, in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub frames: Vec<RenderFrame>,
    pub failures: Vec<(RequestId, TargetId, String)>,
}

impl RenderSink for RecordingSink {
    fn render(&mut self, frame: RenderFrame) {
        self.frames.push(frame);
    }

    fn fail(&mut self, request: RequestId, target: &TargetId, error: RenderError) {
        self.failures.push((request, target.clone(), error.to_string()));
    }
}
