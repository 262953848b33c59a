//! End-to-end tests through the public API: resolution, staleness, the
//! capture chain and the bitmap sink working together.

use illustra::capture::{Capture, CaptureError, CaptureOutcome, CaptureSaveChain};
use illustra::existence::{ExistenceCache, ProbeError, Prober};
use illustra::pipeline::{PipelineEvent, RenderLoop, RenderPipeline, RequestOutcome};
use illustra::request::RequestDescriptor;
use illustra::resolve::{CategoryResolver, StaticBaseUrl};
use illustra::resources::WALLPAPER_PALETTE;
use illustra::sink::BitmapSink;
use illustra::store::DiskStore;
use illustra::transform::{Rotation, Transform};
use illustra::types::{DeviceRef, Hint, ImageCategory, LocationSpec, Locator, ResourceId, TargetId};
use illustra::wallpaper::WallpaperAssignments;
use image::{DynamicImage, Rgba, RgbaImage};
use std::path::Path;
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const BASE: &str = "https://assets.test";
const WAIT: Duration = Duration::from_secs(5);

/// Every probe blocks until `open` is called, then answers `exists`.
#[derive(Default)]
struct Gate {
    answer: Mutex<Option<bool>>,
    opened: Condvar,
    probes: Mutex<Vec<String>>,
}

impl Gate {
    fn open(&self, exists: bool) {
        *self.answer.lock().unwrap() = Some(exists);
        self.opened.notify_all();
    }
}

impl Prober for Gate {
    fn probe(&self, url: &str) -> Result<bool, ProbeError> {
        self.probes.lock().unwrap().push(url.to_string());
        let mut answer = self.answer.lock().unwrap();
        while answer.is_none() {
            answer = self.opened.wait(answer).unwrap();
        }
        Ok(answer.unwrap_or(false))
    }
}

fn resolver(dir: &Path, prober: Arc<dyn Prober>, wallpapers: WallpaperAssignments) -> CategoryResolver {
    CategoryResolver::new(
        Arc::new(DiskStore::new(dir.join("photos"))),
        Arc::new(ExistenceCache::new(prober)),
        Arc::new(StaticBaseUrl(Some(BASE.to_string()))),
        Arc::new(wallpapers),
        "xxhdpi",
    )
}

fn pipeline(dir: &Path, prober: Arc<dyn Prober>) -> (RenderPipeline, RenderLoop) {
    RenderPipeline::new(resolver(dir, prober, WallpaperAssignments::in_memory()), 4, None).unwrap()
}

fn lamp() -> Hint {
    Hint::Device(DeviceRef {
        device_id: "lamp".into(),
        place_id: Some("home".into()),
        product_id: Some("Hue 2100".into()),
        device_type: Some("bulb".into()),
    })
}

fn photo(w: u32, h: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([90, 120, 200, 255])))
}

#[test]
fn stale_device_image_never_reaches_the_target() {
    let tmp = TempDir::new().unwrap();
    let gate = Arc::new(Gate::default());
    let (pipeline, mut render_loop) = pipeline(tmp.path(), gate.clone());
    let mut sink = BitmapSink::new();
    let target = TargetId::from("tile");

    let a = pipeline.submit(RequestDescriptor::builder(ImageCategory::DeviceLarge, lamp(), "tile").build());
    let b = pipeline.submit(
        RequestDescriptor::builder(ImageCategory::Drawable, Hint::Resource(0x7f02_0001), "tile").build(),
    );

    assert_eq!(render_loop.next(&mut sink, WAIT), Some((b, RequestOutcome::Rendered)));
    gate.open(true);
    assert_eq!(render_loop.next(&mut sink, WAIT), Some((a, RequestOutcome::Discarded)));

    let frame = sink.frame(&target).unwrap();
    assert_eq!(frame.request, b);
    assert_eq!(frame.location, LocationSpec::resource(ResourceId(0x7f02_0001)));
    assert!(pipeline.registry().is_empty());
}

#[test]
fn product_image_is_probed_once_across_requests() {
    let tmp = TempDir::new().unwrap();
    let gate = Arc::new(Gate::default());
    gate.open(true);
    let (pipeline, render_loop) = pipeline(tmp.path(), gate.clone());

    for target in ["a", "b", "c"] {
        pipeline.submit(RequestDescriptor::builder(ImageCategory::Product, lamp(), target).build());
    }
    drop(pipeline);
    let mut sink = BitmapSink::new();
    let summary = render_loop.run(&mut sink);

    assert_eq!(summary.rendered, 3);
    let expected = format!("{BASE}/o/products/hue2100/product_large-and-xxhdpi.png");
    for target in ["a", "b", "c"] {
        assert_eq!(
            sink.frame(&TargetId::from(target)).unwrap().location,
            LocationSpec::remote(expected.clone())
        );
    }
    // Concurrent first lookups may race, but never more than one probe per worker
    let probes = gate.probes.lock().unwrap();
    assert!(!probes.is_empty() && probes.len() <= 3);
    assert!(probes.iter().all(|u| *u == expected));
}

#[test]
fn captured_photo_is_saved_rendered_and_preferred_afterwards() {
    let tmp = TempDir::new().unwrap();
    let gate = Arc::new(Gate::default());
    gate.open(false);
    let (pipeline, mut render_loop) = pipeline(tmp.path(), gate);
    let pipeline = Arc::new(pipeline);
    let store = Arc::new(DiskStore::new(tmp.path().join("photos")));
    let (done_tx, done_rx) = mpsc::channel();

    let request = RequestDescriptor::builder(ImageCategory::DeviceLarge, lamp(), "tile")
        .user_transform(Transform::Rotate(Rotation::Deg90))
        .build();
    CaptureSaveChain::new(store, request.clone()).run(
        Arc::clone(&pipeline),
        || -> Result<Capture, CaptureError> { Ok(Capture::Photo(photo(6, 2))) },
        move |outcome| {
            let _ = done_tx.send(outcome);
        },
    );

    let outcome = done_rx.recv_timeout(WAIT).unwrap();
    let CaptureOutcome::Saved { path, request: pinned } = outcome else {
        panic!("capture did not save");
    };
    assert_eq!(path, tmp.path().join("photos/device_large-home-lamp.png"));

    let mut sink = BitmapSink::new();
    assert_eq!(render_loop.next(&mut sink, WAIT), Some((pinned, RequestOutcome::Rendered)));
    let target = TargetId::from("tile");
    let bitmap = sink.bitmap(&target).unwrap();
    assert_eq!((bitmap.width(), bitmap.height()), (2, 6));
    assert!(sink.frame(&target).unwrap().invalidate_cache);

    // A fresh request now finds the photo on its own
    let again = pipeline.submit(request);
    assert_eq!(render_loop.next(&mut sink, WAIT), Some((again, RequestOutcome::Rendered)));
    let frame = sink.frame(&target).unwrap();
    assert_eq!(frame.location, LocationSpec::user_generated(Locator::LocalFile(path)));
    assert_eq!(frame.transforms, vec![Transform::Rotate(Rotation::Deg90)]);
}

#[test]
fn cancelled_capture_leaves_target_untouched() {
    let tmp = TempDir::new().unwrap();
    let (tx, rx) = mpsc::channel();
    let gate: Arc<dyn Prober> = Arc::new(Gate::default());
    let (pipeline, render_loop) = RenderPipeline::new(
        resolver(tmp.path(), gate, WallpaperAssignments::in_memory()),
        1,
        Some(tx),
    )
    .unwrap();
    let store = Arc::new(DiskStore::new(tmp.path().join("photos")));
    let request = RequestDescriptor::builder(ImageCategory::Place, Hint::Place("home".into()), "header").build();

    let mut cancel = || -> Result<Capture, CaptureError> { Ok(Capture::Cancelled) };
    let outcome = CaptureSaveChain::new(store, request).execute(&pipeline, &mut cancel);
    assert!(matches!(outcome, CaptureOutcome::Cancelled));

    drop(pipeline);
    let mut sink = BitmapSink::new();
    assert_eq!(render_loop.run(&mut sink).total(), 0);
    assert!(sink.frame(&TargetId::from("header")).is_none());

    let events: Vec<_> = rx.iter().collect();
    assert_eq!(
        events,
        vec![PipelineEvent::CaptureFinished {
            target: TargetId::from("header"),
            outcome: "cancelled".into(),
        }]
    );
}

#[test]
fn wallpapers_stay_with_their_place_across_restarts() {
    let tmp = TempDir::new().unwrap();
    let state = tmp.path().join("wallpapers.json");
    let place = |id: &str| Hint::Place(id.to_string());

    let first = resolver(tmp.path(), Arc::new(Gate::default()), WallpaperAssignments::load(&state));
    for id in ["a", "b", "c"] {
        first.resolve(ImageCategory::Place, &place(id), false).unwrap();
    }
    drop(first);

    let second = resolver(tmp.path(), Arc::new(Gate::default()), WallpaperAssignments::load(&state));
    assert_eq!(
        second.resolve(ImageCategory::Place, &place("b"), false).unwrap(),
        Some(LocationSpec::resource(WALLPAPER_PALETTE[1].resource))
    );
    assert_eq!(
        second.resolve(ImageCategory::Place, &place("d"), false).unwrap(),
        Some(LocationSpec::resource(WALLPAPER_PALETTE[3].resource))
    );
}
