//! Asynchronous, two-phase image delivery.
//!
//! ## Phases
//!
//! ```text
//! caller ── submit ──► worker pool ── resolve ──► completion queue ──► render loop ──► sink
//!              │                                                          │
//!              └──── registry: target → latest request ◄── check & remove ┘
//! ```
//!
//! 1. [`RenderPipeline::submit`] records the request as the latest one for
//!    its target, schedules resolution on a rayon pool and returns at once.
//! 2. A worker runs [`CategoryResolver::resolve`], which may block on an
//!    existence probe, and posts the result to the completion queue.
//! 3. The [`RenderLoop`] (one thread, the caller's "UI thread") takes each
//!    completion and asks the [`PendingRequestRegistry`] whether it is still
//!    the latest request for its target. If it is, the entry is removed and a
//!    [`RenderFrame`] goes to the [`RenderSink`]. If not, the result is
//!    dropped silently.
//!
//! Per request: `Submitted → Resolving → Resolved → Rendering → Done`, or
//! `Submitted → Resolving → Discarded`.
//!
//! ## Last submission wins
//!
//! A slow request must never paint over a newer one for the same target.
//! Resolution cannot be aborted (a probe in flight runs to completion), so
//! staleness is decided at the render boundary only. Requests for different
//! targets are independent and may render in any order.
//!
//! ## Missing locations
//!
//! When resolution yields no location, the request's error image is shown,
//! else its placeholder. With neither, the sink receives
//! [`RenderError::NoFallbackAvailable`] for that request alone.

use crate::request::RequestDescriptor;
use crate::resolve::{CategoryResolver, ResolveError};
use crate::transform::Transform;
use crate::types::{ImageCategory, LocationSpec, RequestId, TargetId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("no location for target {target} and no placeholder or error image configured")]
    NoFallbackAvailable { target: TargetId },
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Progress events, for display or diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Submitted {
        request: RequestId,
        target: TargetId,
        category: ImageCategory,
    },
    /// `request` is no longer the latest for `target`.
    Superseded {
        request: RequestId,
        target: TargetId,
        by: Option<RequestId>,
    },
    Resolved {
        request: RequestId,
        target: TargetId,
        location: Option<LocationSpec>,
    },
    ResolveFailed {
        request: RequestId,
        target: TargetId,
        error: String,
    },
    Discarded {
        request: RequestId,
        target: TargetId,
    },
    Rendered {
        request: RequestId,
        target: TargetId,
        location: LocationSpec,
        fallback: bool,
    },
    RenderFailed {
        request: RequestId,
        target: TargetId,
        error: String,
    },
    Probed {
        url: String,
        exists: bool,
        error: Option<String>,
    },
    CaptureFinished {
        target: TargetId,
        outcome: String,
    },
    /// A new wallpaper assignment could not be written back. The wallpaper
    /// was still used.
    WallpaperNotSaved {
        place: String,
        error: String,
    },
}

/// What the sink is asked to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub request: RequestId,
    pub target: TargetId,
    pub location: LocationSpec,
    /// Ordered transforms: the request's common list plus its stock-only or
    /// user-only list, depending on `location.is_user_generated`.
    pub transforms: Vec<Transform>,
    /// Drop anything cached for this target before loading.
    pub invalidate_cache: bool,
    /// `location` is the request's error or placeholder image.
    pub fallback: bool,
}

/// Receiver of render results. Only ever called from the render loop.
pub trait RenderSink {
    fn render(&mut self, frame: RenderFrame);

    fn fail(&mut self, request: RequestId, target: &TargetId, error: RenderError);
}

/// How a completion was handled by the render loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Rendered,
    Discarded,
    Failed,
}

/// Counts of handled completions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    pub rendered: u32,
    pub discarded: u32,
    pub failed: u32,
}

impl RenderSummary {
    pub fn record(&mut self, outcome: RequestOutcome) {
        match outcome {
            RequestOutcome::Rendered => self.rendered += 1,
            RequestOutcome::Discarded => self.discarded += 1,
            RequestOutcome::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.rendered + self.discarded + self.failed
    }
}

impl fmt::Display for RenderSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rendered", self.rendered)?;
        if self.discarded > 0 {
            write!(f, ", {} discarded", self.discarded)?;
        }
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        Ok(())
    }
}

/// `target → latest request` map.
///
/// Writes on submit may come from any thread; the check-and-remove on
/// completion is a single locked operation, so a submit racing a completion
/// either lands before it (completion is stale) or after it (new entry).
#[derive(Debug, Default)]
pub struct PendingRequestRegistry {
    entries: Mutex<HashMap<TargetId, RequestId>>,
}

impl PendingRequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `request` the latest for `target`, returning the one it replaces.
    pub fn record(&self, target: TargetId, request: RequestId) -> Option<RequestId> {
        self.lock().insert(target, request)
    }

    pub fn current(&self, target: &TargetId) -> Option<RequestId> {
        self.lock().get(target).copied()
    }

    /// Remove the entry for `target` iff it is `request`. Returns whether it was.
    pub fn complete(&self, target: &TargetId, request: RequestId) -> bool {
        let mut entries = self.lock();
        if entries.get(target) == Some(&request) {
            entries.remove(target);
            true
        } else {
            false
        }
    }

    /// Forget the pending request for `target`; its result will be discarded.
    pub fn supersede(&self, target: &TargetId) -> Option<RequestId> {
        self.lock().remove(target)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TargetId, RequestId>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Completion {
    request: RequestId,
    descriptor: RequestDescriptor,
    outcome: Result<Option<LocationSpec>, ResolveError>,
}

/// Submission side of the pipeline. `Sync`: submit from any thread.
pub struct RenderPipeline {
    resolver: Arc<CategoryResolver>,
    registry: Arc<PendingRequestRegistry>,
    pool: rayon::ThreadPool,
    completions: Sender<Completion>,
    next_request: AtomicU64,
    events: Option<Sender<PipelineEvent>>,
}

impl RenderPipeline {
    /// Start a pipeline with `workers` resolution threads.
    ///
    /// Returns the pipeline and the render loop that must be driven from a
    /// single thread. [`RenderLoop::run`] returns once the pipeline is
    /// dropped and every in-flight request has been handled.
    pub fn new(
        resolver: CategoryResolver,
        workers: usize,
        events: Option<Sender<PipelineEvent>>,
    ) -> Result<(Self, RenderLoop), PipelineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("illustra-resolve-{i}"))
            .build()?;
        let registry = Arc::new(PendingRequestRegistry::new());
        let (tx, rx) = mpsc::channel();

        let pipeline = Self {
            resolver: Arc::new(resolver),
            registry: Arc::clone(&registry),
            pool,
            completions: tx,
            next_request: AtomicU64::new(1),
            events: events.clone(),
        };
        let render_loop = RenderLoop {
            completions: rx,
            registry,
            events,
        };
        Ok((pipeline, render_loop))
    }

    /// Queue `descriptor` for resolution and return its id immediately.
    pub fn submit(&self, descriptor: RequestDescriptor) -> RequestId {
        let request = RequestId(self.next_request.fetch_add(1, Ordering::Relaxed));
        let target = descriptor.target().clone();

        if let Some(previous) = self.registry.record(target.clone(), request) {
            self.emit(PipelineEvent::Superseded {
                request: previous,
                target: target.clone(),
                by: Some(request),
            });
        }
        self.emit(PipelineEvent::Submitted {
            request,
            target: target.clone(),
            category: descriptor.category(),
        });

        let resolver = Arc::clone(&self.resolver);
        let completions = self.completions.clone();
        let events = self.events.clone();
        self.pool.spawn(move || {
            let outcome = match descriptor.pinned() {
                Some(location) => Ok(Some(location.clone())),
                None => resolver.resolve(
                    descriptor.category(),
                    descriptor.hint(),
                    descriptor.suppress_user_generated(),
                ),
            };

            if let Some(events) = &events {
                let event = match &outcome {
                    Ok(location) => PipelineEvent::Resolved {
                        request,
                        target,
                        location: location.clone(),
                    },
                    Err(e) => PipelineEvent::ResolveFailed {
                        request,
                        target,
                        error: e.to_string(),
                    },
                };
                let _ = events.send(event);
            }

            // The render loop may be gone; nothing left to deliver to.
            let _ = completions.send(Completion {
                request,
                descriptor,
                outcome,
            });
        });

        request
    }

    /// Drop the pending request for `target` so its result is never rendered.
    pub fn supersede(&self, target: &TargetId) -> Option<RequestId> {
        let previous = self.registry.supersede(target);
        if let Some(request) = previous {
            self.emit(PipelineEvent::Superseded {
                request,
                target: target.clone(),
                by: None,
            });
        }
        previous
    }

    pub fn registry(&self) -> &PendingRequestRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &CategoryResolver {
        &self.resolver
    }

    /// Run `job` on the resolution pool.
    pub(crate) fn spawn(&self, job: impl FnOnce() + Send + 'static) {
        self.pool.spawn(job);
    }

    pub(crate) fn emit(&self, event: PipelineEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

/// Single-threaded consumer of resolution results.
pub struct RenderLoop {
    completions: Receiver<Completion>,
    registry: Arc<PendingRequestRegistry>,
    events: Option<Sender<PipelineEvent>>,
}

impl RenderLoop {
    /// Handle every completion already queued, without blocking.
    pub fn pump<S: RenderSink + ?Sized>(&mut self, sink: &mut S) -> RenderSummary {
        let mut summary = RenderSummary::default();
        while let Ok(completion) = self.completions.try_recv() {
            summary.record(self.handle(completion, sink));
        }
        summary
    }

    /// Wait up to `timeout` for the next completion and handle it.
    ///
    /// `None` if nothing arrived in time or the pipeline is gone.
    pub fn next<S: RenderSink + ?Sized>(
        &mut self,
        sink: &mut S,
        timeout: Duration,
    ) -> Option<(RequestId, RequestOutcome)> {
        match self.completions.recv_timeout(timeout) {
            Ok(completion) => {
                let request = completion.request;
                Some((request, self.handle(completion, sink)))
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Handle completions until none arrives for `idle`.
    pub fn run_until_idle<S: RenderSink + ?Sized>(&mut self, sink: &mut S, idle: Duration) -> RenderSummary {
        let mut summary = RenderSummary::default();
        while let Some((_, outcome)) = self.next(sink, idle) {
            summary.record(outcome);
        }
        summary
    }

    /// Handle completions until the pipeline is dropped and drained.
    pub fn run<S: RenderSink + ?Sized>(self, sink: &mut S) -> RenderSummary {
        let mut summary = RenderSummary::default();
        for completion in self.completions.iter() {
            summary.record(self.handle(completion, sink));
        }
        summary
    }

    fn handle<S: RenderSink + ?Sized>(&self, completion: Completion, sink: &mut S) -> RequestOutcome {
        let Completion {
            request,
            descriptor,
            outcome,
        } = completion;
        let target = descriptor.target().clone();

        if !self.registry.complete(&target, request) {
            self.emit(PipelineEvent::Discarded { request, target });
            return RequestOutcome::Discarded;
        }

        let frame = outcome
            .map_err(RenderError::from)
            .and_then(|location| build_frame(request, &descriptor, location));

        match frame {
            Ok(frame) => {
                self.emit(PipelineEvent::Rendered {
                    request,
                    target,
                    location: frame.location.clone(),
                    fallback: frame.fallback,
                });
                sink.render(frame);
                RequestOutcome::Rendered
            }
            Err(error) => {
                self.emit(PipelineEvent::RenderFailed {
                    request,
                    target: target.clone(),
                    error: error.to_string(),
                });
                sink.fail(request, &target, error);
                RequestOutcome::Failed
            }
        }
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

/// Turn a resolution result into a frame, substituting the request's error
/// image, then its placeholder, for a missing location.
pub fn build_frame(
    request: RequestId,
    descriptor: &RequestDescriptor,
    location: Option<LocationSpec>,
) -> Result<RenderFrame, RenderError> {
    let (location, fallback) = match location {
        Some(location) => (location, false),
        None => {
            let resource = descriptor
                .error_fallback()
                .or(descriptor.placeholder())
                .ok_or_else(|| RenderError::NoFallbackAvailable {
                    target: descriptor.target().clone(),
                })?;
            (LocationSpec::resource(resource), true)
        }
    };
    Ok(RenderFrame {
        request,
        target: descriptor.target().clone(),
        transforms: descriptor.transforms_for(location.is_user_generated),
        invalidate_cache: descriptor.invalidate_cache(),
        location,
        fallback,
    })
}
