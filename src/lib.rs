//! # Illustra
//!
//! Category-driven image resolution and delivery for device-management UIs.
//! Callers describe *what* they want to show (a device, a place, a person, a
//! pairing step...) and illustra decides *which* image that is and delivers it
//! to a render target without ever blocking the caller.
//!
//! # Architecture: Resolve, Then Render
//!
//! ```text
//! RequestDescriptor ─► RenderPipeline::submit ─► worker: CategoryResolver::resolve ─┐
//!                              │                        │                           │
//!                              │                 ExistenceCache ─► Prober (HTTP)   │
//!                              │                 ImageStore, WallpaperAssignments   │
//!                              ▼                                                    ▼
//!                   PendingRequestRegistry ◄──── RenderLoop (single consumer) ◄─ completions
//!                                                        │
//!                                                        ▼
//!                                                   RenderSink
//! ```
//!
//! 1. **Resolve**: each [`ImageCategory`](types::ImageCategory) has a fixed
//!    fallback chain. The first candidate that is available wins: a user
//!    photo from the local store, a server illustration that is known to
//!    exist, or a stock image embedded in the application.
//! 2. **Render**: the result is handed to the target unless a newer request
//!    for the same target was submitted in the meantime. Last submission wins.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Categories, hints, locations, request and target ids |
//! | [`naming`] | Remote URL template, identifier sanitizing, local store file names |
//! | [`resources`] | Embedded stock images: avatars, pets, category icons, wallpaper palette |
//! | [`existence`] | Process-lifetime cache of HTTP existence probes |
//! | [`store`] | Local user photo store |
//! | [`wallpaper`] | Sticky default wallpaper per place, persisted as JSON |
//! | [`resolve`] | The per-category fallback chains |
//! | [`request`] | Immutable request descriptors and their builder |
//! | [`transform`] | Named bitmap transforms (blur, overlay, rotate, crop) |
//! | [`pipeline`] | Worker pool, staleness registry, render loop, pipeline events |
//! | [`sink`] | Bitmap render sink |
//! | [`capture`] | Capture → save → re-render chain for user photos |
//! | [`config`] | `illustra.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Staleness Is Decided at the Render Boundary
//!
//! Resolution may block on a network probe and cannot be interrupted. Rather
//! than cancel work, the pipeline lets every resolution finish and has the
//! single render loop compare the completion against the latest request id
//! recorded for its target. Stale results are dropped without a trace in the
//! target.
//!
//! ## Fail Closed, Once
//!
//! A product illustration is used only if the server answers `200 OK`. Any
//! other answer, including a timeout, is cached as "missing" for the life of
//! the process and the generic device-type drawing is shown instead.
//!
//! ## No Globals
//!
//! The existence cache, the registry, the store and the wallpaper map are all
//! constructor-injected. Two pipelines in one process share nothing unless
//! they are given the same `Arc`s.

pub mod capture;
pub mod config;
pub mod existence;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod request;
pub mod resolve;
pub mod resources;
pub mod sink;
pub mod store;
pub mod transform;
pub mod types;
pub mod wallpaper;

#[cfg(test)]
pub(crate) mod test_helpers;
