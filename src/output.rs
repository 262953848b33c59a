//! CLI output formatting.
//!
//! # Request-First Display
//!
//! Every pipeline line leads with the request id and its target, so the
//! interleaved output of concurrent requests can still be read per request.
//! Locations and errors follow as indented context lines.
//!
//! ```text
//! #1 header  submitted (place)
//! #2 header  submitted (place)
//!     supersedes #1
//! probe https://assets.example.com/o/products/hue/product_large-and-xxhdpi.png: missing
//! #1 header  resolved
//!     Location: res:0x7f080301
//! #2 header  resolved
//!     Location: file:.illustra/images/place-home.png (user photo)
//! #1 header  discarded (superseded)
//! #2 header  rendered
//!     Location: file:.illustra/images/place-home.png (user photo)
//!
//! 1 rendered, 1 discarded
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::pipeline::{PipelineEvent, RenderSummary};
use crate::types::{LocationSpec, RequestId, TargetId};

// ============================================================================
// Shared helpers
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `#3 header  rendered`
fn request_header(request: RequestId, target: &TargetId, status: &str) -> String {
    format!("{request} {target}  {status}")
}

fn location_line(location: &LocationSpec) -> String {
    format!("{}Location: {location}", indent(1))
}

// ============================================================================
// Pipeline events
// ============================================================================

/// Format a single pipeline event as display lines.
pub fn format_pipeline_event(event: &PipelineEvent) -> Vec<String> {
    match event {
        PipelineEvent::Submitted {
            request,
            target,
            category,
        } => vec![request_header(*request, target, &format!("submitted ({category})"))],
        PipelineEvent::Superseded {
            request,
            target,
            by: Some(newer),
        } => vec![format!("{}{newer} {target}  supersedes {request}", indent(1))],
        PipelineEvent::Superseded {
            request,
            target,
            by: None,
        } => vec![request_header(*request, target, "superseded")],
        PipelineEvent::Resolved {
            request,
            target,
            location,
        } => {
            let mut lines = vec![request_header(*request, target, "resolved")];
            match location {
                Some(location) => lines.push(location_line(location)),
                None => lines.push(format!("{}Location: none", indent(1))),
            }
            lines
        }
        PipelineEvent::ResolveFailed {
            request,
            target,
            error,
        } => vec![
            request_header(*request, target, "resolve failed"),
            format!("{}Error: {error}", indent(1)),
        ],
        PipelineEvent::Discarded { request, target } => {
            vec![request_header(*request, target, "discarded (superseded)")]
        }
        PipelineEvent::Rendered {
            request,
            target,
            location,
            fallback,
        } => {
            let status = if *fallback {
                "rendered (fallback)"
            } else {
                "rendered"
            };
            vec![request_header(*request, target, status), location_line(location)]
        }
        PipelineEvent::RenderFailed {
            request,
            target,
            error,
        } => vec![
            request_header(*request, target, "failed"),
            format!("{}Error: {error}", indent(1)),
        ],
        PipelineEvent::Probed { url, exists, error } => {
            let answer = if *exists { "exists" } else { "missing" };
            match error {
                Some(e) => vec![format!("probe {url}: {answer} ({e})")],
                None => vec![format!("probe {url}: {answer}")],
            }
        }
        PipelineEvent::CaptureFinished { target, outcome } => {
            vec![format!("capture {target}: {outcome}")]
        }
        PipelineEvent::WallpaperNotSaved { place, error } => {
            vec![format!("wallpaper for {place} not saved: {error}")]
        }
    }
}

pub fn print_pipeline_event(event: &PipelineEvent) {
    for line in format_pipeline_event(event) {
        println!("{}", line);
    }
}

// ============================================================================
// Command results
// ============================================================================

/// Format the result of a direct resolution.
pub fn format_resolution(location: Option<&LocationSpec>) -> Vec<String> {
    match location {
        Some(location) => {
            let origin = if location.is_user_generated {
                "user photo"
            } else {
                "stock"
            };
            vec![location.locator.to_string(), format!("{}Origin: {origin}", indent(1))]
        }
        None => vec!["no location".to_string()],
    }
}

pub fn print_resolution(location: Option<&LocationSpec>) {
    for line in format_resolution(location) {
        println!("{}", line);
    }
}

/// Blank separator, then the summary line.
pub fn format_render_summary(summary: &RenderSummary) -> Vec<String> {
    vec![String::new(), summary.to_string()]
}

pub fn print_render_summary(summary: &RenderSummary) {
    for line in format_render_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
