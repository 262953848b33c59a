//! Deterministic default wallpapers for places without a user photo.
//!
//! Each place is given one of the six [`WALLPAPER_PALETTE`] images the first
//! time it is shown and keeps it forever after. New places cycle through the
//! palette in order: the n-th place ever assigned gets entry `n % 6`.
//!
//! The assignment map is persisted as JSON so a place keeps its wallpaper
//! across restarts:
//!
//! ```json
//! {
//!   "version": 1,
//!   "assignments": { "home": "wallpaper_dawn", "office": "wallpaper_forest" }
//! }
//! ```
//!
//! Persisting is best effort. A failed write never withholds the wallpaper;
//! it is reported as [`PipelineEvent::WallpaperNotSaved`] and the next new
//! assignment writes the whole map again.

use crate::pipeline::PipelineEvent;
use crate::resources::{WALLPAPER_PALETTE, Wallpaper, wallpaper_by_name};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

const FORMAT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum WallpaperError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AssignmentFile {
    version: u32,
    assignments: BTreeMap<String, String>,
}

/// Persisted `place id -> wallpaper name` map.
#[derive(Debug)]
pub struct WallpaperAssignments {
    path: Option<PathBuf>,
    assignments: Mutex<BTreeMap<String, String>>,
    events: Option<Sender<PipelineEvent>>,
}

impl WallpaperAssignments {
    /// An empty, memory-only map.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            assignments: Mutex::new(BTreeMap::new()),
            events: None,
        }
    }

    /// Load from `path`, starting empty if the file is absent or unreadable.
    /// Every new assignment is written back to `path`.
    pub fn load(path: &Path) -> Self {
        let assignments = std::fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str::<AssignmentFile>(&content).ok())
            .filter(|file| file.version == FORMAT_VERSION)
            .map(|file| file.assignments)
            .unwrap_or_default();
        Self {
            path: Some(path.to_path_buf()),
            assignments: Mutex::new(assignments),
            events: None,
        }
    }

    /// Report failed writes on `events`.
    pub fn with_events(mut self, events: Sender<PipelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// The wallpaper for `place_id`, assigning the next palette entry if the
    /// place has none yet.
    ///
    /// The in-memory assignment stands even when writing it back fails.
    pub fn assign(&self, place_id: &str) -> &'static Wallpaper {
        let mut assignments = self
            .assignments
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(wallpaper) = assignments
            .get(place_id)
            .and_then(|name| wallpaper_by_name(name))
        {
            return wallpaper;
        }

        let wallpaper = &WALLPAPER_PALETTE[assignments.len() % WALLPAPER_PALETTE.len()];
        assignments.insert(place_id.to_string(), wallpaper.name.to_string());
        if let Some(path) = &self.path
            && let Err(e) = save(path, &assignments)
            && let Some(events) = &self.events
        {
            let _ = events.send(PipelineEvent::WallpaperNotSaved {
                place: place_id.to_string(),
                error: e.to_string(),
            });
        }
        wallpaper
    }

    /// The current assignment for `place_id`, without assigning.
    pub fn get(&self, place_id: &str) -> Option<&'static Wallpaper> {
        self.assignments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(place_id)
            .and_then(|name| wallpaper_by_name(name))
    }

    pub fn len(&self) -> usize {
        self.assignments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn save(path: &Path, assignments: &BTreeMap<String, String>) -> Result<(), WallpaperError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = AssignmentFile {
        version: FORMAT_VERSION,
        assignments: assignments.clone(),
    };
    std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use tempfile::TempDir;

    #[test]
    fn first_places_walk_the_palette_in_order() {
        let w = WallpaperAssignments::in_memory();
        assert_eq!(w.assign("a"), &WALLPAPER_PALETTE[0]);
        assert_eq!(w.assign("b"), &WALLPAPER_PALETTE[1]);
        assert_eq!(w.assign("c"), &WALLPAPER_PALETTE[2]);
    }

    #[test]
    fn seventh_place_wraps_around() {
        let w = WallpaperAssignments::in_memory();
        for place in ["a", "b", "c", "d", "e", "f"] {
            w.assign(place);
        }
        assert_eq!(w.assign("g"), &WALLPAPER_PALETTE[0]);
    }

    #[test]
    fn assignment_is_sticky() {
        let w = WallpaperAssignments::in_memory();
        let first = w.assign("home");
        w.assign("office");
        assert_eq!(w.assign("home"), first);
        assert_eq!(w.len(), 2);
    }

    #[test]
    fn get_does_not_assign() {
        let w = WallpaperAssignments::in_memory();
        assert_eq!(w.get("home"), None);
        assert!(w.is_empty());
    }

    #[test]
    fn assignments_survive_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state/wallpapers.json");

        let w = WallpaperAssignments::load(&path);
        w.assign("home");
        w.assign("office");

        let reloaded = WallpaperAssignments::load(&path);
        assert_eq!(reloaded.get("office"), Some(&WALLPAPER_PALETTE[1]));
        // Counting continues from the persisted size
        assert_eq!(reloaded.assign("cabin"), &WALLPAPER_PALETTE[2]);
    }

    #[test]
    fn failed_write_still_assigns_and_is_reported() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("state");
        std::fs::write(&blocker, "not a directory").unwrap();
        let (tx, rx) = mpsc::channel();

        let w = WallpaperAssignments::load(&blocker.join("wallpapers.json")).with_events(tx);
        assert_eq!(w.assign("home"), &WALLPAPER_PALETTE[0]);
        assert_eq!(w.assign("home"), &WALLPAPER_PALETTE[0]);
        assert_eq!(w.assign("office"), &WALLPAPER_PALETTE[1]);
        drop(w);

        let events: Vec<_> = rx.iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            PipelineEvent::WallpaperNotSaved { place, .. } if place == "home"
        ));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("wallpapers.json");
        std::fs::write(&path, "{ not json").unwrap();

        let w = WallpaperAssignments::load(&path);
        assert!(w.is_empty());
    }

    #[test]
    fn unknown_persisted_name_is_reassigned() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("wallpapers.json");
        std::fs::write(
            &path,
            r#"{"version":1,"assignments":{"home":"wallpaper_retired"}}"#,
        )
        .unwrap();

        let w = WallpaperAssignments::load(&path);
        assert_eq!(w.get("home"), None);
        // One entry already counted, so the replacement is palette[1]
        assert_eq!(w.assign("home"), &WALLPAPER_PALETTE[1]);
    }
}
