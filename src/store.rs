//! Local store of user photos.
//!
//! Photos live flat in one application-private directory, named by
//! [`store_filename`](crate::naming::store_filename). A photo "exists" iff a
//! file with exactly that name exists; nothing else is consulted.

use crate::naming::store_filename;
use crate::types::ImageCategory;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Read/write access to user photos.
pub trait ImageStore: Send + Sync {
    /// Path of the saved photo for this identity, if one exists.
    fn user_photo(
        &self,
        category: ImageCategory,
        place_id: Option<&str>,
        image_id: Option<&str>,
    ) -> Option<PathBuf>;

    /// Persist `bitmap` under this identity, replacing any previous photo.
    fn save(
        &self,
        bitmap: &DynamicImage,
        category: ImageCategory,
        place_id: Option<&str>,
        image_id: Option<&str>,
    ) -> Result<PathBuf, StoreError>;
}

/// [`ImageStore`] backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(
        &self,
        category: ImageCategory,
        place_id: Option<&str>,
        image_id: Option<&str>,
    ) -> PathBuf {
        self.dir.join(store_filename(category, place_id, image_id))
    }
}

impl ImageStore for DiskStore {
    fn user_photo(
        &self,
        category: ImageCategory,
        place_id: Option<&str>,
        image_id: Option<&str>,
    ) -> Option<PathBuf> {
        let path = self.path_for(category, place_id, image_id);
        path.is_file().then_some(path)
    }

    fn save(
        &self,
        bitmap: &DynamicImage,
        category: ImageCategory,
        place_id: Option<&str>,
        image_id: Option<&str>,
    ) -> Result<PathBuf, StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(category, place_id, image_id);
        // Write next to the target and rename so readers never see a torn file.
        let partial = path.with_extension("png.partial");
        bitmap.save_with_format(&partial, image::ImageFormat::Png)?;
        std::fs::rename(&partial, &path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::solid_image;
    use tempfile::TempDir;

    #[test]
    fn missing_photo_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = DiskStore::new(tmp.path());
        assert_eq!(
            store.user_photo(ImageCategory::DeviceLarge, Some("home"), Some("lamp")),
            None
        );
    }

    #[test]
    fn existence_is_a_plain_file_check() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("device_large-home-lamp.png"), b"anything").unwrap();
        let store = DiskStore::new(tmp.path());

        assert_eq!(
            store.user_photo(ImageCategory::DeviceLarge, Some("home"), Some("lamp")),
            Some(tmp.path().join("device_large-home-lamp.png"))
        );
        // Same ids, different category
        assert_eq!(
            store.user_photo(ImageCategory::DeviceSmall, Some("home"), Some("lamp")),
            None
        );
    }

    #[test]
    fn save_creates_directory_and_png() {
        let tmp = TempDir::new().unwrap();
        let store = DiskStore::new(tmp.path().join("nested/images"));

        let path = store
            .save(&solid_image(4, 3, [10, 20, 30, 255]), ImageCategory::Place, Some("home"), None)
            .unwrap();

        assert_eq!(path, tmp.path().join("nested/images/place-home.png"));
        let reloaded = image::open(&path).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (4, 3));
        assert!(!path.with_extension("png.partial").exists());
        assert_eq!(
            store.user_photo(ImageCategory::Place, Some("home"), None),
            Some(path)
        );
    }

    #[test]
    fn save_overwrites_previous_photo() {
        let tmp = TempDir::new().unwrap();
        let store = DiskStore::new(tmp.path());

        store
            .save(&solid_image(2, 2, [0, 0, 0, 255]), ImageCategory::PetSmall, None, Some("k1"))
            .unwrap();
        let path = store
            .save(&solid_image(5, 5, [0, 0, 0, 255]), ImageCategory::PetSmall, None, Some("k1"))
            .unwrap();

        assert_eq!(image::open(&path).unwrap().width(), 5);
    }
}
