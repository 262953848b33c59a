//! Shared types used across resolution, delivery and capture.
//!
//! The three central values are:
//!
//! - [`ImageCategory`]: the presentation context (device photo, avatar, ...).
//! - [`Hint`]: which specific image within that category is wanted.
//! - [`LocationSpec`]: the resolved answer: where to load the image from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Identifier of an image compiled into the client (icon, stock avatar, wallpaper).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u32);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res:{:#x}", self.0)
    }
}

/// Where an image lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    Resource(ResourceId),
    Remote(String),
    LocalFile(PathBuf),
    /// Opaque content handle (e.g. a `content://` URI handed over by a picker).
    Content(String),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Resource(id) => write!(f, "{id}"),
            Locator::Remote(url) => write!(f, "{url}"),
            Locator::LocalFile(path) => write!(f, "file:{}", path.display()),
            Locator::Content(handle) => write!(f, "{handle}"),
        }
    }
}

/// Result of resolution.
///
/// `is_user_generated` is only ever `true` for a user photo found in the
/// local store, which the resolver never looks up when the caller asked to
/// suppress user imagery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSpec {
    pub locator: Locator,
    pub is_user_generated: bool,
}

impl LocationSpec {
    pub fn stock(locator: Locator) -> Self {
        Self {
            locator,
            is_user_generated: false,
        }
    }

    pub fn user_generated(locator: Locator) -> Self {
        Self {
            locator,
            is_user_generated: true,
        }
    }

    pub fn resource(id: ResourceId) -> Self {
        Self::stock(Locator::Resource(id))
    }

    pub fn remote(url: String) -> Self {
        Self::stock(Locator::Remote(url))
    }
}

impl fmt::Display for LocationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_user_generated {
            write!(f, "{} (user photo)", self.locator)
        } else {
            write!(f, "{}", self.locator)
        }
    }
}

/// Rendered size of a category; selects the `_large` / `_small` URL variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Size {
    Large,
    Small,
}

impl Size {
    pub fn suffix(self) -> &'static str {
        match self {
            Size::Large => "large",
            Size::Small => "small",
        }
    }
}

/// Presentation context of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageCategory {
    DeviceLarge,
    DeviceSmall,
    DeviceType,
    Product,
    PairingStep,
    ReconnectStep,
    Brand,
    DeviceCategory,
    Drawable,
    Place,
    DeviceBackground,
    Person,
    PersonLarge,
    PersonBackground,
    SceneAction,
    SceneCategory,
    PetSmall,
    PetLarge,
}

impl ImageCategory {
    pub const ALL: [ImageCategory; 18] = [
        ImageCategory::DeviceLarge,
        ImageCategory::DeviceSmall,
        ImageCategory::DeviceType,
        ImageCategory::Product,
        ImageCategory::PairingStep,
        ImageCategory::ReconnectStep,
        ImageCategory::Brand,
        ImageCategory::DeviceCategory,
        ImageCategory::Drawable,
        ImageCategory::Place,
        ImageCategory::DeviceBackground,
        ImageCategory::Person,
        ImageCategory::PersonLarge,
        ImageCategory::PersonBackground,
        ImageCategory::SceneAction,
        ImageCategory::SceneCategory,
        ImageCategory::PetSmall,
        ImageCategory::PetLarge,
    ];

    /// Token used in local store filenames and on the command line.
    pub fn key(self) -> &'static str {
        match self {
            ImageCategory::DeviceLarge => "device_large",
            ImageCategory::DeviceSmall => "device_small",
            ImageCategory::DeviceType => "device_type",
            ImageCategory::Product => "product",
            ImageCategory::PairingStep => "pairing_step",
            ImageCategory::ReconnectStep => "reconnect_step",
            ImageCategory::Brand => "brand",
            ImageCategory::DeviceCategory => "device_category",
            ImageCategory::Drawable => "drawable",
            ImageCategory::Place => "place",
            ImageCategory::DeviceBackground => "device_background",
            ImageCategory::Person => "person",
            ImageCategory::PersonLarge => "person_large",
            ImageCategory::PersonBackground => "person_background",
            ImageCategory::SceneAction => "scene_action",
            ImageCategory::SceneCategory => "scene_category",
            ImageCategory::PetSmall => "pet_small",
            ImageCategory::PetLarge => "pet_large",
        }
    }

    /// Whether a user photo may stand in for the stock image of this category.
    pub fn supports_user_imagery(self) -> bool {
        matches!(
            self,
            ImageCategory::DeviceLarge
                | ImageCategory::DeviceSmall
                | ImageCategory::Place
                | ImageCategory::DeviceBackground
                | ImageCategory::Person
                | ImageCategory::PersonLarge
                | ImageCategory::PersonBackground
                | ImageCategory::PetSmall
                | ImageCategory::PetLarge
        )
    }

    pub fn size(self) -> Size {
        match self {
            ImageCategory::DeviceSmall
            | ImageCategory::SceneAction
            | ImageCategory::PetSmall
            | ImageCategory::Person => Size::Small,
            _ => Size::Large,
        }
    }
}

impl fmt::Display for ImageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ImageCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.key() == wanted)
            .ok_or_else(|| format!("unknown image category '{s}'"))
    }
}

/// A device as known to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceRef {
    pub device_id: String,
    pub place_id: Option<String>,
    pub product_id: Option<String>,
    /// Device-type tag (e.g. `"bulb"`), used for generic illustrations.
    pub device_type: Option<String>,
}

/// A product catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: String,
    /// Device-type tag of the product's screen illustration.
    pub screen_tag: Option<String>,
}

/// One step of a pairing or reconnect walkthrough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRef {
    pub product_id: String,
    pub step: u32,
}

/// Category-specific input to resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hint {
    Device(DeviceRef),
    DeviceType(String),
    ProductId(String),
    Product(ProductRef),
    Step(StepRef),
    Brand(String),
    /// Already-resolved local file; returned unchanged for every category.
    File(PathBuf),
    /// Already-resolved content handle; returned unchanged for every category.
    Content(String),
    /// Embedded resource identifier.
    Resource(u32),
    /// Raw value of a category enum (device category, scene category).
    Raw(u32),
    /// `(person id, place id)`.
    Pair(String, String),
    Place(String),
    /// Smart-key identifier of a pet tag.
    SmartKey(String),
    Action { scene: String, action: String },
}

impl Hint {
    /// Name of the hint's shape, used in error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            Hint::Device(_) => "device",
            Hint::DeviceType(_) => "device-type",
            Hint::ProductId(_) => "product-id",
            Hint::Product(_) => "product",
            Hint::Step(_) => "step",
            Hint::Brand(_) => "brand",
            Hint::File(_) => "file",
            Hint::Content(_) => "content",
            Hint::Resource(_) => "resource",
            Hint::Raw(_) => "raw",
            Hint::Pair(..) => "pair",
            Hint::Place(_) => "place",
            Hint::SmartKey(_) => "smart-key",
            Hint::Action { .. } => "action",
        }
    }
}

/// Identity of a visual target (a view slot, a widget, a file).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub String);

impl From<&str> for TargetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TargetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one submission to the pipeline. Monotonic per pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_keys_round_trip_through_from_str() {
        for category in ImageCategory::ALL {
            assert_eq!(category.key().parse::<ImageCategory>(), Ok(category));
        }
    }

    #[test]
    fn category_parse_accepts_dashes_and_case() {
        assert_eq!(
            "Device-Large".parse::<ImageCategory>(),
            Ok(ImageCategory::DeviceLarge)
        );
        assert!("wallpaper".parse::<ImageCategory>().is_err());
    }

    #[test]
    fn user_imagery_support() {
        assert!(ImageCategory::DeviceLarge.supports_user_imagery());
        assert!(ImageCategory::PetLarge.supports_user_imagery());
        assert!(!ImageCategory::Product.supports_user_imagery());
        assert!(!ImageCategory::Drawable.supports_user_imagery());
        assert!(!ImageCategory::Brand.supports_user_imagery());
    }

    #[test]
    fn location_display_marks_user_photos() {
        let loc = LocationSpec::user_generated(Locator::LocalFile("/a/b.png".into()));
        assert_eq!(loc.to_string(), "file:/a/b.png (user photo)");
        assert_eq!(LocationSpec::resource(ResourceId(42)).to_string(), "res:0x2a");
    }
}
