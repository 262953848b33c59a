//! Embedded image resources shipped with the client.
//!
//! Identifiers mirror the client's generated resource table; the values only
//! need to be stable and distinct, the renderer maps them to bitmaps.

use crate::types::ResourceId;

pub const GENERIC_AVATAR: ResourceId = ResourceId(0x7f08_0100);
pub const GENERIC_AVATAR_LARGE: ResourceId = ResourceId(0x7f08_0101);
pub const PET_SMALL_DEFAULT: ResourceId = ResourceId(0x7f08_0110);
pub const PET_LARGE_DEFAULT: ResourceId = ResourceId(0x7f08_0111);

/// Device category icons, indexed by the raw device-category value.
const DEVICE_CATEGORY_ICONS: [ResourceId; 8] = [
    ResourceId(0x7f08_0200), // other
    ResourceId(0x7f08_0201), // light
    ResourceId(0x7f08_0202), // plug
    ResourceId(0x7f08_0203), // sensor
    ResourceId(0x7f08_0204), // camera
    ResourceId(0x7f08_0205), // speaker
    ResourceId(0x7f08_0206), // thermostat
    ResourceId(0x7f08_0207), // lock
];

/// Scene category icons, indexed by the raw scene-category value.
const SCENE_CATEGORY_ICONS: [ResourceId; 6] = [
    ResourceId(0x7f08_0300), // custom
    ResourceId(0x7f08_0301), // morning
    ResourceId(0x7f08_0302), // evening
    ResourceId(0x7f08_0303), // away
    ResourceId(0x7f08_0304), // arrive
    ResourceId(0x7f08_0305), // sleep
];

pub fn device_category_icon(raw: u32) -> Option<ResourceId> {
    DEVICE_CATEGORY_ICONS.get(raw as usize).copied()
}

pub fn scene_category_icon(raw: u32) -> Option<ResourceId> {
    SCENE_CATEGORY_ICONS.get(raw as usize).copied()
}

/// A stock place wallpaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wallpaper {
    /// Persisted name of the wallpaper.
    pub name: &'static str,
    pub resource: ResourceId,
}

/// Default place wallpapers, assigned round-robin to new places.
pub const WALLPAPER_PALETTE: [Wallpaper; 6] = [
    Wallpaper {
        name: "wallpaper_dawn",
        resource: ResourceId(0x7f08_0400),
    },
    Wallpaper {
        name: "wallpaper_forest",
        resource: ResourceId(0x7f08_0401),
    },
    Wallpaper {
        name: "wallpaper_harbor",
        resource: ResourceId(0x7f08_0402),
    },
    Wallpaper {
        name: "wallpaper_dunes",
        resource: ResourceId(0x7f08_0403),
    },
    Wallpaper {
        name: "wallpaper_glacier",
        resource: ResourceId(0x7f08_0404),
    },
    Wallpaper {
        name: "wallpaper_meadow",
        resource: ResourceId(0x7f08_0405),
    },
];

pub fn wallpaper_by_name(name: &str) -> Option<&'static Wallpaper> {
    WALLPAPER_PALETTE.iter().find(|w| w.name == name)
}
