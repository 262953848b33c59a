//! Category-driven fallback resolution.
//!
//! [`CategoryResolver::resolve`] turns an [`ImageCategory`] plus a [`Hint`]
//! into a [`LocationSpec`]. Each category has a fixed chain of candidates,
//! evaluated top to bottom; the first satisfied one wins.
//!
//! | Category | Chain |
//! |---|---|
//! | device (large/small) | user photo → product URL if it exists → device-type URL |
//! | product | product URL if it exists → device-type URL from the remembered tag |
//! | device background | user photo → product URL if it exists → place image |
//! | place | user photo → default wallpaper |
//! | person (small/large) | user photo → generic avatar |
//! | person background | person's user photo → place image |
//! | pet (small/large) | user photo by smart key → stock pet image |
//! | device type, pairing/reconnect step, brand, scene action | remote URL |
//! | device category, scene category | embedded icon |
//! | drawable | the given resource id |
//!
//! File and content hints short-circuit all of the above.
//!
//! ## Errors
//!
//! A hint of the wrong shape is [`ResolveError::UnsupportedHint`] and a zero
//! or out-of-range resource value is [`ResolveError::InvalidArgument`]; both
//! are caller bugs and propagate. A missing base URL only disables the remote
//! branches: resolution carries on with the next candidate and may end with
//! `Ok(None)` ("no location"), which the render step covers with the
//! request's fallback images.

use crate::existence::ExistenceCache;
use crate::naming::{Segment, remote_url, sized_variant, step_variant};
use crate::resources;
use crate::store::{ImageStore, StoreError};
use crate::types::{
    DeviceRef, Hint, ImageCategory, LocationSpec, Locator, ResourceId, Size,
};
use crate::wallpaper::WallpaperAssignments;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("category {category} does not accept a {hint} hint")]
    UnsupportedHint {
        category: ImageCategory,
        hint: &'static str,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("asset base URL is unavailable")]
    BaseUrlUnavailable,
    #[error("local store error: {0}")]
    Store(#[from] StoreError),
}

/// Session-scoped source of the asset server's base URL.
pub trait BaseUrlProvider: Send + Sync {
    fn base_url(&self) -> Option<String>;
}

/// A base URL fixed at construction (typically from config).
#[derive(Debug, Clone, Default)]
pub struct StaticBaseUrl(pub Option<String>);

impl BaseUrlProvider for StaticBaseUrl {
    fn base_url(&self) -> Option<String> {
        self.0.clone()
    }
}

impl<F> BaseUrlProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn base_url(&self) -> Option<String> {
        self()
    }
}

/// Resolves image locations. Cheap to share behind an `Arc`.
pub struct CategoryResolver {
    store: Arc<dyn ImageStore>,
    cache: Arc<ExistenceCache>,
    base_url: Arc<dyn BaseUrlProvider>,
    wallpapers: Arc<WallpaperAssignments>,
    density: String,
}

impl CategoryResolver {
    pub fn new(
        store: Arc<dyn ImageStore>,
        cache: Arc<ExistenceCache>,
        base_url: Arc<dyn BaseUrlProvider>,
        wallpapers: Arc<WallpaperAssignments>,
        density: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cache,
            base_url,
            wallpapers,
            density: density.into(),
        }
    }

    pub fn existence_cache(&self) -> &Arc<ExistenceCache> {
        &self.cache
    }

    pub fn wallpapers(&self) -> &Arc<WallpaperAssignments> {
        &self.wallpapers
    }

    /// Resolve `hint` within `category`.
    ///
    /// With `suppress_user_generated` set, no user photo is looked up and the
    /// result is never user-generated.
    pub fn resolve(
        &self,
        category: ImageCategory,
        hint: &Hint,
        suppress_user_generated: bool,
    ) -> Result<Option<LocationSpec>, ResolveError> {
        match hint {
            Hint::File(path) => return Ok(Some(LocationSpec::stock(Locator::LocalFile(path.clone())))),
            Hint::Content(handle) => return Ok(Some(LocationSpec::stock(Locator::Content(handle.clone())))),
            _ => {}
        }

        let allow_user = !suppress_user_generated && category.supports_user_imagery();
        let unsupported = || ResolveError::UnsupportedHint {
            category,
            hint: hint.shape(),
        };

        match category {
            ImageCategory::DeviceLarge | ImageCategory::DeviceSmall => {
                if let Hint::Device(device) = hint
                    && let Some(photo) = self.device_photo(category, device, allow_user)
                {
                    return Ok(Some(photo));
                }
                self.product_image(category, hint, category.size())
            }
            ImageCategory::Product => self.product_image(category, hint, Size::Large),
            ImageCategory::DeviceType => match hint {
                Hint::DeviceType(tag) => Ok(self.device_type_image(tag, Size::Large)),
                Hint::Device(DeviceRef {
                    device_type: Some(tag),
                    ..
                }) => Ok(self.device_type_image(tag, Size::Large)),
                _ => Err(unsupported()),
            },
            ImageCategory::DeviceBackground => {
                let Hint::Device(device) = hint else {
                    return Err(unsupported());
                };
                if let Some(photo) = self.device_photo(category, device, allow_user) {
                    return Ok(Some(photo));
                }
                if let Some(product_id) = &device.product_id
                    && let Some(url) = self.url(Segment::Products, product_id, None, &sized_variant("product", Size::Large))
                    && self.cache.exists(&url)
                {
                    return Ok(Some(LocationSpec::remote(url)));
                }
                Ok(device
                    .place_id
                    .as_deref()
                    .map(|place_id| self.place_image(place_id, allow_user)))
            }
            ImageCategory::PairingStep | ImageCategory::ReconnectStep => {
                let Hint::Step(step) = hint else {
                    return Err(unsupported());
                };
                let segment = if category == ImageCategory::PairingStep {
                    Segment::Pair
                } else {
                    Segment::Reconnect
                };
                Ok(self
                    .url(segment, &step.product_id, None, &step_variant(segment, step.step))
                    .map(LocationSpec::remote))
            }
            ImageCategory::Brand => {
                let Hint::Brand(name) = hint else {
                    return Err(unsupported());
                };
                Ok(self
                    .url(Segment::Brands, name, None, &sized_variant("brand", Size::Large))
                    .map(LocationSpec::remote))
            }
            ImageCategory::SceneAction => {
                let Hint::Action { scene, action } = hint else {
                    return Err(unsupported());
                };
                Ok(self
                    .url(Segment::Actions, scene, Some(action), &sized_variant("action", Size::Small))
                    .map(LocationSpec::remote))
            }
            ImageCategory::DeviceCategory => {
                let Hint::Raw(raw) = hint else {
                    return Err(unsupported());
                };
                resources::device_category_icon(*raw)
                    .map(|id| Some(LocationSpec::resource(id)))
                    .ok_or_else(|| ResolveError::InvalidArgument(format!("unknown device category {raw}")))
            }
            ImageCategory::SceneCategory => {
                let Hint::Raw(raw) = hint else {
                    return Err(unsupported());
                };
                resources::scene_category_icon(*raw)
                    .map(|id| Some(LocationSpec::resource(id)))
                    .ok_or_else(|| ResolveError::InvalidArgument(format!("unknown scene category {raw}")))
            }
            ImageCategory::Drawable => match hint {
                Hint::Resource(0) => Err(ResolveError::InvalidArgument(
                    "drawable resource id must be nonzero".into(),
                )),
                Hint::Resource(id) => Ok(Some(LocationSpec::resource(ResourceId(*id)))),
                _ => Err(unsupported()),
            },
            ImageCategory::Place => {
                let Hint::Place(place_id) = hint else {
                    return Err(unsupported());
                };
                Ok(Some(self.place_image(place_id, allow_user)))
            }
            ImageCategory::Person | ImageCategory::PersonLarge => {
                let Hint::Pair(person_id, place_id) = hint else {
                    return Err(unsupported());
                };
                if let Some(photo) = self.user_photo(allow_user, category, Some(place_id), Some(person_id)) {
                    return Ok(Some(photo));
                }
                let avatar = if category == ImageCategory::PersonLarge {
                    resources::GENERIC_AVATAR_LARGE
                } else {
                    resources::GENERIC_AVATAR
                };
                Ok(Some(LocationSpec::resource(avatar)))
            }
            ImageCategory::PersonBackground => {
                let Hint::Pair(person_id, place_id) = hint else {
                    return Err(unsupported());
                };
                if let Some(photo) =
                    self.user_photo(allow_user, ImageCategory::Person, Some(place_id), Some(person_id))
                {
                    return Ok(Some(photo));
                }
                Ok(Some(self.place_image(place_id, allow_user)))
            }
            ImageCategory::PetSmall | ImageCategory::PetLarge => {
                let Hint::SmartKey(key) = hint else {
                    return Err(unsupported());
                };
                if let Some(photo) = self.user_photo(allow_user, category, None, Some(key)) {
                    return Ok(Some(photo));
                }
                let stock = if category == ImageCategory::PetLarge {
                    resources::PET_LARGE_DEFAULT
                } else {
                    resources::PET_SMALL_DEFAULT
                };
                Ok(Some(LocationSpec::resource(stock)))
            }
        }
    }

    /// Product illustration with device-type fallback.
    ///
    /// A literal product id is turned into its URL without probing: there is
    /// no device-type tag to fall back to, so the probe could only remove the
    /// one candidate there is.
    fn product_image(
        &self,
        category: ImageCategory,
        hint: &Hint,
        size: Size,
    ) -> Result<Option<LocationSpec>, ResolveError> {
        let product_variant = sized_variant("product", size);
        let (product_url, fallback_tag) = match hint {
            Hint::ProductId(id) => {
                return Ok(self
                    .url(Segment::Products, id, None, &product_variant)
                    .map(LocationSpec::remote));
            }
            Hint::Device(device) => match &device.product_id {
                Some(product_id) => (
                    self.url(Segment::Products, product_id, None, &product_variant),
                    device.device_type.as_deref(),
                ),
                None => {
                    return Ok(device
                        .device_type
                        .as_deref()
                        .and_then(|tag| self.device_type_image(tag, size)));
                }
            },
            Hint::Product(product) => (
                self.url(Segment::Products, &product.id, None, &product_variant),
                product.screen_tag.as_deref(),
            ),
            _ => {
                return Err(ResolveError::UnsupportedHint {
                    category,
                    hint: hint.shape(),
                });
            }
        };

        if let Some(url) = product_url
            && self.cache.exists(&url)
        {
            return Ok(Some(LocationSpec::remote(url)));
        }
        Ok(fallback_tag.and_then(|tag| self.device_type_image(tag, size)))
    }

    fn device_type_image(&self, tag: &str, size: Size) -> Option<LocationSpec> {
        self.url(Segment::DeviceTypes, tag, None, &sized_variant("type", size))
            .map(LocationSpec::remote)
    }

    fn device_photo(
        &self,
        category: ImageCategory,
        device: &DeviceRef,
        allow_user: bool,
    ) -> Option<LocationSpec> {
        let place_id = device.place_id.as_deref()?;
        self.user_photo(allow_user, category, Some(place_id), Some(&device.device_id))
    }

    /// Place photo, else the place's default wallpaper. Never empty.
    fn place_image(&self, place_id: &str, allow_user: bool) -> LocationSpec {
        self.user_photo(allow_user, ImageCategory::Place, Some(place_id), None)
            .unwrap_or_else(|| LocationSpec::resource(self.wallpapers.assign(place_id).resource))
    }

    fn user_photo(
        &self,
        allow_user: bool,
        category: ImageCategory,
        place_id: Option<&str>,
        image_id: Option<&str>,
    ) -> Option<LocationSpec> {
        if !allow_user {
            return None;
        }
        self.store
            .user_photo(category, place_id, image_id)
            .map(|path| LocationSpec::user_generated(Locator::LocalFile(path)))
    }

    /// Remote URL for the given template parts, or `None` without a base URL.
    fn url(&self, segment: Segment, id: &str, sub_id: Option<&str>, variant: &str) -> Option<String> {
        self.remote_url(segment, id, sub_id, variant).ok()
    }

    /// Remote URL for the given template parts.
    pub fn remote_url(
        &self,
        segment: Segment,
        id: &str,
        sub_id: Option<&str>,
        variant: &str,
    ) -> Result<String, ResolveError> {
        let base = self
            .base_url
            .base_url()
            .filter(|b| !b.is_empty())
            .ok_or(ResolveError::BaseUrlUnavailable)?;
        Ok(remote_url(&base, segment, id, sub_id, variant, &self.density))
    }
}
