//! Immutable image requests.
//!
//! A [`RequestDescriptor`] is everything the pipeline needs to put one image
//! into one target. It is built once with [`RequestBuilder`] and never
//! mutated; [`RequestDescriptor::with_pinned`] derives a new descriptor
//! instead.
//!
//! ```
//! use illustra::request::RequestDescriptor;
//! use illustra::transform::Transform;
//! use illustra::types::{Hint, ImageCategory, ResourceId};
//!
//! let request = RequestDescriptor::builder(
//!     ImageCategory::Place,
//!     Hint::Place("home".into()),
//!     "home-header",
//! )
//! .transform(Transform::CropSquare)
//! .user_transform(Transform::Blur { sigma: 4.0 })
//! .placeholder(ResourceId(7))
//! .build();
//!
//! assert_eq!(request.transforms_for(true).len(), 2);
//! assert_eq!(request.transforms_for(false).len(), 1);
//! ```

use crate::transform::Transform;
use crate::types::{Hint, ImageCategory, LocationSpec, ResourceId, TargetId};

#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    category: ImageCategory,
    hint: Hint,
    target: TargetId,
    transforms: Vec<Transform>,
    stock_transforms: Vec<Transform>,
    user_transforms: Vec<Transform>,
    placeholder: Option<ResourceId>,
    error_fallback: Option<ResourceId>,
    invalidate_cache: bool,
    suppress_user_generated: bool,
    pinned: Option<LocationSpec>,
}

impl RequestDescriptor {
    pub fn builder(
        category: ImageCategory,
        hint: Hint,
        target: impl Into<TargetId>,
    ) -> RequestBuilder {
        RequestBuilder {
            inner: RequestDescriptor {
                category,
                hint,
                target: target.into(),
                transforms: Vec::new(),
                stock_transforms: Vec::new(),
                user_transforms: Vec::new(),
                placeholder: None,
                error_fallback: None,
                invalidate_cache: false,
                suppress_user_generated: false,
                pinned: None,
            },
        }
    }

    pub fn category(&self) -> ImageCategory {
        self.category
    }

    pub fn hint(&self) -> &Hint {
        &self.hint
    }

    pub fn target(&self) -> &TargetId {
        &self.target
    }

    /// Transforms applied to every result.
    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    /// Transforms applied only to stock (non-user) results.
    pub fn stock_transforms(&self) -> &[Transform] {
        &self.stock_transforms
    }

    /// Transforms applied only to user photos.
    pub fn user_transforms(&self) -> &[Transform] {
        &self.user_transforms
    }

    /// The full, ordered transform list for a result: the common list
    /// followed by the stock-only or user-only list.
    pub fn transforms_for(&self, is_user_generated: bool) -> Vec<Transform> {
        let extra = if is_user_generated {
            &self.user_transforms
        } else {
            &self.stock_transforms
        };
        self.transforms.iter().chain(extra).copied().collect()
    }

    pub fn placeholder(&self) -> Option<ResourceId> {
        self.placeholder
    }

    pub fn error_fallback(&self) -> Option<ResourceId> {
        self.error_fallback
    }

    pub fn invalidate_cache(&self) -> bool {
        self.invalidate_cache
    }

    pub fn suppress_user_generated(&self) -> bool {
        self.suppress_user_generated
    }

    /// A location fixed in advance; the pipeline skips resolution for it.
    pub fn pinned(&self) -> Option<&LocationSpec> {
        self.pinned.as_ref()
    }

    /// A copy of this request pinned to `location`, with cache invalidation
    /// on so the sink reloads the target.
    pub fn with_pinned(&self, location: LocationSpec) -> Self {
        Self {
            pinned: Some(location),
            invalidate_cache: true,
            ..self.clone()
        }
    }
}

/// Fluent builder for [`RequestDescriptor`].
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    inner: RequestDescriptor,
}

impl RequestBuilder {
    pub fn transform(mut self, transform: Transform) -> Self {
        self.inner.transforms.push(transform);
        self
    }

    pub fn transforms(mut self, transforms: impl IntoIterator<Item = Transform>) -> Self {
        self.inner.transforms.extend(transforms);
        self
    }

    pub fn stock_transform(mut self, transform: Transform) -> Self {
        self.inner.stock_transforms.push(transform);
        self
    }

    pub fn user_transform(mut self, transform: Transform) -> Self {
        self.inner.user_transforms.push(transform);
        self
    }

    pub fn placeholder(mut self, resource: ResourceId) -> Self {
        self.inner.placeholder = Some(resource);
        self
    }

    pub fn error_fallback(mut self, resource: ResourceId) -> Self {
        self.inner.error_fallback = Some(resource);
        self
    }

    pub fn invalidate_cache(mut self, invalidate: bool) -> Self {
        self.inner.invalidate_cache = invalidate;
        self
    }

    pub fn suppress_user_generated(mut self, suppress: bool) -> Self {
        self.inner.suppress_user_generated = suppress;
        self
    }

    pub fn pinned(mut self, location: LocationSpec) -> Self {
        self.inner.pinned = Some(location);
        self
    }

    pub fn build(self) -> RequestDescriptor {
        self.inner
    }
}
