//! Naming conventions for remote illustrations and locally stored photos.
//!
//! ## Remote URLs
//!
//! Server-hosted illustrations follow a fixed template:
//!
//! ```text
//! {base}/o/{segment}/{id}[/{sub_id}]/{variant}-and-{density}.png
//! https://assets.example.com/o/products/hue2100/product_large-and-xxhdpi.png
//! https://assets.example.com/o/pair/hue2100/pair3_large-and-xxhdpi.png
//! ```
//!
//! Identifiers are sanitized with [`sanitize_identifier`] before templating.
//!
//! ## Local store
//!
//! User photos are stored as `{category}-{place}-{image}.png`, with absent
//! components omitted:
//!
//! - `device_large-home-lamp1.png`
//! - `place-home.png`
//! - `pet_small-key42.png`
//!
//! `-`, `%` and path separators inside a component are percent-escaped, so
//! place `a-b` with device `c` (`device_large-a%2Db-c.png`) never shares a
//! file with place `a` and device `b-c` (`device_large-a-b%2Dc.png`).

use crate::types::{ImageCategory, Size};

/// Path segment of a server-hosted illustration family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    DeviceTypes,
    Products,
    Brands,
    Pair,
    Reconnect,
    Actions,
}

impl Segment {
    pub const ALL: [Segment; 6] = [
        Segment::DeviceTypes,
        Segment::Products,
        Segment::Brands,
        Segment::Pair,
        Segment::Reconnect,
        Segment::Actions,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Segment::DeviceTypes => "dtypes",
            Segment::Products => "products",
            Segment::Brands => "brands",
            Segment::Pair => "pair",
            Segment::Reconnect => "reconnect",
            Segment::Actions => "actions",
        }
    }
}

impl std::str::FromStr for Segment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|segment| segment.as_str() == s)
            .ok_or_else(|| format!("unknown segment '{s}'"))
    }
}

/// Strip every non-alphanumeric character and lowercase the rest.
///
/// - `"Hue White A19"` → `"huewhitea19"`
/// - `"LCT-015"` → `"lct015"`
pub fn sanitize_identifier(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Variant name for a size-dependent family, e.g. `product_large`.
pub fn sized_variant(kind: &str, size: Size) -> String {
    format!("{}_{}", kind, size.suffix())
}

/// Variant name for a walkthrough step, e.g. `pair3_large`.
pub fn step_variant(segment: Segment, step: u32) -> String {
    format!("{}{}_large", segment.as_str(), step)
}

/// Build a remote illustration URL.
///
/// `base` may carry a trailing slash. `id` and `sub_id` are sanitized here;
/// `variant` and `density` are used verbatim.
pub fn remote_url(
    base: &str,
    segment: Segment,
    id: &str,
    sub_id: Option<&str>,
    variant: &str,
    density: &str,
) -> String {
    let mut url = format!(
        "{}/o/{}/{}",
        base.trim_end_matches('/'),
        segment.as_str(),
        sanitize_identifier(id)
    );
    if let Some(sub) = sub_id {
        url.push('/');
        url.push_str(&sanitize_identifier(sub));
    }
    url.push('/');
    url.push_str(variant);
    url.push_str("-and-");
    url.push_str(density);
    url.push_str(".png");
    url
}

/// Filename of a user photo in the local store.
///
/// Components are escaped with [`escape_store_part`], so a component can
/// never escape the store directory or blur the boundary to its neighbour.
pub fn store_filename(
    category: ImageCategory,
    place_id: Option<&str>,
    image_id: Option<&str>,
) -> String {
    let mut name = category.key().to_string();
    for part in [place_id, image_id].into_iter().flatten() {
        if part.is_empty() {
            continue;
        }
        name.push('-');
        name.push_str(&escape_store_part(part));
    }
    name.push_str(".png");
    name
}

/// Percent-escape the separator, the escape character and path separators.
pub fn escape_store_part(part: &str) -> String {
    let mut escaped = String::with_capacity(part.len());
    for c in part.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '-' => escaped.push_str("%2D"),
            '/' => escaped.push_str("%2F"),
            '\\' => escaped.push_str("%5C"),
            _ => escaped.push(c),
        }
    }
    escaped
}
