//! Named bitmap transforms applied by the render step.
//!
//! Requests carry transforms as data ([`Transform`]); the render sink applies
//! them in order with [`apply`]. Everything here is plain `image` crate work.
//!
//! | Transform | Text form | `image` call |
//! |---|---|---|
//! | [`Transform::Blur`] | `blur:2.5` | `DynamicImage::blur` |
//! | [`Transform::AlphaOverlay`] | `overlay:000000b0` | per-pixel blend over RGBA8 |
//! | [`Transform::Rotate`] | `rotate:90` | `rotate90` / `rotate180` / `rotate270` |
//! | [`Transform::CropCenter`] | `crop:120x80` | `crop_imm` around the center |
//! | [`Transform::CropSquare`] | `square` | `crop_imm` to the short edge |

use image::{DynamicImage, Rgba};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum TransformError {
    #[error("crop {width}x{height} does not fit a {image_width}x{image_height} image")]
    InvalidCrop {
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },
    #[error("blur sigma {0} is out of range")]
    InvalidBlur(f32),
    #[error("cannot parse transform '{0}'")]
    Parse(String),
}

/// Largest accepted blur sigma. The kernel grows linearly with sigma.
pub const MAX_BLUR_SIGMA: f32 = 100.0;

fn valid_sigma(sigma: f32) -> bool {
    sigma.is_finite() && sigma > 0.0 && sigma <= MAX_BLUR_SIGMA
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    Deg90,
    Deg180,
    Deg270,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Gaussian blur with the given sigma.
    Blur { sigma: f32 },
    /// Blend a flat color over the image; the color's alpha is the strength.
    AlphaOverlay { rgba: [u8; 4] },
    Rotate(Rotation),
    CropCenter { width: u32, height: u32 },
    CropSquare,
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Blur { sigma } => write!(f, "blur:{sigma}"),
            Transform::AlphaOverlay { rgba: [r, g, b, a] } => {
                write!(f, "overlay:{r:02x}{g:02x}{b:02x}{a:02x}")
            }
            Transform::Rotate(Rotation::Deg90) => f.write_str("rotate:90"),
            Transform::Rotate(Rotation::Deg180) => f.write_str("rotate:180"),
            Transform::Rotate(Rotation::Deg270) => f.write_str("rotate:270"),
            Transform::CropCenter { width, height } => write!(f, "crop:{width}x{height}"),
            Transform::CropSquare => f.write_str("square"),
        }
    }
}

impl FromStr for Transform {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || TransformError::Parse(s.to_string());
        let (name, arg) = s.split_once(':').unwrap_or((s, ""));
        match name {
            "blur" => {
                let sigma: f32 = arg.parse().map_err(|_| err())?;
                if !valid_sigma(sigma) {
                    return Err(err());
                }
                Ok(Transform::Blur { sigma })
            }
            "overlay" => {
                if arg.len() != 8 {
                    return Err(err());
                }
                let value = u32::from_str_radix(arg, 16).map_err(|_| err())?;
                Ok(Transform::AlphaOverlay {
                    rgba: value.to_be_bytes(),
                })
            }
            "rotate" => match arg {
                "90" => Ok(Transform::Rotate(Rotation::Deg90)),
                "180" => Ok(Transform::Rotate(Rotation::Deg180)),
                "270" => Ok(Transform::Rotate(Rotation::Deg270)),
                _ => Err(err()),
            },
            "crop" => {
                let (w, h) = arg.split_once('x').ok_or_else(err)?;
                let width: u32 = w.parse().map_err(|_| err())?;
                let height: u32 = h.parse().map_err(|_| err())?;
                if width == 0 || height == 0 {
                    return Err(err());
                }
                Ok(Transform::CropCenter { width, height })
            }
            "square" if arg.is_empty() => Ok(Transform::CropSquare),
            _ => Err(err()),
        }
    }
}

/// Apply `transforms` to `image` in order.
pub fn apply(image: DynamicImage, transforms: &[Transform]) -> Result<DynamicImage, TransformError> {
    transforms.iter().try_fold(image, apply_one)
}

fn apply_one(image: DynamicImage, transform: &Transform) -> Result<DynamicImage, TransformError> {
    Ok(match *transform {
        Transform::Blur { sigma } if !valid_sigma(sigma) => {
            return Err(TransformError::InvalidBlur(sigma));
        }
        Transform::Blur { sigma } => image.blur(sigma),
        Transform::AlphaOverlay { rgba } => overlay(image, rgba),
        Transform::Rotate(Rotation::Deg90) => image.rotate90(),
        Transform::Rotate(Rotation::Deg180) => image.rotate180(),
        Transform::Rotate(Rotation::Deg270) => image.rotate270(),
        Transform::CropCenter { width, height } => crop_center(&image, width, height)?,
        Transform::CropSquare => {
            let side = image.width().min(image.height());
            crop_center(&image, side, side)?
        }
    })
}

fn crop_center(image: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage, TransformError> {
    if width == 0 || height == 0 || width > image.width() || height > image.height() {
        return Err(TransformError::InvalidCrop {
            width,
            height,
            image_width: image.width(),
            image_height: image.height(),
        });
    }
    let x = (image.width() - width) / 2;
    let y = (image.height() - height) / 2;
    Ok(image.crop_imm(x, y, width, height))
}

fn overlay(image: DynamicImage, rgba: [u8; 4]) -> DynamicImage {
    let alpha = f32::from(rgba[3]) / 255.0;
    let mut buffer = image.into_rgba8();
    for Rgba(px) in buffer.pixels_mut() {
        for channel in 0..3 {
            let blended = f32::from(px[channel]) * (1.0 - alpha) + f32::from(rgba[channel]) * alpha;
            px[channel] = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
    DynamicImage::ImageRgba8(buffer)
}
