//! 2-D color textures sampled by material attributes.

use std::path::Path;

use image::DynamicImage;

use crate::util::{Result, Vec2, Vec3, GAMMA};

/// Linear RGB float image, row 0 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    width: u32,
    height: u32,
    pixels: Vec<Vec3>,
}

impl Texture {
    /// Wrap an in-memory pixel array. Returns `None` if the size does not match.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Vec3>) -> Option<Self> {
        if width == 0 || height == 0 || pixels.len() != width as usize * height as usize {
            return None;
        }
        Some(Self { width, height, pixels })
    }

    /// Decode an image file into linear RGB floats.
    ///
    /// Integer formats are taken as gamma-encoded and linearized; float
    /// formats (HDR, EXR) are already linear.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let img = image::open(path.as_ref())?;
        let linear = matches!(img, DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_));
        let img = img.into_rgb32f();
        let (width, height) = img.dimensions();
        let pixels = img
            .pixels()
            .map(|p| {
                let c = Vec3::from_array(p.0);
                if linear {
                    c
                } else {
                    c.powf(GAMMA)
                }
            })
            .collect();
        tracing::debug!(width, height, linear, "texture loaded");
        Ok(Self { width, height, pixels })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Nearest-texel lookup with repeat wrapping; `v = 0` is the bottom row.
    pub fn sample(&self, uv: Vec2) -> Vec3 {
        let u = uv.x - uv.x.floor();
        let v = uv.y - uv.y.floor();
        if !(u.is_finite() && v.is_finite()) {
            return Vec3::ZERO;
        }

        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = (((1.0 - v) * self.height as f32) as u32).min(self.height - 1);
        self.pixels[y as usize * self.width as usize + x as usize]
    }
}
