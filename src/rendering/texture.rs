/// RGBA8 textures sampled by the fragment stage.
///
/// Images are stored bottom row first (v = 0 is the bottom edge) and sampling
/// wraps in both directions, so any uv maps to a valid texel.
use crate::error::Result;
use glam::{Vec2, Vec3};
use image::{Rgba, RgbaImage};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Texture {
    image: RgbaImage,
}

impl Texture {
    /// Load a texture from disk; the decoded image is flipped so that row 0
    /// is the bottom of the picture.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let decoded = image::open(path.as_ref())?.to_rgba8();
        log::debug!(
            "texture {} ({}x{})",
            path.as_ref().display(),
            decoded.width(),
            decoded.height()
        );
        Ok(Self::from_image(image::imageops::flip_vertical(&decoded)))
    }

    /// Wrap an image that is already stored bottom row first.
    pub fn from_image(image: RgbaImage) -> Self {
        assert!(
            image.width() > 0 && image.height() > 0,
            "texture must not be empty"
        );
        Self { image }
    }

    /// 1x1 texture of a single color.
    pub fn solid(color: [u8; 4]) -> Self {
        Self::from_image(RgbaImage::from_pixel(1, 1, Rgba(color)))
    }

    /// Tangent-space normal map that leaves the surface normal untouched.
    pub fn flat_normal() -> Self {
        Self::solid([128, 128, 255, 255])
    }

    /// Build a texture from a per-texel function of (x, y), y counted from the bottom.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 4]) -> Self {
        Self::from_image(RgbaImage::from_fn(width, height, |x, y| Rgba(f(x, y))))
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Nearest-texel lookup with wrapping.
    #[inline]
    pub fn sample(&self, uv: Vec2) -> [u8; 4] {
        let w = self.image.width() as i64;
        let h = self.image.height() as i64;
        let x = wrap((uv.x * w as f32).floor(), w);
        let y = wrap((uv.y * h as f32).floor(), h);
        self.image.get_pixel(x, y).0
    }

    /// Sample a normal map texel and decode it from [0, 255] to [-1, 1].
    #[inline]
    pub fn sample_normal(&self, uv: Vec2) -> Vec3 {
        let [r, g, b, _] = self.sample(uv);
        Vec3::new(r as f32, g as f32, b as f32) / 255.0 * 2.0 - Vec3::ONE
    }
}

#[inline]
fn wrap(coord: f32, size: i64) -> u32 {
    // NaN and infinities collapse to texel 0 through the saturating cast.
    (coord as i64).rem_euclid(size) as u32
}
