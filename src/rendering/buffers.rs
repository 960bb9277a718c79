/// Frame-lifetime render targets.
///
/// Buffers are row-major with row 0 at the bottom (the viewport keeps +Y up);
/// `ColorBuffer::to_image` flips to the usual top-left origin for encoding.
/// Depth follows a single convention everywhere: larger is nearer and
/// [`DepthBuffer::FAR`] marks pixels no geometry has touched.
use glam::Vec3;
use image::{Rgba, RgbaImage};
use std::marker::PhantomData;

pub type Color = [u8; 4];

/// 8-bit RGBA color target.
#[derive(Debug, Clone)]
pub struct ColorBuffer {
    image: RgbaImage,
}

impl ColorBuffer {
    pub fn new(width: usize, height: usize, clear_color: Color) -> Self {
        Self {
            image: RgbaImage::from_pixel(width as u32, height as u32, Rgba(clear_color)),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.image.width() as usize
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.image.height() as usize
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Color {
        self.image.get_pixel(x as u32, y as u32).0
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, color: Color) {
        self.image.put_pixel(x as u32, y as u32, Rgba(color));
    }

    /// Interleaved RGBA bytes, 4 per pixel.
    #[inline]
    pub fn raw(&self) -> &[u8] {
        &self.image
    }

    #[inline]
    pub fn raw_mut(&mut self) -> &mut [u8] {
        &mut self.image
    }

    pub fn clear(&mut self, color: Color) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba(color);
        }
    }

    /// Copy out with row 0 at the top, ready for encoding.
    pub fn to_image(&self) -> RgbaImage {
        image::imageops::flip_vertical(&self.image)
    }
}

/// One float per pixel; larger values are nearer.
#[derive(Debug, Clone)]
pub struct DepthBuffer {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl DepthBuffer {
    /// Sentinel for "no geometry"; every finite depth is nearer.
    pub const FAR: f32 = f32::NEG_INFINITY;

    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![Self::FAR; width * height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, depth: f32) {
        self.data[y * self.width + x] = depth;
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn is_background(depth: f32) -> bool {
        !depth.is_finite()
    }

    pub fn clear(&mut self) {
        self.data.fill(Self::FAR);
    }
}

/// World-space surface normals written by the color pass.
#[derive(Debug, Clone)]
pub struct NormalBuffer {
    width: usize,
    height: usize,
    data: Vec<Vec3>,
}

impl NormalBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![Vec3::ZERO; width * height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Vec3 {
        self.data[y * self.width + x]
    }

    pub fn clear(&mut self) {
        self.data.fill(Vec3::ZERO);
    }
}

/// Every buffer a frame needs, allocated once and reused through [`reset`].
///
/// [`reset`]: RenderBuffers::reset
#[derive(Debug, Clone)]
pub struct RenderBuffers {
    pub color: ColorBuffer,
    pub depth: DepthBuffer,
    pub normals: Option<NormalBuffer>,
    /// Light-space depth from the shadow pass; has its own resolution.
    pub shadow: DepthBuffer,
    pub clear_color: Color,
}

impl RenderBuffers {
    pub fn new(width: usize, height: usize, shadow_width: usize, shadow_height: usize) -> Self {
        assert!(width > 0 && height > 0, "frame must not be empty");
        assert!(
            shadow_width > 0 && shadow_height > 0,
            "shadow map must not be empty"
        );
        let clear_color = [0, 0, 0, 255];
        Self {
            color: ColorBuffer::new(width, height, clear_color),
            depth: DepthBuffer::new(width, height),
            normals: Some(NormalBuffer::new(width, height)),
            shadow: DepthBuffer::new(shadow_width, shadow_height),
            clear_color,
        }
    }

    /// Skip the normal buffer (saves a Vec3 per pixel when nothing reads it).
    pub fn without_normals(mut self) -> Self {
        self.normals = None;
        self
    }

    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self.color.clear(color);
        self
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.color.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.color.height()
    }

    /// Restore every buffer to its initial sentinel without reallocating.
    pub fn reset(&mut self) {
        self.color.clear(self.clear_color);
        self.depth.clear();
        if let Some(normals) = self.normals.as_mut() {
            normals.clear();
        }
        self.shadow.clear();
    }
}

/// The buffers one draw call writes into. Color and normals are optional so the
/// same rasterizer serves depth-only passes.
pub struct DrawTarget<'a> {
    pub depth: &'a mut DepthBuffer,
    pub color: Option<&'a mut ColorBuffer>,
    pub normals: Option<&'a mut NormalBuffer>,
}

impl<'a> DrawTarget<'a> {
    /// Panics if the buffers disagree on dimensions.
    pub fn new(
        depth: &'a mut DepthBuffer,
        color: Option<&'a mut ColorBuffer>,
        normals: Option<&'a mut NormalBuffer>,
    ) -> Self {
        if let Some(color) = color.as_deref() {
            assert_eq!(
                (color.width(), color.height()),
                (depth.width(), depth.height()),
                "color and depth buffer sizes differ"
            );
        }
        if let Some(normals) = normals.as_deref() {
            assert_eq!(
                (normals.width(), normals.height()),
                (depth.width(), depth.height()),
                "normal and depth buffer sizes differ"
            );
        }
        Self {
            depth,
            color,
            normals,
        }
    }

    pub fn depth_only(depth: &'a mut DepthBuffer) -> Self {
        Self::new(depth, None, None)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.depth.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.depth.height()
    }

    /// Raw, shareable view of the target for the tile workers.
    pub(crate) fn raw(&mut self) -> RawTarget<'_> {
        RawTarget {
            width: self.depth.width(),
            height: self.depth.height(),
            depth: self.depth.data.as_mut_ptr(),
            color: self
                .color
                .as_deref_mut()
                .map_or(std::ptr::null_mut(), |c| c.image.as_mut_ptr()),
            normals: self
                .normals
                .as_deref_mut()
                .map_or(std::ptr::null_mut(), |n| n.data.as_mut_ptr()),
            _borrow: PhantomData,
        }
    }
}

/// Pointers into a [`DrawTarget`] that tile tasks share. Only
/// [`RawTarget::tile`] hands out write access, one rectangle at a time.
#[derive(Clone, Copy)]
pub(crate) struct RawTarget<'a> {
    width: usize,
    height: usize,
    depth: *mut f32,
    color: *mut u8,
    normals: *mut Vec3,
    _borrow: PhantomData<&'a mut ()>,
}

// Safety: the pointers stay valid for 'a (the DrawTarget is mutably borrowed)
// and writes only happen through TileViews over disjoint rectangles.
unsafe impl Send for RawTarget<'_> {}
unsafe impl Sync for RawTarget<'_> {}

impl<'a> RawTarget<'a> {
    /// Write access to pixels `x0..x1` x `y0..y1`.
    ///
    /// # Safety
    /// No two live `TileView`s from the same target may overlap.
    pub(crate) unsafe fn tile(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> TileView<'a> {
        debug_assert!(x0 <= x1 && x1 <= self.width);
        debug_assert!(y0 <= y1 && y1 <= self.height);
        TileView {
            target: *self,
            x0,
            y0,
            x1,
            y1,
        }
    }
}

/// Exclusive view of one tile's pixels in every buffer of a draw target.
pub(crate) struct TileView<'a> {
    target: RawTarget<'a>,
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

// Safety: a TileView owns its rectangle exclusively.
unsafe impl Send for TileView<'_> {}

impl TileView<'_> {
    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1);
        y * self.target.width + x
    }

    #[inline]
    pub fn depth(&self, x: usize, y: usize) -> f32 {
        let index = self.index(x, y);
        // Safety: index is inside this tile, which no other view aliases.
        unsafe { *self.target.depth.add(index) }
    }

    #[inline]
    pub fn write_depth(&mut self, x: usize, y: usize, depth: f32) {
        let index = self.index(x, y);
        unsafe {
            *self.target.depth.add(index) = depth;
        }
    }

    #[inline]
    pub fn write_color(&mut self, x: usize, y: usize, color: Color) {
        if self.target.color.is_null() {
            return;
        }
        let index = self.index(x, y) * 4;
        unsafe {
            std::ptr::copy_nonoverlapping(color.as_ptr(), self.target.color.add(index), 4);
        }
    }

    #[inline]
    pub fn write_normal(&mut self, x: usize, y: usize, normal: Vec3) {
        if self.target.normals.is_null() {
            return;
        }
        let index = self.index(x, y);
        unsafe {
            *self.target.normals.add(index) = normal;
        }
    }
}
