/// Programmable stages of the pipeline.
///
/// A [`Shader`] turns mesh vertices into screen-space [`Varyings`] and
/// colours the pixels the rasterizer hands back. Attributes other than the
/// screen position and `inv_w` travel pre-multiplied by `inv_w`, so the
/// rasterizer can interpolate linearly in screen space and the fragment
/// stage recovers perspective-correct values by dividing once.
use super::buffers::{Color, DepthBuffer};
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

/// Clip-space W below which a vertex is treated as behind the eye.
pub const NEAR_W_EPS: f32 = 0.001;

/// Per-vertex output of the vertex stage, and per-pixel interpolation result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Varyings {
    /// Pixel x, pixel y, depth (larger is nearer). Not scaled by `inv_w`.
    pub screen_pos: Vec3,
    pub uv: Vec2,
    pub normal: Vec3,
    pub world_pos: Vec3,
    pub tangent: Vec3,
    pub bitangent: Vec3,
    /// `1 / clip_w`; zero marks a vertex rejected by the near-plane guard.
    pub inv_w: f32,
}

impl Default for Varyings {
    fn default() -> Self {
        Self {
            screen_pos: Vec3::ZERO,
            uv: Vec2::ZERO,
            normal: Vec3::ZERO,
            world_pos: Vec3::ZERO,
            tangent: Vec3::ZERO,
            bitangent: Vec3::ZERO,
            inv_w: 1.0,
        }
    }
}

impl Varyings {
    /// Barycentric-weighted sum of every field.
    ///
    /// This is the single interpolation law of the pipeline; it is not part
    /// of the [`Shader`] trait so no shader can replace it.
    #[inline]
    pub fn interpolate(v0: &Varyings, v1: &Varyings, v2: &Varyings, bc: Vec3) -> Varyings {
        let (a, b, c) = (bc.x, bc.y, bc.z);
        Varyings {
            screen_pos: v0.screen_pos * a + v1.screen_pos * b + v2.screen_pos * c,
            uv: v0.uv * a + v1.uv * b + v2.uv * c,
            normal: v0.normal * a + v1.normal * b + v2.normal * c,
            world_pos: v0.world_pos * a + v1.world_pos * b + v2.world_pos * c,
            tangent: v0.tangent * a + v1.tangent * b + v2.tangent * c,
            bitangent: v0.bitangent * a + v1.bitangent * b + v2.bitangent * c,
            inv_w: v0.inv_w * a + v1.inv_w * b + v2.inv_w * c,
        }
    }

    /// False for vertices the near-plane guard rejected or whose screen
    /// position is not finite.
    #[inline]
    pub fn is_projectable(&self) -> bool {
        self.inv_w > 0.0 && self.screen_pos.is_finite()
    }

    /// Clip `w` recovered from the interpolated `inv_w`.
    #[inline]
    pub fn w(&self) -> f32 {
        1.0 / self.inv_w
    }
}

/// Light-space depth produced by the shadow pass.
#[derive(Debug, Clone, Copy)]
pub struct ShadowMap<'a> {
    pub depth: &'a DepthBuffer,
    pub light_proj_view: Mat4,
}

impl ShadowMap<'_> {
    /// Fraction of the `(2r+1)^2` neighbourhood around `world_pos`'s
    /// shadow-map texel from which the light is visible (1 = fully lit).
    ///
    /// Points that project outside the map, or behind the light, are lit.
    /// Neighbour samples are clamped to the map edge.
    pub fn visibility(&self, world_pos: Vec3, bias: f32, radius: i32) -> f32 {
        let clip = self.light_proj_view * world_pos.extend(1.0);
        if clip.w < NEAR_W_EPS {
            return 1.0;
        }
        let ndc = clip.truncate() / clip.w;

        let width = self.depth.width() as i64;
        let height = self.depth.height() as i64;
        let sx = ((ndc.x + 1.0) * 0.5 * width as f32).floor();
        let sy = ((ndc.y + 1.0) * 0.5 * height as f32).floor();
        if !(sx >= 0.0 && sy >= 0.0 && sx < width as f32 && sy < height as f32) {
            return 1.0;
        }
        let (sx, sy) = (sx as i64, sy as i64);
        let current = (ndc.z + 1.0) * 0.5;

        let radius = radius.max(0) as i64;
        let mut lit = 0u32;
        let mut total = 0u32;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let x = (sx + dx).clamp(0, width - 1) as usize;
                let y = (sy + dy).clamp(0, height - 1) as usize;
                let closest = self.depth.get(x, y);
                // Shadowed only when something recorded is nearer the light
                // by more than the bias.
                if current >= closest - bias {
                    lit += 1;
                }
                total += 1;
            }
        }
        lit as f32 / total as f32
    }
}

/// Constants for one draw call. Rebuilt per model instance per pass.
#[derive(Debug, Clone, Copy)]
pub struct Uniforms<'a> {
    pub model: Mat4,
    pub model_view: Mat4,
    pub projection: Mat4,
    pub viewport: Mat4,
    pub normal_matrix: Mat3,
    pub light_dir: Vec3,
    pub camera_pos: Vec3,
    pub shadow: Option<ShadowMap<'a>>,
}

impl Default for Uniforms<'_> {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY,
            model_view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            viewport: Mat4::IDENTITY,
            normal_matrix: Mat3::IDENTITY,
            light_dir: Vec3::ZERO,
            camera_pos: Vec3::ZERO,
            shadow: None,
        }
    }
}

impl Uniforms<'_> {
    /// Local position to `(screen position, inv_w)`.
    ///
    /// A clip `w` under [`NEAR_W_EPS`] yields `inv_w == 0` and a NaN screen
    /// position; the rasterizer drops any triangle touching such a vertex.
    #[inline]
    pub fn project(&self, local: Vec3) -> (Vec3, f32) {
        let clip: Vec4 = self.projection * self.model_view * local.extend(1.0);
        if clip.w < NEAR_W_EPS {
            return (Vec3::NAN, 0.0);
        }
        let inv_w = 1.0 / clip.w;
        let screen = self.viewport * (clip * inv_w);
        (screen.truncate(), inv_w)
    }
}

/// What a fragment stage produces for one pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragmentOutput {
    pub color: Color,
    /// World-space normal for the normal buffer, if the shader has one.
    pub normal: Option<Vec3>,
}

impl Default for FragmentOutput {
    fn default() -> Self {
        Self {
            color: [0, 0, 0, 255],
            normal: None,
        }
    }
}

/// Vertex and fragment stages of a draw call.
///
/// Shaders are shared across tile workers, so both stages take `&self` and
/// must not rely on per-call mutable state.
pub trait Shader: Send + Sync {
    /// Transform one vertex. Every attribute except `screen_pos` and `inv_w`
    /// must be returned multiplied by `inv_w`.
    fn vertex(
        &self,
        position: Vec3,
        normal: Vec3,
        uv: Vec2,
        tangent: Vec3,
        bitangent: Vec3,
    ) -> Varyings;

    /// Shade one pixel from interpolated (not yet perspective-divided)
    /// varyings. Returns `true` to discard the pixel.
    fn fragment(&self, varyings: &Varyings, out: &mut FragmentOutput) -> bool;

    /// Depth-only shaders get depth written at every passing pixel and never
    /// have `fragment` invoked.
    fn is_depth_only(&self) -> bool {
        false
    }
}
