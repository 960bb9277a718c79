/// Tiled, parallel triangle rasterizer.
///
/// A draw call runs in two phases. Setup (calling thread): vertex shading,
/// near-plane rejection, backface culling and tile binning. Shading (thread
/// pool): one task per occupied tile walks the pixels of its rectangle that
/// fall inside each binned triangle's bounding box, evaluates barycentrics at
/// the pixel centre, depth-tests and runs the fragment stage. Tiles partition
/// the framebuffer, so tasks never share a pixel and need no locks.
use super::buffers::{DrawTarget, TileView};
use super::shader::{FragmentOutput, Shader, Varyings};
use super::tiles::{TileGrid, TileRect, DEFAULT_TILE_SIZE};
use crate::count_add;
use crate::count_call;
use crate::math::{determinant_2d, EPSILON};
use crate::mesh::Mesh;
#[cfg_attr(not(feature = "profiling"), allow(unused_imports))]
use crate::perf::FUNCTION_COUNTERS;
use crate::thread_pool::ThreadPool;
use glam::{Vec2, Vec3};
use parking_lot::Mutex;
use std::ops::AddAssign;

/// Barycentric coordinates of `p` with respect to triangle `(a, b, c)`.
///
/// The components always sum to one. For a degenerate triangle the result
/// is `(-1, 1, 1)`, which fails every inside test.
#[inline]
pub fn barycentric(a: Vec2, b: Vec2, c: Vec2, p: Vec2) -> Vec3 {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;

    let denom = determinant_2d(v0, v1);
    if denom.abs() < EPSILON {
        return Vec3::new(-1.0, 1.0, 1.0);
    }

    let beta = determinant_2d(v2, v1) / denom;
    let gamma = determinant_2d(v0, v2) / denom;
    Vec3::new(1.0 - beta - gamma, beta, gamma)
}

/// Half the cross product of the screen edges: positive when `a, b, c`
/// wind counter-clockwise with +Y up.
#[inline]
pub fn signed_area(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    0.5 * determinant_2d(b - a, c - a)
}

/// Axis-aligned screen-space bounds of a triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec2,
    pub max: Vec2,
}

impl BoundingBox {
    pub fn from_points(points: &[Vec3; 3]) -> Self {
        let [a, b, c] = points.map(|p| p.truncate());
        Self {
            min: a.min(b).min(c),
            max: a.max(b).max(c),
        }
    }

    /// Inclusive range of pixels whose centres `(x + 0.5, y + 0.5)` lie in
    /// the box, unclamped: `(min_x, min_y, max_x, max_y)`.
    #[inline]
    pub fn pixel_range(&self) -> (i64, i64, i64, i64) {
        (
            (self.min.x - 0.5).ceil() as i64,
            (self.min.y - 0.5).ceil() as i64,
            (self.max.x - 0.5).floor() as i64,
            (self.max.y - 0.5).floor() as i64,
        )
    }
}

/// Counters for one draw call (or summed over several).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub triangles: u64,
    pub culled: u64,
    pub near_rejected: u64,
    pub binned: u64,
    pub tiles: u64,
    pub pixels_tested: u64,
    pub depth_passed: u64,
    pub fragments_shaded: u64,
    pub fragments_discarded: u64,
}

impl AddAssign for DrawStats {
    fn add_assign(&mut self, rhs: Self) {
        self.triangles += rhs.triangles;
        self.culled += rhs.culled;
        self.near_rejected += rhs.near_rejected;
        self.binned += rhs.binned;
        self.tiles += rhs.tiles;
        self.pixels_tested += rhs.pixels_tested;
        self.depth_passed += rhs.depth_passed;
        self.fragments_shaded += rhs.fragments_shaded;
        self.fragments_discarded += rhs.fragments_discarded;
    }
}

/// A triangle that survived setup.
struct Triangle {
    varyings: [Varyings; 3],
    screen: [Vec2; 3],
    pixels: (i64, i64, i64, i64),
}

#[derive(Debug, Clone, Copy)]
pub struct Rasterizer {
    /// Drop triangles that wind clockwise on screen.
    pub backface_culling: bool,
    pub tile_size: usize,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self {
            backface_culling: true,
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

impl Rasterizer {
    pub fn new(backface_culling: bool) -> Self {
        Self {
            backface_culling,
            ..Default::default()
        }
    }

    /// Rasterize every face of `mesh` with `shader` into `target`.
    ///
    /// Returns once every tile task has finished.
    pub fn draw(
        &self,
        pool: &ThreadPool,
        mesh: &Mesh,
        shader: &dyn Shader,
        target: &mut DrawTarget<'_>,
    ) -> DrawStats {
        count_call!(FUNCTION_COUNTERS.draw_calls);
        let mut stats = DrawStats::default();
        if mesh.is_empty() {
            return stats;
        }

        let triangles = self.setup(mesh, shader, target.width(), target.height(), &mut stats);

        let mut grid = TileGrid::new(target.width(), target.height(), self.tile_size);
        for (index, tri) in triangles.iter().enumerate() {
            let (x0, y0, x1, y1) = tri.pixels;
            if grid.add_triangle(index as u32, x0, y0, x1, y1) {
                stats.binned += 1;
            }
        }
        count_add!(FUNCTION_COUNTERS.triangles_binned, stats.binned);

        let depth_only = shader.is_depth_only();
        let totals = Mutex::new(stats);
        let raw = target.raw();

        pool.scope(|scope| {
            for (rect, bin) in grid.occupied() {
                count_call!(FUNCTION_COUNTERS.tiles_dispatched);
                // Safety: TileGrid rectangles are pairwise disjoint.
                let view = unsafe { raw.tile(rect.x0, rect.y0, rect.x1, rect.y1) };
                let triangles = &triangles;
                let totals = &totals;
                scope.enqueue(move || {
                    let tile_stats = shade_tile(view, rect, bin, triangles, shader, depth_only);
                    *totals.lock() += tile_stats;
                });
            }
        });

        let stats = totals.into_inner();
        log::trace!("draw: {stats:?}");
        stats
    }

    /// Vertex stage plus per-triangle rejection.
    fn setup(
        &self,
        mesh: &Mesh,
        shader: &dyn Shader,
        width: usize,
        height: usize,
        stats: &mut DrawStats,
    ) -> Vec<Triangle> {
        let mut triangles = Vec::with_capacity(mesh.len());

        for (index, face) in mesh.faces().iter().enumerate() {
            count_call!(FUNCTION_COUNTERS.triangles_submitted);
            stats.triangles += 1;

            let basis = mesh.basis(index);
            let varyings = [0, 1, 2].map(|k| {
                shader.vertex(
                    face.positions[k],
                    face.normals[k],
                    face.uvs[k],
                    basis.tangent,
                    basis.bitangent,
                )
            });

            if !varyings.iter().all(Varyings::is_projectable) {
                count_call!(FUNCTION_COUNTERS.triangles_near_rejected);
                stats.near_rejected += 1;
                continue;
            }

            let screen = varyings.map(|v| v.screen_pos.truncate());
            if self.backface_culling && signed_area(screen[0], screen[1], screen[2]) <= 0.0 {
                count_call!(FUNCTION_COUNTERS.triangles_culled);
                stats.culled += 1;
                continue;
            }

            // Clamped to the target; far vertices saturate the i64 cast.
            let (x0, y0, x1, y1) = BoundingBox::from_points(&varyings.map(|v| v.screen_pos))
                .pixel_range();
            triangles.push(Triangle {
                varyings,
                screen,
                pixels: (
                    x0.max(0),
                    y0.max(0),
                    x1.min(width as i64 - 1),
                    y1.min(height as i64 - 1),
                ),
            });
        }

        triangles
    }
}

/// Shade every binned triangle over one tile.
fn shade_tile(
    mut view: TileView<'_>,
    rect: TileRect,
    bin: &[u32],
    triangles: &[Triangle],
    shader: &dyn Shader,
    depth_only: bool,
) -> DrawStats {
    let mut stats = DrawStats {
        tiles: 1,
        ..Default::default()
    };
    let mut out = FragmentOutput::default();

    for &index in bin {
        let tri = &triangles[index as usize];
        let [v0, v1, v2] = &tri.varyings;
        let [a, b, c] = tri.screen;

        // Binning guarantees overlap, so these ranges are non-empty.
        let (px0, py0, px1, py1) = tri.pixels;
        let x_start = (px0.max(rect.x0 as i64)) as usize;
        let y_start = (py0.max(rect.y0 as i64)) as usize;
        let x_end = (px1 + 1).min(rect.x1 as i64).max(x_start as i64) as usize;
        let y_end = (py1 + 1).min(rect.y1 as i64).max(y_start as i64) as usize;

        for y in y_start..y_end {
            for x in x_start..x_end {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let bc = barycentric(a, b, c, p);
                if bc.x < 0.0 || bc.y < 0.0 || bc.z < 0.0 {
                    continue;
                }

                count_call!(FUNCTION_COUNTERS.pixels_tested);
                stats.pixels_tested += 1;
                let z = v0.screen_pos.z * bc.x + v1.screen_pos.z * bc.y + v2.screen_pos.z * bc.z;
                let passed = z > view.depth(x, y);
                if !passed {
                    count_call!(FUNCTION_COUNTERS.depth_test_failed);
                    continue;
                }
                count_call!(FUNCTION_COUNTERS.depth_test_passed);
                stats.depth_passed += 1;

                if depth_only {
                    view.write_depth(x, y, z);
                    continue;
                }

                let varyings = Varyings::interpolate(v0, v1, v2, bc);
                out.normal = None;
                if shader.fragment(&varyings, &mut out) {
                    count_call!(FUNCTION_COUNTERS.fragments_discarded);
                    stats.fragments_discarded += 1;
                    continue;
                }
                count_call!(FUNCTION_COUNTERS.fragments_shaded);
                stats.fragments_shaded += 1;

                view.write_depth(x, y, z);
                view.write_color(x, y, out.color);
                if let Some(normal) = out.normal {
                    view.write_normal(x, y, normal);
                }
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_covers_all_points() {
        let bbox = BoundingBox::from_points(&[
            Vec3::new(3.0, 1.0, 0.0),
            Vec3::new(-2.0, 4.0, 0.0),
            Vec3::new(1.0, -5.0, 0.0),
        ]);
        assert_eq!(bbox.min, Vec2::new(-2.0, -5.0));
        assert_eq!(bbox.max, Vec2::new(3.0, 4.0));
    }

    #[test]
    fn pixel_range_uses_pixel_centres() {
        let bbox = BoundingBox {
            min: Vec2::new(0.0, 0.6),
            max: Vec2::new(2.0, 2.4),
        };
        // centres 0.5 and 1.5 in x; only 1.5 in y
        assert_eq!(bbox.pixel_range(), (0, 1, 1, 1));
    }

    #[test]
    fn signed_area_sign_follows_winding() {
        let (a, b, c) = (Vec2::ZERO, Vec2::X, Vec2::Y);
        assert_eq!(signed_area(a, b, c), 0.5);
        assert_eq!(signed_area(a, c, b), -0.5);
    }

    #[test]
    fn draw_stats_accumulate() {
        let mut total = DrawStats {
            triangles: 2,
            ..Default::default()
        };
        total += DrawStats {
            triangles: 3,
            culled: 1,
            ..Default::default()
        };
        assert_eq!(total.triangles, 5);
        assert_eq!(total.culled, 1);
    }
}
