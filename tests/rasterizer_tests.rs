// Tiled rasterizer behaviour tests
//
// Shaders here place vertices directly in pixel space (identity uniforms), so
// expected coverage can be computed independently with `barycentric`.

use glam::{Vec2, Vec3};
use soft_renderer::math;
use soft_renderer::rendering::{
    barycentric, ColorBuffer, DepthBuffer, DrawTarget, FragmentOutput, NormalBuffer, Rasterizer,
    Shader, Uniforms, Varyings,
};
use soft_renderer::{Face, Mesh, ThreadPool};
use std::sync::atomic::{AtomicU32, Ordering};

/// Positions are screen coordinates; z is depth.
struct FlatShader {
    color: [u8; 4],
}

impl Shader for FlatShader {
    fn vertex(&self, position: Vec3, _: Vec3, _: Vec2, _: Vec3, _: Vec3) -> Varyings {
        Varyings {
            screen_pos: position,
            normal: Vec3::Z,
            ..Default::default()
        }
    }

    fn fragment(&self, _: &Varyings, out: &mut FragmentOutput) -> bool {
        out.color = self.color;
        out.normal = Some(Vec3::Z);
        false
    }
}

/// Counts fragment invocations per pixel.
struct CountingShader {
    width: usize,
    hits: Vec<AtomicU32>,
}

impl CountingShader {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            hits: (0..width * height).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    fn hits(&self, x: usize, y: usize) -> u32 {
        self.hits[y * self.width + x].load(Ordering::Relaxed)
    }
}

impl Shader for CountingShader {
    fn vertex(&self, position: Vec3, _: Vec3, _: Vec2, _: Vec3, _: Vec3) -> Varyings {
        Varyings {
            screen_pos: position,
            ..Default::default()
        }
    }

    fn fragment(&self, v: &Varyings, out: &mut FragmentOutput) -> bool {
        let x = v.screen_pos.x.floor() as usize;
        let y = v.screen_pos.y.floor() as usize;
        self.hits[y * self.width + x].fetch_add(1, Ordering::Relaxed);
        out.color = [255; 4];
        false
    }
}

fn triangle(a: Vec3, b: Vec3, c: Vec3) -> Face {
    Face::new([a, b, c], [Vec3::Z; 3], [Vec2::ZERO; 3])
}

fn draw(
    pool: &ThreadPool,
    rasterizer: &Rasterizer,
    mesh: &Mesh,
    shader: &dyn Shader,
    color: &mut ColorBuffer,
    depth: &mut DepthBuffer,
) -> soft_renderer::DrawStats {
    let mut target = DrawTarget::new(depth, Some(color), None);
    rasterizer.draw(pool, mesh, shader, &mut target)
}

#[test]
fn test_depth_order_independence() {
    let pool = ThreadPool::new(4).unwrap();
    let rasterizer = Rasterizer::default();

    let near = Mesh::new(vec![triangle(
        Vec3::new(4.0, 4.0, 0.8),
        Vec3::new(60.0, 4.0, 0.8),
        Vec3::new(4.0, 60.0, 0.8),
    )]);
    let far = Mesh::new(vec![triangle(
        Vec3::new(10.0, 10.0, 0.2),
        Vec3::new(62.0, 20.0, 0.2),
        Vec3::new(20.0, 62.0, 0.2),
    )]);
    let red = FlatShader { color: [255, 0, 0, 255] };
    let blue = FlatShader { color: [0, 0, 255, 255] };

    let mut color_ab = ColorBuffer::new(64, 64, [0, 0, 0, 255]);
    let mut depth_ab = DepthBuffer::new(64, 64);
    draw(&pool, &rasterizer, &near, &red, &mut color_ab, &mut depth_ab);
    draw(&pool, &rasterizer, &far, &blue, &mut color_ab, &mut depth_ab);

    let mut color_ba = ColorBuffer::new(64, 64, [0, 0, 0, 255]);
    let mut depth_ba = DepthBuffer::new(64, 64);
    draw(&pool, &rasterizer, &far, &blue, &mut color_ba, &mut depth_ba);
    draw(&pool, &rasterizer, &near, &red, &mut color_ba, &mut depth_ba);

    assert_eq!(color_ab.raw(), color_ba.raw());
    assert_eq!(depth_ab.as_slice(), depth_ba.as_slice());
    // Inside both triangles the nearer (larger depth) one wins.
    assert_eq!(color_ab.get(20, 20), [255, 0, 0, 255]);
    assert!((depth_ab.get(20, 20) - 0.8).abs() < 1e-6);
}

#[test]
fn test_tile_boundary_pixels_shaded_exactly_once() {
    let pool = ThreadPool::new(4).unwrap();
    let (w, h) = (100, 80);
    let rasterizer = Rasterizer {
        backface_culling: true,
        tile_size: 16,
    };

    // Vertices sit exactly on tile corners so edges run along tile seams.
    let (a, b, c) = (
        Vec3::new(0.0, 0.0, 0.5),
        Vec3::new(96.0, 16.0, 0.5),
        Vec3::new(32.0, 80.0, 0.5),
    );
    let mesh = Mesh::new(vec![triangle(a, b, c)]);
    let shader = CountingShader::new(w, h);

    let mut color = ColorBuffer::new(w, h, [0, 0, 0, 255]);
    let mut depth = DepthBuffer::new(w, h);
    let stats = draw(&pool, &rasterizer, &mesh, &shader, &mut color, &mut depth);
    assert!(stats.tiles > 1);

    let mut inside = 0;
    for y in 0..h {
        for x in 0..w {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let bc = barycentric(a.truncate(), b.truncate(), c.truncate(), p);
            let expected = u32::from(bc.x >= 0.0 && bc.y >= 0.0 && bc.z >= 0.0);
            inside += expected;
            assert_eq!(shader.hits(x, y), expected, "pixel ({x}, {y})");
        }
    }
    assert_eq!(stats.fragments_shaded, inside as u64);
}

#[test]
fn test_backface_culling_follows_winding() {
    let pool = ThreadPool::new(2).unwrap();
    let clockwise = Mesh::new(vec![triangle(
        Vec3::new(2.0, 2.0, 0.5),
        Vec3::new(2.0, 30.0, 0.5),
        Vec3::new(30.0, 2.0, 0.5),
    )]);
    let shader = FlatShader { color: [0, 255, 0, 255] };

    let mut color = ColorBuffer::new(32, 32, [0, 0, 0, 255]);
    let mut depth = DepthBuffer::new(32, 32);
    let stats = draw(&pool, &Rasterizer::new(true), &clockwise, &shader, &mut color, &mut depth);
    assert_eq!(stats.culled, 1);
    assert_eq!(color.get(5, 5), [0, 0, 0, 255]);

    let stats = draw(&pool, &Rasterizer::new(false), &clockwise, &shader, &mut color, &mut depth);
    assert_eq!(stats.culled, 0);
    assert_eq!(color.get(5, 5), [0, 255, 0, 255]);
}

#[test]
fn test_degenerate_triangle_writes_nothing() {
    let pool = ThreadPool::new(2).unwrap();
    let mesh = Mesh::new(vec![triangle(
        Vec3::new(0.0, 5.0, 0.5),
        Vec3::new(10.0, 5.0, 0.5),
        Vec3::new(20.0, 5.0, 0.5),
    )]);
    let shader = FlatShader { color: [255; 4] };
    let mut color = ColorBuffer::new(32, 32, [0, 0, 0, 255]);
    let mut depth = DepthBuffer::new(32, 32);
    let stats = draw(&pool, &Rasterizer::new(false), &mesh, &shader, &mut color, &mut depth);
    assert_eq!(stats.fragments_shaded, 0);
    assert!(depth.as_slice().iter().all(|d| DepthBuffer::is_background(*d)));
}

#[test]
fn test_near_plane_crossing_triangle_is_rejected() {
    struct ProjectingShader(Uniforms<'static>);
    impl Shader for ProjectingShader {
        fn vertex(&self, position: Vec3, _: Vec3, _: Vec2, _: Vec3, _: Vec3) -> Varyings {
            let (screen_pos, inv_w) = self.0.project(position);
            Varyings {
                screen_pos,
                inv_w,
                ..Default::default()
            }
        }
        fn fragment(&self, _: &Varyings, _: &mut FragmentOutput) -> bool {
            false
        }
    }

    let pool = ThreadPool::new(2).unwrap();
    let shader = ProjectingShader(Uniforms {
        projection: math::projection(1.0),
        viewport: math::viewport(0.0, 0.0, 32.0, 32.0),
        ..Default::default()
    });
    // One vertex behind the eye (w = 1 - 3 < 0).
    let mesh = Mesh::new(vec![triangle(
        Vec3::new(-0.5, -0.5, -1.0),
        Vec3::new(0.5, -0.5, -1.0),
        Vec3::new(0.0, 0.5, 3.0),
    )]);
    let mut color = ColorBuffer::new(32, 32, [0, 0, 0, 255]);
    let mut depth = DepthBuffer::new(32, 32);
    let stats = draw(&pool, &Rasterizer::new(false), &mesh, &shader, &mut color, &mut depth);
    assert_eq!(stats.near_rejected, 1);
    assert_eq!(stats.binned, 0);
}

#[test]
fn test_depth_only_target_and_normals() {
    let pool = ThreadPool::new(2).unwrap();
    let mesh = Mesh::new(vec![triangle(
        Vec3::new(0.0, 0.0, 0.3),
        Vec3::new(40.0, 0.0, 0.3),
        Vec3::new(0.0, 40.0, 0.3),
    )]);
    let shader = FlatShader { color: [9, 9, 9, 255] };

    let mut depth = DepthBuffer::new(40, 40);
    let mut target = DrawTarget::depth_only(&mut depth);
    Rasterizer::default().draw(&pool, &mesh, &shader, &mut target);
    assert!((depth.get(2, 2) - 0.3).abs() < 1e-6);

    let mut depth = DepthBuffer::new(40, 40);
    let mut color = ColorBuffer::new(40, 40, [0; 4]);
    let mut normals = NormalBuffer::new(40, 40);
    let mut target = DrawTarget::new(&mut depth, Some(&mut color), Some(&mut normals));
    Rasterizer::default().draw(&pool, &mesh, &shader, &mut target);
    assert_eq!(normals.get(2, 2), Vec3::Z);
    assert_eq!(normals.get(38, 38), Vec3::ZERO);
}

#[test]
fn test_far_offscreen_vertices_still_cover_screen() {
    let pool = ThreadPool::new(2).unwrap();
    let mesh = Mesh::new(vec![triangle(
        Vec3::new(0.0, 0.0, 0.5),
        Vec3::new(1e20, 0.0, 0.5),
        Vec3::new(0.0, 1e20, 0.5),
    )]);
    let shader = FlatShader { color: [255, 0, 0, 255] };
    let mut color = ColorBuffer::new(32, 32, [0, 0, 0, 255]);
    let mut depth = DepthBuffer::new(32, 32);
    let stats = draw(&pool, &Rasterizer::default(), &mesh, &shader, &mut color, &mut depth);

    assert_eq!(stats.binned, 1);
    assert_eq!(stats.fragments_shaded, 32 * 32);
    assert_eq!(color.get(5, 5), [255, 0, 0, 255]);
    assert_eq!(color.get(31, 31), [255, 0, 0, 255]);
}

#[test]
fn test_empty_mesh_is_noop() {
    let pool = ThreadPool::new(1).unwrap();
    let shader = FlatShader { color: [255; 4] };
    let mut color = ColorBuffer::new(8, 8, [0, 0, 0, 255]);
    let mut depth = DepthBuffer::new(8, 8);
    let stats = draw(&pool, &Rasterizer::default(), &Mesh::default(), &shader, &mut color, &mut depth);
    assert_eq!(stats, soft_renderer::DrawStats::default());
}
