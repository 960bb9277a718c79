// Barycentric evaluation properties
//
// The rasterizer's inside test and every interpolated attribute depend on
// these weights, so they are checked against a spread of triangle shapes.

use glam::Vec2;
use soft_renderer::rendering::barycentric;

const EPS: f32 = 1e-4;

fn triangles() -> Vec<[Vec2; 3]> {
    vec![
        [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)],
        [Vec2::new(10.0, 5.0), Vec2::new(300.0, 40.0), Vec2::new(120.0, 250.0)],
        // clockwise
        [Vec2::new(0.0, 0.0), Vec2::new(0.0, 64.0), Vec2::new(64.0, 0.0)],
        // long and thin
        [Vec2::new(-50.0, 3.0), Vec2::new(700.0, 4.0), Vec2::new(20.0, 9.5)],
    ]
}

#[test]
fn test_vertices_map_to_unit_coordinates() {
    for [a, b, c] in triangles() {
        let at_a = barycentric(a, b, c, a);
        let at_b = barycentric(a, b, c, b);
        let at_c = barycentric(a, b, c, c);

        assert!((at_a - glam::Vec3::X).length() < EPS, "A -> {at_a:?}");
        assert!((at_b - glam::Vec3::Y).length() < EPS, "B -> {at_b:?}");
        assert!((at_c - glam::Vec3::Z).length() < EPS, "C -> {at_c:?}");
    }
}

#[test]
fn test_coordinates_sum_to_one_inside_and_outside() {
    let queries = [
        Vec2::new(0.25, 0.25),
        Vec2::new(-10.0, 3.0),
        Vec2::new(1000.0, -1000.0),
        Vec2::new(64.0, 64.0),
        Vec2::new(150.0, 100.0),
    ];
    for [a, b, c] in triangles() {
        for p in queries {
            let bc = barycentric(a, b, c, p);
            let sum = bc.x + bc.y + bc.z;
            assert!((sum - 1.0).abs() < EPS, "sum {sum} for {p:?}");
        }
    }
}

#[test]
fn test_centroid_has_equal_weights() {
    for [a, b, c] in triangles() {
        let centroid = (a + b + c) / 3.0;
        let bc = barycentric(a, b, c, centroid);
        for w in bc.to_array() {
            assert!((w - 1.0 / 3.0).abs() < 1e-3, "{bc:?}");
        }
    }
}

#[test]
fn test_outside_point_has_negative_component() {
    let [a, b, c] = triangles()[0];
    let bc = barycentric(a, b, c, Vec2::new(1.0, 1.0));
    assert!(bc.x < 0.0 || bc.y < 0.0 || bc.z < 0.0);
}

#[test]
fn test_collinear_points_never_inside() {
    let (a, b, c) = (Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0));
    for p in [a, b, c, Vec2::new(0.5, 0.0), Vec2::new(1.0, 1.0)] {
        let bc = barycentric(a, b, c, p);
        assert!(
            bc.x < 0.0 || bc.y < 0.0 || bc.z < 0.0,
            "degenerate triangle reported {bc:?} for {p:?}"
        );
    }
}
