/// Procedural meshes for demos, tests and benchmarks.
use super::{Face, Mesh};
use glam::{Vec2, Vec3};

/// Quad corners in counter-clockwise order seen from `normal`.
fn push_quad(faces: &mut Vec<Face>, corners: [Vec3; 4], normal: Vec3) {
    let uvs = [
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(0.0, 1.0),
    ];
    for (i0, i1, i2) in [(0, 1, 2), (0, 2, 3)] {
        faces.push(Face::new(
            [corners[i0], corners[i1], corners[i2]],
            [normal; 3],
            [uvs[i0], uvs[i1], uvs[i2]],
        ));
    }
}

impl Mesh {
    /// Axis-aligned cube centred on the origin with outward winding.
    pub fn cube(size: f32) -> Self {
        let h = size * 0.5;
        let mut faces = Vec::with_capacity(12);

        // (normal, u axis, v axis); u x v == normal keeps the quad CCW from outside
        let sides = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        for (normal, u, v) in sides {
            let center = normal * h;
            let corners = [
                center - u * h - v * h,
                center + u * h - v * h,
                center + u * h + v * h,
                center - u * h + v * h,
            ];
            push_quad(&mut faces, corners, normal);
        }

        Mesh::new(faces)
    }

    /// Square in the XZ plane at y = 0, facing +Y.
    pub fn plane(size: f32) -> Self {
        let h = size * 0.5;
        let mut faces = Vec::with_capacity(2);
        push_quad(
            &mut faces,
            [
                Vec3::new(-h, 0.0, h),
                Vec3::new(h, 0.0, h),
                Vec3::new(h, 0.0, -h),
                Vec3::new(-h, 0.0, -h),
            ],
            Vec3::Y,
        );
        Mesh::new(faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_winding_points_outward() {
        let cube = Mesh::cube(2.0);
        assert_eq!(cube.len(), 12);
        for face in cube.faces() {
            let centroid = (face.positions[0] + face.positions[1] + face.positions[2]) / 3.0;
            assert!(face.geometric_normal().dot(centroid) > 0.0);
            assert!((face.geometric_normal() - face.normals[0]).length() < 1e-5);
        }
    }

    #[test]
    fn plane_faces_up() {
        let plane = Mesh::plane(4.0);
        for face in plane.faces() {
            assert!((face.geometric_normal() - Vec3::Y).length() < 1e-5);
        }
    }
}
