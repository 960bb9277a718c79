/// Camera and framing matrices on top of glam.
///
/// Conventions: right-handed world, camera looking down -Z, column vectors.
/// The viewport keeps +Y up and maps NDC depth [-1, 1] to [0, 1], so a larger
/// screen depth is nearer to the viewer for every matrix built here.
use glam::{Mat3, Mat4, Vec3, Vec4};

/// Determinants below this are treated as singular.
pub const EPSILON: f32 = 1e-5;

/// World-to-camera transform.
#[inline]
pub fn look_at(eye: Vec3, center: Vec3, up: Vec3) -> Mat4 {
    Mat4::look_at_rh(eye, center, up)
}

/// Simple perspective: `w' = w - z / camera_distance`.
///
/// Points in front of the camera (negative view-space z) get `w' > 1`, so
/// the divide shrinks them; a non-positive distance yields identity.
pub fn projection(camera_distance: f32) -> Mat4 {
    if camera_distance <= 0.0 {
        return Mat4::IDENTITY;
    }
    Mat4::from_cols(
        Vec4::X,
        Vec4::Y,
        Vec4::new(0.0, 0.0, 1.0, -1.0 / camera_distance),
        Vec4::W,
    )
}

/// NDC to pixel coordinates for the rectangle `(x, y, w, h)`.
pub fn viewport(x: f32, y: f32, w: f32, h: f32) -> Mat4 {
    Mat4::from_cols(
        Vec4::new(w * 0.5, 0.0, 0.0, 0.0),
        Vec4::new(0.0, h * 0.5, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 0.5, 0.0),
        Vec4::new(x + w * 0.5, y + h * 0.5, 0.5, 1.0),
    )
}

/// Inverse-transpose of the model's upper 3x3, for transforming normals
/// under non-uniform scale. Falls back to identity for singular models.
pub fn normal_matrix(model: &Mat4) -> Mat3 {
    let upper = Mat3::from_mat4(*model);
    if upper.determinant().abs() < EPSILON {
        return Mat3::IDENTITY;
    }
    upper.inverse().transpose()
}

/// 2D cross product (determinant of the 2x2 matrix with columns `a`, `b`).
#[inline]
pub fn determinant_2d(a: glam::Vec2, b: glam::Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_maps_ndc_corners_to_pixels() {
        let vp = viewport(0.0, 0.0, 800.0, 600.0);
        let lo = vp * Vec4::new(-1.0, -1.0, -1.0, 1.0);
        let hi = vp * Vec4::new(1.0, 1.0, 1.0, 1.0);
        assert!((lo.truncate() - Vec3::new(0.0, 0.0, 0.0)).length() < 1e-5);
        assert!((hi.truncate() - Vec3::new(800.0, 600.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn projection_makes_nearer_points_larger_depth() {
        let proj = projection(3.0);
        let near = proj * Vec4::new(0.0, 0.0, -1.0, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, -2.0, 1.0);
        assert!(near.z / near.w > far.z / far.w);
        assert!(near.w > 1.0);
    }

    #[test]
    fn normal_matrix_corrects_non_uniform_scale() {
        let model = Mat4::from_scale(Vec3::new(4.0, 1.0, 1.0));
        // Surface normal of the plane x + y = 0 stretched along X.
        let n = (normal_matrix(&model) * Vec3::new(1.0, 1.0, 0.0)).normalize();
        let tangent = model.transform_vector3(Vec3::new(1.0, -1.0, 0.0));
        assert!(n.dot(tangent).abs() < 1e-5);
    }

    #[test]
    fn singular_model_falls_back_to_identity() {
        let model = Mat4::from_scale(Vec3::new(0.0, 1.0, 1.0));
        assert_eq!(normal_matrix(&model), Mat3::IDENTITY);
    }
}
