/// Triangle mesh data consumed by the rasterizer.
///
/// Faces carry fully resolved attributes (no index indirection); index
/// resolution happens once, in the loader. The per-face tangent basis is
/// computed at construction so static meshes do not pay for it every frame.
pub mod obj;
pub mod primitives;

use glam::{Vec2, Vec3};
use rayon::prelude::*;

/// One triangle with resolved per-corner attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub positions: [Vec3; 3],
    pub normals: [Vec3; 3],
    pub uvs: [Vec2; 3],
}

impl Face {
    pub fn new(positions: [Vec3; 3], normals: [Vec3; 3], uvs: [Vec2; 3]) -> Self {
        Self {
            positions,
            normals,
            uvs,
        }
    }

    /// Unit geometric normal (counter-clockwise winding), zero if degenerate.
    pub fn geometric_normal(&self) -> Vec3 {
        let [a, b, c] = self.positions;
        (b - a).cross(c - a).normalize_or_zero()
    }
}

/// Tangent-space frame shared by the three corners of a face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TangentBasis {
    pub tangent: Vec3,
    pub bitangent: Vec3,
}

/// Tangent and bitangent of a triangle from its positions and uvs.
///
/// When the uv mapping is degenerate (zero uv area) an arbitrary orthonormal
/// frame around the geometric normal is returned instead.
pub fn triangle_basis(positions: &[Vec3; 3], uvs: &[Vec2; 3]) -> TangentBasis {
    let e1 = positions[1] - positions[0];
    let e2 = positions[2] - positions[0];
    let d1 = uvs[1] - uvs[0];
    let d2 = uvs[2] - uvs[0];

    let det = d1.x * d2.y - d2.x * d1.y;
    if det.abs() < crate::math::EPSILON {
        let normal = e1.cross(e2).normalize_or_zero();
        if normal == Vec3::ZERO {
            return TangentBasis {
                tangent: Vec3::X,
                bitangent: Vec3::Y,
            };
        }
        let (tangent, bitangent) = normal.any_orthonormal_pair();
        return TangentBasis { tangent, bitangent };
    }

    let inv = 1.0 / det;
    let tangent = ((e1 * d2.y - e2 * d1.y) * inv).normalize_or_zero();
    let bitangent = ((e2 * d1.x - e1 * d2.x) * inv).normalize_or_zero();
    TangentBasis { tangent, bitangent }
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    faces: Vec<Face>,
    bases: Vec<TangentBasis>,
}

impl Mesh {
    pub fn new(faces: Vec<Face>) -> Self {
        let bases = faces
            .par_iter()
            .map(|face| triangle_basis(&face.positions, &face.uvs))
            .collect();
        Self { faces, bases }
    }

    #[inline]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    #[inline]
    pub fn basis(&self, face_index: usize) -> &TangentBasis {
        &self.bases[face_index]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}
