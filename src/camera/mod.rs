/// Look-at camera with a focal-distance perspective.
use crate::math;
use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Distance used by [`math::projection`]; larger values flatten perspective.
    pub focal_length: f32,
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3, up: Vec3, focal_length: f32) -> Self {
        Self {
            position,
            target,
            up,
            focal_length,
        }
    }

    /// Get view matrix
    pub fn view_matrix(&self) -> Mat4 {
        math::look_at(self.position, self.target, self.up)
    }

    /// Get projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        math::projection(self.focal_length)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.5, 3.0), Vec3::ZERO, Vec3::Y, 3.0)
    }
}
