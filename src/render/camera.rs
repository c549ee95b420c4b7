//! Pinhole camera and primary-ray generation.

use crate::util::{Mat4, Ray, Vec2, Vec3};

/// Camera-to-world transform plus vertical field of view.
///
/// In camera space the view looks down -Z with +Y up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub xform: Mat4,
    /// Vertical FOV in degrees
    pub fov: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            xform: Mat4::IDENTITY,
            fov: 50.0,
        }
    }
}

impl Camera {
    pub fn new(xform: Mat4, fov: f32) -> Self {
        Self { xform, fov }
    }

    /// World-space camera position.
    pub fn position(&self) -> Vec3 {
        self.xform.transform_point3(Vec3::ZERO)
    }

    /// Ray through pixel `(x, y)` of a `width x height` image, offset inside
    /// the pixel by `jitter` in [0, 1). Row 0 is the top of the image.
    pub fn primary_ray(&self, x: u32, y: u32, width: u32, height: u32, jitter: Vec2) -> Ray {
        let (w, h) = (width as f32, height as f32);
        let half = (self.fov.to_radians() * 0.5).tan();
        let aspect = w / h;

        let sx = ((x as f32 + jitter.x) / w * 2.0 - 1.0) * aspect * half;
        let sy = (1.0 - (y as f32 + jitter.y) / h * 2.0) * half;

        let dir = self.xform.transform_vector3(Vec3::new(sx, sy, -1.0)).normalize();
        Ray::new(self.position(), dir)
    }
}
