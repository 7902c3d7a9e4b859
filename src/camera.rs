use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

use crate::physics::Viewport;

/// Perspective camera shared by every world: eye at (0, 0, 15) looking
/// down -z with a 60° vertical field of view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl Camera {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 15.0),
            target: Vec3::ZERO,
            fov_y: 60f32.to_radians(),
            near: 0.1,
            far: 1000.0,
            aspect: viewport.aspect(),
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.aspect = viewport.aspect();
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// Casts a ray through `ndc` and intersects it with the plane `z = plane_z`.
    /// Returns `None` when the ray runs parallel to or away from the plane.
    pub fn unproject_to_plane(&self, ndc: Vec2, plane_z: f32) -> Option<Vec3> {
        let inverse = self.view_projection().inverse();
        let near = inverse * ndc.extend(-1.0).extend(1.0);
        let far = inverse * ndc.extend(1.0).extend(1.0);
        if near.w.abs() < f32::EPSILON || far.w.abs() < f32::EPSILON {
            return None;
        }
        let origin = near.xyz() / near.w;
        let direction = (far.xyz() / far.w - origin).normalize_or_zero();
        if direction.z.abs() < 1e-6 {
            return None;
        }
        let t = (plane_z - origin.z) / direction.z;
        (t >= 0.0).then(|| origin + direction * t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centre_ray_hits_origin_plane_at_origin() {
        let camera = Camera::new(Viewport::new(1280, 720));
        let hit = camera.unproject_to_plane(Vec2::ZERO, 0.0).unwrap();
        assert!(hit.length() < 1e-3, "hit = {hit:?}");
    }

    #[test]
    fn top_edge_matches_field_of_view() {
        let camera = Camera::new(Viewport::new(1000, 1000));
        let hit = camera.unproject_to_plane(Vec2::new(0.0, 1.0), 0.0).unwrap();
        // tan(30°) * 15
        assert!((hit.y - 8.660_254).abs() < 1e-2, "hit = {hit:?}");
    }
}
