use crate::config::CameraSettings;
use glam::{Mat4, Vec2, Vec3, Vec3Swizzles, Vec4Swizzles};

/// A world-space ray with a unit direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Unproject normalized device coordinates through the camera
    ///
    /// Clip depth follows the GL convention: -1 on the near plane, 1 on the far.
    pub fn from_ndc(ndc: Vec2, inverse_view_projection: Mat4) -> Self {
        let near = inverse_view_projection * ndc.extend(-1.0).extend(1.0);
        let far = inverse_view_projection * ndc.extend(1.0).extend(1.0);
        let near = near.xyz() / near.w;
        let far = far.xyz() / far.w;
        Self::new(near, far - near)
    }

    /// Straight down from `height` over `(x, z)`, used by the top-down preview
    pub fn vertical(x: f32, z: f32, height: f32) -> Self {
        Self::new(Vec3::new(x, height, z), Vec3::NEG_Y)
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Hit point on a horizontal disk centered at `center`
    pub fn intersect_disk(&self, center: Vec3, radius: f32) -> Option<Vec3> {
        if self.direction.y.abs() < 1e-6 {
            return None;
        }
        let t = (center.y - self.origin.y) / self.direction.y;
        if t < 0.0 {
            return None;
        }
        let hit = self.at(t);
        (hit.xz().distance(center.xz()) <= radius).then_some(hit)
    }
}

/// Perspective view-projection for a camera looking at `target`
pub fn view_projection(camera: &CameraSettings, aspect: f32, target: Vec3) -> Mat4 {
    let projection = Mat4::perspective_rh_gl(camera.fov.to_radians(), aspect, camera.near, camera.far);
    let view = Mat4::look_at_rh(camera.position, target, Vec3::Y);
    projection * view
}

/// One-line camera readout: position, then orbit azimuth and polar angle in
/// degrees around `target`
pub fn camera_status(position: Vec3, target: Vec3) -> String {
    let offset = position - target;
    let azimuth = offset.x.atan2(offset.z).to_degrees();
    let polar = (offset.y / offset.length().max(f32::EPSILON))
        .clamp(-1.0, 1.0)
        .acos()
        .to_degrees();
    format!(
        "pos({:.2},{:.2},{:.2}) ang({:.1},{:.1})",
        position.x, position.y, position.z, azimuth, polar
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_click_looks_at_target() {
        let camera = CameraSettings::default();
        let target = Vec3::new(0.0, 0.0, 0.0);
        let inverse = view_projection(&camera, 16.0 / 9.0, target).inverse();
        let ray = Ray::from_ndc(Vec2::ZERO, inverse);

        let expected = (target - camera.position).normalize();
        assert!(ray.direction.dot(expected) > 0.9999);
    }

    #[test]
    fn test_disk_hit_and_miss() {
        let center = Vec3::new(-174.0, 58.0, 88.0);
        let hit = Ray::vertical(-170.0, 90.0, 500.0).intersect_disk(center, 13.0);
        assert_eq!(hit, Some(Vec3::new(-170.0, 58.0, 90.0)));

        assert!(Ray::vertical(0.0, 0.0, 500.0).intersect_disk(center, 13.0).is_none());
        // Disk behind the ray origin
        assert!(Ray::new(Vec3::new(-174.0, 0.0, 88.0), Vec3::NEG_Y)
            .intersect_disk(center, 13.0)
            .is_none());
    }

    #[test]
    fn test_camera_status_reads_orbit_angles() {
        assert_eq!(
            camera_status(Vec3::new(0.0, 0.0, 400.0), Vec3::ZERO),
            "pos(0.00,0.00,400.00) ang(0.0,90.0)"
        );
        assert_eq!(
            camera_status(Vec3::new(10.0, 10.0, 0.0), Vec3::ZERO),
            "pos(10.00,10.00,0.00) ang(90.0,45.0)"
        );
    }
}
