use glam::Vec3;

use crate::math::plane::Plane;

/// Eye-space viewing volume of a camera looking down -Z.
///
/// There is no far plane: far clipping is decided per bucket by the renderer,
/// and the near plane passes through the eye.
#[derive(Debug, Copy, Clone)]
pub struct Frustum {
    // Planes are in the order: left, right, bottom, top, near
    pub planes: [Plane; 5],
}

impl Frustum {
    /// `fov_y` is the full vertical field of view in radians.
    pub fn from_field_of_view(fov_y: f32, aspect_ratio: f32) -> Frustum {
        let tan_v = (fov_y * 0.5).tan();
        let tan_h = tan_v * aspect_ratio;

        let planes = [
            // Left
            Plane::new(Vec3::new(1.0, 0.0, -tan_h), 0.0),
            // Right
            Plane::new(Vec3::new(-1.0, 0.0, -tan_h), 0.0),
            // Bottom
            Plane::new(Vec3::new(0.0, 1.0, -tan_v), 0.0),
            // Top
            Plane::new(Vec3::new(0.0, -1.0, -tan_v), 0.0),
            // Near
            Plane::new(Vec3::NEG_Z, 0.0),
        ];

        Frustum { planes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_straight_ahead_is_inside_every_plane() {
        let frustum = Frustum::from_field_of_view(60f32.to_radians(), 16.0 / 9.0);
        let ahead = Vec3::new(0.0, 0.0, -10.0);
        assert!(frustum
            .planes
            .iter()
            .all(|plane| plane.signed_distance_to_point(ahead) > 0.0));
    }

    #[test]
    fn wide_aspect_widens_horizontal_extent() {
        let narrow = Frustum::from_field_of_view(60f32.to_radians(), 1.0);
        let wide = Frustum::from_field_of_view(60f32.to_radians(), 2.0);
        // tan(30 deg) * 10 ~= 5.77, so x = 8 is outside at aspect 1 and inside at aspect 2.
        let point = Vec3::new(8.0, 0.0, -10.0);
        assert!(narrow.planes[1].signed_distance_to_point(point) < 0.0);
        assert!(wide.planes[1].signed_distance_to_point(point) > 0.0);
    }
}
