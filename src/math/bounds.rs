use glam::Vec3;

use crate::math::{frustum::Frustum, plane::Plane};

pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    fn signed_distance_to_plane(&self, plane: &Plane) -> f32 {
        plane.signed_distance_to_point(self.center) + self.radius
    }

    /// True unless the sphere lies entirely outside one of the planes.
    pub fn intersects_frustum(&self, frustum: &Frustum) -> bool {
        for plane in &frustum.planes {
            if self.signed_distance_to_plane(plane) < 0.0 {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frustum() -> Frustum {
        Frustum::from_field_of_view(90f32.to_radians(), 1.0)
    }

    #[test]
    fn sphere_behind_eye_is_outside() {
        let sphere = BoundingSphere {
            center: Vec3::new(0.0, 0.0, 5.0),
            radius: 1.0,
        };
        assert!(!sphere.intersects_frustum(&frustum()));
    }

    #[test]
    fn sphere_straddling_eye_is_inside() {
        let sphere = BoundingSphere {
            center: Vec3::new(0.0, 0.0, 0.5),
            radius: 1.0,
        };
        assert!(sphere.intersects_frustum(&frustum()));
    }

    #[test]
    fn radius_brings_sphere_into_view() {
        // At 90 degrees the right plane is x = -z; the center sits sqrt(2) outside it.
        let center = Vec3::new(12.0, 0.0, -10.0);
        let small = BoundingSphere { center, radius: 1.0 };
        let large = BoundingSphere { center, radius: 2.0 };
        assert!(!small.intersects_frustum(&frustum()));
        assert!(large.intersects_frustum(&frustum()));
    }
}
