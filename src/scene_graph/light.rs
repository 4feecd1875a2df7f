use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Mat4, Vec4};

use crate::rendering::backend::LightState;
use crate::scene_graph::{object::SceneObject, record::NodeRecord};

// Process-wide; names are unique for the lifetime of the process only.
static NEXT_LIGHT: AtomicU64 = AtomicU64::new(0);

/// Constant, linear and quadratic distance attenuation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.0,
            quadratic: 0.0,
        }
    }
}

impl Attenuation {
    pub fn factor(&self, distance: f32) -> f32 {
        1.0 / (self.constant + self.linear * distance + self.quadratic * distance * distance)
    }
}

/// A point light positioned at its node's origin.
#[derive(Debug, Clone)]
pub struct Light {
    id: u64,
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub attenuation: Attenuation,
}

impl Default for Light {
    fn default() -> Self {
        Self::new()
    }
}

impl Light {
    pub fn new() -> Self {
        Self {
            id: NEXT_LIGHT.fetch_add(1, Ordering::Relaxed),
            ambient: Vec4::new(0.0, 0.0, 0.0, 1.0),
            diffuse: Vec4::ONE,
            specular: Vec4::ONE,
            attenuation: Attenuation::default(),
        }
    }

    pub fn with_colors(mut self, ambient: Vec4, diffuse: Vec4, specular: Vec4) -> Self {
        self.ambient = ambient;
        self.diffuse = diffuse;
        self.specular = specular;
        self
    }

    pub fn with_attenuation(mut self, attenuation: Attenuation) -> Self {
        self.attenuation = attenuation;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Hardware light parameters for a light whose node has `modelview`.
    pub fn state(&self, modelview: Mat4) -> LightState {
        LightState {
            position: modelview.w_axis.truncate().extend(1.0),
            ambient: self.ambient,
            diffuse: self.diffuse,
            specular: self.specular,
            attenuation: self.attenuation,
        }
    }
}

impl SceneObject for Light {
    fn save(&self, record: &mut NodeRecord) {
        record.kind = "light".to_string();
        for (key, color) in [
            ("ambient", self.ambient),
            ("diffuse", self.diffuse),
            ("specular", self.specular),
        ] {
            let [r, g, b, a] = color.to_array();
            record.set_property(key, format!("{r} {g} {b} {a}"));
        }
        record.set_property("attenuation.constant", self.attenuation.constant);
        record.set_property("attenuation.linear", self.attenuation.linear);
        record.set_property("attenuation.quadratic", self.attenuation.quadratic);
    }

    fn as_light(&self) -> Option<&Light> {
        Some(self)
    }

    fn default_name(&self) -> Option<String> {
        Some(format!("light_{}", self.id))
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn each_light_gets_a_distinct_name() {
        let a = Light::new();
        let b = Light::new();
        assert_ne!(a.default_name(), b.default_name());
        assert!(a.default_name().unwrap().starts_with("light_"));
    }

    #[test]
    fn state_places_light_at_node_origin() {
        let modelview = Mat4::from_translation(Vec3::new(0.0, 2.0, -7.0));
        let state = Light::new().state(modelview);
        assert_eq!(state.position, Vec4::new(0.0, 2.0, -7.0, 1.0));
    }

    #[test]
    fn attenuation_follows_fixed_function_formula() {
        let attenuation = Attenuation {
            constant: 1.0,
            linear: 0.5,
            quadratic: 0.25,
        };
        assert_eq!(attenuation.factor(2.0), 1.0 / 3.0);
    }
}
