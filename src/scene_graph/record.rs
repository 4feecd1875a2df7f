use std::collections::BTreeMap;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::scene_graph::{node::DrawFlags, transform::Transform};

/// Declarative description of a node, as written by `save` and consumed by
/// deferred tree assembly.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeRecord {
    pub name: String,
    /// Name of the node this one is attached under; `None` for roots.
    pub parent: Option<String>,
    pub kind: String,
    pub translation: [f32; 3],
    pub orientation: [f32; 4],
    pub scale: f32,
    pub flags: u32,
    pub properties: BTreeMap<String, String>,
}

impl NodeRecord {
    pub fn transform(&self) -> Transform {
        let scale = if self.scale > 0.0 { self.scale } else { 1.0 };
        let orientation = Quat::from_array(self.orientation);
        let orientation = if orientation.length_squared() > 0.0 {
            orientation
        } else {
            Quat::IDENTITY
        };
        Transform::new(Vec3::from_array(self.translation), orientation, scale)
    }

    pub fn set_transform(&mut self, transform: &Transform) {
        self.translation = transform.translation().to_array();
        self.orientation = transform.orientation().to_array();
        self.scale = transform.scale();
    }

    pub fn draw_flags(&self) -> DrawFlags {
        DrawFlags::from_bits_truncate(self.flags)
    }

    pub fn property<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.properties.get(key).and_then(|value| value.parse().ok())
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl ToString) {
        self.properties.insert(key.into(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_record_yields_identity_transform() {
        let record = NodeRecord::default();
        assert_eq!(record.transform(), Transform::IDENTITY);
    }

    #[test]
    fn deserializes_from_toml_with_missing_fields() {
        let record: NodeRecord = toml::from_str(
            r#"
            name = "moon"
            parent = "earth"
            translation = [384.4, 0.0, 0.0]
            scale = 2.0
            flags = 2

            [properties]
            radius = "1.737"
            "#,
        )
        .unwrap();

        assert_eq!(record.parent.as_deref(), Some("earth"));
        assert_eq!(record.draw_flags(), DrawFlags::UNLIT);
        assert_eq!(record.transform().scale(), 2.0);
        assert_eq!(record.property::<f32>("radius"), Some(1.737));
    }
}
