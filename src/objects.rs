//! Concrete scene objects: bodies near the camera, bodies painted far away,
//! and a self-propelled vehicle.

use glam::{Mat4, Quat, Vec3};

use crate::rendering::{backend::Material, context::RenderContext, mesh::MeshId};
use crate::scene_graph::{
    DrawArgs, DrawPriority, NodeEvent, NodeRecord, SceneObject, UpdateArgs,
};

fn save_material(record: &mut NodeRecord, material: &Material) {
    for (key, color) in [
        ("diffuse", material.diffuse),
        ("specular", material.specular),
        ("emissive", material.emissive),
    ] {
        let [r, g, b, a] = color.to_array();
        record.set_property(key, format!("{r} {g} {b} {a}"));
    }
}

/// A mesh scaled to `radius`, drawn under the shared near/far projection.
pub struct Body {
    mesh: MeshId,
    material: Material,
    radius: f32,
    translucent: bool,
    /// Radians per second about the local Y axis.
    spin: f32,
}

impl Body {
    pub fn new(mesh: MeshId, material: Material, radius: f32) -> Self {
        Self {
            mesh,
            material,
            radius,
            translucent: false,
            spin: 0.0,
        }
    }

    pub fn translucent(mut self) -> Self {
        self.translucent = true;
        self
    }

    pub fn with_spin(mut self, spin: f32) -> Self {
        self.spin = spin;
        self
    }
}

impl SceneObject for Body {
    fn priority(&self, _context: &RenderContext) -> DrawPriority {
        if self.translucent {
            DrawPriority::Translucent
        } else {
            DrawPriority::Solid
        }
    }

    fn max_extent(&self) -> f32 {
        self.radius
    }

    fn draw(&self, args: &mut DrawArgs<'_>) -> anyhow::Result<()> {
        let model_view = args.model_view() * Mat4::from_scale(Vec3::splat(self.radius));
        args.backend.draw_mesh(self.mesh, model_view, &self.material)?;
        Ok(())
    }

    fn update(&mut self, args: UpdateArgs<'_>) -> anyhow::Result<()> {
        if self.spin != 0.0 {
            args.transform.rotate(Quat::from_rotation_y(self.spin * args.dt));
        }
        Ok(())
    }

    fn save(&self, record: &mut NodeRecord) {
        record.kind = "body".to_string();
        record.set_property("radius", self.radius);
        record.set_property("translucent", self.translucent);
        record.set_property("spin", self.spin);
        save_material(record, &self.material);
    }
}

/// A body too far away to share depth precision with nearby objects. It is
/// drawn in the painter's pass under a projection fitted to itself.
pub struct DistantBody {
    mesh: MeshId,
    material: Material,
    radius: f32,
    priority: i32,
}

impl DistantBody {
    /// `priority` must be above the translucent level; higher draws first.
    pub fn new(mesh: MeshId, material: Material, radius: f32, priority: i32) -> Self {
        debug_assert!(priority > DrawPriority::TRANSLUCENT_RAW);
        Self {
            mesh,
            material,
            radius,
            priority,
        }
    }
}

impl SceneObject for DistantBody {
    fn priority(&self, _context: &RenderContext) -> DrawPriority {
        DrawPriority::from_raw(self.priority)
    }

    fn max_extent(&self) -> f32 {
        self.radius
    }

    fn draw(&self, args: &mut DrawArgs<'_>) -> anyhow::Result<()> {
        args.fit_projection_to_self(self.radius)?;
        let model_view = args.model_view() * Mat4::from_scale(Vec3::splat(self.radius));
        args.backend.draw_mesh(self.mesh, model_view, &self.material)?;
        Ok(())
    }

    fn save(&self, record: &mut NodeRecord) {
        record.kind = "distant_body".to_string();
        record.set_property("radius", self.radius);
        record.set_property("priority", self.priority);
        save_material(record, &self.material);
    }
}

/// Moves along its local -Z axis while its engine is running. Responds to the
/// `"engine_on"` and `"engine_off"` commands.
pub struct Vehicle {
    mesh: MeshId,
    material: Material,
    half_size: f32,
    speed: f32,
    engine_on: bool,
}

impl Vehicle {
    pub fn new(mesh: MeshId, material: Material, half_size: f32, speed: f32) -> Self {
        Self {
            mesh,
            material,
            half_size,
            speed,
            engine_on: false,
        }
    }
}

impl SceneObject for Vehicle {
    fn priority(&self, _context: &RenderContext) -> DrawPriority {
        DrawPriority::Solid
    }

    fn max_extent(&self) -> f32 {
        // Corner of the cube.
        self.half_size * 3f32.sqrt()
    }

    fn draw(&self, args: &mut DrawArgs<'_>) -> anyhow::Result<()> {
        let model_view = args.model_view() * Mat4::from_scale(Vec3::splat(self.half_size));
        args.backend.draw_mesh(self.mesh, model_view, &self.material)?;
        Ok(())
    }

    fn update(&mut self, args: UpdateArgs<'_>) -> anyhow::Result<()> {
        if self.engine_on {
            let forward = args.transform.orientation() * Vec3::NEG_Z;
            args.transform.translate(forward * self.speed * args.dt);
        }
        Ok(())
    }

    fn handle_event(&mut self, event: &NodeEvent) -> bool {
        match event {
            NodeEvent::Command(command) if command == "engine_on" => {
                self.engine_on = true;
                true
            }
            NodeEvent::Command(command) if command == "engine_off" => {
                self.engine_on = false;
                true
            }
            _ => false,
        }
    }

    fn save(&self, record: &mut NodeRecord) {
        record.kind = "vehicle".to_string();
        record.set_property("half_size", self.half_size);
        record.set_property("speed", self.speed);
        record.set_property("engine_on", self.engine_on);
        save_material(record, &self.material);
    }
}
