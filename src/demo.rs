use std::path::Path;

use anyhow::Context;
use glam::{Quat, Vec3, Vec4};
use log::{info, warn};

use orrery::{
    objects::{Body, DistantBody, Vehicle},
    rendering::{
        backend::Material,
        mesh::{MeshData, MeshLibrary},
    },
    scene_graph::{Attenuation, Group, NodeEvent},
    DrawFlags, Light, Node, NodeId, RenderConfig, RenderContext, RenderFlags, Scene, Transform,
    Viewport,
};

const CONFIG_PATH: &str = "orrery.toml";

pub struct DemoState {
    pub scene: Scene,
    pub meshes: MeshLibrary,
    pub context: RenderContext,
    pub root: NodeId,
    vehicle: NodeId,
    engine_on: bool,
}

impl DemoState {
    pub fn new(viewport: Viewport) -> anyhow::Result<Self> {
        let config = load_config()?;

        let mut meshes = MeshLibrary::new();
        let sphere = meshes.add(MeshData::uv_sphere("sphere", 48, 24));
        let cube = meshes.add(MeshData::cube("cube"));

        let mut scene = Scene::new();
        let root = scene.add_node(Node::new(Group).with_name("system"));

        let sun = scene.spawn(
            root,
            Node::new(DistantBody::new(
                sphere,
                Material::emissive(Vec4::new(1.0, 0.85, 0.5, 1.0)),
                50.0,
                100,
            ))
            .with_name("sun")
            .with_flags(DrawFlags::UNLIT),
        );
        scene.spawn(
            sun,
            Node::new(Light::new().with_colors(
                Vec4::new(0.02, 0.02, 0.02, 1.0),
                Vec4::new(1.0, 0.95, 0.85, 1.0),
                Vec4::ONE,
            )),
        );

        let orbit = scene.spawn(
            root,
            Node::new(Group)
                .with_name("planet_orbit")
                .with_transform(Transform::from_translation(Vec3::new(600.0, 0.0, 0.0))),
        );
        scene.spawn(
            orbit,
            Node::new(
                Body::new(
                    sphere,
                    Material::diffuse(Vec4::new(0.2, 0.4, 0.8, 1.0))
                        .with_specular(Vec4::splat(0.3), 16.0),
                    10.0,
                )
                .with_spin(0.1),
            )
            .with_name("planet"),
        );

        // Assembled out of order and attached by name.
        let pending = [
            scene.add_node(
                Node::new(
                    Body::new(
                        sphere,
                        Material::diffuse(Vec4::new(0.6, 0.8, 1.0, 0.25)),
                        11.0,
                    )
                    .translucent(),
                )
                .with_name("atmosphere")
                .with_intended_parent("planet_orbit"),
            ),
            scene.add_node(
                Node::new(Light::new().with_attenuation(Attenuation {
                    constant: 1.0,
                    linear: 0.05,
                    quadratic: 0.0,
                }))
                .with_intended_parent("moon")
                .with_transform(Transform::from_translation(Vec3::new(0.0, 4.0, 0.0))),
            ),
            scene.add_node(
                Node::new(Body::new(
                    sphere,
                    Material::diffuse(Vec4::new(0.6, 0.6, 0.6, 1.0)),
                    2.5,
                ))
                .with_name("moon")
                .with_intended_parent("planet_orbit")
                .with_transform(Transform::from_translation(Vec3::new(25.0, 0.0, 0.0))),
            ),
        ];
        let unconnected = scene.connect_pending(root, pending);
        if !unconnected.is_empty() {
            warn!("{} demo node(s) left unattached", unconnected.len());
        }

        let vehicle = scene.spawn(
            orbit,
            Node::new(Vehicle::new(
                cube,
                Material::diffuse(Vec4::new(0.8, 0.3, 0.2, 1.0)),
                0.5,
                2.0,
            ))
            .with_name("vehicle")
            .with_transform(Transform::new(
                Vec3::new(0.0, 2.0, 40.0),
                Quat::IDENTITY,
                1.0,
            )),
        );
        let mount = scene.spawn(
            vehicle,
            Node::new(Group)
                .with_name("camera_mount")
                .with_flags(DrawFlags::DUMMY)
                .with_transform(Transform::from_translation(Vec3::new(0.0, 1.0, 4.0))),
        );
        let camera = scene.spawn(
            mount,
            Node::new(Group)
                .with_name("camera")
                .with_transform(Transform::new(
                    Vec3::ZERO,
                    Quat::from_rotation_x(-0.1),
                    1.0,
                )),
        );

        let context = RenderContext::new(camera, viewport).with_config(config);
        scene
            .init_all(&context)
            .context("Failed to initialise demo scene")?;

        info!("Demo scene has {} nodes", scene.len());

        Ok(Self {
            scene,
            meshes,
            context,
            root,
            vehicle,
            engine_on: false,
        })
    }

    pub fn update(&mut self, dt: f32) -> anyhow::Result<()> {
        self.scene
            .update_all(&self.context, dt)
            .context("Scene update failed")?;
        Ok(())
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.context.viewport = viewport;
        self.scene
            .dispatch_event(self.root, &NodeEvent::ViewportResized(viewport));
    }

    pub fn toggle_flag(&mut self, flag: RenderFlags) {
        self.context.flags.toggle(flag);
        info!("Render flags: {:?}", self.context.flags);
    }

    pub fn toggle_engine(&mut self) {
        let command = if self.engine_on {
            "engine_off"
        } else {
            "engine_on"
        };
        if self
            .scene
            .dispatch_event(self.vehicle, &NodeEvent::Command(command.to_string()))
        {
            self.engine_on = !self.engine_on;
        }
    }

    pub fn shutdown(&mut self) -> anyhow::Result<()> {
        self.scene.cleanup_all(&self.context)?;
        Ok(())
    }
}

fn load_config() -> anyhow::Result<RenderConfig> {
    if !Path::new(CONFIG_PATH).exists() {
        return Ok(RenderConfig::default());
    }

    let config = RenderConfig::load(CONFIG_PATH)
        .with_context(|| format!("Failed to load {CONFIG_PATH}"))?;
    info!("Loaded render config from {CONFIG_PATH}");
    Ok(config)
}
