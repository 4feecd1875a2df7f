use std::collections::HashSet;

use approx::assert_relative_eq;
use glam::{Mat4, Quat, Vec3, Vec4};
use orrery::{
    draw_scene, pre_draw_scene,
    objects::{Body, DistantBody},
    rendering::{
        backend::Material,
        mesh::{MeshData, MeshId, MeshLibrary},
        recording::{BackendCall, RecordingBackend},
    },
    scene_graph::{relative_position, Group},
    DrawFlags, DrawList, DrawResults, Error, Light, Node, NodeId, RenderContext, Scene,
    Transform, Viewport,
};

fn at(x: f32, y: f32, z: f32) -> Transform {
    Transform::from_translation(Vec3::new(x, y, z))
}

fn sphere() -> MeshId {
    let mut meshes = MeshLibrary::new();
    meshes.add(MeshData::uv_sphere("sphere", 8, 4))
}

fn camera_scene() -> (Scene, NodeId) {
    let mut scene = Scene::new();
    let camera = scene.add_node(Node::new(Group).with_name("camera"));
    (scene, camera)
}

fn render(
    scene: &Scene,
    context: &RenderContext,
    slots: usize,
) -> (DrawList, RecordingBackend, orrery::FrameStats) {
    let mut rec = DrawList::new();
    pre_draw_scene(scene, context, &mut rec).unwrap();
    let mut backend = RecordingBackend::new(slots);
    let stats = draw_scene(scene, context, &rec, &mut backend).unwrap();
    (rec, backend, stats)
}

#[test]
fn nearest_lights_take_the_available_slots() {
    let (mut scene, camera) = camera_scene();
    let far = scene.spawn(camera, Node::new(Light::new()).with_transform(at(0.0, 0.0, -10.0)));
    let near = scene.spawn(camera, Node::new(Light::new()).with_transform(at(0.0, 0.0, -5.0)));

    let context = RenderContext::new(camera, Viewport::full(800, 600)).with_max_lights(1);
    let (rec, backend, stats) = render(&scene, &context, 1);

    assert_eq!(rec.lights(), vec![near, far]);
    assert_eq!(stats.lights_bound, 1);

    let bound: Vec<_> = backend
        .calls()
        .iter()
        .filter_map(|call| match call {
            BackendCall::BindLight { slot, light } => Some((*slot, light.position)),
            _ => None,
        })
        .collect();
    assert_eq!(bound, vec![(0, Vec4::new(0.0, 0.0, -5.0, 1.0))]);
    assert!(!backend
        .calls()
        .iter()
        .any(|call| matches!(call, BackendCall::DisableLight(_))));
}

#[test]
fn unused_light_slots_are_disabled() {
    let (mut scene, camera) = camera_scene();
    scene.spawn(camera, Node::new(Light::new()).with_transform(at(0.0, 0.0, -10.0)));
    scene.spawn(camera, Node::new(Light::new()).with_transform(at(0.0, 0.0, -5.0)));

    let context = RenderContext::new(camera, Viewport::full(800, 600)).with_max_lights(3);
    let (_, backend, stats) = render(&scene, &context, 3);

    assert_eq!(stats.lights_bound, 2);
    let slots: Vec<_> = backend
        .calls()
        .iter()
        .filter_map(|call| match call {
            BackendCall::BindLight { slot, .. } => Some(*slot),
            BackendCall::DisableLight(slot) => Some(*slot + 100),
            _ => None,
        })
        .collect();
    assert_eq!(slots, vec![0, 1, 102]);
}

#[test]
fn solids_and_translucents_share_one_fitted_projection() {
    let mesh = sphere();
    let (mut scene, camera) = camera_scene();
    let solid = scene.spawn(
        camera,
        Node::new(Body::new(mesh, Material::default(), 1.0)).with_transform(at(0.0, 0.0, -10.0)),
    );
    let glass = scene.spawn(
        camera,
        Node::new(Body::new(mesh, Material::diffuse(Vec4::splat(0.5)), 2.0).translucent())
            .with_transform(at(0.0, 0.0, -20.0)),
    );

    let context = RenderContext::new(camera, Viewport::full(800, 600));
    let (rec, backend, stats) = render(&scene, &context, 8);

    assert_eq!(rec.solids(), &[solid]);
    assert_eq!(rec.translucents(), &[glass]);

    let (near, far) = stats.near_far.unwrap();
    assert_relative_eq!(near, 8.1, epsilon = 1e-4);
    assert_relative_eq!(far, 24.2, epsilon = 1e-4);
    assert!(near <= 8.1 + 1e-4 && far >= 24.2 - 1e-4);
    assert_eq!(backend.projections(), vec![context.projection(near, far)]);

    // Depth is cleared before the solids; translucents follow with blending.
    let tail: Vec<_> = backend
        .calls()
        .iter()
        .skip_while(|call| !matches!(call, BackendCall::ClearDepth))
        .map(|call| match call {
            BackendCall::DrawMesh { model_view, .. } => format!("draw@{}", model_view.w_axis.z),
            other => format!("{other:?}"),
        })
        .collect();
    assert_eq!(
        tail,
        vec![
            "ClearDepth".to_string(),
            "DepthTest(true)".to_string(),
            "Blending(false)".to_string(),
            "draw@-10".to_string(),
            "Blending(true)".to_string(),
            "draw@-20".to_string(),
        ]
    );
}

#[test]
fn painted_nodes_draw_highest_priority_first_without_depth() {
    let mesh = sphere();
    let (mut scene, camera) = camera_scene();
    for (priority, z) in [(10, -100.0), (50, -200.0), (30, -300.0)] {
        scene.spawn(
            camera,
            Node::new(DistantBody::new(mesh, Material::default(), 5.0, priority))
                .with_transform(at(0.0, 0.0, z)),
        );
    }

    let context = RenderContext::new(camera, Viewport::full(800, 600));
    let (rec, backend, stats) = render(&scene, &context, 8);

    let priorities: Vec<i32> = rec
        .painted_with_priority()
        .into_iter()
        .map(|(_, priority)| priority)
        .collect();
    assert_eq!(priorities, vec![50, 30, 10]);
    assert_eq!(stats.painted_drawn, 3);

    let depths: Vec<f32> = backend
        .calls()
        .iter()
        .filter_map(|call| match call {
            BackendCall::DrawMesh { model_view, .. } => Some(model_view.w_axis.z),
            _ => None,
        })
        .collect();
    assert_eq!(depths, vec![-200.0, -300.0, -100.0]);

    let first_draw = backend
        .calls()
        .iter()
        .position(|call| matches!(call, BackendCall::DrawMesh { .. }))
        .unwrap();
    assert!(backend.calls()[..first_draw].contains(&BackendCall::DepthTest(false)));
    assert!(!backend.calls().contains(&BackendCall::ClearDepth));
}

#[test]
fn dummy_subtrees_are_pruned() {
    let mesh = sphere();
    let (mut scene, camera) = camera_scene();
    let hidden = scene.spawn(
        camera,
        Node::new(Group)
            .with_flags(DrawFlags::DUMMY)
            .with_transform(at(0.0, 0.0, -3.0)),
    );
    let inside = scene.spawn(
        hidden,
        Node::new(Body::new(mesh, Material::default(), 1.0)).with_transform(at(0.0, 0.0, -5.0)),
    );
    scene.spawn(hidden, Node::new(Light::new()));

    let context = RenderContext::new(camera, Viewport::full(800, 600));
    let (rec, backend, _) = render(&scene, &context, 8);

    assert!(rec.is_empty());
    assert_eq!(backend.draw_count(), 0);
    assert_eq!(scene[inside].modelview(), Mat4::IDENTITY);
}

#[test]
fn camera_under_a_dummy_mount_still_sees_the_world() {
    let mesh = sphere();
    let mut scene = Scene::new();
    let world = scene.add_node(Node::new(Group));
    let planet = scene.spawn(
        world,
        Node::new(Body::new(mesh, Material::default(), 1.0)).with_transform(at(0.0, 0.0, -10.0)),
    );
    let mount = scene.spawn(
        world,
        Node::new(Group)
            .with_flags(DrawFlags::DUMMY)
            .with_transform(at(0.0, 0.0, 5.0)),
    );
    let camera = scene.spawn(mount, Node::new(Group));

    let context = RenderContext::new(camera, Viewport::full(800, 600));
    let (rec, _, stats) = render(&scene, &context, 8);

    assert_eq!(rec.solids(), &[planet]);
    assert_eq!(stats.solids_drawn, 1);
    assert!(scene[planet]
        .eye_position()
        .abs_diff_eq(Vec3::new(0.0, 0.0, -15.0), 1e-5));
}

#[test]
fn off_screen_nodes_keep_their_modelview() {
    let mesh = sphere();
    let (mut scene, camera) = camera_scene();
    let behind = scene.spawn(
        camera,
        Node::new(Body::new(mesh, Material::default(), 1.0)).with_transform(at(0.0, 0.0, 10.0)),
    );

    let context = RenderContext::new(camera, Viewport::full(800, 600));
    let (_, backend, stats) = render(&scene, &context, 8);

    assert_eq!(stats.off_screen, 1);
    assert_eq!(stats.near_far, None);
    assert_eq!(backend.draw_count(), 0);
    assert_eq!(scene[behind].draw_results(), DrawResults::OFF_SCREEN);
    assert_eq!(
        scene[behind].modelview(),
        Mat4::from_translation(Vec3::new(0.0, 0.0, 10.0))
    );
}

#[test]
fn painted_nodes_behind_the_camera_are_skipped() {
    let mesh = sphere();
    let (mut scene, camera) = camera_scene();
    let star = scene.spawn(
        camera,
        Node::new(DistantBody::new(mesh, Material::default(), 100.0, 10))
            .with_transform(at(0.0, 0.0, 1000.0)),
    );

    let context = RenderContext::new(camera, Viewport::full(800, 600));
    let (rec, backend, stats) = render(&scene, &context, 8);

    assert_eq!(rec.painted(), vec![star]);
    assert_eq!(stats.painted_drawn, 0);
    assert_eq!(stats.off_screen, 1);
    assert_eq!(scene[star].draw_results(), DrawResults::OFF_SCREEN);
    assert!(backend.projections().is_empty());
    assert_eq!(backend.draw_count(), 0);
}

#[test]
fn every_visible_node_lands_in_exactly_one_bucket() {
    let mesh = sphere();
    let mut scene = Scene::new();
    let root = scene.add_node(Node::new(Group));
    let star = scene.spawn(
        root,
        Node::new(DistantBody::new(mesh, Material::default(), 20.0, 5))
            .with_transform(at(0.0, 0.0, -500.0)),
    );
    let system = scene.spawn(root, Node::new(Group).with_transform(at(0.0, 0.0, -50.0)));
    let planet = scene.spawn(
        system,
        Node::new(Body::new(mesh, Material::default(), 3.0)),
    );
    let haze = scene.spawn(
        planet,
        Node::new(Body::new(mesh, Material::default(), 3.5).translucent()),
    );
    let lamp = scene.spawn(system, Node::new(Light::new()).with_transform(at(5.0, 0.0, 0.0)));
    let ship = scene.spawn(
        root,
        Node::new(Body::new(mesh, Material::default(), 0.5)).with_transform(at(0.0, 0.0, -4.0)),
    );
    let camera = scene.spawn(ship, Node::new(Group).with_transform(at(0.0, 0.0, 4.0)));

    let context = RenderContext::new(camera, Viewport::full(800, 600));
    let mut rec = DrawList::new();
    pre_draw_scene(&scene, &context, &mut rec).unwrap();

    let mut seen = HashSet::new();
    let buckets = [
        rec.lights(),
        rec.painted(),
        rec.solids().to_vec(),
        rec.translucents().to_vec(),
    ];
    for id in buckets.iter().flatten() {
        assert!(seen.insert(*id), "{id:?} classified twice");
    }

    let expected: HashSet<NodeId> = [star, planet, haze, lamp, ship].into_iter().collect();
    assert_eq!(seen, expected);
    assert_eq!(rec.len(), expected.len());
}

#[test]
fn stamped_modelviews_agree_with_the_relative_resolver() {
    let mut scene = Scene::new();
    let sun = scene.add_node(Node::new(Group).with_transform(Transform::new(
        Vec3::ZERO,
        Quat::IDENTITY,
        4.0,
    )));
    let planet = scene.spawn(
        sun,
        Node::new(Group).with_transform(Transform::new(
            Vec3::new(30.0, 0.0, 0.0),
            Quat::from_rotation_y(0.8),
            0.25,
        )),
    );
    let moon = scene.spawn(
        planet,
        Node::new(Group).with_transform(Transform::new(
            Vec3::new(0.0, 6.0, 2.0),
            Quat::from_rotation_z(1.1),
            3.0,
        )),
    );
    let lander = scene.spawn(
        sun,
        Node::new(Group).with_transform(Transform::new(
            Vec3::new(-5.0, 1.0, 12.0),
            Quat::from_rotation_x(0.3),
            1.0,
        )),
    );
    let camera = scene.spawn(lander, Node::new(Group).with_transform(at(0.0, 0.5, 1.0)));

    let context = RenderContext::new(camera, Viewport::full(800, 600));
    let mut rec = DrawList::new();
    pre_draw_scene(&scene, &context, &mut rec).unwrap();

    for id in [sun, planet, moon, lander, camera] {
        let expected = relative_position(&scene, camera, id).unwrap();
        assert!(
            scene[id].eye_position().abs_diff_eq(expected, 1e-3),
            "{id:?}: {} vs {expected}",
            scene[id].eye_position()
        );
    }
}

#[test]
fn stale_camera_is_an_error() {
    let (mut scene, camera) = camera_scene();
    scene.remove(camera);

    let context = RenderContext::new(camera, Viewport::full(800, 600));
    let mut rec = DrawList::new();
    let result = pre_draw_scene(&scene, &context, &mut rec);
    assert!(matches!(result, Err(Error::MissingCamera(_))));
}
