use log::trace;

use crate::error::Result;
use crate::math::frustum::Frustum;
use crate::rendering::{
    backend::GraphicsBackend,
    context::{RenderContext, RenderFlags},
    draw_list::DrawList,
};
use crate::scene_graph::{DrawArgs, DrawFlags, DrawResults, NodeId, Scene};

/// Counters for one `draw_scene` call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub lights_bound: usize,
    pub painted_drawn: usize,
    pub solids_drawn: usize,
    pub translucents_drawn: usize,
    pub off_screen: usize,
    pub distance_culled: usize,
    /// Shared near/far planes, when any solid or translucent survived culling.
    pub near_far: Option<(f32, f32)>,
}

struct DrawState<'a> {
    scene: &'a Scene,
    context: &'a RenderContext,
    backend: &'a mut dyn GraphicsBackend,
    lit: bool,
}

impl DrawState<'_> {
    fn draw_node(&mut self, id: NodeId) -> Result<()> {
        let scene = self.scene;
        let node = &scene[id];
        let unlit = self.lit && node.flags().contains(DrawFlags::UNLIT);

        if unlit {
            self.backend.set_lighting(false)?;
        }

        let mut args = DrawArgs {
            context: self.context,
            node,
            backend: &mut *self.backend,
        };
        if let Err(source) = node.object().draw(&mut args) {
            return Err(scene.node_error(id, "draw", source));
        }

        if unlit {
            self.backend.set_lighting(true)?;
        }

        Ok(())
    }
}

fn setup_lights(
    scene: &Scene,
    context: &RenderContext,
    rec: &DrawList,
    backend: &mut dyn GraphicsBackend,
) -> Result<usize> {
    let slots = context.max_lights.min(backend.max_lights());

    if context.flags.contains(RenderFlags::UNLIT) {
        backend.set_lighting(false)?;
        for slot in 0..slots {
            backend.disable_light(slot)?;
        }
        return Ok(0);
    }

    backend.set_lighting(true)?;
    backend.set_ambient(context.config.ambient())?;

    let mut bound = 0;
    for id in rec.lights().into_iter().take(slots) {
        let node = &scene[id];
        if let Some(light) = node.object().as_light() {
            backend.bind_light(bound, &light.state(node.modelview()))?;
            bound += 1;
        }
    }

    for slot in bound..slots {
        backend.disable_light(slot)?;
    }

    Ok(bound)
}

/// Runs the on-screen and distance tests for the near/far scan, recording the
/// outcome on the node. Returns the eye-space depth interval of survivors.
fn cull_for_projection(
    scene: &Scene,
    context: &RenderContext,
    frustum: &Frustum,
    ids: &[NodeId],
    survivors: &mut Vec<NodeId>,
    stats: &mut FrameStats,
) -> Option<(f32, f32)> {
    let mut range: Option<(f32, f32)> = None;

    for &id in ids {
        let node = &scene[id];
        node.set_draw_results(DrawResults::empty());

        if !context.is_on_screen(frustum, node) {
            node.set_draw_results(DrawResults::OFF_SCREEN);
            stats.off_screen += 1;
            continue;
        }

        let distance = node.eye_position().length();
        let extent = node.scaled_extent();
        if distance - extent > context.config.cull_distance {
            node.set_draw_results(DrawResults::DISTANCE_CULLED);
            stats.distance_culled += 1;
            continue;
        }

        let (near, far) = (distance - extent, distance + extent);
        range = Some(match range {
            Some((min_ext, max_ext)) => (min_ext.min(near), max_ext.max(far)),
            None => (near, far),
        });
        survivors.push(id);
    }

    range
}

/// Draws the frame described by `rec`, which must have been filled by
/// [`pre_draw_scene`](crate::rendering::draw_list::pre_draw_scene) for the
/// same scene and context.
///
/// Painted nodes go first, each under its own projection with depth testing
/// off. Then solids and translucents share one projection fitted to the depth
/// range of everything that survived culling.
pub fn draw_scene(
    scene: &Scene,
    context: &RenderContext,
    rec: &DrawList,
    backend: &mut dyn GraphicsBackend,
) -> Result<FrameStats> {
    let mut stats = FrameStats::default();

    backend.set_viewport(context.viewport)?;
    backend.set_wireframe(context.flags.contains(RenderFlags::WIREFRAME))?;

    stats.lights_bound = setup_lights(scene, context, rec, backend)?;

    let frustum = context.frustum();
    let mut state = DrawState {
        scene,
        context,
        backend,
        lit: !context.flags.contains(RenderFlags::UNLIT),
    };

    let painted = rec.painted();
    if !painted.is_empty() {
        state.backend.set_depth_test(false)?;
        state.backend.set_blending(true)?;

        for id in painted {
            let node = &scene[id];
            node.set_draw_results(DrawResults::empty());
            if !context.is_on_screen(&frustum, node) {
                node.set_draw_results(DrawResults::OFF_SCREEN);
                stats.off_screen += 1;
                continue;
            }

            state.draw_node(id)?;
            stats.painted_drawn += 1;
        }
    }

    if rec.solids().is_empty() && rec.translucents().is_empty() {
        trace!("frame: {:?}", stats);
        return Ok(stats);
    }

    let mut solids = Vec::with_capacity(rec.solids().len());
    let mut translucents = Vec::with_capacity(rec.translucents().len());
    let solid_range =
        cull_for_projection(scene, context, &frustum, rec.solids(), &mut solids, &mut stats);
    let translucent_range = cull_for_projection(
        scene,
        context,
        &frustum,
        rec.translucents(),
        &mut translucents,
        &mut stats,
    );

    let range = match (solid_range, translucent_range) {
        (Some((a_min, a_max)), Some((b_min, b_max))) => Some((a_min.min(b_min), a_max.max(b_max))),
        (range, None) | (None, range) => range,
    };

    let Some((min_ext, max_ext)) = range else {
        trace!("frame: {:?}", stats);
        return Ok(stats);
    };

    let config = &context.config;
    let near = min_ext.max(config.min_near_plane) * config.near_margin;
    let mut far = max_ext * config.far_margin;
    if far <= near {
        far = near * 2.0;
    }
    stats.near_far = Some((near, far));
    state.backend.set_projection(context.projection(near, far))?;

    state.backend.clear_depth()?;
    state.backend.set_depth_test(true)?;
    state.backend.set_blending(false)?;
    for &id in &solids {
        state.draw_node(id)?;
        stats.solids_drawn += 1;
    }

    if !translucents.is_empty() {
        state.backend.set_blending(true)?;
        for &id in &translucents {
            state.draw_node(id)?;
            stats.translucents_drawn += 1;
        }
    }

    trace!("frame: {:?}", stats);
    Ok(stats)
}
