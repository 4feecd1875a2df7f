use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::Mat4;
use log::trace;

use crate::error::{Error, Result};
use crate::rendering::context::RenderContext;
use crate::scene_graph::{DrawPriority, NodeId, Scene};

#[derive(Debug, Clone, Copy)]
struct LightEntry {
    distance_squared: f32,
    seq: u64,
    node: NodeId,
}

// Max-heap order: the nearest light compares greatest.
impl Ord for LightEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance_squared
            .total_cmp(&self.distance_squared)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for LightEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for LightEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LightEntry {}

#[derive(Debug, Clone, Copy)]
struct PaintEntry {
    priority: i32,
    seq: u64,
    node: NodeId,
}

// Highest priority compares greatest; ties go to the earlier insertion.
impl Ord for PaintEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PaintEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PaintEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PaintEntry {}

/// Per-frame classification of the visible scene.
#[derive(Debug, Default)]
pub struct DrawList {
    lights: BinaryHeap<LightEntry>,
    painted: BinaryHeap<PaintEntry>,
    solids: Vec<NodeId>,
    translucents: Vec<NodeId>,
    next_seq: u64,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.lights.clear();
        self.painted.clear();
        self.solids.clear();
        self.translucents.clear();
        self.next_seq = 0;
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    pub fn push_light(&mut self, node: NodeId, distance_squared: f32) {
        let seq = self.next_seq();
        self.lights.push(LightEntry {
            distance_squared,
            seq,
            node,
        });
    }

    pub fn push_painted(&mut self, node: NodeId, priority: i32) {
        let seq = self.next_seq();
        self.painted.push(PaintEntry {
            priority,
            seq,
            node,
        });
    }

    /// Lights, nearest first.
    pub fn lights(&self) -> Vec<NodeId> {
        let sorted = self.lights.clone().into_sorted_vec();
        sorted.into_iter().rev().map(|entry| entry.node).collect()
    }

    /// Painted nodes with their priorities, in draw order.
    pub fn painted_with_priority(&self) -> Vec<(NodeId, i32)> {
        let sorted = self.painted.clone().into_sorted_vec();
        sorted
            .into_iter()
            .rev()
            .map(|entry| (entry.node, entry.priority))
            .collect()
    }

    pub fn painted(&self) -> Vec<NodeId> {
        self.painted_with_priority()
            .into_iter()
            .map(|(node, _)| node)
            .collect()
    }

    pub fn solids(&self) -> &[NodeId] {
        &self.solids
    }

    pub fn translucents(&self) -> &[NodeId] {
        &self.translucents
    }

    pub fn len(&self) -> usize {
        self.lights.len() + self.painted.len() + self.solids.len() + self.translucents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Visits `cur`, stamping its view-space transform and classifying it.
///
/// Walking up from the camera, the parent (when it is not where we came
/// from) is resolved first so the whole ancestor chain is in view space
/// before any siblings are visited. Every reachable non-dummy node is
/// visited exactly once.
///
/// Dummy children are never descended into, so their subtrees are pruned.
/// A dummy ancestor on the camera's upward path is still walked through and
/// stamped, but it is not classified.
///
/// `Painted` priorities at or below the translucent level are read through
/// [`DrawPriority::from_raw`], so they land in the bucket their value names.
pub fn build_draw_list(
    scene: &Scene,
    cur: NodeId,
    prev: Option<NodeId>,
    context: &RenderContext,
    modelview: Mat4,
    rec: &mut DrawList,
) {
    let node = &scene[cur];

    if let Some(parent) = node.parent() {
        if Some(parent) != prev {
            let parent_scale = scene[parent].transform().scale();
            let ascend = node.transform().ascend_matrix(parent_scale);
            build_draw_list(scene, parent, Some(cur), context, modelview * ascend, rec);
        }
    }

    node.set_modelview(modelview);

    // Dummy ancestors of the camera are walked through but never drawn.
    if !node.is_dummy() {
        if node.object().as_light().is_some() {
            rec.push_light(cur, node.eye_position().length_squared());
        } else {
            let priority = DrawPriority::from_raw(node.object().priority(context).to_raw());
            match priority {
                DrawPriority::Ignore => {}
                DrawPriority::Solid => rec.solids.push(cur),
                DrawPriority::Translucent => rec.translucents.push(cur),
                DrawPriority::Painted(priority) => rec.push_painted(cur, priority),
            }
        }
    }

    let scale = node.transform().scale();
    for &child in node.children() {
        if Some(child) == prev {
            continue;
        }

        let child_node = &scene[child];
        if child_node.is_dummy() {
            continue;
        }

        let descend = child_node.transform().descend_matrix(scale);
        build_draw_list(scene, child, Some(cur), context, modelview * descend, rec);
    }
}

/// Rebuilds `rec` for the current frame, starting at the context's camera.
pub fn pre_draw_scene(scene: &Scene, context: &RenderContext, rec: &mut DrawList) -> Result<()> {
    rec.clear();

    if !scene.contains(context.camera) {
        return Err(Error::MissingCamera(context.camera));
    }

    build_draw_list(scene, context.camera, None, context, Mat4::IDENTITY, rec);

    trace!(
        "draw list: {} lights, {} painted, {} solids, {} translucents",
        rec.lights.len(),
        rec.painted.len(),
        rec.solids.len(),
        rec.translucents.len()
    );

    Ok(())
}
