//! Frame-to-frame transforms between arbitrary nodes, computed through their
//! lowest common ancestor without going through global coordinates.

use glam::{Mat4, Vec3};

use crate::scene_graph::{node::NodeId, scene::Scene};

/// Scale of the node above `chain[index]`, or 1 for a root.
fn parent_scale(scene: &Scene, chain: &[NodeId], index: usize) -> f32 {
    match index.checked_sub(1) {
        Some(parent) => scene[chain[parent]].transform().scale(),
        None => 1.0,
    }
}

/// Transform mapping coordinates in `cur`'s local frame into `reference`'s
/// local frame.
///
/// Each edge is scaled by its own parent's scale on both the ascending and
/// the descending side. Nodes in different trees are related through an
/// implicit identity root. Returns `None` if either node is not in the scene.
pub fn relative_transform(scene: &Scene, reference: NodeId, cur: NodeId) -> Option<Mat4> {
    if !scene.contains(reference) || !scene.contains(cur) {
        return None;
    }

    let reference_chain = scene.ancestry(reference);
    let cur_chain = scene.ancestry(cur);

    let divergence = reference_chain
        .iter()
        .zip(&cur_chain)
        .take_while(|(a, b)| a == b)
        .count();

    // Common ancestor frame -> reference frame.
    let ascend = (divergence..reference_chain.len()).fold(Mat4::IDENTITY, |acc, index| {
        let node = &scene[reference_chain[index]];
        let scale = parent_scale(scene, &reference_chain, index);
        node.transform().ascend_matrix(scale) * acc
    });

    // Cur frame -> common ancestor frame.
    let descend = (divergence..cur_chain.len()).fold(Mat4::IDENTITY, |acc, index| {
        let node = &scene[cur_chain[index]];
        let scale = parent_scale(scene, &cur_chain, index);
        acc * node.transform().descend_matrix(scale)
    });

    Some(ascend * descend)
}

/// Origin of `cur` expressed in `reference`'s frame.
pub fn relative_position(scene: &Scene, reference: NodeId, cur: NodeId) -> Option<Vec3> {
    relative_transform(scene, reference, cur).map(|matrix| matrix.transform_point3(Vec3::ZERO))
}

pub fn relative_distance(scene: &Scene, reference: NodeId, cur: NodeId) -> Option<f32> {
    relative_position(scene, reference, cur).map(Vec3::length)
}
