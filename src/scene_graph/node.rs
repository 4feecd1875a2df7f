use std::cell::{Cell, OnceCell};

use bitflags::bitflags;
use glam::{Mat4, Vec3};

use crate::scene_graph::object::SceneObject;
use crate::scene_graph::transform::Transform;

slotmap::new_key_type! {
    pub struct NodeId;
}

bitflags! {
    /// Static per-node drawing options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DrawFlags: u32 {
        /// Logical-only node; it and its subtree are never descended into.
        const DUMMY = 1 << 0;
        /// Drawn without lighting even when the frame is lit.
        const UNLIT = 1 << 1;
    }

    /// Outcome of the most recent draw pass for a node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DrawResults: u32 {
        const OFF_SCREEN = 1 << 0;
        const DISTANCE_CULLED = 1 << 1;
    }
}

pub struct Node {
    pub(crate) name: OnceCell<String>,
    intended_parent: Option<String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    transform: Transform,
    modelview: Cell<Mat4>,
    flags: DrawFlags,
    results: Cell<DrawResults>,
    object: Box<dyn SceneObject>,
}

impl Node {
    pub fn new(object: impl SceneObject + 'static) -> Self {
        Self::from_boxed(Box::new(object))
    }

    pub fn from_boxed(object: Box<dyn SceneObject>) -> Self {
        let name = OnceCell::new();
        if let Some(default_name) = object.default_name() {
            let _ = name.set(default_name);
        }

        Self {
            name,
            intended_parent: None,
            parent: None,
            children: Vec::new(),
            transform: Transform::IDENTITY,
            modelview: Cell::new(Mat4::IDENTITY),
            flags: DrawFlags::empty(),
            results: Cell::new(DrawResults::empty()),
            object,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = OnceCell::from(name.into());
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_flags(mut self, flags: DrawFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Declares the name of the node this one should be attached under by
    /// [`Scene::connect`](crate::scene_graph::Scene::connect).
    pub fn with_intended_parent(mut self, parent_name: impl Into<String>) -> Self {
        self.intended_parent = Some(parent_name.into());
        self
    }

    /// The explicit or already-generated name. Use
    /// [`Scene::name`](crate::scene_graph::Scene::name) to force generation.
    pub fn name(&self) -> Option<&str> {
        self.name.get().map(String::as_str)
    }

    pub fn intended_parent(&self) -> Option<&str> {
        self.intended_parent.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    /// View-space transform stamped by the most recent draw-list build.
    pub fn modelview(&self) -> Mat4 {
        self.modelview.get()
    }

    pub(crate) fn set_modelview(&self, modelview: Mat4) {
        self.modelview.set(modelview);
    }

    /// Origin of the node in eye space.
    pub fn eye_position(&self) -> Vec3 {
        self.modelview.get().w_axis.truncate()
    }

    pub fn flags(&self) -> DrawFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: DrawFlags) {
        self.flags = flags;
    }

    pub fn is_dummy(&self) -> bool {
        self.flags.contains(DrawFlags::DUMMY)
    }

    pub fn draw_results(&self) -> DrawResults {
        self.results.get()
    }

    pub(crate) fn set_draw_results(&self, results: DrawResults) {
        self.results.set(results);
    }

    /// Bounding radius in eye-space units.
    pub fn scaled_extent(&self) -> f32 {
        self.object.max_extent() * self.transform.scale()
    }

    pub fn object(&self) -> &dyn SceneObject {
        self.object.as_ref()
    }

    pub fn object_mut(&mut self) -> &mut dyn SceneObject {
        self.object.as_mut()
    }

    pub(crate) fn split_mut(&mut self) -> (&mut dyn SceneObject, &mut Transform) {
        (self.object.as_mut(), &mut self.transform)
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name.get())
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("transform", &self.transform)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
