use std::ops::Index;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};
use slotmap::SlotMap;

use crate::error::{Error, Result};
use crate::rendering::context::RenderContext;
use crate::scene_graph::node::{Node, NodeId};
use crate::scene_graph::object::{NodeEvent, SceneObject, UpdateArgs};
use crate::scene_graph::record::NodeRecord;

// Process-wide; generated names are unique for the lifetime of the process only.
static NEXT_UNNAMED: AtomicU64 = AtomicU64::new(0);

/// Owner of every node. Parent links are keys into this arena, so removing a
/// node here is the only way its object gets dropped.
#[derive(Default)]
pub struct Scene {
    nodes: SlotMap<NodeId, Node>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
        }
    }

    /// Adds a detached node.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.nodes.insert(node)
    }

    /// Adds a node and attaches it under `parent`.
    pub fn spawn(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = self.add_node(node);
        self.add_child(parent, id);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(id, _)| id)
    }

    /// Resolves the node's name, generating one on first use if it was never
    /// given one. Generated names combine the parent's name, the child index
    /// and a process-wide serial.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        let node = self.nodes.get(id)?;
        let name = node.name.get_or_init(|| self.generate_name(id, node));
        Some(name.as_str())
    }

    fn generate_name(&self, id: NodeId, node: &Node) -> String {
        let serial = NEXT_UNNAMED.fetch_add(1, Ordering::Relaxed);

        match node.parent {
            Some(parent) => {
                let parent_name = self.name(parent).unwrap_or("orphan");
                let index = self.nodes[parent]
                    .children
                    .iter()
                    .position(|&child| child == id)
                    .unwrap_or_default();
                format!("{parent_name}.{index}#{serial}")
            }
            None => format!("node#{serial}"),
        }
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .keys()
            .find(|&id| self.name(id).is_some_and(|candidate| candidate == name))
    }

    /// Appends `child` to `parent`'s children, detaching it from any previous
    /// parent first. The caller must not create a cycle.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            parent != child && !self.is_ancestor(child, parent),
            "attaching {child:?} under {parent:?} would create a cycle"
        );

        if !self.contains(parent) || !self.contains(child) {
            warn!("add_child ignored: {parent:?} or {child:?} is not in the scene");
            return;
        }

        self.detach(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    /// Removes the node from its parent's child list. Does nothing for roots.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get_mut(id).and_then(|node| node.parent.take()) else {
            return;
        };

        if let Some(parent) = self.nodes.get_mut(parent) {
            if let Some(index) = parent.children.iter().position(|&child| child == id) {
                parent.children.remove(index);
            }
        }
    }

    /// Attaches `candidate` under the first node in `root`'s subtree whose
    /// name matches the candidate's intended parent.
    pub fn connect(&mut self, root: NodeId, candidate: NodeId) -> bool {
        let Some(target) = self
            .get(candidate)
            .and_then(Node::intended_parent)
            .map(str::to_owned)
        else {
            return false;
        };

        let Some(parent) = self.find_in_subtree(root, &target) else {
            return false;
        };

        if parent == candidate || self.is_ancestor(candidate, parent) {
            warn!("refusing to connect {target} below its own descendant");
            return false;
        }

        self.add_child(parent, candidate);
        true
    }

    fn find_in_subtree(&self, id: NodeId, name: &str) -> Option<NodeId> {
        if self.name(id)? == name {
            return Some(id);
        }

        self.nodes[id]
            .children
            .iter()
            .find_map(|&child| self.find_in_subtree(child, name))
    }

    /// Connects detached nodes in any order, retrying until no further node
    /// can be attached. Returns the nodes whose parent never appeared.
    pub fn connect_pending(
        &mut self,
        root: NodeId,
        pending: impl IntoIterator<Item = NodeId>,
    ) -> Vec<NodeId> {
        let mut pending: Vec<NodeId> = pending.into_iter().collect();

        loop {
            let before = pending.len();
            pending.retain(|&id| !self.connect(root, id));

            if pending.is_empty() || pending.len() == before {
                break;
            }
        }

        for &id in &pending {
            warn!(
                "node {} could not be connected: no parent named {:?}",
                self.name(id).unwrap_or("<removed>"),
                self.nodes.get(id).and_then(Node::intended_parent)
            );
        }

        pending
    }

    /// Detaches and deletes `id` together with its whole subtree.
    pub fn remove(&mut self, id: NodeId) -> usize {
        if !self.contains(id) {
            return 0;
        }

        self.detach(id);
        let doomed = self.descendants(id);
        for &node in &doomed {
            self.nodes.remove(node);
        }

        debug!("removed {} node(s) rooted at {id:?}", doomed.len());
        doomed.len()
    }

    /// Root-to-node chain, inclusive of both ends.
    pub fn ancestry(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(id).map(|_| id);

        while let Some(node) = current {
            chain.push(node);
            current = self.nodes.get(node).and_then(|node| node.parent);
        }

        chain.reverse();
        chain
    }

    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.nodes.get(id).and_then(|node| node.parent);

        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.nodes.get(node).and_then(|node| node.parent);
        }

        false
    }

    /// `id` and everything below it, in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut visited = Vec::new();
        let mut stack = vec![id];

        while let Some(node) = stack.pop() {
            let Some(data) = self.nodes.get(node) else {
                continue;
            };
            visited.push(node);
            stack.extend(data.children.iter().rev());
        }

        visited
    }

    fn all_in_tree_order(&self) -> Vec<NodeId> {
        let roots: Vec<NodeId> = self.roots().collect();
        roots
            .into_iter()
            .flat_map(|root| self.descendants(root))
            .collect()
    }

    pub(crate) fn node_error(&self, id: NodeId, stage: &'static str, source: anyhow::Error) -> Error {
        Error::Node {
            name: self.name(id).unwrap_or("<removed>").to_string(),
            stage,
            source,
        }
    }

    pub fn init_all(&mut self, context: &RenderContext) -> Result<()> {
        for id in self.all_in_tree_order() {
            if let Err(source) = self.nodes[id].object_mut().init(context) {
                return Err(self.node_error(id, "init", source));
            }
        }
        Ok(())
    }

    pub fn update_all(&mut self, context: &RenderContext, dt: f32) -> Result<()> {
        for id in self.all_in_tree_order() {
            let (object, transform) = self.nodes[id].split_mut();
            let args = UpdateArgs {
                context,
                transform,
                dt,
            };
            if let Err(source) = object.update(args) {
                return Err(self.node_error(id, "update", source));
            }
        }
        Ok(())
    }

    pub fn cleanup_all(&mut self, context: &RenderContext) -> Result<()> {
        for id in self.all_in_tree_order() {
            if let Err(source) = self.nodes[id].object_mut().cleanup(context) {
                return Err(self.node_error(id, "cleanup", source));
            }
        }
        Ok(())
    }

    /// Offers `event` to `root`'s subtree in pre-order until a node consumes it.
    pub fn dispatch_event(&mut self, root: NodeId, event: &NodeEvent) -> bool {
        for id in self.descendants(root) {
            if self.nodes[id].object_mut().handle_event(event) {
                return true;
            }
        }
        false
    }

    pub fn save_subtree(&self, id: NodeId) -> Vec<NodeRecord> {
        self.descendants(id)
            .into_iter()
            .map(|node_id| {
                let node = &self.nodes[node_id];
                let mut record = NodeRecord {
                    name: self.name(node_id).unwrap_or_default().to_string(),
                    parent: node
                        .parent
                        .and_then(|parent| self.name(parent))
                        .map(str::to_owned),
                    kind: "group".to_string(),
                    flags: node.flags().bits(),
                    ..Default::default()
                };
                record.set_transform(node.transform());
                node.object().save(&mut record);
                record
            })
            .collect()
    }

    /// Adds a detached node described by `record`; attach it with
    /// [`Scene::connect`] or [`Scene::connect_pending`].
    pub fn spawn_record(&mut self, record: &NodeRecord, object: Box<dyn SceneObject>) -> NodeId {
        let mut node = Node::from_boxed(object)
            .with_transform(record.transform())
            .with_flags(record.draw_flags());
        if !record.name.is_empty() {
            node = node.with_name(record.name.clone());
        }
        if let Some(parent) = &record.parent {
            node = node.with_intended_parent(parent.clone());
        }
        self.add_node(node)
    }
}

impl Index<NodeId> for Scene {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use glam::Vec3;

    use super::*;
    use crate::scene_graph::object::Group;
    use crate::scene_graph::transform::Transform;

    struct DropCounter(Rc<Cell<usize>>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    impl SceneObject for DropCounter {}

    struct Listener {
        consumed: Rc<Cell<usize>>,
    }

    impl SceneObject for Listener {
        fn handle_event(&mut self, event: &NodeEvent) -> bool {
            if matches!(event, NodeEvent::Command(name) if name == "ping") {
                self.consumed.set(self.consumed.get() + 1);
                true
            } else {
                false
            }
        }
    }

    fn named(name: &str) -> Node {
        Node::new(Group).with_name(name)
    }

    fn parents_of(scene: &Scene, id: NodeId) -> usize {
        scene
            .iter()
            .filter(|(_, node)| node.children().contains(&id))
            .count()
    }

    #[test]
    fn reparenting_leaves_a_single_parent() {
        let mut scene = Scene::new();
        let a = scene.add_node(named("a"));
        let b = scene.add_node(named("b"));
        let child = scene.spawn(a, named("child"));

        scene.detach(child);
        assert_eq!(scene[child].parent(), None);
        assert_eq!(parents_of(&scene, child), 0);

        scene.add_child(b, child);
        assert_eq!(scene[child].parent(), Some(b));
        assert_eq!(parents_of(&scene, child), 1);
        assert!(scene[a].children().is_empty());
    }

    #[test]
    fn add_child_moves_an_attached_node() {
        let mut scene = Scene::new();
        let a = scene.add_node(named("a"));
        let b = scene.add_node(named("b"));
        let child = scene.spawn(a, named("child"));

        scene.add_child(b, child);

        assert_eq!(parents_of(&scene, child), 1);
        assert_eq!(scene[b].children(), &[child]);
    }

    #[test]
    fn detach_is_idempotent_and_keeps_sibling_order() {
        let mut scene = Scene::new();
        let root = scene.add_node(named("root"));
        let first = scene.spawn(root, named("first"));
        let second = scene.spawn(root, named("second"));
        let third = scene.spawn(root, named("third"));

        scene.detach(second);
        scene.detach(second);

        assert_eq!(scene[root].children(), &[first, third]);
    }

    #[test]
    fn removing_a_node_drops_its_subtree_exactly_once() {
        let drops = Rc::new(Cell::new(0));
        let mut scene = Scene::new();
        let root = scene.add_node(named("root"));
        let branch = scene.spawn(root, Node::new(DropCounter(drops.clone())));
        let leaf = scene.spawn(branch, Node::new(DropCounter(drops.clone())));
        scene.spawn(leaf, Node::new(DropCounter(drops.clone())));
        let survivor = scene.spawn(root, Node::new(DropCounter(drops.clone())));

        assert_eq!(scene.remove(branch), 3);
        assert_eq!(drops.get(), 3);
        assert_eq!(scene.len(), 2);
        assert_eq!(scene[root].children(), &[survivor]);
        assert!(scene.get(leaf).is_none());

        assert_eq!(scene.remove(branch), 0);
        drop(scene);
        assert_eq!(drops.get(), 4);
    }

    #[test]
    fn generated_names_are_unique_and_mention_the_parent() {
        let mut scene = Scene::new();
        let root = scene.add_node(named("sol"));
        let a = scene.spawn(root, Node::new(Group));
        let b = scene.spawn(root, Node::new(Group));

        let name_a = scene.name(a).unwrap().to_string();
        let name_b = scene.name(b).unwrap().to_string();

        assert_ne!(name_a, name_b);
        assert!(name_a.starts_with("sol.0#"));
        assert!(name_b.starts_with("sol.1#"));
        assert_eq!(scene.name(a), Some(name_a.as_str()));
    }

    #[test]
    fn connect_attaches_under_matching_descendant() {
        let mut scene = Scene::new();
        let root = scene.add_node(named("sol"));
        let earth = scene.spawn(root, named("earth"));
        let moon = scene.add_node(named("moon").with_intended_parent("earth"));
        let stray = scene.add_node(named("stray").with_intended_parent("vulcan"));

        assert!(scene.connect(root, moon));
        assert_eq!(scene[moon].parent(), Some(earth));
        assert!(!scene.connect(root, stray));
        assert_eq!(scene[stray].parent(), None);
    }

    #[test]
    fn connect_pending_handles_any_order() {
        let mut scene = Scene::new();
        let root = scene.add_node(named("sol"));
        let station = scene.add_node(named("station").with_intended_parent("moon"));
        let moon = scene.add_node(named("moon").with_intended_parent("earth"));
        let earth = scene.add_node(named("earth").with_intended_parent("sol"));
        let lost = scene.add_node(named("lost").with_intended_parent("nowhere"));

        let leftover = scene.connect_pending(root, [station, moon, earth, lost]);

        assert_eq!(leftover, vec![lost]);
        assert_eq!(scene.ancestry(station), vec![root, earth, moon, station]);
    }

    #[test]
    fn dispatch_stops_at_first_consumer() {
        let consumed = Rc::new(Cell::new(0));
        let mut scene = Scene::new();
        let root = scene.add_node(named("root"));
        scene.spawn(
            root,
            Node::new(Listener {
                consumed: consumed.clone(),
            }),
        );
        scene.spawn(
            root,
            Node::new(Listener {
                consumed: consumed.clone(),
            }),
        );

        assert!(scene.dispatch_event(root, &NodeEvent::Command("ping".into())));
        assert!(!scene.dispatch_event(root, &NodeEvent::Command("pong".into())));
        assert_eq!(consumed.get(), 1);
    }

    #[test]
    fn saved_records_rebuild_the_same_tree() {
        let mut scene = Scene::new();
        let root = scene.add_node(named("sol"));
        let earth = scene.spawn(
            root,
            named("earth").with_transform(Transform::from_translation(Vec3::X * 150.0)),
        );
        scene.spawn(earth, named("moon"));

        let records = scene.save_subtree(earth);
        assert_eq!(records[0].parent.as_deref(), Some("sol"));

        let mut rebuilt = Scene::new();
        let new_root = rebuilt.add_node(named("sol"));
        let ids: Vec<NodeId> = records
            .iter()
            .rev()
            .map(|record| rebuilt.spawn_record(record, Box::new(Group)))
            .collect();

        assert!(rebuilt.connect_pending(new_root, ids).is_empty());
        let moon = rebuilt.find_by_name("moon").unwrap();
        let names: Vec<&str> = rebuilt
            .ancestry(moon)
            .into_iter()
            .filter_map(|id| rebuilt.name(id))
            .collect();
        assert_eq!(names, ["sol", "earth", "moon"]);
        let earth = rebuilt.find_by_name("earth").unwrap();
        assert_eq!(rebuilt[earth].transform().translation(), Vec3::X * 150.0);
    }
}
