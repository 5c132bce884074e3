use std::collections::HashMap;
use crate::rendering::scene::SceneNode;

pub type NodeId = u32;

/// Where the core attaches and detaches the nodes it owns
///
/// Removing a node hands it back to the caller; dropping it releases the
/// mesh data it referenced.
pub trait SceneSink {
    fn add(&mut self, node: SceneNode) -> NodeId;
    fn remove(&mut self, id: NodeId) -> Option<SceneNode>;
    fn node(&self, id: NodeId) -> Option<&SceneNode>;
    fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode>;
}

/// In-memory scene graph used by the preview and by tests
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: HashMap<NodeId, SceneNode>,
    next_id: NodeId,
    added: u64,
    removed: u64,
}

impl SceneGraph {
    pub fn new() -> Self {
        SceneGraph::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    /// Count of top-level nodes carrying the given name
    pub fn count_named(&self, name: &str) -> usize {
        self.nodes.values().filter(|node| node.name == name).count()
    }

    pub fn added_count(&self) -> u64 {
        self.added
    }

    pub fn removed_count(&self) -> u64 {
        self.removed
    }
}

impl SceneSink for SceneGraph {
    fn add(&mut self, node: SceneNode) -> NodeId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.nodes.insert(id, node);
        self.added += 1;
        id
    }

    fn remove(&mut self, id: NodeId) -> Option<SceneNode> {
        let node = self.nodes.remove(&id);
        if node.is_some() {
            self.removed += 1;
        }
        node
    }

    fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(&id)
    }
}
