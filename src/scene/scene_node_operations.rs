//! Scene Node Operations - Pure DOP Functions
//!
//! Construction, child slot management and read-only queries over the
//! render-side tree. Sync and render build on these.

use std::sync::Arc;

use super::scene_node_data::{MeshSlot, NodeLocation, SceneNode, MAX_NODE_DEPTH};
use crate::volume::OCTANT_COUNT;

fn create_node<B>(location: NodeLocation) -> SceneNode<B> {
    SceneNode {
        location,
        position: [0; 3],
        height: 0,
        render_this_node: false,
        pending_index_count: 0,
        structure_synced_at: 0,
        properties_synced_at: 0,
        mesh_synced_at: 0,
        subtree_synced_at: 0,
        children: std::array::from_fn(|_| None),
        mesh: Arc::new(MeshSlot::default()),
    }
}

/// Create an empty, never-synced root node.
pub fn create_root_node<B>() -> SceneNode<B> {
    create_node(NodeLocation::default())
}

/// Location of the child in `octant` of the node at `location`, `None` once
/// the path has no room for another level.
pub fn child_location(location: NodeLocation, octant: usize) -> Option<NodeLocation> {
    if location.depth >= MAX_NODE_DEPTH {
        return None;
    }
    Some(NodeLocation {
        depth: location.depth + 1,
        path: location.path | ((octant as u64 & 0b111) << (location.depth as u32 * 3)),
    })
}

/// Location of the parent, `None` for the root.
pub fn parent_location(location: NodeLocation) -> Option<NodeLocation> {
    if location.depth == 0 {
        return None;
    }
    let depth = location.depth - 1;
    let mask = (1u64 << (depth as u32 * 3)) - 1;
    Some(NodeLocation {
        depth,
        path: location.path & mask,
    })
}

/// Which octant of its parent the node at `location` occupies.
pub fn octant_in_parent(location: NodeLocation) -> Option<usize> {
    if location.depth == 0 {
        return None;
    }
    Some(((location.path >> ((location.depth as u32 - 1) * 3)) & 0b111) as usize)
}

/// Populate `octant` with an empty child. Returns `Some(false)` if it was
/// already populated and `None` if `node` sits at [`MAX_NODE_DEPTH`].
pub fn insert_child<B>(node: &mut SceneNode<B>, octant: usize) -> Option<bool> {
    if node.children[octant].is_some() {
        return Some(false);
    }
    let location = child_location(node.location, octant)?;
    node.children[octant] = Some(Box::new(create_node(location)));
    Some(true)
}

/// Destroy the child subtree in `octant`. Returns how many nodes were dropped.
pub fn remove_child<B>(node: &mut SceneNode<B>, octant: usize) -> usize {
    match node.children[octant].take() {
        Some(child) => count_nodes(&child),
        None => 0,
    }
}

/// True when both buffers are installed with a non-zero index count.
pub fn mesh_ready<B>(node: &SceneNode<B>) -> bool {
    node.mesh
        .installed
        .lock()
        .as_ref()
        .map_or(false, |mesh| mesh.index_count > 0)
}

/// Index count of the installed mesh, 0 if none.
pub fn installed_index_count<B>(node: &SceneNode<B>) -> u32 {
    node.mesh
        .installed
        .lock()
        .as_ref()
        .map_or(0, |mesh| mesh.index_count)
}

pub fn populated_children<B>(node: &SceneNode<B>) -> impl Iterator<Item = (usize, &SceneNode<B>)> {
    node.children
        .iter()
        .enumerate()
        .filter_map(|(octant, child)| child.as_deref().map(|c| (octant, c)))
}

pub fn populated_child_count<B>(node: &SceneNode<B>) -> usize {
    node.children.iter().filter(|c| c.is_some()).count()
}

/// Total nodes in the subtree rooted at `node`, itself included.
pub fn count_nodes<B>(node: &SceneNode<B>) -> usize {
    1 + populated_children(node)
        .map(|(_, child)| count_nodes(child))
        .sum::<usize>()
}

/// Walk from `root` to the node at `location`.
pub fn find_node<'a, B>(root: &'a SceneNode<B>, location: NodeLocation) -> Option<&'a SceneNode<B>> {
    let mut current = root;
    for level in 0..location.depth as u32 {
        let octant = ((location.path >> (level * 3)) & 0b111) as usize;
        current = current.children[octant].as_deref()?;
    }
    Some(current)
}

/// Resolve the parent of `node` within the tree rooted at `root`.
pub fn find_parent<'a, B>(root: &'a SceneNode<B>, node: &SceneNode<B>) -> Option<&'a SceneNode<B>> {
    parent_location(node.location).and_then(|location| find_node(root, location))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_root_starts_empty() {
        let root = create_root_node::<()>();
        assert_eq!(populated_child_count(&root), 0);
        assert!(!mesh_ready(&root));
        assert_eq!(installed_index_count(&root), 0);
        assert_eq!(root.subtree_synced_at, 0);
        assert!(parent_location(root.location).is_none());
    }

    #[test]
    fn test_locations_link_back_to_parent() {
        let mut root = create_root_node::<()>();
        assert_eq!(insert_child(&mut root, 6), Some(true));
        assert_eq!(insert_child(&mut root, 6), Some(false));

        let child = root.children[6].as_deref_mut().expect("Failed to insert child");
        assert_eq!(insert_child(child, 3), Some(true));
        let grandchild_location = child.children[3]
            .as_ref()
            .expect("Failed to insert grandchild")
            .location;

        assert_eq!(grandchild_location.depth, 2);
        assert_eq!(octant_in_parent(grandchild_location), Some(3));

        let grandchild = find_node(&root, grandchild_location).expect("Failed to find grandchild");
        let parent = find_parent(&root, grandchild).expect("Failed to find parent");
        assert_eq!(octant_in_parent(parent.location), Some(6));
        assert_eq!(count_nodes(&root), 3);
    }

    #[test]
    fn test_remove_child_detaches_mesh_slots() {
        let mut root = create_root_node::<()>();
        insert_child(&mut root, 0);
        let child = root.children[0].as_deref_mut().expect("Failed to insert child");
        insert_child(child, 1);

        let child_slot = Arc::clone(&child.mesh);
        let grandchild_slot = Arc::clone(&child.children[1].as_ref().expect("grandchild").mesh);

        assert_eq!(remove_child(&mut root, 0), 2);
        assert!(child_slot.detached.load(Ordering::Acquire));
        assert!(grandchild_slot.detached.load(Ordering::Acquire));
        assert!(!root.mesh.detached.load(Ordering::Acquire));
        assert_eq!(remove_child(&mut root, 0), 0);
    }

    #[test]
    fn test_siblings_stay_distinct_down_to_max_depth() {
        let mut node = create_root_node::<()>();
        let mut parent = node.location;
        for level in 0..MAX_NODE_DEPTH {
            let first = child_location(parent, 0).expect("Failed to address child");
            let last = child_location(parent, 7).expect("Failed to address child");
            assert_ne!(first, last, "level {}", level);
            assert_eq!(parent_location(last), Some(parent));
            parent = first;
        }
        assert_eq!(parent.depth, MAX_NODE_DEPTH);
        assert!(child_location(parent, 0).is_none());

        node.location = parent;
        assert_eq!(insert_child(&mut node, 3), None);
        assert!(node.children[3].is_none());
    }
}
