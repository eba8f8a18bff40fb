//! Render-side mirror of the engine octree

pub mod scene_node_data;
pub mod scene_node_operations;
pub mod scene_root;

pub use scene_node_data::{GpuMesh, MeshSlot, NodeLocation, SceneNode, MAX_NODE_DEPTH};
pub use scene_node_operations::{
    count_nodes, create_root_node, find_node, find_parent, installed_index_count, mesh_ready,
    populated_child_count, populated_children,
};
pub use scene_root::SceneRoot;
