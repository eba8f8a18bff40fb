//! Node metadata and mesh payloads as reported by the volume engine

use serde::{Deserialize, Serialize};

/// Logical timestamp handed out by the engine clock. Not wall time.
pub type Timestamp = u32;

/// Number of child slots per octree node (2x2x2).
pub const OCTANT_COUNT: usize = 8;

/// Opaque engine-side node handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub u32);

impl NodeHandle {
    /// Sentinel the engine reports for an empty child slot.
    pub const INVALID: NodeHandle = NodeHandle(0xFFFF_FFFF);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl std::fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "#{}", self.0)
        } else {
            write!(f, "#invalid")
        }
    }
}

/// Opaque engine-side volume handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VolumeHandle(pub u32);

/// The two voxel representations the engine can mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeType {
    ColoredCubes,
    Terrain,
}

impl VolumeType {
    /// Decode the engine's numeric volume type.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(VolumeType::ColoredCubes),
            1 => Some(VolumeType::Terrain),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            VolumeType::ColoredCubes => 0,
            VolumeType::Terrain => 1,
        }
    }

    /// Size in bytes of one vertex record for this volume type.
    pub fn vertex_stride(self) -> usize {
        match self {
            VolumeType::ColoredCubes => std::mem::size_of::<super::ColoredCubesVertex>(),
            VolumeType::Terrain => std::mem::size_of::<super::TerrainVertex>(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VolumeType::ColoredCubes => "colored_cubes",
            VolumeType::Terrain => "terrain",
        }
    }
}

/// Everything the engine reports about one octree node.
///
/// `child_handles` is indexed `[x][y][z]`; empty slots hold
/// [`NodeHandle::INVALID`].
#[derive(Debug, Clone, PartialEq)]
pub struct OctreeNodeInfo {
    pub position: [i32; 3],
    pub height: u32,
    pub render_this_node: bool,
    pub has_mesh: bool,
    pub structure_last_changed: Timestamp,
    pub properties_last_changed: Timestamp,
    pub mesh_last_changed: Timestamp,
    pub node_or_subtree_last_changed: Timestamp,
    pub child_handles: [[[NodeHandle; 2]; 2]; 2],
}

impl OctreeNodeInfo {
    /// Child handle for a flat octant index (see [`octant_index`]).
    #[inline]
    pub fn child_handle(&self, octant: usize) -> NodeHandle {
        let [x, y, z] = octant_coords(octant);
        self.child_handles[x][y][z]
    }
}

/// Mesh data for one node. Vertex bytes are laid out per [`VolumeType`],
/// indices are always 16 bit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshPayload {
    pub vertex_count: u32,
    pub vertex_data: Vec<u8>,
    pub index_count: u32,
    pub index_data: Vec<u16>,
}

/// Flatten child coordinates into a slot index: `x | y << 1 | z << 2`.
#[inline]
pub fn octant_index(x: usize, y: usize, z: usize) -> usize {
    debug_assert!(x < 2 && y < 2 && z < 2);
    x | (y << 1) | (z << 2)
}

/// Inverse of [`octant_index`].
#[inline]
pub fn octant_coords(octant: usize) -> [usize; 3] {
    debug_assert!(octant < OCTANT_COUNT);
    [octant & 1, (octant >> 1) & 1, (octant >> 2) & 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_octant_index_matches_coords() {
        for z in 0..2 {
            for y in 0..2 {
                for x in 0..2 {
                    let octant = octant_index(x, y, z);
                    assert_eq!(octant_coords(octant), [x, y, z]);
                }
            }
        }
        assert_eq!(octant_index(1, 0, 1), 5);
    }

    #[test]
    fn test_volume_type_codes() {
        assert_eq!(VolumeType::from_code(0), Some(VolumeType::ColoredCubes));
        assert_eq!(VolumeType::from_code(1), Some(VolumeType::Terrain));
        assert_eq!(VolumeType::from_code(7), None);
        assert_eq!(VolumeType::ColoredCubes.vertex_stride(), 8);
        assert_eq!(VolumeType::Terrain.vertex_stride(), 16);
    }

    #[test]
    fn test_invalid_handle() {
        assert!(!NodeHandle::INVALID.is_valid());
        assert!(NodeHandle(0).is_valid());
        assert_eq!(NodeHandle::INVALID.to_string(), "#invalid");
    }
}
