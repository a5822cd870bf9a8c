//! Flat serialized form
//!
//! The node buffers are already position-independent word arrays, so
//! serializing is a copy. Deserializing checks every node against the
//! buffer length and the geometry before trusting any offset.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::bvh::node::{self, NODE_WORDS};
use crate::bvh::{BvhError, MeshBvh};
use crate::mesh::{IndexBuffer, MeshGeometry};

/// A hierarchy detached from its geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedBvh {
    /// One flat node buffer per root
    pub roots: Vec<Vec<u32>>,
    /// The index buffer the hierarchy was built against
    pub index: Option<IndexBuffer>,
    /// Slot-to-triangle table in indirect mode
    pub indirect_buffer: Option<Vec<u32>>,
}

/// Deserialization settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeserializeOptions {
    /// Copy the stored index buffer into the geometry
    pub set_index: bool,
}

impl Default for DeserializeOptions {
    fn default() -> Self {
        Self { set_index: true }
    }
}

impl SerializedBvh {
    /// A root buffer as raw bytes, native endian
    pub fn root_bytes(&self, root: usize) -> Option<&[u8]> {
        self.roots.get(root).map(|buffer| bytemuck::cast_slice(buffer))
    }

    /// Rebuild a root buffer from bytes produced by [`SerializedBvh::root_bytes`]
    pub fn root_from_bytes(bytes: &[u8]) -> Result<Vec<u32>, BvhError> {
        if bytes.len() % node::NODE_BYTES != 0 {
            return Err(BvhError::InvalidSerializedData(format!(
                "{} bytes is not a whole number of nodes",
                bytes.len()
            )));
        }
        // Byte slices carry no alignment guarantee, so copy word by word
        Ok(bytes
            .chunks_exact(4)
            .map(|word| u32::from_ne_bytes([word[0], word[1], word[2], word[3]]))
            .collect())
    }
}

impl MeshBvh {
    /// Copy out the node buffers, index and indirect table
    pub fn serialize(&self) -> SerializedBvh {
        SerializedBvh {
            roots: self.roots.clone(),
            index: self.geometry.index().cloned(),
            indirect_buffer: self.indirect_buffer.clone(),
        }
    }

    /// Reattach serialized node data to `geometry`
    pub fn deserialize(
        data: SerializedBvh,
        mut geometry: MeshGeometry,
        options: &DeserializeOptions,
    ) -> Result<Self, BvhError> {
        geometry.validate()?;
        if options.set_index {
            if let Some(index) = data.index {
                geometry.set_index(Some(index))?;
            }
        }

        let triangle_count = geometry.triangle_count();
        if data.roots.is_empty() {
            return Err(BvhError::InvalidSerializedData("no roots".to_string()));
        }
        for (root, buffer) in data.roots.iter().enumerate() {
            validate_root(buffer, triangle_count)
                .map_err(|reason| BvhError::InvalidSerializedData(format!("root {root}: {reason}")))?;
        }

        if let Some(table) = &data.indirect_buffer {
            if table.len() != triangle_count {
                return Err(BvhError::InvalidSerializedData(format!(
                    "indirect buffer has {} entries for {} triangles",
                    table.len(),
                    triangle_count
                )));
            }
            if let Some(entry) = table.iter().find(|&&entry| entry as usize >= triangle_count) {
                return Err(BvhError::InvalidSerializedData(format!(
                    "indirect entry {entry} out of range"
                )));
            }
        }

        debug!(
            "Deserialized BVH: {} roots, {} triangles, indirect: {}",
            data.roots.len(),
            triangle_count,
            data.indirect_buffer.is_some()
        );

        Ok(Self {
            geometry,
            roots: data.roots,
            indirect_buffer: data.indirect_buffer,
        })
    }
}

/// Checks every node in a root; children must point forward inside the buffer
fn validate_root(buffer: &[u32], triangle_count: usize) -> Result<(), String> {
    if buffer.is_empty() || buffer.len() % NODE_WORDS != 0 {
        return Err(format!("length {} is not a whole number of nodes", buffer.len()));
    }

    for index in (0..buffer.len()).step_by(NODE_WORDS) {
        if node::is_leaf(buffer, index) {
            let end = node::leaf_offset(buffer, index) as usize + node::leaf_count(buffer, index) as usize;
            if end > triangle_count {
                return Err(format!("leaf at {index} ends at slot {end} past {triangle_count} triangles"));
            }
        } else {
            let right = node::right_child(buffer, index);
            if right % NODE_WORDS != 0 || right <= node::left_child(index) || right >= buffer.len() {
                return Err(format!("node at {index} has invalid right child {right}"));
            }
            if node::split_axis(buffer, index) > 2 {
                return Err(format!("node at {index} has split axis {}", node::split_axis(buffer, index)));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::{BuildOptions, ClosestPointOptions, SplitStrategy};
    use crate::foundation::math::Vec3;
    use crate::geometry::Ray;
    use crate::mesh::shapes::uv_sphere;

    fn built(indirect: bool) -> MeshBvh {
        let options = BuildOptions {
            strategy: SplitStrategy::Sah,
            indirect,
            ..Default::default()
        };
        MeshBvh::build(uv_sphere(1.0, 12, 8).unwrap(), &options).unwrap()
    }

    #[test]
    fn test_round_trip_through_ron() {
        for indirect in [false, true] {
            let bvh = built(indirect);
            let text = ron::to_string(&bvh.serialize()).unwrap();
            let data: SerializedBvh = ron::from_str(&text).unwrap();

            // Start from the unsorted sphere; the stored index restores the build order
            let restored = MeshBvh::deserialize(data, uv_sphere(1.0, 12, 8).unwrap(), &DeserializeOptions::default()).unwrap();
            assert_eq!(restored, bvh);

            let ray = Ray::new(Vec3::new(0.1, 0.2, 4.0), Vec3::new(0.0, 0.0, -1.0));
            assert_eq!(restored.raycast_first(&ray, 0.0, f32::INFINITY), bvh.raycast_first(&ray, 0.0, f32::INFINITY));
            let point = Vec3::new(2.0, -1.0, 0.5);
            let options = ClosestPointOptions::default();
            assert_eq!(
                restored.closest_point_to_point(&point, &options),
                bvh.closest_point_to_point(&point, &options)
            );
        }
    }

    #[test]
    fn test_root_bytes_round_trip() {
        let data = built(false).serialize();
        let bytes = data.root_bytes(0).unwrap();
        assert_eq!(bytes.len(), data.roots[0].len() * 4);
        assert_eq!(SerializedBvh::root_from_bytes(bytes).unwrap(), data.roots[0]);
        assert!(data.root_bytes(data.roots.len()).is_none());
        assert!(SerializedBvh::root_from_bytes(&bytes[..bytes.len() - 4]).is_err());
    }

    #[test]
    fn test_corrupt_data_is_rejected() {
        let bvh = built(false);
        let geometry = || bvh.geometry().clone();
        let options = DeserializeOptions::default();
        let invalid = |data: SerializedBvh| {
            matches!(
                MeshBvh::deserialize(data, geometry(), &options),
                Err(BvhError::InvalidSerializedData(_))
            )
        };

        let mut truncated = bvh.serialize();
        truncated.roots[0].pop();
        assert!(invalid(truncated));

        let mut bad_child = bvh.serialize();
        bad_child.roots[0][6] = 3;
        assert!(invalid(bad_child));

        let mut bad_leaf = bvh.serialize();
        let last = bad_leaf.roots[0].len() - NODE_WORDS;
        bad_leaf.roots[0][last + 6] = 10_000;
        assert!(invalid(bad_leaf));

        let mut bad_table = bvh.serialize();
        bad_table.indirect_buffer = Some(vec![0; 3]);
        assert!(invalid(bad_table));

        let mut no_roots = bvh.serialize();
        no_roots.roots.clear();
        assert!(invalid(no_roots));
    }
}
