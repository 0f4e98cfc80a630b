// calforge-character/src/skin.rs
//! Mesh merging and skin data
//!
//! Flattens a multi-submesh [`Mesh`] into single vertex, UV, bone-weight and
//! index buffers with one range per submesh, the layout a GPU skinning
//! pipeline consumes.

use serde::{Deserialize, Serialize};

use calforge_core::{Mat4x4, Vec2, Vec3};
use calforge_parsers::{BoneWeight, Mesh, Skeleton};

/// UV channels a merged vertex always exposes
pub const MAX_UV_CHANNELS: usize = 4;

/// Bone influences kept per merged vertex
pub const MAX_INFLUENCES: usize = 4;

/// One mesh flattened into shared buffers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedMesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// Always four arrays aligned with `positions`; channels at or above
    /// `uv_channel_count` are zero-filled
    pub uv_channels: [Vec<Vec2>; MAX_UV_CHANNELS],
    /// Highest channel count declared by any submesh, capped at four
    pub uv_channel_count: usize,
    /// Four slots per vertex; unused slots are `{bone_id: 0, weight: 0}`
    pub bone_weights: Vec<[BoneWeight; MAX_INFLUENCES]>,
    /// Triangle list into the merged vertex buffer
    pub indices: Vec<u32>,
    pub submeshes: Vec<SubmeshRange>,
}

/// Where a source submesh landed in the merged buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmeshRange {
    pub material_id: i32,
    pub vertex_offset: usize,
    pub vertex_count: usize,
    pub index_offset: usize,
    pub index_count: usize,
}

impl MergedMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// UV coordinates of one vertex across all four channels
    pub fn vertex_uvs(&self, vertex: usize) -> Option<[Vec2; MAX_UV_CHANNELS]> {
        if vertex >= self.positions.len() {
            return None;
        }
        Some(std::array::from_fn(|ch| self.uv_channels[ch][vertex]))
    }
}

/// Merge all submeshes of `mesh` into shared buffers.
///
/// Vertices are concatenated in submesh order and each submesh's triangle
/// indices are offset by its first vertex. Influences past the fourth are
/// dropped; weights are copied as declared, without renormalizing.
pub fn merge_mesh(mesh: &Mesh) -> MergedMesh {
    let vertex_total = mesh.vertex_count();
    let index_total: usize = mesh.submeshes.iter().map(|s| s.triangles.len()).sum();

    let uv_channel_count = mesh
        .submeshes
        .iter()
        .map(|s| s.uv_channel_count)
        .max()
        .unwrap_or(0)
        .min(MAX_UV_CHANNELS);

    let mut merged = MergedMesh {
        name: mesh.name.clone(),
        positions: Vec::with_capacity(vertex_total),
        normals: Vec::with_capacity(vertex_total),
        uv_channels: std::array::from_fn(|_| Vec::with_capacity(vertex_total)),
        uv_channel_count,
        bone_weights: Vec::with_capacity(vertex_total),
        indices: Vec::with_capacity(index_total),
        submeshes: Vec::with_capacity(mesh.submeshes.len()),
    };

    let mut dropped_influences = 0usize;

    for submesh in &mesh.submeshes {
        let vertex_offset = merged.positions.len();
        let index_offset = merged.indices.len();

        for vertex in &submesh.vertices {
            merged.positions.push(vertex.position);
            merged.normals.push(vertex.normal);

            for (ch, channel) in merged.uv_channels.iter_mut().enumerate() {
                channel.push(vertex.uvs.get(ch).copied().unwrap_or(Vec2::ZERO));
            }

            let mut slots = [BoneWeight::default(); MAX_INFLUENCES];
            for (slot, influence) in slots.iter_mut().zip(&vertex.influences) {
                *slot = *influence;
            }
            dropped_influences += vertex.influences.len().saturating_sub(MAX_INFLUENCES);
            merged.bone_weights.push(slots);
        }

        let base = vertex_offset as u32;
        merged
            .indices
            .extend(submesh.triangles.iter().map(|&index| index + base));

        merged.submeshes.push(SubmeshRange {
            material_id: submesh.material_id,
            vertex_offset,
            vertex_count: submesh.vertices.len(),
            index_offset,
            index_count: submesh.triangles.len(),
        });
    }

    if dropped_influences > 0 {
        tracing::debug!(
            mesh = %mesh.name,
            dropped = dropped_influences,
            "Dropped influences past the fourth slot"
        );
    }

    merged
}

/// Bind-pose matrix of every bone, indexed by bone id
pub fn bind_poses(skeleton: &Skeleton) -> Vec<Mat4x4> {
    skeleton.bones.iter().map(|bone| bone.bind_pose).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use calforge_parsers::{Bone, Submesh, Vertex};

    fn vertex(x: f32, uvs: usize, influences: &[(i32, f32)]) -> Vertex {
        let mut v = Vertex::new(Vec3::new(x, 0.0, 0.0));
        v.uvs = (0..uvs).map(|ch| Vec2::new(ch as f32 + 1.0, 1.0)).collect();
        v.influences = influences.iter().map(|&(b, w)| BoneWeight::new(b, w)).collect();
        v
    }

    fn submesh(material_id: i32, uv_count: usize, vertices: Vec<Vertex>, triangles: Vec<u32>) -> Submesh {
        Submesh {
            material_id,
            uv_channel_count: uv_count,
            vertices,
            triangles,
            ..Submesh::default()
        }
    }

    fn two_submesh_mesh() -> Mesh {
        let mut mesh = Mesh::new("body");
        mesh.submeshes.push(submesh(
            0,
            1,
            vec![
                vertex(0.0, 1, &[(0, 1.0)]),
                vertex(1.0, 1, &[(1, 0.5), (2, 0.25)]),
                vertex(2.0, 1, &[]),
            ],
            vec![0, 2, 1],
        ));
        mesh.submeshes.push(submesh(
            1,
            2,
            vec![
                vertex(3.0, 2, &[(0, 0.2), (1, 0.2), (2, 0.2), (3, 0.2), (4, 0.2)]),
                vertex(4.0, 2, &[(3, 1.0)]),
                vertex(5.0, 2, &[(3, 1.0)]),
            ],
            vec![0, 2, 1, 1, 2, 0],
        ));
        mesh
    }

    #[test]
    fn test_merge_offsets_indices() {
        let merged = merge_mesh(&two_submesh_mesh());

        assert_eq!(merged.vertex_count(), 6);
        assert_eq!(merged.indices, vec![0, 2, 1, 3, 5, 4, 4, 5, 3]);
        assert_eq!(merged.triangle_count(), 3);
        assert_eq!(
            merged.submeshes[1],
            SubmeshRange {
                material_id: 1,
                vertex_offset: 3,
                vertex_count: 3,
                index_offset: 3,
                index_count: 6,
            }
        );
        assert_eq!(merged.positions[4], Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn test_merge_pads_uv_channels() {
        let merged = merge_mesh(&two_submesh_mesh());

        assert_eq!(merged.uv_channel_count, 2);
        assert!(merged.uv_channels.iter().all(|c| c.len() == 6));

        let first = merged.vertex_uvs(0).unwrap();
        assert_eq!(first[0], Vec2::new(1.0, 1.0));
        assert_eq!(first[1], Vec2::ZERO);
        assert_eq!(first[3], Vec2::ZERO);

        let later = merged.vertex_uvs(3).unwrap();
        assert_eq!(later[1], Vec2::new(2.0, 1.0));
        assert_eq!(later[2], Vec2::ZERO);
        assert!(merged.vertex_uvs(6).is_none());
    }

    #[test]
    fn test_merge_bone_weight_slots() {
        let merged = merge_mesh(&two_submesh_mesh());

        assert_eq!(
            merged.bone_weights[1],
            [
                BoneWeight::new(1, 0.5),
                BoneWeight::new(2, 0.25),
                BoneWeight::default(),
                BoneWeight::default(),
            ]
        );
        assert_eq!(merged.bone_weights[2], [BoneWeight::default(); 4]);
        // Fifth influence is dropped; no renormalization
        let sum: f32 = merged.bone_weights[3].iter().map(|w| w.weight).sum();
        assert!((sum - 0.8).abs() < 1e-6);
        assert_eq!(merged.bone_weights[3][3].bone_id, 3);
    }

    #[test]
    fn test_uv_channel_count_is_capped() {
        let mut mesh = Mesh::new("wide");
        mesh.submeshes.push(submesh(0, 6, vec![vertex(0.0, 6, &[])], vec![]));
        let merged = merge_mesh(&mesh);
        assert_eq!(merged.uv_channel_count, MAX_UV_CHANNELS);
        assert_eq!(merged.uv_channels[3][0], Vec2::new(4.0, 1.0));
    }

    #[test]
    fn test_empty_mesh() {
        let merged = merge_mesh(&Mesh::new("empty"));
        assert_eq!(merged.uv_channel_count, 0);
        assert!(merged.positions.is_empty());
        assert!(merged.submeshes.is_empty());
    }

    #[test]
    fn test_bind_poses_indexed_by_bone() {
        let mut root = Bone::new("root", 0);
        root.bind_translation = Vec3::new(0.0, -1.0, 0.0);
        root.update_bind_pose();
        let mut child = Bone::new("child", 1);
        child.parent = Some(0);
        root.children.push(1);

        let skeleton = Skeleton::from_bones(vec![root, child]);
        let poses = bind_poses(&skeleton);
        assert_eq!(poses.len(), 2);
        assert_eq!(poses[0].translation(), Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(poses[1], Mat4x4::IDENTITY);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        fn arb_submesh() -> impl Strategy<Value = Submesh> {
            (1usize..12, 0usize..6, 0usize..6).prop_flat_map(|(vertices, triangles, uvs)| {
                proptest::collection::vec(0..vertices as u32, triangles * 3).prop_map(move |indices| {
                    let verts = (0..vertices).map(|i| vertex(i as f32, uvs, &[(0, 1.0)])).collect();
                    submesh(0, uvs, verts, indices)
                })
            })
        }

        proptest! {
            #[test]
            fn merged_ranges_cover_buffers(submeshes in proptest::collection::vec(arb_submesh(), 0..5)) {
                let mut mesh = Mesh::new("prop");
                mesh.submeshes = submeshes;
                let merged = merge_mesh(&mesh);

                let total: usize = mesh.submeshes.iter().map(|s| s.vertices.len()).sum();
                prop_assert_eq!(merged.vertex_count(), total);
                prop_assert_eq!(merged.bone_weights.len(), total);
                for channel in &merged.uv_channels {
                    prop_assert_eq!(channel.len(), total);
                }
                prop_assert!(merged.uv_channel_count <= MAX_UV_CHANNELS);

                let mut vertex_offset = 0;
                let mut index_offset = 0;
                for range in &merged.submeshes {
                    prop_assert_eq!(range.vertex_offset, vertex_offset);
                    prop_assert_eq!(range.index_offset, index_offset);
                    for &index in &merged.indices[range.index_offset..range.index_offset + range.index_count] {
                        let index = index as usize;
                        prop_assert!(index >= range.vertex_offset);
                        prop_assert!(index < range.vertex_offset + range.vertex_count);
                    }
                    vertex_offset += range.vertex_count;
                    index_offset += range.index_count;
                }
                prop_assert_eq!(index_offset, merged.indices.len());
            }
        }
    }
}
