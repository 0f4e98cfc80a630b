// calforge-character/src/asset.rs
//! The assembled character

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use calforge_core::Mat4x4;
use calforge_parsers::{Animation, HumanReadable, Material, Mesh, Skeleton};

use crate::skin::{bind_poses, merge_mesh, MergedMesh};

/// A validated character: every material id and bone id it contains is in
/// range. Built by [`CharacterAssembler`](crate::CharacterAssembler).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterAsset {
    pub name: String,
    /// Shared read-only with every consumer of the asset
    pub skeleton: Option<Arc<Skeleton>>,
    pub meshes: Vec<Mesh>,
    pub animations: Vec<Animation>,
    pub materials: Vec<Material>,
    /// Factor the positions were scaled by at decode time
    pub scale: f32,
    /// Directory relative file references resolve against
    pub source_dir: PathBuf,
}

impl CharacterAsset {
    pub fn bone_count(&self) -> usize {
        self.skeleton.as_ref().map_or(0, |s| s.bone_count())
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(Mesh::vertex_count).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    /// Look up a mesh by name
    pub fn mesh(&self, name: &str) -> Option<&Mesh> {
        self.meshes.iter().find(|m| m.name == name)
    }

    /// Look up an animation by name
    pub fn animation(&self, name: &str) -> Option<&Animation> {
        self.animations.iter().find(|a| a.name == name)
    }

    /// Material a submesh refers to
    pub fn material_for(&self, material_id: i32) -> Option<&Material> {
        usize::try_from(material_id).ok().and_then(|id| self.materials.get(id))
    }

    /// Texture files of every material, resolved against `source_dir`
    pub fn texture_paths(&self) -> Vec<PathBuf> {
        self.materials
            .iter()
            .flat_map(|m| m.texture_paths(&self.source_dir))
            .collect()
    }

    /// Every mesh flattened into shared buffers, in mesh order
    pub fn merged_meshes(&self) -> Vec<MergedMesh> {
        self.meshes.iter().map(merge_mesh).collect()
    }

    /// Bind-pose matrix per bone id; empty without a skeleton
    pub fn bind_poses(&self) -> Vec<Mat4x4> {
        self.skeleton.as_deref().map(bind_poses).unwrap_or_default()
    }
}

impl HumanReadable for CharacterAsset {
    fn to_readable_string(&self) -> String {
        let mut out = format!("Character: {}\n", self.name);
        out.push_str(&format!("  Scale: {}\n", self.scale));
        out.push_str(&format!("  Source: {}\n", self.source_dir.display()));
        out.push_str(&format!("  Bones: {}\n", self.bone_count()));

        out.push_str(&format!("  Meshes: {}\n", self.meshes.len()));
        for mesh in &self.meshes {
            out.push_str(&format!(
                "    {} ({} submeshes, {} vertices, {} triangles)\n",
                mesh.name,
                mesh.submeshes.len(),
                mesh.vertex_count(),
                mesh.triangle_count()
            ));
        }

        out.push_str(&format!("  Animations: {}\n", self.animations.len()));
        for animation in &self.animations {
            out.push_str(&format!(
                "    {} ({:.2}s, {} tracks)\n",
                animation.name,
                animation.duration,
                animation.tracks.len()
            ));
        }

        out.push_str(&format!("  Materials: {}\n", self.materials.len()));
        for material in &self.materials {
            out.push_str(&format!("    {} ({} maps)\n", material.name, material.maps.len()));
        }

        out
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "scale": self.scale,
            "source_dir": self.source_dir,
            "bones": self.bone_count(),
            "vertices": self.vertex_count(),
            "triangles": self.triangle_count(),
            "meshes": self.meshes.iter().map(|m| serde_json::json!({
                "name": m.name,
                "submeshes": m.submeshes.len(),
                "vertices": m.vertex_count(),
                "triangles": m.triangle_count(),
            })).collect::<Vec<_>>(),
            "animations": self.animations.iter().map(|a| serde_json::json!({
                "name": a.name,
                "duration": a.duration,
                "tracks": a.tracks.len(),
            })).collect::<Vec<_>>(),
            "materials": self.materials.iter().map(|m| serde_json::json!({
                "name": m.name,
                "maps": m.maps,
            })).collect::<Vec<_>>(),
        })
    }
}

impl HumanReadable for MergedMesh {
    fn to_readable_string(&self) -> String {
        let mut out = format!(
            "Merged mesh: {} ({} vertices, {} triangles, {} uv channels)\n",
            self.name,
            self.vertex_count(),
            self.triangle_count(),
            self.uv_channel_count
        );
        for (i, range) in self.submeshes.iter().enumerate() {
            out.push_str(&format!(
                "  [{i}] material {} vertices {}..{} indices {}..{}\n",
                range.material_id,
                range.vertex_offset,
                range.vertex_offset + range.vertex_count,
                range.index_offset,
                range.index_offset + range.index_count
            ));
        }
        out
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "vertices": self.vertex_count(),
            "triangles": self.triangle_count(),
            "uv_channel_count": self.uv_channel_count,
            "submeshes": self.submeshes,
        })
    }
}
