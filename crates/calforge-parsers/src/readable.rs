//! [`HumanReadable`] summaries of decoded records

use crate::animation::Animation;
use crate::material::Material;
use crate::mesh::Mesh;
use crate::skeleton::Skeleton;
use crate::traits::HumanReadable;

impl HumanReadable for Skeleton {
    fn to_readable_string(&self) -> String {
        let mut out = format!("Skeleton: {} bones\n", self.bone_count());
        for root in self.roots() {
            write_bone_tree(self, root, 1, &mut out);
        }
        out
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "bones": self.bones.iter().map(|b| serde_json::json!({
                "id": b.id,
                "name": b.name,
                "parent": b.parent,
                "children": b.children,
                "translation": b.translation.to_array(),
            })).collect::<Vec<_>>(),
        })
    }
}

fn write_bone_tree(skeleton: &Skeleton, id: usize, depth: usize, out: &mut String) {
    // Cyclic graphs stop once depth exceeds the bone count
    if depth > skeleton.bone_count() {
        return;
    }
    if let Some(bone) = skeleton.get_bone(id) {
        out.push_str(&format!("{}[{}] {}\n", "  ".repeat(depth), bone.id, bone.name));
        for &child in &bone.children {
            write_bone_tree(skeleton, child, depth + 1, out);
        }
    }
}

impl HumanReadable for Mesh {
    fn to_readable_string(&self) -> String {
        let mut out = format!(
            "Mesh: {} ({} vertices, {} triangles)\n",
            self.name,
            self.vertex_count(),
            self.triangle_count()
        );
        for (i, submesh) in self.submeshes.iter().enumerate() {
            out.push_str(&format!(
                "  [{i}] material {}: {} vertices, {} triangles, {} springs, {} uv channels\n",
                submesh.material_id,
                submesh.vertices.len(),
                submesh.triangle_count(),
                submesh.springs.len(),
                submesh.uv_channel_count
            ));
        }
        out
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "vertices": self.vertex_count(),
            "triangles": self.triangle_count(),
            "skinned": self.has_bone_weights(),
            "submeshes": self.submeshes.iter().map(|s| serde_json::json!({
                "material_id": s.material_id,
                "lod_steps": s.lod_steps,
                "uv_channels": s.uv_channel_count,
                "vertices": s.vertices.len(),
                "triangles": s.triangle_count(),
                "springs": s.springs.len(),
            })).collect::<Vec<_>>(),
        })
    }
}

impl HumanReadable for Animation {
    fn to_readable_string(&self) -> String {
        let mut out = format!(
            "Animation: {} ({:.3}s, {} tracks)\n",
            self.name,
            self.duration,
            self.tracks.len()
        );
        for track in &self.tracks {
            out.push_str(&format!(
                "  bone {}: {} keyframes{}\n",
                track.bone_id,
                track.keyframes.len(),
                if track.is_time_ordered() { "" } else { " (unordered)" }
            ));
        }
        out
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "duration": self.duration,
            "tracks": self.tracks.iter().map(|t| serde_json::json!({
                "bone_id": t.bone_id,
                "keyframes": t.keyframes.len(),
                "time_ordered": t.is_time_ordered(),
            })).collect::<Vec<_>>(),
        })
    }
}

impl HumanReadable for Material {
    fn to_readable_string(&self) -> String {
        let mut out = format!("Material: {}\n", self.name);
        out.push_str(&format!("  Ambient:   {:?}\n", self.ambient.to_array()));
        out.push_str(&format!("  Diffuse:   {:?}\n", self.diffuse.to_array()));
        out.push_str(&format!("  Specular:  {:?}\n", self.specular.to_array()));
        out.push_str(&format!("  Shininess: {}\n", self.shininess));
        for map in &self.maps {
            out.push_str(&format!("  Map: {map}\n"));
        }
        out
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::Bone;

    #[test]
    fn test_skeleton_tree_output() {
        let mut root = Bone::new("root", 0);
        root.children.push(1);
        let mut child = Bone::new("spine", 1);
        child.parent = Some(0);
        let skeleton = Skeleton::from_bones(vec![root, child]);

        let text = skeleton.to_readable_string();
        assert!(text.contains("  [0] root\n"));
        assert!(text.contains("    [1] spine\n"));
        assert_eq!(skeleton.to_json()["bones"][1]["parent"], 0);
    }

    #[test]
    fn test_material_json() {
        let material = Material {
            maps: vec!["skin.tga".into()],
            ..Material::new("skin")
        };
        let json = material.to_json();
        assert_eq!(json["name"], "skin");
        assert_eq!(json["maps"][0], "skin.tga");
        assert!(material.to_yaml().contains("skin.tga"));
    }
}
