// calforge-character/src/assembler.rs
//! Character assembly and reference validation

use std::path::PathBuf;
use std::sync::Arc;

use calforge_core::{Error, Result};
use calforge_parsers::{Animation, Material, Mesh, Skeleton};

use crate::asset::CharacterAsset;

/// Combines decoded records into a [`CharacterAsset`].
///
/// Every cross-reference is checked before the asset is handed out:
/// submesh material ids, vertex influence bone ids, triangle and spring
/// vertex indices, and animation track bone ids. The first reference out
/// of range fails the whole assembly.
#[derive(Debug, Clone)]
pub struct CharacterAssembler {
    name: String,
    scale: f32,
    source_dir: PathBuf,
    skeleton: Option<Skeleton>,
    meshes: Vec<Mesh>,
    animations: Vec<Animation>,
    materials: Vec<Material>,
}

impl CharacterAssembler {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scale: 1.0,
            source_dir: PathBuf::new(),
            skeleton: None,
            meshes: Vec::new(),
            animations: Vec::new(),
            materials: Vec::new(),
        }
    }

    /// Scale the records were decoded with
    pub fn scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = dir.into();
        self
    }

    pub fn skeleton(mut self, skeleton: Skeleton) -> Self {
        self.skeleton = Some(skeleton);
        self
    }

    pub fn mesh(mut self, mesh: Mesh) -> Self {
        self.meshes.push(mesh);
        self
    }

    pub fn meshes(mut self, meshes: impl IntoIterator<Item = Mesh>) -> Self {
        self.meshes.extend(meshes);
        self
    }

    pub fn animation(mut self, animation: Animation) -> Self {
        self.animations.push(animation);
        self
    }

    pub fn animations(mut self, animations: impl IntoIterator<Item = Animation>) -> Self {
        self.animations.extend(animations);
        self
    }

    /// Materials are indexed by submesh material ids in the order added
    pub fn material(mut self, material: Material) -> Self {
        self.materials.push(material);
        self
    }

    pub fn materials(mut self, materials: impl IntoIterator<Item = Material>) -> Self {
        self.materials.extend(materials);
        self
    }

    /// Validate every reference and build the asset
    pub fn assemble(self) -> Result<CharacterAsset> {
        if let Some(skeleton) = &self.skeleton {
            skeleton
                .validate()
                .map_err(|e| e.with_context(format!("skeleton of '{}'", self.name)))?;
        }

        let bone_count = self.skeleton.as_ref().map_or(0, Skeleton::bone_count);
        for mesh in &self.meshes {
            check_mesh(mesh, self.materials.len(), bone_count)?;
        }
        for animation in &self.animations {
            check_animation(animation, bone_count)?;
        }

        tracing::debug!(
            character = %self.name,
            bones = bone_count,
            meshes = self.meshes.len(),
            animations = self.animations.len(),
            materials = self.materials.len(),
            "Assembled character"
        );

        Ok(CharacterAsset {
            name: self.name,
            skeleton: self.skeleton.map(Arc::new),
            meshes: self.meshes,
            animations: self.animations,
            materials: self.materials,
            scale: self.scale,
            source_dir: self.source_dir,
        })
    }
}

fn in_range(index: i64, len: usize) -> bool {
    usize::try_from(index).is_ok_and(|i| i < len)
}

fn check_mesh(mesh: &Mesh, material_count: usize, bone_count: usize) -> Result<()> {
    for (s, submesh) in mesh.submeshes.iter().enumerate() {
        let owner = || format!("mesh '{}' submesh {s}", mesh.name);

        if !in_range(i64::from(submesh.material_id), material_count) {
            return Err(Error::integrity(
                owner(),
                "material id",
                i64::from(submesh.material_id),
                material_count,
            ));
        }

        let vertex_count = submesh.vertices.len();
        for (v, vertex) in submesh.vertices.iter().enumerate() {
            if let Some(bad) = vertex
                .influences
                .iter()
                .find(|w| !in_range(i64::from(w.bone_id), bone_count))
            {
                return Err(Error::integrity(
                    format!("{} vertex {v}", owner()),
                    "influence bone id",
                    i64::from(bad.bone_id),
                    bone_count,
                ));
            }
        }

        if let Some(&bad) = submesh
            .triangles
            .iter()
            .find(|&&i| !in_range(i64::from(i), vertex_count))
        {
            return Err(Error::integrity(owner(), "triangle index", i64::from(bad), vertex_count));
        }

        for spring in &submesh.springs {
            if let Some(&bad) = spring
                .vertex_ids
                .iter()
                .find(|&&i| !in_range(i64::from(i), vertex_count))
            {
                return Err(Error::integrity(owner(), "spring vertex id", i64::from(bad), vertex_count));
            }
        }
    }
    Ok(())
}

fn check_animation(animation: &Animation, bone_count: usize) -> Result<()> {
    for (t, track) in animation.tracks.iter().enumerate() {
        if !in_range(i64::from(track.bone_id), bone_count) {
            return Err(Error::integrity(
                format!("animation '{}' track {t}", animation.name),
                "bone id",
                i64::from(track.bone_id),
                bone_count,
            ));
        }
        if !track.is_time_ordered() {
            tracing::warn!(
                animation = %animation.name,
                track = t,
                bone = track.bone_id,
                "Keyframe times are not strictly increasing"
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calforge_core::{Quat, Vec3};
    use calforge_parsers::{AnimationTrack, Bone, BoneWeight, Keyframe, Spring, Submesh, Vertex};

    fn skeleton() -> Skeleton {
        let mut root = Bone::new("root", 0);
        root.children = vec![1, 2];
        let mut left = Bone::new("left", 1);
        left.parent = Some(0);
        let mut right = Bone::new("right", 2);
        right.parent = Some(0);
        Skeleton::from_bones(vec![root, left, right])
    }

    fn mesh(material_id: i32, bone_id: i32) -> Mesh {
        let mut vertices = vec![Vertex::new(Vec3::ZERO); 3];
        vertices[0].influences.push(BoneWeight::new(bone_id, 1.0));
        let mut mesh = Mesh::new("body");
        mesh.submeshes.push(Submesh {
            material_id,
            vertices,
            triangles: vec![0, 2, 1],
            ..Submesh::default()
        });
        mesh
    }

    fn animation(bone_id: i32, times: &[f32]) -> Animation {
        Animation {
            name: "walk".into(),
            duration: 1.0,
            tracks: vec![AnimationTrack {
                bone_id,
                keyframes: times
                    .iter()
                    .map(|&time| Keyframe {
                        time,
                        translation: Vec3::ZERO,
                        rotation: Quat::IDENTITY,
                    })
                    .collect(),
            }],
        }
    }

    #[test]
    fn test_assemble_valid_character() {
        let asset = CharacterAssembler::new("hero")
            .scale(2.0)
            .source_dir("data")
            .skeleton(skeleton())
            .mesh(mesh(0, 2))
            .animation(animation(1, &[0.0, 0.5]))
            .material(Material::new("skin"))
            .assemble()
            .unwrap();

        assert_eq!(asset.bone_count(), 3);
        assert_eq!(asset.scale, 2.0);
        assert_eq!(asset.material_for(0).map(|m| m.name.as_str()), Some("skin"));
        assert!(asset.material_for(-1).is_none());
    }

    #[test]
    fn test_material_id_out_of_range() {
        let err = CharacterAssembler::new("hero")
            .skeleton(skeleton())
            .mesh(mesh(1, 0))
            .material(Material::new("skin"))
            .assemble()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::AssetIntegrity { index: 1, len: 1, .. }
        ));
    }

    #[test]
    fn test_material_id_without_materials() {
        let err = CharacterAssembler::new("hero")
            .skeleton(skeleton())
            .mesh(mesh(0, 0))
            .assemble()
            .unwrap_err();
        assert!(err.is_integrity_error());
    }

    #[test]
    fn test_track_bone_out_of_range() {
        let err = CharacterAssembler::new("hero")
            .skeleton(skeleton())
            .animation(animation(3, &[0.0]))
            .assemble()
            .unwrap_err();
        match err {
            Error::AssetIntegrity { reference, index, len, .. } => {
                assert_eq!(reference, "bone id");
                assert_eq!(index, 3);
                assert_eq!(len, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_negative_influence_bone() {
        let err = CharacterAssembler::new("hero")
            .skeleton(skeleton())
            .mesh(mesh(0, -1))
            .material(Material::new("skin"))
            .assemble()
            .unwrap_err();
        assert!(matches!(err, Error::AssetIntegrity { index: -1, .. }));
    }

    #[test]
    fn test_triangle_and_spring_indices() {
        let mut bad_triangle = mesh(0, 0);
        bad_triangle.submeshes[0].triangles = vec![0, 1, 3];
        let err = CharacterAssembler::new("hero")
            .skeleton(skeleton())
            .mesh(bad_triangle)
            .material(Material::new("skin"))
            .assemble()
            .unwrap_err();
        assert!(err.to_string().contains("triangle index 3"));

        let mut bad_spring = mesh(0, 0);
        bad_spring.submeshes[0].springs.push(Spring {
            vertex_ids: [0, 7],
            coefficient: 1.0,
            rest_length: 1.0,
        });
        let err = CharacterAssembler::new("hero")
            .skeleton(skeleton())
            .mesh(bad_spring)
            .material(Material::new("skin"))
            .assemble()
            .unwrap_err();
        assert!(err.to_string().contains("spring vertex id 7"));
    }

    #[test]
    fn test_unordered_track_only_warns() {
        let asset = CharacterAssembler::new("hero")
            .skeleton(skeleton())
            .animation(animation(0, &[1.0, 0.5]))
            .assemble();
        assert!(asset.is_ok());
    }

    #[test]
    fn test_invalid_skeleton_is_rejected() {
        let mut broken = skeleton();
        broken.bones[1].parent = None;
        let err = CharacterAssembler::new("hero").skeleton(broken).assemble().unwrap_err();
        assert!(matches!(err.root_cause(), Error::InvalidHierarchy { .. }));
    }

    #[test]
    fn test_skeleton_without_bones_is_rejected() {
        let err = CharacterAssembler::new("hero")
            .skeleton(Skeleton::new())
            .assemble()
            .unwrap_err();
        assert!(matches!(err.root_cause(), Error::InvalidHierarchy { .. }));
    }
}
