// calforge-parsers/src/skeleton.rs
//! Skeleton (CSF) decoder and bone structures
//!
//! # Format Structure
//! ```text
//! header          magic "CSF\0", version i32
//! bone count      i32
//! per bone        name            u32 length + bytes
//!                 translation     3 x f32   (relative to parent)
//!                 rotation        4 x f32   (relative to parent)
//!                 bind transl.    3 x f32   (model space -> bone space)
//!                 bind rotation   4 x f32
//!                 parent id       i32       (-1 for the root)
//!                 child count     i32
//!                 child ids       child count x i32
//! ```
//!
//! Bones are stored as an arena addressed by position; a bone's id is its
//! index in [`Skeleton::bones`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use calforge_core::{Error, Mat4x4, Quat, Vec3};

use crate::cursor::BinaryCursor;
use crate::header::{read_header, AssetKind, BINARY_FORMAT_VERSION, SKELETON_MAGIC};
use crate::traits::{ParseOptions, ParseResult, Parser};
use crate::transform::{convert_position, convert_rotation};

/// Smallest possible bone record: empty name, 14 floats, parent, child count
const MIN_BONE_RECORD: usize = 4 + 14 * 4 + 4 + 4;

/// Skeleton structure for skinned meshes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Skeleton {
    /// All bones, indexed by id
    pub bones: Vec<Bone>,
    /// Bone name to index mapping
    #[serde(skip)]
    bone_map: HashMap<String, usize>,
}

impl Skeleton {
    /// Create a new empty skeleton
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a skeleton from bones already in id order
    pub fn from_bones(bones: Vec<Bone>) -> Self {
        let mut skeleton = Self::new();
        for bone in bones {
            skeleton.add_bone(bone);
        }
        skeleton
    }

    /// Add a bone to the skeleton; returns its id
    pub fn add_bone(&mut self, bone: Bone) -> usize {
        let idx = self.bones.len();
        self.bone_map.entry(bone.name.clone()).or_insert(idx);
        self.bones.push(bone);
        idx
    }

    /// Get bone count
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Get bone by id
    pub fn get_bone(&self, id: usize) -> Option<&Bone> {
        self.bones.get(id)
    }

    /// Find bone by name (first bone wins on duplicates)
    pub fn find_bone(&self, name: &str) -> Option<&Bone> {
        match self.bone_map.get(name) {
            Some(&idx) => self.bones.get(idx),
            // Deserialized skeletons have no name map
            None => self.bones.iter().find(|b| b.name == name),
        }
    }

    /// Bones without a parent
    pub fn roots(&self) -> Vec<usize> {
        self.bones
            .iter()
            .filter(|b| b.is_root())
            .map(|b| b.id)
            .collect()
    }

    /// The single root bone, if the skeleton has exactly one
    pub fn root(&self) -> Option<&Bone> {
        match self.roots().as_slice() {
            [only] => self.bones.get(*only),
            _ => None,
        }
    }

    /// Children of a bone, in declaration order
    pub fn children(&self, id: usize) -> &[usize] {
        self.bones
            .get(id)
            .map(|b| b.children.as_slice())
            .unwrap_or(&[])
    }

    /// Bone chain from a bone up to the root, starting with the bone itself.
    /// Stops early on a repeated id so malformed graphs terminate.
    pub fn chain_to_root(&self, id: usize) -> Vec<usize> {
        let mut chain = vec![id];
        let mut current = id;

        while let Some(parent) = self.bones.get(current).and_then(|b| b.parent) {
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = parent;
        }

        chain
    }

    /// Model-space transform of a bone composed from local transforms
    pub fn world_transform(&self, id: usize) -> Mat4x4 {
        self.chain_to_root(id)
            .iter()
            .rev()
            .filter_map(|&idx| self.bones.get(idx))
            .fold(Mat4x4::IDENTITY, |acc, bone| acc.mul(&bone.local_matrix()))
    }

    /// Get all bone names
    pub fn bone_names(&self) -> Vec<&str> {
        self.bones.iter().map(|b| b.name.as_str()).collect()
    }

    /// Validate the bone graph: ids match positions, indices are in range,
    /// parent and child lists agree, exactly one root, no cycles.
    pub fn validate(&self) -> ParseResult<()> {
        let count = self.bones.len();

        for (idx, bone) in self.bones.iter().enumerate() {
            if bone.id != idx {
                return Err(Error::invalid_hierarchy(format!(
                    "bone '{}' at position {idx} carries id {}",
                    bone.name, bone.id
                )));
            }
            if let Some(parent) = bone.parent {
                if parent >= count {
                    return Err(Error::integrity(
                        format!("bone '{}'", bone.name),
                        "parent id",
                        parent as i64,
                        count,
                    ));
                }
                if parent == idx {
                    return Err(Error::invalid_hierarchy(format!(
                        "bone '{}' references itself as parent",
                        bone.name
                    )));
                }
                if !self.bones[parent].children.contains(&idx) {
                    return Err(Error::invalid_hierarchy(format!(
                        "bone '{}' names parent {parent}, which does not list it as a child",
                        bone.name
                    )));
                }
            }
            for &child in &bone.children {
                if child >= count {
                    return Err(Error::integrity(
                        format!("bone '{}'", bone.name),
                        "child id",
                        child as i64,
                        count,
                    ));
                }
                if self.bones[child].parent != Some(idx) {
                    return Err(Error::invalid_hierarchy(format!(
                        "bone '{}' lists child {child}, whose parent is {:?}",
                        bone.name, self.bones[child].parent
                    )));
                }
            }
        }

        let roots = self.roots();
        if roots.len() != 1 {
            return Err(Error::invalid_hierarchy(format!(
                "expected exactly one root bone, found {}",
                roots.len()
            )));
        }

        // Walk down from the root; every bone must be reached exactly once.
        let mut visited = vec![false; count];
        let mut stack = vec![roots[0]];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut visited[id], true) {
                return Err(Error::invalid_hierarchy(format!(
                    "bone {id} is reachable twice from the root"
                )));
            }
            stack.extend(self.bones[id].children.iter().copied());
        }
        if let Some(orphan) = visited.iter().position(|v| !v) {
            return Err(Error::invalid_hierarchy(format!(
                "bone '{}' is part of a cycle detached from the root",
                self.bones[orphan].name
            )));
        }

        Ok(())
    }
}

/// A single bone in the skeleton
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    /// Bone name
    pub name: String,
    /// Position in the skeleton
    pub id: usize,
    /// Parent bone id (None for the root)
    pub parent: Option<usize>,
    /// Child bone ids, in declaration order
    pub children: Vec<usize>,
    /// Translation relative to the parent (scaled, converted)
    pub translation: Vec3,
    /// Rotation relative to the parent (converted)
    pub rotation: Quat,
    /// Model-space to bone-space translation (scaled, converted)
    pub bind_translation: Vec3,
    /// Model-space to bone-space rotation (converted)
    pub bind_rotation: Quat,
    /// Inverse bind transform used for skinning
    pub bind_pose: Mat4x4,
}

impl Bone {
    /// Create a root bone with identity transforms
    pub fn new(name: impl Into<String>, id: usize) -> Self {
        Self {
            name: name.into(),
            id,
            parent: None,
            children: Vec::new(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            bind_translation: Vec3::ZERO,
            bind_rotation: Quat::IDENTITY,
            bind_pose: Mat4x4::IDENTITY,
        }
    }

    /// Check if this is a root bone
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Local transform relative to the parent
    pub fn local_matrix(&self) -> Mat4x4 {
        Mat4x4::from_rotation_translation(self.rotation, self.translation)
    }

    /// Recompute the bind matrix from the bind translation/rotation pair
    pub fn update_bind_pose(&mut self) {
        self.bind_pose = Mat4x4::from_rotation_translation(self.bind_rotation, self.bind_translation);
    }
}

/// Parent id marking a root bone
const NO_PARENT: i32 = -1;

/// Skeleton file decoder
#[derive(Debug, Default)]
pub struct SkeletonParser;

impl SkeletonParser {
    /// Create a new skeleton parser
    pub fn new() -> Self {
        Self
    }

    fn parse_bone(&self, cursor: &mut BinaryCursor<'_>, id: usize, scale: f32) -> ParseResult<Bone> {
        let name = cursor.read_c_string()?;

        let translation = convert_position(cursor.read_vec3()?, scale);
        let rotation = convert_rotation(cursor.read_quat()?);
        let bind_translation = convert_position(cursor.read_vec3()?, scale);
        let bind_rotation = convert_rotation(cursor.read_quat()?);

        let parent_offset = cursor.position();
        let parent = match cursor.read_i32()? {
            NO_PARENT => None,
            raw => Some(usize::try_from(raw).map_err(|_| {
                Error::invalid_data(format!("parent id {raw} at offset {parent_offset}"))
            })?),
        };

        let child_count = cursor.read_count("child")?;
        let mut children = Vec::with_capacity(cursor.capacity_for(child_count, 4));
        for _ in 0..child_count {
            children.push(cursor.read_index("child id")? as usize);
        }

        let mut bone = Bone {
            name,
            id,
            parent,
            children,
            translation,
            rotation,
            bind_translation,
            bind_rotation,
            bind_pose: Mat4x4::IDENTITY,
        };
        bone.update_bind_pose();

        Ok(bone)
    }
}

impl Parser for SkeletonParser {
    type Output = Skeleton;

    fn extensions(&self) -> &[&str] {
        &["csf"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(SKELETON_MAGIC)
    }

    fn name(&self) -> &str {
        "Skeleton Parser"
    }

    fn supported_versions(&self) -> &[i32] {
        &[BINARY_FORMAT_VERSION]
    }

    fn parse_bytes(&self, data: &[u8], options: &ParseOptions) -> ParseResult<Option<Skeleton>> {
        let mut cursor = BinaryCursor::new(data);
        if read_header(&mut cursor, AssetKind::Skeleton)?.is_none() {
            return Ok(None);
        }

        let bone_count = cursor.read_count("bone")?;
        let mut skeleton = Skeleton::new();
        skeleton.bones.reserve(cursor.capacity_for(bone_count, MIN_BONE_RECORD));

        for id in 0..bone_count {
            let bone = self.parse_bone(&mut cursor, id, options.scale)?;
            skeleton.add_bone(bone);
        }

        tracing::debug!(bones = skeleton.bone_count(), "Decoded skeleton");
        Ok(Some(skeleton))
    }
}
