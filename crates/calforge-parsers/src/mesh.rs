// calforge-parsers/src/mesh.rs
//! Mesh (CMF) decoder and geometry structures
//!
//! # Format Structure
//! ```text
//! header          magic "CMF\0", version i32
//! submesh count   i32
//! per submesh     material id, vertex count, triangle count,
//!                 lod steps, spring count, uv channel count   (6 x i32)
//!                 vertices   (see below)
//!                 springs    2 x i32 vertex ids, coefficient f32, rest length f32
//!                 triangles  triangle count x 3 x i32
//! per vertex      position 3 x f32, normal 3 x f32,
//!                 collapse id i32, face collapse count i32,
//!                 uv channel count x (u f32, v f32),
//!                 influence count i32, influence count x (bone id i32, weight f32),
//!                 spring weight f32   (only when spring count > 0)
//! ```

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use calforge_core::{Vec2, Vec3};

use crate::cursor::BinaryCursor;
use crate::header::{read_header, AssetKind, BINARY_FORMAT_VERSION, MESH_MAGIC};
use crate::traits::{ParseOptions, ParseResult, Parser};
use crate::transform::{convert_axes, convert_position, flip_v, flip_winding};

/// Smallest vertex record: position, normal, collapse pair, influence count
const MIN_VERTEX_RECORD: usize = 6 * 4 + 2 * 4 + 4;
const SPRING_RECORD: usize = 16;
const TRIANGLE_RECORD: usize = 12;

/// A decoded mesh file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    /// Mesh name (file stem when decoded from a file)
    pub name: String,
    /// Geometry partitions, one per material
    pub submeshes: Vec<Submesh>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            submeshes: Vec::new(),
        }
    }

    /// Total vertex count across all submeshes
    pub fn vertex_count(&self) -> usize {
        self.submeshes.iter().map(|s| s.vertices.len()).sum()
    }

    /// Total triangle count across all submeshes
    pub fn triangle_count(&self) -> usize {
        self.submeshes.iter().map(Submesh::triangle_count).sum()
    }

    /// Check if any vertex carries bone influences
    pub fn has_bone_weights(&self) -> bool {
        self.submeshes
            .iter()
            .flat_map(|s| &s.vertices)
            .any(|v| !v.influences.is_empty())
    }
}

/// Geometry partition sharing one material
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Submesh {
    /// Index into the owning character's material list
    pub material_id: i32,
    /// Level-of-detail step count (opaque)
    pub lod_steps: u32,
    /// Texture coordinate channels declared per vertex
    pub uv_channel_count: usize,
    pub vertices: Vec<Vertex>,
    pub springs: Vec<Spring>,
    /// Flat triangle list, stride 3, already in runtime winding order
    pub triangles: Vec<u32>,
}

impl Submesh {
    /// Get triangle count
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    /// Triangles as index triples
    pub fn triangle_iter(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.triangles.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }
}

/// A single vertex with all attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Position (scaled, converted)
    pub position: Vec3,
    /// Normal (converted, unscaled)
    pub normal: Vec3,
    /// LOD collapse target (opaque)
    pub collapse_id: i32,
    /// LOD face collapse count (opaque)
    pub face_collapse_count: i32,
    /// One coordinate per declared channel, V already flipped
    pub uvs: Vec<Vec2>,
    /// Bone influences in declaration order; not normalized
    pub influences: SmallVec<[BoneWeight; 4]>,
    /// Spring weight, present only when the submesh declares springs
    pub spring_weight: Option<f32>,
}

impl Vertex {
    /// Create a vertex with just position
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            normal: Vec3::ZERO,
            collapse_id: -1,
            face_collapse_count: 0,
            uvs: Vec::new(),
            influences: SmallVec::new(),
            spring_weight: None,
        }
    }

    /// Sum of the declared influence weights
    pub fn total_weight(&self) -> f32 {
        self.influences.iter().map(|w| w.weight).sum()
    }
}

/// One bone influence on a vertex
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoneWeight {
    pub bone_id: i32,
    pub weight: f32,
}

impl BoneWeight {
    pub const fn new(bone_id: i32, weight: f32) -> Self {
        Self { bone_id, weight }
    }
}

/// Spring constraint between two vertices of the same submesh
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spring {
    pub vertex_ids: [u32; 2],
    pub coefficient: f32,
    /// Rest length (scaled)
    pub rest_length: f32,
}

/// Counts read ahead of a submesh body
struct SubmeshHeader {
    material_id: i32,
    vertex_count: usize,
    triangle_count: usize,
    lod_steps: u32,
    spring_count: usize,
    uv_channel_count: usize,
}

/// Mesh file decoder
#[derive(Debug, Default)]
pub struct MeshParser;

impl MeshParser {
    /// Create a new mesh parser
    pub fn new() -> Self {
        Self
    }

    fn parse_submesh_header(&self, cursor: &mut BinaryCursor<'_>) -> ParseResult<SubmeshHeader> {
        Ok(SubmeshHeader {
            material_id: cursor.read_i32()?,
            vertex_count: cursor.read_count("vertex")?,
            triangle_count: cursor.read_count("triangle")?,
            lod_steps: cursor.read_index("lod step count")?,
            spring_count: cursor.read_count("spring")?,
            uv_channel_count: cursor.read_count("uv channel")?,
        })
    }

    fn parse_vertex(
        &self,
        cursor: &mut BinaryCursor<'_>,
        header: &SubmeshHeader,
        scale: f32,
    ) -> ParseResult<Vertex> {
        let position = convert_position(cursor.read_vec3()?, scale);
        let normal = convert_axes(cursor.read_vec3()?);
        let collapse_id = cursor.read_i32()?;
        let face_collapse_count = cursor.read_i32()?;

        let mut uvs = Vec::with_capacity(cursor.capacity_for(header.uv_channel_count, 8));
        for _ in 0..header.uv_channel_count {
            uvs.push(flip_v(cursor.read_vec2()?));
        }

        let influence_count = cursor.read_count("influence")?;
        let mut influences = SmallVec::with_capacity(cursor.capacity_for(influence_count, 8));
        for _ in 0..influence_count {
            let bone_id = cursor.read_i32()?;
            let weight = cursor.read_f32()?;
            influences.push(BoneWeight { bone_id, weight });
        }

        let spring_weight = if header.spring_count > 0 {
            Some(cursor.read_f32()?)
        } else {
            None
        };

        Ok(Vertex {
            position,
            normal,
            collapse_id,
            face_collapse_count,
            uvs,
            influences,
            spring_weight,
        })
    }

    fn parse_submesh(&self, cursor: &mut BinaryCursor<'_>, scale: f32) -> ParseResult<Submesh> {
        let header = self.parse_submesh_header(cursor)?;

        let mut vertices =
            Vec::with_capacity(cursor.capacity_for(header.vertex_count, MIN_VERTEX_RECORD));
        for _ in 0..header.vertex_count {
            vertices.push(self.parse_vertex(cursor, &header, scale)?);
        }

        let mut springs =
            Vec::with_capacity(cursor.capacity_for(header.spring_count, SPRING_RECORD));
        for _ in 0..header.spring_count {
            let vertex_ids = [
                cursor.read_index("spring vertex id")?,
                cursor.read_index("spring vertex id")?,
            ];
            let coefficient = cursor.read_f32()?;
            let rest_length = cursor.read_f32()? * scale;
            springs.push(Spring {
                vertex_ids,
                coefficient,
                rest_length,
            });
        }

        let mut triangles =
            Vec::with_capacity(cursor.capacity_for(header.triangle_count, TRIANGLE_RECORD) * 3);
        for _ in 0..header.triangle_count {
            let triangle = [
                cursor.read_index("triangle index")?,
                cursor.read_index("triangle index")?,
                cursor.read_index("triangle index")?,
            ];
            triangles.extend_from_slice(&flip_winding(triangle));
        }

        Ok(Submesh {
            material_id: header.material_id,
            lod_steps: header.lod_steps,
            uv_channel_count: header.uv_channel_count,
            vertices,
            springs,
            triangles,
        })
    }
}

impl Parser for MeshParser {
    type Output = Mesh;

    fn extensions(&self) -> &[&str] {
        &["cmf"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(MESH_MAGIC)
    }

    fn name(&self) -> &str {
        "Mesh Parser"
    }

    fn supported_versions(&self) -> &[i32] {
        &[BINARY_FORMAT_VERSION]
    }

    fn parse_bytes(&self, data: &[u8], options: &ParseOptions) -> ParseResult<Option<Mesh>> {
        let mut cursor = BinaryCursor::new(data);
        if read_header(&mut cursor, AssetKind::Mesh)?.is_none() {
            return Ok(None);
        }

        let submesh_count = cursor.read_count("submesh")?;
        let mut mesh = Mesh::new(options.name_or_default());
        mesh.submeshes.reserve(cursor.capacity_for(submesh_count, 24));

        for index in 0..submesh_count {
            let submesh = self
                .parse_submesh(&mut cursor, options.scale)
                .map_err(|e| e.with_context(format!("submesh {index}")))?;
            mesh.submeshes.push(submesh);
        }

        tracing::debug!(
            mesh = %mesh.name,
            submeshes = mesh.submeshes.len(),
            vertices = mesh.vertex_count(),
            "Decoded mesh"
        );
        Ok(Some(mesh))
    }
}
