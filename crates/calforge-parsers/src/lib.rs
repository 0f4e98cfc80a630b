//! calforge Parsers Library
//!
//! Decoders for the character asset family.
//!
//! # Supported Formats
//!
//! | Format | Extension | Magic | Description |
//! |--------|-----------|-------|-------------|
//! | Skeleton | .csf | `CSF\0` | Bone hierarchy with local and bind transforms |
//! | Mesh | .cmf | `CMF\0` | Submeshes with skinned vertices, springs and triangles |
//! | Animation | .caf | `CAF\0` | Per-bone keyframe tracks |
//! | Material | .crf | `CRF\0` | Colors, shininess and texture names |
//! | Markup material | .xrf | `<HEADER MAGIC="XRF">` | Same material record as tagged text |
//! | Manifest | any | none | `key = value` list of the files above |
//!
//! Every decoder converts geometry from the native right-handed convention
//! into the runtime's left-handed, Y-up convention (see [`transform`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use calforge_parsers::{ParseOptions, Parser, SkeletonParser};
//!
//! let parser = SkeletonParser::new();
//! let skeleton = parser.parse_file(path, &ParseOptions::with_scale(0.01))?;
//! ```

pub mod animation;
pub mod cursor;
pub mod header;
pub mod logging;
pub mod manifest;
pub mod material;
pub mod mesh;
mod readable;
pub mod skeleton;
pub mod traits;
pub mod transform;

pub use animation::{Animation, AnimationParser, AnimationTrack, Keyframe};
pub use cursor::BinaryCursor;
pub use header::{probe_kind, AssetKind};
pub use manifest::{Manifest, MaterialEntry};
pub use material::{MarkupMaterialParser, Material, MaterialParser, MaterialSource};
pub use mesh::{BoneWeight, Mesh, MeshParser, Spring, Submesh, Vertex};
pub use skeleton::{Bone, Skeleton, SkeletonParser};
pub use traits::{parse_file_required, HumanReadable, ParseOptions, ParseResult, Parser};
