//! calforge Character Library
//!
//! Turns decoded asset records into a validated [`CharacterAsset`]:
//!
//! - [`CharacterAssembler`] checks every bone and material reference and
//!   composes the asset
//! - [`merge_mesh`] flattens a mesh into GPU-ready buffers with four UV
//!   channels and four bone-weight slots per vertex
//! - [`CharacterLoader`] decodes all files named by a manifest in parallel,
//!   then assembles them

pub mod assembler;
pub mod asset;
pub mod loader;
pub mod skin;

pub use assembler::CharacterAssembler;
pub use asset::CharacterAsset;
pub use loader::{CharacterLoader, FailurePolicy, LoadOptions};
pub use skin::{bind_poses, merge_mesh, MergedMesh, SubmeshRange, MAX_INFLUENCES, MAX_UV_CHANNELS};
