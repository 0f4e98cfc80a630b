//! Common file header shared by the binary asset kinds.
//!
//! ```text
//! offset  size  field
//! 0       4     magic   ("CSF\0", "CMF\0", "CAF\0", "CRF\0")
//! 4       4     version (i32, 700 for every known file)
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cursor::BinaryCursor;
use crate::traits::ParseResult;

/// Format version written by every known exporter of the binary kinds
pub const BINARY_FORMAT_VERSION: i32 = 700;

/// Format version of the markup material variant
pub const MARKUP_FORMAT_VERSION: i32 = 900;

pub const SKELETON_MAGIC: &[u8; 4] = b"CSF\0";
pub const MESH_MAGIC: &[u8; 4] = b"CMF\0";
pub const ANIMATION_MAGIC: &[u8; 4] = b"CAF\0";
pub const MATERIAL_MAGIC: &[u8; 4] = b"CRF\0";

/// Magic attribute value of the markup material header tag
pub const MARKUP_MATERIAL_MAGIC: &str = "XRF";

/// The asset kinds a character is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Skeleton,
    Mesh,
    Animation,
    Material,
    MarkupMaterial,
}

impl AssetKind {
    /// Magic signature of the binary kinds
    pub fn magic(&self) -> Option<&'static [u8; 4]> {
        match self {
            AssetKind::Skeleton => Some(SKELETON_MAGIC),
            AssetKind::Mesh => Some(MESH_MAGIC),
            AssetKind::Animation => Some(ANIMATION_MAGIC),
            AssetKind::Material => Some(MATERIAL_MAGIC),
            AssetKind::MarkupMaterial => None,
        }
    }

    /// Guess the kind from a file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csf" => Some(AssetKind::Skeleton),
            "cmf" => Some(AssetKind::Mesh),
            "caf" => Some(AssetKind::Animation),
            "crf" => Some(AssetKind::Material),
            "xrf" => Some(AssetKind::MarkupMaterial),
            _ => None,
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AssetKind::Skeleton => "skeleton",
            AssetKind::Mesh => "mesh",
            AssetKind::Animation => "animation",
            AssetKind::Material => "material",
            AssetKind::MarkupMaterial => "markup material",
        };
        f.write_str(name)
    }
}

/// Identify a binary asset kind from its leading bytes
pub fn probe_kind(data: &[u8]) -> Option<AssetKind> {
    let magic = data.get(..4)?;
    [
        AssetKind::Skeleton,
        AssetKind::Mesh,
        AssetKind::Animation,
        AssetKind::Material,
    ]
    .into_iter()
    .find(|kind| kind.magic().is_some_and(|m| m.as_slice() == magic))
}

/// Read and check the common header.
///
/// Returns `Ok(None)` when the magic does not match `kind`. A version other
/// than [`BINARY_FORMAT_VERSION`] is logged and decoding carries on.
pub fn read_header(cursor: &mut BinaryCursor<'_>, kind: AssetKind) -> ParseResult<Option<i32>> {
    let Some(expected) = kind.magic() else {
        return Ok(None);
    };

    if cursor.remaining() < expected.len() {
        return Ok(None);
    }
    let magic = cursor.read_array::<4>()?;
    if &magic != expected {
        tracing::debug!(kind = %kind, found = ?magic, "Magic mismatch");
        return Ok(None);
    }

    let version = cursor.read_i32()?;
    if version != BINARY_FORMAT_VERSION {
        tracing::warn!(
            kind = %kind,
            version,
            expected = BINARY_FORMAT_VERSION,
            "Unexpected format version, assuming a compatible layout"
        );
    }

    Ok(Some(version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use calforge_core::Error;

    #[test]
    fn test_read_header_accepts_matching_magic() {
        let mut data = SKELETON_MAGIC.to_vec();
        data.extend_from_slice(&700i32.to_le_bytes());

        let mut cursor = BinaryCursor::new(&data);
        assert_eq!(read_header(&mut cursor, AssetKind::Skeleton).unwrap(), Some(700));
    }

    #[test]
    fn test_read_header_mismatch_is_none() {
        let mut data = MESH_MAGIC.to_vec();
        data.extend_from_slice(&700i32.to_le_bytes());

        let mut cursor = BinaryCursor::new(&data);
        assert_eq!(read_header(&mut cursor, AssetKind::Skeleton).unwrap(), None);
    }

    #[test]
    fn test_read_header_short_input_is_none() {
        let mut cursor = BinaryCursor::new(b"CS");
        assert_eq!(read_header(&mut cursor, AssetKind::Skeleton).unwrap(), None);
    }

    #[test]
    fn test_read_header_missing_version_is_truncation() {
        let mut cursor = BinaryCursor::new(ANIMATION_MAGIC);
        assert!(matches!(
            read_header(&mut cursor, AssetKind::Animation),
            Err(Error::UnexpectedEndOfData { .. })
        ));
    }

    #[test]
    fn test_probe_kind() {
        assert_eq!(probe_kind(b"CAF\0\xbc\x02\0\0"), Some(AssetKind::Animation));
        assert_eq!(probe_kind(b"CRF\0"), Some(AssetKind::Material));
        assert_eq!(probe_kind(b"<HEADER"), None);
        assert_eq!(probe_kind(b"CS"), None);
    }

    #[test]
    fn test_kind_from_path() {
        assert_eq!(AssetKind::from_path(Path::new("a/hero.CMF")), Some(AssetKind::Mesh));
        assert_eq!(AssetKind::from_path(Path::new("skin.xrf")), Some(AssetKind::MarkupMaterial));
        assert_eq!(AssetKind::from_path(Path::new("hero.cfg")), None);
    }
}
