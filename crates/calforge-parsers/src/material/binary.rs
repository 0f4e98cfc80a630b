//! Binary material (CRF) decoder
//!
//! ```text
//! header          magic "CRF\0", version i32
//! colors          ambient, diffuse, specular, reserved (4 x rgba u8)
//! shininess       f32
//! map count       i32
//! per map         length-prefixed file name (may carry trailing NULs)
//! ```

use crate::cursor::BinaryCursor;
use crate::header::{read_header, AssetKind, BINARY_FORMAT_VERSION, MATERIAL_MAGIC};
use crate::traits::{ParseOptions, ParseResult, Parser};

use super::Material;

/// Binary material decoder
#[derive(Debug, Default)]
pub struct MaterialParser;

impl MaterialParser {
    pub fn new() -> Self {
        Self
    }
}

impl Parser for MaterialParser {
    type Output = Material;

    fn extensions(&self) -> &[&str] {
        &["crf"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(MATERIAL_MAGIC)
    }

    fn name(&self) -> &str {
        "Material Parser"
    }

    fn supported_versions(&self) -> &[i32] {
        &[BINARY_FORMAT_VERSION]
    }

    fn parse_bytes(&self, data: &[u8], options: &ParseOptions) -> ParseResult<Option<Material>> {
        let mut cursor = BinaryCursor::new(data);
        if read_header(&mut cursor, AssetKind::Material)?.is_none() {
            return Ok(None);
        }

        let mut material = Material::new(options.name_or_default());
        material.ambient = cursor.read_color()?;
        material.diffuse = cursor.read_color()?;
        material.specular = cursor.read_color()?;
        // Fourth color record is not used by any known consumer
        let _reserved = cursor.read_color()?;
        material.shininess = cursor.read_f32()?;

        let map_count = cursor.read_count("map")?;
        material.maps.reserve(cursor.capacity_for(map_count, 4));
        for _ in 0..map_count {
            material.maps.push(cursor.read_c_string()?);
        }

        tracing::debug!(material = %material.name, maps = material.maps.len(), "Decoded material");
        Ok(Some(material))
    }
}
