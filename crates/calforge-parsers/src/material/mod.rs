//! Material records and their two on-disk sources
//!
//! Both decoders produce the same [`Material`] value; which one applies is
//! decided by file extension alone (see [`MaterialSource::for_path`]).

mod binary;
mod markup;

pub use binary::MaterialParser;
pub use markup::MarkupMaterialParser;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use calforge_core::Color;

use crate::traits::{ParseOptions, ParseResult, Parser};

/// Surface description shared by the binary and markup sources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    pub shininess: f32,
    /// Texture file names in declaration order
    pub maps: Vec<String>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Texture file names resolved against `base_dir`; absolute names are kept as is
    pub fn texture_paths(&self, base_dir: &Path) -> Vec<PathBuf> {
        self.maps
            .iter()
            .filter(|m| !m.is_empty())
            .map(|m| base_dir.join(m))
            .collect()
    }
}

/// Which decoder reads a given material file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialSource {
    /// `CRF\0` binary layout
    Binary,
    /// Tag-based text layout (`.xrf`)
    Markup,
}

impl MaterialSource {
    /// `.xrf` (any case) selects the markup decoder, everything else the binary one
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xrf") => MaterialSource::Markup,
            _ => MaterialSource::Binary,
        }
    }

    /// Decode a material file with the decoder this source names
    pub fn parse_file(&self, path: &Path, options: &ParseOptions) -> ParseResult<Option<Material>> {
        match self {
            MaterialSource::Binary => MaterialParser::new().parse_file(path, options),
            MaterialSource::Markup => MarkupMaterialParser::new().parse_file(path, options),
        }
    }

    /// Display name of the selected decoder
    pub fn parser_name(&self) -> &'static str {
        match self {
            MaterialSource::Binary => "Material Parser",
            MaterialSource::Markup => "Markup Material Parser",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_by_extension() {
        assert_eq!(MaterialSource::for_path(Path::new("foo.xrf")), MaterialSource::Markup);
        assert_eq!(MaterialSource::for_path(Path::new("FOO.XRF")), MaterialSource::Markup);
        assert_eq!(MaterialSource::for_path(Path::new("bar.crf")), MaterialSource::Binary);
        assert_eq!(MaterialSource::for_path(Path::new("noext")), MaterialSource::Binary);
    }

    #[test]
    fn test_texture_paths() {
        let material = Material {
            maps: vec!["skin.tga".into(), String::new(), "eyes.png".into()],
            ..Material::new("body")
        };
        let paths = material.texture_paths(Path::new("data/hero"));
        assert_eq!(
            paths,
            vec![PathBuf::from("data/hero/skin.tga"), PathBuf::from("data/hero/eyes.png")]
        );
    }
}
