// calforge-parsers/src/manifest.rs
//! Character manifest reader
//!
//! A manifest names the files a character is built from:
//!
//! ```text
//! # hero character
//! scale = 0.01
//! skeleton = hero.csf
//! mesh = body.cmf
//! mesh = head.cmf
//! animation = walk.caf
//! material = skin.xrf
//! material = eyes.crf
//! ```
//!
//! `:` is accepted as a separator on lines without `=`. Relative paths
//! resolve against the manifest directory, or against `path` when given.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use calforge_core::{Error, Result};

use crate::material::MaterialSource;

/// Parsed character manifest with resolved file paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Factor applied to every decoded position
    pub scale: f32,
    /// Directory the file entries were resolved against
    pub base_dir: PathBuf,
    pub skeleton: Option<PathBuf>,
    pub meshes: Vec<PathBuf>,
    pub animations: Vec<PathBuf>,
    pub materials: Vec<MaterialEntry>,
}

/// A material file plus the decoder selected for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialEntry {
    pub path: PathBuf,
    pub source: MaterialSource,
}

impl MaterialEntry {
    pub fn new(path: PathBuf) -> Self {
        let source = MaterialSource::for_path(&path);
        Self { path, source }
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            scale: 1.0,
            base_dir: PathBuf::new(),
            skeleton: None,
            meshes: Vec::new(),
            animations: Vec::new(),
            materials: Vec::new(),
        }
    }
}

/// Raw entry kept until `path` is known
enum Entry {
    Skeleton(String),
    Mesh(String),
    Animation(String),
    Material(String),
}

impl Manifest {
    /// Read and parse a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::from(e).with_context(format!("reading manifest {}", path.display())))?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::parse(&text, &base_dir)
    }

    /// Parse manifest text; relative entries resolve against `base_dir`
    pub fn parse(text: &str, base_dir: &Path) -> Result<Self> {
        let mut manifest = Manifest {
            base_dir: base_dir.to_path_buf(),
            ..Manifest::default()
        };
        let mut entries = Vec::new();
        let mut skeleton_line = None;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }

            let (key, value) = split_entry(line).ok_or_else(|| Error::InvalidManifest {
                line: line_no,
                message: format!("expected `key = value`, found `{line}`"),
            })?;
            if value.is_empty() {
                return Err(Error::InvalidManifest {
                    line: line_no,
                    message: format!("missing value for `{key}`"),
                });
            }

            match key.to_ascii_lowercase().as_str() {
                "scale" => {
                    manifest.scale = value.parse::<f32>().ok().filter(|s| s.is_finite()).ok_or_else(|| {
                        Error::InvalidManifest {
                            line: line_no,
                            message: format!("invalid scale `{value}`"),
                        }
                    })?;
                }
                "path" => manifest.base_dir = base_dir.join(value),
                "skeleton" => {
                    if let Some(first) = skeleton_line {
                        return Err(Error::InvalidManifest {
                            line: line_no,
                            message: format!("second skeleton entry (first on line {first})"),
                        });
                    }
                    skeleton_line = Some(line_no);
                    entries.push(Entry::Skeleton(value.to_string()));
                }
                "mesh" => entries.push(Entry::Mesh(value.to_string())),
                "animation" => entries.push(Entry::Animation(value.to_string())),
                "material" => entries.push(Entry::Material(value.to_string())),
                _ => tracing::warn!(line = line_no, key, "Unknown manifest key, ignoring"),
            }
        }

        for entry in entries {
            match entry {
                Entry::Skeleton(p) => manifest.skeleton = Some(manifest.resolve(&p)),
                Entry::Mesh(p) => manifest.meshes.push(manifest.resolve(&p)),
                Entry::Animation(p) => manifest.animations.push(manifest.resolve(&p)),
                Entry::Material(p) => manifest.materials.push(MaterialEntry::new(manifest.resolve(&p))),
            }
        }

        tracing::debug!(
            scale = manifest.scale,
            meshes = manifest.meshes.len(),
            animations = manifest.animations.len(),
            materials = manifest.materials.len(),
            "Parsed manifest"
        );
        Ok(manifest)
    }

    /// Resolve a file entry against the base directory
    pub fn resolve(&self, entry: &str) -> PathBuf {
        self.base_dir.join(entry)
    }

    /// Total number of files the manifest names
    pub fn file_count(&self) -> usize {
        usize::from(self.skeleton.is_some())
            + self.meshes.len()
            + self.animations.len()
            + self.materials.len()
    }
}

/// `#` opens a comment at line start or after whitespace only
fn strip_comment(line: &str) -> &str {
    let mut prev_blank = true;
    for (pos, c) in line.char_indices() {
        if c == '#' && prev_blank {
            return &line[..pos];
        }
        prev_blank = c.is_whitespace();
    }
    line
}

fn split_entry(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=').or_else(|| line.split_once(':'))?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some((key, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let text = "\
# hero
scale = 2.5
skeleton = hero.csf
mesh = body.cmf   # main body
mesh = head.cmf
animation = walk.caf
material = skin.xrf
material = eyes.crf
";
        let manifest = Manifest::parse(text, Path::new("assets")).unwrap();
        assert_eq!(manifest.scale, 2.5);
        assert_eq!(manifest.skeleton, Some(PathBuf::from("assets/hero.csf")));
        assert_eq!(
            manifest.meshes,
            vec![PathBuf::from("assets/body.cmf"), PathBuf::from("assets/head.cmf")]
        );
        assert_eq!(manifest.animations, vec![PathBuf::from("assets/walk.caf")]);
        assert_eq!(manifest.materials[0].source, MaterialSource::Markup);
        assert_eq!(manifest.materials[1].source, MaterialSource::Binary);
        assert_eq!(manifest.file_count(), 6);
    }

    #[test]
    fn test_colon_separator_and_path_override() {
        let text = "material: foo.xrf\npath = sub\nmaterial: bar.crf\n";
        let manifest = Manifest::parse(text, Path::new("root")).unwrap();
        assert_eq!(manifest.base_dir, PathBuf::from("root/sub"));
        assert_eq!(
            manifest.materials,
            vec![
                MaterialEntry {
                    path: PathBuf::from("root/sub/foo.xrf"),
                    source: MaterialSource::Markup
                },
                MaterialEntry {
                    path: PathBuf::from("root/sub/bar.crf"),
                    source: MaterialSource::Binary
                },
            ]
        );
    }

    #[test]
    fn test_unknown_key_is_ignored() {
        let manifest = Manifest::parse("lod = 3\nmesh = a.cmf", Path::new("")).unwrap();
        assert_eq!(manifest.meshes.len(), 1);
        assert_eq!(manifest.scale, 1.0);
    }

    #[test]
    fn test_malformed_lines() {
        let err = Manifest::parse("mesh a.cmf", Path::new("")).unwrap_err();
        assert!(matches!(err, Error::InvalidManifest { line: 1, .. }));

        let err = Manifest::parse("\n\nscale = big", Path::new("")).unwrap_err();
        assert!(matches!(err, Error::InvalidManifest { line: 3, .. }));

        let err = Manifest::parse("mesh =", Path::new("")).unwrap_err();
        assert!(matches!(err, Error::InvalidManifest { line: 1, .. }));
    }

    #[test]
    fn test_hash_inside_value_is_kept() {
        let text = "  # indented comment\nmesh = body#2.cmf # lod 2\nmaterial = skin.xrf\t# tab comment";
        let manifest = Manifest::parse(text, Path::new("")).unwrap();
        assert_eq!(manifest.meshes, vec![PathBuf::from("body#2.cmf")]);
        assert_eq!(manifest.materials[0].path, PathBuf::from("skin.xrf"));
    }

    #[test]
    fn test_duplicate_skeleton() {
        let err = Manifest::parse("skeleton = a.csf\nskeleton = b.csf", Path::new("")).unwrap_err();
        assert!(matches!(err, Error::InvalidManifest { line: 2, .. }));
    }
}
