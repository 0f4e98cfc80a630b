// calforge-character/src/loader.rs
//! Manifest-driven loading: decode every listed file, then assemble

use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use calforge_core::{Error, Result};
use calforge_parsers::{
    parse_file_required, Animation, AnimationParser, Manifest, Material, MaterialEntry, Mesh,
    MeshParser, ParseOptions, Skeleton, SkeletonParser,
};

use crate::assembler::CharacterAssembler;
use crate::asset::CharacterAsset;

/// What to do when a single file fails to decode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Any failure aborts the whole load
    #[default]
    Abort,
    /// Failed meshes and animations are left out; a failed material is
    /// replaced by an empty one so material ids keep their meaning.
    /// A failed skeleton still aborts.
    SkipFailed,
}

/// Loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadOptions {
    pub policy: FailurePolicy,
    /// Decode files on the rayon thread pool
    pub parallel: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            policy: FailurePolicy::Abort,
            parallel: true,
        }
    }
}

/// One file to decode
enum Job<'a> {
    Skeleton(&'a Path),
    Mesh(&'a Path),
    Animation(&'a Path),
    Material(&'a MaterialEntry),
}

impl Job<'_> {
    fn path(&self) -> &Path {
        match self {
            Job::Skeleton(p) | Job::Mesh(p) | Job::Animation(p) => *p,
            Job::Material(entry) => entry.path.as_path(),
        }
    }

    fn decode(&self, options: &ParseOptions) -> Result<Decoded> {
        Ok(match self {
            Job::Skeleton(path) => {
                Decoded::Skeleton(parse_file_required(&SkeletonParser::new(), path, options)?)
            }
            Job::Mesh(path) => Decoded::Mesh(parse_file_required(&MeshParser::new(), path, options)?),
            Job::Animation(path) => {
                Decoded::Animation(parse_file_required(&AnimationParser::new(), path, options)?)
            }
            Job::Material(entry) => {
                let material = entry.source.parse_file(&entry.path, options)?.ok_or_else(|| {
                    Error::FormatMismatch {
                        path: entry.path.clone(),
                        expected: entry.source.parser_name().to_string(),
                    }
                })?;
                Decoded::Material(material)
            }
        })
    }
}

enum Decoded {
    Skeleton(Skeleton),
    Mesh(Mesh),
    Animation(Animation),
    Material(Material),
}

/// Loads a character described by a [`Manifest`]
#[derive(Debug, Clone, Default)]
pub struct CharacterLoader {
    options: LoadOptions,
}

impl CharacterLoader {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    /// Read a manifest file and load the character it describes; the
    /// character is named after the manifest file stem
    pub fn load_path(&self, manifest_path: &Path) -> Result<CharacterAsset> {
        let manifest = Manifest::load(manifest_path)?;
        let name = manifest_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| default_name(&manifest));
        self.load_named(&manifest, name)
    }

    /// Decode every file the manifest names and assemble the result
    pub fn load(&self, manifest: &Manifest) -> Result<CharacterAsset> {
        self.load_named(manifest, default_name(manifest))
    }

    /// Like [`load`](Self::load) with an explicit character name
    pub fn load_named(&self, manifest: &Manifest, name: impl Into<String>) -> Result<CharacterAsset> {
        let parse_options = ParseOptions::with_scale(manifest.scale);

        let mut jobs = Vec::with_capacity(manifest.file_count());
        jobs.extend(manifest.skeleton.as_deref().map(Job::Skeleton));
        jobs.extend(manifest.meshes.iter().map(|p| Job::Mesh(p)));
        jobs.extend(manifest.animations.iter().map(|p| Job::Animation(p)));
        jobs.extend(manifest.materials.iter().map(Job::Material));

        let start = std::time::Instant::now();
        // Join barrier: every decode finishes before assembly starts
        let results: Vec<Result<Decoded>> = if self.options.parallel {
            jobs.par_iter().map(|job| job.decode(&parse_options)).collect()
        } else {
            jobs.iter().map(|job| job.decode(&parse_options)).collect()
        };
        tracing::debug!(
            files = jobs.len(),
            duration_ms = %start.elapsed().as_millis(),
            "Decoded character files"
        );

        let mut assembler = CharacterAssembler::new(name)
            .scale(manifest.scale)
            .source_dir(manifest.base_dir.clone());
        let mut skipped = 0usize;

        for (job, result) in jobs.iter().zip(results) {
            let decoded = match result {
                Ok(decoded) => decoded,
                Err(e) => {
                    let skippable = !matches!(job, Job::Skeleton(_));
                    if self.options.policy == FailurePolicy::Abort || !skippable {
                        return Err(e);
                    }
                    tracing::warn!(
                        path = %job.path().display(),
                        error = %e,
                        "Skipping file that failed to decode"
                    );
                    skipped += 1;
                    if let Job::Material(entry) = job {
                        assembler = assembler.material(placeholder_material(&entry.path));
                    }
                    continue;
                }
            };

            assembler = match decoded {
                Decoded::Skeleton(skeleton) => assembler.skeleton(skeleton),
                Decoded::Mesh(mesh) => assembler.mesh(mesh),
                Decoded::Animation(animation) => assembler.animation(animation),
                Decoded::Material(material) => assembler.material(material),
            };
        }

        let asset = assembler.assemble()?;
        tracing::info!(
            character = %asset.name,
            bones = asset.bone_count(),
            meshes = asset.meshes.len(),
            animations = asset.animations.len(),
            materials = asset.materials.len(),
            skipped,
            "Loaded character"
        );
        Ok(asset)
    }
}

/// Skeleton file stem, else first mesh stem, else "character"
fn default_name(manifest: &Manifest) -> String {
    manifest
        .skeleton
        .as_deref()
        .or_else(|| manifest.meshes.first().map(|p| p.as_path()))
        .and_then(Path::file_stem)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "character".to_string())
}

fn placeholder_material(path: &Path) -> Material {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Material::new(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_name() {
        let mut manifest = Manifest::default();
        assert_eq!(default_name(&manifest), "character");

        manifest.meshes.push(PathBuf::from("a/body.cmf"));
        assert_eq!(default_name(&manifest), "body");

        manifest.skeleton = Some(PathBuf::from("a/hero.csf"));
        assert_eq!(default_name(&manifest), "hero");
    }

    #[test]
    fn test_load_options_default() {
        let options = LoadOptions::default();
        assert_eq!(options.policy, FailurePolicy::Abort);
        assert!(options.parallel);
    }

    #[test]
    fn test_missing_file_aborts() {
        let manifest = Manifest::parse("mesh = does-not-exist.cmf", Path::new("/nonexistent")).unwrap();
        let err = CharacterLoader::default().load(&manifest).unwrap_err();
        assert!(matches!(err.root_cause(), Error::Io(_)));
    }
}
