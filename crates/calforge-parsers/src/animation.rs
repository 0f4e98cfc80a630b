// calforge-parsers/src/animation.rs
//! Animation (CAF) decoder
//!
//! ```text
//! header          magic "CAF\0", version i32
//! duration        f32 (seconds)
//! track count     i32
//! per track       bone id i32, keyframe count i32
//! per keyframe    time f32, translation 3 x f32, rotation 4 x f32
//! ```

use serde::{Deserialize, Serialize};

use calforge_core::{Quat, Vec3};

use crate::cursor::BinaryCursor;
use crate::header::{read_header, AssetKind, ANIMATION_MAGIC, BINARY_FORMAT_VERSION};
use crate::traits::{ParseOptions, ParseResult, Parser};
use crate::transform::{convert_position, convert_rotation};

const KEYFRAME_RECORD: usize = 8 * 4;
const TRACK_HEADER: usize = 8;

/// A decoded animation clip
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    pub name: String,
    /// Clip length in seconds
    pub duration: f32,
    pub tracks: Vec<AnimationTrack>,
}

impl Animation {
    /// First track driving the given bone
    pub fn track_for_bone(&self, bone_id: i32) -> Option<&AnimationTrack> {
        self.tracks.iter().find(|t| t.bone_id == bone_id)
    }

    /// Total number of keyframes across all tracks
    pub fn keyframe_count(&self) -> usize {
        self.tracks.iter().map(|t| t.keyframes.len()).sum()
    }
}

/// Keyframes for one bone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimationTrack {
    /// Bone driven by this track; resolved against the skeleton at assembly
    pub bone_id: i32,
    /// Keyframes in file order. Times are not checked here.
    pub keyframes: Vec<Keyframe>,
}

impl AnimationTrack {
    /// Whether keyframe times strictly increase
    pub fn is_time_ordered(&self) -> bool {
        self.keyframes.windows(2).all(|w| w[0].time < w[1].time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f32,
    pub translation: Vec3,
    pub rotation: Quat,
}

/// Animation file decoder
#[derive(Debug, Default)]
pub struct AnimationParser;

impl AnimationParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_track(&self, cursor: &mut BinaryCursor<'_>, scale: f32) -> ParseResult<AnimationTrack> {
        let bone_id = cursor.read_i32()?;
        let keyframe_count = cursor.read_count("keyframe")?;

        let mut keyframes = Vec::with_capacity(cursor.capacity_for(keyframe_count, KEYFRAME_RECORD));
        for _ in 0..keyframe_count {
            let time = cursor.read_f32()?;
            let translation = convert_position(cursor.read_vec3()?, scale);
            let rotation = convert_rotation(cursor.read_quat()?);
            keyframes.push(Keyframe {
                time,
                translation,
                rotation,
            });
        }

        Ok(AnimationTrack { bone_id, keyframes })
    }
}

impl Parser for AnimationParser {
    type Output = Animation;

    fn extensions(&self) -> &[&str] {
        &["caf"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(ANIMATION_MAGIC)
    }

    fn name(&self) -> &str {
        "Animation Parser"
    }

    fn supported_versions(&self) -> &[i32] {
        &[BINARY_FORMAT_VERSION]
    }

    fn parse_bytes(&self, data: &[u8], options: &ParseOptions) -> ParseResult<Option<Animation>> {
        let mut cursor = BinaryCursor::new(data);
        if read_header(&mut cursor, AssetKind::Animation)?.is_none() {
            return Ok(None);
        }

        let duration = cursor.read_f32()?;
        let track_count = cursor.read_count("track")?;

        let mut tracks = Vec::with_capacity(cursor.capacity_for(track_count, TRACK_HEADER));
        for index in 0..track_count {
            let track = self
                .parse_track(&mut cursor, options.scale)
                .map_err(|e| e.with_context(format!("track {index}")))?;
            tracks.push(track);
        }

        let animation = Animation {
            name: options.name_or_default(),
            duration,
            tracks,
        };
        tracing::debug!(
            animation = %animation.name,
            duration = animation.duration,
            tracks = animation.tracks.len(),
            "Decoded animation"
        );
        Ok(Some(animation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyframe(time: f32) -> Keyframe {
        Keyframe {
            time,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    #[test]
    fn test_time_ordering() {
        let ordered = AnimationTrack {
            bone_id: 0,
            keyframes: vec![keyframe(0.0), keyframe(0.5), keyframe(1.0)],
        };
        assert!(ordered.is_time_ordered());

        let repeated = AnimationTrack {
            bone_id: 0,
            keyframes: vec![keyframe(0.0), keyframe(0.5), keyframe(0.5)],
        };
        assert!(!repeated.is_time_ordered());

        assert!(AnimationTrack::default().is_time_ordered());
    }

    #[test]
    fn test_track_for_bone() {
        let animation = Animation {
            name: "walk".into(),
            duration: 1.0,
            tracks: vec![
                AnimationTrack { bone_id: 3, keyframes: vec![keyframe(0.0)] },
                AnimationTrack { bone_id: 1, keyframes: vec![keyframe(0.0), keyframe(1.0)] },
            ],
        };
        assert_eq!(animation.track_for_bone(1).map(|t| t.keyframes.len()), Some(2));
        assert!(animation.track_for_bone(2).is_none());
        assert_eq!(animation.keyframe_count(), 3);
    }

    #[test]
    fn test_decode_converts_keyframes() {
        let mut data = ANIMATION_MAGIC.to_vec();
        data.extend_from_slice(&700i32.to_le_bytes());
        data.extend_from_slice(&2.0f32.to_le_bytes());
        data.extend_from_slice(&1i32.to_le_bytes());
        data.extend_from_slice(&4i32.to_le_bytes());
        data.extend_from_slice(&1i32.to_le_bytes());
        for f in [0.25f32, 1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 1.0] {
            data.extend_from_slice(&f.to_le_bytes());
        }

        let animation = AnimationParser
            .parse_bytes(&data, &ParseOptions::with_scale(2.0).named("idle"))
            .unwrap()
            .unwrap();
        assert_eq!(animation.name, "idle");
        assert_eq!(animation.duration, 2.0);
        let key = animation.tracks[0].keyframes[0];
        assert_eq!(animation.tracks[0].bone_id, 4);
        assert_eq!(key.time, 0.25);
        assert_eq!(key.translation, Vec3::new(2.0, 6.0, -4.0));
        assert_eq!(key.rotation, Quat::new(0.0, 0.0, -0.0, -1.0));
    }
}
