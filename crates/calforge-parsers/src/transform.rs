//! Coordinate conversion between the on-disk convention (right-handed,
//! Z up) and the runtime convention (left-handed, Y up, Z forward).
//!
//! All functions are pure. Positions are scaled first, then converted;
//! normals and rotations are only converted.

use calforge_core::{Quat, Vec2, Vec3};

/// Multiply a position by the caller-supplied scale factor
pub fn scale_position(v: Vec3, scale: f32) -> Vec3 {
    v.scaled(scale)
}

/// `(x, y, z) -> (x, z, -y)`
pub fn convert_axes(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.z, -v.y)
}

/// Axis-convert the vector part and negate the scalar part
pub fn convert_rotation(q: Quat) -> Quat {
    Quat::from_vector_scalar(convert_axes(q.xyz()), -q.w)
}

/// Texture origin moves from bottom-left to top-left
pub fn flip_v(uv: Vec2) -> Vec2 {
    Vec2::new(uv.x, -uv.y)
}

/// Swap the last two corners so front faces survive the handedness flip
pub fn flip_winding(triangle: [u32; 3]) -> [u32; 3] {
    [triangle[0], triangle[2], triangle[1]]
}

/// Scale then axis-convert; the full treatment for any position field
pub fn convert_position(v: Vec3, scale: f32) -> Vec3 {
    convert_axes(scale_position(v, scale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_scaled_position_scenario() {
        assert_eq!(
            convert_position(Vec3::new(1.0, 2.0, 3.0), 2.0),
            Vec3::new(2.0, 6.0, -4.0)
        );
    }

    #[test]
    fn test_convert_axes_twice_is_not_identity() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        let twice = convert_axes(convert_axes(v));
        assert_ne!(twice, v);
        assert_eq!(twice, Vec3::new(1.0, -2.0, -3.0));
    }

    #[test]
    fn test_flip_winding() {
        assert_eq!(flip_winding([0, 1, 2]), [0, 2, 1]);
    }

    #[test]
    fn test_flip_v() {
        assert_eq!(flip_v(Vec2::new(0.25, 0.75)), Vec2::new(0.25, -0.75));
    }

    proptest! {
        #[test]
        fn prop_convert_axes_formula(x in -1e6f32..1e6, y in -1e6f32..1e6, z in -1e6f32..1e6) {
            let c = convert_axes(Vec3::new(x, y, z));
            prop_assert_eq!(c, Vec3::new(x, z, -y));
            let twice = convert_axes(c);
            prop_assert_eq!(twice, Vec3::new(x, -y, -z));
        }

        #[test]
        fn prop_convert_rotation(x in -1f32..1.0, y in -1f32..1.0, z in -1f32..1.0, w in -1f32..1.0) {
            let q = Quat::new(x, y, z, w);
            let c = convert_rotation(q);
            prop_assert_eq!(c.w, -q.w);
            prop_assert_eq!(c.xyz(), convert_axes(q.xyz()));
        }

        #[test]
        fn prop_flip_winding(i0 in any::<u32>(), i1 in any::<u32>(), i2 in any::<u32>()) {
            prop_assert_eq!(flip_winding([i0, i1, i2]), [i0, i2, i1]);
        }
    }
}
