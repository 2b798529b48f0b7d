//! Quantized vertex positions.
//!
//! The hardware stores a vertex as three signed 10-bit fields packed into a
//! 32-bit word, at 800 quantized units per world unit:
//!
//! ```text
//! ┌ unused
//! |┌ all fields halved; decode at 400 units per world unit
//! || ┌ z         ┌ y         ┌ x
//! 00 zzzzzzzzzz yyyyyyyyyy xxxxxxxxxx
//! ```
//!
//! A negative component `v` is stored as `0x200 | (512 + v)`, the low ten
//! bits of its two's complement. Models also sit rotated a half turn from
//! the editable mesh, so `y` and `z` flip sign on the way in and out.

use glam::Vec3;

/// Quantized units per world unit.
pub const SCALE: f32 = 800.0;

const FIELD_MASK: u32 = 0x3FF;
const SIGN_BIT: u32 = 0x200;
const HALVED_FLAG: u32 = 1 << 30;

/// A packed vertex word, plus whether packing had to clamp a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedVertex {
    pub word: u32,
    /// true when a component fell outside even the halved range
    pub saturated: bool,
}

/// Pack a world-space position into its vertex word.
///
/// A position whose quantized components overflow the signed 10-bit range
/// is halved across all three axes and marked with the halved flag; any
/// component still out of range saturates to the nearest field extreme and
/// is reported through [`EncodedVertex::saturated`].
#[inline]
pub fn encode(pos: Vec3) -> EncodedVertex {
    let quantized = [
        (pos.x * SCALE).round() as i32,
        (-pos.y * SCALE).round() as i32,
        (-pos.z * SCALE).round() as i32,
    ];

    let oversized = quantized.iter().any(|v| !(-512..=511).contains(v));
    let (quantized, flag) = if oversized {
        (quantized.map(|v| v.div_euclid(2)), HALVED_FLAG)
    } else {
        (quantized, 0)
    };

    let (x, sx) = encode_field(quantized[0]);
    let (y, sy) = encode_field(quantized[1]);
    let (z, sz) = encode_field(quantized[2]);

    EncodedVertex {
        word: x | y << 10 | z << 20 | flag,
        saturated: sx || sy || sz,
    }
}

/// Unpack a vertex word back to a world-space position.
#[inline]
pub fn decode(word: u32) -> Vec3 {
    let scale = if word & HALVED_FLAG != 0 {
        SCALE / 2.0
    } else {
        SCALE
    };
    let x = decode_field(word) as f32 / scale;
    let y = decode_field(word >> 10) as f32 / scale;
    let z = decode_field(word >> 20) as f32 / scale;

    Vec3::new(x, -y, -z)
}

/// One component to its 10-bit field, saturating at the extremes.
fn encode_field(v: i32) -> (u32, bool) {
    if v > 511 {
        (0x1FF, true)
    } else if v < -512 {
        (0x3FF, true)
    } else if v < 0 {
        (SIGN_BIT | (512 + v) as u32, false)
    } else {
        (v as u32, false)
    }
}

/// The signed value of the field in the low ten bits of `raw`.
fn decode_field(raw: u32) -> i32 {
    let field = raw & FIELD_MASK;
    if field & SIGN_BIT != 0 {
        field as i32 - 1024
    } else {
        field as i32
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn assert_close(a: Vec3, b: Vec3, tol: f32) {
        assert!((a - b).abs().max_element() <= tol, "{:?} != {:?}", a, b);
    }

    #[test]
    fn small_position_packs_to_known_word() {
        let enc = encode(Vec3::new(0.125, -0.0625, 0.0));
        assert_eq!(enc.word, 0x0000_C864);
        assert!(!enc.saturated);
    }

    #[test]
    fn negative_fields_use_offset_binary() {
        assert_eq!(encode_field(-300), (0x2D4, false));
        assert_eq!(decode_field(0x2D4), -300);
        assert_eq!(encode_field(511), (0x1FF, false));
        assert_eq!(encode_field(-512), (0x200, false));
        assert_eq!(decode_field(0x200), -512);
    }

    #[test]
    fn in_range_positions_roundtrip_within_half_a_step() {
        let step = 0.5 / SCALE;
        for pos in [
            Vec3::new(0.25, -0.125, 0.5),
            Vec3::new(-0.639, 0.173, -0.512),
            Vec3::new(0.0, 0.6387, -0.0001),
        ] {
            let enc = encode(pos);
            assert!(!enc.saturated);
            assert_close(decode(enc.word), pos, step + f32::EPSILON);
        }
    }

    #[test]
    fn oversized_positions_halve_and_flag() {
        let pos = Vec3::new(0.8, -0.1, 0.0);
        let enc = encode(pos);
        assert_eq!(enc.word, 0x4000_A140);
        assert!(!enc.saturated);
        // halved verts decode at the doubled step
        assert_close(decode(enc.word), pos, 1.0 / SCALE);
    }

    #[test]
    fn halving_rounds_toward_negative_infinity() {
        // x quantizes to -641, which must halve to -321, not -320
        let enc = encode(Vec3::new(-0.80125, 0.0, 0.0));
        assert_eq!(enc.word & FIELD_MASK, 0x200 | (512 - 321));
        assert!(!enc.saturated);
    }

    #[test]
    fn hopeless_positions_saturate() {
        let enc = encode(Vec3::new(2.0, 0.0, 0.0));
        assert!(enc.saturated);
        assert_ne!(enc.word & HALVED_FLAG, 0);
        assert_eq!(enc.word & FIELD_MASK, 0x1FF);

        let enc = encode(Vec3::new(-2.0, 0.0, 0.0));
        assert!(enc.saturated);
        assert_eq!(enc.word & FIELD_MASK, 0x3FF);
    }
}
