//! Textured face records.
//!
//! A face is three or four corners, each a vertex index local to its slot
//! plus a UV pair, and a 2-bit material page. On disk every face is a fixed
//! 12-byte record:
//!
//! | Bytes | Description |
//! | :---: | ----------- |
//! | 0..8  | four `(u, v)` byte pairs; the fourth is zero for triangles |
//! | 8..12 | corner indices and material, packed little endian |
//!
//! ```text
//! ┌ unused
//! |  ┌ material
//! |  |  ┌ index 3 ┌ index 2 ┌ index 1 ┌ index 0
//! 00 mm 3333333  2222222  1111111  0000000
//! ```
//!
//! UVs quantize at 256 texels per unit with a half-texel inset,
//! `round(u * 256 - 0.5)` clamped to `0..=255`; decoding adds the half texel
//! back so values land on texel centers. Triangles swap their first two
//! corners in both directions, converting between the editor's winding and
//! the rasterizer's.

use crate::{errors::PakError, format::FACE_RECORD_BYTES};
use glam::Vec2;
use smallvec::SmallVec;

/// Texels per UV unit.
const UV_SCALE: f32 = 256.0;
const INDEX_MASK: u32 = 0x7F;

/// One corner of a face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    pub uv: Vec2,
    /// index into the owning slot's vertex array
    pub index: u8,
}

/// A triangle or quad with its 2-bit material page.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// three or four corners, in editor winding
    pub corners: SmallVec<[Corner; 4]>,
    pub material: u8,
}

impl Face {
    pub fn tri(corners: [Corner; 3], material: u8) -> Self {
        Self {
            corners: SmallVec::from_slice(&corners),
            material,
        }
    }

    pub fn quad(corners: [Corner; 4], material: u8) -> Self {
        Self {
            corners: SmallVec::from_buf(corners),
            material,
        }
    }

    pub fn is_quad(&self) -> bool {
        self.corners.len() == 4
    }
}

/// Encode a face into its fixed record, swapping triangle winding.
pub fn encode(face: &Face) -> Result<[u8; FACE_RECORD_BYTES], PakError> {
    let order: &[usize] = match face.corners.len() {
        3 => &[1, 0, 2],
        4 => &[0, 1, 2, 3],
        n => return Err(PakError::FaceArity(n)),
    };

    let mut rec = [0u8; FACE_RECORD_BYTES];
    let mut packed = ((face.material & 0x3) as u32) << 28;
    for (slot, &at) in order.iter().enumerate() {
        let corner = &face.corners[at];
        rec[slot * 2] = quantize_uv(corner.uv.x);
        rec[slot * 2 + 1] = quantize_uv(corner.uv.y);
        packed |= (corner.index as u32 & INDEX_MASK) << (7 * slot);
    }
    rec[8..12].copy_from_slice(&packed.to_le_bytes());

    Ok(rec)
}

/// Decode a three-corner record.
pub fn decode_tri(rec: &[u8; FACE_RECORD_BYTES]) -> Face {
    let mut face = decode_corners(rec, 3);
    // undo the winding swap from encode
    face.corners.swap(0, 1);
    face
}

/// Decode a four-corner record.
pub fn decode_quad(rec: &[u8; FACE_RECORD_BYTES]) -> Face {
    decode_corners(rec, 4)
}

fn decode_corners(rec: &[u8; FACE_RECORD_BYTES], n: usize) -> Face {
    let packed = u32::from_le_bytes([rec[8], rec[9], rec[10], rec[11]]);
    let corners = (0..n)
        .map(|slot| Corner {
            uv: Vec2::new(
                dequantize_uv(rec[slot * 2]),
                dequantize_uv(rec[slot * 2 + 1]),
            ),
            index: ((packed >> (7 * slot)) & INDEX_MASK) as u8,
        })
        .collect();

    Face {
        corners,
        material: ((packed >> 28) & 0x3) as u8,
    }
}

fn quantize_uv(v: f32) -> u8 {
    (v * UV_SCALE - 0.5).round().clamp(0.0, 255.0) as u8
}

fn dequantize_uv(b: u8) -> f32 {
    (b as f32 + 0.5) / UV_SCALE
}

#[cfg(test)]
mod test {
    use super::*;

    // texel centers survive quantization exactly
    fn center(b: u8) -> f32 {
        (b as f32 + 0.5) / UV_SCALE
    }

    fn corner(u: u8, v: u8, index: u8) -> Corner {
        Corner {
            uv: Vec2::new(center(u), center(v)),
            index,
        }
    }

    #[test]
    fn tri_swaps_its_first_two_corners_on_disk() {
        let face = Face::tri(
            [corner(0, 0, 3), corner(128, 0, 4), corner(0, 128, 5)],
            1,
        );
        let rec = encode(&face).unwrap();

        let packed = u32::from_le_bytes([rec[8], rec[9], rec[10], rec[11]]);
        // slot 0 holds the second editor corner
        assert_eq!(packed & 0x7F, 4);
        assert_eq!((packed >> 7) & 0x7F, 3);
        assert_eq!((packed >> 14) & 0x7F, 5);
        assert_eq!((packed >> 21) & 0x7F, 0);
        assert_eq!(packed >> 28, 1);
        assert_eq!(&rec[0..2], &[128, 0]);
        // the unused fourth uv pair stays zero
        assert_eq!(&rec[6..8], &[0, 0]);

        assert_eq!(decode_tri(&rec), face);
    }

    #[test]
    fn quad_preserves_corner_order() {
        let face = Face::quad(
            [
                corner(0, 0, 0),
                corner(255, 0, 1),
                corner(255, 255, 2),
                corner(0, 255, 3),
            ],
            2,
        );
        let rec = encode(&face).unwrap();
        assert_eq!(decode_quad(&rec), face);
    }

    #[test]
    fn uv_bytes_are_half_texel_inset() {
        assert_eq!(quantize_uv(0.0), 0);
        assert_eq!(quantize_uv(1.0), 255);
        assert_eq!(quantize_uv(0.5), 128);
        for b in [0u8, 1, 63, 200, 255] {
            assert_eq!(quantize_uv(dequantize_uv(b)), b);
        }
    }

    #[test]
    fn indices_and_material_mask_to_their_fields() {
        let face = Face::quad(
            [
                corner(0, 0, 200),
                corner(1, 0, 1),
                corner(1, 1, 2),
                corner(0, 1, 3),
            ],
            7,
        );
        let dec = decode_quad(&encode(&face).unwrap());
        assert_eq!(dec.corners[0].index, 200 & 0x7F);
        assert_eq!(dec.material, 3);
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let mut face = Face::quad(
            [
                corner(0, 0, 0),
                corner(1, 0, 1),
                corner(1, 1, 2),
                corner(0, 1, 3),
            ],
            0,
        );
        face.corners.push(corner(2, 2, 4));
        let res = encode(&face);
        assert!(matches!(res, Err(PakError::FaceArity(5))));
    }
}
