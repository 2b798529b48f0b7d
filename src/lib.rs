//! A Rust library for the segment-windowed compression and quantized mesh
//! records used in PSX-era scene archives.
//!
//! Compressed blocks pair a bitfield of flag bits with a payload of 16-bit
//! words, windowed over 8 KiB segments; [`BlockHeader`] and the
//! [`Decoder`] docs spell out the wire layout. Mesh geometry lives in
//! directory slots ([`MeshSlot`]) that point at arrays of packed vertices
//! and faces inside a fixed-capacity blob, which [`MeshPacker`] rewrites
//! in place.
//!
//! ## Quick Examples
//! ### Compressing and decompressing
//! ```
//! use segpak::{Decoder, Encoder};
//!
//! let scene: Vec<u8> = (0u16..512).flat_map(|w| (w % 37).to_le_bytes()).collect();
//! let block = Encoder::for_bytes(&scene).level(3).encode_to_vec()?;
//! assert_eq!(Decoder::for_bytes(&block).decode()?, scene);
//! # Ok::<(), segpak::PakError>(())
//! ```
//!
//! ### Repacking a mesh slot
//! ```
//! use segpak::{Mesh, MeshPacker, SlotLayout};
//! use glam::Vec3;
//!
//! let mut blob = vec![0u8; 4096];
//! let mut packer = MeshPacker::new(&mut blob, SlotLayout::Extended, 64);
//! let mesh = Mesh {
//!     verts: vec![Vec3::new(0.125, -0.0625, 0.0)],
//!     ..Mesh::default()
//! };
//! packer.repack(0, &mesh)?;
//! assert_eq!(packer.read_mesh(0)?.verts.len(), 1);
//! # Ok::<(), segpak::PakError>(())
//! ```
//!
//! The per-record codecs are exposed on their own in [`vertex`] and
//! [`face`] for tools that want to poke at raw arrays.

mod alloc;
mod bitfield;
mod decode;
mod encode;
mod errors;
pub mod face;
pub mod format;
mod mesh;
pub mod vertex;

pub use alloc::{Allocator, Span};
pub use bitfield::Bitfield;
pub use decode::{decompress, decompress_parts, Decoder};
pub use encode::{compress, compress_segment, Encoder, MatchSettings};
pub use errors::PakError;
pub use face::{Corner, Face};
pub use format::{
    BlockHeader, MeshSlot, SlotLayout, FACE_RECORD_BYTES, MAX_MATCH_BYTES, MIN_MATCH_BYTES,
    SEGMENT_BYTES, VERTEX_RECORD_BYTES,
};
pub use mesh::{Mesh, MeshPacker};
