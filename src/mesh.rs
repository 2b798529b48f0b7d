//! Rewrites mesh slots inside a fixed-capacity blob.
//!
//! A scene blob carries a directory of fixed-stride [`MeshSlot`]s followed
//! by a heap of vertex and face arrays. Replacing one mesh means releasing
//! the arrays its slot points at, encoding the new geometry, and placing
//! the result wherever the [`Allocator`] finds room, growing the content
//! tail only when no hole fits. Released bytes are zeroed on the way out so
//! [`check_cleared`](MeshPacker::check_cleared) can vouch for the blob
//! afterwards.

use crate::{
    alloc::{Allocator, Span},
    errors::PakError,
    face::{self, Face},
    format::{MeshSlot, SlotLayout, FACE_RECORD_BYTES, VERTEX_RECORD_BYTES},
    vertex,
};
use glam::Vec3;
use log::{debug, warn};

/// Editable geometry for one mesh slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub verts: Vec<Vec3>,
    /// three-corner faces, in editor winding
    pub tris: Vec<Face>,
    /// four-corner faces
    pub quads: Vec<Face>,
}

/// Rewrites mesh slots inside an exclusively borrowed blob.
///
/// ```
/// # use segpak::{Mesh, MeshPacker, SlotLayout};
/// # use glam::Vec3;
/// let mut blob = vec![0u8; 4096];
/// let mut packer = MeshPacker::new(&mut blob, SlotLayout::Compact, 64);
/// let mesh = Mesh {
///     verts: vec![Vec3::new(0.1, 0.2, 0.3)],
///     ..Mesh::default()
/// };
/// let verts = packer.repack(0, &mesh)?;
/// assert_eq!(verts, 1);
/// # Ok::<(), segpak::PakError>(())
/// ```
pub struct MeshPacker<'a> {
    blob: &'a mut [u8],
    layout: SlotLayout,
    alloc: Allocator,
}

impl<'a> MeshPacker<'a> {
    /// A packer over `blob`, whose live content currently ends at
    /// `content_end`.
    pub fn new(blob: &'a mut [u8], layout: SlotLayout, content_end: usize) -> Self {
        Self {
            blob,
            layout,
            alloc: Allocator::new(content_end),
        }
    }

    /// First byte past all live data in the blob.
    pub fn content_end(&self) -> usize {
        self.alloc.content_end()
    }

    /// The free-space accounting behind this packer.
    pub fn allocator(&self) -> &Allocator {
        &self.alloc
    }

    /// Verify every released byte and the tail past the content end is zero.
    pub fn check_cleared(&self) -> Result<(), PakError> {
        self.alloc.check_cleared(self.blob)
    }

    /// Replace the geometry a slot points at with `mesh`, returning the new
    /// vertex count.
    ///
    /// The slot's old arrays are zeroed and released first, so their bytes
    /// are immediately reusable for the incoming geometry. Offsets written
    /// to the header are absolute; an empty array stores offset zero. The
    /// counts must fit the one-byte header fields, and every placed array
    /// must land inside the blob's capacity.
    pub fn repack(&mut self, slot_ofs: usize, mesh: &Mesh) -> Result<u8, PakError> {
        let tri_count = count_field("triangle", mesh.tris.len())?;
        let quad_count = count_field("quad", mesh.quads.len())?;
        let vert_count = count_field("vertex", mesh.verts.len())?;

        let tris = encode_faces(&mesh.tris, 3)?;
        let quads = encode_faces(&mesh.quads, 4)?;
        let (verts, saturated) = encode_verts(&mesh.verts);
        if saturated > 0 {
            warn!(
                "slot {:#x}: {} of {} vertices saturated the 10-bit range",
                slot_ofs,
                saturated,
                mesh.verts.len()
            );
        }

        let mut slot = MeshSlot::read(self.blob, slot_ofs, self.layout)?;
        self.release_slot_arrays(&slot)?;

        slot.tri_count = tri_count;
        slot.quad_count = quad_count;
        slot.vert_count = vert_count;
        slot.tri_ofs = self.place(&tris)?.try_into()?;
        slot.quad_ofs = self.place(&quads)?.try_into()?;
        slot.vert_ofs = self.place(&verts)?.try_into()?;
        slot.write(self.blob, slot_ofs)?;

        debug!(
            "slot {:#x}: repacked {} tris, {} quads, {} verts ({})",
            slot_ofs, tri_count, quad_count, vert_count, self.layout
        );

        Ok(vert_count)
    }

    /// Release the arrays a slot points at and zero its counts and offsets.
    /// The reserved byte and any extra offsets stay as they were.
    pub fn clear_slot(&mut self, slot_ofs: usize) -> Result<(), PakError> {
        let mut slot = MeshSlot::read(self.blob, slot_ofs, self.layout)?;
        self.release_slot_arrays(&slot)?;

        slot.tri_count = 0;
        slot.quad_count = 0;
        slot.vert_count = 0;
        slot.tri_ofs = 0;
        slot.quad_ofs = 0;
        slot.vert_ofs = 0;
        slot.write(self.blob, slot_ofs)
    }

    /// Decode the geometry a slot currently points at.
    pub fn read_mesh(&self, slot_ofs: usize) -> Result<Mesh, PakError> {
        let slot = MeshSlot::read(self.blob, slot_ofs, self.layout)?;

        let tris = read_faces(self.blob, slot.tri_ofs, slot.tri_count, face::decode_tri)?;
        let quads = read_faces(self.blob, slot.quad_ofs, slot.quad_count, face::decode_quad)?;
        let verts = array_bytes(
            self.blob,
            slot.vert_ofs as usize,
            slot.vert_count as usize,
            VERTEX_RECORD_BYTES,
        )?
        .chunks_exact(VERTEX_RECORD_BYTES)
        .map(|w| vertex::decode(u32::from_le_bytes([w[0], w[1], w[2], w[3]])))
        .collect();

        Ok(Mesh { verts, tris, quads })
    }

    /// Zero and release each array with a non-zero count. Count-zero arrays
    /// are absent and carry no span.
    fn release_slot_arrays(&mut self, slot: &MeshSlot) -> Result<(), PakError> {
        let arrays = [
            (slot.tri_count as usize, slot.tri_ofs, FACE_RECORD_BYTES),
            (slot.quad_count as usize, slot.quad_ofs, FACE_RECORD_BYTES),
            (slot.vert_count as usize, slot.vert_ofs, VERTEX_RECORD_BYTES),
        ];
        for (count, ofs, record) in arrays {
            if count == 0 {
                continue;
            }
            let start = ofs as usize;
            let end = start + count * record;
            let capacity = self.blob.len();
            let bytes = self
                .blob
                .get_mut(start..end)
                .ok_or(PakError::BlobOverflow { end, capacity })?;
            bytes.fill(0);
            self.alloc.release(Span::new(start, end));
        }

        Ok(())
    }

    /// Acquire room for `bytes` and copy them in. Empty arrays place
    /// nowhere and report offset zero.
    fn place(&mut self, bytes: &[u8]) -> Result<usize, PakError> {
        if bytes.is_empty() {
            return Ok(0);
        }
        let start = self.alloc.acquire(bytes.len());
        let end = start + bytes.len();
        if end > self.blob.len() {
            return Err(PakError::BlobOverflow {
                end,
                capacity: self.blob.len(),
            });
        }
        self.blob[start..end].copy_from_slice(bytes);

        Ok(start)
    }
}

fn count_field(what: &'static str, count: usize) -> Result<u8, PakError> {
    u8::try_from(count).map_err(|_| PakError::CountOverflow { what, count })
}

fn encode_faces(faces: &[Face], corners: usize) -> Result<Vec<u8>, PakError> {
    let mut out = Vec::with_capacity(faces.len() * FACE_RECORD_BYTES);
    for f in faces {
        if f.corners.len() != corners {
            return Err(PakError::FaceArity(f.corners.len()));
        }
        out.extend_from_slice(&face::encode(f)?);
    }
    Ok(out)
}

fn encode_verts(verts: &[Vec3]) -> (Vec<u8>, usize) {
    let mut out = Vec::with_capacity(verts.len() * VERTEX_RECORD_BYTES);
    let mut saturated = 0;
    for &pos in verts {
        let enc = vertex::encode(pos);
        if enc.saturated {
            saturated += 1;
        }
        out.extend_from_slice(&enc.word.to_le_bytes());
    }
    (out, saturated)
}

fn read_faces(
    blob: &[u8],
    ofs: u32,
    count: u8,
    decode: fn(&[u8; FACE_RECORD_BYTES]) -> Face,
) -> Result<Vec<Face>, PakError> {
    let bytes = array_bytes(blob, ofs as usize, count as usize, FACE_RECORD_BYTES)?;
    Ok(bytes
        .chunks_exact(FACE_RECORD_BYTES)
        .map(|rec| decode(rec.try_into().unwrap()))
        .collect())
}

fn array_bytes(blob: &[u8], start: usize, count: usize, record: usize) -> Result<&[u8], PakError> {
    let end = start + count * record;
    blob.get(start..end).ok_or(PakError::BlobOverflow {
        end,
        capacity: blob.len(),
    })
}
