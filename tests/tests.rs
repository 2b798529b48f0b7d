use glam::{Vec2, Vec3};
use segpak::{
    decompress, decompress_parts, Corner, Decoder, Encoder, Face, MatchSettings, Mesh, MeshPacker,
    PakError, SlotLayout, SEGMENT_BYTES,
};

/// Deterministic scene-ish bytes: LCG noise with runs folded in so the
/// sweep has something to match.
fn scene_bytes(len: usize) -> Vec<u8> {
    let mut state = 0x243F_6A88_85A3_08D3u64;
    let mut out = Vec::with_capacity(len + 32);
    while out.len() < len {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let word = (state >> 33) as u16;
        if word % 5 == 0 {
            out.extend(std::iter::repeat(word.to_le_bytes()).take(16).flatten());
        } else {
            out.extend(word.to_le_bytes());
        }
    }
    out.truncate(len);
    out
}

fn texel(u: u8, v: u8) -> Vec2 {
    Vec2::new((u as f32 + 0.5) / 256.0, (v as f32 + 0.5) / 256.0)
}

#[test]
fn four_zero_bytes_make_a_byte_exact_block() {
    let block = segpak::compress(&[0u8; 4], MatchSettings::default()).unwrap();

    let expected = [
        4, 0, 0, 0, // bitfield bytes
        4, 0, 0, 0, // decompressed size
        0x20, 0, 0, 0, // flags 001, literal literal terminator
        0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF,
    ];
    assert_eq!(block, expected);
    assert_eq!(decompress(&block).unwrap(), [0u8; 4]);
}

#[test]
fn empty_input_is_a_bare_header() {
    let block = segpak::compress(&[], MatchSettings::default()).unwrap();
    assert_eq!(block, [0u8; 8]);
    assert_eq!(decompress(&block).unwrap(), Vec::<u8>::new());
}

#[test]
fn small_data_roundtrips_at_every_level() {
    let data: Vec<u8> = (0u16..512).flat_map(|w| (w % 37).to_le_bytes()).collect();

    for level in 1..=5 {
        let block = Encoder::for_bytes(&data)
            .level(level)
            .encode_to_vec()
            .unwrap();
        let back = decompress(&block).unwrap();
        assert_eq!(back, data, "level {} roundtrip", level);
    }
}

#[test]
fn multi_segment_scenes_roundtrip() {
    let data = scene_bytes(2 * SEGMENT_BYTES + 4000);

    let block = Encoder::for_bytes(&data)
        .level(2)
        .encode_to_vec()
        .unwrap();
    assert_eq!(decompress(&block).unwrap(), data);
}

#[test]
fn all_zero_segments_roundtrip_past_the_window_slide() {
    let zeros = vec![0u8; 2 * SEGMENT_BYTES];

    let block = segpak::compress(&zeros, MatchSettings::default()).unwrap();
    assert_eq!(decompress(&block).unwrap(), zeros);
}

#[test]
fn degraded_sweeps_pay_in_block_size() {
    let zeros = vec![0u8; 1024];

    let full = Encoder::for_bytes(&zeros).level(1).encode_to_vec().unwrap();
    let degraded = Encoder::for_bytes(&zeros).level(5).encode_to_vec().unwrap();

    assert!(
        full.len() < degraded.len(),
        "{} bytes at level 1 vs {} at level 5",
        full.len(),
        degraded.len()
    );
    assert_eq!(decompress(&full).unwrap(), zeros);
    assert_eq!(decompress(&degraded).unwrap(), zeros);
}

#[test]
fn header_reports_the_wire_sizes() {
    let data = scene_bytes(6000);
    let block = Encoder::for_bytes(&data).level(1).encode_to_vec().unwrap();

    let mut decoder = Decoder::for_bytes(&block);
    let header = decoder.header().unwrap();
    assert_eq!(header.full_size, 6000);
    assert_eq!(header.bitfield_bytes % 4, 0);
    let payload_bytes = block.len() - 8 - header.bitfield_bytes as usize;
    assert_eq!(payload_bytes % 2, 0, "payload is whole 16-bit words");
    assert_eq!(decoder.decode().unwrap(), data);
}

#[test]
fn a_lookback_before_any_output_is_rejected() {
    // first command asks for a copy out of an empty window
    let bitfield = [0x80, 0, 0, 0];
    let payload = 32u16.to_le_bytes();

    let res = decompress_parts(&bitfield, &payload, 4);
    assert!(matches!(
        res,
        Err(PakError::BadLookback { src: 4, written: 0 })
    ));
}

#[test]
fn literals_past_the_declared_size_are_rejected() {
    let bitfield = [0x00, 0, 0, 0];
    let payload = [0xAA, 0xAA, 0xBB, 0xBB];

    let res = decompress_parts(&bitfield, &payload, 3);
    assert!(matches!(res, Err(PakError::LengthOverrun { declared: 3 })));
}

#[test]
fn copies_past_the_declared_size_are_rejected() {
    // a literal, then an 18-byte copy into a 4-byte output
    let bitfield = [0x40, 0, 0, 0];
    let payload: Vec<u8> = [0x1234u16, 0x0007]
        .iter()
        .flat_map(|w| w.to_le_bytes())
        .collect();

    let res = decompress_parts(&bitfield, &payload, 4);
    assert!(matches!(res, Err(PakError::LengthOverrun { declared: 4 })));
}

#[test]
fn truncated_blocks_are_rejected() {
    let block = segpak::compress(&[0u8; 4], MatchSettings::default()).unwrap();

    assert!(matches!(
        decompress(&block[..6]),
        Err(PakError::Truncated(_))
    ));
    assert!(matches!(
        decompress(&block[..10]),
        Err(PakError::Truncated("bitfield"))
    ));
    assert!(matches!(
        decompress(&block[..14]),
        Err(PakError::Truncated("payload"))
    ));
}

#[test]
fn mesh_slots_repack_and_reuse_their_bytes() {
    let mut blob = vec![0u8; 2048];
    // two Extended slots at 0 and 24, content heap past 48
    let mut packer = MeshPacker::new(&mut blob, SlotLayout::Extended, 48);

    let mesh = Mesh {
        verts: vec![
            Vec3::new(0.125, -0.0625, 0.0),
            Vec3::new(-0.25, 0.125, 0.375),
            Vec3::new(0.5, 0.25, -0.125),
            Vec3::new(0.0, -0.5, 0.25),
        ],
        tris: vec![Face::tri(
            [
                Corner { uv: texel(0, 0), index: 0 },
                Corner { uv: texel(255, 0), index: 1 },
                Corner { uv: texel(0, 255), index: 2 },
            ],
            1,
        )],
        quads: vec![Face::quad(
            [
                Corner { uv: texel(10, 10), index: 0 },
                Corner { uv: texel(200, 10), index: 1 },
                Corner { uv: texel(200, 200), index: 2 },
                Corner { uv: texel(10, 200), index: 3 },
            ],
            2,
        )],
    };

    assert_eq!(packer.repack(0, &mesh).unwrap(), 4);
    assert_eq!(packer.repack(24, &mesh).unwrap(), 4);

    let back = packer.read_mesh(0).unwrap();
    assert_eq!(back.tris, mesh.tris);
    assert_eq!(back.quads, mesh.quads);
    assert_eq!(back.verts.len(), mesh.verts.len());
    for (dec, orig) in back.verts.iter().zip(&mesh.verts) {
        assert!((*dec - *orig).abs().max_element() <= 0.5 / segpak::vertex::SCALE + f32::EPSILON);
    }

    // clearing one slot leaves holes the next repack fills without growing
    let end_before = packer.content_end();
    packer.clear_slot(0).unwrap();
    packer.repack(24, &mesh).unwrap();
    assert_eq!(packer.content_end(), end_before);
    packer.check_cleared().unwrap();
}
