//! End-to-end properties of the codec: wire round-trips across the
//! layout matrix, chunk reassembly, and fast-path equivalence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rustximage::{
    decode, encode, BitOrder, ByteOrder, ImageLayout, PixelFormat, RasterImage, WireFormat,
};

/// Deterministic but aperiodic pixel values.
fn fill(image: &mut RasterImage) {
    let mask = image.format().depth_mask();
    let (w, h) = (image.format().width, image.format().height);
    for y in 0..h {
        for x in 0..w {
            image.put_pixel(x, y, (x.wrapping_mul(31) ^ y.wrapping_mul(17) ^ 0x5a5a) & mask);
        }
    }
}

fn assert_same_pixels(a: &RasterImage, b: &RasterImage) {
    let (w, h) = (a.format().width, a.format().height);
    for y in 0..h {
        for x in 0..w {
            assert_eq!(
                a.get_pixel(x, y),
                b.get_pixel(x, y),
                "pixel ({x}, {y}) differs"
            );
        }
    }
}

fn roundtrip(image: &RasterImage, wire: &WireFormat) {
    let payload: Vec<u8> = encode(image, wire, usize::MAX)
        .flat_map(|c| c.payload.to_vec())
        .collect();
    let decoded = decode(&payload, wire, image.format()).expect("decode");
    assert_same_pixels(image, &decoded);
}

fn format(
    width: u32,
    height: u32,
    depth: u8,
    layout: ImageLayout,
    bits_per_pixel: u8,
    byte_order: ByteOrder,
    bit_order: BitOrder,
    unit: u8,
    pad: u8,
) -> PixelFormat {
    PixelFormat::new(
        width,
        height,
        depth,
        layout,
        bits_per_pixel,
        byte_order,
        bit_order,
        unit,
        pad,
        0,
    )
    .expect("valid test format")
}

#[test]
fn roundtrip_bitmap_order_matrix() {
    // 19 pixels wide: rows end mid-unit for the 16- and 32-bit units.
    for byte_order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
        for bit_order in [BitOrder::LsbFirst, BitOrder::MsbFirst] {
            for unit in [8u8, 16, 32] {
                for pad in [8u8, 16, 32] {
                    let fmt = format(
                        19,
                        5,
                        1,
                        ImageLayout::Bitmap,
                        1,
                        byte_order,
                        bit_order,
                        unit,
                        pad,
                    );
                    let mut image = RasterImage::create(fmt, None).unwrap();
                    fill(&mut image);

                    // Same layout on the wire, and two crossed ones.
                    roundtrip(&image, &WireFormat::matching(&image));
                    roundtrip(
                        &image,
                        &WireFormat {
                            byte_order: ByteOrder::BigEndian,
                            bit_order: BitOrder::MsbFirst,
                            scanline_unit: 32,
                            scanline_pad: 8,
                            bits_per_pixel: 1,
                        },
                    );
                    roundtrip(
                        &image,
                        &WireFormat {
                            byte_order: ByteOrder::LittleEndian,
                            bit_order: BitOrder::MsbFirst,
                            scanline_unit: 16,
                            scanline_pad: 32,
                            bits_per_pixel: 1,
                        },
                    );
                }
            }
        }
    }
}

#[test]
fn roundtrip_packed_widths() {
    let le = ByteOrder::LittleEndian;
    let be = ByteOrder::BigEndian;
    let lsb = BitOrder::LsbFirst;
    let z = ImageLayout::PackedZ;
    let cases = [
        format(19, 4, 1, z, 1, le, lsb, 8, 8),
        format(19, 4, 4, z, 4, le, lsb, 8, 8),
        format(19, 4, 4, z, 4, le, BitOrder::MsbFirst, 8, 8),
        format(19, 4, 8, z, 8, le, lsb, 8, 8),
        format(19, 4, 8, z, 8, le, lsb, 8, 32),
        format(19, 4, 16, z, 16, le, lsb, 16, 16),
        format(19, 4, 16, z, 16, be, lsb, 16, 16),
        format(19, 4, 12, z, 16, le, lsb, 16, 16),
        format(19, 4, 24, z, 24, le, lsb, 8, 8),
        format(19, 4, 24, z, 24, be, lsb, 8, 32),
        format(19, 4, 24, z, 32, le, lsb, 32, 32),
        format(19, 4, 32, z, 32, be, lsb, 32, 32),
    ];
    for fmt in cases {
        let mut image = RasterImage::create(fmt, None).unwrap();
        fill(&mut image);
        // Matching wire, then the opposite byte order.
        let wire = WireFormat::matching(&image);
        roundtrip(&image, &wire);
        let swapped = WireFormat {
            byte_order: match wire.byte_order {
                ByteOrder::LittleEndian => ByteOrder::BigEndian,
                ByteOrder::BigEndian => ByteOrder::LittleEndian,
            },
            ..wire
        };
        roundtrip(&image, &swapped);
    }
}

#[test]
fn roundtrip_planar_depths() {
    for depth in [2u8, 3, 5, 8] {
        let fmt = format(
            21,
            6,
            depth,
            ImageLayout::PlanarXy,
            1,
            ByteOrder::BigEndian,
            BitOrder::MsbFirst,
            8,
            8,
        );
        let mut image = RasterImage::create(fmt, None).unwrap();
        fill(&mut image);
        roundtrip(&image, &WireFormat::matching(&image));
        roundtrip(
            &image,
            &WireFormat {
                byte_order: ByteOrder::LittleEndian,
                bit_order: BitOrder::LsbFirst,
                scanline_unit: 32,
                scanline_pad: 32,
                bits_per_pixel: 1,
            },
        );
    }
}

#[test]
fn planar_wire_data_keeps_most_significant_plane_last() {
    let fmt = format(
        8,
        2,
        3,
        ImageLayout::PlanarXy,
        1,
        ByteOrder::BigEndian,
        BitOrder::MsbFirst,
        8,
        8,
    );
    let mut image = RasterImage::create(fmt, None).unwrap();
    // One pixel with only the most significant bit set.
    image.put_pixel(0, 0, 0b100);
    let wire = WireFormat::matching(&image);
    let chunks: Vec<_> = encode(&image, &wire, usize::MAX).collect();
    assert_eq!(chunks.len(), 1);
    let payload = &chunks[0].payload;
    let plane_bytes = payload.len() / 3;
    // Planes for bits 0 and 1 are empty; the plane for bit 2 comes last.
    assert!(payload[..2 * plane_bytes].iter().all(|&b| b == 0));
    assert_eq!(payload[2 * plane_bytes], 0b1000_0000);

    let decoded = decode(payload, &wire, image.format()).unwrap();
    assert_same_pixels(&image, &decoded);
}

#[test]
fn chunk_reassembly_matches_unbounded_encode() {
    let mut image = RasterImage::create(PixelFormat::z16(13, 16).unwrap(), None).unwrap();
    fill(&mut image);
    let wire = WireFormat::matching(&image);
    let whole: Vec<u8> = encode(&image, &wire, usize::MAX)
        .flat_map(|c| c.payload.to_vec())
        .collect();
    let row = wire.z_row_bytes(13);
    for rows_per_chunk in [1usize, 2, 5, 7, 16] {
        let split: Vec<u8> = encode(&image, &wire, row * rows_per_chunk)
            .flat_map(|c| c.payload.to_vec())
            .collect();
        assert_eq!(split, whole, "reassembly at {rows_per_chunk} rows");
        let decoded = decode(&split, &wire, image.format()).unwrap();
        assert_same_pixels(&image, &decoded);
    }
}

#[test]
fn banded_chunks_decode_into_their_rects() {
    let fmt = format(
        19,
        9,
        1,
        ImageLayout::Bitmap,
        1,
        ByteOrder::BigEndian,
        BitOrder::MsbFirst,
        8,
        8,
    );
    let mut image = RasterImage::create(fmt, None).unwrap();
    fill(&mut image);
    let wire = WireFormat::matching(&image);
    let row = wire.xy_row_bytes(19, 0);

    let mut assembled = RasterImage::create(image.format().clone(), None).unwrap();
    for chunk in encode(&image, &wire, row * 4) {
        let mut band_format = image.format().clone();
        band_format.height = chunk.dest_rect.height;
        let band = decode(&chunk.payload, &wire, &band_format).unwrap();
        assembled
            .overwrite_from(&band, i64::from(chunk.dest_rect.x), i64::from(chunk.dest_rect.y))
            .unwrap();
    }
    assert_same_pixels(&image, &assembled);
}

#[test]
fn column_splits_survive_misaligned_source_units() {
    // 32-bit crossed source units, 8-bit wire units: continuation chunks
    // start mid-unit in the source and still carry the right bits.
    let fmt = format(
        48,
        2,
        1,
        ImageLayout::Bitmap,
        1,
        ByteOrder::LittleEndian,
        BitOrder::MsbFirst,
        32,
        8,
    );
    let mut image = RasterImage::create(fmt, None).unwrap();
    fill(&mut image);
    let wire = WireFormat {
        byte_order: ByteOrder::BigEndian,
        bit_order: BitOrder::MsbFirst,
        scanline_unit: 8,
        scanline_pad: 8,
        bits_per_pixel: 1,
    };

    let chunks: Vec<_> = encode(&image, &wire, 2).collect();
    assert!(chunks.len() >= 3);
    let mut assembled = RasterImage::create(image.format().clone(), None).unwrap();
    for chunk in chunks {
        assert_eq!(chunk.left_pad, 0);
        let mut band_format = image.format().clone();
        band_format.width = chunk.dest_rect.width;
        band_format.height = chunk.dest_rect.height;
        band_format.bytes_per_line = band_format.min_bytes_per_line();
        let band = decode(&chunk.payload, &wire, &band_format).unwrap();
        assembled
            .overwrite_from(&band, i64::from(chunk.dest_rect.x), i64::from(chunk.dest_rect.y))
            .unwrap();
    }
    assert_same_pixels(&image, &assembled);
}

#[test]
fn fast_path_equals_general_path_on_random_images() {
    let mut rng = StdRng::seed_from_u64(0x1a9e);
    for _ in 0..8 {
        let width = rng.gen_range(1..40);
        let height = rng.gen_range(1..12);
        let fast_fmt = PixelFormat::z32(width, height).unwrap();
        let wide_fmt = fast_fmt
            .clone()
            .with_bytes_per_line(fast_fmt.bytes_per_line + 4)
            .unwrap();
        let mut fast = RasterImage::create(fast_fmt, None).unwrap();
        let mut general = RasterImage::create(wide_fmt, None).unwrap();
        for y in 0..height {
            for x in 0..width {
                let value: u32 = rng.gen();
                fast.put_pixel(x, y, value);
                general.put_pixel(x, y, value);
            }
        }
        let wire = WireFormat::matching(&fast);
        let a: Vec<u8> = encode(&fast, &wire, usize::MAX)
            .flat_map(|c| c.payload.to_vec())
            .collect();
        let b: Vec<u8> = encode(&general, &wire, usize::MAX)
            .flat_map(|c| c.payload.to_vec())
            .collect();
        assert_eq!(a, b, "{width}x{height}");
    }
}

#[test]
fn sub_image_roundtrips_through_wire() {
    let mut image = RasterImage::create(PixelFormat::z8(12, 7).unwrap(), None).unwrap();
    fill(&mut image);
    let sub = image.sub_image(3, 2, 6, 4).unwrap();
    roundtrip(&sub, &WireFormat::matching(&sub));
    for y in 0..4 {
        for x in 0..6 {
            assert_eq!(sub.get_pixel(x, y), image.get_pixel(x + 3, y + 2));
        }
    }
}
