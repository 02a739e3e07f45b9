// Copyright 2025 Dustin McAfee
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Scanline layout conversion between pixel formats.
//!
//! Two buffers that hold the same pixels can still disagree on scanline
//! unit size, bit order, and byte order. Those three fields form twelve
//! distinct classifications, and converting a scanline between any two of
//! them collapses to one of a small set of primitive byte/bit reorderings.
//! The mapping is canonical data: a 12x12 matrix of [`SwapKind`] values
//! plus two 12-entry half-order side tables, embedded below as `const`
//! tables and re-derived from first principles by the test suite.
//!
//! The half-order tables resolve the one genuinely subtle case: a row
//! whose byte length is not a multiple of the active swap granularity.
//! The trailing bytes of such a row hold a partial storage unit, and
//! [`HalfOrder`] records which half of the full unit they represent.
//! Getting this wrong corrupts only the last pixels of affected rows.

use crate::format::{BitOrder, ByteOrder, ImageLayout, PixelFormat};

/// Primitive scanline reordering operations.
///
/// The 12x12 classification matrix maps onto eight of these;
/// [`SwapKind::SwapThreeBytes`] is selected outside the matrix, for
/// 24-bits-per-pixel packed data whose byte orders disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapKind {
    /// Bytes pass through unchanged.
    Identity,
    /// Swap the two bytes of each 16-bit group.
    SwapTwoBytes,
    /// Reverse the three bytes of each 24-bit group.
    SwapThreeBytes,
    /// Reverse the four bytes of each 32-bit group.
    SwapFourBytes,
    /// Exchange the 16-bit halves of each 32-bit group, keeping the byte
    /// order within each half.
    SwapWords,
    /// Reverse the bits of every byte.
    ReverseBits,
    /// Reverse bits and swap the bytes of each 16-bit group.
    ReverseBitsSwapTwo,
    /// Reverse bits and reverse the bytes of each 32-bit group.
    ReverseBitsSwapFour,
    /// Reverse bits and exchange the 16-bit halves of each 32-bit group.
    ReverseBitsSwapWords,
}

impl SwapKind {
    /// Byte granularity the operation works at.
    #[must_use]
    pub fn granularity(self) -> usize {
        match self {
            SwapKind::Identity | SwapKind::ReverseBits => 1,
            SwapKind::SwapTwoBytes | SwapKind::ReverseBitsSwapTwo => 2,
            SwapKind::SwapThreeBytes => 3,
            SwapKind::SwapFourBytes
            | SwapKind::SwapWords
            | SwapKind::ReverseBitsSwapFour
            | SwapKind::ReverseBitsSwapWords => 4,
        }
    }

    /// Whether the operation reverses the bits within each byte.
    #[must_use]
    pub fn reverses_bits(self) -> bool {
        matches!(
            self,
            SwapKind::ReverseBits
                | SwapKind::ReverseBitsSwapTwo
                | SwapKind::ReverseBitsSwapFour
                | SwapKind::ReverseBitsSwapWords
        )
    }

    /// Whether the operation moves 16-bit halves of 32-bit groups.
    #[must_use]
    pub fn is_word_swap(self) -> bool {
        matches!(self, SwapKind::SwapWords | SwapKind::ReverseBitsSwapWords)
    }

    /// Source byte index feeding destination byte `j` of one group.
    fn permute(self, j: usize) -> usize {
        match self {
            SwapKind::Identity | SwapKind::ReverseBits => j,
            SwapKind::SwapTwoBytes | SwapKind::ReverseBitsSwapTwo => j ^ 1,
            SwapKind::SwapThreeBytes => 2 - j,
            SwapKind::SwapFourBytes | SwapKind::ReverseBitsSwapFour => 3 - j,
            SwapKind::SwapWords | SwapKind::ReverseBitsSwapWords => j ^ 2,
        }
    }
}

/// Which half of a storage unit the leading bytes of a partial trailing
/// unit represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalfOrder {
    /// The least significant half comes first.
    LsbFirst,
    /// The most significant half comes first.
    MsbFirst,
}

/// One of the twelve `(scanline_unit, bit_order, byte_order)` triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScanlineClass(usize);

impl ScanlineClass {
    pub(crate) fn new(unit: u8, bit_order: BitOrder, byte_order: ByteOrder) -> Self {
        let unit_index = match unit {
            8 => 0,
            16 => 1,
            _ => 2,
        };
        let bit_index = usize::from(bit_order == BitOrder::MsbFirst);
        let byte_index = usize::from(byte_order == ByteOrder::BigEndian);
        ScanlineClass(unit_index * 4 + bit_index * 2 + byte_index)
    }

    fn unit_bytes(self) -> usize {
        1 << (self.0 / 4)
    }

    /// Effective classification of a format's scanline storage.
    ///
    /// Packed 16 and 32 bits-per-pixel data reorders at pixel granularity
    /// regardless of the nominal scanline unit; 4 and 8 bits-per-pixel
    /// packed data is byte-addressed and never reorders.
    pub(crate) fn of(format: &PixelFormat) -> Self {
        match format.layout {
            ImageLayout::Bitmap | ImageLayout::PlanarXy => {
                Self::new(format.scanline_unit, format.bit_order, format.byte_order)
            }
            ImageLayout::PackedZ => match format.bits_per_pixel {
                16 | 32 => Self::new(format.bits_per_pixel, BitOrder::LsbFirst, format.byte_order),
                1 => Self::new(format.scanline_unit, format.bit_order, format.byte_order),
                _ => Self::new(8, BitOrder::LsbFirst, ByteOrder::LittleEndian),
            },
        }
    }
}

// Short names for the canonical tables below.
const N: SwapKind = SwapKind::Identity;
const S2: SwapKind = SwapKind::SwapTwoBytes;
const S4: SwapKind = SwapKind::SwapFourBytes;
const SW: SwapKind = SwapKind::SwapWords;
const R: SwapKind = SwapKind::ReverseBits;
const RS2: SwapKind = SwapKind::ReverseBitsSwapTwo;
const RS4: SwapKind = SwapKind::ReverseBitsSwapFour;
const RSW: SwapKind = SwapKind::ReverseBitsSwapWords;
const HL: HalfOrder = HalfOrder::LsbFirst;
const HM: HalfOrder = HalfOrder::MsbFirst;

/// The canonical transform matrix, indexed `[source class][dest class]`.
///
/// Class index = `unit * 4 + bit_order * 2 + byte_order` with units
/// ordered 8, 16, 32; `L`/`M` = LSB-/MSB-first bits, `l`/`b` = little/big
/// endian bytes. Every cell is defined; the function is total.
#[rustfmt::skip]
static SWAP_TABLE: [[SwapKind; 12]; 12] = [
    //        8Ll  8Lb  8Ml  8Mb  16Ll 16Lb 16Ml 16Mb 32Ll 32Lb 32Ml 32Mb
    /*  8Ll */ [N,   N,   R,   R,   N,   S2,  RS2, R,   N,   S4,  RS4, R  ],
    /*  8Lb */ [N,   N,   R,   R,   N,   S2,  RS2, R,   N,   S4,  RS4, R  ],
    /*  8Ml */ [R,   R,   N,   N,   R,   RS2, S2,  N,   R,   RS4, S4,  N  ],
    /*  8Mb */ [R,   R,   N,   N,   R,   RS2, S2,  N,   R,   RS4, S4,  N  ],
    /* 16Ll */ [N,   N,   R,   R,   N,   S2,  RS2, R,   N,   S4,  RS4, R  ],
    /* 16Lb */ [S2,  S2,  RS2, RS2, S2,  N,   R,   RS2, S2,  SW,  RSW, RS2],
    /* 16Ml */ [RS2, RS2, S2,  S2,  RS2, R,   N,   S2,  RS2, RSW, SW,  S2 ],
    /* 16Mb */ [R,   R,   N,   N,   R,   RS2, S2,  N,   R,   RS4, S4,  N  ],
    /* 32Ll */ [N,   N,   R,   R,   N,   S2,  RS2, R,   N,   S4,  RS4, R  ],
    /* 32Lb */ [S4,  S4,  RS4, RS4, S4,  SW,  RSW, RS4, S4,  N,   R,   RS4],
    /* 32Ml */ [RS4, RS4, S4,  S4,  RS4, RSW, SW,  S4,  RS4, R,   N,   S4 ],
    /* 32Mb */ [R,   R,   N,   N,   R,   RS2, S2,  N,   R,   RS4, S4,  N  ],
];

/// Default half order of a partial trailing unit, indexed by the source
/// classification. `MsbFirst` entries are the classes whose bit and byte
/// orders cross, placing logically-first pixels in the trailing bytes of
/// a full unit.
static HALF_ORDER: [HalfOrder; 12] = [
    HL, HL, HL, HL, // unit 8: single-byte units never split
    HL, HM, HM, HL, // unit 16
    HL, HM, HM, HL, // unit 32
];

/// Half order at 16-bit-word granularity, indexed by the destination
/// classification, consulted only for word-swap transforms.
static HALF_ORDER_WORD: [HalfOrder; 12] = [
    HL, HL, HL, HL, //
    HL, HL, HL, HL, // unit 16: words are whole units, always in order
    HL, HM, HM, HL, // unit 32
];

/// The scanline transform bridging one pixel format to another.
///
/// Stateless and cheap to build; apply it row by row with
/// [`ScanlineTransform::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanlineTransform {
    /// The primitive reordering to apply per scanline.
    pub swap_kind: SwapKind,
    /// Resolution for partial trailing units: the source-indexed default,
    /// or the destination-indexed word value for word swaps.
    pub half_unit_order: HalfOrder,
    src_unit: usize,
    dst_unit: usize,
    src_half: HalfOrder,
    dst_half: HalfOrder,
}

impl ScanlineTransform {
    /// Computes the transform from `src`'s layout to `dst`'s.
    ///
    /// Total over all format pairs; there is no failure mode.
    #[must_use]
    pub fn between(src: &PixelFormat, dst: &PixelFormat) -> Self {
        if src.layout == ImageLayout::PackedZ
            && dst.layout == ImageLayout::PackedZ
            && src.bits_per_pixel == 24
            && dst.bits_per_pixel == 24
        {
            let kind = if src.byte_order == dst.byte_order {
                SwapKind::Identity
            } else {
                SwapKind::SwapThreeBytes
            };
            return ScanlineTransform {
                swap_kind: kind,
                half_unit_order: HalfOrder::LsbFirst,
                src_unit: 3,
                dst_unit: 3,
                src_half: HalfOrder::LsbFirst,
                dst_half: HalfOrder::LsbFirst,
            };
        }
        Self::from_classes(ScanlineClass::of(src), ScanlineClass::of(dst))
    }

    pub(crate) fn from_classes(src: ScanlineClass, dst: ScanlineClass) -> Self {
        let kind = SWAP_TABLE[src.0][dst.0];
        let half_unit_order = if kind.is_word_swap() {
            HALF_ORDER_WORD[dst.0]
        } else {
            HALF_ORDER[src.0]
        };
        ScanlineTransform {
            swap_kind: kind,
            half_unit_order,
            src_unit: src.unit_bytes(),
            dst_unit: dst.unit_bytes(),
            src_half: HALF_ORDER[src.0],
            dst_half: HALF_ORDER[dst.0],
        }
    }

    /// True when applying the transform is a plain byte copy.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.swap_kind == SwapKind::Identity
    }

    /// Transforms one scanline from `src` into `dst`.
    ///
    /// The slices may differ in length when the two formats pad rows
    /// differently; missing source bytes read as zero and excess source
    /// bytes are ignored. Partial trailing groups on either side are
    /// completed according to that side's half order.
    pub fn apply(&self, src: &[u8], dst: &mut [u8]) {
        let g = self.swap_kind.granularity();
        let rev = self.swap_kind.reverses_bits();
        if g == 1 {
            let n = src.len().min(dst.len());
            for (d, s) in dst[..n].iter_mut().zip(&src[..n]) {
                *d = if rev { s.reverse_bits() } else { *s };
            }
            dst[n..].fill(0);
            return;
        }

        let mut offset = 0;
        while offset < dst.len() {
            // Gather the conceptual full group, placing the bytes of a
            // degraded trailing source unit at the end of its unit span
            // named by the source half order.
            let mut group = [0u8; 4];
            let src_ub = self.src_unit.min(g);
            let mut u = 0;
            while u < g {
                let pos = offset + u;
                if pos >= src.len() {
                    break;
                }
                let have = (src.len() - pos).min(src_ub);
                if have == src_ub || self.src_half == HalfOrder::LsbFirst {
                    group[u..u + have].copy_from_slice(&src[pos..pos + have]);
                } else {
                    group[u + src_ub - have..u + src_ub]
                        .copy_from_slice(&src[pos..pos + have]);
                }
                u += src_ub;
            }

            let mut out = [0u8; 4];
            for (j, slot) in out[..g].iter_mut().enumerate() {
                let byte = group[self.swap_kind.permute(j)];
                *slot = if rev { byte.reverse_bits() } else { byte };
            }

            // Scatter, mirroring the gather on the destination side.
            let take = (dst.len() - offset).min(g);
            let dst_ub = self.dst_unit.min(g);
            let mut u = 0;
            while u < take {
                let have = (take - u).min(dst_ub);
                let from = if have == dst_ub || self.dst_half == HalfOrder::LsbFirst {
                    u
                } else {
                    u + dst_ub - have
                };
                dst[offset + u..offset + u + have].copy_from_slice(&out[from..from + have]);
                u += dst_ub;
            }
            offset += g;
        }
    }
}

/// Locates logical bit `bit` of a row within the row's bytes.
///
/// Returns `(byte_index, bit_in_byte)` where `bit_in_byte` counts value
/// significance within the byte. A trailing unit shortened by row padding
/// degrades to a unit of the remaining width, keeping the row's bit and
/// byte orders at the reduced size.
pub(crate) fn bit_location(
    unit: u8,
    bit_order: BitOrder,
    byte_order: ByteOrder,
    row_len: usize,
    bit: u32,
) -> (usize, u32) {
    let unit_bits = unit as usize;
    let unit_bytes = unit_bits / 8;
    let k = bit as usize / unit_bits;
    let i = bit as usize % unit_bits;
    let base = k * unit_bytes;
    let avail = row_len.saturating_sub(base).min(unit_bytes);
    let width = avail * 8;
    debug_assert!(i < width, "pixel bit beyond stored row data");
    let p = match bit_order {
        BitOrder::LsbFirst => i,
        BitOrder::MsbFirst => width - 1 - i,
    };
    let byte = base
        + match byte_order {
            ByteOrder::LittleEndian => p / 8,
            ByteOrder::BigEndian => avail - 1 - p / 8,
        };
    (byte, (p % 8) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNITS: [u8; 3] = [8, 16, 32];
    const BITS: [BitOrder; 2] = [BitOrder::LsbFirst, BitOrder::MsbFirst];
    const BYTES: [ByteOrder; 2] = [ByteOrder::LittleEndian, ByteOrder::BigEndian];

    fn all_classes() -> Vec<(u8, BitOrder, ByteOrder)> {
        let mut v = Vec::new();
        for unit in UNITS {
            for bit in BITS {
                for byte in BYTES {
                    v.push((unit, bit, byte));
                }
            }
        }
        v
    }

    /// Writes logical bit `bit` of a row, reference implementation.
    fn write_bit(
        row: &mut [u8],
        (unit, bit_order, byte_order): (u8, BitOrder, ByteOrder),
        bit: u32,
        value: bool,
    ) {
        let len = row.len();
        let (byte, shift) = bit_location(unit, bit_order, byte_order, len, bit);
        if value {
            row[byte] |= 1 << shift;
        } else {
            row[byte] &= !(1 << shift);
        }
    }

    fn read_bit(
        row: &[u8],
        (unit, bit_order, byte_order): (u8, BitOrder, ByteOrder),
        bit: u32,
    ) -> bool {
        let (byte, shift) = bit_location(unit, bit_order, byte_order, row.len(), bit);
        (row[byte] >> shift) & 1 != 0
    }

    fn pattern(bit: u32) -> bool {
        // Aperiodic enough to catch any byte or bit misplacement.
        (bit * 7 + bit / 3) % 5 < 2
    }

    /// Re-derives the 12x12 matrix from first principles: laying out the
    /// same logical bit string in both classifications must agree with
    /// the table-driven transform, for every cell.
    #[test]
    fn test_swap_table_matches_reference_layout() {
        let nbits = 96u32; // full units in every classification
        for src_c in all_classes() {
            for dst_c in all_classes() {
                let mut src_row = vec![0u8; 12];
                let mut want = vec![0u8; 12];
                for bit in 0..nbits {
                    write_bit(&mut src_row, src_c, bit, pattern(bit));
                    write_bit(&mut want, dst_c, bit, pattern(bit));
                }
                let xf = ScanlineTransform::from_classes(
                    ScanlineClass::new(src_c.0, src_c.1, src_c.2),
                    ScanlineClass::new(dst_c.0, dst_c.1, dst_c.2),
                );
                let mut got = vec![0u8; 12];
                xf.apply(&src_row, &mut got);
                assert_eq!(
                    got, want,
                    "transform mismatch for {src_c:?} -> {dst_c:?} ({:?})",
                    xf.swap_kind
                );
            }
        }
    }

    /// Partial trailing units: rows padded to 8 bits keep every logical
    /// bit across a transform and back, for every class pair and several
    /// awkward widths.
    #[test]
    fn test_partial_trailing_units_survive_round_trip() {
        for src_c in all_classes() {
            for dst_c in all_classes() {
                for nbits in [9u32, 17, 23, 33, 47] {
                    let src_len = ((nbits as usize) + 7) / 8;
                    let dst_len = src_len;
                    let mut src_row = vec![0u8; src_len];
                    for bit in 0..nbits {
                        write_bit(&mut src_row, src_c, bit, pattern(bit));
                    }
                    let fwd = ScanlineTransform::from_classes(
                        ScanlineClass::new(src_c.0, src_c.1, src_c.2),
                        ScanlineClass::new(dst_c.0, dst_c.1, dst_c.2),
                    );
                    let rev = ScanlineTransform::from_classes(
                        ScanlineClass::new(dst_c.0, dst_c.1, dst_c.2),
                        ScanlineClass::new(src_c.0, src_c.1, src_c.2),
                    );
                    let mut mid = vec![0u8; dst_len];
                    fwd.apply(&src_row, &mut mid);
                    for bit in 0..nbits {
                        assert_eq!(
                            read_bit(&mid, dst_c, bit),
                            pattern(bit),
                            "bit {bit} of {nbits} lost in {src_c:?} -> {dst_c:?}"
                        );
                    }
                    let mut back = vec![0u8; src_len];
                    rev.apply(&mid, &mut back);
                    for bit in 0..nbits {
                        assert_eq!(
                            read_bit(&back, src_c, bit),
                            pattern(bit),
                            "bit {bit} of {nbits} lost round-tripping {src_c:?} <-> {dst_c:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_half_order_tables_follow_crossed_placement() {
        for (idx, (unit, bit, byte)) in all_classes().into_iter().enumerate() {
            let crossed = unit > 8
                && (bit == BitOrder::LsbFirst) != (byte == ByteOrder::LittleEndian);
            let want = if crossed {
                HalfOrder::MsbFirst
            } else {
                HalfOrder::LsbFirst
            };
            assert_eq!(HALF_ORDER[idx], want, "class {idx}");
            let word_crossed = unit == 32 && crossed;
            let want_word = if word_crossed {
                HalfOrder::MsbFirst
            } else {
                HalfOrder::LsbFirst
            };
            assert_eq!(HALF_ORDER_WORD[idx], want_word, "class {idx}");
        }
    }

    #[test]
    fn test_identity_for_equal_formats() {
        let f = PixelFormat::bitmap(16, 4).unwrap();
        let xf = ScanlineTransform::between(&f, &f);
        assert!(xf.is_identity());
    }

    #[test]
    fn test_packed_16_endian_swap() {
        let le = PixelFormat::z16(4, 1).unwrap();
        let mut be = le.clone();
        be.byte_order = ByteOrder::BigEndian;
        let xf = ScanlineTransform::between(&le, &be);
        assert_eq!(xf.swap_kind, SwapKind::SwapTwoBytes);
        let mut out = vec![0u8; 8];
        xf.apply(&[0x34, 0x12, 0x78, 0x56, 0xbc, 0x9a, 0xf0, 0xde], &mut out);
        assert_eq!(out, vec![0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0]);
    }

    #[test]
    fn test_packed_24_byte_swap() {
        let le = PixelFormat::packed(2, 1, 24, 24).unwrap();
        let mut be = le.clone();
        be.byte_order = ByteOrder::BigEndian;
        let xf = ScanlineTransform::between(&le, &be);
        assert_eq!(xf.swap_kind, SwapKind::SwapThreeBytes);
        let mut out = vec![0u8; 6];
        xf.apply(&[1, 2, 3, 4, 5, 6], &mut out);
        assert_eq!(out, vec![3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn test_bitmap_bit_order_reversal() {
        let msb = PixelFormat::bitmap(8, 1).unwrap();
        let mut lsb = msb.clone();
        lsb.bit_order = BitOrder::LsbFirst;
        lsb.byte_order = ByteOrder::LittleEndian;
        let xf = ScanlineTransform::between(&msb, &lsb);
        assert_eq!(xf.swap_kind, SwapKind::ReverseBits);
        let mut out = vec![0u8; 1];
        xf.apply(&[0b1000_0001], &mut out);
        assert_eq!(out[0], 0b1000_0001);
        xf.apply(&[0b1100_0000], &mut out);
        assert_eq!(out[0], 0b0000_0011);
    }

    #[test]
    fn test_packed_byte_addressed_formats_never_swap() {
        let a = PixelFormat::z8(4, 1).unwrap();
        let mut b = a.clone();
        b.byte_order = ByteOrder::BigEndian;
        assert!(ScanlineTransform::between(&a, &b).is_identity());
    }
}
