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

//! Pixel format descriptions for raster images.
//!
//! A [`PixelFormat`] describes one buffer's layout completely: logical
//! extents, significant bits per pixel, physical storage layout (bitmap,
//! planar XY, or packed Z), bit and byte ordering, and scanline geometry.
//! Two formats together determine the scanline transform needed to move
//! pixel data between them (see [`crate::convert`]).
//!
//! # Layouts
//!
//! - **Bitmap**: depth-1 data, one bit per pixel.
//! - **`PlanarXy`**: `depth` separate bitplanes, each one bit per pixel.
//! - **`PackedZ`**: one multi-bit value per pixel, packed contiguously at
//!   1, 4, 8, 16, 24, or 32 bits per pixel.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{ImageError, Result};

/// Physical arrangement of pixel bits in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLayout {
    /// Single-plane, one bit per pixel. Implies depth 1.
    Bitmap,
    /// One bitplane per depth bit, each plane one bit per pixel.
    PlanarXy,
    /// Packed multi-bit pixels, `bits_per_pixel` wide each.
    PackedZ,
}

/// Byte order of a scanline unit in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Least significant byte first.
    LittleEndian,
    /// Most significant byte first.
    BigEndian,
}

impl ByteOrder {
    /// Returns the byte order of the host.
    #[must_use]
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }
}

/// Order of pixels within a scanline unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    /// The leftmost pixel is the least significant bit of the unit.
    LsbFirst,
    /// The leftmost pixel is the most significant bit of the unit.
    MsbFirst,
}

/// Describes the complete layout of one pixel buffer.
///
/// `PixelFormat` is an immutable value type; all invariants are checked at
/// construction and any later field change must go back through
/// [`PixelFormat::validate`] (images additionally re-bind their pixel
/// accessor, see [`crate::RasterImage::set_format`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelFormat {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Number of significant bits per pixel, 1 to 32.
    pub depth: u8,
    /// Physical arrangement of pixel bits.
    pub layout: ImageLayout,
    /// Physical storage width of one pixel. Meaningful for `PackedZ` only;
    /// bitmap and planar data always store one bit per pixel per plane.
    pub bits_per_pixel: u8,
    /// Byte order of each scanline unit.
    pub byte_order: ByteOrder,
    /// Pixel order within each scanline unit.
    pub bit_order: BitOrder,
    /// Atomic group of bits (8, 16, or 32) within which reordering happens.
    pub scanline_unit: u8,
    /// Alignment boundary in bits that each row is padded to (8, 16, or 32).
    pub scanline_pad: u8,
    /// Bit offset of pixel 0 within the first storage unit of a row.
    /// Used by `Bitmap` and `PlanarXy` addressing; ignored for `PackedZ`.
    pub x_offset: u32,
    /// Bytes per scanline, per plane. At least the padded minimum.
    pub bytes_per_line: u32,
}

impl PixelFormat {
    /// Creates a validated pixel format with the minimum `bytes_per_line`.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidFormat`] if any invariant of the format
    /// fields is violated.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        width: u32,
        height: u32,
        depth: u8,
        layout: ImageLayout,
        bits_per_pixel: u8,
        byte_order: ByteOrder,
        bit_order: BitOrder,
        scanline_unit: u8,
        scanline_pad: u8,
        x_offset: u32,
    ) -> Result<Self> {
        let mut format = Self {
            width,
            height,
            depth,
            layout,
            bits_per_pixel,
            byte_order,
            bit_order,
            scanline_unit,
            scanline_pad,
            x_offset,
            bytes_per_line: 0,
        };
        format.validate_fields()?;
        format.bytes_per_line = format.min_bytes_per_line();
        Ok(format)
    }

    /// Replaces `bytes_per_line` with a caller-supplied larger stride.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidFormat`] if the stride is smaller than
    /// the computed minimum.
    pub fn with_bytes_per_line(mut self, bytes_per_line: u32) -> Result<Self> {
        if bytes_per_line < self.min_bytes_per_line() {
            return Err(ImageError::InvalidFormat(format!(
                "bytes_per_line {} below minimum {}",
                bytes_per_line,
                self.min_bytes_per_line()
            )));
        }
        self.bytes_per_line = bytes_per_line;
        Ok(self)
    }

    /// Creates a depth-1 bitmap format with MSB-first bit order and 8-bit
    /// scanline units, the classic server bitmap layout.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidFormat`] for degenerate extents.
    pub fn bitmap(width: u32, height: u32) -> Result<Self> {
        Self::new(
            width,
            height,
            1,
            ImageLayout::Bitmap,
            1,
            ByteOrder::BigEndian,
            BitOrder::MsbFirst,
            8,
            8,
            0,
        )
    }

    /// Creates a planar XY format of the given depth with MSB-first bit
    /// order and 8-bit units.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidFormat`] if `depth` is 0 or above 32.
    pub fn planar_xy(width: u32, height: u32, depth: u8) -> Result<Self> {
        Self::new(
            width,
            height,
            depth,
            ImageLayout::PlanarXy,
            1,
            ByteOrder::BigEndian,
            BitOrder::MsbFirst,
            8,
            8,
            0,
        )
    }

    /// Creates a packed 8-bits-per-pixel format of depth 8.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidFormat`] for degenerate extents.
    pub fn z8(width: u32, height: u32) -> Result<Self> {
        Self::packed(width, height, 8, 8)
    }

    /// Creates a packed little-endian 16-bits-per-pixel format of depth 16.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidFormat`] for degenerate extents.
    pub fn z16(width: u32, height: u32) -> Result<Self> {
        Self::packed(width, height, 16, 16)
    }

    /// Creates a packed little-endian 32-bits-per-pixel format of depth 24,
    /// the common true-color layout with 8 bits of padding per pixel.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidFormat`] for degenerate extents.
    pub fn z24(width: u32, height: u32) -> Result<Self> {
        Self::packed(width, height, 24, 32)
    }

    /// Creates a packed little-endian 32-bits-per-pixel format of depth 32.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidFormat`] for degenerate extents.
    pub fn z32(width: u32, height: u32) -> Result<Self> {
        Self::packed(width, height, 32, 32)
    }

    /// Creates a packed little-endian format with the given depth and
    /// storage width.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidFormat`] if `depth` exceeds
    /// `bits_per_pixel` or `bits_per_pixel` is not a supported width.
    pub fn packed(width: u32, height: u32, depth: u8, bits_per_pixel: u8) -> Result<Self> {
        let unit = bits_per_pixel.clamp(8, 32);
        // 24bpp pixels are byte-addressed; the unit stays at 8.
        let unit = if bits_per_pixel == 24 { 8 } else { unit };
        Self::new(
            width,
            height,
            depth,
            ImageLayout::PackedZ,
            bits_per_pixel,
            ByteOrder::LittleEndian,
            BitOrder::LsbFirst,
            unit,
            if bits_per_pixel == 24 { 8 } else { unit },
            0,
        )
    }

    /// Validates every construction invariant of this format.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidFormat`] naming the violated invariant.
    pub fn validate(&self) -> Result<()> {
        self.validate_fields()?;
        if self.bytes_per_line < self.min_bytes_per_line() {
            return Err(ImageError::InvalidFormat(format!(
                "bytes_per_line {} below minimum {}",
                self.bytes_per_line,
                self.min_bytes_per_line()
            )));
        }
        Ok(())
    }

    fn validate_fields(&self) -> Result<()> {
        if self.depth == 0 || self.depth > 32 {
            return Err(ImageError::InvalidFormat(format!(
                "depth {} outside 1..=32",
                self.depth
            )));
        }
        if self.layout == ImageLayout::Bitmap && self.depth != 1 {
            return Err(ImageError::InvalidFormat(format!(
                "bitmap layout requires depth 1, got {}",
                self.depth
            )));
        }
        if !matches!(self.scanline_pad, 8 | 16 | 32) {
            return Err(ImageError::InvalidFormat(format!(
                "scanline_pad {} not one of 8/16/32",
                self.scanline_pad
            )));
        }
        if !matches!(self.scanline_unit, 8 | 16 | 32) {
            return Err(ImageError::InvalidFormat(format!(
                "scanline_unit {} not one of 8/16/32",
                self.scanline_unit
            )));
        }
        if self.layout == ImageLayout::PackedZ {
            if !matches!(self.bits_per_pixel, 1 | 4 | 8 | 16 | 24 | 32) {
                return Err(ImageError::InvalidFormat(format!(
                    "bits_per_pixel {} not one of 1/4/8/16/24/32",
                    self.bits_per_pixel
                )));
            }
            if self.depth > self.bits_per_pixel {
                return Err(ImageError::InvalidFormat(format!(
                    "depth {} exceeds bits_per_pixel {}",
                    self.depth, self.bits_per_pixel
                )));
            }
        }
        Ok(())
    }

    /// Number of bits one row occupies before padding.
    #[must_use]
    pub fn row_bits(&self) -> u32 {
        match self.layout {
            ImageLayout::PackedZ => self.width * u32::from(self.bits_per_pixel),
            ImageLayout::Bitmap | ImageLayout::PlanarXy => self.width + self.x_offset,
        }
    }

    /// Minimum legal `bytes_per_line` for this format.
    #[must_use]
    pub fn min_bytes_per_line(&self) -> u32 {
        round_up_bits(self.row_bits(), u32::from(self.scanline_pad)) / 8
    }

    /// Number of planes the buffer stores: `depth` for planar XY, 1 otherwise.
    #[must_use]
    pub fn planes(&self) -> u32 {
        match self.layout {
            ImageLayout::PlanarXy => u32::from(self.depth),
            ImageLayout::Bitmap | ImageLayout::PackedZ => 1,
        }
    }

    /// Byte size of one plane of the buffer.
    #[must_use]
    pub fn plane_size(&self) -> usize {
        self.bytes_per_line as usize * self.height as usize
    }

    /// Total byte size of the backing buffer.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.plane_size() * self.planes() as usize
    }

    /// Mask covering the significant bits of a pixel value.
    #[must_use]
    pub fn depth_mask(&self) -> u32 {
        if self.depth >= 32 {
            u32::MAX
        } else {
            (1u32 << self.depth) - 1
        }
    }

    /// Serializes the format descriptor for transport framing.
    ///
    /// The descriptor is 24 bytes: width, height, x_offset and
    /// bytes_per_line as big-endian u32, then depth, layout, bits per
    /// pixel, byte order, bit order, scanline unit, scanline pad, and one
    /// byte of padding.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u32(self.width);
        buf.put_u32(self.height);
        buf.put_u32(self.x_offset);
        buf.put_u32(self.bytes_per_line);
        buf.put_u8(self.depth);
        buf.put_u8(match self.layout {
            ImageLayout::Bitmap => 0,
            ImageLayout::PlanarXy => 1,
            ImageLayout::PackedZ => 2,
        });
        buf.put_u8(self.bits_per_pixel);
        buf.put_u8(match self.byte_order {
            ByteOrder::LittleEndian => 0,
            ByteOrder::BigEndian => 1,
        });
        buf.put_u8(match self.bit_order {
            BitOrder::LsbFirst => 0,
            BitOrder::MsbFirst => 1,
        });
        buf.put_u8(self.scanline_unit);
        buf.put_u8(self.scanline_pad);
        buf.put_u8(0); // padding
    }

    /// Reads a format descriptor previously written by [`Self::write_to`].
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::TruncatedReply`] if fewer than 24 bytes are
    /// available, or [`ImageError::InvalidFormat`] if the decoded fields
    /// violate an invariant.
    pub fn from_bytes(buf: &mut BytesMut) -> Result<Self> {
        if buf.len() < 24 {
            return Err(ImageError::TruncatedReply {
                expected: 24,
                actual: buf.len(),
            });
        }
        let width = buf.get_u32();
        let height = buf.get_u32();
        let x_offset = buf.get_u32();
        let bytes_per_line = buf.get_u32();
        let depth = buf.get_u8();
        let layout = match buf.get_u8() {
            0 => ImageLayout::Bitmap,
            1 => ImageLayout::PlanarXy,
            2 => ImageLayout::PackedZ,
            other => {
                return Err(ImageError::InvalidFormat(format!(
                    "unknown layout tag {other}"
                )))
            }
        };
        let bits_per_pixel = buf.get_u8();
        let byte_order = if buf.get_u8() == 0 {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        };
        let bit_order = if buf.get_u8() == 0 {
            BitOrder::LsbFirst
        } else {
            BitOrder::MsbFirst
        };
        let scanline_unit = buf.get_u8();
        let scanline_pad = buf.get_u8();
        buf.advance(1);

        let format = Self::new(
            width,
            height,
            depth,
            layout,
            bits_per_pixel,
            byte_order,
            bit_order,
            scanline_unit,
            scanline_pad,
            x_offset,
        )?;
        format.with_bytes_per_line(bytes_per_line)
    }
}

/// Rounds `bits` up to a multiple of `pad` bits.
#[inline]
#[must_use]
pub fn round_up_bits(bits: u32, pad: u32) -> u32 {
    (bits + pad - 1) / pad * pad
}
