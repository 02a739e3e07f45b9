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

//! Wire-transfer chunking for raster images.
//!
//! [`encode`](crate::wire::encode::encode) serializes a [`RasterImage`]
//! into one or more bounded payloads for a PutImage-style request;
//! [`decode`](crate::wire::decode::decode) materializes an image from a
//! GetImage-style reply. The transport itself (request headers, sequence
//! numbers, socket I/O) belongs to the client that consumes the chunks,
//! never to this module.

use bytes::{BufMut, Bytes, BytesMut};

use crate::format::{round_up_bits, BitOrder, ByteOrder, ImageLayout, PixelFormat};
use crate::image::RasterImage;

pub mod decode;
pub mod encode;

pub use decode::decode;
pub use encode::{encode, EncodeChunks};

/// A rectangle within the destination drawable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// X coordinate of the top-left corner.
    pub x: u32,
    /// Y coordinate of the top-left corner.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Writes the rectangle header to a byte buffer.
    pub fn write_header(&self, buf: &mut BytesMut) {
        buf.put_u32(self.x);
        buf.put_u32(self.y);
        buf.put_u32(self.width);
        buf.put_u32(self.height);
    }
}

/// The layout a chunk's payload is expressed in on the wire.
///
/// Normally follows the image's own layout; the one exception is packed
/// 1-bit-per-pixel data with a non-zero left pad, which the protocol
/// forbids and the encoder re-labels as planar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkFormat {
    /// Bitplanes, most significant plane last.
    PlanarXy,
    /// Packed pixels.
    PackedZ,
}

/// One bounded unit of transfer produced by the encoder.
#[derive(Debug, Clone)]
pub struct WireChunk {
    /// Pixel data in the wire format, ready for the request body.
    pub payload: Bytes,
    /// Destination rectangle this chunk covers.
    pub dest_rect: Rect,
    /// Bit offset of the first pixel within the first scanline unit.
    pub left_pad: u8,
    /// Layout tag for the request header.
    pub format: ChunkFormat,
}

impl WireChunk {
    /// Writes the chunk header (rect, left pad, format tag, payload
    /// length) for transport framing. The payload itself follows.
    pub fn write_header(&self, buf: &mut BytesMut) {
        self.dest_rect.write_header(buf);
        buf.put_u8(self.left_pad);
        buf.put_u8(match self.format {
            ChunkFormat::PlanarXy => 1,
            ChunkFormat::PackedZ => 2,
        });
        buf.put_bytes(0, 2); // padding
        #[allow(clippy::cast_possible_truncation)] // payloads are request-bounded
        buf.put_u32(self.payload.len() as u32);
    }
}

/// Scanline geometry the remote end expects, as negotiated at
/// connection setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireFormat {
    /// Byte order of scanline units on the wire.
    pub byte_order: ByteOrder,
    /// Bit order within scanline units on the wire.
    pub bit_order: BitOrder,
    /// Scanline unit for bitmap/planar data, 8, 16, or 32.
    pub scanline_unit: u8,
    /// Scanline pad in bits, 8, 16, or 32.
    pub scanline_pad: u8,
    /// Storage width of packed pixels at the transfer's depth.
    pub bits_per_pixel: u8,
}

impl WireFormat {
    /// Bytes per wire row of one bitplane, `left_pad` included.
    #[must_use]
    pub fn xy_row_bytes(&self, width: u32, left_pad: u32) -> usize {
        round_up_bits(width + left_pad, u32::from(self.scanline_pad)) as usize / 8
    }

    /// Bytes per wire row of packed pixels.
    #[must_use]
    pub fn z_row_bytes(&self, width: u32) -> usize {
        round_up_bits(
            width * u32::from(self.bits_per_pixel),
            u32::from(self.scanline_pad),
        ) as usize
            / 8
    }

    /// The wire side of one bitplane as a pixel format, for transform
    /// selection and row addressing.
    pub(crate) fn plane_format(&self, width: u32, height: u32, left_pad: u32) -> PixelFormat {
        PixelFormat {
            width,
            height,
            depth: 1,
            layout: ImageLayout::Bitmap,
            bits_per_pixel: 1,
            byte_order: self.byte_order,
            bit_order: self.bit_order,
            scanline_unit: self.scanline_unit,
            scanline_pad: self.scanline_pad,
            x_offset: left_pad,
            bytes_per_line: self.xy_row_bytes(width, left_pad) as u32,
        }
    }

    /// The wire side of a packed transfer as a pixel format.
    pub(crate) fn packed_format(&self, width: u32, height: u32, depth: u8) -> PixelFormat {
        PixelFormat {
            width,
            height,
            depth,
            layout: ImageLayout::PackedZ,
            bits_per_pixel: self.bits_per_pixel,
            byte_order: self.byte_order,
            bit_order: self.bit_order,
            scanline_unit: if self.bits_per_pixel == 1 {
                self.scanline_unit
            } else {
                8
            },
            scanline_pad: self.scanline_pad,
            x_offset: 0,
            bytes_per_line: self.z_row_bytes(width) as u32,
        }
    }

    /// A wire format matching an image's own layout, for loopback
    /// transfers and tests.
    #[must_use]
    pub fn matching(image: &RasterImage) -> Self {
        let format = image.format();
        WireFormat {
            byte_order: format.byte_order,
            bit_order: format.bit_order,
            scanline_unit: format.scanline_unit,
            scanline_pad: format.scanline_pad,
            bits_per_pixel: match format.layout {
                ImageLayout::PackedZ => format.bits_per_pixel,
                ImageLayout::Bitmap | ImageLayout::PlanarXy => 1,
            },
        }
    }
}
