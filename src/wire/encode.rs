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

//! PutImage-style chunked encoding.
//!
//! The encoder walks a work list of destination rectangles. A rectangle
//! whose encoded size fits the request bound is emitted as one chunk;
//! otherwise it splits by rows, or by columns when even a single row
//! exceeds the bound, and the pieces re-enter the work list. Splitting
//! always shrinks the rectangle, so the walk terminates.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use log::{debug, trace, warn};

use crate::convert::{bit_location, ScanlineTransform};
use crate::format::{ImageLayout, PixelFormat};
use crate::image::RasterImage;
use crate::wire::{ChunkFormat, Rect, WireChunk, WireFormat};

/// Whether a packed transfer must re-render pixels into the wire's
/// storage width before scanline conversion applies.
pub(crate) fn z_rerender_needed(format: &PixelFormat, wire: &WireFormat) -> bool {
    format.layout == ImageLayout::PackedZ
        && (format.bits_per_pixel != wire.bits_per_pixel
            || (format.bits_per_pixel == 4 && format.bit_order != wire.bit_order))
}

/// Builds a wire-native packed format for the re-render path.
pub(crate) fn z_native_format(
    width: u32,
    height: u32,
    depth: u8,
    wire: &WireFormat,
) -> PixelFormat {
    let mut format = PixelFormat {
        width,
        height,
        depth,
        layout: ImageLayout::PackedZ,
        bits_per_pixel: wire.bits_per_pixel,
        byte_order: wire.byte_order,
        bit_order: wire.bit_order,
        scanline_unit: if wire.bits_per_pixel == 1 {
            wire.scanline_unit
        } else {
            8
        },
        scanline_pad: wire.scanline_pad,
        x_offset: 0,
        bytes_per_line: 0,
    };
    format.bytes_per_line = format.min_bytes_per_line();
    format
}

/// Serializes `image` into bounded wire chunks.
///
/// Chunks are produced lazily in destination order, top-to-bottom and
/// left-to-right. When the image's packed storage width differs from the
/// wire's, the whole image is first re-rendered pixel by pixel into a
/// wire-native buffer; correctness-preserving, but O(width x height).
#[must_use]
pub fn encode<'a>(
    image: &'a RasterImage,
    wire: &WireFormat,
    max_request_bytes: usize,
) -> EncodeChunks<'a> {
    let format = image.format();
    let source = if z_rerender_needed(format, wire) {
        warn!(
            "re-rendering {}x{} image: {}bpp buffer vs {}bpp wire",
            format.width, format.height, format.bits_per_pixel, wire.bits_per_pixel
        );
        let native = z_native_format(format.width, format.height, format.depth, wire);
        debug_assert!(
            native.depth <= native.bits_per_pixel,
            "wire bits_per_pixel too narrow for depth {}",
            native.depth
        );
        let mut rendered =
            RasterImage::create(native, None).expect("wire-native format is constructible");
        for y in 0..format.height {
            for x in 0..format.width {
                rendered.put_pixel(x, y, image.get_pixel(x, y));
            }
        }
        Source::Rendered(rendered)
    } else {
        Source::Borrowed(image)
    };

    let mut queue = VecDeque::new();
    if format.width > 0 && format.height > 0 {
        queue.push_back(Rect {
            x: 0,
            y: 0,
            width: format.width,
            height: format.height,
        });
    }
    EncodeChunks {
        source,
        wire: *wire,
        max: max_request_bytes,
        queue,
    }
}

enum Source<'a> {
    Borrowed(&'a RasterImage),
    Rendered(RasterImage),
}

impl Source<'_> {
    fn image(&self) -> &RasterImage {
        match self {
            Source::Borrowed(image) => image,
            Source::Rendered(image) => image,
        }
    }
}

/// Lazy chunk producer returned by [`encode`].
pub struct EncodeChunks<'a> {
    source: Source<'a>,
    wire: WireFormat,
    max: usize,
    queue: VecDeque<Rect>,
}

/// Per-rectangle transfer geometry.
struct Transfer {
    planar: bool,
    left_pad: u32,
    row_bytes: usize,
    planes: u32,
}

impl EncodeChunks<'_> {
    fn transfer_for(&self, rect: Rect) -> Transfer {
        let format = self.source.image().format();
        match format.layout {
            ImageLayout::Bitmap | ImageLayout::PlanarXy => {
                let left_pad = (format.x_offset + rect.x) % u32::from(self.wire.scanline_unit);
                Transfer {
                    planar: true,
                    left_pad,
                    row_bytes: self.wire.xy_row_bytes(rect.width, left_pad),
                    planes: format.planes(),
                }
            }
            ImageLayout::PackedZ => {
                let left_pad = if format.bits_per_pixel == 1 {
                    rect.x % u32::from(self.wire.scanline_unit)
                } else {
                    0
                };
                if left_pad != 0 {
                    // The protocol forbids a left pad on packed single-bit
                    // data; this continuation goes out as a planar chunk.
                    Transfer {
                        planar: true,
                        left_pad,
                        row_bytes: self.wire.xy_row_bytes(rect.width, left_pad),
                        planes: 1,
                    }
                } else {
                    Transfer {
                        planar: false,
                        left_pad: 0,
                        row_bytes: self.wire.z_row_bytes(rect.width),
                        planes: 1,
                    }
                }
            }
        }
    }

    /// Pixel step column splits must stay aligned to so that packed
    /// continuation chunks start on a byte boundary.
    fn column_step(&self) -> u32 {
        let format = self.source.image().format();
        match format.layout {
            ImageLayout::PackedZ if format.bits_per_pixel == 4 => 2,
            _ => 1,
        }
    }

    /// Bit-granular emission for chunks that start mid-unit in the
    /// source, where the byte-group transform cannot apply. Reached only
    /// by column continuations and large x offsets.
    fn emit_bitwise(
        &self,
        rect: Rect,
        transfer: &Transfer,
        wire_side: &PixelFormat,
        src_base_bit: u32,
        dst_base_bit: u32,
        tag: ChunkFormat,
    ) -> WireChunk {
        trace!(
            "bitwise chunk at x {} (source unit misaligned)",
            rect.x
        );
        let image = self.source.image();
        let format = image.format();
        let stride = format.bytes_per_line as usize;
        let height = rect.height as usize;
        let mut out = BytesMut::zeroed(transfer.row_bytes * height * transfer.planes as usize);
        for plane in 0..transfer.planes {
            for row in 0..rect.height {
                let row_start = image.row_offset(plane, rect.y + row);
                let src_row = &image.data()[row_start..row_start + stride];
                let at = (plane as usize * height + row as usize) * transfer.row_bytes;
                let dst_row = &mut out[at..at + transfer.row_bytes];
                for col in 0..rect.width {
                    let (sb, ss) = bit_location(
                        format.scanline_unit,
                        format.bit_order,
                        format.byte_order,
                        stride,
                        src_base_bit + col,
                    );
                    let bit = (src_row[sb] >> ss) & 1;
                    let (db, ds) = bit_location(
                        wire_side.scanline_unit,
                        wire_side.bit_order,
                        wire_side.byte_order,
                        transfer.row_bytes,
                        dst_base_bit + col,
                    );
                    dst_row[db] |= bit << ds;
                }
            }
        }
        WireChunk {
            payload: out.freeze(),
            dest_rect: rect,
            left_pad: transfer.left_pad as u8,
            format: tag,
        }
    }

    fn emit(&self, rect: Rect, transfer: &Transfer) -> WireChunk {
        let image = self.source.image();
        let format = image.format();
        let stride = format.bytes_per_line as usize;
        let height = rect.height as usize;

        if transfer.planar {
            let wire_plane =
                self.wire
                    .plane_format(rect.width, rect.height, transfer.left_pad);
            let xf = ScanlineTransform::between(format, &wire_plane);
            let x_offset = match format.layout {
                ImageLayout::PackedZ => 0,
                ImageLayout::Bitmap | ImageLayout::PlanarXy => format.x_offset,
            };

            if xf.is_identity()
                && rect.x == 0
                && rect.width == format.width
                && x_offset < u32::from(self.wire.scanline_unit)
                && transfer.row_bytes == stride
                && (format.depth == 1 || (rect.y == 0 && rect.height == format.height))
            {
                trace!("planar fast path for {}x{}", rect.width, rect.height);
                let payload = if format.depth == 1 {
                    let start = image.row_offset(0, rect.y);
                    Bytes::copy_from_slice(
                        &image.data()[start..start + transfer.row_bytes * height],
                    )
                } else {
                    Bytes::copy_from_slice(image.data())
                };
                return WireChunk {
                    payload,
                    dest_rect: rect,
                    left_pad: transfer.left_pad as u8,
                    format: ChunkFormat::PlanarXy,
                };
            }

            let start_bits = x_offset + rect.x - transfer.left_pad;
            if start_bits % u32::from(format.scanline_unit) != 0 {
                return self.emit_bitwise(
                    rect,
                    transfer,
                    &wire_plane,
                    x_offset + rect.x,
                    transfer.left_pad,
                    ChunkFormat::PlanarXy,
                );
            }

            let src_byte = (start_bits / 8) as usize;
            let mut out = BytesMut::zeroed(transfer.row_bytes * height * transfer.planes as usize);
            for plane in 0..transfer.planes {
                for row in 0..rect.height {
                    let row_start = image.row_offset(plane, rect.y + row);
                    let src = &image.data()[row_start + src_byte..row_start + stride];
                    let at = (plane as usize * height + row as usize) * transfer.row_bytes;
                    xf.apply(src, &mut out[at..at + transfer.row_bytes]);
                }
            }
            WireChunk {
                payload: out.freeze(),
                dest_rect: rect,
                left_pad: transfer.left_pad as u8,
                format: ChunkFormat::PlanarXy,
            }
        } else {
            let wire_format = self
                .wire
                .packed_format(rect.width, rect.height, format.depth);
            let xf = ScanlineTransform::between(format, &wire_format);

            if xf.is_identity()
                && rect.x == 0
                && rect.width == format.width
                && transfer.row_bytes == stride
                && (format.depth == 1 || (rect.y == 0 && rect.height == format.height))
            {
                trace!("packed fast path for {}x{}", rect.width, rect.height);
                let start = image.row_offset(0, rect.y);
                let payload =
                    Bytes::copy_from_slice(&image.data()[start..start + transfer.row_bytes * height]);
                return WireChunk {
                    payload,
                    dest_rect: rect,
                    left_pad: 0,
                    format: ChunkFormat::PackedZ,
                };
            }

            if format.bits_per_pixel == 1 && rect.x % u32::from(format.scanline_unit) != 0 {
                return self.emit_bitwise(rect, transfer, &wire_format, rect.x, 0, ChunkFormat::PackedZ);
            }

            let src_byte = (rect.x as usize * format.bits_per_pixel as usize) / 8;
            let mut out = BytesMut::zeroed(transfer.row_bytes * height);
            for row in 0..rect.height {
                let row_start = image.row_offset(0, rect.y + row);
                let src = &image.data()[row_start + src_byte..row_start + stride];
                let at = row as usize * transfer.row_bytes;
                xf.apply(src, &mut out[at..at + transfer.row_bytes]);
            }
            WireChunk {
                payload: out.freeze(),
                dest_rect: rect,
                left_pad: 0,
                format: ChunkFormat::PackedZ,
            }
        }
    }
}

impl Iterator for EncodeChunks<'_> {
    type Item = WireChunk;

    fn next(&mut self) -> Option<WireChunk> {
        loop {
            let rect = self.queue.pop_front()?;
            let transfer = self.transfer_for(rect);
            let total = transfer.row_bytes * rect.height as usize * transfer.planes as usize;
            if total <= self.max {
                return Some(self.emit(rect, &transfer));
            }

            let band_bytes = transfer.row_bytes * transfer.planes as usize;
            let rows = (self.max / band_bytes.max(1)) as u32;
            if rows >= 1 {
                debug!(
                    "splitting {}x{} transfer into {} row bands",
                    rect.width, rect.height, rows
                );
                let first = Rect {
                    height: rows,
                    ..rect
                };
                let rest = Rect {
                    y: rect.y + rows,
                    height: rect.height - rows,
                    ..rect
                };
                self.queue.push_front(rest);
                self.queue.push_front(first);
                continue;
            }

            // A single row exceeds the bound: split it by columns. The
            // continuation chunk recomputes its left pad from the new x.
            let format = self.source.image().format();
            let pad = usize::from(self.wire.scanline_pad);
            let per_plane_bits = self.max * 8 / transfer.planes.max(1) as usize;
            let usable_bits = per_plane_bits / pad * pad;
            let step = self.column_step();
            #[allow(clippy::cast_possible_truncation)] // bounded by rect.width below
            let mut cols = if transfer.planar {
                usable_bits.saturating_sub(transfer.left_pad as usize) as u32
            } else {
                (usable_bits / usize::from(format.bits_per_pixel)) as u32
            };
            cols -= cols % step;
            cols = cols.max(step);
            if cols >= rect.width {
                // Cannot shrink further; emit oversized rather than stall.
                return Some(self.emit(rect, &transfer));
            }
            debug!(
                "splitting single row of {} pixels into {}-pixel columns",
                rect.width, cols
            );
            let first = Rect { width: cols, ..rect };
            let rest = Rect {
                x: rect.x + cols,
                width: rect.width - cols,
                ..rect
            };
            self.queue.push_front(rest);
            self.queue.push_front(first);
        }
    }
}
