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

//! Owned raster image buffers.
//!
//! A [`RasterImage`] couples one contiguous byte buffer with a
//! [`PixelFormat`] and the [`PixelAccessor`] bound for that format. The
//! buffer is exclusively owned: sub-image extraction always copies, and
//! plane addressing is explicit offset arithmetic over the single
//! allocation, never pointer juggling across plane boundaries.

use log::trace;

use crate::accessor::{row_start, PixelAccessor};
use crate::error::{ImageError, Result};
use crate::format::{ImageLayout, PixelFormat};

/// An image buffer plus the format describing its layout.
#[derive(Debug, Clone)]
pub struct RasterImage {
    format: PixelFormat,
    accessor: PixelAccessor,
    data: Vec<u8>,
}

impl RasterImage {
    /// Creates an image for `format`, allocating a zero-initialized
    /// buffer, or adopting `buffer` if one is supplied.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidFormat`] if the format fails
    /// validation or a supplied buffer is smaller than
    /// `bytes_per_line * height * planes`, and
    /// [`ImageError::AllocationFailure`] if the buffer cannot be
    /// allocated.
    pub fn create(format: PixelFormat, buffer: Option<Vec<u8>>) -> Result<Self> {
        format.validate()?;
        let size = format.buffer_size();
        let data = match buffer {
            Some(buf) => {
                if buf.len() < size {
                    return Err(ImageError::InvalidFormat(format!(
                        "supplied buffer holds {} bytes, format needs {}",
                        buf.len(),
                        size
                    )));
                }
                buf
            }
            None => {
                let mut data = Vec::new();
                data.try_reserve_exact(size)
                    .map_err(|_| ImageError::AllocationFailure(size))?;
                data.resize(size, 0);
                data
            }
        };
        let accessor = PixelAccessor::select(&format);
        Ok(Self {
            format,
            accessor,
            data,
        })
    }

    /// The image's pixel format.
    #[must_use]
    pub fn format(&self) -> &PixelFormat {
        &self.format
    }

    /// The accessor strategy currently bound to the format.
    #[must_use]
    pub fn accessor(&self) -> PixelAccessor {
        self.accessor
    }

    /// The backing buffer.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the backing buffer.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consumes the image, returning the backing buffer.
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Replaces the format and re-binds the pixel accessor.
    ///
    /// Every format mutation must go through here; a cached accessor for
    /// the old format reads the buffer wrong.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidFormat`] if the new format fails
    /// validation or needs a larger buffer than the image owns.
    pub fn set_format(&mut self, format: PixelFormat) -> Result<()> {
        format.validate()?;
        if format.buffer_size() > self.data.len() {
            return Err(ImageError::InvalidFormat(format!(
                "format needs {} bytes, image owns {}",
                format.buffer_size(),
                self.data.len()
            )));
        }
        self.format = format;
        self.accessor = PixelAccessor::select(&self.format);
        Ok(())
    }

    /// Reads the pixel at `(x, y)` in normalized form.
    ///
    /// Out-of-range coordinates are a programmer error, checked only in
    /// debug builds.
    #[must_use]
    pub fn get_pixel(&self, x: u32, y: u32) -> u32 {
        debug_assert!(
            x < self.format.width && y < self.format.height,
            "pixel ({x}, {y}) outside {}x{}",
            self.format.width,
            self.format.height
        );
        self.accessor.get(&self.format, &self.data, x, y)
    }

    /// Writes the pixel at `(x, y)` from a normalized value.
    ///
    /// Out-of-range coordinates are a programmer error, checked only in
    /// debug builds.
    pub fn put_pixel(&mut self, x: u32, y: u32, value: u32) {
        debug_assert!(
            x < self.format.width && y < self.format.height,
            "pixel ({x}, {y}) outside {}x{}",
            self.format.width,
            self.format.height
        );
        self.accessor.put(&self.format, &mut self.data, x, y, value);
    }

    /// Extracts a `width` x `height` rectangle starting at `(x, y)` into
    /// a freshly allocated image of the same format.
    ///
    /// The requested rectangle may extend beyond this image; the
    /// uncovered destination area stays zero-filled.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::AllocationFailure`] if the new buffer cannot
    /// be allocated.
    pub fn sub_image(&self, x: u32, y: u32, width: u32, height: u32) -> Result<RasterImage> {
        let mut format = self.format.clone();
        format.width = width;
        format.height = height;
        format.x_offset = 0;
        format.bytes_per_line = format.min_bytes_per_line();
        let mut out = RasterImage::create(format, None)?;
        let copy_w = self.format.width.saturating_sub(x).min(width);
        let copy_h = self.format.height.saturating_sub(y).min(height);
        for row in 0..copy_h {
            for col in 0..copy_w {
                out.put_pixel(col, row, self.get_pixel(x + col, y + row));
            }
        }
        Ok(out)
    }

    /// Copies the overlapping region of `src` into this image with its
    /// origin at `(dest_x, dest_y)`.
    ///
    /// Negative offsets clip the source start; regions outside this
    /// image clip silently. Pixel values convert between the two formats
    /// implicitly because `get` normalizes and `put` denormalizes.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::DepthMismatch`] when the depths differ.
    pub fn overwrite_from(&mut self, src: &RasterImage, dest_x: i64, dest_y: i64) -> Result<()> {
        if src.format.depth != self.format.depth {
            return Err(ImageError::DepthMismatch {
                src: src.format.depth,
                dst: self.format.depth,
            });
        }
        let src_x = (-dest_x).max(0);
        let src_y = (-dest_y).max(0);
        let dst_x = dest_x.max(0);
        let dst_y = dest_y.max(0);
        let width = (i64::from(src.format.width) - src_x)
            .min(i64::from(self.format.width) - dst_x);
        let height = (i64::from(src.format.height) - src_y)
            .min(i64::from(self.format.height) - dst_y);
        if width <= 0 || height <= 0 {
            return Ok(());
        }
        #[allow(clippy::cast_sign_loss)] // all clipped to >= 0 above
        for row in 0..height as u32 {
            for col in 0..width as u32 {
                let value = src.get_pixel(src_x as u32 + col, src_y as u32 + row);
                self.put_pixel(dst_x as u32 + col, dst_y as u32 + row, value);
            }
        }
        Ok(())
    }

    /// Adds `value` to every pixel, modulo `2^depth`.
    ///
    /// Padding bits inside each pixel's storage field are cleared, the
    /// same as a `put_pixel` of the summed value.
    pub fn add_constant(&mut self, value: u32) {
        let mask = self.format.depth_mask();
        if value & mask == 0 {
            return;
        }

        // Single-bit data: adding an odd value is a complement.
        if self.format.depth == 1 {
            trace!("add_constant: complementing {} bytes", self.data.len());
            for byte in &mut self.data {
                *byte = !*byte;
            }
            return;
        }

        if self.format.layout == ImageLayout::PackedZ
            && matches!(self.format.bits_per_pixel, 8 | 16 | 32)
            && (self.format.bits_per_pixel == 8
                || self.format.byte_order == crate::format::ByteOrder::native())
        {
            trace!(
                "add_constant: element add at {}bpp",
                self.format.bits_per_pixel
            );
            self.add_elements(value, mask);
            return;
        }

        for y in 0..self.format.height {
            for x in 0..self.format.width {
                let sum = self.get_pixel(x, y).wrapping_add(value) & mask;
                self.put_pixel(x, y, sum);
            }
        }
    }

    /// Element-wise add over packed rows; tight loops the optimizer can
    /// vectorize.
    fn add_elements(&mut self, value: u32, mask: u32) {
        let stride = self.format.bytes_per_line as usize;
        let width = self.format.width as usize;
        let byte_order = self.format.byte_order;
        for y in 0..self.format.height as usize {
            let row = &mut self.data[y * stride..(y + 1) * stride];
            match self.format.bits_per_pixel {
                8 => {
                    for byte in &mut row[..width] {
                        *byte = (u32::from(*byte).wrapping_add(value) & mask) as u8;
                    }
                }
                16 => {
                    for chunk in row[..width * 2].chunks_exact_mut(2) {
                        let raw = [chunk[0], chunk[1]];
                        let old = match byte_order {
                            crate::format::ByteOrder::LittleEndian => u16::from_le_bytes(raw),
                            crate::format::ByteOrder::BigEndian => u16::from_be_bytes(raw),
                        };
                        let new = (u32::from(old).wrapping_add(value) & mask) as u16;
                        let out = match byte_order {
                            crate::format::ByteOrder::LittleEndian => new.to_le_bytes(),
                            crate::format::ByteOrder::BigEndian => new.to_be_bytes(),
                        };
                        chunk.copy_from_slice(&out);
                    }
                }
                _ => {
                    for chunk in row[..width * 4].chunks_exact_mut(4) {
                        let raw = [chunk[0], chunk[1], chunk[2], chunk[3]];
                        let old = match byte_order {
                            crate::format::ByteOrder::LittleEndian => u32::from_le_bytes(raw),
                            crate::format::ByteOrder::BigEndian => u32::from_be_bytes(raw),
                        };
                        let new = old.wrapping_add(value) & mask;
                        let out = match byte_order {
                            crate::format::ByteOrder::LittleEndian => new.to_le_bytes(),
                            crate::format::ByteOrder::BigEndian => new.to_be_bytes(),
                        };
                        chunk.copy_from_slice(&out);
                    }
                }
            }
        }
    }

    /// Byte offset of row `y` of plane `plane` in the backing buffer.
    pub(crate) fn row_offset(&self, plane: u32, y: u32) -> usize {
        row_start(&self.format, plane, y)
    }
}
