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

//! GetImage-style reply decoding.
//!
//! A reply carries raw pixel rows in the wire format with no left pad.
//! The expected byte count is fully determined by the wire geometry and
//! the requested image format; any disagreement means the connection
//! state is suspect and the reply is rejected rather than clamped.

use log::warn;

use crate::convert::ScanlineTransform;
use crate::error::{ImageError, Result};
use crate::format::{ImageLayout, PixelFormat};
use crate::image::RasterImage;
use crate::wire::encode::{z_native_format, z_rerender_needed};
use crate::wire::WireFormat;

/// Materializes a [`RasterImage`] in `format` from a reply payload.
///
/// # Errors
///
/// Returns [`ImageError::TruncatedReply`] or
/// [`ImageError::OversizedReply`] when the payload length disagrees with
/// the expected transfer size, and [`ImageError::InvalidFormat`] when
/// `format` itself is unusable as a reply target (non-zero `x_offset`,
/// or a wire storage width too narrow for the requested depth).
pub fn decode(payload: &[u8], wire: &WireFormat, format: &PixelFormat) -> Result<RasterImage> {
    if format.x_offset != 0 {
        return Err(ImageError::InvalidFormat(
            "reply decoding requires x_offset 0".into(),
        ));
    }
    format.validate()?;

    // Storage widths that disagree decode through a wire-native image
    // first, then re-render pixel by pixel; the mirror of the encoder's
    // fallback and just as costly.
    if z_rerender_needed(format, wire) {
        warn!(
            "re-rendering {}x{} reply: {}bpp wire vs {}bpp buffer",
            format.width, format.height, wire.bits_per_pixel, format.bits_per_pixel
        );
        let native = z_native_format(format.width, format.height, format.depth, wire);
        native.validate()?;
        let native_image = decode(payload, wire, &native)?;
        let mut out = RasterImage::create(format.clone(), None)?;
        out.overwrite_from(&native_image, 0, 0)?;
        return Ok(out);
    }

    let planes = format.planes();
    let (wire_side, row_bytes) = match format.layout {
        ImageLayout::Bitmap | ImageLayout::PlanarXy => {
            let plane = wire.plane_format(format.width, format.height, 0);
            let row = wire.xy_row_bytes(format.width, 0);
            (plane, row)
        }
        ImageLayout::PackedZ => {
            let packed = wire.packed_format(format.width, format.height, format.depth);
            let row = wire.z_row_bytes(format.width);
            (packed, row)
        }
    };
    let expected = row_bytes * format.height as usize * planes as usize;
    if payload.len() < expected {
        return Err(ImageError::TruncatedReply {
            expected,
            actual: payload.len(),
        });
    }
    if payload.len() > expected {
        return Err(ImageError::OversizedReply {
            expected,
            actual: payload.len(),
        });
    }

    let mut image = RasterImage::create(format.clone(), None)?;
    let xf = ScanlineTransform::between(&wire_side, format);
    let stride = format.bytes_per_line as usize;
    let height = format.height as usize;
    for plane in 0..planes {
        for row in 0..format.height {
            let src_at = (plane as usize * height + row as usize) * row_bytes;
            let src = &payload[src_at..src_at + row_bytes];
            let dst_at = image.row_offset(plane, row);
            let data = image.data_mut();
            xf.apply(src, &mut data[dst_at..dst_at + stride]);
        }
    }
    Ok(image)
}
