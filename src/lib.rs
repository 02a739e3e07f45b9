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


//! # rustximage
//!
//! A pure Rust raster-image codec for X11-style remote display clients.
//!
//! This library moves pixel data losslessly between an in-process image
//! buffer and the byte layout a remote display server expects, and splits
//! oversized transfers into bounded protocol payloads. It handles every
//! classic layout: 1-bit bitmaps, multi-plane "XY" images, and packed "Z"
//! images at 1/4/8/16/24/32 bits per pixel, across all bit orders, byte
//! orders, scanline units, and scanline paddings.
//!
//! ## Features
//!
//! - **All pixel layouts**: bitmap, planar XY, packed Z
//! - **Full ordering matrix**: LSB/MSB bit order x little/big endian x
//!   8/16/32-bit scanline units, bridged by table-driven transforms
//! - **Bounded transfers**: PutImage-style chunking with row and column
//!   splitting, left-pad tracking, and strict GetImage reply validation
//! - **Fast accessors**: specialized pixel get/put for the common
//!   formats, generic normalization for the rest
//! - **Memory safe**: pure Rust, no unsafe code
//!
//! ## Quick Start
//!
//! ```
//! use rustximage::{encode, PixelFormat, RasterImage, WireFormat};
//!
//! # fn main() -> rustximage::Result<()> {
//! // An 8-bit packed image.
//! let format = PixelFormat::z8(640, 480)?;
//! let mut image = RasterImage::create(format, None)?;
//! image.put_pixel(10, 20, 0x7f);
//!
//! // Serialize for the wire, at most 16 KiB per request.
//! let wire = WireFormat::matching(&image);
//! for chunk in encode(&image, &wire, 16 * 1024) {
//!     // Hand chunk.payload plus chunk.dest_rect to the transport.
//!     assert!(chunk.payload.len() <= 16 * 1024);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           Your Application              │
//! │                                         │
//! │  • Builds and edits RasterImages        │
//! │  • Owns the protocol connection         │
//! └──────────────────┬──────────────────────┘
//!                    │
//!        ┌───────────┼───────────┐
//!        ▼           ▼           ▼
//! ┌──────────┐ ┌──────────┐ ┌──────────┐
//! │RasterImage│ │WireChunker│ │PixelFormat│
//! │          │ │encode/decode│ │          │
//! └────┬─────┘ └────┬─────┘ └─────┬────┘
//!      │            │             │
//!      ▼            ▼             │
//! ┌──────────┐ ┌──────────┐       │
//! │ Pixel    │ │ Scanline │◄──────┘
//! │ Accessor │ │ Transform│
//! └──────────┘ └──────────┘
//! ```
//!
//! The transport itself (request framing, sequence numbers, socket I/O)
//! stays outside this crate: [`encode`] yields [`WireChunk`] values for
//! the connection layer to frame and send, and [`decode`] consumes the
//! raw reply bytes that layer receives.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accessor;
pub mod convert;
pub mod error;
pub mod format;
pub mod image;
pub mod wire;

// Re-exports
pub use accessor::PixelAccessor;
pub use convert::{HalfOrder, ScanlineTransform, SwapKind};
pub use error::{ImageError, Result};
pub use format::{BitOrder, ByteOrder, ImageLayout, PixelFormat};
pub use image::RasterImage;
pub use wire::{decode, encode, ChunkFormat, EncodeChunks, Rect, WireChunk, WireFormat};

/// Request payload bound of a default-sized protocol connection
/// (65535 four-byte units, minus one unit of request header).
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 65_535 * 4 - 4;
