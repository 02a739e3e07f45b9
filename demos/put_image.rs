//! PutImage-style encoding example.
//!
//! Builds a small packed image, serializes it into bounded wire chunks
//! for a big-endian remote end, and prints what a transport layer would
//! see. Run with RUST_LOG=debug to watch the encoder's splitting
//! decisions.
//!
//! Usage:
//!   cargo run --example put_image

use std::error::Error;

use rustximage::{encode, ByteOrder, PixelFormat, RasterImage, WireFormat};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    const WIDTH: u32 = 64;
    const HEIGHT: u32 = 48;

    let format = PixelFormat::z16(WIDTH, HEIGHT)?;
    let mut image = RasterImage::create(format, None)?;

    // Gradient test pattern
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            image.put_pixel(x, y, (x * 4) << 8 | y * 5);
        }
    }

    // Pretend the remote end is big-endian and limits us to 1 KiB
    // per request.
    let wire = WireFormat {
        byte_order: ByteOrder::BigEndian,
        ..WireFormat::matching(&image)
    };

    println!("Encoding {}x{} image in 1024-byte chunks...", WIDTH, HEIGHT);
    for (i, chunk) in encode(&image, &wire, 1024).enumerate() {
        println!(
            "chunk {}: rect {}x{}+{}+{}  {} bytes, left_pad {}, {:?}",
            i,
            chunk.dest_rect.width,
            chunk.dest_rect.height,
            chunk.dest_rect.x,
            chunk.dest_rect.y,
            chunk.payload.len(),
            chunk.left_pad,
            chunk.format,
        );
    }

    Ok(())
}
