//! Shared fixtures for upload integration tests.

use std::io::Cursor;

use image::{ImageFormat, RgbImage};

/// Encodes a deterministic noise image so small rasters still exceed the
/// minimum payload size.
#[allow(dead_code)]
pub fn noisy_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
    let image = RgbImage::from_fn(width, height, |_, _| {
        let mut channel = || {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (state >> 33) as u8
        };
        image::Rgb([channel(), channel(), channel()])
    });

    let mut encoded = Cursor::new(Vec::new());
    image
        .write_to(&mut encoded, format)
        .expect("fixture image should encode");
    encoded.into_inner()
}

/// Payload that starts with a Windows PE header.
#[allow(dead_code)]
pub fn pe_payload() -> Vec<u8> {
    let mut bytes = b"MZ\x90\x00\x03\x00\x00\x00".to_vec();
    bytes.resize(4096, 0);
    bytes
}
