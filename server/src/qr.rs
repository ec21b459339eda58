//! QR code rendering to PNG data URIs.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};

pub const DATA_URI_PREFIX: &str = "data:image/png;base64,";
const MIN_SIZE_PX: u32 = 256;

#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("content cannot be encoded as a QR code: {0}")]
    Encode(#[from] qrcode::types::QrError),
    #[error("failed to write PNG: {0}")]
    Png(#[from] image::ImageError),
}

/// Render `content` at medium error correction, at least 256 px square.
pub fn render_png(content: &str) -> Result<Vec<u8>, QrError> {
    let code = QrCode::with_error_correction_level(content.as_bytes(), EcLevel::M)?;
    let img = code
        .render::<Luma<u8>>()
        .min_dimensions(MIN_SIZE_PX, MIN_SIZE_PX)
        .build();

    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Render `content` and wrap the PNG as a `data:image/png;base64,` URI.
pub fn render_data_uri(content: &str) -> Result<String, QrError> {
    let png = render_png(content)?;
    Ok(format!("{DATA_URI_PREFIX}{}", STANDARD.encode(png)))
}

#[cfg(test)]
pub(crate) fn scan_data_uri(uri: &str) -> String {
    let png = STANDARD
        .decode(uri.strip_prefix(DATA_URI_PREFIX).expect("data URI prefix"))
        .expect("valid base64");
    let img = image::load_from_memory(&png).expect("valid PNG").to_luma8();
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        img.width() as usize,
        img.height() as usize,
        |x, y| img.get_pixel(x as u32, y as u32)[0],
    );
    let grids = prepared.detect_grids();
    assert_eq!(grids.len(), 1, "expected exactly one QR code");
    let (_meta, content) = grids[0].decode().expect("decodable QR code");
    content
}
