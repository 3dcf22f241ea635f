//! Image decoding: payload unwrapping and raster conversion.
//!
//! Accepts the raw upload as received by the caller. Three payload shapes
//! are understood:
//!
//! - raw image bytes (PNG, JPEG, GIF, WebP),
//! - a `data:image/...;base64,` URI,
//! - bare base64 text.
//!
//! This is the first step in the pipeline: payload in, `RgbImage` out.

use std::borrow::Cow;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::RgbImage;

use crate::format::{ImageFormat, sniff_format};
use crate::types::{Dimensions, GradeError};

/// A decoded raster plus the bookkeeping the upload boundary needs.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// The 3-channel raster every later stage reads.
    pub image: RgbImage,
    /// Container format sniffed from the unwrapped bytes.
    pub format: ImageFormat,
    /// Media type declared in a data URI header, if the payload was one.
    pub declared_mime: Option<String>,
    /// Size of the image bytes after base64 unwrapping.
    pub payload_len: usize,
}

impl DecodedImage {
    /// Raster dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }
}

/// Decode an upload payload into an RGB raster.
///
/// # Errors
///
/// Returns [`GradeError::EmptyInput`] if `bytes` is empty (after trimming
/// whitespace) or decodes to a zero-area image.
/// Returns [`GradeError::MalformedDataUri`] for a `data:` URI without a
/// `,` separator.
/// Returns [`GradeError::Base64`] if base64 text fails to decode.
/// Returns [`GradeError::ImageDecode`] if the bytes are not a decodable
/// raster image.
pub fn decode(bytes: &[u8]) -> Result<DecodedImage, GradeError> {
    let (payload, declared_mime) = unwrap_payload(bytes)?;
    if payload.is_empty() {
        return Err(GradeError::EmptyInput);
    }

    let format = sniff_format(&payload);
    let image = image::load_from_memory(&payload)?.to_rgb8();
    if image.width() == 0 || image.height() == 0 {
        return Err(GradeError::EmptyInput);
    }

    Ok(DecodedImage {
        image,
        format,
        declared_mime,
        payload_len: payload.len(),
    })
}

/// Strip data URI framing and base64 encoding, borrowing raw input as-is.
fn unwrap_payload(bytes: &[u8]) -> Result<(Cow<'_, [u8]>, Option<String>), GradeError> {
    let trimmed = bytes.trim_ascii();
    if trimmed.is_empty() {
        return Err(GradeError::EmptyInput);
    }

    if let Some(rest) = trimmed.strip_prefix(b"data:") {
        let comma = rest
            .iter()
            .position(|&b| b == b',')
            .ok_or(GradeError::MalformedDataUri)?;
        let header = &rest[..comma];
        let mime_end = header.iter().position(|&b| b == b';').unwrap_or(header.len());
        let mime = String::from_utf8_lossy(&header[..mime_end]).into_owned();
        let decoded = decode_base64(&rest[comma + 1..])?;
        return Ok((Cow::Owned(decoded), Some(mime).filter(|m| !m.is_empty())));
    }

    if sniff_format(trimmed).is_known() || !looks_like_base64(trimmed) {
        return Ok((Cow::Borrowed(bytes), None));
    }

    Ok((Cow::Owned(decode_base64(trimmed)?), None))
}

fn looks_like_base64(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| {
        b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=') || b.is_ascii_whitespace()
    })
}

fn decode_base64(text: &[u8]) -> Result<Vec<u8>, GradeError> {
    let compact: Vec<u8> = text
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    Ok(STANDARD.decode(compact)?)
}
