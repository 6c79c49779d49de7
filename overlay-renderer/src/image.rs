//! Image payload probing and decoding.
//!
//! Element payloads are kept encoded in the store. They are only decoded here,
//! when the export pipeline needs pixels (PNG) or header facts (JPEG).

use std::io::Cursor;

use image::{codecs::jpeg::JpegDecoder, ColorType, ImageDecoder};
use overlay_core::ImageFormat;

use crate::error::{RenderError, RenderResult};

/// Decoded RGBA8 pixels of an image payload.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA pixel data (4 bytes per pixel).
    pub data: Vec<u8>,
    /// Original format of the payload.
    pub format: ImageFormat,
}

impl DecodedImage {
    /// Split into packed RGB and an alpha channel.
    ///
    /// The alpha channel is `None` when every pixel is opaque.
    #[must_use]
    pub fn split_alpha(&self) -> (Vec<u8>, Option<Vec<u8>>) {
        let pixels = self.data.len() / 4;
        let mut rgb = Vec::with_capacity(pixels * 3);
        let mut alpha = Vec::with_capacity(pixels);
        for pixel in self.data.chunks_exact(4) {
            rgb.extend_from_slice(&pixel[..3]);
            alpha.push(pixel[3]);
        }
        let translucent = alpha.iter().any(|a| *a != u8::MAX);
        (rgb, translucent.then_some(alpha))
    }
}

/// Header facts of a JPEG payload, enough to embed it without re-encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Whether the image has a single gray channel.
    pub grayscale: bool,
}

/// Detect the payload format from its magic bytes.
///
/// # Errors
///
/// Returns [`RenderError::UnsupportedImageFormat`] for anything but PNG or JPEG.
pub fn detect_format(data: &[u8]) -> RenderResult<ImageFormat> {
    ImageFormat::detect(data).map_err(|e| RenderError::UnsupportedImageFormat(e.to_string()))
}

/// Decode a PNG or JPEG payload to RGBA8.
///
/// # Errors
///
/// Returns [`RenderError::UnsupportedImageFormat`] for other formats, or
/// [`RenderError::Export`] if the payload cannot be decoded.
pub fn load_image_from_bytes(data: &[u8]) -> RenderResult<DecodedImage> {
    let format = detect_format(data)?;
    let img = image::load_from_memory(data)
        .map_err(|e| RenderError::export("Failed to decode image", e))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(DecodedImage {
        width,
        height,
        data: rgba.into_raw(),
        format,
    })
}

/// Read the dimensions and color layout of a JPEG payload.
///
/// # Errors
///
/// Returns [`RenderError::Export`] if the JPEG header cannot be read.
pub fn jpeg_info(data: &[u8]) -> RenderResult<JpegInfo> {
    let decoder = JpegDecoder::new(Cursor::new(data))
        .map_err(|e| RenderError::export("Failed to read JPEG header", e))?;
    let (width, height) = decoder.dimensions();
    Ok(JpegInfo {
        width,
        height,
        grayscale: matches!(decoder.color_type(), ColorType::L8 | ColorType::L16),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(image: &image::DynamicImage, format: image::ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), format)
            .expect("encode");
        bytes
    }

    #[test]
    fn test_png_decodes_with_alpha() {
        let mut img = image::RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255]));
        img.put_pixel(0, 0, image::Rgba([0, 0, 0, 0]));
        let png = encode(&image::DynamicImage::ImageRgba8(img), image::ImageFormat::Png);

        let decoded = load_image_from_bytes(&png).expect("decode");
        assert_eq!((decoded.width, decoded.height), (4, 2));
        assert_eq!(decoded.format, ImageFormat::Png);

        let (rgb, alpha) = decoded.split_alpha();
        assert_eq!(rgb.len(), 4 * 2 * 3);
        assert_eq!(alpha.expect("alpha")[0], 0);
    }

    #[test]
    fn test_opaque_png_has_no_alpha_channel() {
        let img = image::RgbaImage::from_pixel(3, 3, image::Rgba([1, 2, 3, 255]));
        let png = encode(&image::DynamicImage::ImageRgba8(img), image::ImageFormat::Png);
        let (_, alpha) = load_image_from_bytes(&png).expect("decode").split_alpha();
        assert!(alpha.is_none());
    }

    #[test]
    fn test_jpeg_header() {
        let img = image::GrayImage::from_pixel(16, 8, image::Luma([128]));
        let jpeg = encode(&image::DynamicImage::ImageLuma8(img), image::ImageFormat::Jpeg);
        let info = jpeg_info(&jpeg).expect("jpeg info");
        assert_eq!((info.width, info.height), (16, 8));
        assert!(info.grayscale);
    }

    #[test]
    fn test_unknown_payload_is_unsupported() {
        assert!(matches!(
            load_image_from_bytes(b"GIF89a\x01\x00"),
            Err(RenderError::UnsupportedImageFormat(_))
        ));
    }
}
