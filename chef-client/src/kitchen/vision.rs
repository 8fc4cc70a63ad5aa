use std::io::Cursor;

use base64::Engine;
use chef::ImagePayload;
use image::{imageops::FilterType, DynamicImage, ImageReader};

use super::gateway::GatewayError;

/// Longest side we bother sending to a vision model.
pub const MAX_UPLOAD_SIDE: u32 = 2048;

/// Wrap image bytes in a data URL.
fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        // For the purpose of data urls, you do NOT need to use the URL_SAFE variant
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Save a DynamicImage as lossy webp.
///
/// The image crate only writes lossless webp, the webp crate does lossy.
pub fn convert_to_webp(img: &DynamicImage, quality: f32) -> Result<Vec<u8>, GatewayError> {
    let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
    let img_webp = webp::Encoder::from_image(&rgba)
        .map_err(|st| GatewayError::Image(format!("Webp encoder error: {}", st)))?
        .encode(quality);
    Ok(img_webp.to_vec())
}

/// Prepare an upload for a vision model as a data URL.
///
/// Phone photos are often far larger than the model looks at, so anything
/// over [`MAX_UPLOAD_SIDE`] is shrunk and re-encoded as webp first.
pub fn image_data_url(image: &ImagePayload) -> Result<String, GatewayError> {
    let (width, height) = ImageReader::new(Cursor::new(image.bytes()))
        .with_guessed_format()
        .map_err(|e| GatewayError::Image(e.to_string()))?
        .into_dimensions()
        .map_err(|e| GatewayError::Image(e.to_string()))?;
    if width <= MAX_UPLOAD_SIDE && height <= MAX_UPLOAD_SIDE {
        return Ok(to_data_url(image.mime_type(), image.bytes()));
    }
    tracing::warn!(
        "Image is larger than it needs to be ({w}x{h}), shrinking before upload.",
        w = width,
        h = height
    );
    let img = image::load_from_memory(image.bytes()).map_err(|e| GatewayError::Image(e.to_string()))?;
    let img = img.resize(MAX_UPLOAD_SIDE, MAX_UPLOAD_SIDE, FilterType::Lanczos3);
    let img_webp = convert_to_webp(&img, 80.0)?;
    Ok(to_data_url("image/webp", &img_webp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    fn png(width: u32, height: u32) -> ImagePayload {
        let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        ImagePayload::from_bytes(buf.into_inner()).unwrap()
    }

    #[test]
    fn small_images_are_sent_as_is() {
        let image = png(16, 8);
        let url = image_data_url(&image).unwrap();
        let expected = base64::engine::general_purpose::STANDARD.encode(image.bytes());
        assert_eq!(url, format!("data:image/png;base64,{}", expected));
    }

    #[test]
    fn large_images_are_shrunk_to_webp() {
        let image = png(MAX_UPLOAD_SIDE * 2, 10);
        let url = image_data_url(&image).unwrap();
        let encoded = url.strip_prefix("data:image/webp;base64,").unwrap();
        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
        let shrunk = image::load_from_memory_with_format(&bytes, ImageFormat::WebP).unwrap();
        assert_eq!(shrunk.width(), MAX_UPLOAD_SIDE);
    }

    #[test]
    fn truncated_images_are_an_error() {
        let image = ImagePayload::from_bytes(b"\x89PNG\r\n\x1a\n".to_vec()).unwrap();
        assert!(matches!(image_data_url(&image), Err(GatewayError::Image(_))));
    }
}
