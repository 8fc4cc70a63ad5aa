use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::recipe::Recipe;

/// Uploads above this size are refused before they reach a model.
pub const MAX_IMAGE_BYTES: usize = 20_000_000;

/// Longest label we accept from the vision model, in characters.
pub const MAX_LABEL_CHARS: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    #[strum(serialize = "image/jpeg")]
    Jpeg,
    #[strum(serialize = "image/png")]
    Png,
}

impl ImageKind {
    pub fn mime_type(&self) -> &'static str {
        self.into()
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum UnsupportedImage {
    #[error("The image is empty")]
    Empty,
    #[error("Image is too large ({size} bytes, at most {MAX_IMAGE_BYTES} allowed)")]
    TooLarge { size: usize },
    #[error("Could not recognise the image format")]
    Unrecognised,
    #[error("Unsupported image format {0}. Allowed: JPEG, PNG")]
    Format(String),
}

/// A photo uploaded by the user, held only for the duration of one request.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    kind: ImageKind,
    bytes: Vec<u8>,
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("kind", &self.kind)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl ImagePayload {
    /// Check the magic bytes and wrap the upload.
    ///
    /// Only JPEG and PNG are accepted, the same as the upload form offers.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, UnsupportedImage> {
        if bytes.is_empty() {
            return Err(UnsupportedImage::Empty);
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(UnsupportedImage::TooLarge { size: bytes.len() });
        }
        let kind = match image::guess_format(&bytes) {
            Ok(image::ImageFormat::Jpeg) => ImageKind::Jpeg,
            Ok(image::ImageFormat::Png) => ImageKind::Png,
            Ok(other) => return Err(UnsupportedImage::Format(format!("{:?}", other))),
            Err(_) => return Err(UnsupportedImage::Unrecognised),
        };
        Ok(Self { kind, bytes })
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn mime_type(&self) -> &'static str {
        self.kind.mime_type()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LabelError {
    #[error("The model did not name a food")]
    Empty,
    #[error("The model replied with {chars} characters instead of a food name")]
    TooLong { chars: usize },
}

/// The name of one identified food, e.g. "cinnamon stick".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FoodLabel(String);

impl FoodLabel {
    /// Normalize a vision model reply into a label.
    ///
    /// Models like to decorate a one word answer, so we keep only the first
    /// non-blank line and strip quotes and a trailing period.
    pub fn parse(raw: &str) -> Result<Self, LabelError> {
        let line = raw
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default();
        // Decorations nest, e.g. `"Apple".`, so peel until nothing changes
        let mut label = line;
        loop {
            let peeled = label
                .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*'))
                .trim_end_matches('.')
                .trim();
            if peeled == label {
                break;
            }
            label = peeled;
        }
        if label.is_empty() {
            return Err(LabelError::Empty);
        }
        let chars = label.chars().count();
        if chars > MAX_LABEL_CHARS {
            return Err(LabelError::TooLong { chars });
        }
        Ok(Self(label.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FoodLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IllustrationStyle {
    Photographic,
    Illustrated,
}

impl IllustrationStyle {
    pub const ALL: [IllustrationStyle; 2] = [Self::Photographic, Self::Illustrated];

    /// Caption shown under the image on the result page
    pub fn caption(&self) -> &'static str {
        match self {
            Self::Photographic => "Recipe Image",
            Self::Illustrated => "Recipe Drawing",
        }
    }
}

/// A generated image, hosted by the model provider for a limited time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImageRef {
    pub style: IllustrationStyle,
    pub url: String,
}

impl GeneratedImageRef {
    pub fn caption(&self) -> &'static str {
        self.style.caption()
    }
}

/// Everything produced by one run of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeResult {
    pub foods: [FoodLabel; 2],
    pub recipe: Recipe,
    pub photo: Option<GeneratedImageRef>,
    pub drawing: Option<GeneratedImageRef>,
}

impl RecipeResult {
    /// The images that were generated, photo first.
    pub fn images(&self) -> impl Iterator<Item = &GeneratedImageRef> {
        self.photo.iter().chain(self.drawing.iter())
    }

    /// Whether both illustrations are present
    pub fn is_complete(&self) -> bool {
        self.photo.is_some() && self.drawing.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_MAGIC: &[u8] = b"\xff\xd8\xff\xe0\0\x10JFIF\0";

    #[test]
    fn sniffs_png_and_jpeg() {
        let png = ImagePayload::from_bytes(PNG_MAGIC.to_vec()).unwrap();
        assert_eq!(png.kind(), ImageKind::Png);
        assert_eq!(png.mime_type(), "image/png");
        let jpeg = ImagePayload::from_bytes(JPEG_MAGIC.to_vec()).unwrap();
        assert_eq!(jpeg.mime_type(), "image/jpeg");
    }

    #[test]
    fn rejects_empty_and_unknown_uploads() {
        assert_eq!(ImagePayload::from_bytes(vec![]), Err(UnsupportedImage::Empty));
        assert_eq!(
            ImagePayload::from_bytes(b"just some text".to_vec()),
            Err(UnsupportedImage::Unrecognised)
        );
        assert!(matches!(
            ImagePayload::from_bytes(b"GIF89a\x01\0\x01\0".to_vec()),
            Err(UnsupportedImage::Format(_))
        ));
    }

    #[test]
    fn rejects_oversized_uploads() {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.resize(MAX_IMAGE_BYTES + 1, 0);
        assert!(matches!(
            ImagePayload::from_bytes(bytes),
            Err(UnsupportedImage::TooLarge { .. })
        ));
    }

    #[test]
    fn debug_does_not_dump_bytes() {
        let png = ImagePayload::from_bytes(PNG_MAGIC.to_vec()).unwrap();
        assert_eq!(
            format!("{:?}", png),
            format!("ImagePayload {{ kind: Png, bytes: {} }}", PNG_MAGIC.len())
        );
    }

    #[test]
    fn labels_are_cleaned_up() {
        assert_eq!(FoodLabel::parse("  Apple\n").unwrap().as_str(), "Apple");
        assert_eq!(
            FoodLabel::parse("\n\"Cinnamon stick.\"\nIt is a spice.").unwrap().as_str(),
            "Cinnamon stick"
        );
        assert_eq!(FoodLabel::parse("**Croissant**").unwrap().as_str(), "Croissant");
        assert_eq!(FoodLabel::parse("\"Apple\".").unwrap().as_str(), "Apple");
        assert_eq!(FoodLabel::parse("*'Lemon.'*.").unwrap().as_str(), "Lemon");
    }

    #[test]
    fn bad_labels_are_rejected() {
        assert_eq!(FoodLabel::parse("   \n  "), Err(LabelError::Empty));
        assert_eq!(FoodLabel::parse("\"\"."), Err(LabelError::Empty));
        let rambling = "a".repeat(MAX_LABEL_CHARS + 1);
        assert_eq!(
            FoodLabel::parse(&rambling),
            Err(LabelError::TooLong { chars: MAX_LABEL_CHARS + 1 })
        );
    }

    #[test]
    fn captions_follow_style() {
        assert_eq!(IllustrationStyle::Photographic.caption(), "Recipe Image");
        assert_eq!(IllustrationStyle::Illustrated.caption(), "Recipe Drawing");
        assert_eq!(IllustrationStyle::Illustrated.to_string(), "illustrated");
    }
}
