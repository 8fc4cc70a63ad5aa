use axum::extract::Multipart;
use chef::ImagePayload;

use crate::errors::{WebError, WebResult};

/// Form field names for the two photos, and how the page labels them.
const FIELDS: [(&str, &str); 2] = [("image1", "First ingredient"), ("image2", "Second ingredient")];

/// Pull the two photos out of an upload form.
///
/// Browsers send an empty part for a file input left blank, so empty fields
/// count as missing. Unknown fields are skipped.
pub async fn read_pair(mut multipart: Multipart) -> WebResult<(ImagePayload, ImagePayload)> {
    let mut images: [Option<ImagePayload>; 2] = [None, None];
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WebError::BadUpload(e.body_text()))?
    {
        let Some(slot) = FIELDS
            .iter()
            .position(|(name, _)| field.name() == Some(*name))
        else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| WebError::BadUpload(e.body_text()))?;
        if bytes.is_empty() {
            continue;
        }
        let payload = ImagePayload::from_bytes(bytes.to_vec())
            .map_err(|e| WebError::BadUpload(format!("{}: {}", FIELDS[slot].1, e)))?;
        tracing::debug!(field = FIELDS[slot].0, ?payload, "Received photo");
        images[slot] = Some(payload);
    }
    match images {
        [Some(first), Some(second)] => Ok((first, second)),
        _ => Err(WebError::BadUpload(
            "Please upload a photo of each ingredient.".to_string(),
        )),
    }
}
