/// Image file reader
///
/// Loads a user-selected file into a data URL so it can seed a crop session.
/// The file is not validated as an image here; the cropper finds out when it
/// probes the dimensions.

use image::ImageFormat;
use std::path::Path;
use tracing::debug;

use super::data_url::DataUrl;
use crate::error::ImageError;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Read a file into a data URL, rejecting files larger than `max_bytes`
pub async fn read_image_file(path: impl AsRef<Path>, max_bytes: u64) -> Result<DataUrl, ImageError> {
    let path = path.as_ref();

    // Check the size up front so oversized files never get loaded
    let size = tokio::fs::metadata(path).await?.len();
    if size > max_bytes {
        return Err(ImageError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let bytes = tokio::fs::read(path).await?;

    // The file may have grown between the two calls
    if bytes.len() as u64 > max_bytes {
        return Err(ImageError::TooLarge {
            size: bytes.len() as u64,
            limit: max_bytes,
        });
    }

    let mime = guess_mime(path, &bytes);
    debug!("Read {} bytes from {} as {mime}", bytes.len(), path.display());

    Ok(DataUrl::new(mime, bytes))
}

/// MIME type from the extension, then from the content
fn guess_mime(path: &Path, bytes: &[u8]) -> &'static str {
    ImageFormat::from_path(path)
        .or_else(|_| image::guess_format(bytes))
        .map(|format| format.to_mime_type())
        .unwrap_or(FALLBACK_MIME)
}
