//! Avatar ingestion: size check, content sniffing, decode, square crop,
//! nearest-neighbour resample to 256×256, JPEG re-encode.
//!
//! [`process`] is pure CPU work and should run on a blocking thread;
//! [`AvatarStore`] handles the file on disk.

mod resample;
pub mod storage;

pub use resample::{CropRect, center_square, resample, source_coord};
pub use storage::AvatarStore;

use image::ImageFormat;
use image::codecs::jpeg::JpegEncoder;
use lions_types::{ForumError, ForumResult};
use tracing::debug;

/// Upload cap, checked against the declared size before anything is read.
pub const MAX_AVATAR_BYTES: u64 = 2 * 1024 * 1024;
/// Output side length in pixels.
pub const AVATAR_SIDE: u32 = 256;
pub const JPEG_QUALITY: u8 = 90;

/// Detect the real image type from its leading bytes. Only JPEG and PNG get
/// through; whatever the client claimed is ignored.
pub fn sniff(bytes: &[u8]) -> ForumResult<ImageFormat> {
    match image::guess_format(bytes) {
        Ok(format @ (ImageFormat::Jpeg | ImageFormat::Png)) => Ok(format),
        _ => Err(ForumError::validation("avatar must be a JPEG or PNG image")),
    }
}

/// Run the whole pipeline and return the JPEG bytes to store.
pub fn process(bytes: &[u8], declared_size: u64) -> ForumResult<Vec<u8>> {
    if declared_size > MAX_AVATAR_BYTES || bytes.len() as u64 > MAX_AVATAR_BYTES {
        return Err(ForumError::validation(format!(
            "avatar larger than {} bytes",
            MAX_AVATAR_BYTES
        )));
    }

    let format = sniff(bytes)?;
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ForumError::validation(format!("could not decode image: {}", e)))?;
    debug!(
        "Decoded {:?} avatar {}x{}",
        format,
        decoded.width(),
        decoded.height()
    );

    let square = resample(&decoded.to_rgb8(), AVATAR_SIDE);

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&square)
        .map_err(|e| ForumError::storage(anyhow::anyhow!("JPEG encode failed: {}", e)))?;
    Ok(out)
}
