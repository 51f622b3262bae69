//! Transcoding to the canonical output format (JPEG)

use crate::error::ItemError;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Decodes any format the `image` crate recognizes and re-encodes it as JPEG
#[derive(Clone, Copy, Debug)]
pub struct Transcoder {
    quality: u8,
}

impl Transcoder {
    /// Create a transcoder with the given JPEG quality (clamped to 1-100)
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    /// Configured JPEG quality
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Decode `data` and re-encode it as JPEG. CPU-bound; see [`Transcoder::transcode`].
    pub fn encode(&self, data: &[u8]) -> Result<Vec<u8>, ItemError> {
        let decoded =
            image::load_from_memory(data).map_err(|e| ItemError::Decode(e.to_string()))?;

        // JPEG has no alpha channel
        let rgb = decoded.to_rgb8();

        let mut out = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut out, self.quality);
        encoder
            .encode(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| ItemError::Encode {
                path: None,
                reason: e.to_string(),
            })?;

        Ok(out)
    }

    /// Run [`Transcoder::encode`] on the blocking thread pool
    pub async fn transcode(&self, data: Bytes) -> Result<Vec<u8>, ItemError> {
        let transcoder = *self;
        tokio::task::spawn_blocking(move || transcoder.encode(&data))
            .await
            .map_err(|e| ItemError::Decode(format!("transcode task failed: {}", e)))?
    }
}

/// Write `data` to `path` all-or-nothing
///
/// The bytes go to a hidden `.<name>.part` sibling first, which is renamed onto
/// `path` once fully written. On failure the partial file is removed and
/// `path` is left untouched.
pub async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), ItemError> {
    let encode_err = |reason: String| ItemError::Encode {
        path: Some(path.to_path_buf()),
        reason,
    };

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| encode_err("output path has no file name".to_string()))?;
    let part_path = path.with_file_name(format!(".{}.part", file_name));

    let result = async {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&part_path)
            .await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&part_path, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&part_path).await;
        return Err(encode_err(e.to_string()));
    }

    Ok(())
}
