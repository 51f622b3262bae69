//! ZIP packaging of processed images

use crate::error::{Error, Result};
use crate::types::ProcessedItem;
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::debug;
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

/// Package every processed item into one in-memory ZIP archive
///
/// Entries are named by their resolved output filename and compressed with
/// Deflate at level 9. Source files are streamed into the writer. A source
/// file that is missing or unreadable fails the whole archive; it is never
/// silently left out.
///
/// This does blocking file I/O; call it from `spawn_blocking`.
pub fn build_archive(items: &[ProcessedItem]) -> Result<Vec<u8>> {
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for item in items {
        let path = &item.output_file_path;

        let mut source = std::fs::File::open(path).map_err(|e| archive_error(path, e))?;

        writer
            .start_file(item.output_filename.as_str(), options)
            .map_err(|e| archive_error(path, e))?;

        let copied = std::io::copy(&mut source, &mut writer).map_err(|e| archive_error(path, e))?;

        debug!(
            entry = %item.output_filename,
            bytes = copied,
            "added archive entry"
        );
    }

    let mut cursor = writer
        .finish()
        .map_err(|e| archive_error(Path::new(""), e))?;
    cursor.flush()?;

    Ok(cursor.into_inner())
}

fn archive_error(path: &Path, reason: impl std::fmt::Display) -> Error {
    Error::Archive {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
