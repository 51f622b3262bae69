//! CSV intake: turns an uploaded file into the input list
//!
//! The file has no header row. Column 1 is the identifier, column 2 the source
//! URL; further columns are ignored. Fields are trimmed and blank lines are
//! ignored. A row that has content but misses one of the two fields becomes a
//! [`SkippedRow`] so it still gets an outcome record.

use crate::error::{Error, Result};
use crate::types::{InputItem, ParsedInput, SkippedRow};
use std::io::Read;
use std::path::Path;

/// Parse a CSV file from disk
pub async fn parse_csv_file(path: &Path) -> Result<ParsedInput> {
    let content = tokio::fs::read(path).await?;
    parse_csv_reader(content.as_slice())
}

/// Parse CSV records from any reader
pub fn parse_csv_reader<R: Read>(reader: R) -> Result<ParsedInput> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut parsed = ParsedInput::default();

    for result in csv_reader.records() {
        let record = result.map_err(|e| Error::Csv(e.to_string()))?;

        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let identifier = record.get(0).unwrap_or_default();
        let source_url = record.get(1).unwrap_or_default();

        match InputItem::new(identifier, source_url) {
            Ok(item) => parsed.items.push(item),
            Err(reason) => {
                tracing::debug!(line, reason, "skipping malformed CSV row");
                parsed.skipped.push(SkippedRow {
                    line,
                    identifier: identifier.to_string(),
                    source_url: source_url.to_string(),
                    reason: reason.to_string(),
                });
            }
        }
    }

    Ok(parsed)
}
