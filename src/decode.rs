use csv::{ReaderBuilder, StringRecord};

use crate::post::Record;

const UTF8_BOM: char = '\u{feff}';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("feed body is not valid UTF-8")]
    Utf8,
    #[error("feed has no header row")]
    MissingHeader,
    #[error("malformed feed: {0}")]
    Csv(String),
}

impl From<csv::Error> for DecodeError {
    fn from(err: csv::Error) -> Self {
        DecodeError::Csv(err.to_string())
    }
}

pub fn decode_bytes(bytes: &[u8]) -> Result<Vec<Record>, DecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::Utf8)?;
    decode(text)
}

/// Decodes CSV text whose first row names the fields. Ragged rows are
/// padded with empty strings; surplus cells are dropped.
pub fn decode(text: &str) -> Result<Vec<Record>, DecodeError> {
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
    if text.trim().is_empty() {
        return Err(DecodeError::MissingHeader);
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.iter().all(|name| name.trim().is_empty()) {
        return Err(DecodeError::MissingHeader);
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if is_blank(&row) {
            continue;
        }
        records.push(to_record(&headers, &row));
    }
    Ok(records)
}

fn is_blank(row: &StringRecord) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

fn to_record(headers: &StringRecord, row: &StringRecord) -> Record {
    let mut record = Record::with_capacity(headers.len());
    for (index, name) in headers.iter().enumerate() {
        // Duplicate headers keep the leftmost column.
        record
            .entry(name.to_string())
            .or_insert_with(|| row.get(index).unwrap_or_default().to_string());
    }
    record
}
