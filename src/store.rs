//! Record store: the in-memory email table loaded from a CSV export.
//!
//! The store is populated once per load action and fully replaced on each
//! subsequent load. A failed load never partially populates it: rows are
//! accumulated into a fresh `RecordStore` and the caller only swaps it in
//! on success.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Columns the export must carry. Anything else in the file is ignored.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "Cleaned_Body",
    "Date Sent",
    "Subject",
    "From (display)",
    "To (display)",
];

#[derive(Debug, Clone)]
pub struct Email {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub subject: Option<String>,
    /// Original cell text, kept so unparseable dates still display something.
    pub date_raw: Option<String>,
    /// Parsed timestamp; `None` is the sentinel "invalid date" and sorts
    /// after every valid date.
    pub date_sent: Option<NaiveDateTime>,
    pub body: Option<String>,
}

impl Email {
    /// Date Sent as shown in the detail panel: parsed dates use the fixed
    /// two-digit format, unparseable-but-present cells fall back to the raw
    /// text, absent cells render "N/A".
    pub fn date_display(&self) -> String {
        match (&self.date_sent, &self.date_raw) {
            (Some(dt), _) => dt.format("%m/%d/%y %H:%M:%S").to_string(),
            (None, Some(raw)) => raw.clone(),
            (None, None) => "N/A".to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordStore {
    pub emails: Vec<Email>,
}

impl RecordStore {
    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

/// Load a CSV export into a fresh store.
///
/// Required columns are resolved by exact header name; a missing one fails
/// the whole load. Rows shorter than the header are tolerated (missing
/// cells become `None`), and non-UTF-8 bytes are decoded as Windows-1252 so
/// Latin-1 exports never abort the load.
pub fn load_csv(path: &Path) -> Result<RecordStore> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers = reader
        .byte_headers()
        .with_context(|| format!("failed to read header row of {}", path.display()))?
        .clone();
    let header_names: Vec<String> = headers.iter().map(decode_field).collect();

    let column = |name: &str| -> Result<usize> {
        header_names
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("missing required column `{name}`"))
    };
    let mut cols = [0usize; 5];
    for (slot, name) in cols.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = column(name)?;
    }
    let [body_col, date_col, subject_col, from_col, to_col] = cols;

    let mut emails = Vec::new();
    for (row, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("failed to read row {}", row + 1))?;
        // Empty cells map to None, mirroring the original export's NaN cells.
        let cell = |col: usize| -> Option<String> {
            record
                .get(col)
                .map(decode_field)
                .filter(|s| !s.is_empty())
        };

        let date_raw = cell(date_col);
        let date_sent = date_raw.as_deref().and_then(parse_date);
        emails.push(Email {
            sender: cell(from_col),
            recipient: cell(to_col),
            subject: cell(subject_col),
            date_raw,
            date_sent,
            body: cell(body_col),
        });
    }

    Ok(RecordStore { emails })
}

/// Decode one CSV field, falling back to Windows-1252 for non-UTF-8 bytes.
fn decode_field(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"];

/// Parse a "Date Sent" cell. Exports are inconsistent, so try the common
/// email and spreadsheet formats in turn; anything that still fails is the
/// sentinel invalid date (`None`), never a hard error.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}
