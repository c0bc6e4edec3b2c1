use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::column::Column;
use crate::record::{IdGenerator, Record, Value, MAX_AGE};
use crate::util::parse_leading_int;

/// MIME type of exported files
pub const EXPORT_MIME: &str = "text/csv;charset=utf-8";

/// Row reported for file-level failures
const FILE_ROW: usize = 0;

/// Data rows are reported 1-based, after the header row
const HEADER_OFFSET: usize = 2;

/// A problem found while importing, reported rather than raised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportError {
    pub row: usize,
    pub field: String,
    pub message: String,
}

impl ImportError {
    fn new(row: usize, field: &str, message: &str) -> Self {
        Self {
            row,
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    fn parse_failure() -> Self {
        Self::new(FILE_ROW, "file", "Failed to parse CSV file")
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.row == FILE_ROW {
            write!(f, "{}: {}", self.field, self.message)
        } else {
            write!(f, "Row {} ({}): {}", self.row, self.field, self.message)
        }
    }
}

/// Accepted records plus everything that was wrong with the input
#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
    pub records: Vec<Record>,
    pub errors: Vec<ImportError>,
}

impl ImportOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn failed() -> Self {
        Self {
            records: Vec::new(),
            errors: vec![ImportError::parse_failure()],
        }
    }
}

fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
}

/// `local@domain.tld`: no whitespace, exactly one `@`, a `.` after it
pub fn is_valid_email(s: &str) -> bool {
    email_regex().is_some_and(|re| re.is_match(s))
}

/// Raw cell values of one data row, keyed by normalized header
#[derive(Default)]
struct RowFields<'r> {
    name: Option<&'r str>,
    email: Option<&'r str>,
    age: Option<&'r str>,
    role: Option<&'r str>,
    extra: Vec<(&'r str, &'r str)>,
}

/// Parse CSV text with a header row into validated records
pub fn parse_csv(contents: &str, ids: &mut IdGenerator) -> ImportOutcome {
    parse_csv_reader(contents.as_bytes(), ids)
}

/// Parse CSV from any reader. Malformed input (including invalid UTF-8)
/// yields no records and a single file-level error.
pub fn parse_csv_reader<R: Read>(reader: R, ids: &mut IdGenerator) -> ImportOutcome {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = match csv_reader.headers() {
        Ok(h) => h.iter().map(|s| s.trim().to_lowercase()).collect(),
        Err(e) => {
            warn!(error = %e, "CSV header could not be read");
            return ImportOutcome::failed();
        }
    };

    let mut outcome = ImportOutcome::default();

    for (index, result) in csv_reader.records().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, row = index + HEADER_OFFSET, "CSV parse failed");
                return ImportOutcome::failed();
            }
        };

        let mut fields = RowFields::default();
        for (col, header) in headers.iter().enumerate() {
            let value = row.get(col).unwrap_or("").trim();
            match header.as_str() {
                "name" => fields.name = Some(value),
                "email" => fields.email = Some(value),
                "age" => fields.age = Some(value),
                "role" => fields.role = Some(value),
                // ids always come from the generator
                "id" => {}
                other => fields.extra.push((other, value)),
            }
        }

        let record = validate_row(fields, index + HEADER_OFFSET, ids, &mut outcome.errors);
        if let Some(record) = record {
            outcome.records.push(record);
        }
    }

    info!(
        accepted = outcome.records.len(),
        errors = outcome.errors.len(),
        "CSV import parsed"
    );

    outcome
}

/// Build and validate one record. Returns `None` when name, email or role
/// ended up empty; an invalid age only resets it to 0.
fn validate_row(
    fields: RowFields<'_>,
    row: usize,
    ids: &mut IdGenerator,
    errors: &mut Vec<ImportError>,
) -> Option<Record> {
    let mut record = Record::new(ids.next_id());

    match fields.name.unwrap_or("") {
        "" => errors.push(ImportError::new(row, "name", "Name is required")),
        name => record.name = name.to_string(),
    }

    match fields.email.unwrap_or("") {
        "" => errors.push(ImportError::new(row, "email", "Email is required")),
        email if !is_valid_email(email) => {
            errors.push(ImportError::new(row, "email", "Invalid email format"))
        }
        email => record.email = email.to_string(),
    }

    // a file without an age column leaves every age at 0 silently
    if let Some(raw) = fields.age {
        match parse_leading_int(raw) {
            Some(age) if (0..=i64::from(MAX_AGE)).contains(&age) => record.age = age as u8,
            _ => errors.push(ImportError::new(
                row,
                "age",
                "Age must be a valid number between 0 and 150",
            )),
        }
    }

    match fields.role.unwrap_or("") {
        "" => errors.push(ImportError::new(row, "role", "Role is required")),
        role => record.role = role.to_string(),
    }

    for (key, value) in fields.extra {
        if !value.is_empty() {
            record.extra.insert(key.to_string(), Value::text(value));
        }
    }

    if record.name.is_empty() || record.email.is_empty() || record.role.is_empty() {
        debug!(row, "CSV row rejected");
        return None;
    }

    Some(record)
}

/// Read and parse a CSV file. I/O failures are returned as errors;
/// everything after the read is reported in the outcome.
pub fn import_file(path: &Path, ids: &mut IdGenerator) -> io::Result<ImportOutcome> {
    let bytes = std::fs::read(path)?;
    info!(path = %path.display(), bytes = bytes.len(), "Importing CSV");
    Ok(parse_csv_reader(bytes.as_slice(), ids))
}

/// Write `records` as CSV: one header row of column labels, then each
/// record's value per column id (empty when absent).
pub fn write_export<'r, 'c, W, R, C>(writer: W, records: R, columns: C) -> io::Result<()>
where
    W: Write,
    R: IntoIterator<Item = &'r Record>,
    C: IntoIterator<Item = &'c Column>,
{
    let columns: Vec<&Column> = columns.into_iter().collect();
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);

    csv_writer
        .write_record(columns.iter().map(|c| c.label.as_str()))
        .map_err(io::Error::other)?;

    for record in records {
        let row = columns.iter().map(|c| {
            record
                .get(&c.id)
                .map(|v| v.to_string())
                .unwrap_or_default()
        });
        csv_writer.write_record(row).map_err(io::Error::other)?;
    }

    csv_writer.flush()
}

/// Export to an in-memory CSV string
pub fn export_csv<'r, 'c, R, C>(records: R, columns: C) -> io::Result<String>
where
    R: IntoIterator<Item = &'r Record>,
    C: IntoIterator<Item = &'c Column>,
{
    let mut buf = Vec::new();
    write_export(&mut buf, records, columns)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// `table-export-YYYY-MM-DD.csv`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("table-export-{}.csv", date.format("%Y-%m-%d"))
}

/// Today's date (UTC) as used in export file names
pub fn export_date() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Write an export into `dir`, returning the path of the new file
pub fn write_export_file<'r, 'c, R, C>(
    dir: &Path,
    records: R,
    columns: C,
    date: NaiveDate,
) -> io::Result<PathBuf>
where
    R: IntoIterator<Item = &'r Record>,
    C: IntoIterator<Item = &'c Column>,
{
    let path = dir.join(export_file_name(date));
    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);
    write_export(&mut writer, records, columns)?;
    writer.flush()?;

    info!(path = %path.display(), mime = EXPORT_MIME, "Exported CSV");
    Ok(path)
}
