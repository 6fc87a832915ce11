//! Reading interaction logs from delimited text.
//!
//! Single-byte delimiters are handled by the `csv` crate. Multi-character
//! delimiters, such as the `::` used by the MovieLens 1M ratings file, are
//! handled by splitting lines directly. Both paths apply the same rules:
//! blank and whitespace-only lines are skipped, the header (if any) is the
//! first non-blank line, fields are trimmed and surrounding double quotes
//! are removed.
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use csv;

use data::RawInteraction;

/// Errors raised while reading an interaction log.
#[derive(Debug, Fail)]
pub enum ParseError {
    /// A row has fewer fields than the configured columns require.
    #[fail(
        display = "Line {}: expected at least {} fields, found {}.",
        line, expected, found
    )]
    MissingField {
        /// 1-based line number.
        line: usize,
        /// Number of fields required.
        expected: usize,
        /// Number of fields present.
        found: usize,
    },
    /// A field could not be parsed.
    #[fail(display = "Line {}: invalid {} {:?}.", line, field, value)]
    InvalidField {
        /// 1-based line number.
        line: usize,
        /// Name of the column.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// The configured delimiter is empty.
    #[fail(display = "Delimiter must not be empty.")]
    EmptyDelimiter,
    /// Reading the underlying source failed.
    #[fail(display = "I/O error: {}", _0)]
    Io(#[cause] io::Error),
    /// The csv reader failed.
    #[fail(display = "CSV error: {}", _0)]
    Csv(#[cause] csv::Error),
}

impl From<io::Error> for ParseError {
    fn from(err: io::Error) -> Self {
        ParseError::Io(err)
    }
}

impl From<csv::Error> for ParseError {
    fn from(err: csv::Error) -> Self {
        ParseError::Csv(err)
    }
}

/// Zero-based column positions of the four interaction fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Columns {
    /// User identifier column.
    pub user: usize,
    /// Item identifier column.
    pub item: usize,
    /// Rating column.
    pub rating: usize,
    /// Timestamp column.
    pub timestamp: usize,
}

impl Columns {
    fn num_required(&self) -> usize {
        1 + *[self.user, self.item, self.rating, self.timestamp]
            .iter()
            .max()
            .unwrap_or(&0)
    }
}

impl Default for Columns {
    fn default() -> Self {
        Columns {
            user: 0,
            item: 1,
            rating: 2,
            timestamp: 3,
        }
    }
}

/// Layout of a delimited interaction log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReaderConfig {
    delimiter: String,
    has_headers: bool,
    columns: Columns,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig::new()
    }
}

impl ReaderConfig {
    /// Comma-delimited, no header row, columns in
    /// `user, item, rating, timestamp` order.
    pub fn new() -> Self {
        ReaderConfig {
            delimiter: ",".to_owned(),
            has_headers: false,
            columns: Columns::default(),
        }
    }

    /// Layout of the MovieLens 1M `ratings.dat` file.
    pub fn movielens() -> Self {
        ReaderConfig::new().delimiter("::")
    }

    /// Set the field delimiter.
    pub fn delimiter(mut self, delimiter: &str) -> Self {
        self.delimiter = delimiter.to_owned();
        self
    }

    /// Set whether the first row is a header.
    pub fn has_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    /// Set the column positions.
    pub fn columns(mut self, columns: Columns) -> Self {
        self.columns = columns;
        self
    }
}

fn parse_field<T: FromStr>(line: usize, field: &'static str, value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidField {
        line,
        field,
        value: value.to_owned(),
    })
}

fn parse_rating(line: usize, value: &str) -> Result<f32, ParseError> {
    let rating: f32 = parse_field(line, "rating", value)?;

    if !rating.is_finite() {
        return Err(ParseError::InvalidField {
            line,
            field: "rating",
            value: value.to_owned(),
        });
    }

    Ok(rating)
}

fn parse_identifier(line: usize, field: &'static str, value: &str) -> Result<String, ParseError> {
    if value.is_empty() {
        return Err(ParseError::InvalidField {
            line,
            field,
            value: value.to_owned(),
        });
    }

    Ok(value.to_owned())
}

fn parse_fields(line: usize, fields: &[&str], columns: &Columns) -> Result<RawInteraction, ParseError> {
    let expected = columns.num_required();

    if fields.len() < expected {
        return Err(ParseError::MissingField {
            line,
            expected,
            found: fields.len(),
        });
    }

    Ok(RawInteraction {
        user_id: parse_identifier(line, "user_id", fields[columns.user].trim())?,
        item_id: parse_identifier(line, "item_id", fields[columns.item].trim())?,
        rating: parse_rating(line, fields[columns.rating].trim())?,
        timestamp: parse_field(line, "timestamp", fields[columns.timestamp].trim())?,
    })
}

fn read_with_csv<R: Read>(
    reader: R,
    delimiter: u8,
    config: &ReaderConfig,
) -> Result<Vec<RawInteraction>, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut interactions = Vec::new();
    let mut header_pending = config.has_headers;

    for (idx, record) in reader.records().enumerate() {
        let record = record?;

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        if header_pending {
            header_pending = false;
            continue;
        }

        let line = record
            .position()
            .map_or(idx + 1, |position| position.line() as usize);
        let fields: Vec<&str> = record.iter().collect();

        interactions.push(parse_fields(line, &fields, &config.columns)?);
    }

    Ok(interactions)
}

/// Strip one pair of surrounding double quotes, undoubling inner quotes.
fn unquote(field: &str) -> Cow<str> {
    let trimmed = field.trim();

    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        Cow::Owned(trimmed[1..trimmed.len() - 1].replace("\"\"", "\""))
    } else {
        Cow::Borrowed(trimmed)
    }
}

fn read_with_splitter<R: Read>(
    reader: R,
    config: &ReaderConfig,
) -> Result<Vec<RawInteraction>, ParseError> {
    let mut interactions = Vec::new();
    let mut header_pending = config.has_headers;

    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;

        if line.trim().is_empty() {
            continue;
        }

        if header_pending {
            header_pending = false;
            continue;
        }

        let fields: Vec<Cow<str>> = line.split(config.delimiter.as_str()).map(unquote).collect();
        let fields: Vec<&str> = fields.iter().map(|field| field.as_ref()).collect();
        interactions.push(parse_fields(idx + 1, &fields, &config.columns)?);
    }

    Ok(interactions)
}

/// Read every row of a delimited interaction log.
///
/// The first malformed row aborts the read.
pub fn read_interactions<R: Read>(
    reader: R,
    config: &ReaderConfig,
) -> Result<Vec<RawInteraction>, ParseError> {
    let interactions = match config.delimiter.as_bytes() {
        [] => return Err(ParseError::EmptyDelimiter),
        &[delimiter] => read_with_csv(reader, delimiter, config)?,
        _ => read_with_splitter(reader, config)?,
    };

    info!("Read {} interactions", interactions.len());

    Ok(interactions)
}

/// Read every row of the delimited interaction log at `path`.
pub fn read_interactions_from_path<P: AsRef<Path>>(
    path: P,
    config: &ReaderConfig,
) -> Result<Vec<RawInteraction>, ParseError> {
    let file = File::open(path.as_ref())?;

    read_interactions(BufReader::new(file), config)
}
