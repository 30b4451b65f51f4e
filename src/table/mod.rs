// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The redirect table.
//!
//! A [`RedirectTable`] is built exactly once from a tabular source and is
//! read-only afterwards, so the request path can share it behind an `Arc`
//! without any locking.
//!
//! ## CSV sources
//!
//! ```text
//! from,to
//! /old,/new
//! "/with,comma",/b
//! ```
//!
//! * the first row is a header and is always skipped;
//! * column 0 is the request path, column 1 the destination, extra columns
//!   are ignored;
//! * a later row for the same path replaces an earlier one;
//! * every row must have the same number of fields as the header;
//! * a quote may only open a field, and every opened quote must be closed.


use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use hyper::header::HeaderValue;

use crate::core::RedirError;
use crate::{debug_fmt, error_fmt};

/// Separator used when none is configured.
pub const DEFAULT_SEPARATOR: char = ',';

/// Formats a redirect source can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Delimited text with a header row
    Csv,
}

impl FromStr for SourceFormat {
    type Err = RedirError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "csv" => Ok(SourceFormat::Csv),
            other => Err(RedirError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Check that `separator` can delimit CSV fields and return it as a byte.
///
/// Only single-byte ASCII characters are accepted, excluding the quote
/// character and line breaks.
pub fn separator_byte(separator: char) -> Result<u8, RedirError> {
    match u8::try_from(separator) {
        Ok(b'"') | Ok(b'\r') | Ok(b'\n') => Err(RedirError::ConfigurationError(format!(
            "csv_separator {separator:?} cannot be used as a field delimiter"
        ))),
        Ok(byte) if byte.is_ascii() => Ok(byte),
        _ => Err(RedirError::ConfigurationError(format!(
            "csv_separator {separator:?} must be a single ASCII character"
        ))),
    }
}

/// A single destination, kept both as text and as a ready `Location` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    target: String,
    location: HeaderValue,
}

impl Redirect {
    fn new(locator: &str, from: &str, target: &str) -> Result<Self, RedirError> {
        let escaped = escape_non_ascii(target);
        let location = HeaderValue::from_str(&escaped).map_err(|_| {
            RedirError::malformed(
                locator,
                format!("destination for {from:?} is not a valid Location value: {target:?}"),
            )
        })?;

        Ok(Self {
            target: target.to_string(),
            location,
        })
    }

    /// The destination exactly as written in the source.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The destination as sent in the `Location` header.
    pub fn location(&self) -> &HeaderValue {
        &self.location
    }
}

/// Immutable mapping from request path to redirect destination.
#[derive(Debug, Clone)]
pub struct RedirectTable {
    locator: String,
    separator: char,
    entries: HashMap<String, Redirect>,
}

impl RedirectTable {
    /// Build a table from the file at `path`, parsed according to `format`.
    ///
    /// The file is opened before the format is resolved, so a missing file is
    /// always reported as [`RedirError::ResourceUnavailable`].
    pub fn load<P: AsRef<Path>>(
        path: P,
        format: &str,
        separator: char,
    ) -> Result<Self, RedirError> {
        let path = path.as_ref();
        let locator = path.display().to_string();

        let file = File::open(path).map_err(|source| {
            error_fmt!("RedirectTable", "Cannot open {}: {}", locator, source);
            RedirError::ResourceUnavailable {
                locator: locator.clone(),
                source,
            }
        })?;

        match format.parse::<SourceFormat>()? {
            SourceFormat::Csv => Self::from_reader(file, separator, &locator),
        }
    }

    /// Build a table from CSV read out of `reader`.
    ///
    /// `locator` only names the source in errors and logs.
    pub fn from_reader<R: Read>(
        mut reader: R,
        separator: char,
        locator: &str,
    ) -> Result<Self, RedirError> {
        let delimiter = separator_byte(separator)?;

        let mut content = Vec::new();
        reader.read_to_end(&mut content).map_err(|source| {
            error_fmt!("RedirectTable", "Read error on {}: {}", locator, source);
            RedirError::ResourceUnavailable {
                locator: locator.to_string(),
                source,
            }
        })?;

        check_quoting(&content, delimiter).map_err(|message| {
            let err = RedirError::malformed(locator, message);
            error_fmt!("RedirectTable", "{}", err);
            err
        })?;

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(false)
            .from_reader(content.as_slice());

        let mut entries = HashMap::new();
        for (index, record) in csv_reader.records().enumerate() {
            let record = record.map_err(|e| csv_error(locator, e))?;

            // header row
            if index == 0 {
                continue;
            }

            let (Some(from), Some(to)) = (record.get(0), record.get(1)) else {
                let line = record
                    .position()
                    .map_or(index as u64 + 1, |p| p.line());
                return Err(RedirError::malformed(
                    locator,
                    format!("record on line {line}: expected at least 2 fields, found {}", record.len()),
                ));
            };

            let redirect = Redirect::new(locator, from, to)?;
            if entries.insert(from.to_string(), redirect).is_some() {
                debug_fmt!("RedirectTable", "Duplicate redirect for {} in {}, keeping the last one", from, locator);
            }
        }

        Ok(Self {
            locator: locator.to_string(),
            separator,
            entries,
        })
    }

    /// Where the table was loaded from.
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// The field separator the source was parsed with.
    pub fn separator(&self) -> char {
        self.separator
    }

    /// Number of redirects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact-match lookup of a request path.
    pub fn lookup(&self, path: &str) -> Option<&Redirect> {
        self.entries.get(path)
    }

    /// Destination for `path`, if any.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.lookup(path).map(Redirect::target)
    }

    /// Iterate over `(source path, destination)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(from, redirect)| (from.as_str(), redirect.target()))
    }
}

fn csv_error(locator: &str, err: csv::Error) -> RedirError {
    let err = RedirError::malformed(locator, &err);
    error_fmt!("RedirectTable", "{}", err);
    err
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Reject quoting the `csv` reader would otherwise repair silently.
///
/// A `"` is only allowed as the first byte of a field, a closing quote must
/// be followed by a delimiter or line end, and no quoted field may remain
/// open at end of input.
fn check_quoting(content: &[u8], delimiter: u8) -> Result<(), String> {
    let mut state = QuoteState::FieldStart;
    let mut line = 1u64;
    let mut quote_line = 1u64;

    for &byte in content {
        let line_end = byte == b'\n' || byte == b'\r';

        state = match (state, byte) {
            (QuoteState::FieldStart, b'"') => {
                quote_line = line;
                QuoteState::Quoted
            }
            (QuoteState::Quoted, b'"') => QuoteState::QuoteInQuoted,
            (QuoteState::Quoted, _) => QuoteState::Quoted,
            (QuoteState::QuoteInQuoted, b'"') => QuoteState::Quoted,
            (QuoteState::Unquoted, b'"') => {
                return Err(format!("bare \" in non-quoted field on line {line}"));
            }
            (QuoteState::QuoteInQuoted, _) if byte != delimiter && !line_end => {
                return Err(format!("extraneous \" in quoted field on line {line}"));
            }
            (_, _) if byte == delimiter || line_end => QuoteState::FieldStart,
            (_, _) => QuoteState::Unquoted,
        };

        if byte == b'\n' {
            line += 1;
        }
    }

    if state == QuoteState::Quoted {
        return Err(format!("unterminated quoted field starting on line {quote_line}"));
    }

    Ok(())
}

/// Percent-escape every byte outside the ASCII range.
pub(crate) fn escape_non_ascii(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii() {
            escaped.push(byte as char);
        } else {
            escaped.push_str(&format!("%{byte:02x}"));
        }
    }
    escaped
}
