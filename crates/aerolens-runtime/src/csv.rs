#![forbid(unsafe_code)]

//! Minimal RFC 4180 reader.
//!
//! A small state machine over `char`s: quoted fields may contain separators,
//! doubled quotes and line breaks; `\r\n` and `\n` both end a record. The
//! first record is the header.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Leading UTF-8 BOM | Stripped |
//! | Blank line | Skipped |
//! | Row shorter than header | Missing cells are absent |
//! | Row longer than header | [`CsvError`] with the row's line |
//! | Quote never closed | [`CsvError`] with the line the quote opened on |
//! | Text after a closing quote | [`CsvError`] |
//! | Field over [`MAX_FIELD_LEN`] | [`CsvError`] |

use std::fmt;

/// Guard against a runaway quoted field swallowing the whole file.
pub const MAX_FIELD_LEN: usize = 64 * 1024;

/// A malformed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvError {
    /// 1-based physical line.
    pub line: usize,
    pub message: String,
}

impl fmt::Display for CsvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for CsvError {}

/// One data record and the line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    pub line: usize,
    pub fields: Vec<String>,
}

/// Header plus data records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub header: Vec<String>,
    pub records: Vec<CsvRecord>,
}

impl CsvTable {
    /// Records as `(column, value)` pairs, in header order.
    pub fn pairs<'a>(
        &'a self,
        record: &'a CsvRecord,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.header
            .iter()
            .zip(record.fields.iter())
            .map(|(h, v)| (h.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    FieldStart,
    Unquoted,
    Quoted,
    /// Saw `"` inside a quoted field: either an escape or the closing quote.
    QuoteInQuoted,
}

struct Reader {
    state: State,
    field: String,
    fields: Vec<String>,
    line: usize,
    record_line: usize,
    quote_line: usize,
}

impl Reader {
    fn new() -> Self {
        Self {
            state: State::FieldStart,
            field: String::new(),
            fields: Vec::new(),
            line: 1,
            record_line: 1,
            quote_line: 1,
        }
    }

    fn error(&self, line: usize, message: impl Into<String>) -> CsvError {
        CsvError {
            line,
            message: message.into(),
        }
    }

    fn push_char(&mut self, ch: char) -> Result<(), CsvError> {
        if self.field.len() >= MAX_FIELD_LEN {
            return Err(self.error(self.record_line, format!("field exceeds {MAX_FIELD_LEN} bytes")));
        }
        self.field.push(ch);
        Ok(())
    }

    fn end_field(&mut self) {
        self.fields.push(std::mem::take(&mut self.field));
        self.state = State::FieldStart;
    }

    /// Close the current record; blank lines yield `None`.
    fn end_record(&mut self) -> Option<CsvRecord> {
        self.end_field();
        let fields = std::mem::take(&mut self.fields);
        let line = self.record_line;
        self.record_line = self.line;
        if fields.len() == 1 && fields[0].is_empty() {
            return None;
        }
        Some(CsvRecord { line, fields })
    }
}

/// Parse CSV text into a header and records.
pub fn parse(text: &str) -> Result<CsvTable, CsvError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = Reader::new();
    let mut rows = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        // Normalize CRLF to LF.
        let ch = if ch == '\r' && chars.peek() == Some(&'\n') {
            chars.next();
            '\n'
        } else {
            ch
        };

        match reader.state {
            State::FieldStart => match ch {
                '"' => {
                    reader.state = State::Quoted;
                    reader.quote_line = reader.line;
                }
                ',' => reader.end_field(),
                '\n' => {
                    reader.line += 1;
                    rows.extend(reader.end_record());
                }
                _ => {
                    reader.push_char(ch)?;
                    reader.state = State::Unquoted;
                }
            },
            State::Unquoted => match ch {
                ',' => reader.end_field(),
                '\n' => {
                    reader.line += 1;
                    rows.extend(reader.end_record());
                }
                _ => reader.push_char(ch)?,
            },
            State::Quoted => match ch {
                '"' => reader.state = State::QuoteInQuoted,
                '\n' => {
                    reader.line += 1;
                    reader.push_char('\n')?;
                }
                _ => reader.push_char(ch)?,
            },
            State::QuoteInQuoted => match ch {
                '"' => {
                    reader.push_char('"')?;
                    reader.state = State::Quoted;
                }
                ',' => reader.end_field(),
                '\n' => {
                    reader.line += 1;
                    rows.extend(reader.end_record());
                }
                other => {
                    return Err(reader.error(
                        reader.line,
                        format!("unexpected {other:?} after closing quote"),
                    ));
                }
            },
        }
    }

    match reader.state {
        State::Quoted => {
            return Err(reader.error(reader.quote_line, "unterminated quoted field"));
        }
        State::FieldStart if reader.fields.is_empty() => {}
        _ => rows.extend(reader.end_record()),
    }

    let mut rows = rows.into_iter();
    let Some(header) = rows.next() else {
        return Ok(CsvTable::default());
    };
    let header: Vec<String> = header.fields.into_iter().map(|h| h.trim().to_owned()).collect();

    let mut records = Vec::new();
    for row in rows {
        if row.fields.len() > header.len() {
            return Err(CsvError {
                line: row.line,
                message: format!(
                    "expected at most {} fields, found {}",
                    header.len(),
                    row.fields.len()
                ),
            });
        }
        records.push(row);
    }
    Ok(CsvTable { header, records })
}
