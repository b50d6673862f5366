//! Entity codec: schema-generation decoding and canonical encoding.
//!
//! Each record type lists its recognised field layouts ("generations"),
//! newest and most specific first. Decoding a line splits it on the
//! delimiter and walks that list; the first generation whose arity matches
//! and whose `accepts` heuristic passes decodes the row. If that
//! generation's `build` fails (an unparseable number), the row is skipped.
//! Encoding always emits the first (canonical) generation.
//!
//! Field values are never escaped. A value containing the delimiter produces
//! a row with the wrong arity, which later decodes as malformed and is
//! skipped.

use tracing::{debug, warn};

use crate::storage::Table;

/// Why a single row could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("blank line")]
    Blank,

    #[error("no schema generation accepts {arity} fields")]
    NoGeneration { arity: usize },

    #[error("field {field} is not a number: {value:?}")]
    NotANumber { field: &'static str, value: String },
}

/// One historically valid field layout of a record type.
pub struct Generation<T: Record> {
    /// Short name used in logs, e.g. `"v2-9"`.
    pub name: &'static str,
    /// Exact number of fields.
    pub arity: usize,
    /// Content heuristic for layouts that share an arity.
    pub accepts: fn(&[&str], &T::Context) -> bool,
    /// Build the record from exactly `arity` fields.
    pub build: fn(&[&str], &T::Context) -> Result<T, FieldError>,
}

/// A record type stored one-per-line in a table file.
pub trait Record: Sized + 'static {
    /// Lookup data some generations need (joins). `()` for most tables.
    type Context;

    const TABLE: Table;

    /// Recognised layouts, canonical first.
    fn generations() -> &'static [Generation<Self>];

    /// Fields of the canonical layout, in order.
    fn to_fields(&self) -> Vec<String>;
}

/// A decoded record with the generation that matched.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub record: T,
    /// Index into `T::generations()`; 0 is canonical.
    pub generation: usize,
}

/// Outcome of decoding a whole file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub decoded: usize,
    pub skipped: usize,
}

/// Heuristic for generations that are the only layout of their arity.
pub fn any_fields<C>(_fields: &[&str], _ctx: &C) -> bool {
    true
}

/// Decode one raw line.
///
/// # Errors
///
/// Returns a `FieldError` describing why the row was rejected. Callers
/// skip the row and continue.
pub fn decode_line<T: Record>(
    line: &str,
    delimiter: char,
    ctx: &T::Context,
) -> Result<Decoded<T>, FieldError> {
    if line.trim().is_empty() {
        return Err(FieldError::Blank);
    }

    let fields: Vec<&str> = line.split(delimiter).collect();

    for (index, generation) in T::generations().iter().enumerate() {
        if generation.arity != fields.len() || !(generation.accepts)(fields.as_slice(), ctx) {
            continue;
        }
        let record = (generation.build)(fields.as_slice(), ctx)?;
        return Ok(Decoded {
            record,
            generation: index,
        });
    }

    Err(FieldError::NoGeneration {
        arity: fields.len(),
    })
}

/// Decode every line, skipping malformed rows.
pub fn decode_all<T: Record>(
    lines: &[String],
    delimiter: char,
    ctx: &T::Context,
) -> (Vec<Decoded<T>>, LoadReport) {
    let mut rows = Vec::with_capacity(lines.len());
    let mut report = LoadReport::default();

    for (line_num, line) in lines.iter().enumerate() {
        match decode_line::<T>(line, delimiter, ctx) {
            Ok(decoded) => {
                report.decoded += 1;
                rows.push(decoded);
            }
            Err(FieldError::Blank) => {}
            Err(e) => {
                report.skipped += 1;
                debug!(table = %T::TABLE, line = line_num + 1, error = %e, "Skipping malformed row");
            }
        }
    }

    if report.skipped > 0 {
        warn!(
            table = %T::TABLE,
            skipped = report.skipped,
            decoded = report.decoded,
            "Skipped malformed rows"
        );
    }

    (rows, report)
}

/// Encode a record in its canonical layout.
#[must_use]
pub fn encode_line<T: Record>(record: &T, delimiter: char) -> String {
    let mut buf = [0u8; 4];
    let sep: &str = delimiter.encode_utf8(&mut buf);
    record.to_fields().join(sep)
}

// ── Field helpers ─────────────────────────────────────────────

/// Parse an optional unsigned integer. Empty is `None`.
///
/// # Errors
///
/// Returns `FieldError::NotANumber` for non-empty, non-numeric input.
pub fn parse_opt_u32(field: &'static str, raw: &str) -> Result<Option<u32>, FieldError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|_| FieldError::NotANumber {
            field,
            value: raw.to_string(),
        })
}

/// Parse an optional float. Empty is `None`; NaN and infinities are rejected.
///
/// # Errors
///
/// Returns `FieldError::NotANumber` for non-empty, non-numeric input.
pub fn parse_opt_f64(field: &'static str, raw: &str) -> Result<Option<f64>, FieldError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(FieldError::NotANumber {
            field,
            value: raw.to_string(),
        }),
    }
}

/// Parse a required float.
///
/// # Errors
///
/// Returns `FieldError::NotANumber` if the field is empty or non-numeric.
pub fn parse_f64(field: &'static str, raw: &str) -> Result<f64, FieldError> {
    parse_opt_f64(field, raw)?.ok_or_else(|| FieldError::NotANumber {
        field,
        value: raw.to_string(),
    })
}

#[must_use]
pub fn opt_to_field<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
