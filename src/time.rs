//! Bus tracker timestamps.
//!
//! The API reports agency-local wall-clock times as `YYYYMMDD HH:MM:SS`.
//! Some responses drop the seconds (`YYYYMMDD HH:MM`), so both are accepted.

use chrono::NaiveDateTime;

use crate::error::{Error, Result};

/// Agency-local time as reported by the API.
pub type Timestamp = NaiveDateTime;

const FORMAT: &str = "%Y%m%d %H:%M:%S";
const FORMAT_NO_SECONDS: &str = "%Y%m%d %H:%M";

// chrono accepts single-digit fields, so the layout is checked first.
// `d` marks a digit; every other byte must match exactly.
const LAYOUT: &str = "dddddddd dd:dd:dd";
const LAYOUT_NO_SECONDS: &str = "dddddddd dd:dd";

fn has_layout(text: &str, layout: &str) -> bool {
    text.len() == layout.len()
        && text.bytes().zip(layout.bytes()).all(|(c, l)| match l {
            b'd' => c.is_ascii_digit(),
            _ => c == l,
        })
}

/// Parses an API timestamp.
///
/// # Errors
///
/// Returns [`Error::MalformedTimestamp`] if `text` matches neither format.
pub fn parse_timestamp(text: &str) -> Result<Timestamp> {
    parse_timestamp_field("timestamp", text)
}

/// Parses the timestamp held by `field`, naming it in any error.
pub(crate) fn parse_timestamp_field(field: &str, text: &str) -> Result<Timestamp> {
    let format = if has_layout(text, LAYOUT) {
        FORMAT
    } else if has_layout(text, LAYOUT_NO_SECONDS) {
        FORMAT_NO_SECONDS
    } else {
        return Err(Error::malformed_timestamp(field, text));
    };
    NaiveDateTime::parse_from_str(text, format)
        .map_err(|_| Error::malformed_timestamp(field, text))
}

/// Renders a timestamp in the API's seconds form.
#[must_use]
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.format(FORMAT).to_string()
}

/// Whole minutes from `earlier` to `later`, truncated toward zero.
///
/// Negative when `later` is before `earlier`.
#[must_use]
pub fn minutes_between(earlier: Timestamp, later: Timestamp) -> i64 {
    (later - earlier).num_minutes()
}
