//! Output formatting for records.
//!
//! Supports labelled text (each record's `Display`) and pretty JSON.

use std::fmt::Display;
use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

/// Writes each record's labelled text, separated by blank lines.
pub fn write_text<W: Write, T: Display>(mut out: W, records: &[T]) -> Result<()> {
    debug!(count = records.len(), "Writing text output");
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{record}")?;
    }
    out.flush()?;
    Ok(())
}

/// Writes records as a pretty-printed JSON array.
pub fn write_json<W: Write, T: Serialize>(mut out: W, records: &[T]) -> Result<()> {
    debug!(count = records.len(), "Writing JSON output");
    serde_json::to_writer_pretty(&mut out, records)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Writes records to stdout as JSON or text.
pub fn print_records<T: Display + Serialize>(records: &[T], json: bool) -> Result<()> {
    let stdout = std::io::stdout().lock();
    if json { write_json(stdout, records) } else { write_text(stdout, records) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Route, Stop};

    fn stops() -> Vec<Stop> {
        vec![
            Stop { id: 1, name: "A".into(), latitude: 41.5, longitude: -87.5 },
            Stop { id: 2, name: "B".into(), latitude: 41.25, longitude: -87.25 },
        ]
    }

    #[test]
    fn test_write_text_separates_records() {
        let mut buf = Vec::new();
        write_text(&mut buf, &stops()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "Stop number: 1\nStop name: A\nLatitude: 41.5\nLongitude: -87.5\n\n\
             Stop number: 2\nStop name: B\nLatitude: 41.25\nLongitude: -87.25\n"
        );
    }

    #[test]
    fn test_write_json_array() {
        let mut buf = Vec::new();
        write_json(&mut buf, &[Route { id: "54B".into(), name: "South Cicero".into() }]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value, serde_json::json!([{ "id": "54B", "name": "South Cicero" }]));
    }

    #[test]
    fn test_write_text_empty() {
        let mut buf = Vec::new();
        write_text(&mut buf, &Vec::<Stop>::new()).unwrap();
        assert!(buf.is_empty());
    }
}
