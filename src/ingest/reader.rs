//! Line-delimited JSON input

use super::error::{IngestError, IngestResult};
use super::record::PublicationRecord;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

/// What happened while reading the input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadReport {
    /// Records parsed and kept
    pub records: usize,
    /// Lines that were not valid records
    pub skipped: usize,
    /// Whether the row cap stopped reading early
    pub capped: bool,
}

/// Read records from a file, stopping after `row_cap` records if set.
pub fn read_records(
    path: impl AsRef<Path>,
    row_cap: Option<usize>,
) -> IngestResult<(Vec<PublicationRecord>, ReadReport)> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| IngestError::Input {
        path: path.display().to_string(),
        source,
    })?;
    parse_records(BufReader::new(file), row_cap).map_err(|source| IngestError::Input {
        path: path.display().to_string(),
        source,
    })
}

/// Parse records from any buffered reader.
///
/// Blank lines are ignored. A line that is not a valid record is logged and
/// skipped; only I/O failures are errors.
pub fn parse_records<R: BufRead>(
    reader: R,
    row_cap: Option<usize>,
) -> std::io::Result<(Vec<PublicationRecord>, ReadReport)> {
    let mut records = Vec::new();
    let mut report = ReadReport::default();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if row_cap.is_some_and(|cap| records.len() >= cap) {
            report.capped = true;
            break;
        }
        match serde_json::from_str::<PublicationRecord>(trimmed) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(line = line_no + 1, error = %e, "skipping malformed record");
                report.skipped += 1;
            }
        }
    }

    report.records = records.len();
    debug!(records = report.records, skipped = report.skipped, capped = report.capped, "input read");
    Ok((records, report))
}
