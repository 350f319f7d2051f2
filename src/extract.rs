use crate::constants::REQUIRED_COLUMNS;
use crate::error::{EtlError, Result};
use crate::types::{RawMatch, RawTable};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Read the fixture CSV at `path` into memory.
///
/// A missing or unreadable file is `FileAccess`; anything the CSV reader
/// rejects (missing headers, ragged rows, non-integer match numbers) is `Parse`.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn extract_matches<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| EtlError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;

    let table = read_matches(file, path)?;
    let (rows, columns) = table.shape();
    info!(rows, columns, "📥 Extracted raw matches");
    debug!(columns = ?table.columns(), "CSV columns");
    Ok(table)
}

/// Parse fixture rows from any reader. `origin` is only used in diagnostics.
pub fn read_matches<R: Read>(reader: R, origin: &Path) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| csv_error(e, origin))?
        .iter()
        .map(str::to_string)
        .collect();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|required| !headers.iter().any(|h| h == required))
        .collect();
    if !missing.is_empty() {
        return Err(EtlError::Parse {
            line: 1,
            message: format!("missing required column(s): {}", missing.join(", ")),
        });
    }

    let mut rows = Vec::new();
    for record in rdr.deserialize::<RawMatch>() {
        rows.push(record.map_err(|e| csv_error(e, origin))?);
    }

    Ok(RawTable {
        origin: origin.display().to_string(),
        headers,
        rows,
    })
}

fn csv_error(err: csv::Error, origin: &Path) -> EtlError {
    let line = err.position().map(|p| p.line()).unwrap_or(1);
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => EtlError::FileAccess {
            path: origin.to_path_buf(),
            source,
        },
        _ => EtlError::Parse { line, message },
    }
}
