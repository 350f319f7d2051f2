use super::{select_sql, upsert_sql, MatchStore};
use crate::constants::MATCH_TIME_FORMAT;
use crate::error::{EtlError, Result};
use crate::types::MatchRecord;
use async_trait::async_trait;
use chrono::NaiveTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, Row};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MIGRATION: &str = include_str!("../../migrations/sqlite/001_create_matches.sql");

/// SQLite-file target. A connection is opened per operation and closed
/// when it goes out of scope.
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Connection::open(&self.path).map_err(|e| EtlError::Connection {
            message: format!("failed to open {}: {e}", self.path.display()),
        })
    }

    fn migrate_blocking(&self) -> Result<()> {
        let conn = self.open()?;
        conn.execute_batch(MIGRATION).map_err(sqlite_error)
    }

    fn upsert_blocking(&self, matches: &[MatchRecord]) -> Result<usize> {
        let mut conn = self.open()?;
        // Dropping `tx` without commit rolls the batch back.
        let tx = conn.transaction().map_err(sqlite_error)?;
        {
            let mut stmt = tx
                .prepare(&upsert_sql(|i| format!("?{i}")))
                .map_err(sqlite_error)?;
            for record in matches {
                stmt.execute(params![
                    record.match_number,
                    record.round_number,
                    record.match_year,
                    record.match_month,
                    record.match_day,
                    record.match_time_text(),
                    record.location,
                    record.home_team,
                    record.away_team,
                    record.group_name,
                    record.result,
                ])
                .map_err(|e| {
                    warn!(match_number = record.match_number, "Upsert failed, rolling back batch");
                    sqlite_error(e)
                })?;
            }
        }
        tx.commit().map_err(sqlite_error)?;

        debug!("Committed {} rows to {}", matches.len(), self.path.display());
        Ok(matches.len())
    }

    fn fetch_blocking(&self) -> Result<Vec<MatchRecord>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(&select_sql()).map_err(sqlite_error)?;
        let rows = stmt
            .query_map(params![], record_from_row)
            .map_err(sqlite_error)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(sqlite_error)
    }
}

#[async_trait]
impl MatchStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn migrate(&self) -> Result<()> {
        self.migrate_blocking()
    }

    async fn upsert_matches(&self, matches: &[MatchRecord]) -> Result<usize> {
        self.upsert_blocking(matches)
    }

    async fn fetch_matches(&self) -> Result<Vec<MatchRecord>> {
        self.fetch_blocking()
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<MatchRecord> {
    let match_time = row
        .get::<_, Option<String>>(5)?
        .map(|text| {
            NaiveTime::parse_from_str(&text, MATCH_TIME_FORMAT)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))
        })
        .transpose()?;

    Ok(MatchRecord {
        match_number: row.get(0)?,
        round_number: row.get(1)?,
        match_year: row.get(2)?,
        match_month: row.get(3)?,
        match_day: row.get(4)?,
        match_time,
        location: row.get(6)?,
        home_team: row.get(7)?,
        away_team: row.get(8)?,
        group_name: row.get(9)?,
        result: row.get(10)?,
    })
}

fn sqlite_error(err: rusqlite::Error) -> EtlError {
    let message = err.to_string();
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            EtlError::Constraint { message }
        }
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(
                e.code,
                ErrorCode::CannotOpen | ErrorCode::NotADatabase | ErrorCode::DatabaseBusy
            ) =>
        {
            EtlError::Connection { message }
        }
        _ => EtlError::Query { message },
    }
}
