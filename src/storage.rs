use crate::config::{Backend, DatabaseConfig};
use crate::error::Result;
use crate::types::MatchRecord;
use async_trait::async_trait;

mod in_memory;
#[cfg(feature = "postgres")]
mod postgres;
mod sqlite;

pub use in_memory::InMemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

/// Columns of the `matches` table, in bind order
pub const MATCH_COLUMNS: [&str; 11] = [
    "match_number",
    "round_number",
    "match_year",
    "match_month",
    "match_day",
    "match_time",
    "location",
    "home_team",
    "away_team",
    "group_name",
    "result",
];

/// Persistence target for cleaned match rows
#[async_trait]
pub trait MatchStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Create the `matches` table if it does not exist
    async fn migrate(&self) -> Result<()>;

    /// Upsert every row keyed by `match_number` inside one transaction.
    ///
    /// Later rows win over earlier rows with the same key. On error nothing
    /// is committed and the connection is released before returning.
    async fn upsert_matches(&self, matches: &[MatchRecord]) -> Result<usize>;

    /// All persisted rows ordered by `match_number`
    async fn fetch_matches(&self) -> Result<Vec<MatchRecord>>;
}

/// Build the store selected by `config.backend`. No connection is opened yet.
pub fn open_store(config: &DatabaseConfig) -> Result<Box<dyn MatchStore>> {
    match config.backend {
        Backend::Postgres => postgres_store(config),
        Backend::Sqlite => Ok(Box::new(SqliteStore::new(&config.sqlite_path))),
        Backend::Memory => Ok(Box::new(InMemoryStore::new())),
    }
}

#[cfg(feature = "postgres")]
fn postgres_store(config: &DatabaseConfig) -> Result<Box<dyn MatchStore>> {
    Ok(Box::new(PostgresStore::new(config)))
}

#[cfg(not(feature = "postgres"))]
fn postgres_store(_config: &DatabaseConfig) -> Result<Box<dyn MatchStore>> {
    Err(crate::error::EtlError::Config(
        "built without the `postgres` feature".to_string(),
    ))
}

/// `INSERT ... ON CONFLICT (match_number) DO UPDATE` over every non-key column,
/// with placeholders produced by `placeholder(position)` (1-based).
pub(crate) fn upsert_sql(placeholder: fn(usize) -> String) -> String {
    let values: Vec<String> = (1..=MATCH_COLUMNS.len()).map(placeholder).collect();
    let updates: Vec<String> = MATCH_COLUMNS[1..]
        .iter()
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect();
    format!(
        "INSERT INTO {table} ({columns}) VALUES ({values}) \
         ON CONFLICT (match_number) DO UPDATE SET {updates}",
        table = crate::constants::MATCHES_TABLE,
        columns = MATCH_COLUMNS.join(", "),
        values = values.join(", "),
        updates = updates.join(", "),
    )
}

pub(crate) fn select_sql() -> String {
    format!(
        "SELECT {} FROM {} ORDER BY match_number",
        MATCH_COLUMNS.join(", "),
        crate::constants::MATCHES_TABLE
    )
}
