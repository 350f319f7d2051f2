use super::{select_sql, upsert_sql, MatchStore};
use crate::config::DatabaseConfig;
use crate::error::{EtlError, Result};
use crate::types::MatchRecord;
use async_trait::async_trait;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, info, warn};

const MIGRATION: &str = include_str!("../../migrations/postgres/001_create_matches.sql");

/// PostgreSQL target. Each operation opens its own client; the connection
/// task ends when the client is dropped.
pub struct PostgresStore {
    config: tokio_postgres::Config,
    target: String,
}

impl PostgresStore {
    pub fn new(db: &DatabaseConfig) -> Self {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&db.host)
            .port(db.port)
            .dbname(&db.dbname)
            .user(&db.user);
        if !db.password.is_empty() {
            config.password(&db.password);
        }
        Self {
            config,
            target: format!("{}@{}:{}/{}", db.user, db.host, db.port, db.dbname),
        }
    }

    async fn connect(&self) -> Result<Client> {
        info!("Connecting to postgres at {}", self.target);
        let (client, connection) =
            self.config
                .connect(NoTls)
                .await
                .map_err(|e| EtlError::Connection {
                    message: format!("{}: {}", self.target, e),
                })?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("postgres connection closed with error: {e}");
            }
        });
        Ok(client)
    }
}

#[async_trait]
impl MatchStore for PostgresStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn migrate(&self) -> Result<()> {
        let client = self.connect().await?;
        client.batch_execute(MIGRATION).await.map_err(pg_error)?;
        info!("matches table ready");
        Ok(())
    }

    async fn upsert_matches(&self, matches: &[MatchRecord]) -> Result<usize> {
        let mut client = self.connect().await?;
        // An uncommitted transaction rolls back when dropped.
        let tx = client.transaction().await.map_err(pg_error)?;
        let stmt = tx
            .prepare(&upsert_sql(|i| format!("${i}")))
            .await
            .map_err(pg_error)?;

        for record in matches {
            tx.execute(
                &stmt,
                &[
                    &record.match_number,
                    &record.round_number,
                    &record.match_year,
                    &record.match_month,
                    &record.match_day,
                    &record.match_time,
                    &record.location,
                    &record.home_team,
                    &record.away_team,
                    &record.group_name,
                    &record.result,
                ],
            )
            .await
            .map_err(|e| {
                warn!(match_number = record.match_number, "Upsert failed, rolling back batch");
                pg_error(e)
            })?;
        }

        tx.commit().await.map_err(pg_error)?;
        debug!("Committed {} rows to {}", matches.len(), self.target);
        Ok(matches.len())
    }

    async fn fetch_matches(&self) -> Result<Vec<MatchRecord>> {
        let client = self.connect().await?;
        let rows = client.query(select_sql().as_str(), &[]).await.map_err(pg_error)?;
        rows.iter()
            .map(record_from_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(pg_error)
    }
}

fn record_from_row(row: &Row) -> std::result::Result<MatchRecord, tokio_postgres::Error> {
    Ok(MatchRecord {
        match_number: row.try_get(0)?,
        round_number: row.try_get(1)?,
        match_year: row.try_get(2)?,
        match_month: row.try_get(3)?,
        match_day: row.try_get(4)?,
        match_time: row.try_get(5)?,
        location: row.try_get(6)?,
        home_team: row.try_get(7)?,
        away_team: row.try_get(8)?,
        group_name: row.try_get(9)?,
        result: row.try_get(10)?,
    })
}

fn pg_error(err: tokio_postgres::Error) -> EtlError {
    let message = err
        .as_db_error()
        .map(|db| db.to_string())
        .unwrap_or_else(|| err.to_string());
    match err.code() {
        // class 23: integrity constraint violation
        Some(state) if state.code().starts_with("23") => EtlError::Constraint { message },
        _ if err.is_closed() => EtlError::Connection { message },
        _ => EtlError::Query { message },
    }
}
