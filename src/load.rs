use crate::error::Result;
use crate::storage::MatchStore;
use crate::types::{CleanTable, LoadSummary};
use std::time::Instant;
use tracing::{info, instrument};

/// Upsert the cleaned table into `store` as one batch.
///
/// The store commits once after the last row; on error the batch is rolled
/// back, its connection is released and the error propagates unchanged.
#[instrument(skip_all, fields(backend = store.backend_name(), rows = table.len()))]
pub async fn load_matches(store: &dyn MatchStore, table: &CleanTable) -> Result<LoadSummary> {
    let started = Instant::now();
    let rows_written = store.upsert_matches(&table.rows).await?;
    let summary = LoadSummary {
        backend: store.backend_name().to_string(),
        rows_written,
        elapsed_secs: started.elapsed().as_secs_f64(),
    };
    info!(
        rows_written,
        elapsed_secs = summary.elapsed_secs,
        "💾 Loaded matches"
    );
    Ok(summary)
}
