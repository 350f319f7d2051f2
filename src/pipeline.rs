use crate::config::{Config, OnLoadError};
use crate::error::Result;
use crate::storage::MatchStore;
use crate::types::{CleanTable, LoadSummary, RawTable, Stage, TransformStats};
use crate::{extract, load, transform};
use metrics::{counter, histogram};
use serde::Serialize;
use std::time::Instant;
use tracing::{error, info, instrument};

/// Result of a complete pipeline run
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub source: String,
    pub raw_rows: usize,
    pub clean_rows: usize,
    pub transform: TransformStats,
    /// `None` when the load failed under `on_error = "log"`
    pub load: Option<LoadSummary>,
    pub load_error: Option<String>,
}

/// Extract → Transform → Load against one store
pub struct Pipeline<'a> {
    config: &'a Config,
    store: &'a dyn MatchStore,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, store: &'a dyn MatchStore) -> Self {
        Self { config, store }
    }

    /// Extract stage only; errors are tagged with the stage.
    pub fn extract(&self) -> Result<RawTable> {
        timed(Stage::Extract, || {
            extract::extract_matches(&self.config.source.csv_path)
        })
        .map_err(|e| e.in_stage(Stage::Extract))
    }

    /// Extract and transform without touching the store.
    pub fn clean(&self) -> Result<CleanTable> {
        let raw = self.extract()?;
        counter!("afcon_rows_extracted_total").increment(raw.len() as u64);
        Ok(timed(Stage::Transform, || transform::transform_matches(raw)))
    }

    /// Run every stage. The first failing stage ends the run, except a load
    /// failure under `on_error = "log"`, which is logged and reported in the
    /// result instead.
    #[instrument(skip(self), fields(backend = self.store.backend_name()))]
    pub async fn run(&self) -> Result<PipelineResult> {
        info!("🚀 Starting AFCON ETL run");
        counter!("afcon_pipeline_runs_total").increment(1);
        let t_pipeline = Instant::now();

        let clean = self.clean()?;
        let source = self.config.source.csv_path.display().to_string();

        let t_load = Instant::now();
        let loaded = self.load(&clean).await;
        histogram!("afcon_stage_duration_seconds", "stage" => Stage::Load.as_str())
            .record(t_load.elapsed().as_secs_f64());

        let (load, load_error) = match loaded {
            Ok(summary) => {
                counter!("afcon_rows_loaded_total").increment(summary.rows_written as u64);
                (Some(summary), None)
            }
            Err(e) if self.config.load.on_error == OnLoadError::Log => {
                error!("Load failed, batch rolled back; continuing: {}", e);
                counter!("afcon_load_failures_total").increment(1);
                (None, Some(e.to_string()))
            }
            Err(e) => {
                error!("Load failed, batch rolled back: {}", e);
                counter!("afcon_load_failures_total").increment(1);
                return Err(e.in_stage(Stage::Load));
            }
        };

        histogram!("afcon_pipeline_duration_seconds").record(t_pipeline.elapsed().as_secs_f64());
        info!("✅ Pipeline finished");

        Ok(PipelineResult {
            source,
            raw_rows: clean.stats.raw_rows,
            clean_rows: clean.len(),
            transform: clean.stats,
            load,
            load_error,
        })
    }

    async fn load(&self, clean: &CleanTable) -> Result<LoadSummary> {
        if self.config.load.migrate {
            self.store.migrate().await?;
        }
        load::load_matches(self.store, clean).await
    }
}

fn timed<T>(stage: Stage, f: impl FnOnce() -> T) -> T {
    let started = Instant::now();
    let out = f();
    histogram!("afcon_stage_duration_seconds", "stage" => stage.as_str())
        .record(started.elapsed().as_secs_f64());
    out
}
