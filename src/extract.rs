// src/extract.rs

use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use chrono::{SecondsFormat, Utc};
use std::time::Instant;
use tracing::{info, warn};

use crate::{
    config::{FetchSettings, PipelineVars},
    error::ExtractError,
    fetch::{fetch_unit, plan_units, HttpGet},
    table::{empty_table, read_parquet, temporal_to_text, union_by_name, with_constant_column},
    window::{months_in_window, parse_bound},
};

pub const TAXI_TYPE_COLUMN: &str = "taxi_type";
pub const EXTRACTED_AT_COLUMN: &str = "extracted_at";

/// Pulls monthly trip files for a date window and folds them into one batch.
pub struct Extractor<H> {
    http: H,
    settings: FetchSettings,
}

impl<H: HttpGet> Extractor<H> {
    pub fn new(http: H, settings: FetchSettings) -> Self {
        Self { http, settings }
    }

    #[cfg(test)]
    pub(crate) fn http(&self) -> &H {
        &self.http
    }

    /// Fetch every (month, taxi type) unit in `[start, end)` and return the
    /// unioned, stamped and text-normalized result.
    ///
    /// Both bounds must be present; that is checked before any request goes
    /// out. A 404 skips its unit. Any other failure aborts the whole run and
    /// nothing accumulated so far is returned.
    pub fn extract(
        &self,
        start: Option<&str>,
        end: Option<&str>,
        vars: &PipelineVars,
    ) -> Result<RecordBatch> {
        let (start, end) = match (start, end) {
            (Some(s), Some(e)) => (parse_bound(s)?, parse_bound(e)?),
            _ => return Err(ExtractError::MissingDateBounds.into()),
        };

        let months = months_in_window(start, end);
        if months.is_empty() {
            warn!(%start, %end, "date window is empty; nothing to fetch");
            return Ok(empty_table());
        }

        let units = plan_units(&months, &vars.taxi_types);
        info!(
            months = months.len(),
            taxi_types = vars.taxi_types.len(),
            units = units.len(),
            "fetch plan ready"
        );

        let mut tables = Vec::with_capacity(units.len());
        for unit in &units {
            let t0 = Instant::now();
            let Some(body) = fetch_unit(&self.http, &self.settings.base_url, unit)? else {
                continue;
            };
            let name = unit.file_name();
            let table = read_parquet(body).with_context(|| format!("parsing {}", name))?;
            let table = with_constant_column(&table, TAXI_TYPE_COLUMN, &unit.taxi_type)?;
            info!(file = %name, rows = table.num_rows(), elapsed = ?t0.elapsed(), "fetched");
            tables.push(table);
        }

        if tables.is_empty() {
            info!("no data fetched for window");
            return Ok(empty_table());
        }

        let result = union_by_name(&tables)?;
        let extracted_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false);
        let result = with_constant_column(&result, EXTRACTED_AT_COLUMN, &extracted_at)?;
        let result = temporal_to_text(&result)?;

        info!(
            rows = result.num_rows(),
            columns = result.num_columns(),
            %extracted_at,
            "extraction complete"
        );
        Ok(result)
    }
}
