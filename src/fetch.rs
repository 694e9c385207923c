// src/fetch.rs

use anyhow::{Context, Result};
use bytes::Bytes;
use reqwest::{blocking::Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::error::ExtractError;
use crate::window::YearMonth;

/// One (year, month, taxi type) combination; maps to exactly one remote file.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FetchUnit {
    pub year: i32,
    pub month: u32,
    pub taxi_type: String,
}

impl FetchUnit {
    pub fn new(month: YearMonth, taxi_type: impl Into<String>) -> Self {
        Self {
            year: month.year,
            month: month.month,
            taxi_type: taxi_type.into(),
        }
    }

    /// `<taxi_type>_tripdata_<year>-<MM>.parquet`
    pub fn file_name(&self) -> String {
        format!(
            "{}_tripdata_{:04}-{:02}.parquet",
            self.taxi_type, self.year, self.month
        )
    }

    pub fn url(&self, base: &Url) -> Result<Url> {
        let name = self.file_name();
        base.join(&name)
            .with_context(|| format!("joining {} onto {}", name, base))
    }
}

/// Expand months × taxi types, month-major, taxi types in list order.
pub fn plan_units(months: &[YearMonth], taxi_types: &[String]) -> Vec<FetchUnit> {
    months
        .iter()
        .flat_map(|&m| taxi_types.iter().map(move |t| FetchUnit::new(m, t.clone())))
        .collect()
}

/// Status and body of a finished GET.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// The one HTTP operation the extractor needs.
pub trait HttpGet {
    fn get(&self, url: &Url) -> Result<HttpResponse>;
}

impl HttpGet for Client {
    fn get(&self, url: &Url) -> Result<HttpResponse> {
        let resp = Client::get(self, url.as_str())
            .send()
            .with_context(|| format!("GET {}", url))?;
        let status = resp.status();
        let body = resp
            .bytes()
            .with_context(|| format!("reading body from {}", url))?;
        Ok(HttpResponse { status, body })
    }
}

/// Blocking client with the per-request timeout applied.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("building HTTP client")
}

/// Fetch one unit. `Ok(None)` means the file does not exist (404).
pub fn fetch_unit(http: &impl HttpGet, base: &Url, unit: &FetchUnit) -> Result<Option<Bytes>> {
    let url = unit.url(base)?;
    debug!(url = %url, "requesting");
    let resp = http.get(&url)?;

    if resp.status == StatusCode::NOT_FOUND {
        info!(
            "No data found for {} {:04}-{:02}, skipping.",
            unit.taxi_type, unit.year, unit.month
        );
        return Ok(None);
    }
    if !resp.status.is_success() {
        return Err(ExtractError::HttpStatus {
            url: url.to_string(),
            status: resp.status,
        }
        .into());
    }

    debug!(url = %url, bytes = resp.body.len(), "downloaded");
    Ok(Some(resp.body))
}
