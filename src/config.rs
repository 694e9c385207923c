// src/config.rs

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::{env, path::PathBuf, time::Duration};
use url::Url;

use crate::error::ExtractError;

/// Where the monthly trip files live.
pub const DEFAULT_BASE_URL: &str = "https://d37ci6vzurychx.cloudfront.net/trip-data/";
/// Per-request cap; a request running longer is a fatal error.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_OUTPUT_DIR: &str = "parquet";

// DEFAULT_BASE_URL is a literal, so the parse is checked by the config tests.
static DEFAULT_BASE: Lazy<Url> =
    Lazy::new(|| Url::parse(DEFAULT_BASE_URL).expect("DEFAULT_BASE_URL should parse"));

const START_VAR: &str = "BRUIN_START_DATE";
const END_VAR: &str = "BRUIN_END_DATE";
const VARS_VAR: &str = "BRUIN_VARS";
const OUTPUT_VAR: &str = "TRIPS_OUTPUT_DIR";

/// Pipeline variables, decoded from the JSON options object.
///
/// `taxi_types` defaults to `["yellow"]` when the key is absent. An explicit
/// empty list is kept as-is and simply produces no fetch units.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PipelineVars {
    #[serde(default = "default_taxi_types")]
    pub taxi_types: Vec<String>,
}

fn default_taxi_types() -> Vec<String> {
    vec!["yellow".to_string()]
}

impl Default for PipelineVars {
    fn default() -> Self {
        Self {
            taxi_types: default_taxi_types(),
        }
    }
}

impl PipelineVars {
    /// Decode the options object. Unknown keys are ignored.
    pub fn from_json(raw: &str) -> Result<Self> {
        let vars = serde_json::from_str(raw).map_err(ExtractError::InvalidVars)?;
        Ok(vars)
    }
}

/// How fetch units are turned into requests.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub base_url: Url,
    pub timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE.clone(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl FetchSettings {
    /// Point at a different mirror. A trailing slash is added when missing so
    /// file names join under the base path instead of replacing its last segment.
    pub fn with_base_url(mut self, base: &str) -> Result<Self> {
        let normalized = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        };
        self.base_url =
            Url::parse(&normalized).with_context(|| format!("parsing base URL {}", base))?;
        Ok(self)
    }
}

/// Everything the surrounding pipeline hands to one run.
#[derive(Debug, Clone)]
pub struct RunEnv {
    pub start: Option<String>,
    pub end: Option<String>,
    pub vars: PipelineVars,
    pub output_dir: PathBuf,
}

impl RunEnv {
    /// Read the run from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the run through `lookup`, which maps a variable name to its value.
    /// Blank date bounds count as missing; the extractor rejects them later.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let vars = match non_blank(VARS_VAR) {
            Some(raw) => PipelineVars::from_json(&raw)
                .with_context(|| format!("decoding {}", VARS_VAR))?,
            None => PipelineVars::default(),
        };

        Ok(Self {
            start: non_blank(START_VAR),
            end: non_blank(END_VAR),
            vars,
            output_dir: non_blank(OUTPUT_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn vars_default_to_yellow() -> Result<()> {
        assert_eq!(PipelineVars::from_json("{}")?.taxi_types, vec!["yellow"]);
        assert_eq!(PipelineVars::default().taxi_types, vec!["yellow"]);
        Ok(())
    }

    #[test]
    fn vars_keep_order_and_ignore_unknown_keys() -> Result<()> {
        let vars = PipelineVars::from_json(r#"{"taxi_types":["green","yellow"],"other":1}"#)?;
        assert_eq!(vars.taxi_types, vec!["green", "yellow"]);
        Ok(())
    }

    #[test]
    fn malformed_vars_are_a_config_error() {
        let err = PipelineVars::from_json("{not json").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExtractError>(),
            Some(ExtractError::InvalidVars(_))
        ));
    }

    #[test]
    fn run_env_reads_bounds_and_defaults() -> Result<()> {
        let run = RunEnv::from_lookup(lookup_from(&[
            ("BRUIN_START_DATE", "2024-01-01"),
            ("BRUIN_END_DATE", "2024-02-01"),
        ]))?;
        assert_eq!(run.start.as_deref(), Some("2024-01-01"));
        assert_eq!(run.end.as_deref(), Some("2024-02-01"));
        assert_eq!(run.vars, PipelineVars::default());
        assert_eq!(run.output_dir, PathBuf::from("parquet"));
        Ok(())
    }

    #[test]
    fn blank_bounds_count_as_missing() -> Result<()> {
        let run = RunEnv::from_lookup(lookup_from(&[
            ("BRUIN_START_DATE", "  "),
            ("BRUIN_VARS", r#"{"taxi_types":["fhv"]}"#),
            ("TRIPS_OUTPUT_DIR", "/tmp/trips"),
        ]))?;
        assert!(run.start.is_none());
        assert!(run.end.is_none());
        assert_eq!(run.vars.taxi_types, vec!["fhv"]);
        assert_eq!(run.output_dir, PathBuf::from("/tmp/trips"));
        Ok(())
    }

    #[test]
    fn default_settings_point_at_trip_data() {
        let settings = FetchSettings::default();
        assert_eq!(settings.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(settings.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn base_url_gets_trailing_slash() -> Result<()> {
        let settings = FetchSettings::default().with_base_url("http://localhost:9000/trips")?;
        assert_eq!(settings.base_url.as_str(), "http://localhost:9000/trips/");
        assert_eq!(settings.timeout, Duration::from_secs(120));
        Ok(())
    }
}
