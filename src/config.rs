use std::env;

use once_cell::sync::Lazy;

use crate::error::{ApiError, Result};

static GLOBAL: Lazy<SchemaConfig> = Lazy::new(|| SchemaConfig::from_env().unwrap_or_default());

/// Default table consulted by the request parsers.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaConfig {
    /// `n_results` applied when a query omits it.
    pub default_n_results: u32,
    /// Upper bound on `ids` / `query_embeddings` per request; `None` means unlimited.
    pub max_batch_size: Option<usize>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            default_n_results: 10,
            max_batch_size: None,
        }
    }
}

impl SchemaConfig {
    /// Build configuration from environment variables:
    /// `SCHEMA_DEFAULT_N_RESULTS` (optional, default 10) and
    /// `SCHEMA_MAX_BATCH_SIZE` (optional, default unlimited).
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let default_n_results =
            parse_env("SCHEMA_DEFAULT_N_RESULTS").unwrap_or(defaults.default_n_results);
        if default_n_results == 0 {
            return Err(ApiError::Config(
                "SCHEMA_DEFAULT_N_RESULTS must be at least 1".into(),
            ));
        }
        let max_batch_size = parse_env("SCHEMA_MAX_BATCH_SIZE").or(defaults.max_batch_size);
        if max_batch_size == Some(0) {
            return Err(ApiError::Config(
                "SCHEMA_MAX_BATCH_SIZE must be at least 1".into(),
            ));
        }

        Ok(Self {
            default_n_results,
            max_batch_size,
        })
    }

    /// Process-wide configuration, read from the environment on first use.
    pub fn global() -> &'static SchemaConfig {
        &GLOBAL
    }

    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = Some(max);
        self
    }
}

/// Supported vector distance metrics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DistanceMetric {
    L2,
    Cosine,
    InnerProduct,
}

impl DistanceMetric {
    /// Collection metadata key selecting the metric.
    pub const METADATA_KEY: &'static str = "hnsw:space";

    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::L2 => "l2",
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::InnerProduct => "ip",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "l2" => Some(DistanceMetric::L2),
            "cosine" => Some(DistanceMetric::Cosine),
            "ip" => Some(DistanceMetric::InnerProduct),
            _ => None,
        }
    }

    /// Distance between two equal-length vectors; smaller is closer.
    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            DistanceMetric::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
            DistanceMetric::InnerProduct => 1.0 - dot(a, b),
            DistanceMetric::Cosine => {
                let norm = (dot(a, a) * dot(b, b)).sqrt();
                if norm == 0.0 {
                    1.0
                } else {
                    1.0 - dot(a, b) / norm
                }
            }
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn parse_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
