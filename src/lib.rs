pub mod adapters;
pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;

pub use adapters::{MetricsApiClient, MetricsProvider, PostgresStore, RetryPolicy};
pub use config::AppConfig;
pub use engine::{DailyScoringJob, RolloverJob, RunSummary};
pub use error::{CrescendoError, Result};
