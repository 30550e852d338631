pub mod metrics_api;
pub mod paging;
pub mod postgres;
pub mod retry;

pub use metrics_api::{BearerToken, MetricsApiClient, MetricsProvider};
pub use paging::collect_pages;
pub use postgres::PostgresStore;
pub use retry::{RetryDecision, RetryPolicy};
