use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scoring period, bounded by a baseline freeze at start and a rollover at
/// end. The freeze itself is performed by a separate operation; this engine
/// only reads its output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Season {
    pub id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl Season {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.starts_at <= at && at < self.ends_at
    }
}

/// Frozen artist metrics captured at season start. Immutable once written;
/// the diff origin for every score this season.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineSnapshot {
    pub season_id: Uuid,
    pub artist_id: String,
    pub popularity: i32,
    pub followers: i64,
    pub frozen_at: DateTime<Utc>,
}
