use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A tracked artist from the catalog. The id is the provider's id so metric
/// lookups need no translation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    /// Globally promoted this season; drives captain multiplier and the
    /// active-set union.
    pub featured: bool,
}

/// Point-in-time popularity metrics for one artist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistMetrics {
    pub artist_id: String,
    /// Provider popularity index (0-100)
    pub popularity: i32,
    pub followers: i64,
}

/// Release type as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    Album,
    Single,
    Ep,
    Compilation,
}

impl ReleaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseType::Album => "album",
            ReleaseType::Single => "single",
            ReleaseType::Ep => "ep",
            ReleaseType::Compilation => "compilation",
        }
    }

    /// Parse a provider type string; unknown values map to Compilation so
    /// they never earn a bonus.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "album" => ReleaseType::Album,
            "single" => ReleaseType::Single,
            "ep" => ReleaseType::Ep,
            _ => ReleaseType::Compilation,
        }
    }
}

/// One recent release by an artist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub id: String,
    pub artist_id: String,
    pub title: String,
    pub release_type: ReleaseType,
    pub released_on: NaiveDate,
}
