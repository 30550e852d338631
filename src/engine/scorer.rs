//! Score calculation.
//!
//! Pure given its inputs (baseline, current metrics, releases, the formula
//! constants, and the window end), so re-running with unchanged provider data
//! reproduces the same row.

use crate::config::ScoringConfig;
use crate::domain::{ArtistMetrics, BaselineSnapshot, PeriodScore, Release, ReleaseType};
use chrono::NaiveDate;

/// Bonus points for releases dropped within `[window_start, window_end]`.
/// Compilations never count. The end bound is explicit so a cadence change
/// only touches the caller.
pub fn release_bonus(
    releases: &[Release],
    window_start: NaiveDate,
    window_end: NaiveDate,
    cfg: &ScoringConfig,
) -> i64 {
    releases
        .iter()
        .filter(|r| r.released_on >= window_start && r.released_on <= window_end)
        .map(|r| match r.release_type {
            ReleaseType::Single => cfg.single_bonus,
            ReleaseType::Album | ReleaseType::Ep => cfg.album_bonus,
            ReleaseType::Compilation => 0,
        })
        .sum()
}

/// Score one artist against its season baseline:
///
/// - popularity delta, weighted
/// - follower growth percent against a floor-of-1 baseline
/// - release bonus over the season window
pub fn score_artist(
    baseline: &BaselineSnapshot,
    current: &ArtistMetrics,
    releases: &[Release],
    window_end: NaiveDate,
    cfg: &ScoringConfig,
) -> PeriodScore {
    let popularity_delta = current.popularity - baseline.popularity;

    let follower_base = baseline.followers.max(1) as f64;
    let growth_pct = (current.followers - baseline.followers) as f64 / follower_base * 100.0;

    let bonus = release_bonus(releases, baseline.frozen_at.date_naive(), window_end, cfg);

    let total_points = (popularity_delta as f64 * cfg.popularity_weight).round() as i64
        + growth_pct.round() as i64
        + bonus;

    PeriodScore {
        season_id: baseline.season_id,
        artist_id: current.artist_id.clone(),
        popularity_delta,
        growth_pct,
        release_bonus: bonus,
        total_points,
    }
}

/// Multiplier applied to a roster's captain when aggregating the roster
/// total. Non-captain slots contribute at 1.0x.
pub fn captain_multiplier(featured: bool, cfg: &ScoringConfig) -> f64 {
    if featured {
        cfg.featured_captain_multiplier
    } else {
        cfg.captain_multiplier
    }
}
