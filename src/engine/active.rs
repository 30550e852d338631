//! Active-artist resolution.
//!
//! The catalog can be far larger than what this season actually touches.
//! Each run refreshes only the union of rostered artists, featured artists,
//! and artists on either side of an unresolved wager, bounding provider call
//! volume to the active subset.

use crate::domain::{Team, Wager};
use std::collections::BTreeSet;

/// Minimal set of artist ids needing fresh metrics this run. Pure function
/// of roster/feature/wager state; ordered for deterministic chunking.
pub fn resolve_active_artists(
    teams: &[Team],
    featured: &[String],
    pending_wagers: &[Wager],
) -> BTreeSet<String> {
    let mut active = BTreeSet::new();

    for team in teams {
        for artist_id in &team.artist_ids {
            active.insert(artist_id.clone());
        }
    }

    for artist_id in featured {
        active.insert(artist_id.clone());
    }

    for wager in pending_wagers {
        active.insert(wager.artist_id.clone());
        active.insert(wager.rival_artist_id.clone());
    }

    active
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{WagerPick, WagerStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn team(artists: &[&str]) -> Team {
        Team {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            season_id: Uuid::new_v4(),
            artist_ids: artists.iter().map(|s| s.to_string()).collect(),
            captain_id: artists[0].to_string(),
        }
    }

    fn wager(mine: &str, rival: &str) -> Wager {
        Wager {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            season_id: Uuid::new_v4(),
            artist_id: mine.to_string(),
            rival_artist_id: rival.to_string(),
            pick: WagerPick::Mine,
            artist_points_at_stake: 0,
            rival_points_at_stake: 0,
            status: WagerStatus::Pending,
            placed_at: Utc::now(),
            resolved_at: None,
        }
    }

    #[test]
    fn test_union_of_all_sources() {
        let teams = vec![team(&["a1", "a2"]), team(&["a2", "a3"])];
        let featured = vec!["f1".to_string()];
        let wagers = vec![wager("a1", "w1")];

        let active = resolve_active_artists(&teams, &featured, &wagers);
        let expected: BTreeSet<String> = ["a1", "a2", "a3", "f1", "w1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(active, expected);
    }

    #[test]
    fn test_duplicates_collapse() {
        let teams = vec![team(&["a1"]), team(&["a1"])];
        let featured = vec!["a1".to_string()];
        let wagers = vec![wager("a1", "a1")];

        let active = resolve_active_artists(&teams, &featured, &wagers);
        assert_eq!(active.len(), 1);
    }

    #[test]
    fn test_empty_inputs() {
        let active = resolve_active_artists(&[], &[], &[]);
        assert!(active.is_empty());
    }

    #[test]
    fn test_both_wager_sides_included() {
        let active = resolve_active_artists(&[], &[], &[wager("m1", "r1")]);
        assert!(active.contains("m1"));
        assert!(active.contains("r1"));
    }
}
