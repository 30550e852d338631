use crate::error::{CrescendoError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Side a manager picked when placing a head-to-head wager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WagerPick {
    Mine,
    Rival,
    Draw,
}

impl WagerPick {
    pub fn as_str(&self) -> &'static str {
        match self {
            WagerPick::Mine => "mine",
            WagerPick::Rival => "rival",
            WagerPick::Draw => "draw",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mine" => Some(WagerPick::Mine),
            "rival" => Some(WagerPick::Rival),
            "draw" => Some(WagerPick::Draw),
            _ => None,
        }
    }
}

/// Wager lifecycle. Pending is the only non-terminal state; the transition
/// out of it happens exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WagerStatus {
    Pending,
    Won,
    Lost,
    Draw,
}

impl WagerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WagerStatus::Pending => "pending",
            WagerStatus::Won => "won",
            WagerStatus::Lost => "lost",
            WagerStatus::Draw => "draw",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(WagerStatus::Pending),
            "won" => Some(WagerStatus::Won),
            "lost" => Some(WagerStatus::Lost),
            "draw" => Some(WagerStatus::Draw),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, WagerStatus::Pending)
    }

    pub fn can_transition_to(&self, target: WagerStatus) -> bool {
        matches!(
            (self, target),
            (
                WagerStatus::Pending,
                WagerStatus::Won | WagerStatus::Lost | WagerStatus::Draw
            )
        )
    }
}

/// A manager's prediction on the relative in-season performance of their own
/// artist vs a rival artist, with each side's score frozen at placement time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wager {
    pub id: Uuid,
    pub user_id: Uuid,
    pub season_id: Uuid,
    pub artist_id: String,
    pub rival_artist_id: String,
    pub pick: WagerPick,
    /// Period score of each side when the wager was placed
    pub artist_points_at_stake: i64,
    pub rival_points_at_stake: i64,
    pub status: WagerStatus,
    pub placed_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Wager {
    /// Which side actually moved more since placement
    pub fn outcome(my_delta: i64, rival_delta: i64) -> WagerPick {
        if my_delta > rival_delta {
            WagerPick::Mine
        } else if rival_delta > my_delta {
            WagerPick::Rival
        } else {
            WagerPick::Draw
        }
    }

    /// Terminal status for this wager given both sides' deltas
    pub fn settle(&self, my_delta: i64, rival_delta: i64) -> Result<WagerStatus> {
        let outcome = Self::outcome(my_delta, rival_delta);
        let target = if self.pick == outcome {
            WagerStatus::Won
        } else if outcome == WagerPick::Draw {
            WagerStatus::Draw
        } else {
            WagerStatus::Lost
        };

        if !self.status.can_transition_to(target) {
            return Err(CrescendoError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: target.as_str().to_string(),
            });
        }
        Ok(target)
    }
}
