pub mod active;
pub mod daily;
pub mod ledger;
pub mod rollover;
pub mod scorer;
pub mod wagers;

pub use active::resolve_active_artists;
pub use daily::{score_batch, DailyScoringJob, RunSummary};
pub use ledger::{accrual_delta, team_period_total, AccrualLedger};
pub use rollover::{rank_managers, RolloverJob, RolloverSummary};
pub use scorer::{captain_multiplier, release_bonus, score_artist};
pub use wagers::{plan_settlements, Settlement, WagerResolver};
