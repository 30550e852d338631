use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A manager's roster for one season: a fixed-size set of artist ids plus a
/// designated captain. Read-only to this engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub user_id: Uuid,
    pub season_id: Uuid,
    pub artist_ids: Vec<String>,
    pub captain_id: String,
}

impl Team {
    /// A roster whose captain is not among its slots is inconsistent; the
    /// captain multiplier would otherwise apply to nothing.
    pub fn is_consistent(&self) -> bool {
        self.artist_ids.iter().any(|id| id == &self.captain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captain_must_be_rostered() {
        let team = Team {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            season_id: Uuid::new_v4(),
            artist_ids: vec!["a1".into(), "a2".into()],
            captain_id: "a2".into(),
        };
        assert!(team.is_consistent());

        let broken = Team {
            captain_id: "a9".into(),
            ..team
        };
        assert!(!broken.is_consistent());
    }
}
