//! Match (game) on a court and the score fields it carries.

use crate::models::round::{RoundId, Status};
use crate::models::team::TeamId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a match.
pub type MatchId = Uuid;

/// Which side's score a delta applies to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreField {
    Score1,
    Score2,
}

/// A single match between two teams on one court of a round.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GameMatch {
    pub id: MatchId,
    pub round_id: RoundId,
    /// Court number, 1-based.
    pub court: u32,
    pub team1_id: TeamId,
    pub team2_id: TeamId,
    #[serde(default)]
    pub score1: u32,
    #[serde(default)]
    pub score2: u32,
    /// Mirrors the owning round's status; set in bulk on every round transition.
    #[serde(default)]
    pub status: Status,
    /// Bumped by the store on every write.
    #[serde(default)]
    pub version: u64,
}

impl GameMatch {
    pub fn new(round_id: RoundId, court: u32, team1_id: TeamId, team2_id: TeamId) -> Self {
        Self {
            id: Uuid::new_v4(),
            round_id,
            court,
            team1_id,
            team2_id,
            score1: 0,
            score2: 0,
            status: Status::Pending,
            version: 0,
        }
    }

    pub fn score(&self, field: ScoreField) -> u32 {
        match field {
            ScoreField::Score1 => self.score1,
            ScoreField::Score2 => self.score2,
        }
    }

    pub fn set_score(&mut self, field: ScoreField, value: u32) {
        match field {
            ScoreField::Score1 => self.score1 = value,
            ScoreField::Score2 => self.score2 = value,
        }
    }

    /// Team with the strictly higher score, or None on a tie.
    pub fn winner(&self) -> Option<TeamId> {
        use std::cmp::Ordering::*;
        match self.score1.cmp(&self.score2) {
            Greater => Some(self.team1_id),
            Less => Some(self.team2_id),
            Equal => None,
        }
    }
}
