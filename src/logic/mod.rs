//! Tournament business logic: admin setup, standings, bracket, round lifecycle, scoring.

mod admin;
mod bracket;
mod round_lifecycle;
mod score;
mod standings;

pub use admin::{create_group, create_match, create_round, create_team};
pub use bracket::{
    final_pairing, generate_final, generate_semifinals, semifinal_pairings, GeneratedRound,
};
pub use round_lifecycle::{repair_match_statuses, RestartPolicy, RoundController};
pub use score::{
    CourtSession, CourtView, IgnoredReason, ScoreDelta, ScoreOutcome, SCORE_FAILED_NOTICE,
};
pub use standings::{compute_standings, load_standings, standings_for};
