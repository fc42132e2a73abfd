//! Court tournament organizer: library with models, store boundary, and business logic.

pub mod config;
pub mod logic;
pub mod models;
pub mod store;

pub use config::Config;
pub use logic::{
    compute_standings, create_group, create_match, create_round, create_team, final_pairing,
    generate_final, generate_semifinals, load_standings, repair_match_statuses,
    semifinal_pairings, standings_for, CourtSession, CourtView, GeneratedRound, IgnoredReason,
    RestartPolicy, RoundController, ScoreDelta, ScoreOutcome,
};
pub use models::{
    format_clock, GameMatch, Group, GroupId, GroupTable, MatchId, Round, RoundAction, RoundId,
    RoundType, ScoreField, Standing, Standings, Status, StoreError, Table, Team, TeamId,
    Tournament, TournamentError,
};
pub use store::{BroadcastHub, Clock, ManualClock, MemoryStore, Store, SystemClock};
