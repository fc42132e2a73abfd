//! Data structures for the court tournament: groups, teams, rounds, matches, standings.

mod game;
mod round;
mod standing;
mod team;
mod tournament;

pub use game::{GameMatch, MatchId, ScoreField};
pub use round::{format_clock, Round, RoundId, RoundType, Status};
pub use standing::{GroupTable, Standing, Standings};
pub use team::{Group, GroupId, Team, TeamId};
pub use tournament::{RoundAction, StoreError, Table, Tournament, TournamentError};
