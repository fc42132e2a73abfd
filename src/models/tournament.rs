//! Tournament snapshot and error types.

use crate::models::game::{GameMatch, MatchId};
use crate::models::round::{Round, RoundId, RoundType, Status};
use crate::models::team::{Group, GroupId, Team, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Which persisted table a row or change belongs to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Groups,
    Teams,
    Rounds,
    Matches,
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Table::Groups => "groups",
            Table::Teams => "teams",
            Table::Rounds => "rounds",
            Table::Matches => "matches",
        };
        f.write_str(s)
    }
}

/// Failures reported by a store implementation.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum StoreError {
    #[error("{table} row {id} not found")]
    NotFound { table: Table, id: uuid::Uuid },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Round lifecycle action, for error reporting.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundAction {
    Start,
    Pause,
    Resume,
    Finish,
    Restart,
}

impl std::fmt::Display for RoundAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RoundAction::Start => "start",
            RoundAction::Pause => "pause",
            RoundAction::Resume => "resume",
            RoundAction::Finish => "finish",
            RoundAction::Restart => "restart",
        };
        f.write_str(s)
    }
}

/// Errors that can occur during tournament operations.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum TournamentError {
    /// Fewer than 4 qualifiers; semifinals cannot be seeded.
    #[error("Need at least 4 qualifiers to generate semifinals (have {found})")]
    InsufficientQualifiers { found: usize },
    /// There must be exactly one finished semifinal round.
    #[error("Semifinals are not finished ({found} finished semifinal rounds)")]
    SemifinalsNotFinished { found: usize },
    /// The finished semifinal round must hold exactly 2 finished matches.
    #[error("Semifinal round must have exactly 2 finished matches (found {finished})")]
    InvalidSemifinalResult { finished: usize },
    /// A semifinal ended level; no rule decides who advances.
    #[error("Semifinal match {0} is tied; no winner can advance")]
    SemifinalTied(MatchId),
    #[error("Cannot {action} round {round} while it is {status}{}", paused_suffix(.paused))]
    InvalidTransition {
        round: RoundId,
        action: RoundAction,
        status: Status,
        paused: bool,
    },
    /// Only semifinal and final rounds may be deleted.
    #[error("Round {0} is a group round and cannot be deleted")]
    RoundNotDeletable(RoundId),
    #[error("Round not found")]
    RoundNotFound(RoundId),
    #[error("Match not found")]
    MatchNotFound(MatchId),
    #[error("Team not found")]
    TeamNotFound(TeamId),
    #[error("Group not found")]
    GroupNotFound(GroupId),
    #[error("Name must not be empty")]
    EmptyName,
    #[error("A group with this name already exists")]
    DuplicateGroupName,
    #[error("Round {0} already exists")]
    DuplicateRoundNumber(u32),
    #[error("A team cannot play itself")]
    SameTeam,
    #[error("Court {court} is out of range (1..={courts})")]
    InvalidCourt { court: u32, courts: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn paused_suffix(paused: &bool) -> &'static str {
    if *paused {
        " (paused)"
    } else {
        ""
    }
}

impl TournamentError {
    /// True for missing rows, whether detected here or by the store.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TournamentError::RoundNotFound(_)
                | TournamentError::MatchNotFound(_)
                | TournamentError::TeamNotFound(_)
                | TournamentError::GroupNotFound(_)
                | TournamentError::Store(StoreError::NotFound { .. })
        )
    }
}

/// Point-in-time copy of all four tables with indexed lookups.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Tournament {
    pub groups: Vec<Group>,
    pub teams: Vec<Team>,
    /// Ordered by round number.
    pub rounds: Vec<Round>,
    pub matches: Vec<GameMatch>,
    #[serde(skip)]
    team_index: HashMap<TeamId, usize>,
    #[serde(skip)]
    round_index: HashMap<RoundId, usize>,
}

impl Tournament {
    pub fn new(
        groups: Vec<Group>,
        teams: Vec<Team>,
        mut rounds: Vec<Round>,
        matches: Vec<GameMatch>,
    ) -> Self {
        rounds.sort_by_key(|r| r.number);
        let team_index = teams.iter().enumerate().map(|(i, t)| (t.id, i)).collect();
        let round_index = rounds.iter().enumerate().map(|(i, r)| (r.id, i)).collect();
        Self {
            groups,
            teams,
            rounds,
            matches,
            team_index,
            round_index,
        }
    }

    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.team_index.get(&id).map(|&i| &self.teams[i])
    }

    /// Team name for display; missing teams degrade to None.
    pub fn team_name(&self, id: TeamId) -> Option<&str> {
        self.team(id).map(|t| t.name.as_str())
    }

    pub fn round(&self, id: RoundId) -> Option<&Round> {
        self.round_index.get(&id).map(|&i| &self.rounds[i])
    }

    /// Matches that feed the group standings: finished, in a group-stage round.
    /// Matches whose round is unknown count as group stage.
    pub fn finished_group_matches(&self) -> impl Iterator<Item = &GameMatch> {
        self.matches.iter().filter(move |m| {
            m.status == Status::Finished
                && self
                    .round(m.round_id)
                    .map_or(true, |r| r.round_type == RoundType::Group)
        })
    }

    /// Next free round number: highest existing + 1, or 1.
    pub fn next_round_number(&self) -> u32 {
        self.rounds.iter().map(|r| r.number).max().unwrap_or(0) + 1
    }

    pub fn matches_in_round(&self, round: RoundId) -> impl Iterator<Item = &GameMatch> {
        self.matches.iter().filter(move |m| m.round_id == round)
    }
}
