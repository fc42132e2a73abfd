//! Boundary to the persistent store, its change feed, broadcast channels, and the clock.
//!
//! The store is the single source of truth. Everything in `logic` re-derives its views
//! from what a [`Store`] returns and writes back through it.

mod broadcast;
mod clock;
mod feed;
mod memory;

pub use broadcast::{
    BroadcastChannel, BroadcastHub, BroadcastMessage, Listener, ROUND_STARTED, ROUND_UPDATES,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use feed::{
    ChangeEvent, ChangeFeed, ChangeKind, EventFilter, Notification, Row, RowFilter, Subscription,
    FEED_CAPACITY,
};
pub use memory::MemoryStore;

use crate::models::{
    GameMatch, Group, MatchId, Round, RoundId, ScoreField, Status, StoreError, Table, Team,
    Tournament,
};
use async_trait::async_trait;

/// Equality filters for selecting matches. Unset fields match everything.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MatchFilter {
    pub round_id: Option<RoundId>,
    pub court: Option<u32>,
    pub status: Option<Status>,
}

impl MatchFilter {
    pub fn round(round_id: RoundId) -> Self {
        Self {
            round_id: Some(round_id),
            ..Self::default()
        }
    }

    pub fn with_court(mut self, court: u32) -> Self {
        self.court = Some(court);
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn accepts(&self, m: &GameMatch) -> bool {
        self.round_id.map_or(true, |r| m.round_id == r)
            && self.court.map_or(true, |c| m.court == c)
            && self.status.map_or(true, |s| m.status == s)
    }
}

/// Bulk update applied to every match of a round together with the round row.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MatchUpdate {
    pub status: Status,
    pub clear_scores: bool,
}

impl MatchUpdate {
    pub fn status(status: Status) -> Self {
        Self {
            status,
            clear_scores: false,
        }
    }
}

/// Row-level access to groups, teams, rounds, and matches.
///
/// Every write bumps the row's `version` and publishes a change event on the feed
/// returned by [`Store::subscribe`], in commit order per table.
#[async_trait]
pub trait Store: Send + Sync {
    async fn list_groups(&self) -> Result<Vec<Group>, StoreError>;

    async fn insert_group(&self, group: Group) -> Result<Group, StoreError>;

    async fn list_teams(&self) -> Result<Vec<Team>, StoreError>;

    async fn insert_team(&self, team: Team) -> Result<Team, StoreError>;

    /// All rounds ordered by number.
    async fn list_rounds(&self) -> Result<Vec<Round>, StoreError>;

    async fn get_round(&self, id: RoundId) -> Result<Option<Round>, StoreError>;

    /// Insert a round and its matches as one unit.
    async fn insert_round(
        &self,
        round: Round,
        matches: Vec<GameMatch>,
    ) -> Result<Round, StoreError>;

    /// Matches selected by `filter`, ordered by court then insertion.
    async fn list_matches(&self, filter: MatchFilter) -> Result<Vec<GameMatch>, StoreError>;

    async fn get_match(&self, id: MatchId) -> Result<Option<GameMatch>, StoreError>;

    async fn insert_match(&self, game: GameMatch) -> Result<GameMatch, StoreError>;

    /// Set one score field; returns the row as written.
    async fn update_match_score(
        &self,
        id: MatchId,
        field: ScoreField,
        value: u32,
    ) -> Result<GameMatch, StoreError>;

    /// Replace the round row and, if given, apply `matches` to every match of the round,
    /// as one unit. Fails with `Conflict` if `round.version` is not the stored version.
    async fn transition_round(
        &self,
        round: Round,
        matches: Option<MatchUpdate>,
    ) -> Result<Round, StoreError>;

    /// Set the status of every match of a round; returns the ids that changed.
    /// Fails with `Conflict`, writing nothing, if the round is no longer at `round_version`.
    async fn set_round_match_status(
        &self,
        round_id: RoundId,
        round_version: u64,
        status: Status,
    ) -> Result<Vec<MatchId>, StoreError>;

    /// Delete a round's matches, then the round.
    async fn delete_round(&self, id: RoundId) -> Result<(), StoreError>;

    fn subscribe(
        &self,
        table: Table,
        events: EventFilter,
        filter: Option<RowFilter>,
    ) -> Subscription;
}

/// Load all four tables into one snapshot.
pub async fn load_tournament<S: Store + ?Sized>(store: &S) -> Result<Tournament, StoreError> {
    let groups = store.list_groups().await?;
    let teams = store.list_teams().await?;
    let rounds = store.list_rounds().await?;
    let matches = store.list_matches(MatchFilter::default()).await?;
    Ok(Tournament::new(groups, teams, rounds, matches))
}
