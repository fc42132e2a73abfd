//! Shared fixtures for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use court_tournament::store::{EventFilter, MatchFilter, MatchUpdate, RowFilter, Subscription};
use court_tournament::{
    create_group, create_match, create_round, create_team, BroadcastHub, GameMatch, Group,
    ManualClock, MatchId, MemoryStore, RestartPolicy, Round, RoundController, RoundId,
    ScoreField, Status, Store, StoreError, Table, Team, TeamId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub const COURTS: u32 = 4;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

/// MemoryStore with injectable faults: failing score writes, and a round start that
/// lands right after a round listing returns.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    fail_scores: AtomicBool,
    start_after_listing: Mutex<Option<RoundId>>,
}

impl FlakyStore {
    pub fn fail_score_writes(&self, fail: bool) {
        self.fail_scores.store(fail, Ordering::SeqCst);
    }

    /// The next `list_rounds` returns its rows, then `round` is started behind the caller.
    pub fn start_round_after_next_listing(&self, round: RoundId) {
        *self.start_after_listing.lock().unwrap() = Some(round);
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        self.inner.list_groups().await
    }

    async fn insert_group(&self, group: Group) -> Result<Group, StoreError> {
        self.inner.insert_group(group).await
    }

    async fn list_teams(&self) -> Result<Vec<Team>, StoreError> {
        self.inner.list_teams().await
    }

    async fn insert_team(&self, team: Team) -> Result<Team, StoreError> {
        self.inner.insert_team(team).await
    }

    async fn list_rounds(&self) -> Result<Vec<Round>, StoreError> {
        let rounds = self.inner.list_rounds().await?;
        let racing = self.start_after_listing.lock().unwrap().take();
        if let Some(mut round) = match racing {
            Some(id) => self.inner.get_round(id).await?,
            None => None,
        } {
            round.status = Status::Active;
            round.start_time = Some(t0());
            self.inner
                .transition_round(round, Some(MatchUpdate::status(Status::Active)))
                .await?;
        }
        Ok(rounds)
    }

    async fn get_round(&self, id: RoundId) -> Result<Option<Round>, StoreError> {
        self.inner.get_round(id).await
    }

    async fn insert_round(
        &self,
        round: Round,
        matches: Vec<GameMatch>,
    ) -> Result<Round, StoreError> {
        self.inner.insert_round(round, matches).await
    }

    async fn list_matches(&self, filter: MatchFilter) -> Result<Vec<GameMatch>, StoreError> {
        self.inner.list_matches(filter).await
    }

    async fn get_match(&self, id: MatchId) -> Result<Option<GameMatch>, StoreError> {
        self.inner.get_match(id).await
    }

    async fn insert_match(&self, game: GameMatch) -> Result<GameMatch, StoreError> {
        self.inner.insert_match(game).await
    }

    async fn update_match_score(
        &self,
        id: MatchId,
        field: ScoreField,
        value: u32,
    ) -> Result<GameMatch, StoreError> {
        if self.fail_scores.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        self.inner.update_match_score(id, field, value).await
    }

    async fn transition_round(
        &self,
        round: Round,
        matches: Option<MatchUpdate>,
    ) -> Result<Round, StoreError> {
        self.inner.transition_round(round, matches).await
    }

    async fn set_round_match_status(
        &self,
        round_id: RoundId,
        round_version: u64,
        status: Status,
    ) -> Result<Vec<MatchId>, StoreError> {
        self.inner
            .set_round_match_status(round_id, round_version, status)
            .await
    }

    async fn delete_round(&self, id: RoundId) -> Result<(), StoreError> {
        self.inner.delete_round(id).await
    }

    fn subscribe(
        &self,
        table: Table,
        events: EventFilter,
        filter: Option<RowFilter>,
    ) -> Subscription {
        self.inner.subscribe(table, events, filter)
    }
}

/// A store plus everything needed to drive rounds on it.
pub struct Harness<S: Store> {
    pub store: Arc<S>,
    pub hub: BroadcastHub,
    pub clock: Arc<ManualClock>,
    pub rounds: RoundController<S>,
    teams: HashMap<String, TeamId>,
}

impl<S: Store + Default> Harness<S> {
    pub fn new() -> Self {
        Self::with_policy(RestartPolicy::KeepScores)
    }

    pub fn with_policy(policy: RestartPolicy) -> Self {
        let store = Arc::new(S::default());
        let hub = BroadcastHub::new();
        let clock = Arc::new(ManualClock::new(t0()));
        let rounds = RoundController::new(store.clone(), &hub, clock.clone(), policy);
        Self {
            store,
            hub,
            clock,
            rounds,
            teams: HashMap::new(),
        }
    }
}

impl<S: Store> Harness<S> {
    /// Create groups with their teams, e.g. `[("A", &["T1", "T2"])]`.
    pub async fn seed(&mut self, groups: &[(&str, &[&str])]) {
        for (group, teams) in groups {
            let g = create_group(self.store.as_ref(), group).await.unwrap();
            for team in *teams {
                let t = create_team(self.store.as_ref(), team, Some(g.id)).await.unwrap();
                self.teams.insert(team.to_string(), t.id);
            }
        }
    }

    pub fn team(&self, name: &str) -> TeamId {
        self.teams[name]
    }

    /// A pending group round with one match per pair, courts numbered from 1.
    pub async fn round_with(&self, number: u32, pairs: &[(&str, &str)]) -> (Round, Vec<GameMatch>) {
        let round = create_round(self.store.as_ref(), number).await.unwrap();
        let mut matches = Vec::new();
        for (court, (a, b)) in (1..).zip(pairs) {
            let m = create_match(
                self.store.as_ref(),
                round.id,
                court,
                self.team(a),
                self.team(b),
                COURTS,
            )
            .await
            .unwrap();
            matches.push(m);
        }
        (round, matches)
    }

    /// Play a whole group round: start, set scores, finish.
    pub async fn play_round(&self, number: u32, results: &[(&str, u32, &str, u32)]) -> Round {
        let pairs: Vec<(&str, &str)> = results.iter().map(|(a, _, b, _)| (*a, *b)).collect();
        let (round, matches) = self.round_with(number, &pairs).await;
        self.play(round.id, &matches, results.iter().map(|(_, s1, _, s2)| (*s1, *s2))).await
    }

    /// Start a round, write the given scores in match order, finish it.
    pub async fn play(
        &self,
        round: RoundId,
        matches: &[GameMatch],
        scores: impl IntoIterator<Item = (u32, u32)>,
    ) -> Round {
        self.rounds.start(round).await.unwrap();
        for (m, (s1, s2)) in matches.iter().zip(scores) {
            self.store.update_match_score(m.id, ScoreField::Score1, s1).await.unwrap();
            self.store.update_match_score(m.id, ScoreField::Score2, s2).await.unwrap();
        }
        self.rounds.finish(round).await.unwrap()
    }

    pub async fn matches_of(&self, round: RoundId) -> Vec<GameMatch> {
        self.store.list_matches(MatchFilter::round(round)).await.unwrap()
    }
}
