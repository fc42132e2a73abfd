//! Courtside score keeping: one session per court tracks that court's active match.
//!
//! Deltas are applied to the local view first, then written to the store. A failed write
//! puts the old score back. Echoes from the change feed are merged by row version, so an
//! echo of an older write never overwrites a newer local score.

use crate::models::{
    format_clock, GameMatch, MatchId, Round, ScoreField, Status, Table, TeamId, TournamentError,
};
use crate::store::{
    load_tournament, BroadcastHub, EventFilter, Listener, MatchFilter, Notification, RowFilter,
    Store, Subscription, ROUND_STARTED, ROUND_UPDATES,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shown to the operator when a score write fails.
pub const SCORE_FAILED_NOTICE: &str = "Failed to update score. Please try again.";

/// One point up or down.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum ScoreDelta {
    Increment,
    Decrement,
}

impl TryFrom<i32> for ScoreDelta {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ScoreDelta::Increment),
            -1 => Ok(ScoreDelta::Decrement),
            other => Err(format!("score delta must be 1 or -1, got {other}")),
        }
    }
}

impl From<ScoreDelta> for i32 {
    fn from(delta: ScoreDelta) -> i32 {
        match delta {
            ScoreDelta::Increment => 1,
            ScoreDelta::Decrement => -1,
        }
    }
}

impl ScoreDelta {
    /// New score, or None if it would go below zero.
    pub fn apply(self, score: u32) -> Option<u32> {
        match self {
            ScoreDelta::Increment => score.checked_add(1),
            ScoreDelta::Decrement => score.checked_sub(1),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoredReason {
    /// The match is not the one active on this court.
    NotActiveMatch,
    /// The score would go negative.
    BelowZero,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScoreOutcome {
    Applied { game: GameMatch },
    Ignored { reason: IgnoredReason },
    RolledBack { notice: String, error: String },
}

/// What a court screen shows.
#[derive(Clone, Debug, Serialize)]
pub struct CourtView {
    pub court: u32,
    pub game: Option<GameMatch>,
    pub team1: Option<String>,
    pub team2: Option<String>,
    pub elapsed_seconds: i64,
    pub clock: String,
    pub is_paused: bool,
    pub notice: Option<String>,
}

pub struct CourtSession<S: ?Sized> {
    store: Arc<S>,
    court: u32,
    game: Option<GameMatch>,
    round: Option<Round>,
    team_names: (Option<String>, Option<String>),
    notice: Option<String>,
    matches: Subscription,
    rounds: Subscription,
    wake: Listener,
}

impl<S: Store + ?Sized> CourtSession<S> {
    /// Subscribe to this court's matches, to all rounds, and to round-start wake-ups.
    /// Subscriptions are released when the session is dropped.
    pub fn new(store: Arc<S>, hub: &BroadcastHub, court: u32) -> Self {
        let matches = store.subscribe(
            Table::Matches,
            EventFilter::All,
            Some(RowFilter::Court(court)),
        );
        let rounds = store.subscribe(Table::Rounds, EventFilter::All, None);
        let wake = hub.channel(ROUND_UPDATES).on(ROUND_STARTED);
        Self {
            store,
            court,
            game: None,
            round: None,
            team_names: (None, None),
            notice: None,
            matches,
            rounds,
            wake,
        }
    }

    pub fn active_match(&self) -> Option<&GameMatch> {
        self.game.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    /// Re-fetch the active round and this court's active match in it.
    pub async fn refresh(&mut self) -> Result<(), TournamentError> {
        let tournament = load_tournament(self.store.as_ref()).await?;
        let active: Vec<&Round> = tournament
            .rounds
            .iter()
            .filter(|r| r.status == Status::Active)
            .collect();
        if active.len() > 1 {
            log::warn!(
                "Court {}: {} rounds active at once, using round {}",
                self.court,
                active.len(),
                active[0].number
            );
        }
        let Some(round) = active.first().copied() else {
            self.clear();
            return Ok(());
        };

        let filter = MatchFilter::round(round.id)
            .with_court(self.court)
            .with_status(Status::Active);
        let Some(game) = tournament
            .matches_in_round(round.id)
            .find(|m| filter.accepts(m))
        else {
            self.clear();
            return Ok(());
        };

        let name = |id: TeamId| tournament.team_name(id).map(str::to_string);
        self.team_names = (name(game.team1_id), name(game.team2_id));
        log::debug!("Court {} tracking match {}", self.court, game.id);
        self.game = Some(game.clone());
        self.round = Some(round.clone());
        Ok(())
    }

    fn clear(&mut self) {
        self.game = None;
        self.round = None;
        self.team_names = (None, None);
    }

    /// Merge an incoming match row. Only a newer version of the tracked match is taken;
    /// stale and repeated echoes are dropped. Returns whether the view changed.
    pub fn reconcile(&mut self, row: &GameMatch) -> bool {
        let Some(game) = self.game.as_mut().filter(|g| g.id == row.id) else {
            return false;
        };
        if row.version <= game.version {
            log::debug!(
                "Court {}: dropping stale echo v{} (have v{})",
                self.court,
                row.version,
                game.version
            );
            return false;
        }
        *game = row.clone();
        true
    }

    /// Drain pending notifications and bring the view up to date.
    /// Returns whether anything was received.
    pub async fn sync(&mut self) -> Result<bool, TournamentError> {
        let mut refetch = self.wake.drain();
        let mut received = refetch;

        while let Some(n) = self.rounds.try_recv() {
            received = true;
            refetch |= matches!(n, Notification::Change(_) | Notification::Lagged(_));
        }
        while let Some(n) = self.matches.try_recv() {
            received = true;
            match n {
                Notification::Change(event) => match event.new_match() {
                    Some(row)
                        if self.game.as_ref().is_some_and(|g| g.id == row.id)
                            && row.status == Status::Active =>
                    {
                        self.reconcile(row);
                    }
                    _ => refetch = true,
                },
                Notification::Lagged(_) => refetch = true,
            }
        }

        if refetch {
            self.refresh().await?;
        }
        Ok(received)
    }

    /// Move one score of the tracked match by one point.
    pub async fn apply_delta(
        &mut self,
        match_id: MatchId,
        field: ScoreField,
        delta: ScoreDelta,
    ) -> ScoreOutcome {
        let Some(game) = self.game.as_mut().filter(|g| g.id == match_id) else {
            log::debug!("Court {}: ignoring delta for inactive match {}", self.court, match_id);
            return ScoreOutcome::Ignored {
                reason: IgnoredReason::NotActiveMatch,
            };
        };
        let previous = game.score(field);
        let Some(next) = delta.apply(previous) else {
            return ScoreOutcome::Ignored {
                reason: IgnoredReason::BelowZero,
            };
        };
        game.set_score(field, next);

        match self.store.update_match_score(match_id, field, next).await {
            Ok(row) => {
                self.reconcile(&row);
                ScoreOutcome::Applied {
                    game: self.game.clone().unwrap_or(row),
                }
            }
            Err(e) => {
                log::warn!(
                    "Court {}: score write for match {} failed, rolling back: {}",
                    self.court,
                    match_id,
                    e
                );
                if let Some(game) = self.game.as_mut().filter(|g| g.id == match_id) {
                    game.set_score(field, previous);
                }
                self.notice = Some(SCORE_FAILED_NOTICE.to_string());
                ScoreOutcome::RolledBack {
                    notice: SCORE_FAILED_NOTICE.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }

    pub fn view(&self, now: DateTime<Utc>) -> CourtView {
        let elapsed = self
            .game
            .as_ref()
            .and(self.round.as_ref())
            .map_or(0, |r| r.elapsed_seconds(now));
        CourtView {
            court: self.court,
            game: self.game.clone(),
            team1: self.team_names.0.clone(),
            team2: self.team_names.1.clone(),
            elapsed_seconds: elapsed,
            clock: format_clock(elapsed),
            is_paused: self.round.as_ref().is_some_and(|r| r.is_paused),
            notice: self.notice.clone(),
        }
    }
}
