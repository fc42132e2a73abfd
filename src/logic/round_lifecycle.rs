//! Round lifecycle: start, pause, resume, finish, restart, delete.
//!
//! Round status and the status of every match in the round are written together through
//! [`Store::transition_round`], so a round and its matches never disagree after a
//! transition. [`repair_match_statuses`] fixes stores that could not apply both.

use crate::models::{MatchId, Round, RoundAction, RoundId, Status, StoreError, TournamentError};
use crate::store::{
    BroadcastChannel, BroadcastHub, Clock, MatchFilter, MatchUpdate, Store, ROUND_STARTED,
    ROUND_UPDATES,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What restarting a finished round does to its scores.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Back to pending with scores and timestamps untouched.
    #[default]
    KeepScores,
    /// Back to pending with scores zeroed and start/end times cleared.
    ClearScores,
}

pub struct RoundController<S: ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    updates: BroadcastChannel,
    restart_policy: RestartPolicy,
}

impl<S: Store + ?Sized> RoundController<S> {
    pub fn new(
        store: Arc<S>,
        hub: &BroadcastHub,
        clock: Arc<dyn Clock>,
        restart_policy: RestartPolicy,
    ) -> Self {
        Self {
            store,
            clock,
            updates: hub.channel(ROUND_UPDATES),
            restart_policy,
        }
    }

    async fn load(&self, id: RoundId) -> Result<Round, TournamentError> {
        self.store
            .get_round(id)
            .await?
            .ok_or(TournamentError::RoundNotFound(id))
    }

    pub async fn apply(&self, id: RoundId, action: RoundAction) -> Result<Round, TournamentError> {
        match action {
            RoundAction::Start => self.start(id).await,
            RoundAction::Pause => self.pause(id).await,
            RoundAction::Resume => self.resume(id).await,
            RoundAction::Finish => self.finish(id).await,
            RoundAction::Restart => self.restart(id).await,
        }
    }

    /// pending -> active. Starts the clock, activates every match, wakes the courts.
    pub async fn start(&self, id: RoundId) -> Result<Round, TournamentError> {
        let mut round = self.load(id).await?;
        check(&round, RoundAction::Start, round.status == Status::Pending)?;

        round.status = Status::Active;
        round.start_time = Some(self.clock.now());
        round.end_time = None;
        round.is_paused = false;
        round.last_pause_start = None;
        // New run, new pause tally.
        round.total_paused_time = 0;
        let round = self
            .store
            .transition_round(round, Some(MatchUpdate::status(Status::Active)))
            .await?;

        let reached = self
            .updates
            .send(ROUND_STARTED, serde_json::json!({ "roundId": round.id }));
        log::info!("Started round {} ({} listeners woken)", round.number, reached);
        Ok(round)
    }

    /// Freeze the clock of an active round.
    pub async fn pause(&self, id: RoundId) -> Result<Round, TournamentError> {
        let mut round = self.load(id).await?;
        check(
            &round,
            RoundAction::Pause,
            round.status == Status::Active && !round.is_paused,
        )?;

        round.is_paused = true;
        round.last_pause_start = Some(self.clock.now());
        let round = self.store.transition_round(round, None).await?;
        log::info!("Paused round {}", round.number);
        Ok(round)
    }

    /// Close the open pause interval and add its whole seconds to `total_paused_time`.
    /// Without a recorded pause start this is a no-op.
    pub async fn resume(&self, id: RoundId) -> Result<Round, TournamentError> {
        let mut round = self.load(id).await?;
        check(
            &round,
            RoundAction::Resume,
            round.status == Status::Active && round.is_paused,
        )?;

        let Some(pause_start) = round.last_pause_start else {
            log::warn!("Round {} is paused without a pause start; not resuming", round.number);
            return Ok(round);
        };
        round.total_paused_time += pause_seconds(pause_start, self.clock.now());
        round.is_paused = false;
        round.last_pause_start = None;
        let round = self.store.transition_round(round, None).await?;
        log::info!(
            "Resumed round {} ({}s paused in total)",
            round.number,
            round.total_paused_time
        );
        Ok(round)
    }

    /// active -> finished. A pause still open is closed first so the clock stays accurate.
    pub async fn finish(&self, id: RoundId) -> Result<Round, TournamentError> {
        let mut round = self.load(id).await?;
        check(&round, RoundAction::Finish, round.status == Status::Active)?;

        let now = self.clock.now();
        if round.is_paused {
            if let Some(pause_start) = round.last_pause_start {
                round.total_paused_time += pause_seconds(pause_start, now);
            }
            round.is_paused = false;
            round.last_pause_start = None;
        }
        round.status = Status::Finished;
        round.end_time = Some(now);
        let round = self
            .store
            .transition_round(round, Some(MatchUpdate::status(Status::Finished)))
            .await?;
        log::info!("Finished round {}", round.number);
        Ok(round)
    }

    /// finished -> pending, following the configured [`RestartPolicy`].
    pub async fn restart(&self, id: RoundId) -> Result<Round, TournamentError> {
        let mut round = self.load(id).await?;
        check(&round, RoundAction::Restart, round.status == Status::Finished)?;

        round.status = Status::Pending;
        round.is_paused = false;
        round.last_pause_start = None;
        let clear_scores = self.restart_policy == RestartPolicy::ClearScores;
        if clear_scores {
            round.start_time = None;
            round.end_time = None;
        }
        let round = self
            .store
            .transition_round(
                round,
                Some(MatchUpdate {
                    status: Status::Pending,
                    clear_scores,
                }),
            )
            .await?;
        log::info!(
            "Restarted round {} ({})",
            round.number,
            if clear_scores { "scores cleared" } else { "scores kept" }
        );
        Ok(round)
    }

    /// Delete a semifinal or final round together with its matches.
    pub async fn delete(&self, id: RoundId) -> Result<(), TournamentError> {
        let round = self.load(id).await?;
        if !round.round_type.is_knockout() {
            return Err(TournamentError::RoundNotDeletable(id));
        }
        self.store.delete_round(id).await?;
        log::info!("Deleted {:?} round {}", round.round_type, round.number);
        Ok(())
    }
}

fn check(round: &Round, action: RoundAction, allowed: bool) -> Result<(), TournamentError> {
    if allowed {
        Ok(())
    } else {
        Err(TournamentError::InvalidTransition {
            round: round.id,
            action,
            status: round.status,
            paused: round.is_paused,
        })
    }
}

fn pause_seconds(start: chrono::DateTime<chrono::Utc>, end: chrono::DateTime<chrono::Utc>) -> i64 {
    (end - start).num_seconds().max(0)
}

/// Find matches whose status disagrees with their round and bring them in line.
/// A round that moves on while the pass runs is skipped; its own transition already
/// wrote its matches. Returns the ids of repaired matches.
pub async fn repair_match_statuses<S: Store + ?Sized>(
    store: &S,
) -> Result<Vec<MatchId>, TournamentError> {
    let mut repaired = Vec::new();
    for round in store.list_rounds().await? {
        let stale = store
            .list_matches(MatchFilter::round(round.id))
            .await?
            .iter()
            .any(|m| m.status != round.status);
        if !stale {
            continue;
        }
        let ids = match store
            .set_round_match_status(round.id, round.version, round.status)
            .await
        {
            Ok(ids) => ids,
            Err(StoreError::Conflict(reason)) => {
                log::info!("Skipping repair of round {}: {}", round.number, reason);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        log::warn!(
            "Repaired {} match statuses in round {} to {}",
            ids.len(),
            round.number,
            round.status
        );
        repaired.extend(ids);
    }
    Ok(repaired)
}
