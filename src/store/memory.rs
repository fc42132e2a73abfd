//! In-process store: four tables behind one lock, with a change feed.

use super::{
    ChangeEvent, ChangeFeed, EventFilter, MatchFilter, MatchUpdate, Row, RowFilter, Store,
    Subscription,
};
use crate::models::{
    GameMatch, Group, MatchId, Round, RoundId, ScoreField, Status, StoreError, Table, Team,
};
use async_trait::async_trait;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    groups: Vec<Group>,
    teams: Vec<Team>,
    rounds: Vec<Round>,
    matches: Vec<GameMatch>,
}

impl Tables {
    fn check_match_refs(
        &self,
        m: &GameMatch,
        pending_round: Option<RoundId>,
    ) -> Result<(), StoreError> {
        if pending_round != Some(m.round_id) && !self.rounds.iter().any(|r| r.id == m.round_id) {
            return Err(StoreError::NotFound {
                table: Table::Rounds,
                id: m.round_id,
            });
        }
        for team in [m.team1_id, m.team2_id] {
            if !self.teams.iter().any(|t| t.id == team) {
                return Err(StoreError::NotFound {
                    table: Table::Teams,
                    id: team,
                });
            }
        }
        if m.team1_id == m.team2_id {
            return Err(StoreError::Conflict("a team cannot play itself".into()));
        }
        Ok(())
    }

    fn check_round_number(&self, round: &Round) -> Result<(), StoreError> {
        if self.rounds.iter().any(|r| r.number == round.number) {
            return Err(StoreError::Conflict(format!(
                "round number {} already exists",
                round.number
            )));
        }
        Ok(())
    }
}

/// Store kept in memory. Cheap to share behind an `Arc`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    feed: ChangeFeed,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        Ok(self.tables.read().await.groups.clone())
    }

    async fn insert_group(&self, group: Group) -> Result<Group, StoreError> {
        let mut t = self.tables.write().await;
        if t.groups.iter().any(|g| g.name == group.name) {
            return Err(StoreError::Conflict(format!(
                "group {} already exists",
                group.name
            )));
        }
        t.groups.push(group.clone());
        self.feed.publish(ChangeEvent::insert(Row::Group(group.clone())));
        Ok(group)
    }

    async fn list_teams(&self) -> Result<Vec<Team>, StoreError> {
        Ok(self.tables.read().await.teams.clone())
    }

    async fn insert_team(&self, team: Team) -> Result<Team, StoreError> {
        let mut t = self.tables.write().await;
        if let Some(group_id) = team.group_id {
            if !t.groups.iter().any(|g| g.id == group_id) {
                return Err(StoreError::NotFound {
                    table: Table::Groups,
                    id: group_id,
                });
            }
        }
        t.teams.push(team.clone());
        self.feed.publish(ChangeEvent::insert(Row::Team(team.clone())));
        Ok(team)
    }

    async fn list_rounds(&self) -> Result<Vec<Round>, StoreError> {
        let mut rounds = self.tables.read().await.rounds.clone();
        rounds.sort_by_key(|r| r.number);
        Ok(rounds)
    }

    async fn get_round(&self, id: RoundId) -> Result<Option<Round>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .rounds
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn insert_round(
        &self,
        round: Round,
        matches: Vec<GameMatch>,
    ) -> Result<Round, StoreError> {
        let mut t = self.tables.write().await;
        t.check_round_number(&round)?;
        for m in &matches {
            if m.round_id != round.id {
                return Err(StoreError::Conflict(format!(
                    "match {} does not belong to round {}",
                    m.id, round.id
                )));
            }
            t.check_match_refs(m, Some(round.id))?;
        }
        t.rounds.push(round.clone());
        self.feed.publish(ChangeEvent::insert(Row::Round(round.clone())));
        for m in matches {
            t.matches.push(m.clone());
            self.feed.publish(ChangeEvent::insert(Row::Match(m)));
        }
        Ok(round)
    }

    async fn list_matches(&self, filter: MatchFilter) -> Result<Vec<GameMatch>, StoreError> {
        let mut matches: Vec<GameMatch> = self
            .tables
            .read()
            .await
            .matches
            .iter()
            .filter(|m| filter.accepts(m))
            .cloned()
            .collect();
        matches.sort_by_key(|m| m.court);
        Ok(matches)
    }

    async fn get_match(&self, id: MatchId) -> Result<Option<GameMatch>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .matches
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn insert_match(&self, game: GameMatch) -> Result<GameMatch, StoreError> {
        let mut t = self.tables.write().await;
        t.check_match_refs(&game, None)?;
        t.matches.push(game.clone());
        self.feed.publish(ChangeEvent::insert(Row::Match(game.clone())));
        Ok(game)
    }

    async fn update_match_score(
        &self,
        id: MatchId,
        field: ScoreField,
        value: u32,
    ) -> Result<GameMatch, StoreError> {
        let mut t = self.tables.write().await;
        let m = t
            .matches
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StoreError::NotFound {
                table: Table::Matches,
                id,
            })?;
        let old = m.clone();
        m.set_score(field, value);
        m.version += 1;
        let new = m.clone();
        self.feed
            .publish(ChangeEvent::update(Row::Match(old), Row::Match(new.clone())));
        Ok(new)
    }

    async fn transition_round(
        &self,
        round: Round,
        matches: Option<MatchUpdate>,
    ) -> Result<Round, StoreError> {
        let mut t = self.tables.write().await;
        let stored = t
            .rounds
            .iter_mut()
            .find(|r| r.id == round.id)
            .ok_or(StoreError::NotFound {
                table: Table::Rounds,
                id: round.id,
            })?;
        if stored.version != round.version {
            return Err(StoreError::Conflict(format!(
                "round {} changed concurrently (version {} != {})",
                round.id, stored.version, round.version
            )));
        }
        let old = std::mem::replace(stored, round);
        stored.version += 1;
        let new = stored.clone();
        self.feed
            .publish(ChangeEvent::update(Row::Round(old), Row::Round(new.clone())));

        if let Some(update) = matches {
            for m in t.matches.iter_mut().filter(|m| m.round_id == new.id) {
                let old = m.clone();
                m.status = update.status;
                if update.clear_scores {
                    m.score1 = 0;
                    m.score2 = 0;
                }
                m.version += 1;
                self.feed
                    .publish(ChangeEvent::update(Row::Match(old), Row::Match(m.clone())));
            }
        }
        Ok(new)
    }

    async fn set_round_match_status(
        &self,
        round_id: RoundId,
        round_version: u64,
        status: Status,
    ) -> Result<Vec<MatchId>, StoreError> {
        let mut t = self.tables.write().await;
        let round = t
            .rounds
            .iter()
            .find(|r| r.id == round_id)
            .ok_or(StoreError::NotFound {
                table: Table::Rounds,
                id: round_id,
            })?;
        if round.version != round_version {
            return Err(StoreError::Conflict(format!(
                "round {} changed concurrently (version {} != {})",
                round_id, round.version, round_version
            )));
        }
        let mut changed = Vec::new();
        for m in t
            .matches
            .iter_mut()
            .filter(|m| m.round_id == round_id && m.status != status)
        {
            let old = m.clone();
            m.status = status;
            m.version += 1;
            changed.push(m.id);
            self.feed
                .publish(ChangeEvent::update(Row::Match(old), Row::Match(m.clone())));
        }
        Ok(changed)
    }

    async fn delete_round(&self, id: RoundId) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        let idx = t
            .rounds
            .iter()
            .position(|r| r.id == id)
            .ok_or(StoreError::NotFound {
                table: Table::Rounds,
                id,
            })?;
        let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut t.matches)
            .into_iter()
            .partition(|m| m.round_id == id);
        t.matches = kept;
        for m in gone {
            self.feed.publish(ChangeEvent::delete(Row::Match(m)));
        }
        let round = t.rounds.remove(idx);
        self.feed.publish(ChangeEvent::delete(Row::Round(round)));
        Ok(())
    }

    fn subscribe(
        &self,
        table: Table,
        events: EventFilter,
        filter: Option<RowFilter>,
    ) -> Subscription {
        self.feed.subscribe(table, events, filter)
    }
}
