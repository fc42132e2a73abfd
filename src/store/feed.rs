//! Change feed: per-table insert/update/delete notifications with column filters.

use crate::models::{GameMatch, Group, Round, RoundId, Table, Team};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Default number of buffered events per subscriber before it lags.
pub const FEED_CAPACITY: usize = 256;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Which change kinds a subscription wants (`*` or one kind).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EventFilter {
    #[default]
    All,
    Only(ChangeKind),
}

impl EventFilter {
    fn accepts(self, kind: ChangeKind) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Only(k) => k == kind,
        }
    }
}

/// A row of any table, as carried in change events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "table", content = "row", rename_all = "snake_case")]
pub enum Row {
    Group(Group),
    Team(Team),
    Round(Round),
    Match(GameMatch),
}

impl Row {
    pub fn table(&self) -> Table {
        match self {
            Row::Group(_) => Table::Groups,
            Row::Team(_) => Table::Teams,
            Row::Round(_) => Table::Rounds,
            Row::Match(_) => Table::Matches,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Row::Group(g) => g.id,
            Row::Team(t) => t.id,
            Row::Round(r) => r.id,
            Row::Match(m) => m.id,
        }
    }
}

/// Equality filter on one column of the subscribed table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RowFilter {
    Id(Uuid),
    /// `matches.court`
    Court(u32),
    /// `matches.round_id`
    RoundId(RoundId),
}

impl RowFilter {
    fn accepts(self, row: &Row) -> bool {
        match (self, row) {
            (RowFilter::Id(id), row) => row.id() == id,
            (RowFilter::Court(court), Row::Match(m)) => m.court == court,
            (RowFilter::RoundId(round), Row::Match(m)) => m.round_id == round,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub old: Option<Row>,
    pub new: Option<Row>,
}

impl ChangeEvent {
    pub fn insert(row: Row) -> Self {
        Self {
            table: row.table(),
            kind: ChangeKind::Insert,
            old: None,
            new: Some(row),
        }
    }

    pub fn update(old: Row, new: Row) -> Self {
        Self {
            table: new.table(),
            kind: ChangeKind::Update,
            old: Some(old),
            new: Some(new),
        }
    }

    pub fn delete(row: Row) -> Self {
        Self {
            table: row.table(),
            kind: ChangeKind::Delete,
            old: Some(row),
            new: None,
        }
    }

    /// The updated match row, if this event carries one.
    pub fn new_match(&self) -> Option<&GameMatch> {
        match &self.new {
            Some(Row::Match(m)) => Some(m),
            _ => None,
        }
    }
}

/// What a subscriber sees: a change, or notice that it fell behind and must re-fetch.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    Change(ChangeEvent),
    Lagged(u64),
}

/// Fan-out point for change events. Publishing with no subscribers is fine.
#[derive(Clone, Debug)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(FEED_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: ChangeEvent) {
        // Err only means nobody is listening.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(
        &self,
        table: Table,
        events: EventFilter,
        filter: Option<RowFilter>,
    ) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            table,
            events,
            filter,
        }
    }
}

/// Live subscription to one table. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<ChangeEvent>,
    table: Table,
    events: EventFilter,
    filter: Option<RowFilter>,
}

impl Subscription {
    fn wants(&self, event: &ChangeEvent) -> bool {
        if event.table != self.table || !self.events.accepts(event.kind) {
            return false;
        }
        match self.filter {
            None => true,
            Some(f) => event
                .new
                .as_ref()
                .or(event.old.as_ref())
                .is_some_and(|row| f.accepts(row)),
        }
    }

    /// Wait for the next matching notification. None once the feed is gone.
    pub async fn recv(&mut self) -> Option<Notification> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.wants(&event) => return Some(Notification::Change(event)),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    log::warn!("{} subscription lagged by {} events", self.table, n);
                    return Some(Notification::Lagged(n));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching notification already buffered, without waiting.
    pub fn try_recv(&mut self) -> Option<Notification> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if self.wants(&event) => return Some(Notification::Change(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    log::warn!("{} subscription lagged by {} events", self.table, n);
                    return Some(Notification::Lagged(n));
                }
                Err(_) => return None,
            }
        }
    }
}
