//! Group and Team data structures.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a group.
pub type GroupId = Uuid;

/// Unique identifier for a team (used in matches and lookups).
pub type TeamId = Uuid;

/// A group of the group stage. Names are unique display labels.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// A team. Teams without a group are valid but never appear in standings.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub group_id: Option<GroupId>,
}

impl Team {
    pub fn new(name: impl Into<String>, group_id: Option<GroupId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            group_id,
        }
    }
}
