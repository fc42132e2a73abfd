//! Derived standings rows (never persisted).

use crate::models::team::{GroupId, Team, TeamId};
use serde::{Deserialize, Serialize};

/// One team's group-stage record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub team_id: TeamId,
    pub name: String,
    pub group: String,
    pub played: u32,
    pub wins: u32,
    pub losses: u32,
    pub points_for: u64,
    pub points_against: u64,
    /// `points_for - points_against`.
    pub diff: i64,
    /// Points for per match played, 0 when nothing played.
    pub ppg: f64,
}

impl Standing {
    /// Fresh zeroed record for a team in the named group.
    pub fn new(team: &Team, group: impl Into<String>) -> Self {
        Self {
            team_id: team.id,
            name: team.name.clone(),
            group: group.into(),
            played: 0,
            wins: 0,
            losses: 0,
            points_for: 0,
            points_against: 0,
            diff: 0,
            ppg: 0.0,
        }
    }

    /// Record one finished match from this team's point of view.
    pub fn record(&mut self, scored: u32, conceded: u32) {
        self.played += 1;
        self.points_for += u64::from(scored);
        self.points_against += u64::from(conceded);
        if scored > conceded {
            self.wins += 1;
        } else if scored < conceded {
            self.losses += 1;
        }
        self.refresh_derived();
    }

    fn refresh_derived(&mut self) {
        // Sums of u32 scores stay far below i64::MAX.
        self.diff = self.points_for as i64 - self.points_against as i64;
        self.ppg = if self.played > 0 {
            self.points_for as f64 / f64::from(self.played)
        } else {
            0.0
        };
    }
}

/// Ranked table for one group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupTable {
    pub group_id: GroupId,
    pub name: String,
    pub rows: Vec<Standing>,
}

impl GroupTable {
    pub fn winner(&self) -> Option<&Standing> {
        self.rows.first()
    }

    pub fn runner_up(&self) -> Option<&Standing> {
        self.rows.get(1)
    }
}

/// Full standings: every group's table in group order, plus the seeded qualifier list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Standings {
    pub groups: Vec<GroupTable>,
    /// Group winners in group order, then the best runner-up. Order is bracket seeding.
    pub qualifiers: Vec<TeamId>,
}

impl Standings {
    pub fn group(&self, name: &str) -> Option<&GroupTable> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn standing(&self, team: TeamId) -> Option<&Standing> {
        self.groups
            .iter()
            .flat_map(|g| g.rows.iter())
            .find(|s| s.team_id == team)
    }
}
