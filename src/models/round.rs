//! Round, its type and lifecycle status, and the court clock derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a round.
pub type RoundId = Uuid;

/// Stage of the tournament a round belongs to. Absent in input means group stage.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundType {
    #[default]
    Group,
    Semi,
    Final,
}

impl RoundType {
    /// Semifinal and final rounds are generated by the bracket and may be deleted.
    pub fn is_knockout(self) -> bool {
        matches!(self, RoundType::Semi | RoundType::Final)
    }
}

/// Lifecycle status shared by rounds and their matches.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pending,
    Active,
    Finished,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Pending => "pending",
            Status::Active => "active",
            Status::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// A scheduled set of concurrent matches sharing a start/pause/finish lifecycle.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub number: u32,
    #[serde(rename = "type", default)]
    pub round_type: RoundType,
    #[serde(default)]
    pub status: Status,
    /// Only meaningful while `status` is active.
    #[serde(default)]
    pub is_paused: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Accumulated seconds spent paused; only ever grows.
    #[serde(default)]
    pub total_paused_time: i64,
    /// Start of the currently open pause interval.
    pub last_pause_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: u64,
}

impl Round {
    pub fn new(number: u32, round_type: RoundType) -> Self {
        Self {
            id: Uuid::new_v4(),
            number,
            round_type,
            status: Status::Pending,
            is_paused: false,
            start_time: None,
            end_time: None,
            total_paused_time: 0,
            last_pause_start: None,
            version: 0,
        }
    }

    /// Seconds of play on the clock at `now`: wall time since start, minus closed pauses,
    /// minus the open pause interval if any. Finished rounds stop at `end_time`.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        let Some(start) = self.start_time else {
            return 0;
        };
        let end = match (self.status, self.end_time) {
            (Status::Finished, Some(end)) => end,
            _ => now,
        };
        let mut paused = self.total_paused_time;
        if self.is_paused {
            if let Some(pause_start) = self.last_pause_start {
                paused += (end - pause_start).num_seconds().max(0);
            }
        }
        ((end - start).num_seconds() - paused).max(0)
    }
}

/// Clock display as `m:ss`.
pub fn format_clock(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn elapsed_is_zero_before_start() {
        let r = Round::new(1, RoundType::Group);
        assert_eq!(r.elapsed_seconds(at(100)), 0);
    }

    #[test]
    fn elapsed_subtracts_closed_and_open_pauses() {
        let mut r = Round::new(1, RoundType::Group);
        r.status = Status::Active;
        r.start_time = Some(at(0));
        r.total_paused_time = 30;
        assert_eq!(r.elapsed_seconds(at(100)), 70);

        r.is_paused = true;
        r.last_pause_start = Some(at(90));
        assert_eq!(r.elapsed_seconds(at(100)), 60);
        // Clock stays frozen while paused.
        assert_eq!(r.elapsed_seconds(at(200)), 60);
    }

    #[test]
    fn finished_round_stops_at_end_time() {
        let mut r = Round::new(1, RoundType::Group);
        r.status = Status::Finished;
        r.start_time = Some(at(0));
        r.end_time = Some(at(600));
        assert_eq!(r.elapsed_seconds(at(5000)), 600);
    }

    #[test]
    fn round_type_defaults_to_group_when_missing() {
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "number": 3,
            "start_time": null,
            "end_time": null,
            "last_pause_start": null,
        });
        let r: Round = serde_json::from_value(json).unwrap();
        assert_eq!(r.round_type, RoundType::Group);
        assert_eq!(r.status, Status::Pending);
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(65), "1:05");
        assert_eq!(format_clock(-3), "0:00");
    }
}
