//! Group-stage standings and semifinal qualifier selection.

use crate::models::{
    GameMatch, Group, GroupTable, Standing, Standings, Team, TeamId, Tournament, TournamentError,
};
use crate::store::{load_tournament, Store};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Rank every group and pick qualifiers.
///
/// 1. One zeroed row per team whose group exists (ungrouped teams are left out).
/// 2. Apply each match to both teams; matches with an unknown team are skipped.
/// 3. Sort each group: wins, then diff, then ppg, all descending; full ties keep team order.
/// 4. Qualifiers: every group winner in group order, then the runner-up with the best ppg
///    (first one wins a tie).
///
/// `matches` must already be limited to finished group-stage matches.
pub fn compute_standings<'a>(
    groups: &[Group],
    teams: &[Team],
    matches: impl IntoIterator<Item = &'a GameMatch>,
) -> Standings {
    let mut tables: Vec<GroupTable> = groups
        .iter()
        .map(|g| GroupTable {
            group_id: g.id,
            name: g.name.clone(),
            rows: Vec::new(),
        })
        .collect();
    let group_pos: HashMap<_, _> = groups.iter().enumerate().map(|(i, g)| (g.id, i)).collect();

    // team -> (table, row)
    let mut slot: HashMap<TeamId, (usize, usize)> = HashMap::new();
    for team in teams {
        let Some(&gi) = team.group_id.as_ref().and_then(|g| group_pos.get(g)) else {
            continue;
        };
        let table = &mut tables[gi];
        slot.insert(team.id, (gi, table.rows.len()));
        table.rows.push(Standing::new(team, table.name.clone()));
    }

    for m in matches {
        let (Some(&(g1, r1)), Some(&(g2, r2))) = (slot.get(&m.team1_id), slot.get(&m.team2_id))
        else {
            log::debug!("skipping match {} with a team outside the standings", m.id);
            continue;
        };
        tables[g1].rows[r1].record(m.score1, m.score2);
        tables[g2].rows[r2].record(m.score2, m.score1);
    }

    for table in &mut tables {
        table.rows.sort_by(rank);
    }

    let qualifiers = select_qualifiers(&tables);
    Standings {
        groups: tables,
        qualifiers,
    }
}

/// Ordering for a group table: better teams first.
fn rank(a: &Standing, b: &Standing) -> Ordering {
    b.wins
        .cmp(&a.wins)
        .then_with(|| b.diff.cmp(&a.diff))
        .then_with(|| b.ppg.total_cmp(&a.ppg))
}

fn select_qualifiers(tables: &[GroupTable]) -> Vec<TeamId> {
    let mut qualifiers: Vec<TeamId> = tables
        .iter()
        .filter_map(|t| t.winner().map(|s| s.team_id))
        .collect();

    let mut best_second: Option<&Standing> = None;
    for second in tables.iter().filter_map(GroupTable::runner_up) {
        if best_second.map_or(true, |best| second.ppg > best.ppg) {
            best_second = Some(second);
        }
    }
    qualifiers.extend(best_second.map(|s| s.team_id));
    qualifiers
}

/// Standings over a snapshot: only finished matches of group-stage rounds count.
pub fn standings_for(tournament: &Tournament) -> Standings {
    compute_standings(
        &tournament.groups,
        &tournament.teams,
        tournament.finished_group_matches(),
    )
}

/// Load the current snapshot and compute standings from it.
pub async fn load_standings<S: Store + ?Sized>(store: &S) -> Result<Standings, TournamentError> {
    let tournament = load_tournament(store).await?;
    Ok(standings_for(&tournament))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Round, RoundType, Status};

    struct Fixture {
        groups: Vec<Group>,
        teams: Vec<Team>,
    }

    impl Fixture {
        /// Groups named A, B, ... with `sizes[i]` teams each, named T1, T2, ... across groups.
        fn new(sizes: &[usize]) -> Self {
            let mut groups = Vec::new();
            let mut teams = Vec::new();
            for (gi, &n) in sizes.iter().enumerate() {
                let g = Group::new(((b'A' + gi as u8) as char).to_string());
                for _ in 0..n {
                    teams.push(Team::new(format!("T{}", teams.len() + 1), Some(g.id)));
                }
                groups.push(g);
            }
            Self { groups, teams }
        }

        fn id(&self, name: &str) -> TeamId {
            self.teams.iter().find(|t| t.name == name).unwrap().id
        }

        fn game(&self, a: &str, sa: u32, b: &str, sb: u32) -> GameMatch {
            let mut m = GameMatch::new(uuid::Uuid::nil(), 1, self.id(a), self.id(b));
            m.score1 = sa;
            m.score2 = sb;
            m.status = Status::Finished;
            m
        }

        fn names(&self, table: &GroupTable) -> Vec<String> {
            table.rows.iter().map(|s| s.name.clone()).collect()
        }
    }

    #[test]
    fn worked_example_orders_by_wins_then_diff() {
        let f = Fixture::new(&[3, 3]);
        let matches = vec![
            f.game("T1", 21, "T2", 10),
            f.game("T2", 5, "T3", 20),
            f.game("T1", 15, "T3", 15),
            f.game("T4", 30, "T5", 10),
            f.game("T5", 12, "T6", 18),
            f.game("T4", 9, "T6", 9),
        ];
        let s = compute_standings(&f.groups, &f.teams, &matches);

        let a = s.group("A").unwrap();
        // T1 and T3 both have one win; T3 has the better diff (+15 vs +11).
        assert_eq!(f.names(a), ["T3", "T1", "T2"]);
        let t1 = s.standing(f.id("T1")).unwrap();
        assert_eq!((t1.played, t1.wins, t1.losses), (2, 1, 0));
        assert_eq!((t1.points_for, t1.points_against, t1.diff), (36, 25, 11));
        assert_eq!(t1.ppg, 18.0);

        let b = s.group("B").unwrap();
        assert_eq!(f.names(b), ["T4", "T6", "T5"]);

        // Winners T3, T4; runner-ups T1 (18.0 ppg) and T6 (13.5 ppg).
        assert_eq!(s.qualifiers, vec![f.id("T3"), f.id("T4"), f.id("T1")]);
    }

    #[test]
    fn ties_count_as_played_but_not_as_wins_or_losses() {
        let f = Fixture::new(&[2]);
        let s = compute_standings(&f.groups, &f.teams, &[f.game("T1", 7, "T2", 7)]);
        for row in &s.group("A").unwrap().rows {
            assert_eq!((row.played, row.wins, row.losses), (1, 0, 0));
            assert_eq!(row.diff, 0);
        }
    }

    #[test]
    fn wins_in_group_equal_decisive_matches() {
        let f = Fixture::new(&[4]);
        let matches = vec![
            f.game("T1", 10, "T2", 3),
            f.game("T3", 4, "T4", 4),
            f.game("T2", 11, "T3", 9),
            f.game("T4", 1, "T1", 2),
            f.game("T1", 5, "T3", 5),
        ];
        let decisive = matches.iter().filter(|m| m.score1 != m.score2).count() as u32;
        let s = compute_standings(&f.groups, &f.teams, &matches);
        let rows = &s.group("A").unwrap().rows;
        assert_eq!(rows.iter().map(|r| r.wins).sum::<u32>(), decisive);
        assert_eq!(rows.iter().map(|r| r.losses).sum::<u32>(), decisive);
        for r in rows {
            assert_eq!(r.diff, r.points_for as i64 - r.points_against as i64);
            let ppg = if r.played == 0 {
                0.0
            } else {
                r.points_for as f64 / f64::from(r.played)
            };
            assert_eq!(r.ppg, ppg);
        }
    }

    #[test]
    fn ordering_falls_through_to_ppg_then_input_order() {
        let f = Fixture::new(&[5]);
        // T1, T2: one win each, diff +2; T2 scored more per game.
        // T4, T5 never play and stay level on everything.
        let matches = vec![
            f.game("T1", 4, "T3", 2),
            f.game("T2", 12, "T3", 10),
        ];
        let s = compute_standings(&f.groups, &f.teams, &matches);
        assert_eq!(f.names(s.group("A").unwrap()), ["T2", "T1", "T4", "T5", "T3"]);
    }

    #[test]
    fn qualifiers_are_groups_plus_one_when_every_group_has_two() {
        let f = Fixture::new(&[2, 3, 2]);
        let s = compute_standings(&f.groups, &f.teams, std::iter::empty());
        assert_eq!(s.qualifiers.len(), f.groups.len() + 1);
    }

    #[test]
    fn small_groups_contribute_no_runner_up() {
        let f = Fixture::new(&[1, 1, 0]);
        let s = compute_standings(&f.groups, &f.teams, std::iter::empty());
        assert_eq!(s.qualifiers, vec![f.id("T1"), f.id("T2")]);
    }

    #[test]
    fn best_second_tie_goes_to_first_group() {
        let f = Fixture::new(&[2, 2]);
        let matches = vec![f.game("T1", 10, "T2", 6), f.game("T3", 10, "T4", 6)];
        let s = compute_standings(&f.groups, &f.teams, &matches);
        assert_eq!(s.qualifiers, vec![f.id("T1"), f.id("T3"), f.id("T2")]);
    }

    #[test]
    fn ungrouped_teams_are_excluded() {
        let mut f = Fixture::new(&[2]);
        let loner = Team::new("Loner", None);
        f.teams.push(loner.clone());
        let mut m = f.game("T1", 3, "T2", 1);
        m.team2_id = loner.id;
        let s = compute_standings(&f.groups, &f.teams, &[m]);
        assert!(s.standing(loner.id).is_none());
        assert_eq!(s.standing(f.id("T1")).unwrap().played, 0);
    }

    #[test]
    fn knockout_and_unfinished_matches_do_not_count() {
        let f = Fixture::new(&[2]);
        let group = Round::new(1, RoundType::Group);
        let semi = Round::new(2, RoundType::Semi);
        let mut counted = f.game("T1", 3, "T2", 1);
        counted.round_id = group.id;
        let mut knockout = f.game("T2", 30, "T1", 0);
        knockout.round_id = semi.id;
        let mut live = f.game("T2", 30, "T1", 0);
        live.round_id = group.id;
        live.status = Status::Active;

        let t = Tournament::new(
            f.groups.clone(),
            f.teams.clone(),
            vec![group, semi],
            vec![counted, knockout, live],
        );
        let s = standings_for(&t);
        let t1 = s.standing(f.id("T1")).unwrap();
        assert_eq!((t1.played, t1.wins, t1.points_for), (1, 1, 3));
    }

    #[test]
    fn totals_hold_scores_past_u32() {
        let f = Fixture::new(&[2]);
        let matches = vec![
            f.game("T1", u32::MAX, "T2", 0),
            f.game("T1", u32::MAX, "T2", 1),
        ];
        let s = compute_standings(&f.groups, &f.teams, &matches);

        let t1 = s.standing(f.id("T1")).unwrap();
        assert_eq!(t1.points_for, 2 * u64::from(u32::MAX));
        assert_eq!(t1.diff, 2 * i64::from(u32::MAX) - 1);
        assert_eq!(t1.ppg, f64::from(u32::MAX));
    }
}
