//! Admin setup: groups, teams, group-stage rounds, and matches.

use crate::models::{
    GameMatch, Group, GroupId, Round, RoundId, RoundType, Team, TeamId, TournamentError,
};
use crate::store::Store;

/// Add a group. Names are trimmed and must be unique.
pub async fn create_group<S: Store + ?Sized>(
    store: &S,
    name: &str,
) -> Result<Group, TournamentError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TournamentError::EmptyName);
    }
    if store.list_groups().await?.iter().any(|g| g.name == name) {
        return Err(TournamentError::DuplicateGroupName);
    }
    let group = store.insert_group(Group::new(name)).await?;
    log::info!("Created group {}", group.name);
    Ok(group)
}

/// Add a team, optionally into an existing group.
pub async fn create_team<S: Store + ?Sized>(
    store: &S,
    name: &str,
    group_id: Option<GroupId>,
) -> Result<Team, TournamentError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TournamentError::EmptyName);
    }
    if let Some(id) = group_id {
        if !store.list_groups().await?.iter().any(|g| g.id == id) {
            return Err(TournamentError::GroupNotFound(id));
        }
    }
    let team = store.insert_team(Team::new(name, group_id)).await?;
    log::info!("Created team {}", team.name);
    Ok(team)
}

/// Add a group-stage round with the given number.
pub async fn create_round<S: Store + ?Sized>(
    store: &S,
    number: u32,
) -> Result<Round, TournamentError> {
    if store.list_rounds().await?.iter().any(|r| r.number == number) {
        return Err(TournamentError::DuplicateRoundNumber(number));
    }
    let round = store
        .insert_round(Round::new(number, RoundType::Group), Vec::new())
        .await?;
    log::info!("Created round {}", round.number);
    Ok(round)
}

/// Add a match to a round. Courts run from 1 to `courts`.
pub async fn create_match<S: Store + ?Sized>(
    store: &S,
    round_id: RoundId,
    court: u32,
    team1_id: TeamId,
    team2_id: TeamId,
    courts: u32,
) -> Result<GameMatch, TournamentError> {
    if court == 0 || court > courts {
        return Err(TournamentError::InvalidCourt { court, courts });
    }
    if team1_id == team2_id {
        return Err(TournamentError::SameTeam);
    }
    let round = store
        .get_round(round_id)
        .await?
        .ok_or(TournamentError::RoundNotFound(round_id))?;
    let teams = store.list_teams().await?;
    for id in [team1_id, team2_id] {
        if !teams.iter().any(|t| t.id == id) {
            return Err(TournamentError::TeamNotFound(id));
        }
    }

    let mut game = GameMatch::new(round_id, court, team1_id, team2_id);
    // New matches join the round's current state.
    game.status = round.status;
    let game = store.insert_match(game).await?;
    log::info!("Created match on court {} in round {}", court, round.number);
    Ok(game)
}
