//! Knockout stage: semifinals seeded from the standings, then the final.

use crate::logic::standings::standings_for;
use crate::models::{GameMatch, Round, RoundType, Status, TeamId, Tournament, TournamentError};
use crate::store::{load_tournament, Store};
use serde::Serialize;

/// A round created by the bracket, with its matches.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GeneratedRound {
    pub round: Round,
    pub matches: Vec<GameMatch>,
}

/// Fixed bracket: seed 1 vs 4 on court 1, seed 2 vs 3 on court 2.
pub fn semifinal_pairings(qualifiers: &[TeamId]) -> Result<[(TeamId, TeamId); 2], TournamentError> {
    match qualifiers {
        [s1, s2, s3, s4, ..] => Ok([(*s1, *s4), (*s2, *s3)]),
        _ => Err(TournamentError::InsufficientQualifiers {
            found: qualifiers.len(),
        }),
    }
}

/// The two semifinal winners, in court order.
///
/// Requires exactly one finished semifinal round holding exactly two finished matches,
/// neither of them tied.
pub fn final_pairing(tournament: &Tournament) -> Result<(TeamId, TeamId), TournamentError> {
    let semis: Vec<&Round> = tournament
        .rounds
        .iter()
        .filter(|r| r.round_type == RoundType::Semi && r.status == Status::Finished)
        .collect();
    let [semi] = semis.as_slice() else {
        return Err(TournamentError::SemifinalsNotFinished { found: semis.len() });
    };

    let mut finished: Vec<&GameMatch> = tournament
        .matches_in_round(semi.id)
        .filter(|m| m.status == Status::Finished)
        .collect();
    finished.sort_by_key(|m| m.court);
    let [first, second] = finished.as_slice() else {
        return Err(TournamentError::InvalidSemifinalResult {
            finished: finished.len(),
        });
    };

    let winner = |m: &GameMatch| m.winner().ok_or(TournamentError::SemifinalTied(m.id));
    Ok((winner(*first)?, winner(*second)?))
}

fn knockout_round(
    tournament: &Tournament,
    round_type: RoundType,
    pairings: &[(TeamId, TeamId)],
) -> GeneratedRound {
    let round = Round::new(tournament.next_round_number(), round_type);
    let matches = pairings
        .iter()
        .zip(1..)
        .map(|(&(a, b), court)| GameMatch::new(round.id, court, a, b))
        .collect();
    GeneratedRound { round, matches }
}

/// Create the semifinal round from the current standings. Nothing is written on error.
///
/// Calling this twice creates two semifinal rounds.
pub async fn generate_semifinals<S: Store + ?Sized>(
    store: &S,
) -> Result<GeneratedRound, TournamentError> {
    let tournament = load_tournament(store).await?;
    let standings = standings_for(&tournament);
    let pairings = semifinal_pairings(&standings.qualifiers)?;

    let generated = knockout_round(&tournament, RoundType::Semi, &pairings);
    let round = store
        .insert_round(generated.round.clone(), generated.matches.clone())
        .await?;
    log::info!(
        "Generated semifinals as round {} from {} qualifiers",
        round.number,
        standings.qualifiers.len()
    );
    Ok(GeneratedRound { round, ..generated })
}

/// Create the final round from the finished semifinals. Nothing is written on error.
pub async fn generate_final<S: Store + ?Sized>(
    store: &S,
) -> Result<GeneratedRound, TournamentError> {
    let tournament = load_tournament(store).await?;
    let pairing = final_pairing(&tournament)?;

    let generated = knockout_round(&tournament, RoundType::Final, &[pairing]);
    let round = store
        .insert_round(generated.round.clone(), generated.matches.clone())
        .await?;
    log::info!("Generated final as round {}", round.number);
    Ok(GeneratedRound { round, ..generated })
}
