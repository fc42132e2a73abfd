//! Single binary web server: admin, court, and standings views as a JSON API.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default. Override with env: HOST, PORT, COURTS,
//! RESTART_CLEARS_SCORES.

use actix_web::{
    delete, get, post,
    web::{Data, Json, Path},
    App, HttpResponse, HttpServer, Responder,
};
use court_tournament::{
    create_group, create_match, create_round, create_team, generate_final, generate_semifinals,
    load_standings, repair_match_statuses, store::MatchFilter, BroadcastHub, Clock, Config,
    CourtSession, GroupId, MemoryStore, RoundAction, RoundController, RoundId, ScoreDelta,
    ScoreField, Store, StoreError, SystemClock, TeamId, TournamentError,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

struct AppState {
    store: Arc<MemoryStore>,
    rounds: RoundController<MemoryStore>,
    /// One session per court, created at startup for courts 1..=COURTS.
    courts: HashMap<u32, Mutex<CourtSession<MemoryStore>>>,
    clock: Arc<dyn Clock>,
    config: Config,
}

type State = Data<AppState>;

/// How often round/match status consistency is checked.
const REPAIR_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
struct CreateGroupBody {
    name: String,
}

#[derive(Deserialize)]
struct CreateTeamBody {
    name: String,
    #[serde(default)]
    group_id: Option<GroupId>,
}

#[derive(Deserialize)]
struct CreateRoundBody {
    number: u32,
}

#[derive(Deserialize)]
struct CreateMatchBody {
    round_id: RoundId,
    court: u32,
    team1_id: TeamId,
    team2_id: TeamId,
}

#[derive(Deserialize)]
struct ScoreBody {
    match_id: Uuid,
    field: ScoreField,
    delta: ScoreDelta,
}

#[derive(Serialize)]
struct StandingsResponse {
    #[serde(flatten)]
    standings: court_tournament::Standings,
    qualifier_names: Vec<String>,
}

fn error_response(e: TournamentError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string() });
    if e.is_not_found() {
        HttpResponse::NotFound().json(body)
    } else if matches!(e, TournamentError::Store(StoreError::Unavailable(_))) {
        HttpResponse::ServiceUnavailable().json(body)
    } else {
        HttpResponse::BadRequest().json(body)
    }
}

fn respond<T: Serialize>(result: Result<T, TournamentError>) -> HttpResponse {
    match result {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => error_response(e),
    }
}

fn store_response<T: Serialize>(result: Result<T, StoreError>) -> HttpResponse {
    respond(result.map_err(TournamentError::from))
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "court-tournament",
    })
}

#[get("/api/groups")]
async fn api_list_groups(state: State) -> HttpResponse {
    store_response(state.store.list_groups().await)
}

#[post("/api/groups")]
async fn api_create_group(state: State, body: Json<CreateGroupBody>) -> HttpResponse {
    respond(create_group(state.store.as_ref(), &body.name).await)
}

#[get("/api/teams")]
async fn api_list_teams(state: State) -> HttpResponse {
    store_response(state.store.list_teams().await)
}

#[post("/api/teams")]
async fn api_create_team(state: State, body: Json<CreateTeamBody>) -> HttpResponse {
    respond(create_team(state.store.as_ref(), &body.name, body.group_id).await)
}

#[get("/api/rounds")]
async fn api_list_rounds(state: State) -> HttpResponse {
    store_response(state.store.list_rounds().await)
}

#[post("/api/rounds")]
async fn api_create_round(state: State, body: Json<CreateRoundBody>) -> HttpResponse {
    respond(create_round(state.store.as_ref(), body.number).await)
}

/// Check every round's matches against the round status and fix mismatches.
#[post("/api/rounds/repair")]
async fn api_repair_rounds(state: State) -> HttpResponse {
    respond(repair_match_statuses(state.store.as_ref()).await)
}

/// start / pause / resume / finish / restart.
#[post("/api/rounds/{id}/{action}")]
async fn api_round_action(state: State, path: Path<(RoundId, RoundAction)>) -> HttpResponse {
    let (id, action) = path.into_inner();
    respond(state.rounds.apply(id, action).await)
}

/// Delete a semifinal or final round and its matches.
#[delete("/api/rounds/{id}")]
async fn api_delete_round(state: State, path: Path<RoundId>) -> HttpResponse {
    match state.rounds.delete(path.into_inner()).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => error_response(e),
    }
}

#[get("/api/matches")]
async fn api_list_matches(state: State) -> HttpResponse {
    store_response(state.store.list_matches(MatchFilter::default()).await)
}

#[post("/api/matches")]
async fn api_create_match(state: State, body: Json<CreateMatchBody>) -> HttpResponse {
    respond(
        create_match(
            state.store.as_ref(),
            body.round_id,
            body.court,
            body.team1_id,
            body.team2_id,
            state.config.courts,
        )
        .await,
    )
}

#[post("/api/brackets/semifinals")]
async fn api_generate_semifinals(state: State) -> HttpResponse {
    respond(generate_semifinals(state.store.as_ref()).await)
}

#[post("/api/brackets/final")]
async fn api_generate_final(state: State) -> HttpResponse {
    respond(generate_final(state.store.as_ref()).await)
}

#[get("/api/standings")]
async fn api_standings(state: State) -> HttpResponse {
    let standings = match load_standings(state.store.as_ref()).await {
        Ok(s) => s,
        Err(e) => return error_response(e),
    };
    let qualifier_names = standings
        .qualifiers
        .iter()
        .filter_map(|id| standings.standing(*id).map(|s| s.name.clone()))
        .collect();
    HttpResponse::Ok().json(StandingsResponse {
        standings,
        qualifier_names,
    })
}

fn court_not_found(court: u32) -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({ "error": format!("No court {}", court) }))
}

/// Active match on a court, with team names and the round clock.
#[get("/api/courts/{court}")]
async fn api_court(state: State, path: Path<u32>) -> HttpResponse {
    let court = path.into_inner();
    let Some(session) = state.courts.get(&court) else {
        return court_not_found(court);
    };
    let mut session = session.lock().await;
    if let Err(e) = session.sync().await {
        return error_response(e);
    }
    let view = session.view(state.clock.now());
    session.take_notice();
    HttpResponse::Ok().json(view)
}

/// Apply a +1/-1 score delta to the court's active match.
#[post("/api/courts/{court}/score")]
async fn api_court_score(state: State, path: Path<u32>, body: Json<ScoreBody>) -> HttpResponse {
    let court = path.into_inner();
    let Some(session) = state.courts.get(&court) else {
        return court_not_found(court);
    };
    let mut session = session.lock().await;
    if let Err(e) = session.sync().await {
        return error_response(e);
    }
    let outcome = session.apply_delta(body.match_id, body.field, body.delta).await;
    HttpResponse::Ok().json(outcome)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();
    let store = Arc::new(MemoryStore::new());
    let hub = BroadcastHub::new();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let mut courts = HashMap::new();
    for court in 1..=config.courts {
        let mut session = CourtSession::new(store.clone(), &hub, court);
        if let Err(e) = session.refresh().await {
            log::warn!("Court {} initial refresh failed: {}", court, e);
        }
        courts.insert(court, Mutex::new(session));
    }

    let bind = config.bind_addr();
    log::info!(
        "Starting server at http://{}:{} with {} courts ({:?} on restart)",
        bind.0,
        bind.1,
        config.courts,
        config.restart_policy
    );
    let bind = (bind.0.to_string(), bind.1);

    let state = Data::new(AppState {
        rounds: RoundController::new(store.clone(), &hub, clock.clone(), config.restart_policy),
        store,
        courts,
        clock,
        config,
    });

    // Background task: periodically bring match statuses in line with their rounds.
    let state_repair = state.clone();
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(REPAIR_INTERVAL);
        loop {
            interval.tick().await;
            match repair_match_statuses(state_repair.store.as_ref()).await {
                Ok(ids) if !ids.is_empty() => {
                    log::info!("Repair pass fixed {} match(es)", ids.len())
                }
                Ok(_) => {}
                Err(e) => log::warn!("Repair pass failed: {}", e),
            }
        }
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(api_health)
            .service(api_list_groups)
            .service(api_create_group)
            .service(api_list_teams)
            .service(api_create_team)
            .service(api_list_rounds)
            .service(api_create_round)
            .service(api_repair_rounds)
            .service(api_round_action)
            .service(api_delete_round)
            .service(api_list_matches)
            .service(api_create_match)
            .service(api_generate_semifinals)
            .service(api_generate_final)
            .service(api_standings)
            .service(api_court)
            .service(api_court_score)
    })
    .bind(bind)?
    .run()
    .await
}
