use axum::{
    extract::{Path, Query, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::now_ms;
use crate::error::{BracketError, ErrorKind};
use crate::scoring::parse_score;
use crate::store::TournamentStore;
use crate::types::*;

#[derive(Clone)]
pub struct ServerState {
    pub store: SharedStore,
    pub log_requests: bool,
}

pub struct ApiError(BracketError);

impl From<BracketError> for ApiError {
    fn from(err: BracketError) -> Self {
        ApiError(err)
    }
}

pub fn status_for(err: &BracketError) -> StatusCode {
    match err.kind() {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Precondition | ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (status_for(&self.0), self.0.to_string()).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ── Request bodies ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTournamentBody {
    pub name: String,
    pub game_name: String,
    #[serde(default)]
    pub participants: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDraftBody {
    pub name: String,
    pub game_name: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinBody {
    pub name: String,
}

/// Scores arrive as form text or JSON numbers; both go through the same parser.
#[derive(Debug, Deserialize)]
pub struct ScoreBody {
    pub score1: Value,
    pub score2: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotQuery {
    pub since_ms: Option<u64>,
}

fn score_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub fn parse_score_body(body: &ScoreBody) -> Result<(u32, u32), BracketError> {
    let score1 = parse_score(&score_text(&body.score1))?;
    let score2 = parse_score(&score_text(&body.score2))?;
    Ok((score1, score2))
}

// ── Helpers ─────────────────────────────────────────────────────────────

/// Lock the store, then call `f` with `(&mut TournamentStore, now_ms)`.
fn with_store<F, R>(state: &ServerState, op: &str, f: F) -> Result<R, BracketError>
where
    F: FnOnce(&mut TournamentStore, u64) -> Result<R, BracketError>,
{
    if state.log_requests {
        info!(op, "request");
    }
    let now = now_ms();
    let mut guard = state
        .store
        .lock()
        .map_err(|e| BracketError::StoreUnavailable(e.to_string()))?;
    f(&mut guard, now)
}

// ── Handlers ────────────────────────────────────────────────────────────

async fn list_tournaments(AxumState(state): AxumState<ServerState>) -> ApiResult<Vec<Tournament>> {
    let list = with_store(&state, "list", |store, _| Ok(store.list()))?;
    Ok(Json(list))
}

async fn create_tournament(
    AxumState(state): AxumState<ServerState>,
    Json(body): Json<CreateTournamentBody>,
) -> ApiResult<TournamentSnapshot> {
    let snapshot = with_store(&state, "create", |store, now| {
        store.create_tournament(&body.name, &body.game_name, &body.participants, now)
    })?;
    Ok(Json(snapshot))
}

async fn create_draft(
    AxumState(state): AxumState<ServerState>,
    Json(body): Json<CreateDraftBody>,
) -> ApiResult<Tournament> {
    let tournament = with_store(&state, "create_draft", |store, now| {
        store.create_draft(&body.name, &body.game_name, now)
    })?;
    Ok(Json(tournament))
}

async fn get_tournament(
    AxumState(state): AxumState<ServerState>,
    Path(id): Path<TournamentId>,
    Query(query): Query<SnapshotQuery>,
) -> ApiResult<TournamentSnapshot> {
    let snapshot = with_store(&state, "snapshot", |store, now| store.snapshot(id, query.since_ms, now))?;
    Ok(Json(snapshot))
}

async fn join_tournament(
    AxumState(state): AxumState<ServerState>,
    Path(id): Path<TournamentId>,
    Json(body): Json<JoinBody>,
) -> ApiResult<Participant> {
    let participant = with_store(&state, "join", |store, now| store.join(id, &body.name, now))?;
    Ok(Json(participant))
}

async fn leave_tournament(
    AxumState(state): AxumState<ServerState>,
    Path((id, participant_id)): Path<(TournamentId, ParticipantId)>,
) -> Result<StatusCode, ApiError> {
    with_store(&state, "leave", |store, now| store.leave(id, participant_id, now))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn start_tournament(
    AxumState(state): AxumState<ServerState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<TournamentSnapshot> {
    let snapshot = with_store(&state, "start", |store, now| store.start(id, now))?;
    Ok(Json(snapshot))
}

async fn submit_score(
    AxumState(state): AxumState<ServerState>,
    Path(match_id): Path<MatchId>,
    Json(body): Json<ScoreBody>,
) -> ApiResult<ScoreOutcome> {
    let (score1, score2) = parse_score_body(&body)?;
    let outcome = with_store(&state, "score", |store, now| {
        store.submit_score(match_id, score1, score2, now)
    })?;
    Ok(Json(outcome))
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/tournaments", get(list_tournaments).post(create_tournament))
        .route("/drafts", post(create_draft))
        .route("/tournaments/:id", get(get_tournament))
        .route("/tournaments/:id/participants", post(join_tournament))
        .route("/tournaments/:id/participants/:participant_id", delete(leave_tournament))
        .route("/tournaments/:id/start", post(start_tournament))
        .route("/matches/:id/score", post(submit_score))
        .with_state(state)
}

pub async fn serve(state: ServerState, addr: &str) {
    let app = router(state);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("bracket server failed to bind {addr}: {e}");
            return;
        }
    };
    info!("bracket server listening at http://{addr}/");
    if let Err(e) = axum::serve(listener, app).await {
        error!("bracket server error: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_score_body_accepts_text_and_numbers() {
        let body = ScoreBody { score1: json!(" 10"), score2: json!(5) };
        assert_eq!(parse_score_body(&body), Ok((10, 5)));
    }

    #[test]
    fn test_score_body_rejects_bad_values() {
        let negative = ScoreBody { score1: json!(-1), score2: json!(2) };
        assert_eq!(
            parse_score_body(&negative),
            Err(BracketError::NegativeScore("-1".to_string()))
        );
        let fractional = ScoreBody { score1: json!(2.5), score2: json!(2) };
        assert!(matches!(parse_score_body(&fractional), Err(BracketError::NonNumericScore(_))));
        let missing = ScoreBody { score1: Value::Null, score2: json!(2) };
        assert!(matches!(parse_score_body(&missing), Err(BracketError::NonNumericScore(_))));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status_for(&BracketError::TiedScore(1)), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&BracketError::MatchAlreadyResolved(1)), StatusCode::CONFLICT);
        assert_eq!(status_for(&BracketError::Conflict(1)), StatusCode::CONFLICT);
        assert_eq!(status_for(&BracketError::TournamentNotFound(1)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&BracketError::ScoreTooLarge("4294967296".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&BracketError::StoreUnavailable(String::new())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_with_store_runs_under_lock() {
        let state = ServerState {
            store: std::sync::Arc::new(std::sync::Mutex::new(TournamentStore::new(3))),
            log_requests: false,
        };
        let names = vec!["A".to_string(), "B".to_string()];
        let snapshot = with_store(&state, "create", |store, now| store.create_tournament("T", "G", &names, now))
            .unwrap();
        let listed = with_store(&state, "list", |store, _| Ok(store.list())).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, snapshot.tournament.id);
    }

    #[test]
    fn test_with_store_reports_poisoned_lock() {
        let state = ServerState {
            store: std::sync::Arc::new(std::sync::Mutex::new(TournamentStore::new(3))),
            log_requests: false,
        };
        let store = state.store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = store.lock().unwrap();
            panic!("writer died holding the store");
        })
        .join();

        let listed = with_store(&state, "list", |store, _| Ok(store.list()));
        assert!(matches!(listed, Err(BracketError::StoreUnavailable(_))));
    }

    #[test]
    fn test_score_body_rejects_plus_and_overflow() {
        let plus = ScoreBody { score1: json!("+5"), score2: json!(2) };
        assert_eq!(
            parse_score_body(&plus),
            Err(BracketError::NonNumericScore("+5".to_string()))
        );
        let huge = ScoreBody { score1: json!(1), score2: json!(5_000_000_000u64) };
        assert_eq!(
            parse_score_body(&huge),
            Err(BracketError::ScoreTooLarge("5000000000".to_string()))
        );
    }
}
