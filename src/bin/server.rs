use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use eco_escape_quest::campaign::ROOMS;
use eco_escape_quest::photo::{verify_photo, PhotoRejection, PHOTO_MAX_BYTES};
use eco_escape_quest::rooms::policy::{simulate_policies, POLICIES};
use eco_escape_quest::rooms::RoomError;
use eco_escape_quest::roster::{BusEvent, Member, Role, RosterError, Team};
use eco_escape_quest::scoreboard::AgentScoreboard;
use eco_escape_quest::server_utils::{media_type, parse_limit, parse_room, sanitize_name};
use eco_escape_quest::storage::{
    default_path, now_ms, SCOREBOARD_FILE, TEAMS_FILE, TEAM_RESULTS_FILE,
};
use eco_escape_quest::team_results::{TeamResult, TeamResults};
use eco_escape_quest::team_store::TeamStore;
use eco_escape_quest::types::{Difficulty, GameMode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::services::{ServeDir, ServeFile};

type SharedState = Arc<Mutex<ServerState>>;

struct ServerState {
    scoreboard: AgentScoreboard,
    teams: TeamStore,
    team_results: TeamResults,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ServerConfig {
    port: u16,
    scoreboard_path: PathBuf,
    teams_path: PathBuf,
    team_results_path: PathBuf,
    static_dir: Option<PathBuf>,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path_or = |key: &str, file_name: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| default_path(file_name))
        };
        Self {
            port: lookup("PORT")
                .and_then(|value| value.trim().parse::<u16>().ok())
                .unwrap_or(8080),
            scoreboard_path: path_or("SCOREBOARD_PATH", SCOREBOARD_FILE),
            teams_path: path_or("TEAMS_PATH", TEAMS_FILE),
            team_results_path: path_or("TEAM_RESULTS_PATH", TEAM_RESULTS_FILE),
            static_dir: lookup("STATIC_DIR").map(PathBuf::from),
        }
    }
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{what} not found"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<RoomError> for ApiError {
    fn from(error: RoomError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error.to_string())
    }
}

impl From<PhotoRejection> for ApiError {
    fn from(error: PhotoRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error.to_string())
    }
}

impl From<RosterError> for ApiError {
    fn from(error: RosterError) -> Self {
        let status = match error {
            RosterError::NotAMember(_) => StatusCode::NOT_FOUND,
            RosterError::EmptyMessage => StatusCode::BAD_REQUEST,
            RosterError::RoleTaken(_)
            | RosterError::NotLeader
            | RosterError::NotEveryoneReady
            | RosterError::AlreadyStarted => StatusCode::CONFLICT,
        };
        Self::new(status, error.to_string())
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PointsRequest {
    delta: Option<i64>,
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PolicyRequest {
    policies: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CreateTeamRequest {
    name: String,
    #[serde(rename = "leaderName")]
    leader_name: Option<String>,
    motto: Option<String>,
    mode: Option<String>,
    difficulty: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JoinRequest {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MemberRequest {
    #[serde(rename = "memberId")]
    member_id: String,
    role: Option<String>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TeamResultRequest {
    #[serde(rename = "teamId")]
    team_id: String,
    #[serde(rename = "timeSeconds")]
    time_seconds: u64,
    #[serde(rename = "ecoPoints")]
    eco_points: u64,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = ServerConfig::from_env();

    let state = Arc::new(Mutex::new(ServerState {
        scoreboard: AgentScoreboard::new(config.scoreboard_path.clone()),
        teams: TeamStore::new(config.teams_path.clone()),
        team_results: TeamResults::new(config.team_results_path.clone()),
    }));

    let app = build_router(state);
    let app = if let Some(static_dir) = resolve_static_dir(config.static_dir.as_ref()) {
        let index_file = static_dir.join("index.html");
        log::info!("[server] static file root: {}", static_dir.display());
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        log::warn!("[server] static file root not found, serving the API only");
        app
    };

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            log::error!("[server] failed to bind {bind_addr}: {error}");
            std::process::exit(1);
        }
    };

    log::info!("[server] listening on :{}", config.port);
    if let Err(error) = axum::serve(listener, app).await {
        log::error!("[server] runtime failed: {error}");
        std::process::exit(1);
    }
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/rooms", get(rooms_handler))
        .route("/api/policies", get(policies_handler))
        .route("/api/policies/simulate", post(simulate_handler))
        .route(
            "/api/photos/{room}",
            post(photo_handler).layer(DefaultBodyLimit::max(PHOTO_MAX_BYTES + 1)),
        )
        .route("/api/scoreboard", get(scoreboard_handler))
        .route(
            "/api/scoreboard/{agent}",
            get(agent_handler).post(points_handler),
        )
        .route("/api/teams", get(list_teams).post(create_team))
        .route("/api/teams/{team_id}", get(get_team))
        .route("/api/teams/{team_id}/join", post(join_team))
        .route("/api/teams/{team_id}/ready", post(toggle_ready))
        .route("/api/teams/{team_id}/role", post(assign_role))
        .route("/api/teams/{team_id}/start", post(start_team))
        .route("/api/teams/{team_id}/chat", post(team_chat))
        .route(
            "/api/team-results",
            get(list_team_results).post(add_team_result),
        )
        .with_state(state)
}

fn resolve_static_dir(configured: Option<&PathBuf>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.join("index.html").is_file() {
            return Some(path.clone());
        }
        log::warn!(
            "[server] STATIC_DIR {} has no index.html, trying defaults",
            path.display()
        );
    }

    let candidates = [PathBuf::from("dist"), PathBuf::from("../dist")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn rooms_handler() -> impl IntoResponse {
    Json(ROOMS)
}

async fn policies_handler() -> impl IntoResponse {
    Json(POLICIES)
}

async fn simulate_handler(Json(request): Json<PolicyRequest>) -> ApiResult<impl IntoResponse> {
    let ids: Vec<&str> = request.policies.iter().map(String::as_str).collect();
    Ok(Json(simulate_policies(&ids)?))
}

async fn photo_handler(
    Path(room): Path<String>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<impl IntoResponse> {
    let room = parse_room(&room).ok_or_else(|| ApiError::not_found("room"))?;
    let body = body.map_err(|rejection| body_rejection_error(&rejection, &headers))?;
    let declared = media_type(
        headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
    );
    // octet-stream uploads are sniffed instead
    let declared = declared.filter(|value| value != "application/octet-stream");
    let verdict =
        tokio::task::spawn_blocking(move || verify_photo(room, declared.as_deref(), &body))
            .await
            .map_err(|error| {
                log::error!("[server] photo check task failed: {error}");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "photo check failed")
            })??;
    Ok(Json(verdict))
}

fn body_rejection_error(rejection: &BytesRejection, headers: &HeaderMap) -> ApiError {
    oversized_or(rejection.status(), rejection.body_text(), headers)
}

fn oversized_or(status: StatusCode, fallback: String, headers: &HeaderMap) -> ApiError {
    if status != StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::new(status, fallback);
    }
    let bytes = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(PHOTO_MAX_BYTES + 1);
    ApiError::new(status, PhotoRejection::TooLarge { bytes }.to_string())
}

async fn scoreboard_handler(
    State(state): State<SharedState>,
    Query(query): Query<LimitQuery>,
) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(
        guard
            .scoreboard
            .build_response(parse_limit(query.limit.as_deref())),
    )
}

async fn agent_handler(
    State(state): State<SharedState>,
    Path(agent): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let guard = state.lock().await;
    let entry = guard
        .scoreboard
        .get(&agent)
        .cloned()
        .ok_or_else(|| ApiError::not_found("agent"))?;
    Ok(Json(entry))
}

async fn points_handler(
    State(state): State<SharedState>,
    Path(agent): Path<String>,
    Json(request): Json<PointsRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut guard = state.lock().await;
    let entry = match (request.delta, request.total) {
        (Some(delta), None) => guard.scoreboard.add_points(&agent, delta),
        (None, Some(total)) => guard.scoreboard.set_points(&agent, total),
        _ => {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                "send exactly one of delta or total",
            ))
        }
    };
    let entry =
        entry.ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "agent name is blank"))?;
    Ok(Json(entry))
}

async fn list_teams(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(guard.teams.all())
}

async fn get_team(
    State(state): State<SharedState>,
    Path(team_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let guard = state.lock().await;
    let team = guard
        .teams
        .get(&team_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("team"))?;
    Ok(Json(team))
}

async fn create_team(
    State(state): State<SharedState>,
    Json(request): Json<CreateTeamRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "team name is blank"));
    }
    let leader = Member::new(&sanitize_name(
        request.leader_name.as_deref().unwrap_or(""),
        "Agent",
    ));
    let member_id = leader.id.clone();
    let mut team = Team::create(name, leader);
    team.motto = request
        .motto
        .map(|motto| motto.trim().to_string())
        .filter(|motto| !motto.is_empty());
    if let Some(raw) = request.mode.as_deref() {
        team.mode = GameMode::parse(raw)
            .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "unknown game mode"))?;
    }
    if let Some(raw) = request.difficulty.as_deref() {
        team.difficulty = Difficulty::parse(raw)
            .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "unknown difficulty"))?;
    }

    let mut guard = state.lock().await;
    if guard.teams.get(&team.id).is_some() {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            format!("team {} already exists", team.id),
        ));
    }
    let event = team.update_event();
    guard.teams.save(team);
    log::info!("[server] team created by member {member_id}");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "memberId": member_id, "event": event })),
    ))
}

async fn join_team(
    State(state): State<SharedState>,
    Path(team_id): Path<String>,
    Json(request): Json<JoinRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut guard = state.lock().await;
    let mut team = guard
        .teams
        .get(&team_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("team"))?;
    let member = Member::new(&sanitize_name(
        request.name.as_deref().unwrap_or(""),
        "Agent",
    ));
    let member_id = member.id.clone();
    let event = team.join(member);
    guard.teams.save(team);
    Ok(Json(json!({ "memberId": member_id, "event": event })))
}

async fn toggle_ready(
    State(state): State<SharedState>,
    Path(team_id): Path<String>,
    Json(request): Json<MemberRequest>,
) -> ApiResult<impl IntoResponse> {
    mutate_team(&state, &team_id, |team| team.toggle_ready(&request.member_id)).await
}

async fn assign_role(
    State(state): State<SharedState>,
    Path(team_id): Path<String>,
    Json(request): Json<MemberRequest>,
) -> ApiResult<impl IntoResponse> {
    let role = request
        .role
        .as_deref()
        .and_then(Role::parse)
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "unknown role"))?;
    mutate_team(&state, &team_id, |team| {
        team.assign_role(&request.member_id, role)
    })
    .await
}

async fn start_team(
    State(state): State<SharedState>,
    Path(team_id): Path<String>,
    Json(request): Json<MemberRequest>,
) -> ApiResult<impl IntoResponse> {
    mutate_team(&state, &team_id, |team| team.start(&request.member_id)).await
}

async fn team_chat(
    State(state): State<SharedState>,
    Path(team_id): Path<String>,
    Json(request): Json<MemberRequest>,
) -> ApiResult<impl IntoResponse> {
    let guard = state.lock().await;
    let team = guard
        .teams
        .get(&team_id)
        .ok_or_else(|| ApiError::not_found("team"))?;
    let event = team.chat(&request.member_id, request.text.as_deref().unwrap_or(""))?;
    Ok(Json(event))
}

async fn mutate_team<F>(
    state: &SharedState,
    team_id: &str,
    mutate: F,
) -> ApiResult<Json<serde_json::Value>>
where
    F: FnOnce(&mut Team) -> Result<BusEvent, RosterError>,
{
    let mut guard = state.lock().await;
    let mut team = guard
        .teams
        .get(team_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("team"))?;
    let event = mutate(&mut team)?;
    guard.teams.save(team);
    Ok(Json(json!({ "event": event })))
}

async fn list_team_results(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(guard.team_results.all().to_vec())
}

async fn add_team_result(
    State(state): State<SharedState>,
    Json(request): Json<TeamResultRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut guard = state.lock().await;
    let team = guard
        .teams
        .get(&request.team_id)
        .ok_or_else(|| ApiError::not_found("team"))?;
    let result = TeamResult {
        team_id: team.id.clone(),
        team_name: team.name.clone(),
        mode: team.mode,
        time_seconds: request.time_seconds,
        eco_points: request.eco_points,
        created_at: now_ms(),
    };
    guard.team_results.add(result.clone());
    Ok((StatusCode::CREATED, Json(result)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_live_under_data_dir() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.scoreboard_path,
            PathBuf::from(".data/eeq_scoreboard_v1.json")
        );
        assert_eq!(config.teams_path, PathBuf::from(".data/eeq_teams_v1.json"));
        assert_eq!(
            config.team_results_path,
            PathBuf::from(".data/eeq_team_leaderboard_v1.json")
        );
        assert_eq!(config.static_dir, None);
    }

    #[test]
    fn config_reads_overrides_and_ignores_bad_port() {
        let config = ServerConfig::from_lookup(|key| match key {
            "PORT" => Some("not-a-port".to_string()),
            "SCOREBOARD_PATH" => Some("/tmp/board.json".to_string()),
            "TEAMS_PATH" => Some("  ".to_string()),
            "STATIC_DIR" => Some("web".to_string()),
            _ => None,
        });
        assert_eq!(config.port, 8080);
        assert_eq!(config.scoreboard_path, PathBuf::from("/tmp/board.json"));
        assert_eq!(config.teams_path, PathBuf::from(".data/eeq_teams_v1.json"));
        assert_eq!(config.static_dir, Some(PathBuf::from("web")));

        let config = ServerConfig::from_lookup(|key| (key == "PORT").then(|| "9090".to_string()));
        assert_eq!(config.port, 9090);
    }

    #[test]
    fn roster_errors_map_to_status_codes() {
        assert_eq!(
            ApiError::from(RosterError::NotAMember("x".to_string())).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(RosterError::RoleTaken(Role::Architect)).status,
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(RosterError::EmptyMessage).status,
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn room_and_photo_errors_are_bad_requests() {
        let error = ApiError::from(RoomError::PolicyLimitReached(3));
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert!(error.message.contains("3 policies"));

        let error = ApiError::from(PhotoRejection::TooSmall { bytes: 10 });
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert!(error.message.contains(">50KB"));
    }

    fn png_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "image/png".parse().expect("header value"));
        headers
    }

    #[test]
    fn oversized_upload_gets_json_too_large_message() {
        let mut headers = png_headers();
        headers.insert(header::CONTENT_LENGTH, "20000000".parse().expect("header value"));
        let error = oversized_or(
            StatusCode::PAYLOAD_TOO_LARGE,
            "length limit exceeded".to_string(),
            &headers,
        );
        assert_eq!(error.status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(error.message.contains("<10MB"));

        let error = oversized_or(
            StatusCode::BAD_REQUEST,
            "bad body".to_string(),
            &png_headers(),
        );
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert_eq!(error.message, "bad body");
    }

    #[tokio::test]
    async fn photo_check_runs_off_the_request_task_and_maps_rejections() {
        let result = photo_handler(
            Path("energy".to_string()),
            png_headers(),
            Ok(Bytes::from(vec![0u8; 1024])),
        )
        .await;
        let error = result.err().expect("small upload rejected");
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert!(error.message.contains(">50KB"));

        let result = photo_handler(
            Path("lobby".to_string()),
            png_headers(),
            Ok(Bytes::from_static(b"x")),
        )
        .await;
        assert_eq!(
            result.err().expect("unknown room").status,
            StatusCode::NOT_FOUND
        );
    }
}
