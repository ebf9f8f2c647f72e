/// Leaderboard HTTP handlers
use crate::error::{AppError, LeaderboardError};
use crate::models::RankInfo;
use crate::services::RequestOptions;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

const INVALID_PARAMETER: &str = "Invalid Parameter";

/// Rank lookup request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankForRequest {
    pub player_id: Option<String>,
    pub leaderboard_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankForResponse {
    /// `None` when the player is not on the leaderboard.
    pub position: Option<u64>,
}

/// Rank range request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankRangeRequest {
    pub leaderboard_name: Option<String>,
    pub start_rank: Option<i64>,
    pub end_rank: Option<i64>,
    #[serde(default)]
    pub options: Option<RequestOptions>,
}

fn required(value: Option<&String>) -> Result<&str, AppError> {
    match value.map(|value| value.trim()) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(AppError::Validation(INVALID_PARAMETER.to_string())),
    }
}

fn required_rank(value: Option<i64>) -> Result<i64, AppError> {
    value.ok_or_else(|| AppError::Validation(INVALID_PARAMETER.to_string()))
}

fn log_failure(operation: &str, err: LeaderboardError) -> AppError {
    if let LeaderboardError::Store(store_err) = &err {
        error!(operation, error = %store_err, "Leaderboard store call failed");
    }
    AppError::from(err)
}

/// Get a player's rank
///
/// POST /api/leaderboard/rank-for
pub async fn rank_for(
    state: web::Data<AppState>,
    req: web::Json<RankForRequest>,
) -> Result<HttpResponse, AppError> {
    let player_id = required(req.player_id.as_ref())?;
    let leaderboard_name = required(req.leaderboard_name.as_ref())?;

    let board = state.leaderboard(leaderboard_name)?;
    let position = board
        .rank_for(player_id)
        .await
        .map_err(|err| log_failure("rank_for", err))?;

    debug!(leaderboard = leaderboard_name, player_id, ?position, "Rank lookup");
    Ok(HttpResponse::Ok().json(RankForResponse { position }))
}

/// List members between two ranks
///
/// POST /api/leaderboard/members-from-rank-range
pub async fn members_from_rank_range(
    state: web::Data<AppState>,
    req: web::Json<RankRangeRequest>,
) -> Result<HttpResponse, AppError> {
    let leaderboard_name = required(req.leaderboard_name.as_ref())?;
    let start_rank = required_rank(req.start_rank)?;
    let end_rank = required_rank(req.end_rank)?;

    let board = state.leaderboard(leaderboard_name)?;
    let rows: Vec<RankInfo> = board
        .members_from_rank_range(start_rank, end_rank, req.options.as_ref())
        .await
        .map_err(|err| log_failure("members_from_rank_range", err))?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Liveness probe
///
/// GET /health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health)).service(
        web::scope("/api/leaderboard")
            .route("/rank-for", web::post().to(rank_for))
            .route(
                "/members-from-rank-range",
                web::post().to(members_from_rank_range),
            ),
    );
}
