use crate::AppState;
use crate::availability::AvailabilityState;
use crate::scheduler::OnlinePlayer;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub(crate) struct StatusResponse {
    availability: AvailabilityState,
    player_count: usize,
    players: Vec<OnlinePlayer>,
    updated_at: Option<i64>,
}

pub(crate) async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let view = state.presence.borrow().clone();

    (
        StatusCode::OK,
        Json(StatusResponse {
            availability: view.availability,
            player_count: view.player_count(),
            players: view.players,
            updated_at: view.updated_at,
        }),
    )
}
