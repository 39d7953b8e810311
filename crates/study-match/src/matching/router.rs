use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::chat::NewMessage;
use super::domain::{ProfileUpdate, Uid};
use super::error::MatchError;
use super::service::MatchingService;
use super::store::{ChatStore, LikeStore, ProfileStore};

type SharedService<P, L, C> = Arc<MatchingService<P, L, C>>;

#[derive(Debug, Deserialize)]
pub(crate) struct MatchesQuery {
    pub(crate) count: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct LikeRequest {
    pub(crate) liker: Uid,
    pub(crate) liked: Uid,
}

/// Router builder exposing the matching operations over HTTP.
pub fn matching_router<P, L, C>(service: SharedService<P, L, C>) -> Router
where
    P: ProfileStore + 'static,
    L: LikeStore + 'static,
    C: ChatStore + 'static,
{
    Router::new()
        .route("/api/v1/sessions/:uid", post(start_session_handler::<P, L, C>))
        .route(
            "/api/v1/profiles/:uid",
            get(get_profile_handler::<P, L, C>)
                .put(update_profile_handler::<P, L, C>)
                .delete(delete_account_handler::<P, L, C>),
        )
        .route("/api/v1/matches/:uid", get(top_matches_handler::<P, L, C>))
        .route("/api/v1/likes", post(connect_handler::<P, L, C>))
        .route(
            "/api/v1/likes/:liker/:liked",
            get(pair_state_handler::<P, L, C>).delete(unlike_handler::<P, L, C>),
        )
        .route(
            "/api/v1/likes/:liker/:liked/mutual",
            get(mutual_handler::<P, L, C>),
        )
        .route("/api/v1/threads/:uid", get(threads_handler::<P, L, C>))
        .route(
            "/api/v1/threads/:uid/:other/messages",
            get(open_thread_handler::<P, L, C>).post(post_message_handler::<P, L, C>),
        )
        .with_state(service)
}

pub(crate) fn error_response(error: MatchError) -> Response {
    let payload = json!({
        "error": error.to_string(),
        "retryable": error.is_retryable(),
    });
    (error.status_code(), Json(payload)).into_response()
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, MatchError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn start_session_handler<P, L, C>(
    State(service): State<SharedService<P, L, C>>,
    Path(uid): Path<String>,
) -> Response
where
    P: ProfileStore + 'static,
    L: LikeStore + 'static,
    C: ChatStore + 'static,
{
    respond(StatusCode::OK, service.start_session(&Uid(uid)).await)
}

pub(crate) async fn get_profile_handler<P, L, C>(
    State(service): State<SharedService<P, L, C>>,
    Path(uid): Path<String>,
) -> Response
where
    P: ProfileStore + 'static,
    L: LikeStore + 'static,
    C: ChatStore + 'static,
{
    respond(StatusCode::OK, service.profiles().get_profile(&Uid(uid)).await)
}

pub(crate) async fn update_profile_handler<P, L, C>(
    State(service): State<SharedService<P, L, C>>,
    Path(uid): Path<String>,
    Json(update): Json<ProfileUpdate>,
) -> Response
where
    P: ProfileStore + 'static,
    L: LikeStore + 'static,
    C: ChatStore + 'static,
{
    respond(
        StatusCode::OK,
        service.profiles().update_profile(&Uid(uid), update).await,
    )
}

pub(crate) async fn delete_account_handler<P, L, C>(
    State(service): State<SharedService<P, L, C>>,
    Path(uid): Path<String>,
) -> Response
where
    P: ProfileStore + 'static,
    L: LikeStore + 'static,
    C: ChatStore + 'static,
{
    respond(
        StatusCode::OK,
        service.profiles().delete_account(&Uid(uid)).await,
    )
}

pub(crate) async fn top_matches_handler<P, L, C>(
    State(service): State<SharedService<P, L, C>>,
    Path(uid): Path<String>,
    Query(query): Query<MatchesQuery>,
) -> Response
where
    P: ProfileStore + 'static,
    L: LikeStore + 'static,
    C: ChatStore + 'static,
{
    respond(
        StatusCode::OK,
        service.top_matches(&Uid(uid), query.count).await,
    )
}

pub(crate) async fn connect_handler<P, L, C>(
    State(service): State<SharedService<P, L, C>>,
    Json(request): Json<LikeRequest>,
) -> Response
where
    P: ProfileStore + 'static,
    L: LikeStore + 'static,
    C: ChatStore + 'static,
{
    respond(
        StatusCode::OK,
        service.connect(&request.liker, &request.liked).await,
    )
}

pub(crate) async fn pair_state_handler<P, L, C>(
    State(service): State<SharedService<P, L, C>>,
    Path((a, b)): Path<(String, String)>,
) -> Response
where
    P: ProfileStore + 'static,
    L: LikeStore + 'static,
    C: ChatStore + 'static,
{
    respond(
        StatusCode::OK,
        service.ledger().pair_state(&Uid(a), &Uid(b)).await,
    )
}

pub(crate) async fn unlike_handler<P, L, C>(
    State(service): State<SharedService<P, L, C>>,
    Path((liker, liked)): Path<(String, String)>,
) -> Response
where
    P: ProfileStore + 'static,
    L: LikeStore + 'static,
    C: ChatStore + 'static,
{
    match service.ledger().unlike(&Uid(liker), &Uid(liked)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn mutual_handler<P, L, C>(
    State(service): State<SharedService<P, L, C>>,
    Path((a, b)): Path<(String, String)>,
) -> Response
where
    P: ProfileStore + 'static,
    L: LikeStore + 'static,
    C: ChatStore + 'static,
{
    let result = service
        .ledger()
        .check_mutual(&Uid(a), &Uid(b))
        .await
        .map(|mutual| json!({ "mutual": mutual }));
    respond(StatusCode::OK, result)
}

pub(crate) async fn threads_handler<P, L, C>(
    State(service): State<SharedService<P, L, C>>,
    Path(uid): Path<String>,
) -> Response
where
    P: ProfileStore + 'static,
    L: LikeStore + 'static,
    C: ChatStore + 'static,
{
    respond(StatusCode::OK, service.chat().threads_for(&Uid(uid)).await)
}

pub(crate) async fn open_thread_handler<P, L, C>(
    State(service): State<SharedService<P, L, C>>,
    Path((uid, other)): Path<(String, String)>,
) -> Response
where
    P: ProfileStore + 'static,
    L: LikeStore + 'static,
    C: ChatStore + 'static,
{
    respond(
        StatusCode::OK,
        service.chat().open_thread(&Uid(uid), &other).await,
    )
}

pub(crate) async fn post_message_handler<P, L, C>(
    State(service): State<SharedService<P, L, C>>,
    Path((uid, other)): Path<(String, String)>,
    Json(message): Json<NewMessage>,
) -> Response
where
    P: ProfileStore + 'static,
    L: LikeStore + 'static,
    C: ChatStore + 'static,
{
    respond(
        StatusCode::CREATED,
        service.chat().post_message(&Uid(uid), &other, message).await,
    )
}
