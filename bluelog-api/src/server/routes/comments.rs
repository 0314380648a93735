use crate::server::{
    Result, ServerError, ServerRouter, ServerState, extract::Json, views::ReplyTargetView,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use bluelog_common::model::{Id, comment::CommentMarker};
use serde::Deserialize;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(get_reply_target)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/{id}/reply", rejection(ServerError))]
struct ReplyTargetPath {
    id: Id<CommentMarker>,
}

async fn get_reply_target(
    ReplyTargetPath { id }: ReplyTargetPath,
    State(state): State<ServerState>,
) -> Result<Json<ReplyTargetView>> {
    let target = state.submission().reply_target(id).await?;

    Ok(Json(target.into()))
}
