use axum::Router;
use axum::routing::get;

use crate::state::AppState;
use crate::{auth, message, room, user};

pub mod broadcast;
pub mod context;
mod handler;
pub mod model;
pub mod presence;
pub mod service;

type Result<T> = std::result::Result<T, Error>;

pub fn endpoints<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/ws/{workspace_id}", get(handler::ws))
        .with_state(state)
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    _Auth(#[from] auth::Error),
    #[error(transparent)]
    _Message(#[from] message::Error),
    #[error(transparent)]
    _Room(#[from] room::Error),
    #[error(transparent)]
    _User(#[from] user::Error),

    #[error(transparent)]
    _ParseJson(#[from] serde_json::Error),
}
