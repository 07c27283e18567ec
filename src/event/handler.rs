use axum::extract::ws::Message::{Binary, Close, Text};
use axum::extract::ws::{self, Utf8Bytes, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::Query;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use log::{debug, error, warn};
use serde::Deserialize;
use serde_json::from_str;
use tokio::sync::mpsc;
use tokio::try_join;
use uuid::Uuid;

use crate::{auth, user, workspace};

use super::context;
use super::model::{Command, Envelope, Event};
use super::service::EventService;

const OUTBOUND_BUFFER: usize = 64;

#[derive(Deserialize)]
pub struct Params {
    token: Option<auth::Token>,
}

pub async fn ws(
    Path(workspace_id): Path<Uuid>,
    Query(params): Query<Params>,
    State(auth_service): State<auth::Service>,
    State(event_service): State<EventService>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(token) = params.token else {
        warn!("Refusing WS upgrade, no token supplied");
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let user = match auth_service.authenticate(&token).await {
        Ok(user) => user,
        Err(e) => {
            warn!("Refusing WS upgrade: {e}");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    let workspace_id = workspace::Id::from(workspace_id);
    ws.on_upgrade(move |socket| handle_socket(socket, *user.id(), workspace_id, event_service))
}

async fn handle_socket(
    mut socket: WebSocket,
    user_id: user::Id,
    workspace_id: workspace::Id,
    event_service: EventService,
) {
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
    let ctx = context::Ws::new(user_id, workspace_id, outbound_tx);

    if let Err(e) = event_service.connect(&ctx).await {
        error!("Failed to activate session {}: {e}", ctx.id());
        event_service.disconnect(&ctx).await; // unwind partial joins
        if let Err(e) = socket.close().await {
            debug!("Failed to close WS connection: {e}");
        }
        return;
    }

    let (sender, receiver) = socket.split();

    let read_task = tokio::spawn(read(ctx.clone(), receiver, event_service.clone()));
    let write_task = tokio::spawn(write(ctx.clone(), sender, outbound_rx));

    match try_join!(read_task, write_task) {
        Ok(_) => debug!("WS disconnected gracefully"),
        Err(e) => error!("WS disconnected with error: {e}"),
    }

    event_service.disconnect(&ctx).await;
}

async fn read(ctx: context::Ws, mut receiver: SplitStream<WebSocket>, event_service: EventService) {
    loop {
        tokio::select! {
            // close is notified => stop 'read' task
            _ = ctx.close.notified() => break,

            // read next frame from WS connection
            frame = receiver.next() => {
                match frame {
                    None => {
                        ctx.close.notify_one(); // notify 'write' task to stop
                        break;
                    }
                    Some(Err(e)) => {
                        error!("Failed to read WS frame: {e}");
                        ctx.close.notify_one(); // notify 'write' task to stop
                        break;
                    }
                    Some(Ok(Close(frame))) => {
                        debug!("WS connection closed by client: {frame:?}");
                        ctx.close.notify_one(); // notify 'write' task to stop
                        break;
                    }
                    Some(Ok(Text(content))) => {
                        handle_text_frame(&ctx, content.as_str(), &event_service).await;
                    }
                    Some(Ok(Binary(content))) => {
                        warn!("Received binary WS frame: {content:?}");
                    }
                    Some(Ok(other)) => debug!("Received non-text WS frame: {other:?}"),
                }
            }
        }
    }
}

/// A malformed or rejected command never closes the connection; the caller
/// gets a typed error event instead.
async fn handle_text_frame(ctx: &context::Ws, content: &str, event_service: &EventService) {
    match from_str::<Command>(content) {
        Ok(command) => {
            if let Err(e) = event_service.handle_command(ctx, command).await {
                warn!("Command failed for session {}: {e:?}", ctx.id());
                ctx.forward(&Event::failure(&e)).await;
            }
        }
        Err(e) => {
            warn!("Skipping malformed frame: {e}");
            ctx.forward(&Event::failure(&e.into())).await;
        }
    }
}

async fn write(
    ctx: context::Ws,
    mut sender: SplitSink<WebSocket, ws::Message>,
    mut events: mpsc::Receiver<Envelope>,
) {
    loop {
        tokio::select! {
            // close is notified => stop 'write' task
            _ = ctx.close.notified() => break,

            // new envelope from the fan-out layer => send it to the client
            envelope = events.recv() => {
                match envelope {
                    None => break,
                    Some(envelope) => {
                        // echo suppression: never replay a session's own
                        // typing/presence publications back to it
                        if envelope.is_echo_of(ctx.id()) {
                            continue;
                        }

                        let text = match Utf8Bytes::try_from(envelope.payload) {
                            Ok(text) => text,
                            Err(e) => {
                                error!("Dropping non-utf8 payload: {e}");
                                continue;
                            }
                        };

                        if let Err(e) = sender.send(Text(text)).await {
                            error!("Failed to send event to client: {e}");
                            ctx.close.notify_one(); // notify 'read' task to stop
                            break;
                        }
                    }
                }
            }
        }
    }
}
