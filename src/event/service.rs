use std::sync::Arc;

use chrono::Utc;
use log::debug;

use crate::{message, room};

use super::broadcast::Broadcaster;
use super::context;
use super::model::{Command, Event, PresenceStatus, Subject};
use super::presence::PresenceRegistry;

#[derive(Clone)]
pub struct EventService {
    broadcaster: Arc<Broadcaster>,
    presence: Arc<PresenceRegistry>,
    room_service: room::Service,
    message_service: message::Service,
}

impl EventService {
    pub fn new(
        broadcaster: Arc<Broadcaster>,
        presence: Arc<PresenceRegistry>,
        room_service: room::Service,
        message_service: message::Service,
    ) -> Self {
        Self {
            broadcaster,
            presence,
            room_service,
            message_service,
        }
    }

    pub fn broadcaster(&self) -> Arc<Broadcaster> {
        self.broadcaster.clone()
    }
}

// session lifecycle
impl EventService {
    /// Activates an authenticated session: joins the workspace group and one
    /// group per room the user belongs to, then announces the online
    /// transition when this is the user's first session here.
    pub async fn connect(&self, ctx: &context::Ws) -> super::Result<()> {
        self.join(ctx, Subject::Workspace(*ctx.workspace_id())).await;

        let rooms = self
            .room_service
            .rooms_for(ctx.workspace_id(), ctx.user_id())
            .await?;
        for room_id in rooms {
            self.join(ctx, Subject::Room(room_id)).await;
        }

        if self.presence.connect(ctx.workspace_id(), ctx.user_id()).await {
            self.publish_presence(ctx, PresenceStatus::Online).await;
        }

        Ok(())
    }

    /// Releases every joined group exactly once and announces the offline
    /// transition when the user's last session here is gone. Safe to call
    /// after a partially completed [`Self::connect`].
    pub async fn disconnect(&self, ctx: &context::Ws) {
        for subject in ctx.drain_joined().await {
            self.broadcaster.leave(&subject, &ctx.id()).await;
        }

        if self
            .presence
            .disconnect(ctx.workspace_id(), ctx.user_id())
            .await
        {
            self.publish_presence(ctx, PresenceStatus::Offline).await;
        }
    }

    async fn join(&self, ctx: &context::Ws, subject: Subject) {
        self.broadcaster
            .join(&subject, ctx.id(), ctx.sender())
            .await;
        ctx.joined(subject).await;
    }

    async fn publish_presence(&self, ctx: &context::Ws, status: PresenceStatus) {
        self.broadcaster
            .publish_from(
                &Subject::Workspace(*ctx.workspace_id()),
                Some(ctx.id()),
                &Event::PresenceUpdate {
                    user: *ctx.user_id(),
                    status,
                },
            )
            .await;
    }
}

// command dispatch
impl EventService {
    pub async fn handle_command(&self, ctx: &context::Ws, command: Command) -> super::Result<()> {
        debug!("handling command: {command:?}");

        match command {
            Command::SendMessage {
                room,
                body,
                parent_id,
            } => {
                self.message_service
                    .create(ctx.user_id(), &room, &body, parent_id.as_ref())
                    .await?;
                Ok(())
            }

            Command::TypingStart { room } => self.typing(ctx, &room, true).await,
            Command::TypingStop { room } => self.typing(ctx, &room, false).await,

            Command::MarkRead { room } => {
                let last_read_at = self
                    .room_service
                    .mark_read(&room, ctx.user_id(), Utc::now())
                    .await?;

                self.broadcaster
                    .publish(
                        &Subject::Room(room),
                        &Event::MessageRead {
                            room,
                            user: *ctx.user_id(),
                            last_read_at,
                        },
                    )
                    .await;
                Ok(())
            }

            Command::PresenceUpdate { status } => {
                self.publish_presence(ctx, status.into()).await;
                Ok(())
            }
        }
    }

    async fn typing(&self, ctx: &context::Ws, room: &room::Id, typing: bool) -> super::Result<()> {
        // typing indicators from non-members fail silently
        if self
            .room_service
            .check_member(room, ctx.user_id())
            .await
            .is_err()
        {
            return Ok(());
        }

        self.broadcaster
            .publish_from(
                &Subject::Room(*room),
                Some(ctx.id()),
                &Event::Typing {
                    room: *room,
                    user: *ctx.user_id(),
                    typing,
                },
            )
            .await;

        Ok(())
    }
}
