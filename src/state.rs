use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth;
use crate::auth::service::AuthServiceImpl;
use crate::event::broadcast::Broadcaster;
use crate::event::presence::PresenceRegistry;
use crate::event::service::EventService;
use crate::integration;
use crate::message;
use crate::message::repository::PgMessageRepository;
use crate::message::service::MessageServiceImpl;
use crate::room;
use crate::room::repository::{PgMembershipRepository, PgRoomRepository};
use crate::room::service::RoomServiceImpl;
use crate::user;
use crate::user::repository::PgUserRepository;
use crate::user::service::UserServiceImpl;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: auth::Service,
    pub user_service: user::Service,
    pub room_service: room::Service,
    pub message_service: message::Service,
    pub event_service: EventService,
}

impl AppState {
    pub async fn init(config: &integration::Config) -> anyhow::Result<Self> {
        let pool = integration::db::init(&config.postgres);
        let redis = integration::cache::init(&config.redis).await?;

        let user_repo: user::Repository = Arc::new(PgUserRepository::new(pool.clone()));
        let user_service: user::Service = Arc::new(UserServiceImpl::new(user_repo));

        let auth_service: auth::Service =
            Arc::new(AuthServiceImpl::new(&config.idp, user_service.clone()));

        let room_repo: room::Repository = Arc::new(PgRoomRepository::new(pool.clone()));
        let member_repo: room::Members = Arc::new(PgMembershipRepository::new(pool.clone()));
        let room_service: room::Service = Arc::new(RoomServiceImpl::new(
            room_repo,
            member_repo,
            redis.clone(),
        ));

        let broadcaster = Arc::new(Broadcaster::new());
        let presence = Arc::new(PresenceRegistry::new());

        let message_repo: message::Repository = Arc::new(PgMessageRepository::new(pool));
        let message_service: message::Service = Arc::new(MessageServiceImpl::new(
            message_repo,
            room_service.clone(),
            user_service.clone(),
            broadcaster.clone(),
        ));

        let event_service = EventService::new(
            broadcaster,
            presence,
            room_service.clone(),
            message_service.clone(),
        );

        Ok(Self {
            auth_service,
            user_service,
            room_service,
            message_service,
            event_service,
        })
    }
}

impl FromRef<AppState> for auth::Service {
    fn from_ref(state: &AppState) -> Self {
        state.auth_service.clone()
    }
}

impl FromRef<AppState> for EventService {
    fn from_ref(state: &AppState) -> Self {
        state.event_service.clone()
    }
}
