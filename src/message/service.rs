use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::event::broadcast::Broadcaster;
use crate::event::model::{Event, Subject};
use crate::{room, user};

use super::mention;
use super::model::{MessageDto, NewMessage};
use super::{Id, Repository};

const HISTORY_PAGE: i64 = 50;

#[async_trait]
pub trait MessageService {
    /// Persists a room message and fans out the resulting events. The
    /// `message.new` publication happens strictly after the write commits.
    async fn create(
        &self,
        sender: &user::Id,
        room_id: &room::Id,
        body: &str,
        parent_id: Option<&Id>,
    ) -> super::Result<MessageDto>;

    async fn find_by_id(&self, id: &Id) -> super::Result<MessageDto>;

    async fn history(
        &self,
        caller: &user::Id,
        room_id: &room::Id,
        before: Option<DateTime<Utc>>,
        limit: Option<i64>,
    ) -> super::Result<Vec<MessageDto>>;

    async fn update_body(&self, caller: &user::Id, id: &Id, body: &str) -> super::Result<()>;

    async fn delete(&self, caller: &user::Id, id: &Id) -> super::Result<()>;

    async fn set_pinned(&self, caller: &user::Id, id: &Id, pinned: bool) -> super::Result<()>;
}

#[derive(Clone)]
pub struct MessageServiceImpl {
    repo: Repository,
    room_service: room::Service,
    user_service: user::Service,
    broadcaster: Arc<Broadcaster>,
}

impl MessageServiceImpl {
    pub fn new(
        repo: Repository,
        room_service: room::Service,
        user_service: user::Service,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Self {
            repo,
            room_service,
            user_service,
            broadcaster,
        }
    }
}

#[async_trait]
impl MessageService for MessageServiceImpl {
    async fn create(
        &self,
        sender: &user::Id,
        room_id: &room::Id,
        body: &str,
        parent_id: Option<&Id>,
    ) -> super::Result<MessageDto> {
        if body.trim().is_empty() {
            return Err(super::Error::EmptyBody);
        }

        self.room_service.check_member(room_id, sender).await?;

        let room = self.room_service.find(room_id).await?;
        if room.archived() {
            return Err(room::Error::Archived.into());
        }

        if let Some(parent_id) = parent_id {
            self.check_parent(room_id, parent_id).await?;
        }

        let mentions = self.resolve_mentions(room_id, body).await?;

        let id = Id::from(Uuid::new_v4());
        let new_message = NewMessage::new(&id, room_id, sender, body, parent_id);
        let message = self.repo.create(&new_message, &mentions).await?;

        let dto = MessageDto::new(message, mentions);

        self.broadcaster
            .publish(
                &Subject::Room(*room_id),
                &Event::MessageNew {
                    message: dto.clone(),
                },
            )
            .await;

        for mentioned in &dto.mentions {
            self.broadcaster
                .publish(
                    &Subject::User(*mentioned),
                    &Event::MentionNotification {
                        user: *mentioned,
                        message: dto.clone(),
                    },
                )
                .await;
        }

        Ok(dto)
    }

    async fn find_by_id(&self, id: &Id) -> super::Result<MessageDto> {
        let message = self.repo.find_by_id(id).await?;
        let mentions = self.repo.mentions_of(id).await?;

        Ok(MessageDto::new(message, mentions))
    }

    async fn history(
        &self,
        caller: &user::Id,
        room_id: &room::Id,
        before: Option<DateTime<Utc>>,
        limit: Option<i64>,
    ) -> super::Result<Vec<MessageDto>> {
        // archived rooms stay readable, so no archival check here
        self.room_service.check_member(room_id, caller).await?;

        let page = self
            .repo
            .find_by_room(room_id, before, limit.unwrap_or(HISTORY_PAGE))
            .await?;

        let mut dtos = Vec::with_capacity(page.len());
        for message in page {
            let mentions = self.repo.mentions_of(message.id()).await?;
            dtos.push(MessageDto::new(message, mentions));
        }

        Ok(dtos)
    }

    async fn update_body(&self, caller: &user::Id, id: &Id, body: &str) -> super::Result<()> {
        if body.trim().is_empty() {
            return Err(super::Error::EmptyBody);
        }

        self.check_owner(caller, id).await?;
        self.repo.update_body(id, body).await
    }

    async fn delete(&self, caller: &user::Id, id: &Id) -> super::Result<()> {
        self.check_owner(caller, id).await?;
        self.repo.soft_delete(id).await
    }

    async fn set_pinned(&self, caller: &user::Id, id: &Id, pinned: bool) -> super::Result<()> {
        let message = self.repo.find_by_id(id).await?;
        self.room_service
            .check_member(message.room_id(), caller)
            .await?;

        self.repo.set_pinned(id, pinned).await
    }
}

impl MessageServiceImpl {
    async fn check_parent(&self, room_id: &room::Id, parent_id: &Id) -> super::Result<()> {
        let parent = match self.repo.find_by_id(parent_id).await {
            Ok(parent) => parent,
            Err(super::Error::NotFound(_)) => return Err(super::Error::ParentNotFound),
            Err(e) => return Err(e),
        };

        // threads stay one level deep: a reply is never itself a parent
        if parent.room_id() != room_id || parent.parent_id().is_some() {
            return Err(super::Error::ParentNotFound);
        }

        Ok(())
    }

    async fn resolve_mentions(
        &self,
        room_id: &room::Id,
        body: &str,
    ) -> super::Result<HashSet<user::Id>> {
        let members = self.room_service.members(room_id).await?;
        let members = members.into_iter().collect::<Vec<_>>();
        let nicknames = self.user_service.nicknames_of(&members).await?;

        Ok(mention::resolve(body, &nicknames))
    }

    async fn check_owner(&self, caller: &user::Id, id: &Id) -> super::Result<()> {
        let message = self.repo.find_by_id(id).await?;

        if message.sender_id() != Some(caller) {
            return Err(super::Error::NotOwner);
        }

        Ok(())
    }
}
