use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::Connection;
use diesel::ExpressionMethods;
use diesel::OptionalExtension;
use diesel::QueryDsl;
use diesel::RunQueryDsl;
use diesel::SelectableHelper;

use crate::integration::db;
use crate::schema::{message_mentions, messages, room_members};
use crate::{room, user};

use super::model::{Message, NewMention, NewMessage};
use super::Id;

#[async_trait]
pub trait MessageRepository {
    /// Persists the message, its mention rows, and the sender's read
    /// position in one transaction. Nothing is visible until commit.
    async fn create(
        &self,
        message: &NewMessage<'_>,
        mentions: &HashSet<user::Id>,
    ) -> super::Result<Message>;

    async fn find_by_id(&self, id: &Id) -> super::Result<Message>;

    async fn mentions_of(&self, id: &Id) -> super::Result<HashSet<user::Id>>;

    async fn find_by_room(
        &self,
        room_id: &room::Id,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> super::Result<Vec<Message>>;

    async fn update_body(&self, id: &Id, body: &str) -> super::Result<()>;

    async fn soft_delete(&self, id: &Id) -> super::Result<()>;

    async fn set_pinned(&self, id: &Id, pinned: bool) -> super::Result<()>;
}

pub struct PgMessageRepository {
    pool: db::Pool,
}

impl PgMessageRepository {
    pub fn new(pool: db::Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(
        &self,
        message: &NewMessage<'_>,
        mentions: &HashSet<user::Id>,
    ) -> super::Result<Message> {
        let mut conn = self.pool.get()?;

        conn.transaction(|conn| -> super::Result<Message> {
            let inserted = diesel::insert_into(messages::table)
                .values(message)
                .returning(Message::as_returning())
                .get_result(conn)?;

            if !mentions.is_empty() {
                let mention_rows = mentions
                    .iter()
                    .map(|user_id| NewMention::new(message.id(), user_id))
                    .collect::<Vec<_>>();
                diesel::insert_into(message_mentions::table)
                    .values(&mention_rows)
                    .execute(conn)?;
            }

            // sending implies having read the room up to this message
            diesel::update(room_members::table.find((message.room_id(), message.sender_id())))
                .set(room_members::last_read_at.eq(message.created_at()))
                .execute(conn)?;

            Ok(inserted)
        })
    }

    async fn find_by_id(&self, id: &Id) -> super::Result<Message> {
        let mut conn = self.pool.get()?;

        messages::table
            .find(id)
            .select(Message::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or(super::Error::NotFound(*id))
    }

    async fn mentions_of(&self, id: &Id) -> super::Result<HashSet<user::Id>> {
        let mut conn = self.pool.get()?;

        let mentioned = message_mentions::table
            .filter(message_mentions::message_id.eq(id))
            .select(message_mentions::user_id)
            .get_results(&mut conn)?;

        Ok(HashSet::from_iter(mentioned))
    }

    async fn find_by_room(
        &self,
        room_id: &room::Id,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> super::Result<Vec<Message>> {
        let mut conn = self.pool.get()?;

        let mut query = messages::table
            .filter(messages::room_id.eq(room_id))
            .select(Message::as_select())
            .into_boxed();

        if let Some(before) = before {
            query = query.filter(messages::created_at.lt(before));
        }

        let page = query
            .order(messages::created_at.asc())
            .limit(limit)
            .get_results(&mut conn)?;

        Ok(page)
    }

    async fn update_body(&self, id: &Id, body: &str) -> super::Result<()> {
        let mut conn = self.pool.get()?;

        diesel::update(messages::table.find(id))
            .set((messages::body.eq(body), messages::edited.eq(true)))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn soft_delete(&self, id: &Id) -> super::Result<()> {
        let mut conn = self.pool.get()?;

        diesel::update(messages::table.find(id))
            .set(messages::deleted.eq(true))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn set_pinned(&self, id: &Id, pinned: bool) -> super::Result<()> {
        let mut conn = self.pool.get()?;

        diesel::update(messages::table.find(id))
            .set(messages::pinned.eq(pinned))
            .execute(&mut conn)?;

        Ok(())
    }
}
