use std::collections::HashSet;

use chrono::{DateTime, Utc};
use diesel::prelude::{Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};

use crate::{room, user};

use super::Id;

#[derive(Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = crate::schema::messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Message {
    id: Id,
    room_id: room::Id,
    sender_id: Option<user::Id>,
    body: String,
    parent_id: Option<Id>,
    created_at: DateTime<Utc>,
    edited: bool,
    deleted: bool,
    pinned: bool,
}

impl Message {
    pub fn new(
        id: Id,
        room_id: room::Id,
        sender_id: Option<user::Id>,
        body: impl Into<String>,
        parent_id: Option<Id>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            room_id,
            sender_id,
            body: body.into(),
            parent_id,
            created_at,
            edited: false,
            deleted: false,
            pinned: false,
        }
    }

    pub const fn id(&self) -> &Id {
        &self.id
    }

    pub const fn room_id(&self) -> &room::Id {
        &self.room_id
    }

    pub const fn sender_id(&self) -> Option<&user::Id> {
        self.sender_id.as_ref()
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub const fn parent_id(&self) -> Option<&Id> {
        self.parent_id.as_ref()
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub const fn deleted(&self) -> bool {
        self.deleted
    }
}

#[derive(Insertable, Clone)]
#[diesel(table_name = crate::schema::messages)]
pub struct NewMessage<'a> {
    id: &'a Id,
    room_id: &'a room::Id,
    sender_id: &'a user::Id,
    body: &'a str,
    parent_id: Option<&'a Id>,
    created_at: DateTime<Utc>,
}

impl<'a> NewMessage<'a> {
    pub fn new(
        id: &'a Id,
        room_id: &'a room::Id,
        sender_id: &'a user::Id,
        body: &'a str,
        parent_id: Option<&'a Id>,
    ) -> Self {
        Self {
            id,
            room_id,
            sender_id,
            body,
            parent_id,
            created_at: Utc::now(),
        }
    }

    pub const fn id(&self) -> &Id {
        self.id
    }

    pub const fn room_id(&self) -> &room::Id {
        self.room_id
    }

    pub const fn sender_id(&self) -> &user::Id {
        self.sender_id
    }

    pub fn body(&self) -> &str {
        self.body
    }

    pub const fn parent_id(&self) -> Option<&'a Id> {
        self.parent_id
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::message_mentions)]
pub struct NewMention<'a> {
    message_id: &'a Id,
    user_id: &'a user::Id,
}

impl<'a> NewMention<'a> {
    pub fn new(message_id: &'a Id, user_id: &'a user::Id) -> Self {
        Self {
            message_id,
            user_id,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MessageDto {
    pub id: Id,
    pub room_id: room::Id,
    pub sender_id: Option<user::Id>,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Id>,
    pub created_at: DateTime<Utc>,
    pub edited: bool,
    pub deleted: bool,
    pub pinned: bool,
    pub mentions: HashSet<user::Id>,
}

impl MessageDto {
    pub fn new(message: Message, mentions: HashSet<user::Id>) -> Self {
        Self {
            id: message.id,
            room_id: message.room_id,
            sender_id: message.sender_id,
            body: message.body,
            parent_id: message.parent_id,
            created_at: message.created_at,
            edited: message.edited,
            deleted: message.deleted,
            pinned: message.pinned,
            mentions,
        }
    }
}
