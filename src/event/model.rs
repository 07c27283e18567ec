use std::fmt::Display;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::model::MessageDto;
use crate::{event, message, room, user, workspace};

use super::context;

/// Inbound command envelope, one JSON object per frame. Unknown fields are
/// ignored; an unknown type tag fails decoding and surfaces as a validation
/// error event rather than a connection close.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    SendMessage {
        room: room::Id,
        body: String,
        #[serde(default)]
        parent_id: Option<message::Id>,
    },
    TypingStart {
        room: room::Id,
    },
    TypingStop {
        room: room::Id,
    },
    MarkRead {
        room: room::Id,
    },
    PresenceUpdate {
        status: ManualStatus,
    },
}

/// Manually selected presence, as opposed to the connection-driven
/// online/offline transitions.
#[derive(Deserialize, Clone, Copy, Debug)]
#[serde(rename_all = "snake_case")]
pub enum ManualStatus {
    Away,
    Busy,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    Offline,
    Away,
    Busy,
}

impl From<ManualStatus> for PresenceStatus {
    fn from(status: ManualStatus) -> Self {
        match status {
            ManualStatus::Away => Self::Away,
            ManualStatus::Busy => Self::Busy,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotAMember,
    ParentNotFound,
    RoomArchived,
    Validation,
    Internal,
}

/// Outbound event envelope.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "message.new")]
    MessageNew { message: MessageDto },

    #[serde(rename = "message.read")]
    MessageRead {
        room: room::Id,
        user: user::Id,
        last_read_at: DateTime<Utc>,
    },

    #[serde(rename = "user.typing")]
    Typing {
        room: room::Id,
        user: user::Id,
        typing: bool,
    },

    #[serde(rename = "presence.update")]
    PresenceUpdate {
        user: user::Id,
        status: PresenceStatus,
    },

    #[serde(rename = "notification.mention")]
    MentionNotification { user: user::Id, message: MessageDto },

    #[serde(rename = "error")]
    Failure { kind: FailureKind, message: String },
}

impl Event {
    /// Maps a command-handling error onto the typed error event surfaced to
    /// the issuing connection. Infrastructure failures stay generic.
    pub fn failure(e: &event::Error) -> Self {
        let kind = match e {
            event::Error::_Room(e) => room_failure(e),
            event::Error::_Message(e) => match e {
                message::Error::ParentNotFound => FailureKind::ParentNotFound,
                message::Error::EmptyBody
                | message::Error::NotFound(_)
                | message::Error::NotOwner => FailureKind::Validation,
                message::Error::_Room(e) => room_failure(e),
                _ => FailureKind::Internal,
            },
            event::Error::_ParseJson(_) => FailureKind::Validation,
            _ => FailureKind::Internal,
        };

        let message = match kind {
            FailureKind::Internal => "could not complete".to_string(),
            _ => e.to_string(),
        };

        Self::Failure { kind, message }
    }
}

fn room_failure(e: &room::Error) -> FailureKind {
    match e {
        room::Error::NotAMember => FailureKind::NotAMember,
        room::Error::Archived => FailureKind::RoomArchived,
        room::Error::NotFound(_) => FailureKind::Validation,
        _ => FailureKind::Internal,
    }
}

/// A fan-out destination. Publishing reaches every session currently
/// subscribed; personal groups exist independently of connection state.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum Subject {
    Workspace(workspace::Id),
    Room(room::Id),
    User(user::Id),
}

impl Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subject::Workspace(id) => write!(f, "workspace:{id}"),
            Subject::Room(id) => write!(f, "room:{id}"),
            Subject::User(id) => write!(f, "user:{id}"),
        }
    }
}

/// What actually travels through the broadcaster: the event serialized once
/// at publish time, plus the authoring session for echo suppression.
#[derive(Clone, Debug)]
pub struct Envelope {
    pub origin: Option<context::Id>,
    pub payload: Bytes,
}

impl Envelope {
    pub fn decode(&self) -> serde_json::Result<Event> {
        serde_json::from_slice(&self.payload)
    }

    /// True when the session itself authored this envelope and must not
    /// receive it back.
    pub fn is_echo_of(&self, session: context::Id) -> bool {
        self.origin.is_some_and(|origin| origin == session)
    }
}
