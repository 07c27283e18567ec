use std::fmt::Display;
use std::sync::Arc;

use log::debug;
use tokio::sync::{Notify, RwLock, mpsc};
use uuid::Uuid;

use crate::{user, workspace};

use super::model::{Envelope, Event, Subject};

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct Id(Uuid);

impl Id {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-connection session context. Tracks which groups the session joined so
/// teardown can release every one of them exactly once.
#[derive(Clone)]
pub struct Ws {
    id: Id,
    user_id: user::Id,
    workspace_id: workspace::Id,
    joined: Arc<RwLock<Vec<Subject>>>,
    sender: mpsc::Sender<Envelope>,
    pub close: Arc<Notify>,
}

impl Ws {
    pub fn new(
        user_id: user::Id,
        workspace_id: workspace::Id,
        sender: mpsc::Sender<Envelope>,
    ) -> Self {
        Self {
            id: Id::random(),
            user_id,
            workspace_id,
            joined: Arc::new(RwLock::new(Vec::new())),
            sender,
            close: Arc::new(Notify::new()),
        }
    }

    pub const fn id(&self) -> Id {
        self.id
    }

    pub const fn user_id(&self) -> &user::Id {
        &self.user_id
    }

    pub const fn workspace_id(&self) -> &workspace::Id {
        &self.workspace_id
    }

    pub fn sender(&self) -> mpsc::Sender<Envelope> {
        self.sender.clone()
    }

    pub async fn joined(&self, subject: Subject) {
        self.joined.write().await.push(subject);
    }

    pub async fn drain_joined(&self) -> Vec<Subject> {
        std::mem::take(&mut *self.joined.write().await)
    }

    /// Queues an event for this session's own client, bypassing the
    /// broadcaster. Used for caller-only error events.
    pub async fn forward(&self, event: &Event) {
        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload.into(),
            Err(e) => {
                debug!("could not serialize event for session {}: {e}", self.id);
                return;
            }
        };

        let envelope = Envelope {
            origin: None,
            payload,
        };

        if let Err(e) = self.sender.try_send(envelope) {
            debug!("dropping event for session {}: {e}", self.id);
        }
    }
}
