use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::{user, workspace};

/// Ephemeral connection counts per (workspace, user). A user is online while
/// at least one of their sessions is connected; only the first connect and
/// the last disconnect report a transition. Never persisted.
pub struct PresenceRegistry {
    connections: Mutex<HashMap<(workspace::Id, user::Id), usize>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true when this is the user's first live session in the
    /// workspace, i.e. the online transition to announce.
    pub async fn connect(&self, workspace_id: &workspace::Id, user_id: &user::Id) -> bool {
        let mut connections = self.connections.lock().await;
        let count = connections.entry((*workspace_id, *user_id)).or_insert(0);
        *count += 1;

        *count == 1
    }

    /// Returns true when the user's last live session in the workspace is
    /// gone, i.e. the offline transition to announce.
    pub async fn disconnect(&self, workspace_id: &workspace::Id, user_id: &user::Id) -> bool {
        let mut connections = self.connections.lock().await;
        let key = (*workspace_id, *user_id);

        match connections.get_mut(&key) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                connections.remove(&key);
                true
            }
            None => false,
        }
    }

    pub async fn is_online(&self, workspace_id: &workspace::Id, user_id: &user::Id) -> bool {
        self.connections
            .lock()
            .await
            .contains_key(&(*workspace_id, *user_id))
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn ids() -> (workspace::Id, user::Id) {
        (
            workspace::Id::from(Uuid::new_v4()),
            user::Id::from(Uuid::new_v4()),
        )
    }

    #[tokio::test]
    async fn first_connect_and_last_disconnect_transition() {
        let registry = PresenceRegistry::new();
        let (ws, user) = ids();

        assert!(registry.connect(&ws, &user).await);
        assert!(!registry.connect(&ws, &user).await);

        assert!(!registry.disconnect(&ws, &user).await);
        assert!(registry.disconnect(&ws, &user).await);
        assert!(!registry.is_online(&ws, &user).await);
    }

    #[tokio::test]
    async fn workspaces_do_not_share_presence() {
        let registry = PresenceRegistry::new();
        let (ws_a, user) = ids();
        let (ws_b, _) = ids();

        assert!(registry.connect(&ws_a, &user).await);
        assert!(registry.connect(&ws_b, &user).await);

        assert!(registry.disconnect(&ws_a, &user).await);
        assert!(registry.is_online(&ws_b, &user).await);
    }

    #[tokio::test]
    async fn disconnect_without_connect_reports_nothing() {
        let registry = PresenceRegistry::new();
        let (ws, user) = ids();

        assert!(!registry.disconnect(&ws, &user).await);
    }
}
