use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, error};
use tokio::sync::{RwLock, mpsc};

use super::context;
use super::model::{Envelope, Event, Subject};

pub type Sender = mpsc::Sender<Envelope>;

#[derive(Default)]
struct Group {
    subscribers: RwLock<HashMap<context::Id, Sender>>,
}

/// Process-wide fan-out registry. One instance per process, shared by
/// reference with every session.
///
/// Delivery is fire-and-forget: a subscriber whose queue is full or closed
/// loses that one envelope, nothing else. Durability lives in the message
/// store, not here. Within one group, envelopes from a single publisher
/// reach every current subscriber in publish order.
pub struct Broadcaster {
    groups: RwLock<HashMap<Subject, Arc<Group>>>,
    dropped: AtomicU64,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
            dropped: AtomicU64::new(0),
        }
    }

    pub async fn join(&self, subject: &Subject, session: context::Id, sender: Sender) {
        let mut groups = self.groups.write().await;
        let group = groups
            .entry(subject.clone())
            .or_insert_with(|| Arc::new(Group::default()))
            .clone();

        group.subscribers.write().await.insert(session, sender);
    }

    pub async fn leave(&self, subject: &Subject, session: &context::Id) {
        let mut groups = self.groups.write().await;
        let Some(group) = groups.get(subject).cloned() else {
            return;
        };

        let mut subscribers = group.subscribers.write().await;
        subscribers.remove(session);

        if subscribers.is_empty() {
            drop(subscribers);
            groups.remove(subject);
        }
    }

    pub async fn publish(&self, subject: &Subject, event: &Event) {
        self.publish_from(subject, None, event).await;
    }

    /// Publishes with the authoring session recorded, so that session's own
    /// write path can suppress the echo.
    pub async fn publish_from(
        &self,
        subject: &Subject,
        origin: Option<context::Id>,
        event: &Event,
    ) {
        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload.into(),
            Err(e) => {
                error!("could not serialize event for {subject}: {e}");
                return;
            }
        };

        let envelope = Envelope { origin, payload };

        // the registry lock is released before delivery starts
        let group = { self.groups.read().await.get(subject).cloned() };
        let Some(group) = group else {
            return; // no current subscribers, nothing to deliver
        };

        let subscribers = group.subscribers.read().await;
        for (session, sender) in subscribers.iter() {
            if let Err(e) = sender.try_send(envelope.clone()) {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("dropping envelope for session {session} on {subject}: {e}");
            }
        }
    }

    pub async fn subscriber_count(&self, subject: &Subject) -> usize {
        match self.groups.read().await.get(subject) {
            Some(group) => group.subscribers.read().await.len(),
            None => 0,
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::room;

    use super::*;

    fn room_subject() -> Subject {
        Subject::Room(room::Id::from(Uuid::new_v4()))
    }

    fn typing_event(typing: bool) -> Event {
        Event::Typing {
            room: room::Id::from(Uuid::new_v4()),
            user: crate::user::Id::from(Uuid::new_v4()),
            typing,
        }
    }

    #[tokio::test]
    async fn delivers_to_every_current_subscriber() {
        let broadcaster = Broadcaster::new();
        let subject = room_subject();

        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        broadcaster.join(&subject, context::Id::random(), tx1).await;
        broadcaster.join(&subject, context::Id::random(), tx2).await;

        broadcaster.publish(&subject, &typing_event(true)).await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn late_joiners_see_no_replay() {
        let broadcaster = Broadcaster::new();
        let subject = room_subject();

        let (tx1, mut rx1) = mpsc::channel(8);
        broadcaster.join(&subject, context::Id::random(), tx1).await;
        broadcaster.publish(&subject, &typing_event(true)).await;

        let (tx2, mut rx2) = mpsc::channel(8);
        broadcaster.join(&subject, context::Id::random(), tx2).await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn join_is_idempotent() {
        let broadcaster = Broadcaster::new();
        let subject = room_subject();
        let session = context::Id::random();

        let (tx, mut rx) = mpsc::channel(8);
        broadcaster.join(&subject, session, tx.clone()).await;
        broadcaster.join(&subject, session, tx).await;

        broadcaster.publish(&subject, &typing_event(true)).await;

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err(), "double join must not double deliver");
        assert_eq!(broadcaster.subscriber_count(&subject).await, 1);
    }

    #[tokio::test]
    async fn leave_is_idempotent_and_stops_delivery() {
        let broadcaster = Broadcaster::new();
        let subject = room_subject();
        let session = context::Id::random();

        let (tx, mut rx) = mpsc::channel(8);
        broadcaster.join(&subject, session, tx).await;
        broadcaster.leave(&subject, &session).await;
        broadcaster.leave(&subject, &session).await;

        broadcaster.publish(&subject, &typing_event(true)).await;

        assert!(rx.try_recv().is_err());
        assert_eq!(broadcaster.subscriber_count(&subject).await, 0);
    }

    #[tokio::test]
    async fn a_backed_up_subscriber_is_isolated() {
        let broadcaster = Broadcaster::new();
        let subject = room_subject();

        let (full_tx, mut full_rx) = mpsc::channel(1);
        let (ok_tx, mut ok_rx) = mpsc::channel(8);
        broadcaster
            .join(&subject, context::Id::random(), full_tx)
            .await;
        broadcaster.join(&subject, context::Id::random(), ok_tx).await;

        broadcaster.publish(&subject, &typing_event(true)).await;
        broadcaster.publish(&subject, &typing_event(false)).await;

        // the healthy subscriber saw both, the saturated one lost exactly one
        assert!(ok_rx.try_recv().is_ok());
        assert!(ok_rx.try_recv().is_ok());
        assert!(full_rx.try_recv().is_ok());
        assert!(full_rx.try_recv().is_err());
        assert_eq!(broadcaster.dropped(), 1);
    }

    #[tokio::test]
    async fn envelopes_arrive_in_publish_order() {
        let broadcaster = Broadcaster::new();
        let subject = room_subject();

        let (tx, mut rx) = mpsc::channel(16);
        broadcaster.join(&subject, context::Id::random(), tx).await;

        for typing in [true, false, true, true, false] {
            broadcaster.publish(&subject, &typing_event(typing)).await;
        }

        let mut received = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            match envelope.decode().unwrap() {
                Event::Typing { typing, .. } => received.push(typing),
                other => panic!("unexpected event {other:?}"),
            }
        }

        assert_eq!(received, vec![true, false, true, true, false]);
    }

    #[tokio::test]
    async fn publishing_to_an_empty_subject_is_a_no_op() {
        let broadcaster = Broadcaster::new();

        broadcaster.publish(&room_subject(), &typing_event(true)).await;

        assert_eq!(broadcaster.dropped(), 0);
    }
}
