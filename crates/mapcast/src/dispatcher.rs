//! Broadcast dispatcher: domain events in, frames out.
//!
//! Subscribed to every [`EventKind`](mapcast_events::EventKind) on the bus.
//! For each event it picks an [`Audience`], encodes one frame, snapshots
//! the registry and queues the frame on every selected session.

use std::sync::Arc;

use mapcast_events::{DomainEvent, EventBus};
use mapcast_protocol::{Codec, ServerMessage};
use mapcast_session::{Email, Session, SessionError, SessionRegistry};

/// Which sessions receive a broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Every live session, bound or anonymous.
    All,

    /// Everyone except sessions bound to this account. Anonymous sessions
    /// are always included.
    AllExcept(Email),
}

impl Audience {
    /// Returns `true` if `session` should receive the frame.
    pub fn includes(&self, session: &Session) -> bool {
        match self {
            Self::All => true,
            Self::AllExcept(excluded) => session.identity() != Some(excluded),
        }
    }
}

/// Encodes [`DomainEvent`]s and fans them out to live sessions.
pub struct BroadcastDispatcher<C: Codec> {
    registry: Arc<SessionRegistry>,
    codec: C,
}

impl<C: Codec> BroadcastDispatcher<C> {
    /// Creates a dispatcher over the shared registry.
    pub fn new(registry: Arc<SessionRegistry>, codec: C) -> Self {
        Self { registry, codec }
    }

    /// Subscribes this dispatcher to every event kind on `bus`.
    pub fn install(self: Arc<Self>, bus: &mut EventBus) {
        bus.subscribe_all(move |event| {
            self.dispatch(event);
            Ok(())
        });
    }

    /// Maps an event to its audience and wire message.
    ///
    /// Only a new marker is withheld from its author, whose client already
    /// drew it; every removal and every layer change goes to everyone.
    pub fn route(event: &DomainEvent) -> (Audience, ServerMessage) {
        match event.clone() {
            DomainEvent::MarkerAdded {
                id,
                name,
                url,
                lat,
                lng,
                owner_email,
            } => (
                Audience::AllExcept(Email::new(owner_email)),
                ServerMessage::MarkerAdded {
                    id,
                    name,
                    url,
                    lat,
                    lng,
                },
            ),
            DomainEvent::MarkerRemoved { id } => {
                (Audience::All, ServerMessage::MarkerRemoved { id })
            }
            DomainEvent::LayerAdded {
                id,
                name,
                description,
                geometry_json,
            } => (
                Audience::All,
                ServerMessage::LayerAdded {
                    id,
                    name,
                    description,
                    geometry_json,
                },
            ),
            DomainEvent::LayerEdited {
                id,
                name,
                description,
                geometry_json,
            } => (
                Audience::All,
                ServerMessage::LayerEdited {
                    id,
                    name,
                    description,
                    geometry_json,
                },
            ),
            DomainEvent::LayerRemoved { id } => {
                (Audience::All, ServerMessage::LayerRemoved { id })
            }
        }
    }

    /// Delivers one event. Returns how many sessions the frame was queued
    /// for. A session whose queue is full or whose writer has gone is
    /// skipped, not retried.
    pub fn dispatch(&self, event: &DomainEvent) -> usize {
        let (audience, message) = Self::route(event);
        let frame = self.codec.encode(&message);

        let mut delivered = 0;
        for session in self.registry.all_sessions() {
            if !audience.includes(&session) {
                continue;
            }
            match session.send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e @ SessionError::QueueFull(_)) => {
                    tracing::warn!(conn_id = %session.id(), error = %e, "slow client, dropped broadcast frame");
                }
                Err(e) => {
                    tracing::debug!(conn_id = %session.id(), error = %e, "dropped broadcast frame");
                }
            }
        }

        tracing::debug!(
            kind = %event.kind(),
            activity = %message.activity(),
            delivered,
            "broadcast event"
        );
        delivered
    }
}

#[cfg(test)]
mod tests {
    use mapcast_protocol::{Frame, PipeCodec};
    use mapcast_session::{OUTBOUND_QUEUE_CAPACITY, outbound_queue};
    use mapcast_transport::ConnectionId;
    use tokio::sync::mpsc;

    use super::*;

    fn marker_added(owner: &str) -> DomainEvent {
        DomainEvent::MarkerAdded {
            id: "m1".into(),
            name: "Park".into(),
            url: "http://x".into(),
            lat: 53.1,
            lng: 50.2,
            owner_email: owner.into(),
        }
    }

    fn open(
        registry: &SessionRegistry,
        id: u64,
        email: Option<&str>,
    ) -> mpsc::Receiver<Frame> {
        let (tx, rx) = outbound_queue();
        registry.register(ConnectionId::new(id), tx).unwrap();
        if let Some(email) = email {
            registry.bind(ConnectionId::new(id), Email::new(email)).unwrap();
        }
        rx
    }

    #[test]
    fn test_route_marker_added_excludes_owner() {
        let (audience, message) = BroadcastDispatcher::<PipeCodec>::route(&marker_added("a@x.com"));
        assert_eq!(audience, Audience::AllExcept(Email::new("a@x.com")));
        assert!(matches!(message, ServerMessage::MarkerAdded { ref id, .. } if id == "m1"));
    }

    #[test]
    fn test_route_other_events_go_to_all() {
        let events = [
            DomainEvent::MarkerRemoved { id: "m1".into() },
            DomainEvent::LayerRemoved { id: "l1".into() },
            DomainEvent::LayerAdded {
                id: "l1".into(),
                name: "n".into(),
                description: "d".into(),
                geometry_json: "{}".into(),
            },
            DomainEvent::LayerEdited {
                id: "l1".into(),
                name: "n".into(),
                description: "d".into(),
                geometry_json: "{}".into(),
            },
        ];
        for event in &events {
            let (audience, _) = BroadcastDispatcher::<PipeCodec>::route(event);
            assert_eq!(audience, Audience::All, "{:?}", event.kind());
        }
    }

    #[test]
    fn test_dispatch_marker_added_skips_author_only() {
        let registry = Arc::new(SessionRegistry::new());
        let mut alice = open(&registry, 1, Some("a@x.com"));
        let mut other = open(&registry, 2, Some("c@x.com"));
        let mut anon = open(&registry, 3, None);
        let dispatcher = BroadcastDispatcher::new(Arc::clone(&registry), PipeCodec);

        let delivered = dispatcher.dispatch(&marker_added("a@x.com"));

        assert_eq!(delivered, 2);
        assert!(alice.try_recv().is_err());
        let expected = Frame::new("101|m1|Park|http://x|53.1|50.2");
        assert_eq!(other.try_recv().unwrap(), expected);
        assert_eq!(anon.try_recv().unwrap(), expected);
        assert!(other.try_recv().is_err(), "exactly one frame");
    }

    #[test]
    fn test_dispatch_marker_removed_reaches_everyone() {
        let registry = Arc::new(SessionRegistry::new());
        let mut bound = open(&registry, 1, Some("a@x.com"));
        let mut anon = open(&registry, 2, None);
        let dispatcher = BroadcastDispatcher::new(Arc::clone(&registry), PipeCodec);

        let delivered = dispatcher.dispatch(&DomainEvent::MarkerRemoved { id: "m1".into() });

        assert_eq!(delivered, 2);
        assert_eq!(bound.try_recv().unwrap(), Frame::new("102|m1"));
        assert_eq!(anon.try_recv().unwrap(), Frame::new("102|m1"));
    }

    #[test]
    fn test_dispatch_closed_writer_does_not_stop_others() {
        let registry = Arc::new(SessionRegistry::new());
        let gone = open(&registry, 1, None);
        let mut live = open(&registry, 2, None);
        drop(gone);
        let dispatcher = BroadcastDispatcher::new(Arc::clone(&registry), PipeCodec);

        let delivered = dispatcher.dispatch(&DomainEvent::LayerRemoved { id: "l1".into() });

        assert_eq!(delivered, 1);
        assert_eq!(live.try_recv().unwrap(), Frame::new("106|l1"));
    }

    #[test]
    fn test_dispatch_stalled_session_is_capped_while_others_receive() {
        let registry = Arc::new(SessionRegistry::new());
        let mut stalled = open(&registry, 1, None);
        let mut live = open(&registry, 2, None);
        let dispatcher = BroadcastDispatcher::new(Arc::clone(&registry), PipeCodec);
        let geometry = "x".repeat(10_000);

        let rounds = OUTBOUND_QUEUE_CAPACITY * 4;
        for n in 0..rounds {
            let delivered = dispatcher.dispatch(&DomainEvent::LayerAdded {
                id: format!("l{n}"),
                name: "n".into(),
                description: "d".into(),
                geometry_json: geometry.clone(),
            });
            let expected = if n < OUTBOUND_QUEUE_CAPACITY { 2 } else { 1 };
            assert_eq!(delivered, expected, "round {n}");
            assert!(live.try_recv().unwrap().as_str().starts_with(&format!("105|l{n}|")));
        }

        let mut pending = 0;
        while let Ok(frame) = stalled.try_recv() {
            pending += 1;
            if pending == 1 {
                assert!(frame.as_str().starts_with("105|l0|"));
            }
        }
        assert_eq!(pending, OUTBOUND_QUEUE_CAPACITY);
    }

    #[test]
    fn test_dispatch_with_no_sessions_delivers_nothing() {
        let registry = Arc::new(SessionRegistry::new());
        let dispatcher = BroadcastDispatcher::new(registry, PipeCodec);
        assert_eq!(dispatcher.dispatch(&DomainEvent::MarkerRemoved { id: "m1".into() }), 0);
    }

    #[test]
    fn test_install_subscribes_every_kind() {
        use mapcast_events::EventKind;

        let registry = Arc::new(SessionRegistry::new());
        let mut bus = EventBus::new();
        Arc::new(BroadcastDispatcher::new(Arc::clone(&registry), PipeCodec)).install(&mut bus);

        for kind in EventKind::ALL {
            assert_eq!(bus.subscriber_count(kind), 1);
        }

        let mut rx = open(&registry, 1, None);
        bus.publish(DomainEvent::LayerRemoved { id: "l2".into() });
        assert_eq!(rx.try_recv().unwrap(), Frame::new("106|l2"));
    }
}
