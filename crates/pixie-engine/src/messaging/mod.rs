//! Request/response messaging over the bus
//!
//! The client side ([`MessagingClient`]) turns "publish on
//! `request/{kind}`, wait for `response/{kind}`" into an awaitable call that
//! yields `None` on timeout, disconnect or when offline. At most one request
//! per kind is outstanding; a second request of the same kind replaces the
//! first, which then resolves to `None`.
//!
//! The transport side ([`Link`]) is what a bus implementation drives: it
//! drains [`Outbound`] publishes and feeds every [`LinkEvent`] it observes
//! into the [`Router`]. [`mqtt`] is the real transport,
//! [`crate::mocks::MockBroker`] an in-process one for tests.

use core::time::Duration;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pixie_protocol::{CommandMessage, CoverQuery, PhotoQuery, RequestKind, Topics};
use tokio::sync::{mpsc, oneshot, watch};

#[cfg(feature = "mqtt")]
pub mod mqtt;

/// Wait limit for `config`
pub const CONFIG_TIMEOUT: Duration = Duration::from_secs(10);
/// Wait limit for `photo`
pub const PHOTO_TIMEOUT: Duration = Duration::from_secs(15);
/// Wait limit for `song`
pub const SONG_TIMEOUT: Duration = Duration::from_secs(5);
/// Wait limit for `cover`
pub const COVER_TIMEOUT: Duration = Duration::from_secs(15);

const EMPTY_BODY: &[u8] = b"{}";

/// Whether the bus connection is up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Not connected (initial state)
    Disconnected,
    /// Connected and subscribed
    Connected,
}

/// Work for the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Publish `payload` on `topic` (QoS 1, not retained)
    Publish {
        /// Topic
        topic: String,
        /// Raw body
        payload: Vec<u8>,
    },
    /// Close the connection
    Disconnect,
}

/// Something the transport observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Connection established and subscriptions issued
    Connected,
    /// Connection lost or closed
    Disconnected,
    /// A message arrived on a subscribed topic
    Message {
        /// Topic
        topic: String,
        /// Raw body
        payload: Vec<u8>,
    },
}

struct Pending {
    ticket: u64,
    reply: oneshot::Sender<Vec<u8>>,
}

struct Shared {
    pending: Mutex<HashMap<RequestKind, Pending>>,
    connected: AtomicBool,
    next_ticket: AtomicU64,
    status: watch::Sender<LinkStatus>,
    commands: mpsc::UnboundedSender<CommandMessage>,
}

impl Shared {
    fn pending(&self) -> MutexGuard<'_, HashMap<RequestKind, Pending>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_connected(&self, connected: bool) {
        let was_connected = self.connected.swap(connected, Ordering::SeqCst);
        if !connected {
            // Dropping the senders resolves every waiter with `None`
            let cancelled = self.pending().drain().count();
            if cancelled > 0 {
                tracing::debug!(cancelled, "cancelled pending requests");
            }
        }
        if was_connected != connected {
            let status = if connected {
                LinkStatus::Connected
            } else {
                LinkStatus::Disconnected
            };
            tracing::info!(?status, "bus link status changed");
            self.status.send_replace(status);
        }
    }

    fn resolve(&self, kind: RequestKind, payload: Vec<u8>) -> bool {
        match self.pending().remove(&kind) {
            Some(pending) => {
                // The waiter may have given up in the meantime
                let _ = pending.reply.send(payload);
                true
            }
            None => false,
        }
    }

    fn forget(&self, kind: RequestKind, ticket: u64) {
        let mut pending = self.pending();
        if pending.get(&kind).is_some_and(|p| p.ticket == ticket) {
            pending.remove(&kind);
        }
    }
}

/// Receivers the device loop listens on
pub struct Inbox {
    /// Commands pushed on `pixie/{id}`
    pub commands: mpsc::UnboundedReceiver<CommandMessage>,
    /// Connection status changes
    pub status: watch::Receiver<LinkStatus>,
}

/// The transport's half of the client
pub struct Link {
    /// Publishes and disconnect requests to carry out
    pub outbound: mpsc::UnboundedReceiver<Outbound>,
    /// Where to report what the bus delivers
    pub router: Router,
}

/// Dispatches transport events to waiting requests and the command inbox
#[derive(Clone)]
pub struct Router {
    topics: Topics,
    shared: Arc<Shared>,
}

impl Router {
    /// Topic names of the device this router serves
    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Process one transport event
    pub fn handle(&self, event: LinkEvent) {
        match event {
            LinkEvent::Connected => self.shared.set_connected(true),
            LinkEvent::Disconnected => self.shared.set_connected(false),
            LinkEvent::Message { topic, payload } => self.route(&topic, payload),
        }
    }

    fn route(&self, topic: &str, payload: Vec<u8>) {
        if let Some(segment) = self.topics.response_segment(topic) {
            match RequestKind::from_name(segment) {
                Some(kind) => {
                    if !self.shared.resolve(kind, payload) {
                        tracing::debug!(%kind, "response with no waiting request");
                    }
                }
                None => tracing::debug!(segment, "response of unknown kind"),
            }
        } else if self.topics.is_command(topic) {
            match CommandMessage::parse(&payload) {
                Some(message) => {
                    tracing::debug!(action = %message.action, "command received");
                    if self.shared.commands.send(message).is_err() {
                        tracing::debug!("command inbox closed, dropping command");
                    }
                }
                None => tracing::debug!(bytes = payload.len(), "ignoring non-command payload"),
            }
        } else {
            tracing::trace!(topic, "message on unrelated topic");
        }
    }
}

/// Device-side request/response client. Clones share state.
#[derive(Clone)]
pub struct MessagingClient {
    topics: Topics,
    shared: Arc<Shared>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl MessagingClient {
    /// Create a disconnected client for `pixie_id` with its inbox and transport link
    pub fn new(pixie_id: u32) -> (Self, Inbox, Link) {
        let topics = Topics::new(pixie_id);
        let (status_tx, status_rx) = watch::channel(LinkStatus::Disconnected);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            pending: Mutex::new(HashMap::new()),
            connected: AtomicBool::new(false),
            next_ticket: AtomicU64::new(0),
            status: status_tx,
            commands: command_tx,
        });

        let client = Self {
            topics: topics.clone(),
            shared: Arc::clone(&shared),
            outbound: outbound_tx,
        };
        let inbox = Inbox {
            commands: command_rx,
            status: status_rx,
        };
        let link = Link {
            outbound: outbound_rx,
            router: Router { topics, shared },
        };
        (client, inbox, link)
    }

    /// Topic names of this device
    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Whether the link is up
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Whether a request of `kind` is waiting for its response
    pub fn has_pending(&self, kind: RequestKind) -> bool {
        self.shared.pending().contains_key(&kind)
    }

    /// Publish a request and wait up to `timeout` for its response.
    ///
    /// `None` when offline, on timeout, or when the link drops first.
    pub async fn request(
        &self,
        kind: RequestKind,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Option<Vec<u8>> {
        if !self.is_connected() {
            tracing::debug!(%kind, "not connected, skipping request");
            return None;
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        let ticket = self.shared.next_ticket.fetch_add(1, Ordering::Relaxed);
        let replaced = self.shared.pending().insert(
            kind,
            Pending {
                ticket,
                reply: reply_tx,
            },
        );
        if replaced.is_some() {
            tracing::debug!(%kind, "superseding outstanding request");
        }

        let publish = Outbound::Publish {
            topic: self.topics.request(kind),
            payload,
        };
        if self.outbound.send(publish).is_err() {
            tracing::warn!(%kind, "transport gone, dropping request");
            self.shared.forget(kind, ticket);
            return None;
        }

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(body)) => Some(body),
            Ok(Err(_)) => None,
            Err(_) => {
                self.shared.forget(kind, ticket);
                tracing::warn!(%kind, ?timeout, "timed out waiting for response");
                None
            }
        }
    }

    /// Fetch the device configuration
    pub async fn request_config(&self) -> Option<Vec<u8>> {
        self.request(RequestKind::Config, EMPTY_BODY.to_vec(), CONFIG_TIMEOUT)
            .await
    }

    /// Fetch a photo by carousel index or server id
    pub async fn request_photo(&self, query: PhotoQuery) -> Option<Vec<u8>> {
        let body = serde_json::to_vec(&query).ok()?;
        self.request(RequestKind::Photo, body, PHOTO_TIMEOUT).await
    }

    /// Ask which song is playing
    pub async fn request_song(&self) -> Option<Vec<u8>> {
        self.request(RequestKind::Song, EMPTY_BODY.to_vec(), SONG_TIMEOUT)
            .await
    }

    /// Fetch the cover for `song_id`
    pub async fn request_cover(&self, song_id: &str) -> Option<Vec<u8>> {
        let body = serde_json::to_vec(&CoverQuery {
            song_id: song_id.to_owned(),
        })
        .ok()?;
        self.request(RequestKind::Cover, body, COVER_TIMEOUT).await
    }

    /// Drop the connection: every pending request resolves to `None` and the
    /// transport is asked to close.
    pub fn disconnect(&self) {
        self.shared.set_connected(false);
        if self.outbound.send(Outbound::Disconnect).is_err() {
            tracing::debug!("transport already stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_request_offline_is_none() {
        let (client, _inbox, mut link) = MessagingClient::new(1);
        assert_eq!(client.request_song().await, None);
        assert!(link.outbound.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_resolves_request() {
        let (client, _inbox, mut link) = MessagingClient::new(4);
        link.router.handle(LinkEvent::Connected);

        let waiter = tokio::spawn({
            let client = client.clone();
            async move { client.request_song().await }
        });

        let published = link.outbound.recv().await.unwrap();
        assert_eq!(
            published,
            Outbound::Publish {
                topic: "pixie/4/request/song".into(),
                payload: b"{}".to_vec(),
            }
        );
        link.router.handle(LinkEvent::Message {
            topic: "pixie/4/response/song".into(),
            payload: br#"{"id":"s1"}"#.to_vec(),
        });

        assert_eq!(waiter.await.unwrap(), Some(br#"{"id":"s1"}"#.to_vec()));
        assert!(!client.has_pending(RequestKind::Song));
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_reaches_inbox() {
        let (_client, mut inbox, link) = MessagingClient::new(4);
        link.router.handle(LinkEvent::Message {
            topic: "pixie/4".into(),
            payload: br#"{"action":"enter_draw_mode"}"#.to_vec(),
        });
        link.router.handle(LinkEvent::Message {
            topic: "pixie/4".into(),
            payload: b"garbage".to_vec(),
        });

        let message = inbox.commands.recv().await.unwrap();
        assert_eq!(message.action, "enter_draw_mode");
        assert!(inbox.commands.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_watch_follows_link() {
        let (client, inbox, link) = MessagingClient::new(4);
        assert_eq!(*inbox.status.borrow(), LinkStatus::Disconnected);
        link.router.handle(LinkEvent::Connected);
        assert_eq!(*inbox.status.borrow(), LinkStatus::Connected);
        assert!(client.is_connected());
        client.disconnect();
        assert_eq!(*inbox.status.borrow(), LinkStatus::Disconnected);
    }
}
