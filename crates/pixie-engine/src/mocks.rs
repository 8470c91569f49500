//! In-process broker for tests and offline runs
//!
//! Plays the server: it sees every request the device publishes and can
//! answer, push commands or drop the connection. Nothing leaves the process.

use pixie_protocol::RequestKind;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::messaging::{Link, LinkEvent, Outbound, Router};

/// A request as the broker saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Which request topic it was published on
    pub kind: RequestKind,
    /// Request body
    pub payload: Vec<u8>,
}

/// Server-side test double for a [`Link`]
pub struct MockBroker {
    outbound: mpsc::UnboundedReceiver<Outbound>,
    router: Router,
}

impl MockBroker {
    /// Take over the transport side of a client
    pub fn new(link: Link) -> Self {
        Self {
            outbound: link.outbound,
            router: link.router,
        }
    }

    /// Handle for injecting events after the broker has been moved into
    /// [`serve`](Self::serve)
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Report the connection as established
    pub fn connect(&self) {
        self.router.handle(LinkEvent::Connected);
    }

    /// Report the connection as lost
    pub fn drop_connection(&self) {
        self.router.handle(LinkEvent::Disconnected);
    }

    /// Push a JSON command on the device's command topic
    pub fn send_command(&self, json: &str) {
        self.router.handle(LinkEvent::Message {
            topic: self.router.topics().command().to_owned(),
            payload: json.as_bytes().to_vec(),
        });
    }

    /// Publish a response for `kind`
    pub fn respond(&self, kind: RequestKind, payload: Vec<u8>) {
        self.router.handle(LinkEvent::Message {
            topic: self.router.topics().response(kind),
            payload,
        });
    }

    /// Wait for the next request. `None` once the device disconnects or is dropped.
    pub async fn next_request(&mut self) -> Option<Request> {
        loop {
            match self.outbound.recv().await? {
                Outbound::Publish { topic, payload } => {
                    if let Some(kind) = self.router.topics().request_kind(&topic) {
                        return Some(Request { kind, payload });
                    }
                    tracing::debug!(%topic, "mock broker ignoring publish");
                }
                Outbound::Disconnect => return None,
            }
        }
    }

    /// Next already-published request, if any
    pub fn try_next_request(&mut self) -> Option<Request> {
        while let Ok(work) = self.outbound.try_recv() {
            if let Outbound::Publish { topic, payload } = work {
                if let Some(kind) = self.router.topics().request_kind(&topic) {
                    return Some(Request { kind, payload });
                }
            }
        }
        None
    }

    /// Connect and answer every request with `responder` in a background
    /// task. Returning `None` leaves the request unanswered.
    pub fn serve<F>(mut self, mut responder: F) -> JoinHandle<()>
    where
        F: FnMut(&Request) -> Option<Vec<u8>> + Send + 'static,
    {
        self.connect();
        tokio::spawn(async move {
            while let Some(request) = self.next_request().await {
                if let Some(reply) = responder(&request) {
                    self.respond(request.kind, reply);
                }
            }
        })
    }
}
