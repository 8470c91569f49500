//! MQTT transport
//!
//! Drives a rumqttc event loop for one [`Link`]: subscribes to the command
//! and response topics on every (re)connect, forwards incoming publishes to
//! the [`Router`](super::Router) and carries out outbound publishes with QoS 1.

use core::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::{Link, LinkEvent, Outbound, Router};

/// Requests the client may queue before publishes start waiting
const CLIENT_QUEUE_CAPACITY: usize = 32;

/// Largest packet accepted in either direction (photos are ~12.5 KiB)
const MAX_PACKET_SIZE: usize = 65_536;

/// Pause before polling again after a connection error
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// How long a requested disconnect may take to reach the broker
const DISCONNECT_FLUSH: Duration = Duration::from_secs(1);

/// Broker address and credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    /// Broker host name or address
    pub host: String,
    /// Broker TCP port
    pub port: u16,
    /// Username
    pub username: String,
    /// Password
    pub password: String,
    /// MQTT keep-alive interval
    pub keep_alive: Duration,
}

/// Start the transport task. It runs until the client asks to disconnect or
/// is dropped.
pub fn spawn(settings: BrokerSettings, link: Link) -> JoinHandle<()> {
    let Link { outbound, router } = link;

    let mut options = MqttOptions::new(
        router.topics().client_id(),
        settings.host.clone(),
        settings.port,
    );
    options.set_credentials(settings.username.clone(), settings.password.clone());
    options.set_keep_alive(settings.keep_alive);
    options.set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);

    let (client, eventloop) = AsyncClient::new(options, CLIENT_QUEUE_CAPACITY);
    let (stop_tx, stop_rx) = oneshot::channel();

    tracing::info!(host = %settings.host, port = settings.port, "connecting to broker");
    tokio::spawn(forward_outbound(client.clone(), outbound, stop_tx));
    tokio::spawn(poll_events(client, eventloop, router, stop_rx))
}

async fn forward_outbound(
    client: AsyncClient,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    stop: oneshot::Sender<()>,
) {
    while let Some(work) = outbound.recv().await {
        match work {
            Outbound::Publish { topic, payload } => {
                tracing::debug!(%topic, bytes = payload.len(), "publishing");
                if let Err(err) = client
                    .publish(topic.as_str(), QoS::AtLeastOnce, false, payload)
                    .await
                {
                    tracing::warn!(%topic, error = %err, "publish failed");
                }
            }
            Outbound::Disconnect => {
                if let Err(err) = client.disconnect().await {
                    tracing::debug!(error = %err, "disconnect request failed");
                }
                break;
            }
        }
    }
    // Receiver gone means the poll loop already ended
    let _ = stop.send(());
}

async fn poll_events(
    client: AsyncClient,
    mut eventloop: EventLoop,
    router: Router,
    mut stop: oneshot::Receiver<()>,
) {
    let subscriptions = router.topics().subscriptions();
    loop {
        let event = tokio::select! {
            _ = &mut stop => None,
            event = eventloop.poll() => Some(event),
        };
        let Some(event) = event else {
            flush_disconnect(&mut eventloop).await;
            break;
        };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                for topic in &subscriptions {
                    if let Err(err) = client.try_subscribe(topic.as_str(), QoS::AtLeastOnce) {
                        tracing::warn!(%topic, error = %err, "subscribe failed");
                    }
                }
                router.handle(LinkEvent::Connected);
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                router.handle(LinkEvent::Message {
                    topic: publish.topic.clone(),
                    payload: publish.payload.to_vec(),
                });
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                router.handle(LinkEvent::Disconnected);
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "broker connection error");
                router.handle(LinkEvent::Disconnected);
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
    router.handle(LinkEvent::Disconnected);
    tracing::info!("broker transport stopped");
}

/// Keep the event loop turning until the DISCONNECT packet is written
async fn flush_disconnect(eventloop: &mut EventLoop) {
    let flush = async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    };
    if tokio::time::timeout(DISCONNECT_FLUSH, flush).await.is_err() {
        tracing::debug!("disconnect not acknowledged before shutdown");
    }
}
