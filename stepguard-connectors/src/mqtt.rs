//! MQTT Delivery Layer
//!
//! ## Overview
//!
//! One broker session per device, driven by a dedicated event-loop thread.
//! The polling loop in `stepguard-core` never touches the socket: it
//! publishes through [`MqttLink`], which hands requests to the rumqttc
//! client, while the event-loop thread keeps the session alive and the
//! shared [`LinkState`](crate::LinkState) current.
//!
//! ## Reconnect Policy
//!
//! The event loop retries forever with a fixed backoff (default 5 s)
//! between attempts. `maintain` blocks the caller until the session is
//! back, a documented, deliberate stall of the whole device while the
//! uplink is down, and only a [`CancelToken`] breaks the wait.
//!
//! ## QoS and Presence
//!
//! - Reports and pulses go out QoS 0, single attempt: delivery is
//!   at-most-once by design, matching the drain-per-attempt aggregator.
//! - On every ConnAck the link announces `"online"` on the status topic
//!   before any other traffic, so backends that only track connection
//!   transitions see the device immediately.
//! - The session registers an `"offline"` Last Will; an unclean drop is
//!   announced by the broker itself.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rumqttc::{Client, Connection, Event, Incoming, LastWill, MqttOptions, QoS};
use thiserror::Error;

use stepguard_core::{CancelToken, DeviceIdentity, Report, ReportLink};

use crate::{ConnectionStats, Connector, LinkState, LinkStatus};

/// Default fixed delay between reconnect attempts
pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Default MQTT keep-alive
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Default topic namespace
pub const DEFAULT_TOPIC_ROOT: &str = "stepguard";

/// Payload announcing presence on the status channel
const ONLINE_PAYLOAD: &str = "online";

/// Last Will payload for unclean disconnects
const OFFLINE_PAYLOAD: &str = "offline";

/// Outstanding-request capacity between the link and its event loop
const REQUEST_CAPACITY: usize = 16;

/// MQTT-specific errors
#[derive(Debug, Error)]
pub enum MqttError {
    /// Request could not be handed to the event loop
    #[error("client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// No broker session at publish time
    #[error("no broker session")]
    NotConnected,

    /// Report failed the wire-format bounds
    #[error("payload rejected: {0}")]
    Payload(stepguard_core::ReportError),

    /// Event-loop thread could not be spawned
    #[error("event loop spawn failed: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Broker configuration
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// Broker hostname or address
    pub host: String,
    /// Broker port (1883 plain, 8883 TLS)
    pub port: u16,
    /// Username/password pair, when the broker requires authentication
    pub credentials: Option<(String, String)>,
    /// MQTT keep-alive interval
    pub keep_alive: Duration,
    /// Fixed delay between reconnect attempts
    pub reconnect_backoff: Duration,
    /// Topic namespace both channels live under
    pub topic_root: String,
}

impl MqttConfig {
    /// Create a configuration for the given broker
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            credentials: None,
            keep_alive: DEFAULT_KEEP_ALIVE,
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
            topic_root: DEFAULT_TOPIC_ROOT.into(),
        }
    }

    /// Set username/password authentication
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Set the keep-alive interval
    pub fn keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = interval;
        self
    }

    /// Set the reconnect backoff
    pub fn reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    /// Set the topic namespace
    pub fn topic_root(mut self, root: impl Into<String>) -> Self {
        self.topic_root = root.into();
        self
    }

    /// Telemetry topic for a device
    pub fn report_topic(&self, device_id: &str) -> String {
        format!("{}/{}", self.topic_root, device_id)
    }

    /// Status topic for a device
    pub fn status_topic(&self, device_id: &str) -> String {
        format!("{}/status/{}", self.topic_root, device_id)
    }
}

/// MQTT-backed report link
pub struct MqttLink {
    client: Client,
    status: Arc<LinkStatus>,
    stats: Arc<Mutex<ConnectionStats>>,
    cancel: CancelToken,
    report_topic: String,
    status_topic: String,
}

impl MqttLink {
    /// Open a session towards the broker and start its event loop
    ///
    /// Returns immediately; the session is established (and re-established)
    /// in the background. Use [`MqttLink::ensure_connected`] or
    /// [`ReportLink::maintain`] to block until it is up.
    pub fn connect(
        config: MqttConfig,
        identity: &DeviceIdentity,
        cancel: CancelToken,
    ) -> Result<Self, MqttError> {
        let report_topic = config.report_topic(identity.as_str());
        let status_topic = config.status_topic(identity.as_str());

        let mut options = MqttOptions::new(identity.client_id(), &config.host, config.port);
        options.set_keep_alive(config.keep_alive);
        if let Some((username, password)) = &config.credentials {
            options.set_credentials(username, password);
        }
        // The broker announces our death if we cannot
        options.set_last_will(LastWill::new(
            status_topic.clone(),
            OFFLINE_PAYLOAD.as_bytes().to_vec(),
            QoS::AtMostOnce,
            false,
        ));

        let (client, connection) = Client::new(options, REQUEST_CAPACITY);

        let status = Arc::new(LinkStatus::new(LinkState::Connecting));
        let stats = Arc::new(Mutex::new(ConnectionStats::default()));

        spawn_event_loop(
            connection,
            client.clone(),
            Arc::clone(&status),
            Arc::clone(&stats),
            status_topic.clone(),
            config.reconnect_backoff,
            cancel.clone(),
        )?;

        log::info!(
            "mqtt link to {}:{} as {}",
            config.host,
            config.port,
            identity.client_id()
        );

        Ok(Self {
            client,
            status,
            stats,
            cancel,
            report_topic,
            status_topic,
        })
    }

    /// Current link state
    pub fn state(&self) -> LinkState {
        self.status.load()
    }

    /// Snapshot of the connection statistics
    pub fn stats(&self) -> ConnectionStats {
        self.stats.lock().unwrap().clone()
    }

    /// Block until the session is up, or the token is cancelled
    pub fn ensure_connected(&self) -> bool {
        self.status.wait_until_connected(&self.cancel)
    }

    /// Cancel the link and ask the event loop to stop
    pub fn shutdown(&self) {
        self.cancel.cancel();
        let _ = self.client.try_disconnect();
    }

    /// One publish attempt against the current session
    fn publish_raw(&self, topic: &str, payload: Vec<u8>) -> Result<(), MqttError> {
        if self.status.load() != LinkState::Connected {
            self.stats.lock().unwrap().messages_failed += 1;
            return Err(MqttError::NotConnected);
        }

        let bytes = payload.len() as u64;
        match self.client.try_publish(topic, QoS::AtMostOnce, false, payload) {
            Ok(()) => {
                let mut stats = self.stats.lock().unwrap();
                stats.messages_sent += 1;
                stats.bytes_sent += bytes;
                Ok(())
            }
            Err(e) => {
                self.stats.lock().unwrap().messages_failed += 1;
                Err(e.into())
            }
        }
    }
}

impl Connector for MqttLink {
    type Error = MqttError;

    fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        self.publish_raw(topic, data.to_vec())
    }

    fn is_connected(&self) -> bool {
        self.status.load() == LinkState::Connected
    }
}

impl ReportLink for MqttLink {
    type Error = MqttError;

    fn maintain(&mut self) {
        if self.status.load() == LinkState::Connected {
            return;
        }

        log::warn!("link down; blocking until the broker session is back");
        if !self.ensure_connected() {
            log::info!("reconnect wait cancelled");
        }
    }

    fn publish(&mut self, report: &Report) -> Result<(), Self::Error> {
        let payload = report.to_json().map_err(MqttError::Payload)?;
        self.publish_raw(&self.report_topic, payload.into_bytes())
    }

    fn pulse(&mut self) -> Result<(), Self::Error> {
        self.publish_raw(&self.status_topic, ONLINE_PAYLOAD.as_bytes().to_vec())
    }
}

/// Drive the rumqttc connection and keep the shared state current
fn spawn_event_loop(
    mut connection: Connection,
    announcer: Client,
    status: Arc<LinkStatus>,
    stats: Arc<Mutex<ConnectionStats>>,
    status_topic: String,
    backoff: Duration,
    cancel: CancelToken,
) -> Result<(), MqttError> {
    thread::Builder::new()
        .name("mqtt-link".into())
        .spawn(move || {
            for event in connection.iter() {
                if cancel.is_cancelled() {
                    break;
                }

                match event {
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                        status.store(LinkState::Connected);
                        stats.lock().unwrap().reconnections += 1;
                        log::info!("broker session established");

                        // Announce presence before resuming normal traffic
                        if let Err(e) = announcer.try_publish(
                            status_topic.clone(),
                            QoS::AtMostOnce,
                            false,
                            ONLINE_PAYLOAD.as_bytes().to_vec(),
                        ) {
                            log::warn!("online marker failed: {}", e);
                        }
                    }
                    Ok(Event::Incoming(Incoming::Disconnect)) => {
                        status.store(LinkState::Disconnected);
                        log::warn!("broker requested disconnect");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        if status.load() == LinkState::Connected {
                            log::warn!("broker session lost: {}", e);
                        } else {
                            log::debug!("broker connect attempt failed: {}", e);
                        }

                        status.store(LinkState::Disconnected);
                        stats.lock().unwrap().last_error = Some(e.to_string());

                        // Fixed backoff before the iterator's next attempt
                        thread::sleep(backoff);
                        status.store(LinkState::Connecting);
                    }
                }
            }

            status.store(LinkState::Disconnected);
            log::debug!("mqtt event loop stopped");
        })?;

    Ok(())
}
