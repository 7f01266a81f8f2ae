//! `rumqttc` binding.
//!
//! [`RumqttTransport`] implements [`MqttTransport`] on top of
//! `rumqttc::AsyncClient`. [`ClimateRuntime`] owns one climate entity, polls
//! the client event loop in the background, re-subscribes on every connection
//! acknowledgement, and feeds incoming publishes to the entity one at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ClimateConfig;
use crate::entity::{ClimateState, MqttClimate};
use crate::error::{ClimateError, ClimateResult};
use crate::transport::{MqttTransport, QoS};

/// Consecutive event loop errors before the runtime gives up.
const MAX_CONSECUTIVE_ERRORS: u32 = 5;
/// Capacity of the client request channel.
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// Broker connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker host name or address
    #[serde(default = "default_host")]
    pub host: String,

    /// Broker port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Client ID (generated when not provided)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Keep-alive interval in seconds
    #[serde(default = "default_keep_alive")]
    pub keep_alive: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    1883
}
fn default_keep_alive() -> u64 {
    60
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self::new(default_host())
    }
}

impl BrokerConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            client_id: None,
            username: None,
            password: None,
            keep_alive: default_keep_alive(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn full_broker_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build `rumqttc` options, generating a client ID if none is set.
    pub fn mqtt_options(&self) -> MqttOptions {
        let client_id = self
            .client_id
            .clone()
            .unwrap_or_else(|| format!("mqtt-climate-{}", Uuid::new_v4()));

        let mut options = MqttOptions::new(client_id, &self.host, self.port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive));

        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            options.set_credentials(user, pass);
        }
        options
    }
}

fn to_rumqtt_qos(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

/// [`MqttTransport`] over a `rumqttc` client.
#[derive(Clone)]
pub struct RumqttTransport {
    client: AsyncClient,
}

impl RumqttTransport {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }

    /// Create a client for `broker`. The returned event loop must be polled
    /// for requests to reach the broker.
    pub fn connect(broker: &BrokerConfig) -> (Self, EventLoop) {
        let (client, eventloop) = AsyncClient::new(broker.mqtt_options(), REQUEST_CHANNEL_CAPACITY);
        (Self::new(client), eventloop)
    }

    pub async fn disconnect(&self) -> ClimateResult<()> {
        self.client
            .disconnect()
            .await
            .map_err(|e| ClimateError::Transport(e.to_string()))
    }
}

#[async_trait]
impl MqttTransport for RumqttTransport {
    async fn publish(
        &self,
        topic: &str,
        payload: &str,
        qos: QoS,
        retain: bool,
    ) -> ClimateResult<()> {
        self.client
            .publish(topic, to_rumqtt_qos(qos), retain, payload.as_bytes().to_vec())
            .await
            .map_err(|e| ClimateError::Transport(format!("publish to {}: {}", topic, e)))
    }

    async fn subscribe(&self, topic: &str, qos: QoS) -> ClimateResult<()> {
        self.client
            .subscribe(topic, to_rumqtt_qos(qos))
            .await
            .map_err(|e| ClimateError::Transport(format!("subscribe to {}: {}", topic, e)))
    }
}

/// Work handed from the event loop task to the dispatch task.
#[derive(Debug)]
enum RuntimeEvent {
    /// Broker acknowledged a (re)connection
    Connected,
    /// Publish received on a subscribed topic
    Message { topic: String, payload: Vec<u8> },
}

/// A climate entity connected to a broker.
///
/// Two tasks back the runtime. The event loop task only polls `rumqttc` and
/// forwards events; it never locks the entity or waits on the client request
/// channel, so host requests queued on that channel are always drained. The
/// dispatch task applies forwarded events to the entity one at a time.
pub struct ClimateRuntime {
    entity: Arc<Mutex<MqttClimate>>,
    transport: RumqttTransport,
    running: Arc<AtomicBool>,
    closed: watch::Receiver<bool>,
    poll_task: JoinHandle<()>,
    dispatch_task: JoinHandle<()>,
}

impl ClimateRuntime {
    /// Connect to `broker`, create the entity and start the runtime tasks.
    pub fn start<F>(
        broker: &BrokerConfig,
        config: ClimateConfig,
        unit: impl Into<String>,
        on_update: F,
    ) -> ClimateResult<Self>
    where
        F: Fn(&ClimateState) + Send + Sync + 'static,
    {
        config.validate()?;

        let (transport, eventloop) = RumqttTransport::connect(broker);
        let entity = MqttClimate::new(config, unit, Arc::new(transport.clone()))
            .with_update_listener(on_update);
        let entity = Arc::new(Mutex::new(entity));
        let running = Arc::new(AtomicBool::new(true));
        let (closed_tx, closed) = watch::channel(false);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let poll_task = tokio::spawn(Self::poll(
            eventloop,
            event_tx,
            running.clone(),
            closed_tx,
            broker.full_broker_addr(),
        ));
        let dispatch_task = tokio::spawn(Self::dispatch(event_rx, entity.clone()));

        info!("Started MQTT climate runtime on {}", broker.full_broker_addr());
        Ok(Self {
            entity,
            transport,
            running,
            closed,
            poll_task,
            dispatch_task,
        })
    }

    /// The hosted entity. Lock it to read state or apply host requests.
    pub fn entity(&self) -> Arc<Mutex<MqttClimate>> {
        self.entity.clone()
    }

    pub fn is_running(&self) -> bool {
        !*self.closed.borrow()
    }

    /// Resolves once the event loop task has ended, either after [`stop`]
    /// or after too many consecutive broker errors.
    ///
    /// [`stop`]: ClimateRuntime::stop
    pub async fn closed(&self) {
        let mut closed = self.closed.clone();
        // A dropped sender also means the event loop is gone.
        let _ = closed.wait_for(|closed| *closed).await;
    }

    /// Disconnect from the broker and wait for both runtime tasks to end.
    pub async fn stop(self) -> ClimateResult<()> {
        self.running.store(false, Ordering::SeqCst);
        if let Err(e) = self.transport.disconnect().await {
            debug!("Disconnect request not delivered: {}", e);
        }

        let join_error =
            |e: tokio::task::JoinError| ClimateError::Other(anyhow::anyhow!("runtime task failed: {}", e));
        self.poll_task.await.map_err(join_error)?;
        self.dispatch_task.await.map_err(join_error)
    }

    async fn poll(
        mut eventloop: EventLoop,
        events: mpsc::UnboundedSender<RuntimeEvent>,
        running: Arc<AtomicBool>,
        closed: watch::Sender<bool>,
        broker_addr: String,
    ) {
        let mut error_count = 0;

        while running.load(Ordering::SeqCst) {
            match eventloop.poll().await {
                Ok(event) => {
                    error_count = 0;
                    let forwarded = match event {
                        Event::Incoming(Packet::ConnAck(_)) => {
                            info!("Connected to MQTT broker {}", broker_addr);
                            Some(RuntimeEvent::Connected)
                        }
                        Event::Incoming(Packet::Publish(publish)) => Some(RuntimeEvent::Message {
                            topic: publish.topic,
                            payload: publish.payload.to_vec(),
                        }),
                        _ => None,
                    };
                    if let Some(event) = forwarded {
                        if events.send(event).is_err() {
                            warn!("MQTT broker {} dispatcher gone, stopping", broker_addr);
                            break;
                        }
                    }
                }
                Err(e) => {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    error_count += 1;
                    if error_count >= MAX_CONSECUTIVE_ERRORS {
                        error!(
                            "MQTT broker {} error count reached {}, stopping: {}",
                            broker_addr, MAX_CONSECUTIVE_ERRORS, e
                        );
                        break;
                    }
                    warn!(
                        "MQTT broker {} error ({}/{}): {}",
                        broker_addr, error_count, MAX_CONSECUTIVE_ERRORS, e
                    );
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        running.store(false, Ordering::SeqCst);
        closed.send_replace(true);
        info!("MQTT broker {} connection closed", broker_addr);
    }

    async fn dispatch(
        mut events: mpsc::UnboundedReceiver<RuntimeEvent>,
        entity: Arc<Mutex<MqttClimate>>,
    ) {
        while let Some(event) = events.recv().await {
            let mut entity = entity.lock().await;
            match event {
                RuntimeEvent::Connected => {
                    if let Err(e) = entity.subscribe().await {
                        warn!("'{}' failed to subscribe: {}", entity.name(), e);
                    }
                }
                RuntimeEvent::Message { topic, payload } => {
                    entity.handle_message(&topic, &payload);
                }
            }
        }
    }
}
