//! The Hub-facing WebSocket transport.
//!
//! Built on `tokio_tungstenite::connect_async`, a `futures::StreamExt::split`
//! sink/stream pair, and a `tokio::select!` loop multiplexing directions —
//! a standalone client speaking the bridge's own framed JSON protocol
//! rather than forwarding raw frames.

use crate::backoff::Backoff;
use crate::error::{BridgeError, Result};
use crate::metrics::BridgeMetrics;
use crate::queue::OutboundQueue;
use crate::state::ConnectionState;
use debugprobe_kernel::Kernel;
use debugprobe_types::bridge::{
    AdvertisedPlugin, BreakpointHitPayload, EventsBatchPayload, PluginStateChangedPayload,
    RegisterDevicePayload, ResumeBreakpointPayload,
};
use debugprobe_types::{BridgeEnvelope, DeviceInfo, FrameType, PluginCommand};
use futures::{Sink, SinkExt, Stream, StreamExt};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Static configuration for the bridge transport.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Hub host.
    pub host: String,
    /// Hub port.
    pub port: u16,
    /// WebSocket path.
    pub path: String,
    /// Shared secret sent during registration.
    pub token: String,
    /// Path to the durable outbound queue's SQLite file. `None` keeps
    /// the queue purely in-memory.
    pub queue_path: Option<PathBuf>,
    /// Maximum events the outbound queue retains before dropping the
    /// oldest.
    pub queue_capacity: usize,
    /// Maximum events flushed in a single `EventsBatch` frame.
    pub flush_batch_size: usize,
    /// How often the outbound queue is drained, absent other activity.
    pub flush_interval: Duration,
    /// Initial reconnect delay.
    pub reconnect_initial: Duration,
    /// Reconnect delay cap.
    pub reconnect_max: Duration,
    /// How long a dispatched `PluginCommand` may run before the bridge
    /// gives up on it.
    pub command_deadline: Duration,
    /// Plugin id that owns breakpoint hit/resume translation, e.g.
    /// `"http"`.
    pub breakpoint_plugin_id: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9527,
            path: "/debug-bridge".to_string(),
            token: String::new(),
            queue_path: None,
            queue_capacity: 10_000,
            flush_batch_size: 20,
            flush_interval: Duration::from_millis(200),
            reconnect_initial: Duration::from_secs(1),
            reconnect_max: Duration::from_secs(30),
            command_deadline: Duration::from_secs(30),
            breakpoint_plugin_id: "http".to_string(),
        }
    }
}

impl BridgeConfig {
    /// The `ws://host:port/path` the client dials.
    pub fn device_url(&self) -> String {
        format!("ws://{}:{}{}", self.host, self.port, self.path)
    }
}

/// An internally generated message fed into the client's select loop,
/// distinct from frames arriving over the socket.
enum Internal {
    CommandTimedOut(String),
}

/// The Hub-facing transport: owns the outbound queue, the reconnect
/// loop, and command/breakpoint dispatch into the kernel.
pub struct BridgeClient {
    config: BridgeConfig,
    kernel: Arc<Kernel>,
    device: DeviceInfo,
    queue: Arc<OutboundQueue>,
    metrics: Arc<BridgeMetrics>,
    state: Arc<RwLock<ConnectionState>>,
    plugins: Vec<AdvertisedPlugin>,
    stop_flag: Arc<AtomicBool>,
    priority_tx: mpsc::UnboundedSender<BridgeEnvelope>,
    priority_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<BridgeEnvelope>>,
}

impl BridgeClient {
    /// Build a client, opening the outbound queue at `config.queue_path`
    /// (or in-memory if absent).
    pub fn new(
        config: BridgeConfig,
        kernel: Arc<Kernel>,
        device: DeviceInfo,
        plugins: Vec<AdvertisedPlugin>,
    ) -> Result<Self> {
        let metrics = Arc::new(BridgeMetrics::new());
        let queue = match &config.queue_path {
            Some(path) => OutboundQueue::open(path, config.queue_capacity, metrics.clone())?,
            None => OutboundQueue::open_in_memory(config.queue_capacity, metrics.clone())?,
        };
        let (priority_tx, priority_rx) = mpsc::unbounded_channel();
        Ok(Self {
            config,
            kernel,
            device,
            queue: Arc::new(queue),
            metrics,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            plugins,
            stop_flag: Arc::new(AtomicBool::new(false)),
            priority_tx,
            priority_rx: tokio::sync::Mutex::new(priority_rx),
        })
    }

    /// A sender plugins can use to push a frame (a breakpoint hit, a
    /// plugin state change) straight to the Hub, bypassing the durable
    /// outbound queue — these are latency-sensitive and must not wait
    /// behind buffered events.
    pub fn priority_sender(&self) -> mpsc::UnboundedSender<BridgeEnvelope> {
        self.priority_tx.clone()
    }

    /// The current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Ambient transport metrics.
    pub fn metrics(&self) -> Arc<BridgeMetrics> {
        self.metrics.clone()
    }

    /// The outbound queue, so plugins (via the kernel's event channel)
    /// can be drained into it.
    pub fn queue(&self) -> Arc<OutboundQueue> {
        self.queue.clone()
    }

    /// Signal the reconnect loop in `run` to stop after the current
    /// attempt.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// Drive the reconnect loop until [`Self::stop`] is called. Spawns
    /// an internal task draining the kernel's event channel into the
    /// outbound queue for as long as the client runs.
    pub async fn run(&self) {
        let mut backoff = Backoff::new(self.config.reconnect_initial, self.config.reconnect_max);

        if let Some(mut event_rx) = self.kernel.take_event_receiver().await {
            let queue = self.queue.clone();
            tokio::spawn(async move {
                while let Some(event) = event_rx.recv().await {
                    if let Err(e) = queue.push(&event).await {
                        tracing::warn!(error = %e, "failed to enqueue event for delivery");
                    }
                }
            });
        }

        while !self.stop_flag.load(Ordering::SeqCst) {
            *self.state.write() = ConnectionState::Connecting;
            match self.connect_and_serve().await {
                Ok(()) => {
                    // connection closed cleanly (e.g. stop() was called mid-session)
                    backoff.reset();
                }
                Err(BridgeError::RegisterRejected(reason)) => {
                    tracing::error!(reason = %reason, "hub rejected registration; will not retry");
                    *self.state.write() = ConnectionState::Failed;
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "bridge connection failed");
                    *self.state.write() = ConnectionState::Failed;
                    self.metrics.reconnect_count.fetch_add(1, Ordering::Relaxed);
                }
            }
            if self.stop_flag.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(backoff.next_delay()).await;
        }
        *self.state.write() = ConnectionState::Disconnected;
    }

    /// Open one connection, register, and serve it until it drops or
    /// `stop` is requested.
    async fn connect_and_serve(&self) -> Result<()> {
        let url = self.config.device_url();
        let (ws_stream, _response) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|e| BridgeError::Transport(e.to_string()))?;
        *self.state.write() = ConnectionState::Connected;
        let (mut sink, mut stream) = ws_stream.split();

        let register = BridgeEnvelope::new(FrameType::RegisterDevice(RegisterDevicePayload {
            device: self.device.clone(),
            token: self.config.token.clone(),
            app_session_id: uuid::Uuid::new_v4().to_string(),
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
            plugins: self.plugins.clone(),
        }));
        send_envelope(&mut sink, &register).await?;

        match recv_envelope(&mut stream).await? {
            Some(BridgeEnvelope {
                frame: FrameType::RegisterAck { .. },
                ..
            }) => {
                *self.state.write() = ConnectionState::Registered;
            }
            Some(BridgeEnvelope {
                frame: FrameType::RegisterReject { reason },
                ..
            }) => {
                return Err(BridgeError::RegisterRejected(
                    reason.unwrap_or_else(|| "no reason given".to_string()),
                ));
            }
            Some(_) => {
                return Err(BridgeError::Transport(
                    "unexpected frame before registration ack".to_string(),
                ));
            }
            None => return Err(BridgeError::Transport("socket closed during registration".to_string())),
        }

        let mut flush_timer = tokio::time::interval(self.config.flush_interval);
        flush_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut pending_batches: HashMap<String, Vec<i64>> = HashMap::new();
        let mut timed_out_ids: HashSet<String> = HashSet::new();

        let (internal_tx, mut internal_rx) = mpsc::unbounded_channel::<Internal>();
        let mut priority_rx = self.priority_rx.lock().await;

        loop {
            if self.stop_flag.load(Ordering::SeqCst) {
                return Ok(());
            }
            tokio::select! {
                envelope = priority_rx.recv() => {
                    if let Some(envelope) = envelope {
                        send_envelope(&mut sink, &envelope).await?;
                    }
                }
                _ = flush_timer.tick() => {
                    if let Err(e) = self.flush_once(&mut sink, &mut pending_batches).await {
                        tracing::warn!(error = %e, "flush failed");
                        return Err(e);
                    }
                }
                internal = internal_rx.recv() => {
                    if let Some(Internal::CommandTimedOut(id)) = internal {
                        timed_out_ids.insert(id);
                    }
                }
                frame = recv_envelope(&mut stream) => {
                    match frame? {
                        Some(envelope) => {
                            self.handle_inbound(
                                envelope,
                                &mut sink,
                                &mut pending_batches,
                                &mut timed_out_ids,
                                internal_tx.clone(),
                            )
                            .await?;
                        }
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    async fn flush_once(
        &self,
        sink: &mut (impl Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin),
        pending_batches: &mut HashMap<String, Vec<i64>>,
    ) -> Result<()> {
        let batch = self.queue.pop_batch(self.config.flush_batch_size).await?;
        if batch.is_empty() {
            return Ok(());
        }
        let batch_id = uuid::Uuid::new_v4().to_string();
        let ids: Vec<i64> = batch.iter().map(|q| q.id).collect();
        let events = batch.into_iter().map(|q| q.event).collect();
        pending_batches.insert(batch_id.clone(), ids);

        let envelope = BridgeEnvelope::new(FrameType::EventsBatch(EventsBatchPayload {
            batch_id,
            events,
        }));
        send_envelope(sink, &envelope).await
    }

    async fn handle_inbound(
        &self,
        envelope: BridgeEnvelope,
        sink: &mut (impl Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin),
        pending_batches: &mut HashMap<String, Vec<i64>>,
        timed_out_ids: &mut HashSet<String>,
        internal_tx: mpsc::UnboundedSender<Internal>,
    ) -> Result<()> {
        match envelope.frame {
            FrameType::EventsAck { batch_id } => {
                if let Some(ids) = pending_batches.remove(&batch_id) {
                    self.queue.ack(&ids).await?;
                }
                Ok(())
            }
            FrameType::PluginCommand(command) => {
                self.dispatch_command(command, sink, timed_out_ids, internal_tx)
                    .await
            }
            FrameType::ResumeBreakpoint(payload) => {
                self.dispatch_resume_breakpoint(payload, sink, timed_out_ids, internal_tx)
                    .await
            }
            other => {
                tracing::debug!(frame = ?other, "ignoring unexpected frame from hub");
                Ok(())
            }
        }
    }

    async fn dispatch_command(
        &self,
        command: PluginCommand,
        sink: &mut (impl Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin),
        timed_out_ids: &mut HashSet<String>,
        internal_tx: mpsc::UnboundedSender<Internal>,
    ) -> Result<()> {
        let command_id = command.command_id.clone();
        let kernel = self.kernel.clone();
        let deadline = self.config.command_deadline;
        let response = tokio::time::timeout(deadline, kernel.route_command(command)).await;

        match response {
            Ok(response) => {
                if timed_out_ids.remove(&command_id) {
                    // the deadline already fired and the caller moved on; drop this late reply
                    tracing::debug!(command_id, "dropping response for a command that already timed out");
                    return Ok(());
                }
                let envelope = BridgeEnvelope::new(FrameType::PluginCommandResponse(response));
                send_envelope(sink, &envelope).await
            }
            Err(_elapsed) => {
                let _ = internal_tx.send(Internal::CommandTimedOut(command_id.clone()));
                tracing::warn!(command_id, "command dispatch exceeded deadline");
                Ok(())
            }
        }
    }

    async fn dispatch_resume_breakpoint(
        &self,
        payload: ResumeBreakpointPayload,
        sink: &mut (impl Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin),
        timed_out_ids: &mut HashSet<String>,
        internal_tx: mpsc::UnboundedSender<Internal>,
    ) -> Result<()> {
        let synthetic = PluginCommand {
            plugin_id: self.config.breakpoint_plugin_id.clone(),
            command_id: format!("resume-{}", payload.request_id),
            command_type: "resume_breakpoint".to_string(),
            payload: serde_json::to_value(&payload).ok(),
        };
        self.dispatch_command(synthetic, sink, timed_out_ids, internal_tx)
            .await
    }
}

/// Build the `PluginStateChanged` frame sent via
/// [`BridgeClient::priority_sender`] whenever a plugin's lifecycle
/// state changes.
pub fn plugin_state_changed_frame(plugin_id: String, state: String) -> BridgeEnvelope {
    BridgeEnvelope::new(FrameType::PluginStateChanged(PluginStateChangedPayload {
        plugin_id,
        state,
    }))
}

/// Build the `BreakpointHit` frame sent via
/// [`BridgeClient::priority_sender`] whenever a request or response is
/// suspended at a breakpoint.
pub fn breakpoint_hit_frame(request_id: String, snapshot: serde_json::Value) -> BridgeEnvelope {
    BridgeEnvelope::new(FrameType::BreakpointHit(BreakpointHitPayload {
        request_id,
        snapshot,
    }))
}

async fn send_envelope(
    sink: &mut (impl Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin),
    envelope: &BridgeEnvelope,
) -> Result<()> {
    let text = serde_json::to_string(envelope)?;
    sink.send(Message::Text(text.into()))
        .await
        .map_err(|e| BridgeError::Transport(e.to_string()))
}

async fn recv_envelope(
    stream: &mut (impl Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin),
) -> Result<Option<BridgeEnvelope>> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                let envelope: BridgeEnvelope = serde_json::from_str(&text)?;
                return Ok(Some(envelope));
            }
            Some(Ok(Message::Close(_))) | None => return Ok(None),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(BridgeError::Transport(e.to_string())),
        }
    }
}
