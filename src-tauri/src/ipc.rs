//! Request/response plumbing between the display context and the host.
//!
//! Handlers are registered by request name in a [`HandlerRegistry`]. The
//! registry is owned by an [`IpcHost`] task that consumes envelopes from a
//! bounded channel; callers talk to it through a cloneable [`IpcClient`].
//! Each request gets exactly one reply over a oneshot channel.
//!
//! # Example
//!
//! ```ignore
//! let mut registry = HandlerRegistry::new();
//! register_ping_handler(&mut registry)?;
//!
//! let (client, host) = ipc::channel(registry);
//! tokio::spawn(host.serve());
//!
//! let response: PingResponse = client.invoke_typed(PING_CHANNEL, Value::Null).await?;
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Request name answered by the ping handler.
pub const PING_CHANNEL: &str = "ping";

/// Number of in-flight requests the host queue holds before senders wait.
const QUEUE_DEPTH: usize = 32;

/// Errors that can occur while registering or dispatching requests.
#[derive(Error, Debug)]
pub enum IpcError {
    /// No handler is registered for the requested name.
    #[error("no handler registered for '{0}'")]
    NoHandler(String),

    /// A handler is already registered under this name.
    #[error("handler for '{0}' is already registered")]
    HandlerExists(String),

    /// The host side of the channel has gone away.
    #[error("host endpoint disconnected")]
    Disconnected,

    /// Payload or response could not be converted to/from JSON.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for IPC operations.
pub type Result<T> = std::result::Result<T, IpcError>;

/// Fixed record returned by the ping handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    /// Name of the demonstrated mechanism.
    pub name: String,
    /// Kind of the mechanism.
    #[serde(rename = "type")]
    pub kind: String,
}

impl PingResponse {
    /// The constant answer to every ping.
    pub fn constant() -> Self {
        Self {
            name: "ipcCommunication".to_string(),
            kind: "ipc".to_string(),
        }
    }

    /// Both fields joined without a separator, as shown on the page.
    pub fn joined(&self) -> String {
        format!("{}{}", self.name, self.kind)
    }
}

type Handler = Box<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// Handlers keyed by request name, at most one per name.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`.
    ///
    /// The handler's return value is serialized to JSON on every call.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::HandlerExists`] if `name` already has a handler.
    pub fn register<F, T>(&mut self, name: &str, handler: F) -> Result<()>
    where
        F: Fn(Value) -> T + Send + Sync + 'static,
        T: Serialize,
    {
        if self.handlers.contains_key(name) {
            return Err(IpcError::HandlerExists(name.to_string()));
        }

        let boxed: Handler = Box::new(move |payload: Value| {
            serde_json::to_value(handler(payload)).map_err(IpcError::from)
        });
        self.handlers.insert(name.to_string(), boxed);
        log::debug!("Registered IPC handler '{}'", name);
        Ok(())
    }

    /// Returns true if a handler exists for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Runs the handler registered for `name` with `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::NoHandler`] for an unregistered name, or
    /// [`IpcError::Json`] if the handler output cannot be serialized.
    pub fn dispatch(&self, name: &str, payload: Value) -> Result<Value> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| IpcError::NoHandler(name.to_string()))?;
        handler(payload)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &names)
            .finish()
    }
}

/// Registers the `"ping"` handler, which ignores its input.
///
/// # Errors
///
/// Returns [`IpcError::HandlerExists`] if ping is already registered.
pub fn register_ping_handler(registry: &mut HandlerRegistry) -> Result<()> {
    registry.register(PING_CHANNEL, |_payload| PingResponse::constant())
}

/// A single request travelling to the host.
struct Envelope {
    channel: String,
    payload: Value,
    reply: oneshot::Sender<Result<Value>>,
}

/// Creates a connected client/host pair around `registry`.
pub fn channel(registry: HandlerRegistry) -> (IpcClient, IpcHost) {
    let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
    (IpcClient { tx }, IpcHost { registry, rx })
}

/// Host side of the channel: owns the registry and answers requests.
pub struct IpcHost {
    registry: HandlerRegistry,
    rx: mpsc::Receiver<Envelope>,
}

impl IpcHost {
    /// Answers requests until every [`IpcClient`] has been dropped.
    pub async fn serve(mut self) {
        log::info!("IPC host serving {} handler(s)", self.registry.len());

        while let Some(envelope) = self.rx.recv().await {
            let result = self.registry.dispatch(&envelope.channel, envelope.payload);
            if let Err(e) = &result {
                log::warn!("IPC request '{}' failed: {}", envelope.channel, e);
            }
            // The caller may have stopped waiting
            let _ = envelope.reply.send(result);
        }

        log::info!("IPC host stopped: all clients dropped");
    }
}

/// Cloneable handle for issuing requests to the host.
#[derive(Clone, Debug)]
pub struct IpcClient {
    tx: mpsc::Sender<Envelope>,
}

impl IpcClient {
    /// Sends `payload` to the handler for `channel` and awaits its reply.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Disconnected`] if the host is gone, otherwise
    /// whatever error the host produced for the request.
    pub async fn invoke(&self, channel: &str, payload: Value) -> Result<Value> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Envelope {
                channel: channel.to_string(),
                payload,
                reply,
            })
            .await
            .map_err(|_| IpcError::Disconnected)?;

        response.await.map_err(|_| IpcError::Disconnected)?
    }

    /// Like [`IpcClient::invoke`], decoding the reply into `T`.
    ///
    /// # Errors
    ///
    /// Same as [`IpcClient::invoke`], plus [`IpcError::Json`] if the reply
    /// does not match `T`.
    pub async fn invoke_typed<T: DeserializeOwned>(
        &self,
        channel: &str,
        payload: Value,
    ) -> Result<T> {
        let value = self.invoke(channel, payload).await?;
        Ok(serde_json::from_value(value)?)
    }
}
