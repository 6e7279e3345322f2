//! WebSocket connection and inbound read loop.
//!
//! This module owns the connection to the gateway's live-update endpoint:
//! handshake, frame decoding, liveness signalling, and subscriber fan-out.
//!
//! # Read Loop
//!
//! [`Websocket::connect`] runs a loop on the caller's task that handles:
//!
//! - Incoming text frames from the gateway (decoded and dispatched)
//! - Close requests issued through [`Websocket::close`]
//! - Clean closure and transport failure
//!
//! # Dispatch Order
//!
//! For every decoded frame, all synchronous subscribers are invoked first,
//! then all asynchronous subscribers are awaited, each group in
//! registration order. The loop does not read the next frame until every
//! subscriber has completed; a slow subscriber therefore delays subsequent
//! frames (backpressure by design of the dispatch contract).

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{FutureExt, SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::Notify;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::watchdog::Watchdog;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for the WebSocket handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Path of the gateway's live-update endpoint.
const API_PATH: &str = "/api";

// ============================================================================
// Types
// ============================================================================

/// Synchronous subscriber callback type.
///
/// Called with a shared reference to each decoded message; must not block
/// for long, since dispatch is sequential.
pub type Subscriber = Box<dyn Fn(&Value) + Send + Sync>;

/// Asynchronous subscriber callback type.
///
/// Receives the decoded message behind an [`Arc`] so the returned future
/// can outlive the dispatch borrow. The message is shared: treat it as
/// read-only.
pub type AsyncSubscriber = Box<dyn Fn(Arc<Value>) -> BoxFuture<'static, ()> + Send + Sync>;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of the live-update channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection; the initial and terminal state.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Read loop running; frames are dispatched.
    Connected,
    /// Teardown requested; no further dispatch.
    Closing,
}

// ============================================================================
// Websocket
// ============================================================================

/// Connection manager for the gateway's live-update channel.
///
/// Owns the connection lifecycle, decodes inbound frames, renews the
/// liveness watchdog on every frame, and fans decoded messages out to the
/// registered subscribers.
///
/// # Thread Safety
///
/// `Websocket` is a cheaply clonable handle over shared state; clones see
/// the same subscribers, watchdog, and connection state. This allows
/// `close()` to be issued from another task while `connect()` is suspended
/// in the read loop.
pub struct Websocket {
    /// Gateway host, e.g. `"192.168.1.50"` or `"wiser.local:8080"`.
    host: String,
    /// Bearer token for the handshake. Acquisition is the caller's job.
    token: String,
    /// Lifecycle state (shared with clones).
    state: Arc<Mutex<ConnectionState>>,
    /// Synchronous subscribers, in registration order.
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
    /// Asynchronous subscribers, in registration order.
    async_subscribers: Arc<RwLock<Vec<AsyncSubscriber>>>,
    /// Installed liveness watchdog, if any.
    watchdog: Arc<Mutex<Option<Watchdog>>>,
    /// Close signal for the read loop.
    shutdown: Arc<Notify>,
}

impl Clone for Websocket {
    fn clone(&self) -> Self {
        Self {
            host: self.host.clone(),
            token: self.token.clone(),
            state: Arc::clone(&self.state),
            subscribers: Arc::clone(&self.subscribers),
            async_subscribers: Arc::clone(&self.async_subscribers),
            watchdog: Arc::clone(&self.watchdog),
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}

impl Websocket {
    /// Creates a new connection manager for the given gateway.
    ///
    /// No validation or IO happens here; the endpoint URL and auth header
    /// are built when [`connect`](Self::connect) is called.
    ///
    /// # Arguments
    ///
    /// * `host` - Gateway host (with optional port)
    /// * `token` - Valid API token
    #[must_use]
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            token: token.into(),
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            subscribers: Arc::new(RwLock::new(Vec::new())),
            async_subscribers: Arc::new(RwLock::new(Vec::new())),
            watchdog: Arc::new(Mutex::new(None)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Returns the gateway host.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Installs the liveness watchdog.
    ///
    /// The watchdog is re-armed on every decoded frame and cancelled on
    /// error or close. A previously installed watchdog is replaced and
    /// cancelled. Expected to be called once, before
    /// [`connect`](Self::connect).
    pub fn set_watchdog(&self, watchdog: Watchdog) {
        *self.watchdog.lock() = Some(watchdog);
    }

    /// Registers a synchronous subscriber.
    ///
    /// Invoked for every decoded message, in registration order, before
    /// any asynchronous subscriber runs. Duplicate registrations are not
    /// deduplicated.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribers.write().push(Box::new(callback));
    }

    /// Registers an asynchronous subscriber.
    ///
    /// Awaited for every decoded message, in registration order, after all
    /// synchronous subscribers have run. Duplicate registrations are not
    /// deduplicated.
    pub fn async_subscribe<F>(&self, callback: F)
    where
        F: Fn(Arc<Value>) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.async_subscribers.write().push(Box::new(callback));
    }

    /// Connects to the gateway and runs the read loop.
    ///
    /// Suspends until the gateway closes the channel, [`close`](Self::close)
    /// is called, or a transport error occurs. Returns `Ok(())` only on
    /// clean closure; transport failures surface as errors after the
    /// watchdog has been cancelled, so the caller (or the watchdog's
    /// recovery action) can apply its own reconnect policy.
    ///
    /// Malformed frames are logged and skipped; they never terminate the
    /// loop. Binary, ping and pong frames carry no live updates and are
    /// ignored.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if host or token cannot form a request
    /// - [`Error::Connection`] if another connect is already active, or
    ///   the handshake fails
    /// - [`Error::ConnectionTimeout`] if the handshake exceeds 10s
    /// - [`Error::WebSocket`] if the established connection fails
    pub async fn connect(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != ConnectionState::Disconnected {
                return Err(Error::connection(format!(
                    "connection already active (state: {:?})",
                    *state
                )));
            }
            *state = ConnectionState::Connecting;
        }

        // Drop any close request left over from a previous session
        let _ = self.shutdown.notified().now_or_never();

        let request = match self.handshake_request() {
            Ok(request) => request,
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        info!(host = %self.host, "Connecting to gateway");

        let connect_result = timeout(CONNECT_TIMEOUT, connect_async(request)).await;

        let (stream, _) = match connect_result {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(Error::connection(format!("WebSocket handshake failed: {e}")));
            }
            Err(_) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(Error::connection_timeout(CONNECT_TIMEOUT.as_millis() as u64));
            }
        };

        let (mut ws_write, mut ws_read) = stream.split();

        // close() may have been requested while the handshake was in flight
        if self.state() == ConnectionState::Closing {
            debug!("Close requested during handshake, shutting down");
            let _ = ws_write.close().await;
            self.set_state(ConnectionState::Disconnected);
            return Ok(());
        }

        self.set_state(ConnectionState::Connected);
        info!(host = %self.host, "Live-update channel established");

        loop {
            tokio::select! {
                // Explicit teardown via close()
                _ = self.shutdown.notified() => {
                    debug!("Close requested, shutting down read loop");
                    let _ = ws_write.close().await;
                    break;
                }

                // Inbound frames from the gateway
                frame = ws_read.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            if self.state() != ConnectionState::Connected {
                                // Frame lost the race against close(); drop it
                                trace!("Discarding frame received during teardown");
                                continue;
                            }

                            if let Err(e) = self.on_message(text.as_str()).await {
                                warn!(error = %e, "Dropping malformed frame");
                            }
                        }

                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "WebSocket closed by gateway");
                            break;
                        }

                        Some(Err(e)) => {
                            return self.on_error(Error::WebSocket(e));
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Binary, Ping, Pong carry no live updates
                        _ => {}
                    }
                }
            }
        }

        self.cancel_watchdog();
        self.set_state(ConnectionState::Disconnected);
        info!(host = %self.host, "Disconnected");

        Ok(())
    }

    /// Decodes a raw frame and dispatches it.
    ///
    /// Decode → renew the watchdog (the frame is a liveness signal) →
    /// invoke every synchronous subscriber, then await every asynchronous
    /// subscriber with the same decoded object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if `raw` is not valid JSON; no dispatch
    /// happens in that case.
    pub async fn on_message(&self, raw: &str) -> Result<()> {
        let message: Value = serde_json::from_str(raw)?;

        trace!(len = raw.len(), "Frame decoded");

        if let Some(watchdog) = self.watchdog.lock().as_ref() {
            watchdog.trigger();
        }

        // Synchronous subscribers first, in registration order
        {
            let subscribers = self.subscribers.read();
            for subscriber in subscribers.iter() {
                subscriber(&message);
            }
        }

        // Asynchronous subscribers second, awaited one at a time. The
        // futures are collected under the read lock but stay lazy; no
        // guard is held across an await.
        let message = Arc::new(message);
        let futures: Vec<_> = {
            let subscribers = self.async_subscribers.read();
            subscribers
                .iter()
                .map(|subscriber| subscriber(Arc::clone(&message)))
                .collect()
        };

        for future in futures {
            future.await;
        }

        Ok(())
    }

    /// Handles a fatal connection error.
    ///
    /// Cancels the watchdog (no further liveness is expected), transitions
    /// to Disconnected, and hands the error back for propagation. Always
    /// returns `Err`.
    pub fn on_error(&self, error: Error) -> Result<()> {
        self.cancel_watchdog();
        self.set_state(ConnectionState::Disconnected);

        error!(error = %error, "Connection failed");

        Err(error)
    }

    /// Requests teardown of the connection.
    ///
    /// Cancels the watchdog and signals the read loop to close the socket
    /// and transition to Disconnected. Idempotent: calling on an already
    /// closed connection is a no-op.
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            match *state {
                ConnectionState::Disconnected | ConnectionState::Closing => return,
                ConnectionState::Connecting | ConnectionState::Connected => {
                    *state = ConnectionState::Closing;
                }
            }
        }

        self.cancel_watchdog();
        self.shutdown.notify_one();

        debug!("Close requested");
    }

    /// Builds the handshake request with the bearer token.
    fn handshake_request(&self) -> Result<Request> {
        let url = Url::parse(&format!("ws://{}{}", self.host, API_PATH))
            .map_err(|e| Error::config(format!("invalid gateway host {:?}: {e}", self.host)))?;

        let mut request = url.as_str().into_client_request()?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| Error::config("token contains characters invalid in a header"))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        Ok(request)
    }

    /// Cancels the installed watchdog, if any.
    fn cancel_watchdog(&self) {
        if let Some(watchdog) = self.watchdog.lock().as_ref() {
            watchdog.cancel();
        }
    }

    /// Records a state transition.
    fn set_state(&self, next: ConnectionState) {
        let mut state = self.state.lock();
        if *state != next {
            trace!(from = ?*state, to = ?next, "Connection state changed");
            *state = next;
        }
    }
}

impl std::fmt::Debug for Websocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Websocket")
            .field("host", &self.host)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::sleep;

    fn counting_watchdog(timeout: Duration) -> (Watchdog, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_for_action = Arc::clone(&calls);

        let watchdog = Watchdog::new(
            move || {
                let calls = Arc::clone(&calls_for_action);
                Box::pin(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            },
            timeout,
        )
        .expect("positive timeout");

        (watchdog, calls)
    }

    #[test]
    fn test_new_starts_disconnected() {
        let ws = Websocket::new("host", "token");

        assert_eq!(ws.state(), ConnectionState::Disconnected);
        assert_eq!(ws.host(), "host");
    }

    #[test]
    fn test_close_is_idempotent_when_disconnected() {
        let ws = Websocket::new("host", "token");

        ws.close();
        ws.close();

        assert_eq!(ws.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_handshake_request_carries_bearer_token() {
        let ws = Websocket::new("192.168.1.50", "abc123");

        let request = ws.handshake_request().expect("valid host and token");

        assert_eq!(request.uri().to_string(), "ws://192.168.1.50/api");
        let auth = request
            .headers()
            .get(AUTHORIZATION)
            .expect("authorization header");
        assert_eq!(auth.to_str().expect("ascii header"), "Bearer abc123");
    }

    #[test]
    fn test_handshake_request_rejects_invalid_host() {
        let ws = Websocket::new("not a host", "token");

        let err = ws.handshake_request().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn test_on_message_dispatches_to_subscribers() {
        let ws = Websocket::new("host", "token");

        let sync_received = Arc::new(Mutex::new(Vec::new()));
        let async_received = Arc::new(Mutex::new(Vec::new()));

        let sync_clone = Arc::clone(&sync_received);
        ws.subscribe(move |message| {
            sync_clone.lock().push(message.clone());
        });

        let async_clone = Arc::clone(&async_received);
        ws.async_subscribe(move |message| {
            let received = Arc::clone(&async_clone);
            Box::pin(async move {
                received.lock().push((*message).clone());
            })
        });

        ws.on_message(r#"{"status": "ok"}"#)
            .await
            .expect("valid frame");

        assert_eq!(*sync_received.lock(), vec![json!({"status": "ok"})]);
        assert_eq!(*async_received.lock(), vec![json!({"status": "ok"})]);
    }

    #[tokio::test]
    async fn test_on_message_rejects_malformed_frame() {
        let ws = Websocket::new("host", "token");

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        ws.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        let err = ws.on_message("not json").await.unwrap_err();

        assert!(err.is_decode());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dispatch_order_sync_before_async() {
        let ws = Websocket::new("host", "token");

        let order = Arc::new(Mutex::new(Vec::new()));

        let order_async = Arc::clone(&order);
        ws.async_subscribe(move |_| {
            let order = Arc::clone(&order_async);
            Box::pin(async move {
                order.lock().push("async_1");
            })
        });

        let order_sync_1 = Arc::clone(&order);
        ws.subscribe(move |_| {
            order_sync_1.lock().push("sync_1");
        });

        let order_sync_2 = Arc::clone(&order);
        ws.subscribe(move |_| {
            order_sync_2.lock().push("sync_2");
        });

        ws.on_message(r#"{"status": "ok"}"#)
            .await
            .expect("valid frame");

        // Sync group first despite the async subscriber registering first;
        // registration order within each group
        assert_eq!(*order.lock(), vec!["sync_1", "sync_2", "async_1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_message_renews_watchdog() {
        let ws = Websocket::new("host", "token");
        let (watchdog, calls) = counting_watchdog(Duration::from_millis(100));
        ws.set_watchdog(watchdog);

        // No frame yet: the watchdog stays idle
        sleep(Duration::from_millis(200)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        ws.on_message(r#"{"status": "ok"}"#)
            .await
            .expect("valid frame");

        sleep(Duration::from_millis(200)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_error_cancels_watchdog_before_propagating() {
        let ws = Websocket::new("host", "token");
        let (watchdog, calls) = counting_watchdog(Duration::from_millis(100));
        ws.set_watchdog(watchdog);

        ws.on_message(r#"{"status": "ok"}"#)
            .await
            .expect("valid frame");

        let result = ws.on_error(Error::connection("transport failure"));
        assert!(result.is_err());

        sleep(Duration::from_millis(300)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(ws.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_clones_share_subscribers() {
        let ws = Websocket::new("host", "token");
        let handle = ws.clone();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        handle.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        ws.on_message(r#"{"status": "ok"}"#)
            .await
            .expect("valid frame");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
