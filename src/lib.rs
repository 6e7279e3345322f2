//! Async client for the Wiser by Feller µGateway live-update channel.
//!
//! The gateway exposes device loads, sensors and scenes over a local HTTP
//! API and pushes state changes over a WebSocket. This crate implements
//! the live-update channel: connection lifecycle, frame decoding,
//! subscriber fan-out, and watchdog-based liveness supervision.
//!
//! # Architecture
//!
//! Two collaborating components:
//!
//! - [`Websocket`] owns the connection lifecycle, receives inbound frames,
//!   decodes them as JSON objects, and fans them out to subscribers.
//! - [`Watchdog`] is an independently armed/disarmed timer that runs a
//!   recovery action when no frame arrives within a configured interval.
//!
//! Every decoded frame renews the watchdog; watchdog expiry runs the
//! caller-supplied recovery action (typically: tear down and reconnect).
//! REST resource access and token acquisition are the surrounding client's
//! job — this crate assumes a valid token is handed to it.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use wiser_gateway::{Result, Watchdog, Websocket};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let ws = Websocket::new("192.168.1.50", "api-token");
//!
//!     // Synchronous subscribers see every decoded frame
//!     ws.subscribe(|message| {
//!         println!("update: {message}");
//!     });
//!
//!     // Reconnect when the channel goes silent
//!     let handle = ws.clone();
//!     ws.set_watchdog(Watchdog::new(
//!         move || {
//!             let ws = handle.clone();
//!             Box::pin(async move {
//!                 ws.close();
//!                 ws.connect().await
//!             })
//!         },
//!         Duration::from_secs(90),
//!     )?);
//!
//!     // Suspends until closure or transport failure
//!     ws.connect().await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types and [`Result`] alias |
//! | [`websocket`] | Live-update channel: [`Websocket`], [`Watchdog`] |
//!
//! # Dispatch Guarantees
//!
//! For every decoded frame, all synchronous subscribers are invoked first
//! and all asynchronous subscribers are awaited second, each group in
//! registration order. The next frame is not read until every subscriber
//! has completed.

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Live-update channel.
///
/// Connection management, subscriber dispatch, and liveness supervision.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Channel types
pub use websocket::{
    AsyncSubscriber, ConnectionState, RecoveryAction, Subscriber, Watchdog, Websocket,
};
