//! Live-update channel to the gateway.
//!
//! This module handles the WebSocket connection to the gateway's `/api`
//! endpoint, through which the gateway pushes state changes (loads,
//! sensors, scenes) as JSON text frames.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                          ┌─────────────────┐
//! │  Client (Rust)   │                          │  µGateway       │
//! │                  │        WebSocket         │                 │
//! │  Websocket ──────┼─────────────────────────►│  /api           │
//! │   │ decode       │   Authorization: Bearer  │                 │
//! │   │ dispatch     │                          │  pushes JSON    │
//! │   ▼              │◄─────────────────────────┼  text frames    │
//! │  Watchdog        │                          │                 │
//! └──────────────────┘                          └─────────────────┘
//! ```
//!
//! Every decoded frame renews the [`Watchdog`] (each frame is evidence of
//! liveness) and is then fanned out to the registered subscribers. If the
//! channel goes silent for longer than the watchdog's timeout, the
//! watchdog runs a caller-supplied recovery action, typically a reconnect.
//!
//! # Connection Lifecycle
//!
//! 1. [`Websocket::new`] - Create with host and token
//! 2. [`Websocket::subscribe`] / [`Websocket::async_subscribe`] - Register handlers
//! 3. [`Websocket::set_watchdog`] - Install liveness supervision
//! 4. [`Websocket::connect`] - Handshake, then run the read loop
//! 5. [`Websocket::close`] - Tear down from any task
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Connection lifecycle, read loop, subscriber dispatch |
//! | `watchdog` | Liveness timer and recovery action |

// ============================================================================
// Submodules
// ============================================================================

/// Connection lifecycle, read loop, subscriber dispatch.
pub mod connection;

/// Liveness timer and recovery action.
pub mod watchdog;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{AsyncSubscriber, ConnectionState, Subscriber, Websocket};
pub use watchdog::{RecoveryAction, Watchdog};
