//! Watchdog-supervised reconnection.
//!
//! Demonstrates:
//! - Installing a liveness watchdog on the channel
//! - Recycling a silent connection from the recovery action
//! - An outer reconnect loop driven by the watchdog
//!
//! Usage:
//!   WISER_HOST=192.168.1.50 WISER_TOKEN=... cargo run --example 002_watchdog_recovery

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use common::Args;
use wiser_gateway::{Watchdog, Websocket};

// ============================================================================
// Constants
// ============================================================================

/// Silence tolerated before the connection is recycled.
const LIVENESS_TIMEOUT: Duration = Duration::from_secs(90);

/// Pause between reconnect attempts after a failure.
const RETRY_DELAY: Duration = Duration::from_secs(5);

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    println!("=== 002: Watchdog Recovery ===\n");

    let ws = Websocket::new(args.host, args.token);

    ws.subscribe(|message| {
        println!("    [update] {message}");
    });

    // ========================================================================
    // Install Watchdog
    // ========================================================================

    println!("[1] Installing watchdog ({LIVENESS_TIMEOUT:?} of silence tolerated)...");

    // The recovery action only recycles the connection; the outer loop
    // below does the actual reconnecting.
    let handle = ws.clone();
    ws.set_watchdog(Watchdog::new(
        move || {
            let ws = handle.clone();
            Box::pin(async move {
                println!("    [watchdog] Channel silent, recycling connection");
                ws.close();
                Ok(())
            })
        },
        LIVENESS_TIMEOUT,
    )?);

    println!("    ✓ Watchdog installed\n");

    // ========================================================================
    // Supervised Connect Loop
    // ========================================================================

    let shutdown = Arc::new(AtomicBool::new(false));

    let shutdown_flag = Arc::clone(&shutdown);
    let closer = ws.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        println!("\n[Ctrl+C] Shutting down...");
        shutdown_flag.store(true, Ordering::SeqCst);
        closer.close();
    });

    println!("[2] Connecting (Ctrl+C to exit)...\n");

    loop {
        match ws.connect().await {
            Ok(()) => {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                println!("    Connection recycled, reconnecting...");
            }
            Err(e) => {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                eprintln!("    Connection failed: {e}, retrying in {RETRY_DELAY:?}");
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }

    println!("\n=== Done ===");

    Ok(())
}
