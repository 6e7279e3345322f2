//! Subscribe to live updates from the gateway.
//!
//! Demonstrates:
//! - Creating a Websocket with host and token
//! - Registering synchronous and asynchronous subscribers
//! - Closing the channel from another task (Ctrl+C)
//!
//! Usage:
//!   WISER_HOST=192.168.1.50 WISER_TOKEN=... cargo run --example 001_live_updates
//!   WISER_HOST=192.168.1.50 WISER_TOKEN=... cargo run --example 001_live_updates -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use common::Args;
use wiser_gateway::{Result, Websocket};

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

async fn run(args: Args) -> Result<()> {
    println!("=== 001: Live Updates ===\n");

    // ========================================================================
    // Create Channel
    // ========================================================================

    println!("[1] Creating channel...");
    println!("    Host: {}", args.host);

    let ws = Websocket::new(args.host, args.token);

    // ========================================================================
    // Subscribe
    // ========================================================================

    println!("[2] Registering subscribers...");

    ws.subscribe(|message| {
        println!("    [sync ] {message}");
    });

    ws.async_subscribe(|message| {
        Box::pin(async move {
            println!("    [async] {message}");
        })
    });

    println!("    ✓ Subscribers registered\n");

    // ========================================================================
    // Connect
    // ========================================================================

    let handle = ws.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        println!("\n[Ctrl+C] Closing channel...");
        handle.close();
    });

    println!("[3] Connecting (Ctrl+C to exit)...\n");

    ws.connect().await?;

    println!("\n=== Channel closed cleanly ===");

    Ok(())
}
