//! # Stockroom - Inventory Catalog Server
//!
//! The main binary for the Stockroom inventory catalog.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for catalog operations
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │             apps/stockroom (THE BINARY)          │
//! │                                                  │
//! │   ┌─────────────┐        ┌─────────────┐        │
//! │   │   CLI       │        │   HTTP API  │        │
//! │   │  (clap)     │        │   (axum)    │        │
//! │   └──────┬──────┘        └──────┬──────┘        │
//! │          │                      │               │
//! │          └──────────┬───────────┘               │
//! │                     ▼                           │
//! │           ┌──────────────────┐                  │
//! │           │  stockroom-core  │                  │
//! │           │   (THE LOGIC)    │                  │
//! │           └──────────────────┘                  │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! stockroom server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! stockroom status
//! stockroom create-main --name Guitars --description "All guitars"
//! stockroom delete 3 --confirmed
//! ```

use clap::Parser;
use stockroom::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing — STOCKROOM_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("STOCKROOM_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "stockroom=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Stockroom startup banner.
fn print_banner() {
    println!(
        r#"
  ███████╗████████╗ ██████╗  ██████╗██╗  ██╗██████╗  ██████╗  ██████╗ ███╗   ███╗
  ██╔════╝╚══██╔══╝██╔═══██╗██╔════╝██║ ██╔╝██╔══██╗██╔═══██╗██╔═══██╗████╗ ████║
  ███████╗   ██║   ██║   ██║██║     █████╔╝ ██████╔╝██║   ██║██║   ██║██╔████╔██║
  ╚════██║   ██║   ██║   ██║██║     ██╔═██╗ ██╔══██╗██║   ██║██║   ██║██║╚██╔╝██║
  ███████║   ██║   ╚██████╔╝╚██████╗██║  ██╗██║  ██║╚██████╔╝╚██████╔╝██║ ╚═╝ ██║
  ╚══════╝   ╚═╝    ╚═════╝  ╚═════╝╚═╝  ╚═╝╚═╝  ╚═╝ ╚═════╝  ╚═════╝ ╚═╝     ╚═╝

  Inventory Catalog Server v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
