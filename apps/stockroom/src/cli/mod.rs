//! # Stockroom CLI Module
//!
//! This module implements the CLI interface for Stockroom.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show catalog totals
//! - `categories` - List main categories with instrument counts
//! - `create-main` / `create-sub` - Create categories
//! - `attach` / `detach` - Manage parent/child links
//! - `promote` / `demote` - Re-type a category
//! - `delete` - Delete a category (cascade requires `--confirmed`)
//! - `count` - Instrument count under a category
//! - `add-instrument` / `instruments` - Manage inventory

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stockroom_core::CatalogError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Stockroom - Inventory Catalog Server
///
/// A two-level category taxonomy over a musical-instrument inventory,
/// with consistency-preserving category operations and cascade-delete
/// analysis.
#[derive(Parser, Debug)]
#[command(name = "stockroom")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the catalog database
    #[arg(short = 'D', long, global = true, default_value = "stockroom.redb")]
    pub database: PathBuf,

    /// Storage backend: "redb" (ACID database) or "memory" (ephemeral)
    #[arg(short = 'B', long, global = true, default_value = "redb")]
    pub backend: String,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Show catalog totals
    Status,

    /// List main categories with their instrument counts
    Categories,

    /// Create a main category
    CreateMain {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Description
        #[arg(short, long)]
        description: String,

        /// Sub-category ids to attach (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        children: Vec<u64>,
    },

    /// Create a sub-category
    CreateSub {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Description
        #[arg(short, long)]
        description: String,

        /// Main category ids to attach under (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        parents: Vec<u64>,
    },

    /// Attach a sub-category to a main category
    Attach {
        /// Main category id
        parent: u64,

        /// Sub-category id
        child: u64,
    },

    /// Detach a sub-category from a main category
    Detach {
        /// Main category id
        parent: u64,

        /// Sub-category id
        child: u64,
    },

    /// Promote a sub-category to a main category
    Promote {
        /// Category id
        id: u64,

        /// Initial child set (comma-separated sub-category ids)
        #[arg(short, long, value_delimiter = ',')]
        children: Vec<u64>,
    },

    /// Demote a main category to a sub-category (its child set is discarded)
    Demote {
        /// Category id
        id: u64,

        /// New parent set (comma-separated main category ids)
        #[arg(short, long, value_delimiter = ',')]
        parents: Vec<u64>,
    },

    /// Delete a category; a cascade prints its plan and requires --confirmed
    Delete {
        /// Category id
        id: u64,

        /// Confirm cascade deletion of dependent sub-categories
        #[arg(long)]
        confirmed: bool,
    },

    /// Show the instrument count under a category
    Count {
        /// Category id (main or sub)
        id: u64,
    },

    /// Add an instrument to the inventory
    AddInstrument {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Brand
        #[arg(short, long)]
        brand: Option<String>,

        /// Description
        #[arg(short, long)]
        description: String,

        /// Price in integer cents
        #[arg(long)]
        price_cents: u64,

        /// Units in stock
        #[arg(long, default_value = "0")]
        stock: u64,

        /// Main category id
        #[arg(short, long)]
        category: u64,

        /// Sub-category id
        #[arg(short, long)]
        sub_category: Option<u64>,

        /// Path to an image file to attach
        #[arg(long)]
        image: Option<PathBuf>,

        /// MIME type for the image (required when --image is given)
        #[arg(long)]
        mime_type: Option<String>,
    },

    /// List instruments, optionally filtered by category
    Instruments {
        /// Restrict to a category id (main or sub)
        #[arg(short, long)]
        category: Option<u64>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), CatalogError> {
    let backend = cli.backend.as_str();
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => {
            cmd_server(&cli.database, backend, &host, port).await
        }
        Some(Commands::Status) => cmd_status(&cli.database, backend, json_mode),
        Some(Commands::Categories) => cmd_categories(&cli.database, backend, json_mode),
        Some(Commands::CreateMain {
            name,
            description,
            children,
        }) => cmd_create_main(&cli.database, backend, json_mode, &name, &description, &children),
        Some(Commands::CreateSub {
            name,
            description,
            parents,
        }) => cmd_create_sub(&cli.database, backend, json_mode, &name, &description, &parents),
        Some(Commands::Attach { parent, child }) => {
            cmd_attach(&cli.database, backend, json_mode, parent, child)
        }
        Some(Commands::Detach { parent, child }) => {
            cmd_detach(&cli.database, backend, json_mode, parent, child)
        }
        Some(Commands::Promote { id, children }) => {
            cmd_promote(&cli.database, backend, json_mode, id, &children)
        }
        Some(Commands::Demote { id, parents }) => {
            cmd_demote(&cli.database, backend, json_mode, id, &parents)
        }
        Some(Commands::Delete { id, confirmed }) => {
            cmd_delete(&cli.database, backend, json_mode, id, confirmed)
        }
        Some(Commands::Count { id }) => cmd_count(&cli.database, backend, json_mode, id),
        Some(Commands::AddInstrument {
            name,
            brand,
            description,
            price_cents,
            stock,
            category,
            sub_category,
            image,
            mime_type,
        }) => cmd_add_instrument(
            &cli.database,
            backend,
            json_mode,
            NewInstrumentArgs {
                name,
                brand,
                description,
                price_cents,
                stock,
                category,
                sub_category,
                image,
                mime_type,
            },
        ),
        Some(Commands::Instruments { category }) => {
            cmd_instruments(&cli.database, backend, json_mode, category)
        }
        None => {
            // No subcommand - show status by default
            cmd_status(&cli.database, backend, json_mode)
        }
    }
}
