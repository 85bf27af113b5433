//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api;
use std::path::PathBuf;
use stockroom_core::{
    Catalog, CatalogError, CategoryId, DeleteOutcome, Image, NewInstrument,
    limits::MAX_IMAGE_BYTES,
};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open a catalog for the selected backend.
///
/// The memory backend is ephemeral: mutations are lost when the process
/// exits. It exists for experimentation and tests.
pub fn load_catalog(db_path: &PathBuf, backend: &str) -> Result<Catalog, CatalogError> {
    match backend {
        "memory" => Ok(Catalog::new()),
        "redb" => Catalog::with_redb(db_path),
        other => Err(CatalogError::Storage(format!(
            "Unknown backend: {}. Use: redb, memory",
            other
        ))),
    }
}

/// Validate an image file path before reading.
///
/// Canonicalizes the path (resolving symlinks and "..") and checks that it
/// points at a regular file within the size limit.
fn validate_image_path(path: &std::path::Path) -> Result<PathBuf, CatalogError> {
    let canonical = path.canonicalize().map_err(|e| {
        CatalogError::Storage(format!("Invalid image path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(CatalogError::Storage(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| CatalogError::Storage(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > MAX_IMAGE_BYTES as u64 {
        return Err(CatalogError::FieldTooLarge {
            field: "image",
            len: usize::try_from(metadata.len()).unwrap_or(usize::MAX),
            max: MAX_IMAGE_BYTES,
        });
    }

    Ok(canonical)
}

fn ids(raw: &[u64]) -> Vec<CategoryId> {
    raw.iter().copied().map(CategoryId).collect()
}

fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    db_path: &PathBuf,
    backend: &str,
    host: &str,
    port: u16,
) -> Result<(), CatalogError> {
    let catalog = load_catalog(db_path, backend)?;

    println!("Stockroom Inventory Catalog Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Backend:  {}", backend);
    println!("  Database: {:?}", db_path);
    println!();
    println!("Endpoints:");
    println!("  GET  /status               - Catalog totals");
    println!("  GET  /categories           - Main categories with counts");
    println!("  POST /categories/main      - Create a main category");
    println!("  POST /categories/sub       - Create a sub-category");
    println!("  POST /categories/:id/delete - Delete (two-phase confirm)");
    println!("  GET  /instruments          - List instruments");
    println!("  GET  /health               - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, catalog).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show catalog totals.
pub fn cmd_status(db_path: &PathBuf, backend: &str, json_mode: bool) -> Result<(), CatalogError> {
    let catalog = load_catalog(db_path, backend)?;
    let counts = catalog.counts()?;

    if json_mode {
        print_json(&serde_json::json!({
            "database": db_path.to_string_lossy(),
            "backend": backend,
            "category_count": counts.categories,
            "instrument_count": counts.instruments,
            "persistent": catalog.is_persistent()
        }));
        return Ok(());
    }

    println!("Stockroom Catalog Status");
    println!("========================");
    println!("Database: {:?}", db_path);
    println!("Backend:  {}", backend);
    println!();
    println!("Categories:  {}", counts.categories);
    println!("Instruments: {}", counts.instruments);

    Ok(())
}

// =============================================================================
// CATEGORIES COMMAND
// =============================================================================

/// List main categories with their instrument counts.
pub fn cmd_categories(
    db_path: &PathBuf,
    backend: &str,
    json_mode: bool,
) -> Result<(), CatalogError> {
    let catalog = load_catalog(db_path, backend)?;
    let counts = catalog.category_counts()?;

    if json_mode {
        let entries: Vec<serde_json::Value> = counts
            .iter()
            .map(|(category, count)| {
                serde_json::json!({
                    "id": category.id.0,
                    "name": category.name,
                    "description": category.description,
                    "children": category.children()
                        .map(|c| c.iter().map(|id| id.0).collect::<Vec<_>>()),
                    "instrument_count": count
                })
            })
            .collect();
        print_json(&serde_json::Value::Array(entries));
        return Ok(());
    }

    if counts.is_empty() {
        println!("No main categories.");
        return Ok(());
    }

    println!("Main Categories");
    println!("===============");
    for (category, count) in &counts {
        let children = category.children().map_or(0, std::collections::BTreeSet::len);
        println!(
            "  [{}] {} - {} sub-categories, {} instruments",
            category.id, category.name, children, count
        );
    }

    Ok(())
}

// =============================================================================
// CATEGORY MUTATIONS
// =============================================================================

/// Create a main category.
pub fn cmd_create_main(
    db_path: &PathBuf,
    backend: &str,
    json_mode: bool,
    name: &str,
    description: &str,
    children: &[u64],
) -> Result<(), CatalogError> {
    let mut catalog = load_catalog(db_path, backend)?;
    let category = catalog.create_main(name, description, &ids(children))?;

    if json_mode {
        print_json(&serde_json::json!({
            "id": category.id.0,
            "kind": "main",
            "name": category.name
        }));
    } else {
        println!("Created main category [{}] {}", category.id, category.name);
    }
    Ok(())
}

/// Create a sub-category.
pub fn cmd_create_sub(
    db_path: &PathBuf,
    backend: &str,
    json_mode: bool,
    name: &str,
    description: &str,
    parents: &[u64],
) -> Result<(), CatalogError> {
    let mut catalog = load_catalog(db_path, backend)?;
    let category = catalog.create_sub(name, description, &ids(parents))?;

    if json_mode {
        print_json(&serde_json::json!({
            "id": category.id.0,
            "kind": "sub",
            "name": category.name
        }));
    } else {
        println!("Created sub-category [{}] {}", category.id, category.name);
    }
    Ok(())
}

/// Attach a sub-category to a main category.
pub fn cmd_attach(
    db_path: &PathBuf,
    backend: &str,
    json_mode: bool,
    parent: u64,
    child: u64,
) -> Result<(), CatalogError> {
    let mut catalog = load_catalog(db_path, backend)?;
    let category = catalog.attach_child(CategoryId(parent), CategoryId(child))?;

    if json_mode {
        print_json(&serde_json::json!({
            "parent": parent,
            "child": child,
            "children": category.children()
                .map(|c| c.iter().map(|id| id.0).collect::<Vec<_>>())
        }));
    } else {
        println!("Attached {} under [{}] {}", child, parent, category.name);
    }
    Ok(())
}

/// Detach a sub-category from a main category.
pub fn cmd_detach(
    db_path: &PathBuf,
    backend: &str,
    json_mode: bool,
    parent: u64,
    child: u64,
) -> Result<(), CatalogError> {
    let mut catalog = load_catalog(db_path, backend)?;
    let category = catalog.detach_child(CategoryId(parent), CategoryId(child))?;

    if json_mode {
        print_json(&serde_json::json!({
            "parent": parent,
            "child": child,
            "children": category.children()
                .map(|c| c.iter().map(|id| id.0).collect::<Vec<_>>())
        }));
    } else {
        println!("Detached {} from [{}] {}", child, parent, category.name);
    }
    Ok(())
}

/// Promote a sub-category to a main category.
pub fn cmd_promote(
    db_path: &PathBuf,
    backend: &str,
    json_mode: bool,
    id: u64,
    children: &[u64],
) -> Result<(), CatalogError> {
    let mut catalog = load_catalog(db_path, backend)?;
    let category = catalog.promote_to_main(CategoryId(id), &ids(children))?;

    if json_mode {
        print_json(&serde_json::json!({
            "id": category.id.0,
            "kind": "main",
            "children": category.children()
                .map(|c| c.iter().map(|cid| cid.0).collect::<Vec<_>>())
        }));
    } else {
        println!("Promoted [{}] {} to main category", category.id, category.name);
    }
    Ok(())
}

/// Demote a main category to a sub-category.
pub fn cmd_demote(
    db_path: &PathBuf,
    backend: &str,
    json_mode: bool,
    id: u64,
    parents: &[u64],
) -> Result<(), CatalogError> {
    let mut catalog = load_catalog(db_path, backend)?;
    let demotion = catalog.demote_to_sub(CategoryId(id), &ids(parents))?;
    let discarded: Vec<u64> = demotion.discarded_children.iter().map(|c| c.0).collect();

    if json_mode {
        print_json(&serde_json::json!({
            "id": demotion.category.id.0,
            "kind": "sub",
            "discarded_children": discarded
        }));
    } else {
        println!(
            "Demoted [{}] {} to sub-category",
            demotion.category.id, demotion.category.name
        );
        if !discarded.is_empty() {
            println!("Discarded child set: {:?}", discarded);
        }
    }
    Ok(())
}

// =============================================================================
// DELETE COMMAND
// =============================================================================

/// Delete a category under the two-phase confirm protocol.
///
/// Without `--confirmed`, a cascade prints its full plan and changes
/// nothing; the command still exits successfully so scripts can inspect
/// the plan first.
pub fn cmd_delete(
    db_path: &PathBuf,
    backend: &str,
    json_mode: bool,
    id: u64,
    confirmed: bool,
) -> Result<(), CatalogError> {
    let mut catalog = load_catalog(db_path, backend)?;

    match catalog.execute_delete(CategoryId(id), confirmed)? {
        DeleteOutcome::Deleted { removed } => {
            let removed: Vec<u64> = removed.iter().map(|m| m.0).collect();
            if json_mode {
                print_json(&serde_json::json!({
                    "deleted": true,
                    "removed": removed
                }));
            } else {
                println!("Deleted {} categories: {:?}", removed.len(), removed);
            }
        }
        DeleteOutcome::NeedsConfirmation(plan) => {
            let members: Vec<u64> = plan.members.iter().map(|m| m.0).collect();
            if json_mode {
                print_json(&serde_json::json!({
                    "deleted": false,
                    "needs_confirmation": true,
                    "plan": { "target": plan.target.0, "members": members }
                }));
            } else {
                println!(
                    "Deleting category {} also removes {} dependent sub-categories:",
                    plan.target,
                    members.len() - 1
                );
                for member in &members {
                    if *member != plan.target.0 {
                        println!("  - {}", member);
                    }
                }
                println!();
                println!("Nothing was deleted. Re-run with --confirmed to proceed.");
            }
        }
    }
    Ok(())
}

// =============================================================================
// COUNT COMMAND
// =============================================================================

/// Show the instrument count under a category.
pub fn cmd_count(
    db_path: &PathBuf,
    backend: &str,
    json_mode: bool,
    id: u64,
) -> Result<(), CatalogError> {
    let catalog = load_catalog(db_path, backend)?;
    let count = catalog.count_instruments_in(CategoryId(id))?;

    if json_mode {
        print_json(&serde_json::json!({ "id": id, "instrument_count": count }));
    } else {
        println!("Category {}: {} instruments", id, count);
    }
    Ok(())
}

// =============================================================================
// INSTRUMENT COMMANDS
// =============================================================================

/// Arguments for `add-instrument`, grouped to keep the call site readable.
#[derive(Debug)]
pub struct NewInstrumentArgs {
    pub name: String,
    pub brand: Option<String>,
    pub description: String,
    pub price_cents: u64,
    pub stock: u64,
    pub category: u64,
    pub sub_category: Option<u64>,
    pub image: Option<PathBuf>,
    pub mime_type: Option<String>,
}

/// Add an instrument to the inventory.
pub fn cmd_add_instrument(
    db_path: &PathBuf,
    backend: &str,
    json_mode: bool,
    args: NewInstrumentArgs,
) -> Result<(), CatalogError> {
    let mut catalog = load_catalog(db_path, backend)?;

    let image = match (&args.image, &args.mime_type) {
        (Some(path), Some(mime)) => {
            let validated = validate_image_path(path)?;
            let bytes = std::fs::read(&validated)
                .map_err(|e| CatalogError::Storage(format!("Read image: {}", e)))?;
            Some(Image {
                bytes,
                mime_type: mime.clone(),
            })
        }
        (Some(_), None) => {
            return Err(CatalogError::EmptyField("mime_type"));
        }
        _ => None,
    };

    let instrument = catalog.create_instrument(NewInstrument {
        name: args.name,
        brand: args.brand,
        description: args.description,
        price_cents: args.price_cents,
        stock: args.stock,
        category: CategoryId(args.category),
        sub_category: args.sub_category.map(CategoryId),
        image,
    })?;

    if json_mode {
        print_json(&serde_json::json!({
            "id": instrument.id.0,
            "name": instrument.name,
            "category": instrument.category.0,
            "sub_category": instrument.sub_category.map(|s| s.0)
        }));
    } else {
        println!("Added instrument [{}] {}", instrument.id, instrument.name);
    }
    Ok(())
}

/// List instruments, optionally restricted to one category.
pub fn cmd_instruments(
    db_path: &PathBuf,
    backend: &str,
    json_mode: bool,
    category: Option<u64>,
) -> Result<(), CatalogError> {
    let catalog = load_catalog(db_path, backend)?;
    let instruments = match category {
        Some(id) => catalog.instruments_in(CategoryId(id))?,
        None => catalog.instruments()?,
    };

    if json_mode {
        let entries: Vec<serde_json::Value> = instruments
            .iter()
            .map(|i| {
                serde_json::json!({
                    "id": i.id.0,
                    "name": i.name,
                    "brand": i.brand,
                    "price_cents": i.price_cents,
                    "stock": i.stock,
                    "category": i.category.0,
                    "sub_category": i.sub_category.map(|s| s.0)
                })
            })
            .collect();
        print_json(&serde_json::Value::Array(entries));
        return Ok(());
    }

    if instruments.is_empty() {
        println!("No instruments.");
        return Ok(());
    }

    println!("Instruments");
    println!("===========");
    for instrument in &instruments {
        println!(
            "  [{}] {} - {} in stock, {} cents",
            instrument.id, instrument.name, instrument.stock, instrument.price_cents
        );
    }

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
