//! Report orchestration
//!
//! One function per report flow: connect once, fetch sequentially, render
//! to the given sink. A failure for one table or folder is reported inline
//! and the loop continues; connection-level failures propagate.

use crate::error::{AppError, AppResult};
use crate::fetcher::RowSource;
use crate::joiner::assemble;
use crate::model::known_relationships;
use crate::render;
use crate::storage::{self, StorageClient};
use crate::tree::{render_entry, IgnoreRules, TreeWalker};
use std::io::Write;
use std::path::Path;

const PRODUCT_TABLE: &str = "proizvodi";
const SEPARATOR: &str = "--------------------------------------------------------------------------------";

/// Full content report over the configured tables
pub async fn database_report<W: Write>(
    out: &mut W,
    source: &dyn RowSource,
    tables: &[String],
    row_limit: i64,
) -> AppResult<()> {
    for (i, table) in tables.iter().enumerate() {
        write!(out, "\n{}. ", i + 1)?;
        match source.fetch_all(table, row_limit).await {
            Ok(snapshot) => {
                write!(out, "{}", render::table_report(table, &snapshot))?;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                writeln!(out, "Table: {}", table)?;
                writeln!(out, "\n  Error accessing table: {}", e)?;
            }
        }
        writeln!(out, "\n{}", SEPARATOR)?;
    }
    Ok(())
}

/// Composite report for one product: selected by id, or the first row
/// when no id is given
pub async fn product_report<W: Write>(
    out: &mut W,
    source: &dyn RowSource,
    product_id: Option<&str>,
    as_json: bool,
) -> AppResult<()> {
    let root = match product_id {
        Some(id) => source
            .fetch_one(PRODUCT_TABLE, "id", id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No product with id {}", id)))?,
        None => source
            .fetch_all(PRODUCT_TABLE, 1)
            .await?
            .rows
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("No products in the database".to_string()))?,
    };

    let composite = assemble(source, PRODUCT_TABLE, root, &known_relationships()).await?;

    if as_json {
        writeln!(out, "{}", render::composite_json(&composite)?)?;
    } else {
        write!(out, "{}", render::product_summary(&composite))?;
    }
    Ok(())
}

/// Enumerate the bucket root plus each known folder, sequentially
pub async fn storage_report<W: Write>(
    out: &mut W,
    client: &StorageClient,
    bucket: &str,
    folders: &[String],
) -> AppResult<()> {
    let root = String::new();
    let mut all_objects = Vec::new();

    for folder in std::iter::once(&root).chain(folders.iter()) {
        let label = if folder.is_empty() { "root" } else { folder.as_str() };
        writeln!(out, "Listing files in {}/{}...", bucket, label)?;
        match client.list_folder(folder).await {
            Ok(objects) => {
                writeln!(out, "  Files found: {}", objects.len())?;
                all_objects.extend(objects);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => writeln!(out, "  Error listing folder: {}", e)?,
        }
    }

    writeln!(out, "\n{}", SEPARATOR)?;
    writeln!(out, "Total files found: {}\n", all_objects.len())?;
    write!(
        out,
        "{}",
        storage::render_listing(&all_objects, |name| client.public_url(name))
    )?;
    Ok(())
}

/// Indented tree of a directory, pruned by the ignore rules
pub fn tree_report<W: Write>(
    out: &mut W,
    root: &Path,
    rules: IgnoreRules,
    contents: bool,
    max_content_chars: usize,
) -> AppResult<()> {
    if !root.exists() {
        return Err(AppError::NotFound(format!(
            "Directory {} does not exist",
            root.display()
        )));
    }

    writeln!(out, "Directory structure for: {}\n", root.display())?;
    let mut walker = TreeWalker::new(root, rules);
    if contents {
        walker = walker.with_contents(max_content_chars);
    }
    for entry in walker {
        write!(out, "{}", render_entry(&entry))?;
    }
    Ok(())
}
