//! Report rendering
//!
//! All renderers build plain text into a `String`; the report layer decides
//! where it goes. Output is line-oriented and meant for a human reading a
//! terminal, with a JSON variant for the composite report.

use crate::error::{AppError, AppResult};
use crate::fetcher::TableSnapshot;
use crate::joiner::Composite;
use crate::model::Relationship;
use serde_json::Value;
use std::fmt::Write;

/// Render one value for a `column: value` line. Strings print raw, nested
/// JSON values serialize compactly.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}

/// Full content report for one table: inferred structure, then one block
/// per row. A table returning zero rows is stated as empty, not an error.
pub fn table_report(table: &str, snapshot: &TableSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Table: {}", table);

    if snapshot.rows.is_empty() {
        out.push_str("\n  Table is empty.\n");
        return out;
    }

    if let Some(schema) = &snapshot.schema {
        out.push_str("\n  Table Structure:\n");
        for (name, column_type) in &schema.columns {
            let _ = writeln!(out, "    - {}: {}", name, column_type);
        }
    }

    let _ = writeln!(out, "\n  Table Data ({} rows):", snapshot.rows.len());
    for (i, row) in snapshot.rows.iter().enumerate() {
        let _ = writeln!(out, "    Row {}:", i + 1);
        for (name, value) in row.iter() {
            let _ = writeln!(out, "      {}: {}", name, display_value(value));
        }
    }
    out
}

/// Flattened one-product summary built from an assembled composite
pub fn product_summary(composite: &Composite) -> String {
    let name = composite.root.get_str("naziv").unwrap_or("Unknown");
    let category = composite
        .one("category")
        .and_then(|c| c.get_str("naziv"))
        .unwrap_or("Unknown");
    let inventory_status = composite
        .one("inventory")
        .and_then(|inv| inv.get("status"))
        .map(display_value)
        .unwrap_or_else(|| "Not available".to_string());

    let mut out = String::new();
    let _ = writeln!(out, "Product: {}", name);
    let _ = writeln!(out, "Category: {}", category);
    let _ = writeln!(out, "Number of images: {}", composite.many("images").len());
    let _ = writeln!(
        out,
        "Number of characteristics: {}",
        composite.many("characteristics").len()
    );
    let _ = writeln!(out, "Inventory status: {}", inventory_status);
    out
}

/// Pretty JSON of the whole composite (root plus related rows)
pub fn composite_json(composite: &Composite) -> AppResult<String> {
    serde_json::to_string_pretty(composite)
        .map_err(|e| AppError::Parse(format!("Failed to serialize composite: {}", e)))
}

/// Human-readable listing of the fixed relationship map
pub fn relationship_map(relationships: &[Relationship]) -> String {
    let mut out = String::from("Table Relationships:\n");
    for rel in relationships {
        let arity = match rel.arity {
            crate::model::Arity::One => "one",
            crate::model::Arity::Many => "many",
        };
        let _ = writeln!(
            out,
            "  {}.{} -> {}.{}  ({}, {})",
            rel.child_table, rel.fk_column, rel.parent_table, rel.pk_column, rel.field, arity
        );
    }
    out
}
