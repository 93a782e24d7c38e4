//! Core data model
//!
//! Entities are open string-keyed value maps so columns the tool does not
//! know about are carried through to the report unchanged. The six known
//! catalog tables and their foreign-key relationships are fixed here.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// Explicit column type classification derived from Postgres column
/// metadata (not from the first row's runtime values).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    Integer,
    Float,
    Text,
    Uuid,
    Timestamp,
    Date,
    Json,
    Other(String),
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Boolean => write!(f, "boolean"),
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::Text => write!(f, "text"),
            ColumnType::Uuid => write!(f, "uuid"),
            ColumnType::Timestamp => write!(f, "timestamp"),
            ColumnType::Date => write!(f, "date"),
            ColumnType::Json => write!(f, "json"),
            ColumnType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Schema observed for one table: ordered column names with their types
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<(String, ColumnType)>,
}

/// A single row retrieved from the data store, as an ordered
/// column-name to value mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entity {
    fields: Vec<(String, Value)>,
}

impl Entity {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.fields.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// String value of a column, if present and textual
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.as_str())
    }

    /// The column value rendered as a plain key string (text, number or
    /// bool), used when matching foreign keys against primary keys.
    pub fn key_value(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Entity {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Whether a relationship attaches a single row or an ordered sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    One,
    Many,
}

/// Directed foreign-key edge between two known tables:
/// `(child_table, fk_column)` references `(parent_table, pk_column)`.
#[derive(Debug, Clone)]
pub struct Relationship {
    pub child_table: &'static str,
    pub fk_column: &'static str,
    pub parent_table: &'static str,
    pub pk_column: &'static str,
    /// Name the joined result attaches under in a composite report
    pub field: &'static str,
    pub arity: Arity,
}

/// The six known catalog tables, in report print order
pub fn known_tables() -> [&'static str; 6] {
    [
        "karakteristike_proizvoda",
        "slike_proizvoda",
        "proizvodi",
        "kategorije",
        "istorija_zaliha",
        "zalihe",
    ]
}

/// The six fixed foreign-key relationships between the known tables
pub fn known_relationships() -> Vec<Relationship> {
    vec![
        Relationship {
            child_table: "proizvodi",
            fk_column: "kategorija_id",
            parent_table: "kategorije",
            pk_column: "id",
            field: "category",
            arity: Arity::One,
        },
        Relationship {
            child_table: "slike_proizvoda",
            fk_column: "proizvod_id",
            parent_table: "proizvodi",
            pk_column: "id",
            field: "images",
            arity: Arity::Many,
        },
        Relationship {
            child_table: "karakteristike_proizvoda",
            fk_column: "proizvod_id",
            parent_table: "proizvodi",
            pk_column: "id",
            field: "characteristics",
            arity: Arity::Many,
        },
        Relationship {
            child_table: "zalihe",
            fk_column: "proizvod_id",
            parent_table: "proizvodi",
            pk_column: "id",
            field: "inventory",
            arity: Arity::One,
        },
        Relationship {
            child_table: "istorija_zaliha",
            fk_column: "proizvod_id",
            parent_table: "proizvodi",
            pk_column: "id",
            field: "inventory_history",
            arity: Arity::Many,
        },
        Relationship {
            child_table: "istorija_zaliha",
            fk_column: "zaliha_id",
            parent_table: "zalihe",
            pk_column: "id",
            field: "history",
            arity: Arity::Many,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entity_preserves_insertion_order() {
        let mut entity = Entity::new();
        entity.insert("id", json!("p1"));
        entity.insert("naziv", json!("Stone Tile"));
        entity.insert("cena", json!(12.5));

        let names: Vec<&str> = entity.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["id", "naziv", "cena"]);
    }

    #[test]
    fn entity_serializes_as_map() {
        let entity: Entity = [("id", json!("p1")), ("aktivan", json!(true))]
            .into_iter()
            .collect();
        let rendered = serde_json::to_string(&entity).unwrap();
        assert_eq!(rendered, r#"{"id":"p1","aktivan":true}"#);
    }

    #[test]
    fn key_value_handles_non_string_keys() {
        let entity: Entity = [("id", json!(42)), ("data", json!({"a": 1}))]
            .into_iter()
            .collect();
        assert_eq!(entity.key_value("id").as_deref(), Some("42"));
        assert_eq!(entity.key_value("data"), None);
        assert_eq!(entity.key_value("missing"), None);
    }

    #[test]
    fn relationship_map_covers_known_tables() {
        let tables = known_tables();
        for rel in known_relationships() {
            assert!(tables.contains(&rel.child_table));
            assert!(tables.contains(&rel.parent_table));
        }
        assert_eq!(known_relationships().len(), 6);
    }
}
