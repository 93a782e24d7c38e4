//! Composite assembly
//!
//! Walks the fixed relationship map around one root entity and attaches
//! related rows under named fields. Each fetch observes an independent
//! snapshot; no transactional consistency across the fetches is provided.

use crate::error::AppResult;
use crate::fetcher::RowSource;
use crate::model::{Arity, Entity, Relationship};
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::warn;

/// Rows attached under one relationship field
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    One(Option<Entity>),
    Many(Vec<Entity>),
}

/// A root entity with its related rows assembled
#[derive(Debug, Clone)]
pub struct Composite {
    pub table: String,
    pub root: Entity,
    pub related: Vec<(String, Related)>,
}

impl Composite {
    pub fn one(&self, field: &str) -> Option<&Entity> {
        self.related.iter().find_map(|(name, rel)| match rel {
            Related::One(entity) if name == field => entity.as_ref(),
            _ => None,
        })
    }

    pub fn many(&self, field: &str) -> &[Entity] {
        self.related
            .iter()
            .find_map(|(name, rel)| match rel {
                Related::Many(entities) if name == field => Some(entities.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }
}

impl Serialize for Composite {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1 + self.related.len()))?;
        map.serialize_entry(&self.table, &self.root)?;
        for (field, related) in &self.related {
            match related {
                Related::One(entity) => map.serialize_entry(field, entity)?,
                Related::Many(entities) => map.serialize_entry(field, entities)?,
            }
        }
        map.end()
    }
}

/// Assemble a composite for `root` from table `table`.
///
/// Relationships whose parent is the root's table pull child rows filtered
/// by the foreign key; relationships whose child is the root's table pull
/// the parent row the root's foreign key points at. A foreign key that
/// matches no parent row is reported and attached as absent, not an error.
/// A fetch failure on one relationship is reported and the remaining
/// relationships are still assembled.
pub async fn assemble(
    source: &dyn RowSource,
    table: &str,
    root: Entity,
    relationships: &[Relationship],
) -> AppResult<Composite> {
    let mut related = Vec::new();

    for rel in relationships {
        if rel.parent_table == table {
            let Some(pk) = root.key_value(rel.pk_column) else {
                warn!(
                    table,
                    column = rel.pk_column,
                    "root entity has no usable primary key, skipping {}",
                    rel.field
                );
                continue;
            };
            let attached = match rel.arity {
                Arity::Many => match source.fetch_where(rel.child_table, rel.fk_column, &pk).await
                {
                    Ok(rows) => Related::Many(rows),
                    Err(e) => {
                        warn!("fetching {} failed: {}", rel.child_table, e);
                        Related::Many(Vec::new())
                    }
                },
                Arity::One => match source.fetch_one(rel.child_table, rel.fk_column, &pk).await {
                    Ok(row) => Related::One(row),
                    Err(e) => {
                        warn!("fetching {} failed: {}", rel.child_table, e);
                        Related::One(None)
                    }
                },
            };
            related.push((rel.field.to_string(), attached));
        } else if rel.child_table == table {
            let parent = match root.key_value(rel.fk_column) {
                Some(fk) => {
                    let found = match source.fetch_one(rel.parent_table, rel.pk_column, &fk).await
                    {
                        Ok(row) => row,
                        Err(e) => {
                            warn!("fetching {} failed: {}", rel.parent_table, e);
                            None
                        }
                    };
                    if found.is_none() {
                        warn!(
                            table = rel.parent_table,
                            key = %fk,
                            "foreign key {}.{} matches no parent row",
                            rel.child_table,
                            rel.fk_column
                        );
                    }
                    found
                }
                None => None,
            };
            related.push((rel.field.to_string(), Related::One(parent)));
        }
    }

    Ok(Composite {
        table: table.to_string(),
        root,
        related,
    })
}


#[cfg(test)]
mod tests {
    use super::mock::MockSource;
    use super::*;
    use crate::model::known_relationships;
    use serde_json::json;

    fn product(id: &str, category: &str, name: &str) -> Entity {
        [
            ("id", json!(id)),
            ("kategorija_id", json!(category)),
            ("naziv", json!(name)),
        ]
        .into_iter()
        .collect()
    }

    fn source() -> MockSource {
        MockSource::new()
            .with_table(
                "kategorije",
                vec![[("id", json!("c1")), ("naziv", json!("Tiles"))]
                    .into_iter()
                    .collect()],
            )
            .with_table(
                "slike_proizvoda",
                vec![
                    [("id", json!("s1")), ("proizvod_id", json!("p1"))]
                        .into_iter()
                        .collect(),
                    [("id", json!("s2")), ("proizvod_id", json!("p1"))]
                        .into_iter()
                        .collect(),
                    [("id", json!("s3")), ("proizvod_id", json!("p2"))]
                        .into_iter()
                        .collect(),
                ],
            )
            .with_table("karakteristike_proizvoda", vec![])
            .with_table("zalihe", vec![])
            .with_table("istorija_zaliha", vec![])
    }

    #[tokio::test]
    async fn attaches_only_matching_children() {
        let composite = assemble(
            &source(),
            "proizvodi",
            product("p1", "c1", "Stone Tile"),
            &known_relationships(),
        )
        .await
        .unwrap();

        let images = composite.many("images");
        assert_eq!(images.len(), 2);
        for image in images {
            assert_eq!(image.get_str("proizvod_id"), Some("p1"));
        }
    }

    #[tokio::test]
    async fn resolves_parent_category() {
        let composite = assemble(
            &source(),
            "proizvodi",
            product("p1", "c1", "Stone Tile"),
            &known_relationships(),
        )
        .await
        .unwrap();

        let category = composite.one("category").expect("category attached");
        assert_eq!(category.get_str("naziv"), Some("Tiles"));
    }

    #[tokio::test]
    async fn dangling_foreign_key_is_absent_not_fatal() {
        let composite = assemble(
            &source(),
            "proizvodi",
            product("p9", "missing-category", "Orphan"),
            &known_relationships(),
        )
        .await
        .unwrap();

        assert!(composite.one("category").is_none());
        assert!(composite.many("images").is_empty());
    }

    #[tokio::test]
    async fn missing_inventory_is_none() {
        let composite = assemble(
            &source(),
            "proizvodi",
            product("p1", "c1", "Stone Tile"),
            &known_relationships(),
        )
        .await
        .unwrap();

        assert!(composite.one("inventory").is_none());
    }

    #[tokio::test]
    async fn failed_relationship_fetch_does_not_abort_assembly() {
        // No zalihe table at all: that relationship fails, the rest attach.
        let source = MockSource::new()
            .with_table("kategorije", vec![])
            .with_table(
                "slike_proizvoda",
                vec![[("id", json!("s1")), ("proizvod_id", json!("p1"))]
                    .into_iter()
                    .collect()],
            )
            .with_table("karakteristike_proizvoda", vec![])
            .with_table("istorija_zaliha", vec![]);

        let composite = assemble(
            &source,
            "proizvodi",
            product("p1", "c1", "Stone Tile"),
            &known_relationships(),
        )
        .await
        .unwrap();

        assert_eq!(composite.many("images").len(), 1);
        assert!(composite.one("inventory").is_none());
    }

    #[tokio::test]
    async fn composite_serializes_root_and_related() {
        let composite = assemble(
            &source(),
            "proizvodi",
            product("p1", "c1", "Stone Tile"),
            &known_relationships(),
        )
        .await
        .unwrap();

        let value = serde_json::to_value(&composite).unwrap();
        assert_eq!(value["proizvodi"]["naziv"], json!("Stone Tile"));
        assert_eq!(value["category"]["naziv"], json!("Tiles"));
        assert_eq!(value["images"].as_array().unwrap().len(), 2);
        assert_eq!(value["inventory"], json!(null));
    }
}
