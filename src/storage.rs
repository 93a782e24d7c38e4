//! Storage bucket client
//!
//! Enumerates objects under known folder prefixes of one bucket via the
//! storage service's HTTP API and constructs public URLs for them.

use crate::config::StorageConfig;
use crate::error::{AppError, AppResult};
use serde::Deserialize;
use std::fmt::Write;
use tracing::debug;

/// Object metadata as returned by the storage API (fields optional)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectMetadata {
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub mimetype: Option<String>,
}

/// One object entry in a bucket listing
#[derive(Debug, Clone, Deserialize)]
pub struct StorageObject {
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub metadata: Option<ObjectMetadata>,
}

/// HTTP client for the storage service's object API
pub struct StorageClient {
    http: reqwest::Client,
    config: StorageConfig,
}

impl StorageClient {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Public URL for an object, by name as returned in a listing
    pub fn public_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.base_url, self.config.bucket, name
        )
    }

    /// List objects under a folder prefix; an empty folder lists the
    /// bucket root. Folder prefixes always carry a trailing slash.
    pub async fn list_folder(&self, folder: &str) -> AppResult<Vec<StorageObject>> {
        let url = format!(
            "{}/storage/v1/object/list/{}",
            self.config.base_url, self.config.bucket
        );

        let mut request = self
            .http
            .get(&url)
            .header("apikey", &self.config.api_key)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_key),
            );
        if let Some(prefix) = folder_prefix(folder) {
            request = request.query(&[("prefix", prefix)]);
        }

        debug!(bucket = %self.config.bucket, folder, "listing storage folder");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                return Err(AppError::Connection(format!(
                    "storage API rejected credentials ({}): {}",
                    status, body
                )));
            }
            return Err(AppError::Parse(format!(
                "storage API returned {}: {}",
                status, body
            )));
        }

        response
            .json::<Vec<StorageObject>>()
            .await
            .map_err(|e| AppError::Parse(format!("expected a JSON array of objects: {}", e)))
    }
}

/// Query prefix for a folder: `None` for the bucket root, otherwise the
/// folder name with a trailing slash ensured
fn folder_prefix(folder: &str) -> Option<String> {
    if folder.is_empty() {
        return None;
    }
    if folder.ends_with('/') {
        Some(folder.to_string())
    } else {
        Some(format!("{}/", folder))
    }
}

/// Render a listing of objects with their public URLs, followed by a
/// markdown table for easy copying
pub fn render_listing(objects: &[StorageObject], public_url: impl Fn(&str) -> String) -> String {
    if objects.is_empty() {
        return "No files found.\n".to_string();
    }

    let mut out = String::new();
    for (i, object) in objects.iter().enumerate() {
        let _ = writeln!(out, "{}. File: {}", i + 1, object.name);
        let _ = writeln!(out, "   URL: {}", public_url(&object.name));
        if let Some(metadata) = &object.metadata {
            if let Some(size) = metadata.size {
                let _ = writeln!(out, "   Size: {} bytes", size);
            }
            if let Some(mimetype) = &metadata.mimetype {
                let _ = writeln!(out, "   Type: {}", mimetype);
            }
        }
        if let Some(created_at) = &object.created_at {
            let _ = writeln!(out, "   Created: {}", created_at);
        }
        out.push('\n');
    }

    out.push_str("Table of all files (for easy copying):\n");
    out.push_str("| # | File | URL |\n");
    out.push_str("|---|------|-----|\n");
    for (i, object) in objects.iter().enumerate() {
        let _ = writeln!(
            out,
            "| {} | {} | {} |",
            i + 1,
            object.name,
            public_url(&object.name)
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn client() -> StorageClient {
        StorageClient::new(StorageConfig {
            base_url: "https://example.supabase.co".to_string(),
            api_key: "test-key".to_string(),
            bucket: "product-images".to_string(),
            folders: vec![],
        })
    }

    #[test]
    fn public_url_construction() {
        assert_eq!(
            client().public_url("Kamen/wall-01.jpg"),
            "https://example.supabase.co/storage/v1/object/public/product-images/Kamen/wall-01.jpg"
        );
    }

    #[test]
    fn folder_prefix_rules() {
        assert_eq!(folder_prefix(""), None);
        assert_eq!(folder_prefix("Kamen"), Some("Kamen/".to_string()));
        assert_eq!(folder_prefix("Kamen/"), Some("Kamen/".to_string()));
    }

    #[test]
    fn deserializes_listing_with_optional_metadata() {
        let body = r#"[
            {"name": "Kamen/wall-01.jpg",
             "created_at": "2025-03-09T10:00:00Z",
             "metadata": {"size": 20480, "mimetype": "image/jpeg"}},
            {"name": "placeholder.txt"}
        ]"#;
        let objects: Vec<StorageObject> = serde_json::from_str(body).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].metadata.as_ref().unwrap().size, Some(20480));
        assert!(objects[1].metadata.is_none());
        assert!(objects[1].created_at.is_none());
    }

    #[test]
    fn render_listing_includes_urls_and_table() {
        let objects: Vec<StorageObject> = serde_json::from_str(
            r#"[{"name": "Cigla/red.jpg", "metadata": {"size": 10, "mimetype": "image/jpeg"}}]"#,
        )
        .unwrap();
        let c = client();
        let rendered = render_listing(&objects, |name| c.public_url(name));
        assert!(rendered.contains("1. File: Cigla/red.jpg"));
        assert!(rendered.contains("Size: 10 bytes"));
        assert!(rendered.contains("| 1 | Cigla/red.jpg |"));
    }

    #[test]
    fn render_empty_listing() {
        assert_eq!(render_listing(&[], |n| n.to_string()), "No files found.\n");
    }
}
