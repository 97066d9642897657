use crate::error::{BvtkError, Result};
use crate::workspace::Workspace;
use chrono::{DateTime, Local};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const UNKNOWN_NODE_TYPE: &str = "unknown";

/// A BVtkNodes export read from disk. The content is not validated against
/// any schema; the import script receives the file as is.
#[derive(Debug, Clone)]
pub struct NodeTreeFile {
    pub path: PathBuf,
    pub document: JsonValue,
    pub size_bytes: u64,
    pub modified: Option<SystemTime>,
}

impl NodeTreeFile {
    /// Reads `filename` from the desktop.
    pub async fn load(workspace: &Workspace, filename: &str) -> Result<Self> {
        let path = workspace.desktop_file(filename);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(BvtkError::FileNotFound {
                filename: filename.to_string(),
                path,
            });
        }
        Self::read(&path, filename).await
    }

    pub async fn read(path: &Path, filename: &str) -> Result<Self> {
        let metadata = tokio::fs::metadata(path).await?;
        let bytes = tokio::fs::read(path).await?;
        // Exports may carry stray non-UTF-8 bytes inside string values.
        let content = String::from_utf8_lossy(&bytes);
        let document = serde_json::from_str(&content).map_err(|source| BvtkError::Parse {
            filename: filename.to_string(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            document,
            size_bytes: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }

    pub fn nodes(&self) -> Option<&Vec<JsonValue>> {
        self.document.get("nodes").and_then(JsonValue::as_array)
    }

    pub fn links(&self) -> Option<&Vec<JsonValue>> {
        self.document.get("links").and_then(JsonValue::as_array)
    }

    pub fn node_count(&self) -> usize {
        self.nodes().map_or(0, Vec::len)
    }

    pub fn link_count(&self) -> usize {
        self.links().map_or(0, Vec::len)
    }

    /// Top-level keys in document order.
    pub fn top_level_keys(&self) -> Vec<&str> {
        match &self.document {
            JsonValue::Object(map) => map.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Node count per type, keyed by `bl_idname`, falling back to `type`.
    pub fn node_types(&self) -> BTreeMap<&str, usize> {
        let mut types = BTreeMap::new();
        for node in self.nodes().into_iter().flatten() {
            *types.entry(node_type(node)).or_insert(0) += 1;
        }
        types
    }

    /// Field names of the first link, as a sample of the link layout.
    pub fn first_link_keys(&self) -> Vec<&str> {
        match self.links().and_then(|links| links.first()) {
            Some(JsonValue::Object(map)) => map.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn size_kb(&self) -> String {
        format_kb(self.size_bytes)
    }

    pub fn modified_display(&self) -> String {
        format_modified(self.modified)
    }
}

fn node_type(node: &JsonValue) -> &str {
    ["bl_idname", "type"]
        .iter()
        .filter_map(|key| node.get(key).and_then(JsonValue::as_str))
        .find(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_NODE_TYPE)
}

pub fn format_kb(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

pub fn format_modified(modified: Option<SystemTime>) -> String {
    match modified {
        Some(time) => DateTime::<Local>::from(time)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "unknown".to_string(),
    }
}
