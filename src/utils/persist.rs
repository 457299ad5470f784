// SPDX-License-Identifier: GPL-3.0-only
use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Write `contents` to `path` so that readers only ever see the previous
/// file or the complete new one.
///
/// The data goes to a temporary file in the same directory, is synced to
/// disk and then renamed over the target.
pub async fn write_atomically(path: &Path, contents: Vec<u8>) -> anyhow::Result<()> {
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let dir = parent_dir(&path);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let mut temp = tempfile::NamedTempFile::new_in(&dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
        temp.write_all(&contents)
            .with_context(|| format!("Failed to write temporary file for {}", path.display()))?;
        temp.as_file()
            .sync_all()
            .with_context(|| format!("Failed to sync temporary file for {}", path.display()))?;
        temp.persist(&path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        Ok(())
    })
    .await
    .context("Persistence task panicked")?
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Serialize records as one JSON object keyed by `key`, preserving order.
pub fn to_keyed_json<T, F>(records: &[T], key: F) -> anyhow::Result<serde_json::Map<String, serde_json::Value>>
where
    T: Serialize,
    F: Fn(&T) -> &str,
{
    let mut map = serde_json::Map::new();
    for record in records {
        map.insert(key(record).to_string(), serde_json::to_value(record)?);
    }
    Ok(map)
}

/// Inverse of [`to_keyed_json`]. A record whose own id disagrees with its
/// key is skipped.
pub fn from_keyed_json<T, F>(map: serde_json::Map<String, serde_json::Value>, key: F) -> anyhow::Result<Vec<T>>
where
    T: DeserializeOwned,
    F: Fn(&T) -> &str,
{
    let mut records = Vec::with_capacity(map.len());
    for (name, value) in map {
        let record: T = serde_json::from_value(value)
            .with_context(|| format!("Invalid record for key {name:?}"))?;
        if key(&record) != name {
            warn!(key = %name, id = %key(&record), "Record id does not match its key, skipping");
            continue;
        }
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: String,
        value: u32,
    }

    #[tokio::test]
    async fn test_write_atomically_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");

        write_atomically(&path, b"first".to_vec()).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first");

        write_atomically(&path, b"second".to_vec()).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");

        // Only the target file remains, no temporary leftovers.
        let files = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(files, 1);
    }

    #[test]
    fn test_keyed_json_preserves_insertion_order() {
        let items = vec![
            Item { id: "zeta".into(), value: 1 },
            Item { id: "alpha".into(), value: 2 },
            Item { id: "mid".into(), value: 3 },
        ];

        let map = to_keyed_json(&items, |i| i.id.as_str()).unwrap();
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);

        let text = serde_json::to_string(&map).unwrap();
        let parsed: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&text).unwrap();
        let back: Vec<Item> = from_keyed_json(parsed, |i: &Item| i.id.as_str()).unwrap();
        assert_eq!(back, items);
    }

    #[test]
    fn test_keyed_json_skips_mismatched_keys() {
        let mut map = serde_json::Map::new();
        map.insert("a".into(), serde_json::json!({"id": "a", "value": 1}));
        map.insert("b".into(), serde_json::json!({"id": "not-b", "value": 2}));

        let back: Vec<Item> = from_keyed_json(map, |i: &Item| i.id.as_str()).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].id, "a");
    }

    #[test]
    fn test_keyed_json_rejects_invalid_record() {
        let mut map = serde_json::Map::new();
        map.insert("a".into(), serde_json::json!({"id": "a"}));

        let result: anyhow::Result<Vec<Item>> = from_keyed_json(map, |i: &Item| i.id.as_str());
        assert!(result.is_err());
    }
}
