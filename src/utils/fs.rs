use std::path::{Path, PathBuf};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use crate::utils::{GameError, GameResult};
use tracing::{debug, warn};

/// Reads a JSON document, substituting `T::default()` when the file is
/// missing, unreadable or malformed.
pub async fn read_json_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        debug!("No data file at {:?}, starting empty", path);
        return T::default();
    }

    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read {:?}: {}, using defaults", path, e);
            return T::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to parse {:?}: {}, using defaults", path, e);
            T::default()
        }
    }
}

/// Serializes `value` next to `path` and renames it into place, so readers
/// never observe a half-written file.
pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> GameResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| GameError::persistence(format!("Failed to create directory {:?}: {}", parent, e)))?;
        }
    }

    let json = serde_json::to_string_pretty(value)
        .map_err(|e| GameError::persistence(format!("Failed to serialize {:?}: {}", path, e)))?;

    let temp_path = temp_path_for(path);
    fs::write(&temp_path, json)
        .await
        .map_err(|e| GameError::persistence(format!("Failed to write {:?}: {}", temp_path, e)))?;

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(GameError::persistence(format!("Failed to replace {:?}: {}", path, e)));
    }

    debug!("Wrote {:?}", path);
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_yields_default() {
        let temp_dir = tempdir().unwrap();
        let value: HashMap<String, u32> = read_json_or_default(&temp_dir.path().join("nope.json")).await;
        assert!(value.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_file_yields_default() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("broken.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let value: Vec<u32> = read_json_or_default(&path).await;
        assert!(value.is_empty());
    }

    #[tokio::test]
    async fn test_atomic_write_leaves_no_temp_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("data.json");

        write_json_atomic(&path, &vec![1, 2, 3]).await.unwrap();

        let value: Vec<u32> = read_json_or_default(&path).await;
        assert_eq!(value, vec![1, 2, 3]);
        assert!(!temp_path_for(&path).exists());
    }
}
