use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::PathBuf;

use super::KeyValueStore;
use crate::utils::file_utils;

/// Key-value store kept as a single JSON object on disk; every `set` rewrites the file.
pub struct JsonStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let data = file_utils::read_file(&path)?;
            serde_json::from_slice::<Map<String, Value>>(&data)
                .with_context(|| format!("Store {} is not a JSON object", path.display()))?
        } else {
            Map::new()
        };
        Ok(Self { path, values })
    }
}

impl KeyValueStore for JsonStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        let data = serde_json::to_vec_pretty(&self.values)?;
        file_utils::write_file(&self.path, &data)
    }
}
