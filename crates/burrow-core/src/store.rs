//! Small persisted key/value mapping backed by one JSON object on disk.

use crate::error::{EngineError, EngineResult};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct LocalStore {
    path: PathBuf,
    /// Serialises every read-modify-write against the file.
    lock: Mutex<()>,
}

impl LocalStore {
    /// Open the store at `path`, creating it as `{}` when missing or empty.
    pub fn open(path: impl Into<PathBuf>) -> EngineResult<Self> {
        let path = path.into();
        let empty = match std::fs::metadata(&path) {
            Ok(m) => m.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(EngineError::from_io(&path, e)),
        };
        if empty {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, "{}")?;
            debug!("Initialised store at {}", path.display());
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> EngineResult<Option<Value>> {
        let _guard = self.lock.lock();
        Ok(self.read()?.remove(key))
    }

    /// Read, update and write back while holding the lock throughout.
    pub fn set(&self, key: &str, value: Value) -> EngineResult<()> {
        let _guard = self.lock.lock();
        let mut map = self.read()?;
        map.insert(key.to_owned(), value);
        std::fs::write(&self.path, serde_json::to_string_pretty(&map)?)?;
        Ok(())
    }

    fn read(&self) -> EngineResult<Map<String, Value>> {
        let text = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&text)? {
            Value::Object(map) => Ok(map),
            other => Err(EngineError::Store(format!(
                "{} holds a {} instead of an object",
                self.path.display(),
                kind_name(&other)
            ))),
        }
    }
}

fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn open_creates_empty_object() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("store.json");
        let store = LocalStore::open(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
        assert_eq!(store.get("anything").unwrap(), None);
    }

    #[test]
    fn empty_file_is_initialised() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        fs::write(&path, "").unwrap();
        LocalStore::open(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn set_then_get_persists() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        let store = LocalStore::open(&path).unwrap();
        store.set("theme", json!("dark")).unwrap();
        store.set("recent", json!(["/a", "/b"])).unwrap();

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.get("theme").unwrap(), Some(json!("dark")));
        assert_eq!(reopened.get("recent").unwrap(), Some(json!(["/a", "/b"])));
    }

    #[test]
    fn existing_content_is_kept() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        fs::write(&path, r#"{"keep": 1}"#).unwrap();
        let store = LocalStore::open(&path).unwrap();
        store.set("add", json!(2)).unwrap();
        assert_eq!(store.get("keep").unwrap(), Some(json!(1)));
    }

    #[test]
    fn non_object_is_a_store_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        fs::write(&path, "[1, 2]").unwrap();
        let store = LocalStore::open(&path).unwrap();
        assert!(matches!(store.get("x"), Err(EngineError::Store(_))));
    }

    #[test]
    fn concurrent_sets_lose_nothing() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(LocalStore::open(tmp.path().join("store.json")).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.set(&format!("k{i}"), json!(i)).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        for i in 0..8 {
            assert_eq!(store.get(&format!("k{i}")).unwrap(), Some(json!(i)));
        }
    }
}
