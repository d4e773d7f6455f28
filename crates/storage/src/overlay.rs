//! storage::overlay — persisted attendance overlay on top of a string key-value store
use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::records::AttendanceOverlay;

/// Key the overlay is stored under.
pub const OVERLAY_KEY: &str = "ticketAttendance";

/// Local-storage style string store: values are opaque text, absent keys read as `None`.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// One `<key>.json` file per key inside `dir`.
#[derive(Debug, Clone)]
pub struct FileKv { pub dir: PathBuf }

impl FileKv {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }
    fn path_for(&self, key: &str) -> PathBuf { self.dir.join(format!("{key}.json")) }
}

impl KeyValueStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() { return Ok(None) }
        Ok(Some(fs::read_to_string(path)?))
    }
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() { fs::remove_file(path)?; }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryKv { entries: HashMap<String, String> }

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> { Ok(self.entries.get(key).cloned()) }
    fn set(&mut self, key: &str, value: &str) -> Result<()> { self.entries.insert(key.to_string(), value.to_string()); Ok(()) }
    fn remove(&mut self, key: &str) -> Result<()> { self.entries.remove(key); Ok(()) }
}

/// Read the overlay. A missing, unreadable or malformed payload yields an empty overlay.
pub fn load_overlay(kv: &dyn KeyValueStore) -> AttendanceOverlay {
    let raw = match kv.get(OVERLAY_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return AttendanceOverlay::new(),
        Err(e) => {
            warn!("attendance overlay unreadable, treating as empty: {e}");
            return AttendanceOverlay::new();
        }
    };
    match serde_json::from_str::<AttendanceOverlay>(&raw) {
        Ok(overlay) => {
            debug!("loaded attendance overlay with {} entries", overlay.len());
            overlay
        }
        Err(e) => {
            warn!("attendance overlay corrupt, treating as empty: {e}");
            AttendanceOverlay::new()
        }
    }
}

/// Replace the stored overlay wholesale.
pub fn save_overlay(kv: &mut dyn KeyValueStore, overlay: &AttendanceOverlay) -> Result<()> {
    kv.set(OVERLAY_KEY, &serde_json::to_string(overlay)?)
}

pub fn clear_overlay(kv: &mut dyn KeyValueStore) -> Result<()> { kv.remove(OVERLAY_KEY) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_overlay_is_empty() {
        let kv = MemoryKv::default();
        assert!(load_overlay(&kv).is_empty());
    }

    #[test]
    fn corrupt_overlay_is_empty() {
        let mut kv = MemoryKv::default();
        kv.set(OVERLAY_KEY, "{not json").unwrap();
        assert!(load_overlay(&kv).is_empty());
        kv.set(OVERLAY_KEY, r#"{"A1":"yes"}"#).unwrap();
        assert!(load_overlay(&kv).is_empty());
    }

    #[test]
    fn overlay_is_stored_as_json_object() {
        let mut kv = MemoryKv::default();
        let overlay = AttendanceOverlay::from([("A1".to_string(), true), ("A2".to_string(), false)]);
        save_overlay(&mut kv, &overlay).unwrap();
        assert_eq!(kv.get(OVERLAY_KEY).unwrap().as_deref(), Some(r#"{"A1":true,"A2":false}"#));
        assert_eq!(load_overlay(&kv), overlay);
    }

    #[test]
    fn file_kv_creates_dir_and_clears() {
        let tmp = tempfile::tempdir().unwrap();
        let mut kv = FileKv::new(tmp.path().join("nested"));
        let overlay = AttendanceOverlay::from([("A1".to_string(), true)]);
        save_overlay(&mut kv, &overlay).unwrap();
        assert!(tmp.path().join("nested").join("ticketAttendance.json").exists());
        assert_eq!(load_overlay(&kv), overlay);
        clear_overlay(&mut kv).unwrap();
        assert!(load_overlay(&kv).is_empty());
        clear_overlay(&mut kv).unwrap();
    }
}
