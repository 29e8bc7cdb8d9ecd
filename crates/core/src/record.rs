//! Saved field functions.
//!
//! A [`FunctionRecord`] stores the source text of a synthesized field under
//! a user-chosen name. Reloading recompiles the same text, so the restored
//! field behaves exactly like the one that was saved. [`FunctionLibrary`]
//! is a name-keyed collection persisted as a JSON object.

use crate::error::FlowError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// One saved field function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub name: String,
    pub code: String,
    /// Unix time in milliseconds.
    #[serde(rename = "savedAt")]
    pub saved_at: u64,
}

impl FunctionRecord {
    /// Creates a record stamped with the current time.
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        let saved_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            name: name.into(),
            code: code.into(),
            saved_at,
        }
    }
}

/// Saved functions keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionLibrary {
    records: BTreeMap<String, FunctionRecord>,
}

impl FunctionLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a library from a JSON file. A missing file is an empty library.
    pub fn load(path: &Path) -> Result<Self, FlowError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(FlowError::Io(format!("{}: {e}", path.display()))),
        };
        serde_json::from_str(&text)
            .map_err(|e| FlowError::Io(format!("{}: malformed library: {e}", path.display())))
    }

    /// Writes the library as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), FlowError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| FlowError::Io(format!("serialize library: {e}")))?;
        std::fs::write(path, json).map_err(|e| FlowError::Io(format!("{}: {e}", path.display())))
    }

    /// Adds a record. An existing record of the same name is replaced only
    /// when `overwrite` is set.
    pub fn insert(&mut self, record: FunctionRecord, overwrite: bool) -> Result<(), FlowError> {
        if !overwrite && self.records.contains_key(&record.name) {
            return Err(FlowError::RecordExists(record.name));
        }
        tracing::debug!(name = %record.name, overwrite, "storing function record");
        self.records.insert(record.name.clone(), record);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&FunctionRecord, FlowError> {
        self.records
            .get(name)
            .ok_or_else(|| FlowError::RecordNotFound(name.to_owned()))
    }

    pub fn remove(&mut self, name: &str) -> Result<FunctionRecord, FlowError> {
        self.records
            .remove(name)
            .ok_or_else(|| FlowError::RecordNotFound(name.to_owned()))
    }

    /// Record names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.records.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, code: &str) -> FunctionRecord {
        FunctionRecord {
            name: name.into(),
            code: code.into(),
            saved_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn new_stamps_current_time() {
        let r = FunctionRecord::new("spiral", "dx = x\ndy = y\n");
        assert!(r.saved_at > 1_600_000_000_000);
        assert_eq!(r.name, "spiral");
    }

    #[test]
    fn record_json_uses_saved_at_camel_case() {
        let json = serde_json::to_value(record("a", "dx = x")).unwrap();
        assert!(json.get("savedAt").is_some());
        assert!(json.get("saved_at").is_none());
    }

    #[test]
    fn insert_refuses_duplicate_without_overwrite() {
        let mut lib = FunctionLibrary::new();
        lib.insert(record("a", "dx = x"), false).unwrap();
        let err = lib.insert(record("a", "dx = y"), false).unwrap_err();
        assert!(matches!(err, FlowError::RecordExists(name) if name == "a"));
        lib.insert(record("a", "dx = y"), true).unwrap();
        assert_eq!(lib.get("a").unwrap().code, "dx = y");
    }

    #[test]
    fn names_are_sorted() {
        let mut lib = FunctionLibrary::new();
        for name in ["zeta", "alpha", "mid"] {
            lib.insert(record(name, "dx = x"), false).unwrap();
        }
        assert_eq!(lib.names(), vec!["alpha", "mid", "zeta"]);
        assert_eq!(lib.len(), 3);
    }

    #[test]
    fn remove_and_get_missing() {
        let mut lib = FunctionLibrary::new();
        lib.insert(record("a", "dx = x"), false).unwrap();
        assert_eq!(lib.remove("a").unwrap().name, "a");
        assert!(lib.is_empty());
        assert!(matches!(lib.remove("a"), Err(FlowError::RecordNotFound(_))));
        assert!(matches!(lib.get("a"), Err(FlowError::RecordNotFound(_))));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.json");
        let mut lib = FunctionLibrary::new();
        lib.insert(record("swirl", "dx = sin(y)\ndy = cos(x)\n"), false)
            .unwrap();
        lib.save(&path).unwrap();

        let loaded = FunctionLibrary::load(&path).unwrap();
        assert_eq!(loaded, lib);
    }

    #[test]
    fn library_file_is_object_keyed_by_name() {
        let mut lib = FunctionLibrary::new();
        lib.insert(record("swirl", "dx = x"), false).unwrap();
        let json = serde_json::to_value(&lib).unwrap();
        assert_eq!(json["swirl"]["code"], "dx = x");
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let lib = FunctionLibrary::load(&dir.path().join("absent.json")).unwrap();
        assert!(lib.is_empty());
    }

    #[test]
    fn load_malformed_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(FunctionLibrary::load(&path), Err(FlowError::Io(_))));
    }
}
