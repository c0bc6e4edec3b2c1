//! Durable storage for the persisted subset of table state (columns, theme)
//!
//! Preferences are kept as a versioned TOML snapshot under a fixed namespace
//! key in a key-value store. A snapshot whose version is missing or differs
//! from `PREFS_VERSION` is discarded and defaults are used instead.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::column::{default_columns, Column};
use crate::theme::ThemeMode;

/// Schema version of the stored snapshot
pub const PREFS_VERSION: u32 = 1;

/// Key the snapshot is stored under unless configured otherwise
pub const DEFAULT_NAMESPACE: &str = "root";

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("Failed to access preference storage: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse preferences: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize preferences: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Stored preference version {found:?} does not match {expected}")]
    VersionMismatch { found: Option<u32>, expected: u32 },

    #[error("Invalid preference key: '{0}'")]
    InvalidKey(String),

    #[error("Stored preferences repeat column id '{0}'")]
    DuplicateColumn(String),
}

/// String key-value storage that survives restarts
pub trait PreferenceStore {
    fn read(&self, key: &str) -> Result<Option<String>, PrefsError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), PrefsError>;
}

/// In-process store; nothing survives the session
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, PrefsError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.toml` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PrefsError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(PrefsError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.toml", key)))
    }
}

impl PreferenceStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, PrefsError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Written to a temp file in the same directory, then renamed into place
    fn write(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// The persisted subset of table state
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub columns: Vec<Column>,
    pub theme: ThemeMode,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            theme: ThemeMode::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    version: Option<u32>,
    theme: ThemeMode,
    columns: Vec<Column>,
}

impl Preferences {
    /// Parse a stored snapshot, rejecting other schema versions and
    /// repeated column ids. Reserved-field columns missing from the
    /// snapshot are appended.
    pub fn decode(text: &str) -> Result<Self, PrefsError> {
        let snapshot: Snapshot = toml::from_str(text)?;
        if snapshot.version != Some(PREFS_VERSION) {
            return Err(PrefsError::VersionMismatch {
                found: snapshot.version,
                expected: PREFS_VERSION,
            });
        }

        let mut columns = snapshot.columns;
        if let Some(dup) = first_repeated_id(&columns) {
            return Err(PrefsError::DuplicateColumn(dup));
        }

        for reserved in default_columns() {
            if !columns.iter().any(|c| c.id == reserved.id) {
                debug!(id = %reserved.id, "Restoring reserved column");
                columns.push(reserved);
            }
        }

        Ok(Self {
            columns,
            theme: snapshot.theme,
        })
    }

    pub fn encode(&self) -> Result<String, PrefsError> {
        let snapshot = Snapshot {
            version: Some(PREFS_VERSION),
            theme: self.theme,
            columns: self.columns.clone(),
        };
        Ok(toml::to_string_pretty(&snapshot)?)
    }
}

fn first_repeated_id(columns: &[Column]) -> Option<String> {
    let mut seen = HashSet::with_capacity(columns.len());
    columns
        .iter()
        .find(|c| !seen.insert(c.id.as_str()))
        .map(|c| c.id.clone())
}

/// Binds a store to the namespace the snapshot lives under
pub struct PreferenceAdapter {
    store: Box<dyn PreferenceStore>,
    namespace: String,
}

impl PreferenceAdapter {
    pub fn new(store: Box<dyn PreferenceStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Rehydrate preferences. Anything unreadable, unparsable or from another
    /// schema version falls back to defaults.
    pub fn load(&self) -> Preferences {
        let text = match self.store.read(&self.namespace) {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!(namespace = %self.namespace, "No stored preferences, using defaults");
                return Preferences::default();
            }
            Err(e) => {
                warn!(namespace = %self.namespace, error = %e, "Failed to read preferences");
                return Preferences::default();
            }
        };

        match Preferences::decode(&text) {
            Ok(prefs) => {
                info!(
                    namespace = %self.namespace,
                    columns = prefs.columns.len(),
                    theme = %prefs.theme,
                    "Preferences restored"
                );
                prefs
            }
            Err(e) => {
                warn!(namespace = %self.namespace, error = %e, "Discarding stored preferences");
                Preferences::default()
            }
        }
    }

    pub fn save(&mut self, prefs: &Preferences) -> Result<(), PrefsError> {
        let text = prefs.encode()?;
        self.store.write(&self.namespace, &text)?;
        debug!(namespace = %self.namespace, "Preferences saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnType;

    fn custom_prefs() -> Preferences {
        let mut columns = default_columns();
        columns[1].visible = false;
        columns.push(Column::from_label("Start Date", ColumnType::Text));
        Preferences {
            columns,
            theme: ThemeMode::Dark,
        }
    }

    #[test]
    fn test_encode_decode() {
        let prefs = custom_prefs();
        let text = prefs.encode().unwrap();
        assert!(text.contains("version = 1"));
        assert!(text.contains("type = \"email\""));
        assert_eq!(Preferences::decode(&text).unwrap(), prefs);
    }

    #[test]
    fn test_version_gate() {
        let text = custom_prefs().encode().unwrap();

        let bumped = text.replace("version = 1", "version = 2");
        assert!(matches!(
            Preferences::decode(&bumped),
            Err(PrefsError::VersionMismatch { found: Some(2), expected: 1 })
        ));

        let missing = text.replace("version = 1", "");
        assert!(matches!(
            Preferences::decode(&missing),
            Err(PrefsError::VersionMismatch { found: None, .. })
        ));
    }

    #[test]
    fn test_repeated_column_id_is_rejected() {
        let text = "version = 1\ntheme = \"dark\"\n\n\
                    [[columns]]\nid = \"team\"\nlabel = \"Team\"\nvisible = true\nsortable = true\ntype = \"text\"\n\n\
                    [[columns]]\nid = \"team\"\nlabel = \"Team\"\nvisible = true\nsortable = true\ntype = \"text\"\n";
        assert!(matches!(
            Preferences::decode(text),
            Err(PrefsError::DuplicateColumn(id)) if id == "team"
        ));

        let mut store = MemoryStore::new();
        store.write("root", text).unwrap();
        let adapter = PreferenceAdapter::new(Box::new(store), "root");
        assert_eq!(adapter.load(), Preferences::default());
    }

    #[test]
    fn test_missing_reserved_columns_are_restored() {
        let prefs = Preferences {
            columns: vec![Column::from_label("Team", ColumnType::Text), default_columns()[2].clone()],
            theme: ThemeMode::Dark,
        };
        let decoded = Preferences::decode(&prefs.encode().unwrap()).unwrap();

        let ids: Vec<&str> = decoded.columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["team", "age", "name", "email", "role"]);
        assert_eq!(decoded.theme, ThemeMode::Dark);
    }

    #[test]
    fn test_adapter_falls_back_to_defaults() {
        let mut store = MemoryStore::new();
        store.write("root", "version = 7\ntheme = \"dark\"\ncolumns = []\n").unwrap();
        let adapter = PreferenceAdapter::new(Box::new(store), "root");
        assert_eq!(adapter.load(), Preferences::default());

        let mut garbage = MemoryStore::new();
        garbage.write("root", "{{ not toml").unwrap();
        let adapter = PreferenceAdapter::new(Box::new(garbage), "root");
        assert_eq!(adapter.load(), Preferences::default());

        let empty = PreferenceAdapter::new(Box::new(MemoryStore::new()), "root");
        assert_eq!(empty.load(), Preferences::default());
    }

    #[test]
    fn test_adapter_roundtrip_in_memory() {
        let mut adapter = PreferenceAdapter::new(Box::new(MemoryStore::new()), "root");
        adapter.save(&custom_prefs()).unwrap();
        assert_eq!(adapter.load(), custom_prefs());
    }

    #[test]
    fn test_namespaces_are_separate() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = PreferenceAdapter::new(Box::new(FileStore::new(dir.path())), "alpha");
        let b = PreferenceAdapter::new(Box::new(FileStore::new(dir.path())), "beta");

        a.save(&custom_prefs()).unwrap();
        assert_eq!(a.load(), custom_prefs());
        assert_eq!(b.load(), Preferences::default());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("config").join("tablekit");
        let mut store = FileStore::new(&nested);

        assert_eq!(store.read("root").unwrap(), None);
        store.write("root", "hello").unwrap();
        store.write("root", "hello again").unwrap();
        assert_eq!(store.read("root").unwrap().as_deref(), Some("hello again"));
        assert!(nested.join("root.toml").exists());
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path());
        assert!(matches!(store.write("../escape", "x"), Err(PrefsError::InvalidKey(_))));
        assert!(matches!(store.read(""), Err(PrefsError::InvalidKey(_))));
    }
}
