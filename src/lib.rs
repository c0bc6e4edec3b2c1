//! In-memory table engine: rows and columns with search, sort and
//! pagination, CSV import/export, and persisted column/theme preferences.

pub mod column;
pub mod config;
pub mod fileio;
pub mod prefs;
pub mod query;
pub mod record;
pub mod render;
pub mod state;
pub mod theme;
pub mod util;

pub use column::{Column, ColumnType};
pub use config::{AppConfig, ConfigError};
pub use fileio::{ImportError, ImportOutcome};
pub use prefs::{FileStore, MemoryStore, PreferenceAdapter, PreferenceStore, Preferences, PrefsError};
pub use query::{PageView, SortDirection};
pub use record::{IdGenerator, Record, RecordId, RecordPatch, Value};
pub use state::editing::EditSession;
pub use state::{Change, TableState};
pub use theme::ThemeMode;
