//! The authoritative table state and the operations that mutate it

pub mod editing;


use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, Sender};

use tracing::{debug, info, warn};

use crate::column::{default_columns, slugify, Column};
use crate::config::AppConfig;
use crate::prefs::{FileStore, PreferenceAdapter, Preferences};
use crate::query::{self, PageView, QueryParams, SortDirection};
use crate::record::{sample_records, IdGenerator, Record, RecordId, RecordPatch};
use crate::theme::ThemeMode;

/// What part of the state an operation touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Data,
    Columns,
    Search,
    Sorting,
    Page,
    Editing,
    Theme,
}

/// Rows, columns and UI cursors of one table session.
///
/// Every mutation goes through the methods below and leaves the state
/// valid: record ids stay unique and column ids stay unique. Columns and
/// theme are written through to the preference adapter when one is set.
pub struct TableState {
    data: Vec<Record>,
    columns: Vec<Column>,
    search_term: String,
    sort_by: Option<String>,
    sort_order: SortDirection,
    current_page: usize,
    page_size: usize,
    editing_rows: Vec<RecordId>,
    theme: ThemeMode,

    ids: IdGenerator,
    prefs: Option<PreferenceAdapter>,
    revision: u64,
    subscribers: Vec<Sender<Change>>,
}

impl TableState {
    /// Seeded, non-persistent state
    pub fn new(page_size: usize) -> Self {
        Self::from_preferences(page_size, Preferences::default(), None)
    }

    /// Seeded state whose columns and theme come from (and go back to) `adapter`
    pub fn with_preferences(page_size: usize, adapter: PreferenceAdapter) -> Self {
        let prefs = adapter.load();
        Self::from_preferences(page_size, prefs, Some(adapter))
    }

    /// Build from config: file-backed preferences when enabled and a
    /// preference directory can be resolved
    pub fn from_config(config: &AppConfig) -> Self {
        if !config.persist_preferences {
            return Self::new(config.page_size);
        }

        match config.preferences_dir() {
            Some(dir) => {
                info!(dir = %dir.display(), namespace = %config.namespace, "Using preference store");
                let adapter =
                    PreferenceAdapter::new(Box::new(FileStore::new(dir)), config.namespace.clone());
                Self::with_preferences(config.page_size, adapter)
            }
            None => {
                warn!("No config directory available, preferences will not persist");
                Self::new(config.page_size)
            }
        }
    }

    fn from_preferences(
        page_size: usize,
        prefs: Preferences,
        adapter: Option<PreferenceAdapter>,
    ) -> Self {
        Self {
            data: sample_records(),
            columns: prefs.columns,
            search_term: String::new(),
            sort_by: None,
            sort_order: SortDirection::Ascending,
            current_page: 0,
            page_size,
            editing_rows: Vec::new(),
            theme: prefs.theme,
            ids: IdGenerator::new("row"),
            prefs: adapter,
            revision: 0,
            subscribers: Vec::new(),
        }
    }

    // === Accessors ===

    pub fn data(&self) -> &[Record] {
        &self.data
    }

    pub fn row(&self, id: &RecordId) -> Option<&Record> {
        self.data.iter().find(|r| r.id() == id)
    }

    pub fn row_count(&self) -> usize {
        self.data.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn visible_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.visible).collect()
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn sort_by(&self) -> Option<&str> {
        self.sort_by.as_deref()
    }

    pub fn sort_order(&self) -> SortDirection {
        self.sort_order
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn editing_rows(&self) -> &[RecordId] {
        &self.editing_rows
    }

    pub fn is_editing(&self, id: &RecordId) -> bool {
        self.editing_rows.contains(id)
    }

    pub fn theme(&self) -> ThemeMode {
        self.theme
    }

    pub fn is_persistent(&self) -> bool {
        self.prefs.is_some()
    }

    /// Bumped by every operation that changed something
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn preferences(&self) -> Preferences {
        Preferences {
            columns: self.columns.clone(),
            theme: self.theme,
        }
    }

    // === Derived view ===

    /// Run the query pipeline over the current rows
    pub fn view(&self) -> PageView<'_> {
        query::run(
            &self.data,
            QueryParams {
                term: &self.search_term,
                sort_by: self.sort_by.as_deref(),
                direction: self.sort_order,
                page: self.current_page,
                page_size: self.page_size,
            },
        )
    }

    /// Rows matching the current search term, ignoring pagination
    pub fn matched_count(&self) -> usize {
        if self.search_term.is_empty() {
            self.data.len()
        } else {
            query::filter(&self.data, &self.search_term).len()
        }
    }

    // === Change notification ===

    /// Receive a `Change` for every applied operation
    pub fn subscribe(&mut self) -> Receiver<Change> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, change: Change) {
        self.revision += 1;
        // drop subscribers whose receiver is gone
        self.subscribers.retain(|tx| tx.send(change).is_ok());
    }

    fn persist(&mut self) {
        let prefs = self.preferences();
        if let Some(adapter) = self.prefs.as_mut() {
            if let Err(e) = adapter.save(&prefs) {
                warn!(namespace = adapter.namespace(), error = %e, "Failed to save preferences");
            }
        }
    }

    // === Ids ===

    /// A fresh id not used by any current row
    pub fn next_id(&mut self) -> RecordId {
        loop {
            let id = self.ids.next_id();
            if self.row(&id).is_none() {
                return id;
            }
        }
    }

    /// An empty record carrying a fresh id, ready to fill and `add_row`
    pub fn new_record(&mut self) -> Record {
        Record::new(self.next_id())
    }

    /// A column id derived from `label` that no current column uses
    pub fn unique_column_id(&self, label: &str) -> String {
        let base = match slugify(label) {
            s if s.is_empty() => "column".to_string(),
            s => s,
        };
        if self.column(&base).is_none() {
            return base;
        }
        (2..)
            .map(|n| format!("{}_{}", base, n))
            .find(|candidate| self.column(candidate).is_none())
            .unwrap_or(base)
    }

    // === Row operations ===

    /// Replace every row. Duplicate ids in `records` are reassigned.
    pub fn replace_data(&mut self, records: Vec<Record>) {
        let mut seen = HashSet::with_capacity(records.len());
        let mut data = Vec::with_capacity(records.len());

        for mut record in records {
            if !seen.insert(record.id().clone()) {
                let id = self.fresh_id_excluding(&seen);
                warn!(old = %record.id(), new = %id, "Duplicate row id reassigned");
                seen.insert(id.clone());
                record.set_id(id);
            }
            data.push(record);
        }

        info!(rows = data.len(), "Table data replaced");
        self.data = data;
        self.notify(Change::Data);
    }

    fn fresh_id_excluding(&mut self, taken: &HashSet<RecordId>) -> RecordId {
        loop {
            let id = self.ids.next_id();
            if !taken.contains(&id) {
                return id;
            }
        }
    }

    /// Append a row. A record whose id is already present gets a fresh one.
    pub fn add_row(&mut self, mut record: Record) {
        if self.row(record.id()).is_some() {
            let id = self.next_id();
            warn!(old = %record.id(), new = %id, "Duplicate row id reassigned");
            record.set_id(id);
        }
        debug!(id = %record.id(), "Row added");
        self.data.push(record);
        self.notify(Change::Data);
    }

    /// Merge `patch` into the row with `id`; unknown ids and empty patches
    /// are ignored
    pub fn update_row(&mut self, id: &RecordId, patch: &RecordPatch) {
        if patch.is_empty() {
            return;
        }
        let Some(record) = self.data.iter_mut().find(|r| r.id() == id) else {
            debug!(%id, "update_row: no such row");
            return;
        };

        let rejected = record.apply(patch);
        if !rejected.is_empty() {
            debug!(%id, ?rejected, "update_row: fields left unchanged");
        }
        self.notify(Change::Data);
    }

    /// Remove the row with `id`; unknown ids are ignored
    pub fn delete_row(&mut self, id: &RecordId) {
        let before = self.data.len();
        self.data.retain(|r| r.id() != id);

        if self.data.len() == before {
            debug!(%id, "delete_row: no such row");
            return;
        }
        self.notify(Change::Data);
    }

    // === Query cursors ===

    /// Set the search term; always returns to the first page
    pub fn set_search_term(&mut self, term: &str) {
        self.search_term = term.to_string();
        self.current_page = 0;
        self.notify(Change::Search);
    }

    /// Set sort key and direction. Deciding the direction (e.g. toggling on
    /// repeated clicks) is up to the caller. The page cursor is untouched.
    pub fn set_sorting(&mut self, column: &str, direction: SortDirection) {
        self.sort_by = Some(column.to_string());
        self.sort_order = direction;
        self.notify(Change::Sorting);
    }

    /// Back to insertion order
    pub fn clear_sorting(&mut self) {
        self.sort_by = None;
        self.notify(Change::Sorting);
    }

    /// Move the page cursor. Not clamped; out-of-range pages view as empty.
    pub fn set_current_page(&mut self, page: usize) {
        self.current_page = page;
        self.notify(Change::Page);
    }

    // === Column operations ===

    /// Append a column. Returns `false` (and changes nothing) if its id is
    /// already taken.
    pub fn add_column(&mut self, column: Column) -> bool {
        if self.column(&column.id).is_some() {
            warn!(id = %column.id, "add_column: id already in use");
            return false;
        }
        info!(id = %column.id, kind = %column.kind, "Column added");
        self.columns.push(column);
        self.notify(Change::Columns);
        self.persist();
        true
    }

    /// Show or hide a column; unknown ids are ignored
    pub fn update_column_visibility(&mut self, id: &str, visible: bool) {
        let Some(column) = self.columns.iter_mut().find(|c| c.id == id) else {
            debug!(id, "update_column_visibility: no such column");
            return;
        };
        column.visible = visible;
        self.notify(Change::Columns);
        self.persist();
    }

    /// Replace the column list wholesale. Repeats of an id already in the
    /// list are dropped.
    pub fn reorder_columns(&mut self, mut columns: Vec<Column>) {
        let mut seen = HashSet::with_capacity(columns.len());
        columns.retain(|c| {
            let first = seen.insert(c.id.clone());
            if !first {
                warn!(id = %c.id, "reorder_columns: repeated column id dropped");
            }
            first
        });
        self.columns = columns;
        self.notify(Change::Columns);
        self.persist();
    }

    /// Restore the four reserved-field columns
    pub fn reset_columns(&mut self) {
        self.reorder_columns(default_columns());
    }

    // === Edit mode ===

    /// Enter edit mode for `id` if it is not editing, leave it otherwise
    pub fn toggle_editing_row(&mut self, id: &RecordId) {
        match self.editing_rows.iter().position(|r| r == id) {
            Some(pos) => {
                self.editing_rows.remove(pos);
            }
            None => self.editing_rows.push(id.clone()),
        }
        self.notify(Change::Editing);
    }

    pub fn clear_editing_rows(&mut self) {
        self.editing_rows.clear();
        self.notify(Change::Editing);
    }

    // === Theme ===

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        info!(theme = %self.theme, "Theme toggled");
        self.notify(Change::Theme);
        self.persist();
    }

    /// Switch to `mode`, toggling only if it differs from the current one
    pub fn set_theme(&mut self, mode: ThemeMode) {
        if self.theme != mode {
            self.toggle_theme();
        }
    }
}
