//! Caller-side staging buffers for inline row editing
//!
//! The store only tracks which rows are in edit mode. Uncommitted values
//! live here and reach the store through `update_row` on commit only.

use std::collections::BTreeMap;

use tracing::debug;

use crate::record::{RecordId, RecordPatch, Value};
use super::TableState;

#[derive(Debug, Default)]
pub struct EditSession {
    staged: BTreeMap<RecordId, RecordPatch>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the row into a staging buffer and enter edit mode.
    /// Returns `false` for unknown rows or rows already being edited.
    pub fn begin(&mut self, state: &mut TableState, id: &RecordId) -> bool {
        if state.is_editing(id) {
            return false;
        }
        let Some(record) = state.row(id) else {
            return false;
        };

        self.staged.insert(id.clone(), record.to_patch());
        state.toggle_editing_row(id);
        true
    }

    /// Stage a value for a row in edit mode
    pub fn set_field(&mut self, id: &RecordId, field: &str, value: Value) -> bool {
        match self.staged.get_mut(id) {
            Some(patch) => {
                patch.set(field, value);
                true
            }
            None => false,
        }
    }

    /// Stage raw input, typed by the matching column when there is one
    pub fn set_field_input(
        &mut self,
        state: &TableState,
        id: &RecordId,
        field: &str,
        raw: &str,
    ) -> bool {
        let value = match state.column(field) {
            Some(column) => column.coerce(raw),
            None => Value::text(raw),
        };
        self.set_field(id, field, value)
    }

    pub fn staged(&self, id: &RecordId) -> Option<&RecordPatch> {
        self.staged.get(id)
    }

    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    /// Apply one row's buffer, leave edit mode and drop the buffer
    pub fn commit(&mut self, state: &mut TableState, id: &RecordId) -> bool {
        let Some(patch) = self.staged.remove(id) else {
            return false;
        };
        debug!(%id, fields = patch.len(), "Committing row edit");
        state.update_row(id, &patch);
        if state.is_editing(id) {
            state.toggle_editing_row(id);
        }
        true
    }

    /// Apply every buffer, then clear edit mode for all rows.
    /// Returns how many rows were committed.
    pub fn commit_all(&mut self, state: &mut TableState) -> usize {
        let staged = std::mem::take(&mut self.staged);
        let count = staged.len();
        for (id, patch) in &staged {
            state.update_row(id, patch);
        }
        state.clear_editing_rows();
        debug!(rows = count, "Committed all edits");
        count
    }

    /// Drop one row's buffer and leave edit mode without touching the row
    pub fn cancel(&mut self, state: &mut TableState, id: &RecordId) {
        self.staged.remove(id);
        if state.is_editing(id) {
            state.toggle_editing_row(id);
        }
    }

    /// Drop every buffer and clear edit mode
    pub fn cancel_all(&mut self, state: &mut TableState) {
        self.staged.clear();
        state.clear_editing_rows();
    }
}
