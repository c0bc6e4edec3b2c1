//! Plain-text rendering of the current page

use crate::column::Column;
use crate::query::PageView;
use crate::state::TableState;
use crate::util::{display_width, fit_to_width};

/// Widest a data column is allowed to grow before cells are truncated
pub const MAX_COL_WIDTH: usize = 30;
const MIN_COL_WIDTH: usize = 3;

/// Cell text for a row/column pair; absent fields render empty
fn cell_text(record: &crate::record::Record, column: &Column) -> String {
    record
        .get(&column.id)
        .map(|v| v.to_string())
        .unwrap_or_default()
}

/// Column widths from header labels and the rows on this page
fn column_widths(view: &PageView<'_>, columns: &[&Column]) -> Vec<usize> {
    columns
        .iter()
        .map(|col| {
            let content_width = view
                .rows
                .iter()
                .map(|r| display_width(&cell_text(r, col)))
                .max()
                .unwrap_or(0);
            content_width
                .max(display_width(&col.label))
                .clamp(MIN_COL_WIDTH, MAX_COL_WIDTH)
        })
        .collect()
}

/// Render visible columns of the current page as an aligned table.
/// The first column holds the row id; rows in edit mode are marked with `*`.
pub fn render_table(state: &TableState) -> String {
    let view = state.view();
    let columns = state.visible_columns();
    let widths = column_widths(&view, &columns);

    let id_width = view
        .rows
        .iter()
        .map(|r| display_width(r.id().as_str()))
        .max()
        .unwrap_or(0)
        .max(2);

    let mut out = String::new();

    // Header
    let mut line = format!("  {}", fit_to_width("id", id_width));
    for (col, w) in columns.iter().zip(&widths) {
        line.push_str(" | ");
        line.push_str(&fit_to_width(&col.label, *w));
    }
    out.push_str(line.trim_end());
    out.push('\n');

    let rule_len = display_width(&line);
    out.push_str(&"-".repeat(rule_len));
    out.push('\n');

    if view.rows.is_empty() {
        out.push_str("  (no rows)\n");
        return out;
    }

    for record in &view.rows {
        let marker = if state.is_editing(record.id()) { '*' } else { ' ' };
        let mut line = format!("{} {}", marker, fit_to_width(record.id().as_str(), id_width));
        for (col, w) in columns.iter().zip(&widths) {
            line.push_str(" | ");
            line.push_str(&fit_to_width(&cell_text(record, col), *w));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// One-line summary: page position, match counts, search, sort and theme
pub fn render_status(state: &TableState) -> String {
    let view = state.view();

    let page = if view.page_count == 0 {
        "Page 0/0".to_string()
    } else {
        format!("Page {}/{}", view.page + 1, view.page_count)
    };

    let mut parts = vec![page, format!("{} of {} rows", view.matched, view.total)];

    if !state.search_term().is_empty() {
        parts.push(format!("search \"{}\"", state.search_term()));
    }
    if let Some(key) = state.sort_by() {
        parts.push(format!("sort {} {}", key, state.sort_order()));
    }
    if !state.editing_rows().is_empty() {
        parts.push(format!("editing {}", state.editing_rows().len()));
    }
    parts.push(format!("theme {}", state.theme()));

    parts.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SortDirection;
    use crate::record::RecordId;

    #[test]
    fn test_render_table_layout() {
        let state = TableState::new(2);
        let text = render_table(&state);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("  id | Name"));
        assert!(lines[0].ends_with("Role"));
        assert!(lines[1].chars().all(|c| c == '-'));
        assert!(lines[2].contains("John Doe"));
        assert!(lines[3].contains("jane@example.com"));
    }

    #[test]
    fn test_hidden_columns_are_skipped() {
        let mut state = TableState::new(10);
        state.update_column_visibility("email", false);
        let text = render_table(&state);
        assert!(!text.contains("Email"));
        assert!(!text.contains("@example.com"));
    }

    #[test]
    fn test_editing_marker() {
        let mut state = TableState::new(10);
        state.toggle_editing_row(&RecordId::from("2"));
        let text = render_table(&state);
        let jane = text.lines().find(|l| l.contains("Jane")).unwrap();
        assert!(jane.starts_with("* 2"));
        let john = text.lines().find(|l| l.contains("John")).unwrap();
        assert!(john.starts_with("  1"));
    }

    #[test]
    fn test_empty_page() {
        let mut state = TableState::new(10);
        state.set_search_term("zzz-no-match");
        assert!(render_table(&state).contains("(no rows)"));
        assert!(render_status(&state).starts_with("Page 0/0 | 0 of 5 rows"));
    }

    #[test]
    fn test_status_line() {
        let mut state = TableState::new(2);
        state.set_sorting("age", SortDirection::Descending);
        state.set_current_page(1);
        assert_eq!(
            render_status(&state),
            "Page 2/3 | 5 of 5 rows | sort age desc | theme light"
        );
    }

    #[test]
    fn test_wide_cells_are_truncated() {
        let mut state = TableState::new(10);
        let long = "x".repeat(MAX_COL_WIDTH + 10);
        state.update_row(
            &RecordId::from("1"),
            &crate::record::RecordPatch::new().with("name", crate::record::Value::text(long.clone())),
        );
        let text = render_table(&state);
        assert!(!text.contains(&long));
        assert!(text.contains('…'));
    }
}
