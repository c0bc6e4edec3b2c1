//! Pure view functions over a record sequence: filter → sort → paginate

pub mod sort;

#[cfg(test)]
mod test;

use rayon::prelude::*;

use crate::record::Record;

pub use sort::{sort, SortDirection};

/// Threshold for using parallel processing (rows)
pub(crate) const PARALLEL_THRESHOLD: usize = 10_000;

/// Case-insensitive substring match against any field value, id included.
/// An empty term keeps everything.
pub fn filter<'a>(records: &'a [Record], term: &str) -> Vec<&'a Record> {
    if term.is_empty() {
        return records.iter().collect();
    }

    let needle = term.to_lowercase();
    let matches = |r: &&Record| record_matches(r, &needle);

    if records.len() >= PARALLEL_THRESHOLD {
        records.par_iter().filter(matches).collect()
    } else {
        records.iter().filter(matches).collect()
    }
}

/// `needle` must already be lower-cased
fn record_matches(record: &Record, needle: &str) -> bool {
    record
        .values()
        .any(|v| v.to_string().to_lowercase().contains(needle))
}

/// The `page`-th slice of `page_size` items, clamped to what exists.
/// Out-of-range pages are empty.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page.saturating_mul(page_size).min(items.len());
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// Number of pages needed for `len` items; zero for an empty input
pub fn page_count(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        len.div_ceil(page_size)
    }
}

/// Everything the pipeline needs besides the records themselves
#[derive(Debug, Clone, Copy)]
pub struct QueryParams<'q> {
    pub term: &'q str,
    pub sort_by: Option<&'q str>,
    pub direction: SortDirection,
    pub page: usize,
    pub page_size: usize,
}

/// The result of running the pipeline
#[derive(Debug, Clone)]
pub struct PageView<'a> {
    /// Rows on the requested page
    pub rows: Vec<&'a Record>,
    /// Rows that passed the filter, across all pages
    pub matched: usize,
    /// Rows before filtering
    pub total: usize,
    pub page: usize,
    pub page_count: usize,
}

/// Run filter → sort → paginate
pub fn run<'a>(records: &'a [Record], params: QueryParams<'_>) -> PageView<'a> {
    let filtered = filter(records, params.term);
    let sorted = sort(filtered, params.sort_by, params.direction);
    let rows = paginate(&sorted, params.page, params.page_size).to_vec();

    PageView {
        matched: sorted.len(),
        total: records.len(),
        page: params.page,
        page_count: page_count(sorted.len(), params.page_size),
        rows,
    }
}
