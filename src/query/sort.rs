//! Sorting functionality for record views

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::record::{Record, ValueRef};
use super::PARALLEL_THRESHOLD;

/// Sorting direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reverse(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    /// Direction after a header click on `clicked`, given the current key.
    /// The same key flips direction; a different key starts ascending.
    pub fn next_for(self, current_key: Option<&str>, clicked: &str) -> Self {
        if current_key == Some(clicked) {
            self.reverse()
        } else {
            SortDirection::Ascending
        }
    }

    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            other => Err(format!("Invalid sort direction: '{}'. Use asc or desc.", other)),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        })
    }
}

/// How a key column is compared, decided once per sort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Numeric,
    Text,
}

/// Numeric when every present value of `key` is a number, text otherwise.
/// A column mixing numbers and text is compared entirely as text.
// Comparing number pairs numerically and other pairs as text is not
// transitive, and `sort_by` needs a total order.
pub fn probe_sort_mode(rows: &[&Record], key: &str) -> SortMode {
    let all_numeric = rows
        .iter()
        .filter_map(|r| r.get(key))
        .all(|v| v.as_number().is_some());

    if all_numeric {
        SortMode::Numeric
    } else {
        SortMode::Text
    }
}

#[derive(Debug)]
enum SortValue {
    /// `None` for records without the field; these sort after every number
    Number(Option<f64>),
    Text(String),
}

fn sort_value(value: Option<ValueRef<'_>>, mode: SortMode) -> SortValue {
    match mode {
        SortMode::Numeric => SortValue::Number(value.and_then(|v| v.as_number())),
        SortMode::Text => SortValue::Text(
            value.map(|v| v.to_string().to_lowercase()).unwrap_or_default(),
        ),
    }
}

fn compare_values(a: &SortValue, b: &SortValue) -> Ordering {
    match (a, b) {
        (SortValue::Number(a), SortValue::Number(b)) => match (a, b) {
            (Some(a), Some(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
        // one mode per sort, never mixed
        _ => Ordering::Equal,
    }
}

/// Sort rows by field `key`. `None` keeps the input order.
///
/// Stable: rows with equal keys keep their relative order in either
/// direction. Uses parallel sorting for large inputs.
pub fn sort<'a>(
    rows: Vec<&'a Record>,
    key: Option<&str>,
    direction: SortDirection,
) -> Vec<&'a Record> {
    let Some(key) = key else {
        return rows;
    };

    let mode = probe_sort_mode(&rows, key);
    let use_parallel = rows.len() >= PARALLEL_THRESHOLD;

    let mut keyed: Vec<(SortValue, &'a Record)> = if use_parallel {
        rows.into_par_iter()
            .map(|r| (sort_value(r.get(key), mode), r))
            .collect()
    } else {
        rows.into_iter()
            .map(|r| (sort_value(r.get(key), mode), r))
            .collect()
    };

    let cmp_fn = |(a, _): &(SortValue, &'a Record), (b, _): &(SortValue, &'a Record)| {
        direction.apply(compare_values(a, b))
    };

    // both are stable merge sorts
    if use_parallel {
        keyed.par_sort_by(cmp_fn);
    } else {
        keyed.sort_by(cmp_fn);
    }

    keyed.into_iter().map(|(_, r)| r).collect()
}
