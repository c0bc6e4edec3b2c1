use super::*;
use crate::record::{sample_records, Value};

fn make_records(rows: Vec<(&str, &str, u8, &str)>) -> Vec<Record> {
    rows.into_iter()
        .enumerate()
        .map(|(i, (name, email, age, role))| {
            Record::with_fields((i + 1).to_string().as_str().into(), name, email, age, role)
        })
        .collect()
}

fn ids(rows: &[&Record]) -> Vec<String> {
    rows.iter().map(|r| r.id().to_string()).collect()
}

fn staff() -> Vec<Record> {
    make_records(vec![
        ("John Doe", "john@example.com", 30, "Developer"),
        ("Jane Smith", "jane@example.com", 28, "Designer"),
        ("Bob Johnson", "bob@example.com", 35, "Manager"),
        ("Alice Brown", "alice@example.com", 32, "Developer"),
        ("Charlie Wilson", "charlie@example.com", 29, "Analyst"),
        ("Dana White", "dana@example.com", 30, "designer"),
        ("Eve Black", "eve@example.com", 41, "Manager"),
    ])
}

// === filter ===

#[test]
fn filter_empty_term_is_identity() {
    let data = staff();
    let out = filter(&data, "");
    assert_eq!(out.len(), data.len());
    assert_eq!(ids(&out), ids(&data.iter().collect::<Vec<_>>()));
}

#[test]
fn filter_is_case_insensitive_substring() {
    let data = staff();
    let out = filter(&data, "DESIGN");
    assert_eq!(ids(&out), vec!["2", "6"]);
}

#[test]
fn filter_matches_numbers_and_ids() {
    let data = staff();
    // age 41 and nothing else contains "41"
    assert_eq!(ids(&filter(&data, "41")), vec!["7"]);
    // id "3" plus age 30/35/32 etc. all stringify with a 3
    let threes = filter(&data, "3");
    assert!(threes.iter().any(|r| r.id().as_str() == "3"));
}

#[test]
fn filter_matches_extra_fields() {
    let mut data = staff();
    data[4].extra.insert("team".into(), Value::text("Platform"));
    assert_eq!(ids(&filter(&data, "platf")), vec!["5"]);
}

#[test]
fn filter_result_is_subset_with_a_matching_field() {
    let data = staff();
    for term in ["o", "ex", "dev", "2", "zzz", "@"] {
        let out = filter(&data, term);
        let needle = term.to_lowercase();
        for r in &out {
            assert!(data.iter().any(|d| std::ptr::eq(d, *r)));
            assert!(r.values().any(|v| v.to_string().to_lowercase().contains(&needle)));
        }
        // and nothing that matches was dropped
        let expected = data
            .iter()
            .filter(|d| d.values().any(|v| v.to_string().to_lowercase().contains(&needle)))
            .count();
        assert_eq!(out.len(), expected);
    }
}

#[test]
fn filter_parallel_path_preserves_order() {
    let data: Vec<Record> = (0..PARALLEL_THRESHOLD + 5)
        .map(|i| {
            let role = if i % 2 == 0 { "even" } else { "odd" };
            Record::with_fields(format!("r{}", i).as_str().into(), "n", "n@x.io", 1, role)
        })
        .collect();

    let out = filter(&data, "even");
    assert_eq!(out.len(), (PARALLEL_THRESHOLD + 5).div_ceil(2));
    assert!(out.windows(2).all(|w| {
        let a: usize = w[0].id().as_str()[1..].parse().unwrap();
        let b: usize = w[1].id().as_str()[1..].parse().unwrap();
        a < b
    }));
}

// === sort ===

#[test]
fn sort_is_a_permutation_and_idempotent() {
    let data = staff();
    for key in ["name", "email", "age", "role", "id"] {
        for dir in [SortDirection::Ascending, SortDirection::Descending] {
            let once = sort(data.iter().collect(), Some(key), dir);
            let mut sorted_ids = ids(&once);
            sorted_ids.sort();
            let mut original_ids = ids(&data.iter().collect::<Vec<_>>());
            original_ids.sort();
            assert_eq!(sorted_ids, original_ids);

            let twice = sort(once.clone(), Some(key), dir);
            assert_eq!(ids(&twice), ids(&once));
        }
    }
}

#[test]
fn sort_reversing_direction_reverses_distinct_keys() {
    let data = staff();
    let asc = sort(data.iter().collect(), Some("name"), SortDirection::Ascending);
    let desc = sort(data.iter().collect(), Some("name"), SortDirection::Descending);

    let mut reversed = ids(&asc);
    reversed.reverse();
    assert_eq!(ids(&desc), reversed);
}

#[test]
fn sort_age_ties_keep_input_order() {
    let data = staff();
    let asc = sort(data.iter().collect(), Some("age"), SortDirection::Ascending);
    assert_eq!(ids(&asc), vec!["2", "5", "1", "6", "4", "3", "7"]);

    let desc = sort(data.iter().collect(), Some("age"), SortDirection::Descending);
    assert_eq!(ids(&desc), vec!["7", "3", "4", "1", "6", "5", "2"]);
}

// === paginate ===

#[test]
fn paginate_slices_and_clamps() {
    let items: Vec<u32> = (0..25).collect();
    assert_eq!(paginate(&items, 0, 10), &items[0..10]);
    assert_eq!(paginate(&items, 2, 10), &items[20..25]);
    assert!(paginate(&items, 3, 10).is_empty());
    assert!(paginate(&items, usize::MAX, 10).is_empty());
    assert!(paginate(&items, 0, 0).is_empty());
}

#[test]
fn paginate_concatenation_reconstructs_input() {
    let items: Vec<u32> = (0..23).collect();
    for size in 1..=25 {
        let pages = page_count(items.len(), size);
        let mut joined = Vec::new();
        for p in 0..pages {
            let page = paginate(&items, p, size);
            assert!(page.len() <= size);
            joined.extend_from_slice(page);
        }
        assert_eq!(joined, items);
    }
}

#[test]
fn page_count_edges() {
    assert_eq!(page_count(0, 10), 0);
    assert_eq!(page_count(10, 10), 1);
    assert_eq!(page_count(11, 10), 2);
    assert_eq!(page_count(5, 0), 0);
}

// === pipeline ===

#[test]
fn run_filters_then_sorts_then_pages() {
    let data = staff();
    let view = run(
        &data,
        QueryParams {
            term: "example",
            sort_by: Some("age"),
            direction: SortDirection::Descending,
            page: 1,
            page_size: 3,
        },
    );

    assert_eq!(view.total, 7);
    assert_eq!(view.matched, 7);
    assert_eq!(view.page_count, 3);
    assert_eq!(ids(&view.rows), vec!["1", "6", "5"]);
}

#[test]
fn run_out_of_range_page_is_empty() {
    let data = sample_records();
    let view = run(
        &data,
        QueryParams {
            term: "",
            sort_by: None,
            direction: SortDirection::Ascending,
            page: 4,
            page_size: 10,
        },
    );
    assert!(view.rows.is_empty());
    assert_eq!(view.matched, 5);
    assert_eq!(view.page_count, 1);
}
