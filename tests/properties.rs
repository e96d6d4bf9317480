//! Property tests for the filter reducer, cross-filtering and binning.

use std::collections::BTreeSet;

use proptest::prelude::*;

use cohort_explorer::data::cross::cross_filter;
use cohort_explorer::data::filter::{reduce_all, Filter, FilterValue, TimeRange};
use cohort_explorer::data::model::{Column, ColumnType, Entity, EntityKind, EntityTable};
use cohort_explorer::views::bins::interval_bins;

const BLOOD_TYPES: [&str; 4] = ["A", "B", "AB", ""];

fn columns() -> Vec<Column> {
    vec![
        Column::new("PID", ColumnType::Pid, 0),
        Column::new("Age", ColumnType::Number, 1),
        Column::new("Blood Type", ColumnType::Category, 2),
        Column::new("Visit", ColumnType::Timestamp, 3),
    ]
}

fn arb_rows() -> impl Strategy<Value = Vec<Entity>> {
    prop::collection::vec(
        (
            prop::option::of(0u8..100),
            0usize..BLOOD_TYPES.len(),
            prop::option::of(0i64..1_000_000),
        ),
        0..40,
    )
    .prop_map(|cells| {
        cells
            .into_iter()
            .enumerate()
            .map(|(i, (age, blood, visit))| {
                let pid = format!("p{i}");
                Entity::new(
                    pid.clone(),
                    vec![
                        pid,
                        age.map(|a| a.to_string()).unwrap_or_default(),
                        BLOOD_TYPES[blood].to_string(),
                        visit.map(|v| v.to_string()).unwrap_or_default(),
                    ],
                )
            })
            .collect()
    })
}

fn arb_filter() -> impl Strategy<Value = Filter> {
    let cols = columns();
    let age = cols[1].clone();
    let blood = cols[2].clone();
    let visit = cols[3].clone();
    prop_oneof![
        (0.0f64..100.0, 0.0f64..100.0, any::<bool>()).prop_map(move |(from, to, to_inclusive)| {
            Filter::new(age.clone(), FilterValue::Number { from, to, to_inclusive }).unwrap()
        }),
        prop::sample::subsequence(BLOOD_TYPES.to_vec(), 0..=BLOOD_TYPES.len()).prop_map(
            move |picked| {
                let categories: BTreeSet<String> = picked.iter().map(|c| c.to_string()).collect();
                Filter::new(blood.clone(), FilterValue::Category { categories }).unwrap()
            }
        ),
        (
            prop::option::of(0i64..1_000_000),
            prop::option::of(0i64..1_000_000),
            any::<bool>()
        )
            .prop_map(move |(millis_from, millis_to, to_inclusive)| {
                let range = TimeRange { millis_from, millis_to, to_inclusive };
                Filter::new(visit.clone(), FilterValue::Timestamp(range)).unwrap()
            }),
    ]
}

fn uids(rows: &[&Entity]) -> Vec<String> {
    rows.iter().map(|e| e.uid.to_string()).collect()
}

/// Whether `sub` appears in `all` in the same relative order.
fn is_subsequence(sub: &[String], all: &[String]) -> bool {
    let mut rest = all.iter();
    sub.iter().all(|s| rest.any(|a| a == s))
}

proptest! {
    #[test]
    fn reduce_keeps_a_subsequence(rows in arb_rows(), filters in prop::collection::vec(arb_filter(), 0..4)) {
        let all: Vec<&Entity> = rows.iter().collect();
        let kept = reduce_all(&rows, &filters);
        prop_assert!(is_subsequence(&uids(&kept), &uids(&all)));
    }

    #[test]
    fn no_filters_is_identity(rows in arb_rows()) {
        let all: Vec<&Entity> = rows.iter().collect();
        prop_assert_eq!(reduce_all(&rows, &[]), all);
    }

    #[test]
    fn same_filter_twice_changes_nothing(rows in arb_rows(), filter in arb_filter()) {
        let once = reduce_all(&rows, std::slice::from_ref(&filter));
        let twice = reduce_all(&rows, &[filter.clone(), filter.clone()]);
        let again = reduce_all(once.iter().copied(), std::slice::from_ref(&filter));
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(&once, &again);
    }

    #[test]
    fn filter_order_does_not_matter(rows in arb_rows(), a in arb_filter(), b in arb_filter()) {
        prop_assert_eq!(
            reduce_all(&rows, &[a.clone(), b.clone()]),
            reduce_all(&rows, &[b, a])
        );
    }

    #[test]
    fn cross_filtered_rows_stay_in_order(rows in arb_rows(), filter in arb_filter()) {
        let patients = EntityTable::new(EntityKind::Patients, columns(), rows.clone());
        let events = EntityTable::new(EntityKind::Events, columns(), rows);
        let cross = cross_filter(&patients, &events, EntityKind::Patients, std::slice::from_ref(&filter));
        prop_assert!(cross.patients.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(cross.events.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(cross.patients.iter().all(|&i| i < patients.len()));
        // Events share the patients' pids, so both sides keep the same rows.
        prop_assert_eq!(&cross.patients, &cross.events);
    }

    #[test]
    fn bin_edges_ignore_filter_state(rows in arb_rows(), filter in arb_filter(), target in 1usize..50) {
        let visit = columns()[3].clone();
        let all: Vec<&Entity> = rows.iter().collect();
        let filtered = reduce_all(&rows, std::slice::from_ref(&filter));

        let unfiltered = interval_bins(&visit, &all, &all, target);
        let bins = interval_bins(&visit, &all, &filtered, target);
        prop_assert_eq!(unfiltered.len(), bins.len());
        for (u, b) in unfiltered.iter().zip(&bins) {
            prop_assert_eq!((u.x0, u.x1), (b.x0, b.x1));
            prop_assert_eq!(u.filtered_in, b.filtered_in + b.filtered_out);
        }
        let counted: usize = bins.iter().map(|b| b.filtered_in).sum();
        let with_visit = filtered.iter().filter(|e| !e.values[3].is_empty()).count();
        prop_assert_eq!(counted, with_visit);
    }
}
