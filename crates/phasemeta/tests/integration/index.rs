use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use phasemeta::{FetchError, LazyFetchCell, Phase, PhaseIndexBuilder};

use crate::utils::{CountingSource, record, setup};

#[tokio::test]
async fn test_duplicate_phase_ids_collapse() {
    setup();
    let source = CountingSource::new(vec![record(1, "A", "K"), record(1, "B", "L")]);
    let builder = PhaseIndexBuilder::new(LazyFetchCell::new(Arc::clone(&source)));

    let index = builder.build_default_index::<u32>().await.unwrap();

    assert_eq!(index.len(), 1);
    let (phase, value) = index.get_key_value(&1).unwrap();
    assert_eq!(phase.phase_type.as_deref(), Some("B"));
    assert_eq!(phase.product_letter.as_deref(), Some("L"));
    assert_eq!(*value, 0);
}

#[tokio::test]
async fn test_value_types_share_one_fetch() {
    setup();
    let source = CountingSource::new(vec![
        record(1, "Fab", "K"),
        record(2, "Sort", "K"),
        record(3, "Test", "M"),
    ]);
    let builder = PhaseIndexBuilder::new(LazyFetchCell::new(Arc::clone(&source)));

    let counts = builder.build_default_index::<u64>().await.unwrap();
    let labels = builder
        .build_index(|| String::from("unassigned"))
        .await
        .unwrap();

    let count_keys: HashSet<&Phase> = counts.keys().collect();
    let label_keys: HashSet<&Phase> = labels.keys().collect();
    assert_eq!(count_keys, label_keys);
    assert!(counts.values().all(|count| *count == 0));
    assert!(labels.values().all(|label| label == "unassigned"));

    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_concurrent_builders_single_fetch() {
    setup();
    let source = CountingSource::new(vec![record(7, "Fab", "K"), record(8, "Fab", "K")]);
    let builder = PhaseIndexBuilder::new(LazyFetchCell::new(Arc::clone(&source)));

    let indexes = join_all((0..10).map(|_| builder.build_default_index::<bool>())).await;

    for index in indexes {
        let index = index.unwrap();
        assert_eq!(index.len(), 2);
        assert!(index.contains_key(&7));
    }
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_fetch_error_is_passed_through() {
    setup();
    let source = CountingSource::failing_first(vec![record(1, "Fab", "K")], 2);
    let builder = PhaseIndexBuilder::new(LazyFetchCell::new(Arc::clone(&source)));

    let err = builder.build_default_index::<i32>().await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout(_)), "{err:?}");
    // the fetch and its eager re-fetch both failed
    assert_eq!(source.calls(), 2);

    let index = builder.build_default_index::<i32>().await.unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(source.calls(), 3);

    let records = builder.cell().get_or_fetch().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(source.calls(), 3);
}
