//! End-to-end ingestion scenarios against the embedded SQLite store
//!
//! Run with: `cargo test --test ingest_scenarios`

mod common;

use common::{
    authorship, line, records, two_work_scenario, with_concepts, with_venue, work, write_jsonl,
    FlakyStore,
};
use pubgraph::ingest::{GateDecision, RepopulateReason};
use pubgraph::{
    GraphStore, IngestConfig, IngestError, Ingestor, Label, OpenStore, PropertyValue, RelType,
    SqliteStore, CONFIDENCE, POSITION, THROUGH_WORKS,
};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

async fn counts(store: &dyn GraphStore) -> (u64, u64) {
    (
        store.count_nodes().await.unwrap(),
        store.count_relationships(None).await.unwrap(),
    )
}

async fn through_works(store: &dyn GraphStore) -> Vec<(String, String, Vec<String>)> {
    let mut rels: Vec<_> = store
        .relationships(RelType::AffiliatedWith)
        .await
        .unwrap()
        .into_iter()
        .map(|r| {
            let works = r.string_list(THROUGH_WORKS);
            (r.source_id, r.target_id, works)
        })
        .collect();
    rels.sort();
    rels
}

#[tokio::test]
async fn two_record_scenario_builds_expected_graph() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let report = Ingestor::new(store.clone(), IngestConfig::default())
        .run(&records(two_work_scenario()))
        .await
        .unwrap();

    assert_eq!(store.count_nodes_with_label(Label::Work).await.unwrap(), 2);
    assert_eq!(store.count_nodes_with_label(Label::Author).await.unwrap(), 2);
    assert_eq!(store.count_nodes_with_label(Label::Institution).await.unwrap(), 1);
    assert_eq!(store.count_nodes().await.unwrap(), 5);

    // (A1,W1), (A1,W2), (A2,W2)
    assert_eq!(store.count_relationships(Some(RelType::Authored)).await.unwrap(), 3);
    assert_eq!(
        through_works(store.as_ref()).await,
        vec![("A1".into(), "I1".into(), vec!["W1".into(), "W2".into()])]
    );
    assert_eq!(report.failed(), 0);
}

#[tokio::test]
async fn affiliation_accumulates_works_in_input_order() {
    let lines = vec![
        line(vec![work("W3", vec![authorship("A1", &["I1", "I2"])])]),
        line(vec![
            work("W1", vec![authorship("A1", &["I1"])]),
            work("W2", vec![authorship("A1", &["I1"])]),
        ]),
    ];
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    Ingestor::new(store.clone(), IngestConfig::default())
        .run(&records(lines))
        .await
        .unwrap();

    assert_eq!(
        through_works(store.as_ref()).await,
        vec![
            ("A1".into(), "I1".into(), vec!["W3".into(), "W1".into(), "W2".into()]),
            ("A1".into(), "I2".into(), vec!["W3".into()]),
        ]
    );
}

#[tokio::test]
async fn duplicate_entities_become_one_node() {
    let lines = vec![
        line(vec![with_venue(
            with_concepts(work("W1", vec![authorship("A1", &["I1"])]), &[("C1", 0.9)]),
            "V1",
        )]),
        line(vec![with_venue(
            with_concepts(work("W2", vec![authorship("A1", &["I1"])]), &[("C1", 0.4)]),
            "V1",
        )]),
        // Same work again: first occurrence wins, this copy's nested data is dropped
        line(vec![work("W1", vec![authorship("A9", &["I9"])])]),
    ];
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let report = Ingestor::new(store.clone(), IngestConfig::default())
        .run(&records(lines))
        .await
        .unwrap();

    for (label, expected) in [
        (Label::Work, 2),
        (Label::Author, 1),
        (Label::Institution, 1),
        (Label::Concept, 1),
        (Label::Venue, 1),
    ] {
        assert_eq!(store.count_nodes_with_label(label).await.unwrap(), expected, "{}", label);
    }
    assert_eq!(report.dedup.for_label(Label::Work).duplicates, 1);
    assert_eq!(store.count_relationships(Some(RelType::About)).await.unwrap(), 2);
    assert_eq!(store.count_relationships(Some(RelType::PublishedIn)).await.unwrap(), 2);
}

#[tokio::test]
async fn topic_edges_carry_confidence() {
    let lines = vec![line(vec![with_concepts(work("W1", vec![]), &[("C1", 0.7)])])];
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    Ingestor::new(store.clone(), IngestConfig::default())
        .run(&records(lines))
        .await
        .unwrap();

    let about = store.relationships(RelType::About).await.unwrap();
    assert_eq!(about.len(), 1);
    assert_eq!(about[0].source_id, "W1");
    assert_eq!(about[0].target_id, "C1");
    assert_eq!(about[0].properties.get(CONFIDENCE), Some(&PropertyValue::Float(0.7)));
}

#[tokio::test]
async fn missing_and_null_fields_are_tolerated() {
    let lines = vec![
        json!({"matches": null}),
        json!({}),
        line(vec![json!({"title": "no id"})]),
        line(vec![json!({
            "id": "W1",
            "authorships": [
                {"author": null, "institutions": [{"id": "I1"}]},
                {"author": {"id": "A1"}, "institutions": null},
                {"author": {"display_name": "anonymous"}},
                {"author": {"id": "A2"}, "institutions": [{"display_name": "unknown"}]}
            ],
            "concepts": [{"display_name": "no id", "score": 0.5}],
            "host_venue": {"display_name": "no id"}
        })]),
        json!({"oalex_data": [{"id": "W2", "authorships": null, "concepts": null}]}),
    ];
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let report = Ingestor::new(store.clone(), IngestConfig::default())
        .run(&records(lines))
        .await
        .unwrap();

    assert_eq!(store.count_nodes_with_label(Label::Work).await.unwrap(), 2);
    assert_eq!(store.count_nodes_with_label(Label::Author).await.unwrap(), 2);
    // I1 is still a node; without an author it just has no affiliation
    assert_eq!(store.count_nodes_with_label(Label::Institution).await.unwrap(), 1);
    assert_eq!(store.count_nodes_with_label(Label::Concept).await.unwrap(), 0);
    assert_eq!(store.count_nodes_with_label(Label::Venue).await.unwrap(), 0);
    assert_eq!(store.count_relationships(Some(RelType::Authored)).await.unwrap(), 2);
    assert_eq!(store.count_relationships(Some(RelType::AffiliatedWith)).await.unwrap(), 0);
    assert_eq!(report.failed(), 0);
}

#[tokio::test]
async fn rerun_on_populated_store_changes_nothing() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let ingestor = Ingestor::new(store.clone(), IngestConfig::default());
    ingestor.run(&records(two_work_scenario())).await.unwrap();
    let before = (counts(store.as_ref()).await, through_works(store.as_ref()).await);

    let report = ingestor.run(&records(two_work_scenario())).await.unwrap();
    assert!(matches!(report.gate, GateDecision::AlreadyPopulated { existing: 5 }));
    assert_eq!(report.relationships_total().created, 0);
    assert_eq!(report.relationships_total().merged, 0);

    let after = (counts(store.as_ref()).await, through_works(store.as_ref()).await);
    assert_eq!(before, after);
}

#[tokio::test]
async fn forced_rebuild_reproduces_the_same_graph() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    Ingestor::new(store.clone(), IngestConfig::default())
        .run(&records(two_work_scenario()))
        .await
        .unwrap();
    let before = (counts(store.as_ref()).await, through_works(store.as_ref()).await);

    let config = IngestConfig {
        force_rebuild: true,
        ..Default::default()
    };
    let report = Ingestor::new(store.clone(), config)
        .run(&records(two_work_scenario()))
        .await
        .unwrap();
    assert_eq!(
        report.gate,
        GateDecision::Repopulate {
            reason: RepopulateReason::Forced
        }
    );
    assert_eq!(report.indexes_dropped, Label::ALL.len());

    let after = (counts(store.as_ref()).await, through_works(store.as_ref()).await);
    assert_eq!(before, after);
}

#[tokio::test]
async fn count_mismatch_wipes_before_rebuilding() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let ingestor = Ingestor::new(store.clone(), IngestConfig::default());
    ingestor.run(&records(two_work_scenario())).await.unwrap();

    let smaller = vec![line(vec![work("W9", vec![authorship("A9", &[])])])];
    let report = ingestor.run(&records(smaller)).await.unwrap();
    assert_eq!(
        report.gate,
        GateDecision::Repopulate {
            reason: RepopulateReason::CountMismatch {
                existing: 5,
                expected: 2
            }
        }
    );
    assert_eq!(counts(store.as_ref()).await, (2, 1));
    assert!(through_works(store.as_ref()).await.is_empty());
}

#[tokio::test]
async fn lookup_strategies_and_bulk_loading_agree() {
    let lines = vec![
        line(vec![with_venue(
            with_concepts(work("W1", vec![authorship("A1", &["I1"]), authorship("A2", &["I1", "I2"])]), &[("C1", 0.3)]),
            "V1",
        )]),
        line(vec![work("W2", vec![authorship("A2", &["I2"])])]),
    ];

    let configs = [
        IngestConfig::default(),
        IngestConfig {
            use_index: false,
            ..Default::default()
        },
        IngestConfig {
            use_batch_insert: true,
            chunk_size: 2,
            ..Default::default()
        },
        IngestConfig {
            use_index: false,
            use_batch_insert: true,
            ..Default::default()
        },
    ];

    let mut outcomes = Vec::new();
    for config in configs {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let report = Ingestor::new(store.clone(), config)
            .run(&records(lines.clone()))
            .await
            .unwrap();
        assert_eq!(report.failed(), 0);
        outcomes.push((counts(store.as_ref()).await, through_works(store.as_ref()).await));
    }
    for outcome in &outcomes[1..] {
        assert_eq!(outcome, &outcomes[0]);
    }
    assert_eq!(outcomes[0].0, (8, 8));
}

#[tokio::test]
async fn ingest_file_honours_row_cap_and_skips_bad_lines() {
    let dir = tempfile::tempdir().unwrap();
    let mut lines = two_work_scenario();
    lines.insert(0, json!("not a record"));
    let path = write_jsonl(dir.path(), "works.jsonl", &lines);

    let store = Arc::new(SqliteStore::open(dir.path().join("graph.db")).unwrap());
    let config = IngestConfig {
        row_cap: Some(1),
        ..Default::default()
    };
    let report = Ingestor::new(store.clone(), config).ingest_file(&path).await.unwrap();

    let read = report.read.unwrap();
    assert_eq!(read.records, 1);
    assert_eq!(read.skipped, 1);
    assert!(read.capped);
    assert_eq!(counts(store.as_ref()).await, (3, 2));
}

#[tokio::test]
async fn loosely_typed_line_is_ingested_not_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut w1 = work("W1", vec![json!(null), authorship("A1", &["I1"])]);
    w1["cited_by_count"] = json!(12.0);
    w1["authorships"][1]["institutions"] = json!([null, {"id": "I1"}]);
    w1["concepts"] = json!([{"id": "C1", "level": 1.0, "score": "0.5"}]);
    let lines = vec![line(vec![json!(null), w1, work("W2", vec![authorship("A1", &["I1"])])])];
    let path = write_jsonl(dir.path(), "works.jsonl", &lines);

    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let report = Ingestor::new(store.clone(), IngestConfig::default())
        .ingest_file(&path)
        .await
        .unwrap();

    let read = report.read.unwrap();
    assert_eq!(read.records, 1);
    assert_eq!(read.skipped, 0);
    // W1, W2, A1, I1, C1
    assert_eq!(store.count_nodes().await.unwrap(), 5);
    assert_eq!(
        through_works(store.as_ref()).await,
        vec![("A1".into(), "I1".into(), vec!["W1".into(), "W2".into()])]
    );

    let authored = store.relationships(RelType::Authored).await.unwrap();
    assert_eq!(authored.len(), 2);
    assert!(authored
        .iter()
        .all(|r| r.properties.get(POSITION) == Some(&PropertyValue::String("middle".into()))));

    let about = store.relationships(RelType::About).await.unwrap();
    assert_eq!(about.len(), 1);
    assert_eq!(about[0].properties.get(CONFIDENCE), Some(&PropertyValue::Float(0.5)));
}

#[tokio::test]
async fn missing_input_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let err = Ingestor::new(store, IngestConfig::default())
        .ingest_file(dir.path().join("absent.jsonl"))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Input { .. }));
}

#[tokio::test]
async fn unreadable_count_triggers_rebuild() {
    let store = Arc::new(FlakyStore::new());
    store.fail_count.store(true, Ordering::SeqCst);
    let report = Ingestor::new(store.clone(), IngestConfig::default())
        .run(&records(two_work_scenario()))
        .await
        .unwrap();

    assert!(matches!(
        report.gate,
        GateDecision::Repopulate {
            reason: RepopulateReason::CountUnavailable(_)
        }
    ));
    assert_eq!(store.inner().count_nodes().await.unwrap(), 5);
}

#[tokio::test]
async fn failed_merge_is_counted_and_run_continues() {
    let store = Arc::new(FlakyStore::new().failing_merges_to("I1"));
    let report = Ingestor::new(store.clone(), IngestConfig::default())
        .run(&records(two_work_scenario()))
        .await
        .unwrap();

    let affiliated = report.relationships[&RelType::AffiliatedWith];
    assert_eq!(affiliated.attempted, 2);
    assert_eq!(affiliated.failed, 2);
    assert_eq!(report.relationships[&RelType::Authored].created, 3);
    assert_eq!(report.failed(), 2);
}

#[tokio::test]
async fn unavailable_store_aborts_the_run() {
    let store = Arc::new(FlakyStore::new());
    store.store_gone.store(true, Ordering::SeqCst);
    let err = Ingestor::new(store, IngestConfig::default())
        .run(&records(two_work_scenario()))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Storage(_)));
}
