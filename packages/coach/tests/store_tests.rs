//! Document store round trips against a real directory

mod common;

use common::{date, sample_pool};
use renshu_coach::coach::persistence::{POOL_FILE, STATE_FILE};
use renshu_coach::coach::types::{Category, LearnerState, START_LEVEL};
use renshu_coach::coach::{DocumentStore, Documents, StoreError};

#[tokio::test]
async fn missing_documents_load_as_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::new(dir.path());

    let documents = store.load().await.unwrap();
    assert!(documents.pool.is_empty());
    assert_eq!(documents.state.productive, START_LEVEL);
    assert_eq!(documents.state.last_update_id, 0);
}

#[tokio::test]
async fn whitespace_only_document_loads_as_default() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(STATE_FILE), "  \n").unwrap();

    let state = DocumentStore::new(dir.path()).load_state().await.unwrap();
    assert_eq!(state, LearnerState::default());
}

#[tokio::test]
async fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::new(dir.path().join("nested"));
    let mut state = LearnerState {
        productive: 2.4,
        receptive: 1.7,
        last_update_id: 99,
        last_quiz_date: Some(date(2025, 4, 2)),
        pending_answers: "A1 ...".into(),
        ..LearnerState::default()
    };
    state.history.push("2025-04-02: 私は学生です".into(), 100);
    let documents = Documents {
        pool: sample_pool(&[("猫", 3), ("～ながら", 1)]),
        state,
    };

    store.save(&documents).await.unwrap();
    let loaded = store.load().await.unwrap();

    assert_eq!(loaded, documents);
    assert!(!store.state_path().with_extension("json.tmp").exists());
    assert!(!store.pool_path().with_extension("json.tmp").exists());
    let raw = std::fs::read_to_string(store.state_path()).unwrap();
    assert!(raw.ends_with('\n'));
}

#[tokio::test]
async fn partial_state_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(STATE_FILE),
        r#"{"last_update_id": 42, "receptive": 2.5}"#,
    )
    .unwrap();

    let state = DocumentStore::new(dir.path()).load_state().await.unwrap();
    assert_eq!(state.last_update_id, 42);
    assert_eq!(state.receptive, 2.5);
    assert_eq!(state.productive, START_LEVEL);
    assert!(state.history.is_empty());
}

#[tokio::test]
async fn legacy_pool_keys_load_and_weights_are_repaired() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(POOL_FILE),
        r#"{"words": [
            {"kanji": "勉強", "kana": "べんきょう", "meaning": "study", "type": "word", "count": 4, "added_date": "2024-12-01"},
            {"kanji": "～ように", "kana": "", "meaning": "so that", "type": "grammar", "count": 0},
            {"kanji": "試験", "kana": "しけん", "meaning": "exam", "type": "something-else"}
        ]}"#,
    )
    .unwrap();

    let pool = DocumentStore::new(dir.path()).load_pool().await.unwrap();
    assert_eq!(pool.len(), 3);
    let study = pool.get("勉強").unwrap();
    assert_eq!(study.weight, 4);
    assert_eq!(study.added, Some(date(2024, 12, 1)));
    assert_eq!(pool.get("～ように").map(|w| (w.category, w.weight)), Some((Category::Grammar, 1)));
    assert_eq!(pool.get("試験").map(|w| (w.category, w.weight)), Some((Category::Word, 1)));
}

#[tokio::test]
async fn corrupt_document_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(POOL_FILE), "{\"words\": [").unwrap();

    let err = DocumentStore::new(dir.path()).load().await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { .. }));
}

#[tokio::test]
async fn failed_pool_write_keeps_previous_watermark() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::new(dir.path());
    let saved = Documents {
        pool: sample_pool(&[("猫", 1)]),
        state: LearnerState { last_update_id: 10, ..LearnerState::default() },
    };
    store.save(&saved).await.unwrap();

    // a directory squatting on the temp path makes the pool write fail
    std::fs::create_dir(store.pool_path().with_extension("json.tmp")).unwrap();
    let next = Documents {
        pool: sample_pool(&[("猫", 1), ("犬", 1)]),
        state: LearnerState { last_update_id: 20, ..LearnerState::default() },
    };

    let err = store.save(&next).await.unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));
    assert_eq!(store.load().await.unwrap(), saved);
}
