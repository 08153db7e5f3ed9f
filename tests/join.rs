//! List and field join tests.

use record_async::{
    AsyncStore, Error, FetchMode, JoinOptions, MemoryClient, RecordHandle, Resolved,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

fn test_store() -> (MemoryClient, AsyncStore) {
    let client = MemoryClient::new();
    let store = AsyncStore::new(Arc::new(client.clone()));
    (client, store)
}

fn snapshots(items: &[Resolved]) -> Vec<Value> {
    items
        .iter()
        .map(|item| item.as_snapshot().cloned().unwrap_or(Value::Null))
        .collect()
}

// --- Ordering ---

#[tokio::test]
async fn test_snapshot_join_keeps_entry_order() {
    let (client, store) = test_store();
    client.insert("r/1", json!({"x": 1}));
    client.insert("r/2", json!({"x": 2}));
    client.insert_list("L", &["r/1", "r/2"]);

    // r/2 settles well before r/1
    client.set_delay("r/1", Duration::from_millis(50));

    let list = store.get_list("L").await.unwrap();
    let items = store
        .join_list(&list, &JoinOptions::snapshots())
        .await
        .unwrap()
        .into_plain()
        .unwrap();

    assert_eq!(snapshots(&items), vec![json!({"x": 1}), json!({"x": 2})]);
}

#[tokio::test]
async fn test_reverse_latency_many_entries() {
    let (client, store) = test_store();
    let names: Vec<String> = (0..8).map(|i| format!("item/{}", i)).collect();
    for (i, name) in names.iter().enumerate() {
        client.insert(name, json!({"n": i}));
        client.set_delay(name, Duration::from_millis(5 * (8 - i as u64)));
    }
    client.insert_list("items", &names);

    let list = store.get_list("items").await.unwrap();
    let items = store
        .join_list(&list, &JoinOptions::snapshots())
        .await
        .unwrap()
        .into_plain()
        .unwrap();

    let expected: Vec<Value> = (0..8).map(|i| json!({"n": i})).collect();
    assert_eq!(snapshots(&items), expected);
}

#[tokio::test]
async fn test_cursor_join_returns_live_cursors() {
    let (client, store) = test_store();
    client.insert("r/1", json!({"x": 1}));
    client.insert("r/2", json!({"x": 2}));
    client.insert_list("L", &["r/1", "r/2"]);

    let list = store.get_list("L").await.unwrap();
    let items = store
        .join_list(&list, &JoinOptions::default())
        .await
        .unwrap()
        .into_plain()
        .unwrap();

    let names: Vec<&str> = items
        .iter()
        .map(|item| item.as_cursor().unwrap().name())
        .collect();
    assert_eq!(names, vec!["r/1", "r/2"]);

    // Cursors stay bound to the store
    client.insert("r/2", json!({"x": 20}));
    assert_eq!(items[1].data(), json!({"x": 20}));

    // One subscription for the list plus one per entry, owned by the caller
    assert_eq!(client.open_subscriptions(), 3);
    for item in &items {
        item.as_cursor().unwrap().discard();
    }
    list.discard();
    assert_eq!(client.open_subscriptions(), 0);
}

// --- Failure ---

#[tokio::test]
async fn test_member_failure_fails_join() {
    let (client, store) = test_store();
    client.insert("r/1", json!({"x": 1}));
    client.insert("r/3", json!({"x": 3}));
    client.insert_list("L", &["r/1", "r/2", "r/3"]);
    client.fail_record("r/2", "permission denied");

    let list = store.get_list("L").await.unwrap();
    let result = store.join_list(&list, &JoinOptions::snapshots()).await;

    match result {
        Err(Error::Record { name, message }) => {
            assert_eq!(name, "r/2");
            assert_eq!(message, "permission denied");
        }
        other => panic!("Expected Record error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_snapshot_fails_join() {
    let (client, store) = test_store();
    client.insert("r/1", json!({"x": 1}));
    client.insert_list("L", &["r/1", "r/gone"]);

    let list = store.get_list("L").await.unwrap();
    let result = store.join_list(&list, &JoinOptions::snapshots()).await;

    assert!(matches!(result, Err(Error::Record { name, .. }) if name == "r/gone"));
}

// --- Progress ---

#[tokio::test]
async fn test_progress_reports_every_entry() {
    let (client, store) = test_store();
    let names: Vec<String> = (0..5).map(|i| format!("p/{}", i)).collect();
    for name in &names {
        client.insert(name, json!({}));
    }
    client.set_delay("p/0", Duration::from_millis(30));
    client.insert_list("P", &names);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let options = JoinOptions::snapshots().with_progress(move |index, total| {
        sink.lock().unwrap().push((index, total));
    });

    let list = store.get_list("P").await.unwrap();
    let result = store.join_list(&list, &options).await.unwrap();
    assert_eq!(result.len(), 5);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 5);
    assert!(seen.iter().all(|(_, total)| *total == 5));
    let indices: HashSet<usize> = seen.iter().map(|(index, _)| *index).collect();
    assert_eq!(indices, (0..5).collect::<HashSet<usize>>());
}

// --- Field Joins ---

#[tokio::test]
async fn test_join_fields_keys_by_path() {
    let (client, store) = test_store();
    client.insert("users/1", json!({"name": "ada"}));
    client.insert("files/9", json!({"size": 12}));

    let payload = json!({"a": {"b": "users/1"}, "c": "files/9"});
    let fields = vec!["a.b".to_string(), "c".to_string()];
    let joined = store
        .join_fields(&payload, &fields, FetchMode::Snapshot)
        .await
        .unwrap();

    let keys: HashSet<&str> = joined.keys().map(String::as_str).collect();
    assert_eq!(keys, HashSet::from(["a.b", "c"]));
    assert_eq!(joined["a.b"].as_snapshot(), Some(&json!({"name": "ada"})));
    assert_eq!(joined["c"].as_snapshot(), Some(&json!({"size": 12})));
}

#[tokio::test]
async fn test_join_fields_cursor_mode() {
    let (client, store) = test_store();
    client.insert("users/1", json!({"name": "ada"}));

    let payload = json!({"owner": "users/1"});
    let joined = store
        .join_fields(&payload, &["owner".to_string()], FetchMode::Cursor)
        .await
        .unwrap();

    let cursor = joined["owner"].as_cursor().unwrap();
    assert_eq!(cursor.name(), "users/1");
    assert_eq!(cursor.get(), json!({"name": "ada"}));
}

#[tokio::test]
async fn test_join_list_with_fields() {
    let (client, store) = test_store();
    client.insert("test/1", json!({"number": 1, "sibling": "other/1"}));
    client.insert("test/2", json!({"number": 2, "sibling": "other/2"}));
    client.insert("other/1", json!({"field": 2}));
    client.insert("other/2", json!({"field": 4}));
    client.insert_list("my_list", &["test/1", "test/2"]);
    client.set_delay("other/1", Duration::from_millis(30));

    let list = store.get_list("my_list").await.unwrap();
    let entries = store
        .join_list(&list, &JoinOptions::snapshots().with_fields(["sibling"]))
        .await
        .unwrap()
        .into_joined()
        .unwrap();

    assert_eq!(entries.len(), 2);
    for (i, entry) in entries.iter().enumerate() {
        let n = i as i64 + 1;
        assert_eq!(entry.left.data()["number"], json!(n));
        assert_eq!(entry.right.len(), 1);
        assert_eq!(entry.right["sibling"].data(), json!({"field": n * 2}));
    }
}

#[tokio::test]
async fn test_join_list_fields_on_cursors() {
    let (client, store) = test_store();
    client.insert("test/1", json!({"sibling": "other/1"}));
    client.insert("other/1", json!({"field": 7}));
    client.insert_list("my_list", &["test/1"]);

    let list = store.get_list("my_list").await.unwrap();
    let entries = store
        .join_list(&list, &JoinOptions::default().with_fields(["sibling"]))
        .await
        .unwrap()
        .into_joined()
        .unwrap();

    assert_eq!(entries[0].left.as_cursor().unwrap().name(), "test/1");
    assert_eq!(
        entries[0].right["sibling"].as_cursor().unwrap().get(),
        json!({"field": 7})
    );
}

#[tokio::test]
async fn test_field_failure_fails_list_join() {
    let (client, store) = test_store();
    client.insert("test/1", json!({"sibling": "other/1"}));
    client.insert("test/2", json!({"sibling": "other/2"}));
    client.insert("other/1", json!({}));
    client.insert_list("my_list", &["test/1", "test/2"]);

    let list = store.get_list("my_list").await.unwrap();
    let result = store
        .join_list(&list, &JoinOptions::snapshots().with_fields(["sibling"]))
        .await;

    assert!(matches!(result, Err(Error::Record { name, .. }) if name == "other/2"));
}

// --- Fail-Fast ---

const WIDE: usize = 40;
const SLOW: Duration = Duration::from_millis(300);

#[tokio::test]
async fn test_join_fields_reports_first_failure_to_arrive() {
    let (client, store) = test_store();
    let mut payload = serde_json::Map::new();
    let mut fields = Vec::with_capacity(WIDE);
    for i in 0..WIDE {
        let name = format!("r/{}", i);
        client.insert(&name, json!({"n": i}));
        payload.insert(format!("f{}", i), json!(name));
        fields.push(format!("f{}", i));
    }
    client.fail_record("r/0", "slow failure");
    client.set_delay("r/0", SLOW);
    client.fail_record(&format!("r/{}", WIDE - 1), "fast failure");

    let started = Instant::now();
    let result = store
        .join_fields(&Value::Object(payload), &fields, FetchMode::Snapshot)
        .await;

    match result {
        Err(Error::Record { name, message }) => {
            assert_eq!(name, format!("r/{}", WIDE - 1));
            assert_eq!(message, "fast failure");
        }
        other => panic!("Expected Record error, got {:?}", other.map(|m| m.len())),
    }
    assert!(started.elapsed() < SLOW / 2);
}

#[tokio::test]
async fn test_list_field_stage_reports_first_failure_to_arrive() {
    let (client, store) = test_store();
    let mut names = Vec::with_capacity(WIDE);
    for i in 0..WIDE {
        let name = format!("test/{}", i);
        let sibling = format!("other/{}", i);
        client.insert(&name, json!({"sibling": sibling}));
        client.insert(&sibling, json!({"field": i}));
        names.push(name);
    }
    client.insert_list("wide", &names);
    client.fail_record("other/0", "slow failure");
    client.set_delay("other/0", SLOW);
    client.fail_record(&format!("other/{}", WIDE - 1), "fast failure");

    let list = store.get_list("wide").await.unwrap();
    let started = Instant::now();
    let result = store
        .join_list(&list, &JoinOptions::snapshots().with_fields(["sibling"]))
        .await;

    match result {
        Err(Error::Record { name, message }) => {
            assert_eq!(name, format!("other/{}", WIDE - 1));
            assert_eq!(message, "fast failure");
        }
        other => panic!("Expected Record error, got {:?}", other.map(|r| r.len())),
    }
    assert!(started.elapsed() < SLOW / 2);
}
