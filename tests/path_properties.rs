//! Property tests for dot-separated path access.

use proptest::prelude::*;
use record_async::{PathAccessor, PathMode};
use serde_json::{json, Value};

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z/]{0,8}".prop_map(Value::from),
    ]
}

fn segments() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,5}", 1..5)
}

/// Create every container along `segments[..len-1]`, then write `value`.
fn build(paths: &PathAccessor, segments: &[String], value: Value) -> (Value, String) {
    let mut data = json!({});
    for depth in 1..segments.len() {
        let prefix = segments[..depth].join(".");
        if paths.read(&data, &prefix).is_none() {
            paths.write(&mut data, &prefix, json!({})).unwrap();
        }
    }
    let path = segments.join(".");
    paths.write(&mut data, &path, value).unwrap();
    (data, path)
}

proptest! {
    #[test]
    fn test_strict_read_returns_written_value(segs in segments(), value in scalar()) {
        let paths = PathAccessor::new(PathMode::Strict);
        let (data, path) = build(&paths, &segs, value.clone());
        prop_assert_eq!(paths.read(&data, &path), Some(&value));
    }

    #[test]
    fn test_truthy_read_returns_truthy_value(segs in segments(), n in 1i64..i64::MAX) {
        let paths = PathAccessor::new(PathMode::Truthy);
        let value = json!(n);
        let (data, path) = build(&paths, &segs, value.clone());
        prop_assert_eq!(paths.read(&data, &path), Some(&value));
    }

    #[test]
    fn test_empty_path_is_identity(value in scalar(), key in "[a-z]{1,5}") {
        let mut map = serde_json::Map::new();
        map.insert(key, value);
        let data = Value::Object(map);
        prop_assert_eq!(PathAccessor::strict().read(&data, ""), Some(&data));
        prop_assert_eq!(PathAccessor::truthy().read(&data, ""), Some(&data));
    }
}
