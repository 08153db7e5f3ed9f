//! Dot-separated path access into record payloads.
//!
//! A path such as `"files.config.a"` descends one level per segment. Object
//! members are addressed by key and array elements by decimal index. The
//! empty path denotes the payload root.

use crate::error::{Error, Result};
use serde_json::Value;

/// When descent stops early.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PathMode {
    /// Stop only when a segment is absent. A `null` leaf is still returned.
    #[default]
    Strict,
    /// Also stop on falsy values: `null`, `false`, `0`, `""`.
    Truthy,
}

/// Reads and writes nested values by path.
#[derive(Clone, Copy, Debug, Default)]
pub struct PathAccessor {
    mode: PathMode,
}

impl PathAccessor {
    pub fn new(mode: PathMode) -> Self {
        Self { mode }
    }

    pub fn strict() -> Self {
        Self::new(PathMode::Strict)
    }

    pub fn truthy() -> Self {
        Self::new(PathMode::Truthy)
    }

    pub fn mode(&self) -> PathMode {
        self.mode
    }

    /// Value at `path`, or `None` if descent stopped early.
    pub fn read<'v>(&self, payload: &'v Value, path: &str) -> Option<&'v Value> {
        if path.is_empty() {
            return Some(payload);
        }

        let mut field = payload;
        for segment in path.split('.') {
            field = child(field, segment).filter(|next| self.descends(next))?;
        }
        Some(field)
    }

    fn read_mut<'v>(&self, payload: &'v mut Value, path: &str) -> Option<&'v mut Value> {
        if path.is_empty() {
            return Some(payload);
        }

        let mut field = payload;
        for segment in path.split('.') {
            if !child(field, segment).is_some_and(|next| self.descends(next)) {
                return None;
            }
            field = child_mut(field, segment)?;
        }
        Some(field)
    }

    /// Set the last segment of `path` inside its container.
    ///
    /// Intermediate containers are never created: the parent path must
    /// already resolve to an object or array. The empty path replaces the
    /// whole payload.
    pub fn write(&self, payload: &mut Value, path: &str, value: Value) -> Result<()> {
        if path.is_empty() {
            *payload = value;
            return Ok(());
        }

        let (parent, field) = path.rsplit_once('.').unwrap_or(("", path));
        let container = self
            .read_mut(payload, parent)
            .ok_or_else(|| Error::path(path, format!("container '{}' does not exist", parent)))?;

        match container {
            Value::Object(map) => {
                map.insert(field.to_string(), value);
                Ok(())
            }
            Value::Array(items) => {
                let index: usize = field
                    .parse()
                    .map_err(|_| Error::path(path, format!("'{}' is not an array index", field)))?;
                if index < items.len() {
                    items[index] = value;
                } else if index == items.len() {
                    items.push(value);
                } else {
                    return Err(Error::path(
                        path,
                        format!("index {} out of bounds (len {})", index, items.len()),
                    ));
                }
                Ok(())
            }
            other => Err(Error::path(
                path,
                format!("container '{}' is {}, not an object or array", parent, kind(other)),
            )),
        }
    }

    fn descends(&self, value: &Value) -> bool {
        match self.mode {
            PathMode::Strict => true,
            PathMode::Truthy => is_truthy(value),
        }
    }
}

fn child<'v>(value: &'v Value, segment: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn child_mut<'v>(value: &'v mut Value, segment: &str) -> Option<&'v mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
