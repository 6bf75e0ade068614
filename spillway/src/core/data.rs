//! Dot-path access into nested JSON objects
//!
//! A path such as `"user.id"` addresses the `id` key of the object stored
//! under `user`. Only objects are traversed; arrays and scalars end the walk.

use serde_json::{Map, Value};

/// Look up the value at `path`
pub fn get<'a>(map: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    match path.split_once('.') {
        None => map.get(path),
        Some((head, rest)) => match map.get(head)? {
            Value::Object(inner) => get(inner, rest),
            _ => None,
        },
    }
}

/// Whether a value (including `null`) is stored at `path`
pub fn contains(map: &Map<String, Value>, path: &str) -> bool {
    get(map, path).is_some()
}

/// Store `value` at `path`, creating intermediate objects
///
/// An intermediate segment that currently holds a non-object value is
/// replaced by an object.
pub fn set(map: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            map.insert(path.to_owned(), value);
        }
        Some((head, rest)) => {
            let child = map
                .entry(head)
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(inner) = child {
                set(inner, rest, value);
            } else {
                let mut inner = Map::new();
                set(&mut inner, rest, value);
                *child = Value::Object(inner);
            }
        }
    }
}

/// Remove and return the value at `path`
pub fn remove(map: &mut Map<String, Value>, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => map.remove(path),
        Some((head, rest)) => match map.get_mut(head)? {
            Value::Object(inner) => remove(inner, rest),
            _ => None,
        },
    }
}
