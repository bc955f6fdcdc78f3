//! Dotted-path helpers over JSON documents.

use serde_json::Value;

pub(crate) fn segments(path: &str) -> Vec<&str> {
    path.split('.').filter(|s| !s.is_empty()).collect()
}

/// Value at `path`; numeric segments index into arrays
pub(crate) fn value_at(value: &Value, path: &str) -> Option<Value> {
    let mut current = value;
    for segment in segments(path) {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

/// Id of a reference position: a raw id, or a populated entity's `_id`
pub(crate) fn ref_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Object(map) => map.get("_id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Visit every reference position at `segments`, fanning out over arrays
pub(crate) fn for_each_ref(value: &mut Value, segments: &[&str], f: &mut dyn FnMut(&mut Value)) {
    if segments.is_empty() {
        match value {
            Value::Array(items) => items.iter_mut().for_each(|item| f(item)),
            Value::Null => {}
            other => f(other),
        }
        return;
    }
    match value {
        Value::Array(items) => {
            for item in items.iter_mut() {
                for_each_ref(item, segments, f);
            }
        }
        Value::Object(map) => {
            if let Some(child) = map.get_mut(segments[0]) {
                for_each_ref(child, &segments[1..], f);
            }
        }
        _ => {}
    }
}

/// Ids referenced at `segments`, in document order
pub(crate) fn ref_ids(value: &Value, segments: &[&str]) -> Vec<String> {
    let mut copy = value.clone();
    let mut ids = Vec::new();
    for_each_ref(&mut copy, segments, &mut |v| {
        if let Some(id) = ref_id(v) {
            ids.push(id);
        }
    });
    ids
}

/// Value at `segments` as populate sees it: a path that crosses or ends in an
/// array yields the flat list of reference positions
pub(crate) fn reference_value(value: &Value, segments: &[&str]) -> Option<Value> {
    if !is_list_path(value, segments) {
        return value_at(value, &segments.join("."));
    }
    let mut copy = value.clone();
    let mut positions = Vec::new();
    for_each_ref(&mut copy, segments, &mut |v| positions.push(v.clone()));
    Some(Value::Array(positions))
}

/// Whether `segments` crosses or ends in an array
pub(crate) fn is_list_path(value: &Value, segments: &[&str]) -> bool {
    match value {
        Value::Array(_) => true,
        Value::Object(map) => match segments.split_first() {
            Some((head, rest)) => map
                .get(*head)
                .map_or(false, |child| is_list_path(child, rest)),
            None => false,
        },
        _ => false,
    }
}

/// Replace populated entities at `segments` with their ids
pub(crate) fn depopulate(value: &mut Value, segments: &[&str]) {
    for_each_ref(value, segments, &mut |v| {
        if v.is_object() {
            if let Some(id) = ref_id(v) {
                *v = Value::String(id);
            }
        }
    });
}

/// Keep only the fields named by a `select` string (`"a b"` or `"-a -b"`)
pub(crate) fn project(value: &Value, select: &str) -> Value {
    let fields: Vec<&str> = select.split_whitespace().collect();
    let map = match value {
        Value::Object(map) => map,
        other => return other.clone(),
    };
    if fields.is_empty() {
        return value.clone();
    }

    let exclude = fields.iter().all(|f| f.starts_with('-'));
    let projected = map
        .iter()
        .filter(|(key, _)| {
            if exclude {
                !fields.iter().any(|f| &f[1..] == key.as_str())
            } else {
                key.as_str() == "_id" || fields.contains(&key.as_str())
            }
        })
        .map(|(key, v)| (key.clone(), v.clone()))
        .collect();
    Value::Object(projected)
}
