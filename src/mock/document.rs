use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use super::{paths, poisoned, populated_state, MemoryStore};
use crate::directive::{LeanOptions, PopulateDirective, QueryOptions};
use crate::error::AutopopulateResult;
use crate::operation::{DocumentOperation, ModelHandle, OperationContext, Populated, VariantDocument};

struct DocumentState {
    store: Arc<MemoryStore>,
    model: String,
    lean: Option<LeanOptions>,
    data: Mutex<Value>,
    populated: Mutex<HashMap<String, Populated>>,
}

/// A document held by [`MemoryStore`].
///
/// Clones share state, so a document populated through one handle is seen
/// populated through every other.
#[derive(Clone)]
pub struct MemoryDocument {
    inner: Arc<DocumentState>,
}

impl MemoryDocument {
    pub(crate) fn new(store: Arc<MemoryStore>, model: String, data: Value, lean: Option<LeanOptions>) -> Self {
        Self {
            inner: Arc::new(DocumentState {
                store,
                model,
                lean,
                data: Mutex::new(data),
                populated: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn id(&self) -> String {
        self.get("_id")
            .and_then(|id| id.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// Model the document was hydrated as
    pub fn model_name(&self) -> &str {
        &self.inner.model
    }

    /// Value at a dotted path; numeric segments index into arrays
    pub fn get(&self, path: &str) -> Option<Value> {
        let data = self.inner.data.lock().ok()?;
        paths::value_at(&data, path)
    }

    /// Set a top-level field; a populated path reverts to raw references
    pub fn set(&self, field: &str, value: Value) -> AutopopulateResult<()> {
        if let Value::Object(map) = &mut *self.inner.data.lock().map_err(poisoned)? {
            map.insert(field.to_string(), value);
        }
        self.inner.populated.lock().map_err(poisoned)?.remove(field);
        Ok(())
    }

    /// Append to a top-level array field
    pub fn push(&self, field: &str, value: Value) -> AutopopulateResult<()> {
        if let Value::Object(map) = &mut *self.inner.data.lock().map_err(poisoned)? {
            match map.entry(field.to_string()).or_insert_with(|| Value::Array(Vec::new())) {
                Value::Array(items) => items.push(value),
                other => *other = Value::Array(vec![value]),
            }
        }
        Ok(())
    }

    pub fn to_value(&self) -> AutopopulateResult<Value> {
        Ok(self.inner.data.lock().map_err(poisoned)?.clone())
    }

    pub fn is_populated(&self, path: &str) -> bool {
        self.populated_at(path).is_populated()
    }

    fn populated_at(&self, path: &str) -> Populated {
        self.inner
            .populated
            .lock()
            .ok()
            .and_then(|populated| populated.get(path).cloned())
            .unwrap_or(Populated::No)
    }

    /// The document as it is persisted: populated paths hold ids again
    pub(crate) fn to_stored(&self) -> AutopopulateResult<Value> {
        let mut stored = self.to_value()?;
        let populated = self.inner.populated.lock().map_err(poisoned)?;
        for path in populated.keys() {
            paths::depopulate(&mut stored, &paths::segments(path));
        }
        Ok(stored)
    }

    /// Replace every reference at `path` that `lookup` knows; unknown ids stay
    /// raw and are recorded as missing
    pub(crate) fn fill<F>(&self, path: &str, lookup: F) -> AutopopulateResult<()>
    where
        F: Fn(&str) -> Option<Value>,
    {
        let segments = paths::segments(path);
        let mut entries = Vec::new();
        let list = {
            let mut data = self.inner.data.lock().map_err(poisoned)?;
            let list = paths::is_list_path(&data, &segments);
            paths::for_each_ref(&mut data, &segments, &mut |value| {
                let id = match paths::ref_id(value) {
                    Some(id) => id,
                    None => return,
                };
                match lookup(&id) {
                    Some(entity) => {
                        *value = entity;
                        entries.push(Some(Value::String(id)));
                    }
                    None => entries.push(None),
                }
            });
            list
        };

        let state = populated_state(list, entries);
        let mut populated = self.inner.populated.lock().map_err(poisoned)?;
        if state.is_populated() {
            populated.insert(path.to_string(), state);
        } else {
            populated.remove(path);
        }
        Ok(())
    }
}

impl fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDocument")
            .field("model", &self.inner.model)
            .field("data", &self.get(""))
            .finish()
    }
}

impl OperationContext for MemoryDocument {
    fn options(&self) -> QueryOptions {
        QueryOptions::default()
    }

    fn lean(&self) -> Option<LeanOptions> {
        self.inner.lean
    }
}

#[async_trait]
impl DocumentOperation for MemoryDocument {
    fn is_subdocument(&self) -> bool {
        false
    }

    fn populated(&self, path: &str) -> Populated {
        self.populated_at(path)
    }

    fn current_value(&self, path: &str) -> Option<Value> {
        let data = self.inner.data.lock().ok()?;
        paths::reference_value(&data, &paths::segments(path))
    }

    async fn resolve_all(&self, directives: Vec<PopulateDirective>) -> AutopopulateResult<()> {
        self.inner.store.record_batch();
        for directive in &directives {
            self.inner.store.populate(vec![self.clone()], directive).await?;
        }
        Ok(())
    }
}

impl VariantDocument for MemoryDocument {
    fn variant_model(&self) -> Option<Arc<dyn ModelHandle<Self>>> {
        if self.inner.lean.is_some() {
            return None;
        }
        self.inner.store.variant_handle(&self.inner.model)
    }

    fn populated(&self, path: &str) -> Populated {
        self.populated_at(path)
    }
}
