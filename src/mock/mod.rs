//! # In-memory model layer
//!
//! A small document store that implements every collaborator interface of the
//! crate: it registers hooks, runs reads and writes through them, and resolves
//! populate directives with nested reads of its own. Documents are JSON
//! objects keyed by `_id`; documents of a variant model carry the variant's
//! name under `__t` and live in the base model's collection.
//!
//! Used by the integration tests, and by hosts that want to see what a schema
//! populates without wiring a database.

mod document;
mod paths;

pub use document::MemoryDocument;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;

use crate::config::AutopopulateConfig;
use crate::directive::{LeanOptions, PopulateDirective, QueryOptions};
use crate::error::{AutopopulateError, AutopopulateResult};
use crate::hooks::{HookName, HookPoint, HookRegistry};
use crate::operation::{ModelHandle, OperationContext, Populated, QueryOperation};
use crate::plugin::Autopopulate;
use crate::schema::{SchemaId, SchemaRegistry};

/// Field holding a variant document's model name
pub const VARIANT_KEY: &str = "__t";

/// Errors raised by the in-memory store itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MockError {
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Variant {variant} needs a base model, {base} is not one")]
    InvalidVariant { variant: String, base: String },

    #[error("Document has no _id")]
    MissingId,

    #[error("Store lock poisoned")]
    Poisoned,

    /// Injected with [`MemoryStore::fail_next_populate`]
    #[error("{0}")]
    Injected(String),
}

impl From<MockError> for AutopopulateError {
    fn from(err: MockError) -> Self {
        AutopopulateError::resolver(err)
    }
}

fn poisoned<T>(_: T) -> AutopopulateError {
    MockError::Poisoned.into()
}

#[derive(Debug, Clone)]
struct ModelDef {
    name: String,
    schema: SchemaId,
    base: Option<String>,
}

impl ModelDef {
    fn collection(&self) -> &str {
        self.base.as_deref().unwrap_or(&self.name)
    }
}

/// A read request against one model.
#[derive(Debug, Clone)]
pub struct ReadRequest {
    pub model: String,
    pub hook: HookName,
    pub filter: Map<String, Value>,
    pub options: QueryOptions,
    pub lean: Option<LeanOptions>,
    /// Shallow field update for `findOneAndUpdate`, replacement for
    /// `findOneAndReplace`
    pub update: Option<Map<String, Value>>,
}

impl ReadRequest {
    pub fn new(hook: HookName, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            hook,
            filter: Map::new(),
            options: QueryOptions::default(),
            lean: None,
            update: None,
        }
    }

    pub fn filter(mut self, filter: Value) -> Self {
        if let Value::Object(map) = filter {
            self.filter = map;
        }
        self
    }

    pub fn options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn lean(mut self, lean: LeanOptions) -> Self {
        self.lean = Some(lean);
        self
    }

    pub fn update(mut self, update: Value) -> Self {
        if let Value::Object(map) = update {
            self.update = Some(map);
        }
        self
    }

    fn is_single(&self) -> bool {
        self.hook != HookName::Find
    }
}

/// The pending read handed to `before_query` and `after_query`.
pub struct MemoryQuery {
    options: QueryOptions,
    lean: Option<LeanOptions>,
    directives: Mutex<Vec<PopulateDirective>>,
}

impl MemoryQuery {
    fn new(request: &ReadRequest) -> Self {
        Self {
            options: request.options.clone(),
            lean: request.lean,
            directives: Mutex::new(Vec::new()),
        }
    }

    fn take_directives(&self) -> AutopopulateResult<Vec<PopulateDirective>> {
        let mut directives = self.directives.lock().map_err(poisoned)?;
        Ok(std::mem::take(&mut *directives))
    }
}

impl OperationContext for MemoryQuery {
    fn options(&self) -> QueryOptions {
        self.options.clone()
    }

    fn lean(&self) -> Option<LeanOptions> {
        self.lean
    }
}

#[async_trait]
impl QueryOperation for MemoryQuery {
    async fn resolve(&self, directive: PopulateDirective) -> AutopopulateResult<()> {
        self.directives.lock().map_err(poisoned)?.push(directive);
        Ok(())
    }
}

/// In-memory document store.
pub struct MemoryStore {
    registry: Arc<SchemaRegistry>,
    models: RwLock<HashMap<String, ModelDef>>,
    collections: Mutex<HashMap<String, Vec<Value>>>,
    hooks: RwLock<HashMap<SchemaId, Vec<(HookPoint, Arc<Autopopulate>)>>>,
    next_id: AtomicUsize,
    batches: AtomicUsize,
    failure: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new(registry: Arc<SchemaRegistry>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            models: RwLock::new(HashMap::new()),
            collections: Mutex::new(HashMap::new()),
            hooks: RwLock::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
            batches: AtomicUsize::new(0),
            failure: Mutex::new(None),
        })
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Register a model backed by the named schema
    pub fn model(&self, name: &str, schema: &str) -> AutopopulateResult<SchemaId> {
        let schema = self.schema_id(schema)?;
        self.models.write().map_err(poisoned)?.insert(
            name.to_string(),
            ModelDef {
                name: name.to_string(),
                schema,
                base: None,
            },
        );
        Ok(schema)
    }

    /// Register a variant of `base`; its schema is the one the base schema
    /// declares under the variant's name
    pub fn variant(&self, base: &str, name: &str) -> AutopopulateResult<SchemaId> {
        let base_def = self.model_def(base)?;
        if base_def.base.is_some() {
            return Err(MockError::InvalidVariant {
                variant: name.to_string(),
                base: base.to_string(),
            }
            .into());
        }
        let schema = self
            .registry
            .get(base_def.schema)?
            .variant(name)
            .ok_or_else(|| MockError::UnknownModel(name.to_string()))?;

        self.models.write().map_err(poisoned)?.insert(
            name.to_string(),
            ModelDef {
                name: name.to_string(),
                schema,
                base: Some(base.to_string()),
            },
        );
        Ok(schema)
    }

    /// Install the plugin on a model's schema
    pub fn install(&self, model: &str, config: &AutopopulateConfig) -> AutopopulateResult<Arc<Autopopulate>> {
        let def = self.model_def(model)?;
        Autopopulate::install(Arc::clone(&self.registry), def.schema, config, self)
    }

    /// Make the next populate fail with `message`
    pub fn fail_next_populate(&self, message: &str) -> AutopopulateResult<()> {
        *self.failure.lock().map_err(poisoned)? = Some(message.to_string());
        Ok(())
    }

    /// Number of batched resolver calls made by save and variant population
    pub fn batch_calls(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    /// Raw stored copy of a document, as the database would hold it
    pub fn stored(&self, model: &str, id: &str) -> AutopopulateResult<Option<Value>> {
        let def = self.model_def(model)?;
        let collections = self.collections.lock().map_err(poisoned)?;
        Ok(collections.get(def.collection()).and_then(|docs| {
            docs.iter()
                .find(|doc| doc.get("_id").and_then(Value::as_str) == Some(id))
                .cloned()
        }))
    }

    /// A new unsaved document; assigns `_id` and the variant tag
    pub fn new_document(self: &Arc<Self>, model: &str, data: Value) -> AutopopulateResult<MemoryDocument> {
        let def = self.model_def(model)?;
        let mut data = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if !data.contains_key("_id") {
            let id = format!("{}-{}", def.name, self.next_id.fetch_add(1, Ordering::SeqCst));
            data.insert("_id".to_string(), Value::String(id));
        }
        if def.base.is_some() {
            data.insert(VARIANT_KEY.to_string(), Value::String(def.name.clone()));
        }
        Ok(MemoryDocument::new(
            Arc::clone(self),
            def.name,
            Value::Object(data),
            None,
        ))
    }

    /// Create and save a document
    pub async fn create(self: &Arc<Self>, model: &str, data: Value) -> AutopopulateResult<MemoryDocument> {
        let doc = self.new_document(model, data)?;
        self.save(&doc).await?;
        Ok(doc)
    }

    /// Persist `doc` with its populated paths reduced to ids, then run the
    /// post-save hooks
    pub async fn save(self: &Arc<Self>, doc: &MemoryDocument) -> AutopopulateResult<()> {
        let def = self.model_def(doc.model_name())?;
        let stored = doc.to_stored()?;
        let id = stored
            .get("_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(MockError::MissingId)?;

        {
            let mut collections = self.collections.lock().map_err(poisoned)?;
            let docs = collections.entry(def.collection().to_string()).or_default();
            match docs
                .iter_mut()
                .find(|d| d.get("_id").and_then(Value::as_str) == Some(id.as_str()))
            {
                Some(existing) => *existing = stored,
                None => docs.push(stored),
            }
        }

        for plugin in self.hooks_for(&def, HookPoint::post(HookName::Save))? {
            plugin.after_save(doc).await?;
        }
        Ok(())
    }

    pub async fn find(self: &Arc<Self>, model: &str, filter: Value) -> AutopopulateResult<Vec<MemoryDocument>> {
        self.execute(ReadRequest::new(HookName::Find, model).filter(filter)).await
    }

    pub async fn find_one(self: &Arc<Self>, model: &str, filter: Value) -> AutopopulateResult<Option<MemoryDocument>> {
        let docs = self.execute(ReadRequest::new(HookName::FindOne, model).filter(filter)).await?;
        Ok(docs.into_iter().next())
    }

    pub async fn find_by_id(self: &Arc<Self>, model: &str, id: &str) -> AutopopulateResult<Option<MemoryDocument>> {
        self.find_one(model, serde_json::json!({ "_id": id })).await
    }

    /// Update the first match and return it as updated
    pub async fn find_one_and_update(
        self: &Arc<Self>,
        model: &str,
        filter: Value,
        update: Value,
    ) -> AutopopulateResult<Option<MemoryDocument>> {
        let request = ReadRequest::new(HookName::FindOneAndUpdate, model)
            .filter(filter)
            .update(update);
        Ok(self.execute(request).await?.into_iter().next())
    }

    /// Run a read through its pre hooks, the store, population and post hooks
    pub fn execute(self: &Arc<Self>, request: ReadRequest) -> BoxFuture<'static, AutopopulateResult<Vec<MemoryDocument>>> {
        let store = Arc::clone(self);
        async move {
            let def = store.model_def(&request.model)?;
            let query = MemoryQuery::new(&request);

            for plugin in store.hooks_for(&def, HookPoint::pre(request.hook))? {
                plugin.before_query(&query).await?;
            }

            let raw = store.run(&def, &request)?;
            let docs: Vec<MemoryDocument> = raw
                .into_iter()
                .map(|data| store.hydrate(&def, data, request.lean))
                .collect::<AutopopulateResult<_>>()?;

            for directive in query.take_directives()? {
                store.populate(docs.clone(), &directive).await?;
            }

            for plugin in store.hooks_for(&def, HookPoint::post(request.hook))? {
                plugin.after_query(&query, &docs).await?;
            }
            Ok(docs)
        }
        .boxed()
    }

    /// Resolve one directive for `docs` with a nested read per target model
    pub(crate) async fn populate(self: &Arc<Self>, docs: Vec<MemoryDocument>, directive: &PopulateDirective) -> AutopopulateResult<()> {
        if let Some(message) = self.failure.lock().map_err(poisoned)?.take() {
            return Err(MockError::Injected(message).into());
        }

        let segments = paths::segments(&directive.path);
        let mut wanted: Vec<(String, Vec<String>)> = Vec::new();
        let mut targets = Vec::with_capacity(docs.len());
        for doc in &docs {
            let data = doc.to_value()?;
            let target = match (&directive.model, &directive.ref_path) {
                (Some(model), _) => Some(model.clone()),
                (None, Some(ref_path)) => paths::value_at(&data, ref_path)
                    .and_then(|v| v.as_str().map(str::to_string)),
                (None, None) => None,
            };
            if let Some(model) = &target {
                let ids = paths::ref_ids(&data, &segments);
                match wanted.iter_mut().find(|(m, _)| m == model) {
                    Some((_, existing)) => {
                        for id in ids {
                            if !existing.contains(&id) {
                                existing.push(id);
                            }
                        }
                    }
                    None => wanted.push((model.clone(), ids)),
                }
            }
            targets.push(target);
        }

        let mut fetched: HashMap<(String, String), Value> = HashMap::new();
        for (model, ids) in wanted {
            if ids.is_empty() {
                continue;
            }
            let mut filter = directive.match_filter().cloned().unwrap_or_default();
            filter.insert("_id".to_string(), serde_json::json!({ "$in": ids }));

            let mut request = ReadRequest::new(HookName::Find, model.clone()).options(directive.options.clone());
            request.filter = filter;
            for found in self.execute(request).await? {
                let mut value = found.to_value()?;
                if let Some(select) = directive.select() {
                    value = paths::project(&value, select);
                }
                fetched.insert((model.clone(), found.id()), value);
            }
        }

        for (doc, target) in docs.iter().zip(targets) {
            let model = match target {
                Some(model) => model,
                None => continue,
            };
            doc.fill(&directive.path, |id| fetched.get(&(model.clone(), id.to_string())).cloned())?;
        }
        Ok(())
    }

    fn run(&self, def: &ModelDef, request: &ReadRequest) -> AutopopulateResult<Vec<Value>> {
        let mut collections = self.collections.lock().map_err(poisoned)?;
        let docs = collections.entry(def.collection().to_string()).or_default();

        let mut matched = Vec::new();
        for (index, doc) in docs.iter().enumerate() {
            if def.base.is_some() && doc.get(VARIANT_KEY).and_then(Value::as_str) != Some(def.name.as_str()) {
                continue;
            }
            if matches_filter(doc, &request.filter) {
                matched.push(index);
                if request.is_single() {
                    break;
                }
            }
        }

        let mut results = Vec::with_capacity(matched.len());
        match request.hook {
            HookName::FindOneAndDelete => {
                for index in matched.into_iter().rev() {
                    results.push(docs.remove(index));
                }
            }
            HookName::FindOneAndUpdate | HookName::FindOneAndReplace => {
                for index in matched {
                    let doc = &mut docs[index];
                    if let (Some(update), Value::Object(fields)) = (&request.update, doc) {
                        if request.hook == HookName::FindOneAndReplace {
                            fields.retain(|key, _| key == "_id" || key == VARIANT_KEY);
                        }
                        for (key, value) in update {
                            fields.insert(key.clone(), value.clone());
                        }
                    }
                    results.push(docs[index].clone());
                }
            }
            _ => results.extend(matched.into_iter().map(|index| docs[index].clone())),
        }
        Ok(results)
    }

    /// Wrap stored data as a document of the model it was saved as
    fn hydrate(self: &Arc<Self>, def: &ModelDef, data: Value, lean: Option<LeanOptions>) -> AutopopulateResult<MemoryDocument> {
        let mut model = def.name.clone();
        if def.base.is_none() {
            if let Some(tag) = data.get(VARIANT_KEY).and_then(Value::as_str) {
                let models = self.models.read().map_err(poisoned)?;
                if models.get(tag).and_then(|m| m.base.as_deref()) == Some(def.name.as_str()) {
                    model = tag.to_string();
                }
            }
        }
        Ok(MemoryDocument::new(Arc::clone(self), model, data, lean))
    }

    fn schema_id(&self, name: &str) -> AutopopulateResult<SchemaId> {
        self.registry
            .find_by_name(name)
            .ok_or_else(|| AutopopulateError::invalid_schema(format!("Unknown schema {}", name)))
    }

    fn model_def(&self, name: &str) -> AutopopulateResult<ModelDef> {
        self.models
            .read()
            .map_err(poisoned)?
            .get(name)
            .cloned()
            .ok_or_else(|| MockError::UnknownModel(name.to_string()).into())
    }

    /// Plugins registered at `point` for the model; a variant also runs the
    /// hooks of its base
    fn hooks_for(&self, def: &ModelDef, point: HookPoint) -> AutopopulateResult<Vec<Arc<Autopopulate>>> {
        let mut schemas = Vec::with_capacity(2);
        if let Some(base) = &def.base {
            schemas.push(self.model_def(base)?.schema);
        }
        schemas.push(def.schema);

        let hooks = self.hooks.read().map_err(poisoned)?;
        Ok(schemas
            .iter()
            .filter_map(|schema| hooks.get(schema))
            .flatten()
            .filter(|(registered, _)| *registered == point)
            .map(|(_, plugin)| Arc::clone(plugin))
            .collect())
    }

    fn variant_handle(self: &Arc<Self>, model: &str) -> Option<Arc<dyn ModelHandle<MemoryDocument>>> {
        let def = self.model_def(model).ok()?;
        def.base.as_ref()?;
        Some(Arc::new(MemoryModel {
            store: Arc::clone(self),
            name: def.name,
            schema: def.schema,
        }))
    }

    fn record_batch(&self) {
        self.batches.fetch_add(1, Ordering::SeqCst);
    }
}

impl HookRegistry for MemoryStore {
    fn register(
        &self,
        schema: SchemaId,
        point: HookPoint,
        plugin: Arc<Autopopulate>,
    ) -> AutopopulateResult<()> {
        let mut hooks = self.hooks.write().map_err(poisoned)?;
        hooks.entry(schema).or_default().push((point, plugin));
        Ok(())
    }
}

/// Handle onto a registered model.
pub struct MemoryModel {
    store: Arc<MemoryStore>,
    name: String,
    schema: SchemaId,
}

#[async_trait]
impl ModelHandle<MemoryDocument> for MemoryModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> SchemaId {
        self.schema
    }

    async fn resolve_many(&self, docs: &[&MemoryDocument], directives: Vec<PopulateDirective>) -> AutopopulateResult<()> {
        self.store.record_batch();
        let docs: Vec<MemoryDocument> = docs.iter().map(|doc| (*doc).clone()).collect();
        for directive in &directives {
            self.store.populate(docs.clone(), directive).await?;
        }
        Ok(())
    }
}

fn matches_filter(doc: &Value, filter: &Map<String, Value>) -> bool {
    filter.iter().all(|(key, expected)| {
        let actual = paths::value_at(doc, key);
        match expected.get("$in").and_then(Value::as_array) {
            Some(candidates) => actual.map_or(false, |a| candidates.contains(&a)),
            None => actual.as_ref() == Some(expected),
        }
    })
}

/// Populated state recorded after filling a path
pub(crate) fn populated_state(list: bool, entries: Vec<Option<Value>>) -> Populated {
    if list {
        return Populated::Many(entries);
    }
    match entries.into_iter().next() {
        Some(Some(id)) => Populated::Single(id),
        _ => Populated::No,
    }
}
