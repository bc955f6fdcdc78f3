//! # Autopopulate Plugin
//!
//! Installation onto a schema and the hook entry points the host scheduler
//! calls. Discovery runs once, at installation, for the schema and each of its
//! top-level variants; the resulting cache is read-only afterwards, so one
//! plugin can serve any number of concurrent operations.

use futures::future::try_join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::AutopopulateConfig;
use crate::directive::PopulateDirective;
use crate::error::AutopopulateResult;
use crate::hooks::{HookPoint, HookRegistry, HookSelector};
use crate::operation::{DocumentOperation, OperationContext, Populated, QueryOperation, VariantDocument};
use crate::planner::plan;
use crate::schema::{SchemaId, SchemaRegistry};
use crate::walker::{discover, DiscoveredPath};
use crate::{log_hooks_debug, log_hooks_info};

/// Discovered paths per schema, built once and never invalidated.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryCache {
    entries: HashMap<SchemaId, Arc<[DiscoveredPath]>>,
}

impl DiscoveryCache {
    /// Discover `root` and every variant declared on it
    pub fn build(registry: &SchemaRegistry, root: SchemaId, default_max_depth: u32) -> AutopopulateResult<Self> {
        let mut entries = HashMap::new();
        entries.insert(root, Arc::from(discover(registry, root, default_max_depth)?));
        for (_, variant) in registry.get(root)?.variants() {
            if !entries.contains_key(&variant) {
                entries.insert(variant, Arc::from(discover(registry, variant, default_max_depth)?));
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, schema: SchemaId) -> Option<Arc<[DiscoveredPath]>> {
        self.entries.get(&schema).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The plugin as installed on one schema.
#[derive(Debug)]
pub struct Autopopulate {
    registry: Arc<SchemaRegistry>,
    schema: SchemaId,
    paths: Arc<[DiscoveredPath]>,
    cache: DiscoveryCache,
    selector: HookSelector,
    default_max_depth: u32,
}

impl Autopopulate {
    /// Build the plugin for `schema` without registering any hooks
    pub fn new(
        registry: Arc<SchemaRegistry>,
        schema: SchemaId,
        config: &AutopopulateConfig,
    ) -> AutopopulateResult<Self> {
        config.validate()?;
        let selector = config.hook_selector()?;
        let cache = DiscoveryCache::build(&registry, schema, config.default_max_depth)?;
        let paths = cache.get(schema).unwrap_or_else(|| Arc::from(Vec::new()));

        Ok(Self {
            registry,
            schema,
            paths,
            cache,
            selector,
            default_max_depth: config.default_max_depth,
        })
    }

    /// Build the plugin and register it for every allowed hook point
    pub fn install(
        registry: Arc<SchemaRegistry>,
        schema: SchemaId,
        config: &AutopopulateConfig,
        hooks: &dyn HookRegistry,
    ) -> AutopopulateResult<Arc<Self>> {
        let plugin = Arc::new(Self::new(registry, schema, config)?);
        let points = plugin.hook_points();
        for point in &points {
            hooks.register(schema, *point, Arc::clone(&plugin))?;
        }

        log_hooks_info!(
            "Installed autopopulate on {} with {} path(s) and {} hook point(s)",
            plugin.registry.get(schema)?.name,
            plugin.paths.len(),
            points.len()
        );
        Ok(plugin)
    }

    pub fn schema(&self) -> SchemaId {
        self.schema
    }

    /// Discovered paths of the schema the plugin is installed on
    pub fn paths(&self) -> &[DiscoveredPath] {
        &self.paths
    }

    pub fn hook_points(&self) -> Vec<HookPoint> {
        self.selector.hook_points()
    }

    /// Paths of a variant schema; discovered on demand when it was not known
    /// at installation
    pub fn variant_paths(&self, variant: SchemaId) -> AutopopulateResult<Arc<[DiscoveredPath]>> {
        match self.cache.get(variant) {
            Some(paths) => Ok(paths),
            None => Ok(Arc::from(discover(&self.registry, variant, self.default_max_depth)?)),
        }
    }

    /// Before a read executes: apply every eligible directive.
    pub async fn before_query<Q: QueryOperation>(&self, op: &Q) -> AutopopulateResult<()> {
        let directives = plan(op, &self.paths, None)?;
        if directives.is_empty() {
            return Ok(());
        }

        log_hooks_debug!("Applying {} directive(s) before read", directives.len());
        try_join_all(directives.into_iter().map(|directive| op.resolve(directive))).await?;
        Ok(())
    }

    /// After a read returns: populate variant-only paths per variant group.
    pub async fn after_query<Q, D>(&self, op: &Q, results: &[D]) -> AutopopulateResult<()>
    where
        Q: OperationContext,
        D: VariantDocument,
    {
        crate::variants::populate_variants(self, op, results).await
    }

    /// After a write persists: repopulate paths whose references changed.
    pub async fn after_save<W: DocumentOperation>(&self, doc: &W) -> AutopopulateResult<()> {
        if self.paths.is_empty() || doc.is_subdocument() {
            return Ok(());
        }

        let stale = |directive: &PopulateDirective| is_stale(doc, &directive.path);
        let directives = plan(doc, &self.paths, Some(&stale))?;
        if directives.is_empty() {
            return Ok(());
        }

        log_hooks_debug!("Repopulating {} path(s) after save", directives.len());
        doc.resolve_all(directives).await
    }
}

/// A path needs repopulating unless it holds a fully populated list that still
/// matches the document's current references.
fn is_stale<W: DocumentOperation>(doc: &W, path: &str) -> bool {
    match doc.populated(path) {
        Populated::Many(entries) => match doc.current_value(path) {
            Some(Value::Array(current)) => {
                entries.len() != current.len() || entries.iter().any(Option::is_none)
            }
            _ => true,
        },
        Populated::Single(_) | Populated::No => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::{LeanOptions, QueryOptions};
    use crate::hooks::HookName;
    use crate::schema::FieldDescriptor;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingHooks {
        points: Mutex<Vec<HookPoint>>,
    }

    impl HookRegistry for RecordingHooks {
        fn register(
            &self,
            _schema: SchemaId,
            point: HookPoint,
            _plugin: Arc<Autopopulate>,
        ) -> AutopopulateResult<()> {
            self.points.lock().unwrap().push(point);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingQuery {
        options: QueryOptions,
        lean: Option<LeanOptions>,
        applied: Mutex<Vec<PopulateDirective>>,
    }

    impl OperationContext for RecordingQuery {
        fn options(&self) -> QueryOptions {
            self.options.clone()
        }

        fn lean(&self) -> Option<LeanOptions> {
            self.lean
        }
    }

    #[async_trait]
    impl QueryOperation for RecordingQuery {
        async fn resolve(&self, directive: PopulateDirective) -> AutopopulateResult<()> {
            self.applied.lock().unwrap().push(directive);
            Ok(())
        }
    }

    struct SavedBand {
        subdocument: bool,
        populated: HashMap<String, Populated>,
        values: HashMap<String, Value>,
        batches: Mutex<Vec<Vec<PopulateDirective>>>,
    }

    impl SavedBand {
        fn new() -> Self {
            Self {
                subdocument: false,
                populated: HashMap::new(),
                values: HashMap::new(),
                batches: Mutex::new(Vec::new()),
            }
        }

        fn paths(&self) -> Vec<Vec<String>> {
            self.batches
                .lock()
                .unwrap()
                .iter()
                .map(|batch| batch.iter().map(|d| d.path.clone()).collect())
                .collect()
        }
    }

    impl OperationContext for SavedBand {
        fn options(&self) -> QueryOptions {
            QueryOptions::default()
        }
    }

    #[async_trait]
    impl DocumentOperation for SavedBand {
        fn is_subdocument(&self) -> bool {
            self.subdocument
        }

        fn populated(&self, path: &str) -> Populated {
            self.populated.get(path).cloned().unwrap_or(Populated::No)
        }

        fn current_value(&self, path: &str) -> Option<Value> {
            self.values.get(path).cloned()
        }

        async fn resolve_all(&self, directives: Vec<PopulateDirective>) -> AutopopulateResult<()> {
            self.batches.lock().unwrap().push(directives);
            Ok(())
        }
    }

    fn band_registry() -> (Arc<SchemaRegistry>, SchemaId) {
        let mut registry = SchemaRegistry::new();
        let band = registry.add("Band");
        registry
            .get_mut(band)
            .unwrap()
            .add_field("lead", FieldDescriptor::reference("people").autopopulate(true))
            .add_field(
                "members",
                FieldDescriptor::array_of(FieldDescriptor::reference("people").autopopulate(true)),
            );
        (Arc::new(registry), band)
    }

    #[test]
    fn install_registers_selected_points_only() {
        let (registry, band) = band_registry();
        let hooks = RecordingHooks::default();
        let config = AutopopulateConfig::default().with_functions(["findOne"]);

        let plugin = Autopopulate::install(registry, band, &config, &hooks).unwrap();
        assert_eq!(plugin.paths().len(), 2);
        assert_eq!(
            *hooks.points.lock().unwrap(),
            vec![HookPoint::pre(HookName::FindOne), HookPoint::post(HookName::FindOne)]
        );
    }

    #[test]
    fn install_rejects_bad_patterns() {
        let (registry, band) = band_registry();
        let config = AutopopulateConfig::default().with_function_pattern("[");
        assert!(Autopopulate::install(registry, band, &config, &RecordingHooks::default()).is_err());
    }

    #[tokio::test]
    async fn before_query_applies_each_directive() {
        let (registry, band) = band_registry();
        let plugin = Autopopulate::new(registry, band, &AutopopulateConfig::default()).unwrap();
        let query = RecordingQuery::default();

        plugin.before_query(&query).await.unwrap();

        let applied = query.applied.lock().unwrap();
        let paths: Vec<&str> = applied.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["lead", "members"]);
        assert!(applied.iter().all(|d| d.options.depth == Some(1)));
    }

    #[tokio::test]
    async fn before_query_respects_lean() {
        let (registry, band) = band_registry();
        let plugin = Autopopulate::new(registry, band, &AutopopulateConfig::default()).unwrap();
        let query = RecordingQuery {
            lean: Some(LeanOptions::default()),
            ..RecordingQuery::default()
        };

        plugin.before_query(&query).await.unwrap();
        assert!(query.applied.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn after_save_repopulates_stale_paths_in_one_batch() {
        let (registry, band) = band_registry();
        let plugin = Autopopulate::new(registry, band, &AutopopulateConfig::default()).unwrap();

        let mut doc = SavedBand::new();
        doc.populated.insert(
            "members".to_string(),
            Populated::Many(vec![Some(json!("axl"))]),
        );
        doc.values
            .insert("members".to_string(), json!([{ "_id": "axl" }, "slash"]));

        plugin.after_save(&doc).await.unwrap();
        assert_eq!(doc.paths(), vec![vec!["lead".to_string(), "members".to_string()]]);
    }

    #[tokio::test]
    async fn after_save_skips_fresh_lists() {
        let (registry, band) = band_registry();
        let plugin = Autopopulate::new(registry, band, &AutopopulateConfig::default()).unwrap();

        let mut doc = SavedBand::new();
        doc.populated.insert(
            "members".to_string(),
            Populated::Many(vec![Some(json!("axl")), Some(json!("slash"))]),
        );
        doc.values.insert(
            "members".to_string(),
            json!([{ "_id": "axl" }, { "_id": "slash" }]),
        );

        plugin.after_save(&doc).await.unwrap();
        assert_eq!(doc.paths(), vec![vec!["lead".to_string()]]);
    }

    #[tokio::test]
    async fn after_save_readmits_lists_with_missing_entries() {
        let (registry, band) = band_registry();
        let plugin = Autopopulate::new(registry, band, &AutopopulateConfig::default()).unwrap();

        let mut doc = SavedBand::new();
        doc.populated.insert(
            "members".to_string(),
            Populated::Many(vec![Some(json!("axl")), None]),
        );
        doc.values
            .insert("members".to_string(), json!([{ "_id": "axl" }, "ghost"]));

        plugin.after_save(&doc).await.unwrap();
        assert_eq!(doc.paths(), vec![vec!["lead".to_string(), "members".to_string()]]);
    }

    #[tokio::test]
    async fn after_save_ignores_subdocuments() {
        let (registry, band) = band_registry();
        let plugin = Autopopulate::new(registry, band, &AutopopulateConfig::default()).unwrap();

        let mut doc = SavedBand::new();
        doc.subdocument = true;

        plugin.after_save(&doc).await.unwrap();
        assert!(doc.paths().is_empty());
    }

    #[test]
    fn cache_covers_top_level_variants() {
        let mut registry = SchemaRegistry::new();
        let event = registry.add("Event");
        let clicked = registry.add("Clicked");
        registry.get_mut(event).unwrap().add_variant("Clicked", clicked);
        registry
            .get_mut(clicked)
            .unwrap()
            .add_field("element", FieldDescriptor::reference("elements").autopopulate(true));

        let cache = DiscoveryCache::build(&registry, event, 10).unwrap();
        assert!(!cache.is_empty());
        assert_eq!(cache.len(), 2);
        assert!(cache.get(event).unwrap().is_empty());
        assert_eq!(cache.get(clicked).unwrap()[0].path, "element");
    }
}
