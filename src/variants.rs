//! Post-read population of polymorphic variants.
//!
//! A read on a base model can return documents hydrated as different
//! variants. Each variant may declare autopopulate paths of its own that the
//! base schema's hooks know nothing about, so after the read the documents are
//! grouped by variant model and every group gets one batched populate covering
//! its variant's paths.

use futures::future::try_join_all;
use std::sync::Arc;

use crate::directive::PopulateDirective;
use crate::error::AutopopulateResult;
use crate::log_variants_debug;
use crate::operation::{ModelHandle, OperationContext, VariantDocument};
use crate::planner::plan;
use crate::plugin::Autopopulate;

struct VariantGroup<'a, D: Sync> {
    model: Arc<dyn ModelHandle<D>>,
    docs: Vec<&'a D>,
    directives: Vec<PopulateDirective>,
}

/// Populate the variant-only paths of `results`.
///
/// Lightweight reads are skipped entirely: plain data carries no variant
/// model to group by.
pub async fn populate_variants<Q, D>(
    plugin: &Autopopulate,
    op: &Q,
    results: &[D],
) -> AutopopulateResult<()>
where
    Q: OperationContext,
    D: VariantDocument,
{
    if results.is_empty() || op.is_lightweight() {
        return Ok(());
    }

    let mut groups: Vec<VariantGroup<'_, D>> = Vec::new();
    for doc in results {
        let model = match doc.variant_model() {
            Some(model) => model,
            None => continue,
        };

        if let Some(group) = groups.iter_mut().find(|g| g.model.name() == model.name()) {
            group.docs.push(doc);
            continue;
        }

        // The first document of a group decides which paths still need work
        let paths = plugin.variant_paths(model.schema())?;
        let unpopulated = |directive: &PopulateDirective| !doc.populated(&directive.path).is_populated();
        let directives = plan(op, &paths, Some(&unpopulated))?;

        groups.push(VariantGroup {
            model,
            docs: vec![doc],
            directives,
        });
    }

    let pending: Vec<_> = groups
        .iter()
        .filter(|group| !group.directives.is_empty())
        .map(|group| {
            log_variants_debug!(
                "Populating {} path(s) on {} {} document(s)",
                group.directives.len(),
                group.docs.len(),
                group.model.name()
            );
            group.model.resolve_many(&group.docs, group.directives.clone())
        })
        .collect();

    try_join_all(pending).await?;
    Ok(())
}
