//! Descriptor layer merging
//!
//! Layers are applied left to right:
//! - Scalars: a value present in the overlay replaces the base value
//! - Queries and schemas: merged by name, overlay entries update in place
//! - Path declarations: concatenated in declaration order
//! - Unknown keys: replaced key by key

use super::schema::{QueryDefinition, SchemaDefinition, SkillPatch};

/// Apply `layers` in order on top of `base`.
pub fn merge_layers(base: SkillPatch, layers: impl IntoIterator<Item = SkillPatch>) -> SkillPatch {
    layers.into_iter().fold(base, |mut merged, layer| {
        apply_patch(&mut merged, layer);
        merged
    })
}

/// Apply one overlay onto `base`.
pub fn apply_patch(base: &mut SkillPatch, overlay: SkillPatch) {
    overwrite(&mut base.namespace, overlay.namespace);
    overwrite(&mut base.name, overlay.name);
    overwrite(&mut base.version, overlay.version);
    overwrite(&mut base.display_name, overlay.display_name);
    overwrite(&mut base.author, overlay.author);
    overwrite(&mut base.description, overlay.description);
    overwrite(&mut base.long_description, overlay.long_description);
    overwrite(&mut base.readme, overlay.readme);
    overwrite(&mut base.icon_url, overlay.icon_url);
    overwrite(&mut base.homepage_url, overlay.homepage_url);
    overwrite(&mut base.license, overlay.license);
    overwrite(&mut base.artifacts, overlay.artifacts);

    if let Some(queries) = overlay.datalog_subscriptions {
        merge_queries(
            base.datalog_subscriptions.get_or_insert_with(Vec::new),
            queries,
        );
    }
    if let Some(schemata) = overlay.schemata {
        merge_schemata(base.schemata.get_or_insert_with(Vec::new), schemata);
    }
    if let Some(paths) = overlay.datalog_subscription_paths {
        base.datalog_subscription_paths
            .get_or_insert_with(Vec::new)
            .extend(paths);
    }
    if let Some(paths) = overlay.schemata_paths {
        base.schemata_paths.get_or_insert_with(Vec::new).extend(paths);
    }

    for (key, value) in overlay.extra {
        base.extra.insert(key, value);
    }
}

fn overwrite<T>(base: &mut Option<T>, overlay: Option<T>) {
    if overlay.is_some() {
        *base = overlay;
    }
}

/// Merge queries by name: an update replaces query and limit of an existing
/// entry, unknown names are appended. Entries are never removed.
pub fn merge_queries(
    target: &mut Vec<QueryDefinition>,
    updates: impl IntoIterator<Item = QueryDefinition>,
) {
    for update in updates {
        match target.iter_mut().find(|q| q.name == update.name) {
            Some(existing) => {
                existing.query = update.query;
                existing.limit = update.limit;
            }
            None => target.push(update),
        }
    }
}

/// Merge schemas by name, replacing the body of existing entries.
pub fn merge_schemata(
    target: &mut Vec<SchemaDefinition>,
    updates: impl IntoIterator<Item = SchemaDefinition>,
) {
    for update in updates {
        match target.iter_mut().find(|s| s.name == update.name) {
            Some(existing) => existing.schema = update.schema,
            None => target.push(update),
        }
    }
}
