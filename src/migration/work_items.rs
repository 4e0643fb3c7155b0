//! Work item phases.
//!
//! The first pass copies each selected source work item into a new target
//! work item and records `source id -> target id` in an [`IdMap`]. The
//! second pass walks the source relations again and adds the links between
//! the new items, which is only possible once every item exists.
//!
//! Created items carry the `ado-migrated`, `migrated-from-<id>` and
//! source project tags. Before the first pass those tags are read back from
//! the target to fill the [`IdMap`], so a second run creates nothing new.
//! Items tagged for a different source project are ignored.

use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

use super::marker::{self, MIGRATED_TAG};
use super::{MigrationContext, item_failure};
use crate::api::{PatchOperation, extract_work_item_id};
use crate::core::output::{ItemOutcome, Phase, ProgressEvent, SummaryCounts};
use crate::error::ApiError;
use crate::models::{WorkItem, WorkItemRelation};

/// Selects every work item of the source project.
pub const DEFAULT_QUERY: &str =
    "SELECT [System.Id] FROM WorkItems WHERE [System.TeamProject] = @project ORDER BY [System.Id]";

/// Fields copied verbatim when present.
const COPIED_FIELDS: [&str; 4] = [
    "System.Description",
    "Microsoft.VSTS.Common.Priority",
    "Microsoft.VSTS.Common.AcceptanceCriteria",
    "Microsoft.VSTS.TCM.ReproSteps",
];

/// Classification paths, rooted at the project name.
const PATH_FIELDS: [&str; 2] = ["System.AreaPath", "System.IterationPath"];

const HYPERLINK: &str = "Hyperlink";
const HIERARCHY_REVERSE: &str = "System.LinkTypes.Hierarchy-Reverse";
const HIERARCHY_FORWARD: &str = "System.LinkTypes.Hierarchy-Forward";

/// Source work item id to target work item id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMap(BTreeMap<i32, i32>);

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source_id: i32, target_id: i32) {
        self.0.insert(source_id, target_id);
    }

    pub fn get(&self, source_id: i32) -> Option<i32> {
        self.0.get(&source_id).copied()
    }

    pub fn contains(&self, source_id: i32) -> bool {
        self.0.contains_key(&source_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.0.iter().map(|(s, t)| (*s, *t))
    }
}

/// Runs the configured WIQL query on the source and reads the matching
/// items with their relations, ordered by id.
pub async fn load_source_items(ctx: &MigrationContext) -> Result<Vec<WorkItem>, ApiError> {
    let query = ctx
        .config
        .work_item_query
        .as_ref()
        .map(|q| q.value().as_str())
        .unwrap_or(DEFAULT_QUERY);
    debug!(query, "Querying source work items");

    let ids = ctx.source.query_work_item_ids(query).await?;
    let mut items = ctx.source.get_work_items(&ids).await?;
    items.sort_by_key(|item| item.id);
    Ok(items)
}

/// Adds the mappings recorded by earlier runs to `id_map`. Returns how many
/// were found.
pub async fn prefill_id_map(ctx: &MigrationContext, id_map: &mut IdMap) -> Result<usize, ApiError> {
    let query = format!(
        "SELECT [System.Id] FROM WorkItems WHERE [System.TeamProject] = @project AND [System.Tags] CONTAINS '{}'",
        MIGRATED_TAG
    );
    let ids = ctx.target.query_work_item_ids(&query).await?;
    let items = ctx.target.get_work_items(&ids).await?;

    let project_tag = ctx.source_project_tag();
    let mut found = 0;
    for item in &items {
        if let Some(source_id) = item
            .tags()
            .and_then(|tags| marker::source_id_from_tags(tags, &project_tag))
        {
            id_map.insert(source_id, item.id);
            found += 1;
        }
    }
    debug!(found, "Loaded work item mappings from earlier runs");
    Ok(found)
}

/// First pass: creates a target work item for every source item that has
/// no mapping yet.
pub async fn migrate_work_items(
    ctx: &MigrationContext,
    source_items: &[WorkItem],
    id_map: &mut IdMap,
) -> Result<Vec<ItemOutcome>, ApiError> {
    ctx.report(ProgressEvent::PhaseStart {
        phase: Phase::WorkItems,
        total: source_items.len(),
    });

    let mut outcomes = Vec::with_capacity(source_items.len());
    for item in source_items {
        let outcome = migrate_work_item(ctx, item, id_map).await?;
        outcomes.push(ctx.complete(outcome));
    }

    ctx.report(ProgressEvent::PhaseComplete {
        phase: Phase::WorkItems,
        counts: SummaryCounts::from_outcomes(&outcomes),
    });
    Ok(outcomes)
}

async fn migrate_work_item(
    ctx: &MigrationContext,
    item: &WorkItem,
    id_map: &mut IdMap,
) -> Result<ItemOutcome, ApiError> {
    let name = format!("#{}", item.id);
    if let Some(target_id) = id_map.get(item.id) {
        debug!(work_item = item.id, target = target_id, "Already migrated, skipping");
        return Ok(ItemOutcome::skipped(
            Phase::WorkItems,
            name,
            format!("already migrated as #{}", target_id),
        ));
    }

    let roots = (
        ctx.config.source.project.value().as_str(),
        ctx.config.target.project.value().as_str(),
    );
    let project_tag = ctx.source_project_tag();
    let mut notes = String::new();
    let patch = create_patch(item, &project_tag, Some(roots));
    let created = match ctx.target.create_work_item(item.work_item_type(), &patch).await {
        Ok(created) => created,
        Err(e) if is_bad_request(&e) && has_paths(item) => {
            // Usually an area or iteration that does not exist in the target.
            warn!(work_item = item.id, error = %e, "Create rejected, retrying at the project root");
            match ctx
                .target
                .create_work_item(item.work_item_type(), &create_patch(item, &project_tag, None))
                .await
            {
                Ok(created) => {
                    notes.push_str(", area/iteration reset to project root");
                    created
                }
                Err(e) => return item_failure(Phase::WorkItems, name, e),
            }
        }
        Err(e) => {
            warn!(work_item = item.id, error = %e, "Failed to create work item");
            return item_failure(Phase::WorkItems, name, e);
        }
    };
    id_map.insert(item.id, created.id);
    info!(work_item = item.id, target = created.id, "Created work item");

    if let Some(state) = item.state()
        && created.state() != Some(state)
    {
        let patch = [PatchOperation::add_field("System.State", state)];
        match ctx.target.update_work_item(created.id, &patch).await {
            Ok(_) => {}
            Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized),
            Err(e) => {
                warn!(work_item = item.id, state, error = %e, "State transition rejected");
                notes.push_str(&format!(
                    ", state kept at {}",
                    created.state().unwrap_or("initial state")
                ));
            }
        }
    }

    Ok(ItemOutcome::migrated(
        Phase::WorkItems,
        name,
        format!("created as #{}{}", created.id, notes),
    ))
}

/// Field patch for a new target item. `roots` is `(source project, target
/// project)`; `None` leaves the classification paths out.
pub fn create_patch(
    item: &WorkItem,
    project_tag: &str,
    roots: Option<(&str, &str)>,
) -> Vec<PatchOperation> {
    let title = match item.title() {
        "" => format!("Untitled work item {}", item.id),
        title => title.to_string(),
    };
    let mut patch = vec![
        PatchOperation::add_field("System.Title", title),
        PatchOperation::add_field(
            "System.Tags",
            marker::merge_tags(item.tags(), item.id, project_tag),
        ),
    ];

    for field in COPIED_FIELDS {
        if let Some(value) = item.fields.get(field).filter(|v| !v.is_null()) {
            patch.push(PatchOperation::add_field(field, value.clone()));
        }
    }

    if let Some((source_root, target_root)) = roots {
        for field in PATH_FIELDS {
            if let Some(path) = item.field_str(field) {
                patch.push(PatchOperation::add_field(
                    field,
                    rewrite_path(path, source_root, target_root),
                ));
            }
        }
    }
    patch
}

/// Replaces the project root of an area or iteration path.
pub fn rewrite_path(path: &str, source_root: &str, target_root: &str) -> String {
    match path.split_once('\\') {
        Some((root, rest)) if root.eq_ignore_ascii_case(source_root) => {
            format!("{}\\{}", target_root, rest)
        }
        None if path.eq_ignore_ascii_case(source_root) => target_root.to_string(),
        _ => path.to_string(),
    }
}

fn has_paths(item: &WorkItem) -> bool {
    PATH_FIELDS.iter().any(|f| item.field_str(f).is_some())
}

fn is_bad_request(error: &ApiError) -> bool {
    matches!(error, ApiError::RequestFailed { status: 400, .. })
}

// ============================================================================
// Relations
// ============================================================================

/// What to do with one source relation.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationAction {
    /// Add this relation to the target item.
    Add(PatchOperation),
    /// The target item already has the link.
    AlreadyPresent,
    /// The other end has no target counterpart.
    Unresolved(String),
    /// Links to source-side artifacts such as commits or builds.
    Unsupported,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRelation {
    /// `#<source id> -> <other end> (<link type>)`
    pub label: String,
    pub action: RelationAction,
}

/// Returns true if `own_id` adds the link rather than its partner.
///
/// Every work item link shows up on both ends. It is added from one side
/// only: parent links from the child, other directional links from their
/// `-Forward` side, symmetric links from the lower id. When the partner is
/// not processed in this run, this side always adds it.
pub fn owns_link(rel: &str, own_id: i32, partner_id: i32, partner_processed: bool) -> bool {
    if !partner_processed {
        return true;
    }
    if rel == HIERARCHY_REVERSE {
        return true;
    }
    if rel == HIERARCHY_FORWARD {
        return false;
    }
    if rel.ends_with("-Forward") {
        return true;
    }
    if rel.ends_with("-Reverse") {
        return false;
    }
    own_id <= partner_id
}

fn short_rel(rel: &str) -> &str {
    rel.strip_prefix("System.LinkTypes.").unwrap_or(rel)
}

fn is_present(existing: &[WorkItemRelation], rel: &str, url: &str) -> bool {
    existing
        .iter()
        .any(|r| r.rel == rel && r.url.eq_ignore_ascii_case(url))
}

/// Plans the relations of one source item.
///
/// `processed` says whether a source id is migrated and handled by this
/// relation pass; `target_url` builds target work item URLs; `existing`
/// are the relations the target item already has.
pub fn plan_relations(
    item: &WorkItem,
    id_map: &IdMap,
    processed: impl Fn(i32) -> bool,
    target_url: impl Fn(i32) -> String,
    existing: &[WorkItemRelation],
) -> Vec<PlannedRelation> {
    let mut planned = Vec::new();
    for relation in &item.relations {
        if relation.rel == HYPERLINK {
            let label = format!("#{} -> {} ({})", item.id, relation.url, HYPERLINK);
            let action = if is_present(existing, HYPERLINK, &relation.url) {
                RelationAction::AlreadyPresent
            } else {
                RelationAction::Add(PatchOperation::add_relation(
                    HYPERLINK,
                    &relation.url,
                    relation.comment.as_deref(),
                ))
            };
            planned.push(PlannedRelation { label, action });
            continue;
        }

        let Some(partner) = extract_work_item_id(&relation.url) else {
            planned.push(PlannedRelation {
                label: format!("#{} -> {}", item.id, relation.rel),
                action: RelationAction::Unsupported,
            });
            continue;
        };

        if !owns_link(&relation.rel, item.id, partner, processed(partner)) {
            continue;
        }

        let label = format!("#{} -> #{} ({})", item.id, partner, short_rel(&relation.rel));
        let action = match id_map.get(partner) {
            None => RelationAction::Unresolved(format!("work item #{} was not migrated", partner)),
            Some(target_id) => {
                let url = target_url(target_id);
                if is_present(existing, &relation.rel, &url) {
                    RelationAction::AlreadyPresent
                } else {
                    RelationAction::Add(PatchOperation::add_relation(
                        &relation.rel,
                        &url,
                        relation.comment.as_deref(),
                    ))
                }
            }
        };
        planned.push(PlannedRelation { label, action });
    }
    planned
}

/// Second pass: adds the links between migrated items.
pub async fn migrate_relations(
    ctx: &MigrationContext,
    source_items: &[WorkItem],
    id_map: &IdMap,
) -> Result<Vec<ItemOutcome>, ApiError> {
    let in_batch: HashSet<i32> = source_items.iter().map(|item| item.id).collect();
    let owners: Vec<(&WorkItem, i32)> = source_items
        .iter()
        .filter_map(|item| id_map.get(item.id).map(|target_id| (item, target_id)))
        .collect();

    let target_ids: Vec<i32> = owners.iter().map(|(_, target_id)| *target_id).collect();
    let current: HashMap<i32, WorkItem> = ctx
        .target
        .get_work_items(&target_ids)
        .await?
        .into_iter()
        .map(|item| (item.id, item))
        .collect();

    let processed = |id: i32| in_batch.contains(&id) && id_map.contains(id);
    let plans: Vec<(i32, Vec<PlannedRelation>)> = owners
        .iter()
        .map(|(item, target_id)| {
            let existing = current
                .get(target_id)
                .map(|t| t.relations.as_slice())
                .unwrap_or_default();
            let plan = plan_relations(
                item,
                id_map,
                processed,
                |id| ctx.target.work_item_url(id),
                existing,
            );
            (*target_id, plan)
        })
        .collect();

    ctx.report(ProgressEvent::PhaseStart {
        phase: Phase::Relations,
        total: plans.iter().map(|(_, plan)| plan.len()).sum(),
    });

    let mut outcomes = Vec::new();
    for (target_id, plan) in plans {
        let mut additions = Vec::new();
        for planned in plan {
            let outcome = match planned.action {
                RelationAction::Add(op) => {
                    additions.push((planned.label, op));
                    continue;
                }
                RelationAction::AlreadyPresent => {
                    ItemOutcome::skipped(Phase::Relations, planned.label, "already linked")
                }
                RelationAction::Unresolved(reason) => {
                    warn!(relation = %planned.label, "{}", reason);
                    ItemOutcome::unresolved(Phase::Relations, planned.label, reason)
                }
                RelationAction::Unsupported => ItemOutcome::skipped(
                    Phase::Relations,
                    planned.label,
                    "links to source artifacts are not migrated",
                ),
            };
            outcomes.push(ctx.complete(outcome));
        }

        if !additions.is_empty() {
            for outcome in add_links(ctx, target_id, additions).await? {
                outcomes.push(ctx.complete(outcome));
            }
        }
    }

    ctx.report(ProgressEvent::PhaseComplete {
        phase: Phase::Relations,
        counts: SummaryCounts::from_outcomes(&outcomes),
    });
    Ok(outcomes)
}

/// Adds all links of one target item in a single update. If the update is
/// rejected, each link is retried alone so one bad link does not block the
/// others.
async fn add_links(
    ctx: &MigrationContext,
    target_id: i32,
    additions: Vec<(String, PatchOperation)>,
) -> Result<Vec<ItemOutcome>, ApiError> {
    let linked = |label: String| {
        ItemOutcome::migrated(Phase::Relations, label, format!("linked on #{}", target_id))
    };

    let patch: Vec<PatchOperation> = additions.iter().map(|(_, op)| op.clone()).collect();
    let batch_error = match ctx.target.update_work_item(target_id, &patch).await {
        Ok(_) => return Ok(additions.into_iter().map(|(label, _)| linked(label)).collect()),
        Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized),
        Err(e) => e,
    };

    if let [(label, _)] = additions.as_slice() {
        warn!(relation = %label, error = %batch_error, "Failed to add link");
        return item_failure(Phase::Relations, label.clone(), batch_error).map(|o| vec![o]);
    }

    debug!(work_item = target_id, error = %batch_error, "Link batch rejected, adding links one by one");
    let mut outcomes = Vec::with_capacity(additions.len());
    for (label, op) in additions {
        let outcome = match ctx
            .target
            .update_work_item(target_id, std::slice::from_ref(&op))
            .await
        {
            Ok(_) => linked(label),
            Err(e) => {
                warn!(relation = %label, error = %e, "Failed to add link");
                item_failure(Phase::Relations, label, e)?
            }
        };
        outcomes.push(outcome);
    }
    Ok(outcomes)
}
