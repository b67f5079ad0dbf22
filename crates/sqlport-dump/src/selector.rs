//! Choosing the objects of a dump

use async_trait::async_trait;

use sqlport_core::{DialectCapabilities, DumpSettings, ObjectKind, ObjectRef};
use sqlport_schema::SchemaIntrospector;

use crate::{DumpError, DumpSelection, DumpTarget};

/// One entry offered to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickCandidate {
    pub object: ObjectRef,
    pub picked: bool,
}

/// Multi-select prompt supplied by the host UI
#[async_trait]
pub trait PickList: Send + Sync {
    /// The chosen candidates, or `None` when the user dismissed the prompt
    async fn choose(&self, candidates: Vec<PickCandidate>) -> Option<Vec<PickCandidate>>;
}

/// What the caller asked to dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpRequest {
    /// Exactly this object, without prompting
    Object(ObjectRef),
    /// The schema, narrowed through a pick list when one is supplied
    Schema,
}

impl DumpRequest {
    /// Name used in the default file name; only table dumps carry one
    pub fn file_name_object(&self) -> Option<&str> {
        match self {
            DumpRequest::Object(object) if object.kind == ObjectKind::Table => {
                Some(object.name.as_str())
            }
            _ => None,
        }
    }
}

/// Kinds to enumerate for a schema dump: tables always, the rest per settings
/// and dialect support
pub(crate) fn enabled_kinds(
    settings: &DumpSettings,
    capabilities: &DialectCapabilities,
) -> Vec<ObjectKind> {
    ObjectKind::ALL
        .into_iter()
        .filter(|kind| {
            let enabled = match kind {
                ObjectKind::Table => true,
                ObjectKind::View => settings.show_view,
                ObjectKind::Procedure => settings.show_procedure,
                ObjectKind::Function => settings.show_function,
                ObjectKind::Trigger => settings.show_trigger,
            };
            if enabled && !capabilities.supports_kind(*kind) {
                tracing::warn!(kind = %kind, "dialect cannot enumerate this kind, skipping");
                return false;
            }
            enabled
        })
        .collect()
}

/// Every object of the given kinds. Kinds the dialect rejects are skipped.
pub(crate) async fn enumerate_objects(
    introspector: &SchemaIntrospector,
    schema: &str,
    kinds: &[ObjectKind],
) -> Result<Vec<ObjectRef>, DumpError> {
    let mut objects = Vec::new();
    for kind in kinds {
        match introspector.list_objects(*kind, schema).await {
            Ok(names) => objects.extend(names.into_iter().map(|name| ObjectRef::new(*kind, name))),
            Err(e) if e.is_unsupported() => {
                tracing::warn!(kind = %kind, error = %e, "cannot enumerate objects, skipping");
            }
            Err(e) => return Err(DumpError::from_core(schema, e)),
        }
    }
    Ok(objects)
}

pub struct ObjectSelector<'a> {
    introspector: &'a SchemaIntrospector,
}

impl<'a> ObjectSelector<'a> {
    pub fn new(introspector: &'a SchemaIntrospector) -> Self {
        Self { introspector }
    }

    /// Resolve a request into a selection. `Ok(None)` means the user cancelled
    /// and nothing should be written.
    pub async fn resolve(
        &self,
        target: &DumpTarget,
        settings: &DumpSettings,
        request: DumpRequest,
        pick_list: Option<&dyn PickList>,
    ) -> Result<Option<DumpSelection>, DumpError> {
        let pick_list = match (request, pick_list) {
            (DumpRequest::Object(object), _) => {
                tracing::debug!(object = %object, "dumping a single object");
                return Ok(Some(DumpSelection::object(object)));
            }
            (DumpRequest::Schema, None) => return Ok(Some(DumpSelection::whole_schema())),
            (DumpRequest::Schema, Some(pick_list)) => pick_list,
        };

        let kinds = enabled_kinds(settings, &target.provider().capabilities());
        let candidates = enumerate_objects(self.introspector, target.schema(), &kinds)
            .await?
            .into_iter()
            .map(|object| PickCandidate {
                object,
                picked: true,
            })
            .collect::<Vec<_>>();
        tracing::debug!(schema = %target.schema(), candidates = candidates.len(), "offering dump candidates");

        let Some(chosen) = pick_list.choose(candidates).await else {
            tracing::info!(schema = %target.schema(), "dump cancelled at object selection");
            return Ok(None);
        };
        Ok(Some(
            DumpSelection::from_objects(chosen.into_iter().map(|candidate| candidate.object))
                .with_create_schema(true),
        ))
    }
}
