//! End-to-end dump flow: select, choose a destination, write

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use sqlport_core::{Connection, DumpSettings};
use sqlport_schema::{SchemaCache, SchemaIntrospector};

use crate::{
    DumpError, DumpOrchestrator, DumpOutcome, DumpRequest, DumpTarget, ObjectSelector, PickList,
    SaveTarget, default_dump_file_name,
};

pub struct DumpService {
    connection: Arc<dyn Connection>,
    settings: DumpSettings,
    cache: Arc<SchemaCache>,
}

impl DumpService {
    pub fn new(connection: Arc<dyn Connection>, settings: DumpSettings) -> Self {
        Self {
            connection,
            settings,
            cache: Arc::new(SchemaCache::new()),
        }
    }

    pub fn with_cache(mut self, cache: Arc<SchemaCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn settings(&self) -> &DumpSettings {
        &self.settings
    }

    /// Dump objects of `schema`.
    ///
    /// Returns `Ok(None)` when the user backs out at the pick list or the save
    /// prompt; nothing is written in that case.
    #[tracing::instrument(skip(self, pick_list, save_target, cancel))]
    pub async fn dump(
        &self,
        schema: &str,
        request: DumpRequest,
        include_data: bool,
        pick_list: Option<&dyn PickList>,
        save_target: &dyn SaveTarget,
        cancel: &CancellationToken,
    ) -> Result<Option<DumpOutcome>, DumpError> {
        let target = DumpTarget::for_connection(self.connection.as_ref(), schema)?;
        let introspector = SchemaIntrospector::new(self.connection.clone(), target.provider());

        let file_name = default_dump_file_name(request.file_name_object(), schema);
        let Some(selection) = ObjectSelector::new(&introspector)
            .resolve(&target, &self.settings, request, pick_list)
            .await?
        else {
            return Ok(None);
        };
        let selection = selection.with_data(include_data);

        let Some(mut sink) = save_target.open_for_write(&file_name).await? else {
            tracing::info!(file = %file_name, "dump cancelled at save prompt");
            return Ok(None);
        };

        let orchestrator = DumpOrchestrator::new(self.connection.clone(), self.settings.clone())
            .with_cache(self.cache.clone());
        let outcome = orchestrator
            .dump(&target, &selection, sink.as_mut(), cancel)
            .await;
        // The sink is closed on every path; a dump error outranks a close error
        let finished = sink.finish().await;
        let outcome = outcome?;
        finished?;
        tracing::info!(file = %file_name, summary = %outcome.report().summary(), "dump saved");
        Ok(Some(outcome))
    }
}
