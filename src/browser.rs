//! Record browsing and export trigger
//!
//! [`SalesBrowser`] is what a presentation layer drives: it holds the loaded
//! records, the filter criteria and the selection, and turns every export
//! outcome into exactly one [`Alert`].

use crate::config::Config;
use crate::error::Result;
use crate::export::{ExportPipeline, Gallery, ShareTarget};
use crate::filter::{FilterCriteria, FilterEngine};
use crate::records::{HttpRecordStore, RecordStore};
use crate::selection::SelectionTracker;
use crate::session::Session;
use crate::types::{Alert, ExportMode, SalesRecord};
use std::sync::Arc;
use tracing::{debug, info};

/// Browsing state for one signed-in session
pub struct SalesBrowser {
    session: Session,
    store: Arc<dyn RecordStore>,
    records: Option<Vec<SalesRecord>>,
    criteria: FilterCriteria,
    filter: FilterEngine,
    selection: SelectionTracker,
    pipeline: ExportPipeline,
    prune_on_filter_change: bool,
    clear_selection_on_success: bool,
}

impl std::fmt::Debug for SalesBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesBrowser")
            .field("user_id", &self.session.user_id)
            .field("records", &self.records.as_ref().map(Vec::len))
            .field("criteria", &self.criteria)
            .field("selected", &self.selection.len())
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl SalesBrowser {
    /// Create a browser from explicit components
    pub fn new(
        config: &Config,
        session: Session,
        store: Arc<dyn RecordStore>,
        pipeline: ExportPipeline,
    ) -> Result<Self> {
        Ok(Self {
            session,
            store,
            records: None,
            criteria: FilterCriteria::default(),
            filter: FilterEngine::new(&config.filter)?,
            selection: SelectionTracker::new(),
            pipeline,
            prune_on_filter_change: config.selection.prune_on_filter_change,
            clear_selection_on_success: config.export.clear_selection_on_success,
        })
    }

    /// Create a browser talking to the configured HTTP service
    pub fn from_config(
        config: &Config,
        session: Session,
        share: Arc<dyn ShareTarget>,
        gallery: Arc<dyn Gallery>,
    ) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(HttpRecordStore::new(config.service.clone())?);
        let pipeline = ExportPipeline::with_http(config.export.clone(), share, gallery);
        Self::new(config, session, store, pipeline)
    }

    /// Fetch every record from the store, replacing what was loaded
    ///
    /// Returns the number of records loaded.
    pub async fn load(&mut self) -> Result<usize> {
        let records = self.store.list_records(&self.session).await?;
        let count = records.len();
        self.records = Some(records);
        info!(count, "records loaded");
        self.prune_selection();
        Ok(count)
    }

    /// Fetch one record by id without changing the loaded collection
    pub async fn record(&self, id: &str) -> Result<SalesRecord> {
        self.store.get_record(&self.session, id).await
    }

    /// Loaded records in service order, `None` before the first load
    pub fn records(&self) -> Option<&[SalesRecord]> {
        self.records.as_deref()
    }

    /// Current filter criteria
    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Replace the filter criteria
    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        debug!(?criteria, "filter changed");
        self.criteria = criteria;
        self.prune_selection();
    }

    /// Records passing the current filter, in service order
    pub fn visible(&self) -> Vec<&SalesRecord> {
        self.filter.apply(self.records.as_deref(), &self.criteria)
    }

    /// The date string the date criterion matches against
    pub fn display_date(&self, record: &SalesRecord) -> String {
        self.filter.format_date(record)
    }

    /// Toggle one image reference, returning whether it is now selected
    pub fn toggle(&mut self, image_ref: &str) -> bool {
        self.selection.toggle(image_ref)
    }

    /// Whether `image_ref` is selected
    pub fn is_selected(&self, image_ref: &str) -> bool {
        self.selection.is_selected(image_ref)
    }

    /// Select every visible image, or clear the selection if all are already selected
    pub fn toggle_select_all(&mut self) -> bool {
        let visible = self.filter.apply(self.records.as_deref(), &self.criteria);
        self.selection.toggle_select_all(&visible)
    }

    /// Whether every visible image is selected
    pub fn is_all_selected(&self) -> bool {
        self.selection.is_all_selected(&self.visible())
    }

    /// Current selection
    pub fn selection(&self) -> &SelectionTracker {
        &self.selection
    }

    /// The export pipeline (for event subscriptions and stage queries)
    pub fn pipeline(&self) -> &ExportPipeline {
        &self.pipeline
    }

    /// The session this browser acts for
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Mutable session access, e.g. for signing out
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// "Save as Zip": archive the selected images and share the archive
    pub async fn save_as_zip(&mut self) -> Alert {
        self.export(ExportMode::Archive).await
    }

    /// "Save Images": save each selected image to the gallery
    pub async fn save_images(&mut self) -> Alert {
        self.export(ExportMode::Gallery).await
    }

    /// Run an export of the current selection and return the alert to show
    pub async fn export(&mut self, mode: ExportMode) -> Alert {
        let selection = self.selection.as_slice().to_vec();
        match self.pipeline.export(mode, &selection).await {
            Ok(report) => {
                if self.clear_selection_on_success {
                    self.selection.clear();
                }
                Alert::for_report(&report)
            }
            Err(e) => e.alert(),
        }
    }

    fn prune_selection(&mut self) {
        if !self.prune_on_filter_change {
            return;
        }
        let visible = self.filter.apply(self.records.as_deref(), &self.criteria);
        let removed = self.selection.retain_visible(&visible);
        if removed > 0 {
            debug!(removed, "dropped selections hidden by the filter");
        }
    }
}
