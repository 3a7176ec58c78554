use crate::core::view_state::{PageCursor, StatusKind, ViewState};
use crate::errors::AppError;
use crate::remote::client::VisionApi;
use crate::remote::types::DetectionFilter;
use log::debug;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const DASHBOARD_POLL_MS: u64 = 2500;
pub const COUNTS_LIMIT: u32 = 20;
pub const LEARNED_LIMIT: u32 = 30;
pub const PAGE_SIZE: u32 = 25;

/// Filter state for the detection ledger view. Changing the label or time
/// window resets the page cursor to the first page.
#[derive(Debug, Clone)]
pub struct DashboardFilter {
    pub label: Option<String>,
    pub last_minutes: u32,
    pub cursor: PageCursor,
}

impl DashboardFilter {
    pub fn new() -> Self {
        DashboardFilter { label: None, last_minutes: 0, cursor: PageCursor::new(PAGE_SIZE) }
    }

    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label.filter(|l| !l.trim().is_empty());
        self.cursor.page = 1;
    }

    pub fn set_last_minutes(&mut self, minutes: u32) {
        self.last_minutes = minutes;
        self.cursor.page = 1;
    }

    pub fn to_query(&self) -> DetectionFilter {
        DetectionFilter {
            page: self.cursor.page,
            page_size: self.cursor.page_size,
            label: self.label.clone(),
            last_minutes: self.last_minutes,
        }
    }
}

impl Default for DashboardFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Lower-priority read-only refresher. Never consults the busy gate: reads
/// can overlap an in-flight capture freely.
pub struct DashboardPoller {
    service: Arc<dyn VisionApi>,
    view: Arc<Mutex<ViewState>>,
    filter: Mutex<DashboardFilter>,
}

impl DashboardPoller {
    pub fn new(service: Arc<dyn VisionApi>, view: Arc<Mutex<ViewState>>) -> Self {
        DashboardPoller { service, view, filter: Mutex::new(DashboardFilter::new()) }
    }

    pub async fn filter(&self) -> DashboardFilter {
        self.filter.lock().await.clone()
    }

    pub async fn update_filter<F>(&self, apply: F)
    where
        F: FnOnce(&mut DashboardFilter),
    {
        let mut filter = self.filter.lock().await;
        apply(&mut filter);
    }

    /// Re-fetches stats, label counts and the current detection page, then
    /// replaces the cached view state wholesale. Failures degrade to a
    /// warning status; they never escalate.
    pub async fn refresh_dashboard(&self) {
        match self.fetch_dashboard().await {
            Ok(()) => {}
            Err(e) => {
                debug!("Dashboard refresh failed: {}", e);
                let mut view = self.view.lock().await;
                view.set_status(StatusKind::Warn, "Could not load data from the backend. Is the service up?");
            }
        }
    }

    async fn fetch_dashboard(&self) -> Result<(), AppError> {
        let (stats, counts) =
            futures::try_join!(self.service.stats(), self.service.counts(COUNTS_LIMIT))?;
        let query = self.filter.lock().await.to_query();
        let page = self.service.detections(&query).await?;

        {
            let mut filter = self.filter.lock().await;
            filter.cursor.clamp(page.total);
        }
        let mut view = self.view.lock().await;
        view.stats = stats;
        view.counts = counts;
        view.detections_total = page.total;
        view.detections = page.items;
        Ok(())
    }

    /// Best-effort background refresh of the learned-objects summary.
    /// Failures are swallowed so a flaky read never alarms the operator.
    pub async fn refresh_learned(&self) {
        match self.service.learned_summary(LEARNED_LIMIT).await {
            Ok(summary) => {
                let mut view = self.view.lock().await;
                view.learned_top = summary.top;
                view.learned_last = summary.last;
            }
            Err(e) => debug!("Learned-summary refresh failed (ignored): {}", e),
        }
    }

    pub async fn tick(&self) {
        self.refresh_dashboard().await;
        self.refresh_learned().await;
    }
}
