use crate::camera::overlay::OverlayAnnotation;
use crate::remote::types::{DetectionRow, LabelCount, ServiceStats};
use log::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Ok,
    Warn,
    Err,
}

#[derive(Debug, Clone)]
pub struct StatusLine {
    pub kind: StatusKind,
    pub msg: String,
}

/// Cursor over the paginated detection ledger. `total` comes back from the
/// service on every refresh; the page clamps to the derived page count.
#[derive(Debug, Clone, Copy)]
pub struct PageCursor {
    pub page: u32,
    pub page_size: u32,
}

impl PageCursor {
    pub fn new(page_size: u32) -> Self {
        PageCursor { page: 1, page_size: page_size.max(1) }
    }

    pub fn total_pages(&self, total: u64) -> u32 {
        let pages = (total + u64::from(self.page_size) - 1) / u64::from(self.page_size);
        pages.max(1) as u32
    }

    pub fn clamp(&mut self, total: u64) {
        self.page = self.page.clamp(1, self.total_pages(total));
    }

    pub fn next(&mut self, total: u64) {
        self.page = (self.page + 1).min(self.total_pages(total));
    }

    pub fn prev(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }
}

/// Owned, single-writer view-state store. Every response replaces its slice
/// wholesale; there are no partial merges. The overlay renderer reads this
/// state and may lag one tick behind the triggering request.
pub struct ViewState {
    pub status: StatusLine,
    pub annotation: Option<OverlayAnnotation>,
    pub detection_box: Option<[f64; 4]>,
    pub learn_count: u32,
    pub stats: ServiceStats,
    pub counts: Vec<LabelCount>,
    pub detections: Vec<DetectionRow>,
    pub detections_total: u64,
    pub learned_top: Vec<LabelCount>,
    pub learned_last: Vec<(String, String)>,
}

impl ViewState {
    pub fn new() -> Self {
        ViewState {
            status: StatusLine { kind: StatusKind::Info, msg: "Ready.".to_string() },
            annotation: None,
            detection_box: None,
            learn_count: 0,
            stats: ServiceStats::default(),
            counts: Vec::new(),
            detections: Vec::new(),
            detections_total: 0,
            learned_top: Vec::new(),
            learned_last: Vec::new(),
        }
    }

    /// Status messages double as the console's operator-facing log line.
    pub fn set_status(&mut self, kind: StatusKind, msg: impl Into<String>) {
        let msg = msg.into();
        match kind {
            StatusKind::Err => error!("⛔ {}", msg),
            StatusKind::Warn => warn!("⚠️ {}", msg),
            _ => info!("{}", msg),
        }
        self.status = StatusLine { kind, msg };
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_for_partial_last_page() {
        let cursor = PageCursor::new(25);
        assert_eq!(cursor.total_pages(30), 2);
        assert_eq!(cursor.total_pages(0), 1);
        assert_eq!(cursor.total_pages(25), 1);
        assert_eq!(cursor.total_pages(26), 2);
    }

    #[test]
    fn cursor_cannot_advance_past_last_page() {
        let mut cursor = PageCursor::new(25);
        cursor.next(30);
        assert_eq!(cursor.page, 2);
        cursor.next(30);
        assert_eq!(cursor.page, 2);
        cursor.prev();
        assert_eq!(cursor.page, 1);
        cursor.prev();
        assert_eq!(cursor.page, 1);
    }

    #[test]
    fn clamp_pulls_cursor_back_when_total_shrinks() {
        let mut cursor = PageCursor::new(25);
        cursor.page = 5;
        cursor.clamp(30);
        assert_eq!(cursor.page, 2);
    }
}
