use crate::camera::overlay::{BadgeColor, OverlayAnnotation};
use crate::core::busy_gate::BusyGate;
use crate::core::frame_source::FrameSource;
use crate::core::poller::DashboardPoller;
use crate::core::view_state::{StatusKind, ViewState};
use crate::remote::client::VisionApi;
use crate::remote::types::{FrameQuery, LearnResponse, RecognizeResponse};
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Continuous modes never tick faster than this.
pub const STEADY_FLOOR_MS: u64 = 700;
/// Floor for the cooldown hint sent with an explicit learn action.
pub const SINGLE_LEARN_FLOOR_MS: u64 = 400;
/// Minimum confidence for a recognized object to be presented as a valid
/// inventory registration.
pub const MIN_SAVE_SCORE: f64 = 0.94;
pub const DEFAULT_COOLDOWN_MS: u64 = 1200;

/// A structurally exclusive scan mode: the console is either idle, learning
/// continuously, or autoscanning continuously, never two at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Idle,
    Learning,
    Autoscanning,
}

/// Out-of-band read refresh owed after a submission, executed once the busy
/// gate has been released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Followup {
    None,
    RefreshLearned,
    RefreshDashboard,
}

/// Period of the continuous-mode capture timers.
pub fn clamped_tick_ms(cooldown_ms: u64) -> u64 {
    effective_cooldown(cooldown_ms).max(STEADY_FLOOR_MS)
}

/// Cooldown hint carried on learn submissions.
pub fn learn_cooldown_hint_ms(cooldown_ms: u64) -> u64 {
    effective_cooldown(cooldown_ms).max(SINGLE_LEARN_FLOOR_MS)
}

fn effective_cooldown(cooldown_ms: u64) -> u64 {
    if cooldown_ms == 0 { DEFAULT_COOLDOWN_MS } else { cooldown_ms }
}

pub struct LearnOutcome {
    pub saved: bool,
    pub annotation: OverlayAnnotation,
    pub status_kind: StatusKind,
    pub status_msg: String,
}

/// Classify a learn response. A positive annotation is only produced when the
/// server actually persisted the sample, not merely attempted to.
pub fn classify_learn(label: &str, resp: &LearnResponse) -> LearnOutcome {
    if resp.saved {
        LearnOutcome {
            saved: true,
            annotation: OverlayAnnotation {
                title: format!("Learned: {}", label),
                subtitle: "Sample stored. It should be recognizable now.".to_string(),
                badge: Some("Saved".to_string()),
                badge_color: BadgeColor::Success,
            },
            status_kind: StatusKind::Ok,
            status_msg: format!("Sample stored for \"{}\".", label),
        }
    } else {
        let reason = resp.reason.clone().unwrap_or_else(|| "conditions not met".to_string());
        LearnOutcome {
            saved: false,
            annotation: OverlayAnnotation {
                title: format!("Learning: {}", label),
                subtitle: format!("Not stored: {}", reason),
                badge: Some("Adjust position/light".to_string()),
                badge_color: BadgeColor::Warning,
            },
            status_kind: StatusKind::Warn,
            status_msg: format!("Not stored: {}", reason),
        }
    }
}

pub struct RecognizeOutcome {
    /// Whether the visible badge may claim a successful inventory
    /// registration. Client-side display policy: confidences below
    /// [`MIN_SAVE_SCORE`] never claim success, whatever the server saved.
    pub registered: bool,
    pub annotation: OverlayAnnotation,
    pub status_kind: StatusKind,
    pub status_msg: String,
}

pub fn classify_recognize(resp: &RecognizeResponse, save: bool) -> RecognizeOutcome {
    let score_txt = resp.score.map(|s| format!("{:.2}", s)).unwrap_or_else(|| "-".to_string());

    if !resp.recognized {
        let subtitle = match &resp.reason {
            Some(reason) => format!("Reason: {}", reason),
            None => "Center the object inside the green guide".to_string(),
        };
        let status_msg = match &resp.reason {
            Some(reason) => format!("No: {}", reason),
            None => "Not recognized.".to_string(),
        };
        return RecognizeOutcome {
            registered: false,
            annotation: OverlayAnnotation {
                title: "Not recognized".to_string(),
                subtitle,
                badge: Some("Adjust reticle".to_string()),
                badge_color: BadgeColor::Warning,
            },
            status_kind: StatusKind::Warn,
            status_msg,
        };
    }

    let label = resp.label.clone().unwrap_or_else(|| "Unknown".to_string());
    if save {
        let meets = resp.score.map_or(false, |s| s >= MIN_SAVE_SCORE);
        RecognizeOutcome {
            registered: meets,
            annotation: OverlayAnnotation {
                title: format!("Detected: {}", label),
                subtitle: format!("Confidence: {} (minimum to register: {})", score_txt, MIN_SAVE_SCORE),
                badge: Some(if meets {
                    "Saved to inventory".to_string()
                } else {
                    "Low confidence: NOT saved".to_string()
                }),
                badge_color: if meets { BadgeColor::Success } else { BadgeColor::Warning },
            },
            status_kind: if meets { StatusKind::Ok } else { StatusKind::Warn },
            status_msg: if meets {
                format!("Entry registered: {}", label)
            } else {
                format!("Not registered (conf {} < {}).", score_txt, MIN_SAVE_SCORE)
            },
        }
    } else {
        RecognizeOutcome {
            registered: false,
            annotation: OverlayAnnotation {
                title: format!("Detected: {}", label),
                subtitle: format!("Confidence: {}", score_txt),
                badge: Some("Recognized".to_string()),
                badge_color: BadgeColor::Info,
            },
            status_kind: StatusKind::Ok,
            status_msg: format!("Recognized: {} ({})", label, score_txt),
        }
    }
}

/// The capture state machine. Holds the single busy gate, the scan mode and
/// the per-tick pipeline: try-acquire gate, sample frame, submit, classify,
/// update view state, release gate. Ticks that find the gate held are
/// dropped outright.
pub struct CaptureCoordinator {
    frames: Arc<dyn FrameSource>,
    service: Arc<dyn VisionApi>,
    poller: Arc<DashboardPoller>,
    view: Arc<Mutex<ViewState>>,
    gate: BusyGate,
    mode: Mutex<ScanMode>,
    learn_label: Mutex<Option<String>>,
    cooldown_ms: u64,
    ignore_person: bool,
}

impl CaptureCoordinator {
    pub fn new(
        frames: Arc<dyn FrameSource>,
        service: Arc<dyn VisionApi>,
        poller: Arc<DashboardPoller>,
        view: Arc<Mutex<ViewState>>,
        cooldown_ms: u64,
        ignore_person: bool,
    ) -> Self {
        CaptureCoordinator {
            frames,
            service,
            poller,
            view,
            gate: BusyGate::new(),
            mode: Mutex::new(ScanMode::Idle),
            learn_label: Mutex::new(None),
            cooldown_ms,
            ignore_person,
        }
    }

    pub fn gate(&self) -> &BusyGate {
        &self.gate
    }

    pub async fn mode(&self) -> ScanMode {
        *self.mode.lock().await
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(clamped_tick_ms(self.cooldown_ms))
    }

    pub async fn set_learn_label(&self, label: Option<String>) {
        *self.learn_label.lock().await = label;
    }

    /// Arms continuous learn mode. Refuses (with a warning status) when no
    /// usable label is set; entering the mode resets the sample counter.
    pub async fn enter_learning(&self) -> bool {
        let label = self.trimmed_label().await;
        if label.is_empty() {
            let mut view = self.view.lock().await;
            view.set_status(StatusKind::Warn, "Type a label to learn first (e.g. 'glasses').");
            return false;
        }
        *self.mode.lock().await = ScanMode::Learning;
        let mut view = self.view.lock().await;
        view.learn_count = 0;
        view.set_status(StatusKind::Info, format!("Learn mode ON: {}", label));
        true
    }

    pub async fn enter_autoscan(&self) {
        *self.mode.lock().await = ScanMode::Autoscanning;
        let mut view = self.view.lock().await;
        view.set_status(StatusKind::Info, "AutoScan ON.");
    }

    /// The camera-stop side of cancellation: disarms any continuous mode.
    /// An in-flight request still completes and releases the gate on its own.
    pub async fn force_idle(&self) {
        let mut mode = self.mode.lock().await;
        if *mode != ScanMode::Idle {
            *mode = ScanMode::Idle;
            drop(mode);
            let mut view = self.view.lock().await;
            view.set_status(StatusKind::Info, "Scan mode off.");
        }
    }

    /// One continuous-learn timer tick. Skipped entirely when the mode is no
    /// longer Learning or a capture is already in flight.
    pub async fn learn_tick(&self) {
        if *self.mode.lock().await != ScanMode::Learning {
            return;
        }
        let Some(permit) = self.gate.try_acquire() else {
            debug!("⏭️ Learn tick dropped: capture already in flight.");
            return;
        };
        let followup = self.submit_learn().await;
        drop(permit);
        self.run_followup(followup).await;
    }

    /// One autoscan timer tick: recognize-and-register.
    pub async fn autoscan_tick(&self) {
        if *self.mode.lock().await != ScanMode::Autoscanning {
            return;
        }
        let Some(permit) = self.gate.try_acquire() else {
            debug!("⏭️ Autoscan tick dropped: capture already in flight.");
            return;
        };
        let followup = self.submit_recognize(true).await;
        drop(permit);
        self.run_followup(followup).await;
    }

    /// Single explicit learn action, independent of the timer.
    pub async fn learn_once(&self) {
        let Some(permit) = self.gate.try_acquire() else {
            let mut view = self.view.lock().await;
            view.set_status(StatusKind::Warn, "A capture is already in flight, try again.");
            return;
        };
        let followup = self.submit_learn().await;
        drop(permit);
        self.run_followup(followup).await;
    }

    /// Single explicit recognition, optionally registering the result.
    pub async fn recognize_once(&self, save: bool) {
        let Some(permit) = self.gate.try_acquire() else {
            let mut view = self.view.lock().await;
            view.set_status(StatusKind::Warn, "A capture is already in flight, try again.");
            return;
        };
        let followup = self.submit_recognize(save).await;
        drop(permit);
        self.run_followup(followup).await;
    }

    async fn trimmed_label(&self) -> String {
        self.learn_label
            .lock()
            .await
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_string()
    }

    async fn run_followup(&self, followup: Followup) {
        match followup {
            Followup::None => {}
            Followup::RefreshLearned => self.poller.refresh_learned().await,
            Followup::RefreshDashboard => self.poller.refresh_dashboard().await,
        }
    }

    async fn sample_or_report(&self) -> Option<Vec<u8>> {
        match self.frames.sample().await {
            Ok(Some(frame)) => Some(frame.jpeg),
            Ok(None) => {
                let mut view = self.view.lock().await;
                view.set_status(StatusKind::Warn, "Could not capture frame (camera off).");
                None
            }
            Err(e) => {
                let mut view = self.view.lock().await;
                view.set_status(StatusKind::Err, format!("Capture failed: {}", e));
                None
            }
        }
    }

    async fn submit_learn(&self) -> Followup {
        let label = self.trimmed_label().await;
        if label.is_empty() {
            let mut view = self.view.lock().await;
            view.set_status(StatusKind::Warn, "Type a label to learn first (e.g. 'glasses').");
            return Followup::None;
        }
        let Some(jpeg) = self.sample_or_report().await else {
            return Followup::None;
        };

        let query = FrameQuery {
            label: Some(label.clone()),
            cooldown_ms: Some(learn_cooldown_hint_ms(self.cooldown_ms)),
            ignore_person: self.ignore_person,
            ..Default::default()
        };
        match self.service.learn_frame(jpeg, &query).await {
            Ok(resp) => {
                let outcome = classify_learn(&label, &resp);
                let mut view = self.view.lock().await;
                view.detection_box = resp.detection_box();
                if outcome.saved {
                    view.learn_count += 1;
                }
                view.annotation = Some(outcome.annotation);
                view.set_status(outcome.status_kind, outcome.status_msg);
                if outcome.saved { Followup::RefreshLearned } else { Followup::None }
            }
            Err(e) => {
                let mut view = self.view.lock().await;
                view.set_status(StatusKind::Err, format!("Learn failed: {}", e));
                Followup::None
            }
        }
    }

    async fn submit_recognize(&self, save: bool) -> Followup {
        let Some(jpeg) = self.sample_or_report().await else {
            return Followup::None;
        };

        let query = FrameQuery {
            save: Some(save),
            force_save: Some(false),
            ignore_person: self.ignore_person,
            ..Default::default()
        };
        match self.service.vision_frame(jpeg, &query).await {
            Ok(resp) => {
                let outcome = classify_recognize(&resp, save);
                let mut view = self.view.lock().await;
                view.detection_box = resp.bbox;
                view.annotation = Some(outcome.annotation);
                view.set_status(outcome.status_kind, outcome.status_msg);
                // A save attempt refreshes the ledger whatever the gate said.
                if save { Followup::RefreshDashboard } else { Followup::None }
            }
            Err(e) => {
                let mut view = self.view.lock().await;
                view.set_status(StatusKind::Err, format!("Recognition failed: {}", e));
                Followup::None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::sampler::SampledFrame;
    use crate::errors::AppError;
    use crate::remote::types::{
        DetectionFilter, DetectionPage, LabelCount, LearnedSummary, ServiceStats,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticFrames;

    #[async_trait]
    impl FrameSource for StaticFrames {
        async fn sample(&self) -> Result<Option<SampledFrame>, AppError> {
            Ok(Some(SampledFrame { jpeg: vec![0xff, 0xd8] }))
        }
    }

    struct NoFrames;

    #[async_trait]
    impl FrameSource for NoFrames {
        async fn sample(&self) -> Result<Option<SampledFrame>, AppError> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct ScriptedService {
        learn_saved: bool,
        recognize_score: Option<f64>,
        submit_delay_ms: u64,
        learn_calls: AtomicUsize,
        vision_calls: AtomicUsize,
        summary_calls: AtomicUsize,
        stats_calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    impl ScriptedService {
        async fn enter_submit(&self) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            if self.submit_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.submit_delay_ms)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl VisionApi for ScriptedService {
        async fn learn_frame(&self, _image: Vec<u8>, _query: &FrameQuery) -> Result<LearnResponse, AppError> {
            self.learn_calls.fetch_add(1, Ordering::SeqCst);
            self.enter_submit().await;
            Ok(LearnResponse { saved: self.learn_saved, ..Default::default() })
        }

        async fn vision_frame(&self, _image: Vec<u8>, _query: &FrameQuery) -> Result<RecognizeResponse, AppError> {
            self.vision_calls.fetch_add(1, Ordering::SeqCst);
            self.enter_submit().await;
            Ok(RecognizeResponse {
                recognized: self.recognize_score.is_some(),
                label: Some("mouse".to_string()),
                score: self.recognize_score,
                ..Default::default()
            })
        }

        async fn stats(&self) -> Result<ServiceStats, AppError> {
            self.stats_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ServiceStats::default())
        }

        async fn counts(&self, _limit: u32) -> Result<Vec<LabelCount>, AppError> {
            Ok(Vec::new())
        }

        async fn detections(&self, _filter: &DetectionFilter) -> Result<DetectionPage, AppError> {
            Ok(DetectionPage::default())
        }

        async fn learned_summary(&self, _limit: u32) -> Result<LearnedSummary, AppError> {
            self.summary_calls.fetch_add(1, Ordering::SeqCst);
            Ok(LearnedSummary::default())
        }
    }

    fn build(
        frames: Arc<dyn FrameSource>,
        service: Arc<ScriptedService>,
    ) -> (Arc<CaptureCoordinator>, Arc<Mutex<ViewState>>) {
        let view = Arc::new(Mutex::new(ViewState::new()));
        let api: Arc<dyn VisionApi> = service;
        let poller = Arc::new(DashboardPoller::new(Arc::clone(&api), Arc::clone(&view)));
        let coordinator = Arc::new(CaptureCoordinator::new(
            frames,
            api,
            poller,
            Arc::clone(&view),
            1200,
            true,
        ));
        (coordinator, view)
    }

    #[test]
    fn cooldown_clamping() {
        assert_eq!(clamped_tick_ms(100), 700);
        assert_eq!(clamped_tick_ms(1200), 1200);
        assert_eq!(clamped_tick_ms(0), 1200);
        assert_eq!(learn_cooldown_hint_ms(100), 400);
        assert_eq!(learn_cooldown_hint_ms(1200), 1200);
    }

    #[test]
    fn sub_threshold_save_renders_not_registered() {
        let resp = RecognizeResponse {
            recognized: true,
            label: Some("mouse".to_string()),
            score: Some(0.93),
            ..Default::default()
        };
        let outcome = classify_recognize(&resp, true);
        assert!(!outcome.registered);
        assert_eq!(outcome.status_kind, StatusKind::Warn);
        assert_eq!(outcome.annotation.badge.as_deref(), Some("Low confidence: NOT saved"));
    }

    #[test]
    fn threshold_save_renders_registered() {
        let resp = RecognizeResponse {
            recognized: true,
            label: Some("mouse".to_string()),
            score: Some(0.94),
            ..Default::default()
        };
        let outcome = classify_recognize(&resp, true);
        assert!(outcome.registered);
        assert_eq!(outcome.status_kind, StatusKind::Ok);
        assert_eq!(outcome.annotation.badge.as_deref(), Some("Saved to inventory"));
    }

    #[test]
    fn recognize_without_save_is_informational() {
        let resp = RecognizeResponse {
            recognized: true,
            label: Some("mouse".to_string()),
            score: Some(0.5),
            ..Default::default()
        };
        let outcome = classify_recognize(&resp, false);
        assert!(!outcome.registered);
        assert_eq!(outcome.status_kind, StatusKind::Ok);
        assert_eq!(outcome.annotation.badge.as_deref(), Some("Recognized"));
    }

    #[test]
    fn unrecognized_surfaces_server_reason() {
        let resp = RecognizeResponse {
            recognized: false,
            reason: Some("person in frame".to_string()),
            ..Default::default()
        };
        let outcome = classify_recognize(&resp, true);
        assert_eq!(outcome.status_msg, "No: person in frame");
        assert_eq!(outcome.status_kind, StatusKind::Warn);
    }

    #[test]
    fn learn_outcomes() {
        let saved = classify_learn("mouse", &LearnResponse { saved: true, ..Default::default() });
        assert!(saved.saved);
        assert_eq!(saved.status_kind, StatusKind::Ok);

        let rejected = classify_learn(
            "mouse",
            &LearnResponse { saved: false, reason: Some("blurry".to_string()), ..Default::default() },
        );
        assert!(!rejected.saved);
        assert_eq!(rejected.status_msg, "Not stored: blurry");
    }

    #[tokio::test]
    async fn saved_learn_increments_counter_and_refreshes_summary_once() {
        let service = Arc::new(ScriptedService { learn_saved: true, ..Default::default() });
        let (coordinator, view) = build(Arc::new(StaticFrames), Arc::clone(&service));
        coordinator.set_learn_label(Some("mouse".to_string())).await;
        assert!(coordinator.enter_learning().await);

        coordinator.learn_tick().await;
        assert_eq!(view.lock().await.learn_count, 1);
        assert_eq!(service.summary_calls.load(Ordering::SeqCst), 1);

        coordinator.learn_tick().await;
        assert_eq!(view.lock().await.learn_count, 2);
        assert_eq!(service.summary_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unsaved_learn_leaves_counter_and_summary_alone() {
        let service = Arc::new(ScriptedService { learn_saved: false, ..Default::default() });
        let (coordinator, view) = build(Arc::new(StaticFrames), Arc::clone(&service));
        coordinator.set_learn_label(Some("mouse".to_string())).await;
        coordinator.enter_learning().await;

        coordinator.learn_tick().await;
        assert_eq!(view.lock().await.learn_count, 0);
        assert_eq!(service.summary_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_label_short_circuits_before_any_network_call() {
        let service = Arc::new(ScriptedService { learn_saved: true, ..Default::default() });
        let (coordinator, view) = build(Arc::new(StaticFrames), Arc::clone(&service));
        coordinator.set_learn_label(Some("   ".to_string())).await;
        assert!(!coordinator.enter_learning().await);

        coordinator.learn_once().await;
        assert_eq!(service.learn_calls.load(Ordering::SeqCst), 0);
        assert_eq!(view.lock().await.status.kind, StatusKind::Warn);
    }

    #[tokio::test]
    async fn camera_off_fails_fast_before_the_call() {
        let service = Arc::new(ScriptedService { recognize_score: Some(0.99), ..Default::default() });
        let (coordinator, view) = build(Arc::new(NoFrames), Arc::clone(&service));
        coordinator.recognize_once(false).await;
        assert_eq!(service.vision_calls.load(Ordering::SeqCst), 0);
        assert_eq!(view.lock().await.status.kind, StatusKind::Warn);
        assert!(!coordinator.gate().is_held());
    }

    #[tokio::test]
    async fn concurrent_ticks_hold_the_gate_at_most_once() {
        let service = Arc::new(ScriptedService {
            learn_saved: false,
            submit_delay_ms: 20,
            ..Default::default()
        });
        let (coordinator, _view) = build(Arc::new(StaticFrames), Arc::clone(&service));
        coordinator.set_learn_label(Some("mouse".to_string())).await;
        coordinator.enter_learning().await;

        let mut ticks = Vec::new();
        for _ in 0..8 {
            let coordinator = Arc::clone(&coordinator);
            ticks.push(tokio::spawn(async move { coordinator.learn_tick().await }));
        }
        for tick in ticks {
            tick.await.unwrap();
        }

        assert_eq!(service.peak_in_flight.load(Ordering::SeqCst), 1);
        // Overlapping ticks are dropped, not queued.
        assert!(service.learn_calls.load(Ordering::SeqCst) < 8);
        assert!(!coordinator.gate().is_held());
    }

    #[tokio::test]
    async fn force_idle_stops_future_ticks() {
        let service = Arc::new(ScriptedService { learn_saved: true, ..Default::default() });
        let (coordinator, _view) = build(Arc::new(StaticFrames), Arc::clone(&service));
        coordinator.set_learn_label(Some("mouse".to_string())).await;
        coordinator.enter_learning().await;
        coordinator.force_idle().await;
        assert_eq!(coordinator.mode().await, ScanMode::Idle);

        coordinator.learn_tick().await;
        coordinator.autoscan_tick().await;
        assert_eq!(service.learn_calls.load(Ordering::SeqCst), 0);
        assert_eq!(service.vision_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn save_attempt_refreshes_the_ledger_even_below_threshold() {
        let service = Arc::new(ScriptedService { recognize_score: Some(0.80), ..Default::default() });
        let (coordinator, view) = build(Arc::new(StaticFrames), Arc::clone(&service));
        coordinator.recognize_once(true).await;
        assert_eq!(service.stats_calls.load(Ordering::SeqCst), 1);
        assert_eq!(view.lock().await.status.kind, StatusKind::Warn);
    }
}
