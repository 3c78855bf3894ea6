//! Analysis request/render cycle.
//!
//! `Session` owns the media controller, the analysis collaborator and all
//! presentation state. It runs on a single-threaded runtime: operations take
//! `&self`, state lives in a `RefCell` that is never borrowed across an await,
//! and the controller sits behind an async mutex so acquisition and capture
//! never interleave.

mod clock;
mod history;

pub use clock::{reference_timestamp, REFERENCE_ZONE};
pub use history::{History, HistoryEntry, HISTORY_CAP};

use crate::analysis::{Analyzer, EnvironmentalAnalysis};
use crate::capture::{CaptureSource, CapturedFrame, MediaController};
use crate::error::SessionError;
use chrono::Utc;
use serde::Serialize;
use std::cell::RefCell;
use std::path::Path;
use tokio::sync::Mutex;

/// Result of one trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A frame was analyzed and recorded
    Analyzed,
    /// There was no stream to capture from; acquisition ran instead
    AcquisitionTriggered,
    /// Another cycle was already in flight
    Suppressed,
}

/// The analysis currently on display
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentAnalysis {
    pub source: CaptureSource,
    pub timestamp: String,
    pub analysis: EnvironmentalAnalysis,
}

#[derive(Debug, Default)]
struct SessionState {
    analyzing: bool,
    camera_active: bool,
    has_preview: bool,
    current: Option<CurrentAnalysis>,
    history: History,
    error: Option<SessionError>,
}

/// Point-in-time copy of the session for presentation sinks
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub analyzing: bool,
    pub camera_active: bool,
    pub has_preview: bool,
    pub current: Option<CurrentAnalysis>,
    pub history: Vec<HistoryEntry>,
    pub error: Option<SessionError>,
}

/// Marks a cycle as in flight until dropped
struct InFlight<'a> {
    state: &'a RefCell<SessionState>,
}

impl<'a> InFlight<'a> {
    fn begin(state: &'a RefCell<SessionState>) -> Option<Self> {
        let mut guard = state.borrow_mut();
        if guard.analyzing {
            return None;
        }
        guard.analyzing = true;
        Some(Self { state })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.state.borrow_mut().analyzing = false;
    }
}

pub struct Session {
    controller: Mutex<MediaController>,
    analyzer: Box<dyn Analyzer>,
    state: RefCell<SessionState>,
}

impl Session {
    pub fn new(controller: MediaController, analyzer: Box<dyn Analyzer>) -> Self {
        Self {
            controller: Mutex::new(controller),
            analyzer,
            state: RefCell::new(SessionState::default()),
        }
    }

    /// Bring the camera up with the most specific profile
    pub async fn start(&self) -> Result<(), SessionError> {
        self.acquire_camera(0).await
    }

    /// Manual reset after an error: clear it and re-run acquisition
    pub async fn reset(&self) -> Result<(), SessionError> {
        tracing::info!("Manual reset requested");
        self.acquire_camera(0).await
    }

    pub async fn acquire_camera(&self, attempt_level: usize) -> Result<(), SessionError> {
        self.state.borrow_mut().error = None;

        let result = {
            let mut controller = self.controller.lock().await;
            let result = controller.acquire_camera(attempt_level).await;
            self.sync_media(&controller);
            result
        };

        result.map_err(|err| self.fail(err))
    }

    pub async fn release_camera(&self) {
        let mut controller = self.controller.lock().await;
        controller.release_camera();
        self.sync_media(&controller);
    }

    /// Forget the held upload so the next trigger uses the camera
    pub async fn clear_preview(&self) {
        let mut controller = self.controller.lock().await;
        controller.clear_preview();
        self.sync_media(&controller);
    }

    /// Capture one frame and run it through the analyzer.
    ///
    /// A trigger arriving while another cycle is in flight is a no-op.
    pub async fn capture_and_analyze(&self) -> Result<CycleOutcome, SessionError> {
        let Some(_flight) = InFlight::begin(&self.state) else {
            tracing::debug!("Analysis already in flight, ignoring capture trigger");
            return Ok(CycleOutcome::Suppressed);
        };

        let captured = {
            let mut controller = self.controller.lock().await;
            let captured = controller.capture_frame().await;
            self.sync_media(&controller);
            captured
        };

        match captured {
            Ok(Some(frame)) => self.run_analysis(frame).await,
            Ok(None) => {
                self.state.borrow_mut().error = None;
                Ok(CycleOutcome::AcquisitionTriggered)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Hold an uploaded image as the preview and analyze it immediately
    pub async fn accept_uploaded_file(&self, path: &Path) -> Result<CycleOutcome, SessionError> {
        let Some(_flight) = InFlight::begin(&self.state) else {
            tracing::warn!("Analysis already in flight, ignoring upload of {}", path.display());
            return Ok(CycleOutcome::Suppressed);
        };

        let upload = {
            let mut controller = self.controller.lock().await;
            let upload = controller.accept_uploaded_file(path).await;
            self.sync_media(&controller);
            upload
        };

        match upload {
            Ok(image) => {
                self.run_analysis(CapturedFrame {
                    image,
                    source: CaptureSource::Upload,
                })
                .await
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.borrow();
        SessionSnapshot {
            analyzing: state.analyzing,
            camera_active: state.camera_active,
            has_preview: state.has_preview,
            current: state.current.clone(),
            history: state.history.to_vec(),
            error: state.error.clone(),
        }
    }

    async fn run_analysis(&self, frame: CapturedFrame) -> Result<CycleOutcome, SessionError> {
        let timestamp = reference_timestamp(Utc::now());
        self.state.borrow_mut().error = None;

        tracing::info!(
            "Analyzing {} frame ({} bytes) at {} {}",
            frame.source,
            frame.image.bytes().len(),
            timestamp,
            REFERENCE_ZONE
        );

        let result = self
            .analyzer
            .analyze(&frame.image, &timestamp, frame.source.is_live())
            .await;

        let analysis = match result {
            Ok(analysis) => analysis,
            Err(err) => {
                tracing::warn!("Analysis failed: {:#}", err);
                return Err(self.fail(SessionError::analysis(format!("{:#}", err))));
            }
        };

        let entry = HistoryEntry::new(
            timestamp.clone(),
            frame.source,
            analysis.clone(),
            frame.image.to_data_url(),
        );

        let mut state = self.state.borrow_mut();
        state.current = Some(CurrentAnalysis {
            source: frame.source,
            timestamp,
            analysis,
        });
        state.history.push(entry);
        tracing::info!("Analysis recorded ({}/{} in history)", state.history.len(), HISTORY_CAP);

        Ok(CycleOutcome::Analyzed)
    }

    fn sync_media(&self, controller: &MediaController) {
        let mut state = self.state.borrow_mut();
        state.camera_active = controller.is_active();
        state.has_preview = controller.preview().is_some();
    }

    fn fail(&self, err: SessionError) -> SessionError {
        self.state.borrow_mut().error = Some(err.clone());
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::testing::{CameraLog, Outcome, ScriptedBackend};
    use crate::capture::{EncodedImage, SurfaceMount};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::io::Write;
    use std::rc::Rc;
    use tokio::sync::Notify;

    #[derive(Debug, Clone)]
    struct Call {
        image: EncodedImage,
        reference_time: String,
        is_live: bool,
    }

    #[derive(Default)]
    struct FakeAnalyzer {
        calls: Rc<RefCell<Vec<Call>>>,
        gate: Option<Rc<Notify>>,
        failure: Option<String>,
    }

    #[async_trait(?Send)]
    impl Analyzer for FakeAnalyzer {
        async fn analyze(&self, image: &EncodedImage, reference_time: &str, is_live: bool) -> Result<EnvironmentalAnalysis> {
            self.calls.borrow_mut().push(Call {
                image: image.clone(),
                reference_time: reference_time.to_string(),
                is_live,
            });
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match &self.failure {
                Some(message) => Err(anyhow!(message.clone())),
                None => Ok(EnvironmentalAnalysis::sample(64.0)),
            }
        }
    }

    fn session_with(backend: ScriptedBackend, analyzer: FakeAnalyzer) -> Session {
        let surface = SurfaceMount::default();
        surface.mount();
        Session::new(MediaController::new(Box::new(backend), surface), Box::new(analyzer))
    }

    fn working_session() -> (Session, Rc<RefCell<CameraLog>>, Rc<RefCell<Vec<Call>>>) {
        let backend = ScriptedBackend::working();
        let log = backend.log();
        let analyzer = FakeAnalyzer::default();
        let calls = Rc::clone(&analyzer.calls);
        (session_with(backend, analyzer), log, calls)
    }

    fn png_file() -> (tempfile::NamedTempFile, Vec<u8>) {
        let mut bytes = Vec::new();
        image::RgbImage::from_pixel(8, 8, image::Rgb([240, 200, 90]))
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        (file, bytes)
    }

    #[tokio::test]
    async fn live_capture_is_analyzed_and_recorded() {
        let (session, _log, calls) = working_session();
        session.start().await.unwrap();

        let outcome = session.capture_and_analyze().await.unwrap();

        assert_eq!(outcome, CycleOutcome::Analyzed);
        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].is_live);
        assert_eq!(calls[0].reference_time.len(), "HH:MM:SS".len());
        assert_eq!(calls[0].image.mime_type(), "image/jpeg");

        let snapshot = session.snapshot();
        assert!(!snapshot.analyzing);
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.history[0].source(), CaptureSource::Live);
        assert!(snapshot.history[0].image_preview().starts_with("data:image/jpeg;base64,"));
        let current = snapshot.current.unwrap();
        assert_eq!(current.source, CaptureSource::Live);
        assert_eq!(current.timestamp, calls[0].reference_time);
    }

    #[tokio::test]
    async fn capture_without_camera_starts_acquisition_only() {
        let (session, log, calls) = working_session();

        let outcome = session.capture_and_analyze().await.unwrap();

        assert_eq!(outcome, CycleOutcome::AcquisitionTriggered);
        assert!(calls.borrow().is_empty());
        assert_eq!(log.borrow().attempts, vec![0]);
        assert!(session.snapshot().camera_active);
    }

    #[tokio::test]
    async fn upload_releases_camera_and_analyzes_once() {
        let (session, log, calls) = working_session();
        session.start().await.unwrap();
        let (file, bytes) = png_file();

        let outcome = session.accept_uploaded_file(file.path()).await.unwrap();

        assert_eq!(outcome, CycleOutcome::Analyzed);
        assert_eq!(log.borrow().stopped, 1);

        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].is_live);
        assert_eq!(calls[0].image.bytes(), bytes.as_slice());

        let snapshot = session.snapshot();
        assert!(snapshot.has_preview);
        assert!(!snapshot.camera_active);
        assert_eq!(snapshot.history[0].source(), CaptureSource::Upload);
        assert!(snapshot.history[0].image_preview().starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn later_captures_reuse_the_held_upload() {
        let (session, log, calls) = working_session();
        let (file, bytes) = png_file();
        session.accept_uploaded_file(file.path()).await.unwrap();

        session.capture_and_analyze().await.unwrap();

        assert_eq!(calls.borrow().len(), 2);
        assert!(!calls.borrow()[1].is_live);
        assert_eq!(calls.borrow()[1].image.bytes(), bytes.as_slice());
        assert!(log.borrow().attempts.is_empty());
    }

    #[tokio::test]
    async fn clearing_the_upload_returns_to_the_camera() {
        let (session, log, calls) = working_session();
        let (file, _) = png_file();
        session.accept_uploaded_file(file.path()).await.unwrap();

        session.clear_preview().await;
        let outcome = session.capture_and_analyze().await.unwrap();

        assert_eq!(outcome, CycleOutcome::AcquisitionTriggered);
        assert_eq!(log.borrow().attempts, vec![0]);
        assert_eq!(calls.borrow().len(), 1);
    }

    #[tokio::test]
    async fn second_trigger_during_flight_is_ignored() {
        let backend = ScriptedBackend::working();
        let gate = Rc::new(Notify::new());
        let analyzer = FakeAnalyzer {
            gate: Some(Rc::clone(&gate)),
            ..FakeAnalyzer::default()
        };
        let calls = Rc::clone(&analyzer.calls);
        let session = session_with(backend, analyzer);
        session.start().await.unwrap();

        let release = async {
            while calls.borrow().is_empty() {
                tokio::task::yield_now().await;
            }
            gate.notify_one();
        };
        let (first, second, ()) = tokio::join!(
            session.capture_and_analyze(),
            session.capture_and_analyze(),
            release
        );

        let mut outcomes = vec![first.unwrap(), second.unwrap()];
        outcomes.sort_by_key(|outcome| *outcome == CycleOutcome::Analyzed);
        assert_eq!(outcomes, vec![CycleOutcome::Suppressed, CycleOutcome::Analyzed]);
        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(session.snapshot().history.len(), 1);
        assert!(!session.snapshot().analyzing);
    }

    #[tokio::test]
    async fn upload_during_flight_is_ignored_and_not_held() {
        let backend = ScriptedBackend::working();
        let log = backend.log();
        let gate = Rc::new(Notify::new());
        let analyzer = FakeAnalyzer {
            gate: Some(Rc::clone(&gate)),
            ..FakeAnalyzer::default()
        };
        let calls = Rc::clone(&analyzer.calls);
        let session = session_with(backend, analyzer);
        session.start().await.unwrap();
        let (file, _) = png_file();

        let release = async {
            while calls.borrow().is_empty() {
                tokio::task::yield_now().await;
            }
            gate.notify_one();
        };
        let (captured, uploaded, ()) = tokio::join!(
            session.capture_and_analyze(),
            session.accept_uploaded_file(file.path()),
            release
        );

        assert_eq!(captured.unwrap(), CycleOutcome::Analyzed);
        assert_eq!(uploaded.unwrap(), CycleOutcome::Suppressed);
        assert_eq!(calls.borrow().len(), 1);
        assert!(calls.borrow()[0].is_live);
        assert_eq!(log.borrow().stopped, 0);

        let snapshot = session.snapshot();
        assert!(!snapshot.has_preview);
        assert!(snapshot.camera_active);
        assert_eq!(snapshot.history.len(), 1);
    }

    #[tokio::test]
    async fn failed_analysis_sets_error_and_leaves_history() {
        let analyzer = FakeAnalyzer {
            failure: Some("quota exhausted".into()),
            ..FakeAnalyzer::default()
        };
        let session = session_with(ScriptedBackend::working(), analyzer);
        session.start().await.unwrap();

        let err = session.capture_and_analyze().await.unwrap_err();

        assert_eq!(err, SessionError::Analysis("quota exhausted".into()));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.error, Some(err));
        assert!(snapshot.history.is_empty());
        assert!(snapshot.current.is_none());
        assert!(!snapshot.analyzing);
    }

    #[tokio::test]
    async fn blank_failure_message_uses_generic_code() {
        let analyzer = FakeAnalyzer {
            failure: Some(String::new()),
            ..FakeAnalyzer::default()
        };
        let session = session_with(ScriptedBackend::working(), analyzer);
        session.start().await.unwrap();

        let err = session.capture_and_analyze().await.unwrap_err();

        assert_eq!(err.to_string(), "CORE_ERROR: ANALYSIS_TIMEOUT");
    }

    #[tokio::test]
    async fn history_is_capped_across_cycles() {
        let (session, _log, calls) = working_session();
        session.start().await.unwrap();

        for _ in 0..HISTORY_CAP + 2 {
            session.capture_and_analyze().await.unwrap();
        }

        assert_eq!(calls.borrow().len(), HISTORY_CAP + 2);
        assert_eq!(session.snapshot().history.len(), HISTORY_CAP);
    }

    #[tokio::test]
    async fn denial_is_reported_and_reset_retries_from_first_profile() {
        let backend = ScriptedBackend::new(vec![Outcome::Unavailable, Outcome::Denied]);
        let log = backend.log();
        let session = session_with(backend, FakeAnalyzer::default());

        assert_eq!(session.start().await, Err(SessionError::PermissionDenied));
        assert_eq!(session.snapshot().error, Some(SessionError::PermissionDenied));

        let _ = session.reset().await;

        assert_eq!(log.borrow().attempts, vec![0, 1, 0, 1]);
    }

    #[tokio::test]
    async fn successful_acquisition_clears_previous_error() {
        let mut backend = ScriptedBackend::working();
        backend.broken_frames = true;
        let session = session_with(backend, FakeAnalyzer::default());
        session.start().await.unwrap();

        assert_eq!(session.capture_and_analyze().await, Err(SessionError::CaptureFailed));
        assert_eq!(session.snapshot().error, Some(SessionError::CaptureFailed));

        session.reset().await.unwrap();

        assert!(session.snapshot().error.is_none());
        assert!(session.snapshot().camera_active);
    }

    #[tokio::test]
    async fn release_is_idempotent_at_session_level() {
        let (session, log, _calls) = working_session();
        session.start().await.unwrap();

        session.release_camera().await;
        session.release_camera().await;

        assert_eq!(log.borrow().stopped, 1);
        assert!(!session.snapshot().camera_active);
    }
}
