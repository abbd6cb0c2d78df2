use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use agro_scan_client::camera::{
    CameraSession, CameraState, FacingMode, RawFrame, StreamConstraints, VideoBackend, VideoStream,
};
use agro_scan_client::errors::{AppError, AppResult};

/// Scripted device backend. Each `open` pops the next outcome; every stream
/// it hands out gets a shared `stopped` flag so tests can assert that no
/// track outlives the session.
#[derive(Default)]
struct BackendScript {
    outcomes: Mutex<VecDeque<Result<Option<RawFrame>, String>>>,
    requests: Mutex<Vec<StreamConstraints>>,
    tracks: Mutex<Vec<Arc<AtomicBool>>>,
    opens: AtomicUsize,
}

impl BackendScript {
    fn grant(self: &Arc<Self>) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Ok(Some(test_frame())));
    }

    fn grant_broken_stream(self: &Arc<Self>) {
        self.outcomes.lock().unwrap().push_back(Ok(None));
    }

    fn deny(self: &Arc<Self>, reason: &str) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Err(reason.to_string()));
    }

    fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn track_stopped(&self, index: usize) -> bool {
        self.tracks.lock().unwrap()[index].load(Ordering::SeqCst)
    }

    fn track_count(&self) -> usize {
        self.tracks.lock().unwrap().len()
    }
}

struct MockBackend(Arc<BackendScript>);

impl VideoBackend for MockBackend {
    fn open(&mut self, constraints: &StreamConstraints) -> AppResult<Box<dyn VideoStream>> {
        self.0.opens.fetch_add(1, Ordering::SeqCst);
        self.0.requests.lock().unwrap().push(constraints.clone());

        let outcome = self
            .0
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("unscripted open".to_string()));

        match outcome {
            Ok(frame) => {
                let stopped = Arc::new(AtomicBool::new(false));
                self.0.tracks.lock().unwrap().push(Arc::clone(&stopped));
                Ok(Box::new(MockStream { stopped, frame }))
            }
            Err(reason) => Err(AppError::device(reason)),
        }
    }
}

struct MockStream {
    stopped: Arc<AtomicBool>,
    frame: Option<RawFrame>,
}

impl VideoStream for MockStream {
    fn grab(&mut self) -> AppResult<RawFrame> {
        self.frame
            .take()
            .ok_or_else(|| AppError::device("frame unavailable"))
    }

    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

fn test_frame() -> RawFrame {
    RawFrame {
        width: 4,
        height: 4,
        pixels: vec![0u8; 4 * 4 * 3],
    }
}

fn session(script: &Arc<BackendScript>) -> CameraSession<MockBackend> {
    CameraSession::new(MockBackend(Arc::clone(script)), 95)
}

fn preferred() -> StreamConstraints {
    StreamConstraints::preferred(1280, 720, FacingMode::Environment)
}

#[test]
fn open_then_close_releases_every_track() {
    let script = Arc::new(BackendScript::default());
    script.grant();
    let mut session = session(&script);

    session.open(&preferred()).unwrap();
    assert_eq!(session.state(), CameraState::Live);

    session.close();
    assert_eq!(session.state(), CameraState::Closed);
    assert!(script.track_stopped(0));
}

#[test]
fn close_is_idempotent_when_already_closed() {
    let script = Arc::new(BackendScript::default());
    let mut session = session(&script);

    assert_eq!(session.state(), CameraState::Closed);
    session.close();
    session.close();
    assert_eq!(session.state(), CameraState::Closed);
    assert_eq!(script.track_count(), 0);
}

#[test]
fn reopening_while_live_closes_the_existing_stream_first() {
    let script = Arc::new(BackendScript::default());
    script.grant();
    script.grant();
    let mut session = session(&script);

    session.open(&preferred()).unwrap();
    session.open(&preferred()).unwrap();

    assert_eq!(script.open_count(), 2);
    assert!(script.track_stopped(0), "first stream must be stopped");
    assert!(!script.track_stopped(1), "second stream must stay live");

    session.close();
    assert!(script.track_stopped(1));
}

#[test]
fn denied_preferred_request_falls_back_to_minimal_constraints() {
    let script = Arc::new(BackendScript::default());
    script.deny("device busy");
    script.grant();
    let mut session = session(&script);

    session.open(&preferred()).unwrap();
    assert_eq!(session.state(), CameraState::Live);
    assert_eq!(script.open_count(), 2);

    let requests = script.requests.lock().unwrap();
    assert!(requests[0].width.is_some());
    assert!(requests[1].width.is_none(), "fallback must be unconstrained");
    assert!(requests[1].facing.is_none());
}

#[test]
fn double_denial_leaves_session_closed_with_device_error() {
    let script = Arc::new(BackendScript::default());
    script.deny("permission denied");
    script.deny("permission denied");
    let mut session = session(&script);

    let err = session.open(&preferred()).unwrap_err();
    assert!(err.is_device());
    assert_eq!(session.state(), CameraState::Closed);
    assert_eq!(script.track_count(), 0, "no stream reference may leak");
}

#[test]
fn capture_yields_one_asset_and_closes_the_session() {
    let script = Arc::new(BackendScript::default());
    script.grant();
    let mut session = session(&script);

    session.open(&preferred()).unwrap();
    let asset = session.capture().unwrap();

    assert!(asset.file_name().starts_with("capture-"));
    assert!(asset.file_name().ends_with(".jpg"));
    assert_eq!(session.state(), CameraState::Closed);
    assert!(script.track_stopped(0));
}

#[test]
fn capture_failure_still_releases_the_stream() {
    let script = Arc::new(BackendScript::default());
    script.grant_broken_stream();
    let mut session = session(&script);

    session.open(&preferred()).unwrap();
    let err = session.capture().unwrap_err();

    assert!(err.is_device());
    assert_eq!(session.state(), CameraState::Closed);
    assert!(script.track_stopped(0));
}

#[test]
fn capture_on_closed_session_is_rejected() {
    let script = Arc::new(BackendScript::default());
    let mut session = session(&script);

    assert!(matches!(
        session.capture(),
        Err(AppError::SessionNotLive)
    ));
}

#[test]
fn dropping_a_live_session_releases_the_stream() {
    let script = Arc::new(BackendScript::default());
    script.grant();

    {
        let mut session = session(&script);
        session.open(&preferred()).unwrap();
        assert!(!script.track_stopped(0));
    }

    assert!(script.track_stopped(0));
}
