//! End-to-end tests of the submit lifecycle against a scripted service.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::sleep;
use xray_lense_lib::services::file_intake::{INVALID_TYPE_MESSAGE, MAX_FILE_BYTES};
use xray_lense_lib::services::request_controller::SUBMISSION_FAILED_MESSAGE;
use xray_lense_lib::{
    start_with_service, AppError, BackendStatus, ChannelSink, ErrorKind, ImageUpload,
    InferenceService, Mode, Phase, RequestController, ResultPayload, SelectedFile, SubmitOutcome,
    UiEvent, XaiMethod,
};

struct ScriptedService {
    delay: Duration,
    response: Result<ResultPayload, AppError>,
    calls: AtomicU32,
    last_request: Mutex<Option<(Mode, String)>>,
}

impl ScriptedService {
    fn new(delay: Duration, response: Result<ResultPayload, AppError>) -> Arc<Self> {
        Arc::new(Self {
            delay,
            response,
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InferenceService for ScriptedService {
    fn health(&self) -> BoxFuture<'_, Result<(), AppError>> {
        async { Ok(()) }.boxed()
    }

    fn infer<'a>(
        &'a self,
        mode: Mode,
        file: &'a SelectedFile,
    ) -> BoxFuture<'a, Result<ResultPayload, AppError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some((mode, file.name.clone()));
        let response = self.response.clone();
        let delay = self.delay;
        async move {
            sleep(delay).await;
            response
        }
        .boxed()
    }
}

fn payload(class: &str, score: f64, methods: &[XaiMethod]) -> ResultPayload {
    ResultPayload {
        predicted_class: class.to_string(),
        confidence_score: score,
        explanations: methods
            .iter()
            .map(|m| (*m, vec![0x89, b'P', b'N', b'G']))
            .collect::<BTreeMap<_, _>>(),
    }
}

fn upload(name: &str, media_type: &str, len: usize) -> ImageUpload {
    ImageUpload {
        name: name.to_string(),
        media_type: media_type.to_string(),
        bytes: vec![0u8; len],
    }
}

fn controller(
    service: Arc<ScriptedService>,
) -> (RequestController, UnboundedReceiver<UiEvent>) {
    let (sink, rx) = ChannelSink::new();
    (RequestController::new(service, Arc::new(sink)), rx)
}

fn drain(rx: &mut UnboundedReceiver<UiEvent>) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test(start_paused = true)]
async fn scenario_a_classify_caps_at_90_then_renders_percent() {
    let service = ScriptedService::new(
        Duration::from_secs(3),
        Ok(payload("Pneumonia", 0.87, &[])),
    );
    let (controller, _rx) = controller(service.clone());
    controller
        .select_file(upload("chest.jpg", "image/jpeg", 2 * 1024 * 1024))
        .await
        .unwrap();

    let running = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit(Mode::Classify).await }
    });

    sleep(Duration::from_millis(2_000)).await;
    let during = controller.snapshot().await;
    assert_eq!(during.phase, Phase::Submitting);
    assert!(during.busy);
    assert!(during.progress.visible);
    assert_eq!(during.progress.percent, 90.0);

    let outcome = running.await.unwrap();
    let display = match outcome {
        SubmitOutcome::Succeeded(display) => display,
        other => panic!("expected success, got {:?}", other),
    };
    assert_eq!(display.predicted_class, "Pneumonia");
    assert_eq!(display.confidence_label, "87%");
    assert!(display.explanations.is_empty());

    let after = controller.snapshot().await;
    assert_eq!(after.phase, Phase::Succeeded);
    assert!(!after.busy);
    assert_eq!(after.display.result, Some(display));
    assert_eq!(after.progress.percent, 100.0);

    sleep(Duration::from_secs(1)).await;
    let settled = controller.snapshot().await;
    assert!(!settled.progress.visible);
    assert_eq!(settled.progress.percent, 0.0);

    assert_eq!(
        *service.last_request.lock().unwrap(),
        Some((Mode::Classify, "chest.jpg".to_string()))
    );
}

#[tokio::test(start_paused = true)]
async fn scenario_b_explain_renders_present_methods_in_order() {
    let service = ScriptedService::new(
        Duration::from_secs(20),
        Ok(payload("Pneumonia", 0.91, &[XaiMethod::Lime, XaiMethod::GradCam])),
    );
    let (controller, _rx) = controller(service);
    controller
        .select_file(upload("chest.png", "image/png", 4_096))
        .await
        .unwrap();

    let SubmitOutcome::Succeeded(display) = controller.submit(Mode::Explain).await else {
        panic!("explain request should succeed");
    };

    let methods: Vec<_> = display.explanations.iter().map(|b| b.method).collect();
    assert_eq!(methods, vec![XaiMethod::GradCam, XaiMethod::Lime]);
    assert_eq!(display.mode, Mode::Explain);
}

#[tokio::test(start_paused = true)]
async fn scenario_c_server_error_fails_fast_and_reenables_controls() {
    let service = ScriptedService::new(
        Duration::from_millis(400),
        Err(AppError::submission_failed("http://localhost:8000/predict returned HTTP 500")),
    );
    let (controller, mut rx) = controller(service);
    controller
        .select_file(upload("chest.jpg", "image/jpeg", 1_024))
        .await
        .unwrap();
    drain(&mut rx);

    let outcome = controller.submit(Mode::Classify).await;
    assert!(matches!(
        outcome,
        SubmitOutcome::Failed(ref err) if err.kind == ErrorKind::SubmissionFailed
    ));

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, Phase::Failed);
    assert!(!snapshot.busy);
    assert!(!snapshot.progress.visible);
    assert_eq!(snapshot.display.error.as_deref(), Some(SUBMISSION_FAILED_MESSAGE));
    assert!(snapshot.display.result.is_none());

    let events = drain(&mut rx);
    assert!(matches!(
        events.first(),
        Some(UiEvent::ControlsChanged { enabled: false })
    ));
    assert!(matches!(
        events.last(),
        Some(UiEvent::ControlsChanged { enabled: true })
    ));
    assert!(events.iter().any(|e| matches!(
        e,
        UiEvent::ErrorShown { message } if message == SUBMISSION_FAILED_MESSAGE
    )));
}

#[tokio::test(start_paused = true)]
async fn second_submit_while_in_flight_is_a_no_op() {
    let service = ScriptedService::new(
        Duration::from_secs(5),
        Ok(payload("Normal", 0.64, &[])),
    );
    let (controller, _rx) = controller(service.clone());
    controller
        .select_file(upload("chest.jpg", "image/jpeg", 1_024))
        .await
        .unwrap();

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit(Mode::Classify).await }
    });
    sleep(Duration::from_millis(100)).await;

    let before = controller.snapshot().await;
    let second = controller.submit(Mode::Explain).await;
    let after = controller.snapshot().await;

    assert!(matches!(second, SubmitOutcome::Ignored));
    assert_eq!(service.calls(), 1);
    assert_eq!(before.phase, after.phase);
    assert_eq!(after.phase, Phase::Submitting);
    assert!(after.busy);

    assert!(matches!(first.await.unwrap(), SubmitOutcome::Succeeded(_)));
    assert_eq!(service.calls(), 1);

    // Guard released: the next submit goes through.
    assert!(matches!(
        controller.submit(Mode::Classify).await,
        SubmitOutcome::Succeeded(_)
    ));
    assert_eq!(service.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn submit_without_file_is_ignored() {
    let service = ScriptedService::new(Duration::ZERO, Ok(payload("Normal", 0.5, &[])));
    let (controller, mut rx) = controller(service.clone());

    assert!(matches!(
        controller.submit(Mode::Classify).await,
        SubmitOutcome::Ignored
    ));
    assert_eq!(service.calls(), 0);
    assert!(!controller.is_busy());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn rejected_uploads_set_no_selection() {
    let service = ScriptedService::new(Duration::ZERO, Ok(payload("Normal", 0.5, &[])));
    let (controller, _rx) = controller(service);

    let err = controller
        .select_file(upload("notes.pdf", "application/pdf", 100))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidType);

    let err = controller
        .select_file(upload("huge.png", "image/png", MAX_FILE_BYTES as usize + 1))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TooLarge);

    let snapshot = controller.snapshot().await;
    assert!(snapshot.selected.is_none());
    assert_eq!(snapshot.phase, Phase::Idle);
    assert!(snapshot.display.error.is_some());
}

#[tokio::test(start_paused = true)]
async fn new_selection_replaces_old_and_clears_error() {
    let service = ScriptedService::new(Duration::ZERO, Ok(payload("Normal", 0.5, &[])));
    let (controller, _rx) = controller(service.clone());

    controller
        .select_file(upload("first.jpg", "image/jpeg", 10))
        .await
        .unwrap();
    let _ = controller
        .select_file(upload("bad.gif", "image/gif", 10))
        .await;
    assert_eq!(
        controller.snapshot().await.display.error.as_deref(),
        Some(INVALID_TYPE_MESSAGE)
    );
    assert_eq!(
        controller.snapshot().await.selected.map(|f| f.name),
        Some("first.jpg".to_string())
    );

    controller
        .select_file(upload("second.png", "image/png", 20))
        .await
        .unwrap();
    let snapshot = controller.snapshot().await;
    let selected = snapshot.selected.unwrap();
    assert_eq!(selected.name, "second.png");
    assert_eq!(selected.size, 20);
    assert_eq!(snapshot.phase, Phase::Selected);
    assert!(snapshot.display.error.is_none());

    controller.submit(Mode::Classify).await;
    assert_eq!(
        *service.last_request.lock().unwrap(),
        Some((Mode::Classify, "second.png".to_string()))
    );
}

#[tokio::test(start_paused = true)]
async fn removing_file_mid_request_suppresses_its_result() {
    let service = ScriptedService::new(
        Duration::from_secs(3),
        Ok(payload("Pneumonia", 0.87, &[])),
    );
    let (controller, _rx) = controller(service);
    controller
        .select_file(upload("chest.jpg", "image/jpeg", 1_024))
        .await
        .unwrap();

    let running = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit(Mode::Classify).await }
    });
    sleep(Duration::from_millis(500)).await;

    controller.remove_file().await;
    let removed = controller.snapshot().await;
    assert_eq!(removed.phase, Phase::Idle);
    assert!(removed.selected.is_none());
    assert!(!removed.progress.visible);
    assert!(removed.busy, "request is still outstanding");

    assert!(matches!(running.await.unwrap(), SubmitOutcome::Abandoned));
    let after = controller.snapshot().await;
    assert_eq!(after.phase, Phase::Idle);
    assert!(after.display.result.is_none());
    assert!(!after.progress.visible);
    assert!(!after.busy);

    // Idempotent with nothing selected.
    controller.remove_file().await;
    assert_eq!(controller.snapshot().await.phase, Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn app_state_starts_health_polling() {
    let service = ScriptedService::new(Duration::ZERO, Ok(payload("Normal", 0.5, &[])));
    let (sink, _rx) = ChannelSink::new();
    let app = start_with_service(service, Arc::new(sink));

    sleep(Duration::from_millis(10)).await;
    assert_eq!(app.health.status(), BackendStatus::Online);
    assert!(app.health.is_running());
    assert!(!app.controller.is_busy());
    app.health.stop();
}
