use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::models::event_types::UiEvent;
use crate::models::progress_types::ProgressState;
use crate::services::event_sink::EventSink;
use crate::services::scheduler::{FirstTick, ScheduledTask, Tick};

// Ticks fire ten times a second; keep them out of the log by default.
const ENABLE_LOGS: bool = false;

use crate::log_debug;

pub const TICK_INTERVAL: Duration = Duration::from_millis(100);
pub const HIDE_DELAY: Duration = Duration::from_secs(1);
/// The simulated bar never passes this on its own.
pub const SIMULATED_CAP: f64 = 90.0;

struct Inner {
    state: ProgressState,
    /// Bumped on every start/finish/cancel so callbacks from older runs bail out.
    generation: u64,
    elapsed_ticks: u64,
    total_ticks: u64,
    ticker: Option<ScheduledTask>,
    hide: Option<ScheduledTask>,
}

/// Fake progress bar for a remote call whose real progress is invisible.
///
/// Climbs linearly over the estimated duration and parks at 90% until
/// [`finish`](Self::finish) snaps it to 100%.
#[derive(Clone)]
pub struct ProgressSimulator {
    inner: Arc<Mutex<Inner>>,
    sink: Arc<dyn EventSink>,
}

impl ProgressSimulator {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: ProgressState::default(),
                generation: 0,
                elapsed_ticks: 0,
                total_ticks: 1,
                ticker: None,
                hide: None,
            })),
            sink,
        }
    }

    pub async fn snapshot(&self) -> ProgressState {
        self.inner.lock().await.state.clone()
    }

    pub async fn start(&self, estimated: Duration) {
        let mut inner = self.inner.lock().await;
        inner.ticker = None;
        inner.hide = None;
        inner.generation += 1;
        inner.elapsed_ticks = 0;
        inner.total_ticks = total_ticks(estimated);
        inner.state = ProgressState {
            percent: 0.0,
            label: phase_label(0.0).to_string(),
            visible: true,
            running: true,
        };
        log_debug!(
            "progress run {} started: {} ticks expected",
            inner.generation,
            inner.total_ticks
        );

        let generation = inner.generation;
        let shared = self.inner.clone();
        let sink = self.sink.clone();
        inner.ticker = Some(ScheduledTask::periodic(
            TICK_INTERVAL,
            FirstTick::AfterPeriod,
            move || {
                let shared = shared.clone();
                let sink = sink.clone();
                async move { advance(&shared, sink.as_ref(), generation).await }
            },
        ));

        self.sink.emit(UiEvent::ProgressChanged(inner.state.clone()));
    }

    /// Snap to 100%, then hide and reset after [`HIDE_DELAY`].
    pub async fn finish(&self) {
        let mut inner = self.inner.lock().await;
        inner.ticker = None;
        inner.hide = None;
        inner.generation += 1;
        inner.state.percent = 100.0;
        inner.state.label = phase_label(100.0).to_string();
        inner.state.visible = true;
        inner.state.running = false;

        let generation = inner.generation;
        let shared = self.inner.clone();
        let sink = self.sink.clone();
        inner.hide = Some(ScheduledTask::delayed(HIDE_DELAY, move || async move {
            let mut inner = shared.lock().await;
            if inner.generation != generation {
                return;
            }
            inner.state = ProgressState::default();
            inner.hide = None;
            sink.emit(UiEvent::ProgressChanged(inner.state.clone()));
        }));

        self.sink.emit(UiEvent::ProgressChanged(inner.state.clone()));
    }

    /// Stop ticking and hide at once. Safe to call with nothing running.
    pub async fn cancel(&self) {
        let mut inner = self.inner.lock().await;
        let was_shown = inner.state.visible || inner.ticker.is_some();
        inner.ticker = None;
        inner.hide = None;
        inner.generation += 1;
        inner.state = ProgressState::default();

        if was_shown {
            self.sink.emit(UiEvent::ProgressChanged(inner.state.clone()));
        }
    }
}

async fn advance(shared: &Mutex<Inner>, sink: &dyn EventSink, generation: u64) -> Tick {
    let mut inner = shared.lock().await;
    if inner.generation != generation {
        return Tick::Stop;
    }

    inner.elapsed_ticks += 1;
    let percent = simulated_percent(inner.elapsed_ticks, inner.total_ticks);
    inner.state.percent = inner.state.percent.max(percent);
    inner.state.label = phase_label(inner.state.percent).to_string();

    let outcome = if inner.state.percent >= SIMULATED_CAP {
        log_debug!("progress run {} parked at {}%", generation, SIMULATED_CAP);
        inner.state.running = false;
        Tick::Stop
    } else {
        Tick::Continue
    };

    sink.emit(UiEvent::ProgressChanged(inner.state.clone()));
    outcome
}

fn total_ticks(estimated: Duration) -> u64 {
    let ticks = estimated.as_millis() / TICK_INTERVAL.as_millis();
    (ticks as u64).max(1)
}

pub fn simulated_percent(elapsed_ticks: u64, total_ticks: u64) -> f64 {
    let raw = elapsed_ticks as f64 / total_ticks.max(1) as f64 * 100.0;
    raw.min(SIMULATED_CAP)
}

pub fn phase_label(percent: f64) -> &'static str {
    if percent >= 100.0 {
        "Complete"
    } else if percent >= 60.0 {
        "Preparing results"
    } else if percent >= 30.0 {
        "Running model"
    } else {
        "Uploading image"
    }
}
