//! Integration tests for the task registry and shutdown coordinator

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tempfile::TempDir;

use streamcut::domain::model::*;
use streamcut::engine::*;

// Test utilities

/// Writes an owned partial file, reports, then waits for release or
/// cancellation.
struct GateExecutor {
    dir: PathBuf,
    released: Mutex<bool>,
    wake: Condvar,
}

impl GateExecutor {
    fn new(dir: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            dir,
            released: Mutex::new(false),
            wake: Condvar::new(),
        })
    }

    fn release(&self) {
        *self.released.lock() = true;
        self.wake.notify_all();
    }
}

impl TaskExecutor for GateExecutor {
    fn execute(&self, _spec: &TaskSpec, ctx: &TaskContext) -> Outcome {
        let path = self.dir.join(format!("task_{}.part", ctx.id().0));
        std::fs::write(&path, b"partial").unwrap();
        ctx.own(&path);
        ctx.status("working");
        ctx.progress(50);

        let mut released = self.released.lock();
        while !*released && !ctx.is_cancelled() {
            self.wake.wait_for(&mut released, Duration::from_millis(10));
        }
        drop(released);

        if ctx.is_cancelled() {
            return Outcome::Aborted;
        }
        ctx.disown(&path);
        Outcome::Completed(path)
    }
}

struct PanicExecutor;

impl TaskExecutor for PanicExecutor {
    fn execute(&self, _spec: &TaskSpec, _ctx: &TaskContext) -> Outcome {
        panic!("executor blew up");
    }
}

#[derive(Default)]
struct RecordingObserver {
    lines: Mutex<Vec<String>>,
}

impl RecordingObserver {
    fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    fn terminal_lines(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|l| l.starts_with("terminal "))
            .collect()
    }
}

impl TaskObserver for RecordingObserver {
    fn on_status(&self, task_id: TaskId, _kind: TaskKind, message: &str) {
        self.lines.lock().push(format!("status {} {}", task_id, message));
    }

    fn on_progress(&self, task_id: TaskId, _kind: TaskKind, percent: u8) {
        self.lines.lock().push(format!("progress {} {}", task_id, percent));
    }

    fn on_terminal(&self, task_id: TaskId, _kind: TaskKind, message: &str, _outcome: &Outcome) {
        self.lines.lock().push(format!("terminal {} {}", task_id, message));
    }
}

fn clip_spec(name: &str) -> TaskSpec {
    TaskSpec::Clip(ClipRequest {
        source: PathBuf::from(name),
        range: TimeRange::new(0, 5).unwrap(),
        target: ClipTarget::Video { strip_audio: false },
    })
}

fn next_event(rx: &mut EventReceiver) -> TaskEvent {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Ok(event) = rx.try_recv() {
            return event;
        }
        assert!(Instant::now() < deadline, "timed out waiting for a task event");
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// Dispatch events until `count` status events have gone through.
fn wait_for_status(registry: &TaskRegistry, rx: &mut EventReceiver, count: usize) {
    let mut seen = 0;
    while seen < count {
        let event = next_event(rx);
        if matches!(event.payload, EventPayload::Status(_)) {
            seen += 1;
        }
        assert_eq!(registry.dispatch(event), Lifecycle::Running);
    }
}

fn setup(executor: Arc<dyn TaskExecutor>) -> (Arc<TaskRegistry>, EventReceiver, Arc<RecordingObserver>) {
    let (tx, rx) = event_channel();
    let registry = Arc::new(TaskRegistry::new(executor, tx));
    let observer = Arc::new(RecordingObserver::default());
    registry.subscribe(observer.clone());
    (registry, rx, observer)
}

#[test]
fn close_with_nothing_running_exits_now() {
    let dir = TempDir::new().unwrap();
    let (registry, _rx, _observer) = setup(GateExecutor::new(dir.path().to_path_buf()));
    assert_eq!(registry.request_close(), CloseRequest::ExitNow);
}

#[test]
fn deferred_exit_waits_for_both_tasks() {
    let dir = TempDir::new().unwrap();
    let executor = GateExecutor::new(dir.path().to_path_buf());
    let (registry, mut rx, observer) = setup(executor.clone());

    registry.submit(clip_spec("a.mp4")).unwrap();
    registry.submit(clip_spec("b.mp4")).unwrap();
    wait_for_status(&registry, &mut rx, 2);

    assert_eq!(registry.request_close(), CloseRequest::NeedsDecision { active: 2 });
    assert_eq!(registry.resolve_close(ShutdownChoice::WaitForTasks), Lifecycle::Running);
    assert!(registry.submit(clip_spec("c.mp4")).is_err());

    executor.release();
    let mut lifecycles = Vec::new();
    while lifecycles.len() < 2 {
        let event = next_event(&mut rx);
        let terminal = event.is_terminal();
        let lifecycle = registry.dispatch(event);
        if terminal {
            lifecycles.push(lifecycle);
        }
    }

    assert_eq!(lifecycles, vec![Lifecycle::Running, Lifecycle::ExitReady]);
    assert_eq!(registry.active_count(), 0);
    // Outcomes are not reported while closing
    assert!(observer.terminal_lines().is_empty());
    // Both tasks committed their files
    assert!(dir.path().join("task_1.part").exists());
    assert!(dir.path().join("task_2.part").exists());
}

#[test]
fn immediate_termination_empties_set_and_removes_owned_files() {
    let dir = TempDir::new().unwrap();
    let (registry, mut rx, observer) = setup(GateExecutor::new(dir.path().to_path_buf()));

    let first = registry.submit(clip_spec("a.mp4")).unwrap();
    let second = registry.submit(clip_spec("b.mp4")).unwrap();
    wait_for_status(&registry, &mut rx, 2);
    assert_eq!(registry.active_ids(), vec![first, second]);

    assert!(matches!(registry.request_close(), CloseRequest::NeedsDecision { .. }));
    assert_eq!(registry.resolve_close(ShutdownChoice::TerminateNow), Lifecycle::ExitReady);

    assert_eq!(registry.active_count(), 0);
    assert!(!dir.path().join("task_1.part").exists());
    assert!(!dir.path().join("task_2.part").exists());

    // Late outcomes of discarded tasks are ignored
    for _ in 0..2 {
        let mut event = next_event(&mut rx);
        while !event.is_terminal() {
            event = next_event(&mut rx);
        }
        assert_eq!(event.payload, EventPayload::Terminal(Outcome::Aborted));
        assert_eq!(registry.dispatch(event), Lifecycle::Running);
    }
    assert!(observer.terminal_lines().is_empty());
}

#[test]
fn keep_running_withdraws_the_close_request() {
    let dir = TempDir::new().unwrap();
    let executor = GateExecutor::new(dir.path().to_path_buf());
    let (registry, mut rx, observer) = setup(executor.clone());

    let id = registry.submit(clip_spec("a.mp4")).unwrap();
    wait_for_status(&registry, &mut rx, 1);

    assert!(matches!(registry.request_close(), CloseRequest::NeedsDecision { active: 1 }));
    assert_eq!(registry.resolve_close(ShutdownChoice::KeepRunning), Lifecycle::Running);
    assert!(!registry.is_closing());

    executor.release();
    loop {
        let event = next_event(&mut rx);
        let terminal = event.is_terminal();
        assert_eq!(registry.dispatch(event), Lifecycle::Running);
        if terminal {
            break;
        }
    }

    let expected = format!(
        "terminal {} Clip complete: {}",
        id,
        dir.path().join("task_1.part").display()
    );
    assert_eq!(observer.terminal_lines(), vec![expected]);
    assert!(observer.lines().contains(&format!("status {} working", id)));
}

#[test]
fn progress_suppressed_while_closing() {
    let dir = TempDir::new().unwrap();
    let executor = GateExecutor::new(dir.path().to_path_buf());
    let (registry, mut rx, observer) = setup(executor.clone());

    registry.submit(clip_spec("a.mp4")).unwrap();
    // Wait until the task has reported without dispatching anything
    let mut held = Vec::new();
    while !held.iter().any(|e: &TaskEvent| matches!(e.payload, EventPayload::Progress(_))) {
        held.push(next_event(&mut rx));
    }

    registry.request_close();
    for event in held {
        registry.dispatch(event);
    }
    assert!(observer.lines().is_empty());

    executor.release();
    loop {
        let event = next_event(&mut rx);
        if event.is_terminal() {
            assert_eq!(registry.dispatch(event), Lifecycle::ExitReady);
            break;
        }
        registry.dispatch(event);
    }
}

#[test]
fn panicking_task_is_reported_as_failure() {
    let (registry, mut rx, observer) = setup(Arc::new(PanicExecutor));
    let id = registry.submit(clip_spec("a.mp4")).unwrap();

    let event = next_event(&mut rx);
    assert!(event.is_terminal());
    assert_eq!(registry.dispatch(event), Lifecycle::Running);
    assert_eq!(
        observer.terminal_lines(),
        vec![format!("terminal {} Clip failed: task stopped unexpectedly", id)]
    );
    assert_eq!(registry.active_count(), 0);
}
