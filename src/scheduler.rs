//! Deferred and periodic task execution on the tokio runtime.
//!
//! A single driver task owns the timing queue; callbacks run in their own
//! spawned task so a panic in one cannot take down the driver or a sibling.
//! Cancellation is a flag the driver checks when a task comes due. That
//! leaves one race: a periodic task whose current run is already in flight
//! re-registers itself under a fresh id before a cancel can land, so the
//! chain survives one more round. Callers that need certainty cancel by tag
//! and retry until the returned count is non-zero.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error};

const POISONED: &str = "scheduler state poisoned";

/// Handle to a scheduled task.
///
/// A periodic task consumes its id on every run and re-registers under a
/// fresh one, so a stored id only addresses the next pending run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tie-break order among tasks that come due on the same driver pass.
/// Earlier variants run first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskPriority {
    Highest,
    High,
    #[default]
    Normal,
    Low,
    Lowest,
}

/// How a scheduled task should be run.
#[derive(Debug, Clone, Default)]
pub struct TaskOptions {
    /// Time to wait before the first run.
    pub delay: Duration,
    /// When set, the task re-registers itself this long after each run
    /// completes.
    pub interval: Option<Duration>,
    /// Label for group cancellation and introspection.
    pub tag: Option<String>,
    /// Tie-break order among tasks due on the same pass.
    pub priority: TaskPriority,
}

type Callback = Arc<dyn Fn() + Send + Sync>;

struct QueuedTask {
    id: TaskId,
    execute_at: Instant,
    priority: TaskPriority,
    interval: Option<Duration>,
    tag: Option<String>,
    callback: Callback,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.execute_at
            .cmp(&other.execute_at)
            .then(self.priority.cmp(&other.priority))
            .then(self.id.0.cmp(&other.id.0))
    }
}

#[derive(Default)]
struct State {
    queue: BinaryHeap<Reverse<QueuedTask>>,
    pending: HashSet<TaskId>,
    canceled: HashSet<TaskId>,
    by_tag: HashMap<String, HashSet<TaskId>>,
    next_id: u64,
}

impl State {
    fn allocate(&mut self) -> TaskId {
        self.next_id += 1;
        TaskId(self.next_id)
    }

    fn enqueue(&mut self, task: QueuedTask) {
        self.pending.insert(task.id);
        if let Some(tag) = &task.tag {
            self.by_tag.entry(tag.clone()).or_default().insert(task.id);
        }
        self.queue.push(Reverse(task));
    }

    fn untag(&mut self, tag: &Option<String>, id: TaskId) {
        let Some(tag) = tag else { return };
        if let Some(ids) = self.by_tag.get_mut(tag) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_tag.remove(tag);
            }
        }
    }

    /// Pops every task due at `now` in (deadline, priority, id) order,
    /// dropping the ones marked canceled.
    fn pop_due(&mut self, now: Instant) -> Vec<QueuedTask> {
        let mut due = Vec::new();
        while self
            .queue
            .peek()
            .is_some_and(|Reverse(task)| task.execute_at <= now)
        {
            let Some(Reverse(task)) = self.queue.pop() else {
                break;
            };
            self.pending.remove(&task.id);
            self.untag(&task.tag, task.id);
            if self.canceled.remove(&task.id) {
                continue;
            }
            due.push(task);
        }
        due
    }
}

/// Task scheduler driven by a dedicated tokio task.
///
/// Dropping the scheduler aborts the driver; callbacks already handed to a
/// runner finish on their own.
pub struct Scheduler {
    state: Arc<Mutex<State>>,
    notify: Arc<Notify>,
    driver: JoinHandle<()>,
}

impl Scheduler {
    /// Starts the driver. Must be called from inside a tokio runtime.
    pub fn new() -> Self {
        let state = Arc::new(Mutex::new(State::default()));
        let notify = Arc::new(Notify::new());
        let driver = tokio::spawn(drive(Arc::clone(&state), Arc::clone(&notify)));
        debug!("Scheduler started");
        Self {
            state,
            notify,
            driver,
        }
    }

    /// Queues `callback` to run according to `options`.
    pub fn schedule(
        &self,
        callback: impl Fn() + Send + Sync + 'static,
        options: TaskOptions,
    ) -> TaskId {
        let id = {
            let mut state = self.state.lock().expect(POISONED);
            let id = state.allocate();
            state.enqueue(QueuedTask {
                id,
                execute_at: Instant::now() + options.delay,
                priority: options.priority,
                interval: options.interval,
                tag: options.tag,
                callback: Arc::new(callback),
            });
            id
        };
        self.notify.notify_one();
        id
    }

    /// Marks a pending task so it is dropped instead of run when it comes
    /// due. Returns `false` when the id is unknown, already canceled, or
    /// already handed to a runner; in that last case a periodic task still
    /// runs once more and re-registers under a fresh id.
    pub fn cancel(&self, id: TaskId) -> bool {
        let mut state = self.state.lock().expect(POISONED);
        if !state.pending.contains(&id) {
            return false;
        }
        state.canceled.insert(id)
    }

    /// Cancels every pending task scheduled under `tag`. Returns how many
    /// were newly marked.
    pub fn cancel_by_tag(&self, tag: &str) -> usize {
        let mut state = self.state.lock().expect(POISONED);
        let ids: Vec<TaskId> = state
            .by_tag
            .get(tag)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        ids.into_iter()
            .filter(|id| state.canceled.insert(*id))
            .count()
    }

    /// Cancels everything pending. Returns how many tasks were marked.
    pub fn cancel_all(&self) -> usize {
        let mut state = self.state.lock().expect(POISONED);
        let ids: Vec<TaskId> = state.pending.iter().copied().collect();
        ids.into_iter()
            .filter(|id| state.canceled.insert(*id))
            .count()
    }

    /// Whether `id` is still waiting to run and not marked canceled.
    pub fn is_pending(&self, id: TaskId) -> bool {
        let state = self.state.lock().expect(POISONED);
        state.pending.contains(&id) && !state.canceled.contains(&id)
    }

    /// Number of tasks waiting to run, canceled ones excluded.
    pub fn pending_count(&self) -> usize {
        let state = self.state.lock().expect(POISONED);
        state.pending.len() - state.canceled.len()
    }

    /// Like [`Self::pending_count`], restricted to `tag`.
    pub fn pending_count_by_tag(&self, tag: &str) -> usize {
        let state = self.state.lock().expect(POISONED);
        state.by_tag.get(tag).map_or(0, |ids| {
            ids.iter().filter(|id| !state.canceled.contains(id)).count()
        })
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.driver.abort();
        debug!("Scheduler stopped");
    }
}

enum Step {
    Run(Vec<QueuedTask>),
    Sleep(Instant),
    Idle,
}

async fn drive(state: Arc<Mutex<State>>, notify: Arc<Notify>) {
    loop {
        let step = {
            let mut state = state.lock().expect(POISONED);
            let due = state.pop_due(Instant::now());
            if !due.is_empty() {
                Step::Run(due)
            } else if let Some(Reverse(task)) = state.queue.peek() {
                Step::Sleep(task.execute_at)
            } else {
                Step::Idle
            }
        };
        match step {
            Step::Run(tasks) => {
                for task in tasks {
                    spawn_run(Arc::clone(&state), Arc::clone(&notify), task);
                }
            }
            Step::Sleep(deadline) => {
                tokio::select! {
                    _ = time::sleep_until(deadline) => {}
                    _ = notify.notified() => {}
                }
            }
            Step::Idle => notify.notified().await,
        }
    }
}

/// Runs one task to completion, then re-registers it when periodic.
fn spawn_run(state: Arc<Mutex<State>>, notify: Arc<Notify>, task: QueuedTask) {
    tokio::spawn(async move {
        let callback = Arc::clone(&task.callback);
        let run = tokio::spawn(async move { callback() });
        if let Err(err) = run.await {
            if err.is_panic() {
                error!("Scheduler task {} panicked", task.id);
            }
        }
        let Some(interval) = task.interval else {
            return;
        };
        {
            let mut state = state.lock().expect(POISONED);
            let id = state.allocate();
            state.enqueue(QueuedTask {
                id,
                execute_at: Instant::now() + interval,
                priority: task.priority,
                interval: task.interval,
                tag: task.tag,
                callback: task.callback,
            });
        }
        notify.notify_one();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use tokio::sync::mpsc;
    use tokio::time::{sleep, timeout};

    #[tokio::test]
    async fn test_one_shot_runs_once() {
        let scheduler = Scheduler::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = scheduler.schedule(
            move || {
                let _ = tx.send(());
            },
            TaskOptions {
                delay: Duration::from_millis(10),
                ..Default::default()
            },
        );
        assert!(scheduler.is_pending(id));

        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("task did not run")
            .expect("channel closed early");

        // The callback is dropped after a one-shot run, so the channel
        // closing proves the task did not re-register.
        assert!(timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("callback was not dropped")
            .is_none());
        assert!(!scheduler.is_pending(id));
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_prevents_run() {
        let scheduler = Scheduler::new();
        let ran = Arc::new(AtomicUsize::new(0));
        let probe = Arc::clone(&ran);
        let id = scheduler.schedule(
            move || {
                probe.fetch_add(1, AtomicOrdering::SeqCst);
            },
            TaskOptions {
                delay: Duration::from_millis(50),
                ..Default::default()
            },
        );

        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        assert!(!scheduler.is_pending(id));
        assert_eq!(scheduler.pending_count(), 0);

        sleep(Duration::from_millis(150)).await;
        assert_eq!(ran.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_periodic_reregisters_until_canceled() {
        let scheduler = Scheduler::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let first = scheduler.schedule(
            move || {
                let _ = tx.send(());
            },
            TaskOptions {
                interval: Some(Duration::from_millis(10)),
                tag: Some("beat".to_string()),
                ..Default::default()
            },
        );

        for _ in 0..3 {
            timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("beat missing")
                .expect("channel closed early");
        }

        // The first id was consumed by its run; the chain lives on under
        // fresh ids.
        assert!(!scheduler.is_pending(first));

        // A cancel can miss while a run is in flight, retry until it lands
        // on a pending id.
        let mut canceled = 0;
        for _ in 0..200 {
            canceled = scheduler.cancel_by_tag("beat");
            if canceled > 0 {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(canceled, 1);

        // Drain anything already in flight, then the chain must be quiet.
        sleep(Duration::from_millis(50)).await;
        while rx.try_recv().is_ok() {}
        sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(scheduler.pending_count_by_tag("beat"), 0);
    }

    #[tokio::test]
    async fn test_panicking_task_does_not_kill_the_driver() {
        let scheduler = Scheduler::new();
        scheduler.schedule(|| panic!("task blew up"), TaskOptions::default());

        let (tx, mut rx) = mpsc::unbounded_channel();
        scheduler.schedule(
            move || {
                let _ = tx.send(());
            },
            TaskOptions {
                delay: Duration::from_millis(20),
                ..Default::default()
            },
        );
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("driver died with the panicking task")
            .expect("channel closed early");
    }

    #[tokio::test]
    async fn test_cancel_all_sweeps_every_tag() {
        let scheduler = Scheduler::new();
        for tag in ["a", "b"] {
            for _ in 0..2 {
                scheduler.schedule(
                    || {},
                    TaskOptions {
                        delay: Duration::from_secs(60),
                        tag: Some(tag.to_string()),
                        ..Default::default()
                    },
                );
            }
        }
        assert_eq!(scheduler.pending_count(), 4);
        assert_eq!(scheduler.pending_count_by_tag("a"), 2);

        assert_eq!(scheduler.cancel_all(), 4);
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(scheduler.pending_count_by_tag("a"), 0);
    }

    #[test]
    fn test_due_order_breaks_ties_by_priority() {
        let now = Instant::now();
        let mut state = State::default();
        for (priority, name) in [
            (TaskPriority::Low, "low"),
            (TaskPriority::Highest, "first"),
            (TaskPriority::Normal, "normal"),
        ] {
            let id = state.allocate();
            state.enqueue(QueuedTask {
                id,
                execute_at: now,
                priority,
                interval: None,
                tag: Some(name.to_string()),
                callback: Arc::new(|| {}),
            });
        }

        let due = state.pop_due(now);
        let order: Vec<String> = due
            .iter()
            .map(|task| task.tag.clone().unwrap_or_default())
            .collect();
        assert_eq!(order, ["first", "normal", "low"]);
    }
}
