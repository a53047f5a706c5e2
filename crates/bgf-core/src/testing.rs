//! In-memory implementations of the OS and runtime seams.
//!
//! Used by the test suites and by the demo host to simulate a device: a job
//! scheduler that records calls, wake-locks that remember how they were used, a
//! runtime whose context creation is driven by hand, and a manual clock.
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError, Weak,
        atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use bgf_model::{DispatchEvent, EpochMillis, EventKind, FetchStatus, JobId, TaskId};
use uuid::Uuid;

use crate::{
    bridge::{
        ContextListener, HeadlessTaskConfig, Lifecycle, ReadySignal, Runtime, RuntimeContext,
        RuntimeHost, RuntimeTaskId, StartTaskError, TaskEventListener,
    },
    clock::Clock,
    error::CoreError,
    os::{AlarmRequest, JobRequest, OsScheduler},
    subscriber::Subscribe,
    wakelock::{PowerManager, WakeLock},
};

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Poll `cond` every few milliseconds for up to two seconds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn at(now: EpochMillis) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicU64::new(now),
        })
    }

    pub fn set(&self, now: EpochMillis) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> EpochMillis {
        self.now.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// OS scheduler
// ---------------------------------------------------------------------------

/// Job scheduler and alarm service that records every call.
pub struct FakeScheduler {
    has_job_scheduler: bool,
    next_job: AtomicI32,
    jobs: Mutex<HashMap<JobId, JobRequest>>,
    finished: Mutex<Vec<(JobId, bool)>>,
    cancelled: Mutex<Vec<JobId>>,
    alarms: Mutex<HashMap<TaskId, AlarmRequest>>,
    alarm_sets: AtomicUsize,
    status: Mutex<FetchStatus>,
}

impl FakeScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(true))
    }

    /// A platform with alarms only.
    pub fn alarms_only() -> Arc<Self> {
        Arc::new(Self::build(false))
    }

    fn build(has_job_scheduler: bool) -> Self {
        Self {
            has_job_scheduler,
            next_job: AtomicI32::new(1),
            jobs: Mutex::new(HashMap::new()),
            finished: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            alarms: Mutex::new(HashMap::new()),
            alarm_sets: AtomicUsize::new(0),
            status: Mutex::new(FetchStatus::Available),
        }
    }

    pub fn set_status(&self, status: FetchStatus) {
        *lock(&self.status) = status;
    }

    /// `(job, reschedule)` for every `job_finished` call, in order.
    pub fn finished_jobs(&self) -> Vec<(JobId, bool)> {
        lock(&self.finished).clone()
    }

    pub fn jobs(&self) -> HashMap<JobId, JobRequest> {
        lock(&self.jobs).clone()
    }

    pub fn job_for(&self, task: &TaskId) -> Option<(JobId, JobRequest)> {
        lock(&self.jobs)
            .iter()
            .find(|(_, r)| r.task_id() == task)
            .map(|(id, r)| (*id, r.clone()))
    }

    pub fn cancelled_jobs(&self) -> Vec<JobId> {
        lock(&self.cancelled).clone()
    }

    pub fn alarm(&self, task: &TaskId) -> Option<AlarmRequest> {
        lock(&self.alarms).get(task).cloned()
    }

    pub fn alarm_count(&self) -> usize {
        lock(&self.alarms).len()
    }

    /// Number of `set_alarm` calls so far.
    pub fn alarm_set_calls(&self) -> usize {
        self.alarm_sets.load(Ordering::SeqCst)
    }

    /// Alarms do not survive a reboot.
    pub fn reboot(&self) {
        lock(&self.alarms).clear();
    }
}

impl OsScheduler for FakeScheduler {
    fn has_job_scheduler(&self) -> bool {
        self.has_job_scheduler
    }

    fn schedule_job(&self, request: &JobRequest) -> Result<JobId, CoreError> {
        if !self.has_job_scheduler {
            return Err(CoreError::Scheduler("no job scheduler".to_string()));
        }
        let id = JobId::new(self.next_job.fetch_add(1, Ordering::SeqCst));
        lock(&self.jobs).insert(id, request.clone());
        Ok(id)
    }

    fn cancel_job(&self, job: JobId) {
        lock(&self.jobs).remove(&job);
        lock(&self.cancelled).push(job);
    }

    fn job_finished(&self, job: JobId, reschedule: bool) {
        lock(&self.finished).push((job, reschedule));
    }

    fn set_alarm(&self, request: &AlarmRequest) -> Result<(), CoreError> {
        self.alarm_sets.fetch_add(1, Ordering::SeqCst);
        lock(&self.alarms).insert(request.task_id.clone(), request.clone());
        Ok(())
    }

    fn cancel_alarm(&self, task_id: &TaskId) {
        lock(&self.alarms).remove(task_id);
    }

    fn is_alarm_armed(&self, task_id: &TaskId) -> bool {
        lock(&self.alarms).contains_key(task_id)
    }

    fn status(&self) -> FetchStatus {
        *lock(&self.status)
    }
}

// ---------------------------------------------------------------------------
// Power
// ---------------------------------------------------------------------------

/// Wake-lock that records how it was used and never expires on its own.
pub struct RecordingWakeLock {
    tag: String,
    held: AtomicBool,
    timeouts: Mutex<Vec<Duration>>,
    releases: AtomicUsize,
}

impl RecordingWakeLock {
    pub fn new(tag: &str) -> Arc<Self> {
        Arc::new(Self {
            tag: tag.to_string(),
            held: AtomicBool::new(false),
            timeouts: Mutex::new(Vec::new()),
            releases: AtomicUsize::new(0),
        })
    }

    /// Timeouts passed to `acquire`, in order.
    pub fn acquire_timeouts(&self) -> Vec<Duration> {
        lock(&self.timeouts).clone()
    }

    /// Number of releases that actually released a held lock.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl WakeLock for RecordingWakeLock {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn acquire(&self, timeout: Duration) {
        lock(&self.timeouts).push(timeout);
        self.held.store(true, Ordering::SeqCst);
    }

    fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    fn release(&self) {
        if self.held.swap(false, Ordering::SeqCst) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Default)]
pub struct RecordingPowerManager {
    locks: Mutex<Vec<Arc<RecordingWakeLock>>>,
}

impl RecordingPowerManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn locks(&self) -> Vec<Arc<RecordingWakeLock>> {
        lock(&self.locks).clone()
    }
}

impl PowerManager for RecordingPowerManager {
    fn new_wake_lock(&self, tag: &str) -> Arc<dyn WakeLock> {
        let wl = RecordingWakeLock::new(tag);
        lock(&self.locks).push(Arc::clone(&wl));
        wl
    }
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// A headless task the fake context was asked to start.
#[derive(Debug, Clone)]
pub struct StartedTask {
    pub runtime_task: RuntimeTaskId,
    pub config: HeadlessTaskConfig,
    /// Name of the thread `start_task` was called on.
    pub thread: Option<String>,
}

type Payload = Arc<dyn Fn(&HeadlessTaskConfig) + Send + Sync>;

pub struct FakeContext {
    lifecycle: Mutex<Lifecycle>,
    listeners: Mutex<Vec<Arc<dyn TaskEventListener>>>,
    started: Mutex<Vec<StartedTask>>,
    next_task: AtomicU32,
    reject: AtomicBool,
    payload: Mutex<Option<Payload>>,
}

impl FakeContext {
    fn new(lifecycle: Lifecycle) -> Arc<Self> {
        Arc::new(Self {
            lifecycle: Mutex::new(lifecycle),
            listeners: Mutex::new(Vec::new()),
            started: Mutex::new(Vec::new()),
            next_task: AtomicU32::new(1),
            reject: AtomicBool::new(false),
            payload: Mutex::new(None),
        })
    }

    fn finish(&self, task: RuntimeTaskId) {
        let listeners = lock(&self.listeners).clone();
        for l in listeners {
            l.on_task_finish(task);
        }
    }
}

impl RuntimeContext for FakeContext {
    fn lifecycle(&self) -> Lifecycle {
        *lock(&self.lifecycle)
    }

    fn add_task_event_listener(&self, listener: Arc<dyn TaskEventListener>) {
        lock(&self.listeners).push(listener);
    }

    fn remove_task_event_listener(&self, id: Uuid) {
        lock(&self.listeners).retain(|l| l.id() != id);
    }

    fn start_task(&self, config: HeadlessTaskConfig) -> Result<RuntimeTaskId, StartTaskError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(StartTaskError::Foreground);
        }
        let id = self.next_task.fetch_add(1, Ordering::SeqCst);
        lock(&self.started).push(StartedTask {
            runtime_task: id,
            config: config.clone(),
            thread: std::thread::current().name().map(str::to_string),
        });

        let listeners = lock(&self.listeners).clone();
        for l in listeners {
            l.on_task_start(id);
        }
        let payload = lock(&self.payload).clone();
        if let Some(payload) = payload {
            payload(&config);
        }
        Ok(id)
    }
}

/// Runtime whose context creation is completed by hand.
pub struct FakeRuntime {
    context: Arc<FakeContext>,
    live: AtomicBool,
    creating: AtomicBool,
    create_calls: AtomicUsize,
    ready: ReadySignal<Arc<dyn RuntimeContext>>,
    auto_create: AtomicBool,
    me: Weak<FakeRuntime>,
}

impl FakeRuntime {
    fn build(live: bool, lifecycle: Lifecycle) -> Arc<Self> {
        let context = FakeContext::new(lifecycle);
        let rt = Arc::new_cyclic(|me| Self {
            context,
            live: AtomicBool::new(live),
            creating: AtomicBool::new(false),
            create_calls: AtomicUsize::new(0),
            ready: ReadySignal::new(),
            auto_create: AtomicBool::new(false),
            me: me.clone(),
        });
        if live {
            rt.ready.publish(rt.context_dyn());
        }
        rt
    }

    /// Context exists and is in the background.
    pub fn ready() -> Arc<Self> {
        Self::build(true, Lifecycle::BeforeResume)
    }

    /// No context yet; call [`FakeRuntime::finish_creating`] to bring it up.
    pub fn cold() -> Arc<Self> {
        Self::build(false, Lifecycle::BeforeResume)
    }

    /// No context yet; creation completes as soon as it is requested.
    pub fn cold_auto() -> Arc<Self> {
        let rt = Self::build(false, Lifecycle::BeforeResume);
        rt.auto_create.store(true, Ordering::SeqCst);
        rt
    }

    /// Context exists and the user-facing runtime is resumed.
    pub fn foreground() -> Arc<Self> {
        Self::build(true, Lifecycle::Resumed)
    }

    fn context_dyn(&self) -> Arc<dyn RuntimeContext> {
        self.context.clone()
    }

    pub fn finish_creating(&self) {
        self.live.store(true, Ordering::SeqCst);
        self.creating.store(false, Ordering::SeqCst);
        self.ready.publish(self.context_dyn());
    }

    pub fn set_lifecycle(&self, lifecycle: Lifecycle) {
        *lock(&self.context.lifecycle) = lifecycle;
    }

    pub fn reject_starts(&self, reject: bool) {
        self.context.reject.store(reject, Ordering::SeqCst);
    }

    /// Run `payload` synchronously every time a headless task starts.
    pub fn set_payload(&self, payload: impl Fn(&HeadlessTaskConfig) + Send + Sync + 'static) {
        *lock(&self.context.payload) = Some(Arc::new(payload));
    }

    /// Signal that the payload of `task` finished.
    pub fn finish_payload(&self, task: RuntimeTaskId) {
        self.context.finish(task);
    }

    pub fn started(&self) -> Vec<StartedTask> {
        lock(&self.context.started).clone()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.context.listeners).len()
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn pending_ready_listeners(&self) -> usize {
        self.ready.pending()
    }

    pub async fn wait_for_create_request(&self) {
        assert!(
            wait_until(|| self.create_calls() > 0).await,
            "context creation was never requested"
        );
    }

    pub async fn wait_for_ready_listeners(&self, n: usize) {
        assert!(
            wait_until(|| self.pending_ready_listeners() >= n).await,
            "expected {n} ready listeners"
        );
    }

    pub async fn wait_for_started(&self, n: usize) -> bool {
        wait_until(|| self.started().len() >= n).await
    }
}

impl Runtime for FakeRuntime {
    fn current_context(&self) -> Option<Arc<dyn RuntimeContext>> {
        self.live
            .load(Ordering::SeqCst)
            .then(|| self.context_dyn())
    }

    fn has_started_creating_context(&self) -> bool {
        self.creating.load(Ordering::SeqCst)
    }

    fn create_context_in_background(&self) {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.creating.store(true, Ordering::SeqCst);
        if self.auto_create.load(Ordering::SeqCst)
            && let Some(me) = self.me.upgrade()
        {
            std::thread::spawn(move || me.finish_creating());
        }
    }

    fn on_context_ready(&self, listener: ContextListener) {
        self.ready.subscribe(listener);
    }
}

pub struct FakeHost {
    runtime: Option<Arc<FakeRuntime>>,
}

impl FakeHost {
    pub fn with(runtime: Arc<FakeRuntime>) -> Arc<Self> {
        Arc::new(Self {
            runtime: Some(runtime),
        })
    }

    /// A host that cannot supply a runtime.
    pub fn misconfigured() -> Arc<Self> {
        Arc::new(Self { runtime: None })
    }
}

impl RuntimeHost for FakeHost {
    fn runtime(&self) -> Option<Arc<dyn Runtime>> {
        self.runtime
            .as_ref()
            .map(|rt| Arc::clone(rt) as Arc<dyn Runtime>)
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingSubscriber {
    events: Mutex<Vec<DispatchEvent>>,
}

impl RecordingSubscriber {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        lock(&self.events).iter().map(|e| e.kind).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        lock(&self.events).iter().filter(|e| e.kind == kind).count()
    }

    pub fn events(&self) -> Vec<DispatchEvent> {
        lock(&self.events).clone()
    }
}

impl Subscribe for RecordingSubscriber {
    fn on_event(&self, event: &DispatchEvent) {
        lock(&self.events).push(event.clone());
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
