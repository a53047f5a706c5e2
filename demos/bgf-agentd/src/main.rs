//! Simulated device: drives the dispatch pipeline with fake OS callbacks.
//!
//! `bgf-agentd [dispatch-config.json]`; logging follows `BGF_LOG` and
//! `BGF_LOG_FORMAT`.
use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tracing::info;

use bgf_core::{
    BackgroundFetch, DispatchConfig, Dispatcher,
    dispatch::JobParameters,
    subscriber::Subscribe,
    testing::{FakeHost, FakeRuntime, FakeScheduler},
    wakelock::TimedPowerManager,
};
use bgf_model::{FetchStatus, TaskConfig, TaskId};
use bgf_observe::{Journal, logger_init_from_env};

const SLOW_TASK: &str = "slow-sync";

fn load_config() -> anyhow::Result<DispatchConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading dispatch config {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing dispatch config {path}"))
        }
        None => Ok(DispatchConfig::default()
            .with_max_execution_ms(3_000)
            .with_grace_delay_ms(200)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Logger
    logger_init_from_env()?;
    let config = load_config()?;
    info!(?config, "configuration loaded");

    // 2) Simulated OS and runtime
    let scheduler = FakeScheduler::new();
    let runtime = FakeRuntime::cold_auto();
    let power = Arc::new(TimedPowerManager::new(tokio::runtime::Handle::current()));

    // 3) Dispatch pipeline
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Journal::new())];
    let dispatcher = Dispatcher::builder(config)
        .with_host(FakeHost::with(runtime.clone()))
        .with_subscribers(subscribers)
        .build()?;
    let fetch = Arc::new(BackgroundFetch::new(dispatcher, scheduler.clone()));

    // 4) Payload: "fetches" for a moment then reports back, except the slow task
    {
        let fetch = Arc::clone(&fetch);
        let handle = tokio::runtime::Handle::current();
        runtime.set_payload(move |cfg| {
            let task_id = cfg.event.task_id.clone();
            if cfg.event.timeout {
                info!(%task_id, "payload told to stop");
                fetch.finish(&task_id);
                return;
            }
            if task_id.as_str() == SLOW_TASK {
                return;
            }
            let fetch = Arc::clone(&fetch);
            handle.spawn(async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                fetch.finish(&task_id);
            });
        });
    }

    // 5) Schedules
    let status = fetch.configure(
        TaskConfig::fetch(15 * 60 * 1000)
            .with_start_on_boot(true)
            .with_stop_on_terminate(false),
    )?;
    anyhow::ensure!(status == FetchStatus::Available, "background fetch is {status:?}");
    fetch.schedule_task(
        TaskConfig::new("digest", 60 * 60 * 1000)
            .with_periodic(true)
            .with_force_alarm_manager(true)
            .with_start_on_boot(true)
            .with_stop_on_terminate(false),
    )?;
    fetch.schedule_task(TaskConfig::new(SLOW_TASK, 30 * 60 * 1000))?;
    info!(tasks = fetch.schedules().len(), "tasks scheduled");

    // 6) The OS re-delivers the fetch job at once, then fires it for real
    let jobs = fetch.job_dispatcher();
    let fetch_id = TaskId::from(bgf_model::FETCH_TASK_ID);
    let (job, req) = scheduler
        .job_for(&fetch_id)
        .context("fetch job was not scheduled")?;
    let params = JobParameters::new(job, req.extras);
    info!(state = ?jobs.on_start_job(&params), "immediate re-delivery");
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    info!(state = ?jobs.on_start_job(&params), "scheduled fire");

    // 7) Alarm broadcast for the alarm-backed task
    let digest = fetch.alarm_dispatcher(power).on_receive("digest");

    // 8) The slow task overstays; the OS takes its job away
    let (slow_job, slow_req) = scheduler
        .job_for(&TaskId::from(SLOW_TASK))
        .context("slow job was not scheduled")?;
    let slow = JobParameters::new(slow_job, slow_req.extras);
    jobs.on_start_job(&slow);
    tokio::time::sleep(Duration::from_millis(800)).await;
    info!(state = ?jobs.on_stop_job(&slow), "slow job stopped by the OS");

    tokio::time::sleep(Duration::from_millis(500)).await;
    info!(
        digest_finished = digest.is_finished(),
        in_flight = fetch.dispatcher().registry().len(),
        finished_jobs = scheduler.finished_jobs().len(),
        "executions settled"
    );

    // 9) Reboot
    scheduler.reboot();
    let rearmed = fetch
        .boot_receiver()
        .on_receive("android.intent.action.BOOT_COMPLETED")
        .await?;
    info!(rearmed, surviving = fetch.schedules().len(), "device rebooted");

    // 10) Tear down
    let stopped = fetch.stop(None);
    info!(stopped, "all tasks stopped; exiting");
    Ok(())
}
