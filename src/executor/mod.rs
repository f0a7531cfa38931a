pub mod limiter;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{self, JoinSet};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::client::{build_client, send_request, HttpsClient, PreparedRequest};
use crate::error::{LoadError, Result};
use crate::models::dsl_model::RunConfig;
use crate::models::metrics::{Metrics, MetricsCollector, RequestOutcome};
use crate::utils::hardware::get_hardware_info;

use self::limiter::RateLimiter;

/// Runs `config` to completion, ending early on Ctrl-C.
pub async fn run_load_test(config: RunConfig) -> Result<Metrics> {
    run_load_test_until(config, async {
        if tokio::signal::ctrl_c().await.is_err() {
            // No signal handler available; only the duration ends the run.
            std::future::pending::<()>().await;
        }
        warn!("interrupt received, stopping virtual users");
    })
    .await
}

/// Runs `config` until its duration elapses or `shutdown` resolves,
/// whichever comes first. In both cases VUs finish their in-flight request
/// before stopping. Dropping the returned future aborts every VU at once.
pub async fn run_load_test_until<F>(config: RunConfig, shutdown: F) -> Result<Metrics>
where
    F: Future<Output = ()>,
{
    config.validate()?;
    let prepared = Arc::new(PreparedRequest::from_config(&config)?);
    let client = Arc::new(build_client());
    let limiter = Arc::new(RateLimiter::new(config.rps));
    let metrics = Arc::new(MetricsCollector::new());
    let running = Arc::new(AtomicBool::new(true));

    let started = Instant::now();
    let deadline = started
        .checked_add(Duration::from_secs(config.duration))
        .ok_or_else(|| {
            LoadError::InvalidConfig(format!("duration {}s is out of range", config.duration))
        })?;

    info!(
        name = %config.name,
        target = %config.target,
        vus = config.vus,
        duration_secs = config.duration,
        max_rps = config.rps,
        "starting load test"
    );

    // JoinSet aborts whatever is still running when it is dropped.
    let mut workers = JoinSet::new();
    for vu in 0..config.vus {
        let worker = VirtualUser {
            id: vu,
            client: Arc::clone(&client),
            prepared: Arc::clone(&prepared),
            limiter: Arc::clone(&limiter),
            metrics: Arc::clone(&metrics),
            running: Arc::clone(&running),
            expected_status: config.expected_status,
            deadline,
        };
        workers.spawn(worker.run());
    }

    tokio::select! {
        _ = sleep_until(deadline) => debug!("duration elapsed"),
        _ = shutdown => {},
    }
    running.store(false, Ordering::Release);

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "virtual user task failed");
        }
    }

    let elapsed = started.elapsed();
    info!(
        total_requests = metrics.total_requests(),
        elapsed_secs = elapsed.as_secs_f64(),
        "load test finished"
    );

    let host = task::spawn_blocking(get_hardware_info)
        .await
        .unwrap_or_default();
    Ok(metrics.finalize(&config, elapsed, host))
}

struct VirtualUser {
    id: u64,
    client: Arc<HttpsClient>,
    prepared: Arc<PreparedRequest>,
    limiter: Arc<RateLimiter>,
    metrics: Arc<MetricsCollector>,
    running: Arc<AtomicBool>,
    expected_status: u16,
    deadline: Instant,
}

impl VirtualUser {
    fn should_run(&self) -> bool {
        self.running.load(Ordering::Acquire) && Instant::now() < self.deadline
    }

    async fn run(self) {
        while self.should_run() {
            if !self.limiter.acquire(self.deadline).await || !self.should_run() {
                break;
            }
            let outcome = self.iteration().await;
            self.metrics.record(&outcome);
        }
        debug!(vu = self.id, "virtual user stopped");
    }

    async fn iteration(&self) -> RequestOutcome {
        let _in_flight = self.metrics.begin_request();
        let request_start = Instant::now();
        let result = send_request(&self.client, &self.prepared).await;
        let elapsed = request_start.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(response) => {
                let status = response.status.as_u16();
                debug!(vu = self.id, status, duration_ms = elapsed, "response");
                RequestOutcome::response(status, self.expected_status, elapsed, response.bytes)
            }
            Err(e) => {
                warn!(vu = self.id, error = %e, duration_ms = elapsed, "request failed");
                RequestOutcome::failure(e.label(), elapsed)
            }
        }
    }
}
