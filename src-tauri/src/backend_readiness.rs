use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{app_constants::HEALTH_PROBE_TIMEOUT, backend_config::ReadinessOptions};

/// One readiness attempt. Implementations swallow every transport error.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn is_healthy(&self) -> bool;
}

pub struct HttpHealthProbe {
    client: reqwest::Client,
    url: Url,
}

impl HttpHealthProbe {
    pub fn new(url: Url) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HEALTH_PROBE_TIMEOUT)
            .no_proxy()
            .build()
            .unwrap_or_else(|error| {
                log::warn!("falling back to default health-check client: {error}");
                reqwest::Client::new()
            });
        Self { client, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn is_healthy(&self) -> bool {
        match self
            .client
            .get(self.url.clone())
            .header(CACHE_CONTROL, "no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(error) => {
                log::debug!("health check against {} failed: {error}", self.url);
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessOutcome {
    Ready,
    TimedOut,
    Cancelled,
}

impl ReadinessOutcome {
    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }
}

/// Polls the health probe until it succeeds or the time budget runs out.
#[derive(Clone)]
pub struct ReadinessGate {
    probe: Arc<dyn HealthProbe>,
}

impl ReadinessGate {
    pub fn new(probe: Arc<dyn HealthProbe>) -> Self {
        Self { probe }
    }

    pub async fn await_ready(&self, options: ReadinessOptions) -> bool {
        self.await_ready_cancellable(options, &CancellationToken::new())
            .await
            .is_ready()
    }

    pub async fn await_ready_cancellable(
        &self,
        options: ReadinessOptions,
        cancel: &CancellationToken,
    ) -> ReadinessOutcome {
        let started = Instant::now();
        let mut attempts = 0_u32;

        while started.elapsed() < options.timeout {
            attempts += 1;
            let healthy = tokio::select! {
                _ = cancel.cancelled() => return ReadinessOutcome::Cancelled,
                healthy = self.probe.is_healthy() => healthy,
            };
            if healthy {
                log::debug!(
                    "backend ready after {attempts} attempt(s) in {}ms",
                    started.elapsed().as_millis()
                );
                return ReadinessOutcome::Ready;
            }

            tokio::select! {
                _ = cancel.cancelled() => return ReadinessOutcome::Cancelled,
                _ = sleep(options.interval) => {}
            }
        }

        log::debug!(
            "backend not ready after {attempts} attempt(s) in {}ms",
            started.elapsed().as_millis()
        );
        ReadinessOutcome::TimedOut
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{http::StatusCode, routing::get, Router};
    use tokio::net::TcpListener;

    use super::*;
    use crate::test_support::ScriptedProbe;

    fn options(timeout_ms: u64, interval_ms: u64) -> ReadinessOptions {
        ReadinessOptions {
            timeout: Duration::from_millis(timeout_ms),
            interval: Duration::from_millis(interval_ms),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn never_ready_times_out_after_five_attempts() {
        let probe = ScriptedProbe::new(None);
        let gate = ReadinessGate::new(probe.clone());

        let started = Instant::now();
        let ready = gate.await_ready(options(1000, 200)).await;
        let elapsed = started.elapsed();

        assert!(!ready);
        assert_eq!(probe.attempts(), 5);
        assert!(elapsed >= Duration::from_millis(1000), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1200), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_bound_holds_for_uneven_interval() {
        let probe = ScriptedProbe::new(None);
        let gate = ReadinessGate::new(probe.clone());

        let started = Instant::now();
        assert!(!gate.await_ready(options(1000, 300)).await);
        let elapsed = started.elapsed();

        assert_eq!(probe.attempts(), 4);
        assert!(elapsed >= Duration::from_millis(1000), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1300), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn success_short_circuits_remaining_budget() {
        let probe = ScriptedProbe::new(Some(3));
        let gate = ReadinessGate::new(probe.clone());

        let started = Instant::now();
        assert!(gate.await_ready(options(20_000, 500)).await);

        assert_eq!(probe.attempts(), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1000), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1500), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_probe_reduces_attempts_without_ending_early() {
        let probe = ScriptedProbe::with_latency(None, Duration::from_millis(400));
        let gate = ReadinessGate::new(probe.clone());

        let started = Instant::now();
        assert!(!gate.await_ready(options(1000, 200)).await);

        assert_eq!(probe.attempts(), 2);
        assert!(started.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_ends_the_wait() {
        let probe = ScriptedProbe::new(None);
        let gate = ReadinessGate::new(probe.clone());
        let cancel = CancellationToken::new();

        let waiter = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                gate.await_ready_cancellable(options(20_000, 500), &cancel)
                    .await
            })
        };
        sleep(Duration::from_millis(1200)).await;
        cancel.cancel();

        let outcome = waiter.await.expect("waiter task");
        assert_eq!(outcome, ReadinessOutcome::Cancelled);
        assert_eq!(probe.attempts(), 3);
    }

    async fn serve(router: Router) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Url::parse(&format!("http://{address}/api/v1/health")).expect("health url")
    }

    #[tokio::test]
    async fn http_probe_accepts_any_success_status() {
        let url = serve(Router::new().route(
            "/api/v1/health",
            get(|| async { StatusCode::NO_CONTENT }),
        ))
        .await;
        assert!(HttpHealthProbe::new(url).is_healthy().await);
    }

    #[tokio::test]
    async fn http_probe_rejects_error_status() {
        let url = serve(Router::new().route(
            "/api/v1/health",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;
        assert!(!HttpHealthProbe::new(url).is_healthy().await);
    }

    #[tokio::test]
    async fn http_probe_treats_refused_connection_as_not_ready() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        drop(listener);

        let url = Url::parse(&format!("http://{address}/api/v1/health")).expect("health url");
        assert!(!HttpHealthProbe::new(url).is_healthy().await);
    }

    #[tokio::test]
    async fn gate_reports_ready_against_live_endpoint() {
        let url = serve(Router::new().route("/api/v1/health", get(|| async { "ok" }))).await;
        let gate = ReadinessGate::new(Arc::new(HttpHealthProbe::new(url)));
        assert!(gate.await_ready(options(2000, 50)).await);
    }
}
