//! TCP connect readiness probe

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};

use crate::traits::ReadinessProbe;
use shared::Endpoint;

pub struct TcpReadinessProbe {
    poll_interval: Duration,
}

impl TcpReadinessProbe {
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
        }
    }

    /// Delay between connect rounds (fluent API)
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    async fn accepts(endpoint: &Endpoint, budget: Duration) -> bool {
        let addr = endpoint.to_string();
        matches!(timeout(budget, TcpStream::connect(addr.as_str())).await, Ok(Ok(_)))
    }
}

impl Default for TcpReadinessProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadinessProbe for TcpReadinessProbe {
    async fn wait_ready(&self, endpoints: &[Endpoint], timeout: Duration) -> Vec<Endpoint> {
        let deadline = Instant::now() + timeout;
        let mut pending: Vec<Endpoint> = endpoints.to_vec();

        loop {
            let mut still_pending = Vec::new();
            for endpoint in pending {
                let budget = deadline.saturating_duration_since(Instant::now());
                if budget.is_zero() || !Self::accepts(&endpoint, budget).await {
                    still_pending.push(endpoint);
                }
            }
            pending = still_pending;

            if pending.is_empty() || Instant::now() >= deadline {
                return pending;
            }
            sleep(self.poll_interval.min(deadline.saturating_duration_since(Instant::now()))).await;
        }
    }
}
