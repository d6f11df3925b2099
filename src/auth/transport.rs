//! Remote authentication seam.
//!
//! Every `register`/`authenticate` call makes one round trip through an
//! [`AuthTransport`] before touching local state. The store wraps that round
//! trip in a timeout and a cancellation token. Today the only transport is
//! [`SimulatedTransport`], which just waits; a real remote client slots in
//! behind the same trait.

use async_trait::async_trait;
use std::time::Duration;

/// Which store operation the round trip belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRequest {
    Register,
    Authenticate,
}

impl AuthRequest {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Authenticate => "authenticate",
        }
    }
}

#[async_trait]
pub trait AuthTransport: Send + Sync {
    /// Transport name for logs.
    fn name(&self) -> &str;

    /// Complete one round trip. Dropping the future abandons it.
    async fn round_trip(&self, request: AuthRequest) -> anyhow::Result<()>;
}

/// Fixed-latency stand-in for a network call.
pub struct SimulatedTransport {
    latency: Duration,
}

impl SimulatedTransport {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }
}

#[async_trait]
impl AuthTransport for SimulatedTransport {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn round_trip(&self, request: AuthRequest) -> anyhow::Result<()> {
        tracing::trace!(
            request = request.as_str(),
            latency_ms = self.latency.as_millis() as u64,
            "Simulated round trip"
        );
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn simulated_transport_waits_for_latency() {
        let transport = SimulatedTransport::new(Duration::from_millis(1000));
        let started = tokio::time::Instant::now();
        transport.round_trip(AuthRequest::Authenticate).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn zero_latency_returns_immediately() {
        let transport = SimulatedTransport::new(Duration::ZERO);
        assert!(transport.latency().is_zero());
        transport.round_trip(AuthRequest::Register).await.unwrap();
        assert_eq!(transport.name(), "simulated");
    }
}
