//! Bundle capture proxy
//!
//! A capturing decorator around the transaction submission boundary.
//! When armed, the next outbound bundle is recorded and answered with
//! a distinguished `Blocked` outcome instead of reaching the sink —
//! a safety valve that lets a human-initiated submission be captured
//! without financial effect. Unarmed submissions pass through and are
//! mirrored into an observation slot so auxiliary calldata (e.g. a
//! verifiable-randomness seed) can be recovered from a transaction
//! that really went out.

use tracing::{debug, info};

use crate::executor::ExecError;
use crate::types::{Call, TxOutcome};

/// The submission boundary the proxy decorates
pub trait BundleSink {
    fn submit_bundle(
        &mut self,
        calls: &[Call],
    ) -> impl std::future::Future<Output = Result<TxOutcome, ExecError>> + Send;
}

/// Outcome of a submission through the proxy
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Forwarded to the inner sink
    Submitted(TxOutcome),
    /// Captured by an armed proxy; never reached the sink
    Blocked,
}

/// A bundle recorded by the proxy
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedBundle {
    pub calls: Vec<Call>,
}

/// Capturing decorator over a [`BundleSink`]
pub struct CaptureProxy<S> {
    inner: S,
    armed: bool,
    captured: Option<CapturedBundle>,
    last_accepted: Option<CapturedBundle>,
}

impl<S: BundleSink> CaptureProxy<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            armed: false,
            captured: None,
            last_accepted: None,
        }
    }

    /// Arm the proxy to capture (and block) the next submission
    ///
    /// Idempotent: arming an already-armed proxy is a no-op.
    pub fn arm(&mut self) {
        if self.armed {
            debug!("capture proxy already armed");
            return;
        }
        self.armed = true;
        info!("capture proxy armed: next bundle will be blocked and recorded");
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Submit a bundle through the decorated boundary
    pub async fn submit_bundle(&mut self, calls: &[Call]) -> Result<SubmitOutcome, ExecError> {
        if self.armed {
            self.armed = false;
            self.captured = Some(CapturedBundle {
                calls: calls.to_vec(),
            });
            info!(calls = calls.len(), "blocked and captured outbound bundle");
            return Ok(SubmitOutcome::Blocked);
        }

        let outcome = self.inner.submit_bundle(calls).await?;
        self.last_accepted = Some(CapturedBundle {
            calls: calls.to_vec(),
        });
        Ok(SubmitOutcome::Submitted(outcome))
    }

    /// Return and clear the most recent blocked capture
    ///
    /// A second pop without a new capture returns `None`.
    pub fn pop_captured(&mut self) -> Option<CapturedBundle> {
        self.captured.take()
    }

    /// Read the last bundle that was allowed through, without consuming
    pub fn peek_last_accepted(&self) -> Option<&CapturedBundle> {
        self.last_accepted.as_ref()
    }

    /// Access the wrapped sink
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TxStatus;
    use serde_json::json;

    /// Sink that records calls and answers with a canned success
    struct RecordingSink {
        submissions: Vec<Vec<Call>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                submissions: Vec::new(),
            }
        }
    }

    impl BundleSink for RecordingSink {
        async fn submit_bundle(&mut self, calls: &[Call]) -> Result<TxOutcome, ExecError> {
            self.submissions.push(calls.to_vec());
            Ok(TxOutcome {
                status: TxStatus::Success,
                transaction_hash: Some("0xfeed".to_string()),
                data: None,
                error_code: None,
                message: None,
                recovery_hint: None,
            })
        }
    }

    fn sample_calls() -> Vec<Call> {
        vec![Call {
            contract_address: "0xabc".to_string(),
            entrypoint: "explore".to_string(),
            calldata: vec![json!("0x7"), json!("0x0")],
        }]
    }

    #[tokio::test]
    async fn test_armed_proxy_blocks_and_captures() {
        let mut proxy = CaptureProxy::new(RecordingSink::new());
        proxy.arm();

        let outcome = proxy.submit_bundle(&sample_calls()).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Blocked));
        // The sink was never touched.
        assert!(proxy.inner_mut().submissions.is_empty());

        let captured = proxy.pop_captured().unwrap();
        assert_eq!(captured.calls, sample_calls());
        // Pop is consume-once.
        assert!(proxy.pop_captured().is_none());
    }

    #[tokio::test]
    async fn test_arming_is_idempotent_and_one_shot() {
        let mut proxy = CaptureProxy::new(RecordingSink::new());
        proxy.arm();
        proxy.arm();
        assert!(proxy.is_armed());

        let _ = proxy.submit_bundle(&sample_calls()).await.unwrap();
        assert!(!proxy.is_armed());

        // The very next submission after a capture goes through.
        let outcome = proxy.submit_bundle(&sample_calls()).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Submitted(_)));
        assert_eq!(proxy.inner_mut().submissions.len(), 1);
    }

    #[tokio::test]
    async fn test_pass_through_records_observation_slot() {
        let mut proxy = CaptureProxy::new(RecordingSink::new());

        let outcome = proxy.submit_bundle(&sample_calls()).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Submitted(_)));

        // Accepted bundles land in the peek slot, not the capture slot.
        assert!(proxy.pop_captured().is_none());
        let peeked = proxy.peek_last_accepted().unwrap();
        assert_eq!(peeked.calls, sample_calls());
        // Peek does not consume.
        assert!(proxy.peek_last_accepted().is_some());
    }
}
