//! Transaction executor
//!
//! Serializes transaction bundles and pushes them through the wallet
//! channel, applying the rate limiter and folding every outcome into a
//! uniform result. The destination contract address is fixed by
//! configuration and never accepted from callers. A `SessionExpired`
//! wallet result latches the executor unusable until a session check
//! sees an active session again.

use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use crate::bundle::BundleSink;
use crate::encode::{encode_calldata, encode_calls, UnsupportedValue};
use crate::rate_limit::{RateLimitExceeded, TxRateLimiter};
use crate::types::{Call, TxOutcome};
use crate::wallet::{WalletCli, WalletError};

/// Wallet error code that permanently invalidates the session
const SESSION_EXPIRED_CODE: &str = "SessionExpired";

/// Failure classes a submission can produce
///
/// Application-level wallet errors other than session expiry are not
/// errors at this layer; they come back inside `Ok(TxOutcome)` for
/// the policy layer to interpret.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// Typed rate-limit rejection; the core never retries these
    #[error(transparent)]
    RateLimited(#[from] RateLimitExceeded),
    /// Calldata could not be encoded; nothing was submitted
    #[error(transparent)]
    Encoding(#[from] UnsupportedValue),
    /// The channel failed before producing a result; caller may retry
    #[error(transparent)]
    Transport(#[from] WalletError),
    /// Bundle file could not be staged for the wallet CLI
    #[error("bundle file write failed: {0}")]
    BundleFile(#[source] std::io::Error),
    /// Fatal until an external re-authentication step occurs
    #[error("wallet session expired: {0}")]
    SessionExpired(String),
}

/// The wallet channel seam, so tests can count invocations
pub trait WalletChannel: Send + Sync {
    fn status(&self) -> impl std::future::Future<Output = Result<TxOutcome, WalletError>> + Send;

    fn execute(
        &self,
        contract_address: &str,
        entrypoint: &str,
        calldata: &[String],
    ) -> impl std::future::Future<Output = Result<TxOutcome, WalletError>> + Send;

    fn execute_bundle_file(
        &self,
        path: &std::path::Path,
    ) -> impl std::future::Future<Output = Result<TxOutcome, WalletError>> + Send;
}

impl WalletChannel for WalletCli {
    async fn status(&self) -> Result<TxOutcome, WalletError> {
        WalletCli::status(self).await
    }

    async fn execute(
        &self,
        contract_address: &str,
        entrypoint: &str,
        calldata: &[String],
    ) -> Result<TxOutcome, WalletError> {
        WalletCli::execute(self, contract_address, entrypoint, calldata).await
    }

    async fn execute_bundle_file(
        &self,
        path: &std::path::Path,
    ) -> Result<TxOutcome, WalletError> {
        WalletCli::execute_bundle_file(self, path).await
    }
}

/// Rate-gated, session-aware transaction executor
pub struct TxExecutor<C: WalletChannel> {
    channel: C,
    contract_address: String,
    limiter: TxRateLimiter,
    bundle_dir: PathBuf,
    session_dead: bool,
}

impl<C: WalletChannel> TxExecutor<C> {
    pub fn new(
        channel: C,
        contract_address: String,
        limiter: TxRateLimiter,
        bundle_dir: PathBuf,
    ) -> anyhow::Result<Self> {
        if !contract_address.starts_with("0x") {
            anyhow::bail!("contract address must be a hex 0x... address");
        }
        Ok(Self {
            channel,
            contract_address,
            limiter,
            bundle_dir,
            session_dead: false,
        })
    }

    /// Transactions recorded this session
    pub fn tx_count(&self) -> u32 {
        self.limiter.session_count()
    }

    /// Submit one call to the configured contract
    ///
    /// Fails fast on the rate gate or an encoding error without any
    /// external invocation. The limiter is recorded exactly once for
    /// every call that produced a parseable wallet result, including
    /// application-level errors; transport failures are not counted.
    pub async fn submit(
        &mut self,
        entrypoint: &str,
        calldata: &[serde_json::Value],
    ) -> Result<TxOutcome, ExecError> {
        self.precheck()?;
        let felts = encode_calldata(calldata)?;

        let outcome = self
            .channel
            .execute(&self.contract_address, entrypoint, &felts)
            .await?;

        self.limiter.record();
        self.inspect(outcome)
    }

    /// Submit a multi-call bundle through a staged bundle file
    pub async fn submit_calls(&mut self, calls: &[Call]) -> Result<TxOutcome, ExecError> {
        self.precheck()?;
        let bundle = encode_calls(calls)?;

        let path = self
            .bundle_dir
            .join(format!("bundle-{}.json", Uuid::new_v4()));
        let json = serde_json::to_vec_pretty(&bundle)
            .map_err(|e| ExecError::BundleFile(std::io::Error::other(e)))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(ExecError::BundleFile)?;

        let result = self.channel.execute_bundle_file(&path).await;

        // Staged files are single-use; removal is best-effort.
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "staged bundle file not removed");
        }

        let outcome = result?;
        self.limiter.record();
        self.inspect(outcome)
    }

    /// Session-liveness precheck
    ///
    /// Queries wallet status and fails unless the session is active
    /// with at least `min_remaining_secs` of validity left. Callers
    /// must treat a failure as a hard stop, not something to retry.
    /// A passing check clears the session-expired latch.
    pub async fn ensure_active_session(
        &mut self,
        min_remaining_secs: u64,
    ) -> Result<(), ExecError> {
        let status = self.channel.status().await?;

        let data = status.data.as_ref();
        let session_status = data
            .and_then(|d| d.get("status"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        if session_status != "active" {
            return Err(ExecError::SessionExpired(format!(
                "session not active (status: {}); re-register the session",
                session_status
            )));
        }

        let expires_in = data
            .and_then(|d| d.get("session"))
            .and_then(|s| s.get("expires_in_seconds"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        if expires_in < min_remaining_secs {
            return Err(ExecError::SessionExpired(format!(
                "session expires in {}s (need {}s); re-register before running",
                expires_in, min_remaining_secs
            )));
        }

        self.session_dead = false;
        info!(expires_in, "wallet session active");
        Ok(())
    }

    fn precheck(&mut self) -> Result<(), ExecError> {
        if self.session_dead {
            return Err(ExecError::SessionExpired(
                "session previously expired; re-authenticate".to_string(),
            ));
        }
        self.limiter.check()?;
        Ok(())
    }

    /// Fold a wallet result into the uniform outcome, latching on
    /// session expiry
    fn inspect(&mut self, outcome: TxOutcome) -> Result<TxOutcome, ExecError> {
        if outcome.error_code.as_deref() == Some(SESSION_EXPIRED_CODE) {
            self.session_dead = true;
            let message = outcome
                .message
                .unwrap_or_else(|| "session expired".to_string());
            return Err(ExecError::SessionExpired(message));
        }
        if !outcome.is_success() {
            warn!(
                error_code = outcome.error_code.as_deref().unwrap_or("unknown"),
                "wallet reported application error"
            );
        }
        Ok(outcome)
    }
}

impl<C: WalletChannel> BundleSink for TxExecutor<C> {
    async fn submit_bundle(&mut self, calls: &[Call]) -> Result<TxOutcome, ExecError> {
        self.submit_calls(calls).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TxStatus;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Scripted channel that counts invocations
    struct FakeChannel {
        calls: Arc<AtomicU32>,
        response: TxOutcome,
        status: TxOutcome,
    }

    impl FakeChannel {
        fn success() -> Self {
            Self {
                calls: Arc::new(AtomicU32::new(0)),
                response: ok_outcome(),
                status: active_status(600),
            }
        }

        fn with_response(response: TxOutcome) -> Self {
            Self {
                response,
                ..Self::success()
            }
        }
    }

    fn ok_outcome() -> TxOutcome {
        TxOutcome {
            status: TxStatus::Success,
            transaction_hash: Some("0xdead".to_string()),
            data: None,
            error_code: None,
            message: None,
            recovery_hint: None,
        }
    }

    fn app_error(code: &str) -> TxOutcome {
        TxOutcome {
            status: TxStatus::Error,
            transaction_hash: None,
            data: None,
            error_code: Some(code.to_string()),
            message: Some(format!("{} happened", code)),
            recovery_hint: None,
        }
    }

    fn active_status(expires_in: u64) -> TxOutcome {
        TxOutcome {
            status: TxStatus::Success,
            transaction_hash: None,
            data: Some(json!({
                "status": "active",
                "session": { "expires_in_seconds": expires_in }
            })),
            error_code: None,
            message: None,
            recovery_hint: None,
        }
    }

    impl WalletChannel for FakeChannel {
        async fn status(&self) -> Result<TxOutcome, WalletError> {
            Ok(self.status.clone())
        }

        async fn execute(
            &self,
            _contract_address: &str,
            _entrypoint: &str,
            _calldata: &[String],
        ) -> Result<TxOutcome, WalletError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }

        async fn execute_bundle_file(
            &self,
            _path: &std::path::Path,
        ) -> Result<TxOutcome, WalletError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    fn executor(channel: FakeChannel, limiter: TxRateLimiter) -> TxExecutor<FakeChannel> {
        TxExecutor::new(
            channel,
            "0xabc".to_string(),
            limiter,
            std::env::temp_dir(),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_non_hex_contract_address() {
        let result = TxExecutor::new(
            FakeChannel::success(),
            "not-an-address".to_string(),
            TxRateLimiter::new(6, 200),
            std::env::temp_dir(),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_rate_gate_blocks_before_channel() {
        let channel = FakeChannel::success();
        let call_count = channel.calls.clone();
        // Session cap of zero: every attempt must be rejected.
        let mut exec = executor(channel, TxRateLimiter::new(6, 0));

        let err = exec.submit("explore", &[json!("0x7")]).await.unwrap_err();
        assert!(matches!(err, ExecError::RateLimited(_)));
        assert_eq!(call_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_encoding_failure_never_invokes_channel() {
        let channel = FakeChannel::success();
        let call_count = channel.calls.clone();
        let mut exec = executor(channel, TxRateLimiter::new(6, 200));

        let err = exec.submit("explore", &[json!({})]).await.unwrap_err();
        assert!(matches!(err, ExecError::Encoding(_)));
        assert_eq!(call_count.load(Ordering::SeqCst), 0);
        assert_eq!(exec.tx_count(), 0);
    }

    #[tokio::test]
    async fn test_success_records_once() {
        let mut exec = executor(FakeChannel::success(), TxRateLimiter::new(6, 200));
        let outcome = exec.submit("explore", &[json!("0x7"), json!(false)]).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(exec.tx_count(), 1);
    }

    #[tokio::test]
    async fn test_app_error_still_counts() {
        let channel = FakeChannel::with_response(app_error("InsufficientGold"));
        let mut exec = executor(channel, TxRateLimiter::new(6, 200));

        let outcome = exec.submit("buy_potion", &[json!("0x7")]).await.unwrap();
        assert!(!outcome.is_success());
        assert_eq!(outcome.error_code.as_deref(), Some("InsufficientGold"));
        // Application-level errors count against the caps.
        assert_eq!(exec.tx_count(), 1);
    }

    #[tokio::test]
    async fn test_session_expired_is_fatal_and_latches() {
        let channel = FakeChannel::with_response(app_error(SESSION_EXPIRED_CODE));
        let call_count = channel.calls.clone();
        let mut exec = executor(channel, TxRateLimiter::new(6, 200));

        let err = exec.submit("explore", &[json!("0x7")]).await.unwrap_err();
        assert!(matches!(err, ExecError::SessionExpired(_)));

        // Latched: the next submit fails fast without reaching the channel.
        let err = exec.submit("explore", &[json!("0x7")]).await.unwrap_err();
        assert!(matches!(err, ExecError::SessionExpired(_)));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ensure_active_session_clears_latch() {
        let channel = FakeChannel::with_response(app_error(SESSION_EXPIRED_CODE));
        let mut exec = executor(channel, TxRateLimiter::new(6, 200));

        let _ = exec.submit("explore", &[json!("0x7")]).await.unwrap_err();
        exec.ensure_active_session(300).await.unwrap();

        // Channel still answers SessionExpired, but the gate is open again.
        let err = exec.submit("explore", &[json!("0x7")]).await.unwrap_err();
        assert!(matches!(err, ExecError::SessionExpired(_)));
    }

    #[tokio::test]
    async fn test_ensure_active_session_threshold() {
        let mut channel = FakeChannel::success();
        channel.status = active_status(120);
        let mut exec = executor(channel, TxRateLimiter::new(6, 200));

        assert!(exec.ensure_active_session(60).await.is_ok());
        let err = exec.ensure_active_session(300).await.unwrap_err();
        assert!(matches!(err, ExecError::SessionExpired(_)));
    }

    #[tokio::test]
    async fn test_ensure_active_session_rejects_inactive() {
        let mut channel = FakeChannel::success();
        channel.status = TxOutcome {
            data: Some(json!({ "status": "locked" })),
            ..ok_outcome()
        };
        let mut exec = executor(channel, TxRateLimiter::new(6, 200));

        let err = exec.ensure_active_session(300).await.unwrap_err();
        assert!(matches!(err, ExecError::SessionExpired(_)));
    }

    #[tokio::test]
    async fn test_submit_calls_stages_and_removes_bundle_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut exec = TxExecutor::new(
            FakeChannel::success(),
            "0xabc".to_string(),
            TxRateLimiter::new(6, 200),
            dir.path().to_path_buf(),
        )
        .unwrap();

        let calls = vec![Call {
            contract_address: "0xabc".to_string(),
            entrypoint: "explore".to_string(),
            calldata: vec![json!("0x7"), json!(false)],
        }];
        let outcome = exec.submit_calls(&calls).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(exec.tx_count(), 1);

        // Staged files do not accumulate across submissions.
        let mut entries = std::fs::read_dir(dir.path()).unwrap();
        assert!(entries.next().is_none());
    }
}
