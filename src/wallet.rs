//! Wallet CLI channel
//!
//! The wallet runs as an external CLI and is invoked per call with a
//! JSON request/response contract. Every invocation is wrapped in a
//! bounded timeout; a timeout, non-zero exit, or unparseable stdout
//! is a transport failure, never an application error.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use crate::types::TxOutcome;

/// Default wallet binary name, resolved through PATH
const DEFAULT_WALLET_BIN: &str = "controller";

/// Timeout for status queries
const STATUS_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for execute invocations (includes on-chain wait)
const EXECUTE_TIMEOUT: Duration = Duration::from_secs(45);

/// Transport-level failure of a wallet invocation
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("wallet CLI could not be spawned: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("wallet CLI timed out after {0:?}")]
    Timeout(Duration),
    #[error("wallet CLI exited with {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },
    #[error("wallet CLI produced unparseable output: {0}")]
    BadOutput(#[source] serde_json::Error),
}

/// Invokes the wallet CLI as a child process
pub struct WalletCli {
    bin: PathBuf,
}

impl WalletCli {
    /// Create a channel using the `WALLET_BIN` environment variable,
    /// falling back to `controller` on PATH
    pub fn from_env() -> Self {
        let bin = std::env::var("WALLET_BIN")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_WALLET_BIN));
        info!(bin = %bin.display(), "wallet channel initialized");
        Self { bin }
    }

    /// Create with a specific binary path (for testing)
    pub fn with_bin(bin: PathBuf) -> Self {
        Self { bin }
    }

    /// Query session status: `status --json`
    pub async fn status(&self) -> Result<TxOutcome, WalletError> {
        self.invoke(&["status", "--json"], STATUS_TIMEOUT).await
    }

    /// Submit one call: `execute --contract … --entrypoint … --calldata a,b,c --json --wait`
    pub async fn execute(
        &self,
        contract_address: &str,
        entrypoint: &str,
        calldata: &[String],
    ) -> Result<TxOutcome, WalletError> {
        let joined = calldata.join(",");
        let args = [
            "execute",
            "--contract",
            contract_address,
            "--entrypoint",
            entrypoint,
            "--calldata",
            joined.as_str(),
            "--json",
            "--wait",
            "--timeout",
            "30",
        ];
        info!(entrypoint, calldata = %joined, "wallet execute");
        self.invoke(&args, EXECUTE_TIMEOUT).await
    }

    /// Submit a pre-encoded multi-call bundle file:
    /// `execute --file bundle.json --json --wait`
    pub async fn execute_bundle_file(&self, path: &Path) -> Result<TxOutcome, WalletError> {
        let file = path.to_string_lossy().into_owned();
        let args = [
            "execute",
            "--file",
            file.as_str(),
            "--json",
            "--wait",
            "--timeout",
            "30",
        ];
        info!(file = %file, "wallet execute bundle");
        self.invoke(&args, EXECUTE_TIMEOUT).await
    }

    async fn invoke(&self, args: &[&str], timeout: Duration) -> Result<TxOutcome, WalletError> {
        debug!(bin = %self.bin.display(), ?args, "invoking wallet CLI");

        let child = Command::new(&self.bin)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        let output = tokio::time::timeout(timeout, child)
            .await
            .map_err(|_| WalletError::Timeout(timeout))?
            .map_err(WalletError::Spawn)?;

        if !output.status.success() {
            return Err(WalletError::NonZeroExit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(WalletError::BadOutput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bin() {
        let cli = WalletCli::with_bin(PathBuf::from("controller"));
        assert_eq!(cli.bin, PathBuf::from("controller"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_transport_failure() {
        let cli = WalletCli::with_bin(PathBuf::from("/nonexistent/wallet-cli"));
        let err = cli.status().await.unwrap_err();
        assert!(matches!(err, WalletError::Spawn(_)));
    }

    #[tokio::test]
    async fn test_unparseable_output_is_transport_failure() {
        // `true` exits 0 with empty stdout, which is not valid JSON.
        let cli = WalletCli::with_bin(PathBuf::from("/bin/true"));
        let err = cli.status().await.unwrap_err();
        assert!(matches!(err, WalletError::BadOutput(_)));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_transport_failure() {
        let cli = WalletCli::with_bin(PathBuf::from("/bin/false"));
        let err = cli.status().await.unwrap_err();
        assert!(matches!(err, WalletError::NonZeroExit { .. }));
    }
}
