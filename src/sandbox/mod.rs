pub mod process;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::workflow::types::Language;

/// Hard ceiling on sandbox execution time, regardless of configuration.
pub const MAX_TIMEOUT_MS: u64 = 30_000;

/// Result of running code in the sandbox.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionReport {
    pub success: bool,
    pub output: String,
    pub errors: Vec<String>,
    pub execution_time_ms: u64,
}

/// Runs untrusted generated code. The sandbox enforces its own timeout; the
/// orchestrator only passes the configured value through. No isolation
/// guarantee is made beyond a separate OS process.
#[async_trait]
pub trait ExecutionSandbox: Send + Sync {
    async fn execute(
        &self,
        code: &str,
        language: Language,
        timeout_ms: u64,
    ) -> Result<ExecutionReport>;
}

/// Clamp a requested timeout to the hard cap.
pub fn clamp_timeout(timeout_ms: u64) -> u64 {
    timeout_ms.min(MAX_TIMEOUT_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_clamped_to_the_cap() {
        assert_eq!(clamp_timeout(5_000), 5_000);
        assert_eq!(clamp_timeout(30_000), 30_000);
        assert_eq!(clamp_timeout(120_000), 30_000);
    }
}
