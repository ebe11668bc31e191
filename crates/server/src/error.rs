//! Structured errors for the vitrine-sw host.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Host-level failures that have no counterpart in the engine.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// No worker instance is in control of the origin.
    #[error("NO_ACTIVE_WORKER: no worker is controlling {0}")]
    NoActiveWorker(String),

    /// The named cache generation does not exist.
    #[error("UNKNOWN_GENERATION: {0}")]
    UnknownGeneration(String),
}

impl From<HostError> for McpError {
    fn from(err: HostError) -> Self {
        let code = match &err {
            HostError::NoActiveWorker(_) => -32030,
            HostError::UnknownGeneration(_) => -32031,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err: McpError = HostError::NoActiveWorker("http://shop.test/".into()).into();
        assert_eq!(err.code, ErrorCode(-32030));
        assert!(err.message.contains("NO_ACTIVE_WORKER"));

        let err: McpError = HostError::UnknownGeneration("precache-v9".into()).into();
        assert_eq!(err.code, ErrorCode(-32031));
    }
}
