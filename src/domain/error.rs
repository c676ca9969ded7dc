//! Error kinds shared by every pipeline stage.

use thiserror::Error;

/// Errors surfaced by the harvest pipeline.
///
/// Only `MissingConfiguration` is fatal. The other kinds are either recovered
/// inside a stage or reported to the operator without touching local state.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// An extraction, fetch or publish call failed (network, quota, bad response)
    #[error("External call failed ({operation}): {message}")]
    TransientExternal { operation: String, message: String },

    /// A required credential or setting is absent
    #[error("Missing configuration: {0} is not set")]
    MissingConfiguration(String),

    /// A local catalog or results file could not be read
    #[error("Unreadable local state at {path}: {message}")]
    CorruptLocalState { path: String, message: String },

    /// Nothing to do for this stage
    #[error("Nothing to process: {0}")]
    EmptyUpstream(String),
}

impl HarvestError {
    /// Wrap a collaborator failure
    pub fn external(operation: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::TransientExternal {
            operation: operation.into(),
            message: format!("{:#}", err),
        }
    }

    /// Whether the operator should treat this as a no-op rather than a failure
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::EmptyUpstream(_))
    }
}

/// Read a required environment variable, failing with `MissingConfiguration`
pub fn require_env(name: &str) -> Result<String, HarvestError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(HarvestError::MissingConfiguration(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_is_missing_configuration() {
        let var = "QUIZHARVEST_TEST_UNSET_VARIABLE";
        let err = require_env(var).unwrap_err();
        assert!(matches!(err, HarvestError::MissingConfiguration(ref name) if name == var));
        assert!(err.to_string().contains(var));
    }

    #[test]
    fn test_empty_upstream_is_noop() {
        assert!(HarvestError::EmptyUpstream("no entries".into()).is_noop());
        assert!(!HarvestError::external("publish", "boom").is_noop());
    }

    #[test]
    fn test_external_keeps_operation() {
        let err = HarvestError::external("fetch", anyhow::anyhow!("404"));
        assert_eq!(err.to_string(), "External call failed (fetch): 404");
    }
}
