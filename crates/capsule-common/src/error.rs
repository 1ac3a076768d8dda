//! Common error types for the capsule pipeline.

use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`CapsuleError`].
pub type CapsuleResult<T> = Result<T, CapsuleError>;

/// Failure reported by a container runtime client.
///
/// Pipeline stages never interpret these; they attach them to the
/// stage-specific [`CapsuleError`] variant and forward them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The runtime does not know the container or image.
    #[error("not found: {what}")]
    NotFound {
        /// What was looked up.
        what: String,
    },

    /// The runtime answered with an error status.
    #[error("runtime responded with status {status}: {message}")]
    Api {
        /// Status code returned by the runtime API.
        status: u16,
        /// Message returned by the runtime API.
        message: String,
    },

    /// The runtime could not be reached or the exchange broke down.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Errors across the capsule pipeline.
#[derive(Error, Diagnostic, Debug)]
pub enum CapsuleError {
    /// Image reference cannot be resolved.
    #[error("Invalid image reference '{reference}': {reason}")]
    #[diagnostic(
        code(capsule::image::invalid_reference),
        help("References look like 'nginx', 'nginx:1.27' or 'ghcr.io/org/app@sha256:<hex>'")
    )]
    InvalidImageReference {
        /// The offending reference.
        reference: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Platform constraint cannot be parsed.
    #[error("Invalid image platform: {value}")]
    #[diagnostic(
        code(capsule::image::invalid_platform),
        help("Use 'os/architecture' or 'os/architecture/variant', e.g. 'linux/arm64/v8'")
    )]
    InvalidPlatform {
        /// The invalid platform string.
        value: String,
    },

    /// Exposed port specification cannot be parsed.
    #[error("Invalid port: {value}")]
    #[diagnostic(
        code(capsule::port::invalid),
        help("Use 'port' or 'port/protocol' with a protocol of tcp, udp or sctp, e.g. '80/tcp'")
    )]
    InvalidPort {
        /// The invalid value.
        value: String,
    },

    /// Runtime returned an unusable container ID.
    #[error("Invalid container ID: '{id}'")]
    #[diagnostic(code(capsule::container::invalid_id))]
    InvalidContainerId {
        /// The invalid container ID.
        id: String,
    },

    /// Runtime rejected or failed the create call.
    #[error("Failed to create container from {image}: {source}")]
    #[diagnostic(code(capsule::container::create))]
    Create {
        /// Resolved image reference.
        image: String,
        /// Runtime failure.
        source: RuntimeError,
    },

    /// Runtime rejected or failed the start call.
    #[error("Failed to start container {id}: {source}")]
    #[diagnostic(
        code(capsule::container::start),
        help("The container may still be allocated; terminate it to release it")
    )]
    Start {
        /// Container ID.
        id: String,
        /// Runtime failure.
        source: RuntimeError,
    },

    /// Container started but the readiness condition never held in time.
    #[error("Container {id} not ready after {timeout:?}: waited for {condition}")]
    #[diagnostic(
        code(capsule::wait::timeout),
        help("The container is running; inspect its logs or raise the startup timeout")
    )]
    ReadinessTimeout {
        /// Container ID.
        id: String,
        /// Configured startup timeout.
        timeout: Duration,
        /// Description of the awaited condition.
        condition: String,
    },

    /// Readiness strategy failed before its timeout elapsed.
    #[error("Readiness check for container {id} failed: {message}")]
    #[diagnostic(code(capsule::wait::failed))]
    Readiness {
        /// Container ID.
        id: String,
        /// The error message.
        message: String,
    },

    /// Stop or remove failed.
    #[error("Failed to terminate container {id}: {source}")]
    #[diagnostic(
        code(capsule::container::terminate),
        help("The container may still be allocated and running")
    )]
    Termination {
        /// Container ID.
        id: String,
        /// Runtime failure.
        source: RuntimeError,
    },

    /// Inspection failed.
    #[error("Failed to inspect container {id}: {source}")]
    #[diagnostic(code(capsule::container::inspect))]
    Inspect {
        /// Container ID.
        id: String,
        /// Runtime failure.
        source: RuntimeError,
    },

    /// Log retrieval failed.
    #[error("Failed to read logs of container {id}: {source}")]
    #[diagnostic(code(capsule::container::logs))]
    Logs {
        /// Container ID.
        id: String,
        /// Runtime failure.
        source: RuntimeError,
    },

    /// Requested port has no host binding.
    #[error("Port {port} is not mapped on container {id}")]
    #[diagnostic(
        code(capsule::port::not_mapped),
        help("Expose the port on the definition with `with_exposed_ports`")
    )]
    PortNotMapped {
        /// Container ID.
        id: String,
        /// The requested port.
        port: String,
    },

    /// The call's context was cancelled.
    #[error("Operation cancelled")]
    #[diagnostic(code(capsule::cancelled))]
    Cancelled,

    /// The call's deadline elapsed.
    #[error("Operation deadline exceeded")]
    #[diagnostic(code(capsule::deadline_exceeded))]
    DeadlineExceeded,

    /// Runtime client could not be constructed.
    #[error("Failed to connect to container runtime at {endpoint}: {message}")]
    #[diagnostic(
        code(capsule::connect),
        help("Check that the Docker daemon is running or set DOCKER_HOST")
    )]
    Connect {
        /// Endpoint that was tried.
        endpoint: String,
        /// The error message.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(capsule::config))]
    Config {
        /// The error message.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(capsule::io))]
    Io(#[from] std::io::Error),
}

impl From<std::convert::Infallible> for CapsuleError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

impl CapsuleError {
    /// Whether this error came from the caller's context rather than the runtime.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// The runtime failure behind this error, if any.
    #[must_use]
    pub const fn runtime_error(&self) -> Option<&RuntimeError> {
        match self {
            Self::Create { source, .. }
            | Self::Start { source, .. }
            | Self::Termination { source, .. }
            | Self::Inspect { source, .. }
            | Self::Logs { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CapsuleError::Start {
            id: "abc".to_string(),
            source: RuntimeError::Api {
                status: 500,
                message: "boom".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "Failed to start container abc: runtime responded with status 500: boom"
        );
    }

    #[test]
    fn runtime_error_is_exposed_as_source() {
        let err = CapsuleError::Create {
            image: "nginx".to_string(),
            source: RuntimeError::Transport("refused".to_string()),
        };
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("transport failure: refused"));
        assert_eq!(
            err.runtime_error(),
            Some(&RuntimeError::Transport("refused".to_string()))
        );
    }

    #[test]
    fn cancellation_is_distinct_from_runtime_failures() {
        assert!(CapsuleError::Cancelled.is_cancellation());
        assert!(CapsuleError::DeadlineExceeded.is_cancellation());
        assert!(CapsuleError::Cancelled.runtime_error().is_none());

        let err = CapsuleError::Termination {
            id: "abc".to_string(),
            source: RuntimeError::NotFound {
                what: "abc".to_string(),
            },
        };
        assert!(!err.is_cancellation());
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CapsuleError = io_err.into();
        assert!(matches!(err, CapsuleError::Io(_)));
    }
}
