//! # capsule-common
//!
//! Shared types for the capsule provisioning pipeline:
//! - Error types and the runtime failure carrier
//! - Container IDs
//! - Exposed port specifications
//! - The per-call execution context

#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod id;
pub mod port;

pub use context::ExecutionContext;
pub use error::{CapsuleError, CapsuleResult, RuntimeError};
pub use id::ContainerId;
pub use port::{ExposedPort, Protocol};
