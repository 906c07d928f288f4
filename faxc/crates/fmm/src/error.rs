//! Error Module - FMM Error Types
//!
//! Defines all error types used in FMM.
//!
//! # Error Categories
//!
//! ## Memory Errors
//! - `OutOfMemory` - Linear memory exhausted (cannot grow further)
//! - `PayloadTooLarge` - Request exceeds the largest size class
//! - `InvalidPointer` - Address is not a live block produced by the allocator
//!
//! ## Protocol Errors
//! - `ProtocolViolation` - Header state does not match the operation
//!   (register twice, discard of a tracked object, ...)
//! - `StaticObject` - Operation not permitted on a static literal
//!
//! ## Configuration Errors
//! - `Configuration` - Invalid configuration
//!
//! Every variant except `Configuration` is fatal for generated code: the
//! runtime ABI turns it into an abort. Nothing here is retried.

use crate::object::ObjectState;
use std::panic::Location;
use thiserror::Error;

/// Main error type for all FMM operations
///
/// # Examples
///
/// ```rust
/// use fmm::error::MemError;
///
/// fn describe(err: &MemError) -> String {
///     match err {
///         MemError::OutOfMemory { requested, available } => {
///             format!("OOM: requested {}, available {}", requested, available)
///         }
///         other => other.to_string(),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum MemError {
    /// Out of memory - the linear memory cannot grow to fit the block
    ///
    /// **When returned:** Backing allocator exhausted its page budget
    ///
    /// **Recovery strategy:** None. The runtime aborts with this diagnostic.
    #[error("Out of memory: requested {requested} bytes, available {available} bytes")]
    OutOfMemory { requested: usize, available: usize },

    /// Payload larger than the largest size class can hold
    ///
    /// **When returned:** `payload + header` would exceed 2^31 bytes
    #[error("Payload too large: {size} bytes exceeds maximum of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    /// Address is not a block handed out by the backing allocator
    ///
    /// **When returned:** free of an unknown address, adopt of a stray
    /// reference, access outside linear memory
    #[error("Invalid pointer address: {address:#x}")]
    InvalidPointer { address: u32 },

    /// Header state does not match what the operation requires
    ///
    /// **When returned:** register on an already registered object, discard
    /// on a tracked object (checked builds only)
    ///
    /// **Action required:** This is a bug in the caller (usually generated
    /// code). The location names the offending call site.
    #[error(
        "Protocol violation in {operation} at {location}: object {address:#x} expected {expected}, found {actual}"
    )]
    ProtocolViolation {
        operation: &'static str,
        address: u32,
        expected: &'static str,
        actual: ObjectState,
        location: &'static Location<'static>,
    },

    /// Operation not permitted on an object in the static literal region
    #[error("Static object {address:#x} cannot be {operation}")]
    StaticObject {
        address: u32,
        operation: &'static str,
    },

    /// Configuration error
    ///
    /// **When returned:** Invalid `MemConfig` detected at construction
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl MemError {
    /// Check if this error must terminate the execution context
    pub fn is_fatal(&self) -> bool {
        !matches!(self, MemError::Configuration(_))
    }

    /// Check if this error indicates a bug in the caller
    pub fn is_bug(&self) -> bool {
        matches!(
            self,
            MemError::ProtocolViolation { .. }
                | MemError::InvalidPointer { .. }
                | MemError::StaticObject { .. }
        )
    }
}

impl From<crate::config::ConfigError> for MemError {
    fn from(err: crate::config::ConfigError) -> Self {
        MemError::Configuration(err.to_string())
    }
}

/// Result type alias for FMM operations
pub type Result<T> = std::result::Result<T, MemError>;

/// Ensure condition is true, otherwise return error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ClassId;

    #[test]
    fn test_fatal_classification() {
        let oom = MemError::OutOfMemory {
            requested: 64,
            available: 0,
        };
        assert!(oom.is_fatal());
        assert!(!oom.is_bug());

        let config = MemError::Configuration("max_pages must be > 0".to_string());
        assert!(!config.is_fatal());
    }

    #[test]
    fn test_protocol_violation_message() {
        let err = MemError::ProtocolViolation {
            operation: "register",
            address: 0x1010,
            expected: "scratch",
            actual: ObjectState::Tracked(ClassId::BUFFER),
            location: Location::caller(),
        };

        let msg = err.to_string();
        assert!(msg.contains("register"));
        assert!(msg.contains("0x1010"));
        assert!(msg.contains("expected scratch"));
        assert!(msg.contains("found tracked(class 1)"));
        assert!(err.is_bug());
    }
}
