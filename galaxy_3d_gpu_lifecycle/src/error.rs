//! Error types for the Galaxy3D GPU lifecycle core
//!
//! Every fallible operation returns `galaxy3d::Result`. Variants are grouped
//! into four categories that tell the caller what to do about them:
//! fix the configuration, size the heap differently, fix the code, or tear
//! the rendering session down.

use std::fmt;
use crate::graphics_device::DescriptorKind;

/// Result type for Galaxy3D operations
pub type Result<T> = std::result::Result<T, Error>;

/// Galaxy3D errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A size or count is outside the range accepted by the device or configuration
    OutOfRange(String),

    /// Allocation attempted on a heap that was never initialized
    DescriptorHeapDoesNotExist(DescriptorKind),

    /// Every slot of the heap is allocated
    CapacityExceeded {
        /// Kind of the exhausted heap
        kind: DescriptorKind,
        /// Capacity the heap was initialized with
        capacity: u32,
    },

    /// The call breaks an ownership or state invariant (foreign handle,
    /// double free, reinitialization with pending frees, out-of-order frame calls)
    InvalidOperation(String),

    /// A device or driver call failed
    BackendError(String),

    /// The device was removed or the queue rejected a submission
    DeviceRemoved(String),
}

/// Broad classification of an `Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Caller sized something wrong; surfaced at init, never retried
    Configuration,
    /// A heap is full; the caller may pick a larger heap or free more eagerly
    ResourceExhausted,
    /// Programming defect; the caller cannot recover locally
    InvariantViolation,
    /// The device is unusable; the rendering session must be torn down
    DeviceFailure,
}

impl Error {
    /// Category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::OutOfRange(_) | Error::DescriptorHeapDoesNotExist(_) => ErrorCategory::Configuration,
            Error::CapacityExceeded { .. } => ErrorCategory::ResourceExhausted,
            Error::InvalidOperation(_) => ErrorCategory::InvariantViolation,
            Error::BackendError(_) | Error::DeviceRemoved(_) => ErrorCategory::DeviceFailure,
        }
    }

    /// Whether the error indicates a defect or a lost device rather than a
    /// condition the caller is expected to handle
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::InvariantViolation | ErrorCategory::DeviceFailure
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OutOfRange(msg) => write!(f, "Out of range: {}", msg),
            Error::DescriptorHeapDoesNotExist(kind) => {
                write!(f, "Descriptor heap does not exist: {} heap was never initialized", kind)
            }
            Error::CapacityExceeded { kind, capacity } => {
                write!(f, "Capacity exceeded: {} heap is full ({} descriptors)", kind, capacity)
            }
            Error::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::DeviceRemoved(msg) => write!(f, "Device removed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
