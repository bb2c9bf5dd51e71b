//! Unit tests for error.rs
//!
//! Tests Display output, categories and fatality of every Error variant.

use crate::error::{Error, ErrorCategory, Result};
use crate::graphics_device::DescriptorKind;

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_out_of_range_display() {
    let err = Error::OutOfRange("sampler heap capacity 4096 exceeds 2048".to_string());
    let display = format!("{}", err);
    assert!(display.starts_with("Out of range"));
    assert!(display.contains("4096"));
}

#[test]
fn test_heap_does_not_exist_display() {
    let err = Error::DescriptorHeapDoesNotExist(DescriptorKind::Sampler);
    assert_eq!(
        format!("{}", err),
        "Descriptor heap does not exist: Sampler heap was never initialized"
    );
}

#[test]
fn test_capacity_exceeded_display() {
    let err = Error::CapacityExceeded { kind: DescriptorKind::ResourceView, capacity: 4 };
    let display = format!("{}", err);
    assert!(display.contains("ResourceView"));
    assert!(display.contains("4 descriptors"));
}

#[test]
fn test_device_removed_display() {
    let err = Error::DeviceRemoved("hung".to_string());
    assert_eq!(format!("{}", err), "Device removed: hung");
}

// ============================================================================
// CATEGORY TESTS
// ============================================================================

#[test]
fn test_categories() {
    assert_eq!(Error::OutOfRange(String::new()).category(), ErrorCategory::Configuration);
    assert_eq!(
        Error::DescriptorHeapDoesNotExist(DescriptorKind::RenderTargetView).category(),
        ErrorCategory::Configuration
    );
    assert_eq!(
        Error::CapacityExceeded { kind: DescriptorKind::Sampler, capacity: 1 }.category(),
        ErrorCategory::ResourceExhausted
    );
    assert_eq!(Error::InvalidOperation(String::new()).category(), ErrorCategory::InvariantViolation);
    assert_eq!(Error::BackendError(String::new()).category(), ErrorCategory::DeviceFailure);
    assert_eq!(Error::DeviceRemoved(String::new()).category(), ErrorCategory::DeviceFailure);
}

#[test]
fn test_fatal_errors() {
    assert!(Error::InvalidOperation("double free".to_string()).is_fatal());
    assert!(Error::DeviceRemoved("lost".to_string()).is_fatal());
    assert!(Error::BackendError("poisoned".to_string()).is_fatal());

    assert!(!Error::OutOfRange("zero".to_string()).is_fatal());
    assert!(!Error::CapacityExceeded { kind: DescriptorKind::DepthStencilView, capacity: 2 }.is_fatal());
    assert!(!Error::DescriptorHeapDoesNotExist(DescriptorKind::Sampler).is_fatal());
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::InvalidOperation("x".to_string());
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_result_propagation() {
    fn inner() -> Result<u32> {
        Err(Error::OutOfRange("capacity must be > 0".to_string()))
    }
    fn outer() -> Result<u32> {
        let value = inner()?;
        Ok(value + 1)
    }
    assert_eq!(outer(), Err(Error::OutOfRange("capacity must be > 0".to_string())));
}
