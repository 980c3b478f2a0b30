//! Error types for the fluid core.

use thiserror::Error;

/// Errors surfaced by field allocation, configuration and the GPU backend.
///
/// The numeric pipeline itself never fails; everything here happens at
/// initialization, reallocation or readback time.
#[derive(Debug, Error)]
pub enum FluidError {
    /// A field was requested with a zero dimension.
    #[error("field resolution must be non-zero, got {width}x{height}")]
    ZeroResolution {
        /// Requested width in texels.
        width: u32,
        /// Requested height in texels.
        height: u32,
    },

    /// Data handed to a field does not match the field's size.
    #[error("expected a {expected} field, got {actual}")]
    ResolutionMismatch {
        expected: crate::field::Resolution,
        actual: crate::field::Resolution,
    },

    /// Host memory for a field could not be reserved.
    #[error("cannot allocate a {resolution} field ({texels} texels)")]
    AllocationFailed {
        resolution: crate::field::Resolution,
        texels: u64,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No GPU adapter matched the request.
    #[error("no GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),

    /// The adapter refused to create a device.
    #[error("request_device failed: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    /// A field does not fit in a single storage binding on this device.
    #[error("field of {bytes} bytes exceeds the device storage binding limit of {limit} bytes")]
    FieldTooLarge {
        /// Size of the requested field.
        bytes: u64,
        /// Device limit.
        limit: u64,
    },

    /// Mapping a readback buffer failed.
    #[error("buffer map failed: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    /// The map callback was dropped before reporting.
    #[error("map_async channel closed")]
    ReadbackChannelClosed,
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, FluidError>;
