// src/error.rs
//
// Unified error handling for pixport.
// Uses thiserror for simple, type-safe error handling.
//
// Error scopes:
// - Job: fatal to one conversion job only, the batch continues
// - NonFatal: degrades gracefully (metadata splicing)
// - Batch: surfaced once to the caller (archive packaging, remote naming)

use std::borrow::Cow;
use thiserror::Error;

/// Failure scope, used by the orchestrator to decide propagation.
///
/// - `Job` errors are captured in that job's outcome; remaining jobs run.
/// - `NonFatal` errors are logged and the pipeline continues with degraded
///   output (e.g. an encoded stream without spliced metadata).
/// - `Batch` errors are reported once, after per-item results are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    Job,
    NonFatal,
    Batch,
}

/// pixport error types.
///
/// All errors are type-safe and carry clear, actionable messages.
#[derive(Debug, Error)]
pub enum ConvertError {
    // Decode errors
    #[error("Unsupported image format: {format}")]
    UnsupportedFormat { format: Cow<'static, str> },

    #[error("Failed to decode image: {message}")]
    DecodeFailed { message: Cow<'static, str> },

    // Safety limits (decompression bombs)
    #[error("Image dimension {dimension} exceeds maximum {max}")]
    DimensionExceedsLimit { dimension: u32, max: u32 },

    #[error("Image pixel count {pixels} exceeds maximum {max}")]
    PixelCountExceedsLimit { pixels: u64, max: u64 },

    // Geometry / configuration errors
    #[error("Invalid value for {name}: {value}. {reason}")]
    InvalidArgument {
        name: Cow<'static, str>,
        value: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    #[error("Resample failed ({source_width}x{source_height} -> {target_width}x{target_height}): {message}")]
    ResampleFailed {
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
        message: Cow<'static, str>,
    },

    // Encode errors
    #[error("Failed to encode as {format}: {message}")]
    EncodeFailed {
        format: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    // Metadata errors (never fatal to a job)
    #[error("Metadata splice failed: {message}")]
    MetadataFailed { message: Cow<'static, str> },

    // Batch-level errors
    #[error("Archive packaging failed: {message}")]
    ArchiveFailed { message: Cow<'static, str> },

    #[error("Remote name suggestion failed: {message}")]
    RemoteNameFailed { message: Cow<'static, str> },
}

impl Clone for ConvertError {
    fn clone(&self) -> Self {
        match self {
            Self::UnsupportedFormat { format } => Self::UnsupportedFormat {
                format: format.clone(),
            },
            Self::DecodeFailed { message } => Self::DecodeFailed {
                message: message.clone(),
            },
            Self::DimensionExceedsLimit { dimension, max } => Self::DimensionExceedsLimit {
                dimension: *dimension,
                max: *max,
            },
            Self::PixelCountExceedsLimit { pixels, max } => Self::PixelCountExceedsLimit {
                pixels: *pixels,
                max: *max,
            },
            Self::InvalidArgument {
                name,
                value,
                reason,
            } => Self::InvalidArgument {
                name: name.clone(),
                value: value.clone(),
                reason: reason.clone(),
            },
            Self::ResampleFailed {
                source_width,
                source_height,
                target_width,
                target_height,
                message,
            } => Self::ResampleFailed {
                source_width: *source_width,
                source_height: *source_height,
                target_width: *target_width,
                target_height: *target_height,
                message: message.clone(),
            },
            Self::EncodeFailed { format, message } => Self::EncodeFailed {
                format: format.clone(),
                message: message.clone(),
            },
            Self::MetadataFailed { message } => Self::MetadataFailed {
                message: message.clone(),
            },
            Self::ArchiveFailed { message } => Self::ArchiveFailed {
                message: message.clone(),
            },
            Self::RemoteNameFailed { message } => Self::RemoteNameFailed {
                message: message.clone(),
            },
        }
    }
}

// Constructor helpers
impl ConvertError {
    pub fn unsupported_format(format: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn decode_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn dimension_exceeds_limit(dimension: u32, max: u32) -> Self {
        Self::DimensionExceedsLimit { dimension, max }
    }

    pub fn pixel_count_exceeds_limit(pixels: u64, max: u64) -> Self {
        Self::PixelCountExceedsLimit { pixels, max }
    }

    pub fn invalid_argument(
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn resample_failed(
        source_dims: (u32, u32),
        target_dims: (u32, u32),
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::ResampleFailed {
            source_width: source_dims.0,
            source_height: source_dims.1,
            target_width: target_dims.0,
            target_height: target_dims.1,
            message: message.into(),
        }
    }

    pub fn encode_failed(
        format: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn metadata_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::MetadataFailed {
            message: message.into(),
        }
    }

    pub fn archive_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::ArchiveFailed {
            message: message.into(),
        }
    }

    pub fn remote_name_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::RemoteNameFailed {
            message: message.into(),
        }
    }

    /// Scope of this error for propagation decisions.
    pub fn scope(&self) -> ErrorScope {
        match self {
            Self::UnsupportedFormat { .. }
            | Self::DecodeFailed { .. }
            | Self::DimensionExceedsLimit { .. }
            | Self::PixelCountExceedsLimit { .. }
            | Self::InvalidArgument { .. }
            | Self::ResampleFailed { .. }
            | Self::EncodeFailed { .. } => ErrorScope::Job,

            Self::MetadataFailed { .. } => ErrorScope::NonFatal,

            Self::ArchiveFailed { .. } | Self::RemoteNameFailed { .. } => ErrorScope::Batch,
        }
    }

    /// True when a failure of this kind must not abort the batch loop.
    pub fn is_job_scoped(&self) -> bool {
        self.scope() == ErrorScope::Job
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, ConvertError>;
