//! Error types for the passthrough transport
//!
//! Every failure falls into one of three layers: the request was rejected
//! locally before reaching the kernel, the ioctl system call itself failed,
//! or the kernel accepted the call and the device (or the transport below
//! it) reported a failure. The layers are never merged.

use crate::outcome::{FailureLayer, NvmeStatus, ScsiError};
use thiserror::Error;

/// Unified error type for the transport layer
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Input Validation Errors
    // =========================================================================
    #[error("Invalid buffer size {len}: {reason}")]
    InvalidBuffer { len: usize, reason: &'static str },

    #[error("Invalid CDB length {len}: must be 1..=255 bytes")]
    InvalidCdb { len: usize },

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // System Call Errors
    // =========================================================================
    #[error("ioctl failed: {}", std::io::Error::from_raw_os_error(*errno))]
    Syscall { errno: i32 },

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    #[error("SCSI command failed: {0}")]
    Scsi(ScsiError),

    #[error("NVMe command failed: {0}")]
    Nvme(NvmeStatus),
}

impl Error {
    /// Builds a syscall error from an `std::io::Error` produced by a failed ioctl
    pub fn from_os_error(err: &std::io::Error) -> Self {
        Error::Syscall {
            errno: err.raw_os_error().unwrap_or(libc::EIO),
        }
    }

    /// Layer at which this error originated
    pub fn layer(&self) -> FailureLayer {
        match self {
            Error::InvalidBuffer { .. } | Error::InvalidCdb { .. } | Error::Configuration(_) => {
                FailureLayer::Validation
            }
            Error::Syscall { .. } => FailureLayer::Syscall,
            Error::Scsi(_) | Error::Nvme(_) => FailureLayer::Device,
        }
    }

    /// The device or transport reported a failure after a successful ioctl
    pub fn is_device_error(&self) -> bool {
        self.layer() == FailureLayer::Device
    }

    /// The ioctl system call itself failed
    pub fn is_syscall_error(&self) -> bool {
        matches!(self, Error::Syscall { .. })
    }

    /// Raw OS error code, only present for syscall failures
    pub fn errno(&self) -> Option<i32> {
        match self {
            Error::Syscall { errno } => Some(*errno),
            _ => None,
        }
    }
}

/// Result type alias for the transport layer
pub type Result<T> = std::result::Result<T, Error>;
