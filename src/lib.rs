//! SMART Passthru - raw device command transport
//!
//! Reads drive health and identification data by talking to the Linux
//! block-device drivers directly, without smartctl or nvme-cli.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │          Device layer (caller: detection, open/close, parsing)     │
//! ├───────────────────────────────────┬───────────────────────────────┤
//! │   SCSI Generic I/O (SG_IO)        │   NVMe Admin Passthrough       │
//! │   send_scsi_command / send_cdb    │   read_nvme_log_page           │
//! │   CDB builders, sense decoding    │   read_nvme_identify           │
//! ├───────────────────────────────────┴───────────────────────────────┤
//! │             Outcome classification (device vs syscall)            │
//! ├───────────────────────────────────────────────────────────────────┤
//! │        Ioctl encoding (_IOC fields) + raw ioctl invocation        │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every call is one blocking system call. Buffers are borrowed from the
//! caller for exactly that call and never retained. Nothing is retried.
//!
//! # Modules
//!
//! - [`ioctl`]: Command word encoding and the [`RawIoctl`] invoker
//! - [`scsi`]: SG_IO transport, CDB builders, sense data
//! - [`nvme`]: NVMe admin passthrough
//! - [`outcome`]: Per-protocol success/failure classification
//! - [`config`]: Settings for the `smart-passthru` probe binary
//! - [`error`]: Error types and handling

pub mod config;
pub mod error;
pub mod ioctl;
pub mod nvme;
pub mod outcome;
pub mod scsi;

#[cfg(test)]
mod mock;

pub use config::{OutputFormat, ProbeConfig, Protocol, Query};
pub use error::{Error, Result};
pub use ioctl::{Direction, IoctlCommand, RawIoctl};
pub use nvme::{admin_passthru, read_nvme_identify, read_nvme_log_page, NvmePassthruCmd64};
pub use outcome::{FailureLayer, NvmeStatus, ScsiError, SgIoCompletion};
pub use scsi::{send_cdb, send_scsi_command, Cdb, DataDirection, SenseData, SenseKey};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
