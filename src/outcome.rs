//! Command Outcome Classification
//!
//! Each protocol reports completion differently. SG_IO fills three
//! independent status fields plus sense data; the NVMe ioctl returns the
//! completion queue status as its (positive) return value. The classifiers
//! here turn those raw signals into `Ok` or a typed device-level error,
//! keeping every raw field intact.

use crate::error::{Error, Result};
use crate::scsi::sense::SenseData;
use crate::scsi::sgio::{SgIoHdr, SG_INFO_OK, SG_INFO_OK_MASK};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

// =============================================================================
// Failure Layers
// =============================================================================

/// Where in the stack a failure originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureLayer {
    /// Rejected locally, no system call was made
    Validation,
    /// The ioctl system call failed
    Syscall,
    /// The call went through but the device or transport reported failure
    Device,
}

impl fmt::Display for FailureLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureLayer::Validation => write!(f, "validation"),
            FailureLayer::Syscall => write!(f, "syscall"),
            FailureLayer::Device => write!(f, "device"),
        }
    }
}

// =============================================================================
// SCSI Status
// =============================================================================

/// SAM status codes found in the SG_IO `status` field
pub mod scsi_status {
    pub const GOOD: u8 = 0x00;
    pub const CHECK_CONDITION: u8 = 0x02;
    pub const CONDITION_MET: u8 = 0x04;
    pub const BUSY: u8 = 0x08;
    pub const RESERVATION_CONFLICT: u8 = 0x18;
    pub const TASK_SET_FULL: u8 = 0x28;
    pub const ACA_ACTIVE: u8 = 0x30;
    pub const TASK_ABORTED: u8 = 0x40;
}

/// A failed SG_IO command.
///
/// The three status axes are independent: `device_status` is the target's
/// own answer, `host_status` comes from the host adapter, and
/// `driver_status` from the kernel driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScsiError {
    pub device_status: u8,
    pub host_status: u16,
    pub driver_status: u16,
    /// Sense bytes actually written by the device
    pub sense: Vec<u8>,
}

impl ScsiError {
    pub fn is_check_condition(&self) -> bool {
        self.device_status == scsi_status::CHECK_CONDITION
    }

    /// Decoded sense data, if the device wrote any in a known format
    pub fn sense_data(&self) -> Option<SenseData> {
        SenseData::parse(&self.sense)
    }
}

impl fmt::Display for ScsiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "device status {:#04x}, host status {:#06x}, driver status {:#06x}",
            self.device_status, self.host_status, self.driver_status
        )?;
        if let Some(sense) = self.sense_data() {
            write!(f, ", {}", sense)?;
        }
        Ok(())
    }
}

/// Details of a successful SG_IO command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SgIoCompletion {
    /// Bytes requested but not transferred
    pub resid: i32,
    /// Time the command took, as measured by the kernel
    pub duration_ms: u32,
    /// Sense bytes written (recovered errors can still report sense)
    pub sense_len: u8,
}

/// Classifies a completed SG_IO header
pub fn classify_sg_io(hdr: &SgIoHdr, sense: &[u8]) -> Result<SgIoCompletion> {
    if hdr.info & SG_INFO_OK_MASK != SG_INFO_OK {
        let written = usize::from(hdr.sb_len_wr).min(sense.len());
        let err = ScsiError {
            device_status: hdr.status,
            host_status: hdr.host_status,
            driver_status: hdr.driver_status,
            sense: sense[..written].to_vec(),
        };
        debug!(
            device_status = err.device_status,
            host_status = err.host_status,
            driver_status = err.driver_status,
            sense_len = written,
            "SG_IO command reported failure"
        );
        return Err(Error::Scsi(err));
    }

    Ok(SgIoCompletion {
        resid: hdr.resid,
        duration_ms: hdr.duration,
        sense_len: hdr.sb_len_wr,
    })
}

// =============================================================================
// NVMe Status
// =============================================================================

/// NVMe completion status as returned by the Linux passthrough ioctl.
///
/// The raw value is kept verbatim; accessors decode the status field layout
/// (status code, status code type, More, Do Not Retry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NvmeStatus(u32);

impl NvmeStatus {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Status Code (SC)
    pub const fn status_code(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Status Code Type (SCT)
    pub const fn status_code_type(self) -> u8 {
        ((self.0 >> 8) & 0x7) as u8
    }

    pub const fn more(self) -> bool {
        self.0 & (1 << 13) != 0
    }

    pub const fn do_not_retry(self) -> bool {
        self.0 & (1 << 14) != 0
    }

    pub fn status_code_type_name(self) -> &'static str {
        match self.status_code_type() {
            0x0 => "generic",
            0x1 => "command specific",
            0x2 => "media and data integrity",
            0x3 => "path related",
            0x7 => "vendor specific",
            _ => "reserved",
        }
    }
}

impl fmt::Display for NvmeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status {:#06x} (sct {:#x} {}, sc {:#04x}",
            self.0,
            self.status_code_type(),
            self.status_code_type_name(),
            self.status_code()
        )?;
        if self.do_not_retry() {
            write!(f, ", dnr")?;
        }
        write!(f, ")")
    }
}

/// Classifies the return of an NVMe passthrough ioctl.
///
/// `ret` is the non-negative ioctl return (negative returns were already
/// turned into syscall errors); `result` is completion dword 0.
pub fn classify_nvme(ret: i32, result: u64) -> Result<u64> {
    if ret == 0 {
        return Ok(result);
    }

    let status = NvmeStatus::new(ret as u32);
    debug!(
        status = status.raw(),
        sct = status.status_code_type(),
        sc = status.status_code(),
        "NVMe command completed with error status"
    );
    Err(Error::Nvme(status))
}
