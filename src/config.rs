//! Probe configuration
//!
//! Describes a single raw command the `smart-passthru` binary should issue.
//! The transport itself has no configuration; everything here is about
//! choosing which command to send and how to print the result.

use crate::error::{Error, Result};
use crate::nvme::{
    NVME_CNS_CONTROLLER, NVME_IDENTIFY_DATA_SIZE, NVME_LOG_SMART_INFO, NVME_SMART_LOG_SIZE,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// ATA data-in commands move exactly one 512-byte sector
pub const ATA_SECTOR_SIZE: usize = 512;

/// Standard INQUIRY response length requested by default
pub const SCSI_INQUIRY_LEN: usize = 96;

/// Default LOG SENSE allocation length
pub const SCSI_LOG_PAGE_LEN: usize = 252;

// =============================================================================
// Enums
// =============================================================================

/// Command set used to reach the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// NVMe admin passthrough
    Nvme,
    /// ATA commands wrapped in ATA PASS-THROUGH(16) over SG_IO
    Ata,
    /// Native SCSI commands over SG_IO
    Scsi,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Nvme => write!(f, "nvme"),
            Protocol::Ata => write!(f, "ata"),
            Protocol::Scsi => write!(f, "scsi"),
        }
    }
}

/// What to read from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Query {
    /// Health data: NVMe log page, ATA SMART READ DATA, SCSI informational exceptions log
    Health,
    /// SMART thresholds (ATA only)
    Thresholds,
    /// Identification: NVMe Identify, ATA IDENTIFY DEVICE, SCSI INQUIRY
    Identify,
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Health => write!(f, "health"),
            Query::Thresholds => write!(f, "thresholds"),
            Query::Identify => write!(f, "identify"),
        }
    }
}

/// How to print the returned buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Hex,
    Json,
}

// =============================================================================
// Probe Configuration
// =============================================================================

/// One raw command against one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Device node, e.g. /dev/nvme0 or /dev/sda
    pub device: PathBuf,
    pub protocol: Protocol,
    pub query: Query,
    /// NVMe log identifier for health queries
    pub log_id: u8,
    /// NVMe namespace id for identify queries
    pub nsid: u32,
    /// NVMe identify structure selector
    pub cns: u32,
    /// Override of the response buffer size
    pub buffer_len: Option<usize>,
    pub output: OutputFormat,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/nvme0"),
            protocol: Protocol::Nvme,
            query: Query::Health,
            log_id: NVME_LOG_SMART_INFO,
            nsid: 0,
            cns: NVME_CNS_CONTROLLER,
            buffer_len: None,
            output: OutputFormat::Hex,
        }
    }
}

impl ProbeConfig {
    /// Response buffer size for the configured command
    pub fn buffer_len(&self) -> usize {
        if let Some(len) = self.buffer_len {
            return len;
        }
        match (self.protocol, self.query) {
            (Protocol::Nvme, Query::Identify) => NVME_IDENTIFY_DATA_SIZE,
            (Protocol::Nvme, _) => NVME_SMART_LOG_SIZE,
            (Protocol::Ata, _) => ATA_SECTOR_SIZE,
            (Protocol::Scsi, Query::Identify) => SCSI_INQUIRY_LEN,
            (Protocol::Scsi, _) => SCSI_LOG_PAGE_LEN,
        }
    }

    /// Rejects combinations that cannot be turned into a command
    pub fn validate(&self) -> Result<()> {
        if self.device.as_os_str().is_empty() {
            return Err(Error::Configuration("device path must not be empty".into()));
        }

        if self.query == Query::Thresholds && self.protocol != Protocol::Ata {
            return Err(Error::Configuration(format!(
                "thresholds are only available over ata, not {}",
                self.protocol
            )));
        }

        let len = self.buffer_len();
        if len == 0 {
            return Err(Error::Configuration("buffer length must not be zero".into()));
        }

        match self.protocol {
            Protocol::Nvme if self.query == Query::Identify && len < NVME_IDENTIFY_DATA_SIZE => {
                Err(Error::Configuration(format!(
                    "nvme identify needs {} bytes, got {}",
                    NVME_IDENTIFY_DATA_SIZE, len
                )))
            }
            Protocol::Ata if len != ATA_SECTOR_SIZE => Err(Error::Configuration(format!(
                "ata commands transfer exactly {} bytes, got {}",
                ATA_SECTOR_SIZE, len
            ))),
            Protocol::Scsi if len > u16::MAX as usize => Err(Error::Configuration(format!(
                "scsi allocation length {} exceeds {}",
                len,
                u16::MAX
            ))),
            _ => Ok(()),
        }
    }
}
