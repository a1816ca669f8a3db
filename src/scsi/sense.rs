//! SCSI Sense Data
//!
//! Decodes the fields needed to tell why a command failed. Both the fixed
//! (0x70/0x71) and descriptor (0x72/0x73) formats are understood.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SPC sense key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenseKey {
    NoSense,
    RecoveredError,
    NotReady,
    MediumError,
    HardwareError,
    IllegalRequest,
    UnitAttention,
    DataProtect,
    BlankCheck,
    VendorSpecific,
    CopyAborted,
    AbortedCommand,
    Reserved,
    VolumeOverflow,
    Miscompare,
    Completed,
}

impl From<u8> for SenseKey {
    fn from(value: u8) -> Self {
        match value & 0x0F {
            0x0 => SenseKey::NoSense,
            0x1 => SenseKey::RecoveredError,
            0x2 => SenseKey::NotReady,
            0x3 => SenseKey::MediumError,
            0x4 => SenseKey::HardwareError,
            0x5 => SenseKey::IllegalRequest,
            0x6 => SenseKey::UnitAttention,
            0x7 => SenseKey::DataProtect,
            0x8 => SenseKey::BlankCheck,
            0x9 => SenseKey::VendorSpecific,
            0xA => SenseKey::CopyAborted,
            0xB => SenseKey::AbortedCommand,
            0xC => SenseKey::Reserved,
            0xD => SenseKey::VolumeOverflow,
            0xE => SenseKey::Miscompare,
            _ => SenseKey::Completed,
        }
    }
}

impl fmt::Display for SenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SenseKey::NoSense => "no sense",
            SenseKey::RecoveredError => "recovered error",
            SenseKey::NotReady => "not ready",
            SenseKey::MediumError => "medium error",
            SenseKey::HardwareError => "hardware error",
            SenseKey::IllegalRequest => "illegal request",
            SenseKey::UnitAttention => "unit attention",
            SenseKey::DataProtect => "data protect",
            SenseKey::BlankCheck => "blank check",
            SenseKey::VendorSpecific => "vendor specific",
            SenseKey::CopyAborted => "copy aborted",
            SenseKey::AbortedCommand => "aborted command",
            SenseKey::Reserved => "reserved",
            SenseKey::VolumeOverflow => "volume overflow",
            SenseKey::Miscompare => "miscompare",
            SenseKey::Completed => "completed",
        };
        write!(f, "{}", name)
    }
}

/// Decoded sense data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenseData {
    /// Response code with the VALID bit stripped
    pub response_code: u8,
    pub sense_key: SenseKey,
    /// Additional sense code
    pub asc: u8,
    /// Additional sense code qualifier
    pub ascq: u8,
}

impl SenseData {
    /// Parses sense bytes. Returns `None` for empty or unrecognized data.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let response_code = *raw.first()? & 0x7F;

        match response_code {
            // Fixed format: key in byte 2, ASC/ASCQ in bytes 12 and 13
            0x70 | 0x71 => {
                let sense_key = SenseKey::from(*raw.get(2)?);
                Some(Self {
                    response_code,
                    sense_key,
                    asc: raw.get(12).copied().unwrap_or(0),
                    ascq: raw.get(13).copied().unwrap_or(0),
                })
            }
            // Descriptor format: key, ASC and ASCQ in bytes 1..=3
            0x72 | 0x73 => Some(Self {
                response_code,
                sense_key: SenseKey::from(*raw.get(1)?),
                asc: *raw.get(2)?,
                ascq: *raw.get(3)?,
            }),
            _ => None,
        }
    }

    /// Sense describes a previous command rather than the current one
    pub fn is_deferred(&self) -> bool {
        matches!(self.response_code, 0x71 | 0x73)
    }

    pub fn is_descriptor_format(&self) -> bool {
        matches!(self.response_code, 0x72 | 0x73)
    }
}

impl fmt::Display for SenseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sense key {} (asc {:#04x}, ascq {:#04x})",
            self.sense_key, self.asc, self.ascq
        )
    }
}
