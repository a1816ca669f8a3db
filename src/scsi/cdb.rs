//! Command Descriptor Blocks
//!
//! Builders for the few CDBs needed to reach drive health data: SCSI
//! INQUIRY and LOG SENSE, and ATA commands tunnelled through ATA
//! PASS-THROUGH(16).

use crate::error::{Error, Result};
use std::fmt;

// =============================================================================
// Opcodes
// =============================================================================

pub const SCSI_INQUIRY: u8 = 0x12;
pub const SCSI_LOG_SENSE: u8 = 0x4D;
pub const SCSI_ATA_PASSTHROUGH_16: u8 = 0x85;

pub const ATA_IDENTIFY_DEVICE: u8 = 0xEC;
pub const ATA_SMART: u8 = 0xB0;

pub const SMART_READ_DATA: u8 = 0xD0;
pub const SMART_READ_THRESHOLDS: u8 = 0xD1;
pub const SMART_RETURN_STATUS: u8 = 0xDA;

/// LBA mid/high signature every SMART subcommand must carry
const SMART_LBA_SIGNATURE: u64 = 0x00C2_4F00;

pub const LOG_PAGE_TEMPERATURE: u8 = 0x0D;
pub const LOG_PAGE_INFORMATIONAL_EXCEPTIONS: u8 = 0x2F;

pub const MAX_CDB_LEN: usize = 16;

// =============================================================================
// ATA Task File
// =============================================================================

/// ATA protocol field of an ATA PASS-THROUGH CDB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtaProtocol {
    NonData = 3,
    PioDataIn = 4,
}

/// Register values for one ATA command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtaTaskfile {
    pub protocol: AtaProtocol,
    pub features: u16,
    pub count: u16,
    /// 48-bit LBA
    pub lba: u64,
    pub device: u8,
    pub command: u8,
    /// Ask the SATL to return the ATA registers as sense data
    pub check_condition: bool,
}

impl AtaTaskfile {
    fn smart(protocol: AtaProtocol, subcommand: u8) -> Self {
        Self {
            protocol,
            features: subcommand as u16,
            count: if protocol == AtaProtocol::NonData { 0 } else { 1 },
            lba: SMART_LBA_SIGNATURE,
            device: 0,
            command: ATA_SMART,
            check_condition: protocol == AtaProtocol::NonData,
        }
    }
}

// =============================================================================
// CDB
// =============================================================================

/// An immutable command descriptor block of up to 16 bytes
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Cdb {
    bytes: [u8; MAX_CDB_LEN],
    len: usize,
}

impl Cdb {
    /// Copies raw CDB bytes
    pub fn new(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() || bytes.len() > MAX_CDB_LEN {
            return Err(Error::InvalidCdb { len: bytes.len() });
        }
        let mut buf = [0u8; MAX_CDB_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            bytes: buf,
            len: bytes.len(),
        })
    }

    fn from_array<const N: usize>(bytes: [u8; N]) -> Self {
        let mut buf = [0u8; MAX_CDB_LEN];
        buf[..N].copy_from_slice(&bytes);
        Self { bytes: buf, len: N }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn opcode(&self) -> u8 {
        self.bytes[0]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Standard INQUIRY(6)
    pub fn inquiry(allocation_length: u16) -> Self {
        let [hi, lo] = allocation_length.to_be_bytes();
        Self::from_array([SCSI_INQUIRY, 0, 0, hi, lo, 0])
    }

    /// INQUIRY(6) for a vital product data page
    pub fn inquiry_vpd(page: u8, allocation_length: u16) -> Self {
        let [hi, lo] = allocation_length.to_be_bytes();
        Self::from_array([SCSI_INQUIRY, 0x01, page, hi, lo, 0])
    }

    /// LOG SENSE(10) for the cumulative values of `page`
    pub fn log_sense(page: u8, allocation_length: u16) -> Self {
        let [hi, lo] = allocation_length.to_be_bytes();
        Self::from_array([SCSI_LOG_SENSE, 0, 0x40 | (page & 0x3F), 0, 0, 0, 0, hi, lo, 0])
    }

    /// ATA PASS-THROUGH(16) carrying `tf`.
    ///
    /// Data-in transfers are sized in 512-byte blocks taken from the
    /// sector count register.
    pub fn ata_passthrough_16(tf: &AtaTaskfile) -> Self {
        let extend = u8::from(tf.features > 0xFF || tf.count > 0xFF || tf.lba > 0x0FFF_FFFF);

        // off_line | ck_cond | t_type | t_dir | byt_blok | t_length
        let mut flags = 0u8;
        if tf.check_condition {
            flags |= 1 << 5;
        }
        match tf.protocol {
            AtaProtocol::NonData => {}
            AtaProtocol::PioDataIn => flags |= (1 << 3) | (1 << 2) | 0x2,
        }

        let [_, _, lba5, lba4, lba3, lba2, lba1, lba0] = tf.lba.to_be_bytes();
        let [feat_hi, feat_lo] = tf.features.to_be_bytes();
        let [count_hi, count_lo] = tf.count.to_be_bytes();

        Self::from_array([
            SCSI_ATA_PASSTHROUGH_16,
            ((tf.protocol as u8) << 1) | extend,
            flags,
            feat_hi,
            feat_lo,
            count_hi,
            count_lo,
            lba3,
            lba0,
            lba4,
            lba1,
            lba5,
            lba2,
            tf.device,
            tf.command,
            0,
        ])
    }

    /// ATA IDENTIFY DEVICE, 512 bytes in
    pub fn ata_identify() -> Self {
        Self::ata_passthrough_16(&AtaTaskfile {
            protocol: AtaProtocol::PioDataIn,
            features: 0,
            count: 1,
            lba: 0,
            device: 0,
            command: ATA_IDENTIFY_DEVICE,
            check_condition: false,
        })
    }

    /// ATA SMART READ DATA, 512 bytes in
    pub fn ata_smart_read_data() -> Self {
        Self::ata_passthrough_16(&AtaTaskfile::smart(AtaProtocol::PioDataIn, SMART_READ_DATA))
    }

    /// ATA SMART READ THRESHOLDS, 512 bytes in
    pub fn ata_smart_read_thresholds() -> Self {
        Self::ata_passthrough_16(&AtaTaskfile::smart(
            AtaProtocol::PioDataIn,
            SMART_READ_THRESHOLDS,
        ))
    }

    /// ATA SMART RETURN STATUS, no data phase; the verdict comes back in the
    /// ATA status descriptor of the sense data
    pub fn ata_smart_return_status() -> Self {
        Self::ata_passthrough_16(&AtaTaskfile::smart(AtaProtocol::NonData, SMART_RETURN_STATUS))
    }
}

impl fmt::Debug for Cdb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cdb({:02X?})", self.as_bytes())
    }
}

impl AsRef<[u8]> for Cdb {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}
