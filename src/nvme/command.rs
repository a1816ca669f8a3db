//! NVMe Passthrough Command Layout

use crate::ioctl::{iowr, IoctlCommand};

// =============================================================================
// Admin Opcodes and Selectors
// =============================================================================

pub const NVME_ADMIN_GET_LOG_PAGE: u8 = 0x02;
pub const NVME_ADMIN_IDENTIFY: u8 = 0x06;

pub const NVME_LOG_ERROR_INFO: u8 = 0x01;
pub const NVME_LOG_SMART_INFO: u8 = 0x02;
pub const NVME_LOG_FIRMWARE_SLOT: u8 = 0x03;

/// Identify Namespace data structure for the given nsid
pub const NVME_CNS_NAMESPACE: u32 = 0x00;
/// Identify Controller data structure
pub const NVME_CNS_CONTROLLER: u32 = 0x01;
/// Active namespace ID list
pub const NVME_CNS_ACTIVE_NAMESPACES: u32 = 0x02;

/// Namespace id addressing every namespace, i.e. the controller itself
pub const NVME_NSID_ALL: u32 = 0xFFFF_FFFF;

pub const NVME_IDENTIFY_DATA_SIZE: usize = 4096;
pub const NVME_SMART_LOG_SIZE: usize = 512;

/// Largest log page transfer accepted by [`read_nvme_log_page`](super::read_nvme_log_page)
pub const NVME_MAX_LOG_PAGE_SIZE: usize = 0x4000;

// =============================================================================
// Passthrough Structures
// =============================================================================

/// `struct nvme_passthru_cmd64` from `<linux/nvme_ioctl.h>`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NvmePassthruCmd64 {
    pub opcode: u8,
    pub flags: u8,
    pub rsvd1: u16,
    pub nsid: u32,
    pub cdw2: u32,
    pub cdw3: u32,
    pub metadata: u64,
    pub addr: u64,
    pub metadata_len: u32,
    pub data_len: u32,
    pub cdw10: u32,
    pub cdw11: u32,
    pub cdw12: u32,
    pub cdw13: u32,
    pub cdw14: u32,
    pub cdw15: u32,
    pub timeout_ms: u32,
    pub rsvd2: u32,
    pub result: u64,
}

const _: () = assert!(std::mem::size_of::<NvmePassthruCmd64>() == 80);

// =============================================================================
// Ioctl Codes
// =============================================================================

pub const NVME_IOCTL_ADMIN64_CMD: IoctlCommand = iowr::<NvmePassthruCmd64>(b'N', 0x47);

/// CDW10 of a Get Log Page command: log id in bits 0-7, number of dwords
/// minus one in bits 16-31.
///
/// # Panics
///
/// Panics if `len` is not a multiple of 4 between 4 and
/// [`NVME_MAX_LOG_PAGE_SIZE`]. [`read_nvme_log_page`](super::read_nvme_log_page)
/// rejects such lengths with an error before calling this.
pub const fn log_page_cdw10(log_id: u8, len: usize) -> u32 {
    assert!(
        len >= 4 && len <= NVME_MAX_LOG_PAGE_SIZE && len % 4 == 0,
        "log page length must be a multiple of 4 in 4..=16384"
    );
    let numd = (len / 4) as u32 - 1;
    (log_id as u32) | (numd << 16)
}
