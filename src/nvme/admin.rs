//! NVMe Admin Commands

use super::command::*;
use crate::error::{Error, Result};
use crate::ioctl::RawIoctl;
use crate::outcome::classify_nvme;
use tracing::debug;

/// Submits a prepared admin command and returns completion dword 0.
///
/// # Safety
///
/// When `cmd.addr` is non-zero it must point to a writable buffer of at least
/// `cmd.data_len` bytes that stays valid and unmoved until this returns. The
/// same applies to `cmd.metadata` / `cmd.metadata_len`.
pub unsafe fn admin_passthru<D>(device: &D, cmd: &mut NvmePassthruCmd64) -> Result<u64>
where
    D: RawIoctl + ?Sized,
{
    debug!(
        opcode = cmd.opcode,
        nsid = cmd.nsid,
        data_len = cmd.data_len,
        cdw10 = cmd.cdw10,
        "sending NVMe admin command"
    );

    let ret = device.ioctl(
        NVME_IOCTL_ADMIN64_CMD,
        (&mut *cmd as *mut NvmePassthruCmd64).cast(),
    )?;

    classify_nvme(ret, cmd.result)
}

/// Reads log page `log_id` for the whole controller into `buf`.
///
/// `buf` must be between 4 and 16 KiB long and a multiple of 4 bytes; other
/// sizes cannot be expressed in CDW10 and are rejected without touching the
/// device.
pub fn read_nvme_log_page<D>(device: &D, log_id: u8, buf: &mut [u8]) -> Result<()>
where
    D: RawIoctl + ?Sized,
{
    let len = buf.len();
    if len < 4 || len > NVME_MAX_LOG_PAGE_SIZE || len % 4 != 0 {
        return Err(Error::InvalidBuffer {
            len,
            reason: "log page buffer must be 4..=16384 bytes and a multiple of 4",
        });
    }

    let mut cmd = NvmePassthruCmd64 {
        opcode: NVME_ADMIN_GET_LOG_PAGE,
        nsid: NVME_NSID_ALL,
        addr: buf.as_mut_ptr() as u64,
        data_len: len as u32,
        cdw10: log_page_cdw10(log_id, len),
        ..Default::default()
    };

    // SAFETY: `addr`/`data_len` describe `buf`, which stays mutably borrowed
    // until the ioctl returns; the controller writes the log page into it.
    unsafe { admin_passthru(device, &mut cmd) }.map(|_| ())
}

/// Reads an Identify data structure selected by `cns` into `buf`.
///
/// Use `nsid = 0` with [`NVME_CNS_CONTROLLER`] for the controller structure,
/// or a namespace id with [`NVME_CNS_NAMESPACE`]. Every Identify structure is
/// 4096 bytes, so `buf` must hold at least [`NVME_IDENTIFY_DATA_SIZE`] bytes.
pub fn read_nvme_identify<D>(device: &D, nsid: u32, cns: u32, buf: &mut [u8]) -> Result<()>
where
    D: RawIoctl + ?Sized,
{
    if buf.len() < NVME_IDENTIFY_DATA_SIZE {
        return Err(Error::InvalidBuffer {
            len: buf.len(),
            reason: "identify buffer must hold 4096 bytes",
        });
    }
    let data_len = u32::try_from(buf.len()).map_err(|_| Error::InvalidBuffer {
        len: buf.len(),
        reason: "identify buffer exceeds the data length field",
    })?;

    let mut cmd = NvmePassthruCmd64 {
        opcode: NVME_ADMIN_IDENTIFY,
        nsid,
        addr: buf.as_mut_ptr() as u64,
        data_len,
        cdw10: cns,
        ..Default::default()
    };

    // SAFETY: `addr`/`data_len` describe `buf`, which stays mutably borrowed
    // until the ioctl returns; the controller writes the structure into it.
    unsafe { admin_passthru(device, &mut cmd) }.map(|_| ())
}
