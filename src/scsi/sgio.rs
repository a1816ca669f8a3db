//! SG_IO Transport
//!
//! Builds a version 3 `sg_io_hdr` around caller-owned buffers and submits it
//! with one ioctl. The header, the CDB, the sense buffer and the data buffer
//! are all borrowed for exactly the duration of the call.

use crate::error::{Error, Result};
use crate::ioctl::{IoctlCommand, RawIoctl};
use crate::outcome::{classify_sg_io, SgIoCompletion};
use std::ffi::c_void;
use std::ptr;
use tracing::debug;

// =============================================================================
// Constants
// =============================================================================

/// `SG_IO` predates the `_IOC` encoding and is a bare request number
pub const SG_IO: IoctlCommand = IoctlCommand::from_raw(0x2285);

pub const SG_INTERFACE_ID_ORIG: i32 = b'S' as i32;

pub const SG_DXFER_NONE: i32 = -1;
pub const SG_DXFER_TO_DEV: i32 = -2;
pub const SG_DXFER_FROM_DEV: i32 = -3;

pub const SG_INFO_OK_MASK: u32 = 0x1;
pub const SG_INFO_OK: u32 = 0x0;
pub const SG_INFO_CHECK: u32 = 0x1;

pub const SENSE_BUFFER_LEN: usize = 32;

/// Timeout handed to the kernel for every command
pub const DEFAULT_TIMEOUT_MS: u32 = 20_000;

// =============================================================================
// Header
// =============================================================================

/// `struct sg_io_hdr` from `<scsi/sg.h>`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SgIoHdr {
    pub interface_id: i32,
    pub dxfer_direction: i32,
    pub cmd_len: u8,
    pub mx_sb_len: u8,
    pub iovec_count: u16,
    pub dxfer_len: u32,
    pub dxferp: *mut c_void,
    pub cmdp: *mut u8,
    pub sbp: *mut u8,
    pub timeout: u32,
    pub flags: u32,
    pub pack_id: i32,
    pub usr_ptr: *mut c_void,
    pub status: u8,
    pub masked_status: u8,
    pub msg_status: u8,
    pub sb_len_wr: u8,
    pub host_status: u16,
    pub driver_status: u16,
    pub resid: i32,
    pub duration: u32,
    pub info: u32,
}

#[cfg(target_pointer_width = "64")]
const _: () = assert!(std::mem::size_of::<SgIoHdr>() == 88);
#[cfg(target_pointer_width = "32")]
const _: () = assert!(std::mem::size_of::<SgIoHdr>() == 64);

impl Default for SgIoHdr {
    fn default() -> Self {
        Self {
            interface_id: SG_INTERFACE_ID_ORIG,
            dxfer_direction: SG_DXFER_NONE,
            cmd_len: 0,
            mx_sb_len: 0,
            iovec_count: 0,
            dxfer_len: 0,
            dxferp: ptr::null_mut(),
            cmdp: ptr::null_mut(),
            sbp: ptr::null_mut(),
            timeout: DEFAULT_TIMEOUT_MS,
            flags: 0,
            pack_id: 0,
            usr_ptr: ptr::null_mut(),
            status: 0,
            masked_status: 0,
            msg_status: 0,
            sb_len_wr: 0,
            host_status: 0,
            driver_status: 0,
            resid: 0,
            duration: 0,
            info: 0,
        }
    }
}

// =============================================================================
// Transfer Direction
// =============================================================================

/// Data phase of a SCSI command together with the buffer it uses
#[derive(Debug)]
pub enum DataDirection<'a> {
    /// No data phase
    None,
    /// The device writes into the buffer
    FromDevice(&'a mut [u8]),
    /// The device reads from the buffer
    ToDevice(&'a [u8]),
}

impl DataDirection<'_> {
    fn sg_direction(&self) -> i32 {
        match self {
            DataDirection::None => SG_DXFER_NONE,
            DataDirection::FromDevice(_) => SG_DXFER_FROM_DEV,
            DataDirection::ToDevice(_) => SG_DXFER_TO_DEV,
        }
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Sends a read-oriented CDB; the device's data lands in `response`.
///
/// Fails with [`Error::Syscall`] if the ioctl itself fails, or
/// [`Error::Scsi`] carrying device, host and driver status when the kernel
/// reports the command did not complete cleanly.
pub fn send_scsi_command<D>(device: &D, cdb: &[u8], response: &mut [u8]) -> Result<SgIoCompletion>
where
    D: RawIoctl + ?Sized,
{
    send_cdb(device, cdb, DataDirection::FromDevice(response))
}

/// Sends a CDB with an explicit data phase
pub fn send_cdb<D>(device: &D, cdb: &[u8], data: DataDirection<'_>) -> Result<SgIoCompletion>
where
    D: RawIoctl + ?Sized,
{
    let cmd_len = u8::try_from(cdb.len())
        .ok()
        .filter(|len| *len > 0)
        .ok_or(Error::InvalidCdb { len: cdb.len() })?;

    let dxfer_direction = data.sg_direction();
    let (dxferp, dxfer_len) = match data {
        DataDirection::None => (ptr::null_mut(), 0),
        DataDirection::FromDevice(buf) => (buf.as_mut_ptr().cast::<c_void>(), transfer_len(buf.len())?),
        // The kernel only reads from a to-device buffer.
        DataDirection::ToDevice(buf) => (buf.as_ptr() as *mut c_void, transfer_len(buf.len())?),
    };

    let mut sense = [0u8; SENSE_BUFFER_LEN];
    let mut hdr = SgIoHdr {
        interface_id: SG_INTERFACE_ID_ORIG,
        dxfer_direction,
        timeout: DEFAULT_TIMEOUT_MS,
        cmd_len,
        cmdp: cdb.as_ptr() as *mut u8,
        mx_sb_len: SENSE_BUFFER_LEN as u8,
        sbp: sense.as_mut_ptr(),
        dxfer_len,
        dxferp,
        ..Default::default()
    };

    debug!(
        opcode = cdb[0],
        cmd_len,
        dxfer_direction,
        dxfer_len,
        "sending SG_IO command"
    );

    // SAFETY: `hdr` matches `struct sg_io_hdr`. The CDB, sense and data
    // buffers it points to are borrowed until this synchronous call returns.
    // The kernel writes the status fields of `hdr`, the sense buffer and, for
    // from-device transfers, the data buffer.
    unsafe { device.ioctl(SG_IO, (&mut hdr as *mut SgIoHdr).cast())? };

    classify_sg_io(&hdr, &sense)
}

fn transfer_len(len: usize) -> Result<u32> {
    if len == 0 {
        return Err(Error::InvalidBuffer {
            len,
            reason: "data buffer must not be empty",
        });
    }
    u32::try_from(len).map_err(|_| Error::InvalidBuffer {
        len,
        reason: "data buffer exceeds the SG_IO transfer length field",
    })
}
