//! Scripted stand-in for the kernel side of the ioctls, used by unit tests.

use crate::error::{Error, Result};
use crate::ioctl::{IoctlCommand, RawIoctl};
use crate::nvme::{NvmePassthruCmd64, NVME_IOCTL_ADMIN64_CMD};
use crate::scsi::sgio::{SgIoHdr, SG_INFO_CHECK, SG_IO};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::ffi::c_void;
use std::ptr;

/// What the "device" answers to one SG_IO request
#[derive(Debug, Clone, Default)]
pub struct SgIoReply {
    pub data: Vec<u8>,
    pub sense: Vec<u8>,
    pub info: u32,
    pub status: u8,
    pub host_status: u16,
    pub driver_status: u16,
    pub resid: i32,
}

impl SgIoReply {
    pub fn data(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    pub fn failure(status: u8, host_status: u16, driver_status: u16) -> Self {
        Self {
            info: SG_INFO_CHECK,
            status,
            host_status,
            driver_status,
            ..Default::default()
        }
    }

    pub fn with_sense(mut self, sense: Vec<u8>) -> Self {
        self.sense = sense;
        self
    }
}

/// What the "controller" answers to one NVMe admin command
#[derive(Debug, Clone, Default)]
pub struct NvmeReply {
    pub data: Vec<u8>,
    pub status: u32,
    pub result: u64,
}

impl NvmeReply {
    pub fn data(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    pub fn status(status: u32) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn with_result(mut self, result: u64) -> Self {
        self.result = result;
        self
    }
}

/// The parts of an SG_IO header the transport filled in
#[derive(Debug, Clone)]
pub struct SeenSgIo {
    pub interface_id: i32,
    pub dxfer_direction: i32,
    pub dxfer_len: u32,
    pub mx_sb_len: u8,
    pub timeout: u32,
    pub cdb: Vec<u8>,
}

#[derive(Default)]
pub struct MockDevice {
    errno: Option<i32>,
    sg_replies: RefCell<VecDeque<SgIoReply>>,
    nvme_replies: RefCell<VecDeque<NvmeReply>>,
    commands: RefCell<Vec<IoctlCommand>>,
    sg_seen: RefCell<Vec<SeenSgIo>>,
    nvme_seen: RefCell<Vec<NvmePassthruCmd64>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every ioctl fails with `errno`
    pub fn with_errno(mut self, errno: i32) -> Self {
        self.errno = Some(errno);
        self
    }

    pub fn with_sg_io(self, reply: SgIoReply) -> Self {
        self.sg_replies.borrow_mut().push_back(reply);
        self
    }

    pub fn with_nvme(self, reply: NvmeReply) -> Self {
        self.nvme_replies.borrow_mut().push_back(reply);
        self
    }

    pub fn commands(&self) -> Vec<IoctlCommand> {
        self.commands.borrow().clone()
    }

    pub fn last_sg_io(&self) -> Option<SeenSgIo> {
        self.sg_seen.borrow().last().cloned()
    }

    pub fn last_nvme(&self) -> Option<NvmePassthruCmd64> {
        self.nvme_seen.borrow().last().copied()
    }

    unsafe fn answer_sg_io(&self, hdr: &mut SgIoHdr) -> i32 {
        let cdb = std::slice::from_raw_parts(hdr.cmdp, hdr.cmd_len as usize).to_vec();
        self.sg_seen.borrow_mut().push(SeenSgIo {
            interface_id: hdr.interface_id,
            dxfer_direction: hdr.dxfer_direction,
            dxfer_len: hdr.dxfer_len,
            mx_sb_len: hdr.mx_sb_len,
            timeout: hdr.timeout,
            cdb,
        });

        let reply = self.sg_replies.borrow_mut().pop_front().unwrap_or_default();

        let n = reply.data.len().min(hdr.dxfer_len as usize);
        if n > 0 {
            ptr::copy_nonoverlapping(reply.data.as_ptr(), hdr.dxferp.cast::<u8>(), n);
        }
        let sense_len = reply.sense.len().min(hdr.mx_sb_len as usize);
        if sense_len > 0 {
            ptr::copy_nonoverlapping(reply.sense.as_ptr(), hdr.sbp, sense_len);
        }

        hdr.sb_len_wr = sense_len as u8;
        hdr.info = reply.info;
        hdr.status = reply.status;
        hdr.masked_status = reply.status >> 1;
        hdr.host_status = reply.host_status;
        hdr.driver_status = reply.driver_status;
        hdr.resid = reply.resid;
        hdr.duration = 1;
        0
    }

    unsafe fn answer_nvme(&self, cmd: &mut NvmePassthruCmd64) -> i32 {
        self.nvme_seen.borrow_mut().push(*cmd);

        let reply = self.nvme_replies.borrow_mut().pop_front().unwrap_or_default();

        let n = reply.data.len().min(cmd.data_len as usize);
        if n > 0 {
            ptr::copy_nonoverlapping(reply.data.as_ptr(), cmd.addr as *mut u8, n);
        }
        cmd.result = reply.result;
        reply.status as i32
    }
}

impl RawIoctl for MockDevice {
    unsafe fn ioctl(&self, cmd: IoctlCommand, arg: *mut c_void) -> Result<i32> {
        self.commands.borrow_mut().push(cmd);

        if let Some(errno) = self.errno {
            return Err(Error::Syscall { errno });
        }

        if cmd == SG_IO {
            Ok(self.answer_sg_io(&mut *arg.cast::<SgIoHdr>()))
        } else if cmd == NVME_IOCTL_ADMIN64_CMD {
            Ok(self.answer_nvme(&mut *arg.cast::<NvmePassthruCmd64>()))
        } else {
            Err(Error::Syscall {
                errno: libc::ENOTTY,
            })
        }
    }
}
