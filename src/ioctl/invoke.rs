//! Raw Ioctl Invocation
//!
//! One call, one `ioctl(2)`. No retries; whatever the kernel says is handed
//! straight back to the caller.

use super::code::IoctlCommand;
use crate::error::{Error, Result};
use std::ffi::c_void;
use std::fs::File;
use std::os::fd::{AsRawFd, BorrowedFd, RawFd};
use tracing::trace;

/// Something an ioctl can be issued against.
///
/// Implemented for open device files. Tests implement it to play the kernel's
/// side of the exchange.
pub trait RawIoctl {
    /// Issues exactly one ioctl and returns the non-negative value the kernel
    /// returned. A `-1` return becomes [`Error::Syscall`] with the errno.
    ///
    /// # Safety
    ///
    /// `arg` must point to a live value whose layout matches what the driver
    /// expects for `cmd`, and every buffer address stored inside that value
    /// must stay valid and unmoved until this call returns. The kernel writes
    /// results in place through `arg` and through those addresses.
    unsafe fn ioctl(&self, cmd: IoctlCommand, arg: *mut c_void) -> Result<i32>;
}

/// Issues `ioctl(fd, cmd, arg)`.
///
/// # Safety
///
/// Same contract as [`RawIoctl::ioctl`]; `fd` must be open for the call.
pub unsafe fn ioctl_fd(fd: RawFd, cmd: IoctlCommand, arg: *mut c_void) -> Result<i32> {
    trace!(fd, cmd = %cmd, "ioctl");

    // The request parameter is `c_ulong` on glibc and `c_int` on musl.
    let ret = libc::ioctl(fd, cmd.raw() as _, arg);
    if ret < 0 {
        let err = std::io::Error::last_os_error();
        trace!(fd, cmd = %cmd, error = %err, "ioctl failed");
        return Err(Error::from_os_error(&err));
    }
    Ok(ret)
}

impl RawIoctl for File {
    unsafe fn ioctl(&self, cmd: IoctlCommand, arg: *mut c_void) -> Result<i32> {
        ioctl_fd(self.as_raw_fd(), cmd, arg)
    }
}

impl RawIoctl for BorrowedFd<'_> {
    unsafe fn ioctl(&self, cmd: IoctlCommand, arg: *mut c_void) -> Result<i32> {
        ioctl_fd(self.as_raw_fd(), cmd, arg)
    }
}
