//! Kernel ioctl plumbing
//!
//! Encodes ioctl command words and issues the raw system call. Every
//! transport in this crate goes through [`RawIoctl`], which is also the seam
//! tests use to stand in for the kernel.

pub mod code;
pub mod invoke;

pub use code::*;
pub use invoke::*;
