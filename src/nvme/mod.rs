//! NVMe Admin Passthrough
//!
//! Issues admin-queue commands (Get Log Page, Identify) through the Linux
//! NVMe character or block device using the 64-bit passthrough ioctl.

pub mod admin;
pub mod command;

pub use admin::*;
pub use command::*;
