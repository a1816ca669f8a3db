//! SCSI Generic Passthrough
//!
//! Sends command descriptor blocks through the Linux `SG_IO` interface. ATA
//! drives behind a SCSI translation layer (libata, USB bridges) are reached
//! the same way, wrapped in an ATA PASS-THROUGH CDB.

pub mod cdb;
pub mod sense;
pub mod sgio;

pub use cdb::*;
pub use sense::*;
pub use sgio::*;
