//! Transport tests against the real ioctl path and an external kernel stand-in.

use assert_matches::assert_matches;
use smart_passthru::ioctl::IoctlCommand;
use smart_passthru::nvme::{
    NvmePassthruCmd64, NVME_CNS_CONTROLLER, NVME_IDENTIFY_DATA_SIZE, NVME_IOCTL_ADMIN64_CMD,
    NVME_LOG_SMART_INFO, NVME_SMART_LOG_SIZE,
};
use smart_passthru::scsi::{SgIoHdr, SG_INFO_CHECK, SG_IO};
use smart_passthru::{
    read_nvme_identify, read_nvme_log_page, send_scsi_command, Cdb, Error, FailureLayer,
    RawIoctl, SenseKey,
};
use std::cell::Cell;
use std::ffi::c_void;

// =============================================================================
// Real ioctl path
// =============================================================================

#[test]
fn test_sg_io_on_regular_file_is_syscall_error() {
    let file = tempfile::tempfile().unwrap();
    let mut response = [0u8; 96];

    let err = send_scsi_command(&file, Cdb::inquiry(96).as_bytes(), &mut response).unwrap_err();

    assert_eq!(err.layer(), FailureLayer::Syscall);
    assert!(err.errno().is_some());
    assert!(!err.is_device_error());
}

#[test]
fn test_nvme_on_regular_file_is_syscall_error() {
    let file = tempfile::tempfile().unwrap();
    let mut log = [0u8; NVME_SMART_LOG_SIZE];

    let err = read_nvme_log_page(&file, NVME_LOG_SMART_INFO, &mut log).unwrap_err();

    assert_matches!(err, Error::Syscall { .. });
    assert!(log.iter().all(|&b| b == 0));
}

#[test]
fn test_invalid_log_page_size_never_reaches_kernel() {
    let device = Controller::default();
    let mut buf = [0u8; 510];

    let err = read_nvme_log_page(&device, NVME_LOG_SMART_INFO, &mut buf).unwrap_err();

    assert_eq!(err.layer(), FailureLayer::Validation);
    assert_eq!(device.calls.get(), 0);
}

// =============================================================================
// Kernel stand-in
// =============================================================================

/// Answers NVMe identify with a fixed controller structure and fails every
/// SG_IO with CHECK CONDITION / ILLEGAL REQUEST.
#[derive(Default)]
struct Controller {
    calls: Cell<usize>,
}

const IDENTIFY_PREFIX: [u8; 8] = [0x4D, 0x14, 0x4D, 0x14, b'S', b'N', b'0', b'1'];

const ILLEGAL_REQUEST_SENSE: [u8; 18] = [
    0x70, 0, 0x05, 0, 0, 0, 0, 10, 0, 0, 0, 0, 0x24, 0x00, 0, 0, 0, 0,
];

impl RawIoctl for Controller {
    unsafe fn ioctl(&self, cmd: IoctlCommand, arg: *mut c_void) -> smart_passthru::Result<i32> {
        self.calls.set(self.calls.get() + 1);

        if cmd == NVME_IOCTL_ADMIN64_CMD {
            let nvme = &mut *arg.cast::<NvmePassthruCmd64>();
            if nvme.opcode != 0x06 || nvme.cdw10 != NVME_CNS_CONTROLLER {
                // Invalid Field in Command
                return Ok(0x0002);
            }
            let data = std::slice::from_raw_parts_mut(nvme.addr as *mut u8, nvme.data_len as usize);
            data[..IDENTIFY_PREFIX.len()].copy_from_slice(&IDENTIFY_PREFIX);
            return Ok(0);
        }

        if cmd == SG_IO {
            let hdr = &mut *arg.cast::<SgIoHdr>();
            let sense = std::slice::from_raw_parts_mut(hdr.sbp, hdr.mx_sb_len as usize);
            sense[..ILLEGAL_REQUEST_SENSE.len()].copy_from_slice(&ILLEGAL_REQUEST_SENSE);
            hdr.sb_len_wr = ILLEGAL_REQUEST_SENSE.len() as u8;
            hdr.status = 0x02;
            hdr.driver_status = 0x08;
            hdr.info = SG_INFO_CHECK;
            return Ok(0);
        }

        Err(Error::Syscall {
            errno: libc::ENOTTY,
        })
    }
}

#[test]
fn test_identify_controller_end_to_end() {
    let device = Controller::default();
    let mut buf = [0u8; NVME_IDENTIFY_DATA_SIZE];

    read_nvme_identify(&device, 0, NVME_CNS_CONTROLLER, &mut buf).unwrap();

    assert_eq!(&buf[..8], &IDENTIFY_PREFIX);
    // PCI vendor id is little-endian at offset 0
    assert_eq!(u16::from_le_bytes([buf[0], buf[1]]), 0x144D);
    assert_eq!(device.calls.get(), 1);
}

#[test]
fn test_identify_unsupported_cns_is_device_error() {
    let device = Controller::default();
    let mut buf = [0u8; NVME_IDENTIFY_DATA_SIZE];

    let err = read_nvme_identify(&device, 0, 0x1F, &mut buf).unwrap_err();

    assert_matches!(err, Error::Nvme(status) if status.status_code() == 0x02);
}

#[test]
fn test_smart_read_illegal_request_end_to_end() {
    let device = Controller::default();
    let mut buf = [0u8; 512];

    let err = send_scsi_command(&device, Cdb::ata_smart_read_data().as_bytes(), &mut buf)
        .unwrap_err();

    assert_eq!(err.layer(), FailureLayer::Device);
    assert_eq!(err.errno(), None);
    assert_matches!(err, Error::Scsi(scsi) => {
        assert!(scsi.is_check_condition());
        assert_eq!(scsi.host_status, 0);
        assert_eq!(scsi.driver_status, 0x08);
        let sense = scsi.sense_data().unwrap();
        assert_eq!(sense.sense_key, SenseKey::IllegalRequest);
        assert_eq!(sense.asc, 0x24);
    });
}
