//! SMART Passthru probe
//!
//! Issues one raw command against one device and prints what came back:
//! the response buffer on success, or the untouched status codes on failure.
//! Requires root (or CAP_SYS_RAWIO) for most devices.

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use smart_passthru::scsi::{LOG_PAGE_INFORMATIONAL_EXCEPTIONS, SENSE_BUFFER_LEN};
use smart_passthru::{
    read_nvme_identify, read_nvme_log_page, send_scsi_command, Cdb, Error, FailureLayer,
    OutputFormat, ProbeConfig, Protocol, Query, RawIoctl,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Send a raw SMART / identify command to a storage device
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Device node (e.g. /dev/nvme0, /dev/sda)
    #[arg(env = "SMART_DEVICE")]
    device: PathBuf,

    /// Command set used to reach the device
    #[arg(long, short, value_enum, env = "SMART_PROTOCOL", default_value = "nvme")]
    protocol: Protocol,

    /// What to read
    #[arg(long, short, value_enum, env = "SMART_QUERY", default_value = "health")]
    query: Query,

    /// NVMe log page identifier (health queries)
    #[arg(long, env = "SMART_LOG_ID", default_value = "2", value_parser = parse_u8)]
    log_id: u8,

    /// NVMe namespace id (identify queries)
    #[arg(long, env = "SMART_NSID", default_value = "0")]
    nsid: u32,

    /// NVMe identify structure selector (identify queries)
    #[arg(long, env = "SMART_CNS", default_value = "1")]
    cns: u32,

    /// Response buffer size in bytes
    #[arg(long, env = "SMART_BUFFER_LEN")]
    buffer_len: Option<usize>,

    /// Output format
    #[arg(long, short, value_enum, env = "SMART_OUTPUT", default_value = "hex")]
    output: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl From<&Args> for ProbeConfig {
    fn from(args: &Args) -> Self {
        ProbeConfig {
            device: args.device.clone(),
            protocol: args.protocol,
            query: args.query,
            log_id: args.log_id,
            nsid: args.nsid,
            cns: args.cns,
            buffer_len: args.buffer_len,
            output: args.output,
        }
    }
}

fn parse_u8(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid byte value {:?}: {}", s, e))
}

// =============================================================================
// Report
// =============================================================================

#[derive(Debug, Serialize)]
struct Report<'a> {
    device: String,
    protocol: Protocol,
    query: Query,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<Failure<'a>>,
}

#[derive(Debug, Serialize)]
struct Failure<'a> {
    layer: FailureLayer,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errno: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scsi: Option<&'a smart_passthru::ScsiError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nvme_status: Option<u32>,
}

impl<'a> Failure<'a> {
    fn from_error(err: &'a Error) -> Self {
        Self {
            layer: err.layer(),
            message: err.to_string(),
            errno: err.errno(),
            scsi: match err {
                Error::Scsi(scsi) => Some(scsi),
                _ => None,
            },
            nvme_status: match err {
                Error::Nvme(status) => Some(status.raw()),
                _ => None,
            },
        }
    }
}

// =============================================================================
// Main
// =============================================================================

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(&args);

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> anyhow::Result<ExitCode> {
    let config = ProbeConfig::from(args);
    config.validate()?;

    info!(
        device = %config.device.display(),
        protocol = %config.protocol,
        query = %config.query,
        "Starting probe"
    );

    let device = OpenOptions::new()
        .read(true)
        .open(&config.device)
        .with_context(|| format!("failed to open {}", config.device.display()))?;

    let mut buf = vec![0u8; config.buffer_len()];
    let result = issue(&device, &config, &mut buf);

    let report = Report {
        device: config.device.display().to_string(),
        protocol: config.protocol,
        query: config.query,
        ok: result.is_ok(),
        data: result.as_ref().ok().map(|_| hex_dump(&buf)),
        failure: result.as_ref().err().map(Failure::from_error),
    };

    match config.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Hex => print_report(&report),
    }

    Ok(if report.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Sends the single command described by `config`
fn issue<D: RawIoctl + ?Sized>(
    device: &D,
    config: &ProbeConfig,
    buf: &mut [u8],
) -> smart_passthru::Result<()> {
    match (config.protocol, config.query) {
        (Protocol::Nvme, Query::Identify) => {
            read_nvme_identify(device, config.nsid, config.cns, buf)
        }
        (Protocol::Nvme, _) => read_nvme_log_page(device, config.log_id, buf),
        (Protocol::Ata, query) => {
            let cdb = match query {
                Query::Identify => Cdb::ata_identify(),
                Query::Thresholds => Cdb::ata_smart_read_thresholds(),
                Query::Health => Cdb::ata_smart_read_data(),
            };
            send_cdb_logged(device, &cdb, buf)
        }
        (Protocol::Scsi, query) => {
            let len = u16::try_from(buf.len()).unwrap_or(u16::MAX);
            let cdb = match query {
                Query::Identify => Cdb::inquiry(len),
                _ => Cdb::log_sense(LOG_PAGE_INFORMATIONAL_EXCEPTIONS, len),
            };
            send_cdb_logged(device, &cdb, buf)
        }
    }
}

fn send_cdb_logged<D: RawIoctl + ?Sized>(
    device: &D,
    cdb: &Cdb,
    buf: &mut [u8],
) -> smart_passthru::Result<()> {
    debug!(cdb = ?cdb, "Issuing SG_IO");
    let completion = send_scsi_command(device, cdb.as_bytes(), buf)?;
    debug!(
        resid = completion.resid,
        duration_ms = completion.duration_ms,
        sense_len = completion.sense_len,
        "SG_IO completed"
    );
    Ok(())
}

fn print_report(report: &Report<'_>) {
    if let Some(data) = &report.data {
        println!("{}", data);
        return;
    }

    let Some(failure) = &report.failure else {
        return;
    };
    eprintln!("{} failure: {}", failure.layer, failure.message);
    if let Some(errno) = failure.errno {
        eprintln!("  errno:         {}", errno);
    }
    if let Some(scsi) = failure.scsi {
        eprintln!("  device status: {:#04x}", scsi.device_status);
        eprintln!("  host status:   {:#06x}", scsi.host_status);
        eprintln!("  driver status: {:#06x}", scsi.driver_status);
        if !scsi.sense.is_empty() {
            let shown = scsi.sense.len().min(SENSE_BUFFER_LEN);
            eprintln!("  sense:         {:02x?}", &scsi.sense[..shown]);
        }
    }
    if let Some(status) = failure.nvme_status {
        eprintln!("  nvme status:   {:#06x}", status);
    }
}

fn hex_dump(data: &[u8]) -> String {
    data.chunks(16)
        .enumerate()
        .map(|(i, chunk)| {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
            let ascii: String = chunk
                .iter()
                .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
                .collect();
            format!("{:08x}  {:<47}  |{}|", i * 16, hex.join(" "), ascii)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
