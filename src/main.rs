//! covrflash - push a firmware image to a D-Link COVR-P2500 in recovery mode
//!
//! The recovery web server drops the connection when fed at full speed, so
//! every write waits for the kernel to see it acknowledged before the next.

use anyhow::{Context, Result};
use clap::Parser;
use covrflash::logger::{Logger, NoopLogger, TextLogger};
use covrflash::progress::{flash_wait, UploadProgress};
use covrflash::protocol::{FLASH_STEP, FLASH_STEPS};
use covrflash::upload::{inspect_firmware, upload_image};
use covrflash::{Args, UploadError};
use crossterm::style::{Color, Stylize};
use std::sync::Arc;

fn main() -> Result<()> {
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted by user. Exiting (Ctrl-C)...");
        // 128 + SIGINT
        std::process::exit(130);
    })
    .context("Error setting Ctrl-C handler")?;

    let args = Args::parse();

    // Choose logger once; NoopLogger when no --log-file
    let logger: Arc<dyn Logger> = if let Some(ref p) = args.log_file {
        match TextLogger::new(p) {
            Ok(l) => Arc::new(l),
            Err(e) => {
                eprintln!("warning: cannot open log file {}: {}", p.display(), e);
                Arc::new(NoopLogger)
            }
        }
    } else {
        Arc::new(NoopLogger)
    };

    let opts = args.upload_options();
    let image = match inspect_firmware(&opts.firmware) {
        Ok(image) => image,
        Err(e) => return Err(fail(logger.as_ref(), e)),
    };
    println!(
        "Firmware {} ({} bytes, sha256 {})",
        image.path.display(),
        image.len,
        image.sha256
    );

    let progress = UploadProgress::new(image.len);
    let report = match upload_image(&opts, &image, logger.as_ref(), &progress) {
        Ok(report) => report,
        Err(e) => {
            progress.finish_error();
            return Err(fail(logger.as_ref(), e));
        }
    };
    progress.finish_success();
    println!(
        "{} sent {}/{} bytes in {:.1}s",
        "Firmware uploaded successfully:".with(Color::Green).bold(),
        report.bytes_sent,
        report.total_bytes,
        report.elapsed.as_secs_f64()
    );
    println!("{}", report.response.trim_end());

    if !args.skip_flash_wait {
        println!(
            "Waiting for the device to flash; the percentage below is an estimate, not a device reading."
        );
        flash_wait(FLASH_STEPS, FLASH_STEP, true);
        println!("Upgrade should now be finished.");
    }
    Ok(())
}

fn fail(logger: &dyn Logger, e: UploadError) -> anyhow::Error {
    logger.error("upload", &e.to_string());
    if let UploadError::UnexpectedResponse { response } = &e {
        if !response.is_empty() {
            eprintln!("{}", response.trim_end());
        }
    }
    if e.device_may_be_stuck() {
        eprintln!(
            "{} the device may need a power cycle before trying again",
            "Hint:".with(Color::Yellow).bold()
        );
    }
    anyhow::Error::new(e).context("firmware upload failed")
}
