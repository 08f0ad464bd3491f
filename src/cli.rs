//! Command-line arguments for the flash utility

use crate::protocol::{DEFAULT_HOST, DEFAULT_PATH, DEFAULT_PORT};
use crate::upload::UploadOptions;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug, Parser)]
#[command(
    author,
    version,
    about = "D-Link COVR-P2500 flash utility",
    after_help = "The upgrade percentage shown after the upload is an estimate; the device reports nothing while it flashes."
)]
pub struct Args {
    /// Firmware file to upload
    pub firmware: PathBuf,

    /// Router IP address
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Router HTTP port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// HTTP path for firmware upgrade
    #[arg(long, default_value = DEFAULT_PATH)]
    pub path: String,

    /// Milliseconds to sleep between ACK snapshots (0 = tight poll)
    #[arg(long = "poll-interval-ms", default_value_t = 0)]
    pub poll_interval_ms: u64,

    /// Skip the estimated flash progress after the upload
    #[arg(long)]
    pub skip_flash_wait: bool,

    /// Append a text log of the session to this file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn upload_options(&self) -> UploadOptions {
        let mut opts = UploadOptions::new(&self.firmware);
        opts.host = self.host.clone();
        opts.port = self.port;
        opts.path = self.path.clone();
        opts.poll_interval = Duration::from_millis(self.poll_interval_ms);
        opts
    }
}
