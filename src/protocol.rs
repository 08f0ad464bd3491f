//! Shared constants for the COVR-P2500 recovery upload

use std::time::Duration;

// Chunk size the recovery web server keeps up with
pub const BUFFER_SIZE: usize = 512;

// Per-wait ceiling for the kernel to report everything acknowledged
pub const ACK_TIMEOUT: Duration = Duration::from_secs(10);

// Single read of the device reply
pub const RESPONSE_BUFFER_SIZE: usize = 4096;

// How long the device may sit on the full body before answering
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

pub const SUCCESS_MARKER: &str = "Upgrade successfully!";

pub const CLOSE_GRACE: Duration = Duration::from_secs(1);

// Firmware logic advances the percentage every 2200ms
pub const FLASH_STEP: Duration = Duration::from_millis(2200);
pub const FLASH_STEPS: u32 = 100;

pub const DEFAULT_HOST: &str = "192.168.0.50";
pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_PATH: &str = "/upgrade.cgi";

pub const CRLF: &str = "\r\n";

/// Multipart part header lines (without line terminators)
pub mod part {
    pub const CONTENT_DISPOSITION: &str =
        "Content-Disposition: form-data; name=\"firmware\"; filename=\"firmware.bin\"";
    pub const CONTENT_TYPE: &str = "Content-Type: application/octet-stream";
    pub const BOUNDARY_PREFIX: &str = "---------------------------";
    pub const BOUNDARY_RANDOM_LEN: usize = 11;
}
