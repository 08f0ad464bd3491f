//! covrflash library
//!
//! Paced raw-HTTP firmware upload for D-Link COVR-P2500 recovery mode

pub mod cli;
pub mod error;
pub mod logger;
pub mod multipart;
pub mod pacer;
pub mod progress;
pub mod protocol;
pub mod tcp_ack;
pub mod upload;

pub use cli::Args;
pub use error::UploadError;
