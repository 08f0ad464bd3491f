//! Error kinds for a firmware upload

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug)]
pub enum UploadError {
    /// Firmware path missing, not a regular file, or unreadable
    FileNotFound { path: PathBuf, source: Option<io::Error> },
    /// TCP connect to the device failed
    ConnectionError { addr: String, source: io::Error },
    /// Kernel still reported unacknowledged bytes when the wait ran out
    AckTimeout { step: String, outstanding: u64, waited: Duration },
    /// Device reply did not contain the success marker
    UnexpectedResponse { response: String },
    /// No acknowledgement probe for this operating system
    Unsupported(&'static str),
    /// Socket or file I/O failure once the upload is under way
    Io { context: &'static str, source: io::Error },
}

impl UploadError {
    /// True once bytes may have reached the device, so it could be wedged.
    pub fn device_may_be_stuck(&self) -> bool {
        matches!(
            self,
            UploadError::AckTimeout { .. }
                | UploadError::UnexpectedResponse { .. }
                | UploadError::Io { .. }
        )
    }

    pub(crate) fn io(context: &'static str) -> impl FnOnce(io::Error) -> UploadError {
        move |source| UploadError::Io { context, source }
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::FileNotFound { path, source: Some(e) } => {
                write!(f, "firmware file not found: {} ({})", path.display(), e)
            }
            UploadError::FileNotFound { path, source: None } => {
                write!(f, "firmware file not found: {}", path.display())
            }
            UploadError::ConnectionError { addr, source } => {
                write!(f, "failed to connect to {}: {}", addr, source)
            }
            UploadError::AckTimeout {
                step,
                outstanding,
                waited,
            } => write!(
                f,
                "ACK timeout after {:.1}s while sending {} ({} bytes unacknowledged)",
                waited.as_secs_f64(),
                step,
                outstanding
            ),
            UploadError::UnexpectedResponse { response } if response.is_empty() => {
                write!(f, "device sent no response to the upload")
            }
            UploadError::UnexpectedResponse { .. } => {
                write!(f, "device response did not confirm the upgrade")
            }
            UploadError::Unsupported(what) => write!(f, "unsupported platform: {}", what),
            UploadError::Io { context, source } => write!(f, "{}: {}", context, source),
        }
    }
}

impl std::error::Error for UploadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UploadError::FileNotFound {
                source: Some(e), ..
            } => Some(e),
            UploadError::ConnectionError { source, .. } | UploadError::Io { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}
