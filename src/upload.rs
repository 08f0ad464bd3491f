//! The recovery-mode upload: one paced multipart POST over raw TCP

use crate::error::UploadError;
use crate::logger::Logger;
use crate::multipart::{is_success, Multipart};
use crate::pacer::Pacer;
use crate::progress::UploadProgress;
use crate::protocol::{
    ACK_TIMEOUT, BUFFER_SIZE, CLOSE_GRACE, DEFAULT_HOST, DEFAULT_PATH, DEFAULT_PORT,
    RESPONSE_BUFFER_SIZE, RESPONSE_TIMEOUT,
};
use crate::tcp_ack::{AckProbe, KernelProbe};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub firmware: PathBuf,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub chunk_size: usize,
    pub ack_timeout: Duration,
    pub poll_interval: Duration,
    /// Zero waits for the reply indefinitely
    pub response_timeout: Duration,
    pub close_grace: Duration,
}

impl UploadOptions {
    pub fn new(firmware: impl Into<PathBuf>) -> Self {
        UploadOptions {
            firmware: firmware.into(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            path: DEFAULT_PATH.to_string(),
            chunk_size: BUFFER_SIZE,
            ack_timeout: ACK_TIMEOUT,
            poll_interval: Duration::ZERO,
            response_timeout: RESPONSE_TIMEOUT,
            close_grace: CLOSE_GRACE,
        }
    }

    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct FirmwareImage {
    pub path: PathBuf,
    pub len: u64,
    pub sha256: String,
}

#[derive(Debug, Clone)]
pub struct UploadReport {
    pub bytes_sent: u64,
    pub total_bytes: u64,
    pub response: String,
    pub elapsed: Duration,
}

/// Pre-flight: regular, readable file; size and SHA-256.
pub fn inspect_firmware(path: &Path) -> Result<FirmwareImage, UploadError> {
    let not_found = |source: Option<io::Error>| UploadError::FileNotFound {
        path: path.to_path_buf(),
        source,
    };
    let meta = std::fs::metadata(path).map_err(|e| not_found(Some(e)))?;
    if !meta.is_file() {
        return Err(not_found(None));
    }
    let file = File::open(path).map_err(|e| not_found(Some(e)))?;
    let sha256 = digest_image(path, file)?;
    Ok(FirmwareImage {
        path: path.to_path_buf(),
        len: meta.len(),
        sha256,
    })
}

/// Hex SHA-256 of the image; an unreadable image counts as not found.
fn digest_image<R: Read>(path: &Path, mut reader: R) -> Result<String, UploadError> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let n = reader
            .read(&mut buffer)
            .map_err(|e| UploadError::FileNotFound {
                path: path.to_path_buf(),
                source: Some(e),
            })?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}

/// Connect with Nagle disabled so each fragment leaves on its own.
///
/// Socket setup failures are connection errors: nothing has reached the
/// device yet.
pub fn connect(host: &str, port: u16) -> Result<TcpStream, UploadError> {
    let setup_failed = |source| UploadError::ConnectionError {
        addr: format!("{}:{}", host, port),
        source,
    };
    let stream = TcpStream::connect((host, port)).map_err(setup_failed)?;
    stream.set_nodelay(true).map_err(setup_failed)?;
    Ok(stream)
}

/// Full sequence against the real device using the kernel's ACK counters.
pub fn upload(
    opts: &UploadOptions,
    logger: &dyn Logger,
    progress: &UploadProgress,
) -> Result<UploadReport, UploadError> {
    let image = inspect_firmware(&opts.firmware)?;
    upload_image(opts, &image, logger, progress)
}

/// Same as [`upload`] for an image that already passed pre-flight.
pub fn upload_image(
    opts: &UploadOptions,
    image: &FirmwareImage,
    logger: &dyn Logger,
    progress: &UploadProgress,
) -> Result<UploadReport, UploadError> {
    let probe = KernelProbe::new()?;
    logger.start(&image.path, image.len, &image.sha256, &opts.target());
    let stream = connect(&opts.host, opts.port)?;
    stream
        .set_read_timeout(Some(opts.response_timeout).filter(|t| !t.is_zero()))
        .map_err(|source| UploadError::ConnectionError {
            addr: opts.target(),
            source,
        })?;
    logger.connected(&opts.target());
    progress.note(&format!("Connection established to {}", opts.target()));
    upload_over(opts, image, stream, probe, logger, progress)
}

/// Upload over an already connected stream with the given probe.
///
/// On `AckTimeout` the stream is dropped where it stands; nothing else is
/// written to it.
pub fn upload_over<S, P>(
    opts: &UploadOptions,
    image: &FirmwareImage,
    conn: S,
    probe: P,
    logger: &dyn Logger,
    progress: &UploadProgress,
) -> Result<UploadReport, UploadError>
where
    S: Read + Write,
    P: AckProbe<S>,
{
    let start = Instant::now();
    let multipart = Multipart::new();
    let mut pacer = Pacer::new(conn, probe)
        .with_timeout(opts.ack_timeout)
        .with_poll_interval(opts.poll_interval);

    let head = multipart.request_head(&opts.host, &opts.path, image.len);
    pacer.send("request headers", head.as_bytes())?;
    logger.sent("headers", head.len() as u64);

    let part = multipart.part_head();
    pacer.send("part headers", part.as_bytes())?;
    logger.sent("part", part.len() as u64);

    progress.note("If the upload gets stuck, turn off the device and try again");
    let file = File::open(&image.path).map_err(|e| UploadError::FileNotFound {
        path: image.path.clone(),
        source: Some(e),
    })?;
    let sent = stream_chunks(file, opts.chunk_size, |chunk| {
        pacer.send("firmware", chunk)?;
        progress.advance(chunk.len() as u64);
        Ok(())
    })?;
    logger.sent("firmware", sent);

    let closing = multipart.closing();
    pacer.send("closing boundary", closing.as_bytes())?;
    logger.sent("closing", closing.len() as u64);

    let mut conn = pacer.into_inner();
    let mut buf = vec![0u8; RESPONSE_BUFFER_SIZE];
    let n = match conn.read(&mut buf) {
        Ok(n) => n,
        // read timeout: the device took the body but never answered
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
            return Err(UploadError::UnexpectedResponse {
                response: String::new(),
            })
        }
        Err(e) => return Err(UploadError::Io {
            context: "failed to read device response",
            source: e,
        }),
    };
    let response = String::from_utf8_lossy(&buf[..n]).into_owned();
    logger.response(&response);
    if !is_success(&response) {
        return Err(UploadError::UnexpectedResponse { response });
    }

    std::thread::sleep(opts.close_grace);
    drop(conn);

    let elapsed = start.elapsed();
    logger.done(sent, elapsed.as_secs_f64());
    Ok(UploadReport {
        bytes_sent: sent,
        total_bytes: image.len,
        response,
        elapsed,
    })
}

/// Feed `reader` to `send` in `chunk_size` pieces; only the last may be
/// shorter. Returns the number of bytes handed to `send`.
pub fn stream_chunks<R, F>(
    mut reader: R,
    chunk_size: usize,
    mut send: F,
) -> Result<u64, UploadError>
where
    R: Read,
    F: FnMut(&[u8]) -> Result<(), UploadError>,
{
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut total = 0u64;
    loop {
        let n = fill_chunk(&mut reader, &mut buf)
            .map_err(UploadError::io("failed to read firmware"))?;
        if n == 0 {
            break;
        }
        send(&buf[..n])?;
        total += n as u64;
        if n < buf.len() {
            break;
        }
    }
    Ok(total)
}

fn fill_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
