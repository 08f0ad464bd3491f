//! Send-and-wait pacing over a single connection
//!
//! Every write is followed by a blocking wait until the kernel reports that
//! the peer acknowledged everything, so the device only ever sees one
//! outstanding fragment.

use crate::error::UploadError;
use crate::protocol::ACK_TIMEOUT;
use crate::tcp_ack::AckProbe;
use std::io::Write;
use std::time::{Duration, Instant};

pub struct Pacer<S, P> {
    conn: S,
    probe: P,
    timeout: Duration,
    poll_interval: Duration,
}

impl<S, P> Pacer<S, P>
where
    S: Write,
    P: AckProbe<S>,
{
    pub fn new(conn: S, probe: P) -> Self {
        Pacer {
            conn,
            probe,
            timeout: ACK_TIMEOUT,
            poll_interval: Duration::ZERO,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sleep between snapshots; zero keeps the tight poll loop.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Write `buf` completely, then block until it is acknowledged.
    pub fn send(&mut self, step: &str, buf: &[u8]) -> Result<(), UploadError> {
        self.conn
            .write_all(buf)
            .and_then(|_| self.conn.flush())
            .map_err(UploadError::io("socket write failed"))?;
        self.wait(step)
    }

    /// Block until the probe reports nothing outstanding or the timeout,
    /// counted from this call, runs out.
    pub fn wait(&mut self, step: &str) -> Result<(), UploadError> {
        let start = Instant::now();
        loop {
            let outstanding = self
                .probe
                .outstanding(&self.conn)
                .map_err(UploadError::io("TCP info query failed"))?;
            if outstanding == 0 {
                return Ok(());
            }
            let waited = start.elapsed();
            if waited >= self.timeout {
                return Err(UploadError::AckTimeout {
                    step: step.to_string(),
                    outstanding,
                    waited,
                });
            }
            if !self.poll_interval.is_zero() {
                std::thread::sleep(self.poll_interval.min(self.timeout - waited));
            }
        }
    }

    pub fn into_inner(self) -> S {
        self.conn
    }
}
