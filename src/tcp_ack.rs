//! Kernel view of unacknowledged send data, one body per platform.
//!
//! Linux reports `tcpi_unacked` from `TCP_INFO`, macOS the bytes still queued
//! via `SO_NWRITE`, and Windows `BytesInFlight` from the `SIO_TCP_INFO` ioctl.
//! Structure layouts are fixed here rather than derived from system headers.

use crate::error::UploadError;
use std::io;
use std::net::TcpStream;

/// Source of "how much has the peer not acknowledged yet" snapshots.
///
/// `S` is the connection the snapshot is taken for. Implementations must take
/// exactly one snapshot per call.
pub trait AckProbe<S: ?Sized> {
    fn outstanding(&mut self, conn: &S) -> io::Result<u64>;
}

impl<S: ?Sized, P: AckProbe<S> + ?Sized> AckProbe<S> for &mut P {
    fn outstanding(&mut self, conn: &S) -> io::Result<u64> {
        (**self).outstanding(conn)
    }
}

/// Probe backed by the host operating system's TCP statistics.
#[derive(Debug, Clone, Copy)]
pub struct KernelProbe {
    _private: (),
}

impl KernelProbe {
    pub fn new() -> Result<Self, UploadError> {
        if SUPPORTED {
            Ok(KernelProbe { _private: () })
        } else {
            Err(UploadError::Unsupported(
                "no TCP acknowledgement counters available on this OS",
            ))
        }
    }

    pub fn is_supported() -> bool {
        SUPPORTED
    }
}

impl AckProbe<TcpStream> for KernelProbe {
    fn outstanding(&mut self, conn: &TcpStream) -> io::Result<u64> {
        outstanding_bytes(conn)
    }
}

const SUPPORTED: bool = cfg!(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "ios",
    windows
));

#[cfg(target_os = "linux")]
fn outstanding_bytes(stream: &TcpStream) -> io::Result<u64> {
    use std::os::fd::AsRawFd;
    let fd = stream.as_raw_fd();
    let mut info: libc::tcp_info = unsafe { std::mem::zeroed() };
    let mut len = std::mem::size_of::<libc::tcp_info>() as libc::socklen_t;
    let r = unsafe {
        libc::getsockopt(
            fd,
            libc::IPPROTO_TCP,
            libc::TCP_INFO,
            &mut info as *mut _ as *mut libc::c_void,
            &mut len,
        )
    };
    if r != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(info.tcpi_unacked as u64)
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
fn outstanding_bytes(stream: &TcpStream) -> io::Result<u64> {
    use std::os::fd::AsRawFd;
    let fd = stream.as_raw_fd();
    let mut queued: libc::c_int = 0;
    let mut len = std::mem::size_of_val(&queued) as libc::socklen_t;
    let r = unsafe {
        libc::getsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_NWRITE,
            &mut queued as *mut _ as *mut libc::c_void,
            &mut len,
        )
    };
    if r != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(queued.max(0) as u64)
}

/// `TCP_INFO_v0` from mstcpip.h (Windows 10 1703+).
#[cfg(windows)]
#[repr(C)]
#[derive(Default)]
#[allow(dead_code)]
struct TcpInfoV0 {
    state: i32,
    mss: u32,
    connection_time_ms: u64,
    timestamps_enabled: u8,
    rtt_us: u32,
    min_rtt_us: u32,
    bytes_in_flight: u32,
    cwnd: u32,
    snd_wnd: u32,
    rcv_wnd: u32,
    rcv_buf: u32,
    bytes_out: u64,
    bytes_in: u64,
    bytes_reordered: u32,
    bytes_retrans: u32,
    fast_retrans: u32,
    dup_acks_in: u32,
    timeout_episodes: u32,
    syn_retrans: u8,
}

// _WSAIORW(IOC_VENDOR, 39)
#[cfg(windows)]
const SIO_TCP_INFO: u32 = (1 << 31) | (1 << 30) | (3 << 27) | 39;

#[cfg(windows)]
fn outstanding_bytes(stream: &TcpStream) -> io::Result<u64> {
    use std::os::windows::io::AsRawSocket;
    use windows::Win32::Networking::WinSock::{WSAIoctl, SOCKET};
    let sock = SOCKET(stream.as_raw_socket() as usize);
    let version: u32 = 0;
    let mut info = TcpInfoV0::default();
    let mut returned: u32 = 0;
    let r = unsafe {
        WSAIoctl(
            sock,
            SIO_TCP_INFO,
            Some(&version as *const u32 as *const std::ffi::c_void),
            std::mem::size_of_val(&version) as u32,
            Some(&mut info as *mut TcpInfoV0 as *mut std::ffi::c_void),
            std::mem::size_of::<TcpInfoV0>() as u32,
            &mut returned,
            None,
            None,
        )
    };
    if r != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(info.bytes_in_flight as u64)
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "ios", windows)))]
fn outstanding_bytes(_stream: &TcpStream) -> io::Result<u64> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "TCP acknowledgement counters not available",
    ))
}
