//! Plain and gathered socket sends.

use std::io;
use std::os::fd::RawFd;

/// Whether the platform can express "more data follows" on the send call
/// itself (`MSG_MORE`), making pre-send corking unnecessary on the
/// plaintext path.
pub const MSG_MORE_SUPPORTED: bool = cfg!(any(target_os = "linux", target_os = "android"));

#[cfg(any(target_os = "linux", target_os = "android"))]
fn more_flag(more: bool) -> libc::c_int {
    if more { libc::MSG_MORE } else { 0 }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn more_flag(_more: bool) -> libc::c_int {
    0
}

// Darwin has no MSG_NOSIGNAL; SIGPIPE suppression there is SO_NOSIGPIPE,
// set by whoever creates the socket.
#[cfg(not(any(target_os = "macos", target_os = "ios")))]
const NOSIGNAL: libc::c_int = libc::MSG_NOSIGNAL;
#[cfg(any(target_os = "macos", target_os = "ios"))]
const NOSIGNAL: libc::c_int = 0;

/// One `send(2)` on `fd`.
///
/// `more` requests the platform's "more data follows" hint where one
/// exists and is ignored elsewhere. Returns the byte count the socket
/// buffer accepted, which may be short of `buf.len()` on a non-blocking
/// socket.
pub fn send(fd: RawFd, buf: &[u8], more: bool) -> io::Result<usize> {
    let ret = unsafe {
        libc::send(
            fd,
            buf.as_ptr().cast::<libc::c_void>(),
            buf.len(),
            NOSIGNAL | more_flag(more),
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(ret as usize)
}

/// One gathered `sendmsg(2)` spanning `first` then `second`.
///
/// The kernel sees both buffers in a single call, so a short result is a
/// plain byte count into the concatenation rather than a success for one
/// buffer with the other lost.
pub fn send_vectored(fd: RawFd, first: &[u8], second: &[u8]) -> io::Result<usize> {
    let iov = [
        libc::iovec {
            iov_base: first.as_ptr().cast_mut().cast::<libc::c_void>(),
            iov_len: first.len(),
        },
        libc::iovec {
            iov_base: second.as_ptr().cast_mut().cast::<libc::c_void>(),
            iov_len: second.len(),
        },
    ];
    let mut msg: libc::msghdr = unsafe { std::mem::zeroed() };
    msg.msg_iov = iov.as_ptr().cast_mut();
    // msg_iovlen is size_t on glibc but c_int on musl and the BSDs.
    msg.msg_iovlen = iov.len() as _;
    let ret = unsafe { libc::sendmsg(fd, &raw const msg, NOSIGNAL) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(ret as usize)
}
