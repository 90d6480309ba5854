//! Darwin backend: the length parameter is in/out, valid even when the
//! call fails.

use std::os::fd::RawFd;

use super::RawChunk;
use crate::connection::ConcurrencyMode;
use crate::error::SendPrimitive;

pub(super) const PRIMITIVE: SendPrimitive = SendPrimitive::SendfileDarwin;

pub(super) fn send_chunk(
    sock: RawFd,
    file: RawFd,
    offset: u64,
    len: usize,
    _mode: ConcurrencyMode,
) -> RawChunk {
    // The offset guard ran before dispatch.
    let off = libc::off_t::try_from(offset).unwrap_or(libc::off_t::MAX);
    let (res, moved) = rawsock::sendfile::send_file(file, sock, off, len);
    let sent = usize::try_from(moved).unwrap_or(0);
    match res {
        Ok(()) => RawChunk { sent, errno: None },
        Err(e) => RawChunk {
            sent,
            errno: Some(e.raw_os_error().unwrap_or(libc::EINVAL)),
        },
    }
}
