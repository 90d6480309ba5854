//! Solaris-family backend. The kernel advances the offset parameter even
//! when the call fails; the delta is the partial progress.

use std::os::fd::RawFd;

use super::RawChunk;
use crate::connection::ConcurrencyMode;
use crate::error::SendPrimitive;

pub(super) const PRIMITIVE: SendPrimitive = SendPrimitive::SendfileSolaris;

pub(super) fn send_chunk(
    sock: RawFd,
    file: RawFd,
    offset: u64,
    len: usize,
    _mode: ConcurrencyMode,
) -> RawChunk {
    // The offset guard ran before dispatch.
    let start = libc::off_t::try_from(offset).unwrap_or(libc::off_t::MAX);
    let mut off = start;
    match rawsock::sendfile::send_file(sock, file, &mut off, len) {
        Ok(sent) => RawChunk { sent, errno: None },
        Err(e) => RawChunk {
            // Bytes the kernel moved before failing.
            sent: usize::try_from(off.saturating_sub(start)).unwrap_or(0),
            errno: Some(e.raw_os_error().unwrap_or(libc::EINVAL)),
        },
    }
}
