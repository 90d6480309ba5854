//! Linux-family backend: `sendfile64(2)` with an in/out offset.

use std::os::fd::RawFd;

use super::RawChunk;
use crate::connection::ConcurrencyMode;
use crate::error::SendPrimitive;

pub(super) const PRIMITIVE: SendPrimitive = SendPrimitive::SendfileLinux;

pub(super) fn send_chunk(
    sock: RawFd,
    file: RawFd,
    offset: u64,
    len: usize,
    _mode: ConcurrencyMode,
) -> RawChunk {
    // The offset guard ran before dispatch.
    let mut off = libc::off64_t::try_from(offset).unwrap_or(libc::off64_t::MAX);
    match rawsock::sendfile::send_file(sock, file, &mut off, len) {
        Ok(sent) => RawChunk { sent, errno: None },
        Err(e) => RawChunk {
            sent: 0,
            errno: Some(e.raw_os_error().unwrap_or(libc::EINVAL)),
        },
    }
}
