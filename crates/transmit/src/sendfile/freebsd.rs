//! FreeBSD-family backend: the byte count arrives through an
//! out-parameter, valid even when the call fails.

use std::os::fd::RawFd;

use super::RawChunk;
#[cfg(target_os = "freebsd")]
use super::config;
use crate::connection::ConcurrencyMode;
use crate::error::SendPrimitive;

pub(super) const PRIMITIVE: SendPrimitive = SendPrimitive::SendfileFreebsd;

/// Flags for one transfer: read-ahead pages in the upper half the way
/// the `SF_FLAGS` macro packs them, plus `SF_NODISKIO` so a page not in
/// memory reports `EBUSY` instead of parking the sender on disk I/O.
#[cfg(target_os = "freebsd")]
fn flags_for(mode: ConcurrencyMode) -> libc::c_int {
    let config = config::global();
    let readahead = match mode {
        ConcurrencyMode::Multiplexed => config.readahead_multiplexed,
        ConcurrencyMode::ThreadPerConnection => config.readahead_thread_per_connection,
    };
    ((u32::from(readahead) << 16) as libc::c_int) | libc::SF_NODISKIO
}

/// DragonFly has no `SF_FLAGS` read-ahead encoding.
#[cfg(target_os = "dragonfly")]
fn flags_for(_mode: ConcurrencyMode) -> libc::c_int {
    0
}

pub(super) fn send_chunk(
    sock: RawFd,
    file: RawFd,
    offset: u64,
    len: usize,
    mode: ConcurrencyMode,
) -> RawChunk {
    // The offset guard ran before dispatch.
    let off = libc::off_t::try_from(offset).unwrap_or(libc::off_t::MAX);
    let (res, sbytes) = rawsock::sendfile::send_file(file, sock, off, len, flags_for(mode));
    let sent = usize::try_from(sbytes).unwrap_or(0);
    match res {
        Ok(()) => RawChunk { sent, errno: None },
        Err(e) => RawChunk {
            sent,
            errno: Some(e.raw_os_error().unwrap_or(libc::EINVAL)),
        },
    }
}
