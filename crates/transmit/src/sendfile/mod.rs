//! File-backed transmission over the platform's zero-copy primitive.
//!
//! Exactly one ABI backend compiles in per target. The backends return a
//! [`RawChunk`] in their kernel's own terms; [`resolve_chunk`] reconciles
//! byte counts with error codes in one place, so each family's quirks are
//! testable on any build host.

mod config;

#[cfg(any(target_os = "linux", target_os = "android"))]
#[path = "linux.rs"]
mod abi;
#[cfg(any(target_os = "solaris", target_os = "illumos"))]
#[path = "solaris.rs"]
mod abi;
#[cfg(any(target_os = "freebsd", target_os = "dragonfly"))]
#[path = "freebsd.rs"]
mod abi;
#[cfg(any(target_os = "macos", target_os = "ios"))]
#[path = "darwin.rs"]
mod abi;

use std::os::fd::RawFd;

use crate::connection::{ConcurrencyMode, Connection, SendStrategy};
use crate::diag;
use crate::error::{ErrnoClass, SendError, SendPrimitive, classify_errno};
use crate::response::ResponseBody;

/// Whether this target compiles a zero-copy backend at all. Connections
/// on targets without one start on the buffered strategy.
pub(crate) const BACKEND_AVAILABLE: bool = cfg!(any(
    target_os = "linux",
    target_os = "android",
    target_os = "solaris",
    target_os = "illumos",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "macos",
    target_os = "ios",
));

/// Computes the process-wide file-transmission configuration from the
/// system page size. Call once at daemon startup, before the first
/// file-backed transfer; a missing page size falls back to no read-ahead
/// sizing. Later calls are no-ops.
pub fn init_sendfile_config() {
    #[cfg(target_os = "freebsd")]
    {
        config::global();
    }
}

/// What one backend dispatch reported, in the kernel's own terms: the
/// byte count from whichever channel the ABI uses, plus the errno when
/// the call failed. Out-parameter families fill `sent` even on failure.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawChunk {
    pub(crate) sent: usize,
    pub(crate) errno: Option<i32>,
}

/// One chunk dispatch after reconciling the byte count with the error
/// code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChunkOutcome {
    /// Bytes moved. Partial progress wins over any accompanying error;
    /// the error resurfaces on the retry if it was real.
    Sent(usize),
    /// Socket buffers full; readiness is stale.
    WouldBlock,
    /// Interrupted or busy; retry immediately.
    Interrupted,
    /// This descriptor cannot be spliced; switch to buffered sends.
    Downgrade(i32),
    /// The peer reset or closed the connection.
    Reset,
    /// Unusable descriptor or an unrecognized condition.
    Fatal,
}

pub(crate) fn resolve_chunk(primitive: SendPrimitive, chunk: RawChunk) -> ChunkOutcome {
    let Some(errno) = chunk.errno else {
        return ChunkOutcome::Sent(chunk.sent);
    };
    if chunk.sent > 0 {
        return ChunkOutcome::Sent(chunk.sent);
    }
    match classify_errno(primitive, errno) {
        ErrnoClass::WouldBlock => ChunkOutcome::WouldBlock,
        ErrnoClass::Interrupted => ChunkOutcome::Interrupted,
        ErrnoClass::Unsupported => ChunkOutcome::Downgrade(errno),
        ErrnoClass::ConnReset => ChunkOutcome::Reset,
        ErrnoClass::Fatal => ChunkOutcome::Fatal,
    }
}

/// Per-call transfer ceiling for the connection's scheduling mode.
pub(crate) const fn chunk_for(mode: ConcurrencyMode) -> usize {
    match mode {
        ConcurrencyMode::Multiplexed => config::CHUNK_MULTIPLEXED,
        ConcurrencyMode::ThreadPerConnection => config::CHUNK_THREAD_PER_CONNECTION,
    }
}

/// Bytes to request from the next chunk dispatch.
pub(crate) fn clamp_chunk(remaining: u64, mode: ConcurrencyMode) -> usize {
    let chunk = chunk_for(mode);
    match usize::try_from(remaining) {
        Ok(remaining) => remaining.min(chunk),
        Err(_) => chunk,
    }
}

/// Absolute file offset of the next unsent byte, or `None` when it
/// cannot ride in the compiled-in ABI's offset type.
pub(crate) fn absolute_offset(base: u64, already_sent: u64) -> Option<u64> {
    let offset = base.checked_add(already_sent)?;
    (offset <= rawsock::MAX_OFFSET).then_some(offset)
}

impl Connection {
    /// Transmits the next chunk of the attached file-backed response
    /// through the platform's zero-copy primitive.
    ///
    /// Progress accounting stays with the caller: a successful return
    /// reports the bytes moved and the caller advances its cursor with
    /// [`Connection::advance_response`]. When the file turns out to be
    /// unusable for zero-copy the strategy flips permanently to
    /// [`SendStrategy::Standard`] and the call reports
    /// [`SendError::Again`]; the caller's next dispatch should consult
    /// [`Connection::strategy`] and read the body into memory instead.
    ///
    /// # Errors
    ///
    /// [`SendError::Badf`] when the connection is TLS or the response is
    /// not file-backed, [`SendError::Again`] for would-block, interrupted
    /// and downgrade conditions, [`SendError::ConnReset`] when the peer
    /// is gone, [`SendError::NotConn`] for a closed connection.
    pub fn send_file(&mut self) -> Result<usize, SendError> {
        self.ensure_open()?;
        if self.is_tls() {
            return Err(SendError::Badf);
        }
        let Some(response) = self.response().copied() else {
            return Err(SendError::Badf);
        };
        let ResponseBody::File { fd: file, offset: base } = response.body() else {
            return Err(SendError::Badf);
        };
        if self.strategy() != SendStrategy::Sendfile {
            // Already downgraded; the caller takes the buffered path on
            // its next dispatch.
            return Err(SendError::Again);
        }

        let remaining = response.total_size().saturating_sub(self.write_position());
        if remaining == 0 {
            return Ok(0);
        }
        let Some(offset) = absolute_offset(base, self.write_position()) else {
            self.downgrade_to_standard();
            diag::strategy_downgrade(self.fd(), None);
            return Err(SendError::Again);
        };
        let len = clamp_chunk(remaining, self.mode());
        self.transfer_chunk(file, offset, len, remaining)
    }

    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "solaris",
        target_os = "illumos",
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "macos",
        target_os = "ios",
    ))]
    fn transfer_chunk(
        &mut self,
        file: RawFd,
        offset: u64,
        len: usize,
        remaining: u64,
    ) -> Result<usize, SendError> {
        self.pre_send_setopt(false, true);
        let raw = abi::send_chunk(self.fd(), file, offset, len, self.mode());
        match resolve_chunk(abi::PRIMITIVE, raw) {
            ChunkOutcome::Sent(sent) => {
                if sent < len {
                    self.clear_write_ready();
                }
                self.post_send_setopt(false, sent as u64 == remaining);
                Ok(sent)
            }
            ChunkOutcome::WouldBlock => {
                self.clear_write_ready();
                Err(SendError::Again)
            }
            ChunkOutcome::Interrupted => Err(SendError::Again),
            ChunkOutcome::Downgrade(errno) => {
                self.downgrade_to_standard();
                diag::strategy_downgrade(self.fd(), Some(errno));
                Err(SendError::Again)
            }
            ChunkOutcome::Reset => Err(SendError::ConnReset),
            ChunkOutcome::Fatal => Err(SendError::Badf),
        }
    }

    /// No zero-copy backend on this target; unreachable in practice
    /// because connections here never start on the Sendfile strategy.
    #[cfg(not(any(
        target_os = "linux",
        target_os = "android",
        target_os = "solaris",
        target_os = "illumos",
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "macos",
        target_os = "ios",
    )))]
    fn transfer_chunk(
        &mut self,
        _file: RawFd,
        _offset: u64,
        _len: usize,
        _remaining: u64,
    ) -> Result<usize, SendError> {
        Err(SendError::Again)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::response::Response;

    #[test]
    fn tail_chunk_requests_exactly_the_remainder() {
        // total 1_000_000, sent 999_900: the request is the 100-byte tail.
        let remaining = 1_000_000_u64 - 999_900;
        assert_eq!(
            clamp_chunk(remaining, ConcurrencyMode::ThreadPerConnection),
            100
        );
    }

    #[test]
    fn chunk_ceilings_differ_by_mode() {
        assert_eq!(clamp_chunk(u64::MAX, ConcurrencyMode::Multiplexed), 0x20000);
        assert_eq!(
            clamp_chunk(u64::MAX, ConcurrencyMode::ThreadPerConnection),
            0x200000
        );
    }

    #[test]
    fn busy_with_progress_reports_the_bytes() {
        let outcome = resolve_chunk(
            SendPrimitive::SendfileFreebsd,
            RawChunk {
                sent: 4096,
                errno: Some(libc::EBUSY),
            },
        );
        assert_eq!(outcome, ChunkOutcome::Sent(4096));
    }

    #[test]
    fn busy_without_progress_retries() {
        let outcome = resolve_chunk(
            SendPrimitive::SendfileFreebsd,
            RawChunk {
                sent: 0,
                errno: Some(libc::EBUSY),
            },
        );
        assert_eq!(outcome, ChunkOutcome::Interrupted);
    }

    #[test]
    fn progress_wins_over_any_errno() {
        for (primitive, errno) in [
            (SendPrimitive::SendfileDarwin, libc::EAGAIN),
            (SendPrimitive::SendfileSolaris, libc::EINVAL),
            (SendPrimitive::SendfileFreebsd, libc::ENOTCONN),
        ] {
            let outcome = resolve_chunk(
                primitive,
                RawChunk {
                    sent: 17,
                    errno: Some(errno),
                },
            );
            assert_eq!(outcome, ChunkOutcome::Sent(17));
        }
    }

    #[test]
    fn unsupported_descriptor_carries_its_errno() {
        let outcome = resolve_chunk(
            SendPrimitive::SendfileLinux,
            RawChunk {
                sent: 0,
                errno: Some(libc::EINVAL),
            },
        );
        assert_eq!(outcome, ChunkOutcome::Downgrade(libc::EINVAL));
    }

    #[test]
    fn offsets_stop_at_the_abi_limit() {
        assert_eq!(absolute_offset(128, 72), Some(200));
        assert_eq!(absolute_offset(u64::MAX - 10, 100), None);
        assert_eq!(absolute_offset(rawsock::MAX_OFFSET, 1), None);
        assert_eq!(
            absolute_offset(rawsock::MAX_OFFSET, 0),
            Some(rawsock::MAX_OFFSET)
        );
    }

    #[test]
    fn tls_connection_is_refused_by_precondition() {
        struct NullTls;
        impl crate::connection::TlsSession for NullTls {
            fn send(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                Ok(buf.len())
            }
        }
        let mut conn =
            Connection::new_tls(3, ConcurrencyMode::Multiplexed, Box::new(NullTls));
        conn.set_response(Response::file_backed(4, 1024, 0));
        assert_eq!(conn.send_file(), Err(SendError::Badf));
    }

    #[test]
    fn non_file_response_is_refused() {
        let mut conn = Connection::new(3, ConcurrencyMode::Multiplexed);
        assert_eq!(conn.send_file(), Err(SendError::Badf));
        conn.set_response(Response::buffered(1024));
        assert_eq!(conn.send_file(), Err(SendError::Badf));
    }

    #[test]
    fn downgraded_strategy_short_circuits() {
        let mut conn = Connection::new(3, ConcurrencyMode::Multiplexed);
        conn.set_response(Response::file_backed(4, 1024, 0));
        conn.downgrade_to_standard();
        assert_eq!(conn.send_file(), Err(SendError::Again));
    }

    #[test]
    fn exhausted_response_sends_nothing() {
        let mut conn = Connection::new(3, ConcurrencyMode::Multiplexed);
        conn.set_response(Response::file_backed(4, 10, 0));
        conn.advance_response(10);
        if BACKEND_AVAILABLE {
            assert_eq!(conn.send_file(), Ok(0));
        } else {
            // The strategy guard answers before the remaining-size check.
            assert_eq!(conn.send_file(), Err(SendError::Again));
        }
    }

    #[test]
    fn offset_past_the_abi_limit_downgrades_without_a_syscall() {
        let mut conn = Connection::new(3, ConcurrencyMode::Multiplexed);
        conn.set_response(Response::file_backed(4, 100, u64::MAX - 10));
        assert_eq!(conn.send_file(), Err(SendError::Again));
        assert_eq!(conn.strategy(), SendStrategy::Standard);
        // The strategy guard answers from here on.
        assert_eq!(conn.send_file(), Err(SendError::Again));
    }

    #[test]
    fn init_runs_more_than_once() {
        init_sendfile_config();
        init_sendfile_config();
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn whole_file_tail_is_delivered() {
        use std::io::Write;
        use std::os::fd::AsRawFd;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abcdefghij").unwrap();
        file.flush().unwrap();

        let mut fds = [0; 2];
        let ret = unsafe {
            libc::socketpair(libc::AF_UNIX, libc::SOCK_STREAM, 0, fds.as_mut_ptr())
        };
        assert_eq!(ret, 0, "socketpair failed");
        let (a, b) = (fds[0], fds[1]);

        let mut conn = Connection::new(a, ConcurrencyMode::Multiplexed);
        conn.set_response(Response::file_backed(file.as_file().as_raw_fd(), 6, 2));
        assert_eq!(conn.send_file(), Ok(6));
        assert!(conn.is_write_ready());
        conn.advance_response(6);
        assert_eq!(conn.send_file(), Ok(0));

        let mut got = [0u8; 6];
        let ret = unsafe {
            libc::recv(b, got.as_mut_ptr().cast::<libc::c_void>(), got.len(), 0)
        };
        assert_eq!(ret, 6);
        assert_eq!(&got, b"cdefgh");
        unsafe {
            libc::close(a);
            libc::close(b);
        }
    }

    proptest! {
        #[test]
        fn clamp_stays_within_remaining_and_chunk(
            remaining in any::<u64>(),
            dedicated in any::<bool>(),
        ) {
            let mode = if dedicated {
                ConcurrencyMode::ThreadPerConnection
            } else {
                ConcurrencyMode::Multiplexed
            };
            let take = clamp_chunk(remaining, mode);
            prop_assert!(take as u64 <= remaining);
            prop_assert!(take <= chunk_for(mode));
            if remaining >= chunk_for(mode) as u64 {
                prop_assert_eq!(take, chunk_for(mode));
            } else {
                prop_assert_eq!(take as u64, remaining);
            }
        }
    }
}
