//! Result sentinels and the errno translator shared by every send path.

use thiserror::Error;

/// Outcome sentinels surfaced to the connection layer.
///
/// Every transmission entry point returns either a byte count or exactly
/// one of these. [`SendError::Again`] covers both genuine would-block
/// conditions and internal strategy downgrades; the caller re-arms its
/// readiness watch and retries either way, and only the next call's
/// behavior differs.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// Nothing was accepted this time; retry after the next readiness
    /// event.
    #[error("socket not ready, retry after the next readiness event")]
    Again,
    /// The peer reset or closed the connection; begin teardown.
    #[error("connection reset by peer")]
    ConnReset,
    /// The socket is invalid or the connection was already closed.
    #[error("socket not connected")]
    NotConn,
    /// Unusable descriptor or an unclassified failure; abort the
    /// connection hard.
    #[error("bad descriptor")]
    Badf,
}

/// Which syscall produced the error being classified. The sendfile
/// families disagree about which conditions are transient, which mean
/// "this descriptor cannot be spliced" and which are fatal, so the
/// translator needs the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(test), allow(dead_code))] // The other families' tags are constructed only in tests.
pub(crate) enum SendPrimitive {
    /// `send(2)` / `sendmsg(2)` on a plain socket.
    Stream,
    /// Linux-family `sendfile64(2)`.
    SendfileLinux,
    /// Solaris-family `sendfile(3EXT)`.
    SendfileSolaris,
    /// FreeBSD-family `sendfile(2)`.
    SendfileFreebsd,
    /// Darwin `sendfile(2)`.
    SendfileDarwin,
}

/// Normalized failure classes produced by [`classify_errno`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrnoClass {
    /// Socket buffers are full. Retry after the next readiness event;
    /// the cached readiness flag is now stale.
    WouldBlock,
    /// Interrupted, or a platform busy condition. Immediate retry is
    /// allowed and readiness is still trustworthy.
    Interrupted,
    /// The fast path cannot serve this descriptor; switch to buffered
    /// sends for the rest of the connection.
    Unsupported,
    /// The peer reset or closed the connection.
    ConnReset,
    /// Bad descriptor, or a condition no table recognizes.
    Fatal,
}

/// Translates a raw errno from `primitive` into its failure class.
///
/// The would-block arms accept both `EAGAIN` and `EWOULDBLOCK`
/// spellings; they alias on the supported targets but the C headers do
/// not promise it.
pub(crate) fn classify_errno(primitive: SendPrimitive, errno: i32) -> ErrnoClass {
    match primitive {
        SendPrimitive::Stream => match errno {
            e if e == libc::EAGAIN || e == libc::EWOULDBLOCK => ErrnoClass::WouldBlock,
            libc::EINTR => ErrnoClass::Interrupted,
            libc::ECONNRESET => ErrnoClass::ConnReset,
            _ => ErrnoClass::Fatal,
        },
        // Linux sendfile reports assorted errors for descriptor types it
        // cannot splice, so everything except a bad descriptor downgrades
        // to the buffered path.
        SendPrimitive::SendfileLinux => match errno {
            e if e == libc::EAGAIN || e == libc::EWOULDBLOCK => ErrnoClass::WouldBlock,
            libc::EINTR => ErrnoClass::Interrupted,
            libc::EBADF => ErrnoClass::Fatal,
            _ => ErrnoClass::Unsupported,
        },
        SendPrimitive::SendfileSolaris => match errno {
            e if e == libc::EAGAIN || e == libc::EWOULDBLOCK => ErrnoClass::WouldBlock,
            libc::EINTR => ErrnoClass::Interrupted,
            libc::EAFNOSUPPORT | libc::EINVAL | libc::EOPNOTSUPP => ErrnoClass::Unsupported,
            libc::ENOTCONN | libc::EPIPE | libc::ECONNRESET => ErrnoClass::ConnReset,
            _ => ErrnoClass::Fatal,
        },
        SendPrimitive::SendfileFreebsd => match errno {
            e if e == libc::EAGAIN || e == libc::EWOULDBLOCK => ErrnoClass::WouldBlock,
            // EBUSY: a page wanted under SF_NODISKIO is busy; the socket
            // itself may still be writable.
            libc::EINTR | libc::EBUSY => ErrnoClass::Interrupted,
            libc::EINVAL | libc::EOPNOTSUPP => ErrnoClass::Unsupported,
            libc::ENOTCONN | libc::EPIPE | libc::ECONNRESET => ErrnoClass::ConnReset,
            _ => ErrnoClass::Fatal,
        },
        SendPrimitive::SendfileDarwin => match errno {
            e if e == libc::EAGAIN || e == libc::EWOULDBLOCK => ErrnoClass::WouldBlock,
            libc::EINTR => ErrnoClass::Interrupted,
            e if e == libc::ENOTSUP || e == libc::EOPNOTSUPP => ErrnoClass::Unsupported,
            libc::ENOTCONN | libc::EPIPE | libc::ECONNRESET => ErrnoClass::ConnReset,
            _ => ErrnoClass::Fatal,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_transients_retry() {
        assert_eq!(
            classify_errno(SendPrimitive::Stream, libc::EAGAIN),
            ErrnoClass::WouldBlock
        );
        assert_eq!(
            classify_errno(SendPrimitive::Stream, libc::EINTR),
            ErrnoClass::Interrupted
        );
    }

    #[test]
    fn stream_reset_maps_to_conn_reset() {
        assert_eq!(
            classify_errno(SendPrimitive::Stream, libc::ECONNRESET),
            ErrnoClass::ConnReset
        );
    }

    #[test]
    fn stream_unknown_errors_are_fatal() {
        assert_eq!(
            classify_errno(SendPrimitive::Stream, libc::EPIPE),
            ErrnoClass::Fatal
        );
        assert_eq!(
            classify_errno(SendPrimitive::Stream, libc::ENOMEM),
            ErrnoClass::Fatal
        );
    }

    #[test]
    fn would_block_spellings_agree_everywhere() {
        for primitive in [
            SendPrimitive::Stream,
            SendPrimitive::SendfileLinux,
            SendPrimitive::SendfileSolaris,
            SendPrimitive::SendfileFreebsd,
            SendPrimitive::SendfileDarwin,
        ] {
            assert_eq!(
                classify_errno(primitive, libc::EAGAIN),
                classify_errno(primitive, libc::EWOULDBLOCK),
            );
            assert_eq!(classify_errno(primitive, libc::EAGAIN), ErrnoClass::WouldBlock);
        }
    }

    #[test]
    fn linux_sendfile_downgrades_unusual_errors() {
        for errno in [libc::EINVAL, libc::EOPNOTSUPP, libc::ENOSYS, libc::EIO] {
            assert_eq!(
                classify_errno(SendPrimitive::SendfileLinux, errno),
                ErrnoClass::Unsupported
            );
        }
        assert_eq!(
            classify_errno(SendPrimitive::SendfileLinux, libc::EBADF),
            ErrnoClass::Fatal
        );
    }

    #[test]
    fn solaris_sendfile_splits_unsupported_from_fatal() {
        for errno in [libc::EAFNOSUPPORT, libc::EINVAL, libc::EOPNOTSUPP] {
            assert_eq!(
                classify_errno(SendPrimitive::SendfileSolaris, errno),
                ErrnoClass::Unsupported
            );
        }
        for errno in [libc::ENOTCONN, libc::EPIPE, libc::ECONNRESET] {
            assert_eq!(
                classify_errno(SendPrimitive::SendfileSolaris, errno),
                ErrnoClass::ConnReset
            );
        }
        assert_eq!(
            classify_errno(SendPrimitive::SendfileSolaris, libc::EBADF),
            ErrnoClass::Fatal
        );
    }

    #[test]
    fn freebsd_busy_retries_without_downgrade() {
        assert_eq!(
            classify_errno(SendPrimitive::SendfileFreebsd, libc::EBUSY),
            ErrnoClass::Interrupted
        );
    }

    #[test]
    fn freebsd_peer_gone_maps_to_reset() {
        for errno in [libc::ENOTCONN, libc::EPIPE, libc::ECONNRESET] {
            assert_eq!(
                classify_errno(SendPrimitive::SendfileFreebsd, errno),
                ErrnoClass::ConnReset
            );
        }
    }

    #[test]
    fn darwin_unsupported_descriptor_downgrades() {
        assert_eq!(
            classify_errno(SendPrimitive::SendfileDarwin, libc::ENOTSUP),
            ErrnoClass::Unsupported
        );
        assert_eq!(
            classify_errno(SendPrimitive::SendfileDarwin, libc::EINVAL),
            ErrnoClass::Fatal
        );
    }

    #[test]
    fn sentinel_display_is_stable() {
        assert_eq!(SendError::ConnReset.to_string(), "connection reset by peer");
        assert_eq!(SendError::Badf.to_string(), "bad descriptor");
    }
}
