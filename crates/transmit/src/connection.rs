//! Per-connection transmission state.

use std::fmt;
use std::io;
use std::os::fd::RawFd;

use crate::error::SendError;
use crate::response::Response;

/// How the daemon schedules connections. Selects the file-transmission
/// chunk size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyMode {
    /// Many connections share one event-driven thread; small chunks keep
    /// a busy download from starving its siblings.
    Multiplexed,
    /// One worker thread per connection; fairness is structural, so large
    /// chunks cut the syscall count instead.
    ThreadPerConnection,
}

/// Active transfer strategy for file-backed responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStrategy {
    /// Buffered sends through userspace.
    Standard,
    /// Zero-copy file transmission.
    Sendfile,
}

/// Encrypted write seam.
///
/// The transmission layer treats the session as an opaque non-blocking
/// byte sink: [`io::ErrorKind::WouldBlock`] and
/// [`io::ErrorKind::Interrupted`] are retryable, any other error condemns
/// the connection. Implemented by the caller over its TLS library's
/// writer.
pub trait TlsSession {
    /// Writes as much of `buf` as the session will take, returning the
    /// count consumed. The record layer fragments on its own, so a short
    /// count says nothing about socket buffer space.
    fn send(&mut self, buf: &[u8]) -> io::Result<usize>;
}

/// One connection's transmission state.
///
/// The socket, the TLS session and the response all stay owned by the
/// connection layer; this type carries what transmission needs: the raw
/// handles, the cached socket-option states, the sticky strategy tag, the
/// write-readiness hint and the response progress cursor.
///
/// Not synchronized. The caller must guarantee that at most one thread
/// drives a given connection at a time, whether that is a dedicated
/// worker or the one multiplexer thread servicing every socket.
pub struct Connection {
    fd: RawFd,
    tls: Option<Box<dyn TlsSession>>,
    mode: ConcurrencyMode,
    strategy: SendStrategy,
    pub(crate) corked: bool,
    pub(crate) nodelay: bool,
    write_ready: bool,
    closed: bool,
    response: Option<Response>,
    write_position: u64,
}

impl Connection {
    /// Plaintext connection over `fd`, which must already be in
    /// non-blocking mode. Starts on the zero-copy strategy where the
    /// target compiles a backend for it.
    #[must_use]
    pub fn new(fd: RawFd, mode: ConcurrencyMode) -> Self {
        Self {
            fd,
            tls: None,
            mode,
            strategy: if crate::sendfile::BACKEND_AVAILABLE {
                SendStrategy::Sendfile
            } else {
                SendStrategy::Standard
            },
            corked: false,
            nodelay: false,
            write_ready: true,
            closed: false,
            response: None,
            write_position: 0,
        }
    }

    /// TLS connection over `fd`. Zero-copy cannot feed the record layer,
    /// so the strategy starts and stays on [`SendStrategy::Standard`].
    #[must_use]
    pub fn new_tls(fd: RawFd, mode: ConcurrencyMode, session: Box<dyn TlsSession>) -> Self {
        let mut conn = Self::new(fd, mode);
        conn.tls = Some(session);
        conn.strategy = SendStrategy::Standard;
        conn
    }

    /// The raw socket handle.
    #[must_use]
    pub const fn fd(&self) -> RawFd {
        self.fd
    }

    /// The daemon's scheduling mode for this connection.
    #[must_use]
    pub const fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    /// The active transfer strategy. Once this reads
    /// [`SendStrategy::Standard`] it never changes back.
    #[must_use]
    pub const fn strategy(&self) -> SendStrategy {
        self.strategy
    }

    /// Whether this connection carries a TLS session.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Whether the socket is still expected to accept bytes without
    /// blocking. Cleared by would-block results and partial plaintext
    /// writes; set again by [`Connection::mark_write_ready`].
    #[must_use]
    pub const fn is_write_ready(&self) -> bool {
        self.write_ready
    }

    /// Records a write-readiness event observed by the caller's
    /// multiplexer.
    pub fn mark_write_ready(&mut self) {
        self.write_ready = true;
    }

    /// Marks the connection closed; every later send attempt returns
    /// [`SendError::NotConn`] without touching the socket.
    pub fn mark_closed(&mut self) {
        self.closed = true;
    }

    /// Attaches the response about to be transmitted and resets the
    /// progress cursor.
    pub fn set_response(&mut self, response: Response) {
        self.response = Some(response);
        self.write_position = 0;
    }

    /// Detaches the current response once the caller is done with it.
    pub fn clear_response(&mut self) {
        self.response = None;
        self.write_position = 0;
    }

    /// The response currently attached, if any.
    #[must_use]
    pub const fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Bytes of the current response the caller has accounted as sent.
    #[must_use]
    pub const fn write_position(&self) -> u64 {
        self.write_position
    }

    /// Advances the progress cursor. The caller owns accounting: it calls
    /// this with each successful return value once the bytes are spoken
    /// for.
    pub fn advance_response(&mut self, bytes: u64) {
        self.write_position = self.write_position.saturating_add(bytes);
        debug_assert!(
            self.response
                .is_none_or(|r| self.write_position <= r.total_size()),
            "progress cursor ran past the response size"
        );
    }

    pub(crate) const fn ensure_open(&self) -> Result<(), SendError> {
        if self.closed || self.fd < 0 {
            return Err(SendError::NotConn);
        }
        Ok(())
    }

    pub(crate) fn clear_write_ready(&mut self) {
        self.write_ready = false;
    }

    /// One-way switch to buffered sends. There is deliberately no inverse.
    pub(crate) fn downgrade_to_standard(&mut self) {
        self.strategy = SendStrategy::Standard;
    }

    /// Writes through the TLS session. Callers check [`Connection::is_tls`]
    /// first; a missing session reports the connection unusable rather
    /// than panicking.
    pub(crate) fn tls_send(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.tls.as_deref_mut() {
            Some(session) => session.send(buf),
            None => Err(io::ErrorKind::NotConnected.into()),
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("fd", &self.fd)
            .field("tls", &self.tls.is_some())
            .field("mode", &self.mode)
            .field("strategy", &self.strategy)
            .field("corked", &self.corked)
            .field("nodelay", &self.nodelay)
            .field("write_ready", &self.write_ready)
            .field("closed", &self.closed)
            .field("write_position", &self.write_position)
            .finish_non_exhaustive()
    }
}
