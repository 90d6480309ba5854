//! In-memory transmission: the single-buffer path, its TLS twin and the
//! vectored header-plus-body path.

use std::io;

use crate::connection::Connection;
use crate::error::{ErrnoClass, SendError, SendPrimitive, classify_errno};

/// Byte ceiling for one transfer call. Mirrors the kernel's own cap on
/// `sendfile` counts so a request can never bend into a negative
/// `ssize_t` on any supported target.
pub(crate) const MAX_TRANSFER: usize = 0x7fff_f000;

/// Headers at or under this size wait for body bytes before the stack
/// flushes; larger ones are worth a segment on their own.
pub const HEADER_PUSH_LIMIT: usize = 1024;

/// Flush intent attached to one piece of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    /// Final piece; hand it to the wire immediately.
    PushNow,
    /// More pieces follow shortly; let the stack coalesce.
    PreferBuffered,
    /// Response header. Sized under [`HEADER_PUSH_LIMIT`] it is held for
    /// the body, above it is pushed on its own.
    HeaderCorkHeuristic,
}

const fn push_for(mode: SendMode, len: usize) -> bool {
    match mode {
        SendMode::PushNow => true,
        SendMode::PreferBuffered => false,
        SendMode::HeaderCorkHeuristic => len > HEADER_PUSH_LIMIT,
    }
}

impl Connection {
    /// Sends one piece of a reply over the stream path.
    ///
    /// Accepts at most a platform transfer ceiling per call; the return is
    /// the count the socket (or TLS session) took, which may fall short of
    /// `buf.len()`. The caller advances its own cursor by the return and
    /// comes back for the rest.
    ///
    /// # Errors
    ///
    /// [`SendError::Again`] when nothing was accepted this time,
    /// [`SendError::ConnReset`] when the peer is gone,
    /// [`SendError::NotConn`] for a closed connection or a failed stream.
    pub fn send(&mut self, buf: &[u8], mode: SendMode) -> Result<usize, SendError> {
        self.ensure_open()?;
        // The heuristic sees the full requested length, the wire sees at
        // most the clamp.
        let push_data = push_for(mode, buf.len());
        let chunk = &buf[..buf.len().min(MAX_TRANSFER)];
        let plain = !self.is_tls();

        self.pre_send_setopt(plain, push_data);
        let sent = if plain {
            self.stream_send(chunk, push_data)?
        } else {
            self.tls_write(chunk)?
        };
        self.post_send_setopt(plain, push_data && sent == chunk.len());
        Ok(sent)
    }

    /// Sends a response header and the first piece of its body as one
    /// gathered syscall.
    ///
    /// The pieces are never split across two independent sends: a partial
    /// count is reported honestly, where two syscalls could sink the body
    /// write after claiming the header. The return counts bytes across
    /// both pieces in order, so a value under `header.len()` means the
    /// body was not touched.
    ///
    /// On a TLS connection only the header goes out (through the header
    /// cork heuristic); the caller follows up with [`Connection::send`]
    /// for the body.
    ///
    /// # Errors
    ///
    /// Same sentinels as [`Connection::send`].
    pub fn send_header_and_body(
        &mut self,
        header: &[u8],
        body: &[u8],
    ) -> Result<usize, SendError> {
        self.ensure_open()?;
        if self.is_tls() {
            return self.send(header, SendMode::HeaderCorkHeuristic);
        }

        // The pair is a complete reply, so no corking is wanted.
        self.pre_send_setopt(true, true);
        let total = header.len() + body.len();
        let sent = match rawsock::send_vectored(self.fd(), header, body) {
            Ok(sent) => {
                if sent < total {
                    self.clear_write_ready();
                }
                sent
            }
            Err(e) => return Err(self.stream_error(&e)),
        };
        self.post_send_setopt(true, sent == total);
        Ok(sent)
    }

    /// One `send(2)` on the plain socket. A short count means the socket
    /// buffer filled mid-copy, so readiness is stale.
    fn stream_send(&mut self, chunk: &[u8], push_data: bool) -> Result<usize, SendError> {
        match rawsock::send(self.fd(), chunk, !push_data) {
            Ok(sent) => {
                if sent < chunk.len() {
                    self.clear_write_ready();
                }
                Ok(sent)
            }
            Err(e) => Err(self.stream_error(&e)),
        }
    }

    /// One write through the TLS session. A partial count leaves readiness
    /// alone: the record layer fragments on its own schedule and a short
    /// write says nothing about socket buffer space.
    fn tls_write(&mut self, chunk: &[u8]) -> Result<usize, SendError> {
        match self.tls_send(chunk) {
            Ok(sent) => Ok(sent),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                self.clear_write_ready();
                Err(SendError::Again)
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Err(SendError::Again),
            Err(_) => Err(SendError::NotConn),
        }
    }

    fn stream_error(&mut self, err: &io::Error) -> SendError {
        let errno = err.raw_os_error().unwrap_or(0);
        match classify_errno(SendPrimitive::Stream, errno) {
            ErrnoClass::WouldBlock => {
                self.clear_write_ready();
                SendError::Again
            }
            ErrnoClass::Interrupted => SendError::Again,
            ErrnoClass::ConnReset => SendError::ConnReset,
            ErrnoClass::Unsupported | ErrnoClass::Fatal => SendError::NotConn,
        }
    }
}
