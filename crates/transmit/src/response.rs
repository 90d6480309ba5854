//! Response descriptors as the transmission layer sees them.

use std::os::fd::RawFd;

/// What backs a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseBody {
    /// Body bytes arrive through the in-memory send calls; the descriptor
    /// carries no payload of its own.
    Buffered,
    /// Body is streamed straight from an open file descriptor.
    File {
        /// The already-open source file. Stays owned by the response
        /// layer.
        fd: RawFd,
        /// Offset of the response's first byte within the file.
        offset: u64,
    },
}

/// The response currently being transmitted on a connection.
///
/// Owned by the response layer. Transmission reads the backing kind, the
/// total size and, for file-backed bodies, where in the file the body
/// starts; progress through the body lives on the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    total_size: u64,
    body: ResponseBody,
}

impl Response {
    /// Response whose body is pushed through the in-memory send calls.
    #[must_use]
    pub const fn buffered(total_size: u64) -> Self {
        Self {
            total_size,
            body: ResponseBody::Buffered,
        }
    }

    /// Response streamed from `fd`, starting `offset` bytes into the
    /// file.
    #[must_use]
    pub const fn file_backed(fd: RawFd, total_size: u64, offset: u64) -> Self {
        Self {
            total_size,
            body: ResponseBody::File { fd, offset },
        }
    }

    /// Total body size in bytes.
    #[must_use]
    pub const fn total_size(&self) -> u64 {
        self.total_size
    }

    /// The backing kind.
    #[must_use]
    pub const fn body(&self) -> ResponseBody {
        self.body
    }

    /// Whether the body is streamed from a file descriptor.
    #[must_use]
    pub const fn is_file_backed(&self) -> bool {
        matches!(self.body, ResponseBody::File { .. })
    }
}
