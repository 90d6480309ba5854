//! Raw socket and file-transmission syscalls.
//!
//! Everything `unsafe` in the transmission layer lives here: thin wrappers
//! around `send(2)`, `sendmsg(2)`, `setsockopt(2)` and the per-platform
//! `sendfile` variants. Each wrapper exposes its syscall's calling
//! convention as-is (offsets and byte counts stay in the positions the
//! kernel uses); chunking, fallback and error classification policy live in
//! the `transmit` crate.
//!
//! Unix-only. The sendfile wrappers compile exactly one platform family per
//! build:
//!
//! 1. Linux family (`linux`, `android`) - `sendfile64` with an in/out offset
//! 2. Solaris family (`solaris`, `illumos`) - in/out offset, advanced even
//!    on failure
//! 3. FreeBSD family (`freebsd`, `dragonfly`) - byte count through a
//!    separate out-parameter
//! 4. Darwin family (`macos`, `ios`) - length as an in/out pointer

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

pub mod send;
pub mod sendfile;
pub mod sockopt;

pub use send::{MSG_MORE_SUPPORTED, send, send_vectored};
pub use sendfile::{MAX_OFFSET, page_size};
pub use sockopt::set_nodelay;

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "macos",
    target_os = "ios",
))]
pub use sockopt::set_cork;
