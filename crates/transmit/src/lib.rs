//! Non-blocking response transmission for an HTTP daemon.
//!
//! Three send paths cover every reply: a single-buffer stream path with a
//! TLS twin, a vectored header-plus-body path, and zero-copy file
//! transmission over the platform `sendfile` primitive. Around them sit
//! the pieces the paths share: per-call socket-option control (cork,
//! `MSG_MORE`, Nagle), errno classification, write-readiness tracking and
//! the sticky choice between buffered and zero-copy strategies.
//!
//! The caller owns the event loop, the descriptors and all retrying.
//! Every call here issues at most one transfer syscall and returns; a
//! [`SendError::Again`] means "re-arm the readiness watch and come back",
//! never "the layer will handle it".

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

pub mod connection;
mod diag;
pub mod error;
pub mod response;
pub mod send;
pub mod sendfile;
mod sockopt;

pub use connection::{ConcurrencyMode, Connection, SendStrategy, TlsSession};
pub use error::SendError;
pub use response::{Response, ResponseBody};
pub use send::{HEADER_PUSH_LIMIT, SendMode};
pub use sendfile::init_sendfile_config;
