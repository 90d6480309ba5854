//! Socket-option hooks bracketing every transfer.
//!
//! The controller decides between corked (buffered) and immediate-flush
//! behavior, memoized per connection so unchanged intent costs zero
//! syscalls. The Linux family can say "more data follows" on the send
//! call itself, which makes the plaintext pre-hook free; platforms
//! without a cork option toggle Nagle's algorithm instead. Failures are
//! logged and ignored: buffering hints are never worth a failed reply.

use std::io;

use crate::connection::Connection;
use crate::diag;

/// Pre-transfer cork decision; `Some(state)` means one setsockopt call.
///
/// Memoized against the cached state. A requested push with the cork
/// still set also stays quiet here: the release happens in the post-hook,
/// after the data is down.
#[cfg(any(
    test,
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "macos",
    target_os = "ios",
))]
fn pre_cork_action(corked: bool, push_data: bool) -> Option<bool> {
    let buffer_data = !push_data;
    if corked == buffer_data {
        return None;
    }
    if push_data {
        return None;
    }
    Some(true)
}

/// Post-transfer cork decision: release only when the final piece went
/// out while the socket was corked.
#[cfg(any(
    test,
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "macos",
    target_os = "ios",
))]
fn post_cork_action(corked: bool, push_data: bool) -> Option<bool> {
    let buffer_data = !push_data;
    if corked == buffer_data {
        return None;
    }
    if buffer_data {
        return None;
    }
    Some(false)
}

/// Nagle fallback for platforms without a cork option: nodelay tracks the
/// push intent directly. Pre-hook only; once the final piece's pre-hook
/// enabled immediate flush there is nothing left to do afterwards.
#[cfg(any(
    test,
    not(any(
        target_os = "linux",
        target_os = "android",
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "macos",
        target_os = "ios",
    ))
))]
fn nodelay_action(nodelay: bool, push_data: bool) -> Option<bool> {
    if nodelay == push_data {
        return None;
    }
    Some(push_data)
}

fn describe_sockopt_errno(errno: i32) -> &'static str {
    match errno {
        libc::ENOTSOCK => "not a socket",
        libc::EBADF => "bad descriptor",
        libc::EINVAL => "invalid option length",
        libc::EFAULT => "option value outside address space",
        libc::ENOPROTOOPT => "option unknown at this level",
        _ => "unexpected error",
    }
}

fn log_ignored(option: &'static str, err: &io::Error) {
    let errno = err.raw_os_error().unwrap_or(0);
    diag::sockopt_failure(option, describe_sockopt_errno(errno), errno);
}

impl Connection {
    /// Requests buffered or immediate-flush behavior before a transfer.
    ///
    /// `plain_send` is true when the transfer goes through the plaintext
    /// single-buffer or vectored path. Never fails; option errors are
    /// logged and the cached state stays untouched.
    pub(crate) fn pre_send_setopt(&mut self, plain_send: bool, push_data: bool) {
        if rawsock::MSG_MORE_SUPPORTED && plain_send {
            // The hint rides on the send call itself.
            return;
        }
        self.apply_pre(push_data);
    }

    /// Re-enables immediate flush after a transfer when the reply's final
    /// piece went out in full.
    pub(crate) fn post_send_setopt(&mut self, plain_send: bool, final_piece_sent: bool) {
        if rawsock::MSG_MORE_SUPPORTED && plain_send {
            return;
        }
        self.apply_post(final_piece_sent);
    }

    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "macos",
        target_os = "ios",
    ))]
    fn apply_pre(&mut self, push_data: bool) {
        if let Some(on) = pre_cork_action(self.corked, push_data) {
            match rawsock::set_cork(self.fd(), on) {
                Ok(()) => self.corked = on,
                Err(e) => log_ignored("cork", &e),
            }
        }
    }

    #[cfg(not(any(
        target_os = "linux",
        target_os = "android",
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "macos",
        target_os = "ios",
    )))]
    fn apply_pre(&mut self, push_data: bool) {
        if let Some(on) = nodelay_action(self.nodelay, push_data) {
            match rawsock::set_nodelay(self.fd(), on) {
                Ok(()) => self.nodelay = on,
                Err(e) => log_ignored("nodelay", &e),
            }
        }
    }

    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "macos",
        target_os = "ios",
    ))]
    fn apply_post(&mut self, final_piece_sent: bool) {
        if let Some(on) = post_cork_action(self.corked, final_piece_sent) {
            match rawsock::set_cork(self.fd(), on) {
                Ok(()) => self.corked = on,
                Err(e) => log_ignored("cork", &e),
            }
        }
    }

    #[cfg(not(any(
        target_os = "linux",
        target_os = "android",
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "macos",
        target_os = "ios",
    )))]
    fn apply_post(&mut self, _final_piece_sent: bool) {}
}
