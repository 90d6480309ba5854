//! Diagnostic events behind the `tracing` feature.
//!
//! The send paths stay silent on success. Only two things are worth a
//! line: a socket-option failure that policy ignores, and a sticky
//! strategy downgrade. With the feature off these helpers compile to
//! nothing.

use std::os::fd::RawFd;

/// Records a socket-option failure that was ignored by policy.
#[cfg(feature = "tracing")]
pub(crate) fn sockopt_failure(option: &'static str, cause: &'static str, errno: i32) {
    tracing::debug!(
        target: "transmit::sockopt",
        option,
        cause,
        errno,
        "socket option not applied"
    );
}

/// No-op twin of the `tracing` build.
#[cfg(not(feature = "tracing"))]
pub(crate) fn sockopt_failure(_option: &'static str, _cause: &'static str, _errno: i32) {}

/// Records a permanent fall-back from zero-copy to buffered sends.
#[cfg(feature = "tracing")]
pub(crate) fn strategy_downgrade(fd: RawFd, errno: Option<i32>) {
    tracing::debug!(
        target: "transmit::sendfile",
        fd,
        errno,
        "zero-copy unusable for this response, switching to buffered sends"
    );
}

/// No-op twin of the `tracing` build.
#[cfg(not(feature = "tracing"))]
pub(crate) fn strategy_downgrade(_fd: RawFd, _errno: Option<i32>) {}
