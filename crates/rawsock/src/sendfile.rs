//! Platform `sendfile` entry points.
//!
//! Each family keeps its kernel's calling convention. Reconciling the
//! in/out parameters with the error code (partial progress handling,
//! fallback policy) is the caller's job; these wrappers only make the
//! syscall and report what the kernel said.

use std::io;
use std::os::fd::RawFd;

/// Largest file offset the compiled-in sendfile ABI can address. Offsets
/// past this must be refused before the syscall.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub const MAX_OFFSET: u64 = libc::off64_t::MAX as u64;

/// Largest file offset the compiled-in sendfile ABI can address. Offsets
/// past this must be refused before the syscall.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub const MAX_OFFSET: u64 = libc::off_t::MAX as u64;

/// Linux-family `sendfile64(2)`: moves up to `count` bytes from `file` at
/// `*offset` into `sock`, advancing `*offset` past the bytes consumed.
/// The file cursor is untouched.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn send_file(
    sock: RawFd,
    file: RawFd,
    offset: &mut libc::off64_t,
    count: usize,
) -> io::Result<usize> {
    let ret = unsafe { libc::sendfile64(sock, file, offset, count) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(ret as usize)
}

/// Solaris-family `sendfile(3EXT)`: same in/out offset convention as the
/// Linux family, except the kernel advances `*offset` even when the call
/// fails. Partial progress is the offset delta, which the caller must
/// consult before the error code.
#[cfg(any(target_os = "solaris", target_os = "illumos"))]
pub fn send_file(
    sock: RawFd,
    file: RawFd,
    offset: &mut libc::off_t,
    count: usize,
) -> io::Result<usize> {
    let ret = unsafe { libc::sendfile(sock, file, offset, count) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(ret as usize)
}

/// FreeBSD-family `sendfile(2)`: zero return on complete success, `-1`
/// with `errno` otherwise. Bytes moved are reported through the returned
/// count in either case, so the caller must consult it before the error.
/// `flags` carries the read-ahead sizing and `SF_NODISKIO`.
#[cfg(any(target_os = "freebsd", target_os = "dragonfly"))]
pub fn send_file(
    file: RawFd,
    sock: RawFd,
    offset: libc::off_t,
    count: usize,
    flags: libc::c_int,
) -> (io::Result<()>, libc::off_t) {
    let mut sbytes: libc::off_t = 0;
    let ret = unsafe {
        libc::sendfile(
            file,
            sock,
            offset,
            count,
            std::ptr::null_mut(),
            &raw mut sbytes,
            flags,
        )
    };
    let res = if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    };
    (res, sbytes)
}

/// Darwin `sendfile(2)`: the length is in/out. On entry it is the
/// requested count; on return, the bytes actually written, valid even
/// when the call fails.
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub fn send_file(
    file: RawFd,
    sock: RawFd,
    offset: libc::off_t,
    count: usize,
) -> (io::Result<()>, libc::off_t) {
    let mut len = count as libc::off_t;
    let ret = unsafe {
        libc::sendfile(file, sock, offset, &raw mut len, std::ptr::null_mut(), 0)
    };
    let res = if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    };
    (res, len)
}

/// System page size from `sysconf(3)`, or `None` when the kernel will not
/// say.
pub fn page_size() -> Option<usize> {
    let ret = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if ret > 0 { Some(ret as usize) } else { None }
}
