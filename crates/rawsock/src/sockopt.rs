//! Socket-option toggles behind the transmission buffering hooks.

use std::io;
use std::os::fd::RawFd;

fn set_bool_opt(fd: RawFd, option: libc::c_int, on: bool) -> io::Result<()> {
    let value: libc::c_int = i32::from(on);
    let ret = unsafe {
        libc::setsockopt(
            fd,
            libc::IPPROTO_TCP,
            option,
            (&raw const value).cast::<libc::c_void>(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Toggles the cork option: `TCP_CORK` on the Linux family. While corked,
/// the kernel holds partial segments until the option is cleared or a full
/// segment accumulates.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn set_cork(fd: RawFd, on: bool) -> io::Result<()> {
    set_bool_opt(fd, libc::TCP_CORK, on)
}

/// Toggles the cork option: `TCP_NOPUSH` on the BSD families.
#[cfg(any(
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "macos",
    target_os = "ios",
))]
pub fn set_cork(fd: RawFd, on: bool) -> io::Result<()> {
    set_bool_opt(fd, libc::TCP_NOPUSH, on)
}

/// Toggles `TCP_NODELAY`. `on == true` disables Nagle's algorithm so
/// writes go out immediately.
pub fn set_nodelay(fd: RawFd, on: bool) -> io::Result<()> {
    set_bool_opt(fd, libc::TCP_NODELAY, on)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::os::fd::AsRawFd;

    fn tcp_socket() -> (std::net::TcpStream, std::net::TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = std::net::TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    fn get_bool_opt(fd: RawFd, option: libc::c_int) -> bool {
        let mut value: libc::c_int = 0;
        let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
        let ret = unsafe {
            libc::getsockopt(
                fd,
                libc::IPPROTO_TCP,
                option,
                (&raw mut value).cast::<libc::c_void>(),
                &raw mut len,
            )
        };
        assert_eq!(ret, 0, "getsockopt failed: {}", io::Error::last_os_error());
        value != 0
    }

    #[test]
    fn test_nodelay_toggle_visible_via_getsockopt() {
        let (client, _server) = tcp_socket();
        let fd = client.as_raw_fd();
        set_nodelay(fd, true).unwrap();
        assert!(get_bool_opt(fd, libc::TCP_NODELAY));
        set_nodelay(fd, false).unwrap();
        assert!(!get_bool_opt(fd, libc::TCP_NODELAY));
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn test_cork_toggle_visible_via_getsockopt() {
        let (client, _server) = tcp_socket();
        let fd = client.as_raw_fd();
        set_cork(fd, true).unwrap();
        assert!(get_bool_opt(fd, libc::TCP_CORK));
        set_cork(fd, false).unwrap();
        assert!(!get_bool_opt(fd, libc::TCP_CORK));
    }

    #[test]
    fn test_sockopt_on_non_socket_fails() {
        let file = tempfile::tempfile().unwrap();
        let err = set_nodelay(file.as_raw_fd(), true).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOTSOCK));
    }
}
