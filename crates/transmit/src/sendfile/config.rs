//! Chunk sizing and the process-wide read-ahead configuration.

/// Per-call transfer ceiling under the multiplexed scheduler. 128 KiB
/// keeps one fast connection from monopolizing the shared sender thread.
pub(crate) const CHUNK_MULTIPLEXED: usize = 0x20000;

/// Per-call transfer ceiling with a dedicated worker per connection,
/// where larger chunks only cut the syscall count.
pub(crate) const CHUNK_THREAD_PER_CONNECTION: usize = 0x200000;

/// Read-ahead page counts for the FreeBSD primitive's flag bits, derived
/// once from the system page size.
#[cfg(any(test, target_os = "freebsd"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SendfileConfig {
    pub(crate) readahead_multiplexed: u16,
    pub(crate) readahead_thread_per_connection: u16,
}

#[cfg(any(test, target_os = "freebsd"))]
impl SendfileConfig {
    /// No read-ahead sizing; the fallback when the page size is unknown.
    pub(crate) const DISABLED: Self = Self {
        readahead_multiplexed: 0,
        readahead_thread_per_connection: 0,
    };

    pub(crate) fn from_page_size(page_size: Option<usize>) -> Self {
        match page_size {
            Some(page) if page > 0 => Self {
                readahead_multiplexed: pages_covering(CHUNK_MULTIPLEXED, page),
                readahead_thread_per_connection: pages_covering(
                    CHUNK_THREAD_PER_CONNECTION,
                    page,
                ),
            },
            _ => Self::DISABLED,
        }
    }
}

/// Pages covering `bytes`, rounded up and saturated to the width of the
/// flag field.
#[cfg(any(test, target_os = "freebsd"))]
fn pages_covering(bytes: usize, page: usize) -> u16 {
    u16::try_from(bytes.div_ceil(page)).unwrap_or(u16::MAX)
}

#[cfg(target_os = "freebsd")]
static CONFIG: std::sync::OnceLock<SendfileConfig> = std::sync::OnceLock::new();

/// The process-wide configuration, computed on first use.
#[cfg(target_os = "freebsd")]
pub(crate) fn global() -> SendfileConfig {
    *CONFIG.get_or_init(|| SendfileConfig::from_page_size(rawsock::page_size()))
}
