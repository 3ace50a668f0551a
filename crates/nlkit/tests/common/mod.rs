//! Common test utilities for socket tests.
//!
//! Provides unique socket paths with automatic cleanup, the reference
//! control message, and a macro to skip tests when netlink is unavailable.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use nlkit::{Builder, Result};

/// Global counter for unique socket names.
#[allow(dead_code)]
static SOCKET_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Command carried by the reference control message.
#[allow(dead_code)]
pub const SCENARIO_CMD: u32 = 0x53550012;

/// Generate a unique socket file name for this test.
#[allow(dead_code)]
fn unique_socket_name(prefix: &str) -> String {
    let id = SOCKET_COUNTER.fetch_add(1, Ordering::SeqCst);
    let pid = std::process::id();
    format!("nlkit-test-{}-{}-{}.sock", prefix, pid, id)
}

/// A socket path in the temp directory, removed on drop.
#[allow(dead_code)]
pub struct TestSocketPath {
    path: PathBuf,
}

#[allow(dead_code)]
impl TestSocketPath {
    /// Reserve a unique path. Nothing is created until a socket binds it.
    pub fn new(prefix: &str) -> Self {
        Self {
            path: std::env::temp_dir().join(unique_socket_name(prefix)),
        }
    }

    /// The reserved path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TestSocketPath {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Build the reference control message: `3 -> 12345` and
/// `6 { 8 -> "nest 1" }`.
#[allow(dead_code)]
pub fn scenario(buf: &mut [u8]) -> Result<&[u8]> {
    let mut b = Builder::ctl(buf, SCENARIO_CMD);
    b.put_i32(3, 12345);
    let nest = b.begin_nest(6);
    b.put_str(8, "nest 1");
    b.end_nest(nest);
    b.finish()
}

/// Open a netlink socket or skip the test if the kernel refuses.
#[macro_export]
macro_rules! netlink_or_skip {
    ($protocol:expr) => {
        match nlkit::NetlinkSocket::new($protocol) {
            Ok(sock) => sock,
            Err(e) => {
                eprintln!("Skipping test: no netlink socket: {}", e);
                return Ok(());
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_socket_name() {
        let name1 = unique_socket_name("test");
        let name2 = unique_socket_name("test");
        assert_ne!(name1, name2);
        assert!(name1.starts_with("nlkit-test-test-"));
    }
}
