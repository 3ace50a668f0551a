//! Error types for codec and transport operations.

use std::io;

/// Result type for nlkit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, parsing or moving messages.
///
/// Attribute-level problems (a missing key, a payload of the wrong size, an
/// unterminated string) are never errors: typed accessors return `None` for
/// them. Errors are reserved for whole-message conditions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Kernel returned an error code in an error frame.
    #[error("kernel error: {message} (errno {errno})")]
    Kernel {
        /// The errno value from the kernel.
        errno: i32,
        /// Human-readable error message.
        message: String,
    },

    /// Message was truncated.
    #[error("message truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Expected message length.
        expected: usize,
        /// Actual bytes available.
        actual: usize,
    },

    /// Invalid message format.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The builder ran out of room (or hit the 16-bit attribute limit)
    /// at some point and the message was discarded.
    #[error("message does not fit in a {capacity}-byte buffer")]
    Overflow {
        /// Capacity of the buffer the message was built in.
        capacity: usize,
    },

    /// The transport accepted fewer bytes than the datagram holds.
    #[error("short send: {sent} of {expected} bytes")]
    ShortSend {
        /// Bytes actually sent.
        sent: usize,
        /// Length of the datagram.
        expected: usize,
    },

    /// Ancillary data did not fit in the receive control buffer.
    #[error("ancillary data truncated")]
    ControlTruncated,

    /// Generic netlink family not registered with the kernel.
    #[error("generic netlink family not found: {name}")]
    FamilyNotFound {
        /// The family name that was not found.
        name: String,
    },
}

impl Error {
    /// Create a kernel error from a (negative) errno value.
    pub fn from_errno(errno: i32) -> Self {
        let errno = errno.saturating_abs();
        let message = io::Error::from_raw_os_error(errno).to_string();
        Self::Kernel { errno, message }
    }

    /// Get the errno value if this is a kernel or OS error.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Kernel { errno, .. } => Some(*errno),
            Self::Io(e) => e.raw_os_error(),
            _ => None,
        }
    }

    /// Check if this is a "not found" error (ENOENT, ENODEV, unknown family).
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::FamilyNotFound { .. } => true,
            _ => matches!(self.errno(), Some(libc::ENOENT | libc::ENODEV)),
        }
    }

    /// Check if this is a permission error (EPERM, EACCES).
    pub fn is_permission_denied(&self) -> bool {
        matches!(self.errno(), Some(libc::EPERM | libc::EACCES))
    }

    /// Check if the error came from malformed wire data rather than the
    /// transport or the kernel.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Truncated { .. } | Self::InvalidMessage(_))
    }
}
