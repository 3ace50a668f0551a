//! Control-socket message format.
//!
//! ```text
//! +----------------+----------------+
//! | len (u32)      | cmd (u32)      |   message header
//! +----------------+----------------+
//! | len (u32)      | key (u32)      |   attribute header
//! +----------------+----------------+
//! | payload ... padding to 4 bytes  |
//! +---------------------------------+
//! ```
//!
//! All fields are native endian. `len` in the message header covers the
//! whole message; in an attribute header it covers header plus payload.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::codec::{Attrs, Builder, Format};
use crate::error::{Error, Result};

/// Size of both the message header and an attribute header.
pub const CTL_HDRLEN: usize = 8;

/// Control attribute header.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct CtlAttr {
    /// Length including header.
    pub len: u32,
    /// Attribute key.
    pub key: u32,
}

/// Control message header. Same shape as an attribute, with the command in
/// place of the key.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct CtlHdr {
    /// Total message length.
    pub len: u32,
    /// Command.
    pub cmd: u32,
}

/// Record format of control-socket messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ctl;

impl Format for Ctl {
    type Key = u32;

    const ATTR_HDRLEN: usize = CTL_HDRLEN;
    const MSG_HDRLEN: usize = CTL_HDRLEN;

    fn write_attr_hdr(out: &mut [u8], len: u16, key: u32) {
        let attr = CtlAttr {
            len: u32::from(len),
            key,
        };
        out.copy_from_slice(attr.as_bytes());
    }

    fn read_attr_hdr(data: &[u8]) -> Option<(usize, u32)> {
        let (attr, _) = CtlAttr::read_from_prefix(data).ok()?;
        Some((attr.len as usize, attr.key))
    }

    fn write_msg_len(hdr: &mut [u8], len: u32) {
        hdr[..4].copy_from_slice(&len.to_ne_bytes());
    }

    fn read_msg_len(hdr: &[u8]) -> Option<usize> {
        let (hdr, _) = CtlHdr::read_from_prefix(hdr).ok()?;
        Some(hdr.len as usize)
    }
}

impl<'buf> Builder<'buf, Ctl> {
    /// Start a control message carrying `cmd`.
    pub fn ctl(buf: &'buf mut [u8], cmd: u32) -> Self {
        let mut b = Self::begin(buf, CTL_HDRLEN);
        if let Some(hdr) = b.header_mut() {
            let ch = CtlHdr { len: 0, cmd };
            hdr.copy_from_slice(ch.as_bytes());
        }
        b
    }
}

/// Slice of `buf` that a finished control message occupies.
///
/// Fails on a message that was never finished or whose build overflowed
/// (length 0), on a length shorter than the header, and on a length past
/// the end of `buf`.
pub fn wire(buf: &[u8]) -> Result<&[u8]> {
    let len = Ctl::read_msg_len(buf).ok_or(Error::Truncated {
        expected: CTL_HDRLEN,
        actual: buf.len(),
    })?;
    if len == 0 {
        return Err(Error::InvalidMessage("control message not finalized".into()));
    }
    if len < CTL_HDRLEN {
        return Err(Error::InvalidMessage(format!(
            "invalid control message length: {}",
            len
        )));
    }
    buf.get(..len).ok_or(Error::Truncated {
        expected: len,
        actual: buf.len(),
    })
}

/// A received control message.
#[derive(Debug, Clone, Copy)]
pub struct CtlMsg<'a> {
    cmd: u32,
    body: &'a [u8],
    trailing: usize,
}

impl<'a> CtlMsg<'a> {
    /// Parse a control message from the start of `buf`.
    ///
    /// The declared length is checked against `buf` before any attribute
    /// is looked at.
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        let msg = wire(buf)?;
        let (hdr, _) = CtlHdr::read_from_prefix(msg).map_err(|_| Error::Truncated {
            expected: CTL_HDRLEN,
            actual: msg.len(),
        })?;

        let trailing = buf.len() - msg.len();
        if trailing > 0 {
            tracing::trace!(len = msg.len(), trailing, "bytes after control message");
        }

        Ok(Self {
            cmd: hdr.cmd,
            body: &msg[CTL_HDRLEN..],
            trailing,
        })
    }

    /// Command from the header.
    pub fn cmd(&self) -> u32 {
        self.cmd
    }

    /// Top-level attributes.
    pub fn attrs(&self) -> Attrs<'a, Ctl> {
        Attrs::new(self.body)
    }

    /// Declared total length.
    pub fn len(&self) -> usize {
        CTL_HDRLEN + self.body.len()
    }

    /// Check if the message carries no attributes.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Received bytes beyond the declared length.
    pub fn trailing(&self) -> usize {
        self.trailing
    }
}
