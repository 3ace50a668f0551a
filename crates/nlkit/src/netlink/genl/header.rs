//! Generic Netlink message header.
//!
//! GENL messages have an additional header after the standard netlink header:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ nlmsghdr (16 bytes)                     │
//! │   nlmsg_len, nlmsg_type (family_id),    │
//! │   nlmsg_flags, nlmsg_seq, nlmsg_pid     │
//! ├─────────────────────────────────────────┤
//! │ genlmsghdr (4 bytes)                    │
//! │   cmd (u8), version (u8), reserved (u16)│
//! ├─────────────────────────────────────────┤
//! │ Attributes (TLV format)                 │
//! └─────────────────────────────────────────┘
//! ```

use std::mem;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::codec::{Attrs, Builder};
use crate::netlink::Netlink;

/// Generic Netlink message header.
///
/// This header immediately follows the standard netlink header in GENL messages.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct GenlMsgHdr {
    /// Command identifier (family-specific)
    pub cmd: u8,
    /// Interface version
    pub version: u8,
    /// Reserved for future use
    pub reserved: u16,
}

/// Size of the GENL header in bytes.
pub const GENL_HDRLEN: usize = mem::size_of::<GenlMsgHdr>();

impl GenlMsgHdr {
    /// Create a new GENL header with the given command and version.
    #[inline]
    pub const fn new(cmd: u8, version: u8) -> Self {
        Self {
            cmd,
            version,
            reserved: 0,
        }
    }
}

/// A parsed generic netlink message: family, sub-header and attributes.
#[derive(Debug, Clone, Copy)]
pub struct GenlMsg<'a> {
    family: u16,
    hdr: GenlMsgHdr,
    attrs: Attrs<'a, Netlink>,
}

impl<'a> GenlMsg<'a> {
    pub(crate) fn new(family: u16, hdr: GenlMsgHdr, attrs: Attrs<'a, Netlink>) -> Self {
        Self { family, hdr, attrs }
    }

    /// Family ID (the netlink message type).
    pub fn family(&self) -> u16 {
        self.family
    }

    /// Family-specific command.
    pub fn cmd(&self) -> u8 {
        self.hdr.cmd
    }

    /// Interface version.
    pub fn version(&self) -> u8 {
        self.hdr.version
    }

    /// Attributes following the GENL header.
    pub fn attrs(&self) -> Attrs<'a, Netlink> {
        self.attrs
    }
}

impl<'buf> Builder<'buf, Netlink> {
    /// Start a generic netlink message for `family`.
    pub fn genl(buf: &'buf mut [u8], family: u16, flags: u16, cmd: u8, version: u8) -> Self {
        Self::netlink_with_header(buf, family, flags, &GenlMsgHdr::new(cmd, version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::{NLM_F_REQUEST, NLMSG_HDRLEN, NlMsg};

    #[test]
    fn test_genl_header_size() {
        assert_eq!(GENL_HDRLEN, 4);
    }

    #[test]
    fn test_genl_header_new() {
        let hdr = GenlMsgHdr::new(1, 2);
        assert_eq!(hdr.cmd, 1);
        assert_eq!(hdr.version, 2);
        assert_eq!(hdr.reserved, 0);
    }

    #[test]
    fn test_genl_header_from_bytes() {
        let data = [0x03, 0x01, 0x00, 0x00]; // cmd=3, version=1
        let (hdr, _) = GenlMsgHdr::read_from_prefix(&data[..]).unwrap();
        assert_eq!(hdr.cmd, 3);
        assert_eq!(hdr.version, 1);
    }

    #[test]
    fn test_genl_header_from_bytes_too_short() {
        let data = [0x03, 0x01, 0x00]; // Only 3 bytes
        assert!(GenlMsgHdr::read_from_prefix(&data[..]).is_err());
    }

    #[test]
    fn test_genl_message_roundtrip() {
        let mut buf = [0u8; 64];
        let mut b = Builder::genl(&mut buf, 0x1c, NLM_F_REQUEST, 5, 2);
        b.put_u32(1, 42);
        let wire = b.finish().unwrap();
        assert_eq!(wire.len(), NLMSG_HDRLEN + GENL_HDRLEN + 8);
        assert_eq!(&wire[16..20], &[5, 2, 0, 0]);

        let msg = NlMsg::parse(wire).unwrap();
        let genl = msg.genl().unwrap();
        assert_eq!(genl.family(), 0x1c);
        assert_eq!(genl.cmd(), 5);
        assert_eq!(genl.version(), 2);
        assert_eq!(genl.attrs().get_u32(1), Some(42));
    }

    #[test]
    fn test_reserved_types_are_not_genl() {
        let mut buf = [0u8; 64];
        let b = Builder::netlink_with_header(&mut buf, 3, 0, &GenlMsgHdr::new(1, 1));
        let wire = b.finish().unwrap();
        assert!(NlMsg::parse(wire).unwrap().genl().is_none());
    }
}
