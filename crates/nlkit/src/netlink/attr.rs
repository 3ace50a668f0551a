//! Netlink attribute (rtattr/nlattr) format.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::message::NLMSG_HDRLEN;
use crate::codec::Format;

/// Netlink attribute alignment.
pub const NLA_ALIGNTO: usize = crate::codec::ALIGNTO;

/// Size of the attribute header.
pub const NLA_HDRLEN: usize = 4; // nla_align(size_of::<NlAttr>())

/// Netlink attribute header (mirrors struct nlattr / struct rtattr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlAttr {
    /// Length including header.
    pub nla_len: u16,
    /// Attribute type.
    pub nla_type: u16,
}

/// Attribute type flags.
pub const NLA_F_NESTED: u16 = 1 << 15;
pub const NLA_F_NET_BYTEORDER: u16 = 1 << 14;
pub const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

impl NlAttr {
    /// Get the attribute type without flags.
    pub fn kind(&self) -> u16 {
        self.nla_type & NLA_TYPE_MASK
    }

    /// Check if this is a nested attribute.
    pub fn is_nested(&self) -> bool {
        self.nla_type & NLA_F_NESTED != 0
    }
}

/// Record format of netlink messages: `nlattr` records after an
/// `nlmsghdr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Netlink;

impl Format for Netlink {
    type Key = u16;

    const ATTR_HDRLEN: usize = NLA_HDRLEN;
    const MSG_HDRLEN: usize = NLMSG_HDRLEN;

    fn write_attr_hdr(out: &mut [u8], len: u16, key: u16) {
        let attr = NlAttr {
            nla_len: len,
            nla_type: key,
        };
        out.copy_from_slice(attr.as_bytes());
    }

    fn read_attr_hdr(data: &[u8]) -> Option<(usize, u16)> {
        let (attr, _) = NlAttr::read_from_prefix(data).ok()?;
        Some((attr.nla_len as usize, attr.nla_type))
    }

    fn nest_key(key: u16) -> u16 {
        key | NLA_F_NESTED
    }

    fn kind(raw: u16) -> u16 {
        raw & NLA_TYPE_MASK
    }

    fn write_msg_len(hdr: &mut [u8], len: u32) {
        hdr[..4].copy_from_slice(&len.to_ne_bytes());
    }

    fn read_msg_len(hdr: &[u8]) -> Option<usize> {
        let bytes: [u8; 4] = hdr.get(..4)?.try_into().ok()?;
        Some(u32::from_ne_bytes(bytes) as usize)
    }
}
