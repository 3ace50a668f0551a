//! Netlink framing on top of the generic message builder.

use zerocopy::{Immutable, IntoBytes};

use super::attr::Netlink;
use super::message::{NLMSG_HDRLEN, NlMsgHdr};
use crate::codec::Builder;

impl<'buf> Builder<'buf, Netlink> {
    /// Start a netlink message with the given type and flags.
    pub fn netlink(buf: &'buf mut [u8], msg_type: u16, flags: u16) -> Self {
        Self::netlink_raw(buf, msg_type, flags, &[])
    }

    /// Start a netlink message followed by a fixed family header
    /// (`ifinfomsg`, `genlmsghdr`, ...).
    pub fn netlink_with_header<T: IntoBytes + Immutable>(
        buf: &'buf mut [u8],
        msg_type: u16,
        flags: u16,
        family: &T,
    ) -> Self {
        Self::netlink_raw(buf, msg_type, flags, IntoBytes::as_bytes(family))
    }

    fn netlink_raw(buf: &'buf mut [u8], msg_type: u16, flags: u16, family: &[u8]) -> Self {
        let mut b = Self::begin(buf, NLMSG_HDRLEN + family.len());
        if let Some(hdr) = b.header_mut() {
            // Length stays 0 until finish().
            let nlh = NlMsgHdr {
                nlmsg_len: 0,
                ..NlMsgHdr::new(msg_type, flags)
            };
            hdr[..NLMSG_HDRLEN].copy_from_slice(nlh.as_bytes());
            hdr[NLMSG_HDRLEN..].copy_from_slice(family);
        }
        b
    }

    /// Set the sequence number.
    pub fn set_seq(&mut self, seq: u32) {
        if let Some(hdr) = self.header_mut() {
            hdr[8..12].copy_from_slice(&seq.to_ne_bytes());
        }
    }

    /// Set the port ID.
    pub fn set_pid(&mut self, pid: u32) {
        if let Some(hdr) = self.header_mut() {
            hdr[12..16].copy_from_slice(&pid.to_ne_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::cursor::align;
    use crate::error::Error;
    use crate::netlink::{NLA_F_NESTED, NLA_HDRLEN, NLM_F_ACK, NLM_F_REQUEST, NlMsg};
    use zerocopy::FromBytes;

    /// Stand-in for a routing family header (struct ifinfomsg).
    #[repr(C)]
    #[derive(Debug, Clone, Copy, Default, IntoBytes, Immutable, FromBytes)]
    struct IfInfoMsg {
        family: u8,
        pad: u8,
        kind: u16,
        index: i32,
        flags: u32,
        change: u32,
    }

    #[test]
    fn test_simple_message() {
        let mut buf = [0u8; 64];
        let msg = Builder::netlink(&mut buf, 16, NLM_F_REQUEST).finish().unwrap();
        assert_eq!(msg.len(), NLMSG_HDRLEN);

        let (header, _) = NlMsgHdr::read_from_prefix(msg).unwrap();
        assert_eq!(header.nlmsg_len as usize, NLMSG_HDRLEN);
        assert_eq!(header.nlmsg_type, 16);
        assert_eq!(header.nlmsg_flags, NLM_F_REQUEST);
    }

    #[test]
    fn test_seq_and_pid() {
        let mut buf = [0u8; 64];
        let mut b = Builder::netlink(&mut buf, 18, NLM_F_REQUEST | NLM_F_ACK);
        b.set_seq(0x01020304);
        b.set_pid(4242);
        let msg = NlMsg::parse(b.finish().unwrap()).unwrap();
        assert_eq!(msg.seq(), 0x01020304);
        assert_eq!(msg.pid(), 4242);
        assert_eq!(msg.flags(), NLM_F_REQUEST | NLM_F_ACK);
    }

    #[test]
    fn test_length_unset_until_finish() {
        let mut buf = [0xFFu8; 64];
        let mut b = Builder::netlink(&mut buf, 16, 0);
        b.put_u32(1, 1);
        assert_eq!(&b.as_bytes()[..4], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_family_header() {
        let ifi = IfInfoMsg {
            index: 3,
            ..Default::default()
        };
        let mut buf = [0u8; 64];
        let mut b = Builder::netlink_with_header(&mut buf, 16, NLM_F_REQUEST, &ifi);
        b.put_str(3, "eth0");
        let wire = b.finish().unwrap();

        let msg = NlMsg::parse(wire).unwrap();
        let hdrlen = std::mem::size_of::<IfInfoMsg>();
        let (got, _) = IfInfoMsg::read_from_prefix(msg.payload()).unwrap();
        assert_eq!(got.index, 3);
        assert_eq!(msg.attrs(hdrlen).unwrap().get_str(3), Some("eth0"));
        assert_eq!(wire.len(), NLMSG_HDRLEN + hdrlen + NLA_HDRLEN + align(5));
    }

    #[test]
    fn test_nest_sets_flag() {
        let mut buf = [0u8; 64];
        let mut b = Builder::netlink(&mut buf, 16, 0);
        let nest = b.begin_nest(2);
        b.put_u8(1, 1);
        b.end_nest(nest);
        let wire = b.finish().unwrap();

        let raw = u16::from_ne_bytes([wire[18], wire[19]]);
        assert_eq!(raw, 2 | NLA_F_NESTED);
        let attrs = NlMsg::parse(wire).unwrap().attrs(0).unwrap();
        assert_eq!(attrs.get_nest(2).unwrap().get_u8(1), Some(1));
    }

    #[test]
    fn test_header_does_not_fit() {
        let mut buf = [0u8; 12];
        let mut b = Builder::netlink(&mut buf, 16, 0);
        b.set_seq(1);
        assert!(b.put_u8(1, 1).is_none());
        assert!(matches!(b.finish(), Err(Error::Overflow { capacity: 12 })));
    }
}
