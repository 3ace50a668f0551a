//! Netlink message header and parsing.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::attr::Netlink;
use super::genl::{GENL_HDRLEN, GenlMsg, GenlMsgHdr};
use crate::codec::{Attrs, align, checked_align};
use crate::error::{Error, Result};

/// Size of the netlink message header.
pub const NLMSG_HDRLEN: usize = align(std::mem::size_of::<NlMsgHdr>());

/// Netlink message header (mirrors struct nlmsghdr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlMsgHdr {
    /// Length of message including header.
    pub nlmsg_len: u32,
    /// Message type.
    pub nlmsg_type: u16,
    /// Additional flags.
    pub nlmsg_flags: u16,
    /// Sequence number.
    pub nlmsg_seq: u32,
    /// Sending process port ID.
    pub nlmsg_pid: u32,
}

impl NlMsgHdr {
    /// Create a new message header.
    pub fn new(msg_type: u16, flags: u16) -> Self {
        Self {
            nlmsg_len: NLMSG_HDRLEN as u32,
            nlmsg_type: msg_type,
            nlmsg_flags: flags,
            nlmsg_seq: 0,
            nlmsg_pid: 0,
        }
    }
}

/// Standard netlink message types.
pub struct NlMsgType;

impl NlMsgType {
    /// No operation, message must be discarded.
    pub const NOOP: u16 = 1;
    /// Error message or ACK.
    pub const ERROR: u16 = 2;
    /// End of multipart message.
    pub const DONE: u16 = 3;
    /// Data lost, request resend.
    pub const OVERRUN: u16 = 4;
    /// First type available to protocols; everything below is reserved.
    pub const MIN_TYPE: u16 = 0x10;
}

/// Netlink message flags.
pub const NLM_F_REQUEST: u16 = 0x01;
pub const NLM_F_MULTI: u16 = 0x02;
pub const NLM_F_ACK: u16 = 0x04;
pub const NLM_F_ECHO: u16 = 0x08;

// Modifiers to GET request
pub const NLM_F_ROOT: u16 = 0x100;
pub const NLM_F_MATCH: u16 = 0x200;
pub const NLM_F_DUMP: u16 = NLM_F_ROOT | NLM_F_MATCH;

// Modifiers to NEW request
pub const NLM_F_REPLACE: u16 = 0x100;
pub const NLM_F_EXCL: u16 = 0x200;
pub const NLM_F_CREATE: u16 = 0x400;

/// Netlink error message payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlMsgErr {
    /// Error code (negative errno or 0 for ACK).
    pub error: i32,
    /// Original message header that caused the error.
    pub msg: NlMsgHdr,
}

/// Size of an error frame payload.
pub const NLMSG_ERRLEN: usize = std::mem::size_of::<NlMsgErr>();

impl NlMsgErr {
    /// Check if this is an ACK (no error).
    pub fn is_ack(&self) -> bool {
        self.error == 0
    }

    /// `Ok` for an ACK, the kernel error otherwise.
    pub fn into_result(self) -> Result<()> {
        if self.is_ack() {
            Ok(())
        } else {
            Err(Error::from_errno(self.error))
        }
    }
}

/// A received netlink message whose declared length has been checked
/// against the buffer it arrived in.
#[derive(Debug, Clone, Copy)]
pub struct NlMsg<'a> {
    hdr: NlMsgHdr,
    payload: &'a [u8],
    trailing: usize,
}

impl<'a> NlMsg<'a> {
    /// Parse one message from the start of `buf`.
    ///
    /// Rejects a buffer shorter than the header and a declared length that
    /// is below the header size or beyond the buffer. Bytes past the
    /// declared length are never part of the message; see
    /// [`trailing`](Self::trailing).
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        let (hdr, _) = NlMsgHdr::read_from_prefix(buf).map_err(|_| Error::Truncated {
            expected: NLMSG_HDRLEN,
            actual: buf.len(),
        })?;

        let len = hdr.nlmsg_len as usize;
        if len < NLMSG_HDRLEN {
            return Err(Error::InvalidMessage(format!(
                "invalid message length: {}",
                len
            )));
        }
        if len > buf.len() {
            return Err(Error::Truncated {
                expected: len,
                actual: buf.len(),
            });
        }

        let trailing = buf.len() - len;
        if trailing > 0 {
            tracing::trace!(len, trailing, "bytes after netlink message");
        }

        Ok(Self {
            hdr,
            payload: &buf[NLMSG_HDRLEN..len],
            trailing,
        })
    }

    /// The message header.
    pub fn header(&self) -> &NlMsgHdr {
        &self.hdr
    }

    /// Declared total length.
    pub fn len(&self) -> usize {
        self.hdr.nlmsg_len as usize
    }

    /// Check if the message carries no payload.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Message type.
    pub fn msg_type(&self) -> u16 {
        self.hdr.nlmsg_type
    }

    /// Message flags.
    pub fn flags(&self) -> u16 {
        self.hdr.nlmsg_flags
    }

    /// Sequence number.
    pub fn seq(&self) -> u32 {
        self.hdr.nlmsg_seq
    }

    /// Sender port ID.
    pub fn pid(&self) -> u32 {
        self.hdr.nlmsg_pid
    }

    /// Everything after the header, up to the declared length.
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Received bytes beyond the declared length.
    pub fn trailing(&self) -> usize {
        self.trailing
    }

    /// Check if this is an error (or ACK) frame.
    pub fn is_error(&self) -> bool {
        self.hdr.nlmsg_type == NlMsgType::ERROR
    }

    /// Check if this is a done message.
    pub fn is_done(&self) -> bool {
        self.hdr.nlmsg_type == NlMsgType::DONE
    }

    /// Check if this message has the multi flag.
    pub fn is_multi(&self) -> bool {
        self.hdr.nlmsg_flags & NLM_F_MULTI != 0
    }

    /// Error frame contents, if this is an error frame long enough to
    /// hold one.
    pub fn error(&self) -> Option<NlMsgErr> {
        if !self.is_error() {
            return None;
        }
        NlMsgErr::read_from_prefix(self.payload)
            .ok()
            .map(|(err, _)| err)
    }

    /// Attributes after a `hdrlen`-byte family header.
    pub fn attrs(&self, hdrlen: usize) -> Option<Attrs<'a, Netlink>> {
        self.payload.get(checked_align(hdrlen)?..).map(Attrs::new)
    }

    /// Generic netlink view, for messages in the protocol type range.
    pub fn genl(&self) -> Option<GenlMsg<'a>> {
        if self.hdr.nlmsg_type < NlMsgType::MIN_TYPE {
            return None;
        }
        let (hdr, _) = GenlMsgHdr::read_from_prefix(self.payload).ok()?;
        Some(GenlMsg::new(
            self.hdr.nlmsg_type,
            hdr,
            Attrs::new(&self.payload[GENL_HDRLEN..]),
        ))
    }
}

/// Iterator over netlink messages in a buffer.
///
/// Yields each message, then stops after the first malformed one.
#[derive(Debug, Clone)]
pub struct MessageIter<'a> {
    data: &'a [u8],
}

impl<'a> MessageIter<'a> {
    /// Create a new message iterator.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for MessageIter<'a> {
    type Item = Result<NlMsg<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }

        let mut msg = match NlMsg::parse(self.data) {
            Ok(msg) => msg,
            Err(e) => {
                self.data = &[];
                return Some(Err(e));
            }
        };

        // Move to next message
        let step = align(msg.len()).min(self.data.len());
        self.data = &self.data[step..];
        msg.trailing = 0;

        Some(Ok(msg))
    }
}
