//! Netlink framing and async transport for Linux.
//!
//! Messages are built with [`Builder`](crate::Builder) over a caller buffer
//! and parsed with [`NlMsg`]; the same attribute walker serves both the
//! routing and generic families.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use nlkit::Builder;
//! use nlkit::netlink::{NLM_F_ACK, NLM_F_REQUEST, NetlinkSocket, Protocol, RecvBuf};
//!
//! # async fn example() -> nlkit::Result<()> {
//! let sock = NetlinkSocket::new(Protocol::Route)?;
//!
//! let seq = sock.next_seq();
//! let mut buf = [0u8; 256];
//! let mut b = Builder::netlink(&mut buf, 16, NLM_F_REQUEST | NLM_F_ACK);
//! b.set_seq(seq);
//! b.put_str(3, "dummy0");
//! sock.send(b.finish()?).await?;
//!
//! let mut rb = RecvBuf::new();
//! sock.ack(&mut rb, seq).await?;
//! # Ok(())
//! # }
//! ```

pub mod attr;
mod builder;
pub mod genl;
pub mod message;
pub mod recv;
mod socket;

pub use attr::{NLA_ALIGNTO, NLA_F_NESTED, NLA_F_NET_BYTEORDER, NLA_HDRLEN, NLA_TYPE_MASK, NlAttr, Netlink};
pub use genl::{FamilyInfo, GenlMsg};
pub use message::{
    MessageIter, NLM_F_ACK, NLM_F_CREATE, NLM_F_DUMP, NLM_F_ECHO, NLM_F_EXCL, NLM_F_MATCH,
    NLM_F_MULTI, NLM_F_REPLACE, NLM_F_REQUEST, NLM_F_ROOT, NLMSG_ERRLEN, NLMSG_HDRLEN, NlMsg,
    NlMsgErr, NlMsgHdr, NlMsgType,
};
pub use recv::{DEFAULT_RECV_BUF, MAX_RECV_BUF, RecvBuf};
pub use socket::{NetlinkSocket, Protocol};
