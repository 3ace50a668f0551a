//! Bounded TLV message codec for netlink and a local control socket.
//!
//! Both wire protocols encode a message as a fixed header followed by a
//! flat or nested sequence of tagged, length-prefixed attributes padded to
//! 4 bytes. This crate builds such messages into a caller buffer without
//! ever writing outside it, and parses untrusted buffers without trusting
//! any length field.
//!
//! # Features
//!
//! - `integration` - Tests that need a live `NETLINK_GENERIC` socket
//!
//! # Example
//!
//! ```
//! use nlkit::{Builder, NlMsg};
//! use nlkit::netlink::NLM_F_REQUEST;
//!
//! let mut buf = [0u8; 64];
//! let mut b = Builder::netlink(&mut buf, 0x10, NLM_F_REQUEST);
//! b.put_u32(1, 42);
//! let nest = b.begin_nest(2);
//! b.put_str(1, "lo");
//! b.end_nest(nest);
//! let wire = b.finish()?;
//!
//! let attrs = NlMsg::parse(wire)?.attrs(0).unwrap();
//! assert_eq!(attrs.get_u32(1), Some(42));
//! assert_eq!(attrs.get_nest(2).and_then(|n| n.get_str(1)), Some("lo"));
//! # Ok::<(), nlkit::Error>(())
//! ```

pub mod codec;
pub mod ctl;
mod error;
pub mod netlink;

// Re-export common types at crate root for convenience
pub use codec::{Attrs, Builder};
pub use ctl::{Ctl, CtlMsg, CtlSocket};
pub use error::{Error, Result};
pub use netlink::{NetlinkSocket, Netlink, NlMsg, Protocol};
