//! Local control-socket protocol.
//!
//! A supervisor and its client tools exchange TLV messages over a Unix
//! datagram socket. Messages use the shared codec with 8-byte
//! `{u32 len, u32 key}` records, so 32-bit command and attribute keys fit,
//! and may carry one open file descriptor as `SCM_RIGHTS` ancillary data.
//!
//! ```rust,no_run
//! use std::os::fd::AsFd;
//! use nlkit::Builder;
//! use nlkit::ctl::{CtlMsg, CtlSocket};
//!
//! # async fn example() -> nlkit::Result<()> {
//! let (client, server) = CtlSocket::pair()?;
//! let log = std::fs::File::open("/dev/null")?;
//!
//! let mut buf = [0u8; 256];
//! let mut b = Builder::ctl(&mut buf, 0x53550001);
//! b.put_str(1, "sshd");
//! client.send(b.finish()?, Some(log.as_fd())).await?;
//!
//! let mut rx = [0u8; 256];
//! let (len, fd) = server.recv(&mut rx).await?;
//! let msg = CtlMsg::parse(&rx[..len])?;
//! assert_eq!(msg.attrs().get_str(1), Some("sshd"));
//! assert!(fd.is_some());
//! # Ok(())
//! # }
//! ```

pub mod ancillary;
pub mod message;
mod socket;

pub use ancillary::{FD_LEN, FD_SPACE, FdCmsg};
pub use message::{CTL_HDRLEN, Ctl, CtlAttr, CtlHdr, CtlMsg, wire};
pub use socket::CtlSocket;
