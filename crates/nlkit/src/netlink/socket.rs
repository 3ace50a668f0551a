//! Low-level async netlink socket operations.

use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicU32, Ordering};

use netlink_sys::{Socket, SocketAddr, protocols};
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;

use super::genl::FamilyInfo;
use super::genl::ctrl::family_request;
use super::recv::RecvBuf;
use crate::error::{Error, Result};

/// Netlink protocol families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Routing/device hook (ip, tc, etc.)
    Route,
    /// Generic netlink
    Generic,
}

impl Protocol {
    fn as_isize(self) -> isize {
        match self {
            Protocol::Route => protocols::NETLINK_ROUTE,
            Protocol::Generic => protocols::NETLINK_GENERIC,
        }
    }
}

/// Async netlink socket.
pub struct NetlinkSocket {
    /// The underlying async file descriptor.
    fd: AsyncFd<Socket>,
    /// Sequence number counter.
    seq: AtomicU32,
    /// Local port ID (assigned by kernel).
    pid: u32,
    /// Protocol this socket uses.
    protocol: Protocol,
}

impl NetlinkSocket {
    /// Create a new netlink socket for the given protocol.
    pub fn new(protocol: Protocol) -> Result<Self> {
        Self::create_socket(protocol)
    }

    fn create_socket(protocol: Protocol) -> Result<Self> {
        let mut socket = Socket::new(protocol.as_isize())?;
        socket.set_non_blocking(true)?;

        // Bind to get a port ID
        let mut addr = SocketAddr::new(0, 0);
        socket.bind(&addr)?;
        socket.get_address(&mut addr)?;
        let pid = addr.port_number();

        // Extended ACK is optional
        socket.set_ext_ack(true).ok();

        let fd = AsyncFd::new(socket)?;
        tracing::debug!(?protocol, pid, "netlink socket bound");

        Ok(Self {
            fd,
            seq: AtomicU32::new(1),
            pid,
            protocol,
        })
    }

    /// Get the next sequence number.
    pub fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Get the local port ID.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Get the protocol.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Subscribe to a multicast group.
    pub fn add_membership(&mut self, group: u32) -> Result<()> {
        self.fd.get_mut().add_membership(group)?;
        Ok(())
    }

    /// Unsubscribe from a multicast group.
    pub fn drop_membership(&mut self, group: u32) -> Result<()> {
        self.fd.get_mut().drop_membership(group)?;
        Ok(())
    }

    /// Send one finished message as a single datagram.
    pub async fn send(&self, msg: &[u8]) -> Result<()> {
        loop {
            let mut guard = self.fd.ready(Interest::WRITABLE).await?;

            match guard.try_io(|inner| inner.get_ref().send(msg, 0)) {
                Ok(result) => {
                    let sent = result?;
                    if sent != msg.len() {
                        tracing::warn!(sent, expected = msg.len(), "short netlink send");
                        return Err(Error::ShortSend {
                            sent,
                            expected: msg.len(),
                        });
                    }
                    return Ok(());
                }
                Err(_would_block) => continue,
            }
        }
    }

    /// Receive one datagram, appending it to the pending bytes of `rb`.
    ///
    /// The datagram size is peeked first and the buffer grown to fit, so
    /// a large dump reply is never cut short. Returns the datagram length.
    pub async fn recv(&self, rb: &mut RecvBuf) -> Result<usize> {
        loop {
            let mut guard = self.fd.ready(Interest::READABLE).await?;

            let peeked = guard.try_io(|inner| {
                // SAFETY: a zero-length receive with a null buffer is valid;
                // MSG_PEEK leaves the datagram queued and MSG_TRUNC makes the
                // kernel report its full length.
                let n = unsafe {
                    libc::recv(
                        inner.as_raw_fd(),
                        std::ptr::null_mut(),
                        0,
                        libc::MSG_PEEK | libc::MSG_TRUNC,
                    )
                };
                if n < 0 {
                    Err(std::io::Error::last_os_error())
                } else {
                    Ok(n as usize)
                }
            });
            let size = match peeked {
                Ok(result) => result?,
                Err(_would_block) => continue,
            };

            rb.reserve(size)?;

            match guard.try_io(|inner| inner.get_ref().recv(rb.storage(), 0)) {
                Ok(result) => return Ok(result?),
                Err(_would_block) => continue,
            }
        }
    }

    /// Wait for the error frame answering `seq`.
    ///
    /// Messages for other sequence numbers are skipped. An ACK is `Ok`;
    /// a nonzero errno is returned as `Error::Kernel`.
    pub async fn ack(&self, rb: &mut RecvBuf, seq: u32) -> Result<()> {
        loop {
            self.recv(rb).await?;
            let outcome = scan_ack(rb, seq);
            rb.clear();
            if let Some(result) = outcome {
                return result;
            }
        }
    }

    /// Look up a generic netlink family by name.
    pub async fn resolve_family(&self, name: &str) -> Result<FamilyInfo> {
        if self.protocol != Protocol::Generic {
            return Err(Error::InvalidMessage(format!(
                "family lookup needs a generic netlink socket, not {:?}",
                self.protocol
            )));
        }

        let seq = self.next_seq();
        let mut buf = [0u8; 128];
        let req = family_request(&mut buf, name, seq, self.pid)?;
        self.send(req).await?;

        let mut rb = RecvBuf::new();
        loop {
            self.recv(&mut rb).await?;
            let outcome = scan_family(&rb, seq, name);
            rb.clear();
            if let Some(result) = outcome {
                return result;
            }
        }
    }
}

/// Find the ACK or error for `seq` in the pending messages.
fn scan_ack(rb: &RecvBuf, seq: u32) -> Option<Result<()>> {
    for msg in rb.messages() {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => return Some(Err(e)),
        };
        if msg.seq() != seq {
            tracing::trace!(seq = msg.seq(), expected = seq, "skipping message");
            continue;
        }
        if let Some(err) = msg.error() {
            return Some(err.into_result());
        }
        if msg.is_done() {
            return Some(Ok(()));
        }
    }
    None
}

/// Find the family reply (or the error) for `seq` in the pending messages.
fn scan_family(rb: &RecvBuf, seq: u32, name: &str) -> Option<Result<FamilyInfo>> {
    for msg in rb.messages() {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => return Some(Err(e)),
        };
        if msg.seq() != seq {
            continue;
        }
        if let Some(err) = msg.error() {
            return Some(match err.into_result() {
                Ok(()) => Err(Error::InvalidMessage(format!(
                    "no family reply for {}",
                    name
                ))),
                Err(e) if e.is_not_found() => Err(Error::FamilyNotFound {
                    name: name.to_string(),
                }),
                Err(e) => Err(e),
            });
        }
        if let Some(info) = FamilyInfo::from_msg(&msg) {
            return Some(Ok(info));
        }
    }
    None
}

impl AsRawFd for NetlinkSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.get_ref().as_raw_fd()
    }
}
