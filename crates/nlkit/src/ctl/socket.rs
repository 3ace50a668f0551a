//! Async Unix datagram socket for control messages.

use std::io;
use std::mem;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::net::UnixDatagram;
use std::path::Path;

use libc::c_void;
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;

use super::ancillary::FdCmsg;
use crate::error::{Error, Result};

/// Async control socket.
///
/// Each send is one datagram holding one finished control message and, at
/// most, one file descriptor.
#[derive(Debug)]
pub struct CtlSocket {
    fd: AsyncFd<UnixDatagram>,
}

impl CtlSocket {
    /// Wrap an existing datagram socket. It is switched to non-blocking mode.
    pub fn from_std(sock: UnixDatagram) -> Result<Self> {
        sock.set_nonblocking(true)?;
        Ok(Self {
            fd: AsyncFd::new(sock)?,
        })
    }

    /// A connected pair of sockets.
    pub fn pair() -> Result<(Self, Self)> {
        let (a, b) = UnixDatagram::pair()?;
        Ok((Self::from_std(a)?, Self::from_std(b)?))
    }

    /// Socket bound to `path`.
    pub fn bind<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_std(UnixDatagram::bind(path)?)
    }

    /// Socket with no name, to be connected later.
    pub fn unbound() -> Result<Self> {
        Self::from_std(UnixDatagram::unbound()?)
    }

    /// Set the default peer for [`send`](Self::send).
    pub fn connect<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.fd.get_ref().connect(path)?;
        Ok(())
    }

    /// Send one finished message, optionally passing a descriptor with it.
    pub async fn send(&self, msg: &[u8], fd: Option<BorrowedFd<'_>>) -> Result<()> {
        let mut cmsg = FdCmsg::new();
        if let Some(fd) = fd {
            cmsg.put_fd(fd.as_raw_fd());
        }

        loop {
            let mut guard = self.fd.ready(Interest::WRITABLE).await?;

            match guard.try_io(|inner| send_with_cmsg(inner.as_raw_fd(), msg, &cmsg)) {
                Ok(result) => {
                    let sent = result?;
                    if sent != msg.len() {
                        tracing::warn!(sent, expected = msg.len(), "short control send");
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

    /// Receive one datagram into `buf`.
    ///
    /// Returns the message length and the descriptor passed with it, if
    /// any. A datagram larger than `buf` is `Error::Truncated`; ancillary
    /// data that did not fit is `Error::ControlTruncated`. Descriptors that
    /// arrive with a rejected datagram are closed.
    pub async fn recv(&self, buf: &mut [u8]) -> Result<(usize, Option<OwnedFd>)> {
        let mut cmsg = FdCmsg::new();

        let (len, flags) = loop {
            let mut guard = self.fd.ready(Interest::READABLE).await?;

            match guard.try_io(|inner| recv_with_cmsg(inner.as_raw_fd(), &mut *buf, &mut cmsg)) {
                Ok(result) => break result?,
                Err(_would_block) => continue,
            }
        };

        if flags & libc::MSG_CTRUNC != 0 {
            let closed = cmsg.close_unclaimed();
            tracing::debug!(closed, "control data truncated");
            return Err(Error::ControlTruncated);
        }
        if flags & libc::MSG_TRUNC != 0 || len > buf.len() {
            let closed = cmsg.close_unclaimed();
            tracing::debug!(len, capacity = buf.len(), closed, "datagram truncated");
            return Err(Error::Truncated {
                expected: len,
                actual: buf.len(),
            });
        }

        // SAFETY: get_fd only returns a descriptor the kernel just installed
        // for this process, and clears it so it is claimed once.
        let fd = cmsg
            .get_fd()
            .map(|fd| unsafe { OwnedFd::from_raw_fd(fd) });
        cmsg.close_unclaimed();
        Ok((len, fd))
    }
}

impl AsRawFd for CtlSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.get_ref().as_raw_fd()
    }
}

fn send_with_cmsg(sock: RawFd, msg: &[u8], cmsg: &FdCmsg) -> io::Result<usize> {
    let mut iov = libc::iovec {
        iov_base: msg.as_ptr() as *mut c_void,
        iov_len: msg.len(),
    };
    // SAFETY: msghdr is plain data; the all-zero value is an empty header.
    let mut hdr: libc::msghdr = unsafe { mem::zeroed() };
    hdr.msg_iov = &mut iov;
    hdr.msg_iovlen = 1;
    if !cmsg.is_empty() {
        let control = cmsg.as_bytes();
        hdr.msg_control = control.as_ptr() as *mut c_void;
        hdr.msg_controllen = control.len() as _;
    }

    // SAFETY: every pointer in hdr refers to memory that outlives the call,
    // and sendmsg only reads through them.
    let n = unsafe { libc::sendmsg(sock, &hdr, libc::MSG_NOSIGNAL) };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(n as usize)
}

fn recv_with_cmsg(sock: RawFd, buf: &mut [u8], cmsg: &mut FdCmsg) -> io::Result<(usize, libc::c_int)> {
    let mut iov = libc::iovec {
        iov_base: buf.as_mut_ptr().cast::<c_void>(),
        iov_len: buf.len(),
    };
    // SAFETY: msghdr is plain data; the all-zero value is an empty header.
    let mut hdr: libc::msghdr = unsafe { mem::zeroed() };
    hdr.msg_iov = &mut iov;
    hdr.msg_iovlen = 1;
    let control = cmsg.buffer_mut();
    hdr.msg_control = control.as_mut_ptr().cast::<c_void>();
    hdr.msg_controllen = control.len() as _;

    // SAFETY: iov and control point at writable buffers of the stated
    // lengths that outlive the call.
    let n = unsafe {
        libc::recvmsg(
            sock,
            &mut hdr,
            libc::MSG_TRUNC | libc::MSG_CMSG_CLOEXEC,
        )
    };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }
    cmsg.set_len(hdr.msg_controllen as usize);
    Ok((n as usize, hdr.msg_flags))
}
