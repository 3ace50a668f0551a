//! One-descriptor `SCM_RIGHTS` control block.
//!
//! A control message carries at most one open file descriptor, in a single
//! `SOL_SOCKET`/`SCM_RIGHTS` block sized for exactly one `int`.

use std::mem::size_of;
use std::os::fd::RawFd;
use std::ptr;

use libc::{c_int, c_uint};

/// Offset of the descriptor within the block.
#[allow(unused_unsafe)]
const DATA_OFFSET: usize = unsafe { libc::CMSG_LEN(0) } as usize;

/// `cmsg_len` of a block holding one descriptor.
#[allow(unused_unsafe)]
pub const FD_LEN: usize = unsafe { libc::CMSG_LEN(size_of::<c_int>() as c_uint) } as usize;

/// Buffer space for a block holding one descriptor.
#[allow(unused_unsafe)]
pub const FD_SPACE: usize = unsafe { libc::CMSG_SPACE(size_of::<c_int>() as c_uint) } as usize;

#[repr(C, align(8))]
#[derive(Clone, Copy)]
struct Storage([u8; FD_SPACE]);

/// Control buffer for passing a single descriptor.
#[derive(Clone, Copy)]
pub struct FdCmsg {
    storage: Storage,
    len: usize,
}

impl std::fmt::Debug for FdCmsg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FdCmsg")
            .field("len", &self.len)
            .field("fd", &self.peek_fd())
            .finish()
    }
}

impl Default for FdCmsg {
    fn default() -> Self {
        Self::new()
    }
}

impl FdCmsg {
    /// An empty control buffer.
    pub fn new() -> Self {
        Self {
            storage: Storage([0; FD_SPACE]),
            len: 0,
        }
    }

    /// Fill the buffer with one `SCM_RIGHTS` block carrying `fd`.
    pub fn put_fd(&mut self, fd: RawFd) {
        self.storage.0.fill(0);

        // SAFETY: cmsghdr is plain integers (plus padding on some libcs),
        // so the all-zero value is valid.
        let mut hdr: libc::cmsghdr = unsafe { std::mem::zeroed() };
        hdr.cmsg_len = FD_LEN as _;
        hdr.cmsg_level = libc::SOL_SOCKET;
        hdr.cmsg_type = libc::SCM_RIGHTS;
        // SAFETY: the storage is FD_SPACE bytes, at least the size of
        // cmsghdr, and the write makes no alignment assumption.
        unsafe {
            ptr::write_unaligned(self.storage.0.as_mut_ptr().cast::<libc::cmsghdr>(), hdr);
        }
        self.write_data(fd);
        self.len = FD_SPACE;
    }

    /// Take the descriptor out of a received block.
    ///
    /// The block length, level and type are checked before the descriptor
    /// is trusted. The slot is then overwritten with `-1`, so a second call
    /// returns `None`.
    pub fn get_fd(&mut self) -> Option<RawFd> {
        let fd = self.peek_fd()?;
        self.write_data(-1);
        Some(fd)
    }

    /// Close any descriptors the kernel placed in the buffer that were not
    /// taken with [`get_fd`](Self::get_fd). Returns how many were closed.
    pub(crate) fn close_unclaimed(&mut self) -> usize {
        let Some(hdr) = self.header() else {
            return 0;
        };
        if hdr.cmsg_level != libc::SOL_SOCKET || hdr.cmsg_type != libc::SCM_RIGHTS {
            return 0;
        }
        let end = (hdr.cmsg_len as usize).min(self.len);
        let mut closed = 0;
        for slot in self.storage.0[DATA_OFFSET.min(end)..end].chunks_exact_mut(size_of::<c_int>()) {
            let fd = c_int::from_ne_bytes([slot[0], slot[1], slot[2], slot[3]]);
            if fd >= 0 {
                // SAFETY: the kernel installed this descriptor for us and no
                // one else has claimed it.
                unsafe { libc::close(fd) };
                closed += 1;
            }
            slot.copy_from_slice(&(-1 as c_int).to_ne_bytes());
        }
        closed
    }

    /// Valid part of the buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.storage.0[..self.len]
    }

    /// Whether the buffer holds anything.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whole buffer, for `recvmsg` to fill.
    pub(crate) fn buffer_mut(&mut self) -> &mut [u8] {
        self.len = 0;
        &mut self.storage.0
    }

    /// Record how much of the buffer `recvmsg` filled.
    pub(crate) fn set_len(&mut self, len: usize) {
        self.len = len.min(FD_SPACE);
    }

    fn header(&self) -> Option<libc::cmsghdr> {
        if self.len < DATA_OFFSET {
            return None;
        }
        // SAFETY: at least DATA_OFFSET >= size_of::<cmsghdr>() bytes are
        // valid, and the read makes no alignment assumption.
        Some(unsafe { ptr::read_unaligned(self.storage.0.as_ptr().cast::<libc::cmsghdr>()) })
    }

    fn peek_fd(&self) -> Option<RawFd> {
        if self.len < FD_LEN {
            return None;
        }
        let hdr = self.header()?;
        if hdr.cmsg_len as usize != FD_LEN
            || hdr.cmsg_level != libc::SOL_SOCKET
            || hdr.cmsg_type != libc::SCM_RIGHTS
        {
            return None;
        }
        let data = &self.storage.0[DATA_OFFSET..FD_LEN];
        let fd = c_int::from_ne_bytes([data[0], data[1], data[2], data[3]]);
        (fd >= 0).then_some(fd)
    }

    fn write_data(&mut self, fd: RawFd) {
        self.storage.0[DATA_OFFSET..FD_LEN].copy_from_slice(&fd.to_ne_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert!(DATA_OFFSET >= size_of::<libc::cmsghdr>());
        assert_eq!(FD_LEN, DATA_OFFSET + 4);
        assert!(FD_SPACE >= FD_LEN);
        assert_eq!(FD_SPACE % size_of::<usize>(), 0);
    }

    #[test]
    fn test_put_get_fd() {
        let mut cmsg = FdCmsg::new();
        assert!(cmsg.is_empty());
        cmsg.put_fd(7);
        assert_eq!(cmsg.as_bytes().len(), FD_SPACE);
        assert_eq!(cmsg.get_fd(), Some(7));
        assert_eq!(cmsg.get_fd(), None);
    }

    #[test]
    fn test_empty_has_no_fd() {
        assert_eq!(FdCmsg::new().get_fd(), None);
    }

    #[test]
    fn test_short_buffer_rejected() {
        let mut cmsg = FdCmsg::new();
        cmsg.put_fd(7);
        cmsg.set_len(FD_LEN - 1);
        assert_eq!(cmsg.get_fd(), None);
    }

    #[test]
    fn test_wrong_type_rejected() {
        let mut cmsg = FdCmsg::new();
        cmsg.put_fd(7);
        let mut hdr = cmsg.header().unwrap();
        hdr.cmsg_type = libc::SCM_CREDENTIALS;
        unsafe {
            ptr::write_unaligned(cmsg.storage.0.as_mut_ptr().cast::<libc::cmsghdr>(), hdr);
        }
        assert_eq!(cmsg.get_fd(), None);
        assert_eq!(cmsg.close_unclaimed(), 0);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let mut cmsg = FdCmsg::new();
        cmsg.put_fd(7);
        let mut hdr = cmsg.header().unwrap();
        hdr.cmsg_len = (FD_LEN + 4) as _;
        unsafe {
            ptr::write_unaligned(cmsg.storage.0.as_mut_ptr().cast::<libc::cmsghdr>(), hdr);
        }
        assert_eq!(cmsg.get_fd(), None);
    }

    #[test]
    fn test_negative_fd_rejected() {
        let mut cmsg = FdCmsg::new();
        cmsg.put_fd(-5);
        assert_eq!(cmsg.get_fd(), None);
    }

    #[test]
    fn test_claimed_fd_is_not_closed() {
        let mut cmsg = FdCmsg::new();
        cmsg.put_fd(7);
        assert_eq!(cmsg.get_fd(), Some(7));
        assert_eq!(cmsg.close_unclaimed(), 0);
    }
}
