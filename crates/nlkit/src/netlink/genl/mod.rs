//! Generic Netlink (GENL) support.
//!
//! Generic Netlink extends the standard netlink protocol with:
//! - Dynamic family ID allocation (resolved via the control family)
//! - Family-specific commands and attributes
//! - Multicast group support per family
//!
//! # Example
//!
//! ```rust,no_run
//! use nlkit::netlink::{NetlinkSocket, Protocol};
//!
//! # async fn example() -> nlkit::Result<()> {
//! let sock = NetlinkSocket::new(Protocol::Generic)?;
//!
//! // Resolve a family ID
//! let family = sock.resolve_family("nl80211").await?;
//! println!("nl80211 family ID: {}", family.id);
//! # Ok(())
//! # }
//! ```

pub mod ctrl;
mod header;

pub use ctrl::FamilyInfo;
pub use header::{GENL_HDRLEN, GenlMsg, GenlMsgHdr};

// Control family constants (fixed, not dynamically assigned)
pub const GENL_ID_CTRL: u16 = 0x10;

/// Control family commands
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlCmd {
    Unspec = 0,
    NewFamily = 1,
    DelFamily = 2,
    GetFamily = 3,
    NewOps = 4,
    DelOps = 5,
    GetOps = 6,
    NewMcastGrp = 7,
    DelMcastGrp = 8,
    GetMcastGrp = 9,
    GetPolicy = 10,
}

/// Control family attributes
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlAttr {
    Unspec = 0,
    FamilyId = 1,
    FamilyName = 2,
    Version = 3,
    HdrSize = 4,
    MaxAttr = 5,
    Ops = 6,
    McastGroups = 7,
    Policy = 8,
    OpPolicy = 9,
    Op = 10,
}

/// Control family multicast group attributes
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlAttrMcastGrp {
    Unspec = 0,
    Name = 1,
    Id = 2,
}
