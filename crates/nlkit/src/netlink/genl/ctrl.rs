//! Family resolution through the generic netlink control family.

use std::collections::HashMap;

use super::{CtrlAttr, CtrlAttrMcastGrp, CtrlCmd, GENL_ID_CTRL};
use crate::codec::Builder;
use crate::error::Result;
use crate::netlink::{NLM_F_REQUEST, NlMsg};

/// Version of the control family interface we speak.
const CTRL_VERSION: u8 = 1;

/// Information about a Generic Netlink family.
#[derive(Debug, Clone, Default)]
pub struct FamilyInfo {
    /// Dynamically assigned family ID (used as nlmsg_type).
    pub id: u16,
    /// Family name as registered by the kernel.
    pub name: String,
    /// Family version.
    pub version: u32,
    /// Header size (additional bytes after genlmsghdr).
    pub hdr_size: u32,
    /// Maximum attribute number.
    pub max_attr: u32,
    /// Multicast groups: name -> group ID.
    pub mcast_groups: HashMap<String, u32>,
}

impl FamilyInfo {
    /// Extract family information from a `CTRL_CMD_NEWFAMILY` reply.
    ///
    /// Returns `None` if the message is not such a reply or lacks a
    /// well-formed family ID. Ill-typed optional attributes are skipped.
    pub fn from_msg(msg: &NlMsg<'_>) -> Option<Self> {
        let genl = msg.genl()?;
        if genl.family() != GENL_ID_CTRL || genl.cmd() != CtrlCmd::NewFamily as u8 {
            return None;
        }
        let attrs = genl.attrs();

        let mut info = Self {
            id: attrs.get_u16(CtrlAttr::FamilyId as u16)?,
            name: attrs
                .get_str(CtrlAttr::FamilyName as u16)
                .unwrap_or_default()
                .to_string(),
            version: attrs.get_u32(CtrlAttr::Version as u16).unwrap_or(0),
            hdr_size: attrs.get_u32(CtrlAttr::HdrSize as u16).unwrap_or(0),
            max_attr: attrs.get_u32(CtrlAttr::MaxAttr as u16).unwrap_or(0),
            mcast_groups: HashMap::new(),
        };

        if let Some(groups) = attrs.get_nest(CtrlAttr::McastGroups as u16) {
            // Each child is an indexed nest holding {name, id}.
            for group in groups.iter().filter_map(|g| g.as_nest()) {
                let name = group.get_str(CtrlAttrMcastGrp::Name as u16);
                let id = group.get_u32(CtrlAttrMcastGrp::Id as u16);
                if let (Some(name), Some(id)) = (name, id) {
                    info.mcast_groups.insert(name.to_string(), id);
                }
            }
        }

        Some(info)
    }

    /// Multicast group ID by name.
    pub fn mcast_group(&self, name: &str) -> Option<u32> {
        self.mcast_groups.get(name).copied()
    }
}

/// Build a `CTRL_CMD_GETFAMILY` request for `name` in `buf`.
pub fn family_request<'buf>(
    buf: &'buf mut [u8],
    name: &str,
    seq: u32,
    pid: u32,
) -> Result<&'buf [u8]> {
    let mut b = Builder::genl(
        buf,
        GENL_ID_CTRL,
        NLM_F_REQUEST,
        CtrlCmd::GetFamily as u8,
        CTRL_VERSION,
    );
    b.set_seq(seq);
    b.set_pid(pid);
    b.put_str(CtrlAttr::FamilyName as u16, name);
    b.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn family_reply(buf: &mut [u8]) -> &[u8] {
        let mut b = Builder::genl(buf, GENL_ID_CTRL, 0, CtrlCmd::NewFamily as u8, 2);
        b.set_seq(7);
        b.put_u16(CtrlAttr::FamilyId as u16, 0x1e);
        b.put_str(CtrlAttr::FamilyName as u16, "nl80211");
        b.put_u32(CtrlAttr::Version as u16, 1);
        b.put_u32(CtrlAttr::HdrSize as u16, 0);
        b.put_u32(CtrlAttr::MaxAttr as u16, 330);

        let groups = b.begin_nest(CtrlAttr::McastGroups as u16);
        for (i, (name, id)) in [("config", 4u32), ("scan", 5), ("mlme", 7)]
            .into_iter()
            .enumerate()
        {
            let grp = b.begin_nest(i as u16 + 1);
            b.put_u32(CtrlAttrMcastGrp::Id as u16, id);
            b.put_str(CtrlAttrMcastGrp::Name as u16, name);
            b.end_nest(grp);
        }
        b.end_nest(groups);
        b.finish().unwrap()
    }

    #[test]
    fn test_family_request() {
        let mut buf = [0u8; 64];
        let req = family_request(&mut buf, "nl80211", 3, 0).unwrap();

        let msg = NlMsg::parse(req).unwrap();
        assert_eq!(msg.msg_type(), GENL_ID_CTRL);
        assert_eq!(msg.seq(), 3);
        let genl = msg.genl().unwrap();
        assert_eq!(genl.cmd(), CtrlCmd::GetFamily as u8);
        assert_eq!(
            genl.attrs().get_str(CtrlAttr::FamilyName as u16),
            Some("nl80211")
        );
    }

    #[test]
    fn test_family_request_overflow() {
        let mut buf = [0u8; 24];
        assert!(matches!(
            family_request(&mut buf, "a-very-long-family-name", 1, 0),
            Err(Error::Overflow { .. })
        ));
    }

    #[test]
    fn test_parse_family_reply() {
        let mut buf = [0u8; 256];
        let wire = family_reply(&mut buf);
        let info = FamilyInfo::from_msg(&NlMsg::parse(wire).unwrap()).unwrap();

        assert_eq!(info.id, 0x1e);
        assert_eq!(info.name, "nl80211");
        assert_eq!(info.version, 1);
        assert_eq!(info.max_attr, 330);
        assert_eq!(info.mcast_groups.len(), 3);
        assert_eq!(info.mcast_group("scan"), Some(5));
        assert_eq!(info.mcast_group("mlme"), Some(7));
        assert_eq!(info.mcast_group("vendor"), None);
    }

    #[test]
    fn test_request_is_not_a_reply() {
        let mut buf = [0u8; 64];
        let req = family_request(&mut buf, "nl80211", 3, 0).unwrap();
        assert!(FamilyInfo::from_msg(&NlMsg::parse(req).unwrap()).is_none());
    }
}
