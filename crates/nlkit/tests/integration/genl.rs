//! Generic netlink tests against the kernel control family.

use nlkit::netlink::genl::{CtrlAttr, CtrlCmd, FamilyInfo, GENL_ID_CTRL};
use nlkit::netlink::{MAX_RECV_BUF, NLM_F_ACK, NLM_F_DUMP, NLM_F_REQUEST, Protocol, RecvBuf};
use nlkit::{Builder, Error, Result};

#[tokio::test]
async fn test_resolve_control_family() -> Result<()> {
    let sock = netlink_or_skip!(Protocol::Generic);

    let info = sock.resolve_family("nlctrl").await?;
    assert_eq!(info.id, GENL_ID_CTRL);
    assert_eq!(info.name, "nlctrl");
    assert!(info.mcast_group("notify").is_some());
    Ok(())
}

#[tokio::test]
async fn test_unknown_family() -> Result<()> {
    let sock = netlink_or_skip!(Protocol::Generic);

    let err = sock.resolve_family("nlkit-no-such-family").await.unwrap_err();
    assert!(matches!(err, Error::FamilyNotFound { .. }));
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn test_resolve_needs_generic_socket() -> Result<()> {
    let sock = netlink_or_skip!(Protocol::Route);

    let err = sock.resolve_family("nlctrl").await.unwrap_err();
    assert!(matches!(err, Error::InvalidMessage(_)));
    Ok(())
}

#[tokio::test]
async fn test_ack_after_reply() -> Result<()> {
    let sock = netlink_or_skip!(Protocol::Generic);

    let seq = sock.next_seq();
    let mut buf = [0u8; 64];
    let mut b = Builder::genl(
        &mut buf,
        GENL_ID_CTRL,
        NLM_F_REQUEST | NLM_F_ACK,
        CtrlCmd::GetFamily as u8,
        1,
    );
    b.set_seq(seq);
    b.set_pid(sock.pid());
    b.put_str(CtrlAttr::FamilyName as u16, "nlctrl");
    sock.send(b.finish()?).await?;

    let mut rb = RecvBuf::new();
    sock.ack(&mut rb, seq).await?;
    Ok(())
}

#[tokio::test]
async fn test_dump_grows_receive_buffer() -> Result<()> {
    let sock = netlink_or_skip!(Protocol::Generic);

    let seq = sock.next_seq();
    let mut buf = [0u8; 32];
    let mut b = Builder::genl(
        &mut buf,
        GENL_ID_CTRL,
        NLM_F_REQUEST | NLM_F_DUMP,
        CtrlCmd::GetFamily as u8,
        1,
    );
    b.set_seq(seq);
    sock.send(b.finish()?).await?;

    let mut rb = RecvBuf::with_limits(64, MAX_RECV_BUF);
    let mut names = Vec::new();
    'dump: loop {
        let n = sock.recv(&mut rb).await?;
        assert!(n > 0);
        for msg in rb.messages() {
            let msg = msg?;
            if msg.is_done() {
                break 'dump;
            }
            if let Some(err) = msg.error() {
                err.into_result()?;
            }
            if let Some(info) = FamilyInfo::from_msg(&msg) {
                names.push(info.name);
            }
        }
        rb.clear();
    }

    assert!(rb.capacity() > 64);
    assert!(names.iter().any(|n| n == "nlctrl"));
    Ok(())
}
