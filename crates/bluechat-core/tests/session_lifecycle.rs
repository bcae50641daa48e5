//! End-to-end lifecycle tests against the in-memory transport

mod common;

use std::sync::Arc;

use bluechat_core::{
    InboundFrame, PeerAddress, PeerIdentity, SessionConfig, SessionEvent, SessionManager,
    SessionState, SessionWarning,
};
use proptest::prelude::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::oneshot;
use tokio::time::timeout;

use common::{
    events_until_state, expect_quiet, next_event, state, BrokenWriteSocket, DialBehavior,
    MockTransport, EVENT_TIMEOUT,
};

fn new_manager(transport: &Arc<MockTransport>) -> (SessionManager, bluechat_core::EventReceiver) {
    SessionManager::with_channel(transport.clone(), SessionConfig::new()).unwrap()
}

#[tokio::test]
async fn test_inbound_session_exchanges_frames_and_recovers_from_loss() {
    let (transport, _dialed) = MockTransport::new();
    transport.set_name("AA:BB", "Pixel");
    let (manager, mut rx) = new_manager(&transport);

    manager.start();
    assert_eq!(next_event(&mut rx).await, state(SessionState::Listening));

    let mut remote = transport.inject_inbound("AA:BB");
    assert_eq!(
        next_event(&mut rx).await,
        SessionEvent::PeerIdentified {
            peer: PeerIdentity::new(PeerAddress::from("AA:BB"), "Pixel"),
        }
    );
    assert_eq!(next_event(&mut rx).await, state(SessionState::Connected));
    assert_eq!(manager.current_state(), SessionState::Connected);

    remote.write_all(b"hi").await.unwrap();
    assert_eq!(
        next_event(&mut rx).await,
        SessionEvent::InboundFrame(InboundFrame::new(b"hi".to_vec()))
    );

    manager.write("yo");
    assert_eq!(
        next_event(&mut rx).await,
        SessionEvent::OutboundFrame {
            payload: b"yo".to_vec()
        }
    );
    let mut buf = [0u8; 2];
    remote.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"yo");

    drop(remote);
    assert_eq!(next_event(&mut rx).await, SessionEvent::ConnectionLost);
    assert_eq!(next_event(&mut rx).await, state(SessionState::Listening));

    let workers = manager.active_workers();
    assert!(workers.listener);
    assert_eq!(workers.count(), 1);
}

#[tokio::test]
async fn test_unnamed_peer_reports_unknown_device() {
    let (transport, _dialed) = MockTransport::new();
    let (manager, mut rx) = new_manager(&transport);

    manager.start();
    let _remote = transport.inject_inbound("CC:DD");
    let events = events_until_state(&mut rx, SessionState::Connected).await;
    assert!(events.contains(&SessionEvent::PeerIdentified {
        peer: PeerIdentity::new(PeerAddress::from("CC:DD"), "Unknown Device"),
    }));
}

#[tokio::test]
async fn test_write_without_session_warns() {
    let (transport, _dialed) = MockTransport::new();
    let (manager, mut rx) = new_manager(&transport);

    manager.write("hello");
    assert_eq!(
        next_event(&mut rx).await,
        SessionEvent::Warning {
            warning: SessionWarning::NotConnected
        }
    );
    assert_eq!(manager.current_state(), SessionState::Idle);

    manager.start();
    next_event(&mut rx).await;
    manager.write("hello");
    assert_eq!(
        next_event(&mut rx).await,
        SessionEvent::Warning {
            warning: SessionWarning::NotConnected
        }
    );
}

#[tokio::test]
async fn test_outbound_dial_connects() {
    let (transport, mut dialed) = MockTransport::new();
    transport.script_dial("11:22", DialBehavior::Succeed);
    transport.set_name("11:22", "Laptop");
    let (manager, mut rx) = new_manager(&transport);

    manager.connect("11:22");
    assert_eq!(next_event(&mut rx).await, state(SessionState::Connecting));
    assert_eq!(
        next_event(&mut rx).await,
        SessionEvent::PeerIdentified {
            peer: PeerIdentity::new(PeerAddress::from("11:22"), "Laptop"),
        }
    );
    assert_eq!(next_event(&mut rx).await, state(SessionState::Connected));

    let (address, mut remote) = dialed.recv().await.unwrap();
    assert_eq!(address, "11:22");
    remote.write_all(b"ping").await.unwrap();
    assert_eq!(
        next_event(&mut rx).await,
        SessionEvent::InboundFrame(InboundFrame::new(b"ping".to_vec()))
    );
}

#[tokio::test]
async fn test_failed_dial_falls_back_to_listening() {
    let (transport, _dialed) = MockTransport::new();
    transport.script_dial("11:22", DialBehavior::Fail);
    let (manager, mut rx) = new_manager(&transport);

    manager.connect("11:22");
    assert_eq!(next_event(&mut rx).await, state(SessionState::Connecting));
    assert_eq!(next_event(&mut rx).await, SessionEvent::ConnectionFailed);
    assert_eq!(next_event(&mut rx).await, state(SessionState::Listening));
    assert!(manager.active_workers().listener);
}

#[tokio::test]
async fn test_unresolvable_address_fails_like_a_dial() {
    let (transport, _dialed) = MockTransport::new();
    let (manager, mut rx) = new_manager(&transport);

    manager.connect("not an address");
    assert_eq!(next_event(&mut rx).await, state(SessionState::Connecting));
    assert!(matches!(
        next_event(&mut rx).await,
        SessionEvent::Warning {
            warning: SessionWarning::InvalidAddress(_)
        }
    ));
    assert_eq!(next_event(&mut rx).await, SessionEvent::ConnectionFailed);
    assert_eq!(next_event(&mut rx).await, state(SessionState::Listening));
}

#[tokio::test]
async fn test_second_connect_supersedes_first() {
    let (transport, mut dialed) = MockTransport::new();
    let (gate_tx, gate_rx) = oneshot::channel();
    transport.script_dial("first", DialBehavior::Gated(gate_rx));
    transport.script_dial("second", DialBehavior::Succeed);
    let (manager, mut rx) = new_manager(&transport);

    manager.connect("first");
    manager.connect("second");
    let events = events_until_state(&mut rx, SessionState::Connected).await;
    assert_eq!(events.len(), 4);
    assert!(!events.contains(&SessionEvent::ConnectionFailed));

    let _ = gate_tx.send(true);
    expect_quiet(&mut rx).await;
    assert_eq!(manager.current_state(), SessionState::Connected);

    let (address, _remote) = dialed.recv().await.unwrap();
    assert_eq!(address, "second");
    assert!(dialed.try_recv().is_err());
}

#[tokio::test]
async fn test_connect_while_connected_closes_old_session() {
    let (transport, _dialed) = MockTransport::new();
    transport.script_dial("other", DialBehavior::Hang);
    let (manager, mut rx) = new_manager(&transport);

    manager.start();
    let mut remote = transport.inject_inbound("AA:BB");
    events_until_state(&mut rx, SessionState::Connected).await;

    manager.connect("other");
    assert_eq!(next_event(&mut rx).await, state(SessionState::Connecting));

    let mut buf = [0u8; 8];
    assert_eq!(remote.read(&mut buf).await.unwrap(), 0);
    expect_quiet(&mut rx).await;

    let workers = manager.active_workers();
    assert!(workers.connector);
    assert_eq!(workers.count(), 1);
}

#[tokio::test]
async fn test_listen_failure_warns_and_retries_on_next_start() {
    let (transport, _dialed) = MockTransport::new();
    transport.set_listen_fails(true);
    let (manager, mut rx) = new_manager(&transport);

    manager.start();
    assert_eq!(next_event(&mut rx).await, state(SessionState::Listening));
    assert!(matches!(
        next_event(&mut rx).await,
        SessionEvent::Warning {
            warning: SessionWarning::EndpointUnavailable(_)
        }
    ));
    assert_eq!(manager.current_state(), SessionState::Listening);
    tokio::task::yield_now().await;
    assert_eq!(manager.active_workers().count(), 0);

    transport.set_listen_fails(false);
    manager.start();
    next_event(&mut rx).await;
    let _remote = transport.inject_inbound("AA:BB");
    events_until_state(&mut rx, SessionState::Connected).await;
    assert_eq!(transport.listen_calls(), 2);
}

#[tokio::test]
async fn test_repeated_start_keeps_one_listener() {
    let (transport, _dialed) = MockTransport::new();
    let (manager, mut rx) = new_manager(&transport);

    manager.start();
    manager.start();
    manager.start();
    for _ in 0..3 {
        assert_eq!(next_event(&mut rx).await, state(SessionState::Listening));
    }
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
    assert_eq!(transport.listen_calls(), 1);
    assert_eq!(manager.active_workers().count(), 1);
}

#[tokio::test]
async fn test_stop_closes_session_and_idles() {
    let (transport, _dialed) = MockTransport::new();
    let (manager, mut rx) = new_manager(&transport);

    manager.start();
    let mut remote = transport.inject_inbound("AA:BB");
    events_until_state(&mut rx, SessionState::Connected).await;

    manager.stop();
    assert_eq!(next_event(&mut rx).await, state(SessionState::Idle));

    let mut buf = [0u8; 8];
    assert_eq!(remote.read(&mut buf).await.unwrap(), 0);
    expect_quiet(&mut rx).await;
    assert_eq!(manager.active_workers().count(), 0);

    manager.stop();
    assert_eq!(next_event(&mut rx).await, state(SessionState::Idle));
}

#[tokio::test]
async fn test_dropping_manager_closes_session() {
    let (transport, _dialed) = MockTransport::new();
    let (manager, mut rx) = new_manager(&transport);

    manager.start();
    let mut remote = transport.inject_inbound("AA:BB");
    events_until_state(&mut rx, SessionState::Connected).await;

    drop(manager);
    let mut buf = [0u8; 8];
    assert_eq!(remote.read(&mut buf).await.unwrap(), 0);
}

#[tokio::test]
async fn test_stop_closes_socket_while_write_is_blocked() {
    let (transport, _dialed) = MockTransport::new();
    let (manager, mut rx) = new_manager(&transport);

    manager.start();
    let mut remote = transport.inject_inbound("AA:BB");
    events_until_state(&mut rx, SessionState::Connected).await;

    // Larger than the duplex buffer and never read by the peer
    manager.write(vec![0x55u8; 64 * 1024]);
    expect_quiet(&mut rx).await;

    manager.stop();
    assert_eq!(next_event(&mut rx).await, state(SessionState::Idle));

    let mut drained = Vec::new();
    let closed = timeout(EVENT_TIMEOUT, remote.read_to_end(&mut drained)).await;
    assert!(matches!(closed, Ok(Ok(_))), "socket stayed open after stop()");
    assert!(drained.len() < 64 * 1024);
}

#[tokio::test]
async fn test_reads_flow_while_write_is_blocked() {
    let (transport, _dialed) = MockTransport::new();
    let (manager, mut rx) = new_manager(&transport);

    manager.start();
    let mut remote = transport.inject_inbound("AA:BB");
    events_until_state(&mut rx, SessionState::Connected).await;

    let payload = vec![0x42u8; 64 * 1024];
    manager.write(payload.clone());
    remote.write_all(b"hi").await.unwrap();
    assert_eq!(
        next_event(&mut rx).await,
        SessionEvent::InboundFrame(InboundFrame::new(b"hi".to_vec()))
    );

    let mut received = vec![0u8; payload.len()];
    remote.read_exact(&mut received).await.unwrap();
    assert_eq!(received, payload);
    assert_eq!(
        next_event(&mut rx).await,
        SessionEvent::OutboundFrame { payload }
    );
}

#[tokio::test]
async fn test_write_failure_warns_and_keeps_session() {
    let (transport, _dialed) = MockTransport::new();
    let (manager, mut rx) = new_manager(&transport);

    manager.start();
    transport.inject_inbound_socket("AA:BB", Box::new(BrokenWriteSocket));
    events_until_state(&mut rx, SessionState::Connected).await;

    for _ in 0..2 {
        manager.write("hello");
        assert!(matches!(
            next_event(&mut rx).await,
            SessionEvent::Warning {
                warning: SessionWarning::WriteFailed(_)
            }
        ));
        expect_quiet(&mut rx).await;
    }

    assert_eq!(manager.current_state(), SessionState::Connected);
    assert!(manager.active_workers().pump);
}

#[tokio::test]
async fn test_failed_dial_warns_when_endpoint_cannot_reopen() {
    let (transport, _dialed) = MockTransport::new();
    transport.set_listen_fails(true);
    transport.script_dial("11:22", DialBehavior::Fail);
    let (manager, mut rx) = new_manager(&transport);

    manager.connect("11:22");
    assert_eq!(next_event(&mut rx).await, state(SessionState::Connecting));
    assert_eq!(next_event(&mut rx).await, SessionEvent::ConnectionFailed);
    assert_eq!(next_event(&mut rx).await, state(SessionState::Listening));
    assert!(matches!(
        next_event(&mut rx).await,
        SessionEvent::Warning {
            warning: SessionWarning::EndpointUnavailable(_)
        }
    ));
    assert_eq!(transport.listen_calls(), 1);
}

#[tokio::test]
async fn test_accept_error_warns_and_frees_listener() {
    let (transport, _dialed) = MockTransport::new();
    let (manager, mut rx) = new_manager(&transport);

    manager.start();
    assert_eq!(next_event(&mut rx).await, state(SessionState::Listening));

    transport.inject_accept_error();
    assert!(matches!(
        next_event(&mut rx).await,
        SessionEvent::Warning {
            warning: SessionWarning::EndpointUnavailable(_)
        }
    ));
    expect_quiet(&mut rx).await;
    assert_eq!(manager.current_state(), SessionState::Listening);
    assert_eq!(manager.active_workers().count(), 0);

    manager.start();
    next_event(&mut rx).await;
    let _remote = transport.inject_inbound("AA:BB");
    events_until_state(&mut rx, SessionState::Connected).await;
}

// ----------------------------------------------------------------------------
// Exclusivity under arbitrary control sequences
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Op {
    Start,
    Connect(bool),
    Stop,
    Inbound,
    Write,
    Settle,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Start),
        any::<bool>().prop_map(Op::Connect),
        Just(Op::Stop),
        Just(Op::Inbound),
        Just(Op::Write),
        Just(Op::Settle),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_at_most_one_worker_owns_the_session(ops in prop::collection::vec(op_strategy(), 1..24)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let (transport, _dialed) = MockTransport::new();
            let (manager, _rx) = new_manager(&transport);
            let mut remotes = Vec::new();

            for op in ops {
                match op.clone() {
                    Op::Start => manager.start(),
                    Op::Connect(succeed) => {
                        let behavior = if succeed { DialBehavior::Succeed } else { DialBehavior::Fail };
                        transport.script_dial("peer", behavior);
                        manager.connect("peer");
                    }
                    Op::Stop => manager.stop(),
                    Op::Inbound => remotes.push(transport.inject_inbound("AA:BB")),
                    Op::Write => manager.write("x"),
                    Op::Settle => {
                        for _ in 0..8 {
                            tokio::task::yield_now().await;
                        }
                    }
                }
                let workers = manager.active_workers();
                assert!(workers.count() <= 1, "workers {:?} after {:?}", workers, op);
                tokio::task::yield_now().await;
                assert!(manager.active_workers().count() <= 1);
            }

            manager.stop();
            assert_eq!(manager.current_state(), SessionState::Idle);
            assert_eq!(manager.active_workers().count(), 0);
        });
    }
}
