//! Link manager lifecycle scenarios over socket pairs and stub dialers.
#![cfg(unix)]

use std::collections::{HashMap, VecDeque};
use std::io::{Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Mutex;
use std::time::Duration;

use roverlink_link::{
    event_channel, Dialer, DriveCommand, EventSender, LinkEvent, LinkManager, LinkState, Notice,
};
use roverlink_transport::{LinkStream, TransportError};

const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

/// Hands out pre-arranged dial outcomes in order.
struct QueueDialer {
    outcomes: Mutex<VecDeque<roverlink_transport::Result<LinkStream>>>,
}

impl QueueDialer {
    fn with(outcomes: Vec<roverlink_transport::Result<LinkStream>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
        }
    }
}

impl Dialer for QueueDialer {
    fn dial(&self, address: &str) -> roverlink_transport::Result<LinkStream> {
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Dial {
                    address: address.to_string(),
                    source: std::io::Error::other("no outcome queued"),
                })
            })
    }
}

/// Blocks each dial until the test releases its gate, so connection
/// attempts can be left in flight deliberately. Gates are keyed by address
/// because the two connector threads race to reach the dialer.
struct GateDialer {
    gates: Mutex<HashMap<String, Receiver<roverlink_transport::Result<LinkStream>>>>,
}

impl GateDialer {
    fn with_addresses(
        addresses: &[&str],
    ) -> (
        Self,
        HashMap<String, mpsc::Sender<roverlink_transport::Result<LinkStream>>>,
    ) {
        let mut gates = HashMap::new();
        let mut senders = HashMap::new();
        for address in addresses {
            let (tx, rx) = mpsc::channel();
            gates.insert((*address).to_string(), rx);
            senders.insert((*address).to_string(), tx);
        }
        (
            Self {
                gates: Mutex::new(gates),
            },
            senders,
        )
    }
}

impl Dialer for GateDialer {
    fn dial(&self, address: &str) -> roverlink_transport::Result<LinkStream> {
        let gate = self
            .gates
            .lock()
            .unwrap()
            .remove(address)
            .expect("no gate for this address");
        gate.recv()
            .unwrap_or_else(|_| Err(TransportError::Io(std::io::Error::other("gate dropped"))))
    }
}

fn pair() -> (LinkStream, UnixStream) {
    let (near, far) = UnixStream::pair().unwrap();
    (LinkStream::from(near), far)
}

fn manager_with(dialer: impl Dialer) -> (LinkManager, Receiver<LinkEvent>) {
    let (events, rx): (EventSender, Receiver<LinkEvent>) = event_channel();
    (LinkManager::new(dialer, events), rx)
}

fn next_event(rx: &Receiver<LinkEvent>) -> LinkEvent {
    rx.recv_timeout(EVENT_TIMEOUT).expect("expected an event")
}

fn assert_no_event(rx: &Receiver<LinkEvent>) {
    match rx.recv_timeout(Duration::from_millis(150)) {
        Err(RecvTimeoutError::Timeout) => {}
        other => panic!("expected no event, got {other:?}"),
    }
}

/// Drives the happy path end to end: connect, send a command, receive a
/// status message, stop.
#[test]
fn connect_send_receive_stop() {
    let (near, mut far) = pair();
    let (manager, rx) = manager_with(QueueDialer::with(vec![Ok(near)]));

    manager.connect("AA:BB");
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connecting));
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connected));
    assert_eq!(next_event(&rx), LinkEvent::PeerIdentified("AA:BB".to_string()));
    assert_eq!(manager.state(), LinkState::Connected);

    manager.send(&DriveCommand::new(1, 128, 0, 64));
    let mut buf = [0u8; 12];
    far.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"S1,128,0,64E");

    far.write_all(b"S9,9E").unwrap();
    assert_eq!(next_event(&rx), LinkEvent::MessageReceived("9,9".to_string()));

    manager.stop();
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Idle));
    assert_eq!(manager.state(), LinkState::Idle);

    // The far end observes the session close.
    let mut byte = [0u8; 1];
    assert_eq!(far.read(&mut byte).unwrap(), 0);

    // Stopping tore down the receive loop without a spurious loss report.
    assert_no_event(&rx);
}

#[test]
fn connect_failure_reports_and_returns_to_idle() {
    let dialer = QueueDialer::with(vec![Err(TransportError::Dial {
        address: "AA:BB".to_string(),
        source: std::io::Error::other("refused"),
    })]);
    let (manager, rx) = manager_with(dialer);

    manager.connect("AA:BB");
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connecting));
    assert_eq!(next_event(&rx), LinkEvent::Notice(Notice::ConnectFailed));
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Idle));
    assert_eq!(manager.state(), LinkState::Idle);
}

#[test]
fn send_is_discarded_while_idle() {
    let (manager, rx) = manager_with(QueueDialer::with(vec![]));

    manager.send(&DriveCommand::new(1, 255, 1, 255));
    assert_eq!(manager.state(), LinkState::Idle);
    assert_no_event(&rx);
}

#[test]
fn send_is_discarded_while_connecting() {
    let (dialer, _gates) = GateDialer::with_addresses(&["AA:BB"]);
    let (manager, rx) = manager_with(dialer);

    manager.connect("AA:BB");
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connecting));

    manager.send(&DriveCommand::new(1, 255, 1, 255));
    assert_eq!(manager.state(), LinkState::Connecting);
    assert_no_event(&rx);
}

#[test]
fn write_fault_emits_exactly_one_link_lost() {
    let (near, far) = pair();
    let (manager, rx) = manager_with(QueueDialer::with(vec![Ok(near)]));

    manager.connect("AA:BB");
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connecting));
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connected));
    assert_eq!(next_event(&rx), LinkEvent::PeerIdentified("AA:BB".to_string()));

    // Break the write direction only; the receive loop stays blocked, so the
    // fault must be detected and reported by the send path.
    far.shutdown(Shutdown::Read).unwrap();

    manager.send(&DriveCommand::new(0, 64, 1, 200));
    assert_eq!(next_event(&rx), LinkEvent::Notice(Notice::LinkLost));
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Idle));
    assert_eq!(manager.state(), LinkState::Idle);

    // The receive loop exits without reporting the loss a second time.
    assert_no_event(&rx);
}

#[test]
fn peer_close_emits_link_lost_from_receive_loop() {
    let (near, far) = pair();
    let (manager, rx) = manager_with(QueueDialer::with(vec![Ok(near)]));

    manager.connect("AA:BB");
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connecting));
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connected));
    assert_eq!(next_event(&rx), LinkEvent::PeerIdentified("AA:BB".to_string()));

    drop(far);
    assert_eq!(next_event(&rx), LinkEvent::Notice(Notice::LinkLost));
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Idle));
    assert_eq!(manager.state(), LinkState::Idle);
    assert_no_event(&rx);
}

#[test]
fn stop_while_connecting_discards_pending_dial() {
    let (dialer, gates) = GateDialer::with_addresses(&["AA:BB"]);
    let (manager, rx) = manager_with(dialer);

    let (near, mut far) = pair();

    manager.connect("AA:BB");
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connecting));

    manager.stop();
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Idle));
    assert_eq!(manager.state(), LinkState::Idle);

    // The dial completes after the stop; its stream must be closed and the
    // result discarded without touching state.
    gates["AA:BB"].send(Ok(near)).unwrap();
    let mut byte = [0u8; 1];
    assert_eq!(far.read(&mut byte).unwrap(), 0);

    assert_eq!(manager.state(), LinkState::Idle);
    assert_no_event(&rx);
}

#[test]
fn newer_connect_supersedes_pending_attempt() {
    let (dialer, gates) = GateDialer::with_addresses(&["first", "second"]);
    let (manager, rx) = manager_with(dialer);

    let (near1, mut far1) = pair();
    let (near2, _far2) = pair();

    manager.connect("first");
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connecting));

    manager.connect("second");
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connecting));

    // The second (current) attempt completes and wins.
    gates["second"].send(Ok(near2)).unwrap();
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connected));
    assert_eq!(
        next_event(&rx),
        LinkEvent::PeerIdentified("second".to_string())
    );
    assert_eq!(manager.state(), LinkState::Connected);

    // The first attempt completes late; its stream must be closed and its
    // result discarded without touching state.
    gates["first"].send(Ok(near1)).unwrap();
    let mut byte = [0u8; 1];
    assert_eq!(far1.read(&mut byte).unwrap(), 0);

    assert_eq!(manager.state(), LinkState::Connected);
    assert_no_event(&rx);
}

#[test]
fn connect_replaces_live_session() {
    let (near1, mut far1) = pair();
    let (near2, mut far2) = pair();
    let (manager, rx) = manager_with(QueueDialer::with(vec![Ok(near1), Ok(near2)]));

    manager.connect("first");
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connecting));
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connected));
    assert_eq!(next_event(&rx), LinkEvent::PeerIdentified("first".to_string()));

    manager.connect("second");
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connecting));
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connected));
    assert_eq!(
        next_event(&rx),
        LinkEvent::PeerIdentified("second".to_string())
    );

    // The first session was closed when the second attempt began.
    let mut byte = [0u8; 1];
    assert_eq!(far1.read(&mut byte).unwrap(), 0);

    manager.send(&DriveCommand::stop());
    let mut buf = [0u8; 9];
    far2.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"S0,0,0,0E");
}

#[test]
fn stop_while_idle_emits_not_connected_only() {
    let (manager, rx) = manager_with(QueueDialer::with(vec![]));

    manager.stop();
    assert_eq!(next_event(&rx), LinkEvent::Notice(Notice::NotConnected));
    assert_eq!(manager.state(), LinkState::Idle);
    assert_no_event(&rx);
}

#[test]
fn start_forces_idle_and_is_idempotent() {
    let (near, mut far) = pair();
    let (manager, rx) = manager_with(QueueDialer::with(vec![Ok(near)]));

    manager.start();
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Idle));

    manager.connect("AA:BB");
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connecting));
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connected));
    assert_eq!(next_event(&rx), LinkEvent::PeerIdentified("AA:BB".to_string()));

    manager.start();
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Idle));

    let mut byte = [0u8; 1];
    assert_eq!(far.read(&mut byte).unwrap(), 0);
    assert_no_event(&rx);
}

#[test]
fn dropping_the_manager_closes_the_session() {
    let (near, mut far) = pair();
    let (manager, rx) = manager_with(QueueDialer::with(vec![Ok(near)]));

    manager.connect("AA:BB");
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connecting));
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connected));
    assert_eq!(next_event(&rx), LinkEvent::PeerIdentified("AA:BB".to_string()));

    drop(manager);
    let mut byte = [0u8; 1];
    assert_eq!(far.read(&mut byte).unwrap(), 0);
    assert_no_event(&rx);
}

#[test]
fn inbound_messages_preserve_arrival_order() {
    let (near, mut far) = pair();
    let (manager, rx) = manager_with(QueueDialer::with(vec![Ok(near)]));

    manager.connect("AA:BB");
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connecting));
    assert_eq!(next_event(&rx), LinkEvent::StateChanged(LinkState::Connected));
    assert_eq!(next_event(&rx), LinkEvent::PeerIdentified("AA:BB".to_string()));

    far.write_all(b"S1,10,1,10ES0,20,0,20ES1,30,1,30E").unwrap();
    assert_eq!(
        next_event(&rx),
        LinkEvent::MessageReceived("1,10,1,10".to_string())
    );
    assert_eq!(
        next_event(&rx),
        LinkEvent::MessageReceived("0,20,0,20".to_string())
    );
    assert_eq!(
        next_event(&rx),
        LinkEvent::MessageReceived("1,30,1,30".to_string())
    );
}
