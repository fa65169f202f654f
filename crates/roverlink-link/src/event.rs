use std::fmt;
use std::sync::mpsc;

/// Connection state of the link. Exactly one instance exists per
/// [`LinkManager`](crate::LinkManager), guarded by its mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Nothing active.
    Idle,
    /// An outbound connection attempt is in flight.
    Connecting,
    /// A session is live.
    Connected,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkState::Idle => "idle",
            LinkState::Connecting => "connecting",
            LinkState::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// One-shot advisory notices for the caller (the original surfaced these as
/// toasts).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// `stop` was called with nothing to stop.
    NotConnected,
    /// The dial could not complete. Not retried automatically.
    ConnectFailed,
    /// A read or write on the live session failed. No automatic reconnect.
    LinkLost,
}

/// Events raised by the link, delivered in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    StateChanged(LinkState),
    MessageReceived(String),
    PeerIdentified(String),
    Notice(Notice),
}

/// Sending half of the upward notification channel.
///
/// A caller that stopped listening must never break the link, so send
/// failures (receiver dropped) are ignored.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<LinkEvent>,
}

impl EventSender {
    pub fn new(tx: mpsc::Sender<LinkEvent>) -> Self {
        Self { tx }
    }

    pub fn emit(&self, event: LinkEvent) {
        let _ = self.tx.send(event);
    }

    pub fn state_changed(&self, state: LinkState) {
        self.emit(LinkEvent::StateChanged(state));
    }

    pub fn message_received(&self, text: String) {
        self.emit(LinkEvent::MessageReceived(text));
    }

    pub fn peer_identified(&self, name: String) {
        self.emit(LinkEvent::PeerIdentified(name));
    }

    pub fn notice(&self, notice: Notice) {
        self.emit(LinkEvent::Notice(notice));
    }
}

/// Create the upward notification channel.
pub fn event_channel() -> (EventSender, mpsc::Receiver<LinkEvent>) {
    let (tx, rx) = mpsc::channel();
    (EventSender::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_arrive_in_emission_order() {
        let (tx, rx) = event_channel();
        tx.state_changed(LinkState::Connecting);
        tx.state_changed(LinkState::Connected);
        tx.peer_identified("AA:BB".to_string());
        tx.message_received("9,9".to_string());

        assert_eq!(
            rx.recv().unwrap(),
            LinkEvent::StateChanged(LinkState::Connecting)
        );
        assert_eq!(
            rx.recv().unwrap(),
            LinkEvent::StateChanged(LinkState::Connected)
        );
        assert_eq!(
            rx.recv().unwrap(),
            LinkEvent::PeerIdentified("AA:BB".to_string())
        );
        assert_eq!(
            rx.recv().unwrap(),
            LinkEvent::MessageReceived("9,9".to_string())
        );
    }

    #[test]
    fn dropped_receiver_does_not_panic() {
        let (tx, rx) = event_channel();
        drop(rx);
        tx.notice(Notice::LinkLost);
    }
}
