use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use roverlink_frame::MessageReader;
use roverlink_transport::LinkStream;
use tracing::{debug, warn};

use crate::command::DriveCommand;
use crate::dialer::Dialer;
use crate::event::{EventSender, LinkState, Notice};
use crate::session::Session;

/// Owns the connection lifecycle: dial, session, receive thread, teardown.
///
/// All entry points are mutually exclusive over the shared state — one mutex
/// guards the state enum, the live session, and the generation counter that
/// invalidates superseded workers. The two worker threads (connector, receive
/// loop) never mutate that state except through the same mutex, and they
/// communicate outward only through the event channel.
///
/// Cancellation is cooperative: bumping the generation makes a worker's
/// result stale, and closing the session's underlying handle unblocks a
/// receive thread stuck in a read. There is no other cancellation primitive.
pub struct LinkManager {
    shared: Arc<Shared>,
}

struct Shared {
    inner: Mutex<Inner>,
    events: EventSender,
    dialer: Box<dyn Dialer>,
}

struct Inner {
    state: LinkState,
    /// Bumped whenever active workers are cancelled. A connector or receive
    /// loop carrying an older generation must not touch state.
    generation: u64,
    session: Option<Session>,
}

impl LinkManager {
    /// Create a manager in the `Idle` state. Events flow to `events` in
    /// emission order.
    pub fn new(dialer: impl Dialer, events: EventSender) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: LinkState::Idle,
                    generation: 0,
                    session: None,
                }),
                events,
                dialer: Box::new(dialer),
            }),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> LinkState {
        self.shared.lock().state
    }

    /// Cancel any active connector or receive loop and force `Idle`.
    ///
    /// Idempotent; safe to call with nothing active.
    pub fn start(&self) {
        let mut inner = self.shared.lock();
        inner.cancel_workers();
        self.shared.set_state(&mut inner, LinkState::Idle);
    }

    /// Begin an outbound connection attempt to `address`.
    ///
    /// Any prior attempt or live session is cancelled first — at most one
    /// connector and one receive loop ever run, and only the latest
    /// attempt's outcome can transition state. The dial itself runs on a
    /// dedicated connector thread; this call returns immediately.
    pub fn connect(&self, address: &str) {
        let generation = {
            let mut inner = self.shared.lock();
            inner.cancel_workers();
            self.shared.set_state(&mut inner, LinkState::Connecting);
            inner.generation
        };

        let shared = Arc::clone(&self.shared);
        let address = address.to_string();
        let spawned = thread::Builder::new()
            .name("roverlink-connector".to_string())
            .spawn(move || {
                debug!(%address, "dialing peer");
                match shared.dialer.dial(&address) {
                    Ok(stream) => shared.dial_succeeded(generation, address, stream),
                    Err(err) => shared.dial_failed(generation, &address, &err),
                }
            });

        if let Err(err) = spawned {
            warn!(error = %err, "failed to spawn connector thread");
            let mut inner = self.shared.lock();
            if inner.generation == generation {
                self.shared.events.notice(Notice::ConnectFailed);
                self.shared.set_state(&mut inner, LinkState::Idle);
            }
        }
    }

    /// Frame and send a command through the live session.
    ///
    /// Silently discarded unless the state is `Connected`. A write fault
    /// tears the session down, transitions to `Idle`, and emits exactly one
    /// link-lost notice; faults surface on the event channel, not here.
    pub fn send(&self, command: &DriveCommand) {
        let mut inner = self.shared.lock();
        if inner.state != LinkState::Connected {
            return;
        }
        let Some(session) = inner.session.as_mut() else {
            return;
        };

        if let Err(err) = session.write(&command.to_wire()) {
            warn!(error = %err, "write fault, dropping link");
            // The receive loop will fail its read once the session closes;
            // bumping the generation keeps it from reporting a second loss.
            inner.cancel_workers();
            self.shared.events.notice(Notice::LinkLost);
            self.shared.set_state(&mut inner, LinkState::Idle);
        }
    }

    /// Tear the link down.
    ///
    /// Cancels the connector and receive loop and closes the session. When
    /// nothing was active, emits a not-connected notice instead of a
    /// redundant state transition.
    pub fn stop(&self) {
        let mut inner = self.shared.lock();
        inner.cancel_workers();
        if inner.state == LinkState::Idle {
            self.shared.events.notice(Notice::NotConnected);
        } else {
            self.shared.set_state(&mut inner, LinkState::Idle);
        }
    }
}

impl Drop for LinkManager {
    fn drop(&mut self) {
        // Same teardown as `stop`, without the notice chatter.
        self.shared.lock().cancel_workers();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A worker panicking while holding the lock leaves state that is
        // still sound to tear down; don't compound the failure.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, inner: &mut Inner, state: LinkState) {
        inner.state = state;
        debug!(%state, "link state changed");
        self.events.state_changed(state);
    }

    /// Connector outcome: the dial completed.
    fn dial_succeeded(self: &Arc<Self>, generation: u64, address: String, stream: LinkStream) {
        let mut inner = self.lock();
        if inner.generation != generation {
            // A newer connect or a stop superseded this attempt.
            drop(inner);
            debug!(%address, "discarding stale dial result");
            let _ = stream.shutdown();
            return;
        }

        match Session::open(stream) {
            Ok((session, reader)) => {
                inner.session = Some(session);
                self.set_state(&mut inner, LinkState::Connected);
                self.events.peer_identified(address);
                self.spawn_receive_loop(&mut inner, generation, reader);
            }
            Err(err) => {
                warn!(%address, error = %err, "session setup failed");
                self.events.notice(Notice::ConnectFailed);
                self.set_state(&mut inner, LinkState::Idle);
            }
        }
    }

    /// Connector outcome: the dial failed.
    fn dial_failed(&self, generation: u64, address: &str, err: &roverlink_transport::TransportError) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }
        debug!(%address, error = %err, "connect failed");
        self.events.notice(Notice::ConnectFailed);
        self.set_state(&mut inner, LinkState::Idle);
    }

    fn spawn_receive_loop(
        self: &Arc<Self>,
        inner: &mut Inner,
        generation: u64,
        reader: MessageReader<LinkStream>,
    ) {
        let shared = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("roverlink-receiver".to_string())
            .spawn(move || shared.run_receive_loop(generation, reader));

        if let Err(err) = spawned {
            warn!(error = %err, "failed to spawn receive thread");
            inner.cancel_workers();
            self.events.notice(Notice::LinkLost);
            self.set_state(inner, LinkState::Idle);
        }
    }

    /// Runs on the receive thread for the lifetime of one session.
    fn run_receive_loop(&self, generation: u64, mut reader: MessageReader<LinkStream>) {
        loop {
            match reader.read_message() {
                Ok(text) => {
                    // Emit under the lock so message order stays interleaved
                    // correctly with state transitions.
                    let inner = self.lock();
                    if inner.generation != generation {
                        return;
                    }
                    self.events.message_received(text);
                }
                Err(err) => {
                    let mut inner = self.lock();
                    if inner.generation != generation {
                        // Cancelled from outside; the owner already reported
                        // whatever there was to report.
                        return;
                    }
                    debug!(error = %err, "read fault, link lost");
                    inner.cancel_workers();
                    self.events.notice(Notice::LinkLost);
                    self.set_state(&mut inner, LinkState::Idle);
                    return;
                }
            }
        }
    }
}

impl Inner {
    /// Invalidate any in-flight connector and receive loop, and close the
    /// live session. Closing the handle is what unblocks a reader stuck in
    /// a blocking read.
    fn cancel_workers(&mut self) {
        self.generation += 1;
        if let Some(session) = self.session.take() {
            session.close();
        }
    }
}
