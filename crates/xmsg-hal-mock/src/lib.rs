//! Mock host implementation for testing the xmsg bridge
//!
//! This provides an in-process implementation of the [`HostTransport`] trait
//! that behaves like the browser runtime's one-shot messaging, so the bridge
//! can be unit tested without a browser.
//!
//! Modelled runtime behaviour:
//! - Delivery is asynchronous: listeners run on a later turn of the event loop
//! - No listener: the completion fails with [`NO_RECEIVER`]
//! - Every listener returned [`ChannelDirective::Close`] without replying:
//!   the completion fails with [`PORT_CLOSED`]
//! - The first reply wins; replies after the channel closed are ignored
//! - [`MockHost::teardown`] destroys the context: pending completions are
//!   never invoked
//!
//! Fault injection: duplicate completion invocations and forced delivery
//! failures, to exercise the bridge's guards.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::rc::Rc;

use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;
use serde_json::Value;
use xmsg_hal::{
    ChannelDirective, Completion, DiagnosticSink, HostError, HostTransport, Level, Listener,
    LocalTask, ReplyFn, SenderMetadata,
};

/// Runtime message when nothing is listening in the target context
pub const NO_RECEIVER: &str = "Could not establish connection. Receiving end does not exist.";

/// Runtime message when listeners returned without keeping the channel open
pub const PORT_CLOSED: &str = "The message port closed before a response was received.";

/// Outcome of one delivery as seen by the sending side
pub type DeliveryOutcome = Result<Option<Value>, HostError>;

/// Reply channel state for one delivery
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    Open,
    Closed,
}

/// Mock host for unit testing
///
/// Owns a `LocalPool`; tests drive it with [`MockHost::run_until_stalled`]
/// or [`MockHost::run_until`].
pub struct MockHost {
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
    state: Rc<RefCell<MockState>>,
}

struct MockState {
    listeners: Vec<Listener>,
    /// Metadata attached to every delivery
    metadata: SenderMetadata,
    channels: Vec<Rc<RefCell<MockChannel>>>,
    /// Completions held after teardown so they are never invoked nor dropped
    abandoned: Vec<Completion>,
    injected_failures: VecDeque<String>,
    duplicate_completions: bool,
    torn_down: bool,
    deliveries: usize,
}

/// Simulated reply channel
struct MockChannel {
    message: Value,
    state: ChannelState,
    completion: Option<Completion>,
    reply_calls: usize,
    late_replies: usize,
}

impl MockHost {
    /// Create a new mock host with no listeners
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            pool: RefCell::new(pool),
            spawner,
            state: Rc::new(RefCell::new(MockState {
                listeners: Vec::new(),
                metadata: SenderMetadata::default(),
                channels: Vec::new(),
                abandoned: Vec::new(),
                injected_failures: VecDeque::new(),
                duplicate_completions: false,
                torn_down: false,
                deliveries: 0,
            })),
        }
    }

    /// Create a mock host that attaches `metadata` to every delivery
    pub fn with_metadata(metadata: SenderMetadata) -> Self {
        let host = Self::new();
        host.state.borrow_mut().metadata = metadata;
        host
    }

    // === Event loop ===

    /// Run every task that can make progress
    pub fn run_until_stalled(&self) {
        self.pool.borrow_mut().run_until_stalled();
    }

    /// Drive the event loop until `future` completes
    pub fn run_until<F: Future>(&self, future: F) -> F::Output {
        self.pool.borrow_mut().run_until(future)
    }

    // === Fault injection ===

    /// Make the host invoke every completion callback twice
    pub fn set_duplicate_completions(&self, enabled: bool) {
        self.state.borrow_mut().duplicate_completions = enabled;
    }

    /// Fail the next delivery with `message` before any listener sees it
    pub fn inject_delivery_failure(&self, message: impl Into<String>) {
        self.state
            .borrow_mut()
            .injected_failures
            .push_back(message.into());
    }

    /// Destroy the context.
    ///
    /// Listeners are dropped, open channels are closed and their completions
    /// are never invoked. Later deliveries never complete either.
    pub fn teardown(&self) {
        let mut state = self.state.borrow_mut();
        state.torn_down = true;
        state.listeners.clear();

        let mut abandoned = Vec::new();
        for channel in &state.channels {
            let mut channel = channel.borrow_mut();
            channel.state = ChannelState::Closed;
            if let Some(completion) = channel.completion.take() {
                abandoned.push(completion);
            }
        }
        state.abandoned.extend(abandoned);
    }

    // === Probing ===

    /// Deliver `message` with a recording completion instead of a bridge sender
    pub fn probe_delivery(&self, message: Value) -> DeliveryProbe {
        let probe = DeliveryProbe::default();
        let outcomes = probe.outcomes.clone();
        self.deliver(
            message,
            Box::new(move |outcome| outcomes.borrow_mut().push(outcome)),
        );
        probe
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    /// Number of `deliver` calls, including failed ones
    pub fn delivery_count(&self) -> usize {
        self.state.borrow().deliveries
    }

    /// How many times the reply callback was invoked, per delivery
    pub fn reply_calls(&self) -> Vec<usize> {
        self.state
            .borrow()
            .channels
            .iter()
            .map(|channel| channel.borrow().reply_calls)
            .collect()
    }

    /// Replies that arrived after their channel had closed
    pub fn late_reply_count(&self) -> usize {
        self.state
            .borrow()
            .channels
            .iter()
            .map(|channel| channel.borrow().late_replies)
            .sum()
    }

    /// Channels still waiting for a reply
    pub fn open_channel_count(&self) -> usize {
        self.state
            .borrow()
            .channels
            .iter()
            .filter(|channel| channel.borrow().state == ChannelState::Open)
            .count()
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostTransport for MockHost {
    fn deliver(&self, message: Value, on_complete: Completion) {
        let mut state = self.state.borrow_mut();
        state.deliveries += 1;

        if state.torn_down {
            state.abandoned.push(on_complete);
            return;
        }

        let channel = Rc::new(RefCell::new(MockChannel {
            message,
            state: ChannelState::Open,
            completion: Some(on_complete),
            reply_calls: 0,
            late_replies: 0,
        }));
        state.channels.push(channel.clone());
        drop(state);

        let shared = self.state.clone();
        let _ = self
            .spawner
            .spawn_local(async move { dispatch(&shared, &channel) });
    }

    fn add_listener(&self, listener: Listener) {
        self.state.borrow_mut().listeners.push(listener);
    }

    fn spawn_local(&self, task: LocalTask) {
        let _ = self.spawner.spawn_local(task);
    }
}

/// Hand one delivery to every listener, then close the channel if nobody
/// promised a deferred reply.
fn dispatch(state: &Rc<RefCell<MockState>>, channel: &Rc<RefCell<MockChannel>>) {
    let injected = state.borrow_mut().injected_failures.pop_front();
    if let Some(reason) = injected {
        complete(state, channel, Err(HostError::new(reason)));
        return;
    }

    let (listeners, metadata) = {
        let state = state.borrow();
        (state.listeners.clone(), state.metadata.clone())
    };
    if listeners.is_empty() {
        complete(state, channel, Err(HostError::new(NO_RECEIVER)));
        return;
    }

    let message = channel.borrow().message.clone();
    let mut keep_open = false;
    for listener in listeners {
        let reply = reply_fn(state.clone(), channel.clone());
        let directive: ChannelDirective = listener(message.clone(), metadata.clone(), reply);
        keep_open |= directive.keeps_open();
    }

    let still_open = channel.borrow().state == ChannelState::Open;
    if still_open && !keep_open {
        complete(state, channel, Err(HostError::new(PORT_CLOSED)));
    }
}

fn reply_fn(state: Rc<RefCell<MockState>>, channel: Rc<RefCell<MockChannel>>) -> ReplyFn {
    Box::new(move |value: Option<Value>| {
        let open = {
            let mut ch = channel.borrow_mut();
            ch.reply_calls += 1;
            if ch.state == ChannelState::Closed {
                ch.late_replies += 1;
            }
            ch.state == ChannelState::Open
        };
        if open {
            complete(&state, &channel, Ok(value));
        }
    })
}

fn complete(
    state: &Rc<RefCell<MockState>>,
    channel: &Rc<RefCell<MockChannel>>,
    outcome: DeliveryOutcome,
) {
    let completion = {
        let mut ch = channel.borrow_mut();
        ch.state = ChannelState::Closed;
        ch.completion.take()
    };
    let duplicate = state.borrow().duplicate_completions;

    if let Some(mut completion) = completion {
        if duplicate {
            completion(outcome.clone());
        }
        completion(outcome);
    }
}

/// Records every completion invocation of a probed delivery
#[derive(Clone, Default)]
pub struct DeliveryProbe {
    outcomes: Rc<RefCell<Vec<DeliveryOutcome>>>,
}

impl DeliveryProbe {
    /// All outcomes the host reported, in order
    pub fn outcomes(&self) -> Vec<DeliveryOutcome> {
        self.outcomes.borrow().clone()
    }

    /// The only outcome, if exactly one was reported
    pub fn single(&self) -> Option<DeliveryOutcome> {
        let outcomes = self.outcomes.borrow();
        match outcomes.as_slice() {
            [outcome] => Some(outcome.clone()),
            _ => None,
        }
    }
}

/// Diagnostic sink that keeps every record in memory
#[derive(Default)]
pub struct RecordingSink {
    entries: RefCell<Vec<(Level, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all captured records
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries.borrow().clone()
    }

    /// Check if a record containing `substr` was captured
    pub fn has_entry_containing(&self, substr: &str) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|(_, message)| message.contains(substr))
    }

    /// Number of records captured at `level`
    pub fn count_at(&self, level: Level) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|(recorded, _)| *recorded == level)
            .count()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl DiagnosticSink for RecordingSink {
    fn record(&self, level: Level, message: &str) {
        self.entries.borrow_mut().push((level, message.to_string()));
    }
}
