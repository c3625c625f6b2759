#![forbid(unsafe_code)]

//! Debounced value delivery: [`ChangeTimer`] and [`ExecutionContext`].
//!
//! A `ChangeTimer` defers delivery of a pending `(old, new)` value pair by a
//! fixed delay, coalescing rapid successive changes into a single delivery:
//! only the payload current at expiry survives.
//!
//! # State machine
//!
//! ```text
//! Disabled --enable--> Armed-idle --restart--> Armed-pending
//!     ^                    ^                       |
//!     |                    +------expiry-----------+
//!     +----disable (from any state)
//! ```
//!
//! `restart` while pending re-arms the delay window and overwrites the
//! payload. `restart` while Disabled delivers synchronously with no delay
//! (pass-through). `disable` cancels any pending delivery.
//!
//! # Threading
//!
//! A background worker owns the delay clock. On expiry the delivery closure
//! runs **on the worker thread** unless an [`ExecutionContext`] was supplied
//! at `enable` time, in which case the closure is posted through the context
//! instead. Consumers that tie cell subscribers to a UI thread should always
//! supply a context; the direct worker-thread delivery is a documented
//! hazard, kept for parity with headless use.

use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError, Weak, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use tracing::trace;

/// Marshals zero-argument actions onto a designated logical context.
///
/// The only guarantee is "runs on the context's thread of control,
/// eventually"; ordering between posts from the same source is expected but
/// not enforced by this trait.
pub trait ExecutionContext: Send + Sync {
    /// Schedule `action` to run on the context.
    fn post(&self, action: Box<dyn FnOnce() + Send>);
}

enum TimerMsg {
    Restart,
    Disable,
}

struct TimerSlot<T> {
    pending: Option<(T, T)>,
    armed: Option<Sender<TimerMsg>>,
    context: Option<Arc<dyn ExecutionContext>>,
}

struct TimerCore<T: 'static> {
    deliver: Arc<dyn Fn(T, T) + Send + Sync>,
    slot: Mutex<TimerSlot<T>>,
}

impl<T: Send + 'static> TimerCore<T> {
    fn lock(&self) -> std::sync::MutexGuard<'_, TimerSlot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver the pending payload, if any. Exactly one delivery per expiry:
    /// the payload is taken out of the slot before the closure runs.
    fn fire(&self) {
        let (payload, context) = {
            let mut slot = self.lock();
            (slot.pending.take(), slot.context.clone())
        };
        let Some((old, new)) = payload else {
            return;
        };
        match context {
            Some(context) => {
                let deliver = Arc::clone(&self.deliver);
                context.post(Box::new(move || (deliver.as_ref())(old, new)));
            }
            None => (self.deliver.as_ref())(old, new),
        }
    }
}

/// An armed-or-disarmed debounce slot holding the latest `(old, new)` pair
/// awaiting delivery.
///
/// Cloning yields a handle to the same slot.
pub struct ChangeTimer<T: 'static> {
    core: Arc<TimerCore<T>>,
}

impl<T: 'static> Clone for ChangeTimer<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: Send + 'static> ChangeTimer<T> {
    /// Create a disabled timer that hands payloads to `deliver`.
    #[must_use]
    pub fn new(deliver: impl Fn(T, T) + Send + Sync + 'static) -> Self {
        Self {
            core: Arc::new(TimerCore {
                deliver: Arc::new(deliver),
                slot: Mutex::new(TimerSlot {
                    pending: None,
                    armed: None,
                    context: None,
                }),
            }),
        }
    }

    /// Arm the timer with a delay and an optional execution context for
    /// delivery. Re-enabling replaces any previous arming and discards a
    /// pending payload.
    pub fn enable(&self, delay: Duration, context: Option<Arc<dyn ExecutionContext>>) {
        self.disable();
        let (tx, rx) = mpsc::channel();
        let weak = Arc::downgrade(&self.core);
        thread::spawn(move || worker(&rx, delay, &weak));

        let mut slot = self.core.lock();
        slot.armed = Some(tx);
        slot.context = context;
        trace!(delay_ms = delay.as_millis() as u64, "change timer armed");
    }

    /// Cancel any pending delivery and return to the disabled state.
    pub fn disable(&self) {
        let mut slot = self.core.lock();
        slot.pending = None;
        slot.context = None;
        if let Some(tx) = slot.armed.take() {
            let _ = tx.send(TimerMsg::Disable);
            trace!("change timer disabled");
        }
    }

    /// Record `(old, new)` as the payload awaiting delivery and reset the
    /// delay window. Disabled timers pass the payload straight through.
    pub fn restart(&self, old: T, new: T) {
        let tx = {
            let mut slot = self.core.lock();
            match slot.armed.clone() {
                Some(tx) => {
                    slot.pending = Some((old, new));
                    tx
                }
                None => {
                    drop(slot);
                    (self.core.deliver.as_ref())(old, new);
                    return;
                }
            }
        };
        let _ = tx.send(TimerMsg::Restart);
    }

    /// Whether the timer is currently armed.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.core.lock().armed.is_some()
    }
}

impl<T: 'static> std::fmt::Debug for ChangeTimer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeTimer").finish()
    }
}

fn worker<T: Send + 'static>(rx: &Receiver<TimerMsg>, delay: Duration, core: &Weak<TimerCore<T>>) {
    let mut deadline: Option<Instant> = None;
    loop {
        let msg = match deadline {
            Some(at) => {
                let now = Instant::now();
                if now >= at {
                    deadline = None;
                    match core.upgrade() {
                        Some(core) => core.fire(),
                        None => return,
                    }
                    continue;
                }
                match rx.recv_timeout(at - now) {
                    Ok(msg) => msg,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }
            None => match rx.recv() {
                Ok(msg) => msg,
                Err(_) => return,
            },
        };
        match msg {
            TimerMsg::Restart => deadline = Some(Instant::now() + delay),
            TimerMsg::Disable => return,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
