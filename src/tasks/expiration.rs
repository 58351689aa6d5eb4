//! Expiration Timer Task
//!
//! One-shot wake-up timer that drives TTL expiration. The cache arms it for
//! the soonest known deadline; when it fires it calls back into the cache,
//! which sweeps expired entries and re-arms it (or leaves it idle).
//!
//! Commands travel over an unbounded channel, so arming never blocks the
//! caller and the last command sent always wins.

use std::future;
use std::io;
use std::sync::{mpsc as std_mpsc, Weak};
use std::thread;
use std::time::Instant;

use tokio::runtime::Builder;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

/// Something the timer wakes up when its deadline passes.
pub(crate) trait ExpirationTarget: Send + Sync + 'static {
    /// Sweeps expired entries and re-arms the timer as needed.
    fn expiration_check(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerCommand {
    Arm(Instant),
    Disarm,
}

// == Expiration Timer ==
/// Sending half of the timer; owned by the cache.
#[derive(Debug)]
pub(crate) struct ExpirationTimer {
    tx: UnboundedSender<TimerCommand>,
}

impl ExpirationTimer {
    /// Creates the timer handle and the receiver the task will consume.
    pub(crate) fn channel() -> (Self, UnboundedReceiver<TimerCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Replaces any pending wake with one at `deadline`.
    pub(crate) fn arm(&self, deadline: Instant) {
        trace!("arming expiration timer");
        // The timer thread outlives every cache handle, so a send only fails
        // during teardown.
        let _ = self.tx.send(TimerCommand::Arm(deadline));
    }

    /// Cancels any pending wake.
    pub(crate) fn disarm(&self) {
        trace!("disarming expiration timer");
        let _ = self.tx.send(TimerCommand::Disarm);
    }
}

/// Spawns the timer task for `target`.
///
/// The task always runs on a dedicated thread named `thread_name` with its own
/// current-thread runtime. It never borrows the caller's runtime, so the timer
/// keeps firing while caller threads are blocked and after the runtime the
/// cache was built in has shut down.
///
/// # Returns
/// An error if the dedicated thread or its runtime could not be created.
pub(crate) fn spawn_expiration_task<T: ExpirationTarget>(
    target: Weak<T>,
    rx: UnboundedReceiver<TimerCommand>,
    thread_name: String,
) -> io::Result<()> {
    let (ready_tx, ready_rx) = std_mpsc::channel();
    thread::Builder::new()
        .name(thread_name)
        .spawn(move || {
            let runtime = match Builder::new_current_thread().enable_time().build() {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));
            runtime.block_on(run_timer(target, rx));
        })?;

    debug!("Starting expiration timer on a dedicated thread");
    ready_rx
        .recv()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "expiration timer thread exited"))?
}

/// Timer loop: waits for commands and fires the target at the armed
/// deadline. Exits when the command channel closes or the target is gone.
pub(crate) async fn run_timer<T: ExpirationTarget>(
    target: Weak<T>,
    mut rx: UnboundedReceiver<TimerCommand>,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        let wake = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
                None => future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;

            command = rx.recv() => match command {
                Some(TimerCommand::Arm(at)) => deadline = Some(at),
                Some(TimerCommand::Disarm) => deadline = None,
                None => break,
            },
            _ = wake => {
                deadline = None;
                let Some(target) = target.upgrade() else {
                    break;
                };
                target.expiration_check();
            }
        }
    }

    debug!("Expiration timer stopped");
}
