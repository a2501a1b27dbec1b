//! # Buffer-Ready Notification
//!
//! A one-bit wake signal between the producer context (the driver callback)
//! and the single consumer task. No payload crosses it: the producer only says
//! "something is ready", and the consumer finds out how much by calling
//! `read` on the channel.
//!
//! The signal saturates. It is a [`crossbeam_channel::bounded`] channel of
//! capacity one used with `try_send`, so any number of firings between two
//! waits collapse into a single pending wake.

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};

use crate::error::NotifyError;

/// Producer half. Cheap to clone; safe to call from any thread.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: Sender<()>,
}

/// Consumer half. Exactly one exists per pair.
#[derive(Debug)]
pub struct Notification {
    rx: Receiver<()>,
}

/// Creates a connected notifier / notification pair.
pub fn pair() -> (Notifier, Notification) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (Notifier { tx }, Notification { rx })
}

impl Notifier {
    /// Raises the wake signal.
    ///
    /// Never blocks. Returns `true` if this call made the signal pending and
    /// `false` if a wake was already pending (coalesced) or the consumer is
    /// gone.
    pub fn signal(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) | Err(TrySendError::Disconnected(())) => false,
        }
    }
}

impl Notification {
    /// Blocks until the signal is raised, then clears it.
    pub fn wait(&self) -> Result<(), NotifyError> {
        self.rx.recv().map_err(|_| NotifyError::Disconnected)
    }

    /// Clears a pending signal without blocking. Returns whether one was pending.
    pub fn take(&self) -> Result<bool, NotifyError> {
        match self.rx.try_recv() {
            Ok(()) => Ok(true),
            Err(TryRecvError::Empty) => Ok(false),
            Err(TryRecvError::Disconnected) => Err(NotifyError::Disconnected),
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.rx.is_empty()
    }
}
