//! The global stop channel polled between batches and between ticks (§5
//! "Cancellation and timeouts"). A single `tokio::sync::watch` sender is
//! shared by every task spawned for every index; flipping it to `true`
//! asks all of them to finish their current item and exit.

use tokio::sync::watch;

pub type StopSignal = watch::Receiver<bool>;

pub fn new_stop_channel() -> (watch::Sender<bool>, StopSignal) {
    watch::channel(false)
}

pub fn is_stopping(signal: &StopSignal) -> bool {
    *signal.borrow()
}
