// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded command queue between the listener and the scan coordinator.
//
// The producer side never waits: when the queue is full the new command is
// dropped with a warning.  The consumer side suspends until a command arrives.

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use scanbridge_core::Command;

/// Result of offering a command to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submit {
    Accepted,
    /// Queue full; the command was dropped.
    Full,
    /// Consumer is gone; the command was dropped.
    Closed,
}

/// Create a queue with the given capacity (at least 1).
pub fn command_queue(capacity: usize) -> (CommandSender, CommandReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (CommandSender { tx }, CommandReceiver { rx })
}

/// Producer half.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<Command>,
}

impl CommandSender {
    /// Offer a command without waiting.
    pub fn submit(&self, command: Command) -> Submit {
        match self.tx.try_send(command) {
            Ok(()) => {
                debug!(%command, "command queued");
                Submit::Accepted
            }
            Err(TrySendError::Full(command)) => {
                warn!(%command, capacity = self.tx.max_capacity(), "command queue full, dropping command");
                Submit::Full
            }
            Err(TrySendError::Closed(command)) => {
                warn!(%command, "command queue closed, dropping command");
                Submit::Closed
            }
        }
    }
}

/// Consumer half. There is exactly one.
#[derive(Debug)]
pub struct CommandReceiver {
    rx: mpsc::Receiver<Command>,
}

impl CommandReceiver {
    /// Wait for the next command. `None` once every sender is dropped and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<Command> {
        self.rx.recv().await
    }

    /// Number of commands currently waiting.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_fifo_order() {
        let (tx, mut rx) = command_queue(4);
        assert_eq!(tx.submit(Command::MultiPage), Submit::Accepted);
        assert_eq!(tx.submit(Command::LastPage), Submit::Accepted);

        assert_eq!(rx.recv().await, Some(Command::MultiPage));
        assert_eq!(rx.recv().await, Some(Command::LastPage));
    }

    #[tokio::test]
    async fn overflow_drops_newest() {
        let (tx, mut rx) = command_queue(2);
        assert_eq!(tx.submit(Command::MultiPage), Submit::Accepted);
        assert_eq!(tx.submit(Command::MultiPage), Submit::Accepted);
        assert_eq!(tx.submit(Command::AbortMultiPage), Submit::Full);
        assert_eq!(rx.len(), 2);

        assert_eq!(rx.recv().await, Some(Command::MultiPage));
        assert_eq!(rx.recv().await, Some(Command::MultiPage));
        assert!(rx.is_empty());
    }

    #[tokio::test]
    async fn submit_after_consumer_drop_reports_closed() {
        let (tx, rx) = command_queue(2);
        drop(rx);
        assert_eq!(tx.submit(Command::LastPage), Submit::Closed);
    }

    #[tokio::test]
    async fn recv_ends_when_producers_are_gone() {
        let (tx, mut rx) = command_queue(2);
        tx.submit(Command::FinishMultiPage);
        drop(tx);
        assert_eq!(rx.recv().await, Some(Command::FinishMultiPage));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let (tx, _rx) = command_queue(0);
        assert_eq!(tx.submit(Command::LastPage), Submit::Accepted);
        assert_eq!(tx.submit(Command::LastPage), Submit::Full);
    }
}
