//! Pipelined batches and their futures.
//!
//! A [`Batch`] records commands without touching the network and hands out
//! a [`BatchFuture`] per command. [`Batch::flush`] sends everything in one
//! pipelined round trip and resolves future `i` from response `i` only, so
//! one failing slot never affects its neighbours.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::client::Client;
use crate::commands::Call;
use crate::error::{Result, SsdbError};
use crate::proto::command::Command;
use crate::proto::types::Response;
use crate::transform::Transform;
use crate::transport::Transport;
use crate::value::Value;

#[derive(Debug)]
enum State {
    Pending,
    Resolved(Value),
    Failed(SsdbError),
}

#[derive(Debug)]
struct Slot {
    index: usize,
    transform: Transform,
    state: State,
}

/// Placeholder for the result of one recorded command.
///
/// Resolved exactly once, when the batch that produced it is flushed.
/// Clones share the same slot.
#[derive(Debug, Clone)]
pub struct BatchFuture {
    slot: Arc<Mutex<Slot>>,
}

impl BatchFuture {
    fn pending(index: usize, transform: Transform) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                index,
                transform,
                state: State::Pending,
            })),
        }
    }

    /// The resolved value, or the error the slot failed with.
    ///
    /// Reading a future whose batch has not been flushed is a
    /// [`SsdbError::BatchUsage`] error.
    pub fn value(&self) -> Result<Value> {
        let slot = self.slot.lock();
        match &slot.state {
            State::Resolved(value) => Ok(value.clone()),
            State::Failed(e) => Err(e.clone()),
            State::Pending => Err(SsdbError::BatchUsage(format!(
                "future #{} read before its batch was flushed",
                slot.index
            ))),
        }
    }

    /// True once the future has left the pending state, successfully or not.
    pub fn is_resolved(&self) -> bool {
        !matches!(self.slot.lock().state, State::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.slot.lock().state, State::Failed(_))
    }

    /// Position of the command within its batch.
    pub fn index(&self) -> usize {
        self.slot.lock().index
    }

    fn resolve(&self, response: Response) {
        let mut slot = self.slot.lock();
        if matches!(slot.state, State::Pending) {
            slot.state = match slot.transform.resolve(response) {
                Ok(value) => State::Resolved(value),
                Err(e) => State::Failed(e),
            };
        }
    }

    fn fail(&self, error: SsdbError) {
        let mut slot = self.slot.lock();
        if matches!(slot.state, State::Pending) {
            slot.state = State::Failed(error);
        }
    }
}

/// An ordered recording of commands awaiting a single flush.
#[derive(Debug, Default)]
pub struct Batch {
    commands: Vec<Command>,
    futures: Vec<BatchFuture>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `command`; its result will be converted with `transform`.
    pub fn execute(&mut self, command: Command, transform: Transform) -> BatchFuture {
        let future = BatchFuture::pending(self.commands.len(), transform);
        self.commands.push(command);
        self.futures.push(future.clone());
        future
    }

    /// Record a prebuilt call.
    pub fn call(&mut self, call: Call) -> BatchFuture {
        self.execute(call.command, call.transform)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Send every recorded command through `client` and resolve the futures.
    ///
    /// Per-command failures are stored in their own futures and do not make
    /// this call fail. If the round trip itself fails, every future fails
    /// with that error and it is also returned here. An empty batch does no
    /// I/O.
    pub fn flush<T: Transport>(mut self, client: &Client<T>) -> Result<()> {
        let commands = std::mem::take(&mut self.commands);
        let futures = std::mem::take(&mut self.futures);
        if commands.is_empty() {
            return Ok(());
        }

        debug!(commands = commands.len(), "flushing batch");
        match client.execute_batch(&commands) {
            Ok(responses) => {
                for (future, response) in futures.iter().zip(responses) {
                    future.resolve(response);
                }
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, "batch round trip failed");
                for future in &futures {
                    future.fail(e.clone());
                }
                Err(e)
            }
        }
    }
}

impl Drop for Batch {
    /// Futures of a batch dropped without flushing (a panicking scope, for
    /// instance) fail instead of staying pending forever.
    fn drop(&mut self) {
        for future in &self.futures {
            future.fail(SsdbError::BatchUsage(
                "batch dropped before it was flushed".into(),
            ));
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────
