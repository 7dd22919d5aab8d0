//! Blocking command client.
//!
//! Wraps one [`Transport`] behind an instance-wide reentrant lock. Every
//! public operation takes the lock before touching the transport and
//! releases it on every exit path, so a client can be shared between
//! threads while a single thread may freely nest calls (a batch flush
//! inside [`Client::synchronized`], for instance).

use tracing::{debug, trace};

use crate::batch::Batch;
use crate::commands::Call;
use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::proto::command::Command;
use crate::proto::types::Response;
use crate::proto::writer::{encode_command, encode_pipeline};
use crate::sync::ReentrantLock;
use crate::transform::Transform;
use crate::transport::{StandaloneTransport, Transport};
use crate::value::Value;

/// A synchronous client bound to one logical connection.
pub struct Client<T: Transport = StandaloneTransport> {
    transport: ReentrantLock<T>,
}

impl Client<StandaloneTransport> {
    /// Connect to the server described by `config`.
    pub fn connect(config: ConnectionConfig) -> Result<Self> {
        Ok(Self::with_transport(StandaloneTransport::connect(config)?))
    }

    /// Connect using an `ssdb://` URL.
    pub fn from_url(url: &str) -> Result<Self> {
        Self::connect(ConnectionConfig::from_url(url)?)
    }

    /// Connect attempts made by the underlying transport.
    pub fn connect_attempts(&self) -> Result<u64> {
        self.inspect(|t| t.connect_attempts())
    }

    /// Successful reconnects made by the underlying transport.
    pub fn reconnects(&self) -> Result<u64> {
        self.inspect(|t| t.reconnects())
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport: ReentrantLock::new(transport),
        }
    }

    /// Run `command` and convert an `ok` body with `transform`.
    ///
    /// `not_found` yields [`Value::Nil`]; any other non-ok status is a
    /// server error.
    pub fn execute(&self, command: &Command, transform: &Transform) -> Result<Value> {
        transform.resolve(self.execute_raw(command)?)
    }

    /// Run `command` and return the decoded response without looking at
    /// its status.
    pub fn execute_raw(&self, command: &Command) -> Result<Response> {
        trace!(command = %String::from_utf8_lossy(command.name()), "execute");
        let held = self.transport.lock();
        let mut transport = held.borrow_mut()?;
        transport.send(&encode_command(command))?;
        transport.receive()
    }

    /// Pipeline `commands`: one write carrying every request, then exactly
    /// one response per command, in order.
    pub fn execute_batch(&self, commands: &[Command]) -> Result<Vec<Response>> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }
        trace!(commands = commands.len(), "execute batch");
        let held = self.transport.lock();
        let mut transport = held.borrow_mut()?;
        transport.send(&encode_pipeline(commands))?;
        transport.receive_many(commands.len())
    }

    /// Run a prebuilt call.
    pub fn call(&self, call: &Call) -> Result<Value> {
        self.execute(&call.command, &call.transform)
    }

    /// Record commands into a fresh [`Batch`] and flush it when `scope`
    /// returns.
    ///
    /// The flush runs whether `scope` succeeds or fails. When both fail,
    /// the error from `scope` is returned; the flush error is still visible
    /// through the futures.
    pub fn batch<R, F>(&self, scope: F) -> Result<R>
    where
        F: FnOnce(&mut Batch) -> Result<R>,
    {
        let mut batch = Batch::new();
        let outcome = scope(&mut batch);
        let flushed = batch.flush(self);
        match (outcome, flushed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(flush_err)) => {
                debug!(error = %flush_err, "batch flush failed after scope error");
                Err(e)
            }
        }
    }

    /// Hold the instance lock for the whole of `section`.
    ///
    /// Client calls made inside `section` on the same thread reenter the
    /// lock; other threads wait until it returns.
    pub fn synchronized<R, F>(&self, section: F) -> R
    where
        F: FnOnce(&Self) -> R,
    {
        let _held = self.transport.lock();
        section(self)
    }

    /// How many times the calling thread currently holds the instance lock.
    pub fn lock_depth(&self) -> usize {
        self.transport.depth()
    }

    /// Look at the transport under the instance lock.
    pub fn inspect<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&T) -> R,
    {
        let held = self.transport.lock();
        let transport = held.borrow_mut()?;
        Ok(f(&transport))
    }

    pub fn into_transport(self) -> T {
        self.transport.into_inner()
    }
}

// ── Tests ──────────────────────────────────────────────────────────
