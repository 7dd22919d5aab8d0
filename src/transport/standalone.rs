//! Single-server transport.
//!
//! Owns at most one live [`SsdbConnection`] and drives it synchronously
//! through the global runtime. Any I/O or framing failure drops the
//! connection; the next operation makes exactly one attempt to reconnect
//! and surfaces the error if that attempt fails. A command that failed in
//! flight is never resent.

use std::io;

use tracing::{debug, trace, warn};

use crate::config::ConnectionConfig;
use crate::connection::tcp::SsdbConnection;
use crate::error::{Result, SsdbError};
use crate::proto::types::Response;
use crate::runtime;
use crate::transport::Transport;

/// Transport for a single server endpoint.
pub struct StandaloneTransport {
    config: ConnectionConfig,
    conn: Option<SsdbConnection>,
    connect_attempts: u64,
    reconnects: u64,
}

impl StandaloneTransport {
    /// Connect eagerly; fails if the first attempt fails.
    pub fn connect(config: ConnectionConfig) -> Result<Self> {
        let mut transport = Self {
            config,
            conn: None,
            connect_attempts: 0,
            reconnects: 0,
        };
        transport.establish()?;
        Ok(transport)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Connect attempts made so far, the initial one included.
    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts
    }

    /// Successful reconnects after a dropped connection.
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    /// Drop the current connection; the next `send` reconnects.
    pub fn invalidate(&mut self) {
        self.conn = None;
    }

    /// Make one connect attempt.
    fn establish(&mut self) -> Result<()> {
        let initial = self.connect_attempts == 0;
        self.connect_attempts += 1;
        let addr = self.config.addr();
        debug!(%addr, attempt = self.connect_attempts, "connecting");

        match runtime::block_on(open(&self.config)) {
            Ok(conn) => {
                if !initial {
                    self.reconnects += 1;
                    debug!(%addr, reconnects = self.reconnects, "reconnected");
                }
                self.conn = Some(conn);
                Ok(())
            }
            Err(e) => {
                warn!(%addr, error = %e, "connect failed");
                Err(e)
            }
        }
    }

    /// The live connection, reconnecting once if it was dropped.
    fn live(&mut self) -> Result<&mut SsdbConnection> {
        if self.conn.is_none() {
            self.establish()?;
        }
        self.conn.as_mut().ok_or_else(not_connected)
    }

    /// Drop the connection when `result` leaves it in an unknown state.
    fn check<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e @ (SsdbError::Transport(_) | SsdbError::Protocol(_))) = &result {
            warn!(addr = %self.config.addr(), error = %e, "dropping connection");
            self.conn = None;
        }
        result
    }
}

impl Transport for StandaloneTransport {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        let result = {
            let conn = self.live()?;
            trace!(bytes = data.len(), "send");
            runtime::block_on(conn.send_raw(data))
        };
        self.check(result)
    }

    fn receive(&mut self) -> Result<Response> {
        let result = match self.conn.as_mut() {
            Some(conn) => runtime::block_on(conn.read_response()),
            None => return Err(not_connected()),
        };
        self.check(result)
    }

    fn receive_many(&mut self, n: usize) -> Result<Vec<Response>> {
        let result = match self.conn.as_mut() {
            Some(conn) => runtime::block_on(conn.read_responses(n)),
            None => return Err(not_connected()),
        };
        self.check(result)
    }
}

/// Open and initialise one connection from `config`.
async fn open(config: &ConnectionConfig) -> Result<SsdbConnection> {
    let mut conn = SsdbConnection::connect_timeout_with_max_buf(
        &config.addr(),
        config.connect_timeout(),
        config.max_buffer_size,
    )
    .await?;
    conn.set_read_timeout(config.read_timeout());
    conn.set_write_timeout(config.write_timeout());
    if let Some(password) = &config.password {
        conn.auth(password).await?;
    }
    Ok(conn)
}

fn not_connected() -> SsdbError {
    SsdbError::transport(io::ErrorKind::NotConnected, "no live connection")
}

// ── Tests ──────────────────────────────────────────────────────────
