//! Async TCP connection to a server.
//!
//! Wraps a `tokio::net::TcpStream` with an integrated read buffer and the
//! block parser for streaming request/response I/O.

use std::io;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::DEFAULT_MAX_BUF_SIZE;
use crate::error::{Result, SsdbError};
use crate::proto::command::Command;
use crate::proto::parser::{block_len, parse};
use crate::proto::types::Response;
use crate::proto::writer::encode_command;

/// Default initial read buffer capacity (64 KB).
const DEFAULT_BUF_CAPACITY: usize = 64 * 1024;

/// Minimum free space guaranteed before each socket read.
const READ_CHUNK: usize = 4096;

/// A single async connection to a server.
pub struct SsdbConnection {
    stream: TcpStream,
    /// Read buffer (data read from socket but not yet consumed by parser).
    buf: BytesMut,
    /// Maximum allowed buffer size.
    max_buf_size: usize,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl SsdbConnection {
    /// Connect to `addr` (e.g. "127.0.0.1:8888").
    pub async fn connect(addr: &str) -> Result<Self> {
        Self::connect_with_max_buf(addr, DEFAULT_MAX_BUF_SIZE).await
    }

    /// Connect with a configurable max buffer size.
    pub async fn connect_with_max_buf(addr: &str, max_buf_size: usize) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true).ok(); // Disable Nagle for low latency
        Ok(Self {
            stream,
            buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY.min(max_buf_size)),
            max_buf_size,
            read_timeout: None,
            write_timeout: None,
        })
    }

    /// Connect with an optional timeout and configurable max buffer size.
    pub async fn connect_timeout_with_max_buf(
        addr: &str,
        timeout: Option<Duration>,
        max_buf_size: usize,
    ) -> Result<Self> {
        let Some(timeout) = timeout else {
            return Self::connect_with_max_buf(addr, max_buf_size).await;
        };
        match tokio::time::timeout(timeout, Self::connect_with_max_buf(addr, max_buf_size)).await {
            Ok(result) => result,
            Err(_) => Err(SsdbError::transport(
                io::ErrorKind::TimedOut,
                format!("connection to {addr} timed out after {timeout:?}"),
            )),
        }
    }

    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    pub fn set_write_timeout(&mut self, timeout: Option<Duration>) {
        self.write_timeout = timeout;
    }

    /// Send raw bytes to the server.
    pub async fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        let write = self.stream.write_all(data);
        match self.write_timeout {
            Some(t) => tokio::time::timeout(t, write).await.map_err(|_| {
                SsdbError::transport(
                    io::ErrorKind::TimedOut,
                    format!("write timed out after {t:?}"),
                )
            })??,
            None => write.await?,
        }
        Ok(())
    }

    /// Read one complete block as raw `Bytes`, without splitting it into
    /// frames.
    pub async fn read_raw_response(&mut self) -> Result<Bytes> {
        loop {
            if !self.buf.is_empty() {
                match block_len(&self.buf) {
                    Ok(len) => {
                        // Split off exactly `len` bytes and freeze them
                        return Ok(self.buf.split_to(len).freeze());
                    }
                    Err(SsdbError::Incomplete) => {}
                    Err(e) => return Err(e),
                }
            }
            self.fill_buf().await?;
        }
    }

    /// Read and decode one complete response.
    ///
    /// Frames are zero-copy slices of the block's frozen bytes.
    pub async fn read_response(&mut self) -> Result<Response> {
        let raw = self.read_raw_response().await?;
        let (response, _) = parse(&raw)?;
        Ok(response)
    }

    /// Read exactly `n` responses, in order.
    pub async fn read_responses(&mut self, n: usize) -> Result<Vec<Response>> {
        let mut responses = Vec::with_capacity(n);
        for _ in 0..n {
            responses.push(self.read_response().await?);
        }
        Ok(responses)
    }

    /// Read more bytes from the socket into the buffer.
    ///
    /// The buffer never grows past `max_buf_size`; a block that does not
    /// fit is a protocol error.
    async fn fill_buf(&mut self) -> Result<()> {
        let room = self.max_buf_size.saturating_sub(self.buf.len());
        if room == 0 {
            return Err(SsdbError::Protocol(format!(
                "response too large: buffer would exceed {} bytes",
                self.max_buf_size
            )));
        }
        self.buf.reserve(READ_CHUNK.min(room));

        let mut limited = (&mut self.buf).limit(room);
        let read = self.stream.read_buf(&mut limited);
        let n = match self.read_timeout {
            Some(t) => tokio::time::timeout(t, read).await.map_err(|_| {
                SsdbError::transport(
                    io::ErrorKind::TimedOut,
                    format!("read timed out after {t:?}"),
                )
            })??,
            None => read.await?,
        };
        if n == 0 {
            return Err(SsdbError::transport(
                io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            ));
        }
        Ok(())
    }

    /// Send a command and read the response.
    pub async fn execute(&mut self, command: &Command) -> Result<Response> {
        self.send_raw(&encode_command(command)).await?;
        self.read_response().await
    }

    /// Authenticate with the server's shared password.
    pub async fn auth(&mut self, password: &str) -> Result<()> {
        let response = self.execute(&Command::new("auth").arg(password)).await?;
        response.into_body().and_then(|body| match body {
            Some(_) => Ok(()),
            None => Err(SsdbError::server("not_found", &[])),
        })
    }

    /// Send `ping` and verify the response.
    pub async fn ping(&mut self) -> Result<bool> {
        let response = self.execute(&Command::new("ping")).await?;
        Ok(response.status.is_ok())
    }
}

// ── Tests ──────────────────────────────────────────────────────────
