//! In-memory transport for unit tests.
//!
//! Every request block written with `send` is decoded and answered by a
//! handler; the answers queue up until `receive` drains them.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::{Result, SsdbError};
use crate::proto::parser::parse_block;
use crate::proto::types::{Response, Status};
use crate::transport::Transport;

type Handler = Box<dyn FnMut(&[Bytes]) -> Result<Response> + Send>;

/// What the transport saw, shared with the test body.
#[derive(Debug, Default)]
pub(crate) struct Log {
    /// Number of `send` calls.
    pub sends: usize,
    /// Decoded request blocks, in arrival order.
    pub requests: Vec<Vec<Bytes>>,
}

pub(crate) struct MockTransport {
    handler: Handler,
    queued: VecDeque<Result<Response>>,
    log: Arc<Mutex<Log>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: FnMut(&[Bytes]) -> Result<Response> + Send + 'static,
    {
        Self {
            handler: Box::new(handler),
            queued: VecDeque::new(),
            log: Arc::new(Mutex::new(Log::default())),
        }
    }

    /// Answers `ok` followed by every argument after the command name,
    /// except that `error`, `fail` and `missing` answer with that status.
    pub fn echo() -> Self {
        Self::new(|args| Ok(echo_reply(args)))
    }

    pub fn log(&self) -> Arc<Mutex<Log>> {
        Arc::clone(&self.log)
    }
}

pub(crate) fn echo_reply(args: &[Bytes]) -> Response {
    let body = args[1..].to_vec();
    match &args[0][..] {
        b"error" => Response::new(Status::Error, body),
        b"fail" => Response::new(Status::Fail, body),
        b"missing" => Response::new(Status::NotFound, Vec::new()),
        _ => Response::new(Status::Ok, body),
    }
}

impl Transport for MockTransport {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut buf = Bytes::copy_from_slice(data);
        let mut log = self.log.lock();
        log.sends += 1;
        while !buf.is_empty() {
            let (frames, used) = parse_block(&buf)?;
            self.queued.push_back((self.handler)(&frames));
            log.requests.push(frames);
            buf = buf.slice(used..);
        }
        Ok(())
    }

    fn receive(&mut self) -> Result<Response> {
        self.queued.pop_front().unwrap_or_else(|| {
            Err(SsdbError::transport(
                io::ErrorKind::UnexpectedEof,
                "no reply queued",
            ))
        })
    }
}
