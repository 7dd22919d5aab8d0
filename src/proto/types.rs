use bytes::Bytes;

use crate::error::{Result, SsdbError};

/// Status token carried by the first frame of every response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// `ok`
    Ok,
    /// `not_found`
    NotFound,
    /// `error`
    Error,
    /// `fail`
    Fail,
    /// `client_error`
    ClientError,
    /// Anything else the server sends.
    Other(String),
}

impl Status {
    /// Interpret the raw status frame.
    pub fn from_token(token: &[u8]) -> Self {
        match token {
            b"ok" => Self::Ok,
            b"not_found" => Self::NotFound,
            b"error" => Self::Error,
            b"fail" => Self::Fail,
            b"client_error" => Self::ClientError,
            other => Self::Other(String::from_utf8_lossy(other).into_owned()),
        }
    }

    /// The token as it appears on the wire.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ok => "ok",
            Self::NotFound => "not_found",
            Self::Error => "error",
            Self::Fail => "fail",
            Self::ClientError => "client_error",
            Self::Other(s) => s,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// One decoded response: a status plus the remaining frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub body: Vec<Bytes>,
}

impl Response {
    pub fn new(status: Status, body: Vec<Bytes>) -> Self {
        Self { status, body }
    }

    /// Build a response from the frames of one decoded block.
    ///
    /// A block without any frame carries no status and is rejected.
    pub fn from_block(mut frames: Vec<Bytes>) -> Result<Self> {
        if frames.is_empty() {
            return Err(SsdbError::Protocol("empty response block".into()));
        }
        let body = frames.split_off(1);
        let status = Status::from_token(&frames[0]);
        Ok(Self { status, body })
    }

    /// Branch on the status.
    ///
    /// `ok` yields the body, `not_found` yields `None`, every other status
    /// becomes a server error carrying the body as its message.
    pub fn into_body(self) -> Result<Option<Vec<Bytes>>> {
        match self.status {
            Status::Ok => Ok(Some(self.body)),
            Status::NotFound => Ok(None),
            other => Err(SsdbError::server(other.as_str(), &self.body)),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────
