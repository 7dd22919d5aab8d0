use std::io;
use std::sync::Arc;

// ── Error taxonomy ─────────────────────────────────────────────────
//
//  SsdbError
//  ├── Transport      (refused, reset, closed, timed out)
//  ├── Protocol       (malformed framing, oversize response)
//  ├── Incomplete     (parser control flow only)
//  ├── Server         (non-ok status)
//  │   ├── Error          (generic server failure)
//  │   ├── Fail           (command failed)
//  │   ├── ClientError    (malformed request)
//  │   └── Other(token)   (unrecognised status)
//  ├── Transform      (body shape a transform cannot interpret)
//  ├── BatchUsage     (future read before flush, etc.)
//  └── Config         (invalid configuration / URL)

/// Non-ok status classes the server can answer with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerErrorKind {
    /// `error`: generic server-side failure.
    Error,
    /// `fail`: the command was understood but could not be carried out.
    Fail,
    /// `client_error`: the request was malformed.
    ClientError,
    /// Any other status token.
    Other(String),
}

impl ServerErrorKind {
    /// Map a status token to its error kind.
    pub fn from_token(token: &str) -> Self {
        match token {
            "error" => Self::Error,
            "fail" => Self::Fail,
            "client_error" => Self::ClientError,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether resending the same request could ever succeed without
    /// the caller correcting it first.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, Self::ClientError | Self::Fail)
    }
}

/// All error variants for rssdb.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SsdbError {
    /// TCP / IO level errors, including timeouts.
    #[error("transport error: {0}")]
    Transport(Arc<io::Error>),
    /// Malformed wire data.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Parser needs more data. Control flow only, never surfaced by the client.
    #[error("incomplete response block")]
    Incomplete,
    /// Server answered with a non-ok status.
    #[error("server error ({kind:?}): {message}")]
    Server {
        kind: ServerErrorKind,
        message: String,
    },
    /// A result transform got a body it cannot interpret.
    #[error("transform error: {0}")]
    Transform(String),
    /// Misuse of a batch or its futures.
    #[error("batch usage error: {0}")]
    BatchUsage(String),
    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl SsdbError {
    /// Build a server error from a status token and the response body.
    ///
    /// The message is the body joined with spaces, or the token itself
    /// when the body is empty.
    pub fn server(token: &str, body: &[bytes::Bytes]) -> Self {
        let message = if body.is_empty() {
            token.to_string()
        } else {
            body.iter()
                .map(|b| String::from_utf8_lossy(b))
                .collect::<Vec<_>>()
                .join(" ")
        };
        Self::Server {
            kind: ServerErrorKind::from_token(token),
            message,
        }
    }

    /// Shorthand for a transport error of the given kind.
    pub fn transport(kind: io::ErrorKind, msg: impl Into<String>) -> Self {
        Self::Transport(Arc::new(io::Error::new(kind, msg.into())))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Check if this is a transport error caused by a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(e) => e.kind() == io::ErrorKind::TimedOut,
            _ => false,
        }
    }

    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server { .. })
    }

    /// Extract the server error kind, if any.
    pub fn server_kind(&self) -> Option<&ServerErrorKind> {
        match self {
            Self::Server { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

impl From<io::Error> for SsdbError {
    fn from(e: io::Error) -> Self {
        Self::Transport(Arc::new(e))
    }
}

pub type Result<T> = std::result::Result<T, SsdbError>;

// ── Tests ──────────────────────────────────────────────────────────
