//! Connection configuration and URL parsing.
//!
//! Supported URL form: `ssdb://[[user]:password@]host[:port][/]`
//! (bracketed IPv6 hosts allowed). The store authenticates by password only,
//! so a user part is accepted and ignored.

use std::time::Duration;

use crate::error::{Result, SsdbError};

/// Default server port.
pub const DEFAULT_PORT: u16 = 8888;

/// Default maximum read buffer size (64 MB).
pub const DEFAULT_MAX_BUF_SIZE: usize = 64 * 1024 * 1024;

/// Full connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    /// Sent with `auth` right after every (re)connect.
    pub password: Option<String>,
    /// Connect timeout in milliseconds (0 = no timeout).
    pub connect_timeout_ms: u64,
    /// Read/response timeout in milliseconds (0 = no timeout).
    pub read_timeout_ms: u64,
    /// Write timeout in milliseconds (0 = no timeout).
    pub write_timeout_ms: u64,
    /// Maximum read buffer size per connection in bytes.
    pub max_buffer_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            password: None,
            connect_timeout_ms: 5000,
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
            max_buffer_size: DEFAULT_MAX_BUF_SIZE,
        }
    }
}

impl ConnectionConfig {
    /// Config for `host:port` with every other field defaulted.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Parse an `ssdb://` URL into a ConnectionConfig.
    pub fn from_url(url: &str) -> Result<Self> {
        let mut config = Self::default();

        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| SsdbError::Config(format!("invalid URL, missing ://: {url}")))?;
        if scheme != "ssdb" {
            return Err(SsdbError::Config(format!("unknown URL scheme: {scheme}")));
        }

        let rest = rest.strip_suffix('/').unwrap_or(rest);
        if rest.contains('/') {
            return Err(SsdbError::Config(format!("unexpected path in URL: {url}")));
        }

        let host_port = match rest.rsplit_once('@') {
            Some((userinfo, hp)) => {
                parse_userinfo(&mut config, userinfo);
                hp
            }
            None => rest,
        };

        parse_host_port(host_port, DEFAULT_PORT, &mut config.host, &mut config.port)?;
        Ok(config)
    }

    /// Return the server address as "host:port".
    pub fn addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        millis(self.write_timeout_ms)
    }
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

// ── URL parsing helpers ────────────────────────────────────────────

/// Parse `user:pass`, `:pass` or a bare `pass` into config.
fn parse_userinfo(config: &mut ConnectionConfig, userinfo: &str) {
    let pass = match userinfo.split_once(':') {
        Some((_user, pass)) => pass,
        None => userinfo,
    };
    if !pass.is_empty() {
        config.password = Some(pass.to_string());
    }
}

/// Parse `host[:port]` or `[ipv6]:port` into host/port variables.
fn parse_host_port(s: &str, default_port: u16, host: &mut String, port: &mut u16) -> Result<()> {
    if s.starts_with('[') {
        let close = s
            .find(']')
            .ok_or_else(|| SsdbError::Config(format!("unclosed IPv6 bracket: {s}")))?;
        *host = s[1..close].to_string();
        let after = &s[close + 1..];
        *port = match after.strip_prefix(':') {
            Some(port_str) => port_str
                .parse()
                .map_err(|_| SsdbError::Config(format!("invalid port: {port_str}")))?,
            None => default_port,
        };
    } else if let Some((h, p)) = s.rsplit_once(':') {
        match p.parse::<u16>() {
            Ok(parsed_port) => {
                *host = h.to_string();
                *port = parsed_port;
            }
            // Bare IPv6 without brackets
            Err(_) if h.contains(':') => {
                *host = s.to_string();
                *port = default_port;
            }
            Err(_) => return Err(SsdbError::Config(format!("invalid port: {p}"))),
        }
    } else {
        *host = s.to_string();
        *port = default_port;
    }

    if host.is_empty() {
        *host = "127.0.0.1".to_string();
    }

    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────
