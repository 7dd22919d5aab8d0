//! Streaming block parser.
//!
//! [`parse`] takes a byte buffer and returns `Ok((Response, bytes_consumed))`
//! or `Err(Incomplete)` when more data is needed, or `Err(Protocol(…))` on
//! malformed input.
//!
//! Frames are located by their length prefix, never by scanning for line
//! breaks inside the payload, so values may carry `\n` or `\0` bytes. Data
//! frames are extracted with zero-copy `Bytes::slice`.

use bytes::Bytes;
use memchr::memchr;

use crate::error::{Result, SsdbError};
use crate::proto::types::Response;

/// Longest length line accepted (`u64::MAX` has 20 digits).
const MAX_LEN_DIGITS: usize = 20;

/// Parse one response block from the front of `buf`.
///
/// Returns `(response, bytes_consumed)` on success.
/// Returns `Err(Incomplete)` when the buffer is too short;
/// callers should read more data and retry.
pub fn parse(buf: &Bytes) -> Result<(Response, usize)> {
    let (frames, consumed) = parse_block(buf)?;
    Ok((Response::from_block(frames)?, consumed))
}

/// Convenience wrapper: parse from a byte slice (copies into `Bytes` first).
///
/// Prefer [`parse`] with a pre-existing `Bytes` for zero-copy frames.
pub fn parse_slice(buf: &[u8]) -> Result<(Response, usize)> {
    parse(&Bytes::copy_from_slice(buf))
}

/// Parse the raw frames of one block, request or response alike.
///
/// A bare terminator yields an empty frame list; whether that is valid is
/// up to the caller.
pub fn parse_block(buf: &Bytes) -> Result<(Vec<Bytes>, usize)> {
    let mut frames = Vec::new();
    let mut pos = 0;
    loop {
        let (line, next) = read_line(buf, pos)?;
        if line.is_empty() {
            return Ok((frames, next));
        }
        let len = parse_len(line)?;
        let data_end = next
            .checked_add(len)
            .ok_or_else(|| SsdbError::Protocol("frame length overflow".into()))?;
        let after = skip_terminator(buf, data_end)?;
        frames.push(buf.slice(next..data_end));
        pos = after;
    }
}

/// Compute the byte length of one complete block at the front of `buf`
/// **without allocating** any frame.
///
/// Returns `Ok(bytes_consumed)` or `Err(Incomplete)`.
pub fn block_len(buf: &[u8]) -> Result<usize> {
    let mut pos = 0;
    loop {
        let (line, next) = read_line(buf, pos)?;
        if line.is_empty() {
            return Ok(next);
        }
        let len = parse_len(line)?;
        let data_end = next
            .checked_add(len)
            .ok_or_else(|| SsdbError::Protocol("frame length overflow".into()))?;
        pos = skip_terminator(buf, data_end)?;
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Read the line starting at `buf[offset]` up to `\n`, dropping an
/// optional `\r`. Returns `(line_bytes, index_after_newline)`.
#[inline]
fn read_line(buf: &[u8], offset: usize) -> Result<(&[u8], usize)> {
    let rest = &buf[offset..];
    match memchr(b'\n', rest) {
        Some(pos) => {
            let line = &rest[..pos];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            Ok((line, offset + pos + 1))
        }
        None => {
            check_partial_len(rest)?;
            Err(SsdbError::Incomplete)
        }
    }
}

/// Reject an unterminated length line early when it can no longer become
/// valid, instead of waiting for more bytes forever.
fn check_partial_len(partial: &[u8]) -> Result<()> {
    let digits = partial.strip_suffix(b"\r").unwrap_or(partial);
    if digits.len() > MAX_LEN_DIGITS {
        return Err(SsdbError::Protocol("length prefix too long".into()));
    }
    if let Some(&b) = digits.iter().find(|b| !b.is_ascii_digit()) {
        return Err(SsdbError::Protocol(format!(
            "invalid byte in length prefix: 0x{b:02x}"
        )));
    }
    Ok(())
}

/// Parse a non-negative decimal length (no allocations).
fn parse_len(line: &[u8]) -> Result<usize> {
    if line.len() > MAX_LEN_DIGITS {
        return Err(SsdbError::Protocol("length prefix too long".into()));
    }
    let mut n: usize = 0;
    for &b in line {
        if !b.is_ascii_digit() {
            return Err(SsdbError::Protocol(format!(
                "invalid byte in length prefix: 0x{b:02x}"
            )));
        }
        n = n
            .checked_mul(10)
            .and_then(|n| n.checked_add((b - b'0') as usize))
            .ok_or_else(|| SsdbError::Protocol("length prefix overflow".into()))?;
    }
    Ok(n)
}

/// Check the line terminator that must follow a data frame ending at
/// `data_end`. Returns the index just past it.
#[inline]
fn skip_terminator(buf: &[u8], data_end: usize) -> Result<usize> {
    match buf.get(data_end) {
        None => Err(SsdbError::Incomplete),
        Some(b'\n') => Ok(data_end + 1),
        Some(b'\r') => match buf.get(data_end + 1) {
            None => Err(SsdbError::Incomplete),
            Some(b'\n') => Ok(data_end + 2),
            Some(_) => Err(SsdbError::Protocol(
                "expected \\n after \\r".into(),
            )),
        },
        Some(_) => Err(SsdbError::Protocol(
            "data frame not terminated by \\n".into(),
        )),
    }
}

// ── Tests ──────────────────────────────────────────────────────────
