//! Prebuilt calls for common commands.
//!
//! Each builder pairs a [`Command`] with the [`Transform`] its result
//! needs, so callers do not have to remember which shape every command
//! answers with. The same [`Call`] runs directly through
//! [`Client::call`] or is recorded with [`Batch::call`](crate::batch::Batch::call).

use bytes::Bytes;
use tracing::trace;

use crate::client::Client;
use crate::error::{Result, SsdbError};
use crate::proto::command::{Command, ToArg};
use crate::transform::{Scalar, Transform};
use crate::transport::Transport;
use crate::value::Value;

/// A command together with the transform for its result.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub command: Command,
    pub transform: Transform,
}

impl Call {
    pub fn new(command: Command, transform: Transform) -> Self {
        Self { command, transform }
    }
}

// ── Server ─────────────────────────────────────────────────────────

pub fn ping() -> Call {
    Call::new(Command::new("ping"), Transform::Unit)
}

pub fn auth(password: impl ToArg) -> Call {
    Call::new(Command::new("auth").arg(password), Transform::Unit)
}

/// Server statistics as a map.
pub fn info() -> Call {
    Call::new(Command::new("info"), Transform::Stats)
}

// ── Key/value ──────────────────────────────────────────────────────

pub fn get(key: impl ToArg) -> Call {
    Call::new(Command::new("get").arg(key), Transform::Bytes)
}

pub fn set(key: impl ToArg, value: impl ToArg) -> Call {
    Call::new(Command::new("set").arg(key).arg(value), Transform::Unit)
}

/// Set with a time to live in seconds.
pub fn setx(key: impl ToArg, value: impl ToArg, ttl: u64) -> Call {
    Call::new(
        Command::new("setx").arg(key).arg(value).arg(ttl),
        Transform::Unit,
    )
}

pub fn del(key: impl ToArg) -> Call {
    Call::new(Command::new("del").arg(key), Transform::Unit)
}

pub fn exists(key: impl ToArg) -> Call {
    Call::new(Command::new("exists").arg(key), Transform::Bool)
}

/// Add `by` to an integer value, returning the new value.
pub fn incr(key: impl ToArg, by: i64) -> Call {
    Call::new(Command::new("incr").arg(key).arg(by), Transform::Int)
}

/// Values for `keys`, parallel to the input; missing keys are `Nil`.
pub fn multi_get<I>(keys: I) -> Call
where
    I: IntoIterator,
    I::Item: ToArg,
{
    let keys: Vec<Bytes> = keys.into_iter().map(|k| k.to_arg()).collect();
    Call::new(
        Command::new("multi_get").args(keys.iter()),
        Transform::lookup_values(keys, Scalar::Bytes),
    )
}

pub fn multi_set<I, K, V>(pairs: I) -> Call
where
    I: IntoIterator<Item = (K, V)>,
    K: ToArg,
    V: ToArg,
{
    let mut command = Command::new("multi_set");
    for (k, v) in pairs {
        command = command.arg(k).arg(v);
    }
    Call::new(command, Transform::Int)
}

// ── Hashes ─────────────────────────────────────────────────────────

pub fn hget(name: impl ToArg, key: impl ToArg) -> Call {
    Call::new(Command::new("hget").arg(name).arg(key), Transform::Bytes)
}

/// Returns 1 when the field is new, 0 when it was overwritten.
pub fn hset(name: impl ToArg, key: impl ToArg, value: impl ToArg) -> Call {
    Call::new(
        Command::new("hset").arg(name).arg(key).arg(value),
        Transform::Int,
    )
}

pub fn hgetall(name: impl ToArg) -> Call {
    Call::new(Command::new("hgetall").arg(name), Transform::Map(Scalar::Bytes))
}

pub fn hsize(name: impl ToArg) -> Call {
    Call::new(Command::new("hsize").arg(name), Transform::Int)
}

// ── Sorted sets ────────────────────────────────────────────────────

pub fn zset(name: impl ToArg, key: impl ToArg, score: i64) -> Call {
    Call::new(
        Command::new("zset").arg(name).arg(key).arg(score),
        Transform::Int,
    )
}

pub fn zget(name: impl ToArg, key: impl ToArg) -> Call {
    Call::new(Command::new("zget").arg(name).arg(key), Transform::Int)
}

/// Up to `limit` members in ascending `(score, key)` order, starting
/// after `(score_start, key_start)`. `None` bounds are open.
pub fn zscan(
    name: impl ToArg,
    key_start: impl ToArg,
    score_start: Option<i64>,
    score_end: Option<i64>,
    limit: usize,
) -> Call {
    scan("zscan", name, key_start, score_start, score_end, limit)
}

/// Descending counterpart of [`zscan`].
pub fn zrscan(
    name: impl ToArg,
    key_start: impl ToArg,
    score_start: Option<i64>,
    score_end: Option<i64>,
    limit: usize,
) -> Call {
    scan("zrscan", name, key_start, score_start, score_end, limit)
}

fn scan(
    op: &str,
    name: impl ToArg,
    key_start: impl ToArg,
    score_start: Option<i64>,
    score_end: Option<i64>,
    limit: usize,
) -> Call {
    Call::new(
        Command::new(op)
            .arg(name)
            .arg(key_start)
            .arg(score_arg(score_start))
            .arg(score_arg(score_end))
            .arg(limit),
        Transform::Pairs(Scalar::Int),
    )
}

fn score_arg(score: Option<i64>) -> Bytes {
    score.map(|s| s.to_arg()).unwrap_or_default()
}

// ── Score range paging ─────────────────────────────────────────────

/// Default number of members fetched per scan.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// A score window over a sorted set, read page by page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZRangeByScore {
    pub name: Bytes,
    /// Lowest score included; `None` is unbounded.
    pub min: Option<i64>,
    /// Highest score included; `None` is unbounded.
    pub max: Option<i64>,
    /// Members to skip before collecting.
    pub offset: usize,
    /// Members to return after the offset.
    pub limit: usize,
    pub page_size: usize,
    /// Walk from `max` down to `min`.
    pub reverse: bool,
}

impl ZRangeByScore {
    pub fn new(name: impl ToArg, min: Option<i64>, max: Option<i64>) -> Self {
        Self {
            name: name.to_arg(),
            min,
            max,
            offset: 0,
            limit: usize::MAX,
            page_size: DEFAULT_PAGE_SIZE,
            reverse: false,
        }
    }

    pub fn window(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }
}

/// Members of `range` with their scores, paged through `zscan`/`zrscan`.
///
/// Each page resumes after the last `(key, score)` seen. Paging stops as
/// soon as `offset + limit` members are collected or a page comes back
/// short; the first `offset` members are then dropped and at most `limit`
/// are returned.
pub fn zrange_by_score<T: Transport>(
    client: &Client<T>,
    range: &ZRangeByScore,
) -> Result<Vec<(Bytes, i64)>> {
    let wanted = range.offset.saturating_add(range.limit);
    let page_size = range.page_size.max(1);
    let (mut score_start, score_end) = if range.reverse {
        (range.max, range.min)
    } else {
        (range.min, range.max)
    };
    let mut key_start = Bytes::new();
    let mut collected: Vec<(Bytes, i64)> = Vec::new();

    while collected.len() < wanted {
        let take = page_size.min(wanted - collected.len());
        let call = if range.reverse {
            zrscan(&range.name, &key_start, score_start, score_end, take)
        } else {
            zscan(&range.name, &key_start, score_start, score_end, take)
        };
        let page = match client.call(&call)? {
            Value::Pairs(pairs) => pairs,
            Value::Nil => Vec::new(),
            other => {
                return Err(SsdbError::Transform(format!(
                    "score scan returned {}",
                    other.type_name()
                )))
            }
        };
        let fetched = page.len();
        trace!(fetched, collected = collected.len(), "score page");

        for (key, score) in page {
            let score = score.as_int().ok_or_else(|| {
                SsdbError::Transform(format!("non-integer score for {key:?}"))
            })?;
            collected.push((key, score));
        }
        match collected.last() {
            Some((key, score)) if fetched == take => {
                key_start = key.clone();
                score_start = Some(*score);
            }
            _ => break,
        }
    }

    let skip = range.offset.min(collected.len());
    collected.drain(..skip);
    collected.truncate(range.limit);
    Ok(collected)
}

// ── Tests ──────────────────────────────────────────────────────────
