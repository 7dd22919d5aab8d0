//! Shared helpers for integration tests.
//!
//! Runs a small in-process server speaking the block protocol on the
//! library's own runtime, so the blocking client can be exercised over
//! real sockets without an external server.
//!
//! Besides a subset of the store's commands, the server understands a few
//! test hooks:
//!
//! * `echo args..`: `ok` followed by the arguments;
//! * `error|fail|client_error args..`: that status followed by the arguments;
//! * `drop`: close the connection without answering;
//! * `sleep ms`: wait, then answer `ok`.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Once};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tracing_subscriber::{fmt, EnvFilter};

use rssdb::proto::{block_len, encode_frames, parse_block};
use rssdb::{runtime, Client, ConnectionConfig};

static TRACING: Once = Once::new();

/// Install a test subscriber; `RUST_LOG` selects the filter.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,rssdb=debug"));
        let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
    });
}

#[derive(Default)]
struct Store {
    kv: HashMap<Bytes, Bytes>,
    hashes: HashMap<Bytes, BTreeMap<Bytes, Bytes>>,
    zsets: HashMap<Bytes, HashMap<Bytes, i64>>,
}

enum Reply {
    Frames(Vec<Bytes>),
    Close,
}

fn reply(status: &'static str, body: impl IntoIterator<Item = Bytes>) -> Reply {
    let mut frames = vec![Bytes::from_static(status.as_bytes())];
    frames.extend(body);
    Reply::Frames(frames)
}

fn ok(body: impl IntoIterator<Item = Bytes>) -> Reply {
    reply("ok", body)
}

fn num(n: i64) -> Bytes {
    Bytes::from(n.to_string())
}

fn text(s: &'static str) -> Bytes {
    Bytes::from_static(s.as_bytes())
}

fn parse_i64(raw: &Bytes) -> Option<i64> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}

/// A running fake server.
pub struct FakeServer {
    pub config: ConnectionConfig,
    accepted: Arc<AtomicUsize>,
    shutdown: Option<oneshot::Sender<()>>,
    stopped: mpsc::Receiver<()>,
}

impl FakeServer {
    pub fn start() -> Self {
        Self::start_with_password(None)
    }

    /// Start a server that requires `auth password` before anything else.
    pub fn start_with_password(password: Option<&str>) -> Self {
        init_tracing();
        let listener = runtime::block_on(TcpListener::bind("127.0.0.1:0")).unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepted = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(Mutex::new(Store::default()));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let (stopped_tx, stopped_rx) = mpsc::channel();
        let password = password.map(String::from);

        let counter = Arc::clone(&accepted);
        runtime::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    conn = listener.accept() => {
                        let Ok((socket, _)) = conn else { break };
                        counter.fetch_add(1, Ordering::SeqCst);
                        let store = Arc::clone(&store);
                        let password = password.clone();
                        tokio::spawn(serve(socket, store, password));
                    }
                }
            }
            drop(listener);
            let _ = stopped_tx.send(());
        });

        let config = ConnectionConfig {
            connect_timeout_ms: 1000,
            read_timeout_ms: 2000,
            write_timeout_ms: 2000,
            password: None,
            ..ConnectionConfig::new("127.0.0.1", port)
        };
        Self {
            config,
            accepted,
            shutdown: Some(shutdown_tx),
            stopped: stopped_rx,
        }
    }

    pub fn client(&self) -> Client {
        Client::connect(self.config.clone()).unwrap()
    }

    /// Connections accepted so far.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Stop listening; returns once new connections are refused.
    pub fn stop_accepting(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
            let _ = self.stopped.recv_timeout(Duration::from_secs(5));
        }
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn serve(mut socket: TcpStream, store: Arc<Mutex<Store>>, password: Option<String>) {
    let mut buf = BytesMut::with_capacity(4096);
    let mut authed = password.is_none();
    loop {
        while let Ok(len) = block_len(&buf) {
            let block = buf.split_to(len).freeze();
            let Ok((args, _)) = parse_block(&block) else { return };
            if args.is_empty() {
                continue;
            }
            let reply = if &args[0][..] == b"sleep" {
                let ms = args.get(1).and_then(parse_i64).unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(ms as u64)).await;
                ok([])
            } else {
                handle_locked(&store, password.as_deref(), &mut authed, &args)
            };
            match reply {
                Reply::Frames(frames) => {
                    let refs: Vec<&[u8]> = frames.iter().map(|f| &f[..]).collect();
                    if socket.write_all(&encode_frames(&refs)).await.is_err() {
                        return;
                    }
                }
                Reply::Close => return,
            }
        }
        match socket.read_buf(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

fn handle_locked(
    store: &Mutex<Store>,
    password: Option<&str>,
    authed: &mut bool,
    args: &[Bytes],
) -> Reply {
    let mut store = store.lock();
    handle(&mut store, password, authed, args)
}

fn handle(store: &mut Store, password: Option<&str>, authed: &mut bool, args: &[Bytes]) -> Reply {
    let op = std::str::from_utf8(&args[0]).unwrap_or("").to_string();
    let a = &args[1..];
    let wrong_args = || reply("client_error", [text("wrong number of arguments")]);

    if op == "auth" {
        return match (password, a.first()) {
            (Some(expected), Some(given)) if &given[..] == expected.as_bytes() => {
                *authed = true;
                ok([text("1")])
            }
            (None, _) => ok([text("1")]),
            _ => reply("error", [text("invalid password")]),
        };
    }
    if !*authed {
        return reply("noauth", [text("authentication required")]);
    }

    match op.as_str() {
        "ping" => ok([]),
        "echo" => ok(a.to_vec()),
        "error" => reply("error", a.to_vec()),
        "fail" => reply("fail", a.to_vec()),
        "client_error" => reply("client_error", a.to_vec()),
        "drop" => Reply::Close,

        "get" => match a.first().and_then(|k| store.kv.get(k)) {
            Some(v) => ok([v.clone()]),
            None => reply("not_found", []),
        },
        "set" | "setx" if a.len() >= 2 => {
            store.kv.insert(a[0].clone(), a[1].clone());
            ok([text("1")])
        }
        "del" if a.len() == 1 => {
            store.kv.remove(&a[0]);
            ok([text("1")])
        }
        "exists" if a.len() == 1 => {
            let found = store.kv.contains_key(&a[0]);
            ok([text(if found { "1" } else { "0" })])
        }
        "incr" if !a.is_empty() => {
            let by = a.get(1).and_then(parse_i64).unwrap_or(1);
            let current = match store.kv.get(&a[0]) {
                Some(v) => match parse_i64(v) {
                    Some(n) => n,
                    None => {
                        return reply("error", [text("value is not an integer or out of range")])
                    }
                },
                None => 0,
            };
            let next = current + by;
            store.kv.insert(a[0].clone(), num(next));
            ok([num(next)])
        }
        "multi_get" => {
            let mut body = Vec::new();
            for k in a {
                if let Some(v) = store.kv.get(k) {
                    body.push(k.clone());
                    body.push(v.clone());
                }
            }
            ok(body)
        }
        "multi_set" => {
            if a.len() % 2 != 0 {
                return wrong_args();
            }
            for pair in a.chunks(2) {
                store.kv.insert(pair[0].clone(), pair[1].clone());
            }
            ok([num((a.len() / 2) as i64)])
        }

        "hset" if a.len() == 3 => {
            let fresh = store
                .hashes
                .entry(a[0].clone())
                .or_default()
                .insert(a[1].clone(), a[2].clone())
                .is_none();
            ok([text(if fresh { "1" } else { "0" })])
        }
        "hget" if a.len() == 2 => match store.hashes.get(&a[0]).and_then(|h| h.get(&a[1])) {
            Some(v) => ok([v.clone()]),
            None => reply("not_found", []),
        },
        "hgetall" if a.len() == 1 => {
            let mut body = Vec::new();
            if let Some(h) = store.hashes.get(&a[0]) {
                for (k, v) in h {
                    body.push(k.clone());
                    body.push(v.clone());
                }
            }
            ok(body)
        }
        "hsize" if a.len() == 1 => {
            ok([num(store.hashes.get(&a[0]).map_or(0, |h| h.len() as i64))])
        }

        "zset" if a.len() == 3 => {
            let Some(score) = parse_i64(&a[2]) else { return wrong_args() };
            let fresh = store
                .zsets
                .entry(a[0].clone())
                .or_default()
                .insert(a[1].clone(), score)
                .is_none();
            ok([text(if fresh { "1" } else { "0" })])
        }
        "zget" if a.len() == 2 => match store.zsets.get(&a[0]).and_then(|z| z.get(&a[1])) {
            Some(score) => ok([num(*score)]),
            None => reply("not_found", []),
        },
        "zscan" | "zrscan" if a.len() == 5 => {
            let reverse = op == "zrscan";
            ok(zscan(store, a, reverse))
        }

        "info" => ok([
            text("ssdb-server"),
            text("version"),
            text("1.9.9"),
            text("links"),
            text("1"),
            text("leveldb.stats"),
            text("                               Compactions\nLevel  Files Size(MB)\n--------------------\n"),
        ]),

        "set" | "setx" | "del" | "exists" | "incr" | "hset" | "hget" | "hgetall" | "hsize"
        | "zset" | "zget" | "zscan" | "zrscan" => wrong_args(),
        _ => reply("client_error", [Bytes::from(format!("Unknown Command: {op}"))]),
    }
}

/// `(score, key)`-ordered scan with an exclusive resume point.
fn zscan(store: &Store, a: &[Bytes], reverse: bool) -> Vec<Bytes> {
    let key_start = &a[1];
    let score_start = parse_i64(&a[2]);
    let score_end = parse_i64(&a[3]);
    let limit = parse_i64(&a[4]).unwrap_or(0).max(0) as usize;

    let mut members: Vec<(i64, Bytes)> = store
        .zsets
        .get(&a[0])
        .map(|z| z.iter().map(|(k, s)| (*s, k.clone())).collect())
        .unwrap_or_default();
    members.sort();
    if reverse {
        members.reverse();
    }

    let mut body = Vec::new();
    for (score, key) in members
        .into_iter()
        .filter(|(score, key)| match score_start {
            None => true,
            Some(s) if key_start.is_empty() => {
                if reverse {
                    *score <= s
                } else {
                    *score >= s
                }
            }
            Some(s) => {
                let ord = (*score, key).cmp(&(s, key_start));
                if reverse {
                    ord.is_lt()
                } else {
                    ord.is_gt()
                }
            }
        })
        .filter(|(score, _)| match score_end {
            None => true,
            Some(e) if reverse => *score >= e,
            Some(e) => *score <= e,
        })
        .take(limit)
    {
        body.push(key);
        body.push(num(score));
    }
    body
}

/// Bind and immediately release a port nothing listens on.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
