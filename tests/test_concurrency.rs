//! Integration tests: one client shared between threads.

mod common;

use std::sync::Arc;
use std::thread;

use common::*;
use rssdb::{cmd, commands, Transform, Value};

#[test]
fn threads_see_only_their_own_responses() {
    let server = FakeServer::start();
    let c = Arc::new(server.client());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let c = Arc::clone(&c);
            thread::spawn(move || {
                for i in 0..100 {
                    let tag = format!("thread-{t}-{i}");
                    let v = c.execute(&cmd!("echo", tag.as_str()), &Transform::Bytes).unwrap();
                    assert_eq!(v.as_str(), Some(tag.as_str()));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(server.accepted(), 1);
}

#[test]
fn concurrent_batches_do_not_interleave() {
    let server = FakeServer::start();
    let c = Arc::new(server.client());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let c = Arc::clone(&c);
            thread::spawn(move || {
                for round in 0..20 {
                    let futures = c
                        .batch(|batch| {
                            Ok((0..10)
                                .map(|i| batch.execute(cmd!("echo", t, round, i), Transform::List))
                                .collect::<Vec<_>>())
                        })
                        .unwrap();
                    for (i, f) in futures.iter().enumerate() {
                        let expected = Value::List(vec![
                            Value::Bytes(t.to_string().into()),
                            Value::Bytes(round.to_string().into()),
                            Value::Bytes(i.to_string().into()),
                        ]);
                        assert_eq!(f.value().unwrap(), expected);
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}

#[test]
fn synchronized_section_is_atomic() {
    let server = FakeServer::start();
    let c = Arc::new(server.client());
    c.call(&commands::set("counter", "0")).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let c = Arc::clone(&c);
            thread::spawn(move || {
                for _ in 0..25 {
                    // Read-modify-write; only safe while the lock is held.
                    c.synchronized(|c| {
                        assert_eq!(c.lock_depth(), 1);
                        let current = c.call(&commands::get("counter")).unwrap();
                        let n: i64 = current.as_str().unwrap().parse().unwrap();
                        c.call(&commands::set("counter", n + 1)).unwrap();
                    });
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(c.call(&commands::get("counter")).unwrap().as_str(), Some("200"));
}

#[test]
fn lock_depth_is_per_thread() {
    let server = FakeServer::start();
    let c = Arc::new(server.client());
    let (entered_tx, entered_rx) = std::sync::mpsc::channel();
    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

    let holder = {
        let c = Arc::clone(&c);
        thread::spawn(move || {
            c.synchronized(|c| {
                assert_eq!(c.lock_depth(), 1);
                entered_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            });
        })
    };

    entered_rx.recv().unwrap();
    assert_eq!(c.lock_depth(), 0);
    release_tx.send(()).unwrap();
    holder.join().unwrap();
    c.call(&commands::ping()).unwrap();
}
