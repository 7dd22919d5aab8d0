//! Synchronous client for SSDB-style key-value servers.
//!
//! ```no_run
//! use rssdb::{commands, Client, Transform};
//!
//! let client = Client::from_url("ssdb://127.0.0.1:8888")?;
//! client.call(&commands::set("greeting", "hello"))?;
//! let value = client.call(&commands::get("greeting"))?;
//! assert_eq!(value.as_str(), Some("hello"));
//!
//! let (a, b) = client.batch(|batch| {
//!     Ok((
//!         batch.call(commands::incr("hits", 1)),
//!         batch.execute(rssdb::cmd!("exists", "greeting"), Transform::Bool),
//!     ))
//! })?;
//! println!("{:?} {:?}", a.value()?, b.value()?);
//! # Ok::<(), rssdb::SsdbError>(())
//! ```

pub mod batch;
pub mod client;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod proto;
pub mod runtime;
pub mod sync;
pub mod transform;
pub mod transport;
pub mod value;

pub use batch::{Batch, BatchFuture};
pub use client::Client;
pub use commands::Call;
pub use config::ConnectionConfig;
pub use error::{Result, ServerErrorKind, SsdbError};
pub use proto::{Command, Response, Status, ToArg};
pub use transform::{LookupShape, Scalar, Transform};
pub use transport::{StandaloneTransport, Transport};
pub use value::Value;
