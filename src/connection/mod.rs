pub mod tcp;

pub use tcp::SsdbConnection;
