pub mod standalone;
#[cfg(test)]
pub(crate) mod mock;

pub use standalone::StandaloneTransport;

use crate::error::Result;
use crate::proto::types::Response;

/// Blocking request/response channel to one server.
///
/// The client serializes all calls through its instance lock, so an
/// implementation only ever sees one caller at a time and may assume
/// that every `send` is followed by the matching `receive` calls.
pub trait Transport: Send {
    /// Write one or more encoded request blocks.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Read and decode the next response block.
    fn receive(&mut self) -> Result<Response>;

    /// Read exactly `n` responses, in order.
    fn receive_many(&mut self, n: usize) -> Result<Vec<Response>> {
        let mut responses = Vec::with_capacity(n);
        for _ in 0..n {
            responses.push(self.receive()?);
        }
        Ok(responses)
    }
}
