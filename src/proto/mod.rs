pub mod command;
pub mod parser;
pub mod types;
pub mod writer;

pub use command::{Command, ToArg};
pub use parser::{block_len, parse, parse_block, parse_slice};
pub use types::{Response, Status};
pub use writer::{encode_command, encode_frames, encode_pipeline};
