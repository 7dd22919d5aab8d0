//! Request serializer.
//!
//! Every argument is framed as `<len>\n<data>\n`; a blank line closes the
//! block: `3\nset\n1\nk\n1\nv\n\n`

use bytes::Bytes;
use itoa::Buffer;

use crate::proto::command::Command;

/// Bytes needed to frame `args`, terminator included.
fn framed_len<A: AsRef<[u8]>>(args: &[A]) -> usize {
    // len digits (max 20 for u64) + \n + data + \n, then the final \n
    args.iter().map(|a| 20 + 1 + a.as_ref().len() + 1).sum::<usize>() + 1
}

fn write_frames<A: AsRef<[u8]>>(buf: &mut Vec<u8>, args: &[A], itoa_buf: &mut Buffer) {
    for arg in args {
        let arg = arg.as_ref();
        // <len>\n<data>\n
        buf.extend_from_slice(itoa_buf.format(arg.len()).as_bytes());
        buf.push(b'\n');
        buf.extend_from_slice(arg);
        buf.push(b'\n');
    }
    buf.push(b'\n');
}

/// Frame raw arguments into one block.
///
/// # Example
/// ```
/// use rssdb::proto::encode_frames;
/// assert_eq!(encode_frames(&[&b"get"[..], &b"k"[..]]), b"3\nget\n1\nk\n\n");
/// ```
pub fn encode_frames(args: &[&[u8]]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(framed_len(args));
    write_frames(&mut buf, args, &mut Buffer::new());
    buf
}

/// Encode one command into wire format.
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut buf = Vec::with_capacity(framed_len(command.as_args()));
    write_frames(&mut buf, command.as_args(), &mut Buffer::new());
    buf
}

/// Encode multiple commands into a single buffer for pipelined writes.
///
/// Everything lands in one contiguous `Vec<u8>` so the whole batch goes
/// out with a single `write_all`.
pub fn encode_pipeline(commands: &[Command]) -> Vec<u8> {
    let cap = commands.iter().map(|c| framed_len(c.as_args())).sum();
    let mut buf = Vec::with_capacity(cap);
    let mut itoa_buf = Buffer::new();
    for command in commands {
        write_frames(&mut buf, command.as_args(), &mut itoa_buf);
    }
    buf
}

// ── Tests ──────────────────────────────────────────────────────────
