//! Command values.
//!
//! A [`Command`] is an immutable, ordered list of binary-safe arguments,
//! the first of which names the operation. Numbers are rendered in their
//! canonical decimal form when they are added, so the codec only ever sees
//! byte strings.

use bytes::Bytes;

/// Conversion into one command argument.
pub trait ToArg {
    fn to_arg(&self) -> Bytes;
}

impl ToArg for Bytes {
    fn to_arg(&self) -> Bytes {
        self.clone()
    }
}

impl ToArg for [u8] {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl<const N: usize> ToArg for [u8; N] {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl ToArg for Vec<u8> {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl ToArg for str {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for String {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl<T: ToArg + ?Sized> ToArg for &T {
    fn to_arg(&self) -> Bytes {
        (**self).to_arg()
    }
}

macro_rules! int_to_arg {
    ($($t:ty),*) => {
        $(
            impl ToArg for $t {
                fn to_arg(&self) -> Bytes {
                    let mut buf = itoa::Buffer::new();
                    Bytes::copy_from_slice(buf.format(*self).as_bytes())
                }
            }
        )*
    };
}

int_to_arg!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl ToArg for f64 {
    fn to_arg(&self) -> Bytes {
        // Display gives the shortest representation that round-trips.
        Bytes::from(self.to_string())
    }
}

impl ToArg for f32 {
    fn to_arg(&self) -> Bytes {
        Bytes::from(self.to_string())
    }
}

/// An ordered list of arguments, operation name first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    args: Vec<Bytes>,
}

impl Command {
    /// Start a command with its operation name.
    pub fn new(name: impl ToArg) -> Self {
        Self {
            args: vec![name.to_arg()],
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl ToArg) -> Self {
        self.args.push(arg.to_arg());
        self
    }

    /// Append every argument of an iterator.
    pub fn args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToArg,
    {
        self.args.extend(args.into_iter().map(|a| a.to_arg()));
        self
    }

    /// The operation name.
    pub fn name(&self) -> &[u8] {
        &self.args[0]
    }

    /// All arguments, including the operation name.
    pub fn as_args(&self) -> &[Bytes] {
        &self.args
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

impl From<Vec<Bytes>> for Command {
    /// An empty vector yields a command with an empty name.
    fn from(args: Vec<Bytes>) -> Self {
        if args.is_empty() {
            return Self {
                args: vec![Bytes::new()],
            };
        }
        Self { args }
    }
}

/// Helper macro for building commands ergonomically.
///
/// Usage:
/// ```
/// use rssdb::cmd;
/// let c = cmd!("set", "mykey", 42);
/// assert_eq!(c.as_args()[2], "42");
/// ```
#[macro_export]
macro_rules! cmd {
    ($name:expr $(, $arg:expr)* $(,)?) => {{
        $crate::proto::command::Command::new($name)$(.arg($arg))*
    }};
}

// ── Tests ──────────────────────────────────────────────────────────
